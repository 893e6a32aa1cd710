//! Declared C types and the implicit conversion applied to them
//!
//! A [`Kind`] is a primitive plus a pointer depth. [`cast`] is the single
//! coercion rule used for casts, assignment, declaration initializers,
//! parameter binding and return values.

use crate::ast::{Node, NodeKind};
use crate::span::Span;
use crate::value::{RuntimeError, Value};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Void,
    Bool,
    Char,
    Int,
    Float,
    Double,
}

impl Primitive {
    pub fn name(&self) -> &'static str {
        match self {
            Primitive::Void => "void",
            Primitive::Bool => "bool",
            Primitive::Char => "char",
            Primitive::Int => "int",
            Primitive::Float => "float",
            Primitive::Double => "double",
        }
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, Primitive::Float | Primitive::Double)
    }
}

impl FromStr for Primitive {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "void" => Ok(Primitive::Void),
            "bool" | "_Bool" => Ok(Primitive::Bool),
            "char" => Ok(Primitive::Char),
            "int" => Ok(Primitive::Int),
            "float" => Ok(Primitive::Float),
            "double" => Ok(Primitive::Double),
            _ => Err(()),
        }
    }
}

/// Declared type: primitive plus pointer indirection depth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Kind {
    pub primitive: Primitive,
    pub pointers: u32,
}

impl Kind {
    pub const VOID: Kind = Kind::new(Primitive::Void);
    pub const BOOL: Kind = Kind::new(Primitive::Bool);
    pub const CHAR: Kind = Kind::new(Primitive::Char);
    pub const INT: Kind = Kind::new(Primitive::Int);
    pub const FLOAT: Kind = Kind::new(Primitive::Float);
    pub const DOUBLE: Kind = Kind::new(Primitive::Double);

    pub const fn new(primitive: Primitive) -> Self {
        Self {
            primitive,
            pointers: 0,
        }
    }

    pub const fn pointer_to(self) -> Self {
        Self {
            primitive: self.primitive,
            pointers: self.pointers + 1,
        }
    }

    /// Kind of `*p` for a pointer; scalars are their own element kind
    pub fn pointee(self) -> Self {
        Self {
            primitive: self.primitive,
            pointers: self.pointers.saturating_sub(1),
        }
    }

    pub fn is_pointer(&self) -> bool {
        self.pointers > 0
    }

    pub fn is_void(&self) -> bool {
        self.primitive == Primitive::Void && self.pointers == 0
    }

    /// Zero value stored by a declaration without initializer
    pub fn zero(&self) -> Value {
        match (self.primitive, self.pointers) {
            (Primitive::Void, 0) => Value::Void,
            (Primitive::Bool, 0) => Value::Bool(false),
            _ => Value::Number(0.0),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.primitive.name())?;
        if self.pointers > 0 {
            write!(f, " {}", "*".repeat(self.pointers as usize))?;
        }
        Ok(())
    }
}

impl FromStr for Kind {
    type Err = RuntimeError;

    /// Parses C spellings such as `int`, `char*` or `double **`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let pointers = s.chars().filter(|c| *c == '*').count() as u32;
        let name = s
            .trim()
            .trim_end_matches(|c: char| c == '*' || c.is_whitespace());
        let primitive = name
            .parse::<Primitive>()
            .map_err(|_| RuntimeError::type_error(format!("unknown type name '{name}'"), None))?;
        Ok(Kind {
            primitive,
            pointers,
        })
    }
}

/// Decode a type-tag node into a [`Kind`]
pub fn to_kind(node: &Node) -> Result<Kind, RuntimeError> {
    match &node.kind {
        NodeKind::TypeTag { name, pointers } => {
            let base: Kind = name.parse().map_err(|e| with_span(e, node.loc))?;
            Ok(Kind {
                primitive: base.primitive,
                pointers: base.pointers.checked_add(*pointers).ok_or_else(|| {
                    RuntimeError::type_error(format!("too many pointer levels in '{name}'"), node.loc)
                })?,
            })
        }
        other => Err(RuntimeError::type_error(
            format!("expected a type, found {}", other.label()),
            node.loc,
        )),
    }
}

/// Decode the declared-name shape `name : type` used by parameters,
/// declarators and function ids
pub fn declared_name(node: &Node) -> Result<(String, Kind), RuntimeError> {
    match &node.kind {
        NodeKind::MemberExpression {
            object,
            property,
            computed: false,
        } => match &object.kind {
            NodeKind::Identifier { name } => Ok((name.clone(), to_kind(property)?)),
            other => Err(RuntimeError::type_error(
                format!("expected a declared name, found {}", other.label()),
                object.loc,
            )),
        },
        other => Err(RuntimeError::type_error(
            format!("expected a typed declaration, found {}", other.label()),
            node.loc,
        )),
    }
}

fn with_span(err: RuntimeError, span: Option<Span>) -> RuntimeError {
    match err {
        RuntimeError::TypeError { msg, span: None } => RuntimeError::TypeError { msg, span },
        other => other,
    }
}

/// Coerce `value` to `kind`.
///
/// Pointer kinds only accept whole numbers (pointers are integers here) and
/// arrays (which decay to pointers). A whole number, or any number under a
/// floating kind, is kept as is; other numbers truncate toward zero.
/// Booleans read as `0`/`1` except under `bool` and the floating kinds.
pub fn cast(value: Value, kind: Kind, span: Option<Span>) -> Result<Value, RuntimeError> {
    if kind.is_pointer() {
        return match value {
            Value::Number(_) if value.is_whole_number() => Ok(value),
            Value::Array(_) => Ok(value),
            other => Err(incompatible(&other, kind, span)),
        };
    }

    match (kind.primitive, value) {
        (_, Value::Lazy(_)) => Err(RuntimeError::invariant(
            "cast applied to an unforced lazy value",
        )),
        (Primitive::Void, Value::Void) => Ok(Value::Void),
        (_, Value::Void) => Err(RuntimeError::type_error(
            "void value not ignored as it ought to be",
            span,
        )),
        (Primitive::Float | Primitive::Double, v @ Value::Number(_)) => Ok(v),
        (_, v @ Value::Number(_)) if v.is_whole_number() => Ok(v),
        (_, Value::Number(n)) => Ok(Value::Number(n.trunc())),
        (Primitive::Bool | Primitive::Float | Primitive::Double, v @ Value::Bool(_)) => Ok(v),
        (_, Value::Bool(b)) => Ok(Value::Number(if b { 1.0 } else { 0.0 })),
        (_, other) => Err(incompatible(&other, kind, span)),
    }
}

fn incompatible(value: &Value, kind: Kind, span: Option<Span>) -> RuntimeError {
    RuntimeError::type_error(
        format!(
            "incompatible types when casting {} to type {kind}",
            value.type_name()
        ),
        span,
    )
}
