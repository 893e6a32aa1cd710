//! Runtime value representation
//!
//! Values are cheap to clone: closures, arrays and thunks are shared through
//! `Rc`, so a clone aliases the same object (arrays behave like C arrays
//! decayed to pointers).

use crate::ast::Node;
use crate::environment::ExecutionState;
use crate::kind::Kind;
use crate::span::Span;
use crate::thunk::Thunk;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Runtime value
#[derive(Debug, Clone)]
pub enum Value {
    /// Result of statements and `void` functions
    Void,
    Number(f64),
    Bool(bool),
    Closure(Rc<Closure>),
    Native(NativeFunction),
    Array(Rc<RefCell<Vec<Value>>>),
    /// Deferred computation, see [`crate::thunk`]
    Lazy(Rc<RefCell<Thunk>>),
}

/// User-defined function value.
///
/// Closures capture nothing: a call only sees its own frame and the globals.
#[derive(Debug, Clone)]
pub struct Closure {
    /// `None` for function expressions
    pub name: Option<String>,
    pub params: Vec<Param>,
    pub body: Rc<Node>,
}

impl Closure {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }
}

/// Formal parameter with its declared kind
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub kind: Kind,
}

/// Signature of a built-in implementation. Arguments are already cast to the
/// declared parameter kinds.
pub type NativeFn = fn(&[Value], &mut ExecutionState) -> Result<Value, RuntimeError>;

/// Built-in function seeded into the global frame
#[derive(Clone, Copy)]
pub struct NativeFunction {
    pub name: &'static str,
    pub params: &'static [Kind],
    pub ret: Kind,
    pub func: NativeFn,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.params.len())
            .finish()
    }
}

impl Value {
    /// Create an array value
    pub fn array(elements: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(elements)))
    }

    /// Get the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Void => "void",
            Value::Number(_) => "number",
            Value::Bool(_) => "bool",
            Value::Closure(_) | Value::Native(_) => "function",
            Value::Array(_) => "array",
            Value::Lazy(_) => "thunk",
        }
    }

    /// C truthiness: non-zero numbers, `true`, and any object
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Void => false,
            Value::Number(n) => *n != 0.0,
            Value::Bool(b) => *b,
            Value::Closure(_) | Value::Native(_) | Value::Array(_) | Value::Lazy(_) => true,
        }
    }

    /// Numeric view used by arithmetic; booleans count as 0/1
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// True for numbers with no fractional part
    pub fn is_whole_number(&self) -> bool {
        matches!(self, Value::Number(n) if n.is_finite() && n.fract() == 0.0)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Void, Value::Void) => true,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => a.name == b.name,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Lazy(a), Value::Lazy(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => write!(f, "void"),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Closure(c) => write!(f, "<function {}>", c.display_name()),
            Value::Native(n) => write!(f, "<builtin {}>", n.name),
            Value::Array(elements) => {
                write!(f, "{{")?;
                for (i, element) in elements.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{element}")?;
                }
                write!(f, "}}")
            }
            Value::Lazy(thunk) => match thunk.borrow().memoized() {
                Some(value) => write!(f, "{value}"),
                None => write!(f, "<thunk>"),
            },
        }
    }
}

/// Whole numbers print without a fractional part
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Runtime error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// Invalid cast or operand type
    #[error("Type error: {msg}")]
    TypeError { msg: String, span: Option<Span> },
    /// Lookup failure
    #[error("Undefined variable: {name}")]
    UndefinedVariable { name: String, span: Option<Span> },
    /// Callee not bound in the global frame
    #[error("Undefined function: {name}")]
    UndefinedFunction { name: String, span: Option<Span> },
    /// Callee bound to something other than a function
    #[error("Not callable: {name}")]
    NotCallable { name: String, span: Option<Span> },
    #[error("Function `{name}` expected {expected} arguments but received {received}")]
    ArityMismatch {
        name: String,
        expected: usize,
        received: usize,
        span: Option<Span>,
    },
    #[error("Array index {index} out of bounds for length {len}")]
    OutOfBounds {
        index: usize,
        len: usize,
        span: Option<Span>,
    },
    /// Index not a whole non-negative number
    #[error("Invalid index: expected a non-negative integer")]
    InvalidIndex { span: Option<Span> },
    #[error("Division by zero")]
    DivideByZero { span: Option<Span> },
    #[error("Redeclaration of `{name}` in the same scope")]
    Redeclaration { name: String, span: Option<Span> },
    #[error("Invalid assignment target")]
    InvalidAssignmentTarget { span: Option<Span> },
    #[error("`{keyword}` statement not within a loop")]
    JumpOutsideLoop {
        keyword: &'static str,
        span: Option<Span>,
    },
    /// Lazy initializer that depends on itself
    #[error("Lazy value forced while it was being computed")]
    CyclicThunk { span: Option<Span> },
    #[error("Call depth exceeded limit of {limit}")]
    StackOverflow { limit: usize, span: Option<Span> },
    #[error("Step limit of {limit} exceeded")]
    StepLimitExceeded { limit: u64 },
    /// A step observer stopped the evaluation before it finished
    #[error("Evaluation halted by step observer")]
    Halted,
    /// Engine bug: frame bookkeeping out of sync
    #[error("Internal invariant violated: {msg}")]
    InternalInvariantViolation { msg: String },
}

impl RuntimeError {
    pub(crate) fn type_error(msg: impl Into<String>, span: Option<Span>) -> Self {
        RuntimeError::TypeError {
            msg: msg.into(),
            span,
        }
    }

    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        RuntimeError::InternalInvariantViolation { msg: msg.into() }
    }

    /// Source location the error was raised at, if known
    pub fn span(&self) -> Option<Span> {
        match self {
            RuntimeError::TypeError { span, .. }
            | RuntimeError::UndefinedVariable { span, .. }
            | RuntimeError::UndefinedFunction { span, .. }
            | RuntimeError::NotCallable { span, .. }
            | RuntimeError::ArityMismatch { span, .. }
            | RuntimeError::OutOfBounds { span, .. }
            | RuntimeError::InvalidIndex { span }
            | RuntimeError::DivideByZero { span }
            | RuntimeError::Redeclaration { span, .. }
            | RuntimeError::InvalidAssignmentTarget { span }
            | RuntimeError::JumpOutsideLoop { span, .. }
            | RuntimeError::CyclicThunk { span }
            | RuntimeError::StackOverflow { span, .. } => *span,
            RuntimeError::StepLimitExceeded { .. }
            | RuntimeError::Halted
            | RuntimeError::InternalInvariantViolation { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(Value::Number(-1.0).is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Void.is_truthy());
        assert!(Value::array(vec![]).is_truthy());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(-2.5).to_string(), "-2.5");
        assert_eq!(
            Value::array(vec![Value::Number(1.0), Value::Bool(true)]).to_string(),
            "{1, true}"
        );
    }

    #[test]
    fn test_arrays_alias_on_clone() {
        let a = Value::array(vec![Value::Number(1.0)]);
        let b = a.clone();
        if let Value::Array(inner) = &a {
            inner.borrow_mut()[0] = Value::Number(9.0);
        }
        assert_eq!(b, Value::array(vec![Value::Number(9.0)]));
    }

    #[test]
    fn test_error_span() {
        let err = RuntimeError::DivideByZero {
            span: Some(Span::new(3, 4)),
        };
        assert_eq!(err.span(), Some(Span::new(3, 4)));
        assert_eq!(err.to_string(), "Division by zero");
    }
}
