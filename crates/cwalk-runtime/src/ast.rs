//! Syntax tree consumed by the evaluator
//!
//! The tree is produced by an external C parser that emits ESTree-shaped
//! JSON: every node is an object with a `"type"` discriminator and an optional
//! `"loc"`. The evaluator never mutates the tree.
//!
//! Declared types have no node of their own in that grammar. A declaration
//! `int *p` arrives as a non-computed member access whose object is the
//! identifier and whose property is a [`NodeKind::TypeTag`]; the same shape
//! with an arbitrary expression as object is a cast.

use crate::span::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level translation unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub body: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc: Option<Span>,
}

impl Program {
    pub fn new(body: Vec<Node>) -> Self {
        Self { body, loc: None }
    }

    /// Deserialize from parser JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// A syntax node: kind plus optional location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc: Option<Span>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self { kind, loc: None }
    }

    /// Attach a source location
    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.loc = Some(Span::new(line, column));
        self
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// ESTree type name of this node
    pub fn label(&self) -> &'static str {
        self.kind.label()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeKind {
    // Statements
    BlockStatement {
        body: Vec<Node>,
    },
    ExpressionStatement {
        expression: Box<Node>,
    },
    VariableDeclaration {
        declarations: Vec<VariableDeclarator>,
    },
    FunctionDeclaration {
        /// Name and return type, in declared-name shape
        id: Box<Node>,
        params: Vec<Node>,
        body: Box<Node>,
    },
    IfStatement {
        test: Box<Node>,
        consequent: Box<Node>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alternate: Option<Box<Node>>,
    },
    WhileStatement {
        test: Box<Node>,
        body: Box<Node>,
    },
    DoWhileStatement {
        body: Box<Node>,
        test: Box<Node>,
    },
    ForStatement {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        init: Option<Box<Node>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        test: Option<Box<Node>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        update: Option<Box<Node>>,
        body: Box<Node>,
    },
    BreakStatement,
    ContinueStatement,
    ReturnStatement {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        argument: Option<Box<Node>>,
    },

    // Expressions
    Literal {
        value: Literal,
    },
    Identifier {
        name: String,
    },
    BinaryExpression {
        operator: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    LogicalExpression {
        operator: LogicalOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    UnaryExpression {
        operator: UnaryOp,
        argument: Box<Node>,
    },
    AssignmentExpression {
        operator: AssignOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    UpdateExpression {
        operator: UpdateOp,
        argument: Box<Node>,
        prefix: bool,
    },
    CallExpression {
        callee: Box<Node>,
        arguments: Vec<Node>,
    },
    ConditionalExpression {
        test: Box<Node>,
        consequent: Box<Node>,
        alternate: Box<Node>,
    },
    SequenceExpression {
        expressions: Vec<Node>,
    },
    /// `object[property]` when computed, `(property) object` otherwise
    MemberExpression {
        object: Box<Node>,
        property: Box<Node>,
        computed: bool,
    },
    ArrayExpression {
        elements: Vec<Node>,
    },
    FunctionExpression {
        params: Vec<Node>,
        body: Box<Node>,
    },
    /// Type annotation: primitive name plus pointer depth
    TypeTag {
        name: String,
        #[serde(default)]
        pointers: u32,
    },
}

impl NodeKind {
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::BlockStatement { .. } => "BlockStatement",
            NodeKind::ExpressionStatement { .. } => "ExpressionStatement",
            NodeKind::VariableDeclaration { .. } => "VariableDeclaration",
            NodeKind::FunctionDeclaration { .. } => "FunctionDeclaration",
            NodeKind::IfStatement { .. } => "IfStatement",
            NodeKind::WhileStatement { .. } => "WhileStatement",
            NodeKind::DoWhileStatement { .. } => "DoWhileStatement",
            NodeKind::ForStatement { .. } => "ForStatement",
            NodeKind::BreakStatement => "BreakStatement",
            NodeKind::ContinueStatement => "ContinueStatement",
            NodeKind::ReturnStatement { .. } => "ReturnStatement",
            NodeKind::Literal { .. } => "Literal",
            NodeKind::Identifier { .. } => "Identifier",
            NodeKind::BinaryExpression { .. } => "BinaryExpression",
            NodeKind::LogicalExpression { .. } => "LogicalExpression",
            NodeKind::UnaryExpression { .. } => "UnaryExpression",
            NodeKind::AssignmentExpression { .. } => "AssignmentExpression",
            NodeKind::UpdateExpression { .. } => "UpdateExpression",
            NodeKind::CallExpression { .. } => "CallExpression",
            NodeKind::ConditionalExpression { .. } => "ConditionalExpression",
            NodeKind::SequenceExpression { .. } => "SequenceExpression",
            NodeKind::MemberExpression { .. } => "MemberExpression",
            NodeKind::ArrayExpression { .. } => "ArrayExpression",
            NodeKind::FunctionExpression { .. } => "FunctionExpression",
            NodeKind::TypeTag { .. } => "TypeTag",
        }
    }
}

/// One `name = init` entry of a declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDeclarator {
    /// Name and type, in declared-name shape
    pub id: Node,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init: Option<Node>,
    /// Element count for array declarators (`int a[4]`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc: Option<Span>,
}

/// Literal values. Character literals arrive as their numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Bool(bool),
    Number(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "%")]
    Mod,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "&")]
    BitAnd,
    #[serde(rename = "|")]
    BitOr,
    #[serde(rename = "^")]
    BitXor,
    #[serde(rename = "<<")]
    Shl,
    #[serde(rename = ">>")]
    Shr,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOp {
    #[serde(rename = "&&")]
    And,
    #[serde(rename = "||")]
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    #[serde(rename = "-")]
    Neg,
    #[serde(rename = "+")]
    Plus,
    #[serde(rename = "!")]
    Not,
    #[serde(rename = "~")]
    BitNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    #[serde(rename = "=")]
    Assign,
    #[serde(rename = "+=")]
    AddAssign,
    #[serde(rename = "-=")]
    SubAssign,
    #[serde(rename = "*=")]
    MulAssign,
    #[serde(rename = "/=")]
    DivAssign,
    #[serde(rename = "%=")]
    ModAssign,
}

impl AssignOp {
    /// Arithmetic operator applied by a compound assignment
    pub fn binary(&self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::AddAssign => Some(BinaryOp::Add),
            AssignOp::SubAssign => Some(BinaryOp::Sub),
            AssignOp::MulAssign => Some(BinaryOp::Mul),
            AssignOp::DivAssign => Some(BinaryOp::Div),
            AssignOp::ModAssign => Some(BinaryOp::Mod),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateOp {
    #[serde(rename = "++")]
    Increment,
    #[serde(rename = "--")]
    Decrement,
}

/// Constructors for building trees in code.
///
/// The evaluator is normally fed parser JSON; these helpers exist for
/// embedders, tests and benchmarks that build programs directly.
pub mod build {
    use super::*;

    pub fn program(body: Vec<Node>) -> Program {
        Program::new(body)
    }

    pub fn num(value: f64) -> Node {
        Node::new(NodeKind::Literal {
            value: Literal::Number(value),
        })
    }

    pub fn boolean(value: bool) -> Node {
        Node::new(NodeKind::Literal {
            value: Literal::Bool(value),
        })
    }

    pub fn ident(name: &str) -> Node {
        Node::new(NodeKind::Identifier {
            name: name.to_string(),
        })
    }

    /// Type tag from C spelling, e.g. `"int"` or `"char **"`
    pub fn ty(spelling: &str) -> Node {
        let pointers = spelling.chars().filter(|c| *c == '*').count() as u32;
        let name = spelling.trim_end_matches(|c: char| c == '*' || c.is_whitespace());
        Node::new(NodeKind::TypeTag {
            name: name.to_string(),
            pointers,
        })
    }

    /// Declared-name shape: `name` paired with its type
    pub fn typed(spelling: &str, name: &str) -> Node {
        member(ident(name), ty(spelling), false)
    }

    pub fn member(object: Node, property: Node, computed: bool) -> Node {
        Node::new(NodeKind::MemberExpression {
            object: Box::new(object),
            property: Box::new(property),
            computed,
        })
    }

    pub fn cast(spelling: &str, expr: Node) -> Node {
        member(expr, ty(spelling), false)
    }

    pub fn index(object: Node, idx: Node) -> Node {
        member(object, idx, true)
    }

    pub fn bin(operator: BinaryOp, left: Node, right: Node) -> Node {
        Node::new(NodeKind::BinaryExpression {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn logical(operator: LogicalOp, left: Node, right: Node) -> Node {
        Node::new(NodeKind::LogicalExpression {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn unary(operator: UnaryOp, argument: Node) -> Node {
        Node::new(NodeKind::UnaryExpression {
            operator,
            argument: Box::new(argument),
        })
    }

    pub fn assign(operator: AssignOp, left: Node, right: Node) -> Node {
        Node::new(NodeKind::AssignmentExpression {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn set(name: &str, value: Node) -> Node {
        assign(AssignOp::Assign, ident(name), value)
    }

    pub fn update(operator: UpdateOp, argument: Node, prefix: bool) -> Node {
        Node::new(NodeKind::UpdateExpression {
            operator,
            argument: Box::new(argument),
            prefix,
        })
    }

    pub fn call(name: &str, arguments: Vec<Node>) -> Node {
        Node::new(NodeKind::CallExpression {
            callee: Box::new(ident(name)),
            arguments,
        })
    }

    pub fn cond(test: Node, consequent: Node, alternate: Node) -> Node {
        Node::new(NodeKind::ConditionalExpression {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    pub fn seq(expressions: Vec<Node>) -> Node {
        Node::new(NodeKind::SequenceExpression { expressions })
    }

    pub fn array(elements: Vec<Node>) -> Node {
        Node::new(NodeKind::ArrayExpression { elements })
    }

    pub fn expr(expression: Node) -> Node {
        Node::new(NodeKind::ExpressionStatement {
            expression: Box::new(expression),
        })
    }

    pub fn block(body: Vec<Node>) -> Node {
        Node::new(NodeKind::BlockStatement { body })
    }

    pub fn declarator(spelling: &str, name: &str, init: Option<Node>) -> VariableDeclarator {
        VariableDeclarator {
            id: typed(spelling, name),
            init,
            size: None,
            loc: None,
        }
    }

    pub fn declare(declarations: Vec<VariableDeclarator>) -> Node {
        Node::new(NodeKind::VariableDeclaration { declarations })
    }

    /// Single-declarator declaration, `int x = init;`
    pub fn var(spelling: &str, name: &str, init: Option<Node>) -> Node {
        declare(vec![declarator(spelling, name, init)])
    }

    /// Array declaration, `int a[size] = init;`
    pub fn array_var(spelling: &str, name: &str, size: Node, init: Option<Node>) -> Node {
        declare(vec![VariableDeclarator {
            id: typed(spelling, name),
            init,
            size: Some(size),
            loc: None,
        }])
    }

    fn params(list: &[(&str, &str)]) -> Vec<Node> {
        list.iter()
            .map(|(spelling, name)| typed(spelling, name))
            .collect()
    }

    /// `ret name(params) { body }`; params are `(type, name)` pairs
    pub fn func(ret: &str, name: &str, list: &[(&str, &str)], body: Vec<Node>) -> Node {
        Node::new(NodeKind::FunctionDeclaration {
            id: Box::new(typed(ret, name)),
            params: params(list),
            body: Box::new(block(body)),
        })
    }

    pub fn func_expr(list: &[(&str, &str)], body: Vec<Node>) -> Node {
        Node::new(NodeKind::FunctionExpression {
            params: params(list),
            body: Box::new(block(body)),
        })
    }

    pub fn if_(test: Node, consequent: Node, alternate: Option<Node>) -> Node {
        Node::new(NodeKind::IfStatement {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: alternate.map(Box::new),
        })
    }

    pub fn while_(test: Node, body: Node) -> Node {
        Node::new(NodeKind::WhileStatement {
            test: Box::new(test),
            body: Box::new(body),
        })
    }

    pub fn do_while(body: Node, test: Node) -> Node {
        Node::new(NodeKind::DoWhileStatement {
            body: Box::new(body),
            test: Box::new(test),
        })
    }

    pub fn for_(init: Option<Node>, test: Option<Node>, update: Option<Node>, body: Node) -> Node {
        Node::new(NodeKind::ForStatement {
            init: init.map(Box::new),
            test: test.map(Box::new),
            update: update.map(Box::new),
            body: Box::new(body),
        })
    }

    pub fn brk() -> Node {
        Node::new(NodeKind::BreakStatement)
    }

    pub fn cont() -> Node {
        Node::new(NodeKind::ContinueStatement)
    }

    pub fn ret(argument: Option<Node>) -> Node {
        Node::new(NodeKind::ReturnStatement {
            argument: argument.map(Box::new),
        })
    }
}
