//! cwalk Runtime - tree-walking evaluator for a small C subset
//!
//! This library provides:
//! - An ESTree-shaped syntax tree, deserialized from parser JSON
//! - Declared C types and the casts applied on assignment, calls and returns
//! - Frame-based environments with call boundaries
//! - Lazy declarations backed by memoizing thunks
//! - Step-by-step evaluation with inspectable snapshots

/// cwalk runtime version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod ast;
pub mod environment;
pub mod interpreter;
pub mod kind;
pub mod runtime;
pub mod span;
mod stack;
pub mod stdlib;
pub mod stepper;
pub mod thunk;
pub mod value;

// Re-export commonly used types
pub use ast::{Node, NodeKind, Program};
pub use cwalk_config::{EvaluatorConfig, Strategy};
pub use environment::{Binding, CallBoundary, Environment, ExecutionState, FrameTag, LoopKind};
pub use interpreter::{Interpreter, RunResult};
pub use kind::{cast, to_kind, Kind, Primitive};
pub use runtime::{run, run_with_config, EvalError, Runtime};
pub use span::Span;
pub use stepper::{
    Snapshot, StepAction, StepEvent, StepObserver, StepRequest, StepTracker, Stepper,
};
pub use thunk::Thunk;
pub use value::{Closure, NativeFunction, Param, RuntimeError, Value};
