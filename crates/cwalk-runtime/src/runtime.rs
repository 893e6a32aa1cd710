//! cwalk runtime API for embedding

use crate::ast::Program;
use crate::environment::ExecutionState;
use crate::interpreter::Interpreter;
use crate::value::{RuntimeError, Value};
use cwalk_config::{ConfigError, ConfigLoader, EvaluatorConfig};
use std::cell::RefCell;
use std::path::Path;
use thiserror::Error;

/// Failure of [`Runtime::eval_json`]
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("Invalid syntax tree: {0}")]
    InvalidTree(#[from] serde_json::Error),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Persistent evaluator instance
///
/// Successive evaluations share one global frame, so functions and globals
/// declared by one program are visible to the next.
///
/// # Examples
///
/// ```
/// use cwalk_runtime::ast::build::*;
/// use cwalk_runtime::{Runtime, Value};
///
/// let runtime = Runtime::new();
/// runtime.eval(&program(vec![var("int", "x", Some(num(2.0)))])).unwrap();
/// let result = runtime.eval(&program(vec![expr(ident("x"))]));
/// assert_eq!(result, Ok(Value::Number(2.0)));
/// ```
pub struct Runtime {
    /// Interpreter for executing programs (using interior mutability)
    interpreter: RefCell<Interpreter>,
}

impl Runtime {
    /// Create a runtime with the default configuration
    pub fn new() -> Self {
        Self::with_config(EvaluatorConfig::default())
    }

    pub fn with_config(config: EvaluatorConfig) -> Self {
        Self {
            interpreter: RefCell::new(Interpreter::with_config(config)),
        }
    }

    /// Create a runtime configured by the `cwalk.toml` governing `dir`
    pub fn from_directory(dir: &Path) -> Result<Self, ConfigError> {
        let config = ConfigLoader::new().load_from_directory(dir)?;
        Ok(Self::with_config(config.evaluator))
    }

    /// Evaluate a program
    ///
    /// A failed evaluation is recorded in [`Runtime::errors`] and leaves the
    /// runtime ready for the next one.
    pub fn eval(&self, program: &Program) -> Result<Value, RuntimeError> {
        self.interpreter.borrow_mut().eval(program)
    }

    /// Evaluate a program given as parser JSON
    pub fn eval_json(&self, json: &str) -> Result<Value, EvalError> {
        let program = Program::from_json(json)?;
        Ok(self.eval(&program)?)
    }

    /// Errors recorded so far, oldest first
    pub fn errors(&self) -> Vec<RuntimeError> {
        self.interpreter.borrow().state().errors().to_vec()
    }

    /// Output written by built-ins since the last call
    pub fn take_output(&self) -> String {
        self.interpreter.borrow_mut().state_mut().take_output()
    }

    /// Run `f` against the current state
    pub fn inspect<R>(&self, f: impl FnOnce(&ExecutionState) -> R) -> R {
        f(self.interpreter.borrow().state())
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

/// Evaluate `program` once with the default configuration.
///
/// Returns the program value (`None` if evaluation failed) and every error
/// recorded on the way.
///
/// # Examples
///
/// ```
/// use cwalk_runtime::ast::build::*;
/// use cwalk_runtime::{run, RuntimeError};
///
/// let (value, errors) = run(&program(vec![expr(ident("nope"))]));
/// assert!(value.is_none());
/// assert!(matches!(errors[..], [RuntimeError::UndefinedVariable { .. }]));
/// ```
pub fn run(program: &Program) -> (Option<Value>, Vec<RuntimeError>) {
    run_with_config(program, EvaluatorConfig::default())
}

pub fn run_with_config(
    program: &Program,
    config: EvaluatorConfig,
) -> (Option<Value>, Vec<RuntimeError>) {
    let mut interpreter = Interpreter::with_config(config);
    let value = interpreter.eval(program).ok();
    (value, interpreter.state().errors().to_vec())
}
