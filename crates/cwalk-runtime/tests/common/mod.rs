//! Shared test utilities
//!
//! Programs are built with `cwalk_runtime::ast::build`; these helpers run
//! them and check the outcome.

#![allow(dead_code)]

use cwalk_runtime::ast::build::program;
use cwalk_runtime::{
    EvaluatorConfig, ExecutionState, Interpreter, Node, RuntimeError, StepAction, StepEvent,
    StepObserver, Value,
};
use std::cell::RefCell;
use std::rc::Rc;

// Re-export testing utilities
pub use pretty_assertions::{assert_eq, assert_ne};

/// Evaluate statements as a program with the default configuration
pub fn eval(body: Vec<Node>) -> Result<Value, RuntimeError> {
    Interpreter::new().eval(&program(body))
}

pub fn eval_with(config: EvaluatorConfig, body: Vec<Node>) -> Result<Value, RuntimeError> {
    Interpreter::with_config(config).eval(&program(body))
}

/// Assert that a program evaluates to a number
pub fn assert_eval_number(body: Vec<Node>, expected: f64) {
    match eval(body) {
        Ok(Value::Number(n)) => assert_eq!(n, expected, "Expected {}, got {}", expected, n),
        other => panic!("Expected Number({}), got {:?}", expected, other),
    }
}

pub fn assert_eval_bool(body: Vec<Node>, expected: bool) {
    match eval(body) {
        Ok(Value::Bool(b)) => assert_eq!(b, expected),
        other => panic!("Expected Bool({}), got {:?}", expected, other),
    }
}

/// Evaluate a program that must fail
pub fn eval_err(body: Vec<Node>) -> RuntimeError {
    match eval(body) {
        Err(error) => error,
        Ok(value) => panic!("Expected an error, got {:?}", value),
    }
}

/// One recorded suspension point
#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub event: StepEvent,
    pub step: u64,
    pub frames: usize,
    pub calls: usize,
}

/// Observer that records every suspension point and never halts
#[derive(Clone, Default)]
pub struct Recorder {
    pub events: Rc<RefCell<Vec<Recorded>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<Recorded> {
        std::mem::take(&mut *self.events.borrow_mut())
    }
}

impl StepObserver for Recorder {
    fn on_step(&mut self, event: &StepEvent, state: &ExecutionState) -> StepAction {
        self.events.borrow_mut().push(Recorded {
            event: event.clone(),
            step: state.steps(),
            frames: state.depth(),
            calls: state.call_depth(),
        });
        StepAction::Continue
    }
}
