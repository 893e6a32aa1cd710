//! Deferred values
//!
//! A [`Thunk`] pairs an expression with the frame it was created in. Forcing
//! re-enters that frame, evaluates the expression through the normal
//! dispatcher (so stepping sees it), pops the frame and memoizes the result.
//! A thunk is evaluated at most once.

use crate::ast::Node;
use crate::environment::Environment;
use crate::interpreter::{Interpreter, Interrupt};
use crate::value::{RuntimeError, Value};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

enum ThunkState {
    Pending(Rc<Environment>),
    /// Evaluation in progress; the frame is kept so a failed force can be retried
    Forcing(Rc<Environment>),
    Forced(Value),
}

/// Memoizing suspended computation
pub struct Thunk {
    expression: Rc<Node>,
    state: ThunkState,
}

impl Thunk {
    /// Suspend `expression` in `env`
    pub fn new(expression: Rc<Node>, env: Rc<Environment>) -> Self {
        Self {
            expression,
            state: ThunkState::Pending(env),
        }
    }

    /// Wrap into a shareable value
    pub fn into_value(self) -> Value {
        Value::Lazy(Rc::new(RefCell::new(self)))
    }

    pub fn expression(&self) -> &Node {
        &self.expression
    }

    pub fn is_forced(&self) -> bool {
        matches!(self.state, ThunkState::Forced(_))
    }

    /// Result of an earlier force, if any
    pub fn memoized(&self) -> Option<&Value> {
        match &self.state {
            ThunkState::Forced(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Debug for Thunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            ThunkState::Pending(env) => format!("pending in frame {}", env.id),
            ThunkState::Forcing(env) => format!("forcing in frame {}", env.id),
            ThunkState::Forced(value) => format!("forced: {value}"),
        };
        f.debug_struct("Thunk")
            .field("expression", &self.expression.label())
            .field("state", &state)
            .finish()
    }
}

/// Reduce `value` to a non-thunk value
pub(crate) fn force(value: Value, interp: &mut Interpreter) -> Result<Value, Interrupt> {
    let thunk = match value {
        Value::Lazy(thunk) => thunk,
        other => return Ok(other),
    };

    let (expression, env) = {
        let mut cell = thunk.borrow_mut();
        let env = match &cell.state {
            ThunkState::Forced(value) => return Ok(value.clone()),
            ThunkState::Forcing(_) => {
                return Err(RuntimeError::CyclicThunk {
                    span: cell.expression.loc,
                }
                .into())
            }
            ThunkState::Pending(env) => Rc::clone(env),
        };
        cell.state = ThunkState::Forcing(Rc::clone(&env));
        (Rc::clone(&cell.expression), env)
    };

    let id = env.id;
    interp.state.reenter(Rc::clone(&env));
    let result = match interp.actual_value(&expression) {
        Ok(value) => value,
        Err(interrupt) => {
            thunk.borrow_mut().state = ThunkState::Pending(env);
            return Err(interrupt);
        }
    };
    interp.state.pop(id)?;

    tracing::trace!(frame = id, "thunk forced");
    thunk.borrow_mut().state = ThunkState::Forced(result.clone());
    Ok(result)
}
