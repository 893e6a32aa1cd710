//! Call/return protocol
//!
//! A call pushes a [`CallBoundary`] recording the caller's top frame, then a
//! frame rooted at the global frame for the parameters. The body's `Return`
//! completion is consumed here. Before returning, the chain must be exactly
//! as it was at the call site.

use crate::ast::{Node, NodeKind};
use crate::environment::{CallBoundary, FrameTag};
use crate::interpreter::{Completion, EvalResult, Interpreter};
use crate::kind::{cast, Kind};
use crate::span::Span;
use crate::thunk;
use crate::value::{Closure, NativeFunction, RuntimeError, Value};
use std::rc::Rc;

enum Callee {
    Closure(Rc<Closure>),
    Native(NativeFunction),
}

impl Interpreter {
    pub(super) fn eval_call(
        &mut self,
        callee: &Node,
        arguments: &[Node],
        span: Option<Span>,
    ) -> EvalResult<Value> {
        let name = match &callee.kind {
            NodeKind::Identifier { name } => name,
            other => {
                return Err(RuntimeError::NotCallable {
                    name: other.label().to_string(),
                    span,
                }
                .into())
            }
        };

        // Functions live in the global frame; the declared return kind is
        // read before any argument is bound
        let binding = self
            .state
            .global()
            .get(name)
            .ok_or_else(|| RuntimeError::UndefinedFunction {
                name: name.clone(),
                span: callee.loc.or(span),
            })?;
        let target = match binding.value {
            Value::Closure(closure) => Callee::Closure(closure),
            Value::Native(native) => Callee::Native(native),
            _ => {
                return Err(RuntimeError::NotCallable {
                    name: name.clone(),
                    span,
                }
                .into())
            }
        };

        let mut args = Vec::with_capacity(arguments.len());
        for argument in arguments {
            args.push(self.actual_value(argument)?);
        }

        match target {
            Callee::Closure(closure) => self.call_closure(name, &closure, binding.kind, args, span),
            Callee::Native(native) => Ok(call_native(native, args, &mut self.state, span)?),
        }
    }

    fn call_closure(
        &mut self,
        name: &str,
        closure: &Closure,
        ret: Kind,
        args: Vec<Value>,
        span: Option<Span>,
    ) -> EvalResult<Value> {
        if args.len() != closure.params.len() {
            return Err(RuntimeError::ArityMismatch {
                name: name.to_string(),
                expected: closure.params.len(),
                received: args.len(),
                span,
            }
            .into());
        }
        let limit = self.config().max_call_depth;
        if self.state.call_depth() >= limit {
            return Err(RuntimeError::StackOverflow { limit, span }.into());
        }

        let caller_env = self.state.peek_top().id;
        let global = Rc::clone(self.state.global());
        let frame = self
            .state
            .push_rooted(FrameTag::Call(name.to_string()), global);
        self.state.push_call(CallBoundary {
            function: name.to_string(),
            caller_env,
            frame_env: frame.id,
        });
        tracing::debug!(function = name, depth = self.state.call_depth(), "call");

        for (param, arg) in closure.params.iter().zip(args) {
            let value = cast(arg, param.kind, span)?;
            self.state.declare(&param.name, param.kind, value, span)?;
        }

        let body = Rc::clone(&closure.body);
        let value = match self.eval_node(&body)? {
            Completion::Return(value) => thunk::force(value, self)?,
            Completion::Normal(value) => {
                let value = thunk::force(value, self)?;
                if matches!(value, Value::Void) && !ret.is_void() {
                    tracing::warn!(
                        function = name,
                        kind = %ret,
                        "control reaches end of non-void function"
                    );
                }
                value
            }
            Completion::Break(span) => {
                return Err(RuntimeError::JumpOutsideLoop {
                    keyword: "break",
                    span,
                }
                .into())
            }
            Completion::Continue(span) => {
                return Err(RuntimeError::JumpOutsideLoop {
                    keyword: "continue",
                    span,
                }
                .into())
            }
        };
        // A missing result stays void whatever the declared kind
        let result = match value {
            Value::Void => Value::Void,
            value => cast(value, ret, span)?,
        };

        let top = self.state.peek_top().id;
        if top != frame.id {
            return Err(RuntimeError::invariant(format!(
                "call to `{name}` returned with frame {top} on top instead of {}",
                frame.id
            ))
            .into());
        }
        self.state.pop(frame.id)?;
        let boundary = self
            .state
            .pop_call()
            .ok_or_else(|| RuntimeError::invariant(format!("call boundary for `{name}` missing")))?;
        let top = self.state.peek_top().id;
        if boundary.frame_env != frame.id || top != boundary.caller_env {
            return Err(RuntimeError::invariant(format!(
                "return from `{name}` landed in frame {top}, caller was {}",
                boundary.caller_env
            ))
            .into());
        }

        tracing::debug!(function = name, result = %result, "return");
        Ok(result)
    }
}

fn call_native(
    native: NativeFunction,
    args: Vec<Value>,
    state: &mut crate::environment::ExecutionState,
    span: Option<Span>,
) -> Result<Value, RuntimeError> {
    if args.len() != native.params.len() {
        return Err(RuntimeError::ArityMismatch {
            name: native.name.to_string(),
            expected: native.params.len(),
            received: args.len(),
            span,
        });
    }
    let args = args
        .into_iter()
        .zip(native.params)
        .map(|(arg, kind)| cast(arg, *kind, span))
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(builtin = native.name, "call");
    let result = (native.func)(&args, state)?;
    cast(result, native.ret, span)
}
