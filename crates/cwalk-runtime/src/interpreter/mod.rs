//! AST interpreter (tree-walking)
//!
//! Every node goes through `Interpreter::visit`, which brackets the
//! evaluation with an entry and an exit suspension point. A
//! [`StepObserver`] installed on the interpreter sees both and may halt the
//! run; the stepper is built on that hook.
//!
//! Statement evaluators report how control leaves them with a `Completion`.
//! Loops consume `Break`/`Continue`, calls consume `Return`, and every
//! construct that pushed a frame pops it before handing the completion on.

mod call;
mod expr;
mod stmt;

use crate::ast::{build, Node, NodeKind, Program};
use crate::environment::{ExecutionState, FrameTag, NodeSummary};
use crate::stack;
use crate::stdlib;
use crate::stepper::{StepAction, StepEvent, StepObserver};
use crate::thunk;
use crate::value::{RuntimeError, Value};
use cwalk_config::EvaluatorConfig;

/// How a statement finished
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Completion {
    Normal(Value),
    Break(Option<crate::span::Span>),
    Continue(Option<crate::span::Span>),
    Return(Value),
}

/// Why evaluation stopped early
#[derive(Debug)]
pub(crate) enum Interrupt {
    Error(RuntimeError),
    /// The observer asked to stop; the state is left as it was
    Halted,
}

impl From<RuntimeError> for Interrupt {
    fn from(error: RuntimeError) -> Self {
        Interrupt::Error(error)
    }
}

pub(crate) type EvalResult<T> = Result<T, Interrupt>;

/// Outcome of [`Interpreter::execute`]
#[derive(Debug, Clone, PartialEq)]
pub enum RunResult {
    Completed(Value),
    /// Stopped by the step observer before the program finished
    Halted,
}

/// Interpreter state
pub struct Interpreter {
    pub(crate) state: ExecutionState,
    config: EvaluatorConfig,
    observer: Option<Box<dyn StepObserver>>,
}

impl Interpreter {
    /// Create an interpreter with the default configuration
    pub fn new() -> Self {
        Self::with_config(EvaluatorConfig::default())
    }

    pub fn with_config(config: EvaluatorConfig) -> Self {
        let state = ExecutionState::new();
        stdlib::seed_globals(&state);
        Self {
            state,
            config,
            observer: None,
        }
    }

    /// Install an observer notified at every suspension point
    pub fn set_observer(&mut self, observer: Box<dyn StepObserver>) {
        self.observer = Some(observer);
    }

    pub fn take_observer(&mut self) -> Option<Box<dyn StepObserver>> {
        self.observer.take()
    }

    pub fn state(&self) -> &ExecutionState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ExecutionState {
        &mut self.state
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Evaluate a program.
    ///
    /// On error the state records it and unwinds to the global frame before
    /// the error is returned, so the interpreter stays usable.
    pub fn eval(&mut self, program: &Program) -> Result<Value, RuntimeError> {
        match self.execute(program)? {
            RunResult::Completed(value) => Ok(value),
            RunResult::Halted => Err(RuntimeError::Halted),
        }
    }

    /// Evaluate a program, reporting observer halts separately from errors
    pub fn execute(&mut self, program: &Program) -> Result<RunResult, RuntimeError> {
        self.state.begin_evaluation();
        match self.eval_program(program) {
            Ok(value) => Ok(RunResult::Completed(value)),
            Err(Interrupt::Halted) => Ok(RunResult::Halted),
            Err(Interrupt::Error(error)) => {
                self.state.recover(error.clone());
                Err(error)
            }
        }
    }

    /// Reduce a possibly lazy value to a plain one
    pub fn force(&mut self, value: Value) -> Result<Value, RuntimeError> {
        match thunk::force(value, self) {
            Ok(value) => Ok(value),
            Err(Interrupt::Error(error)) => Err(error),
            Err(Interrupt::Halted) => Err(RuntimeError::Halted),
        }
    }

    fn eval_program(&mut self, program: &Program) -> EvalResult<Value> {
        let summary = NodeSummary {
            label: "Program",
            loc: program.loc,
        };
        self.enter(summary.clone())?;

        let mut last = Value::Void;
        for item in &program.body {
            match self.eval_node(item)? {
                Completion::Normal(value) => last = value,
                Completion::Return(value) => {
                    self.exit(summary)?;
                    return Ok(value);
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
            }
        }
        let mut result = thunk::force(last, self)?;

        if let Some(entry) = self.config.entry_point.clone() {
            if defines_function(program, &entry) {
                tracing::debug!(entry = %entry, "calling entry point");
                let call = build::call(&entry, Vec::new());
                result = self.actual_value(&call)?;
            }
        }

        self.exit(summary)?;
        Ok(result)
    }

    // ── dispatch ─────────────────────────────────────────────────────────────

    /// Evaluate a node; plain blocks get a `Block` frame
    pub(crate) fn eval_node(&mut self, node: &Node) -> EvalResult<Completion> {
        self.visit(node, FrameTag::Block)
    }

    /// Evaluate a node between its two suspension points. `tag` labels the
    /// frame pushed if the node is a block.
    pub(crate) fn visit(&mut self, node: &Node, tag: FrameTag) -> EvalResult<Completion> {
        stack::ensure_sufficient_stack(|| {
            let summary = NodeSummary::of(node);
            self.enter(summary.clone())?;
            let completion = self.dispatch(node, tag)?;
            self.exit(summary)?;
            Ok(completion)
        })
    }

    fn dispatch(&mut self, node: &Node, tag: FrameTag) -> EvalResult<Completion> {
        let span = node.loc;
        let value = match &node.kind {
            NodeKind::BlockStatement { body } => return self.eval_block(body, tag),
            NodeKind::ExpressionStatement { expression } => self.eval_expr(expression)?,
            NodeKind::VariableDeclaration { declarations } => {
                self.eval_var_decl(declarations, span)?
            }
            NodeKind::FunctionDeclaration { id, params, body } => {
                self.eval_function_decl(id, params, body, span)?
            }
            NodeKind::IfStatement {
                test,
                consequent,
                alternate,
            } => return self.eval_if(test, consequent, alternate.as_deref()),
            NodeKind::WhileStatement { test, body } => return self.eval_while(test, body),
            NodeKind::DoWhileStatement { body, test } => return self.eval_do_while(body, test),
            NodeKind::ForStatement {
                init,
                test,
                update,
                body,
            } => {
                return self.eval_for(init.as_deref(), test.as_deref(), update.as_deref(), body)
            }
            NodeKind::BreakStatement => return Ok(Completion::Break(span)),
            NodeKind::ContinueStatement => return Ok(Completion::Continue(span)),
            NodeKind::ReturnStatement { argument } => {
                let value = match argument {
                    Some(argument) => self.actual_value(argument)?,
                    None => Value::Void,
                };
                return Ok(Completion::Return(value));
            }
            _ => self.eval_expression_kind(node)?,
        };
        Ok(Completion::Normal(value))
    }

    /// Evaluate an expression node to its (possibly lazy) value
    pub(crate) fn eval_expr(&mut self, node: &Node) -> EvalResult<Value> {
        match self.eval_node(node)? {
            Completion::Normal(value) => Ok(value),
            other => Err(RuntimeError::invariant(format!(
                "expression {} completed with {other:?}",
                node.label()
            ))
            .into()),
        }
    }

    /// Evaluate and force
    pub(crate) fn actual_value(&mut self, node: &Node) -> EvalResult<Value> {
        let value = self.eval_expr(node)?;
        thunk::force(value, self)
    }

    // ── suspension points ────────────────────────────────────────────────────

    fn enter(&mut self, summary: NodeSummary) -> EvalResult<()> {
        self.state.enter_node(summary.clone());
        if let Some(limit) = self.config.max_steps {
            if self.state.steps() > limit {
                return Err(RuntimeError::StepLimitExceeded { limit }.into());
            }
        }
        self.suspend(StepEvent::Enter(summary))
    }

    fn exit(&mut self, summary: NodeSummary) -> EvalResult<()> {
        self.state.leave_node();
        self.suspend(StepEvent::Exit(summary))
    }

    fn suspend(&mut self, event: StepEvent) -> EvalResult<()> {
        self.state.set_last_event(event.clone());
        if let Some(observer) = self.observer.as_mut() {
            if observer.on_step(&event, &self.state) == StepAction::Halt {
                return Err(Interrupt::Halted);
            }
        }
        Ok(())
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn defines_function(program: &Program, name: &str) -> bool {
    program.body.iter().any(|item| match &item.kind {
        NodeKind::FunctionDeclaration { id, .. } => {
            matches!(crate::kind::declared_name(id), Ok((declared, _)) if declared == name)
        }
        _ => false,
    })
}
