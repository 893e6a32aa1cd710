//! Step-by-step evaluation
//!
//! The interpreter reports two suspension points per node, on entry and on
//! exit. A [`StepObserver`] sees each one together with the live state and
//! decides whether to keep going.
//!
//! [`Stepper`] builds an interactive session on top of that: evaluation is
//! deterministic, so each request replays the program from the start with a
//! [`StepTracker`] that halts at the requested point. Any earlier point can
//! be revisited with [`Stepper::seek`].

use crate::ast::Program;
use crate::environment::{ExecutionState, FrameTag, NodeSummary};
use crate::interpreter::{Interpreter, RunResult};
use crate::kind::Kind;
use crate::value::{RuntimeError, Value};
use cwalk_config::EvaluatorConfig;

// ── observer protocol ────────────────────────────────────────────────────────

/// A suspension point
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepEvent {
    /// About to evaluate the node (it is already on the node stack)
    Enter(NodeSummary),
    /// Finished evaluating the node (it has left the node stack)
    Exit(NodeSummary),
}

impl StepEvent {
    pub fn summary(&self) -> &NodeSummary {
        match self {
            StepEvent::Enter(summary) | StepEvent::Exit(summary) => summary,
        }
    }

    pub fn is_enter(&self) -> bool {
        matches!(self, StepEvent::Enter(_))
    }

    /// Nesting depth of the node the event is about
    pub fn depth(&self, state: &ExecutionState) -> usize {
        match self {
            StepEvent::Enter(_) => state.node_depth(),
            StepEvent::Exit(_) => state.node_depth() + 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    Continue,
    /// Stop the evaluation here; the state stays as it is
    Halt,
}

/// Hook invoked at every suspension point
pub trait StepObserver {
    fn on_step(&mut self, event: &StepEvent, state: &ExecutionState) -> StepAction;
}

// ── StepRequest ──────────────────────────────────────────────────────────────

/// Where the next halt should be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepRequest {
    /// The very next suspension point
    Into,
    /// The next point that is not inside the current node
    Over,
    /// The first point after the current function returns
    Out,
    /// The first entry into a node on `line`
    ToLine(u32),
    /// The point with this step number
    ToStep(u64),
    /// Never halt
    ToEnd,
}

// ── StepTracker ──────────────────────────────────────────────────────────────

/// Observer that halts once a [`StepRequest`] is satisfied
#[derive(Debug, Clone)]
pub struct StepTracker {
    request: StepRequest,
    start_step: u64,
    start_depth: usize,
    start_call_depth: usize,
}

impl StepTracker {
    /// Track `request` relative to the position described by `from`
    pub fn new(request: StepRequest, from: &Snapshot) -> Self {
        Self {
            request,
            start_step: from.step,
            start_depth: from.depth(),
            start_call_depth: from.call_depth,
        }
    }

    pub fn request(&self) -> StepRequest {
        self.request
    }

    fn should_halt(&self, event: &StepEvent, state: &ExecutionState) -> bool {
        let step = state.steps();
        if let StepRequest::ToStep(target) = self.request {
            return step >= target;
        }
        if step <= self.start_step {
            return false;
        }
        match self.request {
            StepRequest::Into => true,
            StepRequest::Over => event.depth(state) <= self.start_depth,
            StepRequest::Out => state.call_depth() < self.start_call_depth,
            StepRequest::ToLine(line) => {
                event.is_enter() && event.summary().loc.map(|loc| loc.line) == Some(line)
            }
            StepRequest::ToStep(_) | StepRequest::ToEnd => false,
        }
    }
}

impl StepObserver for StepTracker {
    fn on_step(&mut self, event: &StepEvent, state: &ExecutionState) -> StepAction {
        if self.should_halt(event, state) {
            StepAction::Halt
        } else {
            StepAction::Continue
        }
    }
}

// ── Snapshot ─────────────────────────────────────────────────────────────────

/// Rendered binding, for display
#[derive(Debug, Clone, PartialEq)]
pub struct BindingView {
    pub name: String,
    pub kind: Kind,
    /// `Display` of the value; unforced thunks render as `<thunk>`
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameView {
    pub id: u32,
    pub tag: FrameTag,
    /// Sorted by name
    pub bindings: Vec<BindingView>,
}

/// Program state at a suspension point or at the end of the run
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub step: u64,
    /// `None` before the first step
    pub event: Option<StepEvent>,
    /// Nodes under evaluation, most recent first
    pub node_stack: Vec<NodeSummary>,
    /// Frame chain, global frame first
    pub frames: Vec<FrameView>,
    pub call_depth: usize,
    pub errors: Vec<RuntimeError>,
    pub output: String,
    /// Program value, once finished without error
    pub result: Option<Value>,
    pub finished: bool,
}

impl Snapshot {
    /// Position before anything ran
    fn initial() -> Self {
        Self {
            step: 0,
            event: None,
            node_stack: Vec::new(),
            frames: Vec::new(),
            call_depth: 0,
            errors: Vec::new(),
            output: String::new(),
            result: None,
            finished: false,
        }
    }

    /// Capture `state`. `outcome` is `None` while halted.
    pub fn capture(state: &ExecutionState, outcome: Option<Result<Value, RuntimeError>>) -> Self {
        let frames = state
            .environments()
            .iter()
            .map(|env| FrameView {
                id: env.id,
                tag: env.tag.clone(),
                bindings: env
                    .names()
                    .into_iter()
                    .filter_map(|name| {
                        env.get(&name).map(|binding| BindingView {
                            value: binding.value.to_string(),
                            kind: binding.kind,
                            name,
                        })
                    })
                    .collect(),
            })
            .collect();

        Self {
            step: state.steps(),
            event: state.last_event().cloned(),
            node_stack: state.node_stack().cloned().collect(),
            frames,
            call_depth: state.call_depth(),
            errors: state.errors().to_vec(),
            output: state.output().to_string(),
            finished: outcome.is_some(),
            result: outcome.and_then(Result::ok),
        }
    }

    /// Depth of the node the snapshot is positioned on
    pub fn depth(&self) -> usize {
        match &self.event {
            Some(StepEvent::Exit(_)) => self.node_stack.len() + 1,
            _ => self.node_stack.len(),
        }
    }

    /// Innermost frame binding `name`
    pub fn binding(&self, name: &str) -> Option<&BindingView> {
        self.frames
            .iter()
            .rev()
            .flat_map(|frame| frame.bindings.iter())
            .find(|binding| binding.name == name)
    }
}

// ── Stepper ──────────────────────────────────────────────────────────────────

/// Interactive stepping session over one program
pub struct Stepper {
    program: Program,
    config: EvaluatorConfig,
    current: Snapshot,
}

impl Stepper {
    pub fn new(program: Program, config: EvaluatorConfig) -> Self {
        Self {
            program,
            config,
            current: Snapshot::initial(),
        }
    }

    /// Current position
    pub fn snapshot(&self) -> &Snapshot {
        &self.current
    }

    pub fn is_finished(&self) -> bool {
        self.current.finished
    }

    /// Advance to the next suspension point
    pub fn step(&mut self) -> &Snapshot {
        self.resume(StepRequest::Into)
    }

    /// Advance past the current node
    pub fn step_over(&mut self) -> &Snapshot {
        self.resume(StepRequest::Over)
    }

    /// Advance until the current function has returned
    pub fn step_out(&mut self) -> &Snapshot {
        self.resume(StepRequest::Out)
    }

    pub fn run_to_line(&mut self, line: u32) -> &Snapshot {
        self.resume(StepRequest::ToLine(line))
    }

    pub fn run_to_end(&mut self) -> &Snapshot {
        self.resume(StepRequest::ToEnd)
    }

    /// Jump to step `step`, forwards or backwards. Step 0 is the initial
    /// position.
    pub fn seek(&mut self, step: u64) -> &Snapshot {
        if step == 0 {
            self.current = Snapshot::initial();
            return &self.current;
        }
        self.replay(StepRequest::ToStep(step));
        &self.current
    }

    fn resume(&mut self, request: StepRequest) -> &Snapshot {
        if !self.current.finished {
            self.replay(request);
        }
        &self.current
    }

    fn replay(&mut self, request: StepRequest) {
        let tracker = StepTracker::new(request, &self.current);
        let mut interp = Interpreter::with_config(self.config.clone());
        interp.set_observer(Box::new(tracker));

        let outcome = match interp.execute(&self.program) {
            Ok(RunResult::Halted) => None,
            Ok(RunResult::Completed(value)) => Some(Ok(value)),
            Err(error) => Some(Err(error)),
        };
        tracing::trace!(?request, step = interp.state().steps(), "replayed");
        self.current = Snapshot::capture(interp.state(), outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::*;
    use crate::ast::BinaryOp;
    use pretty_assertions::assert_eq;

    fn two_statements() -> Program {
        program(vec![
            var("int", "x", Some(bin(BinaryOp::Add, num(1.0), num(2.0)))),
            expr(set("x", num(9.0))),
        ])
    }

    #[test]
    fn test_first_step_enters_program() {
        let mut stepper = Stepper::new(two_statements(), EvaluatorConfig::default());
        let snapshot = stepper.step();
        assert_eq!(snapshot.step, 1);
        assert_eq!(snapshot.event.as_ref().map(|e| e.summary().label), Some("Program"));
        assert!(!snapshot.finished);
    }

    #[test]
    fn test_step_over_skips_subtree() {
        let mut stepper = Stepper::new(two_statements(), EvaluatorConfig::default());
        stepper.step();
        let decl = stepper.step().clone();
        assert_eq!(decl.event, Some(StepEvent::Enter(NodeSummary {
            label: "VariableDeclaration",
            loc: None,
        })));
        let after = stepper.step_over();
        assert!(matches!(&after.event, Some(StepEvent::Exit(s)) if s.label == "VariableDeclaration"));
        assert_eq!(after.binding("x").map(|b| b.value.as_str()), Some("3"));
    }

    #[test]
    fn test_run_to_end_and_seek_back() {
        let mut stepper = Stepper::new(two_statements(), EvaluatorConfig::default());
        let end = stepper.run_to_end().clone();
        assert!(end.finished);
        assert_eq!(end.result, Some(Value::Number(9.0)));
        assert_eq!(end.node_stack, vec![]);

        let third = stepper.seek(3).clone();
        assert_eq!(third.step, 3);
        assert!(!third.finished);
        let mut fresh = Stepper::new(two_statements(), EvaluatorConfig::default());
        fresh.step();
        fresh.step();
        assert_eq!(fresh.step(), &third);
    }

    #[test]
    fn test_finished_session_stays_put() {
        let mut stepper = Stepper::new(two_statements(), EvaluatorConfig::default());
        let end = stepper.run_to_end().clone();
        assert_eq!(stepper.step(), &end);
    }

    #[test]
    fn test_seek_zero_is_initial() {
        let mut stepper = Stepper::new(two_statements(), EvaluatorConfig::default());
        stepper.step();
        assert_eq!(stepper.seek(0).step, 0);
        assert_eq!(stepper.snapshot().event, None);
    }
}
