//! Frames and the shared execution state
//!
//! [`ExecutionState`] is the interpreter's register file: the live chain of
//! frames, the call-boundary stack, the node stack used for stepping, and the
//! accumulated errors. Evaluators mutate it in place.
//!
//! Name lookup starts at the top of the chain and follows `parent` links, so a
//! call frame (whose parent is the global frame) sees only its own locals and
//! the globals, never its caller's locals.

use crate::ast::Node;
use crate::kind::Kind;
use crate::span::Span;
use crate::stepper::StepEvent;
use crate::value::{RuntimeError, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Frame identifier; strictly increasing in creation order
pub type EnvId = u32;

/// Id of the permanent global frame
pub const GLOBAL_ENV_ID: EnvId = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopKind {
    For,
    While,
    DoWhile,
}

impl LoopKind {
    pub fn name(&self) -> &'static str {
        match self {
            LoopKind::For => "for",
            LoopKind::While => "while",
            LoopKind::DoWhile => "do-while",
        }
    }
}

/// Why a frame exists
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FrameTag {
    /// The permanent outermost frame
    Global,
    /// Plain `{ ... }` block
    Block,
    /// Frame owned by a loop (its header or one iteration of its body)
    Loop(LoopKind),
    /// Frame of an invocation of the named function
    Call(String),
}

impl FrameTag {
    pub fn is_permanent(&self) -> bool {
        matches!(self, FrameTag::Global)
    }
}

impl fmt::Display for FrameTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameTag::Global => write!(f, "global"),
            FrameTag::Block => write!(f, "block"),
            FrameTag::Loop(kind) => write!(f, "{}", kind.name()),
            FrameTag::Call(name) => write!(f, "call {name}"),
        }
    }
}

/// A name's declared kind and current value
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub kind: Kind,
    pub value: Value,
}

/// A lexical scope
pub struct Environment {
    pub id: EnvId,
    pub tag: FrameTag,
    pub parent: Option<Rc<Environment>>,
    bindings: RefCell<HashMap<String, Binding>>,
}

impl Environment {
    fn new(id: EnvId, tag: FrameTag, parent: Option<Rc<Environment>>) -> Self {
        Self {
            id,
            tag,
            parent,
            bindings: RefCell::new(HashMap::new()),
        }
    }

    pub fn get(&self, name: &str) -> Option<Binding> {
        self.bindings.borrow().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.borrow().contains_key(name)
    }

    /// Names bound in this frame, sorted for stable display
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bindings.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.bindings.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.borrow().is_empty()
    }

    pub(crate) fn insert(&self, name: String, binding: Binding) {
        self.bindings.borrow_mut().insert(name, binding);
    }

    /// Replace the value of an existing binding, keeping its kind
    pub(crate) fn set_value(&self, name: &str, value: Value) -> bool {
        match self.bindings.borrow_mut().get_mut(name) {
            Some(binding) => {
                binding.value = value;
                true
            }
            None => false,
        }
    }

    fn clear(&self) {
        self.bindings.borrow_mut().clear();
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("id", &self.id)
            .field("tag", &self.tag)
            .field("parent", &self.parent.as_ref().map(|p| p.id))
            .field("names", &self.names())
            .finish()
    }
}

/// Marker for one active invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallBoundary {
    pub function: String,
    /// Top frame at the call site
    pub caller_env: EnvId,
    /// Frame created for the call
    pub frame_env: EnvId,
}

/// Lightweight record of a node under evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSummary {
    pub label: &'static str,
    pub loc: Option<Span>,
}

impl NodeSummary {
    pub fn of(node: &Node) -> Self {
        Self {
            label: node.label(),
            loc: node.loc,
        }
    }
}

/// Interpreter state shared by all evaluators
#[derive(Debug)]
pub struct ExecutionState {
    node_stack: Vec<NodeSummary>,
    environments: Vec<Rc<Environment>>,
    call_boundaries: Vec<CallBoundary>,
    errors: Vec<RuntimeError>,
    outer_environment_count: usize,
    next_env_id: EnvId,
    output: String,
    steps: u64,
    last_event: Option<StepEvent>,
}

impl ExecutionState {
    /// Fresh state holding only the (empty) global frame
    pub fn new() -> Self {
        let global = Rc::new(Environment::new(GLOBAL_ENV_ID, FrameTag::Global, None));
        Self {
            node_stack: Vec::new(),
            environments: vec![global],
            call_boundaries: Vec::new(),
            errors: Vec::new(),
            outer_environment_count: 1,
            next_env_id: GLOBAL_ENV_ID + 1,
            output: String::new(),
            steps: 0,
            last_event: None,
        }
    }

    // ── frame chain ──────────────────────────────────────────────────────────

    /// Push a new frame whose parent is the current top
    pub fn push(&mut self, tag: FrameTag) -> Rc<Environment> {
        let parent = Rc::clone(self.peek_top());
        self.push_rooted(tag, parent)
    }

    /// Push a new frame with an explicit parent
    pub fn push_rooted(&mut self, tag: FrameTag, parent: Rc<Environment>) -> Rc<Environment> {
        let id = self.next_env_id;
        self.next_env_id += 1;
        let env = Rc::new(Environment::new(id, tag, Some(parent)));
        tracing::trace!(id, tag = %env.tag, "push frame");
        self.environments.push(Rc::clone(&env));
        env
    }

    /// Make an existing frame the top again (thunk forcing)
    pub fn reenter(&mut self, env: Rc<Environment>) {
        tracing::trace!(id = env.id, "re-enter frame");
        self.environments.push(env);
    }

    /// Pop the top frame, which must be `expected`
    pub fn pop(&mut self, expected: EnvId) -> Result<(), RuntimeError> {
        if self.environments.len() <= self.outer_environment_count {
            return Err(RuntimeError::invariant(format!(
                "attempt to pop permanent frame while expecting frame {expected}"
            )));
        }
        let top_id = self.peek_top().id;
        if top_id != expected {
            return Err(RuntimeError::invariant(format!(
                "frame mismatch: expected {expected} on top, found {top_id}"
            )));
        }
        if let Some(env) = self.environments.pop() {
            tracing::trace!(id = env.id, "pop frame");
            // A frame leaving the chain for good may hold thunks that point
            // back at it; dropping its bindings breaks that cycle.
            if !self.environments.iter().any(|e| e.id == env.id) {
                env.clear();
            }
        }
        Ok(())
    }

    pub fn peek_top(&self) -> &Rc<Environment> {
        // The global frame is never popped
        &self.environments[self.environments.len() - 1]
    }

    pub fn global(&self) -> &Rc<Environment> {
        &self.environments[0]
    }

    /// Active frames, outermost first
    pub fn environments(&self) -> &[Rc<Environment>] {
        &self.environments
    }

    pub fn depth(&self) -> usize {
        self.environments.len()
    }

    pub fn outer_environment_count(&self) -> usize {
        self.outer_environment_count
    }

    // ── bindings ─────────────────────────────────────────────────────────────

    /// Nearest frame, from the top along parent links, that binds `name`
    pub fn lookup_frame(&self, name: &str) -> Option<Rc<Environment>> {
        let mut current = Some(Rc::clone(self.peek_top()));
        while let Some(env) = current {
            if env.contains(name) {
                return Some(env);
            }
            current = env.parent.clone();
        }
        None
    }

    pub fn lookup(&self, name: &str, span: Option<Span>) -> Result<Binding, RuntimeError> {
        self.lookup_frame(name)
            .and_then(|env| env.get(name))
            .ok_or_else(|| RuntimeError::UndefinedVariable {
                name: name.to_string(),
                span,
            })
    }

    /// Declare `name` in the top frame
    pub fn declare(
        &mut self,
        name: &str,
        kind: Kind,
        value: Value,
        span: Option<Span>,
    ) -> Result<(), RuntimeError> {
        let top = self.peek_top();
        Self::declare_in(top, name, kind, value, span)
    }

    /// Declare `name` in the global frame
    pub fn declare_global(
        &mut self,
        name: &str,
        kind: Kind,
        value: Value,
        span: Option<Span>,
    ) -> Result<(), RuntimeError> {
        let global = self.global();
        Self::declare_in(global, name, kind, value, span)
    }

    fn declare_in(
        env: &Environment,
        name: &str,
        kind: Kind,
        value: Value,
        span: Option<Span>,
    ) -> Result<(), RuntimeError> {
        if env.contains(name) {
            return Err(RuntimeError::Redeclaration {
                name: name.to_string(),
                span,
            });
        }
        env.insert(name.to_string(), Binding { kind, value });
        Ok(())
    }

    /// Store into the frame that already binds `name`
    pub fn assign(&mut self, name: &str, value: Value, span: Option<Span>) -> Result<(), RuntimeError> {
        match self.lookup_frame(name) {
            Some(env) if env.set_value(name, value) => Ok(()),
            _ => Err(RuntimeError::UndefinedVariable {
                name: name.to_string(),
                span,
            }),
        }
    }

    // ── call boundaries ──────────────────────────────────────────────────────

    pub fn push_call(&mut self, boundary: CallBoundary) {
        self.call_boundaries.push(boundary);
    }

    pub fn pop_call(&mut self) -> Option<CallBoundary> {
        self.call_boundaries.pop()
    }

    pub fn current_call(&self) -> Option<&CallBoundary> {
        self.call_boundaries.last()
    }

    pub fn call_boundaries(&self) -> &[CallBoundary] {
        &self.call_boundaries
    }

    pub fn call_depth(&self) -> usize {
        self.call_boundaries.len()
    }

    // ── stepping bookkeeping ─────────────────────────────────────────────────

    pub(crate) fn enter_node(&mut self, summary: NodeSummary) {
        self.node_stack.push(summary);
        self.steps += 1;
    }

    pub(crate) fn leave_node(&mut self) {
        self.node_stack.pop();
        self.steps += 1;
    }

    pub(crate) fn set_last_event(&mut self, event: StepEvent) {
        self.last_event = Some(event);
    }

    /// Most recent suspension point
    pub fn last_event(&self) -> Option<&StepEvent> {
        self.last_event.as_ref()
    }

    /// Nodes under evaluation, most recent first
    pub fn node_stack(&self) -> impl Iterator<Item = &NodeSummary> {
        self.node_stack.iter().rev()
    }

    pub fn node_depth(&self) -> usize {
        self.node_stack.len()
    }

    /// Suspension points reached so far
    pub fn steps(&self) -> u64 {
        self.steps
    }

    // ── output and errors ────────────────────────────────────────────────────

    pub fn write_output(&mut self, text: &str) {
        self.output.push_str(text);
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    pub fn errors(&self) -> &[RuntimeError] {
        &self.errors
    }

    /// Record `error` and reset to the permanent frames so a later
    /// evaluation starts from a clean chain
    pub fn recover(&mut self, error: RuntimeError) {
        tracing::warn!(%error, depth = self.environments.len(), "runtime error, unwinding to global frame");
        self.errors.push(error);
        self.unwind_to_outer();
        self.node_stack.clear();
    }

    /// Drop every user frame and call boundary
    fn unwind_to_outer(&mut self) {
        while self.environments.len() > self.outer_environment_count {
            if let Some(env) = self.environments.pop() {
                if !self.environments.iter().any(|e| e.id == env.id) {
                    env.clear();
                }
            }
        }
        self.call_boundaries.clear();
    }

    /// Start a new evaluation from the permanent frames. Frames left behind by
    /// a halted run are discarded; globals and output are kept.
    pub(crate) fn begin_evaluation(&mut self) {
        if self.environments.len() > self.outer_environment_count {
            tracing::debug!(depth = self.environments.len(), "discarding frames of a halted run");
        }
        self.unwind_to_outer();
        self.steps = 0;
        self.node_stack.clear();
        self.last_event = None;
    }
}

impl Default for ExecutionState {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ExecutionState {
    fn drop(&mut self) {
        for env in &self.environments {
            env.clear();
        }
    }
}
