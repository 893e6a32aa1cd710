//! Statement execution

use crate::ast::{Node, NodeKind, VariableDeclarator};
use crate::environment::{FrameTag, LoopKind};
use crate::interpreter::{Completion, EvalResult, Interpreter};
use crate::kind::{cast, declared_name, Kind};
use crate::span::Span;
use crate::thunk::{self, Thunk};
use crate::value::{Closure, Param, RuntimeError, Value};
use cwalk_config::Strategy;
use std::rc::Rc;

/// Largest element count an array declaration may ask for
pub(crate) const MAX_ARRAY_LEN: usize = 1 << 24;

impl Interpreter {
    /// Evaluate a block in a fresh frame tagged `tag`
    pub(super) fn eval_block(&mut self, body: &[Node], tag: FrameTag) -> EvalResult<Completion> {
        let frame = self.state.push(tag);
        let mut last = Value::Void;
        for stmt in body {
            match self.eval_node(stmt)? {
                Completion::Normal(value) => last = value,
                other => {
                    self.state.pop(frame.id)?;
                    return Ok(other);
                }
            }
        }
        // The tail may be a thunk over this frame; force before it goes
        let last = thunk::force(last, self)?;
        self.state.pop(frame.id)?;
        Ok(Completion::Normal(last))
    }

    pub(super) fn eval_var_decl(
        &mut self,
        declarations: &[VariableDeclarator],
        span: Option<Span>,
    ) -> EvalResult<Value> {
        for declarator in declarations {
            let loc = declarator.loc.or(span);
            let (name, kind) = declared_name(&declarator.id)?;
            if kind.is_void() {
                return Err(RuntimeError::type_error(
                    format!("variable or field `{name}` declared void"),
                    loc,
                )
                .into());
            }

            if let Some(size) = &declarator.size {
                let array = self.eval_array_declarator(kind, size, declarator.init.as_ref(), loc)?;
                self.state.declare(&name, kind.pointer_to(), array, loc)?;
                continue;
            }

            let value = match &declarator.init {
                None => kind.zero(),
                Some(init) => match self.config.strategy {
                    Strategy::Strict => {
                        let value = self.actual_value(init)?;
                        cast(value, kind, init.loc.or(loc))?
                    }
                    Strategy::Lazy => {
                        let env = Rc::clone(self.state.peek_top());
                        Thunk::new(Rc::new(cast_node(init, kind)), env).into_value()
                    }
                },
            };
            self.state.declare(&name, kind, value, loc)?;
        }
        Ok(Value::Void)
    }

    /// `T name[size]` with an optional `{...}` initializer. Missing elements
    /// are zero.
    fn eval_array_declarator(
        &mut self,
        element: Kind,
        size: &Node,
        init: Option<&Node>,
        span: Option<Span>,
    ) -> EvalResult<Value> {
        let len = match self.actual_value(size)? {
            Value::Number(n) if n >= 0.0 && n.fract() == 0.0 => n,
            _ => return Err(RuntimeError::InvalidIndex { span: size.loc.or(span) }.into()),
        };
        if len > MAX_ARRAY_LEN as f64 {
            return Err(RuntimeError::type_error(
                format!("size of array is too large ({len} elements, limit {MAX_ARRAY_LEN})"),
                size.loc.or(span),
            )
            .into());
        }
        let len = len as usize;

        let mut elements = Vec::new();
        elements.try_reserve_exact(len).map_err(|e| {
            RuntimeError::type_error(
                format!("cannot allocate array of {len} elements: {e}"),
                size.loc.or(span),
            )
        })?;
        if let Some(init) = init {
            let values = match self.actual_value(init)? {
                Value::Array(values) => values.borrow().clone(),
                other => {
                    return Err(RuntimeError::type_error(
                        format!("invalid initializer: expected an array, found {}", other.type_name()),
                        init.loc.or(span),
                    )
                    .into())
                }
            };
            if values.len() > len {
                return Err(RuntimeError::type_error(
                    format!("excess elements in array initializer ({} for {len})", values.len()),
                    init.loc.or(span),
                )
                .into());
            }
            for value in values {
                elements.push(cast(value, element, init.loc.or(span))?);
            }
        }
        elements.resize(len, element.zero());
        Ok(Value::array(elements))
    }

    pub(super) fn eval_function_decl(
        &mut self,
        id: &Node,
        params: &[Node],
        body: &Node,
        span: Option<Span>,
    ) -> EvalResult<Value> {
        let (name, ret) = declared_name(id)?;
        let closure = Closure {
            name: Some(name.clone()),
            params: decode_params(params)?,
            body: Rc::new(body.clone()),
        };

        // A later definition replaces an earlier one; variables stay protected
        let global = Rc::clone(self.state.global());
        match global.get(&name) {
            Some(existing) if matches!(existing.value, Value::Closure(_)) => {
                tracing::debug!(function = %name, "function redefined");
                global.insert(
                    name,
                    crate::environment::Binding {
                        kind: ret,
                        value: Value::Closure(Rc::new(closure)),
                    },
                );
            }
            _ => self
                .state
                .declare_global(&name, ret, Value::Closure(Rc::new(closure)), span)?,
        }
        Ok(Value::Void)
    }

    pub(super) fn eval_if(
        &mut self,
        test: &Node,
        consequent: &Node,
        alternate: Option<&Node>,
    ) -> EvalResult<Completion> {
        if self.actual_value(test)?.is_truthy() {
            self.eval_node(consequent)
        } else if let Some(alternate) = alternate {
            self.eval_node(alternate)
        } else {
            Ok(Completion::Normal(Value::Void))
        }
    }

    pub(super) fn eval_while(&mut self, test: &Node, body: &Node) -> EvalResult<Completion> {
        let tag = FrameTag::Loop(LoopKind::While);
        while self.actual_value(test)?.is_truthy() {
            match self.visit(body, tag.clone())? {
                Completion::Break(_) => break,
                Completion::Continue(_) | Completion::Normal(_) => {}
                ret @ Completion::Return(_) => return Ok(ret),
            }
        }
        Ok(Completion::Normal(Value::Void))
    }

    pub(super) fn eval_do_while(&mut self, body: &Node, test: &Node) -> EvalResult<Completion> {
        let tag = FrameTag::Loop(LoopKind::DoWhile);
        loop {
            match self.visit(body, tag.clone())? {
                Completion::Break(_) => break,
                Completion::Continue(_) | Completion::Normal(_) => {}
                ret @ Completion::Return(_) => return Ok(ret),
            }
            if !self.actual_value(test)?.is_truthy() {
                break;
            }
        }
        Ok(Completion::Normal(Value::Void))
    }

    /// The header lives in its own frame so `for (int i = 0; ...)` scopes `i`
    /// to the loop
    pub(super) fn eval_for(
        &mut self,
        init: Option<&Node>,
        test: Option<&Node>,
        update: Option<&Node>,
        body: &Node,
    ) -> EvalResult<Completion> {
        let tag = FrameTag::Loop(LoopKind::For);
        let header = self.state.push(tag.clone());

        if let Some(init) = init {
            self.eval_node(init)?;
        }
        let completion = loop {
            if let Some(test) = test {
                if !self.actual_value(test)?.is_truthy() {
                    break Completion::Normal(Value::Void);
                }
            }
            match self.visit(body, tag.clone())? {
                Completion::Break(_) => break Completion::Normal(Value::Void),
                Completion::Continue(_) | Completion::Normal(_) => {}
                ret @ Completion::Return(_) => break ret,
            }
            if let Some(update) = update {
                self.eval_expr(update)?;
            }
        };

        self.state.pop(header.id)?;
        Ok(completion)
    }
}

/// Decode formal parameters in declared-name shape
pub(super) fn decode_params(params: &[Node]) -> Result<Vec<Param>, RuntimeError> {
    params
        .iter()
        .map(|param| declared_name(param).map(|(name, kind)| Param { name, kind }))
        .collect()
}

/// `(kind) init`, as a node the dispatcher can evaluate later
fn cast_node(init: &Node, kind: Kind) -> Node {
    Node {
        kind: NodeKind::MemberExpression {
            object: Box::new(init.clone()),
            property: Box::new(Node::new(NodeKind::TypeTag {
                name: kind.primitive.name().to_string(),
                pointers: kind.pointers,
            })),
            computed: false,
        },
        loc: init.loc,
    }
}
