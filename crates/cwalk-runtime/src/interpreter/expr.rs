//! Expression evaluation

use crate::ast::{AssignOp, BinaryOp, Literal, LogicalOp, Node, NodeKind, UnaryOp, UpdateOp};
use crate::interpreter::stmt::decode_params;
use crate::interpreter::{EvalResult, Interpreter};
use crate::kind::{cast, to_kind, Kind};
use crate::span::Span;
use crate::thunk;
use crate::value::{Closure, RuntimeError, Value};
use std::cell::RefCell;
use std::rc::Rc;

/// Resolved assignment target
enum Place {
    Variable { name: String, kind: Kind },
    Element {
        elements: Rc<RefCell<Vec<Value>>>,
        index: usize,
        kind: Option<Kind>,
    },
}

impl Interpreter {
    /// Expression nodes; statement nodes never reach here
    pub(super) fn eval_expression_kind(&mut self, node: &Node) -> EvalResult<Value> {
        let span = node.loc;
        match &node.kind {
            NodeKind::Literal { value } => Ok(eval_literal(value)),
            NodeKind::Identifier { name } => Ok(self.state.lookup(name, span)?.value),
            NodeKind::BinaryExpression {
                operator,
                left,
                right,
            } => {
                let left = self.actual_value(left)?;
                let right = self.actual_value(right)?;
                Ok(apply_binary(*operator, &left, &right, span)?)
            }
            NodeKind::LogicalExpression {
                operator,
                left,
                right,
            } => self.eval_logical(*operator, left, right),
            NodeKind::UnaryExpression { operator, argument } => {
                let value = self.actual_value(argument)?;
                Ok(apply_unary(*operator, &value, span)?)
            }
            NodeKind::AssignmentExpression {
                operator,
                left,
                right,
            } => self.eval_assign(*operator, left, right, span),
            NodeKind::UpdateExpression {
                operator,
                argument,
                prefix,
            } => self.eval_update(*operator, argument, *prefix, span),
            NodeKind::CallExpression { callee, arguments } => {
                self.eval_call(callee, arguments, span)
            }
            NodeKind::ConditionalExpression {
                test,
                consequent,
                alternate,
            } => {
                if self.actual_value(test)?.is_truthy() {
                    self.actual_value(consequent)
                } else {
                    self.actual_value(alternate)
                }
            }
            NodeKind::SequenceExpression { expressions } => {
                let mut last = Value::Void;
                for expression in expressions {
                    last = self.eval_expr(expression)?;
                }
                thunk::force(last, self)
            }
            NodeKind::MemberExpression {
                object,
                property,
                computed: false,
            } => {
                let value = self.actual_value(object)?;
                let kind = to_kind(property)?;
                Ok(cast(value, kind, span)?)
            }
            NodeKind::MemberExpression {
                object,
                property,
                computed: true,
            } => {
                let (elements, index) = self.eval_index(object, property, span)?;
                let element = elements.borrow()[index].clone();
                thunk::force(element, self)
            }
            NodeKind::ArrayExpression { elements } => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.actual_value(element)?);
                }
                Ok(Value::array(values))
            }
            NodeKind::FunctionExpression { params, body } => {
                Ok(Value::Closure(Rc::new(Closure {
                    name: None,
                    params: decode_params(params)?,
                    body: Rc::new(body.as_ref().clone()),
                })))
            }
            NodeKind::TypeTag { name, .. } => Err(RuntimeError::type_error(
                format!("expected expression before `{name}`"),
                span,
            )
            .into()),
            other => Err(RuntimeError::invariant(format!(
                "statement {} dispatched as an expression",
                other.label()
            ))
            .into()),
        }
    }

    fn eval_logical(&mut self, operator: LogicalOp, left: &Node, right: &Node) -> EvalResult<Value> {
        let left = self.actual_value(left)?.is_truthy();
        let result = match operator {
            LogicalOp::And => left && self.actual_value(right)?.is_truthy(),
            LogicalOp::Or => left || self.actual_value(right)?.is_truthy(),
        };
        Ok(Value::Bool(result))
    }

    /// Evaluate `object[property]` to the backing storage and a checked index
    fn eval_index(
        &mut self,
        object: &Node,
        property: &Node,
        span: Option<Span>,
    ) -> EvalResult<(Rc<RefCell<Vec<Value>>>, usize)> {
        let base = self.actual_value(object)?;
        let index = self.actual_value(property)?;
        let elements = match base {
            Value::Array(elements) => elements,
            other => {
                return Err(RuntimeError::type_error(
                    format!("subscripted value is {}, not an array", other.type_name()),
                    span,
                )
                .into())
            }
        };
        let index = match index {
            Value::Number(n) if n >= 0.0 && n.fract() == 0.0 => n as usize,
            _ => return Err(RuntimeError::InvalidIndex { span }.into()),
        };
        let len = elements.borrow().len();
        if index >= len {
            return Err(RuntimeError::OutOfBounds { index, len, span }.into());
        }
        Ok((elements, index))
    }

    fn resolve_place(&mut self, target: &Node, span: Option<Span>) -> EvalResult<Place> {
        match &target.kind {
            NodeKind::Identifier { name } => {
                let binding = self.state.lookup(name, target.loc.or(span))?;
                Ok(Place::Variable {
                    name: name.clone(),
                    kind: binding.kind,
                })
            }
            NodeKind::MemberExpression {
                object,
                property,
                computed: true,
            } => {
                // Element kind is known when the array is a named variable
                let kind = match &object.kind {
                    NodeKind::Identifier { name } => {
                        Some(self.state.lookup(name, object.loc.or(span))?.kind.pointee())
                    }
                    _ => None,
                };
                let (elements, index) = self.eval_index(object, property, span)?;
                Ok(Place::Element {
                    elements,
                    index,
                    kind,
                })
            }
            _ => Err(RuntimeError::InvalidAssignmentTarget { span }.into()),
        }
    }

    fn read_place(&mut self, place: &Place, span: Option<Span>) -> EvalResult<Value> {
        let value = match place {
            Place::Variable { name, .. } => self.state.lookup(name, span)?.value,
            Place::Element {
                elements, index, ..
            } => elements.borrow()[*index].clone(),
        };
        thunk::force(value, self)
    }

    /// Cast to the place's kind and store; returns the stored value
    fn write_place(&mut self, place: &Place, value: Value, span: Option<Span>) -> EvalResult<Value> {
        match place {
            Place::Variable { name, kind } => {
                let value = cast(value, *kind, span)?;
                self.state.assign(name, value.clone(), span)?;
                Ok(value)
            }
            Place::Element {
                elements,
                index,
                kind,
            } => {
                let value = match kind {
                    Some(kind) => cast(value, *kind, span)?,
                    None => value,
                };
                elements.borrow_mut()[*index] = value.clone();
                Ok(value)
            }
        }
    }

    fn place_kind(place: &Place) -> Option<Kind> {
        match place {
            Place::Variable { kind, .. } => Some(*kind),
            Place::Element { kind, .. } => *kind,
        }
    }

    fn eval_assign(
        &mut self,
        operator: AssignOp,
        left: &Node,
        right: &Node,
        span: Option<Span>,
    ) -> EvalResult<Value> {
        let place = self.resolve_place(left, span)?;
        let current = match operator.binary() {
            Some(_) => Some(self.read_place(&place, span)?),
            None => None,
        };

        let rhs = self.actual_value(right)?;
        let rhs = match Self::place_kind(&place) {
            Some(kind) => cast(rhs, kind, right.loc.or(span))?,
            None => rhs,
        };

        let value = match (operator.binary(), current) {
            (Some(op), Some(current)) => apply_binary(op, &current, &rhs, span)?,
            _ => rhs,
        };
        self.write_place(&place, value, span)
    }

    fn eval_update(
        &mut self,
        operator: UpdateOp,
        argument: &Node,
        prefix: bool,
        span: Option<Span>,
    ) -> EvalResult<Value> {
        let place = self.resolve_place(argument, span)?;
        let old = self.read_place(&place, span)?;
        let n = old.as_number().ok_or_else(|| {
            RuntimeError::type_error(
                format!("wrong type argument to increment ({})", old.type_name()),
                span,
            )
        })?;
        let delta = match operator {
            UpdateOp::Increment => 1.0,
            UpdateOp::Decrement => -1.0,
        };
        let new = self.write_place(&place, Value::Number(n + delta), span)?;
        Ok(if prefix { new } else { old })
    }
}

fn eval_literal(literal: &Literal) -> Value {
    match literal {
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Number(n) => Value::Number(*n),
    }
}

fn operands(
    op: BinaryOp,
    left: &Value,
    right: &Value,
    span: Option<Span>,
) -> Result<(f64, f64), RuntimeError> {
    match (left.as_number(), right.as_number()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(RuntimeError::type_error(
            format!(
                "invalid operands to binary {op} (have {} and {})",
                left.type_name(),
                right.type_name()
            ),
            span,
        )),
    }
}

/// Apply a binary operator to two forced values
pub(crate) fn apply_binary(
    op: BinaryOp,
    left: &Value,
    right: &Value,
    span: Option<Span>,
) -> Result<Value, RuntimeError> {
    if matches!(op, BinaryOp::Eq | BinaryOp::Ne) {
        let equal = match (left.as_number(), right.as_number()) {
            (Some(a), Some(b)) => a == b,
            _ => left == right,
        };
        return Ok(Value::Bool(if op == BinaryOp::Eq { equal } else { !equal }));
    }

    let (a, b) = operands(op, left, right, span)?;
    let value = match op {
        BinaryOp::Add => Value::Number(a + b),
        BinaryOp::Sub => Value::Number(a - b),
        BinaryOp::Mul => Value::Number(a * b),
        BinaryOp::Div | BinaryOp::Mod if b == 0.0 => {
            return Err(RuntimeError::DivideByZero { span })
        }
        BinaryOp::Div => Value::Number(a / b),
        BinaryOp::Mod => Value::Number(a % b),
        BinaryOp::Lt => Value::Bool(a < b),
        BinaryOp::Le => Value::Bool(a <= b),
        BinaryOp::Gt => Value::Bool(a > b),
        BinaryOp::Ge => Value::Bool(a >= b),
        BinaryOp::BitAnd => Value::Number(((a as i64) & (b as i64)) as f64),
        BinaryOp::BitOr => Value::Number(((a as i64) | (b as i64)) as f64),
        BinaryOp::BitXor => Value::Number(((a as i64) ^ (b as i64)) as f64),
        BinaryOp::Shl | BinaryOp::Shr => {
            let shift = b as i64;
            if !(0..64).contains(&shift) {
                return Err(RuntimeError::type_error(
                    format!("shift count {shift} out of range"),
                    span,
                ));
            }
            let shifted = if op == BinaryOp::Shl {
                (a as i64).wrapping_shl(shift as u32)
            } else {
                (a as i64) >> shift
            };
            Value::Number(shifted as f64)
        }
        BinaryOp::Eq | BinaryOp::Ne => unreachable!("equality handled above"),
    };
    Ok(value)
}

fn apply_unary(op: UnaryOp, value: &Value, span: Option<Span>) -> Result<Value, RuntimeError> {
    if op == UnaryOp::Not {
        return Ok(Value::Bool(!value.is_truthy()));
    }
    let n = value.as_number().ok_or_else(|| {
        RuntimeError::type_error(
            format!("wrong type argument to unary operator ({})", value.type_name()),
            span,
        )
    })?;
    Ok(Value::Number(match op {
        UnaryOp::Neg => -n,
        UnaryOp::Plus => n,
        UnaryOp::BitNot => !(n as i64) as f64,
        UnaryOp::Not => unreachable!("logical not handled above"),
    }))
}
