// vigil/src/expression/eval.rs

use super::parser::{parse, BinaryOp, Expr};
use super::{ConditionEvaluator, EvalError, VariableResolver};
use parking_lot::Mutex;
use serde_json::{Number, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{event, Level};

/// Default [`ConditionEvaluator`] for the FEEL-like condition subset.
///
/// Parsed expressions are cached by source text. When the cache reaches its
/// capacity it is cleared; a capacity of zero disables caching.
#[derive(Debug)]
pub struct ExpressionEvaluator {
  cache: Mutex<HashMap<String, Arc<Expr>>>,
  capacity: usize,
}

impl Default for ExpressionEvaluator {
  fn default() -> Self {
    Self::with_capacity(256)
  }
}

impl ExpressionEvaluator {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      cache: Mutex::new(HashMap::new()),
      capacity,
    }
  }

  /// Number of parsed expressions currently cached.
  pub fn cached(&self) -> usize {
    self.cache.lock().len()
  }

  /// Parses `expression` without evaluating it.
  pub fn validate(&self, expression: &str) -> Result<(), EvalError> {
    self.compiled(expression).map(|_| ())
  }

  fn compiled(&self, expression: &str) -> Result<Arc<Expr>, EvalError> {
    if let Some(expr) = self.cache.lock().get(expression) {
      return Ok(Arc::clone(expr));
    }
    let expr = Arc::new(parse(expression)?);
    if self.capacity > 0 {
      let mut cache = self.cache.lock();
      if cache.len() >= self.capacity {
        event!(Level::TRACE, capacity = self.capacity, "Expression cache full, clearing.");
        cache.clear();
      }
      cache.insert(expression.to_string(), Arc::clone(&expr));
    }
    Ok(expr)
  }
}

impl ConditionEvaluator for ExpressionEvaluator {
  fn evaluate(&self, expression: &str, resolver: &dyn VariableResolver) -> Result<bool, EvalError> {
    let expr = self.compiled(expression)?;
    match eval(&expr, resolver)? {
      Value::Bool(b) => Ok(b),
      other => Err(EvalError::NonBoolean {
        found: type_name(&other).to_string(),
      }),
    }
  }
}

fn type_name(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "list",
    Value::Object(_) => "context",
  }
}

fn mismatch(op: &str, left: &Value, right: &Value) -> EvalError {
  EvalError::TypeMismatch {
    message: format!("cannot apply '{}' to {} and {}", op, type_name(left), type_name(right)),
  }
}

fn number(n: f64) -> Result<Value, EvalError> {
  Number::from_f64(n).map(Value::Number).ok_or(EvalError::TypeMismatch {
    message: format!("arithmetic produced a non-finite number ({})", n),
  })
}

fn as_bool(value: &Value, op: &str) -> Result<Option<bool>, EvalError> {
  match value {
    Value::Bool(b) => Ok(Some(*b)),
    Value::Null => Ok(None),
    other => Err(EvalError::TypeMismatch {
      message: format!("'{}' expects booleans, found {}", op, type_name(other)),
    }),
  }
}

pub(crate) fn eval(expr: &Expr, resolver: &dyn VariableResolver) -> Result<Value, EvalError> {
  match expr {
    Expr::Literal(value) => Ok(value.clone()),
    Expr::Path(segments) => {
      let (head, rest) = segments
        .split_first()
        .ok_or_else(|| EvalError::MissingVariable(String::new()))?;
      let mut current = resolver
        .resolve(head)
        .ok_or_else(|| EvalError::MissingVariable(head.clone()))?;
      for field in rest {
        match current.get(field.as_str()) {
          Some(next) => current = next,
          // A missing field of a present context is null, not an error.
          None => return Ok(Value::Null),
        }
      }
      Ok(current.clone())
    }
    Expr::Neg(inner) => match eval(inner, resolver)? {
      Value::Null => Ok(Value::Null),
      Value::Number(n) => number(-n.as_f64().unwrap_or_default()),
      other => Err(EvalError::TypeMismatch {
        message: format!("cannot negate {}", type_name(&other)),
      }),
    },
    Expr::Not(inner) => {
      let value = eval(inner, resolver)?;
      Ok(match as_bool(&value, "not")? {
        Some(b) => Value::Bool(!b),
        None => Value::Null,
      })
    }
    Expr::And(left, right) => {
      let l = eval(left, resolver)?;
      if as_bool(&l, "and")? == Some(false) {
        return Ok(Value::Bool(false));
      }
      let r = eval(right, resolver)?;
      Ok(match (as_bool(&l, "and")?, as_bool(&r, "and")?) {
        (_, Some(false)) => Value::Bool(false),
        (Some(true), Some(true)) => Value::Bool(true),
        _ => Value::Null,
      })
    }
    Expr::Or(left, right) => {
      let l = eval(left, resolver)?;
      if as_bool(&l, "or")? == Some(true) {
        return Ok(Value::Bool(true));
      }
      let r = eval(right, resolver)?;
      Ok(match (as_bool(&l, "or")?, as_bool(&r, "or")?) {
        (_, Some(true)) => Value::Bool(true),
        (Some(false), Some(false)) => Value::Bool(false),
        _ => Value::Null,
      })
    }
    Expr::Binary(op, left, right) => {
      let l = eval(left, resolver)?;
      let r = eval(right, resolver)?;
      binary(*op, &l, &r)
    }
  }
}

fn binary(op: BinaryOp, l: &Value, r: &Value) -> Result<Value, EvalError> {
  match op {
    BinaryOp::Eq => Ok(Value::Bool(equals(l, r))),
    BinaryOp::Ne => Ok(Value::Bool(!equals(l, r))),
    BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
      if l.is_null() || r.is_null() {
        return Ok(Value::Null);
      }
      let ordering = match (l, r) {
        (Value::Number(a), Value::Number(b)) => a
          .as_f64()
          .zip(b.as_f64())
          .and_then(|(a, b)| a.partial_cmp(&b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
      }
      .ok_or_else(|| mismatch(symbol(op), l, r))?;
      Ok(Value::Bool(match op {
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::Le => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
      }))
    }
    BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
      if l.is_null() || r.is_null() {
        return Ok(Value::Null);
      }
      if let (BinaryOp::Add, Value::String(a), Value::String(b)) = (op, l, r) {
        return Ok(Value::String(format!("{}{}", a, b)));
      }
      let (a, b) = match (l.as_f64(), r.as_f64()) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(mismatch(symbol(op), l, r)),
      };
      match op {
        BinaryOp::Add => number(a + b),
        BinaryOp::Sub => number(a - b),
        BinaryOp::Mul => number(a * b),
        _ if b == 0.0 => Err(EvalError::DivisionByZero),
        _ => number(a / b),
      }
    }
  }
}

fn equals(l: &Value, r: &Value) -> bool {
  match (l, r) {
    // 1 and 1.0 are the same number.
    (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
    _ => l == r,
  }
}

fn symbol(op: BinaryOp) -> &'static str {
  match op {
    BinaryOp::Add => "+",
    BinaryOp::Sub => "-",
    BinaryOp::Mul => "*",
    BinaryOp::Div => "/",
    BinaryOp::Eq => "=",
    BinaryOp::Ne => "!=",
    BinaryOp::Lt => "<",
    BinaryOp::Le => "<=",
    BinaryOp::Gt => ">",
    BinaryOp::Ge => ">=",
  }
}
