// vigil/src/expression/parser.rs

//! Recursive-descent parser producing the [`Expr`] tree.
//!
//! Precedence, loosest first: `or`, `and`, comparison, `+ -`, `* /`, unary `-`.

use super::lexer::{tokenize, Token};
use super::EvalError;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
  Eq,
  Ne,
  Lt,
  Le,
  Gt,
  Ge,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
  Literal(Value),
  /// `a.b.c`; the first segment is the variable name.
  Path(Vec<String>),
  Neg(Box<Expr>),
  Not(Box<Expr>),
  Binary(BinaryOp, Box<Expr>, Box<Expr>),
  And(Box<Expr>, Box<Expr>),
  Or(Box<Expr>, Box<Expr>),
}

pub(crate) fn parse(source: &str) -> Result<Expr, EvalError> {
  let body = source.trim();
  let body = body.strip_prefix('=').unwrap_or(body);
  let tokens = tokenize(body)?;
  let mut parser = Parser {
    source,
    tokens,
    pos: 0,
  };
  let expr = parser.or_expr()?;
  if let Some(token) = parser.peek() {
    return Err(parser.error(format!("unexpected trailing token {:?}", token)));
  }
  Ok(expr)
}

struct Parser<'a> {
  source: &'a str,
  tokens: Vec<Token>,
  pos: usize,
}

impl<'a> Parser<'a> {
  fn peek(&self) -> Option<&Token> {
    self.tokens.get(self.pos)
  }

  fn advance(&mut self) -> Option<Token> {
    let token = self.tokens.get(self.pos).cloned();
    self.pos += 1;
    token
  }

  fn eat(&mut self, expected: &Token) -> bool {
    if self.peek() == Some(expected) {
      self.pos += 1;
      true
    } else {
      false
    }
  }

  fn expect(&mut self, expected: Token) -> Result<(), EvalError> {
    if self.eat(&expected) {
      Ok(())
    } else {
      Err(self.error(format!("expected {:?}, found {:?}", expected, self.peek())))
    }
  }

  fn error(&self, message: String) -> EvalError {
    EvalError::Parse {
      expression: self.source.to_string(),
      message,
    }
  }

  fn or_expr(&mut self) -> Result<Expr, EvalError> {
    let mut left = self.and_expr()?;
    while self.eat(&Token::Or) {
      let right = self.and_expr()?;
      left = Expr::Or(Box::new(left), Box::new(right));
    }
    Ok(left)
  }

  fn and_expr(&mut self) -> Result<Expr, EvalError> {
    let mut left = self.comparison()?;
    while self.eat(&Token::And) {
      let right = self.comparison()?;
      left = Expr::And(Box::new(left), Box::new(right));
    }
    Ok(left)
  }

  fn comparison(&mut self) -> Result<Expr, EvalError> {
    let left = self.additive()?;
    let op = match self.peek() {
      Some(Token::Eq) => BinaryOp::Eq,
      Some(Token::Ne) => BinaryOp::Ne,
      Some(Token::Lt) => BinaryOp::Lt,
      Some(Token::Le) => BinaryOp::Le,
      Some(Token::Gt) => BinaryOp::Gt,
      Some(Token::Ge) => BinaryOp::Ge,
      _ => return Ok(left),
    };
    self.pos += 1;
    let right = self.additive()?;
    Ok(Expr::Binary(op, Box::new(left), Box::new(right)))
  }

  fn additive(&mut self) -> Result<Expr, EvalError> {
    let mut left = self.multiplicative()?;
    loop {
      let op = match self.peek() {
        Some(Token::Plus) => BinaryOp::Add,
        Some(Token::Minus) => BinaryOp::Sub,
        _ => return Ok(left),
      };
      self.pos += 1;
      let right = self.multiplicative()?;
      left = Expr::Binary(op, Box::new(left), Box::new(right));
    }
  }

  fn multiplicative(&mut self) -> Result<Expr, EvalError> {
    let mut left = self.unary()?;
    loop {
      let op = match self.peek() {
        Some(Token::Star) => BinaryOp::Mul,
        Some(Token::Slash) => BinaryOp::Div,
        _ => return Ok(left),
      };
      self.pos += 1;
      let right = self.unary()?;
      left = Expr::Binary(op, Box::new(left), Box::new(right));
    }
  }

  fn unary(&mut self) -> Result<Expr, EvalError> {
    if self.eat(&Token::Minus) {
      let operand = self.unary()?;
      return Ok(Expr::Neg(Box::new(operand)));
    }
    self.primary()
  }

  fn primary(&mut self) -> Result<Expr, EvalError> {
    match self.advance() {
      Some(Token::Number(n)) => serde_json::Number::from_f64(n)
        .map(|n| Expr::Literal(Value::Number(n)))
        .ok_or_else(|| self.error(format!("number literal {} is not finite", n))),
      Some(Token::Str(s)) => Ok(Expr::Literal(Value::String(s))),
      Some(Token::True) => Ok(Expr::Literal(Value::Bool(true))),
      Some(Token::False) => Ok(Expr::Literal(Value::Bool(false))),
      Some(Token::Null) => Ok(Expr::Literal(Value::Null)),
      Some(Token::Not) => {
        self.expect(Token::LParen)?;
        let inner = self.or_expr()?;
        self.expect(Token::RParen)?;
        Ok(Expr::Not(Box::new(inner)))
      }
      Some(Token::LParen) => {
        let inner = self.or_expr()?;
        self.expect(Token::RParen)?;
        Ok(inner)
      }
      Some(Token::Ident(name)) => {
        let mut segments = vec![name];
        while self.eat(&Token::Dot) {
          match self.advance() {
            Some(Token::Ident(field)) => segments.push(field),
            other => return Err(self.error(format!("expected field name after '.', found {:?}", other))),
          }
        }
        Ok(Expr::Path(segments))
      }
      other => Err(self.error(format!("unexpected token {:?}", other))),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn multiplication_binds_tighter_than_addition() {
    let expr = parse("= a + 2 * 3").unwrap();
    let expected = Expr::Binary(
      BinaryOp::Add,
      Box::new(Expr::Path(vec!["a".into()])),
      Box::new(Expr::Binary(
        BinaryOp::Mul,
        Box::new(Expr::Literal(json!(2.0))),
        Box::new(Expr::Literal(json!(3.0))),
      )),
    );
    assert_eq!(expr, expected);
  }

  #[test]
  fn and_binds_tighter_than_or() {
    let expr = parse("a or b and c").unwrap();
    assert!(matches!(expr, Expr::Or(_, ref rhs) if matches!(**rhs, Expr::And(_, _))));
  }

  #[test]
  fn reports_trailing_and_missing_tokens() {
    assert!(matches!(parse("x > 1 )"), Err(EvalError::Parse { .. })));
    assert!(matches!(parse("not(x"), Err(EvalError::Parse { .. })));
    assert!(matches!(parse(""), Err(EvalError::Parse { .. })));
    assert!(matches!(parse("a."), Err(EvalError::Parse { .. })));
  }
}
