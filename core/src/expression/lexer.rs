// vigil/src/expression/lexer.rs

use super::EvalError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
  Number(f64),
  Str(String),
  Ident(String),
  True,
  False,
  Null,
  And,
  Or,
  Not,
  LParen,
  RParen,
  Dot,
  Plus,
  Minus,
  Star,
  Slash,
  Eq,
  Ne,
  Lt,
  Le,
  Gt,
  Ge,
}

pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, EvalError> {
  let chars: Vec<char> = source.chars().collect();
  let mut tokens = Vec::new();
  let mut i = 0;

  let parse_err = |message: String| EvalError::Parse {
    expression: source.to_string(),
    message,
  };

  while i < chars.len() {
    let c = chars[i];
    match c {
      c if c.is_whitespace() => i += 1,
      '(' => {
        tokens.push(Token::LParen);
        i += 1;
      }
      ')' => {
        tokens.push(Token::RParen);
        i += 1;
      }
      '.' if !chars.get(i + 1).is_some_and(|n| n.is_ascii_digit()) => {
        tokens.push(Token::Dot);
        i += 1;
      }
      '+' => {
        tokens.push(Token::Plus);
        i += 1;
      }
      '-' => {
        tokens.push(Token::Minus);
        i += 1;
      }
      '*' => {
        tokens.push(Token::Star);
        i += 1;
      }
      '/' => {
        tokens.push(Token::Slash);
        i += 1;
      }
      '=' => {
        // `=` and `==` are the same operator.
        i += if chars.get(i + 1) == Some(&'=') { 2 } else { 1 };
        tokens.push(Token::Eq);
      }
      '!' if chars.get(i + 1) == Some(&'=') => {
        tokens.push(Token::Ne);
        i += 2;
      }
      '<' => {
        if chars.get(i + 1) == Some(&'=') {
          tokens.push(Token::Le);
          i += 2;
        } else {
          tokens.push(Token::Lt);
          i += 1;
        }
      }
      '>' => {
        if chars.get(i + 1) == Some(&'=') {
          tokens.push(Token::Ge);
          i += 2;
        } else {
          tokens.push(Token::Gt);
          i += 1;
        }
      }
      '"' => {
        let mut text = String::new();
        i += 1;
        loop {
          match chars.get(i) {
            None => return Err(parse_err("unterminated string literal".to_string())),
            Some('"') => {
              i += 1;
              break;
            }
            Some('\\') => {
              let escaped = match chars.get(i + 1) {
                Some('n') => '\n',
                Some('t') => '\t',
                Some(other) => *other,
                None => return Err(parse_err("unterminated escape sequence".to_string())),
              };
              text.push(escaped);
              i += 2;
            }
            Some(other) => {
              text.push(*other);
              i += 1;
            }
          }
        }
        tokens.push(Token::Str(text));
      }
      c if c.is_ascii_digit() || c == '.' => {
        let start = i;
        while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
          i += 1;
        }
        let literal: String = chars[start..i].iter().collect();
        let number = literal
          .parse::<f64>()
          .map_err(|_| parse_err(format!("invalid number literal '{}'", literal)))?;
        tokens.push(Token::Number(number));
      }
      c if c.is_alphabetic() || c == '_' => {
        let start = i;
        while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
          i += 1;
        }
        let word: String = chars[start..i].iter().collect();
        tokens.push(match word.as_str() {
          "true" => Token::True,
          "false" => Token::False,
          "null" => Token::Null,
          "and" => Token::And,
          "or" => Token::Or,
          "not" => Token::Not,
          _ => Token::Ident(word),
        });
      }
      other => return Err(parse_err(format!("unexpected character '{}'", other))),
    }
  }

  Ok(tokens)
}
