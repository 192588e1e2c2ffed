//! Evaluator for compound unit expressions such as `kcal/mol/angstrom` or `g/cm^3`.
//!
//! The grammar is deliberately small:
//!
//! ```text
//! expr    := factor (('*' | '/') factor)*
//! factor  := primary ('^' signed_number)?
//! primary := name | number | '(' expr ')'
//! ```
//!
//! Names are resolved through a caller-supplied lookup so the same evaluator serves both the
//! SI table (when validating base units) and the working-unit table of a registry.

use super::error::Error;

#[derive(Debug, Clone, PartialEq)]
enum Token<'a> {
    Name(&'a str),
    Number(f64),
    Mul,
    Div,
    Pow,
    Minus,
    Open,
    Close,
}

/// Evaluates `expression` to a single scale factor.
///
/// # Errors
///
/// Returns [`Error::UnknownUnit`] when the expression is malformed or references a name the
/// lookup does not know.
pub(crate) fn evaluate<F>(expression: &str, lookup: F) -> Result<f64, Error>
where
    F: Fn(&str) -> Option<f64>,
{
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Err(Error::unknown_unit(expression, "empty unit expression"));
    }

    let mut parser = Parser {
        expression,
        tokens,
        cursor: 0,
        lookup: &lookup,
    };
    let value = parser.expr()?;

    if parser.cursor != parser.tokens.len() {
        return Err(Error::unknown_unit(
            expression,
            format!("unexpected trailing token {:?}", parser.tokens[parser.cursor]),
        ));
    }
    Ok(value)
}

fn tokenize(expression: &str) -> Result<Vec<Token<'_>>, Error> {
    let mut tokens = Vec::new();
    let mut chars = expression.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '*' => {
                chars.next();
                tokens.push(Token::Mul);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Div);
            }
            '^' => {
                chars.next();
                tokens.push(Token::Pow);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            c if c.is_ascii_digit() || c == '.' => {
                let mut end = start;
                let mut seen_exponent = false;
                while let Some(&(idx, d)) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        end = idx + d.len_utf8();
                        chars.next();
                    } else if (d == 'e' || d == 'E') && !seen_exponent {
                        // Only an exponent when followed by a digit or a signed digit.
                        let rest = &expression[idx + 1..];
                        let mut rest_chars = rest.chars();
                        let is_exponent = match rest_chars.next() {
                            Some(n) if n.is_ascii_digit() => true,
                            Some('+') | Some('-') => {
                                matches!(rest_chars.next(), Some(n) if n.is_ascii_digit())
                            }
                            _ => false,
                        };
                        if !is_exponent {
                            break;
                        }
                        seen_exponent = true;
                        chars.next();
                        if let Some(&(sidx, s)) = chars.peek() {
                            if s == '+' || s == '-' {
                                end = sidx + 1;
                                chars.next();
                            }
                        }
                    } else {
                        break;
                    }
                }
                let literal = &expression[start..end.max(start + 1)];
                let value = literal.parse::<f64>().map_err(|_| {
                    Error::unknown_unit(expression, format!("invalid number '{literal}'"))
                })?;
                tokens.push(Token::Number(value));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut end = start;
                while let Some(&(idx, d)) = chars.peek() {
                    if d.is_alphanumeric() || d == '_' {
                        end = idx + d.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Name(&expression[start..end]));
            }
            other => {
                return Err(Error::unknown_unit(
                    expression,
                    format!("unexpected character '{other}'"),
                ));
            }
        }
    }

    Ok(tokens)
}

struct Parser<'a, 'f, F> {
    expression: &'a str,
    tokens: Vec<Token<'a>>,
    cursor: usize,
    lookup: &'f F,
}

impl<'a, F> Parser<'a, '_, F>
where
    F: Fn(&str) -> Option<f64>,
{
    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.cursor)
    }

    fn next(&mut self) -> Option<Token<'a>> {
        let token = self.tokens.get(self.cursor).cloned();
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    fn fail(&self, reason: impl Into<String>) -> Error {
        Error::unknown_unit(self.expression, reason)
    }

    fn expr(&mut self) -> Result<f64, Error> {
        let mut value = self.factor()?;
        loop {
            match self.peek() {
                Some(Token::Mul) => {
                    self.next();
                    value *= self.factor()?;
                }
                Some(Token::Div) => {
                    self.next();
                    value /= self.factor()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn factor(&mut self) -> Result<f64, Error> {
        let base = self.primary()?;
        if self.peek() == Some(&Token::Pow) {
            self.next();
            let negative = if self.peek() == Some(&Token::Minus) {
                self.next();
                true
            } else {
                false
            };
            let exponent = match self.next() {
                Some(Token::Number(n)) => n,
                other => return Err(self.fail(format!("expected exponent, found {other:?}"))),
            };
            let exponent = if negative { -exponent } else { exponent };
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<f64, Error> {
        match self.next() {
            Some(Token::Name(name)) => {
                (self.lookup)(name).ok_or_else(|| self.fail(format!("'{name}' is not registered")))
            }
            Some(Token::Number(n)) => Ok(n),
            Some(Token::Open) => {
                let value = self.expr()?;
                match self.next() {
                    Some(Token::Close) => Ok(value),
                    _ => Err(self.fail("unbalanced parenthesis")),
                }
            }
            other => Err(self.fail(format!("expected unit name, found {other:?}"))),
        }
    }
}
