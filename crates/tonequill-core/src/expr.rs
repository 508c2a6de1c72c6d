//! Timing-expression evaluator.
//!
//! Beat positions may arrive as a plain number or as a restricted arithmetic
//! string such as `"9 + 1/3"`. This module lexes and parses that string with
//! a hand-rolled recursive-descent parser (one token of lookahead, no
//! external parser-generator) and evaluates it over exact rationals so that
//! `"1/3"` round-trips losslessly through tick conversion.
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := factor (('*' | '/') factor)*
//! factor  := number | '(' expr ')' | ('+'|'-') factor
//! number  := digits ('.' digits)?
//! ```

use num_rational::Ratio;

use crate::error::DocError;

/// Exact beat position, kept as a rational so `"1/3" * 480` is integral.
pub type Beat = Ratio<i64>;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(Beat),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Lexer {
            src: src.as_bytes(),
            pos: 0,
        }
    }

    fn skip_ws(&mut self) {
        while self.pos < self.src.len() && self.src[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek_byte(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn next_token(&mut self, raw: &str) -> Result<Option<Token>, DocError> {
        self.skip_ws();
        let Some(b) = self.peek_byte() else {
            return Ok(None);
        };
        let tok = match b {
            b'+' => {
                self.pos += 1;
                Token::Plus
            }
            b'-' => {
                self.pos += 1;
                Token::Minus
            }
            b'*' => {
                self.pos += 1;
                Token::Star
            }
            b'/' => {
                self.pos += 1;
                Token::Slash
            }
            b'(' => {
                self.pos += 1;
                Token::LParen
            }
            b')' => {
                self.pos += 1;
                Token::RParen
            }
            b'0'..=b'9' | b'.' => Token::Number(self.lex_number(raw)?),
            other => {
                return Err(DocError::MalformedExpression {
                    expr: raw.to_string(),
                    reason: format!("unrecognized character '{}'", other as char),
                })
            }
        };
        Ok(Some(tok))
    }

    fn lex_number(&mut self, raw: &str) -> Result<Beat, DocError> {
        let start = self.pos;
        let mut saw_dot = false;
        while let Some(b) = self.peek_byte() {
            match b {
                b'0'..=b'9' => self.pos += 1,
                b'.' if !saw_dot => {
                    saw_dot = true;
                    self.pos += 1;
                }
                _ => break,
            }
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap();
        parse_decimal(text, raw)
    }
}

/// Parse a digits-optional-dot-digits literal into an exact rational.
fn parse_decimal(text: &str, raw: &str) -> Result<Beat, DocError> {
    let malformed = || DocError::MalformedExpression {
        expr: raw.to_string(),
        reason: format!("invalid number '{text}'"),
    };
    if text.is_empty() {
        return Err(malformed());
    }
    match text.split_once('.') {
        None => {
            let v: i64 = text.parse().map_err(|_| malformed())?;
            Ok(Beat::from_integer(v))
        }
        Some((int_part, frac_part)) => {
            if frac_part.is_empty() {
                return Err(malformed());
            }
            let int_val: i64 = if int_part.is_empty() {
                0
            } else {
                int_part.parse().map_err(|_| malformed())?
            };
            let frac_val: i64 = frac_part.parse().map_err(|_| malformed())?;
            let scale = 10i64
                .checked_pow(frac_part.len() as u32)
                .ok_or_else(malformed)?;
            let whole = Beat::from_integer(int_val);
            let frac = Beat::new(frac_val, scale);
            Ok(whole + frac)
        }
    }
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Option<Token>,
    raw: &'a str,
}

impl<'a> Parser<'a> {
    fn new(raw: &'a str) -> Result<Self, DocError> {
        let mut lexer = Lexer::new(raw);
        let current = lexer.next_token(raw)?;
        Ok(Parser { lexer, current, raw })
    }

    fn advance(&mut self) -> Result<(), DocError> {
        self.current = self.lexer.next_token(self.raw)?;
        Ok(())
    }

    fn expect_eof(&self) -> Result<(), DocError> {
        if self.current.is_some() {
            return Err(DocError::MalformedExpression {
                expr: self.raw.to_string(),
                reason: "trailing input after expression".to_string(),
            });
        }
        Ok(())
    }

    fn parse_expr(&mut self) -> Result<Beat, DocError> {
        let mut acc = self.parse_term()?;
        loop {
            match self.current {
                Some(Token::Plus) => {
                    self.advance()?;
                    acc += self.parse_term()?;
                }
                Some(Token::Minus) => {
                    self.advance()?;
                    acc -= self.parse_term()?;
                }
                _ => break,
            }
        }
        Ok(acc)
    }

    fn parse_term(&mut self) -> Result<Beat, DocError> {
        let mut acc = self.parse_factor()?;
        loop {
            match self.current {
                Some(Token::Star) => {
                    self.advance()?;
                    acc *= self.parse_factor()?;
                }
                Some(Token::Slash) => {
                    self.advance()?;
                    let rhs = self.parse_factor()?;
                    if rhs.numer() == &0 {
                        return Err(DocError::MalformedExpression {
                            expr: self.raw.to_string(),
                            reason: "division by zero".to_string(),
                        });
                    }
                    acc /= rhs;
                }
                _ => break,
            }
        }
        Ok(acc)
    }

    fn parse_factor(&mut self) -> Result<Beat, DocError> {
        match self.current {
            Some(Token::Number(n)) => {
                self.advance()?;
                Ok(n)
            }
            Some(Token::LParen) => {
                self.advance()?;
                let inner = self.parse_expr()?;
                match self.current {
                    Some(Token::RParen) => {
                        self.advance()?;
                        Ok(inner)
                    }
                    _ => Err(DocError::MalformedExpression {
                        expr: self.raw.to_string(),
                        reason: "expected closing ')'".to_string(),
                    }),
                }
            }
            Some(Token::Plus) => {
                self.advance()?;
                self.parse_factor()
            }
            Some(Token::Minus) => {
                self.advance()?;
                Ok(-self.parse_factor()?)
            }
            _ => Err(DocError::MalformedExpression {
                expr: self.raw.to_string(),
                reason: "expected a number, '(' or a sign".to_string(),
            }),
        }
    }
}

/// Evaluate a restricted arithmetic string into a non-negative exact beat
/// position. Unrecognized tokens, division by zero, and negative results all
/// raise [`DocError::MalformedExpression`].
pub fn eval_expr_str(raw: &str) -> Result<Beat, DocError> {
    let mut parser = Parser::new(raw)?;
    let value = parser.parse_expr()?;
    parser.expect_eof()?;
    if value < Beat::from_integer(0) {
        return Err(DocError::MalformedExpression {
            expr: raw.to_string(),
            reason: "beat positions must be non-negative".to_string(),
        });
    }
    Ok(value)
}

/// Entry point used by the document model: timing fields arrive either as a
/// JSON number or as an expression string.
#[derive(Debug, Clone)]
pub enum TimeValue {
    Number(f64),
    Expr(String),
}

impl TimeValue {
    pub fn eval(&self) -> Result<Beat, DocError> {
        match self {
            TimeValue::Number(n) => {
                if !n.is_finite() || *n < 0.0 {
                    return Err(DocError::MalformedExpression {
                        expr: n.to_string(),
                        reason: "beat positions must be finite and non-negative".to_string(),
                    });
                }
                Ok(float_to_ratio(*n))
            }
            TimeValue::Expr(s) => eval_expr_str(s),
        }
    }
}

/// Convert an f64 to an exact-enough rational by scaling to thousandths; good
/// enough for JSON-numeric beat positions, which are not expected to carry
/// more precision than that.
fn float_to_ratio(n: f64) -> Beat {
    const SCALE: i64 = 1_000;
    Beat::new((n * SCALE as f64).round() as i64, SCALE)
}

/// Convert an exact beat position to an absolute MIDI tick at 480 ticks/beat,
/// rounding to the nearest tick. Beats are always non-negative (see
/// [`eval_expr_str`]), so round-half-up is exact: `floor((2n + d) / (2d))`.
pub fn beat_to_ticks(beat: Beat, ticks_per_beat: i64) -> i64 {
    let scaled = beat * Beat::from_integer(ticks_per_beat);
    let (num, den) = (*scaled.numer(), *scaled.denom());
    (2 * num + den) / (2 * den)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluates_simple_sum() {
        let v = eval_expr_str("9 + 1/3").unwrap();
        assert_eq!(v, Beat::new(28, 3));
    }

    #[test]
    fn round_trips_to_exact_tick() {
        let v = eval_expr_str("9 + 1/3").unwrap();
        assert_eq!(beat_to_ticks(v, 480), 4480);
    }

    #[test]
    fn respects_precedence() {
        let v = eval_expr_str("2 + 3 * 4").unwrap();
        assert_eq!(v, Beat::from_integer(14));
    }

    #[test]
    fn left_associative_subtraction() {
        let v = eval_expr_str("10 - 2 - 3").unwrap();
        assert_eq!(v, Beat::from_integer(5));
    }

    #[test]
    fn parentheses_override_precedence() {
        let v = eval_expr_str("(2 + 3) * 4").unwrap();
        assert_eq!(v, Beat::from_integer(20));
    }

    #[test]
    fn unary_minus_inside_parens() {
        let v = eval_expr_str("4 + (-1 + 2)").unwrap();
        assert_eq!(v, Beat::from_integer(5));
    }

    #[test]
    fn division_by_zero_is_malformed() {
        assert!(matches!(
            eval_expr_str("1/0"),
            Err(DocError::MalformedExpression { .. })
        ));
    }

    #[test]
    fn unrecognized_token_is_malformed() {
        assert!(matches!(
            eval_expr_str("1 + x"),
            Err(DocError::MalformedExpression { .. })
        ));
    }

    #[test]
    fn negative_result_is_rejected() {
        assert!(matches!(
            eval_expr_str("1 - 2"),
            Err(DocError::MalformedExpression { .. })
        ));
    }

    #[test]
    fn trailing_garbage_is_malformed() {
        assert!(matches!(
            eval_expr_str("1 + 2 3"),
            Err(DocError::MalformedExpression { .. })
        ));
    }

    #[test]
    fn decimal_numbers_parse() {
        let v = eval_expr_str("1.5 + 0.5").unwrap();
        assert_eq!(v, Beat::from_integer(2));
    }
}
