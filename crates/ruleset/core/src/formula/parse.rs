//! Formula tokenizer and recursive-descent parser.
//!
//! Grammar:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/' | '%') unary)*
//! unary   := ('+' | '-') unary | primary
//! primary := NUMBER | '@' PATH | IDENT '(' expr (',' expr)* ')' | '(' expr ')'
//! ```
//!
//! Nothing outside this grammar is accepted. Dice notation such as `1d6`
//! tokenizes as a number followed by an identifier and is rejected.
//!
//! Input is bounded: at most [`MAX_TOKENS`] tokens and [`MAX_DEPTH`] levels of
//! unary/parenthesis/call nesting, which also bounds the evaluator's recursion.

use core::str::FromStr;

use super::{BinaryOp, Expr, FormulaError, Function};

/// Maximum nesting of parentheses, calls and unary signs.
pub const MAX_DEPTH: usize = 64;

/// Maximum number of tokens in one formula.
pub const MAX_TOKENS: usize = 512;

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Number(f64),
    Path(String),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
    Comma,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {n}"),
            Token::Path(p) => format!("@{p}"),
            Token::Ident(name) => format!("'{name}'"),
            Token::Plus => "'+'".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::Star => "'*'".to_string(),
            Token::Slash => "'/'".to_string(),
            Token::Percent => "'%'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Comma => "','".to_string(),
        }
    }
}

/// Parses a formula source into an expression tree.
pub fn parse(source: &str) -> Result<Expr, FormulaError> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(FormulaError::Empty);
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expr()?;

    match parser.tokens.get(parser.pos) {
        None => Ok(expr),
        Some((token, position)) => Err(FormulaError::UnexpectedToken {
            found: token.describe(),
            position: *position,
        }),
    }
}

fn is_path_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '.'
}

fn tokenize(source: &str) -> Result<Vec<(Token, usize)>, FormulaError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if tokens.len() >= MAX_TOKENS {
            return Err(FormulaError::TooLong { limit: MAX_TOKENS });
        }
        let ch = chars[i];
        let start = i;

        let token = match ch {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            c if c.is_ascii_digit() || c == '.' => {
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value = f64::from_str(&text).map_err(|_| FormulaError::InvalidNumber(text))?;
                tokens.push((Token::Number(value), start));
                continue;
            }
            '@' => {
                i += 1;
                while i < chars.len() {
                    let c = chars[i];
                    // `-` only continues a path when it joins two words (`sneak-attack`)
                    let joins_words = c == '-'
                        && i > start + 1
                        && chars[i - 1].is_ascii_alphanumeric()
                        && chars.get(i + 1).is_some_and(|n| n.is_ascii_alphabetic());
                    if is_path_char(c) || joins_words {
                        i += 1;
                    } else {
                        break;
                    }
                }
                let path: String = chars[start + 1..i].iter().collect();
                let path = path.trim_matches('.').to_string();
                if path.is_empty() {
                    return Err(FormulaError::UnexpectedChar {
                        ch: '@',
                        position: start,
                    });
                }
                tokens.push((Token::Path(path), start));
                continue;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let name: String = chars[start..i].iter().collect();
                tokens.push((Token::Ident(name), start));
                continue;
            }
            other => {
                return Err(FormulaError::UnexpectedChar {
                    ch: other,
                    position: start,
                });
            }
        };

        tokens.push((token, start));
        i += 1;
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn next(&mut self) -> Option<(Token, usize)> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), FormulaError> {
        match self.next() {
            Some((token, _)) if token == expected => Ok(()),
            Some((token, position)) => Err(FormulaError::UnexpectedToken {
                found: token.describe(),
                position,
            }),
            None => Err(FormulaError::UnexpectedEnd),
        }
    }

    fn expr(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn term(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    /// Every nested construct re-enters through here, so this is the one
    /// place the nesting depth is checked.
    fn unary(&mut self) -> Result<Expr, FormulaError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(FormulaError::TooDeep { limit: MAX_DEPTH });
        }
        let expr = self.signed();
        self.depth -= 1;
        expr
    }

    fn signed(&mut self) -> Result<Expr, FormulaError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(Expr::Neg(Box::new(self.unary()?)))
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, FormulaError> {
        let Some((token, position)) = self.next() else {
            return Err(FormulaError::UnexpectedEnd);
        };

        match token {
            Token::Number(value) => Ok(Expr::Number(value)),
            Token::Path(path) => Ok(Expr::Path(path)),
            Token::LParen => {
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(name) => {
                let func = Function::from_str(&name.to_ascii_lowercase())
                    .map_err(|_| FormulaError::UnknownFunction(name.clone()))?;
                self.expect(Token::LParen)?;
                let mut args = vec![self.expr()?];
                while self.peek() == Some(&Token::Comma) {
                    self.pos += 1;
                    args.push(self.expr()?);
                }
                self.expect(Token::RParen)?;
                func.check_arity(args.len())?;
                Ok(Expr::Call { func, args })
            }
            other => Err(FormulaError::UnexpectedToken {
                found: other.describe(),
                position,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_precedence() {
        let expr = parse("1 + 2 * 3").unwrap();
        assert_eq!(
            expr,
            Expr::Binary {
                op: BinaryOp::Add,
                lhs: Box::new(Expr::Number(1.0)),
                rhs: Box::new(Expr::Binary {
                    op: BinaryOp::Mul,
                    lhs: Box::new(Expr::Number(2.0)),
                    rhs: Box::new(Expr::Number(3.0)),
                }),
            }
        );
    }

    #[test]
    fn nesting_is_bounded() {
        let nested = |depth: usize| format!("{}1{}", "(".repeat(depth), ")".repeat(depth));

        assert!(parse(&nested(MAX_DEPTH - 1)).is_ok());
        assert_eq!(
            parse(&nested(1000)),
            Err(FormulaError::TooDeep { limit: MAX_DEPTH })
        );
        assert_eq!(
            parse(&"-".repeat(200_000)),
            Err(FormulaError::TooLong { limit: MAX_TOKENS })
        );
        assert_eq!(
            parse(&format!("{}1)", "abs(".repeat(MAX_DEPTH))),
            Err(FormulaError::TooDeep { limit: MAX_DEPTH })
        );
    }

    #[test]
    fn long_sums_are_bounded() {
        let sum = vec!["1"; 100].join(" + ");
        assert!(parse(&sum).is_ok());

        let huge = vec!["1"; 5_000].join(" + ");
        assert_eq!(parse(&huge), Err(FormulaError::TooLong { limit: MAX_TOKENS }));
    }

    #[test]
    fn parses_paths_with_hyphenated_segments() {
        assert_eq!(
            parse("@scale.rogue.sneak-attack").unwrap(),
            Expr::Path("scale.rogue.sneak-attack".into())
        );
    }

    #[test]
    fn hyphen_before_digit_is_subtraction() {
        let expr = parse("@abilities.str.mod-2").unwrap();
        assert!(matches!(
            expr,
            Expr::Binary {
                op: BinaryOp::Sub,
                ..
            }
        ));
    }

    #[test]
    fn rejects_dice_notation() {
        assert!(matches!(
            parse("1d6 + 2"),
            Err(FormulaError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn rejects_unknown_function() {
        assert_eq!(
            parse("eval(1)"),
            Err(FormulaError::UnknownFunction("eval".into()))
        );
    }

    #[test]
    fn rejects_bad_arity() {
        assert!(matches!(parse("floor(1, 2)"), Err(FormulaError::Arity { .. })));
    }

    #[test]
    fn rejects_empty_and_dangling_input() {
        assert_eq!(parse("   "), Err(FormulaError::Empty));
        assert_eq!(parse("1 +"), Err(FormulaError::UnexpectedEnd));
        assert!(matches!(
            parse("(1 + 2"),
            Err(FormulaError::UnexpectedEnd)
        ));
        assert!(matches!(
            parse("2 $ 3"),
            Err(FormulaError::UnexpectedChar { ch: '$', .. })
        ));
    }
}
