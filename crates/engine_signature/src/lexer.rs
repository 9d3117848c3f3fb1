/// Lexer for signature expressions.
use std::fmt;

use crate::error::SignatureError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Ident(String),
    Integer(u64),

    // Punctuation
    Comma,
    OrOr,
    Bang,
    Question,
    Dot,

    // Special
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "{s}"),
            Token::Integer(n) => write!(f, "{n}"),
            Token::Comma => write!(f, ","),
            Token::OrOr => write!(f, "||"),
            Token::Bang => write!(f, "!"),
            Token::Question => write!(f, "?"),
            Token::Dot => write!(f, "."),
            Token::Eof => write!(f, "end of expression"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpannedToken {
    pub token: Token,
    pub col: usize,
}

pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<SpannedToken>, SignatureError> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let is_eof = tok.token == Token::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn peek_byte(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek_byte() {
            if b.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a [u8] {
        let input = self.input;
        let start = self.pos;
        while self.peek_byte().is_some_and(&pred) {
            self.pos += 1;
        }
        &input[start..self.pos]
    }

    fn next_token(&mut self) -> Result<SpannedToken, SignatureError> {
        self.skip_whitespace();

        let col = self.pos + 1;
        let Some(b) = self.peek_byte() else {
            return Ok(SpannedToken {
                token: Token::Eof,
                col,
            });
        };

        let punct = match b {
            b',' => Some(Token::Comma),
            b'!' => Some(Token::Bang),
            b'?' => Some(Token::Question),
            b'.' => Some(Token::Dot),
            _ => None,
        };
        if let Some(token) = punct {
            self.pos += 1;
            return Ok(SpannedToken { token, col });
        }

        if b == b'|' {
            if self.input.get(self.pos + 1) == Some(&b'|') {
                self.pos += 2;
                return Ok(SpannedToken {
                    token: Token::OrOr,
                    col,
                });
            }
            return Err(SignatureError::Parse {
                col,
                message: "expected '||'".to_string(),
            });
        }

        if b.is_ascii_digit() {
            let digits = self.take_while(|d| d.is_ascii_digit());
            let num = digits
                .iter()
                .try_fold(0u64, |acc, d| acc.checked_mul(10)?.checked_add(u64::from(d - b'0')))
                .ok_or_else(|| SignatureError::Parse {
                    col,
                    message: "integer literal out of range".to_string(),
                })?;
            return Ok(SpannedToken {
                token: Token::Integer(num),
                col,
            });
        }

        if b.is_ascii_alphabetic() || b == b'_' {
            let word = self.take_while(|c| c.is_ascii_alphanumeric() || c == b'_');
            // Only ASCII bytes were consumed.
            let word = String::from_utf8_lossy(word).into_owned();
            return Ok(SpannedToken {
                token: Token::Ident(word),
                col,
            });
        }

        Err(SignatureError::Parse {
            col,
            message: format!("unexpected character: '{}'", b as char),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn test_basic_tokens() {
        assert_eq!(
            tokens("Position, !ENTITY.Frozen || ?Velocity"),
            vec![
                Token::Ident("Position".to_string()),
                Token::Comma,
                Token::Bang,
                Token::Ident("ENTITY".to_string()),
                Token::Dot,
                Token::Ident("Frozen".to_string()),
                Token::OrOr,
                Token::Question,
                Token::Ident("Velocity".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_zero_literal() {
        assert_eq!(tokens(" 0 "), vec![Token::Integer(0), Token::Eof]);
    }

    #[test]
    fn test_columns_are_one_based() {
        let spanned = Lexer::new("A,  B").tokenize().unwrap();
        assert_eq!(spanned[0].col, 1);
        assert_eq!(spanned[1].col, 2);
        assert_eq!(spanned[2].col, 5);
    }

    #[test]
    fn test_single_pipe_is_rejected() {
        let err = Lexer::new("A | B").tokenize().unwrap_err();
        assert_eq!(
            err,
            SignatureError::Parse {
                col: 3,
                message: "expected '||'".to_string()
            }
        );
    }

    #[test]
    fn test_unexpected_character() {
        assert!(matches!(
            Lexer::new("Position; Velocity").tokenize(),
            Err(SignatureError::Parse { col: 9, .. })
        ));
    }
}
