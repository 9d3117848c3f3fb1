/// Recursive-descent parser for signature expressions.
use crate::ast::*;
use crate::error::SignatureError;
use crate::lexer::{Lexer, SpannedToken, Token};

pub struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl Parser {
    pub fn parse(input: &str) -> Result<Expr, SignatureError> {
        let mut lexer = Lexer::new(input);
        let tokens = lexer.tokenize()?;
        let mut parser = Self { tokens, pos: 0 };
        parser.parse_expr()
    }

    // -- Helpers --

    fn peek(&self) -> &Token {
        &self.tokens[self.pos].token
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + offset).min(last)].token
    }

    fn current_col(&self) -> usize {
        self.tokens[self.pos].col
    }

    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn at(&self, token: &Token) -> bool {
        self.peek() == token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.at(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&self, message: String) -> SignatureError {
        SignatureError::Parse {
            col: self.current_col(),
            message,
        }
    }

    fn expect_ident(&mut self) -> Result<(String, usize), SignatureError> {
        match self.peek().clone() {
            Token::Ident(s) => {
                let col = self.current_col();
                self.advance();
                Ok((s, col))
            }
            // Only a lone `0` is special; other numbers are looked up like
            // any other name.
            Token::Integer(n) if n != 0 => {
                let col = self.current_col();
                self.advance();
                Ok((n.to_string(), col))
            }
            other => Err(self.error(format!("expected component name, got {other}"))),
        }
    }

    // -- Expression --

    fn parse_expr(&mut self) -> Result<Expr, SignatureError> {
        if self.at(&Token::Integer(0)) {
            self.advance();
            if !self.at(&Token::Eof) {
                return Err(self.error("'0' must be the whole expression".to_string()));
            }
            return Ok(Expr::Nothing);
        }

        let mut clauses = vec![self.parse_clause(false)?];
        loop {
            if self.eat(&Token::Comma) {
                clauses.push(self.parse_clause(false)?);
            } else if self.eat(&Token::OrOr) {
                clauses.push(self.parse_clause(true)?);
            } else if self.at(&Token::Eof) {
                break;
            } else {
                return Err(self.error(format!("expected ',' or '||', got {}", self.peek())));
            }
        }
        Ok(Expr::Clauses(clauses))
    }

    // -- Clause --

    fn parse_clause(&mut self, or: bool) -> Result<Clause, SignatureError> {
        let prefix = match self.peek() {
            Token::Bang => Some(ClauseOp::Not),
            Token::Question => Some(ClauseOp::Optional),
            _ => None,
        };
        let op = match (or, prefix) {
            (true, Some(_)) => {
                return Err(self.error("an OR clause cannot carry a prefix".to_string()));
            }
            (true, None) => ClauseOp::Or,
            (false, Some(op)) => {
                self.advance();
                op
            }
            (false, None) => ClauseOp::And,
        };

        let source = self.parse_source()?;
        let (name, col) = self.expect_ident()?;
        Ok(Clause {
            op,
            source,
            name,
            col,
        })
    }

    fn parse_source(&mut self) -> Result<SourceKind, SignatureError> {
        let source = match (self.peek(), self.peek_at(1)) {
            (Token::Ident(word), Token::Dot) => match word.as_str() {
                "ENTITY" => SourceKind::FromEntity,
                "SYSTEM" => SourceKind::FromSystem,
                "ID" => SourceKind::FromId,
                other => return Err(self.error(format!("unknown source '{other}'"))),
            },
            _ => return Ok(SourceKind::FromEntity),
        };
        self.advance(); // source
        self.advance(); // .
        Ok(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clause(op: ClauseOp, source: SourceKind, name: &str, col: usize) -> Clause {
        Clause {
            op,
            source,
            name: name.to_string(),
            col,
        }
    }

    #[test]
    fn test_parse_and_clauses() {
        let expr = Parser::parse("Position, Velocity").unwrap();
        assert_eq!(
            expr.clauses(),
            &[
                clause(ClauseOp::And, SourceKind::FromEntity, "Position", 1),
                clause(ClauseOp::And, SourceKind::FromEntity, "Velocity", 11),
            ]
        );
    }

    #[test]
    fn test_parse_prefixes_and_sources() {
        let expr = Parser::parse("!ID.Frozen, ?SYSTEM.Config, ENTITY.Mass || Weight").unwrap();
        let ops: Vec<_> = expr.clauses().iter().map(|c| (c.op, c.source)).collect();
        assert_eq!(
            ops,
            vec![
                (ClauseOp::Not, SourceKind::FromId),
                (ClauseOp::Optional, SourceKind::FromSystem),
                (ClauseOp::And, SourceKind::FromEntity),
                (ClauseOp::Or, SourceKind::FromEntity),
            ]
        );
    }

    #[test]
    fn test_parse_zero() {
        assert_eq!(Parser::parse("0").unwrap(), Expr::Nothing);
        assert!(Parser::parse("0, Position").is_err());
        assert!(Parser::parse("Position, 0").is_err());
    }

    #[test]
    fn test_nonzero_integer_is_a_name() {
        let expr = Parser::parse("Position, 5").unwrap();
        assert_eq!(
            expr.clauses()[1],
            clause(ClauseOp::And, SourceKind::FromEntity, "5", 11)
        );
        assert_eq!(
            Parser::parse("1").unwrap().clauses(),
            &[clause(ClauseOp::And, SourceKind::FromEntity, "1", 1)]
        );
    }

    #[test]
    fn test_leading_or_is_rejected() {
        assert!(matches!(
            Parser::parse("|| Position"),
            Err(SignatureError::Parse { col: 1, .. })
        ));
    }

    #[test]
    fn test_or_with_prefix_is_rejected() {
        assert!(Parser::parse("Position || !Velocity").is_err());
    }

    #[test]
    fn test_trailing_separator_is_rejected() {
        assert!(matches!(
            Parser::parse("Position,"),
            Err(SignatureError::Parse { col: 10, .. })
        ));
    }

    #[test]
    fn test_source_keyword_without_dot_is_a_name() {
        let expr = Parser::parse("SYSTEM").unwrap();
        assert_eq!(
            expr.clauses(),
            &[clause(ClauseOp::And, SourceKind::FromEntity, "SYSTEM", 1)]
        );
    }

    #[test]
    fn test_unknown_source() {
        assert!(Parser::parse("WORLD.Position").is_err());
    }
}
