//! Textual state expressions: a logos lexer and a recursive descent parser.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! or      := and (("|" | "||" | "or") and)*
//! and     := unary (("&" | "&&" | "and") unary)*
//! unary   := ("!" | "not") unary | primary
//! primary := NAME | "true" | "(" or ")"
//! ```

use logos::Logos;

use super::expression::StateExpression;

/// Errors from state expression parsing. Positions are byte offsets.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unexpected token at position {position}: {message}")]
    UnexpectedToken { position: usize, message: String },
    #[error("unexpected end of input: {0}")]
    UnexpectedEof(String),
}

/// State expression token.
///
/// Keywords are exact tokens, so they win over [`Token::Name`] for inputs of
/// equal length while longer names such as `android` still lex as names.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\n\r\f]+")]
pub enum Token {
    #[token("&&")]
    #[token("&")]
    #[token("and")]
    And,

    #[token("||")]
    #[token("|")]
    #[token("or")]
    Or,

    #[token("!")]
    #[token("not")]
    Not,

    #[token("true")]
    True,

    #[token("(")]
    ParenOpen,

    #[token(")")]
    ParenClose,

    /// State name: `pressed`, `drop-target`, `_internal`.
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_-]*")]
    Name,
}

#[derive(Debug, Clone, Copy)]
struct PToken {
    token: Token,
    start: usize,
    end: usize,
}

fn tokenize(input: &str) -> Result<Vec<PToken>, ParseError> {
    Token::lexer(input)
        .spanned()
        .map(|(result, span)| match result {
            Ok(token) => Ok(PToken {
                token,
                start: span.start,
                end: span.end,
            }),
            Err(()) => Err(ParseError::UnexpectedToken {
                position: span.start,
                message: format!("unrecognized input '{}'", &input[span]),
            }),
        })
        .collect()
}

/// Parse a textual state expression such as `pressed & !(hover | focus)`.
pub fn parse_state_expression(input: &str) -> Result<StateExpression, ParseError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        input,
        tokens,
        cursor: 0,
    };
    let expr = parser.parse_or()?;
    if let Some(tok) = parser.peek() {
        return Err(parser.unexpected(tok, "expected end of expression"));
    }
    Ok(expr)
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<PToken>,
    cursor: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<PToken> {
        self.tokens.get(self.cursor).copied()
    }

    fn advance(&mut self) -> Option<PToken> {
        let tok = self.peek()?;
        self.cursor += 1;
        Some(tok)
    }

    fn eat(&mut self, token: Token) -> bool {
        if self.peek().is_some_and(|tok| tok.token == token) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    fn text(&self, tok: PToken) -> &str {
        &self.input[tok.start..tok.end]
    }

    fn unexpected(&self, tok: PToken, expected: &str) -> ParseError {
        ParseError::UnexpectedToken {
            position: tok.start,
            message: format!("{expected}, got '{}'", self.text(tok)),
        }
    }

    fn parse_or(&mut self) -> Result<StateExpression, ParseError> {
        let mut expr = self.parse_and()?;
        while self.eat(Token::Or) {
            expr = expr.or(self.parse_and()?);
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<StateExpression, ParseError> {
        let mut expr = self.parse_unary()?;
        while self.eat(Token::And) {
            expr = expr.and(self.parse_unary()?);
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<StateExpression, ParseError> {
        if self.eat(Token::Not) {
            return Ok(self.parse_unary()?.not());
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<StateExpression, ParseError> {
        let Some(tok) = self.advance() else {
            return Err(ParseError::UnexpectedEof(
                "expected a state name or '('".into(),
            ));
        };
        match tok.token {
            Token::Name => Ok(StateExpression::state(self.text(tok))),
            Token::True => Ok(StateExpression::Always),
            Token::ParenOpen => {
                let inner = self.parse_or()?;
                match self.advance() {
                    Some(close) if close.token == Token::ParenClose => Ok(inner),
                    Some(other) => Err(self.unexpected(other, "expected ')'")),
                    None => Err(ParseError::UnexpectedEof("expected ')'".into())),
                }
            }
            _ => Err(self.unexpected(tok, "expected a state name or '('")),
        }
    }
}
