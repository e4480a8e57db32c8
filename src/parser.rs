//! Recursive-descent parser for the scripting language.
//!
//! One token of lookahead decides each form; any syntax error fails the
//! whole translation unit (no partial AST is surfaced).
//!
//! ```text
//! program    := statement*
//! statement  := constant | expression
//! constant   := IDENT '=' expression
//! expression := call | literal | list | tuple | range | for
//! call       := IDENT '(' (expression (',' expression)*)? ')'
//! literal    := STRING | NUMBER | IDENT
//! list       := '[' (expression (',' expression)*)? ']'
//! tuple      := '(' expression ',' expression (',' expression)* ')'
//! range      := NUMBER '..' NUMBER
//! for        := 'for' IDENT 'in' expression '{' expression* '}'
//! ```

use std::fmt;

use crate::ast::{Ast, ExpressionId, ExpressionKind, Statement, StatementKind};
use crate::lexer::{Span, Token, TokenKind};

/// Failures that abort parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    UnexpectedToken { expected: String, found: Token },
    UnexpectedEof { expected: String },
    /// A parenthesised group with fewer than two elements.
    ShortTuple { span: Span },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnexpectedToken { expected, found } => write!(
                f,
                "expected {expected} but got {} `{}` at byte {}",
                found.kind, found.lexeme, found.span.start
            ),
            ParseError::UnexpectedEof { expected } => {
                write!(f, "expected {expected} but ran out of tokens")
            }
            ParseError::ShortTuple { span } => write!(
                f,
                "a tuple requires at least two elements (at byte {})",
                span.start
            ),
        }
    }
}

impl std::error::Error for ParseError {}

pub struct Parser {
    tokens: Vec<Token>,
    cursor: usize,
    ast: Ast,
}

impl Parser {
    /// Parse a token sequence into an [`Ast`].
    pub fn parse(tokens: Vec<Token>) -> Result<Ast, ParseError> {
        let mut parser = Parser {
            tokens,
            cursor: 0,
            ast: Ast::default(),
        };

        while parser.has_more() {
            let statement = parser.statement()?;
            parser.ast.statements.push(statement);
        }

        Ok(parser.ast)
    }

    fn statement(&mut self) -> Result<Statement, ParseError> {
        let id = self.expression()?;
        Ok(Statement {
            kind: StatementKind::Expression(id),
            span: self.ast.expression(id).span,
        })
    }

    fn expression(&mut self) -> Result<ExpressionId, ParseError> {
        let Some(token) = self.peek() else {
            return Err(ParseError::UnexpectedEof {
                expected: "an expression".to_string(),
            });
        };

        match token.kind {
            TokenKind::Keyword if token.lexeme == "for" => self.for_loop(),
            TokenKind::Identifier => match self.peek_at(1).map(|t| t.kind) {
                Some(TokenKind::LeftParen) => self.call(),
                Some(TokenKind::Equals) => self.constant(),
                _ => self.variable(),
            },
            TokenKind::StringLiteral => self.string_literal(),
            TokenKind::Number => match self.peek_at(1).map(|t| t.kind) {
                Some(TokenKind::DotDot) => self.range(),
                _ => self.number(),
            },
            TokenKind::LeftBracket => self.list(),
            TokenKind::LeftParen => self.tuple(),
            _ => Err(ParseError::UnexpectedToken {
                expected: "an expression".to_string(),
                found: token.clone(),
            }),
        }
    }

    fn variable(&mut self) -> Result<ExpressionId, ParseError> {
        let name = self.expect(TokenKind::Identifier)?;
        let span = name.span;
        Ok(self.ast.intern(ExpressionKind::Variable { name }, span))
    }

    fn string_literal(&mut self) -> Result<ExpressionId, ParseError> {
        let literal = self.expect(TokenKind::StringLiteral)?;
        let span = literal.span;
        Ok(self.ast.intern(ExpressionKind::StringLiteral { literal }, span))
    }

    fn number(&mut self) -> Result<ExpressionId, ParseError> {
        let number = self.expect(TokenKind::Number)?;
        let span = number.span;
        Ok(self.ast.intern(ExpressionKind::Number { number }, span))
    }

    fn list(&mut self) -> Result<ExpressionId, ParseError> {
        let left = self.expect(TokenKind::LeftBracket)?;
        let elements = self.elements_until(TokenKind::RightBracket)?;
        let right = self.expect(TokenKind::RightBracket)?;
        Ok(self.ast.intern(
            ExpressionKind::List { elements },
            Span::join(left.span, right.span),
        ))
    }

    fn tuple(&mut self) -> Result<ExpressionId, ParseError> {
        let left = self.expect(TokenKind::LeftParen)?;
        let elements = self.elements_until(TokenKind::RightParen)?;
        let right = self.expect(TokenKind::RightParen)?;
        let span = Span::join(left.span, right.span);
        if elements.len() < 2 {
            return Err(ParseError::ShortTuple { span });
        }
        Ok(self.ast.intern(ExpressionKind::Tuple { elements }, span))
    }

    fn call(&mut self) -> Result<ExpressionId, ParseError> {
        let callee = self.expect(TokenKind::Identifier)?;
        self.expect(TokenKind::LeftParen)?;
        let arguments = self.elements_until(TokenKind::RightParen)?;
        let right = self.expect(TokenKind::RightParen)?;
        Ok(self.ast.intern(
            ExpressionKind::Call { callee: callee.clone(), arguments },
            Span::join(callee.span, right.span),
        ))
    }

    fn constant(&mut self) -> Result<ExpressionId, ParseError> {
        let name = self.expect(TokenKind::Identifier)?;
        self.expect(TokenKind::Equals)?;
        let value = self.expression()?;
        let span = Span::join(name.span, self.ast.expression(value).span);
        Ok(self.ast.intern(ExpressionKind::Constant { name, value }, span))
    }

    fn range(&mut self) -> Result<ExpressionId, ParseError> {
        let start = self.expect(TokenKind::Number)?;
        self.expect(TokenKind::DotDot)?;
        let end = self.expect(TokenKind::Number)?;
        let span = Span::join(start.span, end.span);
        Ok(self.ast.intern(ExpressionKind::Range { start, end }, span))
    }

    fn for_loop(&mut self) -> Result<ExpressionId, ParseError> {
        let for_token = self.expect_keyword("for")?;
        let binder = self.expect(TokenKind::Identifier)?;
        self.expect_keyword("in")?;
        let range = self.expression()?;

        self.expect(TokenKind::LeftCurly)?;
        let mut body = Vec::new();
        loop {
            match self.peek() {
                None => {
                    return Err(ParseError::UnexpectedEof {
                        expected: "`}`".to_string(),
                    })
                }
                Some(token) if token.kind == TokenKind::RightCurly => break,
                Some(_) => body.push(self.expression()?),
            }
        }
        let right = self.expect(TokenKind::RightCurly)?;

        Ok(self.ast.intern(
            ExpressionKind::For {
                binder,
                range,
                body,
            },
            Span::join(for_token.span, right.span),
        ))
    }

    /// Comma-separated expressions up to (but not consuming) `closer`.
    /// A trailing comma before the closer is accepted.
    fn elements_until(&mut self, closer: TokenKind) -> Result<Vec<ExpressionId>, ParseError> {
        let mut elements = Vec::new();
        if self.peek_is(closer) {
            return Ok(elements);
        }
        loop {
            elements.push(self.expression()?);
            if self.peek_is(TokenKind::Comma) {
                self.next_token();
                if self.peek_is(closer) {
                    break;
                }
                continue;
            }
            break;
        }
        Ok(elements)
    }

    fn expect(&mut self, expected: TokenKind) -> Result<Token, ParseError> {
        match self.next_token() {
            None => Err(ParseError::UnexpectedEof {
                expected: expected.to_string(),
            }),
            Some(token) if token.kind == expected => Ok(token),
            Some(token) => Err(ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: token,
            }),
        }
    }

    fn expect_keyword(&mut self, word: &str) -> Result<Token, ParseError> {
        match self.next_token() {
            None => Err(ParseError::UnexpectedEof {
                expected: format!("keyword `{word}`"),
            }),
            Some(token) if token.kind == TokenKind::Keyword && token.lexeme == word => Ok(token),
            Some(token) => Err(ParseError::UnexpectedToken {
                expected: format!("keyword `{word}`"),
                found: token,
            }),
        }
    }

    fn has_more(&self) -> bool {
        self.cursor < self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.cursor + offset)
    }

    fn peek_is(&self, kind: TokenKind) -> bool {
        self.peek().is_some_and(|token| token.kind == kind)
    }

    fn next_token(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.cursor).cloned();
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(source: &str) -> Result<Ast, ParseError> {
        Parser::parse(Lexer::lex(source).unwrap())
    }

    fn root_kind(ast: &Ast, statement: usize) -> &ExpressionKind {
        let StatementKind::Expression(id) = ast.statements[statement].kind;
        &ast.expression(id).kind
    }

    #[test]
    fn parses_a_call_with_nested_structure() {
        let ast = parse(r#"spawn_process("worker", 0, 3, [("Cpu", 5), ("Io", 2)])"#).unwrap();
        assert_eq!(ast.statements.len(), 1);

        let ExpressionKind::Call { callee, arguments } = root_kind(&ast, 0) else {
            panic!("expected a call");
        };
        assert_eq!(callee.lexeme, "spawn_process");
        assert_eq!(arguments.len(), 4);

        let ExpressionKind::List { elements } = &ast.expression(arguments[3]).kind else {
            panic!("expected a list argument");
        };
        assert_eq!(elements.len(), 2);
        for &element in elements {
            let ExpressionKind::Tuple { elements } = &ast.expression(element).kind else {
                panic!("expected tuple elements");
            };
            assert_eq!(elements.len(), 2);
        }
    }

    #[test]
    fn parses_constants_and_variables() {
        let ast = parse("schedule_policy = RoundRobin\nthreads_count = 4").unwrap();
        assert_eq!(ast.statements.len(), 2);

        let ExpressionKind::Constant { name, value } = root_kind(&ast, 0) else {
            panic!("expected a constant definition");
        };
        assert_eq!(name.lexeme, "schedule_policy");
        assert!(matches!(
            ast.expression(*value).kind,
            ExpressionKind::Variable { .. }
        ));

        let ExpressionKind::Constant { name, value } = root_kind(&ast, 1) else {
            panic!("expected a constant definition");
        };
        assert_eq!(name.lexeme, "threads_count");
        assert!(matches!(
            ast.expression(*value).kind,
            ExpressionKind::Number { .. }
        ));
    }

    #[test]
    fn parses_for_loops_over_ranges() {
        let ast = parse("for i in 0..5 { spawn_random_process() }").unwrap();
        let ExpressionKind::For {
            binder,
            range,
            body,
        } = root_kind(&ast, 0)
        else {
            panic!("expected a for loop");
        };
        assert_eq!(binder.lexeme, "i");
        assert_eq!(body.len(), 1);

        let ExpressionKind::Range { start, end } = &ast.expression(*range).kind else {
            panic!("expected a range");
        };
        assert_eq!(start.lexeme, "0");
        assert_eq!(end.lexeme, "5");
    }

    #[test]
    fn empty_list_parses_and_short_tuple_does_not() {
        let ast = parse("spawn_process(x, 0, 0, [])").unwrap();
        assert_eq!(ast.statements.len(), 1);

        assert!(matches!(
            parse("(1)"),
            Err(ParseError::ShortTuple { .. })
        ));
    }

    #[test]
    fn syntax_errors_name_the_offending_token() {
        let err = parse("spawn_process(1,").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEof { .. }));

        let err = parse("for x 0..2 { }").unwrap_err();
        let ParseError::UnexpectedToken { expected, found } = err else {
            panic!("expected an unexpected-token error");
        };
        assert_eq!(expected, "keyword `in`");
        assert_eq!(found.lexeme, "0");
    }

    #[test]
    fn colon_is_lexed_but_never_parsed() {
        assert!(parse("x : 1").is_err());
    }
}
