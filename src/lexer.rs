//! Lexical analysis for the workload scripting language.
//!
//! A single left-to-right scan turns source text into tokens. Whitespace
//! and `#` line comments are skipped; any unrecognised character or
//! unterminated string aborts the scan.

use std::fmt;

/// Byte range of a token in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn join(lhs: Span, rhs: Span) -> Span {
        Span {
            start: lhs.start,
            end: rhs.end,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Single character tokens
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftCurly,
    RightCurly,
    Comma,
    Colon,
    Equals,

    // Multi character tokens
    DotDot,
    Keyword,
    Identifier,
    StringLiteral,
    Number,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::LeftParen => "`(`",
            TokenKind::RightParen => "`)`",
            TokenKind::LeftBracket => "`[`",
            TokenKind::RightBracket => "`]`",
            TokenKind::LeftCurly => "`{`",
            TokenKind::RightCurly => "`}`",
            TokenKind::Comma => "`,`",
            TokenKind::Colon => "`:`",
            TokenKind::Equals => "`=`",
            TokenKind::DotDot => "`..`",
            TokenKind::Keyword => "keyword",
            TokenKind::Identifier => "identifier",
            TokenKind::StringLiteral => "string literal",
            TokenKind::Number => "number",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub lexeme: String,
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn is_keyword(lexeme: &str) -> bool {
        matches!(lexeme, "for" | "in")
    }
}

/// Failures that abort the scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    /// A character no token class starts with.
    UnexpectedCharacter { ch: char, at: usize },
    /// A `"` that was never closed before end of input.
    UnterminatedString { at: usize },
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::UnexpectedCharacter { ch, at } => {
                write!(f, "unexpected character {ch:?} at byte {at}")
            }
            LexError::UnterminatedString { at } => {
                write!(f, "unterminated string literal starting at byte {at}")
            }
        }
    }
}

impl std::error::Error for LexError {}

pub struct Lexer<'a> {
    source: &'a str,
    cursor: usize,
}

impl<'a> Lexer<'a> {
    /// Scan `source` into its token sequence.
    pub fn lex(source: &str) -> Result<Vec<Token>, LexError> {
        let mut lexer = Lexer { source, cursor: 0 };
        let mut tokens = Vec::new();

        loop {
            lexer.skip_trivia();
            let Some(ch) = lexer.peek() else {
                break;
            };
            tokens.push(lexer.next_token(ch)?);
        }

        Ok(tokens)
    }

    fn next_token(&mut self, ch: char) -> Result<Token, LexError> {
        match ch {
            '(' => Ok(self.single_character_token(TokenKind::LeftParen)),
            ')' => Ok(self.single_character_token(TokenKind::RightParen)),
            '[' => Ok(self.single_character_token(TokenKind::LeftBracket)),
            ']' => Ok(self.single_character_token(TokenKind::RightBracket)),
            '{' => Ok(self.single_character_token(TokenKind::LeftCurly)),
            '}' => Ok(self.single_character_token(TokenKind::RightCurly)),
            ',' => Ok(self.single_character_token(TokenKind::Comma)),
            ':' => Ok(self.single_character_token(TokenKind::Colon)),
            '=' => Ok(self.single_character_token(TokenKind::Equals)),
            '.' => self.dotdot(),
            '"' => self.string_literal(),
            c if c.is_ascii_digit() => Ok(self.number()),
            c if c.is_ascii_alphabetic() || c == '_' => Ok(self.keyword_or_identifier()),
            c => Err(LexError::UnexpectedCharacter {
                ch: c,
                at: self.cursor,
            }),
        }
    }

    fn single_character_token(&mut self, kind: TokenKind) -> Token {
        let start = self.cursor;
        let ch = self.advance().expect("caller peeked a character");
        Token {
            lexeme: ch.to_string(),
            kind,
            span: Span {
                start,
                end: self.cursor,
            },
        }
    }

    fn dotdot(&mut self) -> Result<Token, LexError> {
        let start = self.cursor;
        self.advance();
        if self.peek() != Some('.') {
            return Err(LexError::UnexpectedCharacter { ch: '.', at: start });
        }
        self.advance();
        Ok(Token {
            lexeme: "..".to_string(),
            kind: TokenKind::DotDot,
            span: Span {
                start,
                end: self.cursor,
            },
        })
    }

    fn string_literal(&mut self) -> Result<Token, LexError> {
        let quote_at = self.cursor;
        self.advance();

        let start = self.cursor;
        loop {
            match self.peek() {
                Some('"') => {
                    let end = self.cursor;
                    self.advance();
                    return Ok(Token {
                        lexeme: self.source[start..end].to_string(),
                        kind: TokenKind::StringLiteral,
                        span: Span { start, end },
                    });
                }
                Some(_) => {
                    self.advance();
                }
                None => return Err(LexError::UnterminatedString { at: quote_at }),
            }
        }
    }

    fn number(&mut self) -> Token {
        let start = self.cursor;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        Token {
            lexeme: self.source[start..self.cursor].to_string(),
            kind: TokenKind::Number,
            span: Span {
                start,
                end: self.cursor,
            },
        }
    }

    fn keyword_or_identifier(&mut self) -> Token {
        let start = self.cursor;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.advance();
        }
        let lexeme = &self.source[start..self.cursor];
        Token {
            lexeme: lexeme.to_string(),
            kind: if Token::is_keyword(lexeme) {
                TokenKind::Keyword
            } else {
                TokenKind::Identifier
            },
            span: Span {
                start,
                end: self.cursor,
            },
        }
    }

    /// Skip whitespace and `#` line comments.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('#') => {
                    while !matches!(self.peek(), None | Some('\n')) {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn peek(&self) -> Option<char> {
        self.source[self.cursor..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.cursor += ch.len_utf8();
        Some(ch)
    }
}
