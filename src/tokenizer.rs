use std::fmt::Display;

use crate::ast::Literal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    // Single-character tokens
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comma,
    Dot,
    Minus,
    Plus,
    Semicolon,
    Slash,
    Star,

    // One or two character tokens
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,

    // Literals
    Identifier,
    String,
    Number,

    // Keywords
    Else,
    False,
    Fun,
    For,
    If,
    Nil,
    Or,
    Print,
    Return,
    Super,
    This,
    True,
    Var,
    While,

    // End of file
    Eof,
}

impl TokenType {
    fn keyword(text: &str) -> Option<TokenType> {
        let keyword = match text {
            "else" => TokenType::Else,
            "false" => TokenType::False,
            "for" => TokenType::For,
            "fun" => TokenType::Fun,
            "if" => TokenType::If,
            "nil" => TokenType::Nil,
            "or" => TokenType::Or,
            "print" => TokenType::Print,
            "return" => TokenType::Return,
            "super" => TokenType::Super,
            "this" => TokenType::This,
            "true" => TokenType::True,
            "var" => TokenType::Var,
            "while" => TokenType::While,
            _ => return None,
        };
        Some(keyword)
    }
}

impl Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            TokenType::LeftParen => "(",
            TokenType::RightParen => ")",
            TokenType::LeftBrace => "{",
            TokenType::RightBrace => "}",
            TokenType::Comma => ",",
            TokenType::Dot => ".",
            TokenType::Minus => "-",
            TokenType::Plus => "+",
            TokenType::Semicolon => ";",
            TokenType::Slash => "/",
            TokenType::Star => "*",
            TokenType::Bang => "!",
            TokenType::BangEqual => "!=",
            TokenType::Equal => "=",
            TokenType::EqualEqual => "==",
            TokenType::Greater => ">",
            TokenType::GreaterEqual => ">=",
            TokenType::Less => "<",
            TokenType::LessEqual => "<=",
            TokenType::Identifier => "identifier",
            TokenType::String => "string",
            TokenType::Number => "number",
            TokenType::Else => "else",
            TokenType::False => "false",
            TokenType::Fun => "fun",
            TokenType::For => "for",
            TokenType::If => "if",
            TokenType::Nil => "nil",
            TokenType::Or => "or",
            TokenType::Print => "print",
            TokenType::Return => "return",
            TokenType::Super => "super",
            TokenType::This => "this",
            TokenType::True => "true",
            TokenType::Var => "var",
            TokenType::While => "while",
            TokenType::Eof => "end of file",
        };
        write!(f, "{text}")
    }
}

/// A single lexeme, immutable once the tokenizer hands it out.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub lexeme: String,
    pub literal: Option<Literal>,
    pub line: usize,
}

impl Token {
    pub fn new(
        token_type: TokenType,
        lexeme: impl Into<String>,
        literal: Option<Literal>,
        line: usize,
    ) -> Self {
        Self {
            token_type,
            lexeme: lexeme.into(),
            literal,
            line,
        }
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} {}", self.token_type, self.lexeme)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TokenizeErrorKind {
    #[error("Unexpected character: {0}")]
    UnexpectedCharacter(char),
    #[error("Unterminated string.")]
    UnterminatedString,
    #[error("Unterminated block comment.")]
    UnterminatedBlockComment,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("[line {line}] Error: {kind}")]
pub struct TokenizeError {
    pub line: usize,
    pub kind: TokenizeErrorKind,
}

/// Every lexical diagnostic found in a source, in source order.
#[derive(Debug)]
pub struct TokenizeErrors(pub Vec<TokenizeError>);

impl TokenizeErrors {
    pub fn first(&self) -> Option<&TokenizeError> {
        self.0.first()
    }
}

impl std::error::Error for TokenizeErrors {}

impl Display for TokenizeErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

/// Scans the whole source. An unexpected character is recorded and skipped so
/// the rest of the source is still checked; the result is an error if any
/// diagnostic was recorded.
pub fn tokens(source: &str) -> Result<Vec<Token>, TokenizeErrors> {
    let mut tokenizer = Tokenizer::new(source);
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    loop {
        match tokenizer.token() {
            Ok(token) => {
                tracing::debug!(line = token.line, "{token}");
                let is_eof = token.token_type == TokenType::Eof;
                tokens.push(token);
                if is_eof {
                    break;
                }
            }
            Err(error) => {
                tracing::debug!(%error, "tokenize error");
                errors.push(error);
            }
        }
    }

    if !errors.is_empty() {
        return Err(TokenizeErrors(errors));
    }

    Ok(tokens)
}

pub struct Tokenizer<'a> {
    source: &'a str,
    start: usize,
    current: usize,
    line: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            start: 0,
            current: 0,
            line: 1,
        }
    }

    /// Produces the next token. Once the source is exhausted every call
    /// returns an `Eof` token with an empty lexeme.
    pub fn token(&mut self) -> Result<Token, TokenizeError> {
        loop {
            self.start = self.current;
            let Some(c) = self.advance() else {
                return Ok(self.make_token(TokenType::Eof, None));
            };

            let token_type = match c {
                '(' => TokenType::LeftParen,
                ')' => TokenType::RightParen,
                '{' => TokenType::LeftBrace,
                '}' => TokenType::RightBrace,
                ',' => TokenType::Comma,
                '.' => TokenType::Dot,
                '-' => TokenType::Minus,
                '+' => TokenType::Plus,
                ';' => TokenType::Semicolon,
                '*' => TokenType::Star,
                '!' => self.either('=', TokenType::BangEqual, TokenType::Bang),
                '=' => self.either('=', TokenType::EqualEqual, TokenType::Equal),
                '<' => self.either('=', TokenType::LessEqual, TokenType::Less),
                '>' => self.either('=', TokenType::GreaterEqual, TokenType::Greater),
                '/' => {
                    if self.matches('/') {
                        while self.peek().is_some_and(|c| c != '\n') {
                            self.advance();
                        }
                        continue;
                    } else if self.matches('*') {
                        self.block_comment()?;
                        continue;
                    } else {
                        TokenType::Slash
                    }
                }
                ' ' | '\r' | '\t' => continue,
                '\n' => {
                    self.line += 1;
                    continue;
                }
                '"' => return self.string(),
                c if c.is_ascii_digit() => return Ok(self.number()),
                c if is_identifier_start(c) => return Ok(self.identifier()),
                c => {
                    return Err(TokenizeError {
                        line: self.line,
                        kind: TokenizeErrorKind::UnexpectedCharacter(c),
                    })
                }
            };

            return Ok(self.make_token(token_type, None));
        }
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.current += c.len_utf8();
        Some(c)
    }

    fn peek(&self) -> Option<char> {
        self.source[self.current..].chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        let mut chars = self.source[self.current..].chars();
        chars.next();
        chars.next()
    }

    fn matches(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.current += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn either(&mut self, next: char, matched: TokenType, otherwise: TokenType) -> TokenType {
        if self.matches(next) {
            matched
        } else {
            otherwise
        }
    }

    fn lexeme(&self) -> &'a str {
        &self.source[self.start..self.current]
    }

    fn make_token(&self, token_type: TokenType, literal: Option<Literal>) -> Token {
        Token::new(token_type, self.lexeme(), literal, self.line)
    }

    fn block_comment(&mut self) -> Result<(), TokenizeError> {
        loop {
            match self.advance() {
                Some('*') if self.matches('/') => return Ok(()),
                Some('\n') => self.line += 1,
                Some(_) => {}
                None => {
                    return Err(TokenizeError {
                        line: self.line,
                        kind: TokenizeErrorKind::UnterminatedBlockComment,
                    })
                }
            }
        }
    }

    fn string(&mut self) -> Result<Token, TokenizeError> {
        loop {
            match self.advance() {
                Some('"') => break,
                Some('\n') => self.line += 1,
                Some(_) => {}
                None => {
                    return Err(TokenizeError {
                        line: self.line,
                        kind: TokenizeErrorKind::UnterminatedString,
                    })
                }
            }
        }

        let lexeme = self.lexeme();
        let value = lexeme[1..lexeme.len() - 1].to_string();
        Ok(self.make_token(TokenType::String, Some(Literal::String(value))))
    }

    fn number(&mut self) -> Token {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let value = self
            .lexeme()
            .parse()
            .expect("a digit run with an optional fraction is a valid f64");
        self.make_token(TokenType::Number, Some(Literal::Number(value)))
    }

    fn identifier(&mut self) -> Token {
        while self.peek().is_some_and(is_identifier_continue) {
            self.advance();
        }

        let token_type = TokenType::keyword(self.lexeme()).unwrap_or(TokenType::Identifier);
        self.make_token(token_type, None)
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
