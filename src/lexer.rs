use crate::error::SyntaxError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Identifier(String),
    String(String),
    Regex { pattern: String, case_insensitive: bool },
    True,
    False,
    Null,
    If,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    QMark,
    EqEq,
    NotEq,
    Less,
    Le,
    Greater,
    Ge,
    AndAnd,
    OrOr,
    Dot,
    Comma,
    Colon,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Eof,
}

/// Coarse token class, used in parser diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    Identifier,
    Number,
    String,
    Regex,
    Operator,
    Punctuation,
    Keyword,
    End,
}

impl TokenKind {
    pub fn class(&self) -> TokenClass {
        match self {
            TokenKind::Number(_) => TokenClass::Number,
            TokenKind::Identifier(_) => TokenClass::Identifier,
            TokenKind::String(_) => TokenClass::String,
            TokenKind::Regex { .. } => TokenClass::Regex,
            TokenKind::True | TokenKind::False | TokenKind::Null | TokenKind::If => TokenClass::Keyword,
            TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Star
            | TokenKind::Slash
            | TokenKind::Percent
            | TokenKind::Bang
            | TokenKind::QMark
            | TokenKind::EqEq
            | TokenKind::NotEq
            | TokenKind::Less
            | TokenKind::Le
            | TokenKind::Greater
            | TokenKind::Ge
            | TokenKind::AndAnd
            | TokenKind::OrOr => TokenClass::Operator,
            TokenKind::Dot
            | TokenKind::Comma
            | TokenKind::Colon
            | TokenKind::LParen
            | TokenKind::RParen
            | TokenKind::LBracket
            | TokenKind::RBracket
            | TokenKind::LBrace
            | TokenKind::RBrace => TokenClass::Punctuation,
            TokenKind::Eof => TokenClass::End,
        }
    }

    /// Whether this token can end an operand; a following `/` is then division.
    fn ends_operand(&self) -> bool {
        matches!(
            self,
            TokenKind::Number(_)
                | TokenKind::Identifier(_)
                | TokenKind::String(_)
                | TokenKind::Regex { .. }
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Null
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    /// 0-based character column of the first character.
    pub position: usize,
}

/// Pull-based tokenizer. Yields tokens up to and including a single `Eof`;
/// once exhausted it must be recreated to tokenize again.
#[derive(Clone)]
pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    prev: Option<TokenKind>,
    done: bool,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self { chars: input.chars().collect(), pos: 0, prev: None, done: false }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_ws_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => self.pos += 1,
                Some('#') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    fn operand_expected(&self) -> bool {
        !self.prev.as_ref().is_some_and(TokenKind::ends_operand)
    }

    fn lexeme(&self, start: usize) -> String {
        self.chars[start..self.pos].iter().collect()
    }

    fn number(&mut self, start: usize) -> Result<TokenKind, SyntaxError> {
        while matches!(self.peek(), Some('0'..='9')) {
            self.pos += 1;
        }
        // Only consume '.' when a digit follows, so `1.toString()` stays a method call
        if self.peek() == Some('.') && matches!(self.peek_at(1), Some('0'..='9')) {
            self.pos += 1;
            while matches!(self.peek(), Some('0'..='9')) {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let digits_at = if matches!(self.peek_at(1), Some('+' | '-')) { 2 } else { 1 };
            if matches!(self.peek_at(digits_at), Some('0'..='9')) {
                self.pos += digits_at;
                while matches!(self.peek(), Some('0'..='9')) {
                    self.pos += 1;
                }
            }
        }
        let text = self.lexeme(start);
        text.parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| SyntaxError::new("Invalid number", start).with_found(text))
    }

    fn identifier(&mut self, start: usize) -> TokenKind {
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let s = self.lexeme(start);
        match s.as_str() {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            "if" => TokenKind::If,
            _ => TokenKind::Identifier(s),
        }
    }

    fn string(&mut self, quote: char, start: usize) -> Result<TokenKind, SyntaxError> {
        let mut buf = String::new();
        while let Some(c) = self.bump() {
            if c == quote {
                return Ok(TokenKind::String(buf));
            }
            if c != '\\' {
                buf.push(c);
                continue;
            }
            let escape_at = self.pos - 1;
            match self.bump() {
                Some('n') => buf.push('\n'),
                Some('t') => buf.push('\t'),
                Some('r') => buf.push('\r'),
                Some('u') => {
                    let hex: String = (0..4).filter_map(|_| self.bump()).collect();
                    let ch = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32).ok_or_else(|| {
                        SyntaxError::new("Invalid unicode escape", escape_at).with_found(format!("\\u{}", hex))
                    })?;
                    buf.push(ch);
                }
                Some(other) => buf.push(other),
                None => break,
            }
        }
        Err(SyntaxError::new("Unterminated string literal", start).with_found(quote.to_string()))
    }

    fn regex(&mut self, start: usize) -> Result<TokenKind, SyntaxError> {
        let mut pattern = String::new();
        while let Some(c) = self.bump() {
            match c {
                '/' => {
                    let case_insensitive = self.peek() == Some('i');
                    if case_insensitive {
                        self.pos += 1;
                    }
                    return Ok(TokenKind::Regex { pattern, case_insensitive });
                }
                '\\' => match self.bump() {
                    Some('/') => pattern.push('/'),
                    Some(other) => {
                        pattern.push('\\');
                        pattern.push(other);
                    }
                    None => break,
                },
                _ => pattern.push(c),
            }
        }
        Err(SyntaxError::new("Unterminated regular expression", start).with_found("/"))
    }

    fn two_char(&mut self, second: char, matched: TokenKind, single: TokenKind) -> TokenKind {
        if self.peek() == Some(second) {
            self.pos += 1;
            matched
        } else {
            single
        }
    }

    pub fn next_token(&mut self) -> Result<Token, SyntaxError> {
        self.skip_ws_and_comments();
        let start = self.pos;
        let ch = match self.bump() {
            Some(c) => c,
            None => {
                self.done = true;
                return Ok(Token { kind: TokenKind::Eof, lexeme: String::new(), position: start });
            }
        };

        let kind = match ch {
            '0'..='9' => self.number(start)?,
            '.' if self.operand_expected() && matches!(self.peek(), Some('0'..='9')) => self.number(start)?,
            c if c.is_alphabetic() || c == '_' => self.identifier(start),
            '"' | '\'' => self.string(ch, start)?,
            '/' if self.operand_expected() => self.regex(start)?,
            '/' => TokenKind::Slash,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '%' => TokenKind::Percent,
            '?' => TokenKind::QMark,
            '!' => self.two_char('=', TokenKind::NotEq, TokenKind::Bang),
            '<' => self.two_char('=', TokenKind::Le, TokenKind::Less),
            '>' => self.two_char('=', TokenKind::Ge, TokenKind::Greater),
            '=' if self.peek() == Some('=') => {
                self.pos += 1;
                TokenKind::EqEq
            }
            '&' if self.peek() == Some('&') => {
                self.pos += 1;
                TokenKind::AndAnd
            }
            '|' if self.peek() == Some('|') => {
                self.pos += 1;
                TokenKind::OrOr
            }
            '.' => TokenKind::Dot,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            other => {
                return Err(SyntaxError::new("Unexpected character", start).with_found(other.to_string()));
            }
        };
        self.prev = Some(kind.clone());
        Ok(Token { kind, lexeme: self.lexeme(start), position: start })
    }
}

impl Iterator for Lexer {
    type Item = Result<Token, SyntaxError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let result = self.next_token();
        if result.is_err() {
            self.done = true;
        }
        Some(result)
    }
}

/// Tokenize a whole expression, ending with an `Eof` token.
pub fn tokenize(text: &str) -> Result<Vec<Token>, SyntaxError> {
    Lexer::new(text).collect()
}
