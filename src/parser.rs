use crate::ast::{BinaryOp, Control, Expr, Lambda, Literal, UnaryOp};
use crate::error::SyntaxError;
use crate::lexer::{Lexer, Token, TokenClass, TokenKind};
use crate::types::RegexValue;

/// Deepest nesting of sub-expressions and prefix operators the parser accepts.
pub const MAX_DEPTH: usize = 128;

/// Recursive-descent parser over a token stream. Fails on the first token
/// that cannot extend the current production; no recovery is attempted.
pub struct Parser<I: Iterator<Item = Result<Token, SyntaxError>>> {
    tokens: I,
    lookahead: Token,
    depth: usize,
}

impl Parser<Lexer> {
    pub fn from_source(input: &str) -> Result<Self, SyntaxError> {
        Parser::new(Lexer::new(input))
    }
}

impl<I: Iterator<Item = Result<Token, SyntaxError>>> Parser<I> {
    pub fn new(mut tokens: I) -> Result<Self, SyntaxError> {
        let lookahead = next_or_eof(&mut tokens, 0)?;
        Ok(Self { tokens, lookahead, depth: 0 })
    }

    fn bump(&mut self) -> Result<Token, SyntaxError> {
        let end = self.lookahead.position + self.lookahead.lexeme.chars().count();
        let next = next_or_eof(&mut self.tokens, end)?;
        Ok(std::mem::replace(&mut self.lookahead, next))
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, SyntaxError> {
        if self.lookahead.kind == kind {
            self.bump()
        } else {
            self.err_here(&format!("Expected {}", what))
        }
    }

    fn err_here<T>(&self, msg: &str) -> Result<T, SyntaxError> {
        Err(SyntaxError::new(msg, self.lookahead.position).with_found(describe(&self.lookahead)))
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, SyntaxError>) -> Result<T, SyntaxError> {
        if self.depth >= MAX_DEPTH {
            return self.err_here("Expression nested too deeply");
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Parse a complete expression; trailing tokens are an error.
    pub fn parse(mut self) -> Result<Expr, SyntaxError> {
        let expr = self.parse_expr()?;
        match self.lookahead.kind {
            TokenKind::Eof => Ok(expr),
            _ => self.err_here("Expected end of expression"),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, SyntaxError> {
        self.nested(Self::parse_ternary)
    }

    fn parse_ternary(&mut self) -> Result<Expr, SyntaxError> {
        let cond = self.parse_or()?;
        if let TokenKind::QMark = self.lookahead.kind {
            self.bump()?;
            let then = self.parse_expr()?;
            self.expect(TokenKind::Colon, "':' in ternary expression")?;
            let otherwise = self.parse_expr()?;
            Ok(Expr::Ternary { cond: Box::new(cond), then: Box::new(then), otherwise: Box::new(otherwise) })
        } else {
            Ok(cond)
        }
    }

    fn parse_or(&mut self) -> Result<Expr, SyntaxError> {
        let mut node = self.parse_and()?;
        while let TokenKind::OrOr = self.lookahead.kind {
            self.bump()?;
            let rhs = self.parse_and()?;
            node = Expr::Binary(Box::new(node), BinaryOp::Or, Box::new(rhs));
        }
        Ok(node)
    }

    fn parse_and(&mut self) -> Result<Expr, SyntaxError> {
        let mut node = self.parse_equality()?;
        while let TokenKind::AndAnd = self.lookahead.kind {
            self.bump()?;
            let rhs = self.parse_equality()?;
            node = Expr::Binary(Box::new(node), BinaryOp::And, Box::new(rhs));
        }
        Ok(node)
    }

    fn parse_equality(&mut self) -> Result<Expr, SyntaxError> {
        let mut node = self.parse_relational()?;
        loop {
            let op = match self.lookahead.kind {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::Ne,
                _ => break,
            };
            self.bump()?;
            let rhs = self.parse_relational()?;
            node = Expr::Binary(Box::new(node), op, Box::new(rhs));
        }
        Ok(node)
    }

    fn parse_relational(&mut self) -> Result<Expr, SyntaxError> {
        let mut node = self.parse_additive()?;
        loop {
            let op = match self.lookahead.kind {
                TokenKind::Greater => BinaryOp::Gt,
                TokenKind::Less => BinaryOp::Lt,
                TokenKind::Ge => BinaryOp::Ge,
                TokenKind::Le => BinaryOp::Le,
                _ => break,
            };
            self.bump()?;
            let rhs = self.parse_additive()?;
            node = Expr::Binary(Box::new(node), op, Box::new(rhs));
        }
        Ok(node)
    }

    fn parse_additive(&mut self) -> Result<Expr, SyntaxError> {
        let mut node = self.parse_multiplicative()?;
        loop {
            let op = match self.lookahead.kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.bump()?;
            let rhs = self.parse_multiplicative()?;
            node = Expr::Binary(Box::new(node), op, Box::new(rhs));
        }
        Ok(node)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, SyntaxError> {
        let mut node = self.parse_unary()?;
        loop {
            let op = match self.lookahead.kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.bump()?;
            let rhs = self.parse_unary()?;
            node = Expr::Binary(Box::new(node), op, Box::new(rhs));
        }
        Ok(node)
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        let op = match self.lookahead.kind {
            TokenKind::Minus => UnaryOp::Minus,
            TokenKind::Bang => UnaryOp::Not,
            _ => return self.parse_postfix(),
        };
        self.bump()?;
        let expr = self.nested(Self::parse_unary)?;
        Ok(Expr::Unary(op, Box::new(expr)))
    }

    fn parse_postfix(&mut self) -> Result<Expr, SyntaxError> {
        let mut node = self.parse_atom()?;
        loop {
            match self.lookahead.kind {
                TokenKind::Dot => {
                    self.bump()?;
                    let (name, position) = match &self.lookahead.kind {
                        TokenKind::Identifier(s) => (s.clone(), self.lookahead.position),
                        _ => return self.err_here("Expected identifier after '.'"),
                    };
                    self.bump()?;
                    if let TokenKind::LParen = self.lookahead.kind {
                        // base.name(args) is sugar for name(base, args)
                        let mut args = vec![node];
                        args.extend(self.parse_args()?);
                        node = self.build_call(name, args, position)?;
                    } else {
                        node = Expr::Field { base: Box::new(node), name };
                    }
                }
                TokenKind::LBracket => {
                    self.bump()?;
                    let index = self.parse_expr()?;
                    self.expect(TokenKind::RBracket, "']' to close index")?;
                    node = Expr::Index { base: Box::new(node), index: Box::new(index) };
                }
                _ => break,
            }
        }
        Ok(node)
    }

    fn parse_atom(&mut self) -> Result<Expr, SyntaxError> {
        match self.lookahead.kind.clone() {
            TokenKind::Number(n) => {
                self.bump()?;
                Ok(Expr::Literal(Literal::Number(n)))
            }
            TokenKind::String(s) => {
                self.bump()?;
                Ok(Expr::Literal(Literal::String(s)))
            }
            TokenKind::Regex { pattern, case_insensitive } => {
                let position = self.lookahead.position;
                let regex = RegexValue::new(&pattern, case_insensitive).map_err(|e| {
                    SyntaxError::new(format!("Invalid regular expression: {}", e), position)
                        .with_found(format!("/{}/", pattern))
                })?;
                self.bump()?;
                Ok(Expr::Literal(Literal::Regex(regex)))
            }
            TokenKind::True => {
                self.bump()?;
                Ok(Expr::Literal(Literal::Boolean(true)))
            }
            TokenKind::False => {
                self.bump()?;
                Ok(Expr::Literal(Literal::Boolean(false)))
            }
            TokenKind::Null => {
                self.bump()?;
                Ok(Expr::Literal(Literal::Null))
            }
            TokenKind::If => {
                let position = self.bump()?.position;
                match self.lookahead.kind {
                    TokenKind::LParen => {
                        let args = self.parse_args()?;
                        self.build_call("if".to_string(), args, position)
                    }
                    _ => self.err_here("Expected '(' after 'if'"),
                }
            }
            TokenKind::Identifier(name) => {
                let position = self.bump()?.position;
                match self.lookahead.kind {
                    TokenKind::LParen => {
                        let args = self.parse_args()?;
                        self.build_call(name, args, position)
                    }
                    _ => Ok(Expr::Variable(name)),
                }
            }
            TokenKind::LParen => {
                self.bump()?;
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(expr)
            }
            TokenKind::LBracket => {
                self.bump()?;
                let mut items = Vec::new();
                if self.lookahead.kind != TokenKind::RBracket {
                    loop {
                        items.push(self.parse_expr()?);
                        match self.lookahead.kind {
                            TokenKind::Comma => {
                                self.bump()?;
                            }
                            TokenKind::RBracket => break,
                            _ => return self.err_here("Expected ',' or ']' in array"),
                        }
                    }
                }
                self.bump()?;
                Ok(Expr::Array(items))
            }
            other => {
                let expected = match other.class() {
                    TokenClass::End => "Unexpected end of expression, expected an operand",
                    _ => "Expected an operand (literal, identifier, '(' or '[')",
                };
                self.err_here(expected)
            }
        }
    }

    /// `'(' (expr (',' expr)*)? ')'`, with the lookahead on '('.
    fn parse_args(&mut self) -> Result<Vec<Expr>, SyntaxError> {
        self.expect(TokenKind::LParen, "'('")?;
        let mut args = Vec::new();
        if self.lookahead.kind != TokenKind::RParen {
            loop {
                args.push(self.parse_expr()?);
                match self.lookahead.kind {
                    TokenKind::Comma => {
                        self.bump()?;
                    }
                    TokenKind::RParen => break,
                    _ => return self.err_here("Expected ',' or ')' in argument list"),
                }
            }
        }
        self.bump()?;
        Ok(args)
    }

    fn build_call(&self, name: String, args: Vec<Expr>, position: usize) -> Result<Expr, SyntaxError> {
        match Control::from_name(&name) {
            Some(control) => build_control(control, args, position),
            None => Ok(Expr::Call { name, args }),
        }
    }
}

fn build_control(control: Control, args: Vec<Expr>, position: usize) -> Result<Expr, SyntaxError> {
    if args.len() != control.arity() {
        return Err(SyntaxError::new(
            format!("{} expects {} arguments, got {}", control.name(), control.arity(), args.len()),
            position,
        )
        .with_found(control.name()));
    }
    let (leading, param_count) = control.shape();
    let mut rest = args.into_iter();
    let mut eager: Vec<Expr> = rest.by_ref().take(leading).collect();
    if param_count == 0 {
        return Ok(Expr::Control { control, args: eager, body: None });
    }

    let mut params = Vec::with_capacity(param_count);
    for i in 0..param_count {
        match rest.next() {
            Some(Expr::Variable(name)) => params.push(name),
            _ => {
                return Err(SyntaxError::new(
                    format!("{} expects a variable name as argument {}", control.name(), leading + i + 1),
                    position,
                )
                .with_found(control.name()));
            }
        }
    }
    let mut remaining: Vec<Expr> = rest.collect();
    let body = remaining.remove(0);
    // forNonBlank keeps its blank-case fallback after the leading argument
    eager.extend(remaining);
    Ok(Expr::Control { control, args: eager, body: Some(Lambda { params, body: Box::new(body) }) })
}

fn next_or_eof<I: Iterator<Item = Result<Token, SyntaxError>>>(tokens: &mut I, end: usize) -> Result<Token, SyntaxError> {
    match tokens.next() {
        Some(tok) => tok,
        None => Ok(Token { kind: TokenKind::Eof, lexeme: String::new(), position: end }),
    }
}

fn describe(tok: &Token) -> String {
    match tok.kind {
        TokenKind::Eof => "end of expression".to_string(),
        _ => tok.lexeme.clone(),
    }
}

/// Parse expression text into an AST.
pub fn parse(input: &str) -> Result<Expr, SyntaxError> {
    Parser::from_source(input)?.parse()
}

/// Parse an already tokenized expression.
pub fn parse_tokens(tokens: Vec<Token>) -> Result<Expr, SyntaxError> {
    Parser::new(tokens.into_iter().map(Ok))?.parse()
}
