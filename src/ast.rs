use crate::types::RegexValue;

/// Parsed expression. Immutable once built and safe to share read-only
/// across concurrently evaluated rows.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Variable(String),
    Field { base: Box<Expr>, name: String },
    Index { base: Box<Expr>, index: Box<Expr> },
    Array(Vec<Expr>),
    /// Call of a registry function, bound by name at evaluation time.
    Call { name: String, args: Vec<Expr> },
    /// Built-in control form whose arguments are evaluated lazily.
    Control { control: Control, args: Vec<Expr>, body: Option<Lambda> },
    Unary(UnaryOp, Box<Expr>),
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
    Ternary { cond: Box<Expr>, then: Box<Expr>, otherwise: Box<Expr> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    String(String),
    Boolean(bool),
    Null,
    Regex(RegexValue),
}

/// Anonymous-parameter body of an iteration or binding form. Each
/// evaluation binds `params` in a fresh child frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Lambda {
    pub params: Vec<String>,
    pub body: Box<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    /// `if(cond, then, else)`
    If,
    /// `with(expr, v, body)`
    With,
    /// `forEach(array, v, body)`
    ForEach,
    /// `forEachIndex(array, i, v, body)`
    ForEachIndex,
    /// `forRange(from, to, step, v, body)`
    ForRange,
    /// `filter(array, v, cond)`
    Filter,
    /// `forNonBlank(expr, v, nonBlank, blank)`
    ForNonBlank,
}

impl Control {
    pub fn from_name(name: &str) -> Option<Control> {
        Some(match name {
            "if" => Control::If,
            "with" => Control::With,
            "forEach" => Control::ForEach,
            "forEachIndex" => Control::ForEachIndex,
            "forRange" => Control::ForRange,
            "filter" => Control::Filter,
            "forNonBlank" => Control::ForNonBlank,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Control::If => "if",
            Control::With => "with",
            Control::ForEach => "forEach",
            Control::ForEachIndex => "forEachIndex",
            Control::ForRange => "forRange",
            Control::Filter => "filter",
            Control::ForNonBlank => "forNonBlank",
        }
    }

    /// Argument layout as written: (leading eager args, parameter names).
    /// The body follows the parameters; `ForNonBlank` also takes a trailing
    /// fallback expression, and `If` has no parameters or body.
    pub fn shape(self) -> (usize, usize) {
        match self {
            Control::If => (3, 0),
            Control::With | Control::ForEach | Control::Filter | Control::ForNonBlank => (1, 1),
            Control::ForEachIndex => (1, 2),
            Control::ForRange => (3, 1),
        }
    }

    pub fn arity(self) -> usize {
        let (leading, params) = self.shape();
        match self {
            Control::If => leading,
            Control::ForNonBlank => leading + params + 2,
            _ => leading + params + 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Minus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Gt => ">",
            BinaryOp::Lt => "<",
            BinaryOp::Ge => ">=",
            BinaryOp::Le => "<=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}
