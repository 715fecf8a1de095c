//! A small arithmetic expression language over the placeholder `X`.
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/' | '%') unary)*
//! unary   := '-' unary | power
//! power   := primary ('^' unary)?
//! primary := number | 'X' | name '(' expr (',' expr)* ')' | '(' expr ')'
//! ```

use std::fmt;

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
    /// `^`
    Pow,
}

/// Built-in functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    /// `pow(base, exponent)`
    Pow,
    /// `sqrt(x)`
    Sqrt,
    /// `abs(x)`
    Abs,
    /// `min(a, b, ...)`
    Min,
    /// `max(a, b, ...)`
    Max,
    /// Natural logarithm.
    Log,
    /// `exp(x)`
    Exp,
    /// `floor(x)`
    Floor,
    /// `ceil(x)`
    Ceil,
    /// `round(x)`
    Round,
    /// `sin(x)`, radians.
    Sin,
    /// `cos(x)`, radians.
    Cos,
}

impl Function {
    fn lookup(name: &str) -> Option<Self> {
        let function = match name.to_ascii_lowercase().as_str() {
            "pow" => Self::Pow,
            "sqrt" => Self::Sqrt,
            "abs" => Self::Abs,
            "min" => Self::Min,
            "max" => Self::Max,
            "log" => Self::Log,
            "exp" => Self::Exp,
            "floor" => Self::Floor,
            "ceil" => Self::Ceil,
            "round" => Self::Round,
            "sin" => Self::Sin,
            "cos" => Self::Cos,
            _ => return None,
        };
        Some(function)
    }

    fn arity_ok(self, count: usize) -> bool {
        match self {
            Self::Pow => count == 2,
            Self::Min | Self::Max => count >= 2,
            _ => count == 1,
        }
    }

    fn apply(self, args: &[f64]) -> f64 {
        match self {
            Self::Pow => args[0].powf(args[1]),
            Self::Sqrt => args[0].sqrt(),
            Self::Abs => args[0].abs(),
            Self::Min => args.iter().copied().fold(f64::INFINITY, f64::min),
            Self::Max => args.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Self::Log => args[0].ln(),
            Self::Exp => args[0].exp(),
            Self::Floor => args[0].floor(),
            Self::Ceil => args[0].ceil(),
            Self::Round => args[0].round(),
            Self::Sin => args[0].sin(),
            Self::Cos => args[0].cos(),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = format!("{self:?}").to_ascii_lowercase();
        write!(f, "{name}")
    }
}

/// A parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal.
    Number(f64),
    /// The input value.
    X,
    /// Unary minus.
    Neg(Box<Expr>),
    /// A binary operation.
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// A function call.
    Call(Function, Vec<Expr>),
}

impl Expr {
    /// Parses `source`.
    pub fn parse(source: &str) -> Result<Self, String> {
        let mut parser = Parser {
            chars: source.chars().collect(),
            pos: 0,
        };
        let expr = parser.expr()?;
        parser.skip_whitespace();
        if let Some(c) = parser.peek() {
            return Err(format!("Unexpected character '{c}' at position {}", parser.pos));
        }
        Ok(expr)
    }

    /// Evaluates the expression with `X = x`.
    #[must_use]
    pub fn eval(&self, x: f64) -> f64 {
        match self {
            Self::Number(n) => *n,
            Self::X => x,
            Self::Neg(inner) => -inner.eval(x),
            Self::Binary(op, lhs, rhs) => {
                let (a, b) = (lhs.eval(x), rhs.eval(x));
                match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                    BinaryOp::Rem => a % b,
                    BinaryOp::Pow => a.powf(b),
                }
            }
            Self::Call(function, args) => {
                let values: Vec<f64> = args.iter().map(|arg| arg.eval(x)).collect();
                function.apply(&values)
            }
        }
    }

    /// Returns true if the expression uses `X`.
    #[must_use]
    pub fn uses_x(&self) -> bool {
        match self {
            Self::Number(_) => false,
            Self::X => true,
            Self::Neg(inner) => inner.uses_x(),
            Self::Binary(_, lhs, rhs) => lhs.uses_x() || rhs.uses_x(),
            Self::Call(_, args) => args.iter().any(Self::uses_x),
        }
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expr(&mut self) -> Result<Expr, String> {
        let mut lhs = self.term()?;
        loop {
            let op = if self.eat('+') {
                BinaryOp::Add
            } else if self.eat('-') {
                BinaryOp::Sub
            } else {
                return Ok(lhs);
            };
            let rhs = self.term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn term(&mut self) -> Result<Expr, String> {
        let mut lhs = self.unary()?;
        loop {
            let op = if self.eat('*') {
                BinaryOp::Mul
            } else if self.eat('/') {
                BinaryOp::Div
            } else if self.eat('%') {
                BinaryOp::Rem
            } else {
                return Ok(lhs);
            };
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn unary(&mut self) -> Result<Expr, String> {
        if self.eat('-') {
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        self.power()
    }

    fn power(&mut self) -> Result<Expr, String> {
        let base = self.primary()?;
        if self.eat('^') {
            let exponent = self.unary()?;
            return Ok(Expr::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr, String> {
        self.skip_whitespace();
        match self.peek() {
            None => Err("Unexpected end of expression".to_string()),
            Some('(') => {
                self.pos += 1;
                let inner = self.expr()?;
                if !self.eat(')') {
                    return Err(format!("Expected ')' at position {}", self.pos));
                }
                Ok(inner)
            }
            Some(c) if c.is_ascii_digit() || c == '.' => self.number(),
            Some(c) if c.is_ascii_alphabetic() => self.name(),
            Some(c) => Err(format!("Unexpected character '{c}' at position {}", self.pos)),
        }
    }

    fn number(&mut self) -> Result<Expr, String> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '.') {
            self.pos += 1;
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let mark = self.pos;
            self.pos += 1;
            if matches!(self.peek(), Some('+' | '-')) {
                self.pos += 1;
            }
            if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
            } else {
                self.pos = mark;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse::<f64>()
            .map(Expr::Number)
            .map_err(|_| format!("Invalid number '{text}'"))
    }

    fn name(&mut self) -> Result<Expr, String> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let name: String = self.chars[start..self.pos].iter().collect();
        if name == "X" || name == "x" {
            return Ok(Expr::X);
        }

        let function = Function::lookup(&name).ok_or_else(|| format!("Unknown function '{name}'"))?;
        if !self.eat('(') {
            return Err(format!("Expected '(' after '{name}'"));
        }
        let mut args = vec![self.expr()?];
        while self.eat(',') {
            args.push(self.expr()?);
        }
        if !self.eat(')') {
            return Err(format!("Expected ')' at position {}", self.pos));
        }
        if !function.arity_ok(args.len()) {
            return Err(format!(
                "Wrong number of arguments for '{function}': {}",
                args.len()
            ));
        }
        Ok(Expr::Call(function, args))
    }
}
