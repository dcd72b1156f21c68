//! Abstract Syntax Tree for cut expressions
//!
//! A cut is a boolean expression over per-event fields. Numeric operands can
//! be arithmetic combinations of fields, literals and a small set of
//! functions.

use serde::{Deserialize, Serialize};

/// A boolean cut expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CutExpr {
    /// Logical AND of two expressions
    And(Box<CutExpr>, Box<CutExpr>),

    /// Logical OR of two expressions
    Or(Box<CutExpr>, Box<CutExpr>),

    /// Logical NOT of an expression
    Not(Box<CutExpr>),

    /// A comparison predicate
    Comparison(Comparison),

    /// A bare numeric value, true when non-zero
    Truthy(Value),

    /// Every event passes
    All,
}

impl CutExpr {
    /// Create an AND expression
    pub fn and(left: CutExpr, right: CutExpr) -> Self {
        CutExpr::And(Box::new(left), Box::new(right))
    }

    /// Create an OR expression
    pub fn or(left: CutExpr, right: CutExpr) -> Self {
        CutExpr::Or(Box::new(left), Box::new(right))
    }

    /// Create a NOT expression
    pub fn not(expr: CutExpr) -> Self {
        CutExpr::Not(Box::new(expr))
    }

    /// Check if this is an atomic expression (no logical operators)
    pub fn is_atomic(&self) -> bool {
        matches!(
            self,
            CutExpr::Comparison(_) | CutExpr::Truthy(_) | CutExpr::All
        )
    }

    /// Names of every field the expression reads
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out.sort_unstable();
        out.dedup();
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            CutExpr::And(l, r) | CutExpr::Or(l, r) => {
                l.collect_fields(out);
                r.collect_fields(out);
            }
            CutExpr::Not(e) => e.collect_fields(out),
            CutExpr::Comparison(c) => {
                c.lhs.collect_fields(out);
                c.rhs.collect_fields(out);
            }
            CutExpr::Truthy(v) => v.collect_fields(out),
            CutExpr::All => {}
        }
    }
}

/// A comparison predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub lhs: Value,
    pub op: ComparisonOp,
    pub rhs: Value,
}

impl Comparison {
    /// Create a new comparison
    pub fn new(lhs: Value, op: ComparisonOp, rhs: Value) -> Self {
        Self { lhs, op, rhs }
    }

    /// Create a field >= value comparison
    pub fn field_ge(field: &str, value: f64) -> Self {
        Self::new(Value::field(field), ComparisonOp::Ge, Value::Number(value))
    }

    /// Create a field < value comparison
    pub fn field_lt(field: &str, value: f64) -> Self {
        Self::new(Value::field(field), ComparisonOp::Lt, Value::Number(value))
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOp {
    /// Less than (<)
    Lt,
    /// Less than or equal (<=)
    Le,
    /// Greater than (>)
    Gt,
    /// Greater than or equal (>=)
    Ge,
    /// Equal (==)
    Eq,
    /// Not equal (!=)
    Ne,
}

impl ComparisonOp {
    /// Evaluate the comparison for two f64 values
    pub fn evaluate(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            ComparisonOp::Lt => lhs < rhs,
            ComparisonOp::Le => lhs <= rhs,
            ComparisonOp::Gt => lhs > rhs,
            ComparisonOp::Ge => lhs >= rhs,
            ComparisonOp::Eq => (lhs - rhs).abs() < 1e-10,
            ComparisonOp::Ne => (lhs - rhs).abs() >= 1e-10,
        }
    }

    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOp::Lt => "<",
            ComparisonOp::Le => "<=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Ge => ">=",
            ComparisonOp::Eq => "==",
            ComparisonOp::Ne => "!=",
        }
    }
}

/// Binary arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    /// Floating-point remainder, as used by prescale cuts like `event % 4 == 0`
    Rem,
}

impl ArithOp {
    pub fn apply(&self, lhs: f64, rhs: f64) -> f64 {
        match self {
            ArithOp::Add => lhs + rhs,
            ArithOp::Sub => lhs - rhs,
            ArithOp::Mul => lhs * rhs,
            ArithOp::Div => lhs / rhs,
            ArithOp::Rem => lhs % rhs,
        }
    }
}

/// A numeric operand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// A field reference
    Field(String),
    /// A numeric literal
    Number(f64),
    /// A function call
    Function(FunctionCall),
    /// Unary minus
    Neg(Box<Value>),
    /// Binary arithmetic
    Binary {
        op: ArithOp,
        lhs: Box<Value>,
        rhs: Box<Value>,
    },
}

impl Value {
    pub fn field(name: &str) -> Self {
        Value::Field(name.to_string())
    }

    pub fn binary(op: ArithOp, lhs: Value, rhs: Value) -> Self {
        Value::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Value::Field(name) => out.push(name),
            Value::Number(_) => {}
            Value::Function(f) => f.args.iter().for_each(|a| a.collect_fields(out)),
            Value::Neg(v) => v.collect_fields(out),
            Value::Binary { lhs, rhs, .. } => {
                lhs.collect_fields(out);
                rhs.collect_fields(out);
            }
        }
    }
}

/// A function call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<Value>,
}

impl FunctionCall {
    /// Create a new function call
    pub fn new(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}
