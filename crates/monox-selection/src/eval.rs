//! Expression evaluation for cuts
//!
//! Evaluates cut expressions and numeric operands against one event at a
//! time.

use crate::ast::*;
use thiserror::Error;

/// Evaluation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("Field not found: {0}")]
    FieldNotFound(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
}

/// Result type for evaluation
pub type EvalResult<T> = Result<T, EvalError>;

/// Context for evaluation - provides field values of one event
pub trait EvalContext {
    /// Get the value of a field
    fn field_value(&self, field: &str) -> Option<f64>;
}

/// Evaluator for cut expressions
pub struct Evaluator<'a, C: EvalContext + ?Sized> {
    context: &'a C,
}

impl<'a, C: EvalContext + ?Sized> Evaluator<'a, C> {
    /// Create a new evaluator
    pub fn new(context: &'a C) -> Self {
        Self { context }
    }

    /// Evaluate a cut expression
    pub fn evaluate(&self, expr: &CutExpr) -> EvalResult<bool> {
        match expr {
            CutExpr::All => Ok(true),

            CutExpr::And(left, right) => Ok(self.evaluate(left)? && self.evaluate(right)?),

            CutExpr::Or(left, right) => Ok(self.evaluate(left)? || self.evaluate(right)?),

            CutExpr::Not(inner) => Ok(!self.evaluate(inner)?),

            CutExpr::Comparison(cmp) => {
                let lhs = self.evaluate_value(&cmp.lhs)?;
                let rhs = self.evaluate_value(&cmp.rhs)?;
                Ok(cmp.op.evaluate(lhs, rhs))
            }

            CutExpr::Truthy(value) => {
                let v = self.evaluate_value(value)?;
                Ok(v != 0.0 && !v.is_nan())
            }
        }
    }

    /// Evaluate a numeric operand
    pub fn evaluate_value(&self, value: &Value) -> EvalResult<f64> {
        match value {
            Value::Number(n) => Ok(*n),

            Value::Field(name) => self
                .context
                .field_value(name)
                .ok_or_else(|| EvalError::FieldNotFound(name.clone())),

            Value::Function(func) => self.evaluate_function(func),

            Value::Neg(inner) => Ok(-self.evaluate_value(inner)?),

            Value::Binary { op, lhs, rhs } => {
                Ok(op.apply(self.evaluate_value(lhs)?, self.evaluate_value(rhs)?))
            }
        }
    }

    fn evaluate_function(&self, func: &FunctionCall) -> EvalResult<f64> {
        let args = func
            .args
            .iter()
            .map(|a| self.evaluate_value(a))
            .collect::<EvalResult<Vec<f64>>>()?;

        let unary = |f: fn(f64) -> f64| match args.as_slice() {
            [x] => Ok(f(*x)),
            _ => Err(EvalError::InvalidArguments(format!(
                "{} takes 1 argument, got {}",
                func.name,
                args.len()
            ))),
        };

        match func.name.as_str() {
            "abs" => unary(f64::abs),
            "sqrt" => unary(f64::sqrt),
            "log10" => unary(f64::log10),
            "log" => unary(f64::ln),
            "exp" => unary(f64::exp),
            "cos" => unary(f64::cos),
            "sin" => unary(f64::sin),
            "min" | "max" => {
                if args.len() < 2 {
                    return Err(EvalError::InvalidArguments(format!(
                        "{} needs at least 2 arguments",
                        func.name
                    )));
                }
                let fold = if func.name == "min" { f64::min } else { f64::max };
                Ok(args[1..].iter().copied().fold(args[0], fold))
            }
            _ => Err(EvalError::UnknownFunction(func.name.clone())),
        }
    }
}

/// Evaluate a cut against many events
pub fn select<C: EvalContext>(expr: &CutExpr, events: &[C]) -> EvalResult<Vec<bool>> {
    events
        .iter()
        .map(|event| Evaluator::new(event).evaluate(expr))
        .collect()
}

/// Count the number of selected events
pub fn count_selected(mask: &[bool]) -> usize {
    mask.iter().filter(|&&b| b).count()
}
