//! Cut grammar parser using nom
//!
//! Grammar:
//! ```text
//! expr      := or_expr
//! or_expr   := and_expr ('||' and_expr)*
//! and_expr  := not_expr ('&&' not_expr)*
//! not_expr  := '!' not_expr | atom
//! atom      := comparison | '(' expr ')' | 'all' | value
//! comparison:= value op value
//! op        := '<' | '<=' | '>' | '>=' | '==' | '!='
//! value     := term (('+' | '-') term)*
//! term      := unary (('*' | '/' | '%') unary)*
//! unary     := '-' unary | factor
//! factor    := number | function | field | '(' value ')'
//! function  := ident '(' value (',' value)* ')'
//! ```

use crate::ast::*;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, multispace0, satisfy},
    combinator::{all_consuming, map, map_res, not, peek, recognize, value},
    multi::{many0, separated_list1},
    number::complete::recognize_float,
    sequence::{delimited, pair, preceded, terminated},
    IResult,
};
use thiserror::Error;

/// Parse errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unexpected trailing input: '{0}'")]
    TrailingInput(String),
}

/// Parse a cut string
///
/// An empty (or all-whitespace) string selects every event.
pub fn parse_cut(input: &str) -> Result<CutExpr, ParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(CutExpr::All);
    }

    match expr(input) {
        Ok(("", result)) => Ok(result),
        Ok((remaining, _)) => Err(ParseError::TrailingInput(remaining.to_string())),
        Err(e) => Err(ParseError::Parse(format!("{:?}", e))),
    }
}

/// Parse a numeric expression such as a plot variable (`met * cos(dphi)`)
pub fn parse_value(input: &str) -> Result<Value, ParseError> {
    let input = input.trim();
    match all_consuming(ws(sum))(input) {
        Ok((_, v)) => Ok(v),
        Err(e) => Err(ParseError::Parse(format!("{:?}", e))),
    }
}

/// Parse whitespace
fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn expr(input: &str) -> IResult<&str, CutExpr> {
    or_expr(input)
}

fn or_expr(input: &str) -> IResult<&str, CutExpr> {
    let (input, first) = and_expr(input)?;
    let (input, rest) = many0(preceded(ws(tag("||")), and_expr))(input)?;
    Ok((input, rest.into_iter().fold(first, CutExpr::or)))
}

fn and_expr(input: &str) -> IResult<&str, CutExpr> {
    let (input, first) = not_expr(input)?;
    let (input, rest) = many0(preceded(ws(tag("&&")), not_expr))(input)?;
    Ok((input, rest.into_iter().fold(first, CutExpr::and)))
}

fn not_expr(input: &str) -> IResult<&str, CutExpr> {
    alt((
        map(preceded(ws(terminated(char('!'), not(char('=')))), not_expr), CutExpr::not),
        atom,
    ))(input)
}

fn atom(input: &str) -> IResult<&str, CutExpr> {
    ws(alt((
        map(comparison, CutExpr::Comparison),
        delimited(char('('), expr, ws(char(')'))),
        value(CutExpr::All, terminated(tag("all"), not(ident_char))),
        map(sum, CutExpr::Truthy),
    )))(input)
}

fn ident_char(input: &str) -> IResult<&str, char> {
    satisfy(|c| c.is_alphanumeric() || c == '_' || c == '.')(input)
}

fn comparison(input: &str) -> IResult<&str, Comparison> {
    let (input, lhs) = sum(input)?;
    let (input, op) = ws(comparison_op)(input)?;
    let (input, rhs) = sum(input)?;
    Ok((input, Comparison::new(lhs, op, rhs)))
}

fn comparison_op(input: &str) -> IResult<&str, ComparisonOp> {
    alt((
        value(ComparisonOp::Le, tag("<=")),
        value(ComparisonOp::Ge, tag(">=")),
        value(ComparisonOp::Eq, tag("==")),
        value(ComparisonOp::Ne, tag("!=")),
        value(ComparisonOp::Lt, tag("<")),
        value(ComparisonOp::Gt, tag(">")),
    ))(input)
}

fn sum(input: &str) -> IResult<&str, Value> {
    let (input, first) = term(input)?;
    let (input, rest) = many0(pair(
        ws(alt((value(ArithOp::Add, char('+')), value(ArithOp::Sub, char('-'))))),
        term,
    ))(input)?;
    Ok((
        input,
        rest.into_iter()
            .fold(first, |acc, (op, v)| Value::binary(op, acc, v)),
    ))
}

fn term(input: &str) -> IResult<&str, Value> {
    let (input, first) = unary(input)?;
    let (input, rest) = many0(pair(
        ws(alt((
            value(ArithOp::Mul, char('*')),
            value(ArithOp::Div, char('/')),
            value(ArithOp::Rem, char('%')),
        ))),
        unary,
    ))(input)?;
    Ok((
        input,
        rest.into_iter()
            .fold(first, |acc, (op, v)| Value::binary(op, acc, v)),
    ))
}

fn unary(input: &str) -> IResult<&str, Value> {
    ws(alt((
        map(parse_number, Value::Number),
        map(preceded(char('-'), unary), |v| Value::Neg(Box::new(v))),
        factor,
    )))(input)
}

fn factor(input: &str) -> IResult<&str, Value> {
    alt((
        map(function_call, Value::Function),
        map(identifier, |s| Value::Field(s.to_string())),
        delimited(char('('), ws(sum), char(')')),
    ))(input)
}

/// Parse an unsigned number (including scientific notation and `170.`)
fn parse_number(input: &str) -> IResult<&str, f64> {
    preceded(
        peek(satisfy(|c| c.is_ascii_digit() || c == '.')),
        map_res(recognize_float, str::parse::<f64>),
    )(input)
}

/// Parse an identifier (letter or underscore first, then alphanumerics, `_` or `.`)
fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_' || c == '.'),
    ))(input)
}

fn function_call(input: &str) -> IResult<&str, FunctionCall> {
    let (input, name) = identifier(input)?;
    let (input, _) = multispace0(input)?;
    let (input, args) = delimited(
        char('('),
        separated_list1(ws(char(',')), ws(sum)),
        char(')'),
    )(input)?;

    Ok((input, FunctionCall::new(name, args)))
}
