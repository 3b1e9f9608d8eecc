//! `MODIFY_*` operators: value rewrites that never drop a row on their own.

use serde::Deserialize;

use super::operation::{
    expect_datetime, expect_number, expect_text, mismatch, parse_parameters, OperatorFault,
};
use crate::coercion::{cast, DEFAULT_TRUTHY_STRINGS};
use crate::types::{DataType, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MathOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Edge {
    Left,
    Right,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Case {
    Upper,
    Lower,
    Capitalize,
}

/// Output layouts offered by `MODIFY_CHANGE_DATE_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum DateFormat {
    #[serde(rename = "YYYY-MM-DD")]
    YearMonthDay,
    #[serde(rename = "MM-DD-YYYY")]
    MonthDayYear,
    #[serde(rename = "DD-MM-YYYY")]
    DayMonthYear,
    #[serde(rename = "MM/DD/YYYY")]
    MonthDayYearSlashed,
    #[serde(rename = "MMM-DD-YYYY")]
    MonthNameDayYear,
    #[serde(rename = "DD-MMM-YYYY")]
    DayMonthNameYear,
}

impl DateFormat {
    pub fn layout(self) -> &'static str {
        match self {
            Self::YearMonthDay => "%Y-%m-%d",
            Self::MonthDayYear => "%m-%d-%Y",
            Self::DayMonthYear => "%d-%m-%Y",
            Self::MonthDayYearSlashed => "%m/%d/%Y",
            Self::MonthNameDayYear => "%b-%d-%Y",
            Self::DayMonthNameYear => "%d-%b-%Y",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawMath")]
pub struct MathParams {
    pub operator: MathOperator,
    pub value: Value,
}

#[derive(Deserialize)]
struct RawMath {
    operator: MathOperator,
    value: Value,
}

impl TryFrom<RawMath> for MathParams {
    type Error = String;

    fn try_from(raw: RawMath) -> Result<Self, Self::Error> {
        if !raw.value.is_numeric() {
            return Err(format!("'{}' is not a number", raw.value));
        }
        Ok(Self {
            operator: raw.operator,
            value: raw.value,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoundParams {
    pub precision: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrimParams {
    pub operator: Side,
    pub value: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WhitespaceParams {
    pub operator: Edge,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaseParams {
    pub operator: Case,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoveParams {
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppendParams {
    pub operator: Side,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplaceParams {
    #[serde(alias = "oldValue")]
    pub old_value: String,
    #[serde(alias = "newValue")]
    pub new_value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DateFormatParams {
    pub operator: DateFormat,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CastParams {
    pub value: DataType,
}

/// Value rewrites.
#[derive(Debug, Clone)]
pub enum Modifier {
    DoMath(MathParams),
    RoundNumber(RoundParams),
    TrimString(TrimParams),
    RemoveWhitespace(WhitespaceParams),
    ChangeCase(CaseParams),
    RemoveSubstring(RemoveParams),
    AppendString(AppendParams),
    ReplaceValue(ReplaceParams),
    ChangeDateFormat(DateFormatParams),
    CastType(CastParams),
}

impl Modifier {
    /// Parse the part of the operation name after `MODIFY_`. `Ok(None)` means the name is unknown.
    pub(crate) fn from_config(kind: &str, parameters: serde_json::Value) -> Result<Option<Self>, String> {
        let modifier = match kind {
            "DO_MATH" => Self::DoMath(parse_parameters(parameters)?),
            "ROUND_NUMBER" => Self::RoundNumber(parse_parameters(parameters)?),
            "TRIM_STRING" => Self::TrimString(parse_parameters(parameters)?),
            "REMOVE_WHITESPACE" => Self::RemoveWhitespace(parse_parameters(parameters)?),
            "CHANGE_CASE" => Self::ChangeCase(parse_parameters(parameters)?),
            "REMOVE_SUBSTRING" => Self::RemoveSubstring(parse_parameters(parameters)?),
            "APPEND_STRING" => Self::AppendString(parse_parameters(parameters)?),
            "REPLACE_VALUE" => Self::ReplaceValue(parse_parameters(parameters)?),
            "CHANGE_DATE_FORMAT" => Self::ChangeDateFormat(parse_parameters(parameters)?),
            "CAST_TYPE" => Self::CastType(parse_parameters(parameters)?),
            _ => return Ok(None),
        };
        Ok(Some(modifier))
    }

    pub fn apply(&self, value: Value) -> Result<Value, OperatorFault> {
        match self {
            Self::DoMath(p) => do_math(&value, p.operator, &p.value),
            Self::RoundNumber(p) => round_number(value, p.precision),
            Self::TrimString(p) => {
                let s = expect_text(&value)?;
                let len = s.chars().count();
                if len < p.value {
                    return Ok(value);
                }
                let trimmed: String = match p.operator {
                    Side::Left => s.chars().skip(p.value).collect(),
                    Side::Right => s.chars().take(len - p.value).collect(),
                };
                Ok(Value::Utf8(trimmed))
            }
            Self::RemoveWhitespace(p) => {
                let s = expect_text(&value)?;
                let stripped = match p.operator {
                    Edge::Left => s.trim_start(),
                    Edge::Right => s.trim_end(),
                    Edge::Both => s.trim(),
                };
                Ok(Value::Utf8(stripped.to_string()))
            }
            Self::ChangeCase(p) => {
                let s = expect_text(&value)?;
                let changed = match p.operator {
                    Case::Upper => s.to_uppercase(),
                    Case::Lower => s.to_lowercase(),
                    Case::Capitalize => capitalize(s),
                };
                Ok(Value::Utf8(changed))
            }
            Self::RemoveSubstring(p) => {
                let s = expect_text(&value)?;
                Ok(Value::Utf8(s.replace(&p.value, "")))
            }
            Self::AppendString(p) => {
                let s = expect_text(&value)?;
                let appended = match p.operator {
                    Side::Left => format!("{}{s}", p.value),
                    Side::Right => format!("{s}{}", p.value),
                };
                Ok(Value::Utf8(appended))
            }
            Self::ReplaceValue(p) => {
                let s = expect_text(&value)?;
                Ok(Value::Utf8(s.replace(&p.old_value, &p.new_value)))
            }
            Self::ChangeDateFormat(p) => {
                let dt = expect_datetime(&value)?;
                Ok(Value::Utf8(dt.format(p.operator.layout()).to_string()))
            }
            Self::CastType(p) => {
                cast(value, p.value, DEFAULT_TRUTHY_STRINGS).map_err(|failure| OperatorFault::Cast {
                    literal: failure.literal,
                    target: p.value.description(),
                })
            }
        }
    }
}

fn do_math(value: &Value, operator: MathOperator, operand: &Value) -> Result<Value, OperatorFault> {
    let lhs = expect_number(value)?;
    let rhs = expect_number(operand)?;

    if operator == MathOperator::Divide {
        if rhs == 0.0 {
            return Ok(Value::Int(0));
        }
        return Ok(Value::Float(lhs / rhs));
    }

    if let (Value::Int(a), Value::Int(b)) = (value, operand) {
        let result = match operator {
            MathOperator::Add => a.checked_add(*b),
            MathOperator::Subtract => a.checked_sub(*b),
            MathOperator::Multiply => a.checked_mul(*b),
            MathOperator::Divide => return Ok(Value::Float(lhs / rhs)),
        };
        return result
            .map(Value::Int)
            .ok_or(OperatorFault::Overflow("MODIFY_DO_MATH"));
    }

    let result = match operator {
        MathOperator::Add => lhs + rhs,
        MathOperator::Subtract => lhs - rhs,
        MathOperator::Multiply => lhs * rhs,
        MathOperator::Divide => lhs / rhs,
    };
    Ok(Value::Float(result))
}

/// Round half away from zero.
fn round_number(value: Value, precision: u32) -> Result<Value, OperatorFault> {
    match value {
        Value::Int(_) => Ok(value),
        Value::Float(f) => {
            let factor = 10f64.powi(i32::try_from(precision).unwrap_or(i32::MAX));
            let rounded = (f * factor).round() / factor;
            Ok(Value::Float(if rounded.is_finite() { rounded } else { f }))
        }
        other => Err(mismatch("numeric", &other)),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
