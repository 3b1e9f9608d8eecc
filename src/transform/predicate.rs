//! Predicate families shared by `VALIDATE_BY_*` and `FILTER_BY_*`.
//!
//! A predicate only answers "does this value pass?"; whether a failure becomes a warning, an
//! error or a silent drop is decided by the [`super::Operation`] wrapping it.

use chrono::NaiveDateTime;
use regex::Regex;
use serde::Deserialize;

use super::operation::{
    compare_values, display_number, expect_datetime, expect_number, expect_text, parse_parameters,
    Inclusion, OperatorFault, Relation,
};
use crate::temporal::{deserialize_datetime, DATETIME_OUTPUT_LAYOUT};
use crate::types::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct RangeParams {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DateRangeParams {
    #[serde(deserialize_with = "deserialize_datetime")]
    pub min: NaiveDateTime,
    #[serde(deserialize_with = "deserialize_datetime")]
    pub max: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListParams {
    pub operator: Inclusion,
    pub values: Vec<Value>,
}

/// A start-anchored pattern.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawRegex")]
pub struct RegexParams {
    pub operator: Inclusion,
    pub pattern: String,
    regex: Regex,
}

#[derive(Deserialize)]
struct RawRegex {
    #[serde(default)]
    operator: Inclusion,
    value: String,
}

impl TryFrom<RawRegex> for RegexParams {
    type Error = String;

    fn try_from(raw: RawRegex) -> Result<Self, Self::Error> {
        let regex = Regex::new(&format!("^(?:{})", raw.value))
            .map_err(|e| format!("invalid regex '{}': {e}", raw.value))?;
        Ok(Self {
            operator: raw.operator,
            pattern: raw.value,
            regex,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LengthParams {
    pub operator: Relation,
    pub value: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValueParams {
    pub operator: Relation,
    pub value: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DateValueParams {
    pub operator: Relation,
    #[serde(deserialize_with = "deserialize_datetime")]
    pub value: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubstringParams {
    pub operator: Inclusion,
    pub value: String,
}

#[derive(Debug, Clone)]
pub enum Predicate {
    Range(RangeParams),
    DateRange(DateRangeParams),
    List(ListParams),
    Regex(RegexParams),
    Length(LengthParams),
    Value(ValueParams),
    DateValue(DateValueParams),
    Substring(SubstringParams),
}

impl Predicate {
    /// Parse the part of the operation name after `VALIDATE_BY_` / `FILTER_BY_`.
    pub(crate) fn from_config(kind: &str, parameters: serde_json::Value) -> Result<Option<Self>, String> {
        let predicate = match kind {
            "RANGE" => Self::Range(parse_parameters(parameters)?),
            "DATE_RANGE" => Self::DateRange(parse_parameters(parameters)?),
            "LIST" => Self::List(parse_parameters(parameters)?),
            "REGEX" => Self::Regex(parse_parameters(parameters)?),
            "LENGTH" => Self::Length(parse_parameters(parameters)?),
            "VALUE" => Self::Value(parse_parameters(parameters)?),
            "DATE_VALUE" => Self::DateValue(parse_parameters(parameters)?),
            "SUBSTRING" => Self::Substring(parse_parameters(parameters)?),
            _ => return Ok(None),
        };
        Ok(Some(predicate))
    }

    /// Whether `value` satisfies the predicate.
    pub fn passes(&self, value: &Value) -> Result<bool, OperatorFault> {
        match self {
            Self::Range(p) => {
                let n = expect_number(value)?;
                Ok(p.min <= n && n <= p.max)
            }
            Self::DateRange(p) => {
                let dt = expect_datetime(value)?;
                Ok(p.min <= dt && dt <= p.max)
            }
            Self::List(p) => {
                let text = value.to_text();
                let member = p.values.iter().any(|candidate| candidate.to_text() == text);
                Ok(member == (p.operator == Inclusion::Include))
            }
            Self::Regex(p) => {
                let matched = p.regex.is_match(expect_text(value)?);
                Ok(matched == (p.operator == Inclusion::Include))
            }
            Self::Length(p) => {
                let len = expect_text(value)?.chars().count();
                Ok(p.operator.holds(len.cmp(&p.value)))
            }
            Self::Value(p) => Ok(p.operator.holds(compare_values(value, &p.value)?)),
            Self::DateValue(p) => {
                let dt = expect_datetime(value)?;
                Ok(p.operator.holds(dt.cmp(&p.value)))
            }
            Self::Substring(p) => {
                let contains = expect_text(value)?.contains(p.value.as_str());
                Ok(contains == (p.operator == Inclusion::Include))
            }
        }
    }

    /// Human-readable reason `value` failed; only meaningful after [`Self::passes`] returned `false`.
    pub fn failure_message(&self, value: &Value) -> String {
        match self {
            Self::Range(p) => format!(
                "{value} was not between the specified range of {} to {}",
                display_number(p.min),
                display_number(p.max)
            ),
            Self::DateRange(p) => format!(
                "{value} was not between the specified range of {} to {}",
                p.min.format(DATETIME_OUTPUT_LAYOUT),
                p.max.format(DATETIME_OUTPUT_LAYOUT)
            ),
            Self::List(p) => {
                let listed: Vec<String> = p.values.iter().map(Value::to_text).collect();
                match p.operator {
                    Inclusion::Include => format!(
                        "'{value}' is not in the list of accepted values ({})",
                        listed.join(", ")
                    ),
                    Inclusion::Exclude => format!(
                        "'{value}' is in the list of prohibited values ({})",
                        listed.join(", ")
                    ),
                }
            }
            Self::Regex(p) => match p.operator {
                Inclusion::Include => format!("'{value}' did not match the specified regex ({})", p.pattern),
                Inclusion::Exclude => format!("'{value}' matched the prohibited regex ({})", p.pattern),
            },
            Self::Length(p) => format!(
                "'{value}' did not match the specified length requirements ({} {} characters)",
                p.operator.description(),
                p.value
            ),
            Self::Value(p) => format!(
                "'{value}' did not match the specified value requirements ({} {})",
                p.operator.description(),
                p.value
            ),
            Self::DateValue(p) => format!(
                "'{value}' did not match the specified date requirements ({} {})",
                p.operator.description(),
                p.value.format(DATETIME_OUTPUT_LAYOUT)
            ),
            Self::Substring(p) => match p.operator {
                Inclusion::Include => format!("'{value}' did not contain the expected value '{}'", p.value),
                Inclusion::Exclude => format!("'{value}' contained the invalid value '{}'", p.value),
            },
        }
    }
}
