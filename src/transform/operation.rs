//! The operation enum, its per-row outcome and the pieces shared by modifiers and predicates.

use std::cmp::Ordering;

use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use super::modify::Modifier;
use super::predicate::Predicate;
use crate::temporal::{parse_temporal, Temporal};
use crate::types::Value;

/// A fault raised while evaluating an operator; always surfaces as an ERROR outcome.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OperatorFault {
    #[error("expected a {expected} value but found the {found} '{value}'")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
        value: String,
    },
    #[error("could not interpret '{0}' as a date")]
    InvalidDate(String),
    #[error("integer overflow while applying {0}")]
    Overflow(&'static str),
    #[error("cannot compare the {left} '{value}' with a {right}")]
    Incomparable {
        left: &'static str,
        right: &'static str,
        value: String,
    },
    #[error("could not cast '{literal}' to {target}")]
    Cast {
        literal: String,
        target: &'static str,
    },
}

/// A transformation entry that cannot be turned into an [`Operation`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OperationError {
    #[error("'{0}' is not a valid operation")]
    Unknown(String),
    #[error("invalid parameters for {name}: {reason}")]
    InvalidParameters { name: String, reason: String },
    #[error("{0} is not a valid transformation type")]
    InvalidTypeHint(String),
}

/// What happens to the row after an operator has run.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Keep the (possibly modified) value and run the next operator.
    Continue,
    /// Record a warning and stop the chain for this row.
    Warn(String),
    /// Record an error, stop the chain and drop the row.
    Error(String),
    /// Drop the row without a diagnostic.
    Filter,
}

/// Result of applying one operator to one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub value: Value,
    pub action: Action,
}

impl Outcome {
    pub fn keep(value: Value) -> Self {
        Self {
            value,
            action: Action::Continue,
        }
    }
}

/// A validator: a predicate plus whether failing it is an error or only a warning.
#[derive(Debug, Clone)]
pub struct Validation {
    pub predicate: Predicate,
    pub stop_on_invalid: bool,
}

/// One entry of the fixed operator catalog.
#[derive(Debug, Clone)]
pub enum Operation {
    Modify(Modifier),
    Validate(Validation),
    Filter(Predicate),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StopFlag {
    #[serde(default)]
    stop_on_invalid: bool,
}

impl Operation {
    /// Resolve a template operation name (`MODIFY_*`, `VALIDATE_BY_*`, `FILTER_BY_*`) and its
    /// parameter object.
    pub fn from_config(name: &str, parameters: serde_json::Value) -> Result<Self, OperationError> {
        let parameters = match parameters {
            serde_json::Value::Null => serde_json::Value::Object(Default::default()),
            other => other,
        };

        if let Some(kind) = name.strip_prefix("MODIFY_") {
            return resolve(name, Modifier::from_config(kind, parameters)).map(Self::Modify);
        }
        if let Some(kind) = name.strip_prefix("VALIDATE_BY_") {
            let predicate = resolve(name, Predicate::from_config(kind, parameters.clone()))?;
            let flag: StopFlag = parse_parameters(parameters).map_err(|e| invalid(name, e))?;
            return Ok(Self::Validate(Validation {
                predicate,
                stop_on_invalid: flag.stop_on_invalid,
            }));
        }
        if let Some(kind) = name.strip_prefix("FILTER_BY_") {
            return resolve(name, Predicate::from_config(kind, parameters)).map(Self::Filter);
        }
        Err(unknown(name))
    }

    /// Apply the operator to a non-null cell.
    pub fn apply(&self, value: Value) -> Result<Outcome, OperatorFault> {
        match self {
            Self::Modify(modifier) => modifier.apply(value).map(Outcome::keep),
            Self::Validate(validation) => {
                if validation.predicate.passes(&value)? {
                    return Ok(Outcome::keep(value));
                }
                let message = validation.predicate.failure_message(&value);
                let action = if validation.stop_on_invalid {
                    Action::Error(message)
                } else {
                    Action::Warn(message)
                };
                Ok(Outcome { value, action })
            }
            Self::Filter(predicate) => {
                let action = if predicate.passes(&value)? {
                    Action::Continue
                } else {
                    Action::Filter
                };
                Ok(Outcome { value, action })
            }
        }
    }
}

fn resolve<T>(name: &str, parsed: Result<Option<T>, String>) -> Result<T, OperationError> {
    match parsed {
        Ok(Some(op)) => Ok(op),
        Ok(None) => Err(unknown(name)),
        Err(e) => Err(invalid(name, e)),
    }
}

fn unknown(name: &str) -> OperationError {
    OperationError::Unknown(name.to_string())
}

fn invalid(name: &str, reason: String) -> OperationError {
    OperationError::InvalidParameters {
        name: name.to_string(),
        reason,
    }
}

pub(crate) fn parse_parameters<T: DeserializeOwned>(parameters: serde_json::Value) -> Result<T, String> {
    serde_json::from_value(parameters).map_err(|e| e.to_string())
}

/// Relational operator shared by length and value comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Relation {
    Le,
    Lt,
    Eq,
    Ne,
    Gt,
    Ge,
}

impl Relation {
    /// Whether `ordering` (value compared to the target) satisfies the relation.
    pub fn holds(self, ordering: Ordering) -> bool {
        match self {
            Self::Le => ordering != Ordering::Greater,
            Self::Lt => ordering == Ordering::Less,
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
            Self::Gt => ordering == Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Le => "less than or equal to",
            Self::Lt => "less than",
            Self::Eq => "equal to",
            Self::Ne => "not equal to",
            Self::Gt => "greater than",
            Self::Ge => "greater than or equal to",
        }
    }
}

/// Whether a predicate requires membership (`INCLUDE`) or its absence (`EXCLUDE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Inclusion {
    #[default]
    Include,
    Exclude,
}

pub(crate) fn expect_text(value: &Value) -> Result<&str, OperatorFault> {
    match value {
        Value::Utf8(s) => Ok(s),
        other => Err(mismatch("string", other)),
    }
}

pub(crate) fn expect_number(value: &Value) -> Result<f64, OperatorFault> {
    value.as_f64().ok_or_else(|| mismatch("numeric", value))
}

pub(crate) fn mismatch(expected: &'static str, value: &Value) -> OperatorFault {
    OperatorFault::TypeMismatch {
        expected,
        found: value.type_name(),
        value: value.to_text(),
    }
}

/// Temporal view of a date, datetime or date-like string cell.
pub(crate) fn expect_datetime(value: &Value) -> Result<NaiveDateTime, OperatorFault> {
    match value {
        Value::Date(d) => Ok(Temporal::Date(*d).to_datetime()),
        Value::DateTime(dt) => Ok(*dt),
        Value::Utf8(s) => parse_temporal(s)
            .map(Temporal::to_datetime)
            .ok_or_else(|| OperatorFault::InvalidDate(s.clone())),
        other => Err(OperatorFault::InvalidDate(other.to_text())),
    }
}

/// Order two cells of compatible kinds: numbers with numbers, strings with strings, booleans with
/// booleans, and dates with dates or date-like strings.
pub(crate) fn compare_values(left: &Value, right: &Value) -> Result<Ordering, OperatorFault> {
    let incomparable = || OperatorFault::Incomparable {
        left: left.type_name(),
        right: right.type_name(),
        value: left.to_text(),
    };
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
        (l, r) if l.is_numeric() && r.is_numeric() => {
            let (a, b) = (l.as_f64().unwrap_or_default(), r.as_f64().unwrap_or_default());
            a.partial_cmp(&b).ok_or_else(incomparable)
        }
        (Value::Date(_) | Value::DateTime(_), Value::Date(_) | Value::DateTime(_) | Value::Utf8(_)) => {
            let a = expect_datetime(left)?;
            let b = expect_datetime(right)?;
            Ok(a.cmp(&b))
        }
        (Value::Utf8(a), Value::Utf8(b)) => Ok(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Ok(a.cmp(b)),
        _ => Err(incomparable()),
    }
}

/// Render a numeric parameter without a trailing `.0` when it is integral.
pub(crate) fn display_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    use serde_json::json;

    use super::{compare_values, Action, Operation, OperationError, OperatorFault, Relation};
    use crate::types::Value;

    #[test]
    fn relations_cover_all_orderings() {
        assert!(Relation::Le.holds(Ordering::Equal));
        assert!(!Relation::Lt.holds(Ordering::Equal));
        assert!(Relation::Ne.holds(Ordering::Less));
        assert!(Relation::Ge.holds(Ordering::Greater));
        assert!(!Relation::Gt.holds(Ordering::Less));
    }

    #[test]
    fn unknown_names_are_rejected() {
        let err = Operation::from_config("MODIFY_MASK_FIELD", json!({})).unwrap_err();
        assert_eq!(err, OperationError::Unknown("MODIFY_MASK_FIELD".to_string()));
        assert_eq!(err.to_string(), "'MODIFY_MASK_FIELD' is not a valid operation");
        let err = Operation::from_config("SHUFFLE", json!({})).unwrap_err();
        assert_eq!(err.to_string(), "'SHUFFLE' is not a valid operation");
    }

    #[test]
    fn bad_parameters_name_the_operation() {
        let err = Operation::from_config("VALIDATE_BY_RANGE", json!({"min": 0})).unwrap_err();
        assert!(matches!(
            &err,
            OperationError::InvalidParameters { name, .. } if name == "VALIDATE_BY_RANGE"
        ));
        assert!(err.to_string().starts_with("invalid parameters for VALIDATE_BY_RANGE: "));
    }

    #[test]
    fn validator_severity_follows_stop_flag() {
        let strict = Operation::from_config(
            "VALIDATE_BY_RANGE",
            json!({"min": 0, "max": 10, "stopOnInvalid": true}),
        )
        .unwrap();
        let relaxed = Operation::from_config("VALIDATE_BY_RANGE", json!({"min": 0, "max": 10})).unwrap();

        let out = strict.apply(Value::Int(11)).unwrap();
        assert!(matches!(out.action, Action::Error(_)));
        assert_eq!(out.value, Value::Int(11));
        assert!(matches!(relaxed.apply(Value::Int(11)).unwrap().action, Action::Warn(_)));
        assert_eq!(relaxed.apply(Value::Int(5)).unwrap().action, Action::Continue);
    }

    #[test]
    fn filters_never_produce_messages() {
        let filter = Operation::from_config("FILTER_BY_SUBSTRING", json!({"operator": "EXCLUDE", "value": "x"})).unwrap();
        assert_eq!(filter.apply(Value::from("box")).unwrap().action, Action::Filter);
        assert_eq!(filter.apply(Value::from("bag")).unwrap().action, Action::Continue);
    }

    #[test]
    fn mixed_kinds_do_not_compare() {
        assert_eq!(compare_values(&Value::Int(2), &Value::Float(2.5)).unwrap(), Ordering::Less);
        assert!(matches!(
            compare_values(&Value::from("a"), &Value::Int(1)),
            Err(OperatorFault::Incomparable { .. })
        ));
    }
}
