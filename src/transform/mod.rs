//! Per-field transformation chains.
//!
//! Each output field may carry an ordered list of operators. For every non-null cell the chain
//! runs in order until an operator warns, errors or filters; rows marked by an error or a filter
//! are dropped once the whole field has been evaluated.
//!
//! ```
//! use tabular_etl::transform::{Action, Operation};
//! use tabular_etl::types::Value;
//!
//! let op = Operation::from_config(
//!     "VALIDATE_BY_LENGTH",
//!     serde_json::json!({"operator": "LE", "value": 3, "stopOnInvalid": true}),
//! )
//! .unwrap();
//! let outcome = op.apply(Value::from("abcd")).unwrap();
//! assert!(matches!(outcome.action, Action::Error(_)));
//! ```

mod modify;
mod operation;
mod predicate;

pub use modify::{
    AppendParams, Case, CaseParams, CastParams, DateFormat, DateFormatParams, Edge, MathOperator,
    MathParams, Modifier, RemoveParams, ReplaceParams, RoundParams, Side, TrimParams,
    WhitespaceParams,
};
pub use operation::{
    Action, Inclusion, Operation, OperationError, OperatorFault, Outcome, Relation, Validation,
};
pub use predicate::{
    DateRangeParams, DateValueParams, LengthParams, ListParams, Predicate, RangeParams,
    RegexParams, SubstringParams, ValueParams,
};

use crate::config::{Configuration, Transformation};
use crate::pipeline::Diagnostics;
use crate::types::{Batch, Value};

/// How a row's chain ended.
enum Verdict {
    Keep,
    Warn { step: usize, message: String },
    Error { step: usize, message: String },
    Filter,
}

/// Run every field's transformation chain over `batch`, recording diagnostics, dropping rows
/// that errored or were filtered, and finally replacing remaining nulls with empty strings.
pub fn transform(mut batch: Batch, configuration: &Configuration, diagnostics: &mut Diagnostics) -> Batch {
    for field in &configuration.output_fields {
        if field.transformations.is_empty() {
            continue;
        }
        let Some(col) = batch.column_index(&field.name) else {
            continue;
        };
        let label = configuration.location_label(field);

        let mut drop = vec![false; batch.rows.len()];
        for (row, dropped) in batch.rows.iter_mut().zip(drop.iter_mut()) {
            let Some(cell) = row.values.get_mut(col) else {
                continue;
            };
            if cell.is_null() {
                continue;
            }
            let (value, verdict) = run_chain(std::mem::replace(cell, Value::Null), &field.transformations);
            *cell = value;

            match verdict {
                Verdict::Keep => {}
                Verdict::Warn { step, message } => diagnostics.warning(format!(
                    "'{}', {label} {}, transformation #{step}: {message}.",
                    field.name, row.position
                )),
                Verdict::Error { step, message } => {
                    diagnostics.error(format!(
                        "'{}', {label} {}, transformation #{step}: {message}.",
                        field.name, row.position
                    ));
                    *dropped = true;
                }
                Verdict::Filter => *dropped = true,
            }
        }

        if drop.iter().any(|d| *d) {
            let mut flags = drop.into_iter();
            batch.retain_rows(|_| !flags.next().unwrap_or(false));
        }
    }

    for row in &mut batch.rows {
        for value in &mut row.values {
            if value.is_null() {
                *value = Value::Utf8(String::new());
            }
        }
    }
    batch
}

fn run_chain(mut value: Value, transformations: &[Transformation]) -> (Value, Verdict) {
    for (i, transformation) in transformations.iter().enumerate() {
        let step = i + 1;
        let outcome = match transformation.operation.apply(value) {
            Ok(outcome) => outcome,
            Err(fault) => {
                return (
                    Value::Null,
                    Verdict::Error {
                        step,
                        message: fault.to_string(),
                    },
                );
            }
        };
        value = outcome.value;
        match outcome.action {
            Action::Continue => {}
            Action::Warn(message) => return (value, Verdict::Warn { step, message }),
            Action::Error(message) => return (value, Verdict::Error { step, message }),
            Action::Filter => return (value, Verdict::Filter),
        }
    }
    (value, Verdict::Keep)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::transform;
    use crate::config::{Configuration, FileType, OutputField, OutputFile, SourceField, SourceFile, Transformation};
    use crate::pipeline::Diagnostics;
    use crate::types::{Batch, DataType, Value};

    const ID: &str = "fc01da57-106a-4255-be48-3e634296ce3f";

    fn config(file_type: FileType, transformations: Vec<Transformation>) -> Configuration {
        Configuration::new(
            ID,
            vec![SourceFile::new(file_type)],
            vec![SourceField::new("name", 0)],
            OutputFile::new(FileType::Csv),
            vec![OutputField::new("Name", DataType::String, vec![0]).with_transformations(transformations)],
        )
        .unwrap()
    }

    fn step(name: &str, parameters: serde_json::Value) -> Transformation {
        Transformation::parse(name, parameters).unwrap()
    }

    fn batch(values: &[&str]) -> Batch {
        Batch::from_values(
            vec!["Name".to_string()],
            values.iter().map(|v| vec![Value::from(*v)]).collect(),
        )
    }

    fn names(batch: &Batch) -> Vec<String> {
        batch.column(0).map(Value::to_text).collect()
    }

    #[test]
    fn chain_applies_in_order() {
        let cfg = config(
            FileType::Csv,
            vec![
                step("MODIFY_REMOVE_WHITESPACE", json!({"operator": "BOTH"})),
                step("MODIFY_CHANGE_CASE", json!({"operator": "UPPER"})),
                step("MODIFY_APPEND_STRING", json!({"operator": "RIGHT", "value": "!"})),
            ],
        );
        let mut diagnostics = Diagnostics::new(None);
        let out = transform(batch(&[" ada ", "bob"]), &cfg, &mut diagnostics);
        assert_eq!(names(&out), vec!["ADA!", "BOB!"]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn error_drops_row_and_reports_true_position() {
        let cfg = config(
            FileType::Csv,
            vec![step("VALIDATE_BY_LENGTH", json!({"operator": "LE", "value": 3, "stopOnInvalid": true}))],
        );
        let mut input = batch(&["ok", "too long", "fine", "also too long"]);
        // Simulate a second chunk: positions continue from the previous one.
        for row in &mut input.rows {
            row.position += 100;
        }
        let mut diagnostics = Diagnostics::new(None);
        let out = transform(input, &cfg, &mut diagnostics);

        assert_eq!(names(&out), vec!["ok"]);
        assert_eq!(diagnostics.errors().len(), 3);
        assert_eq!(
            diagnostics.errors()[0],
            "'Name', Row 102, transformation #1: 'too long' did not match the specified length \
             requirements (less than or equal to 3 characters)."
        );
        assert!(diagnostics.errors()[2].starts_with("'Name', Row 104,"));
        assert!(diagnostics.has_errors());
    }

    #[test]
    fn warning_keeps_row_and_stops_chain() {
        let cfg = config(
            FileType::Json,
            vec![
                step("VALIDATE_BY_SUBSTRING", json!({"operator": "INCLUDE", "value": "@"})),
                step("MODIFY_CHANGE_CASE", json!({"operator": "UPPER"})),
            ],
        );
        let mut diagnostics = Diagnostics::new(None);
        let out = transform(batch(&["a@b", "nope"]), &cfg, &mut diagnostics);

        assert_eq!(names(&out), vec!["A@B", "nope"]);
        assert_eq!(
            diagnostics.warnings(),
            ["'Name', Object 2, transformation #1: 'nope' did not contain the expected value '@'."]
        );
        assert!(!diagnostics.has_errors());
    }

    #[test]
    fn filter_is_silent() {
        let cfg = config(
            FileType::Csv,
            vec![step("FILTER_BY_REGEX", json!({"operator": "EXCLUDE", "value": "tmp"}))],
        );
        let mut diagnostics = Diagnostics::new(None);
        let out = transform(batch(&["tmp1", "keep", "tmp2", "keep too"]), &cfg, &mut diagnostics);

        assert_eq!(names(&out), vec!["keep", "keep too"]);
        let positions: Vec<usize> = out.rows.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![2, 4]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn fault_becomes_error() {
        let cfg = config(
            FileType::Csv,
            vec![step("MODIFY_DO_MATH", json!({"operator": "ADD", "value": 1}))],
        );
        let mut diagnostics = Diagnostics::new(None);
        let out = transform(batch(&["x"]), &cfg, &mut diagnostics);

        assert!(out.is_empty());
        assert_eq!(
            diagnostics.errors(),
            ["'Name', Row 1, transformation #1: expected a numeric value but found the string 'x'."]
        );
    }

    #[test]
    fn nulls_skip_the_chain_and_become_empty() {
        let cfg = config(
            FileType::Csv,
            vec![step("VALIDATE_BY_LENGTH", json!({"operator": "GE", "value": 1, "stopOnInvalid": true}))],
        );
        let input = Batch::from_values(vec!["Name".to_string()], vec![vec![Value::Null]]);
        let mut diagnostics = Diagnostics::new(None);
        let out = transform(input, &cfg, &mut diagnostics);

        assert_eq!(out.rows[0].values, vec![Value::from("")]);
        assert!(diagnostics.is_empty());
    }
}
