use serde::Deserialize;

use crate::transform::{Operation, OperationError};
use crate::types::DataType;

/// One configured step of an output field's transformation chain.
///
/// Parameters are parsed into a typed [`Operation`] while the template is loaded, so an unknown
/// operation name, a missing parameter or an invalid regex fails the whole configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawTransformation")]
pub struct Transformation {
    pub operation: Operation,
    /// Optional type hint carried by the template; informational only.
    pub type_hint: Option<DataType>,
}

impl Transformation {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            type_hint: None,
        }
    }

    /// Build from an operation name and its JSON parameters, as they appear in a template.
    pub fn parse(name: &str, parameters: serde_json::Value) -> Result<Self, OperationError> {
        Ok(Self::new(Operation::from_config(name, parameters)?))
    }
}

#[derive(Deserialize)]
struct RawTransformation {
    operation: String,
    #[serde(default)]
    parameters: serde_json::Value,
    #[serde(default, rename = "type")]
    type_hint: Option<String>,
}

impl TryFrom<RawTransformation> for Transformation {
    type Error = OperationError;

    fn try_from(raw: RawTransformation) -> Result<Self, Self::Error> {
        let operation = Operation::from_config(&raw.operation, raw.parameters)?;
        let type_hint = match raw.type_hint.as_deref() {
            None | Some("") => None,
            Some(hint) => Some(
                serde_json::from_value(serde_json::Value::String(hint.to_string()))
                    .map_err(|_| OperationError::InvalidTypeHint(hint.to_string()))?,
            ),
        };
        Ok(Self {
            operation,
            type_hint,
        })
    }
}
