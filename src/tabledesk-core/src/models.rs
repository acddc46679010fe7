use serde::{Deserialize, Serialize};
use std::fmt;

/// Record represents one row returned by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Server-assigned row identifier
    #[serde(rename = "@row.id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Permissions descriptor for the current user
    #[serde(
        rename = "@row.permissions",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub permissions: Option<String>,
    /// User-defined column values keyed by column name
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl Record {
    /// Look up a column value by name
    pub fn get(&self, column: &str) -> Option<&serde_json::Value> {
        self.fields.get(column)
    }
}

/// FieldError is a single field-level error reported by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    #[serde(default, alias = "field", skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(default)]
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.column {
            Some(column) => write!(f, "{}: {}", column, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Join field errors in backend order: `field: message; message; ...`
pub fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Outcome of an upsert for one record.
///
/// Derived from the status code only: the service answers `201` for an
/// inserted row and another 2xx status for a matched, updated row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteAction {
    Created,
    Updated,
}

/// WriteResult is the per-record outcome of a create/update/upsert/delete
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WriteResult {
    pub success: bool,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<WriteAction>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

/// RawWriteEntry is one element of the service's write response array
#[derive(Debug, Clone, Deserialize)]
pub struct RawWriteEntry {
    pub status: u16,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub key: Option<serde_json::Value>,
    #[serde(default)]
    pub errors: Vec<FieldError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_splits_row_metadata_from_fields() {
        let record: Record = serde_json::from_value(serde_json::json!({
            "@row.id": 7,
            "@row.permissions": "rw",
            "Name": "Ada",
            "Email": "ada@example.com"
        }))
        .unwrap();

        assert_eq!(record.id, Some(7));
        assert_eq!(record.permissions.as_deref(), Some("rw"));
        assert_eq!(record.fields.len(), 2);
        assert_eq!(record.get("Name"), Some(&serde_json::json!("Ada")));
    }

    #[test]
    fn test_join_field_errors_keeps_order() {
        let errors = vec![
            FieldError {
                column: Some("Email".into()),
                message: "must be unique".into(),
            },
            FieldError {
                column: None,
                message: "row rejected".into(),
            },
        ];
        assert_eq!(
            join_field_errors(&errors),
            "Email: must be unique; row rejected"
        );
    }
}
