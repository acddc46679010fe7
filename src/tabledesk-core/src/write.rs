use crate::error::{ApiError, ErrorContext};
use crate::models::{RawWriteEntry, WriteAction, WriteResult};
use crate::request::Operation;

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

fn to_result(operation: Operation, entry: RawWriteEntry) -> WriteResult {
    let success = is_success(entry.status);
    let action = match (operation, success) {
        (Operation::Upsert, true) if entry.status == 201 => Some(WriteAction::Created),
        (Operation::Upsert, true) => Some(WriteAction::Updated),
        _ => None,
    };
    WriteResult {
        success,
        status: entry.status,
        id: entry.id,
        key: entry.key,
        action,
        errors: entry.errors,
    }
}

/// Map the raw per-record response of a write into results, 1:1 and in order.
///
/// `submitted` is the number of records sent; any other number of entries
/// is reported as a `Generic` error instead of being truncated or padded.
pub fn map_write_results(
    operation: Operation,
    submitted: usize,
    entries: Vec<RawWriteEntry>,
    url: &str,
) -> Result<Vec<WriteResult>, ApiError> {
    if entries.len() != submitted {
        return Err(ApiError::Generic {
            context: ErrorContext {
                message: format!(
                    "{} returned {} results for {} records",
                    operation.endpoint(),
                    entries.len(),
                    submitted
                ),
                status: None,
                url: url.to_string(),
            },
            field_errors: Vec::new(),
        });
    }

    Ok(entries
        .into_iter()
        .map(|entry| to_result(operation, entry))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldError;
    use serde_json::json;

    fn entries(value: serde_json::Value) -> Vec<RawWriteEntry> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_upsert_action_from_status() {
        let results = map_write_results(
            Operation::Upsert,
            2,
            entries(json!([{"status": 201, "id": 11}, {"status": 200, "id": 4}])),
            "u",
        )
        .unwrap();

        assert_eq!(results[0].action, Some(WriteAction::Created));
        assert_eq!(results[0].id, Some(11));
        assert_eq!(results[1].action, Some(WriteAction::Updated));
        assert!(results.iter().all(|r| r.success));
    }

    #[test]
    fn test_create_has_no_action_and_keeps_order() {
        let raw = entries(json!([
            {"status": 201, "id": 1, "key": "1"},
            {"status": 400, "errors": [{"column": "Email", "message": "required"}]},
            {"status": 201, "id": 3, "key": "3"}
        ]));
        let results = map_write_results(Operation::Create, 3, raw, "u").unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(
            results.iter().map(|r| r.status).collect::<Vec<_>>(),
            vec![201, 400, 201]
        );
        assert!(results.iter().all(|r| r.action.is_none()));
        assert!(!results[1].success);
        assert_eq!(
            results[1].errors,
            vec![FieldError {
                column: Some("Email".into()),
                message: "required".into()
            }]
        );
        assert_eq!(results[2].key, Some(json!("3")));
    }

    #[test]
    fn test_failed_upsert_entry_has_no_action() {
        let results =
            map_write_results(Operation::Upsert, 1, entries(json!([{"status": 422}])), "u")
                .unwrap();
        assert!(!results[0].success);
        assert_eq!(results[0].action, None);
    }

    #[test]
    fn test_count_mismatch_is_an_error() {
        let err = map_write_results(
            Operation::Update,
            3,
            entries(json!([{"status": 200}, {"status": 200}])),
            "https://api.test/x",
        )
        .unwrap_err();
        assert_eq!(err.kind(), "generic");
        assert_eq!(err.message(), "update.json returned 2 results for 3 records");
        assert_eq!(err.url(), "https://api.test/x");
    }

    #[test]
    fn test_success_range_edges() {
        for (status, success) in [(199, false), (200, true), (299, true), (300, false)] {
            let results = map_write_results(
                Operation::Update,
                1,
                entries(json!([{ "status": status }])),
                "u",
            )
            .unwrap();
            assert_eq!(results[0].success, success, "status {}", status);
        }
    }
}
