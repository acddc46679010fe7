//! Query intent: the accumulated, I/O-free state of a select.

use std::fmt;

use crate::error::UsageError;

/// Hard per-request record ceiling enforced by the service
pub const MAX_PAGE_SIZE: u32 = 500;

/// Separator between column and direction in the sort token.
/// Not legal inside a column identifier.
const SORT_SEPARATOR: &str = "//";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub column: String,
    pub direction: SortDirection,
}

impl Sort {
    /// Composite wire token, e.g. `Name//DESC`
    pub fn token(&self) -> String {
        format!("{}{}{}", self.column, SORT_SEPARATOR, self.direction)
    }
}

/// Validate a caller-supplied page size
pub fn validate_limit(top: i64) -> Result<u32, UsageError> {
    if (1..=i64::from(MAX_PAGE_SIZE)).contains(&top) {
        Ok(top as u32)
    } else {
        Err(UsageError::InvalidLimit {
            value: top,
            max: MAX_PAGE_SIZE,
        })
    }
}

/// Validate a caller-supplied offset
pub fn validate_skip(skip: i64) -> Result<u64, UsageError> {
    u64::try_from(skip).map_err(|_| UsageError::InvalidSkip(skip))
}

/// Columns, filter, sort and paging of one logical select.
///
/// Every setter consumes and returns the intent; last write wins per field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryIntent {
    columns: Vec<String>,
    filter: Option<String>,
    sort: Option<Sort>,
    skip: u64,
    top: Option<u32>,
}

impl QueryIntent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the column list. An empty list selects all fields.
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the formula filter. The expression is sent verbatim.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_sort(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.sort = Some(Sort {
            column: column.into(),
            direction,
        });
        self
    }

    pub fn with_limit(mut self, top: i64) -> Result<Self, UsageError> {
        self.top = Some(validate_limit(top)?);
        Ok(self)
    }

    pub fn with_skip(mut self, skip: i64) -> Result<Self, UsageError> {
        self.skip = validate_skip(skip)?;
        Ok(self)
    }

    /// Clone of this intent with only the paging window replaced
    pub fn page(&self, skip: u64, top: u32) -> Self {
        Self {
            skip,
            top: Some(top.clamp(1, MAX_PAGE_SIZE)),
            ..self.clone()
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn sort(&self) -> Option<&Sort> {
        self.sort.as_ref()
    }

    pub fn skip(&self) -> u64 {
        self.skip
    }

    pub fn top(&self) -> Option<u32> {
        self.top
    }

    /// Query parameters in wire order. Absent fields emit nothing;
    /// columns become one `column` pair each, in list order.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params: Vec<(&'static str, String)> = self
            .columns
            .iter()
            .map(|column| ("column", column.clone()))
            .collect();
        if let Some(filter) = &self.filter {
            params.push(("filter", filter.clone()));
        }
        if let Some(sort) = &self.sort {
            params.push(("sort", sort.token()));
        }
        if let Some(top) = self.top {
            params.push(("top", top.to_string()));
        }
        if self.skip > 0 {
            params.push(("skip", self.skip.to_string()));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_bounds() {
        assert!(QueryIntent::new().with_limit(1).is_ok());
        assert!(QueryIntent::new().with_limit(500).is_ok());
        for bad in [0, 501, -5] {
            assert_eq!(
                QueryIntent::new().with_limit(bad),
                Err(UsageError::InvalidLimit {
                    value: bad,
                    max: MAX_PAGE_SIZE
                })
            );
        }
    }

    #[test]
    fn test_negative_skip_rejected() {
        assert_eq!(
            QueryIntent::new().with_skip(-1),
            Err(UsageError::InvalidSkip(-1))
        );
        assert_eq!(QueryIntent::new().with_skip(0).unwrap().skip(), 0);
    }

    #[test]
    fn test_last_write_wins() {
        let intent = QueryIntent::new()
            .with_sort("Name", SortDirection::Asc)
            .with_sort("Created", SortDirection::Desc)
            .with_columns(["A", "B"])
            .with_columns(["C"])
            .with_filter("[Age] > 3")
            .with_filter("[Age] < 9");

        assert_eq!(intent.sort().unwrap().token(), "Created//DESC");
        assert_eq!(intent.columns(), ["C".to_string()]);
        assert_eq!(intent.filter(), Some("[Age] < 9"));
    }

    #[test]
    fn test_absent_fields_emit_no_params() {
        assert!(QueryIntent::new().to_params().is_empty());
    }

    #[test]
    fn test_filter_passed_through_verbatim() {
        assert_eq!(
            QueryIntent::new().with_filter(" ").to_params(),
            vec![("filter", " ".to_string())]
        );
        assert_eq!(
            QueryIntent::new().with_filter("  [Age] > 3 ").filter(),
            Some("  [Age] > 3 ")
        );
    }

    #[test]
    fn test_params_order() {
        let intent = QueryIntent::new()
            .with_columns(["Last, First", "Email"])
            .with_filter("[Status] = \"Open\"")
            .with_sort("Email", SortDirection::default())
            .with_limit(20)
            .unwrap()
            .with_skip(40)
            .unwrap();

        assert_eq!(
            intent.to_params(),
            vec![
                ("column", "Last, First".to_string()),
                ("column", "Email".to_string()),
                ("filter", "[Status] = \"Open\"".to_string()),
                ("sort", "Email//ASC".to_string()),
                ("top", "20".to_string()),
                ("skip", "40".to_string()),
            ]
        );
    }

    #[test]
    fn test_page_overrides_only_window() {
        let base = QueryIntent::new()
            .with_columns(["Name"])
            .with_limit(3)
            .unwrap();
        let page = base.page(1000, MAX_PAGE_SIZE);

        assert_eq!(page.skip(), 1000);
        assert_eq!(page.top(), Some(500));
        assert_eq!(page.columns(), base.columns());
        assert_eq!(base.top(), Some(3));
        assert_eq!(base.skip(), 0);
    }
}
