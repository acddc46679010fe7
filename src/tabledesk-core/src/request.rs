//! Request assembly.
//!
//! Turns a target, an operation and encoded parameters into a fully
//! qualified [`HttpRequest`]. Path segments and query values are
//! percent-encoded individually by `url`, so reserved characters in
//! column, filter and view names survive the trip unchanged.

use std::fmt;

use url::Url;

use crate::config::{AuthMode, ClientConfig};
use crate::error::UsageError;

/// Placeholder for the token in logged and error-attached URLs
const REDACTED: &str = "***";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// Addressed resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The application itself (schema description)
    Application,
    Table(String),
    View { table: String, view: String },
}

impl Target {
    pub fn table(name: impl Into<String>) -> Self {
        Self::Table(name.into())
    }

    pub fn view(table: impl Into<String>, view: impl Into<String>) -> Self {
        Self::View {
            table: table.into(),
            view: view.into(),
        }
    }

    fn segments(&self) -> Vec<&str> {
        match self {
            Self::Application => Vec::new(),
            Self::Table(table) => vec![table.as_str()],
            Self::View { table, view } => vec![table.as_str(), view.as_str()],
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Application => f.write_str("application"),
            Self::Table(table) => f.write_str(table),
            Self::View { table, view } => write!(f, "{}/{}", table, view),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Select,
    Retrieve,
    Describe,
    Create,
    Update,
    Upsert,
    Delete,
}

impl Operation {
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Select => "select.json",
            Self::Retrieve => "retrieve.json",
            Self::Describe => "describe.json",
            Self::Create => "create.json",
            Self::Update => "update.json",
            Self::Upsert => "upsert.json",
            Self::Delete => "delete.json",
        }
    }

    pub fn method(&self) -> Method {
        match self {
            Self::Create | Self::Update | Self::Upsert => Method::Post,
            Self::Select | Self::Retrieve | Self::Describe | Self::Delete => Method::Get,
        }
    }
}

/// A fully assembled request, ready for the transport
#[derive(Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    /// Same as `url` with the token masked; safe to log
    pub redacted_url: String,
    /// Bearer token for the `Authorization` header, if that mode is active
    pub bearer: Option<String>,
    /// JSON body for write operations
    pub body: Option<serde_json::Value>,
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.redacted_url)
            .field("bearer", &self.bearer.as_ref().map(|_| REDACTED))
            .field("body", &self.body)
            .finish()
    }
}

fn build_url(
    config: &ClientConfig,
    token: &str,
    target: &Target,
    operation: Operation,
    params: &[(&str, String)],
) -> Result<Url, UsageError> {
    let mut url = Url::parse(&config.base_url).map_err(|e| {
        UsageError::InvalidConfig(format!("base_url '{}': {}", config.base_url, e))
    })?;
    {
        let mut segments = url.path_segments_mut().map_err(|_| {
            UsageError::InvalidConfig(format!("base_url '{}' cannot carry a path", config.base_url))
        })?;
        segments.pop_if_empty().push(&config.app_id);
        if config.auth_mode == AuthMode::Path {
            segments.push(token);
        }
        segments.extend(target.segments());
        segments.push(operation.endpoint());
    }
    if !params.is_empty() {
        let mut query = url.query_pairs_mut();
        for (name, value) in params {
            query.append_pair(name, value);
        }
    }
    Ok(url)
}

/// Assemble the request for `operation` on `target`
pub fn assemble(
    config: &ClientConfig,
    target: &Target,
    operation: Operation,
    params: &[(&str, String)],
    body: Option<serde_json::Value>,
) -> Result<HttpRequest, UsageError> {
    let url = build_url(config, &config.token, target, operation, params)?;
    let (redacted_url, bearer) = match config.auth_mode {
        AuthMode::Path => (
            build_url(config, REDACTED, target, operation, params)?.to_string(),
            None,
        ),
        AuthMode::Bearer => (url.to_string(), Some(config.token.clone())),
    };

    Ok(HttpRequest {
        method: operation.method(),
        url,
        redacted_url,
        bearer,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{QueryIntent, SortDirection};
    use percent_encoding::percent_decode_str;

    fn config(mode: AuthMode) -> ClientConfig {
        ClientConfig::new("15331", "s3cr3t")
            .with_base_url("https://api.test/secure/api/v2/")
            .with_auth_mode(mode)
    }

    #[test]
    fn test_path_auth_select_url() {
        let intent = QueryIntent::new()
            .with_columns(["Name"])
            .with_sort("Name", SortDirection::Desc)
            .with_limit(3)
            .unwrap();
        let request = assemble(
            &config(AuthMode::Path),
            &Target::table("Contacts"),
            Operation::Select,
            &intent.to_params(),
            None,
        )
        .unwrap();

        assert_eq!(request.method, Method::Get);
        assert_eq!(
            request.url.as_str(),
            "https://api.test/secure/api/v2/15331/s3cr3t/Contacts/select.json?column=Name&sort=Name%2F%2FDESC&top=3"
        );
        assert_eq!(
            request.redacted_url,
            "https://api.test/secure/api/v2/15331/***/Contacts/select.json?column=Name&sort=Name%2F%2FDESC&top=3"
        );
        assert!(request.bearer.is_none());
    }

    #[test]
    fn test_bearer_mode_keeps_secret_out_of_url() {
        let request = assemble(
            &config(AuthMode::Bearer),
            &Target::view("Contacts", "Active"),
            Operation::Select,
            &[],
            None,
        )
        .unwrap();

        assert_eq!(
            request.url.as_str(),
            "https://api.test/secure/api/v2/15331/Contacts/Active/select.json"
        );
        assert!(!request.url.as_str().contains("s3cr3t"));
        assert_eq!(request.redacted_url, request.url.as_str());
        assert_eq!(request.bearer.as_deref(), Some("s3cr3t"));
        assert!(!format!("{:?}", request).contains("s3cr3t"));
    }

    #[test]
    fn test_write_operations_post() {
        let request = assemble(
            &config(AuthMode::Path),
            &Target::table("Contacts"),
            Operation::Upsert,
            &[("workflow", "0".to_string()), ("match", "Email".to_string())],
            Some(serde_json::json!([{"Email": "a@b.c"}])),
        )
        .unwrap();

        assert_eq!(request.method, Method::Post);
        assert!(request
            .url
            .as_str()
            .ends_with("/Contacts/upsert.json?workflow=0&match=Email"));
    }

    #[test]
    fn test_reserved_characters_round_trip() {
        let awkward = ["Last, First", "a & b", "100% done", "Größe ✓", "x=y+z"];
        let intent = QueryIntent::new()
            .with_columns(awkward)
            .with_filter("[Name] = \"A & B\" and [Pct] > 50%");
        let request = assemble(
            &config(AuthMode::Path),
            &Target::view("Tasks & Notes", "Open ✓ 100%"),
            Operation::Select,
            &intent.to_params(),
            None,
        )
        .unwrap();

        let columns: Vec<String> = request
            .url
            .query_pairs()
            .filter(|(k, _)| k == "column")
            .map(|(_, v)| v.into_owned())
            .collect();
        assert_eq!(columns, awkward);

        let filter = request
            .url
            .query_pairs()
            .find(|(k, _)| k == "filter")
            .map(|(_, v)| v.into_owned());
        assert_eq!(
            filter.as_deref(),
            Some("[Name] = \"A & B\" and [Pct] > 50%")
        );

        let segments: Vec<String> = request
            .url
            .path_segments()
            .unwrap()
            .map(|s| percent_decode_str(s).decode_utf8().unwrap().into_owned())
            .collect();
        assert_eq!(
            &segments[segments.len() - 3..],
            ["Tasks & Notes", "Open ✓ 100%", "select.json"]
        );
    }

    #[test]
    fn test_application_target() {
        let request = assemble(
            &config(AuthMode::Bearer),
            &Target::Application,
            Operation::Describe,
            &[],
            None,
        )
        .unwrap();
        assert_eq!(
            request.url.as_str(),
            "https://api.test/secure/api/v2/15331/describe.json"
        );
    }
}
