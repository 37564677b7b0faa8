//! Graph database credential verification.

use async_trait::async_trait;
use ragstream_core::job::GraphCredentials;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Invalid graph URI: {0}")]
    InvalidUri(String),

    /// The database answered but refused the credentials or the statement.
    #[error("{0}")]
    Rejected(String),

    #[error("Graph database unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),
}

/// Checks that a set of graph credentials can open a working session.
#[async_trait]
pub trait GraphProbe: Send + Sync {
    async fn verify(&self, credentials: &GraphCredentials) -> Result<(), GraphError>;
}

/// Probe using the Neo4j transactional HTTP endpoint.
pub struct Neo4jHttpProbe {
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    #[serde(default)]
    errors: Vec<StatementError>,
}

#[derive(Debug, Deserialize)]
struct StatementError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl Default for Neo4jHttpProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl Neo4jHttpProbe {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl GraphProbe for Neo4jHttpProbe {
    async fn verify(&self, credentials: &GraphCredentials) -> Result<(), GraphError> {
        let url = format!("{}/db/neo4j/tx/commit", http_endpoint(&credentials.uri)?);
        let response = self
            .client
            .post(&url)
            .basic_auth(&credentials.user, Some(&credentials.password))
            .json(&serde_json::json!({
                "statements": [{ "statement": "RETURN 1" }]
            }))
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(GraphError::Rejected(
                "The client is unauthorized due to authentication failure.".into(),
            ));
        }
        if !status.is_success() {
            return Err(GraphError::Rejected(format!(
                "unexpected HTTP status {}",
                status.as_u16()
            )));
        }

        check_commit(response.json::<CommitResponse>().await?)
    }
}

fn check_commit(body: CommitResponse) -> Result<(), GraphError> {
    match body.errors.into_iter().next() {
        None => Ok(()),
        Some(e) => Err(GraphError::Rejected(format!("{}: {}", e.code, e.message))),
    }
}

/// Map a driver URI onto the database's HTTP endpoint.
///
/// `bolt://` and `neo4j://` go to `http://host:7474`; their `+s`/`+ssc`
/// variants to `https://host:7473`. `http(s)://` URIs are used as given.
pub fn http_endpoint(uri: &str) -> Result<String, GraphError> {
    let (scheme, rest) = uri
        .split_once("://")
        .ok_or_else(|| GraphError::InvalidUri(uri.to_string()))?;

    let authority = rest.split('/').next().unwrap_or_default();
    let host = match authority.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
        _ => authority,
    };
    if host.is_empty() {
        return Err(GraphError::InvalidUri(uri.to_string()));
    }

    match scheme {
        "http" | "https" => Ok(format!("{scheme}://{authority}")),
        "bolt" | "neo4j" => Ok(format!("http://{host}:7474")),
        "bolt+s" | "bolt+ssc" | "neo4j+s" | "neo4j+ssc" => Ok(format!("https://{host}:7473")),
        _ => Err(GraphError::InvalidUri(uri.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn driver_uris_map_to_http_endpoint() {
        assert_eq!(
            http_endpoint("bolt://localhost:7687").unwrap(),
            "http://localhost:7474"
        );
        assert_eq!(
            http_endpoint("neo4j://graph.internal").unwrap(),
            "http://graph.internal:7474"
        );
        assert_eq!(
            http_endpoint("neo4j+s://db.example.com:7687").unwrap(),
            "https://db.example.com:7473"
        );
        assert_eq!(
            http_endpoint("http://localhost:7474/").unwrap(),
            "http://localhost:7474"
        );
    }

    #[test]
    fn unsupported_uris_are_rejected() {
        assert_matches!(http_endpoint("localhost:7687"), Err(GraphError::InvalidUri(_)));
        assert_matches!(http_endpoint("ftp://host"), Err(GraphError::InvalidUri(_)));
        assert_matches!(http_endpoint("bolt://"), Err(GraphError::InvalidUri(_)));
    }

    #[test]
    fn commit_errors_become_rejections() {
        let ok: CommitResponse = serde_json::from_str(r#"{"results":[],"errors":[]}"#).unwrap();
        assert!(check_commit(ok).is_ok());

        let failed: CommitResponse = serde_json::from_str(
            r#"{"results":[],"errors":[{"code":"Neo.ClientError.Security.Unauthorized","message":"bad creds"}]}"#,
        )
        .unwrap();
        assert_matches!(
            check_commit(failed),
            Err(GraphError::Rejected(m)) if m == "Neo.ClientError.Security.Unauthorized: bad creds"
        );
    }

    #[tokio::test]
    async fn unreachable_database_is_reported() {
        let probe = Neo4jHttpProbe::new();
        let creds = GraphCredentials {
            uri: "http://127.0.0.1:1".into(),
            user: "neo4j".into(),
            password: "x".into(),
        };
        assert_matches!(probe.verify(&creds).await, Err(GraphError::Unreachable(_)));
    }
}
