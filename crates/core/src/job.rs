//! Question-answering job parameters.
//!
//! A [`JobRequest`] is the client-submitted body; [`JobRequest::into_job`]
//! validates it and binds the caller's graph credentials, producing the
//! [`Job`] a worker executes.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// How much effort the engine spends searching the graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchBudget {
    Shallow,
    #[default]
    Deeper,
}

impl SearchBudget {
    /// The mode string the engine understands.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Shallow => "Shallow",
            Self::Deeper => "Deeper",
        }
    }
}

impl fmt::Display for SearchBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection details for the graph database the engine queries.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphCredentials {
    pub uri: String,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for GraphCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphCredentials")
            .field("uri", &self.uri)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Body of a job submission.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobRequest {
    pub question: Option<String>,
    pub enable_multi_hop: Option<bool>,
    pub search_budget: Option<SearchBudget>,
}

/// Everything the query engine needs for one call.
#[derive(Debug, Clone)]
pub struct Query {
    pub question: String,
    pub enable_multi_hop: bool,
    pub search_budget: SearchBudget,
    pub credentials: GraphCredentials,
}

/// One question-answering execution. Lives for a single request.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub query: Query,
}

impl JobRequest {
    /// Validate the request and attach credentials.
    ///
    /// Fails with [`CoreError::Validation`] when `question` is missing or
    /// blank. `enable_multi_hop` defaults to `true`, `search_budget` to
    /// [`SearchBudget::Deeper`].
    pub fn into_job(self, credentials: GraphCredentials) -> Result<Job, CoreError> {
        let question = match self.question {
            Some(q) if !q.trim().is_empty() => q,
            _ => return Err(CoreError::Validation("No question provided.".into())),
        };

        Ok(Job {
            id: Uuid::new_v4(),
            query: Query {
                question,
                enable_multi_hop: self.enable_multi_hop.unwrap_or(true),
                search_budget: self.search_budget.unwrap_or_default(),
                credentials,
            },
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
