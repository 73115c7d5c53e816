//! Survey error taxonomy.
//!
//! One enum covers input resolution, per-endpoint fetches, page
//! classification and report output. Device-level disposition is not
//! derived from the variant: the prober decides fatality by phase.

use thiserror::Error;

use super::types::Endpoint;

#[derive(Error, Debug)]
pub enum SurveyError {
    #[error("{endpoint} request timed out after {ms}ms")]
    Timeout { endpoint: Endpoint, ms: u64 },

    #[error("Connection to {0} failed")]
    Connect(String),

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("{endpoint} returned HTTP status {status}")]
    HttpStatus { endpoint: Endpoint, status: u16 },

    #[error("{0} page was empty")]
    EmptyPage(Endpoint),

    #[error("Malformed {endpoint} page: {reason}")]
    Malformed { endpoint: Endpoint, reason: String },

    #[error("{endpoint} page has no <{container}> container")]
    MissingContainer {
        endpoint: Endpoint,
        container: &'static str,
    },

    #[error("Address input file not found: {0}")]
    InputMissing(String),

    #[error("Directory lookup failed: {0}")]
    Directory(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SurveyError {
    /// True for transport-level failures (as opposed to a page that arrived
    /// but could not be understood). Only used to pick log wording.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Connect(_) | Self::Http(_) | Self::HttpStatus { .. }
        )
    }
}
