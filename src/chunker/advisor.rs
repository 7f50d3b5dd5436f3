//! Advisory boundary detection.
//!
//! An external service may suggest chunk split offsets. It is optional and
//! unreliable by contract: every failure mode here (timeout, HTTP error,
//! malformed body) surfaces as an [`AdvisorError`] and the chunker falls back
//! to fixed-size chunking.
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::scanner::FileType;

/// At most this many characters of the file are sent for analysis.
const PREVIEW_LEN: usize = 8000;

/// Upper bound on accepted offsets; more than this is a degenerate response.
const MAX_OFFSETS: usize = 10_000;

#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("advisory service unavailable: {0}")]
    Unavailable(String),

    #[error("advisory request timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed advisory response: {0}")]
    Malformed(String),
}

/// External split-point suggestion service. Advisory only, never authoritative.
#[async_trait]
pub trait BoundaryAdvisor: Send + Sync {
    /// Suggest split offsets (char positions) for the given text preview.
    async fn advise(
        &self,
        preview: &str,
        file_type: FileType,
        file_name: &str,
    ) -> Result<Vec<usize>, AdvisorError>;
}

/// Advisor that always reports unavailable, forcing fixed-size chunking.
/// Used for dry runs and when the advisor is disabled in config.
pub struct NoopAdvisor;

#[async_trait]
impl BoundaryAdvisor for NoopAdvisor {
    async fn advise(
        &self,
        _preview: &str,
        _file_type: FileType,
        _file_name: &str,
    ) -> Result<Vec<usize>, AdvisorError> {
        Err(AdvisorError::Unavailable("advisor disabled".to_string()))
    }
}

#[derive(Serialize, Debug)]
struct AdviseRequest<'a> {
    text: &'a str,
    file_type: &'static str,
    file_name: &'a str,
    guidance: &'static str,
}

#[derive(Deserialize, Debug)]
struct AdviseResponse {
    offsets: Vec<usize>,
}

/// HTTP-backed boundary advisor with a hard request timeout.
pub struct HttpBoundaryAdvisor {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpBoundaryAdvisor {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            timeout,
        }
    }
}

/// Type-specific guidance forwarded to the service.
fn guidance_for(file_type: FileType) -> &'static str {
    match file_type {
        FileType::Code | FileType::Script | FileType::Web => {
            "split at function and class boundaries"
        }
        FileType::Markup => "split at headings and section breaks",
        FileType::Data | FileType::Config => "split at record and section boundaries",
        FileType::Text => "split at paragraph boundaries",
    }
}

#[async_trait]
impl BoundaryAdvisor for HttpBoundaryAdvisor {
    async fn advise(
        &self,
        preview: &str,
        file_type: FileType,
        file_name: &str,
    ) -> Result<Vec<usize>, AdvisorError> {
        let preview: String = preview.chars().take(PREVIEW_LEN).collect();
        let request = AdviseRequest {
            text: &preview,
            file_type: file_type.as_str(),
            file_name,
            guidance: guidance_for(file_type),
        };

        let send = self.client.post(&self.url).json(&request).send();
        let response = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| AdvisorError::Timeout(self.timeout))?
            .map_err(|e| AdvisorError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AdvisorError::Unavailable(format!(
                "advisory service returned {}",
                response.status()
            )));
        }

        let body: AdviseResponse = response
            .json()
            .await
            .map_err(|e| AdvisorError::Malformed(e.to_string()))?;

        if body.offsets.len() > MAX_OFFSETS {
            return Err(AdvisorError::Malformed(format!(
                "{} offsets exceeds sanity limit",
                body.offsets.len()
            )));
        }

        debug!(
            "Advisor suggested {} boundaries for {file_name}",
            body.offsets.len()
        );
        Ok(body.offsets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_advisor_is_unavailable() {
        let advisor = NoopAdvisor;
        let result = advisor.advise("text", FileType::Text, "a.txt").await;
        assert!(matches!(result, Err(AdvisorError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_http_advisor_unreachable() {
        // Nothing listens here; must error, not hang or panic.
        let advisor =
            HttpBoundaryAdvisor::new("http://127.0.0.1:1/advise", Duration::from_millis(200));
        let result = advisor.advise("text", FileType::Code, "a.js").await;
        assert!(result.is_err());
    }

    #[test]
    fn test_guidance_by_type() {
        assert!(guidance_for(FileType::Code).contains("function"));
        assert!(guidance_for(FileType::Markup).contains("headings"));
        assert!(guidance_for(FileType::Data).contains("record"));
    }
}
