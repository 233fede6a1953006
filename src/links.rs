//! # Golden-Copy Links ([`links`](crate::links)) - Published-file URL resolution.
//!
//! GLEIF publishes a JSON document listing the current golden-copy files. This module
//! resolves it into the three full-file URLs the ingest stage downloads, using the
//! same retry-wrapped HTTP stack as the store client.

use reqwest::Client as ReqwestClient;
use reqwest_middleware::ClientBuilder;
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde_json::Value;
use std::time::Duration;

use crate::error::{PipelineError, Result, StoreResponse};

/// The published-files document location.
pub const PUBLISHED_FILES_URL: &str = "https://goldencopy.gleif.org/api/v2/golden-copies/publishes/latest";

/// The current full-file download URLs for the three data kinds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GoldenCopyLinks {
    /// LEI-CDF concatenated file URL.
    pub lei: String,
    /// RR-CDF concatenated file URL.
    pub rr: String,
    /// Reporting-exceptions concatenated file URL.
    pub repex: String,
}

fn extract(data: &Value, kind: &str) -> Result<String> {
    data["data"][kind]["full_file"]["xml"]["url"]
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| {
            PipelineError::malformed("links", format!("published-files document lacks {kind} URL"))
        })
}

/// Fetches and resolves the published-files document.
///
/// # Errors
///
/// Returns a [`PipelineError`] on connection failure, a non-success response, or a
/// document missing the expected URLs.
pub async fn golden_copy_links(url: &str) -> Result<GoldenCopyLinks> {
    let reqwest_client = ReqwestClient::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(5))
        .build()?;
    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);
    let client = ClientBuilder::new(reqwest_client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build();
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(PipelineError::StoreError(StoreResponse {
            status: response.status(),
            content: response.text().await.unwrap_or_default(),
        }));
    }
    let data: Value = response.json().await?;
    Ok(GoldenCopyLinks {
        lei: extract(&data, "lei2")?,
        rr: extract(&data, "rr")?,
        repex: extract(&data, "repex")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_reads_nested_urls() {
        let doc = json!({
            "data": {
                "lei2": {"full_file": {"xml": {"url": "https://example.org/lei.zip"}}},
                "rr": {"full_file": {"xml": {"url": "https://example.org/rr.zip"}}},
                "repex": {"full_file": {"xml": {"url": "https://example.org/repex.zip"}}}
            }
        });
        assert_eq!(extract(&doc, "lei2").unwrap(), "https://example.org/lei.zip");
        assert_eq!(extract(&doc, "repex").unwrap(), "https://example.org/repex.zip");
    }

    #[test]
    fn test_extract_missing_url_is_malformed() {
        let doc = json!({"data": {}});
        let err = extract(&doc, "rr").unwrap_err();
        assert!(err.is_malformed());
    }
}
