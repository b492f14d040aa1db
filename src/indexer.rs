//! Client for the remote indexing service.
//!
//! The service answers one question here: how many tokens does an address
//! currently own outside the vault. Token metadata in the response is
//! ignored beyond the count.

use crate::Error;
use near_primitives::types::AccountId;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::metrics::METRICS;

#[derive(Debug, Deserialize)]
struct OwnedTokensResponse {
    total: u64,
}

pub struct IndexerClient {
    http: reqwest::Client,
    base_url: String,
    chain: String,
    api_key: Option<String>,
}

impl IndexerClient {
    pub fn new(
        base_url: &str,
        chain: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("indexer HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            chain: chain.to_string(),
            api_key,
        })
    }

    /// Count of tokens owned by `account_id` on the configured chain.
    pub async fn tokens_owned(&self, account_id: &AccountId) -> Result<u64, Error> {
        let url = format!("{}/account/{}/tokens", self.base_url, account_id);
        let mut request = self.http.get(&url).query(&[("chain", self.chain.as_str())]);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request.send().await.map_err(|e| {
            METRICS.indexer_errors.bump();
            Error::Indexer(format!("request failed: {e}"))
        })?;
        if !response.status().is_success() {
            METRICS.indexer_errors.bump();
            return Err(Error::Indexer(format!(
                "{url} returned {}",
                response.status()
            )));
        }

        let body: OwnedTokensResponse = response.json().await.map_err(|e| {
            METRICS.indexer_errors.bump();
            Error::Indexer(format!("malformed response: {e}"))
        })?;

        debug!(account = %account_id, total = body.total, "Owned-tokens query ok");
        Ok(body.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_parses_total_and_ignores_metadata() {
        let body: OwnedTokensResponse = serde_json::from_str(
            r#"{"total": 7, "result": [{"token_id": "12", "metadata": {"title": "Dusty #12"}}]}"#,
        )
        .unwrap();
        assert_eq!(body.total, 7);
    }

    #[test]
    fn test_base_url_trailing_slash_is_normalized() {
        let client = IndexerClient::new(
            "https://indexer.example.com/v1/",
            "mainnet",
            None,
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(client.base_url, "https://indexer.example.com/v1");
    }
}
