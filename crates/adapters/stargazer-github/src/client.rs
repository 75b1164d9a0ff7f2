use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CONTENT_LENGTH, ETAG, IF_NONE_MATCH};
use serde::Deserialize;

use stargazer_core::{CounterSource, FetchOutcome, SourceError, Starrer};

use crate::config::GitHubConfig;

const GITHUB_ACCEPT: &str = "application/vnd.github+json";

/// Partial GitHub API response for a repository.
#[derive(Debug, Deserialize)]
struct RepoResponse {
    stargazers_count: u64,
}

/// GitHub REST client. Reads stargazer counts and stars repositories.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    api_base_url: String,
    token: Option<String>,
    timeout: Duration,
}

impl GitHubClient {
    /// Build a client around a shared `reqwest::Client`. The shared client
    /// must carry a User-Agent; GitHub rejects requests without one.
    pub fn new(config: &GitHubConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token: config.token.clone().filter(|t| !t.is_empty()),
            timeout: config.timeout(),
        }
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

fn transport(endpoint: &str, e: reqwest::Error) -> SourceError {
    SourceError::Transport {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    }
}

#[async_trait]
impl CounterSource for GitHubClient {
    async fn fetch(
        &self,
        repository: &str,
        cache_token: Option<&str>,
    ) -> Result<FetchOutcome, SourceError> {
        let endpoint = format!("{}/repos/{repository}", self.api_base_url);

        let mut request = self
            .client
            .get(&endpoint)
            .header(ACCEPT, GITHUB_ACCEPT)
            .timeout(self.timeout);
        if let Some(tag) = cache_token {
            request = request.header(IF_NONE_MATCH, tag);
        }

        let resp = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| transport(&endpoint, e))?;

        match resp.status() {
            StatusCode::NOT_MODIFIED => return Ok(FetchOutcome::NotModified),
            StatusCode::OK => {},
            status => {
                return Err(SourceError::UnexpectedStatus {
                    status: status.as_u16(),
                    endpoint,
                });
            },
        }

        let token = resp
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        let repo: RepoResponse = resp.json().await.map_err(|e| SourceError::Decode {
            endpoint: endpoint.clone(),
            message: e.to_string(),
        })?;

        Ok(FetchOutcome::Fetched {
            count: repo.stargazers_count,
            token,
        })
    }
}

#[async_trait]
impl Starrer for GitHubClient {
    fn has_credential(&self) -> bool {
        self.token.is_some()
    }

    async fn star(&self, repository: &str) -> Result<(), SourceError> {
        if self.token.is_none() {
            return Err(SourceError::MissingCredential("starring"));
        }
        let endpoint = format!("{}/user/starred/{repository}", self.api_base_url);

        let request = self
            .client
            .put(&endpoint)
            .header(ACCEPT, GITHUB_ACCEPT)
            .header(CONTENT_LENGTH, "0")
            .timeout(self.timeout);

        let resp = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| transport(&endpoint, e))?;

        if !resp.status().is_success() {
            return Err(SourceError::UnexpectedStatus {
                status: resp.status().as_u16(),
                endpoint,
            });
        }
        tracing::debug!(repo = repository, status = %resp.status(), "Star request accepted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let config = GitHubConfig {
            api_base_url: "http://localhost:9000/".to_string(),
            ..GitHubConfig::default()
        };
        let client = GitHubClient::new(&config, reqwest::Client::new());
        assert_eq!(client.api_base_url, "http://localhost:9000");
    }

    #[test]
    fn empty_token_counts_as_missing() {
        let config = GitHubConfig {
            token: Some(String::new()),
            ..GitHubConfig::default()
        };
        let client = GitHubClient::new(&config, reqwest::Client::new());
        assert!(!client.has_credential());
    }

    #[tokio::test]
    async fn star_without_token_never_hits_the_network() {
        let config = GitHubConfig {
            api_base_url: "http://127.0.0.1:1".to_string(),
            ..GitHubConfig::default()
        };
        let client = GitHubClient::new(&config, reqwest::Client::new());
        let err = client.star("owner/repo").await.unwrap_err();
        assert!(matches!(err, SourceError::MissingCredential(_)));
    }

    #[test]
    fn parses_stargazers_field() {
        let body = r#"{"id": 1, "full_name": "owner/repo", "stargazers_count": 1234}"#;
        let repo: RepoResponse = serde_json::from_str(body).unwrap();
        assert_eq!(repo.stargazers_count, 1234);
    }
}
