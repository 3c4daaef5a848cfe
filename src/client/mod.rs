//! Typed async client for the Redmine REST API.
//!
//! The client owns a configured `reqwest` client and exposes CRUD methods per
//! resource kind (project, issue, issue category, version). Request and
//! response bodies are the JSON shapes the Redmine API speaks; the submodules
//! convert between those and the flat domain records used in resource state.

mod issue;
mod issue_category;
mod project;
mod version;

pub use issue::Issue;
pub use issue_category::IssueCategory;
pub use project::Project;
pub use version::Version;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProviderError;

/// Connection settings for a Redmine server.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Base URL of the Redmine server, e.g. `http://localhost:3000/`.
    pub url: String,
    /// Username for basic authentication.
    pub username: String,
    /// Password for basic authentication.
    pub password: String,
    /// API key, sent as `X-Redmine-API-Key` when non-empty.
    pub api_key: String,
    /// Accept invalid TLS certificates (self-signed test servers).
    pub skip_cert_verify: bool,
}

/// An `id`/`name` pair as Redmine nests associations in responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct IdName {
    /// Numeric identifier of the associated object.
    pub id: u32,
    /// Display name, present in most responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Error body returned by Redmine on 422 responses.
#[derive(Debug, Deserialize)]
struct ApiErrors {
    errors: Vec<String>,
}

/// Client for a single Redmine server.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    config: ClientConfig,
}

impl Client {
    /// Build a client from the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self, ProviderError> {
        if config.url.is_empty() {
            return Err(ProviderError::Configuration(
                "Redmine URL must not be empty".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.skip_cert_verify)
            .build()
            .map_err(|e| {
                ProviderError::Configuration(format!("failed to build HTTP client: {}", e))
            })?;

        let base_url = config.url.trim_end_matches('/').to_string();

        Ok(Self {
            http,
            base_url,
            config,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request.basic_auth(&self.config.username, Some(&self.config.password));
        if self.config.api_key.is_empty() {
            request
        } else {
            request.header("X-Redmine-API-Key", &self.config.api_key)
        }
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, ProviderError> {
        let url = self.endpoint(path);
        debug!(%url, "GET");
        let response = self.authorize(self.http.get(&url)).send().await?;
        let response = check_status(response).await?;
        Ok(response.json::<T>().await?)
    }

    pub(crate) async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ProviderError> {
        let url = self.endpoint(path);
        debug!(%url, "POST");
        let response = self
            .authorize(self.http.post(&url))
            .json(body)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json::<T>().await?)
    }

    pub(crate) async fn put_json<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), ProviderError> {
        let url = self.endpoint(path);
        debug!(%url, "PUT");
        let response = self
            .authorize(self.http.put(&url))
            .json(body)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    pub(crate) async fn delete_json(&self, path: &str) -> Result<(), ProviderError> {
        let url = self.endpoint(path);
        debug!(%url, "DELETE");
        let response = self.authorize(self.http.delete(&url)).send().await?;
        check_status(response).await?;
        Ok(())
    }
}

/// Map non-success statuses onto provider errors.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(match status.as_u16() {
        404 => ProviderError::NotFound(format!("server returned 404: {}", body)),
        401 | 403 => ProviderError::PermissionDenied(format!(
            "server returned {}: check credentials or API key",
            status.as_u16()
        )),
        422 => {
            // Redmine reports field errors as {"errors": ["...", ...]}
            let message = serde_json::from_str::<ApiErrors>(&body)
                .map(|e| e.errors.join("; "))
                .unwrap_or(body);
            ProviderError::Validation(message)
        }
        code => ProviderError::Api {
            status: code,
            message: body,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_empty_url() {
        let err = Client::new(ClientConfig::default()).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[test]
    fn test_endpoint_join() {
        let client = Client::new(ClientConfig {
            url: "http://localhost:3000/".to_string(),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(
            client.endpoint("projects.json"),
            "http://localhost:3000/projects.json"
        );
        assert_eq!(
            client.endpoint("/issues/7.json"),
            "http://localhost:3000/issues/7.json"
        );
    }

    #[test]
    fn test_id_name_deserialization() {
        let id_name: IdName = serde_json::from_str(r#"{"id": 3, "name": "Bug"}"#).unwrap();
        assert_eq!(id_name.id, 3);
        assert_eq!(id_name.name.as_deref(), Some("Bug"));

        // `parent` on issues comes without a name
        let bare: IdName = serde_json::from_str(r#"{"id": 12}"#).unwrap();
        assert_eq!(bare.id, 12);
        assert!(bare.name.is_none());
    }
}
