// src/core/identity/client.rs

use super::IdentitySource;
use crate::config::IdentityConfig;
use crate::core::errors::OtuError;
use crate::core::model::{Group, Member};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

/// The header carrying the static API key.
const API_KEY_HEADER: &str = "X-API-KEY";

/// Talks to the identity REST API over HTTP.
pub struct HttpIdentitySource {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
    ldap_groups: Vec<String>,
}

impl HttpIdentitySource {
    pub fn new(config: &IdentityConfig) -> Result<Self, OtuError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| OtuError::Internal(format!("failed to build HTTP client: {e}")))?;
        let base_url = Url::parse(&config.api_url)?;
        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
            ldap_groups: config.ldap_groups.clone(),
        })
    }

    /// Appends percent-encoded path segments to the base URL, keeping any base path.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, OtuError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| OtuError::Internal(format!("'{}' cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_list<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>, OtuError> {
        debug!("GET {}", url);
        let res = self
            .client
            .get(url.clone())
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        let status = res.status();
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(OtuError::SourceUnavailable(format!(
                "{url} responded with status {status}"
            )));
        }
        if !status.is_success() {
            return Err(OtuError::SourceProtocol(format!(
                "{url} responded with status {status}"
            )));
        }

        let body = res.bytes().await?;
        // A JSON `null` is how the API reports an empty list.
        let items: Option<Vec<T>> = serde_json::from_slice(&body)?;
        Ok(items.unwrap_or_default())
    }
}

#[async_trait]
impl IdentitySource for HttpIdentitySource {
    async fn fetch_groups(&self) -> Result<Vec<Group>, OtuError> {
        let mut groups = Vec::new();
        for ldap_group in &self.ldap_groups {
            let url = self.endpoint(&["ldap-groups", ldap_group.as_str(), "groups"])?;
            groups.extend(self.get_list::<Group>(url).await?);
        }
        Ok(groups)
    }

    async fn fetch_members(&self, group_name: &str) -> Result<Vec<Member>, OtuError> {
        let url = self.endpoint(&["groups", group_name, "users"])?;
        self.get_list(url).await
    }
}
