//! MongoDB Atlas API client

use crate::digest::{self, Challenge};
use async_trait::async_trait;
use atlas_cfn_common::config::Settings;
use atlas_cfn_common::profile::Credentials;
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT, WWW_AUTHENTICATE};
use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const V1_ACCEPT: &str = "application/json";
const V2_ACCEPT: &str = "application/vnd.atlas.2023-11-15+json";

/// Error code Atlas returns when a managed namespace already exists
pub const DUPLICATE_MANAGED_NAMESPACE: &str = "DUPLICATE_MANAGED_NAMESPACE";

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} ({}) - {message}", .error_code.as_deref().unwrap_or("UNKNOWN"))]
    Api {
        status: u16,
        error_code: Option<String>,
        message: String,
    },
    #[error("Digest authentication failed: {0}")]
    Digest(String),
    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// HTTP status of the remote response, if there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Atlas error code (e.g. `DUPLICATE_MANAGED_NAMESPACE`)
    pub fn error_code(&self) -> Option<&str> {
        match self {
            Self::Api { error_code, .. } => error_code.as_deref(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

// ============================================================================
// API Data Types
// ============================================================================

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Global writes state of a cluster
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalCluster {
    /// Location code to zone name
    #[serde(default, deserialize_with = "null_as_default")]
    pub custom_zone_mapping: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub managed_namespaces: Vec<ManagedNamespace>,
}

impl GlobalCluster {
    pub fn is_empty(&self) -> bool {
        self.custom_zone_mapping.is_empty() && self.managed_namespaces.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedNamespace {
    #[serde(default)]
    pub db: String,
    #[serde(default)]
    pub collection: String,
    #[serde(default)]
    pub custom_shard_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_custom_shard_key_hashed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_shard_key_unique: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomZoneMapping {
    pub location: String,
    pub zone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomZoneMappingsRequest {
    pub custom_zone_mappings: Vec<CustomZoneMapping>,
}

/// Error body returned by the Atlas API
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiErrorBody {
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

// ============================================================================
// Remote capability
// ============================================================================

/// Remote calls the resource handlers depend on
#[async_trait]
pub trait AtlasApi: Send + Sync {
    async fn get_global_cluster(&self, project_id: &str, cluster_name: &str)
        -> Result<GlobalCluster>;

    async fn add_managed_namespace(
        &self,
        project_id: &str,
        cluster_name: &str,
        namespace: &ManagedNamespace,
    ) -> Result<GlobalCluster>;

    async fn delete_managed_namespace(
        &self,
        project_id: &str,
        cluster_name: &str,
        namespace: &ManagedNamespace,
    ) -> Result<()>;

    async fn add_custom_zone_mappings(
        &self,
        project_id: &str,
        cluster_name: &str,
        mappings: &[CustomZoneMapping],
    ) -> Result<GlobalCluster>;

    async fn delete_custom_zone_mappings(&self, project_id: &str, cluster_name: &str)
        -> Result<()>;

    async fn delete_project_invitation(&self, project_id: &str, invitation_id: &str)
        -> Result<()>;
}

/// Builds an authenticated [`AtlasApi`] for one invocation
pub trait Connector: Send + Sync {
    fn connect(&self, credentials: &Credentials) -> Result<Arc<dyn AtlasApi>>;
}

/// Connector producing real HTTP clients from handler settings
pub struct AtlasConnector {
    settings: Settings,
}

impl AtlasConnector {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }
}

impl Connector for AtlasConnector {
    fn connect(&self, credentials: &Credentials) -> Result<Arc<dyn AtlasApi>> {
        let base_url = credentials
            .base_url
            .as_deref()
            .unwrap_or(&self.settings.base_url);
        let client = AtlasClient::new(
            base_url,
            credentials,
            Duration::from_secs(self.settings.request_timeout_secs),
            &self.settings.user_agent,
        )?;
        Ok(Arc::new(client))
    }
}

// ============================================================================
// HTTP client
// ============================================================================

/// Atlas Admin API client using HTTP Digest authentication
#[derive(Clone)]
pub struct AtlasClient {
    client: reqwest::Client,
    base_url: String,
    public_key: String,
    private_key: String,
    user_agent: String,
}

impl AtlasClient {
    /// Create a new client
    pub fn new(
        base_url: &str,
        credentials: &Credentials,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self> {
        if credentials.public_key.is_empty() || credentials.private_key.is_empty() {
            return Err(ClientError::InvalidConfig(
                "public and private API keys must not be empty".to_string(),
            ));
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::InvalidConfig(format!(
                "invalid base URL: {}",
                base_url
            )));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            public_key: credentials.public_key.clone(),
            private_key: credentials.private_key.clone(),
            user_agent: user_agent.to_string(),
        })
    }

    /// Send a request, answering a single digest challenge if the server issues one
    async fn send(
        &self,
        method: Method,
        uri: &str,
        accept: &str,
        body: Option<Vec<u8>>,
    ) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, uri);
        let build = |authorization: Option<String>| {
            let mut request = self
                .client
                .request(method.clone(), &url)
                .header(ACCEPT, accept)
                .header(USER_AGENT, &self.user_agent);
            if let Some(bytes) = &body {
                request = request
                    .header(CONTENT_TYPE, accept)
                    .body(bytes.clone());
            }
            if let Some(value) = authorization {
                request = request.header(reqwest::header::AUTHORIZATION, value);
            }
            request
        };

        let response = build(None).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let challenge = response
            .headers()
            .get_all(WWW_AUTHENTICATE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(Challenge::parse)
            .ok_or_else(|| ClientError::Digest("no usable digest challenge".to_string()))?;

        let authorization = challenge.authorize(
            &self.public_key,
            &self.private_key,
            method.as_str(),
            uri,
            &digest::cnonce(),
        );
        Ok(build(Some(authorization)).send().await?)
    }

    async fn get<T: DeserializeOwned>(&self, uri: &str, accept: &str) -> Result<T> {
        let response = self.send(Method::GET, uri, accept, None).await?;
        self.handle_response(response).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        uri: &str,
        accept: &str,
        body: &B,
    ) -> Result<T> {
        let bytes = serde_json::to_vec(body)?;
        let response = self.send(Method::POST, uri, accept, Some(bytes)).await?;
        self.handle_response(response).await
    }

    async fn delete(&self, uri: &str, accept: &str) -> Result<()> {
        let response = self.send(Method::DELETE, uri, accept, None).await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::api_error(response).await)
        }
    }

    /// Handle API response
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        if response.status().is_success() {
            let body = response.text().await?;
            Ok(serde_json::from_str(&body)?)
        } else {
            Err(Self::api_error(response).await)
        }
    }

    async fn api_error(response: reqwest::Response) -> ClientError {
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ApiErrorBody>(&text) {
            Ok(body) => ClientError::Api {
                status,
                error_code: body.error_code,
                message: body.detail.or(body.reason).unwrap_or(text),
            },
            Err(_) => ClientError::Api {
                status,
                error_code: None,
                message: text,
            },
        }
    }
}

fn global_writes_path(project_id: &str, cluster_name: &str) -> String {
    format!(
        "/api/atlas/v1.0/groups/{}/clusters/{}/globalWrites",
        urlencoding::encode(project_id),
        urlencoding::encode(cluster_name)
    )
}

// ============================================================================
// API Methods
// ============================================================================

#[async_trait]
impl AtlasApi for AtlasClient {
    async fn get_global_cluster(
        &self,
        project_id: &str,
        cluster_name: &str,
    ) -> Result<GlobalCluster> {
        self.get(&global_writes_path(project_id, cluster_name), V1_ACCEPT)
            .await
    }

    async fn add_managed_namespace(
        &self,
        project_id: &str,
        cluster_name: &str,
        namespace: &ManagedNamespace,
    ) -> Result<GlobalCluster> {
        let uri = format!(
            "{}/managedNamespaces",
            global_writes_path(project_id, cluster_name)
        );
        self.post(&uri, V1_ACCEPT, namespace).await
    }

    async fn delete_managed_namespace(
        &self,
        project_id: &str,
        cluster_name: &str,
        namespace: &ManagedNamespace,
    ) -> Result<()> {
        let uri = format!(
            "{}/managedNamespaces?db={}&collection={}",
            global_writes_path(project_id, cluster_name),
            urlencoding::encode(&namespace.db),
            urlencoding::encode(&namespace.collection)
        );
        self.delete(&uri, V1_ACCEPT).await
    }

    async fn add_custom_zone_mappings(
        &self,
        project_id: &str,
        cluster_name: &str,
        mappings: &[CustomZoneMapping],
    ) -> Result<GlobalCluster> {
        let uri = format!(
            "{}/customZoneMapping",
            global_writes_path(project_id, cluster_name)
        );
        let request = CustomZoneMappingsRequest {
            custom_zone_mappings: mappings.to_vec(),
        };
        self.post(&uri, V1_ACCEPT, &request).await
    }

    async fn delete_custom_zone_mappings(
        &self,
        project_id: &str,
        cluster_name: &str,
    ) -> Result<()> {
        let uri = format!(
            "{}/customZoneMapping",
            global_writes_path(project_id, cluster_name)
        );
        self.delete(&uri, V1_ACCEPT).await
    }

    async fn delete_project_invitation(
        &self,
        project_id: &str,
        invitation_id: &str,
    ) -> Result<()> {
        let uri = format!(
            "/api/atlas/v2/groups/{}/invitations/{}",
            urlencoding::encode(project_id),
            urlencoding::encode(invitation_id)
        );
        self.delete(&uri, V2_ACCEPT).await
    }
}
