//! CloudFormation resources backed by the Atlas API

pub mod global_cluster_config;
pub mod project_invitation;

use crate::client::{AtlasApi, Connector};
use crate::schema::ResourceSchema;
use async_trait::async_trait;
use atlas_cfn_common::config::Settings;
use atlas_cfn_common::profile::{Credentials, ProfileStore};
use atlas_cfn_common::{Action, HandlerErrorCode, ProgressEvent};
use serde::de::{self, DeserializeOwned, Unexpected};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::sync::Arc;

pub use global_cluster_config::GlobalClusterConfigResource;
pub use project_invitation::ProjectInvitationResource;

/// Everything a handler needs besides the request itself.
///
/// Built once by the binary and passed into every invocation.
pub struct HandlerContext {
    pub settings: Settings,
    pub profiles: ProfileStore,
    connector: Arc<dyn Connector>,
}

impl HandlerContext {
    pub fn new(settings: Settings, profiles: ProfileStore, connector: Arc<dyn Connector>) -> Self {
        Self {
            settings,
            profiles,
            connector,
        }
    }

    /// Authenticated client for an explicit key pair
    pub fn client(&self, credentials: &Credentials) -> Result<Arc<dyn AtlasApi>, ProgressEvent> {
        self.connector.connect(credentials).map_err(|e| {
            tracing::warn!("error creating Atlas client: {}", e);
            ProgressEvent::failed(
                &format!("Failed to Create Client : {}", e),
                HandlerErrorCode::InvalidRequest,
            )
        })
    }

    /// Authenticated client for a named profile
    pub fn client_for_profile(&self, name: &str) -> Result<Arc<dyn AtlasApi>, ProgressEvent> {
        match self.profiles.get(name) {
            Some(credentials) => self.client(credentials),
            None => {
                tracing::warn!(profile = name, "profile not found");
                Err(ProgressEvent::failed(
                    &format!("Failed to Create Client : profile {} not found", name),
                    HandlerErrorCode::InvalidRequest,
                ))
            }
        }
    }
}

/// Resource states carried by one invocation
#[derive(Debug, Clone, Default)]
pub struct ResourceRequest {
    pub desired: Value,
    pub previous: Option<Value>,
}

/// Decode a resource model from host JSON
pub fn parse_model<M: DeserializeOwned>(value: &Value) -> Result<M, ProgressEvent> {
    let value = if value.is_null() {
        Value::Object(Default::default())
    } else {
        value.clone()
    };
    serde_json::from_value(value).map_err(|e| {
        ProgressEvent::failed(
            &format!("Invalid resource model: {}", e),
            HandlerErrorCode::InvalidRequest,
        )
    })
}

/// Optional boolean that also accepts `"true"` / `"false"` strings, the way
/// CloudFormation hosts forward scalar template properties
pub fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        String(String),
    }

    match Option::<BoolOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(BoolOrString::Bool(value)) => Ok(Some(value)),
        Some(BoolOrString::String(value)) => match value.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(Some(true)),
            "false" => Ok(Some(false)),
            _ => Err(de::Error::invalid_value(Unexpected::Str(&value), &"a boolean")),
        },
    }
}

fn unsupported(type_name: &str, action: Action) -> ProgressEvent {
    ProgressEvent::failed(
        &format!("{} does not support {}", type_name, action),
        HandlerErrorCode::InvalidRequest,
    )
}

/// Resource trait
///
/// Every entry point returns a progress event; actions a resource does not
/// implement are rejected as invalid requests.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Resource type name, e.g. `MongoDB::Atlas::GlobalClusterConfig`
    fn type_name(&self) -> &str;

    /// Get the schema for this resource
    fn schema(&self) -> ResourceSchema;

    async fn create(&self, _ctx: &HandlerContext, _request: &ResourceRequest) -> ProgressEvent {
        unsupported(self.type_name(), Action::Create)
    }

    async fn read(&self, _ctx: &HandlerContext, _request: &ResourceRequest) -> ProgressEvent {
        unsupported(self.type_name(), Action::Read)
    }

    async fn update(&self, _ctx: &HandlerContext, _request: &ResourceRequest) -> ProgressEvent {
        unsupported(self.type_name(), Action::Update)
    }

    async fn delete(&self, _ctx: &HandlerContext, _request: &ResourceRequest) -> ProgressEvent {
        unsupported(self.type_name(), Action::Delete)
    }

    async fn list(&self, _ctx: &HandlerContext, _request: &ResourceRequest) -> ProgressEvent {
        unsupported(self.type_name(), Action::List)
    }
}

/// Get all available resources
pub fn get_all_resources() -> Vec<Box<dyn Resource>> {
    vec![
        Box::new(GlobalClusterConfigResource::new()),
        Box::new(ProjectInvitationResource::new()),
    ]
}
