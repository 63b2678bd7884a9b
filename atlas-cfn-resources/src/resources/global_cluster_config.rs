//! `MongoDB::Atlas::GlobalClusterConfig`
//!
//! Manages the managed namespaces and custom zone mappings of a global
//! cluster. Update is a no-op: the resource has no in-place update path, so
//! changes to an existing stack are not applied.

use super::{lenient_bool, parse_model, HandlerContext, Resource, ResourceRequest};
use crate::client::{self, AtlasApi, CustomZoneMapping, GlobalCluster};
use crate::reconcile::{self, FailurePolicy};
use crate::schema::{Property, ResourceSchema};
use async_trait::async_trait;
use atlas_cfn_common::profile::Credentials;
use atlas_cfn_common::validator::validate_required;
use atlas_cfn_common::{HandlerErrorCode, ProgressEvent};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const TYPE_NAME: &str = "MongoDB::Atlas::GlobalClusterConfig";

pub const REQUIRED_FIELDS: &[&str] = &[
    "ApiKeys.PublicKey",
    "ApiKeys.PrivateKey",
    "ClusterName",
    "ProjectId",
];

pub const NOTHING_TO_REMOVE: &str = "request doest not contain any item to remove";

// ============================================================================
// Resource model
// ============================================================================

#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiKeys {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
}

impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeys")
            .field("public_key", &self.public_key)
            .field("private_key", &self.private_key.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Collections are tri-state: absent means no instruction, empty means an
/// instruction with nothing in it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Model {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_keys: Option<ApiKeys>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_namespaces: Option<Vec<ManagedNamespace>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_zone_mappings: Option<Vec<ZoneMapping>>,
    #[serde(
        default,
        deserialize_with = "lenient_bool",
        skip_serializing_if = "Option::is_none"
    )]
    pub remove_all_zone_mapping: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ManagedNamespace {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_shard_key: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_bool",
        skip_serializing_if = "Option::is_none"
    )]
    pub is_custom_shard_key_hashed: Option<bool>,
    #[serde(
        default,
        deserialize_with = "lenient_bool",
        skip_serializing_if = "Option::is_none"
    )]
    pub is_shard_key_unique: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ZoneMapping {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
}

// ============================================================================
// Translation
// ============================================================================

pub fn namespace_to_api(namespace: &ManagedNamespace) -> client::ManagedNamespace {
    client::ManagedNamespace {
        db: namespace.db.clone().unwrap_or_default(),
        collection: namespace.collection.clone().unwrap_or_default(),
        custom_shard_key: namespace.custom_shard_key.clone().unwrap_or_default(),
        is_custom_shard_key_hashed: namespace.is_custom_shard_key_hashed,
        is_shard_key_unique: namespace.is_shard_key_unique,
    }
}

pub fn namespaces_from_api(namespaces: &[client::ManagedNamespace]) -> Vec<ManagedNamespace> {
    namespaces
        .iter()
        .map(|ns| ManagedNamespace {
            db: Some(ns.db.clone()),
            collection: Some(ns.collection.clone()),
            custom_shard_key: Some(ns.custom_shard_key.clone()),
            is_custom_shard_key_hashed: ns.is_custom_shard_key_hashed,
            is_shard_key_unique: ns.is_shard_key_unique,
        })
        .collect()
}

/// Mappings missing a location or a zone are dropped
pub fn zone_mappings_to_api(mappings: &[ZoneMapping]) -> Vec<CustomZoneMapping> {
    mappings
        .iter()
        .filter_map(|m| match (&m.location, &m.zone) {
            (Some(location), Some(zone)) => Some(CustomZoneMapping {
                location: location.clone(),
                zone: zone.clone(),
            }),
            _ => None,
        })
        .collect()
}

/// Ordered by location; entries with an empty location are dropped
pub fn zone_mappings_from_api(mappings: &BTreeMap<String, String>) -> Vec<ZoneMapping> {
    mappings
        .iter()
        .filter(|(location, _)| !location.is_empty())
        .map(|(location, zone)| ZoneMapping {
            location: Some(location.clone()),
            zone: Some(zone.clone()),
        })
        .collect()
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

/// Rebuild a model from remote state, keeping identity and credential fields of the input
fn model_from_remote(cluster: &GlobalCluster, current: &Model) -> Model {
    Model {
        project_id: current.project_id.clone(),
        cluster_name: current.cluster_name.clone(),
        api_keys: current.api_keys.clone(),
        profile: current.profile.clone(),
        managed_namespaces: non_empty(namespaces_from_api(&cluster.managed_namespaces)),
        custom_zone_mappings: non_empty(zone_mappings_from_api(&cluster.custom_zone_mapping)),
        remove_all_zone_mapping: current.remove_all_zone_mapping,
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Validated identity of the cluster being configured
struct Target {
    credentials: Credentials,
    project_id: String,
    cluster_name: String,
}

impl Target {
    fn from_model(model: &Model) -> Result<Self, ProgressEvent> {
        validate_required(REQUIRED_FIELDS, model)?;

        let keys = model.api_keys.clone().unwrap_or_default();
        Ok(Self {
            credentials: Credentials::new(
                keys.public_key.as_deref().unwrap_or_default(),
                keys.private_key.as_deref().unwrap_or_default(),
            ),
            project_id: model.project_id.clone().unwrap_or_default(),
            cluster_name: model.cluster_name.clone().unwrap_or_default(),
        })
    }
}

fn not_found() -> ProgressEvent {
    ProgressEvent::failed("Resource Not Found", HandlerErrorCode::NotFound)
}

/// Current global-writes state; a 404 or an empty configuration means the resource does not exist
async fn fetch_state(api: &dyn AtlasApi, target: &Target) -> Result<GlobalCluster, ProgressEvent> {
    match api
        .get_global_cluster(&target.project_id, &target.cluster_name)
        .await
    {
        Ok(cluster) if cluster.is_empty() => Err(not_found()),
        Ok(cluster) => Ok(cluster),
        Err(e) if e.is_not_found() => Err(not_found()),
        Err(e) => {
            tracing::debug!(
                cluster = %target.cluster_name,
                "error reading global cluster configuration: {}",
                e
            );
            Err(ProgressEvent::failed_by_status(&e.to_string(), e.status()))
        }
    }
}

pub struct GlobalClusterConfigResource;

impl GlobalClusterConfigResource {
    pub fn new() -> Self {
        Self
    }

    /// Zone mappings are only sent when at least one complete mapping was requested.
    async fn try_create(
        &self,
        ctx: &HandlerContext,
        request: &ResourceRequest,
    ) -> Result<ProgressEvent, ProgressEvent> {
        let model: Model = parse_model(&request.desired)?;
        tracing::debug!("Create() currentModel: {:?}", model);

        let target = Target::from_model(&model)?;
        let api = ctx.client(&target.credentials)?;

        let namespaces: Vec<client::ManagedNamespace> = model
            .managed_namespaces
            .iter()
            .flatten()
            .map(namespace_to_api)
            .collect();
        let plan = reconcile::plan_additions(&namespaces);
        let report = reconcile::apply(
            api.as_ref(),
            &target.project_id,
            &target.cluster_name,
            &plan,
            FailurePolicy::Abort,
        )
        .await;

        if let Some((key, message)) = report.first_failure() {
            tracing::debug!("error creating global cluster configuration: {}", message);
            return Err(ProgressEvent::failed(
                &format!("Failed to add managed namespace {} : {}", key, message),
                HandlerErrorCode::InvalidRequest,
            ));
        }
        tracing::debug!("managed namespaces: {}", report.summary());

        if let Some(mappings) = &model.custom_zone_mappings {
            let mappings = zone_mappings_to_api(mappings);
            if !mappings.is_empty() {
                let cluster = api
                    .add_custom_zone_mappings(&target.project_id, &target.cluster_name, &mappings)
                    .await
                    .map_err(|e| {
                        ProgressEvent::failed(&e.to_string(), HandlerErrorCode::ServiceInternalError)
                    })?;
                tracing::debug!("Response Object: {:?}", cluster);
            }
        }

        Ok(ProgressEvent::success_with_model("Create Completed", &model))
    }

    async fn try_read(
        &self,
        ctx: &HandlerContext,
        request: &ResourceRequest,
    ) -> Result<ProgressEvent, ProgressEvent> {
        let model: Model = parse_model(&request.desired)?;
        tracing::debug!("Read() currentModel: {:?}", model);

        let target = Target::from_model(&model)?;
        let api = ctx.client(&target.credentials)?;

        let cluster = fetch_state(api.as_ref(), &target).await?;
        let read_model = model_from_remote(&cluster, &model);
        tracing::debug!("Response Value: {:?}", read_model);

        Ok(ProgressEvent::success_with_model("Read Complete", &read_model))
    }

    async fn try_delete(
        &self,
        ctx: &HandlerContext,
        request: &ResourceRequest,
    ) -> Result<ProgressEvent, ProgressEvent> {
        let model: Model = parse_model(&request.desired)?;
        tracing::debug!("Delete() currentModel: {:?}", model);

        let target = Target::from_model(&model)?;
        let api = ctx.client(&target.credentials)?;

        fetch_state(api.as_ref(), &target).await?;

        let requested: Vec<client::ManagedNamespace> = model
            .managed_namespaces
            .iter()
            .flatten()
            .map(namespace_to_api)
            .collect();
        let remove_all_zones = model.remove_all_zone_mapping.unwrap_or(false);

        if requested.is_empty() && !remove_all_zones {
            return Err(ProgressEvent::failed(
                NOTHING_TO_REMOVE,
                HandlerErrorCode::InvalidRequest,
            ));
        }

        let plan = reconcile::plan_removals(&requested);
        let report = reconcile::apply(
            api.as_ref(),
            &target.project_id,
            &target.cluster_name,
            &plan,
            FailurePolicy::Continue,
        )
        .await;
        if !plan.is_empty() {
            tracing::debug!("managed namespaces: {}", report.summary());
        }

        if remove_all_zones {
            api.delete_custom_zone_mappings(&target.project_id, &target.cluster_name)
                .await
                .map_err(|e| {
                    ProgressEvent::failed(
                        &format!("Failed to custom zones : {}", e),
                        HandlerErrorCode::InvalidRequest,
                    )
                })?;
        }

        if !report.is_clean() {
            if report.first_failure().is_some() {
                tracing::warn!("unable to remove some namespaces: {}", report.summary());
            }
            return Ok(ProgressEvent::success(&format!(
                "Delete Complete ({})",
                report.summary()
            )));
        }

        Ok(ProgressEvent::success("Delete Complete"))
    }
}

impl Default for GlobalClusterConfigResource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Resource for GlobalClusterConfigResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    fn schema(&self) -> ResourceSchema {
        let namespace = Property::object()
            .with_property("Db", Property::string().with_description("Database name"))
            .with_property("Collection", Property::string().with_description("Collection name"))
            .with_property(
                "CustomShardKey",
                Property::string().with_description("Custom shard key for the collection"),
            )
            .with_property(
                "IsCustomShardKeyHashed",
                Property::boolean().with_description("Whether the custom shard key is hashed"),
            )
            .with_property(
                "IsShardKeyUnique",
                Property::boolean().with_description("Whether the shard key is unique"),
            );

        let zone_mapping = Property::object()
            .with_property(
                "Location",
                Property::string().with_description("ISO 3166-1a2 location code"),
            )
            .with_property("Zone", Property::string().with_description("Zone name"));

        let api_keys = Property::object()
            .with_property("PublicKey", Property::string())
            .with_property("PrivateKey", Property::string());

        ResourceSchema::new(
            TYPE_NAME,
            "Managed namespaces and custom zone mappings of an Atlas global cluster",
        )
        .with_property("ProjectId", Property::string().with_description("Atlas project ID"))
        .with_property("ClusterName", Property::string().with_description("Global cluster name"))
        .with_property("ApiKeys", api_keys)
        .with_property(
            "Profile",
            Property::string().with_description("Profile holding the API keys"),
        )
        .with_property(
            "ManagedNamespaces",
            Property::array(namespace).with_description("Namespaces to shard globally"),
        )
        .with_property(
            "CustomZoneMappings",
            Property::array(zone_mapping).with_description("Location to zone mappings"),
        )
        .with_property(
            "RemoveAllZoneMapping",
            Property::boolean().with_description("Remove all custom zone mappings on delete"),
        )
        .required(&["ProjectId", "ClusterName"])
        .identified_by(&["ProjectId", "ClusterName"])
        .write_only(&["ApiKeys"])
        .with_handlers(&["Create", "Read", "Update", "Delete", "List"])
    }

    async fn create(&self, ctx: &HandlerContext, request: &ResourceRequest) -> ProgressEvent {
        match self.try_create(ctx, request).await {
            Ok(event) | Err(event) => event,
        }
    }

    async fn read(&self, ctx: &HandlerContext, request: &ResourceRequest) -> ProgressEvent {
        match self.try_read(ctx, request).await {
            Ok(event) | Err(event) => event,
        }
    }

    async fn update(&self, _ctx: &HandlerContext, request: &ResourceRequest) -> ProgressEvent {
        // No in-place update: echo the desired model back
        ProgressEvent {
            resource_model: Some(request.desired.clone()),
            ..ProgressEvent::success("Update Complete")
        }
    }

    async fn delete(&self, ctx: &HandlerContext, request: &ResourceRequest) -> ProgressEvent {
        match self.try_delete(ctx, request).await {
            Ok(event) | Err(event) => event,
        }
    }

    async fn list(&self, _ctx: &HandlerContext, _request: &ResourceRequest) -> ProgressEvent {
        ProgressEvent::success("List Complete")
    }
}
