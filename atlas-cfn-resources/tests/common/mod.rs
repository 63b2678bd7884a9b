//! Shared fixtures: an in-memory Atlas that records every remote call

#![allow(dead_code)]

use async_trait::async_trait;
use atlas_cfn_common::config::Settings;
use atlas_cfn_common::profile::{Credentials, ProfileStore};
use atlas_cfn_resources::client::{
    AtlasApi, ClientError, Connector, CustomZoneMapping, GlobalCluster, ManagedNamespace, Result,
};
use atlas_cfn_resources::resources::{HandlerContext, ResourceRequest};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    GetGlobalCluster { project_id: String, cluster_name: String },
    AddManagedNamespace { db: String, collection: String },
    DeleteManagedNamespace { db: String, collection: String },
    AddCustomZoneMappings(Vec<CustomZoneMapping>),
    DeleteCustomZoneMappings,
    DeleteProjectInvitation { project_id: String, invitation_id: String },
}

/// Canned failure: HTTP status plus optional Atlas error code
#[derive(Debug, Clone)]
pub struct Failure {
    pub status: u16,
    pub error_code: Option<String>,
}

impl Failure {
    pub fn new(status: u16, error_code: Option<&str>) -> Self {
        Self {
            status,
            error_code: error_code.map(String::from),
        }
    }

    fn to_error(&self) -> ClientError {
        ClientError::Api {
            status: self.status,
            error_code: self.error_code.clone(),
            message: format!("simulated failure {}", self.status),
        }
    }
}

#[derive(Default)]
struct State {
    /// `None` makes the cluster lookup answer 404
    cluster: Option<GlobalCluster>,
    calls: Vec<Call>,
    get_failure: Option<Failure>,
    add_failures: HashMap<(String, String), Failure>,
    remove_failures: HashMap<(String, String), Failure>,
    zone_failure: Option<Failure>,
    invitation_failure: Option<Failure>,
}

#[derive(Default)]
pub struct FakeAtlas {
    state: Mutex<State>,
}

impl FakeAtlas {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_cluster(cluster: GlobalCluster) -> Arc<Self> {
        let fake = Self::default();
        fake.state.lock().unwrap().cluster = Some(cluster);
        Arc::new(fake)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn cluster(&self) -> Option<GlobalCluster> {
        self.state.lock().unwrap().cluster.clone()
    }

    pub fn fail_get(&self, failure: Failure) {
        self.state.lock().unwrap().get_failure = Some(failure);
    }

    pub fn fail_add(&self, db: &str, collection: &str, failure: Failure) {
        self.state
            .lock()
            .unwrap()
            .add_failures
            .insert((db.to_string(), collection.to_string()), failure);
    }

    pub fn fail_remove(&self, db: &str, collection: &str, failure: Failure) {
        self.state
            .lock()
            .unwrap()
            .remove_failures
            .insert((db.to_string(), collection.to_string()), failure);
    }

    pub fn fail_zones(&self, failure: Failure) {
        self.state.lock().unwrap().zone_failure = Some(failure);
    }

    pub fn fail_invitation(&self, failure: Failure) {
        self.state.lock().unwrap().invitation_failure = Some(failure);
    }
}

fn key(ns: &ManagedNamespace) -> (String, String) {
    (ns.db.clone(), ns.collection.clone())
}

#[async_trait]
impl AtlasApi for FakeAtlas {
    async fn get_global_cluster(&self, project_id: &str, cluster_name: &str) -> Result<GlobalCluster> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::GetGlobalCluster {
            project_id: project_id.to_string(),
            cluster_name: cluster_name.to_string(),
        });
        if let Some(failure) = &state.get_failure {
            return Err(failure.to_error());
        }
        state
            .cluster
            .clone()
            .ok_or_else(|| Failure::new(404, Some("CLUSTER_NOT_FOUND")).to_error())
    }

    async fn add_managed_namespace(
        &self,
        _project_id: &str,
        _cluster_name: &str,
        namespace: &ManagedNamespace,
    ) -> Result<GlobalCluster> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::AddManagedNamespace {
            db: namespace.db.clone(),
            collection: namespace.collection.clone(),
        });
        if let Some(failure) = state.add_failures.get(&key(namespace)) {
            return Err(failure.to_error());
        }
        let cluster = state.cluster.get_or_insert_with(GlobalCluster::default);
        cluster.managed_namespaces.push(namespace.clone());
        Ok(cluster.clone())
    }

    async fn delete_managed_namespace(
        &self,
        _project_id: &str,
        _cluster_name: &str,
        namespace: &ManagedNamespace,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::DeleteManagedNamespace {
            db: namespace.db.clone(),
            collection: namespace.collection.clone(),
        });
        if let Some(failure) = state.remove_failures.get(&key(namespace)) {
            return Err(failure.to_error());
        }
        if let Some(cluster) = state.cluster.as_mut() {
            cluster.managed_namespaces.retain(|ns| key(ns) != key(namespace));
        }
        Ok(())
    }

    async fn add_custom_zone_mappings(
        &self,
        _project_id: &str,
        _cluster_name: &str,
        mappings: &[CustomZoneMapping],
    ) -> Result<GlobalCluster> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::AddCustomZoneMappings(mappings.to_vec()));
        if let Some(failure) = &state.zone_failure {
            return Err(failure.to_error());
        }
        let cluster = state.cluster.get_or_insert_with(GlobalCluster::default);
        cluster.custom_zone_mapping = mappings
            .iter()
            .map(|m| (m.location.clone(), m.zone.clone()))
            .collect::<BTreeMap<_, _>>();
        Ok(cluster.clone())
    }

    async fn delete_custom_zone_mappings(&self, _project_id: &str, _cluster_name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::DeleteCustomZoneMappings);
        if let Some(failure) = &state.zone_failure {
            return Err(failure.to_error());
        }
        if let Some(cluster) = state.cluster.as_mut() {
            cluster.custom_zone_mapping.clear();
        }
        Ok(())
    }

    async fn delete_project_invitation(&self, project_id: &str, invitation_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::DeleteProjectInvitation {
            project_id: project_id.to_string(),
            invitation_id: invitation_id.to_string(),
        });
        match &state.invitation_failure {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }
}

/// Hands out the shared fake and remembers which credentials were used
pub struct FakeConnector {
    api: Arc<FakeAtlas>,
    fail: bool,
    pub connected_with: Mutex<Vec<Credentials>>,
}

impl FakeConnector {
    pub fn new(api: Arc<FakeAtlas>) -> Arc<Self> {
        Arc::new(Self {
            api,
            fail: false,
            connected_with: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(api: Arc<FakeAtlas>) -> Arc<Self> {
        Arc::new(Self {
            api,
            fail: true,
            connected_with: Mutex::new(Vec::new()),
        })
    }
}

impl Connector for FakeConnector {
    fn connect(&self, credentials: &Credentials) -> Result<Arc<dyn AtlasApi>> {
        self.connected_with.lock().unwrap().push(credentials.clone());
        if self.fail {
            return Err(ClientError::InvalidConfig("simulated connect failure".to_string()));
        }
        let api: Arc<dyn AtlasApi> = self.api.clone();
        Ok(api)
    }
}

pub fn context(connector: Arc<FakeConnector>) -> HandlerContext {
    let mut profiles = ProfileStore::default();
    profiles.insert("default", Credentials::new("default-pub", "default-priv"));
    profiles.insert("prod", Credentials::new("prod-pub", "prod-priv"));
    HandlerContext::new(Settings::default(), profiles, connector)
}

pub fn request(desired: serde_json::Value) -> ResourceRequest {
    ResourceRequest {
        desired,
        previous: None,
    }
}

pub fn namespace(db: &str, collection: &str) -> ManagedNamespace {
    ManagedNamespace {
        db: db.to_string(),
        collection: collection.to_string(),
        custom_shard_key: "location".to_string(),
        is_custom_shard_key_hashed: Some(false),
        is_shard_key_unique: Some(false),
    }
}
