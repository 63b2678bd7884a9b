//! Managed namespace reconciliation
//!
//! Atlas only exposes add-one and remove-one calls for managed namespaces, so
//! changes are planned as a list of steps first and then applied one remote
//! call at a time. Every step yields an outcome so callers can report partial
//! failures precisely.

use crate::client::{AtlasApi, ManagedNamespace, DUPLICATE_MANAGED_NAMESPACE};
use std::collections::HashSet;
use std::fmt;

/// Reason recorded when the cluster answers a removal with 404
pub const NOT_PRESENT: &str = "not present on cluster";

/// Identity of a managed namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamespaceKey {
    pub db: String,
    pub collection: String,
}

impl NamespaceKey {
    pub fn of(namespace: &ManagedNamespace) -> Self {
        Self {
            db: namespace.db.clone(),
            collection: namespace.collection.clone(),
        }
    }
}

impl fmt::Display for NamespaceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.db, self.collection)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Add(ManagedNamespace),
    Remove(ManagedNamespace),
}

impl Step {
    pub fn key(&self) -> NamespaceKey {
        match self {
            Self::Add(ns) | Self::Remove(ns) => NamespaceKey::of(ns),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub steps: Vec<Step>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// One add per distinct desired namespace, in request order
pub fn plan_additions(desired: &[ManagedNamespace]) -> Plan {
    let mut seen = HashSet::new();
    let steps = desired
        .iter()
        .filter(|ns| seen.insert(NamespaceKey::of(ns)))
        .cloned()
        .map(Step::Add)
        .collect();
    Plan { steps }
}

/// One remove per distinct requested namespace, in request order.
///
/// Removals are not filtered against a prior read: global writes state is
/// eventually consistent, so a namespace added moments ago may not be listed yet.
pub fn plan_removals(requested: &[ManagedNamespace]) -> Plan {
    let mut seen = HashSet::new();
    let steps = requested
        .iter()
        .filter(|ns| seen.insert(NamespaceKey::of(ns)))
        .cloned()
        .map(Step::Remove)
        .collect();
    Plan { steps }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Added,
    AlreadyPresent,
    Removed,
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemResult {
    pub key: NamespaceKey,
    pub outcome: Outcome,
}

/// What to do after a step fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    Abort,
    Continue,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub items: Vec<ItemResult>,
}

impl ApplyReport {
    pub fn failures(&self) -> impl Iterator<Item = (&NamespaceKey, &str)> {
        self.items.iter().filter_map(|item| match &item.outcome {
            Outcome::Failed(message) => Some((&item.key, message.as_str())),
            _ => None,
        })
    }

    pub fn first_failure(&self) -> Option<(&NamespaceKey, &str)> {
        self.failures().next()
    }

    /// True when every item reached the wanted state through its own call
    pub fn is_clean(&self) -> bool {
        self.items
            .iter()
            .all(|item| matches!(item.outcome, Outcome::Added | Outcome::Removed))
    }

    pub fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.items.iter().filter(|item| pred(&item.outcome)).count()
    }

    /// Short human summary, e.g. `2 removed, 1 skipped, 1 failed (db.coll)`
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        let added = self.count(|o| matches!(o, Outcome::Added));
        let present = self.count(|o| matches!(o, Outcome::AlreadyPresent));
        let removed = self.count(|o| matches!(o, Outcome::Removed));
        let skipped = self.count(|o| matches!(o, Outcome::Skipped(_)));
        let failed: Vec<String> = self.failures().map(|(k, _)| k.to_string()).collect();

        if added > 0 {
            parts.push(format!("{} added", added));
        }
        if present > 0 {
            parts.push(format!("{} already present", present));
        }
        if removed > 0 {
            parts.push(format!("{} removed", removed));
        }
        if skipped > 0 {
            parts.push(format!("{} skipped", skipped));
        }
        if !failed.is_empty() {
            parts.push(format!("{} failed ({})", failed.len(), failed.join(", ")));
        }

        if parts.is_empty() {
            "nothing to do".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Apply a plan serially against the remote cluster
pub async fn apply(
    api: &dyn AtlasApi,
    project_id: &str,
    cluster_name: &str,
    plan: &Plan,
    policy: FailurePolicy,
) -> ApplyReport {
    let mut report = ApplyReport::default();

    for step in &plan.steps {
        let key = step.key();
        let outcome = match step {
            Step::Add(ns) => match api.add_managed_namespace(project_id, cluster_name, ns).await {
                Ok(_) => Outcome::Added,
                Err(e) if e.error_code() == Some(DUPLICATE_MANAGED_NAMESPACE) => {
                    tracing::debug!(namespace = %key, "managed namespace already present");
                    Outcome::AlreadyPresent
                }
                Err(e) => {
                    tracing::warn!(namespace = %key, "error while adding namespace: {}", e);
                    Outcome::Failed(e.to_string())
                }
            },
            Step::Remove(ns) => {
                match api.delete_managed_namespace(project_id, cluster_name, ns).await {
                    Ok(()) => Outcome::Removed,
                    Err(e) if e.is_not_found() => {
                        tracing::debug!(namespace = %key, "managed namespace not present");
                        Outcome::Skipped(NOT_PRESENT.to_string())
                    }
                    Err(e) => {
                        tracing::warn!(namespace = %key, "error while removing namespace: {}", e);
                        Outcome::Failed(e.to_string())
                    }
                }
            }
        };

        let failed = matches!(outcome, Outcome::Failed(_));
        report.items.push(ItemResult { key, outcome });
        if failed && policy == FailurePolicy::Abort {
            break;
        }
    }

    report
}
