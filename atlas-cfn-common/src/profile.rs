//! Named credential profiles

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub const DEFAULT_PROFILE: &str = "default";

/// API key pair used for HTTP Digest authentication
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub public_key: String,
    pub private_key: String,
    /// Overrides the configured API base URL for this profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Credentials {
    pub fn new(public_key: &str, private_key: &str) -> Self {
        Self {
            public_key: public_key.to_string(),
            private_key: private_key.to_string(),
            base_url: None,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("public_key", &self.public_key)
            .field("private_key", &"***")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Resolve an optional profile name, falling back to the default profile
pub fn resolve_profile_name(name: Option<&str>) -> &str {
    match name {
        Some(n) if !n.trim().is_empty() => n,
        _ => DEFAULT_PROFILE,
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileStore {
    #[serde(default)]
    profiles: HashMap<String, Credentials>,
}

impl ProfileStore {
    /// Load profiles from a TOML file; a missing file yields an empty store.
    /// The default profile can also be supplied through the environment.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut store = if path.exists() {
            let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            Self::default()
        };

        if !store.profiles.contains_key(DEFAULT_PROFILE) {
            if let (Ok(public_key), Ok(private_key)) = (
                std::env::var("MONGODB_ATLAS_PUBLIC_KEY"),
                std::env::var("MONGODB_ATLAS_PRIVATE_KEY"),
            ) {
                store.insert(DEFAULT_PROFILE, Credentials::new(&public_key, &private_key));
            }
        }

        Ok(store)
    }

    pub fn insert(&mut self, name: &str, credentials: Credentials) {
        self.profiles.insert(name.to_string(), credentials);
    }

    pub fn get(&self, name: &str) -> Option<&Credentials> {
        self.profiles.get(name)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_profile_name() {
        assert_eq!(resolve_profile_name(None), "default");
        assert_eq!(resolve_profile_name(Some("")), "default");
        assert_eq!(resolve_profile_name(Some("  ")), "default");
        assert_eq!(resolve_profile_name(Some("prod")), "prod");
    }

    #[test]
    fn test_load_profiles_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.toml");
        std::fs::write(
            &path,
            r#"
[profiles.prod]
public_key = "pub"
private_key = "secret"
base_url = "https://cloud-dev.mongodb.com"
"#,
        )
        .unwrap();

        let store = ProfileStore::load(&path).unwrap();
        let prod = store.get("prod").unwrap();
        assert_eq!(prod.public_key, "pub");
        assert_eq!(prod.base_url.as_deref(), Some("https://cloud-dev.mongodb.com"));
        assert!(store.get("staging").is_none());
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let creds = Credentials::new("pub", "very-secret");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("pub"));
        assert!(!debug.contains("very-secret"));
    }
}
