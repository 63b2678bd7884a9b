//! CloudFormation resource schema types
//!
//! A small builder over the CloudFormation resource provider schema
//! (a JSON Schema draft-07 document with a few provider-specific keys).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// JSON type of a property
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    String,
    Boolean,
    Array,
    Object,
}

/// Schema property
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    #[serde(rename = "type")]
    pub prop_type: PropertyType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Property>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, Property>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insertion_order: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<bool>,
}

impl Property {
    fn of(prop_type: PropertyType) -> Self {
        Self {
            prop_type,
            description: None,
            items: None,
            properties: None,
            insertion_order: None,
            additional_properties: None,
        }
    }

    pub fn string() -> Self {
        Self::of(PropertyType::String)
    }

    pub fn boolean() -> Self {
        Self::of(PropertyType::Boolean)
    }

    pub fn array(items: Property) -> Self {
        Self {
            items: Some(Box::new(items)),
            insertion_order: Some(false),
            ..Self::of(PropertyType::Array)
        }
    }

    pub fn object() -> Self {
        Self {
            properties: Some(BTreeMap::new()),
            additional_properties: Some(false),
            ..Self::of(PropertyType::Object)
        }
    }

    pub fn with_property(mut self, name: &str, property: Property) -> Self {
        self.properties
            .get_or_insert_with(BTreeMap::new)
            .insert(name.to_string(), property);
        self
    }

    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }
}

/// Permissions block for one handler action
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HandlerPermissions {
    pub permissions: Vec<String>,
}

/// Resource provider schema
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSchema {
    pub type_name: String,
    pub description: String,
    pub properties: BTreeMap<String, Property>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub required: Vec<String>,
    pub primary_identifier: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub create_only_properties: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub write_only_properties: Vec<String>,
    pub handlers: BTreeMap<String, HandlerPermissions>,
    pub additional_properties: bool,
}

fn pointer(name: &str) -> String {
    format!("/properties/{}", name)
}

impl ResourceSchema {
    pub fn new(type_name: &str, description: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            description: description.to_string(),
            properties: BTreeMap::new(),
            required: Vec::new(),
            primary_identifier: Vec::new(),
            create_only_properties: Vec::new(),
            write_only_properties: Vec::new(),
            handlers: BTreeMap::new(),
            additional_properties: false,
        }
    }

    pub fn with_property(mut self, name: &str, property: Property) -> Self {
        self.properties.insert(name.to_string(), property);
        self
    }

    pub fn required(mut self, names: &[&str]) -> Self {
        self.required.extend(names.iter().map(|n| n.to_string()));
        self
    }

    /// Primary identifier, also create-only
    pub fn identified_by(mut self, names: &[&str]) -> Self {
        self.primary_identifier = names.iter().map(|n| pointer(n)).collect();
        self.create_only_properties
            .extend(names.iter().map(|n| pointer(n)));
        self
    }

    pub fn write_only(mut self, names: &[&str]) -> Self {
        self.write_only_properties
            .extend(names.iter().map(|n| pointer(n)));
        self
    }

    pub fn with_handlers(mut self, actions: &[&str]) -> Self {
        for action in actions {
            self.handlers
                .insert(action.to_lowercase(), HandlerPermissions::default());
        }
        self
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
