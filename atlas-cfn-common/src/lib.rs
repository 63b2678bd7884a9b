//! Common types and utilities shared by the Atlas CloudFormation resource handlers

pub mod config;
pub mod logging;
pub mod profile;
pub mod validator;

use serde::{Deserialize, Serialize};

/// Lifecycle action requested by the CloudFormation host
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    List,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "CREATE"),
            Self::Read => write!(f, "READ"),
            Self::Update => write!(f, "UPDATE"),
            Self::Delete => write!(f, "DELETE"),
            Self::List => write!(f, "LIST"),
        }
    }
}

/// A single handler invocation as sent by the host
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerRequest {
    pub action: Action,
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_request_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_resource_identifier: Option<String>,
    #[serde(default)]
    pub desired_resource_state: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_resource_state: Option<serde_json::Value>,
}

/// Operation status reported back to the host
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    Success,
    Failed,
    InProgress,
}

/// CloudFormation handler error codes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum HandlerErrorCode {
    InvalidRequest,
    NotFound,
    ServiceInternalError,
    AlreadyExists,
    AccessDenied,
    InvalidCredentials,
    Throttling,
    NotUpdatable,
    GeneralServiceException,
    InternalFailure,
}

impl HandlerErrorCode {
    /// Classify a remote HTTP status. `None` means the request never got a response.
    pub fn from_http_status(status: Option<u16>) -> Self {
        match status {
            Some(400) => Self::InvalidRequest,
            Some(401) => Self::InvalidCredentials,
            Some(403) => Self::AccessDenied,
            Some(404) => Self::NotFound,
            Some(409) => Self::AlreadyExists,
            Some(429) => Self::Throttling,
            _ => Self::ServiceInternalError,
        }
    }
}

impl std::fmt::Display for HandlerErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::InvalidRequest => "InvalidRequest",
            Self::NotFound => "NotFound",
            Self::ServiceInternalError => "ServiceInternalError",
            Self::AlreadyExists => "AlreadyExists",
            Self::AccessDenied => "AccessDenied",
            Self::InvalidCredentials => "InvalidCredentials",
            Self::Throttling => "Throttling",
            Self::NotUpdatable => "NotUpdatable",
            Self::GeneralServiceException => "GeneralServiceException",
            Self::InternalFailure => "InternalFailure",
        };
        write!(f, "{}", name)
    }
}

/// Status envelope returned for every handler invocation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub status: OperationStatus,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<HandlerErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_model: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_models: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_delay_seconds: Option<u32>,
}

impl ProgressEvent {
    pub fn success(message: &str) -> Self {
        Self {
            status: OperationStatus::Success,
            message: message.to_string(),
            error_code: None,
            resource_model: None,
            resource_models: None,
            callback_delay_seconds: None,
        }
    }

    /// Success carrying a resource model. Models that fail to serialize are reported as an internal failure.
    pub fn success_with_model<M: Serialize>(message: &str, model: &M) -> Self {
        match serde_json::to_value(model) {
            Ok(value) => Self {
                resource_model: Some(value),
                ..Self::success(message)
            },
            Err(e) => Self::failed(
                &format!("Failed to serialize resource model: {}", e),
                HandlerErrorCode::InternalFailure,
            ),
        }
    }

    pub fn failed(message: &str, code: HandlerErrorCode) -> Self {
        Self {
            status: OperationStatus::Failed,
            message: message.to_string(),
            error_code: Some(code),
            resource_model: None,
            resource_models: None,
            callback_delay_seconds: None,
        }
    }

    /// Failure classified by the remote HTTP status, if any
    pub fn failed_by_status(message: &str, status: Option<u16>) -> Self {
        Self::failed(message, HandlerErrorCode::from_http_status(status))
    }

    pub fn is_success(&self) -> bool {
        self.status == OperationStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_event_wire_format() {
        let event = ProgressEvent::failed("Resource Not Found", HandlerErrorCode::NotFound);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["status"], "FAILED");
        assert_eq!(json["errorCode"], "NotFound");
        assert_eq!(json["message"], "Resource Not Found");
        assert!(json.get("resourceModel").is_none());
    }

    #[test]
    fn test_success_with_model() {
        let event = ProgressEvent::success_with_model(
            "Create Completed",
            &serde_json::json!({"ProjectId": "p1"}),
        );

        assert!(event.is_success());
        assert_eq!(event.error_code, None);
        assert_eq!(event.resource_model.unwrap()["ProjectId"], "p1");
    }

    #[test]
    fn test_error_code_from_status() {
        assert_eq!(HandlerErrorCode::from_http_status(Some(400)), HandlerErrorCode::InvalidRequest);
        assert_eq!(HandlerErrorCode::from_http_status(Some(404)), HandlerErrorCode::NotFound);
        assert_eq!(HandlerErrorCode::from_http_status(Some(409)), HandlerErrorCode::AlreadyExists);
        assert_eq!(HandlerErrorCode::from_http_status(Some(500)), HandlerErrorCode::ServiceInternalError);
        assert_eq!(HandlerErrorCode::from_http_status(None), HandlerErrorCode::ServiceInternalError);
    }

    #[test]
    fn test_handler_request_parsing() {
        let request: HandlerRequest = serde_json::from_str(
            r#"{"action":"DELETE","typeName":"MongoDB::Atlas::ProjectInvitation","desiredResourceState":{"Id":"inv1"}}"#,
        )
        .unwrap();

        assert_eq!(request.action, Action::Delete);
        assert_eq!(request.type_name, "MongoDB::Atlas::ProjectInvitation");
        assert!(request.previous_resource_state.is_none());
        assert_eq!(request.desired_resource_state["Id"], "inv1");
    }
}
