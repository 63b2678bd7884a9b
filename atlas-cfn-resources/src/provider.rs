//! Request dispatcher
//!
//! Routes a host request to the resource type and action it names.

use crate::resources::{get_all_resources, HandlerContext, Resource, ResourceRequest};
use crate::schema::ResourceSchema;
use atlas_cfn_common::{Action, HandlerErrorCode, HandlerRequest, ProgressEvent};
use std::collections::HashMap;
use tracing::Instrument;

/// Atlas resource provider
pub struct Provider {
    context: HandlerContext,
    resources: HashMap<String, Box<dyn Resource>>,
}

impl Provider {
    /// Create a provider serving every known resource type
    pub fn new(context: HandlerContext) -> Self {
        let resources: HashMap<String, Box<dyn Resource>> = get_all_resources()
            .into_iter()
            .map(|r| (r.type_name().to_string(), r))
            .collect();

        Self { context, resources }
    }

    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.resources.keys().map(String::as_str).collect();
        names.sort();
        names
    }

    pub fn schema(&self, type_name: &str) -> Option<ResourceSchema> {
        self.resources.get(type_name).map(|r| r.schema())
    }

    /// Handle one request
    pub async fn dispatch(&self, request: HandlerRequest) -> ProgressEvent {
        let resource = match self.resources.get(&request.type_name) {
            Some(r) => r,
            None => {
                tracing::warn!(type_name = %request.type_name, "unknown resource type");
                return ProgressEvent::failed(
                    &format!("Unknown resource type: {}", request.type_name),
                    HandlerErrorCode::InvalidRequest,
                );
            }
        };

        let span = tracing::info_span!(
            "handler",
            type_name = %request.type_name,
            action = %request.action,
            token = request.client_request_token.as_deref().unwrap_or("")
        );

        let action = request.action;
        let resource_request = ResourceRequest {
            desired: request.desired_resource_state,
            previous: request.previous_resource_state,
        };

        async {
            let ctx = &self.context;
            let event = match action {
                Action::Create => resource.create(ctx, &resource_request).await,
                Action::Read => resource.read(ctx, &resource_request).await,
                Action::Update => resource.update(ctx, &resource_request).await,
                Action::Delete => resource.delete(ctx, &resource_request).await,
                Action::List => resource.list(ctx, &resource_request).await,
            };
            tracing::info!(status = ?event.status, error_code = ?event.error_code, "handler finished");
            event
        }
        .instrument(span)
        .await
    }

    /// Handle one JSON-encoded request and return the JSON-encoded progress event
    pub async fn handle_request(&self, input: &str) -> String {
        let event = match serde_json::from_str::<HandlerRequest>(input) {
            Ok(request) => self.dispatch(request).await,
            Err(e) => ProgressEvent::failed(
                &format!("Parse error: {}", e),
                HandlerErrorCode::InvalidRequest,
            ),
        };

        serde_json::to_string(&event).unwrap_or_else(|e| {
            tracing::error!("failed to serialize progress event: {}", e);
            format!(
                r#"{{"status":"FAILED","message":"Serialization error","errorCode":"{}"}}"#,
                HandlerErrorCode::InternalFailure
            )
        })
    }
}
