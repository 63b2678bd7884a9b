//! `MongoDB::Atlas::ProjectInvitation`

use super::{parse_model, HandlerContext, Resource, ResourceRequest};
use crate::schema::{Property, ResourceSchema};
use async_trait::async_trait;
use atlas_cfn_common::profile::resolve_profile_name;
use atlas_cfn_common::validator::validate_required;
use atlas_cfn_common::ProgressEvent;
use serde::{Deserialize, Serialize};

pub const TYPE_NAME: &str = "MongoDB::Atlas::ProjectInvitation";

pub const DELETE_REQUIRED_FIELDS: &[&str] = &["ProjectId", "Id"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Model {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
}

pub struct ProjectInvitationResource;

impl ProjectInvitationResource {
    pub fn new() -> Self {
        Self
    }

    async fn try_delete(
        &self,
        ctx: &HandlerContext,
        request: &ResourceRequest,
    ) -> Result<ProgressEvent, ProgressEvent> {
        let model: Model = parse_model(&request.desired)?;
        tracing::debug!("Delete() currentModel: {:?}", model);

        validate_required(DELETE_REQUIRED_FIELDS, &model)?;
        let project_id = model.project_id.as_deref().unwrap_or_default();
        let invitation_id = model.id.as_deref().unwrap_or_default();

        let profile = resolve_profile_name(model.profile.as_deref());
        let api = ctx.client_for_profile(profile)?;

        api.delete_project_invitation(project_id, invitation_id)
            .await
            .map_err(|e| ProgressEvent::failed_by_status(&e.to_string(), e.status()))?;
        tracing::debug!("deleted invitation with Id: {}", invitation_id);

        Ok(ProgressEvent::success("Delete Complete"))
    }
}

impl Default for ProjectInvitationResource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Resource for ProjectInvitationResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new(TYPE_NAME, "A pending invitation to an Atlas project")
            .with_property(
                "Profile",
                Property::string().with_description("Profile holding the API keys (default: default)"),
            )
            .with_property("ProjectId", Property::string().with_description("Atlas project ID"))
            .with_property("Id", Property::string().with_description("Invitation ID"))
            .with_property(
                "Username",
                Property::string().with_description("Email address of the invited user"),
            )
            .with_property(
                "Roles",
                Property::array(Property::string()).with_description("Project roles granted on acceptance"),
            )
            .required(&["ProjectId"])
            .identified_by(&["ProjectId", "Id"])
            .with_handlers(&["Delete"])
    }

    async fn delete(&self, ctx: &HandlerContext, request: &ResourceRequest) -> ProgressEvent {
        match self.try_delete(ctx, request).await {
            Ok(event) | Err(event) => event,
        }
    }
}
