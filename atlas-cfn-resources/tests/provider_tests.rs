//! Dispatcher tests

mod common;

use atlas_cfn_common::{Action, HandlerErrorCode, HandlerRequest, OperationStatus, ProgressEvent};
use atlas_cfn_resources::client::GlobalCluster;
use atlas_cfn_resources::Provider;
use common::{context, namespace, Call, FakeAtlas, FakeConnector};
use serde_json::json;

fn provider(fake: std::sync::Arc<FakeAtlas>) -> Provider {
    Provider::new(context(FakeConnector::new(fake)))
}

#[test]
fn test_provider_knows_both_types() {
    let provider = provider(FakeAtlas::new());
    assert_eq!(
        provider.type_names(),
        vec![
            "MongoDB::Atlas::GlobalClusterConfig",
            "MongoDB::Atlas::ProjectInvitation"
        ]
    );
    assert!(provider.schema("MongoDB::Atlas::ProjectInvitation").is_some());
    assert!(provider.schema("MongoDB::Atlas::Cluster").is_none());
}

#[tokio::test]
async fn test_dispatch_routes_by_type_and_action() {
    let fake = FakeAtlas::with_cluster(GlobalCluster {
        managed_namespaces: vec![namespace("sales", "orders")],
        ..Default::default()
    });
    let provider = provider(fake.clone());

    let event = provider
        .dispatch(HandlerRequest {
            action: Action::Read,
            type_name: "MongoDB::Atlas::GlobalClusterConfig".to_string(),
            client_request_token: Some("token-1".to_string()),
            logical_resource_identifier: None,
            desired_resource_state: json!({
                "ProjectId": "p1",
                "ClusterName": "c1",
                "ApiKeys": {"PublicKey": "pub", "PrivateKey": "priv"}
            }),
            previous_resource_state: None,
        })
        .await;

    assert_eq!(event.status, OperationStatus::Success);
    assert_eq!(
        fake.calls(),
        vec![Call::GetGlobalCluster {
            project_id: "p1".into(),
            cluster_name: "c1".into()
        }]
    );
}

#[tokio::test]
async fn test_handle_request_round_trips_json() {
    let fake = FakeAtlas::new();
    let provider = provider(fake.clone());

    let output = provider
        .handle_request(
            r#"{"action":"DELETE","typeName":"MongoDB::Atlas::ProjectInvitation","desiredResourceState":{"ProjectId":"p1","Id":"inv1"}}"#,
        )
        .await;

    let event: ProgressEvent = serde_json::from_str(&output).unwrap();
    assert_eq!(event.status, OperationStatus::Success);
    assert_eq!(fake.calls().len(), 1);
}

#[tokio::test]
async fn test_unknown_type_is_invalid_request() {
    let provider = provider(FakeAtlas::new());

    let output = provider
        .handle_request(r#"{"action":"READ","typeName":"MongoDB::Atlas::Nope","desiredResourceState":{}}"#)
        .await;

    let event: ProgressEvent = serde_json::from_str(&output).unwrap();
    assert_eq!(event.error_code, Some(HandlerErrorCode::InvalidRequest));
    assert!(event.message.contains("MongoDB::Atlas::Nope"));
}

#[tokio::test]
async fn test_unparsable_request_is_invalid_request() {
    let provider = provider(FakeAtlas::new());

    let output = provider.handle_request("not json").await;

    let event: ProgressEvent = serde_json::from_str(&output).unwrap();
    assert_eq!(event.status, OperationStatus::Failed);
    assert_eq!(event.error_code, Some(HandlerErrorCode::InvalidRequest));
    assert!(event.message.starts_with("Parse error"));
}
