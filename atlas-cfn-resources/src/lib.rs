//! CloudFormation resource handlers for MongoDB Atlas
//!
//! Each handler validates the resource model sent by CloudFormation, builds an
//! authenticated Atlas API client, performs the remote calls and reports a
//! progress event back to the host.

pub mod client;
pub mod digest;
pub mod provider;
pub mod reconcile;
pub mod resources;
pub mod schema;

pub use provider::Provider;
pub use resources::HandlerContext;
