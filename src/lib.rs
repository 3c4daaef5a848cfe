//! Redmine Provider
//!
//! An infrastructure-as-code provider plugin that manages Redmine projects,
//! issues, issue categories and versions through the Redmine REST API.
//!
//! # Overview
//!
//! The crate provides:
//!
//! - **Schema types**: Types for describing the provider and resource schemas
//! - **ProviderService trait**: The operation surface the plugin host drives
//! - **RedmineProvider**: The provider implementation backed by a REST client
//! - **Server helpers**: Functions to start the plugin server with the
//!   handshake protocol
//! - **Error types**: Common error types for provider operations
//! - **Logging**: Integration with `tracing` for structured logging
//!
//! # Quick Start
//!
//! ```ignore
//! use redmine_provider::{serve, init_logging, RedmineProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging();
//!     serve(RedmineProvider::new()).await
//! }
//! ```
//!
//! # Handshake Protocol
//!
//! When the provider starts via [`serve`], it outputs a handshake string to
//! stdout:
//!
//! ```text
//! REDMINE_PROVIDER|1|127.0.0.1:50051
//! ```
//!
//! Format: `REDMINE_PROVIDER|<protocol_version>|<address>`
//!
//! The host spawns the provider as a subprocess, reads the handshake and
//! connects to the printed address. Requests and responses are
//! newline-delimited JSON.
//!
//! # Provider Protocol
//!
//! - **GetMetadata**: Returns provider capabilities and resource names
//! - **GetSchema**: Returns full schema for provider config and resources
//! - **ValidateProviderConfig**: Validates provider configuration
//! - **Configure**: Configures the Redmine connection
//! - **Stop**: Gracefully shuts down the provider
//! - **ValidateResourceConfig**: Validates resource configuration
//! - **UpgradeResourceState**: Migrates state from older schema versions
//! - **Plan**: Calculates required changes
//! - **Create/Read/Update/Delete**: CRUD operations against Redmine
//! - **ImportResourceState**: Imports existing Redmine records

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod error;
pub mod id;
pub mod logging;
pub mod provider;
pub mod schema;
pub mod server;
pub mod testing;
pub mod types;
pub mod validation;

// Re-export main types at crate root
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::RedmineProvider;
pub use schema::ProviderSchema;
pub use server::{
    serve, serve_on, serve_on_with_options, serve_with_options, ProviderService, ServeOptions,
};
pub use types::{
    AttributeChange, ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities,
    HANDSHAKE_PREFIX, PROTOCOL_VERSION,
};
pub use validation::{is_valid, validate, validate_result};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
