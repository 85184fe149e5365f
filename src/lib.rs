//! Hyperping provider
//!
//! An infrastructure-as-code provider for the [Hyperping](https://hyperping.io)
//! monitoring API, served over the plugin gRPC protocol.
//!
//! # Overview
//!
//! - **Resources**: monitors, healthchecks, outages, incidents and their
//!   updates, maintenance windows, status pages and status page subscribers
//! - **Data sources**: lookups by id and filtered listings for each of the
//!   above, plus SLA and outage reports per monitor
//! - **Client**: a retrying REST client with API key authentication and a
//!   circuit breaker ([`client::HyperpingClient`])
//! - **Protocol**: the [`ProviderService`] trait and the gRPC server that
//!   adapts it to the wire protocol
//!
//! # Handshake Protocol
//!
//! When started via [`serve`], the provider prints one line to stdout:
//!
//! ```text
//! HYPERPING_PROVIDER|1|127.0.0.1:50051
//! ```
//!
//! Format: `HYPERPING_PROVIDER|<protocol_version>|<address>`
//!
//! The host engine spawns the binary, reads this line and connects over
//! gRPC. Everything else, logs included, goes to stderr.
//!
//! # Configuration
//!
//! ```hcl
//! provider "hyperping" {
//!   api_key = "sk_..."   # or HYPERPING_API_KEY
//! }
//! ```
//!
//! See [`provider::config`] for every provider attribute.

#![warn(clippy::all)]

pub mod client;
pub mod error;
pub mod logging;
pub mod provider;
pub mod schema;
pub mod server;
pub mod testing;
pub mod types;
pub mod validation;
pub mod validators;

#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod generated;

pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default};
pub use provider::HyperpingProvider;
pub use schema::ProviderSchema;
pub use server::{
    serve, serve_on, serve_on_with_options, serve_with_options, ProviderService, ServeOptions,
};
pub use types::{
    ImportedResource, PlanResult, StateResponse, HANDSHAKE_PREFIX, PROTOCOL_VERSION,
};
