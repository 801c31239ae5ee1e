//! Codex SDK - Typed Rust client for the Codex token and market data GraphQL API.
//!
//! This crate provides:
//! - A client facade over a single GraphQL endpoint with HTTP queries and
//!   mutations plus websocket subscriptions.
//! - Static and dynamic per-request header resolution.
//! - Typed operations via the [`GraphqlOperation`] trait, with a
//!   hand-maintained slice of the Codex schema in [`operations`].
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use codex_sdk::{CodexClient, operations::GetNetworks};
//!
//! let client = CodexClient::new("your-api-key")?;
//!
//! let response = client.query::<GetNetworks>(Default::default()).await?;
//! for network in response.data.unwrap().get_networks {
//!     println!("{}: {}", network.id, network.name);
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::doc_markdown)]

mod client;
mod config;
mod error;
mod operation;
pub mod operations;
mod subscription;
mod websocket;

pub use client::CodexClient;
pub use config::{CodexConfig, ConfigUpdate, HeaderProvider};
pub use error::{
    CodexError, CodexResult, GraphqlError, GraphqlErrorLocation, GraphqlPathSegment, HttpErrorInfo,
};
pub use operation::{GraphqlOperation, GraphqlQuery, GraphqlRequest, GraphqlResponse};
pub use subscription::{
    SubscriptionClient, SubscriptionConfig, SubscriptionHandle, SubscriptionSink,
};
pub use websocket::{WsClient, WsCloseFrame, WsConfig, WsConnection, WsMessage, WsReader, WsWriter};

use std::time::Duration;

/// Default HTTP GraphQL endpoint.
pub const DEFAULT_HTTP_ENDPOINT: &str = "https://graph.codex.io/graphql";

/// Default websocket GraphQL endpoint.
pub const DEFAULT_WS_ENDPOINT: &str = "wss://graph.codex.io/graphql";

/// Keep-alive ping interval for websocket subscriptions.
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_millis(10_000);
