// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # opcda-client
//!
//! Address space browsing and property resolution for OPC DA servers.
//!
//! The transport (object activation, marshalling, authentication) is not
//! part of this crate. It plugs in through the traits in [`transport`], and
//! every call it performs passes through the [`CallGate`], which turns
//! status codes into typed errors and announces lost connections.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                          ClientSession                            │
//! ├──────────────────────────┬──────────────────┬─────────────────────┤
//! │     BrowseStrategy       │ ResolveProperties│   HealthChannel     │
//! │  Stateless │ Stateful    │  batch │ legacy  │   subscribers       │
//! ├──────────────────────────┴──────────────────┴─────────────────────┤
//! │                            CallGate                               │
//! ├───────────────────────────────────────────────────────────────────┤
//! │   transport: ServerBrowse │ ServerAddressSpace │ ServerItemProps  │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use opcda_client::{ClientConfig, ClientSession, ElementBrowser, HealthContext};
//! use opcda_core::{ElementFilter, PropertiesQuery};
//!
//! let session = ClientSession::new(server, ClientConfig::default(), HealthContext::labeled("plant-a"))?;
//! session.health().subscribe_fn("reconnect", |event| eprintln!("{event}"));
//!
//! let root = session.browse("", &ElementFilter::all(), Some(&PropertiesQuery::all()))?;
//! for element in &root.elements {
//!     println!("{element}");
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Plumbing
// =============================================================================

pub mod config;
pub mod gate;
pub mod health;
pub mod transport;

// =============================================================================
// Browsing & Properties
// =============================================================================

pub mod browse;
pub mod discovery;
pub mod properties;
pub mod session;

// =============================================================================
// Re-exports
// =============================================================================

pub use browse::{
    AddressSpaceBrowser, BrowseCompletion, BrowseIter, BrowseResult, BrowseStrategy, BrowseTree,
    BrowseTreeNode, ContinuationGuard, ElementBrowser, PositionBrowser, TreeWalker, Truncation,
};
pub use config::{BrowseMode, ClientConfig, ConfigFormat, ConfigLoader, DEFAULT_BATCH_SIZE};
pub use discovery::{
    DaVersion, DiscoveryChain, DiscoveryReport, DiscoveryStrategy, ServerDescriptor,
    StaticDiscovery,
};
pub use gate::{CallGate, GateStats, RecoverDomain, TraceSummary};
pub use health::{
    CollectingSubscriber, ConnectionHealthEvent, DeliveryReport, HealthChannel, HealthContext,
    HealthSubscriber, SubscriptionId,
};
pub use properties::{LegacyPropertyResolver, PropertyResolver, ResolveProperties};
pub use session::ClientSession;
pub use transport::{
    AvailableProperty, BrowseRequest, CallResult, OpcServer, PropertiesRequest, PropertyItemPath,
    PropertyRead, RemoteObject, ServerAddressSpace, ServerBrowse, ServerCapabilities,
    ServerItemProperties,
};
