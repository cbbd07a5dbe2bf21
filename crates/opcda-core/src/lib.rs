// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Core types for the OPC DA client.
//!
//! This crate holds everything that does not depend on a live server:
//! status codes and their descriptions, address space data types, property
//! values, and the client error hierarchy.
//!
//! # Modules
//!
//! - [`status`]: signed 32-bit [`StatusCode`] and the fixed status table
//! - [`registry`]: [`StatusRegistry`] mapping codes to descriptions
//! - [`types`]: browse elements, filters, property queries, pages
//! - [`value`]: [`Variant`] values and [`VarType`] tags
//! - [`error`]: [`OpcDaError`] and its per-category errors
//!
//! # Error Handling
//!
//! ```text
//! OpcDaError
//! ├── Validation    - Arguments rejected before any remote call
//! ├── Transport     - Connection-fatal status from the transport
//! ├── Remote        - A remote call completed with a failure status
//! ├── Protocol      - Server response violates the interface contract
//! ├── Configuration - Invalid client settings
//! └── Capability    - Server lacks a required interface
//! ```
//!
//! Per-item and per-property failures are not errors. They are
//! [`StatusCode`] fields on the returned data.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod registry;
pub mod status;
pub mod types;
pub mod value;

pub use error::{
    CapabilityError, ConfigurationError, ErrorCode, ErrorSeverity, OpcDaError, OpcDaResult,
    ProtocolError, RemoteError, TransportError, ValidationError,
};
pub use registry::StatusRegistry;
pub use status::StatusCode;
pub use types::{
    property_ids, AccessRights, BrowseDirection, BrowseElement, BrowsePage, BrowseType,
    ContinuationToken, ElementFilter, ElementKind, ItemProperties, NamespaceType,
    PropertiesQuery, PropertyDescriptor,
};
pub use value::{VarType, Variant};
