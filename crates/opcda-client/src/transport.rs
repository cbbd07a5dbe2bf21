// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Server interface abstraction.
//!
//! The client never talks to a wire. It calls methods on remote object
//! handles supplied by a transport, and every method either returns its
//! result or fails with a [`StatusCode`]. Connection establishment,
//! authentication and framing live behind these traits.
//!
//! # Interfaces
//!
//! ```text
//!                    ┌──────────────┐
//!                    │  OpcServer   │  capability query
//!                    └──────┬───────┘
//!          ┌────────────────┼──────────────────────┐
//!          ▼                ▼                      ▼
//!   ┌─────────────┐  ┌──────────────────┐  ┌──────────────────────┐
//!   │ServerBrowse │  │ServerAddressSpace│  │ServerItemProperties  │
//!   │ (paginated) │  │  (cursor-based)  │  │ (per-item, legacy)   │
//!   └─────────────┘  └──────────────────┘  └──────────────────────┘
//! ```
//!
//! Every interface is a [`RemoteObject`] with an identity used in call
//! traces. Implementations must be `Send + Sync`, but the client never
//! issues concurrent calls on one handle.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use opcda_core::{
    AccessRights, BrowseDirection, BrowsePage, BrowseType, ContinuationToken, ElementFilter,
    ItemProperties, NamespaceType, PropertiesQuery, StatusCode, VarType, Variant,
};

/// Outcome of one remote call.
pub type CallResult<T> = Result<T, StatusCode>;

// =============================================================================
// RemoteObject
// =============================================================================

/// An identity-bearing remote object handle.
pub trait RemoteObject: Send + Sync {
    /// Returns the identity shown in call traces and health events.
    fn object_id(&self) -> &str;
}

// =============================================================================
// Requests
// =============================================================================

/// Arguments of one paginated browse call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowseRequest {
    /// Item path to browse under; empty for the root.
    pub item_path: String,

    /// Token from the previous page, passed back unmodified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuation: Option<ContinuationToken>,

    /// Maximum elements in the returned page.
    pub max_elements: u32,

    /// Element selection.
    #[serde(default)]
    pub filter: ElementFilter,

    /// Inline property selection; `None` requests no properties.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<PropertiesRequest>,
}

impl BrowseRequest {
    /// Creates the first-page request for `item_path`.
    pub fn new(item_path: impl Into<String>, filter: ElementFilter, max_elements: u32) -> Self {
        Self {
            item_path: item_path.into(),
            continuation: None,
            max_elements,
            filter,
            properties: None,
        }
    }

    /// Sets the continuation token.
    pub fn with_continuation(mut self, token: Option<ContinuationToken>) -> Self {
        self.continuation = token;
        self
    }

    /// Requests inline properties.
    pub fn with_properties(mut self, query: Option<&PropertiesQuery>) -> Self {
        self.properties = query.map(PropertiesRequest::from_query);
        self
    }
}

/// Property selection as sent to the server.
///
/// Explicit ids are dropped when every property is requested.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PropertiesRequest {
    /// Return every property.
    pub return_all_properties: bool,

    /// Read property values.
    pub return_values: bool,

    /// Explicit ids, ascending; empty when `return_all_properties` is set.
    #[serde(default)]
    pub property_ids: Vec<u32>,
}

impl PropertiesRequest {
    /// Builds the wire selection from a query.
    pub fn from_query(query: &PropertiesQuery) -> Self {
        Self {
            return_all_properties: query.return_all_properties,
            return_values: query.return_values,
            property_ids: query
                .requested_ids()
                .map(|ids| ids.iter().copied().collect())
                .unwrap_or_default(),
        }
    }
}

impl fmt::Display for PropertiesRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.return_all_properties {
            write!(f, "all")?;
        } else {
            write!(f, "ids={:?}", self.property_ids)?;
        }
        if self.return_values {
            write!(f, "+values")?;
        }
        Ok(())
    }
}

// =============================================================================
// Legacy Property Records
// =============================================================================

/// A property an item exposes, as listed by a legacy server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableProperty {
    /// Property id.
    pub property_id: u32,
    /// Description.
    pub description: String,
    /// Value type.
    pub data_type: VarType,
}

impl AvailableProperty {
    /// Creates a record.
    pub fn new(property_id: u32, description: impl Into<String>, data_type: VarType) -> Self {
        Self {
            property_id,
            description: description.into(),
            data_type,
        }
    }
}

/// One property value read from a legacy server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRead {
    /// Value; [`Variant::Empty`] when the read failed.
    pub value: Variant,
    /// Per-property status.
    pub status: StatusCode,
}

/// The item path under which a property can be addressed directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyItemPath {
    /// Item path; empty when the lookup failed.
    pub item_path: String,
    /// Per-property status.
    pub status: StatusCode,
}

// =============================================================================
// Server Interfaces
// =============================================================================

/// Paginated browsing with inline properties.
pub trait ServerBrowse: RemoteObject {
    /// Returns one page of elements under `request.item_path`.
    fn browse(&self, request: &BrowseRequest) -> CallResult<BrowsePage>;

    /// Resolves properties for many items at once.
    ///
    /// The reply holds one entry per requested path, in request order.
    fn get_properties(
        &self,
        item_paths: &[String],
        request: &PropertiesRequest,
    ) -> CallResult<Vec<ItemProperties>>;

    /// Frees server state held for an abandoned continuation token.
    fn release_continuation(&self, _token: &ContinuationToken) -> CallResult<()> {
        Ok(())
    }
}

/// Cursor-based browsing on legacy servers.
///
/// The cursor is server-side state shared by every caller of the handle.
pub trait ServerAddressSpace: RemoteObject {
    /// Reports whether the namespace is hierarchical or flat.
    fn query_organization(&self) -> CallResult<NamespaceType>;

    /// Moves the cursor. `name` is ignored for `Up` and `ToRoot`.
    fn change_browse_position(&self, direction: BrowseDirection, name: &str) -> CallResult<()>;

    /// Lists names at the cursor position.
    fn browse_item_ids(
        &self,
        browse_type: BrowseType,
        filter: &str,
        data_type: VarType,
        access: AccessRights,
    ) -> CallResult<Vec<String>>;

    /// Resolves a short name at the cursor position to a full item path.
    fn get_item_id(&self, name: &str) -> CallResult<String>;
}

/// Per-item property access on legacy servers.
pub trait ServerItemProperties: RemoteObject {
    /// Lists the properties `item_path` exposes.
    fn query_available_properties(&self, item_path: &str) -> CallResult<Vec<AvailableProperty>>;

    /// Reads property values; one entry per id, in order.
    fn get_item_properties(&self, item_path: &str, property_ids: &[u32]) -> CallResult<Vec<PropertyRead>>;

    /// Looks up property item paths; one entry per id, in order.
    fn lookup_item_ids(&self, item_path: &str, property_ids: &[u32]) -> CallResult<Vec<PropertyItemPath>>;
}

/// A connected server and the interfaces it offers.
pub trait OpcServer: RemoteObject {
    /// The paginated browse interface, if supported.
    fn browse_interface(&self) -> Option<Arc<dyn ServerBrowse>>;

    /// The cursor-based address space interface, if supported.
    fn address_space_interface(&self) -> Option<Arc<dyn ServerAddressSpace>>;

    /// The per-item property interface, if supported.
    fn item_properties_interface(&self) -> Option<Arc<dyn ServerItemProperties>>;

    /// Summarizes which interfaces are available.
    fn capabilities(&self) -> ServerCapabilities {
        ServerCapabilities {
            browse: self.browse_interface().is_some(),
            address_space: self.address_space_interface().is_some(),
            item_properties: self.item_properties_interface().is_some(),
        }
    }
}

// =============================================================================
// ServerCapabilities
// =============================================================================

/// Interfaces a server exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServerCapabilities {
    /// Paginated browse.
    pub browse: bool,
    /// Cursor-based address space.
    pub address_space: bool,
    /// Per-item properties.
    pub item_properties: bool,
}

impl fmt::Display for ServerCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.browse {
            names.push("browse");
        }
        if self.address_space {
            names.push("address_space");
        }
        if self.item_properties {
            names.push("item_properties");
        }
        if names.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", names.join("+"))
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_properties_request_drops_ids_for_all() {
        let query = PropertiesQuery {
            return_all_properties: true,
            return_values: true,
            property_ids: [1, 2, 3].into_iter().collect(),
        };
        let request = PropertiesRequest::from_query(&query);
        assert!(request.property_ids.is_empty());
        assert_eq!(request.to_string(), "all+values");
    }

    #[test]
    fn test_properties_request_sorted_ids() {
        let request = PropertiesRequest::from_query(&PropertiesQuery::ids([6, 1, 3]));
        assert_eq!(request.property_ids, vec![1, 3, 6]);
        assert_eq!(request.to_string(), "ids=[1, 3, 6]");
    }

    #[test]
    fn test_browse_request_builder() {
        let token = ContinuationToken::from("cp");
        let request = BrowseRequest::new("Simulation Items", ElementFilter::items(), 10)
            .with_continuation(Some(token.clone()))
            .with_properties(None);
        assert_eq!(request.continuation, Some(token));
        assert!(request.properties.is_none());
        assert_eq!(request.max_elements, 10);
    }

    #[test]
    fn test_capabilities_display() {
        let caps = ServerCapabilities {
            browse: true,
            address_space: true,
            item_properties: false,
        };
        assert_eq!(caps.to_string(), "browse+address_space");
        assert_eq!(ServerCapabilities::default().to_string(), "none");
    }
}
