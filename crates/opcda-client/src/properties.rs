// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Batch property resolution.
//!
//! [`ResolveProperties::get_properties`] returns one [`ItemProperties`] per
//! requested item path, in request order. Failures are layered:
//!
//! - the item-level status says whether the item's property set could be
//!   resolved at all
//! - each descriptor carries its own status, so one bad property id never
//!   fails the others
//!
//! Two resolvers exist. [`PropertyResolver`] issues a single batch call on
//! the paginated browse interface. [`LegacyPropertyResolver`] serves servers
//! that only offer per-item property access and makes up to three calls per
//! item.

use std::fmt;
use std::sync::Arc;

use opcda_core::{
    ItemProperties, OpcDaResult, PropertiesQuery, PropertyDescriptor, ProtocolError, StatusCode,
};

use crate::gate::{CallGate, RecoverDomain};
use crate::transport::{AvailableProperty, PropertiesRequest, ServerBrowse, ServerItemProperties};

// =============================================================================
// ResolveProperties
// =============================================================================

/// Resolves properties for a list of items.
pub trait ResolveProperties: Send + Sync {
    /// Returns one entry per path, in the same order.
    ///
    /// # Errors
    ///
    /// Transport failures and protocol violations. Per-item and per-property
    /// failures are reported as statuses in the result.
    fn get_properties(
        &self,
        item_paths: &[String],
        query: &PropertiesQuery,
    ) -> OpcDaResult<Vec<ItemProperties>>;
}

// =============================================================================
// PropertyResolver
// =============================================================================

/// Resolves properties with one batch call.
pub struct PropertyResolver {
    server: Arc<dyn ServerBrowse>,
    gate: Arc<CallGate>,
}

impl PropertyResolver {
    /// Creates a resolver on the paginated browse interface.
    pub fn new(server: Arc<dyn ServerBrowse>, gate: Arc<CallGate>) -> Self {
        Self { server, gate }
    }
}

impl ResolveProperties for PropertyResolver {
    fn get_properties(
        &self,
        item_paths: &[String],
        query: &PropertiesQuery,
    ) -> OpcDaResult<Vec<ItemProperties>> {
        if item_paths.is_empty() {
            return Ok(Vec::new());
        }

        let request = PropertiesRequest::from_query(query);
        let server = &self.server;
        let mut results = self.gate.invoke(
            server.object_id(),
            "GetProperties",
            &(item_paths, &request),
            || server.get_properties(item_paths, &request),
        )?;

        if results.len() != item_paths.len() {
            return Err(
                ProtocolError::length_mismatch("GetProperties", item_paths.len(), results.len()).into(),
            );
        }

        if !query.return_values {
            results.iter_mut().for_each(ItemProperties::strip_values);
        }
        Ok(results)
    }
}

impl fmt::Debug for PropertyResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyResolver")
            .field("server", &self.server.object_id())
            .finish()
    }
}

// =============================================================================
// LegacyPropertyResolver
// =============================================================================

/// Resolves properties item by item on servers without batch support.
///
/// Per item:
///
/// 1. list the available properties (failure ⇒ item-level status)
/// 2. select the requested ids; ids the item lacks get `OPC_E_INVALID_PID`
/// 3. read values if requested (failure ⇒ status on each selected property)
/// 4. look up the item paths of the selected properties (failures ignored)
pub struct LegacyPropertyResolver {
    server: Arc<dyn ServerItemProperties>,
    gate: Arc<CallGate>,
}

impl LegacyPropertyResolver {
    /// Creates a resolver on the per-item property interface.
    pub fn new(server: Arc<dyn ServerItemProperties>, gate: Arc<CallGate>) -> Self {
        Self { server, gate }
    }

    fn resolve_item(&self, item_path: &str, query: &PropertiesQuery) -> OpcDaResult<ItemProperties> {
        let server = &self.server;
        let object = server.object_id();

        let available = match self
            .gate
            .invoke(object, "QueryAvailableProperties", &item_path, || {
                server.query_available_properties(item_path)
            })
            .recover_domain()?
        {
            Ok(available) => available,
            Err(status) => return Ok(ItemProperties::failed(status)),
        };

        let mut properties = select(&available, query);
        let ids: Vec<u32> = properties
            .iter()
            .filter(|p| p.is_ok())
            .map(|p| p.property_id)
            .collect();
        if ids.is_empty() {
            return Ok(ItemProperties::ok(properties));
        }

        if query.return_values {
            let reads = self
                .gate
                .invoke(object, "GetItemProperties", &(item_path, &ids), || {
                    server.get_item_properties(item_path, &ids)
                })
                .recover_domain()?;
            match reads {
                Ok(reads) => {
                    if reads.len() != ids.len() {
                        return Err(
                            ProtocolError::length_mismatch("GetItemProperties", ids.len(), reads.len()).into(),
                        );
                    }
                    for (id, read) in ids.iter().zip(reads) {
                        if let Some(descriptor) = find_mut(&mut properties, *id) {
                            descriptor.status = read.status;
                            if read.status.succeeded() {
                                descriptor.value = Some(read.value);
                            }
                        }
                    }
                }
                Err(status) => {
                    for id in &ids {
                        if let Some(descriptor) = find_mut(&mut properties, *id) {
                            descriptor.status = status;
                        }
                    }
                }
            }
        }

        let lookups = self
            .gate
            .invoke(object, "LookupItemIDs", &(item_path, &ids), || {
                server.lookup_item_ids(item_path, &ids)
            })
            .recover_domain()?;
        match lookups {
            Ok(lookups) if lookups.len() == ids.len() => {
                for (id, lookup) in ids.iter().zip(lookups) {
                    if lookup.status.succeeded() {
                        if let Some(descriptor) = find_mut(&mut properties, *id) {
                            descriptor.item_path = lookup.item_path;
                        }
                    }
                }
            }
            Ok(lookups) => {
                tracing::debug!(
                    item_path,
                    expected = ids.len(),
                    actual = lookups.len(),
                    "Ignoring malformed item path lookup"
                );
            }
            Err(status) => {
                tracing::debug!(item_path, status = %status, "Property item paths unavailable");
            }
        }

        Ok(ItemProperties::ok(properties))
    }
}

fn select(available: &[AvailableProperty], query: &PropertiesQuery) -> Vec<PropertyDescriptor> {
    let describe = |property: &AvailableProperty| {
        PropertyDescriptor::new(property.property_id, property.description.clone(), property.data_type)
    };

    match query.requested_ids() {
        None => available.iter().map(describe).collect(),
        Some(ids) => ids
            .iter()
            .map(|id| {
                available
                    .iter()
                    .find(|property| property.property_id == *id)
                    .map(describe)
                    .unwrap_or_else(|| PropertyDescriptor::failed(*id, StatusCode::OPC_E_INVALID_PID))
            })
            .collect(),
    }
}

fn find_mut(properties: &mut [PropertyDescriptor], id: u32) -> Option<&mut PropertyDescriptor> {
    properties.iter_mut().find(|p| p.property_id == id)
}

impl ResolveProperties for LegacyPropertyResolver {
    fn get_properties(
        &self,
        item_paths: &[String],
        query: &PropertiesQuery,
    ) -> OpcDaResult<Vec<ItemProperties>> {
        item_paths
            .iter()
            .map(|item_path| self.resolve_item(item_path, query))
            .collect()
    }
}

impl fmt::Debug for LegacyPropertyResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LegacyPropertyResolver")
            .field("server", &self.server.object_id())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
