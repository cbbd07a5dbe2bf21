// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Mock Implementations
//!
//! A simulated server implementing every transport interface over a
//! [`SimNode`] tree.
//!
//! ## Design Principles
//!
//! - Configurable capabilities: paginated, cursor-based, or both
//! - Recording of every call for verification
//! - Outstanding continuation tokens are tracked, so leaks are visible
//! - Failure injection by operation name

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use opcda_client::browse::wildcard;
use opcda_client::{
    AvailableProperty, BrowseRequest, CallResult, ClientConfig, ClientSession,
    ConnectionHealthEvent, HealthContext, HealthSubscriber, OpcServer, PropertiesRequest,
    PropertyItemPath, PropertyRead, RemoteObject, ServerAddressSpace, ServerBrowse,
    ServerCapabilities, ServerItemProperties,
};
use opcda_core::{
    property_ids, AccessRights, BrowseDirection, BrowsePage, BrowseType, ContinuationToken,
    ItemProperties, NamespaceType, PropertyDescriptor, StatusCode, VarType, Variant,
};

use super::fixtures::{AddressSpaceFixtures, SimNode, SimProperty};

// =============================================================================
// Failure Injection
// =============================================================================

#[derive(Debug, Clone)]
struct FailureRule {
    operation: String,
    status: StatusCode,
    skip: usize,
    remaining: Option<usize>,
}

// =============================================================================
// Simulated Server Core
// =============================================================================

/// Shared state behind every interface of a [`SimulatedServer`].
#[derive(Debug)]
pub struct SimCore {
    id: String,
    namespace: NamespaceType,
    root: RwLock<SimNode>,
    cursor: Mutex<Vec<String>>,
    tokens: Mutex<HashMap<Vec<u8>, (String, usize)>>,
    next_token: AtomicU64,
    failures: Mutex<Vec<FailureRule>>,
    calls: Mutex<Vec<String>>,
    released: AtomicU64,
    ignore_return_values: AtomicBool,
    short_property_reply: AtomicBool,
}

impl SimCore {
    fn new(id: &str, root: SimNode, namespace: NamespaceType) -> Self {
        Self {
            id: id.to_string(),
            namespace,
            root: RwLock::new(root),
            cursor: Mutex::new(Vec::new()),
            tokens: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(1),
            failures: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            released: AtomicU64::new(0),
            ignore_return_values: AtomicBool::new(false),
            short_property_reply: AtomicBool::new(false),
        }
    }

    /// Records the call and applies matching failure rules.
    fn enter(&self, operation: &str) -> CallResult<()> {
        self.calls.lock().push(operation.to_string());

        let mut failures = self.failures.lock();
        for rule in failures.iter_mut().filter(|r| r.operation == operation) {
            if rule.skip > 0 {
                rule.skip -= 1;
                continue;
            }
            match rule.remaining {
                Some(0) => continue,
                Some(ref mut n) => *n -= 1,
                None => {}
            }
            return Err(rule.status);
        }
        Ok(())
    }

    fn describe(node: &SimNode, property: &SimProperty, with_value: bool) -> PropertyDescriptor {
        let mut descriptor =
            PropertyDescriptor::new(property.id, property.description.clone(), property.data_type);
        if property.id >= property_ids::EU_UNITS {
            descriptor = descriptor.with_item_path(format!("{}#{}", node.item_path, property.id));
        }
        if with_value {
            descriptor = descriptor.with_value(property.value.clone());
        }
        descriptor
    }

    fn properties_of(&self, node: &SimNode, request: &PropertiesRequest) -> ItemProperties {
        let with_value =
            request.return_values || self.ignore_return_values.load(Ordering::Relaxed);
        let properties = if request.return_all_properties {
            node.properties
                .iter()
                .map(|property| Self::describe(node, property, with_value))
                .collect()
        } else {
            request
                .property_ids
                .iter()
                .map(|id| match node.property(*id) {
                    Some(property) => Self::describe(node, property, with_value),
                    None => PropertyDescriptor::failed(*id, StatusCode::OPC_E_INVALID_PID),
                })
                .collect()
        };
        ItemProperties::ok(properties)
    }

    fn issue_token(&self, item_path: &str, offset: usize) -> ContinuationToken {
        let token = format!("ct-{}", self.next_token.fetch_add(1, Ordering::Relaxed));
        self.tokens
            .lock()
            .insert(token.clone().into_bytes(), (item_path.to_string(), offset));
        ContinuationToken::from(token.as_str())
    }
}

fn node_at<'a>(root: &'a SimNode, names: &[String]) -> Option<&'a SimNode> {
    names.iter().try_fold(root, |node, name| node.child(name))
}

impl RemoteObject for SimCore {
    fn object_id(&self) -> &str {
        &self.id
    }
}

impl ServerBrowse for SimCore {
    fn browse(&self, request: &BrowseRequest) -> CallResult<BrowsePage> {
        self.enter("Browse")?;

        let (item_path, offset) = match &request.continuation {
            Some(token) => {
                let entry = self
                    .tokens
                    .lock()
                    .remove(token.as_bytes())
                    .ok_or(StatusCode::OPC_E_INVALIDCONTINUATIONPOINT)?;
                if entry.0 != request.item_path {
                    return Err(StatusCode::OPC_E_INVALIDCONTINUATIONPOINT);
                }
                entry
            }
            None => (request.item_path.clone(), 0),
        };

        let root = self.root.read();
        let node = root.find(&item_path).ok_or(StatusCode::OPC_E_UNKNOWNITEMID)?;
        let filter = &request.filter;
        let matching: Vec<&SimNode> = node
            .children
            .iter()
            .filter(|child| filter.element_kind.admits(child.is_item, child.has_children()))
            .filter(|child| wildcard::matches(&filter.name_pattern, &child.name))
            .collect();

        let max = match request.max_elements {
            0 => matching.len(),
            n => n as usize,
        };
        let end = (offset + max).min(matching.len());
        let elements = matching[offset.min(end)..end]
            .iter()
            .map(|child| {
                let mut element = child.to_element();
                if let (true, Some(properties)) = (child.is_item, &request.properties) {
                    element.properties = self.properties_of(child, properties);
                }
                element
            })
            .collect();

        if end < matching.len() {
            Ok(BrowsePage::partial(elements, self.issue_token(&item_path, end)))
        } else {
            Ok(BrowsePage::last(elements))
        }
    }

    fn get_properties(
        &self,
        item_paths: &[String],
        request: &PropertiesRequest,
    ) -> CallResult<Vec<ItemProperties>> {
        self.enter("GetProperties")?;

        let root = self.root.read();
        let mut results: Vec<ItemProperties> = item_paths
            .iter()
            .map(|path| match root.find(path).filter(|node| node.is_item) {
                Some(node) => self.properties_of(node, request),
                None => ItemProperties::failed(StatusCode::OPC_E_UNKNOWNITEMID),
            })
            .collect();
        if self.short_property_reply.load(Ordering::Relaxed) {
            results.pop();
        }
        Ok(results)
    }

    fn release_continuation(&self, token: &ContinuationToken) -> CallResult<()> {
        self.enter("ReleaseContinuationPoint")?;
        match self.tokens.lock().remove(token.as_bytes()) {
            Some(_) => {
                self.released.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            None => Err(StatusCode::OPC_E_INVALIDCONTINUATIONPOINT),
        }
    }
}

impl ServerAddressSpace for SimCore {
    fn query_organization(&self) -> CallResult<NamespaceType> {
        self.enter("QueryOrganization")?;
        Ok(self.namespace)
    }

    fn change_browse_position(&self, direction: BrowseDirection, name: &str) -> CallResult<()> {
        self.enter("ChangeBrowsePosition")?;

        let root = self.root.read();
        let mut cursor = self.cursor.lock();
        match direction {
            BrowseDirection::ToRoot => cursor.clear(),
            BrowseDirection::Up => {
                cursor.pop().ok_or(StatusCode::E_FAIL)?;
            }
            BrowseDirection::Down => {
                let current = node_at(&root, &cursor).ok_or(StatusCode::E_FAIL)?;
                match current.child(name) {
                    Some(child) if child.is_branch() => cursor.push(name.to_string()),
                    _ => return Err(StatusCode::E_INVALIDARG),
                }
            }
        }
        Ok(())
    }

    fn browse_item_ids(
        &self,
        browse_type: BrowseType,
        filter: &str,
        _data_type: VarType,
        _access: AccessRights,
    ) -> CallResult<Vec<String>> {
        self.enter("BrowseOPCItemIDs")?;

        let root = self.root.read();
        let cursor = self.cursor.lock();
        let current = node_at(&root, &cursor).ok_or(StatusCode::E_FAIL)?;
        let names = match browse_type {
            BrowseType::Branches => current
                .children
                .iter()
                .filter(|child| child.is_branch() && wildcard::matches(filter, &child.name))
                .map(|child| child.name.clone())
                .collect(),
            BrowseType::Items => current
                .children
                .iter()
                .filter(|child| child.is_item && wildcard::matches(filter, &child.name))
                .map(|child| child.name.clone())
                .collect(),
            BrowseType::Flat => current
                .items_below()
                .into_iter()
                .filter(|item| wildcard::matches(filter, &item.item_path))
                .map(|item| item.item_path.clone())
                .collect(),
        };
        Ok(names)
    }

    fn get_item_id(&self, name: &str) -> CallResult<String> {
        self.enter("GetItemID")?;

        let root = self.root.read();
        let cursor = self.cursor.lock();
        let current = node_at(&root, &cursor).ok_or(StatusCode::E_FAIL)?;
        current
            .child(name)
            .or_else(|| root.find(name))
            .map(|node| node.item_path.clone())
            .ok_or(StatusCode::OPC_E_UNKNOWNITEMID)
    }
}

impl ServerItemProperties for SimCore {
    fn query_available_properties(&self, item_path: &str) -> CallResult<Vec<AvailableProperty>> {
        self.enter("QueryAvailableProperties")?;

        let root = self.root.read();
        let node = root
            .find(item_path)
            .filter(|node| node.is_item)
            .ok_or(StatusCode::OPC_E_UNKNOWNITEMID)?;
        Ok(node
            .properties
            .iter()
            .map(|p| AvailableProperty::new(p.id, p.description.clone(), p.data_type))
            .collect())
    }

    fn get_item_properties(&self, item_path: &str, property_ids: &[u32]) -> CallResult<Vec<PropertyRead>> {
        self.enter("GetItemProperties")?;

        let root = self.root.read();
        let node = root.find(item_path).ok_or(StatusCode::OPC_E_UNKNOWNITEMID)?;
        Ok(property_ids
            .iter()
            .map(|id| match node.property(*id) {
                Some(property) => PropertyRead {
                    value: property.value.clone(),
                    status: StatusCode::S_OK,
                },
                None => PropertyRead {
                    value: Variant::Empty,
                    status: StatusCode::OPC_E_INVALID_PID,
                },
            })
            .collect())
    }

    fn lookup_item_ids(&self, item_path: &str, property_ids: &[u32]) -> CallResult<Vec<PropertyItemPath>> {
        self.enter("LookupItemIDs")?;

        let root = self.root.read();
        let node = root.find(item_path).ok_or(StatusCode::OPC_E_UNKNOWNITEMID)?;
        Ok(property_ids
            .iter()
            .map(|id| match node.property(*id) {
                Some(property) if property.id >= property_ids::EU_UNITS => PropertyItemPath {
                    item_path: format!("{}#{}", node.item_path, property.id),
                    status: StatusCode::S_OK,
                },
                _ => PropertyItemPath {
                    item_path: String::new(),
                    status: StatusCode::OPC_E_INVALID_PID,
                },
            })
            .collect())
    }
}

// =============================================================================
// Simulated Server
// =============================================================================

/// A configurable in-memory server.
#[derive(Debug, Clone)]
pub struct SimulatedServer {
    core: Arc<SimCore>,
    capabilities: ServerCapabilities,
}

impl SimulatedServer {
    /// Identity reported by simulated servers.
    pub const SERVER_ID: &'static str = "Matrikon.OPC.Simulation.1";

    /// Creates a server over `root` with the given interfaces.
    pub fn new(root: SimNode, capabilities: ServerCapabilities) -> Self {
        Self::with_namespace(root, capabilities, NamespaceType::Hierarchical)
    }

    /// Creates a server with an explicit namespace organization.
    pub fn with_namespace(root: SimNode, capabilities: ServerCapabilities, namespace: NamespaceType) -> Self {
        Self {
            core: Arc::new(SimCore::new(Self::SERVER_ID, root, namespace)),
            capabilities,
        }
    }

    /// Paginated browsing only, over the simulation address space.
    pub fn modern() -> Self {
        Self::new(
            AddressSpaceFixtures::simulation(),
            ServerCapabilities {
                browse: true,
                address_space: false,
                item_properties: false,
            },
        )
    }

    /// Cursor browsing and per-item properties, over the simulation address space.
    pub fn legacy() -> Self {
        Self::new(
            AddressSpaceFixtures::simulation(),
            ServerCapabilities {
                browse: false,
                address_space: true,
                item_properties: true,
            },
        )
    }

    /// Every interface, over the simulation address space.
    pub fn full() -> Self {
        Self::new(
            AddressSpaceFixtures::simulation(),
            ServerCapabilities {
                browse: true,
                address_space: true,
                item_properties: true,
            },
        )
    }

    /// Returns the shared core for direct interface access.
    pub fn core(&self) -> Arc<SimCore> {
        Arc::clone(&self.core)
    }

    /// Creates a session on this server.
    pub fn session(&self, config: ClientConfig) -> ClientSession {
        ClientSession::new(Arc::new(self.clone()), config, HealthContext::labeled("simulation"))
            .expect("Failed to create session")
    }

    /// Fails every call of `operation` with `status`.
    pub fn fail_always(&self, operation: &str, status: StatusCode) {
        self.push_rule(operation, status, 0, None);
    }

    /// Fails only the call of `operation` with zero-based index `n`.
    pub fn fail_nth(&self, operation: &str, n: usize, status: StatusCode) {
        self.push_rule(operation, status, n, Some(1));
    }

    /// Replaces the address space, as a server reconfiguration would.
    ///
    /// The cursor is left untouched and may point at a branch that no longer
    /// exists.
    pub fn replace_address_space(&self, root: SimNode) {
        *self.core.root.write() = root;
    }

    /// Removes all failure rules.
    pub fn clear_failures(&self) {
        self.core.failures.lock().clear();
    }

    fn push_rule(&self, operation: &str, status: StatusCode, skip: usize, remaining: Option<usize>) {
        self.core.failures.lock().push(FailureRule {
            operation: operation.to_string(),
            status,
            skip,
            remaining,
        });
    }

    /// Sends values even when the request did not ask for them.
    pub fn set_ignore_return_values(&self, enabled: bool) {
        self.core.ignore_return_values.store(enabled, Ordering::Relaxed);
    }

    /// Drops the last entry of every batch property reply.
    pub fn set_short_property_reply(&self, enabled: bool) {
        self.core.short_property_reply.store(enabled, Ordering::Relaxed);
    }

    /// Returns every recorded operation name, in order.
    pub fn calls(&self) -> Vec<String> {
        self.core.calls.lock().clone()
    }

    /// Returns how often `operation` was called.
    pub fn call_count(&self, operation: &str) -> usize {
        self.core.calls.lock().iter().filter(|c| *c == operation).count()
    }

    /// Clears the call log.
    pub fn reset_calls(&self) {
        self.core.calls.lock().clear();
    }

    /// Returns how many tokens the client released.
    pub fn released_count(&self) -> u64 {
        self.core.released.load(Ordering::Relaxed)
    }

    /// Returns how many issued tokens were neither consumed nor released.
    pub fn outstanding_tokens(&self) -> usize {
        self.core.tokens.lock().len()
    }

    /// Returns the server-side cursor.
    pub fn cursor(&self) -> Vec<String> {
        self.core.cursor.lock().clone()
    }
}

impl RemoteObject for SimulatedServer {
    fn object_id(&self) -> &str {
        &self.core.id
    }
}

impl OpcServer for SimulatedServer {
    fn browse_interface(&self) -> Option<Arc<dyn ServerBrowse>> {
        self.capabilities
            .browse
            .then(|| Arc::clone(&self.core) as Arc<dyn ServerBrowse>)
    }

    fn address_space_interface(&self) -> Option<Arc<dyn ServerAddressSpace>> {
        self.capabilities
            .address_space
            .then(|| Arc::clone(&self.core) as Arc<dyn ServerAddressSpace>)
    }

    fn item_properties_interface(&self) -> Option<Arc<dyn ServerItemProperties>> {
        self.capabilities
            .item_properties
            .then(|| Arc::clone(&self.core) as Arc<dyn ServerItemProperties>)
    }
}

// =============================================================================
// Health Subscribers
// =============================================================================

/// A subscriber that panics on every event.
#[derive(Debug, Default)]
pub struct PanickingSubscriber {
    calls: AtomicU64,
}

impl PanickingSubscriber {
    /// Returns how often it was invoked.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

impl HealthSubscriber for PanickingSubscriber {
    fn name(&self) -> &str {
        "panicking"
    }

    fn on_connection_lost(&self, event: &ConnectionHealthEvent) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        panic!("subscriber failure on {}", event.code);
    }
}
