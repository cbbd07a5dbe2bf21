// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Cursor-based browsing for legacy servers.
//!
//! # Cursor State Machine
//!
//! ```text
//!            ToRoot (absolute)
//!     ┌──────────────────────────────┐
//!     ▼                              │
//!   [root] ──Down(a)──► [a] ──Down(b)──► [a.b]
//!     ▲                  │ ▲              │
//!     └───────Up─────────┘ └──────Up──────┘
//! ```
//!
//! The cursor lives on the server and is shared by every caller of the
//! handle. The browser mirrors it as a stack of names and records the name
//! path of every branch it has listed, so a later `browse(item_path)` can
//! navigate back with `ToRoot` followed by `Down` steps.
//!
//! # Path Resolution
//!
//! Item paths carry no portable delimiter, so a path is mapped to the names
//! leading to it by listing branches from the root:
//!
//! ```text
//!   browse("Plant.Line1")
//!     │
//!     ├─ index hit ──► ToRoot, Down.. ──ok──► list
//!     │                                 └─fails─► evict subtree ─┐
//!     └─ index miss ◄────────────────────────────────────────────┘
//!          ToRoot, then depth first:
//!            list branches, GetItemID each, record
//!            exact match ──► Down, list
//!            otherwise descend prefixes of the path first, then the rest
//!          nothing found ──► truncated with OPC_E_UNKNOWNITEMID
//! ```
//!
//! The index is a hint. Every unfiltered branch listing replaces the
//! recorded children of that position, so branches that disappeared from
//! the server drop out together with everything below them.
//!
//! Browsing one handle from several threads at once is undefined on the
//! server side; the internal mutex only keeps the client mirror consistent.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use opcda_core::{
    AccessRights, BrowseDirection, BrowseElement, BrowseType, ElementFilter, ElementKind,
    ItemProperties, NamespaceType, OpcDaResult, PropertiesQuery, StatusCode, VarType,
};

use crate::browse::{BrowseResult, ElementBrowser};
use crate::gate::{CallGate, RecoverDomain};
use crate::properties::ResolveProperties;
use crate::transport::ServerAddressSpace;

// =============================================================================
// CursorState
// =============================================================================

#[derive(Debug, Default)]
struct CursorState {
    /// Names from the root to the current position.
    position: Vec<String>,
    /// Cached namespace organization.
    namespace: Option<NamespaceType>,
    /// Item path of each listed branch to its name path.
    paths: HashMap<String, Vec<String>>,
}

impl CursorState {
    /// Drops the branch at `names` and everything recorded below it.
    fn forget(&mut self, names: &[String]) {
        self.paths.retain(|_, path| !path.starts_with(names));
    }

    /// Records the branches listed at `position`.
    ///
    /// A `complete` listing also evicts recorded children of `position`
    /// that are no longer present.
    fn remember(&mut self, position: &[String], branches: &[(String, String)], complete: bool) {
        if complete {
            let stale: Vec<Vec<String>> = self
                .paths
                .values()
                .filter(|path| path.len() == position.len() + 1 && path.starts_with(position))
                .filter(|path| !branches.iter().any(|(name, _)| path.last() == Some(name)))
                .cloned()
                .collect();
            for names in &stale {
                tracing::debug!(names = ?names, "Branch no longer listed, forgetting");
                self.forget(names);
            }
        }

        for (name, item_path) in branches {
            let mut names = position.to_vec();
            names.push(name.clone());
            self.paths.insert(item_path.clone(), names);
        }
    }
}

/// Returns `true` if `prefix` is a proper leading segment of `item_path`.
fn is_path_prefix(prefix: &str, item_path: &str) -> bool {
    item_path
        .strip_prefix(prefix)
        .and_then(|rest| rest.chars().next())
        .is_some_and(|next| !next.is_alphanumeric())
}

// =============================================================================
// PositionBrowser
// =============================================================================

/// Browser for servers that only offer a server-side cursor.
pub struct PositionBrowser {
    space: Arc<dyn ServerAddressSpace>,
    gate: Arc<CallGate>,
    properties: Option<Arc<dyn ResolveProperties>>,
    state: Mutex<CursorState>,
}

impl PositionBrowser {
    /// Creates a browser without inline property support.
    pub fn new(space: Arc<dyn ServerAddressSpace>, gate: Arc<CallGate>) -> Self {
        Self {
            space,
            gate,
            properties: None,
            state: Mutex::new(CursorState::default()),
        }
    }

    /// Resolves inline properties through `resolver`.
    pub fn with_properties(mut self, resolver: Arc<dyn ResolveProperties>) -> Self {
        self.properties = Some(resolver);
        self
    }

    /// Returns the namespace organization, querying it once.
    pub fn organization(&self) -> OpcDaResult<NamespaceType> {
        let mut state = self.state.lock();
        self.query_organization(&mut state)
    }

    /// Moves the server cursor. `name` is ignored for `Up` and `ToRoot`.
    ///
    /// # Errors
    ///
    /// [`OpcDaError::Remote`](opcda_core::OpcDaError::Remote) if the server
    /// rejects the move (for example an unknown child name); the mirror is
    /// left unchanged.
    pub fn change_position(&self, direction: BrowseDirection, name: &str) -> OpcDaResult<()> {
        let mut state = self.state.lock();
        self.move_cursor(&mut state, direction, name)
    }

    /// Returns the names from the root to the current position.
    pub fn position(&self) -> Vec<String> {
        self.state.lock().position.clone()
    }

    /// Lists names at the current position.
    ///
    /// Branches and items are returned as short names in hierarchical
    /// namespaces; use [`item_path_of`](Self::item_path_of) for full paths.
    pub fn list_item_paths(
        &self,
        browse_type: BrowseType,
        name_filter: Option<&str>,
    ) -> OpcDaResult<Vec<String>> {
        let _state = self.state.lock();
        self.list(browse_type, name_filter.unwrap_or(""))
    }

    /// Resolves a short name at the current position to its item path.
    pub fn item_path_of(&self, name: &str) -> OpcDaResult<String> {
        let _state = self.state.lock();
        let space = &self.space;
        self.gate
            .invoke(space.object_id(), "GetItemID", &name, || space.get_item_id(name))
    }

    /// Returns the number of branches whose name path is known.
    pub fn known_branches(&self) -> usize {
        self.state.lock().paths.len()
    }

    fn query_organization(&self, state: &mut CursorState) -> OpcDaResult<NamespaceType> {
        if let Some(namespace) = state.namespace {
            return Ok(namespace);
        }
        let space = &self.space;
        let namespace = self
            .gate
            .invoke(space.object_id(), "QueryOrganization", &(), || space.query_organization())?;
        state.namespace = Some(namespace);
        Ok(namespace)
    }

    fn move_cursor(
        &self,
        state: &mut CursorState,
        direction: BrowseDirection,
        name: &str,
    ) -> OpcDaResult<()> {
        let space = &self.space;
        self.gate.invoke(
            space.object_id(),
            "ChangeBrowsePosition",
            &(direction, name),
            || space.change_browse_position(direction, name),
        )?;

        match direction {
            BrowseDirection::ToRoot => state.position.clear(),
            BrowseDirection::Down => state.position.push(name.to_string()),
            BrowseDirection::Up => {
                state.position.pop();
            }
        }
        Ok(())
    }

    /// Moves to the root, then down along `names`.
    fn navigate(&self, state: &mut CursorState, names: &[String]) -> OpcDaResult<()> {
        self.move_cursor(state, BrowseDirection::ToRoot, "")?;
        for name in names {
            self.move_cursor(state, BrowseDirection::Down, name)?;
        }
        Ok(())
    }

    fn list(&self, browse_type: BrowseType, filter: &str) -> OpcDaResult<Vec<String>> {
        let space = &self.space;
        self.gate.invoke(
            space.object_id(),
            "BrowseOPCItemIDs",
            &(browse_type, filter),
            || space.browse_item_ids(browse_type, filter, VarType::EMPTY, AccessRights::ANY),
        )
    }

    /// Lists and resolves the branches at the current position.
    fn list_branches(
        &self,
        state: &mut CursorState,
        pattern: &str,
    ) -> OpcDaResult<Result<Vec<(String, String)>, StatusCode>> {
        let names = match self.list(BrowseType::Branches, pattern).recover_domain()? {
            Ok(names) => names,
            Err(status) => return Ok(Err(status)),
        };

        let mut branches = Vec::with_capacity(names.len());
        for name in names {
            let path = self.resolve_item_path(&name)?;
            branches.push((name, path));
        }
        let position = state.position.clone();
        state.remember(&position, &branches, pattern.is_empty() || pattern == "*");
        Ok(Ok(branches))
    }

    /// Moves the cursor onto the branch at `item_path`.
    ///
    /// Returns the names leading to it, or the status explaining why the
    /// branch could not be reached.
    fn locate(
        &self,
        state: &mut CursorState,
        item_path: &str,
    ) -> OpcDaResult<Result<Vec<String>, StatusCode>> {
        if let Some(names) = state.paths.get(item_path).cloned() {
            match self.navigate(state, &names).recover_domain()? {
                Ok(()) => return Ok(Ok(names)),
                Err(status) => {
                    tracing::debug!(item_path, status = %status, "Recorded path is stale");
                    state.forget(&names);
                }
            }
        }

        if let Err(status) = self.navigate(state, &[]).recover_domain()? {
            return Ok(Err(status));
        }
        let mut visited = HashSet::new();
        if self.search(state, item_path, &mut visited)? {
            return Ok(Ok(state.position.clone()));
        }
        tracing::debug!(item_path, "Item path not found below the root");
        Ok(Err(StatusCode::OPC_E_UNKNOWNITEMID))
    }

    /// Depth-first search for `target` below the current position.
    ///
    /// Leaves the cursor on the target when found.
    fn search(
        &self,
        state: &mut CursorState,
        target: &str,
        visited: &mut HashSet<String>,
    ) -> OpcDaResult<bool> {
        let branches = match self.list_branches(state, "")? {
            Ok(branches) => branches,
            Err(status) => {
                tracing::debug!(position = ?state.position, status = %status, "Branch listing failed");
                return Ok(false);
            }
        };

        if let Some((name, _)) = branches.iter().find(|(_, path)| path == target) {
            return Ok(self
                .move_cursor(state, BrowseDirection::Down, name)
                .recover_domain()?
                .is_ok());
        }

        let mut candidates: Vec<&(String, String)> = branches
            .iter()
            .filter(|(_, path)| visited.insert(path.clone()))
            .collect();
        // Stable: prefixes of the target first, longest first.
        candidates.sort_by_key(|(_, path)| {
            if is_path_prefix(path, target) {
                usize::MAX - path.len()
            } else {
                usize::MAX
            }
        });

        let parent = state.position.clone();
        for (name, _) in candidates {
            let mut names = parent.clone();
            names.push(name.clone());
            if let Err(status) = self.move_cursor(state, BrowseDirection::Down, name).recover_domain()? {
                tracing::debug!(names = ?names, status = %status, "Listed branch cannot be entered");
                state.forget(&names);
                continue;
            }
            if self.search(state, target, visited)? {
                return Ok(true);
            }
            if self.navigate(state, &parent).recover_domain()?.is_err() {
                return Ok(false);
            }
        }
        Ok(false)
    }

    fn resolve_item_path(&self, name: &str) -> OpcDaResult<String> {
        let space = &self.space;
        let resolved = self
            .gate
            .invoke(space.object_id(), "GetItemID", &name, || space.get_item_id(name))
            .recover_domain()?;
        Ok(resolved.unwrap_or_else(|status| {
            tracing::debug!(name, status = %status, "Item path not resolved, using name");
            name.to_string()
        }))
    }

    fn browse_locked(
        &self,
        state: &mut CursorState,
        item_path: &str,
        filter: &ElementFilter,
        query: Option<&PropertiesQuery>,
    ) -> OpcDaResult<BrowseResult> {
        if !filter.vendor_filter.is_empty() {
            tracing::debug!(
                vendor_filter = %filter.vendor_filter,
                "Vendor filter ignored by cursor-based browsing"
            );
        }

        let namespace = match self.query_organization(state).recover_domain()? {
            Ok(namespace) => namespace,
            Err(status) => return Ok(BrowseResult::truncated(Vec::new(), status, 0)),
        };

        let flat = namespace == NamespaceType::Flat;
        let names = if item_path.is_empty() {
            if let Err(status) = self.navigate(state, &[]).recover_domain()? {
                return Ok(BrowseResult::truncated(Vec::new(), status, 0));
            }
            Vec::new()
        } else if flat {
            tracing::debug!(item_path, "Flat namespaces have no branches");
            return Ok(BrowseResult::truncated(
                Vec::new(),
                StatusCode::OPC_E_UNKNOWNITEMID,
                0,
            ));
        } else {
            match self.locate(state, item_path)? {
                Ok(names) => names,
                Err(status) => return Ok(BrowseResult::truncated(Vec::new(), status, 0)),
            }
        };

        let pattern = filter.name_pattern.as_str();
        let mut pages = 0;
        let mut failure = None;

        let mut branches = Vec::new();
        if filter.element_kind != ElementKind::Items && !flat {
            match self.list_branches(state, pattern)? {
                Ok(listed) => {
                    pages += 1;
                    branches = listed;
                }
                Err(status) => failure = Some(status),
            }
        }

        let mut items = Vec::new();
        if failure.is_none() && filter.element_kind != ElementKind::Branches {
            let browse_type = if flat && names.is_empty() {
                BrowseType::Flat
            } else {
                BrowseType::Items
            };
            match self.list(browse_type, pattern).recover_domain()? {
                Ok(listed) => {
                    pages += 1;
                    items = listed;
                }
                Err(status) => failure = Some(status),
            }
        }

        let mut elements = Vec::with_capacity(branches.len() + items.len());
        for (name, path) in &branches {
            elements.push(BrowseElement::branch(name.as_str(), path.as_str()));
        }

        let branch_names: HashSet<&str> = branches.iter().map(|(name, _)| name.as_str()).collect();
        for name in &items {
            if branch_names.contains(name.as_str()) {
                if let Some(element) = elements.iter_mut().find(|e| e.name == *name) {
                    element.is_item = true;
                }
                continue;
            }
            // Flat listings already return full item paths.
            let path = if flat {
                name.clone()
            } else {
                self.resolve_item_path(name)?
            };
            elements.push(BrowseElement::item(name.as_str(), path));
        }

        if let Some(query) = query {
            self.attach_properties(&mut elements, query)?;
        }

        Ok(match failure {
            Some(status) => {
                tracing::warn!(item_path, pages, status = %status, "Browse truncated");
                BrowseResult::truncated(elements, status, pages)
            }
            None => BrowseResult::complete(elements),
        })
    }

    fn attach_properties(
        &self,
        elements: &mut [BrowseElement],
        query: &PropertiesQuery,
    ) -> OpcDaResult<()> {
        let targets: Vec<usize> = (0..elements.len()).filter(|&i| elements[i].is_item).collect();
        if targets.is_empty() {
            return Ok(());
        }

        let Some(resolver) = &self.properties else {
            for &i in &targets {
                elements[i].properties = ItemProperties::failed(StatusCode::OPC_E_NOTSUPPORTED);
            }
            return Ok(());
        };

        let paths: Vec<String> = targets.iter().map(|&i| elements[i].item_path.clone()).collect();
        let resolved = resolver.get_properties(&paths, query)?;
        for (&i, properties) in targets.iter().zip(resolved) {
            elements[i].properties = properties;
        }
        Ok(())
    }
}

impl ElementBrowser for PositionBrowser {
    fn name(&self) -> &'static str {
        "stateful"
    }

    fn browse(
        &self,
        item_path: &str,
        filter: &ElementFilter,
        query: Option<&PropertiesQuery>,
    ) -> OpcDaResult<BrowseResult> {
        let mut state = self.state.lock();
        self.browse_locked(&mut state, item_path, filter, query)
    }
}

impl fmt::Debug for PositionBrowser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("PositionBrowser")
            .field("space", &self.space.object_id())
            .field("position", &state.position)
            .field("known_branches", &state.paths.len())
            .field("properties", &self.properties.is_some())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browse::wildcard;
    use crate::health::{HealthChannel, HealthContext};
    use crate::transport::{CallResult, RemoteObject};

    /// Two-level tree: `Plant` holds `Line1` (branch and item) and `Speed`.
    struct CursorServer {
        namespace: NamespaceType,
        position: Mutex<Vec<String>>,
        fail_items: bool,
    }

    impl CursorServer {
        fn new(namespace: NamespaceType) -> Self {
            Self {
                namespace,
                position: Mutex::new(Vec::new()),
                fail_items: false,
            }
        }

        fn children(path: &[String]) -> (Vec<&'static str>, Vec<&'static str>) {
            match path.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
                [] => (vec!["Plant"], vec!["Version"]),
                ["Plant"] => (vec!["Line1"], vec!["Line1", "Speed"]),
                ["Plant", "Line1"] => (vec![], vec!["Count"]),
                _ => (vec![], vec![]),
            }
        }
    }

    impl RemoteObject for CursorServer {
        fn object_id(&self) -> &str {
            "cursor"
        }
    }

    impl ServerAddressSpace for CursorServer {
        fn query_organization(&self) -> CallResult<NamespaceType> {
            Ok(self.namespace)
        }

        fn change_browse_position(&self, direction: BrowseDirection, name: &str) -> CallResult<()> {
            let mut position = self.position.lock();
            match direction {
                BrowseDirection::ToRoot => position.clear(),
                BrowseDirection::Up => {
                    if position.pop().is_none() {
                        return Err(StatusCode::E_FAIL);
                    }
                }
                BrowseDirection::Down => {
                    if !Self::children(&position).0.iter().any(|child| *child == name) {
                        return Err(StatusCode::E_INVALIDARG);
                    }
                    position.push(name.to_string());
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
            let position = self.position.lock();
            let (branches, items) = Self::children(&position);
            let names = match browse_type {
                BrowseType::Branches => branches,
                BrowseType::Items => {
                    if self.fail_items {
                        return Err(StatusCode::OPC_E_INVALIDFILTER);
                    }
                    items
                }
                BrowseType::Flat => vec!["Plant.Speed", "Plant.Line1.Count", "Version"],
            };
            Ok(names
                .into_iter()
                .filter(|n| wildcard::matches(filter, n))
                .map(str::to_string)
                .collect())
        }

        fn get_item_id(&self, name: &str) -> CallResult<String> {
            let position = self.position.lock();
            let mut path = position.clone();
            path.push(name.to_string());
            Ok(path.join("."))
        }
    }

    fn gate() -> Arc<CallGate> {
        Arc::new(CallGate::new(Arc::new(HealthChannel::new()), HealthContext::default()))
    }

    #[test]
    fn test_cursor_mirror() {
        let browser = PositionBrowser::new(Arc::new(CursorServer::new(NamespaceType::Hierarchical)), gate());

        browser.change_position(BrowseDirection::Down, "Plant").unwrap();
        browser.change_position(BrowseDirection::Down, "Line1").unwrap();
        assert_eq!(browser.position(), vec!["Plant", "Line1"]);
        assert_eq!(browser.item_path_of("Count").unwrap(), "Plant.Line1.Count");

        browser.change_position(BrowseDirection::Up, "").unwrap();
        assert_eq!(browser.position(), vec!["Plant"]);

        let error = browser.change_position(BrowseDirection::Down, "Missing").unwrap_err();
        assert_eq!(error.status(), Some(StatusCode::E_INVALIDARG));
        assert_eq!(browser.position(), vec!["Plant"]);

        browser.change_position(BrowseDirection::ToRoot, "").unwrap();
        assert!(browser.position().is_empty());
    }

    #[test]
    fn test_list_item_paths_with_filter() {
        let browser = PositionBrowser::new(Arc::new(CursorServer::new(NamespaceType::Hierarchical)), gate());
        browser.change_position(BrowseDirection::Down, "Plant").unwrap();

        let items = browser.list_item_paths(BrowseType::Items, Some("S*")).unwrap();
        assert_eq!(items, vec!["Speed"]);
    }

    #[test]
    fn test_browse_merges_branch_and_item() {
        let browser = PositionBrowser::new(Arc::new(CursorServer::new(NamespaceType::Hierarchical)), gate());

        let root = browser.browse("", &ElementFilter::all(), None).unwrap();
        assert_eq!(root.names(), vec!["Plant", "Version"]);

        let plant = browser.browse("Plant", &ElementFilter::all(), None).unwrap();
        assert!(plant.is_complete());
        assert_eq!(plant.names(), vec!["Line1", "Speed"]);
        let line = &plant.elements[0];
        assert!(line.is_item && line.has_children);
        assert_eq!(line.item_path, "Plant.Line1");

        let line = browser.browse("Plant.Line1", &ElementFilter::items(), None).unwrap();
        assert_eq!(line.item_paths(), vec!["Plant.Line1.Count"]);
    }

    #[test]
    fn test_browse_resolves_unlisted_path() {
        let browser = PositionBrowser::new(Arc::new(CursorServer::new(NamespaceType::Hierarchical)), gate());

        let line = browser.browse("Plant.Line1", &ElementFilter::items(), None).unwrap();
        assert!(line.is_complete());
        assert_eq!(line.item_paths(), vec!["Plant.Line1.Count"]);
        assert_eq!(browser.position(), vec!["Plant", "Line1"]);
        assert_eq!(browser.known_branches(), 2);
    }

    #[test]
    fn test_path_prefix() {
        assert!(is_path_prefix("Plant", "Plant.Line1"));
        assert!(is_path_prefix("Plant", "Plant/Line1"));
        assert!(!is_path_prefix("Plant", "Plant"));
        assert!(!is_path_prefix("Plant", "Plant2.Line1"));
        assert!(!is_path_prefix("Line1", "Plant.Line1"));
    }

    #[test]
    fn test_unknown_path_is_truncated() {
        let browser = PositionBrowser::new(Arc::new(CursorServer::new(NamespaceType::Hierarchical)), gate());

        let result = browser.browse("Nowhere", &ElementFilter::all(), None).unwrap();
        assert!(result.is_empty());
        assert_eq!(result.completion.status(), Some(StatusCode::OPC_E_UNKNOWNITEMID));
    }

    #[test]
    fn test_flat_namespace() {
        let browser = PositionBrowser::new(Arc::new(CursorServer::new(NamespaceType::Flat)), gate());

        let result = browser.browse("", &ElementFilter::all(), None).unwrap();
        assert_eq!(result.len(), 3);
        assert!(result.elements.iter().all(|e| e.is_item && !e.has_children));

        let branches = browser.browse("", &ElementFilter::branches(), None).unwrap();
        assert!(branches.is_empty());
    }

    #[test]
    fn test_listing_failure_keeps_branches() {
        let server = CursorServer {
            fail_items: true,
            ..CursorServer::new(NamespaceType::Hierarchical)
        };
        let browser = PositionBrowser::new(Arc::new(server), gate());

        let result = browser.browse("", &ElementFilter::all(), None).unwrap();
        assert_eq!(result.names(), vec!["Plant"]);
        assert_eq!(
            result.completion,
            crate::browse::BrowseCompletion::Truncated {
                status: StatusCode::OPC_E_INVALIDFILTER,
                pages: 1
            }
        );
    }

    #[test]
    fn test_properties_without_resolver() {
        let browser = PositionBrowser::new(Arc::new(CursorServer::new(NamespaceType::Hierarchical)), gate());

        let result = browser
            .browse("", &ElementFilter::items(), Some(&PropertiesQuery::all()))
            .unwrap();
        assert_eq!(result.elements[0].properties.status, StatusCode::OPC_E_NOTSUPPORTED);
    }
}
