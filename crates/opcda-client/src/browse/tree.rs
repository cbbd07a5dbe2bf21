// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Recursive depth-first walk over any [`ElementBrowser`].
//!
//! At each path the walker lists branches, descends into each branch in
//! order, and then lists the items at the path. A cursor-based browser needs
//! this order: a child is finished before its next sibling is visited.
//!
//! There is no cycle detection. Servers whose address space contains cycles
//! must be walked with a depth limit.

use std::fmt;

use serde::Serialize;

use opcda_core::{BrowseElement, ElementFilter, OpcDaResult, PropertiesQuery, StatusCode};

use crate::browse::{BrowseCompletion, ElementBrowser};

// =============================================================================
// BrowseTree
// =============================================================================

/// One element and everything below it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrowseTreeNode {
    /// The element.
    pub element: BrowseElement,
    /// Children in browse order: branches first, then items.
    pub children: Vec<BrowseTreeNode>,
}

impl BrowseTreeNode {
    fn leaf(element: BrowseElement) -> Self {
        Self {
            element,
            children: Vec::new(),
        }
    }

    /// Returns the number of nodes in this subtree, including this one.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Self::count).sum::<usize>()
    }

    /// Finds a node by item path.
    pub fn find(&self, item_path: &str) -> Option<&BrowseTreeNode> {
        if self.element.item_path == item_path {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(item_path))
    }
}

/// A browse truncated during a walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Truncation {
    /// Path whose listing is incomplete.
    pub item_path: String,
    /// Status of the failed call.
    pub status: StatusCode,
}

/// Result of a walk.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BrowseTree {
    /// Top-level nodes under the starting path.
    pub roots: Vec<BrowseTreeNode>,
    /// Paths whose listing was cut short.
    pub truncations: Vec<Truncation>,
    /// Whether the depth limit stopped the walk somewhere.
    pub depth_limited: bool,
}

impl BrowseTree {
    /// Returns `true` if every listing was complete and no limit was hit.
    pub fn is_complete(&self) -> bool {
        self.truncations.is_empty() && !self.depth_limited
    }

    /// Returns the total number of nodes.
    pub fn count(&self) -> usize {
        self.roots.iter().map(BrowseTreeNode::count).sum()
    }

    /// Finds a node by item path.
    pub fn find(&self, item_path: &str) -> Option<&BrowseTreeNode> {
        self.roots.iter().find_map(|root| root.find(item_path))
    }

    /// Returns every item path in depth-first order.
    pub fn item_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        let mut stack: Vec<&BrowseTreeNode> = self.roots.iter().rev().collect();
        while let Some(node) = stack.pop() {
            if node.element.is_item {
                paths.push(node.element.item_path.clone());
            }
            stack.extend(node.children.iter().rev());
        }
        paths
    }
}

impl fmt::Display for BrowseTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_node(f: &mut fmt::Formatter<'_>, node: &BrowseTreeNode, depth: usize) -> fmt::Result {
            writeln!(f, "{:indent$}{}", "", node.element, indent = depth * 2)?;
            for child in &node.children {
                write_node(f, child, depth + 1)?;
            }
            Ok(())
        }

        for root in &self.roots {
            write_node(f, root, 0)?;
        }
        Ok(())
    }
}

// =============================================================================
// TreeWalker
// =============================================================================

/// Depth-first walker.
pub struct TreeWalker<'a, B: ElementBrowser + ?Sized> {
    browser: &'a B,
    name_pattern: String,
    query: Option<PropertiesQuery>,
    max_depth: Option<usize>,
}

impl<'a, B: ElementBrowser + ?Sized> TreeWalker<'a, B> {
    /// Creates an unbounded walker without properties.
    pub fn new(browser: &'a B) -> Self {
        Self {
            browser,
            name_pattern: String::new(),
            query: None,
            max_depth: None,
        }
    }

    /// Requests inline properties for items.
    pub fn with_query(mut self, query: PropertiesQuery) -> Self {
        self.query = Some(query);
        self
    }

    /// Limits how many levels below the starting path are browsed.
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Restricts items to names matching `pattern`. Branches are not
    /// filtered, so matching items deep in the tree are still reached.
    pub fn with_name_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.name_pattern = pattern.into();
        self
    }

    /// Walks everything below `item_path` into an owned tree.
    ///
    /// # Errors
    ///
    /// The first transport, protocol or validation error aborts the walk.
    pub fn walk(&self, item_path: &str) -> OpcDaResult<BrowseTree> {
        let mut tree = BrowseTree::default();
        let roots = self.walk_level(item_path, 0, &mut tree)?;
        tree.roots = roots;
        tracing::debug!(
            item_path,
            browser = self.browser.name(),
            nodes = tree.count(),
            truncations = tree.truncations.len(),
            "Tree walk completed"
        );
        Ok(tree)
    }

    /// Calls `visit(depth, element)` for every element, depth first.
    ///
    /// Returns the truncations encountered.
    pub fn visit<F>(&self, item_path: &str, mut visit: F) -> OpcDaResult<Vec<Truncation>>
    where
        F: FnMut(usize, &BrowseElement),
    {
        let tree = self.walk(item_path)?;
        fn each<F: FnMut(usize, &BrowseElement)>(nodes: &[BrowseTreeNode], depth: usize, visit: &mut F) {
            for node in nodes {
                visit(depth, &node.element);
                each(&node.children, depth + 1, visit);
            }
        }
        each(&tree.roots, 0, &mut visit);
        Ok(tree.truncations)
    }

    fn walk_level(
        &self,
        item_path: &str,
        depth: usize,
        tree: &mut BrowseTree,
    ) -> OpcDaResult<Vec<BrowseTreeNode>> {
        let branches = self.browser.browse(item_path, &ElementFilter::branches(), None)?;
        self.note(item_path, branches.completion, tree);

        let mut nodes = Vec::with_capacity(branches.len());
        for element in branches.elements {
            let mut node = BrowseTreeNode::leaf(element);
            if self.max_depth.map_or(true, |max| depth < max) {
                node.children = self.walk_level(&node.element.item_path, depth + 1, tree)?;
            } else {
                tree.depth_limited = true;
            }
            nodes.push(node);
        }

        let filter = ElementFilter::items().with_name_pattern(self.name_pattern.as_str());
        let items = self.browser.browse(item_path, &filter, self.query.as_ref())?;
        self.note(item_path, items.completion, tree);

        for element in items.elements {
            // Elements that are both branch and item already appear as branches.
            if let Some(node) = nodes.iter_mut().find(|n| n.element.item_path == element.item_path) {
                node.element.is_item = true;
                node.element.properties = element.properties;
                continue;
            }
            nodes.push(BrowseTreeNode::leaf(element));
        }
        Ok(nodes)
    }

    fn note(&self, item_path: &str, completion: BrowseCompletion, tree: &mut BrowseTree) {
        if let BrowseCompletion::Truncated { status, .. } = completion {
            tracing::warn!(item_path, status = %status, "Listing truncated during walk");
            tree.truncations.push(Truncation {
                item_path: item_path.to_string(),
                status,
            });
        }
    }
}

impl<B: ElementBrowser + ?Sized> fmt::Debug for TreeWalker<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeWalker")
            .field("browser", &self.browser.name())
            .field("name_pattern", &self.name_pattern)
            .field("query", &self.query)
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
