// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Address space browsing.
//!
//! Servers offer one of two incompatible navigation paradigms. Both are
//! exposed through the common [`ElementBrowser`] capability, and
//! [`BrowseStrategy`] picks one per server.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    ElementBrowser (trait)                       │
//! │          browse(item_path, filter, query) -> BrowseResult       │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!          ┌───────────────────┴───────────────────┐
//!          ▼                                       ▼
//! ┌──────────────────────┐              ┌──────────────────────┐
//! │ AddressSpaceBrowser  │              │   PositionBrowser    │
//! │ paginated, tokens    │              │ server-side cursor   │
//! └──────────────────────┘              └──────────────────────┘
//!          ▲                                       ▲
//!          └──────────── BrowseStrategy ───────────┘
//!                     (selected per server)
//!
//!   TreeWalker: depth-first walk over any ElementBrowser
//! ```
//!
//! # Partial Results
//!
//! A domain failure part way through a browse does not discard what was
//! already received. The elements come back with
//! [`BrowseCompletion::Truncated`] so the caller can tell a short listing
//! from a complete one.

use std::fmt;

use serde::{Deserialize, Serialize};

use opcda_core::{BrowseElement, ElementFilter, OpcDaResult, PropertiesQuery, StatusCode};

pub mod stateful;
pub mod stateless;
pub mod strategy;
pub mod tree;
pub mod wildcard;

pub use stateful::PositionBrowser;
pub use stateless::{AddressSpaceBrowser, BrowseIter, ContinuationGuard};
pub use strategy::BrowseStrategy;
pub use tree::{BrowseTree, BrowseTreeNode, TreeWalker, Truncation};

// =============================================================================
// ElementBrowser
// =============================================================================

/// Enumerates the elements under an item path.
pub trait ElementBrowser: Send + Sync {
    /// Returns the browser name for logging.
    fn name(&self) -> &'static str;

    /// Lists elements under `item_path` (`""` is the root).
    ///
    /// `query = None` requests no properties.
    ///
    /// # Errors
    ///
    /// Validation and transport failures. Domain failures yield a truncated
    /// [`BrowseResult`].
    fn browse(
        &self,
        item_path: &str,
        filter: &ElementFilter,
        query: Option<&PropertiesQuery>,
    ) -> OpcDaResult<BrowseResult>;
}

// =============================================================================
// BrowseCompletion / BrowseResult
// =============================================================================

/// Whether a browse returned everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BrowseCompletion {
    /// All elements were returned.
    #[default]
    Complete,

    /// A call failed; only the elements received before it are present.
    Truncated {
        /// Status of the failed call.
        status: StatusCode,
        /// Calls that succeeded before the failure.
        pages: usize,
    },
}

impl BrowseCompletion {
    /// Returns `true` for [`BrowseCompletion::Complete`].
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }

    /// Returns the failure status of a truncated browse.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Complete => None,
            Self::Truncated { status, .. } => Some(*status),
        }
    }
}

/// Elements returned by a browse, with a completion flag.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BrowseResult {
    /// Elements in server order.
    pub elements: Vec<BrowseElement>,

    /// Whether the listing is complete.
    #[serde(default)]
    pub completion: BrowseCompletion,
}

impl BrowseResult {
    /// Creates a result.
    pub fn new(elements: Vec<BrowseElement>, completion: BrowseCompletion) -> Self {
        Self { elements, completion }
    }

    /// A complete result.
    pub fn complete(elements: Vec<BrowseElement>) -> Self {
        Self::new(elements, BrowseCompletion::Complete)
    }

    /// A truncated result.
    pub fn truncated(elements: Vec<BrowseElement>, status: StatusCode, pages: usize) -> Self {
        Self::new(elements, BrowseCompletion::Truncated { status, pages })
    }

    /// Returns `true` if nothing was cut off.
    pub fn is_complete(&self) -> bool {
        self.completion.is_complete()
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns `true` if there are no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Returns the element names.
    pub fn names(&self) -> Vec<&str> {
        self.elements.iter().map(|e| e.name.as_str()).collect()
    }

    /// Returns the element item paths.
    pub fn item_paths(&self) -> Vec<&str> {
        self.elements.iter().map(|e| e.item_path.as_str()).collect()
    }

    /// Consumes the result, returning the elements.
    pub fn into_elements(self) -> Vec<BrowseElement> {
        self.elements
    }
}

impl fmt::Display for BrowseResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.completion {
            BrowseCompletion::Complete => write!(f, "{} elements", self.elements.len()),
            BrowseCompletion::Truncated { status, pages } => write!(
                f,
                "{} elements, truncated after {} calls: {}",
                self.elements.len(),
                pages,
                status
            ),
        }
    }
}

impl IntoIterator for BrowseResult {
    type Item = BrowseElement;
    type IntoIter = std::vec::IntoIter<BrowseElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_status() {
        assert!(BrowseCompletion::Complete.is_complete());
        let truncated = BrowseCompletion::Truncated {
            status: StatusCode::E_FAIL,
            pages: 2,
        };
        assert!(!truncated.is_complete());
        assert_eq!(truncated.status(), Some(StatusCode::E_FAIL));
    }

    #[test]
    fn test_result_accessors() {
        let result = BrowseResult::truncated(
            vec![BrowseElement::branch("Simulation Items", "Simulation Items")],
            StatusCode::OPC_E_INVALIDCONTINUATIONPOINT,
            1,
        );
        assert_eq!(result.names(), vec!["Simulation Items"]);
        assert!(!result.is_complete());
        assert!(result.to_string().contains("truncated after 1 calls"));
        assert_eq!(result.into_elements().len(), 1);
    }
}
