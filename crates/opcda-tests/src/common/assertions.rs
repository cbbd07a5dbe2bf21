// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Custom Test Assertions
//!
//! Assertion helpers for browse and property results.

use std::collections::BTreeSet;

use opcda_client::{BrowseCompletion, BrowseResult};
use opcda_core::{ItemProperties, OpcDaError, StatusCode};

// =============================================================================
// BrowseResult Assertions
// =============================================================================

/// Assertion extensions for [`BrowseResult`].
pub trait BrowseResultAssertions {
    /// Assert that no page was lost.
    fn assert_complete(&self);

    /// Assert a truncation with the given status.
    fn assert_truncated(&self, status: StatusCode);

    /// Assert the element names, in order.
    fn assert_names(&self, expected: &[&str]);

    /// Returns the item paths as a set.
    fn path_set(&self) -> BTreeSet<String>;
}

impl BrowseResultAssertions for BrowseResult {
    fn assert_complete(&self) {
        assert!(
            self.is_complete(),
            "Expected a complete browse, got {:?}",
            self.completion
        );
    }

    fn assert_truncated(&self, status: StatusCode) {
        match self.completion {
            BrowseCompletion::Truncated { status: actual, .. } => assert_eq!(
                actual, status,
                "Expected truncation with {status}, got {actual}"
            ),
            BrowseCompletion::Complete => panic!("Expected truncation with {status}, browse was complete"),
        }
    }

    fn assert_names(&self, expected: &[&str]) {
        assert_eq!(self.names(), expected, "Unexpected element names");
    }

    fn path_set(&self) -> BTreeSet<String> {
        self.elements.iter().map(|e| e.item_path.clone()).collect()
    }
}

// =============================================================================
// ItemProperties Assertions
// =============================================================================

/// Assertion extensions for [`ItemProperties`].
pub trait ItemPropertiesAssertions {
    /// Assert a successful item with every property successful.
    fn assert_all_ok(&self);

    /// Assert the property ids, in order.
    fn assert_ids(&self, expected: &[u32]);

    /// Assert that no descriptor carries a value.
    fn assert_no_values(&self);

    /// Assert that every successful descriptor carries a value.
    fn assert_values_present(&self);
}

impl ItemPropertiesAssertions for ItemProperties {
    fn assert_all_ok(&self) {
        assert!(self.is_ok(), "Item failed: {}", self.status);
        for property in &self.properties {
            assert!(
                property.is_ok(),
                "Property {} failed: {}",
                property.property_id,
                property.status
            );
        }
    }

    fn assert_ids(&self, expected: &[u32]) {
        let ids: Vec<u32> = self.properties.iter().map(|p| p.property_id).collect();
        assert_eq!(ids, expected, "Unexpected property ids");
    }

    fn assert_no_values(&self) {
        for property in &self.properties {
            assert!(
                property.value.is_none(),
                "Property {} carries a value",
                property.property_id
            );
        }
    }

    fn assert_values_present(&self) {
        for property in self.properties.iter().filter(|p| p.is_ok()) {
            assert!(
                property.value.is_some(),
                "Property {} has no value",
                property.property_id
            );
        }
    }
}

// =============================================================================
// Error Assertions
// =============================================================================

/// Assert that `error` is a transport failure with `status`.
pub fn assert_transport(error: &OpcDaError, status: StatusCode) {
    assert!(error.is_transport(), "Expected a transport error, got {error}");
    assert_eq!(error.status(), Some(status));
}

/// Assert that `error` is a remote domain failure with `status`.
pub fn assert_remote(error: &OpcDaError, status: StatusCode) {
    assert!(
        matches!(error, OpcDaError::Remote(_)),
        "Expected a remote error, got {error}"
    );
    assert_eq!(error.status(), Some(status));
}
