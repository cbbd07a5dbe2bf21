// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Status code description registry.
//!
//! The registry maps [`StatusCode`]s to human-readable descriptions. It is
//! seeded from the fixed [`WELL_KNOWN`](crate::status::WELL_KNOWN) table and
//! can be extended with vendor codes at runtime.
//!
//! # Vendor Range
//!
//! Vendor codes are failure codes in the interface facility whose offset lies
//! in `0x0200..=0xFFFF`:
//!
//! ```text
//! 0x8004_0000 | offset      offset ∈ [0x0200, 0xFFFF]
//! ```
//!
//! # Examples
//!
//! ```
//! use opcda_core::registry::StatusRegistry;
//!
//! let registry = StatusRegistry::new();
//! let code = registry.register_range(0x0300, "Tag quarantined").unwrap();
//!
//! assert!(code.failed());
//! assert_eq!(registry.describe(code), "Tag quarantined");
//! ```

use std::collections::HashMap;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::error::ValidationError;
use crate::status::{StatusCode, WELL_KNOWN};

/// Lowest offset a vendor may register.
pub const VENDOR_OFFSET_MIN: u32 = 0x0200;

/// Highest offset a vendor may register.
pub const VENDOR_OFFSET_MAX: u32 = 0xFFFF;

const VENDOR_BASE: u32 = 0x8004_0000;

static GLOBAL: Lazy<StatusRegistry> = Lazy::new(StatusRegistry::new);

// =============================================================================
// StatusRegistry
// =============================================================================

/// Thread-safe table of status descriptions.
#[derive(Debug)]
pub struct StatusRegistry {
    entries: RwLock<HashMap<StatusCode, String>>,
}

impl StatusRegistry {
    /// Creates a registry seeded with the well-known codes.
    pub fn new() -> Self {
        let entries = WELL_KNOWN
            .iter()
            .map(|entry| (entry.code, entry.description.to_string()))
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Creates a registry with no entries.
    pub fn empty() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the shared process-wide registry.
    pub fn global() -> &'static StatusRegistry {
        &GLOBAL
    }

    /// Returns the registered description, or a numeric fallback.
    pub fn describe(&self, code: StatusCode) -> String {
        self.lookup(code)
            .unwrap_or_else(|| format!("Unknown status 0x{:08X}", code.bits()))
    }

    /// Returns the registered description, if any.
    pub fn lookup(&self, code: StatusCode) -> Option<String> {
        self.entries.read().get(&code).cloned()
    }

    /// Registers or replaces the description of an arbitrary code.
    pub fn register(&self, code: StatusCode, description: impl Into<String>) {
        self.entries.write().insert(code, description.into());
    }

    /// Registers a vendor failure code at `base_offset`.
    ///
    /// Registering the same offset again replaces the description and
    /// returns the same code.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::OffsetOutOfRange`] if `base_offset` lies
    /// outside `0x0200..=0xFFFF`.
    pub fn register_range(
        &self,
        base_offset: u32,
        description: impl Into<String>,
    ) -> Result<StatusCode, ValidationError> {
        let code = Self::vendor_code(base_offset)?;
        let description = description.into();
        tracing::debug!(
            code = %format_args!("0x{:08X}", code.bits()),
            description = %description,
            "Registered vendor status"
        );
        self.register(code, description);
        Ok(code)
    }

    /// Builds the vendor code for `base_offset` without registering it.
    pub fn vendor_code(base_offset: u32) -> Result<StatusCode, ValidationError> {
        if !(VENDOR_OFFSET_MIN..=VENDOR_OFFSET_MAX).contains(&base_offset) {
            return Err(ValidationError::OffsetOutOfRange {
                offset: base_offset,
                min: VENDOR_OFFSET_MIN,
                max: VENDOR_OFFSET_MAX,
            });
        }
        Ok(StatusCode::from_bits(VENDOR_BASE | base_offset))
    }

    /// Returns the number of registered codes.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for StatusRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
