// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Address space data types.
//!
//! This module defines the values exchanged with a server while browsing:
//!
//! - [`BrowseElement`]: one node of the address space
//! - [`ElementFilter`] and [`ElementKind`]: what a browse call returns
//! - [`PropertiesQuery`], [`PropertyDescriptor`], [`ItemProperties`]:
//!   property resolution
//! - [`BrowsePage`] and [`ContinuationToken`]: one page of a paginated browse
//! - [`BrowseDirection`], [`BrowseType`], [`NamespaceType`],
//!   [`AccessRights`]: cursor-based browsing on legacy servers
//!
//! All types own their data. Nothing here refers back into server buffers.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::status::StatusCode;
use crate::value::{VarType, Variant};

// =============================================================================
// Well-known Property IDs
// =============================================================================

/// Well-known property identifiers.
pub mod property_ids {
    /// Canonical data type of the item.
    pub const DATA_TYPE: u32 = 1;
    /// Current value.
    pub const VALUE: u32 = 2;
    /// Current quality.
    pub const QUALITY: u32 = 3;
    /// Timestamp of the current value.
    pub const TIMESTAMP: u32 = 4;
    /// Access rights.
    pub const ACCESS_RIGHTS: u32 = 5;
    /// Fastest rate the server can sample the item.
    pub const SCAN_RATE: u32 = 6;
    /// Engineering units type.
    pub const EU_TYPE: u32 = 7;
    /// Engineering units information.
    pub const EU_INFO: u32 = 8;
    /// Engineering units label.
    pub const EU_UNITS: u32 = 100;
    /// Item description.
    pub const DESCRIPTION: u32 = 101;
    /// High engineering limit.
    pub const HIGH_EU: u32 = 102;
    /// Low engineering limit.
    pub const LOW_EU: u32 = 103;
    /// High instrument range.
    pub const HIGH_IR: u32 = 104;
    /// Low instrument range.
    pub const LOW_IR: u32 = 105;
    /// Label for a closed contact.
    pub const CLOSE_LABEL: u32 = 106;
    /// Label for an open contact.
    pub const OPEN_LABEL: u32 = 107;
    /// Time zone of the item.
    pub const TIMEZONE: u32 = 108;
    /// Alarm condition status.
    pub const CONDITION_STATUS: u32 = 300;
    /// Alarm quick help.
    pub const ALARM_QUICK_HELP: u32 = 301;
    /// Alarm area list.
    pub const ALARM_AREA_LIST: u32 = 302;
    /// Primary alarm area.
    pub const PRIMARY_ALARM_AREA: u32 = 303;
    /// Condition logic.
    pub const CONDITION_LOGIC: u32 = 304;
    /// Limit exceeded.
    pub const LIMIT_EXCEEDED: u32 = 305;
    /// Deadband.
    pub const DEADBAND: u32 = 306;
    /// High-high limit.
    pub const HIHI_LIMIT: u32 = 307;
    /// High limit.
    pub const HI_LIMIT: u32 = 308;
    /// Low limit.
    pub const LO_LIMIT: u32 = 309;
    /// First vendor-specific id.
    pub const VENDOR_BASE: u32 = 5000;

    /// Ids `1..=6` every item exposes.
    pub const REQUIRED: [u32; 6] = [DATA_TYPE, VALUE, QUALITY, TIMESTAMP, ACCESS_RIGHTS, SCAN_RATE];

    /// Returns a short name for well-known ids.
    pub fn name(id: u32) -> Option<&'static str> {
        let name = match id {
            DATA_TYPE => "Item Canonical DataType",
            VALUE => "Item Value",
            QUALITY => "Item Quality",
            TIMESTAMP => "Item Timestamp",
            ACCESS_RIGHTS => "Item Access Rights",
            SCAN_RATE => "Server Scan Rate",
            EU_TYPE => "Item EU Type",
            EU_INFO => "Item EU Info",
            EU_UNITS => "EU Units",
            DESCRIPTION => "Item Description",
            HIGH_EU => "High EU",
            LOW_EU => "Low EU",
            HIGH_IR => "High Instrument Range",
            LOW_IR => "Low Instrument Range",
            CLOSE_LABEL => "Contact Close Label",
            OPEN_LABEL => "Contact Open Label",
            TIMEZONE => "Item Timezone",
            CONDITION_STATUS => "Condition Status",
            ALARM_QUICK_HELP => "Alarm Quick Help",
            ALARM_AREA_LIST => "Alarm Area List",
            PRIMARY_ALARM_AREA => "Primary Alarm Area",
            CONDITION_LOGIC => "Condition Logic",
            LIMIT_EXCEEDED => "Limit Exceeded",
            DEADBAND => "Deadband",
            HIHI_LIMIT => "HiHi Limit",
            HI_LIMIT => "Hi Limit",
            LO_LIMIT => "Lo Limit",
            _ => return None,
        };
        Some(name)
    }

    /// Returns `true` if the id is in the vendor range.
    pub fn is_vendor(id: u32) -> bool {
        id >= VENDOR_BASE
    }
}

// =============================================================================
// ElementKind / ElementFilter
// =============================================================================

/// Which kind of elements a browse call returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum ElementKind {
    /// Branches and items.
    #[default]
    All = 0,
    /// Branches only (elements with children).
    Branches = 1,
    /// Items only.
    Items = 2,
}

impl ElementKind {
    /// Returns the wire value.
    pub const fn value(self) -> u32 {
        self as u32
    }

    /// Parses a wire value.
    pub fn from_value(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::All),
            1 => Some(Self::Branches),
            2 => Some(Self::Items),
            _ => None,
        }
    }

    /// Returns `true` if an element with these flags passes the filter.
    ///
    /// A branch is an element with children or one that is not an item
    /// (an empty branch).
    pub fn admits(self, is_item: bool, has_children: bool) -> bool {
        match self {
            Self::All => true,
            Self::Branches => has_children || !is_item,
            Self::Items => is_item,
        }
    }
}

/// Element selection for a browse call.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ElementFilter {
    /// Kind of elements to return.
    #[serde(default)]
    pub element_kind: ElementKind,

    /// Wildcard pattern on element names; empty matches everything.
    #[serde(default)]
    pub name_pattern: String,

    /// Server-specific filter expression; empty for none.
    #[serde(default)]
    pub vendor_filter: String,
}

impl ElementFilter {
    /// Creates a filter for the given kind with no name pattern.
    pub fn new(element_kind: ElementKind) -> Self {
        Self {
            element_kind,
            ..Self::default()
        }
    }

    /// All elements.
    pub fn all() -> Self {
        Self::new(ElementKind::All)
    }

    /// Branches only.
    pub fn branches() -> Self {
        Self::new(ElementKind::Branches)
    }

    /// Items only.
    pub fn items() -> Self {
        Self::new(ElementKind::Items)
    }

    /// Sets the name pattern.
    pub fn with_name_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.name_pattern = pattern.into();
        self
    }

    /// Sets the vendor filter.
    pub fn with_vendor_filter(mut self, filter: impl Into<String>) -> Self {
        self.vendor_filter = filter.into();
        self
    }

    /// Returns the same filter restricted to another kind.
    pub fn with_kind(mut self, element_kind: ElementKind) -> Self {
        self.element_kind = element_kind;
        self
    }
}

// =============================================================================
// PropertiesQuery
// =============================================================================

/// Which properties to resolve, and whether to read their values.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PropertiesQuery {
    /// Return every property the item has; `property_ids` is ignored.
    #[serde(default)]
    pub return_all_properties: bool,

    /// Read property values.
    #[serde(default)]
    pub return_values: bool,

    /// Explicit property ids.
    #[serde(default)]
    pub property_ids: BTreeSet<u32>,
}

impl PropertiesQuery {
    /// Every property, without values.
    pub fn all() -> Self {
        Self {
            return_all_properties: true,
            ..Self::default()
        }
    }

    /// The given property ids, without values.
    pub fn ids(ids: impl IntoIterator<Item = u32>) -> Self {
        Self {
            property_ids: ids.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Sets whether to read values.
    pub fn with_values(mut self, return_values: bool) -> Self {
        self.return_values = return_values;
        self
    }

    /// Returns the ids to send, or `None` when every property is requested.
    pub fn requested_ids(&self) -> Option<&BTreeSet<u32>> {
        if self.return_all_properties {
            None
        } else {
            Some(&self.property_ids)
        }
    }

    /// Returns `true` if the query cannot select any property.
    pub fn selects_nothing(&self) -> bool {
        !self.return_all_properties && self.property_ids.is_empty()
    }
}

// =============================================================================
// PropertyDescriptor / ItemProperties
// =============================================================================

/// One resolved property of an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    /// Property id.
    pub property_id: u32,

    /// Item path under which the property can be read directly, if any.
    #[serde(default)]
    pub item_path: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,

    /// Value type.
    #[serde(default)]
    pub data_type: VarType,

    /// Value, present only when values were requested and readable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Variant>,

    /// Status of this property alone.
    #[serde(default)]
    pub status: StatusCode,
}

impl PropertyDescriptor {
    /// Creates a successful descriptor with no value.
    pub fn new(property_id: u32, description: impl Into<String>, data_type: VarType) -> Self {
        Self {
            property_id,
            item_path: String::new(),
            description: description.into(),
            data_type,
            value: None,
            status: StatusCode::S_OK,
        }
    }

    /// Creates a descriptor for a property that could not be resolved.
    pub fn failed(property_id: u32, status: StatusCode) -> Self {
        Self {
            property_id,
            item_path: String::new(),
            description: String::new(),
            data_type: VarType::EMPTY,
            value: None,
            status,
        }
    }

    /// Sets the item path.
    pub fn with_item_path(mut self, item_path: impl Into<String>) -> Self {
        self.item_path = item_path.into();
        self
    }

    /// Sets the value.
    pub fn with_value(mut self, value: Variant) -> Self {
        self.value = Some(value);
        self
    }

    /// Sets the status.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Returns `true` if this property resolved successfully.
    pub fn is_ok(&self) -> bool {
        self.status.succeeded()
    }
}

/// Properties resolved for one item.
///
/// `status` reports whether the item's property set could be resolved at all;
/// each descriptor carries its own independent status.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ItemProperties {
    /// Item-level status.
    #[serde(default)]
    pub status: StatusCode,

    /// Resolved properties, in server order.
    #[serde(default)]
    pub properties: Vec<PropertyDescriptor>,
}

impl ItemProperties {
    /// Successful result with the given properties.
    pub fn ok(properties: Vec<PropertyDescriptor>) -> Self {
        Self {
            status: StatusCode::S_OK,
            properties,
        }
    }

    /// Failed item with no properties.
    pub fn failed(status: StatusCode) -> Self {
        Self {
            status,
            properties: Vec::new(),
        }
    }

    /// Returns `true` if the item-level status succeeded.
    pub fn is_ok(&self) -> bool {
        self.status.succeeded()
    }

    /// Finds a property by id.
    pub fn get(&self, property_id: u32) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.property_id == property_id)
    }

    /// Returns the number of properties whose own status failed.
    pub fn failed_count(&self) -> usize {
        self.properties.iter().filter(|p| !p.is_ok()).count()
    }

    /// Drops every value; used when values were not requested.
    pub fn strip_values(&mut self) {
        for property in &mut self.properties {
            property.value = None;
        }
    }
}

// =============================================================================
// BrowseElement
// =============================================================================

/// A node of the server address space.
///
/// `is_item` and `has_children` are independent: an item may have children,
/// and an element with both flags false is an empty branch.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BrowseElement {
    /// Short name, unique among siblings.
    pub name: String,

    /// Full item path.
    pub item_path: String,

    /// Whether the element has children.
    #[serde(default)]
    pub has_children: bool,

    /// Whether the element is an item.
    #[serde(default)]
    pub is_item: bool,

    /// Inline properties, if requested.
    #[serde(default)]
    pub properties: ItemProperties,
}

impl BrowseElement {
    /// Creates a branch element.
    pub fn branch(name: impl Into<String>, item_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            item_path: item_path.into(),
            has_children: true,
            is_item: false,
            properties: ItemProperties::default(),
        }
    }

    /// Creates an item element.
    pub fn item(name: impl Into<String>, item_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            item_path: item_path.into(),
            has_children: false,
            is_item: true,
            properties: ItemProperties::default(),
        }
    }

    /// Sets the children flag.
    pub fn with_children(mut self, has_children: bool) -> Self {
        self.has_children = has_children;
        self
    }

    /// Sets the item flag.
    pub fn with_item(mut self, is_item: bool) -> Self {
        self.is_item = is_item;
        self
    }

    /// Sets inline properties.
    pub fn with_properties(mut self, properties: ItemProperties) -> Self {
        self.properties = properties;
        self
    }

    /// Returns `true` for an element that is neither item nor parent.
    pub fn is_empty_branch(&self) -> bool {
        !self.is_item && !self.has_children
    }

    /// Returns `true` if this element can be descended into.
    pub fn is_branch(&self) -> bool {
        ElementKind::Branches.admits(self.is_item, self.has_children)
    }
}

impl fmt::Display for BrowseElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match (self.is_item, self.has_children) {
            (true, true) => "item+branch",
            (true, false) => "item",
            (false, _) => "branch",
        };
        write!(f, "[{}] {} ({})", kind, self.name, self.item_path)
    }
}

// =============================================================================
// ContinuationToken / BrowsePage
// =============================================================================

/// Opaque server-issued handle for resuming a paginated browse.
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContinuationToken(Vec<u8>);

impl ContinuationToken {
    /// Wraps raw token bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns `true` for an empty token, which signals no further pages.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ContinuationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContinuationToken({} bytes)", self.0.len())
    }
}

impl From<&str> for ContinuationToken {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for ContinuationToken {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

/// Result of one browse call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BrowsePage {
    /// Elements of this page.
    pub elements: Vec<BrowseElement>,

    /// Whether the server holds more elements.
    #[serde(default)]
    pub more_available: bool,

    /// Token for the next page, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuation: Option<ContinuationToken>,
}

impl BrowsePage {
    /// A final page.
    pub fn last(elements: Vec<BrowseElement>) -> Self {
        Self {
            elements,
            more_available: false,
            continuation: None,
        }
    }

    /// A page followed by more.
    pub fn partial(elements: Vec<BrowseElement>, continuation: ContinuationToken) -> Self {
        Self {
            elements,
            more_available: true,
            continuation: Some(continuation),
        }
    }

    /// Returns the token to continue with.
    ///
    /// Pagination continues only when more elements are available *and* the
    /// server returned a non-empty token.
    pub fn next_token(&self) -> Option<&ContinuationToken> {
        if !self.more_available {
            return None;
        }
        self.continuation.as_ref().filter(|token| !token.is_empty())
    }
}

// =============================================================================
// Cursor Browsing
// =============================================================================

/// Cursor movement on servers with a stateful browse position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrowseDirection {
    /// Move up one level.
    Up,
    /// Move into the named child branch.
    Down,
    /// Move to the root (absolute).
    ToRoot,
}

impl BrowseDirection {
    /// Returns the wire value.
    pub const fn value(self) -> u32 {
        match self {
            Self::Up => 1,
            Self::Down => 2,
            Self::ToRoot => 3,
        }
    }
}

/// Listing mode at the current cursor position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrowseType {
    /// Child branches.
    Branches,
    /// Child items.
    Items,
    /// Every item below the position.
    Flat,
}

impl BrowseType {
    /// Returns the wire value.
    pub const fn value(self) -> u32 {
        match self {
            Self::Branches => 1,
            Self::Items => 2,
            Self::Flat => 3,
        }
    }
}

/// Shape of a legacy server's address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NamespaceType {
    /// Branches and items.
    #[default]
    Hierarchical,
    /// Items only, all at the root.
    Flat,
}

/// Item access rights bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessRights(u32);

impl AccessRights {
    /// No filter.
    pub const ANY: Self = Self(0);
    /// Readable.
    pub const READABLE: Self = Self(0x1);
    /// Writable.
    pub const WRITABLE: Self = Self(0x2);
    /// Readable and writable.
    pub const READ_WRITE: Self = Self(0x3);

    /// Creates from raw bits.
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns `true` if all bits of `other` are set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for AccessRights {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_kind_values() {
        assert_eq!(ElementKind::All.value(), 0);
        assert_eq!(ElementKind::Branches.value(), 1);
        assert_eq!(ElementKind::Items.value(), 2);
        assert_eq!(ElementKind::from_value(2), Some(ElementKind::Items));
        assert_eq!(ElementKind::from_value(3), None);
    }

    #[test]
    fn test_element_kind_admits() {
        // Items with children count as both.
        assert!(ElementKind::Branches.admits(true, true));
        assert!(ElementKind::Items.admits(true, true));
        // Empty branch.
        assert!(ElementKind::Branches.admits(false, false));
        assert!(!ElementKind::Items.admits(false, false));
        assert!(!ElementKind::Branches.admits(true, false));
    }

    #[test]
    fn test_properties_query_ids_ignored_for_all() {
        let query = PropertiesQuery {
            return_all_properties: true,
            return_values: false,
            property_ids: [1, 2].into_iter().collect(),
        };
        assert!(query.requested_ids().is_none());
        assert!(!query.selects_nothing());

        let empty = PropertiesQuery::ids([]);
        assert!(empty.selects_nothing());
    }

    #[test]
    fn test_item_properties_helpers() {
        let mut props = ItemProperties::ok(vec![
            PropertyDescriptor::new(1, "Item Canonical DataType", VarType::UI2).with_value(Variant::UI2(3)),
            PropertyDescriptor::failed(7, StatusCode::OPC_E_INVALID_PID),
        ]);
        assert!(props.is_ok());
        assert_eq!(props.failed_count(), 1);
        assert!(props.get(1).is_some_and(|p| p.value.is_some()));

        props.strip_values();
        assert!(props.properties.iter().all(|p| p.value.is_none()));
    }

    #[test]
    fn test_empty_branch() {
        let element = BrowseElement::branch("Empty", "Empty").with_children(false);
        assert!(element.is_empty_branch());
        assert!(element.is_branch());
        assert!(!BrowseElement::item("Int1", "Random.Int1").is_branch());
    }

    #[test]
    fn test_next_token_requires_both_signals() {
        let token = ContinuationToken::from("cp-1");
        assert_eq!(
            BrowsePage::partial(Vec::new(), token.clone()).next_token(),
            Some(&token)
        );

        let stale = BrowsePage {
            elements: Vec::new(),
            more_available: false,
            continuation: Some(token),
        };
        assert!(stale.next_token().is_none());

        let empty = BrowsePage {
            elements: Vec::new(),
            more_available: true,
            continuation: Some(ContinuationToken::default()),
        };
        assert!(empty.next_token().is_none());
    }

    #[test]
    fn test_access_rights() {
        let rights = AccessRights::READABLE | AccessRights::WRITABLE;
        assert_eq!(rights, AccessRights::READ_WRITE);
        assert!(rights.contains(AccessRights::READABLE));
        assert!(!AccessRights::READABLE.contains(AccessRights::WRITABLE));
    }

    #[test]
    fn test_property_id_names() {
        assert_eq!(property_ids::name(property_ids::VALUE), Some("Item Value"));
        assert!(property_ids::name(4999).is_none());
        assert!(property_ids::is_vendor(5001));
    }
}
