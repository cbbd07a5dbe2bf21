// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Fixtures
//!
//! The simulated address space and canned inputs.
//!
//! ## Simulation Address Space
//!
//! ```text
//! (root)
//! ├── Simulation Items                 branch
//! │   ├── Random.Int1                  item, properties 1-7, 100, 101
//! │   ├── Random.Int2                  item, properties 1-6, 100, 101 (no 7)
//! │   ├── Random.Real4                 item, properties 1-7, 100, 101
//! │   └── Bucket Brigade               branch
//! │       ├── Bucket Brigade.Int1      item
//! │       └── Bucket Brigade.Real8     item
//! ├── Configured Aliases               empty branch
//! └── Server.Version                   item
//! ```

use chrono::{TimeZone, Utc};
use opcda_core::{property_ids, BrowseElement, PropertiesQuery, VarType, Variant};

// =============================================================================
// Simulated Nodes
// =============================================================================

/// A property of a simulated item.
#[derive(Debug, Clone, PartialEq)]
pub struct SimProperty {
    /// Property id.
    pub id: u32,
    /// Description.
    pub description: String,
    /// Value type.
    pub data_type: VarType,
    /// Current value.
    pub value: Variant,
}

impl SimProperty {
    /// Creates a property.
    pub fn new(id: u32, description: &str, data_type: VarType, value: Variant) -> Self {
        Self {
            id,
            description: description.to_string(),
            data_type,
            value,
        }
    }
}

/// A node of the simulated address space.
#[derive(Debug, Clone, PartialEq)]
pub struct SimNode {
    /// Short name.
    pub name: String,
    /// Full item path; empty for the root.
    pub item_path: String,
    /// Whether the node is an item.
    pub is_item: bool,
    /// Children in server order.
    pub children: Vec<SimNode>,
    /// Item properties.
    pub properties: Vec<SimProperty>,
}

impl SimNode {
    /// Creates the root node.
    pub fn root(children: Vec<SimNode>) -> Self {
        Self::branch("", "", children)
    }

    /// Creates a branch.
    pub fn branch(name: &str, item_path: &str, children: Vec<SimNode>) -> Self {
        Self {
            name: name.to_string(),
            item_path: item_path.to_string(),
            is_item: false,
            children,
            properties: Vec::new(),
        }
    }

    /// Creates an item.
    pub fn item(name: &str, item_path: &str, properties: Vec<SimProperty>) -> Self {
        Self {
            name: name.to_string(),
            item_path: item_path.to_string(),
            is_item: true,
            children: Vec::new(),
            properties,
        }
    }

    /// Returns `true` if the node has children.
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Returns `true` if a cursor can move into the node.
    pub fn is_branch(&self) -> bool {
        self.has_children() || !self.is_item
    }

    /// Converts to a browse element without properties.
    pub fn to_element(&self) -> BrowseElement {
        BrowseElement {
            name: self.name.clone(),
            item_path: self.item_path.clone(),
            has_children: self.has_children(),
            is_item: self.is_item,
            properties: Default::default(),
        }
    }

    /// Finds a node by item path anywhere below (or at) this node.
    pub fn find(&self, item_path: &str) -> Option<&SimNode> {
        if self.item_path == item_path {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(item_path))
    }

    /// Finds a direct child by name.
    pub fn child(&self, name: &str) -> Option<&SimNode> {
        self.children.iter().find(|child| child.name == name)
    }

    /// Finds a property by id.
    pub fn property(&self, id: u32) -> Option<&SimProperty> {
        self.properties.iter().find(|property| property.id == id)
    }

    /// Returns every item at or below this node, depth first.
    pub fn items_below(&self) -> Vec<&SimNode> {
        let mut items = Vec::new();
        if self.is_item {
            items.push(self);
        }
        for child in &self.children {
            items.extend(child.items_below());
        }
        items
    }
}

// =============================================================================
// Address Space Fixtures
// =============================================================================

/// Fixture providing simulated address spaces.
pub struct AddressSpaceFixtures;

impl AddressSpaceFixtures {
    /// The branch holding the random items.
    pub const SIMULATION_ITEMS: &'static str = "Simulation Items";

    /// The nested branch.
    pub const BUCKET_BRIGADE: &'static str = "Bucket Brigade";

    /// The empty branch.
    pub const CONFIGURED_ALIASES: &'static str = "Configured Aliases";

    /// Items whose properties the scenarios resolve.
    pub const RANDOM_ITEMS: [&'static str; 3] = ["Random.Int1", "Random.Int2", "Random.Real4"];

    /// The standard simulation address space.
    pub fn simulation() -> SimNode {
        SimNode::root(vec![
            SimNode::branch(
                Self::SIMULATION_ITEMS,
                Self::SIMULATION_ITEMS,
                vec![
                    SimNode::item(
                        "Random.Int1",
                        "Random.Int1",
                        PropertyFixtures::standard(VarType::I2, Variant::I2(17), true),
                    ),
                    SimNode::item(
                        "Random.Int2",
                        "Random.Int2",
                        PropertyFixtures::standard(VarType::I2, Variant::I2(-4), false),
                    ),
                    SimNode::item(
                        "Random.Real4",
                        "Random.Real4",
                        PropertyFixtures::standard(VarType::R4, Variant::R4(3.5), true),
                    ),
                    SimNode::branch(
                        Self::BUCKET_BRIGADE,
                        Self::BUCKET_BRIGADE,
                        vec![
                            SimNode::item(
                                "Bucket Brigade.Int1",
                                "Bucket Brigade.Int1",
                                PropertyFixtures::standard(VarType::I2, Variant::I2(0), true),
                            ),
                            SimNode::item(
                                "Bucket Brigade.Real8",
                                "Bucket Brigade.Real8",
                                PropertyFixtures::standard(VarType::R8, Variant::R8(0.25), true),
                            ),
                        ],
                    ),
                ],
            ),
            SimNode::branch(Self::CONFIGURED_ALIASES, Self::CONFIGURED_ALIASES, Vec::new()),
            SimNode::item(
                "Server.Version",
                "Server.Version",
                PropertyFixtures::standard(VarType::BSTR, Variant::from("1.0.0.0"), false),
            ),
        ])
    }

    /// The simulation space after a reconfiguration: "Bucket Brigade" moved
    /// to the root, "Configured Aliases" removed. Item paths are unchanged.
    pub fn reorganized() -> SimNode {
        let mut root = Self::simulation();
        root.children.retain(|child| child.name != Self::CONFIGURED_ALIASES);

        let mut moved = Vec::new();
        for child in &mut root.children {
            if let Some(index) = child.children.iter().position(|c| c.name == Self::BUCKET_BRIGADE) {
                moved.push(child.children.remove(index));
            }
        }
        root.children.extend(moved);
        root
    }

    /// A root with one branch holding `count` items named `Tag000`, `Tag001`, ...
    pub fn bulk(count: usize) -> SimNode {
        let items = (0..count)
            .map(|i| {
                let name = format!("Tag{i:03}");
                let path = format!("Bulk.{name}");
                SimNode::item(
                    &name,
                    &path,
                    PropertyFixtures::standard(VarType::I4, Variant::I4(i as i32), false),
                )
            })
            .collect();
        SimNode::root(vec![SimNode::branch("Bulk", "Bulk", items)])
    }
}

// =============================================================================
// Property Fixtures
// =============================================================================

/// Fixture providing property sets and queries.
pub struct PropertyFixtures;

impl PropertyFixtures {
    /// Properties 1-6, optionally 7, plus 100 and 101.
    pub fn standard(data_type: VarType, value: Variant, with_eu_type: bool) -> Vec<SimProperty> {
        let timestamp = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap_or_default();
        let mut properties = vec![
            SimProperty::new(
                property_ids::DATA_TYPE,
                "Item Canonical DataType",
                VarType::I2,
                Variant::I2(data_type.raw() as i16),
            ),
            SimProperty::new(property_ids::VALUE, "Item Value", data_type, value),
            SimProperty::new(property_ids::QUALITY, "Item Quality", VarType::I2, Variant::I2(192)),
            SimProperty::new(property_ids::TIMESTAMP, "Item Timestamp", VarType::DATE, Variant::Date(timestamp)),
            SimProperty::new(property_ids::ACCESS_RIGHTS, "Item Access Rights", VarType::I4, Variant::I4(3)),
            SimProperty::new(property_ids::SCAN_RATE, "Server Scan Rate", VarType::R4, Variant::R4(100.0)),
        ];
        if with_eu_type {
            properties.push(SimProperty::new(property_ids::EU_TYPE, "Item EU Type", VarType::I4, Variant::I4(0)));
        }
        properties.push(SimProperty::new(property_ids::EU_UNITS, "EU Units", VarType::BSTR, Variant::from("counts")));
        properties.push(SimProperty::new(
            property_ids::DESCRIPTION,
            "Item Description",
            VarType::BSTR,
            Variant::from("Simulated item"),
        ));
        properties
    }

    /// The six required properties with values.
    pub fn required_with_values() -> PropertiesQuery {
        PropertiesQuery::ids(property_ids::REQUIRED).with_values(true)
    }

    /// Data type plus EU type (id 7), which one random item lacks.
    pub fn with_eu_type() -> PropertiesQuery {
        PropertiesQuery::ids([property_ids::DATA_TYPE, property_ids::EU_TYPE]).with_values(true)
    }

    /// The random item paths as owned strings.
    pub fn random_paths() -> Vec<String> {
        AddressSpaceFixtures::RANDOM_ITEMS
            .iter()
            .map(|path| path.to_string())
            .collect()
    }
}

// =============================================================================
// Config Fixtures
// =============================================================================

/// Fixture providing configuration file contents.
pub struct ConfigFixtures;

impl ConfigFixtures {
    /// YAML configuration.
    pub fn yaml() -> &'static str {
        r#"
batch_size: 2
browse_mode: stateless
max_tree_depth: 4
trace_arguments: false
"#
    }

    /// TOML configuration.
    pub fn toml() -> &'static str {
        r#"
batch_size = 50
browse_mode = "stateful"
"#
    }

    /// JSON configuration.
    pub fn json() -> &'static str {
        r#"{ "batch_size": 10, "browse_mode": "auto", "locale_id": 1033 }"#
    }
}
