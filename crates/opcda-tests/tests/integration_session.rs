// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Session Integration Tests
//!
//! Strategy selection, server discovery and whole-tree walks.

use std::sync::Arc;

use opcda_client::{
    BrowseMode, ClientConfig, ClientSession, DaVersion, DiscoveryChain, DiscoveryStrategy,
    ElementBrowser, HealthContext, ServerCapabilities, ServerDescriptor, StaticDiscovery,
};
use opcda_core::{
    CapabilityError, ElementFilter, OpcDaError, OpcDaResult, PropertiesQuery, StatusCode,
    ValidationError,
};

use opcda_tests::prelude::*;

fn try_session(server: &SimulatedServer, config: ClientConfig) -> OpcDaResult<ClientSession> {
    ClientSession::new(Arc::new(server.clone()), config, HealthContext::labeled("session-tests"))
}

fn address_space_only() -> SimulatedServer {
    SimulatedServer::new(
        AddressSpaceFixtures::simulation(),
        ServerCapabilities {
            browse: false,
            address_space: true,
            item_properties: false,
        },
    )
}

// =============================================================================
// Strategy Selection
// =============================================================================

#[test]
fn test_auto_prefers_paginated_browsing() {
    init_test_logging();
    let session = SimulatedServer::full().session(ClientConfig::default());

    assert!(session.browser().is_stateless());
    assert_eq!(session.browser().name(), "stateless");
    assert_eq!(session.server_id(), SimulatedServer::SERVER_ID);
}

#[test]
fn test_auto_falls_back_to_cursor() {
    init_test_logging();
    let session = SimulatedServer::legacy().session(ClientConfig::default());

    assert!(!session.browser().is_stateless());
    assert!(session.browser().as_stateful().is_some());
    assert!(session.properties().is_some());
}

#[test]
fn test_explicit_modes() {
    init_test_logging();
    let full = SimulatedServer::full();

    let stateful = full.session(ClientConfig::default().with_browse_mode(BrowseMode::Stateful));
    assert_eq!(stateful.browser().to_string(), "stateful");

    let stateless = full.session(ClientConfig::default().with_browse_mode(BrowseMode::Stateless));
    assert_eq!(stateless.browser().to_string(), "stateless");
    assert_eq!(
        stateless.browser().as_stateless().unwrap().batch_size(),
        stateless.config().batch_size
    );
}

#[test]
fn test_missing_capability_rejected() {
    init_test_logging();
    let cases = [
        (SimulatedServer::modern(), BrowseMode::Stateful),
        (SimulatedServer::legacy(), BrowseMode::Stateless),
        (
            SimulatedServer::new(AddressSpaceFixtures::simulation(), ServerCapabilities::default()),
            BrowseMode::Auto,
        ),
    ];

    for (server, mode) in cases {
        let error = try_session(&server, ClientConfig::default().with_browse_mode(mode)).unwrap_err();
        assert!(
            matches!(error, OpcDaError::Capability(CapabilityError::NotSupported { .. })),
            "mode {mode}: got {error}"
        );
        assert!(server.calls().is_empty());
    }
}

#[test]
fn test_zero_batch_size_rejected() {
    init_test_logging();
    let error = try_session(&SimulatedServer::modern(), ClientConfig::default().with_batch_size(0))
        .unwrap_err();
    assert!(matches!(error, OpcDaError::Validation(ValidationError::ZeroBatchSize)));
}

#[test]
fn test_cursor_without_property_interface() {
    init_test_logging();
    let session = address_space_only().session(ClientConfig::default());
    assert!(session.properties().is_none());

    session.browse("", &ElementFilter::all(), None).unwrap();
    let result = session
        .browse(
            AddressSpaceFixtures::SIMULATION_ITEMS,
            &ElementFilter::items(),
            Some(&PropertiesQuery::all()),
        )
        .unwrap();

    result.assert_complete();
    assert_eq!(result.len(), 3);
    for element in &result.elements {
        assert_eq!(element.properties.status, StatusCode::OPC_E_NOTSUPPORTED);
    }
}

// =============================================================================
// Tree Walks
// =============================================================================

#[test]
fn test_walk_tree_with_properties() {
    init_test_logging();
    for server in [SimulatedServer::modern(), SimulatedServer::legacy()] {
        let session = server.session(ClientConfig::default().with_batch_size(3));
        let tree = session
            .walk_tree("", Some(PropertiesQuery::ids([1, 2]).with_values(true)))
            .unwrap();

        assert!(tree.is_complete());
        let item = tree.find("Bucket Brigade.Real8").unwrap();
        assert!(item.children.is_empty());
        item.element.properties.assert_all_ok();
        item.element.properties.assert_ids(&[1, 2]);

        let branch = tree.find(AddressSpaceFixtures::BUCKET_BRIGADE).unwrap();
        assert_eq!(branch.children.len(), 2);
        assert_eq!(branch.count(), 3);
    }
}

#[test]
fn test_walk_tree_from_subtree() {
    init_test_logging();
    let session = SimulatedServer::modern().session(ClientConfig::default());
    let tree = session
        .walk_tree(AddressSpaceFixtures::SIMULATION_ITEMS, None)
        .unwrap();

    assert_eq!(tree.roots.len(), 4);
    assert_eq!(tree.count(), 6);
    assert!(tree.to_string().contains("Bucket Brigade"));
}

#[test]
fn test_walk_tree_records_truncations() {
    init_test_logging();
    let server = SimulatedServer::modern();
    // The third listing is the branch query below "Bucket Brigade".
    server.fail_nth("Browse", 2, StatusCode::E_ACCESSDENIED);
    let session = server.session(ClientConfig::default());

    let tree = session.walk_tree("", None).unwrap();

    assert!(!tree.is_complete());
    assert_eq!(tree.truncations.len(), 1);
    assert_eq!(tree.truncations[0].item_path, AddressSpaceFixtures::BUCKET_BRIGADE);
    assert_eq!(tree.truncations[0].status, StatusCode::E_ACCESSDENIED);
    assert!(tree.find("Bucket Brigade.Int1").is_some());
}

#[test]
fn test_walk_tree_aborts_on_transport_failure() {
    init_test_logging();
    let server = SimulatedServer::legacy();
    server.fail_nth("BrowseOPCItemIDs", 3, StatusCode::RPC_E_SERVER_DIED);
    let session = server.session(ClientConfig::default());

    let error = session.walk_tree("", None).unwrap_err();
    assert_transport(&error, StatusCode::RPC_E_SERVER_DIED);
    assert_eq!(session.gate().stats().health_events(), 1);
}

// =============================================================================
// Discovery
// =============================================================================

struct FailingDiscovery;

impl DiscoveryStrategy for FailingDiscovery {
    fn name(&self) -> &str {
        "registry"
    }

    fn discover(&self, host: &str) -> OpcDaResult<Vec<ServerDescriptor>> {
        Err(OpcDaError::remote(host, "EnumClassesOfCategories", StatusCode::E_ACCESSDENIED))
    }
}

fn simulation_descriptor() -> ServerDescriptor {
    ServerDescriptor::new(SimulatedServer::SERVER_ID)
        .with_vendor("Matrikon")
        .with_version(DaVersion::Da2)
        .with_version(DaVersion::Da3)
}

#[test]
fn test_discovery_falls_through() {
    init_test_logging();
    let chain = DiscoveryChain::new()
        .with_strategy(FailingDiscovery)
        .with_strategy(StaticDiscovery::new(Vec::new()))
        .with_strategy(StaticDiscovery::new(vec![
            simulation_descriptor(),
            ServerDescriptor::new("Legacy.Server.1").with_version(DaVersion::Da1),
        ]));

    let report = chain.discover("plant-host").unwrap();

    assert_eq!(report.strategy, "static");
    assert_eq!(report.attempts.len(), 2);
    assert!(report.attempts[0].starts_with("registry: "));
    assert_eq!(report.attempts[1], "static: no servers");
    assert_eq!(report.supporting(DaVersion::Da3).len(), 1);
    assert!(report.find("matrikon.opc.simulation.1").is_some());
}

#[test]
fn test_discovery_exhausted() {
    init_test_logging();
    let chain = DiscoveryChain::new()
        .with_strategy(FailingDiscovery)
        .with_strategy(StaticDiscovery::default());

    let error = chain.discover("plant-host").unwrap_err();

    match error {
        OpcDaError::Capability(CapabilityError::DiscoveryExhausted { host, attempts }) => {
            assert_eq!(host, "plant-host");
            assert_eq!(attempts.len(), 2);
        }
        other => panic!("Expected exhausted discovery, got {other}"),
    }
}

#[test]
fn test_discovery_empty_chain() {
    let chain = DiscoveryChain::new();
    assert!(chain.is_empty());
    assert!(chain.discover("localhost").is_err());
}
