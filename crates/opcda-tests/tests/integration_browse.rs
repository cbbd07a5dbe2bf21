// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Browse Integration Tests
//!
//! Paginated and cursor-based browsing against the simulated server:
//!
//! - Element-kind partitioning and name patterns
//! - Pagination transparency and continuation token lifetime
//! - Truncation on domain failures, propagation of transport failures
//! - Tree walks over both browse paradigms
//!
//! ## Test Categories
//!
//! - `test_kinds_*`: Branch/item partitioning
//! - `test_pagination_*`: Batch sizes and tokens
//! - `test_truncation_*`: Partial results
//! - `test_stateful_*`: Cursor browsing
//! - `test_walk_*`: Recursive walks

use std::sync::Arc;

use opcda_client::{
    AddressSpaceBrowser, BrowseCompletion, BrowseMode, CallGate, ClientConfig,
    CollectingSubscriber, ElementBrowser, HealthChannel, HealthContext, OpcServer, TreeWalker,
};
use opcda_core::{ElementFilter, ElementKind, NamespaceType, StatusCode};

use opcda_tests::prelude::*;

fn browse_paths() -> [&'static str; 3] {
    [
        "",
        AddressSpaceFixtures::SIMULATION_ITEMS,
        AddressSpaceFixtures::BUCKET_BRIGADE,
    ]
}

fn gate() -> (Arc<CallGate>, Arc<CollectingSubscriber>) {
    let channel = Arc::new(HealthChannel::new());
    let collector = Arc::new(CollectingSubscriber::new());
    channel.subscribe(collector.clone());
    (Arc::new(CallGate::new(channel, HealthContext::labeled("browse-tests"))), collector)
}

// =============================================================================
// Element Kinds
// =============================================================================

fn assert_kinds_partition(browser: &dyn ElementBrowser) {
    for path in browse_paths() {
        let all = browser.browse(path, &ElementFilter::all(), None).unwrap();
        let branches = browser.browse(path, &ElementFilter::branches(), None).unwrap();
        let items = browser.browse(path, &ElementFilter::items(), None).unwrap();

        all.assert_complete();
        assert_eq!(
            branches.len() + items.len(),
            all.len(),
            "Branches + Items != All at '{path}'"
        );
        let mut union = branches.path_set();
        union.extend(items.path_set());
        assert_eq!(union, all.path_set());
    }
}

#[test]
fn test_kinds_partition_stateless() {
    init_test_logging();
    let session = SimulatedServer::modern().session(ClientConfig::default());
    assert_kinds_partition(session.browser());
}

#[test]
fn test_kinds_partition_stateful() {
    init_test_logging();
    let session = SimulatedServer::legacy().session(ClientConfig::default());
    assert_kinds_partition(session.browser());
}

#[test]
fn test_kinds_branches_at_root() {
    init_test_logging();
    for server in [SimulatedServer::modern(), SimulatedServer::legacy()] {
        let session = server.session(ClientConfig::default());
        let branches = session.browse("", &ElementFilter::branches(), None).unwrap();

        branches.assert_names(&[
            AddressSpaceFixtures::SIMULATION_ITEMS,
            AddressSpaceFixtures::CONFIGURED_ALIASES,
        ]);
        assert!(branches.elements.iter().all(|e| !e.is_item));
    }
}

#[test]
fn test_kinds_filter_values_are_stable() {
    assert_eq!(ElementKind::All.value(), 0);
    assert_eq!(ElementKind::Branches.value(), 1);
    assert_eq!(ElementKind::Items.value(), 2);
}

#[test]
fn test_kinds_name_pattern() {
    init_test_logging();
    for server in [SimulatedServer::modern(), SimulatedServer::legacy()] {
        let session = server.session(ClientConfig::default());
        session.browse("", &ElementFilter::all(), None).unwrap();

        let filter = ElementFilter::items().with_name_pattern("Random.Int?");
        let result = session
            .browse(AddressSpaceFixtures::SIMULATION_ITEMS, &filter, None)
            .unwrap();
        result.assert_names(&["Random.Int1", "Random.Int2"]);
    }
}

#[test]
fn test_kinds_idempotent() {
    init_test_logging();
    for server in [SimulatedServer::modern(), SimulatedServer::legacy()] {
        let session = server.session(ClientConfig::default());
        let first = session.browse("", &ElementFilter::all(), None).unwrap();
        let second = session.browse("", &ElementFilter::all(), None).unwrap();
        assert_eq!(first, second);
    }
}

// =============================================================================
// Pagination
// =============================================================================

#[test]
fn test_pagination_batch_size_transparent() {
    init_test_logging();
    let server = SimulatedServer::new(
        AddressSpaceFixtures::bulk(25),
        SimulatedServer::modern().capabilities(),
    );

    let mut sets = Vec::new();
    for batch_size in [1, 7, 25, 1000] {
        server.reset_calls();
        let session = server.session(ClientConfig::default().with_batch_size(batch_size));
        let result = session.browse("Bulk", &ElementFilter::all(), None).unwrap();
        result.assert_complete();
        assert_eq!(result.len(), 25);

        let expected_calls = 25usize.div_ceil(batch_size as usize);
        assert_eq!(server.call_count("Browse"), expected_calls);
        sets.push(result.path_set());
    }

    assert!(sets.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(server.outstanding_tokens(), 0);
    assert_eq!(server.released_count(), 0);
}

#[test]
fn test_pagination_lazy_iterator() {
    init_test_logging();
    let server = SimulatedServer::new(
        AddressSpaceFixtures::bulk(10),
        SimulatedServer::modern().capabilities(),
    );
    let (gate, _) = gate();
    let browser = AddressSpaceBrowser::new(server.core(), gate).with_batch_size(4);

    let iter = browser.iter("Bulk", &ElementFilter::all(), None).unwrap();
    assert_eq!(server.call_count("Browse"), 0);

    let names: Vec<String> = iter.take(5).map(|e| e.unwrap().name).collect();
    assert_eq!(names, vec!["Tag000", "Tag001", "Tag002", "Tag003", "Tag004"]);
    assert_eq!(server.call_count("Browse"), 2);
}

#[test]
fn test_pagination_early_drop_releases_token() {
    init_test_logging();
    let server = SimulatedServer::new(
        AddressSpaceFixtures::bulk(10),
        SimulatedServer::modern().capabilities(),
    );
    let (gate, _) = gate();
    let browser = AddressSpaceBrowser::new(server.core(), gate).with_batch_size(2);

    {
        let mut iter = browser.iter("Bulk", &ElementFilter::all(), None).unwrap();
        for _ in 0..3 {
            iter.next().unwrap().unwrap();
        }
        assert_eq!(server.outstanding_tokens(), 1);
    }

    assert_eq!(server.released_count(), 1);
    assert_eq!(server.outstanding_tokens(), 0);
    assert_eq!(server.call_count("ReleaseContinuationPoint"), 1);
}

#[test]
fn test_pagination_zero_batch_size_rejected() {
    init_test_logging();
    let server = SimulatedServer::modern();
    let (gate, collector) = gate();
    let browser = AddressSpaceBrowser::new(server.core(), gate).with_batch_size(0);

    let error = browser.browse("", &ElementFilter::all(), None).unwrap_err();
    assert!(error.is_validation());
    assert!(server.calls().is_empty());
    assert!(collector.is_empty());
}

// =============================================================================
// Truncation
// =============================================================================

#[test]
fn test_truncation_mid_pagination() {
    init_test_logging();
    let server = SimulatedServer::new(
        AddressSpaceFixtures::bulk(10),
        SimulatedServer::modern().capabilities(),
    );
    server.fail_nth("Browse", 2, StatusCode::OPC_E_INVALIDCONTINUATIONPOINT);
    let (gate, collector) = gate();
    let browser = AddressSpaceBrowser::new(server.core(), gate).with_batch_size(3);

    let result = browser.browse("Bulk", &ElementFilter::all(), None).unwrap();

    assert_eq!(result.len(), 6);
    assert_eq!(
        result.completion,
        BrowseCompletion::Truncated {
            status: StatusCode::OPC_E_INVALIDCONTINUATIONPOINT,
            pages: 2,
        }
    );
    assert!(collector.is_empty());
    // The token of the failed call is released, nothing leaks.
    assert_eq!(server.released_count(), 1);
    assert_eq!(server.outstanding_tokens(), 0);
}

#[test]
fn test_truncation_unknown_path() {
    init_test_logging();
    for server in [SimulatedServer::modern(), SimulatedServer::legacy()] {
        let session = server.session(ClientConfig::default());
        let result = session.browse("No.Such.Branch", &ElementFilter::all(), None).unwrap();

        assert!(result.is_empty());
        result.assert_truncated(StatusCode::OPC_E_UNKNOWNITEMID);
        assert_eq!(session.gate().stats().health_events(), 0);
    }
}

#[test]
fn test_truncation_transport_failure_propagates() {
    init_test_logging();
    let server = SimulatedServer::new(
        AddressSpaceFixtures::bulk(10),
        SimulatedServer::modern().capabilities(),
    );
    server.fail_nth("Browse", 1, StatusCode::RPC_E_SERVER_DIED);
    let (gate, collector) = gate();
    let browser = AddressSpaceBrowser::new(server.core(), gate).with_batch_size(3);

    let error = browser.browse("Bulk", &ElementFilter::all(), None).unwrap_err();

    assert_transport(&error, StatusCode::RPC_E_SERVER_DIED);
    assert_eq!(collector.len(), 1);
    assert_eq!(server.call_count("ReleaseContinuationPoint"), 0);
}

// =============================================================================
// Stateful Browsing
// =============================================================================

#[test]
fn test_stateful_merges_paths() {
    init_test_logging();
    let session = SimulatedServer::legacy().session(ClientConfig::default());
    let browser = session.browser().as_stateful().unwrap();

    browser.browse("", &ElementFilter::all(), None).unwrap();
    let items = browser
        .browse(AddressSpaceFixtures::SIMULATION_ITEMS, &ElementFilter::all(), None)
        .unwrap();

    items.assert_names(&[
        AddressSpaceFixtures::BUCKET_BRIGADE,
        "Random.Int1",
        "Random.Int2",
        "Random.Real4",
    ]);
    assert_eq!(browser.position(), vec![AddressSpaceFixtures::SIMULATION_ITEMS]);
    assert_eq!(browser.known_branches(), 3);
}

#[test]
fn test_stateful_browses_unlisted_paths() {
    init_test_logging();
    let modern = SimulatedServer::modern().session(ClientConfig::default());
    let modern_result = modern
        .browse(AddressSpaceFixtures::SIMULATION_ITEMS, &ElementFilter::all(), None)
        .unwrap();

    let legacy = SimulatedServer::legacy().session(ClientConfig::default());
    let legacy_result = legacy
        .browse(AddressSpaceFixtures::SIMULATION_ITEMS, &ElementFilter::all(), None)
        .unwrap();

    legacy_result.assert_complete();
    assert_eq!(legacy_result.len(), 4);
    assert_eq!(legacy_result.path_set(), modern_result.path_set());
}

#[test]
fn test_stateful_browses_nested_path_first() {
    init_test_logging();
    let server = SimulatedServer::legacy();
    let session = server.session(ClientConfig::default());
    let browser = session.browser().as_stateful().unwrap();

    let result = browser
        .browse(AddressSpaceFixtures::BUCKET_BRIGADE, &ElementFilter::items(), None)
        .unwrap();

    result.assert_complete();
    assert_eq!(result.item_paths(), vec!["Bucket Brigade.Int1", "Bucket Brigade.Real8"]);
    assert_eq!(
        browser.position(),
        vec![AddressSpaceFixtures::SIMULATION_ITEMS, AddressSpaceFixtures::BUCKET_BRIGADE]
    );
    assert_eq!(server.cursor(), browser.position());
}

#[test]
fn test_stateful_follows_reorganized_space() {
    init_test_logging();
    let server = SimulatedServer::legacy();
    let session = server.session(ClientConfig::default());
    let browser = session.browser().as_stateful().unwrap();

    browser.browse("", &ElementFilter::all(), None).unwrap();
    browser
        .browse(AddressSpaceFixtures::SIMULATION_ITEMS, &ElementFilter::all(), None)
        .unwrap();
    assert_eq!(browser.known_branches(), 3);

    server.replace_address_space(AddressSpaceFixtures::reorganized());

    // The recorded route through "Simulation Items" no longer exists.
    let moved = browser
        .browse(AddressSpaceFixtures::BUCKET_BRIGADE, &ElementFilter::items(), None)
        .unwrap();
    moved.assert_complete();
    assert_eq!(moved.len(), 2);
    assert_eq!(browser.position(), vec![AddressSpaceFixtures::BUCKET_BRIGADE]);
    assert_eq!(browser.known_branches(), 2);

    let removed = browser
        .browse(AddressSpaceFixtures::CONFIGURED_ALIASES, &ElementFilter::all(), None)
        .unwrap();
    assert!(removed.is_empty());
    removed.assert_truncated(StatusCode::OPC_E_UNKNOWNITEMID);
    assert_eq!(browser.known_branches(), 2);
    assert_eq!(session.gate().stats().health_events(), 0);
}

#[test]
fn test_stateful_flat_namespace() {
    init_test_logging();
    let server = SimulatedServer::with_namespace(
        AddressSpaceFixtures::simulation(),
        SimulatedServer::legacy().capabilities(),
        NamespaceType::Flat,
    );
    let session = server.session(ClientConfig::default().with_browse_mode(BrowseMode::Stateful));

    let result = session.browse("", &ElementFilter::all(), None).unwrap();
    result.assert_complete();
    assert_eq!(result.len(), 6);
    assert!(result.elements.iter().all(|e| e.is_item && !e.has_children));
    assert_eq!(server.call_count("GetItemID"), 0);
}

#[test]
fn test_stateful_matches_stateless() {
    init_test_logging();
    let modern = SimulatedServer::modern().session(ClientConfig::default());
    let legacy = SimulatedServer::legacy().session(ClientConfig::default());

    let modern_tree = modern.walk_tree("", None).unwrap();
    let legacy_tree = legacy.walk_tree("", None).unwrap();

    assert_eq!(modern_tree.item_paths(), legacy_tree.item_paths());
    assert_eq!(modern_tree.count(), legacy_tree.count());
}

// =============================================================================
// Tree Walks
// =============================================================================

#[test]
fn test_walk_depth_first_order() {
    init_test_logging();
    let session = SimulatedServer::modern().session(ClientConfig::default().with_batch_size(2));
    let tree = session.walk_tree("", None).unwrap();

    assert!(tree.is_complete());
    assert_eq!(tree.count(), 9);
    assert_eq!(
        tree.item_paths(),
        vec![
            "Bucket Brigade.Int1",
            "Bucket Brigade.Real8",
            "Random.Int1",
            "Random.Int2",
            "Random.Real4",
            "Server.Version",
        ]
    );
}

#[test]
fn test_walk_depth_limited_by_config() {
    init_test_logging();
    let session = SimulatedServer::legacy().session(ClientConfig::default().with_max_tree_depth(0));
    let tree = session.walk_tree("", None).unwrap();

    assert!(tree.depth_limited);
    assert_eq!(tree.count(), 3);
}

#[test]
fn test_walk_visits_with_depth() {
    init_test_logging();
    let server = SimulatedServer::legacy();
    let session = server.session(ClientConfig::default());

    let mut visited = Vec::new();
    let truncations = TreeWalker::new(session.browser())
        .with_name_pattern("*Int*")
        .visit("", |depth, element| visited.push((depth, element.item_path.clone())))
        .unwrap();

    assert!(truncations.is_empty());
    assert!(visited.contains(&(2, "Bucket Brigade.Int1".to_string())));
    assert!(!visited.iter().any(|(_, path)| path == "Random.Real4"));
    // Cursor-based walks end wherever the last browse left the cursor.
    assert_eq!(server.cursor(), session.browser().as_stateful().unwrap().position());
}
