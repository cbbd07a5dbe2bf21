// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # OPC DA Client Integration Tests
//!
//! Integration tests for the OPC DA client, together with the simulated
//! server they run against.
//!
//! ## Module Structure
//!
//! - [`common`]: Shared test utilities
//!   - `fixtures`: The simulated address space and canned configurations
//!   - `mocks`: [`SimulatedServer`](common::mocks::SimulatedServer) with
//!     pagination, cursor browsing, failure injection and call recording
//!   - `assertions`: Assertion helpers for browse and property results
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all integration tests
//! cargo test -p opcda-tests
//!
//! # Run one suite
//! cargo test -p opcda-tests --test integration_browse
//! cargo test -p opcda-tests --test integration_properties
//! cargo test -p opcda-tests --test integration_gate
//! cargo test -p opcda-tests --test integration_session
//! cargo test -p opcda-tests --test integration_config
//!
//! # With trace output
//! RUST_LOG=opcda_client=debug cargo test -p opcda-tests -- --nocapture
//! ```
//!
//! ## Writing New Tests
//!
//! ```rust,ignore
//! use opcda_tests::prelude::*;
//!
//! #[test]
//! fn test_something() {
//!     init_test_logging();
//!     let server = SimulatedServer::modern();
//!     let session = server.session(ClientConfig::default());
//!     // ... test logic
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod common;

/// Re-export commonly used items for convenience.
pub mod prelude {
    pub use crate::common::assertions::*;
    pub use crate::common::fixtures::*;
    pub use crate::common::mocks::*;
    pub use crate::common::{init_test_logging, temp_test_dir};
}
