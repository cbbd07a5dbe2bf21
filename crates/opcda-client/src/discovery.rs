// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Server discovery through an ordered chain of strategies.
//!
//! Hosts expose their installed servers in different ways, and not every
//! way works on every host. A [`DiscoveryChain`] tries its strategies in the
//! order they were added and returns the first non-empty answer:
//!
//! ```text
//! discover(host)
//!     │
//!     ├─► strategy 1 ── error / empty ──┐
//!     │                                 │ recorded in attempts
//!     ├─► strategy 2 ── error / empty ──┤
//!     │                                 │
//!     └─► strategy 3 ── servers ──► DiscoveryReport
//!
//!  all failed ──► CapabilityError::DiscoveryExhausted
//! ```
//!
//! Concrete strategies (server browser object, registry enumeration, static
//! lists) live with the transport.

use std::fmt;

use serde::{Deserialize, Serialize};

use opcda_core::{CapabilityError, OpcDaResult};

// =============================================================================
// ServerDescriptor
// =============================================================================

/// Specification versions a server implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DaVersion {
    /// Data Access 1.0.
    Da1,
    /// Data Access 2.0.
    Da2,
    /// Data Access 3.0.
    Da3,
}

impl DaVersion {
    /// Returns the display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Da1 => "DA 1.0",
            Self::Da2 => "DA 2.0",
            Self::Da3 => "DA 3.0",
        }
    }
}

impl fmt::Display for DaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A server installed on a host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDescriptor {
    /// Programmatic identifier, e.g. `Matrikon.OPC.Simulation.1`.
    pub prog_id: String,

    /// Class identifier, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<String>,

    /// Vendor name.
    #[serde(default)]
    pub vendor: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,

    /// Implemented versions.
    #[serde(default)]
    pub versions: Vec<DaVersion>,
}

impl ServerDescriptor {
    /// Creates a descriptor with only a programmatic identifier.
    pub fn new(prog_id: impl Into<String>) -> Self {
        Self {
            prog_id: prog_id.into(),
            class_id: None,
            vendor: String::new(),
            description: String::new(),
            versions: Vec::new(),
        }
    }

    /// Sets the class identifier.
    pub fn with_class_id(mut self, class_id: impl Into<String>) -> Self {
        self.class_id = Some(class_id.into());
        self
    }

    /// Sets the vendor.
    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = vendor.into();
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Adds an implemented version.
    pub fn with_version(mut self, version: DaVersion) -> Self {
        if !self.versions.contains(&version) {
            self.versions.push(version);
        }
        self
    }

    /// Returns `true` if the server implements `version`.
    pub fn supports(&self, version: DaVersion) -> bool {
        self.versions.contains(&version)
    }
}

impl fmt::Display for ServerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prog_id)?;
        if !self.vendor.is_empty() {
            write!(f, " ({})", self.vendor)?;
        }
        Ok(())
    }
}

// =============================================================================
// DiscoveryStrategy
// =============================================================================

/// One way of listing the servers on a host.
pub trait DiscoveryStrategy: Send + Sync {
    /// Returns the strategy name.
    fn name(&self) -> &str;

    /// Lists the servers on `host`.
    fn discover(&self, host: &str) -> OpcDaResult<Vec<ServerDescriptor>>;
}

/// A strategy returning a fixed list, e.g. from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticDiscovery {
    servers: Vec<ServerDescriptor>,
}

impl StaticDiscovery {
    /// Creates a strategy that always returns `servers`.
    pub fn new(servers: Vec<ServerDescriptor>) -> Self {
        Self { servers }
    }
}

impl DiscoveryStrategy for StaticDiscovery {
    fn name(&self) -> &str {
        "static"
    }

    fn discover(&self, _host: &str) -> OpcDaResult<Vec<ServerDescriptor>> {
        Ok(self.servers.clone())
    }
}

// =============================================================================
// DiscoveryChain
// =============================================================================

/// Outcome of a successful discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveryReport {
    /// Name of the strategy that answered.
    pub strategy: String,
    /// Servers it found.
    pub servers: Vec<ServerDescriptor>,
    /// Failed attempts before it, as `"name: reason"`.
    pub attempts: Vec<String>,
}

impl DiscoveryReport {
    /// Returns the servers implementing `version`.
    pub fn supporting(&self, version: DaVersion) -> Vec<&ServerDescriptor> {
        self.servers.iter().filter(|s| s.supports(version)).collect()
    }

    /// Finds a server by programmatic identifier, ignoring case.
    pub fn find(&self, prog_id: &str) -> Option<&ServerDescriptor> {
        self.servers
            .iter()
            .find(|s| s.prog_id.eq_ignore_ascii_case(prog_id))
    }
}

/// Ordered discovery strategies.
#[derive(Default)]
pub struct DiscoveryChain {
    strategies: Vec<Box<dyn DiscoveryStrategy>>,
}

impl DiscoveryChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a strategy.
    pub fn with_strategy(mut self, strategy: impl DiscoveryStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Appends a boxed strategy.
    pub fn push(&mut self, strategy: Box<dyn DiscoveryStrategy>) {
        self.strategies.push(strategy);
    }

    /// Returns the number of strategies.
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Returns `true` if the chain has no strategies.
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Tries each strategy in order and returns the first non-empty answer.
    ///
    /// # Errors
    ///
    /// [`CapabilityError::DiscoveryExhausted`] listing every attempt when no
    /// strategy produced a server.
    pub fn discover(&self, host: &str) -> OpcDaResult<DiscoveryReport> {
        let mut attempts = Vec::with_capacity(self.strategies.len());

        for strategy in &self.strategies {
            let name = strategy.name();
            match strategy.discover(host) {
                Ok(servers) if !servers.is_empty() => {
                    tracing::info!(
                        host,
                        strategy = name,
                        servers = servers.len(),
                        "Servers discovered"
                    );
                    return Ok(DiscoveryReport {
                        strategy: name.to_string(),
                        servers,
                        attempts,
                    });
                }
                Ok(_) => {
                    tracing::debug!(host, strategy = name, "Discovery returned no servers");
                    attempts.push(format!("{name}: no servers"));
                }
                Err(error) => {
                    tracing::debug!(host, strategy = name, error = %error, "Discovery failed");
                    attempts.push(format!("{name}: {error}"));
                }
            }
        }

        tracing::warn!(host, attempts = attempts.len(), "Discovery exhausted");
        Err(CapabilityError::DiscoveryExhausted {
            host: host.to_string(),
            attempts,
        }
        .into())
    }
}

impl fmt::Debug for DiscoveryChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.strategies.iter().map(|s| s.name()).collect();
        f.debug_struct("DiscoveryChain")
            .field("strategies", &names)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use opcda_core::{OpcDaError, StatusCode};

    struct Failing;

    impl DiscoveryStrategy for Failing {
        fn name(&self) -> &str {
            "server-browser"
        }

        fn discover(&self, host: &str) -> OpcDaResult<Vec<ServerDescriptor>> {
            Err(OpcDaError::remote(host, "EnumClassesOfCategories", StatusCode::E_ACCESSDENIED))
        }
    }

    fn simulation() -> ServerDescriptor {
        ServerDescriptor::new("Matrikon.OPC.Simulation.1")
            .with_vendor("Matrikon")
            .with_version(DaVersion::Da2)
            .with_version(DaVersion::Da2)
    }

    #[test]
    fn test_first_success_wins() {
        let chain = DiscoveryChain::new()
            .with_strategy(Failing)
            .with_strategy(StaticDiscovery::default())
            .with_strategy(StaticDiscovery::new(vec![simulation()]));

        let report = chain.discover("localhost").unwrap();
        assert_eq!(report.strategy, "static");
        assert_eq!(report.attempts.len(), 2);
        assert!(report.attempts[0].starts_with("server-browser:"));
        assert_eq!(report.attempts[1], "static: no servers");
        assert_eq!(report.supporting(DaVersion::Da2).len(), 1);
        assert!(report.supporting(DaVersion::Da3).is_empty());
        assert!(report.find("matrikon.opc.simulation.1").is_some());
    }

    #[test]
    fn test_exhausted() {
        let chain = DiscoveryChain::new().with_strategy(Failing);
        let error = chain.discover("plc-01").unwrap_err();
        match error {
            OpcDaError::Capability(CapabilityError::DiscoveryExhausted { host, attempts }) => {
                assert_eq!(host, "plc-01");
                assert_eq!(attempts.len(), 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_chain_is_exhausted() {
        assert!(DiscoveryChain::new().discover("localhost").is_err());
    }

    #[test]
    fn test_descriptor_versions_deduplicated() {
        let descriptor = simulation();
        assert_eq!(descriptor.versions, vec![DaVersion::Da2]);
        assert_eq!(descriptor.to_string(), "Matrikon.OPC.Simulation.1 (Matrikon)");
    }
}
