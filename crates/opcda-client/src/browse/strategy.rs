// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Per-server choice between the two browse paradigms.

use std::fmt;
use std::sync::Arc;

use opcda_core::{CapabilityError, ElementFilter, OpcDaResult, PropertiesQuery};

use crate::browse::{AddressSpaceBrowser, BrowseResult, ElementBrowser, PositionBrowser};
use crate::config::{BrowseMode, ClientConfig};
use crate::gate::CallGate;
use crate::properties::ResolveProperties;
use crate::transport::OpcServer;

/// The browser selected for one server connection.
#[derive(Debug)]
pub enum BrowseStrategy {
    /// Paginated browsing with continuation tokens.
    Stateless(AddressSpaceBrowser),
    /// Server-side cursor.
    Stateful(PositionBrowser),
}

impl BrowseStrategy {
    /// Selects a browser from the server capabilities and `config`.
    ///
    /// | Mode        | browse | address space | Result            |
    /// |-------------|--------|---------------|-------------------|
    /// | `auto`      | yes    | any           | `Stateless`       |
    /// | `auto`      | no     | yes           | `Stateful`        |
    /// | `stateless` | yes    | any           | `Stateless`       |
    /// | `stateful`  | any    | yes           | `Stateful`        |
    /// | otherwise   |        |               | `NotSupported`    |
    ///
    /// `properties` is used by the stateful browser for inline properties.
    pub fn select(
        server: &dyn OpcServer,
        gate: Arc<CallGate>,
        config: &ClientConfig,
        properties: Option<Arc<dyn ResolveProperties>>,
    ) -> OpcDaResult<Self> {
        let stateless = || {
            server.browse_interface().map(|browse| {
                Self::Stateless(AddressSpaceBrowser::new(browse, Arc::clone(&gate)).with_batch_size(config.batch_size))
            })
        };
        let stateful = || {
            server.address_space_interface().map(|space| {
                let browser = PositionBrowser::new(space, Arc::clone(&gate));
                Self::Stateful(match properties.clone() {
                    Some(resolver) => browser.with_properties(resolver),
                    None => browser,
                })
            })
        };

        let selected = match config.browse_mode {
            BrowseMode::Auto => stateless().or_else(stateful),
            BrowseMode::Stateless => stateless(),
            BrowseMode::Stateful => stateful(),
        };

        match selected {
            Some(strategy) => {
                tracing::info!(
                    server = server.object_id(),
                    mode = %config.browse_mode,
                    strategy = strategy.name(),
                    "Browse strategy selected"
                );
                Ok(strategy)
            }
            None => {
                let capability = match config.browse_mode {
                    BrowseMode::Auto => "address space browsing",
                    BrowseMode::Stateless => "paginated browsing",
                    BrowseMode::Stateful => "cursor-based browsing",
                };
                tracing::warn!(
                    server = server.object_id(),
                    capabilities = %server.capabilities(),
                    "No browse strategy available"
                );
                Err(CapabilityError::not_supported(capability).into())
            }
        }
    }

    /// Returns `true` for the paginated browser.
    pub fn is_stateless(&self) -> bool {
        matches!(self, Self::Stateless(_))
    }

    /// Returns the cursor browser, if selected.
    pub fn as_stateful(&self) -> Option<&PositionBrowser> {
        match self {
            Self::Stateful(browser) => Some(browser),
            Self::Stateless(_) => None,
        }
    }

    /// Returns the paginated browser, if selected.
    pub fn as_stateless(&self) -> Option<&AddressSpaceBrowser> {
        match self {
            Self::Stateless(browser) => Some(browser),
            Self::Stateful(_) => None,
        }
    }

    fn inner(&self) -> &dyn ElementBrowser {
        match self {
            Self::Stateless(browser) => browser,
            Self::Stateful(browser) => browser,
        }
    }
}

impl ElementBrowser for BrowseStrategy {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn browse(
        &self,
        item_path: &str,
        filter: &ElementFilter,
        query: Option<&PropertiesQuery>,
    ) -> OpcDaResult<BrowseResult> {
        self.inner().browse(item_path, filter, query)
    }
}

impl fmt::Display for BrowseStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{HealthChannel, HealthContext};
    use crate::transport::{
        BrowseRequest, CallResult, PropertiesRequest, RemoteObject, ServerAddressSpace,
        ServerBrowse, ServerItemProperties,
    };
    use opcda_core::{
        AccessRights, BrowseDirection, BrowsePage, BrowseType, ItemProperties, NamespaceType,
        OpcDaError, VarType,
    };

    struct Modern;

    impl RemoteObject for Modern {
        fn object_id(&self) -> &str {
            "modern"
        }
    }

    impl ServerBrowse for Modern {
        fn browse(&self, _request: &BrowseRequest) -> CallResult<BrowsePage> {
            Ok(BrowsePage::last(Vec::new()))
        }

        fn get_properties(&self, paths: &[String], _: &PropertiesRequest) -> CallResult<Vec<ItemProperties>> {
            Ok(vec![ItemProperties::default(); paths.len()])
        }
    }

    struct Legacy;

    impl RemoteObject for Legacy {
        fn object_id(&self) -> &str {
            "legacy"
        }
    }

    impl ServerAddressSpace for Legacy {
        fn query_organization(&self) -> CallResult<NamespaceType> {
            Ok(NamespaceType::Hierarchical)
        }

        fn change_browse_position(&self, _: BrowseDirection, _: &str) -> CallResult<()> {
            Ok(())
        }

        fn browse_item_ids(&self, _: BrowseType, _: &str, _: VarType, _: AccessRights) -> CallResult<Vec<String>> {
            Ok(Vec::new())
        }

        fn get_item_id(&self, name: &str) -> CallResult<String> {
            Ok(name.to_string())
        }
    }

    struct Server {
        modern: bool,
        legacy: bool,
    }

    impl RemoteObject for Server {
        fn object_id(&self) -> &str {
            "server"
        }
    }

    impl OpcServer for Server {
        fn browse_interface(&self) -> Option<Arc<dyn ServerBrowse>> {
            self.modern.then(|| Arc::new(Modern) as Arc<dyn ServerBrowse>)
        }

        fn address_space_interface(&self) -> Option<Arc<dyn ServerAddressSpace>> {
            self.legacy.then(|| Arc::new(Legacy) as Arc<dyn ServerAddressSpace>)
        }

        fn item_properties_interface(&self) -> Option<Arc<dyn ServerItemProperties>> {
            None
        }
    }

    fn select(server: Server, mode: BrowseMode) -> OpcDaResult<BrowseStrategy> {
        let gate = Arc::new(CallGate::new(Arc::new(HealthChannel::new()), HealthContext::default()));
        BrowseStrategy::select(&server, gate, &ClientConfig::default().with_browse_mode(mode), None)
    }

    #[test]
    fn test_auto_prefers_stateless() {
        let strategy = select(Server { modern: true, legacy: true }, BrowseMode::Auto).unwrap();
        assert!(strategy.is_stateless());
        assert_eq!(strategy.name(), "stateless");
    }

    #[test]
    fn test_auto_falls_back_to_stateful() {
        let strategy = select(Server { modern: false, legacy: true }, BrowseMode::Auto).unwrap();
        assert!(strategy.as_stateful().is_some());
    }

    #[test]
    fn test_explicit_mode_requires_capability() {
        let error = select(Server { modern: false, legacy: true }, BrowseMode::Stateless).unwrap_err();
        assert!(matches!(error, OpcDaError::Capability(CapabilityError::NotSupported { .. })));

        let strategy = select(Server { modern: true, legacy: true }, BrowseMode::Stateful).unwrap();
        assert_eq!(strategy.to_string(), "stateful");
    }

    #[test]
    fn test_no_capability() {
        let error = select(Server { modern: false, legacy: false }, BrowseMode::Auto).unwrap_err();
        assert!(matches!(error, OpcDaError::Capability(_)));
    }

    #[test]
    fn test_batch_size_from_config() {
        let gate = Arc::new(CallGate::new(Arc::new(HealthChannel::new()), HealthContext::default()));
        let config = ClientConfig::default().with_batch_size(25);
        let strategy =
            BrowseStrategy::select(&Server { modern: true, legacy: false }, gate, &config, None).unwrap();
        assert_eq!(strategy.as_stateless().map(AddressSpaceBrowser::batch_size), Some(25));
    }
}
