// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Client session for one server connection.
//!
//! A session wires the pieces together once per connection:
//!
//! ```text
//! ClientSession
//! ├── HealthChannel          subscribers for connection loss
//! ├── CallGate               shares the channel, traces every call
//! ├── ResolveProperties      batch or per-item, by capability
//! └── BrowseStrategy         stateless or stateful, by capability and mode
//! ```

use std::fmt;
use std::sync::Arc;

use opcda_core::{ElementFilter, OpcDaResult, PropertiesQuery};

use crate::browse::{BrowseResult, BrowseStrategy, BrowseTree, ElementBrowser, TreeWalker};
use crate::config::ClientConfig;
use crate::gate::CallGate;
use crate::health::{HealthChannel, HealthContext};
use crate::properties::{LegacyPropertyResolver, PropertyResolver, ResolveProperties};
use crate::transport::{OpcServer, ServerCapabilities};

/// Browsing and property resolution against one server.
pub struct ClientSession {
    server_id: String,
    capabilities: ServerCapabilities,
    config: ClientConfig,
    health: Arc<HealthChannel>,
    gate: Arc<CallGate>,
    properties: Option<Arc<dyn ResolveProperties>>,
    browser: BrowseStrategy,
}

impl ClientSession {
    /// Creates a session on a connected server.
    ///
    /// # Errors
    ///
    /// - [`OpcDaError::Validation`](opcda_core::OpcDaError::Validation) if
    ///   `config` is invalid
    /// - [`OpcDaError::Capability`](opcda_core::OpcDaError::Capability) if the
    ///   server offers no usable browse interface
    pub fn new(
        server: Arc<dyn OpcServer>,
        config: ClientConfig,
        context: HealthContext,
    ) -> OpcDaResult<Self> {
        config.validate()?;

        let health = Arc::new(HealthChannel::new());
        let gate = Arc::new(
            CallGate::new(Arc::clone(&health), context).with_trace_arguments(config.trace_arguments),
        );

        let properties: Option<Arc<dyn ResolveProperties>> =
            match (server.browse_interface(), server.item_properties_interface()) {
                (Some(browse), _) => Some(Arc::new(PropertyResolver::new(browse, Arc::clone(&gate)))),
                (None, Some(legacy)) => {
                    Some(Arc::new(LegacyPropertyResolver::new(legacy, Arc::clone(&gate))))
                }
                (None, None) => None,
            };

        let browser =
            BrowseStrategy::select(&*server, Arc::clone(&gate), &config, properties.clone())?;
        let capabilities = server.capabilities();

        tracing::info!(
            server = server.object_id(),
            capabilities = %capabilities,
            browser = browser.name(),
            properties = properties.is_some(),
            "Client session created"
        );

        Ok(Self {
            server_id: server.object_id().to_string(),
            capabilities,
            config,
            health,
            gate,
            properties,
            browser,
        })
    }

    /// Returns the server identity.
    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    /// Returns the interfaces the server offered at creation.
    pub fn capabilities(&self) -> ServerCapabilities {
        self.capabilities
    }

    /// Returns the selected browser.
    pub fn browser(&self) -> &BrowseStrategy {
        &self.browser
    }

    /// Returns the property resolver, if the server supports properties.
    pub fn properties(&self) -> Option<&Arc<dyn ResolveProperties>> {
        self.properties.as_ref()
    }

    /// Returns the session health channel.
    pub fn health(&self) -> &Arc<HealthChannel> {
        &self.health
    }

    /// Returns the call gate.
    pub fn gate(&self) -> &Arc<CallGate> {
        &self.gate
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Browses with the selected strategy.
    pub fn browse(
        &self,
        item_path: &str,
        filter: &ElementFilter,
        query: Option<&PropertiesQuery>,
    ) -> OpcDaResult<BrowseResult> {
        self.browser.browse(item_path, filter, query)
    }

    /// Walks everything below `item_path`, bounded by `max_tree_depth`.
    pub fn walk_tree(&self, item_path: &str, query: Option<PropertiesQuery>) -> OpcDaResult<BrowseTree> {
        let walker = TreeWalker::new(&self.browser).with_max_depth(self.config.max_tree_depth);
        match query {
            Some(query) => walker.with_query(query).walk(item_path),
            None => walker.walk(item_path),
        }
    }
}

impl fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSession")
            .field("server", &self.server_id)
            .field("capabilities", &self.capabilities)
            .field("browser", &self.browser.name())
            .field("properties", &self.properties.is_some())
            .field("subscribers", &self.health.subscriber_count())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{
        BrowseRequest, CallResult, PropertiesRequest, RemoteObject, ServerAddressSpace,
        ServerBrowse, ServerItemProperties,
    };
    use opcda_core::{BrowseElement, BrowsePage, ItemProperties, OpcDaError, StatusCode};

    struct Dying;

    impl RemoteObject for Dying {
        fn object_id(&self) -> &str {
            "dying"
        }
    }

    impl ServerBrowse for Dying {
        fn browse(&self, request: &BrowseRequest) -> CallResult<BrowsePage> {
            if request.item_path.is_empty() {
                Ok(BrowsePage::last(vec![BrowseElement::item("Tag", "Tag")]))
            } else {
                Err(StatusCode::RPC_E_DISCONNECTED)
            }
        }

        fn get_properties(&self, _: &[String], _: &PropertiesRequest) -> CallResult<Vec<ItemProperties>> {
            Err(StatusCode::RPC_E_DISCONNECTED)
        }
    }

    impl OpcServer for Dying {
        fn browse_interface(&self) -> Option<Arc<dyn ServerBrowse>> {
            Some(Arc::new(Dying))
        }

        fn address_space_interface(&self) -> Option<Arc<dyn ServerAddressSpace>> {
            None
        }

        fn item_properties_interface(&self) -> Option<Arc<dyn ServerItemProperties>> {
            None
        }
    }

    #[test]
    fn test_session_wiring() {
        let session =
            ClientSession::new(Arc::new(Dying), ClientConfig::default(), HealthContext::labeled("unit")).unwrap();
        assert!(session.browser().is_stateless());
        assert!(session.properties().is_some());
        assert!(session.capabilities().browse);
        assert_eq!(session.server_id(), "dying");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let error = ClientSession::new(
            Arc::new(Dying),
            ClientConfig::default().with_batch_size(0),
            HealthContext::default(),
        )
        .unwrap_err();
        assert!(error.is_validation());
    }

    #[test]
    fn test_health_events_reach_session_subscribers() {
        let session =
            ClientSession::new(Arc::new(Dying), ClientConfig::default(), HealthContext::labeled("unit")).unwrap();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        session.health().subscribe_fn("test", move |event| {
            sink.lock().push((event.code, event.context.label().to_string()));
        });

        assert_eq!(session.browse("", &ElementFilter::all(), None).unwrap().len(), 1);
        let error = session.browse("Lost", &ElementFilter::all(), None).unwrap_err();
        assert!(matches!(error, OpcDaError::Transport(_)));
        assert_eq!(*seen.lock(), vec![(StatusCode::RPC_E_DISCONNECTED, "unit".to_string())]);
        assert_eq!(session.gate().stats().health_events(), 1);
    }
}
