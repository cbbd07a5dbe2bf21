// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Paginated browsing with continuation tokens.
//!
//! # Pagination
//!
//! ```text
//!  Browse(path, token = none, max = batch_size)
//!      │
//!      ├─► page 1: elements, more_available, token₁
//!      │
//!  Browse(path, token₁)        while more_available && token non-empty
//!      │
//!      ├─► page 2: elements, more_available = false
//!      ▼
//!    done
//! ```
//!
//! Pages are fetched lazily by [`BrowseIter`]. The outstanding token lives in
//! a [`ContinuationGuard`], which releases it on the server if the traversal
//! stops before the server is done with it: on a domain failure, or when the
//! iterator is dropped early. A token handed back to the server on a
//! successful call is consumed by that call and is not released again.

use std::fmt;
use std::sync::Arc;

use opcda_core::{
    BrowseElement, ContinuationToken, ElementFilter, ItemProperties, OpcDaError, OpcDaResult,
    PropertiesQuery, ValidationError,
};

use crate::browse::{BrowseCompletion, BrowseResult, ElementBrowser};
use crate::config::DEFAULT_BATCH_SIZE;
use crate::gate::CallGate;
use crate::transport::{BrowseRequest, ServerBrowse};

// =============================================================================
// ContinuationGuard
// =============================================================================

/// Owns an outstanding continuation token and releases it exactly once.
pub struct ContinuationGuard {
    server: Arc<dyn ServerBrowse>,
    gate: Arc<CallGate>,
    token: Option<ContinuationToken>,
}

impl ContinuationGuard {
    /// Creates an empty guard.
    pub fn new(server: Arc<dyn ServerBrowse>, gate: Arc<CallGate>) -> Self {
        Self {
            server,
            gate,
            token: None,
        }
    }

    /// Returns the held token.
    pub fn token(&self) -> Option<&ContinuationToken> {
        self.token.as_ref()
    }

    /// Returns `true` if a token is held.
    pub fn is_held(&self) -> bool {
        self.token.is_some()
    }

    /// Replaces the held token after the server consumed it.
    ///
    /// Empty tokens are not held.
    pub fn replace(&mut self, token: Option<ContinuationToken>) {
        self.token = token.filter(|t| !t.is_empty());
    }

    /// Releases the held token on the server, if any.
    ///
    /// A failed release is logged; it never fails the traversal.
    pub fn release(&mut self) {
        let Some(token) = self.token.take() else {
            return;
        };
        let server = &self.server;
        let outcome = self.gate.invoke(
            server.object_id(),
            "ReleaseContinuationPoint",
            &token,
            || server.release_continuation(&token),
        );
        if let Err(error) = outcome {
            tracing::warn!(error = %error, "Failed to release continuation token");
        }
    }

    /// Drops the held token without contacting the server.
    ///
    /// Used when the connection is already known to be broken.
    pub fn forget(&mut self) {
        self.token = None;
    }
}

impl Drop for ContinuationGuard {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for ContinuationGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContinuationGuard")
            .field("server", &self.server.object_id())
            .field("token", &self.token)
            .finish()
    }
}

// =============================================================================
// AddressSpaceBrowser
// =============================================================================

/// Browser for servers with paginated browsing.
pub struct AddressSpaceBrowser {
    server: Arc<dyn ServerBrowse>,
    gate: Arc<CallGate>,
    batch_size: u32,
}

impl AddressSpaceBrowser {
    /// Creates a browser with the default batch size.
    pub fn new(server: Arc<dyn ServerBrowse>, gate: Arc<CallGate>) -> Self {
        Self {
            server,
            gate,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Sets the number of elements requested per page.
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Returns the page size.
    pub fn batch_size(&self) -> u32 {
        self.batch_size
    }

    /// Returns a lazy iterator over the elements under `item_path`.
    ///
    /// No remote call is made until the first element is requested.
    ///
    /// # Errors
    ///
    /// [`ValidationError::ZeroBatchSize`] if the batch size is zero.
    pub fn iter(
        &self,
        item_path: &str,
        filter: &ElementFilter,
        query: Option<&PropertiesQuery>,
    ) -> OpcDaResult<BrowseIter> {
        if self.batch_size == 0 {
            return Err(ValidationError::ZeroBatchSize.into());
        }

        let request =
            BrowseRequest::new(item_path, filter.clone(), self.batch_size).with_properties(query);
        Ok(BrowseIter {
            server: Arc::clone(&self.server),
            gate: Arc::clone(&self.gate),
            guard: ContinuationGuard::new(Arc::clone(&self.server), Arc::clone(&self.gate)),
            request,
            query: query.cloned(),
            buffer: Vec::new().into_iter(),
            pages: 0,
            finished: false,
            completion: BrowseCompletion::Complete,
        })
    }
}

impl ElementBrowser for AddressSpaceBrowser {
    fn name(&self) -> &'static str {
        "stateless"
    }

    fn browse(
        &self,
        item_path: &str,
        filter: &ElementFilter,
        query: Option<&PropertiesQuery>,
    ) -> OpcDaResult<BrowseResult> {
        let mut iter = self.iter(item_path, filter, query)?;
        let mut elements = Vec::new();
        for element in &mut iter {
            elements.push(element?);
        }
        Ok(BrowseResult::new(elements, iter.completion()))
    }
}

impl fmt::Debug for AddressSpaceBrowser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddressSpaceBrowser")
            .field("server", &self.server.object_id())
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

// =============================================================================
// BrowseIter
// =============================================================================

/// Lazy, finite iterator over the pages of one browse.
///
/// Yields `Err` at most once, for a transport or protocol failure, and then
/// ends. A domain failure ends the iteration without an `Err`; check
/// [`completion`](Self::completion) afterwards.
pub struct BrowseIter {
    server: Arc<dyn ServerBrowse>,
    gate: Arc<CallGate>,
    guard: ContinuationGuard,
    request: BrowseRequest,
    query: Option<PropertiesQuery>,
    buffer: std::vec::IntoIter<BrowseElement>,
    pages: usize,
    finished: bool,
    completion: BrowseCompletion,
}

impl BrowseIter {
    /// Returns how the traversal ended so far.
    pub fn completion(&self) -> BrowseCompletion {
        self.completion
    }

    /// Returns the number of pages received.
    pub fn pages(&self) -> usize {
        self.pages
    }

    /// Returns `true` once no more pages will be fetched.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn fetch_page(&mut self) -> OpcDaResult<()> {
        let mut request = self.request.clone();
        request.continuation = self.guard.token().cloned();

        let server = &self.server;
        let outcome = self.gate.invoke(
            server.object_id(),
            "Browse",
            &PageArgs(&request),
            || server.browse(&request),
        );

        match outcome {
            Ok(page) => {
                self.pages += 1;
                let more_available = page.more_available;
                self.guard.replace(page.continuation);
                if !(more_available && self.guard.is_held()) {
                    self.finish();
                }
                let mut elements = page.elements;
                self.normalize(&mut elements);
                self.buffer = elements.into_iter();
                Ok(())
            }
            Err(OpcDaError::Remote(error)) => {
                tracing::warn!(
                    item_path = %self.request.item_path,
                    pages = self.pages,
                    status = %error.status,
                    "Browse truncated"
                );
                self.completion = BrowseCompletion::Truncated {
                    status: error.status,
                    pages: self.pages,
                };
                self.finish();
                Ok(())
            }
            Err(error) => {
                if error.is_transport() {
                    self.guard.forget();
                }
                self.finish();
                Err(error)
            }
        }
    }

    fn finish(&mut self) {
        self.finished = true;
        self.guard.release();
    }

    fn normalize(&self, elements: &mut [BrowseElement]) {
        match &self.query {
            None => elements
                .iter_mut()
                .for_each(|e| e.properties = ItemProperties::default()),
            Some(query) if !query.return_values => elements
                .iter_mut()
                .for_each(|e| e.properties.strip_values()),
            Some(_) => {}
        }
    }
}

impl Iterator for BrowseIter {
    type Item = OpcDaResult<BrowseElement>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(element) = self.buffer.next() {
                return Some(Ok(element));
            }
            if self.finished {
                return None;
            }
            if let Err(error) = self.fetch_page() {
                return Some(Err(error));
            }
        }
    }
}

impl std::iter::FusedIterator for BrowseIter {}

impl fmt::Debug for BrowseIter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowseIter")
            .field("item_path", &self.request.item_path)
            .field("pages", &self.pages)
            .field("finished", &self.finished)
            .field("completion", &self.completion)
            .finish()
    }
}

struct PageArgs<'a>(&'a BrowseRequest);

impl fmt::Debug for PageArgs<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let request = self.0;
        write!(
            f,
            "path={:?} kind={:?} pattern={:?} max={} continuation={}",
            request.item_path,
            request.filter.element_kind,
            request.filter.name_pattern,
            request.max_elements,
            request.continuation.is_some()
        )?;
        if let Some(properties) = &request.properties {
            write!(f, " properties={properties}")?;
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
