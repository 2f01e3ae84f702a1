//! Incremental retrieval of a complete paginated collection.
//!
//! A [`Paginator`] fetches pages strictly one after another, merging each
//! page's items by id into an [`AggregatedCollection`], until the server's
//! own metadata says the last page has been seen. Any failed page ends the
//! run and keeps what was merged so far.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::ClientError;
use crate::response::ApiResult;
use crate::types::{Identified, Page};

/// What a page source yields for one page number.
pub type PageResult<T> = Result<ApiResult<Page<T>>, ClientError>;

/// Items keyed by id, plus the most recently declared total.
///
/// Merging is an upsert: an id seen again overwrites the stored item, so
/// merging the same page twice leaves the collection unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedCollection<T> {
    items: BTreeMap<u64, T>,
    total_expected: u64,
}

impl<T> Default for AggregatedCollection<T> {
    fn default() -> Self {
        Self {
            items: BTreeMap::new(),
            total_expected: 0,
        }
    }
}

impl<T: Identified> AggregatedCollection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, items: impl IntoIterator<Item = T>) {
        for item in items {
            self.items.insert(item.id(), item);
        }
    }

    pub fn get(&self, id: u64) -> Option<&T> {
        self.items.get(&id)
    }
}

impl<T> AggregatedCollection<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total entries declared by the latest page metadata, 0 before any.
    pub fn total_expected(&self) -> u64 {
        self.total_expected
    }

    pub fn ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.items.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.values()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items.into_values().collect()
    }
}

/// Why an aggregation stopped early.
#[derive(Debug, Clone, PartialEq)]
pub enum PageFailure {
    ApiError(String),
    UnexpectedError { status: u16, message: String },
    Fatal(ClientError),
}

/// Aggregation progress. `Complete`, `Failed` and `Cancelled` are terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationState {
    /// Nothing fetched yet; the first step fetches page 1.
    Idle,
    Fetching { page: u32 },
    Complete,
    Failed { page: u32, failure: PageFailure },
    /// Stopped by an [`AbortHandle`] before `next_page` was requested.
    Cancelled { next_page: u32 },
}

impl AggregationState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AggregationState::Complete
                | AggregationState::Failed { .. }
                | AggregationState::Cancelled { .. }
        )
    }
}

/// Thread-safe cancellation flag for [`Paginator::run`].
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drives a page source until the collection is complete.
pub struct Paginator<'a, T> {
    fetch: Box<dyn FnMut(u32) -> PageResult<T> + 'a>,
    state: AggregationState,
    collection: AggregatedCollection<T>,
    fetches: u32,
}

impl<T: fmt::Debug> fmt::Debug for Paginator<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Paginator")
            .field("state", &self.state)
            .field("collection", &self.collection)
            .field("fetches", &self.fetches)
            .finish_non_exhaustive()
    }
}

impl<'a, T: Identified> Paginator<'a, T> {
    pub fn new(fetch: impl FnMut(u32) -> PageResult<T> + 'a) -> Self {
        Self {
            fetch: Box::new(fetch),
            state: AggregationState::Idle,
            collection: AggregatedCollection::new(),
            fetches: 0,
        }
    }

    pub fn state(&self) -> &AggregationState {
        &self.state
    }

    /// True until a terminal state is reached.
    pub fn is_loading(&self) -> bool {
        !self.state.is_terminal()
    }

    pub fn total_expected(&self) -> u64 {
        self.collection.total_expected()
    }

    pub fn collection(&self) -> &AggregatedCollection<T> {
        &self.collection
    }

    pub fn into_collection(self) -> AggregatedCollection<T> {
        self.collection
    }

    /// Number of page requests issued so far.
    pub fn fetches(&self) -> u32 {
        self.fetches
    }

    /// The page the next step would request, if any.
    pub fn next_page(&self) -> Option<u32> {
        match self.state {
            AggregationState::Idle => Some(1),
            AggregationState::Fetching { page } => Some(page),
            _ => None,
        }
    }

    /// Fetch the next page and apply it. No-op once terminal.
    pub fn step(&mut self) -> &AggregationState {
        let Some(page) = self.next_page() else {
            return &self.state;
        };
        self.state = AggregationState::Fetching { page };
        debug!(page, "fetching page");
        let result = (self.fetch)(page);
        self.fetches += 1;
        self.apply(result)
    }

    /// Step until a terminal state, checking `abort` before every request.
    pub fn run(&mut self, abort: &AbortHandle) -> &AggregationState {
        while let Some(next_page) = self.next_page() {
            if abort.is_aborted() {
                debug!(next_page, "aggregation cancelled");
                self.state = AggregationState::Cancelled { next_page };
                break;
            }
            self.step();
        }
        &self.state
    }

    pub fn run_to_end(&mut self) -> &AggregationState {
        self.run(&AbortHandle::new())
    }

    /// Apply one page outcome to the state machine.
    ///
    /// Advancement trusts the page's own metadata: the next request is for
    /// `meta.page + 1` while `meta.page < meta.total_pages`. A page whose
    /// `meta.page` differs from the requested page fails the run. Outcomes
    /// applied in a terminal state are ignored.
    pub fn apply(&mut self, result: PageResult<T>) -> &AggregationState {
        let Some(requested) = self.next_page() else {
            return &self.state;
        };

        let page = match result {
            Ok(ApiResult::Success(page)) => page,
            Ok(ApiResult::ApiError(detail)) => {
                return self.fail(requested, PageFailure::ApiError(detail));
            }
            Ok(ApiResult::UnexpectedError { status, message }) => {
                return self.fail(requested, PageFailure::UnexpectedError { status, message });
            }
            Err(e) => return self.fail(requested, PageFailure::Fatal(e)),
        };

        let meta = page.meta;
        if meta.page != requested {
            warn!(requested, reported = meta.page, "page number mismatch");
            let message = format!("requested page {requested}, server returned page {}", meta.page);
            return self.fail(requested, PageFailure::UnexpectedError { status: 200, message });
        }
        self.collection.total_expected = meta.total_entries;

        let short = (page.data.len() as u64) < u64::from(meta.page_size);
        if meta.page < meta.total_pages && short {
            warn!(
                page = meta.page,
                received = page.data.len(),
                page_size = meta.page_size,
                "short page before the last page"
            );
            let message = format!(
                "page {} of {} returned {} items, expected {}",
                meta.page,
                meta.total_pages,
                page.data.len(),
                meta.page_size
            );
            return self.fail(requested, PageFailure::UnexpectedError { status: 200, message });
        }

        self.collection.merge(page.data);

        self.state = if meta.page < meta.total_pages {
            AggregationState::Fetching {
                page: meta.page.saturating_add(1),
            }
        } else {
            AggregationState::Complete
        };
        debug!(
            page = meta.page,
            total_pages = meta.total_pages,
            merged = self.collection.len(),
            total_expected = meta.total_entries,
            "page merged"
        );
        &self.state
    }

    fn fail(&mut self, page: u32, failure: PageFailure) -> &AggregationState {
        warn!(page, ?failure, merged = self.collection.len(), "aggregation failed");
        self.state = AggregationState::Failed { page, failure };
        &self.state
    }
}
