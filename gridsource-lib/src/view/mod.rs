//! Client-side collection view.
//!
//! The [`CollectionView`] owns the raw collection and derives the visible
//! [`Rows`] from it by applying the client-handled axes in a fixed order:
//! filter, then sort, then page.

mod rows;

pub use rows::Iter;
pub use rows::Rows;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use log::{trace, warn};

use crate::error::{panic_message, ViewError};
use crate::fetch::Collection;
use crate::query::{DataFilter, PageInfo, PageRequest, Sort, TextMatcher};
use crate::trigger::{TriggerEvent, TriggerKind, TriggerPolicy};

/// Holds the raw collection and the derived view.
///
/// Setters only mark the view dirty; the derived rows are recomputed on the
/// next [`view`](Self::view) call, so several axis changes in a row cost one
/// recomputation. Values of delegated axes are stored (they are forwarded to
/// the trigger handler) but never applied locally.
///
/// # Example
///
/// ```
/// use gridsource_lib::fetch::Collection;
/// use gridsource_lib::query::{DataFilter, PageRequest};
/// use gridsource_lib::trigger::TriggerPolicy;
/// use gridsource_lib::view::CollectionView;
///
/// let mut view = CollectionView::new(TriggerPolicy::client_side(), None);
/// view.set_raw(Collection::new((1..=10).collect::<Vec<u32>>()));
/// view.set_filter(Some(DataFilter::predicate(|n: &u32, _, _| n % 2 == 0)));
/// view.set_page(Some(PageRequest::new(1, 3)));
///
/// let (rows, error) = view.view();
/// assert!(error.is_none());
/// assert_eq!(rows.to_vec(), vec![8, 10]);
/// ```
pub struct CollectionView<T> {
    raw: Arc<[T]>,
    total_count: Option<usize>,
    loaded: bool,
    filter: Option<DataFilter<T>>,
    sort: Option<Sort<T>>,
    page: Option<PageRequest>,
    policy: TriggerPolicy,
    matcher: Option<Arc<dyn TextMatcher<T>>>,
    cached: Rows<T>,
    page_info: PageInfo,
    dirty: bool,
}

impl<T> CollectionView<T> {
    /// Creates an empty view.
    pub fn new(policy: TriggerPolicy, matcher: Option<Arc<dyn TextMatcher<T>>>) -> Self {
        Self {
            raw: Arc::from(Vec::new()),
            total_count: None,
            loaded: false,
            filter: None,
            sort: None,
            page: None,
            policy,
            matcher,
            cached: Rows::empty(),
            page_info: PageInfo::resolve(None, 0),
            dirty: false,
        }
    }

    /// Replaces the raw collection wholesale.
    pub fn set_raw(&mut self, collection: Collection<T>) {
        self.total_count = collection.total_count();
        self.raw = Arc::from(collection.into_rows());
        self.loaded = true;
        self.dirty = true;
    }

    /// Returns the raw collection.
    pub fn raw(&self) -> Arc<[T]> {
        Arc::clone(&self.raw)
    }

    /// Returns `true` once a raw collection has been set.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Seeds this view with the raw collection and axis values of `other`.
    pub(crate) fn inherit(&mut self, other: &CollectionView<T>) {
        self.raw = Arc::clone(&other.raw);
        self.total_count = other.total_count;
        self.loaded = other.loaded;
        self.filter = other.filter.clone();
        self.sort = other.sort.clone();
        self.page = other.page;
        self.dirty = true;
    }

    /// Sets the filter value.
    pub fn set_filter(&mut self, filter: Option<DataFilter<T>>) {
        self.filter = filter;
        self.touch(TriggerKind::Filter);
    }

    /// Sets the sort descriptor.
    pub fn set_sort(&mut self, sort: Option<Sort<T>>) {
        self.sort = sort;
        self.touch(TriggerKind::Sort);
    }

    /// Sets the page request.
    pub fn set_page(&mut self, page: Option<PageRequest>) {
        self.page = page;
        self.touch(TriggerKind::Page);
    }

    /// Applies the value carried by an axis event.
    ///
    /// Returns `false` for events that carry no axis value.
    pub fn set_axis(&mut self, event: &TriggerEvent<T>) -> bool {
        match event {
            TriggerEvent::Filter(filter) => self.set_filter(filter.clone()),
            TriggerEvent::Sort(sort) => self.set_sort(sort.clone()),
            TriggerEvent::Page(page) => self.set_page(*page),
            TriggerEvent::SourceChanged(_) | TriggerEvent::Refresh => return false,
        }
        true
    }

    fn touch(&mut self, kind: TriggerKind) {
        if self.policy.is_client(kind) {
            self.dirty = true;
        }
    }

    /// Current filter value.
    pub fn filter(&self) -> Option<&DataFilter<T>> {
        self.filter.as_ref()
    }

    /// Current sort descriptor.
    pub fn sort(&self) -> Option<&Sort<T>> {
        self.sort.as_ref()
    }

    /// Current page request.
    pub fn page(&self) -> Option<PageRequest> {
        self.page
    }

    /// Returns `true` if the next [`view`](Self::view) call recomputes.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Page description as of the last [`view`](Self::view) call.
    pub fn page_info(&self) -> PageInfo {
        self.page_info
    }

    /// Returns the derived rows, recomputing them if anything changed.
    ///
    /// A failed recomputation is reported once, alongside the rows that are
    /// exposed after the failure.
    pub fn view(&mut self) -> (Rows<T>, Option<ViewError>) {
        let error = if self.dirty {
            self.dirty = false;
            self.recompute()
        } else {
            None
        };
        (self.cached.clone(), error)
    }

    fn recompute(&mut self) -> Option<ViewError> {
        let raw = Arc::clone(&self.raw);
        let mut error = None;

        let mut indices = match self.filter_indices(&raw) {
            Ok(indices) => indices,
            Err(err) => {
                warn!("{err}; showing unfiltered rows");
                error = Some(err);
                (0..raw.len()).collect()
            }
        };

        if let Some(sort) = self.client_sort() {
            let sorted = catch_unwind(AssertUnwindSafe(|| {
                indices.sort_by(|&a, &b| sort.compare(&raw[a], &raw[b]));
            }));
            if let Err(payload) = sorted {
                let err = ViewError::ComparatorPanicked {
                    id: sort.id().to_string(),
                    message: panic_message(&*payload),
                };
                warn!("{err}; keeping previous view");
                return Some(err);
            }
        }

        let (page_info, visible) = if self.policy.is_client(TriggerKind::Page) {
            let info = PageInfo::resolve(self.page, indices.len());
            let visible = indices[info.range()].to_vec();
            (info, visible)
        } else {
            let total = self.total_count.unwrap_or(raw.len());
            (PageInfo::remote(self.page, total), indices)
        };

        trace!(
            "recomputed view: {} of {} raw rows visible (page {}/{})",
            visible.len(),
            raw.len(),
            page_info.index,
            page_info.page_count
        );

        self.page_info = page_info;
        self.cached = Rows::new(raw, visible);
        error
    }

    fn filter_indices(&self, raw: &Arc<[T]>) -> Result<Vec<usize>, ViewError> {
        let Some(filter) = self.client_filter() else {
            return Ok((0..raw.len()).collect());
        };

        match filter {
            DataFilter::Predicate(pred) => {
                catch_unwind(AssertUnwindSafe(|| {
                    (0..raw.len())
                        .filter(|&i| pred(&raw[i], i, &raw[..]))
                        .collect()
                }))
                .map_err(|payload| ViewError::FilterPanicked(panic_message(&*payload)))
            }
            DataFilter::Text(query) => {
                let Some(matcher) = self.matcher.as_ref() else {
                    return Err(ViewError::MissingTextMatcher(query.clone()));
                };
                catch_unwind(AssertUnwindSafe(|| {
                    let mut matches = matcher.compile(query);
                    (0..raw.len()).filter(|&i| matches(&raw[i])).collect()
                }))
                .map_err(|payload| ViewError::FilterPanicked(panic_message(&*payload)))
            }
        }
    }

    fn client_filter(&self) -> Option<&DataFilter<T>> {
        self.filter
            .as_ref()
            .filter(|_| self.policy.is_client(TriggerKind::Filter))
    }

    fn client_sort(&self) -> Option<&Sort<T>> {
        self.sort
            .as_ref()
            .filter(|_| self.policy.is_client(TriggerKind::Sort))
    }
}

impl<T> std::fmt::Debug for CollectionView<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionView")
            .field("raw_len", &self.raw.len())
            .field("loaded", &self.loaded)
            .field("filter", &self.filter)
            .field("sort", &self.sort)
            .field("page", &self.page)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}
