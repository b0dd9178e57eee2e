//! Bounded walks over paginated record listings.
//!
//! The walk stops once `limit` items were accepted or the store returns an
//! empty continuation token. The store is trusted to eventually return an
//! empty token; a store that keeps handing out tokens while no record is
//! accepted keeps the walk going.

use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::{ListRecordsRequest, ResultsClient};
use crate::error::{Result, ResultsError};
use crate::record::StoredRecord;

/// Run `fut` unless `cancel` fires first.
///
/// # Errors
/// Returns [`ResultsError::Cancelled`] when cancellation wins, otherwise the
/// future's own result.
pub async fn with_cancel<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(ResultsError::Cancelled),
        result = fut => result,
    }
}

/// Paginated record walk with an item cap.
#[derive(Debug, Clone)]
pub struct PageWalker {
    request: ListRecordsRequest,
    limit: usize,
    shrink_to_budget: bool,
}

impl PageWalker {
    /// Walk pages of `request` until `limit` items were accepted.
    #[must_use]
    pub fn new(request: ListRecordsRequest, limit: usize) -> Self {
        Self {
            request,
            limit,
            shrink_to_budget: false,
        }
    }

    /// Lower the requested page size to the remaining budget on every page.
    #[must_use]
    pub fn shrink_to_budget(mut self) -> Self {
        self.shrink_to_budget = true;
        self
    }

    /// Fetch pages and collect the items `accept` keeps.
    ///
    /// `accept` sees every record in store order; `Ok(None)` skips a record
    /// and an error aborts the walk. Cancellation is checked before every
    /// page and raced against each fetch.
    ///
    /// # Errors
    /// Propagates client and `accept` failures, or [`ResultsError::Cancelled`].
    /// Partial results are discarded.
    pub async fn collect<T, F>(
        mut self,
        client: &dyn ResultsClient,
        cancel: &CancellationToken,
        mut accept: F,
    ) -> Result<Vec<T>>
    where
        F: FnMut(&StoredRecord) -> Result<Option<T>>,
    {
        let mut items = Vec::new();
        if self.limit == 0 {
            return Ok(items);
        }
        self.apply_budget(self.limit);

        loop {
            if cancel.is_cancelled() {
                return Err(ResultsError::Cancelled);
            }

            debug!(
                parent = %self.request.parent,
                page_size = self.request.page_size,
                page_token = %self.request.page_token,
                "Listing records"
            );
            let page = with_cancel(cancel, client.list_records(&self.request)).await?;

            for record in &page.records {
                if let Some(item) = accept(record)? {
                    items.push(item);
                    if items.len() >= self.limit {
                        return Ok(items);
                    }
                }
            }

            if page.next_page_token.is_empty() {
                return Ok(items);
            }
            self.request.page_token = page.next_page_token;
            self.apply_budget(self.limit - items.len());
        }
    }

    fn apply_budget(&mut self, remaining: usize) {
        if !self.shrink_to_budget {
            return;
        }
        let remaining = u32::try_from(remaining).unwrap_or(u32::MAX);
        if self.request.page_size == 0 || self.request.page_size > remaining {
            self.request.page_size = remaining;
        }
    }
}
