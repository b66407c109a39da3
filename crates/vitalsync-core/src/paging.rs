//! The uniform skip/return paging contract and its reconciliation with the
//! native paging shapes of upstream sources.
//!
//! Callers always express paging as "skip N, return M" over the
//! reverse-chronologically ordered candidate set. Upstream sources natively
//! support one of three shapes:
//!
//! - arbitrary skip+limit: the window is forwarded verbatim;
//! - page-index + page-size: see [`PagingWindow::page_request`];
//! - no paging at all: the bounded full set is fetched, sorted, and
//!   windowed in memory with [`PagingWindow::window`].

use crate::{UtcDateTime, ValidationError};

/// Server-side cap on the number of points a single read may return. Also
/// advertised as the catalog's chunk-size hint.
pub const MAX_NUM_TO_RETURN: u64 = 2000;

/// The uniform skip/return window, constructed once per request from
/// validated input and immutable thereafter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingWindow {
    num_to_skip: u64,
    num_to_return: u64,
}

impl Default for PagingWindow {
    fn default() -> Self {
        Self {
            num_to_skip: 0,
            num_to_return: MAX_NUM_TO_RETURN,
        }
    }
}

impl PagingWindow {
    pub fn new(num_to_skip: u64, num_to_return: u64) -> Result<Self, ValidationError> {
        if num_to_return > MAX_NUM_TO_RETURN {
            return Err(ValidationError::InvalidNumToReturn {
                value: num_to_return.to_string(),
                max: MAX_NUM_TO_RETURN,
            });
        }
        Ok(Self {
            num_to_skip,
            num_to_return,
        })
    }

    /// Parses the optional wire-level parameters, defaulting to "skip
    /// nothing, return the maximum page".
    pub fn parse(
        num_to_skip: Option<&str>,
        num_to_return: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let skip = match num_to_skip {
            Some(value) => value
                .parse::<u64>()
                .map_err(|_| ValidationError::InvalidNumToSkip {
                    value: value.to_owned(),
                })?,
            None => 0,
        };

        let ret = match num_to_return {
            Some(value) => value
                .parse::<u64>()
                .map_err(|_| ValidationError::InvalidNumToReturn {
                    value: value.to_owned(),
                    max: MAX_NUM_TO_RETURN,
                })?,
            None => MAX_NUM_TO_RETURN,
        };

        Self::new(skip, ret)
    }

    pub const fn num_to_skip(self) -> u64 {
        self.num_to_skip
    }

    pub const fn num_to_return(self) -> u64 {
        self.num_to_return
    }

    /// Translates the window into a page-index/page-size upstream request.
    ///
    /// When the skip count is an exact multiple of the return count the
    /// window is a native page: `page = skip / return`, `page_size = return`,
    /// nothing discarded. Otherwise the window straddles page boundaries, so
    /// a single front-anchored page of size `skip + return` is fetched and
    /// the first `skip` records of the batch are discarded locally. Either
    /// way the emitted slice is identical to what a native skip+limit
    /// upstream would have produced. With `return == 0` the request
    /// degenerates to page 0 with a page size that still covers the skipped
    /// records, for a count-only probe.
    pub fn page_request(self) -> PageRequest {
        if self.num_to_return == 0 {
            return PageRequest {
                page: 0,
                page_size: self.num_to_skip.max(1),
                local_discard: self.num_to_skip,
            };
        }

        if self.num_to_skip % self.num_to_return == 0 {
            return PageRequest {
                page: self.num_to_skip / self.num_to_return,
                page_size: self.num_to_return,
                local_discard: 0,
            };
        }

        PageRequest {
            page: 0,
            page_size: self.num_to_skip + self.num_to_return,
            local_discard: self.num_to_skip,
        }
    }

    /// Applies the window in memory: skips `num_to_skip` candidates, then
    /// takes at most `num_to_return`, capped at what was available.
    pub fn window<T>(self, items: Vec<T>) -> Vec<T> {
        items
            .into_iter()
            .skip(usize::try_from(self.num_to_skip).unwrap_or(usize::MAX))
            .take(usize::try_from(self.num_to_return).unwrap_or(usize::MAX))
            .collect()
    }
}

/// One upstream page-shaped fetch derived from a [`PagingWindow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub page_size: u64,
    /// Number of leading records of the returned batch to discard before
    /// emitting, bounded by what the upstream actually returned.
    pub local_discard: u64,
}

impl PageRequest {
    /// Trims a fetched page batch down to the externally observable window:
    /// the local-discard prefix is dropped, then the emit count is capped at
    /// the original `num_to_return`.
    pub fn trim<T>(self, batch: Vec<T>, num_to_return: u64) -> Vec<T> {
        batch
            .into_iter()
            .skip(usize::try_from(self.local_discard).unwrap_or(usize::MAX))
            .take(usize::try_from(num_to_return).unwrap_or(usize::MAX))
            .collect()
    }
}

/// Sorts candidates into the platform's canonical ordering:
/// reverse-chronological, stable so equal timestamps keep upstream order.
/// Sources without timestamps keep insertion order by never calling this.
pub fn sort_reverse_chronological<T, F>(items: &mut [T], timestamp: F)
where
    F: Fn(&T) -> Option<UtcDateTime>,
{
    items.sort_by(|a, b| timestamp(b).cmp(&timestamp(a)));
}
