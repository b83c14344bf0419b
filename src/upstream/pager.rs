//! Offset-based pagination over upstream collections.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{call_as, Upstream, UpstreamRequest};
use crate::errors::AppResult;

/// One page of an upstream collection. A missing `data` field reads as an empty page.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// Sequential page walker.
///
/// Page `n + 1` is only requested after page `n` has been handed to the caller.
/// The walk ends on an empty page or on a page shorter than `page_size`.
pub struct Pager<'a, T> {
    upstream: &'a dyn Upstream,
    path: String,
    page_size: usize,
    offset: usize,
    finished: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: DeserializeOwned> Pager<'a, T> {
    pub fn new(upstream: &'a dyn Upstream, path: impl Into<String>, page_size: usize) -> Self {
        Self {
            upstream,
            path: path.into(),
            page_size: page_size.max(1),
            offset: 0,
            finished: false,
            _marker: PhantomData,
        }
    }

    /// Fetch the next page, or `None` once the collection is exhausted.
    pub async fn next_page(&mut self) -> AppResult<Option<Vec<T>>> {
        if self.finished {
            return Ok(None);
        }

        let request = UpstreamRequest::get(self.path.as_str())
            .with_query("limit", self.page_size)
            .with_query("offset", self.offset);
        let page: Page<T> = call_as(self.upstream, request).await?;

        if page.data.is_empty() {
            self.finished = true;
            return Ok(None);
        }

        if page.data.len() < self.page_size {
            self.finished = true;
        } else {
            self.offset += self.page_size;
        }

        Ok(Some(page.data))
    }

    /// Offset of the next page to be requested.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
