// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Page-by-page streaming of query results
//!
//! The iterator owns a clone of the builder and re-queries it for each page. A page that
//! comes back full means there may be more data, so the next page is fetched once the
//! buffer runs dry. A short page ends the stream without another round trip.

use super::builder::CriteriaBuilder;
use crate::error::{Error, Result};
use crate::schema::Entity;
use std::collections::VecDeque;
use std::iter::FusedIterator;

/// Iterator that streams the results of a query one page at a time
pub struct PagedResultIterator<T: Entity> {
    query: CriteriaBuilder<T>,
    page_size: i64,
    page_no: i64,
    buffer: VecDeque<T>,
    last_page_len: usize,
    loaded: bool,
    failed: bool,
}

impl<T: Entity> PagedResultIterator<T> {
    /// Create an iterator starting at `start_page` (1-based); nothing is loaded until the
    /// first call to [`has_next`](Self::has_next)
    pub fn new(query: CriteriaBuilder<T>, start_page: i64, page_size: i64) -> Result<Self> {
        if page_size < 1 {
            return Err(Error::InvalidArgument(format!(
                "Page size must be positive, got {}",
                page_size
            )));
        }
        if start_page < 1 {
            return Err(Error::InvalidArgument(format!(
                "Page numbers start at 1, got {}",
                start_page
            )));
        }
        Ok(Self {
            query,
            page_size,
            page_no: start_page,
            buffer: VecDeque::new(),
            last_page_len: 0,
            loaded: false,
            failed: false,
        })
    }

    pub fn page_no(&self) -> i64 {
        self.page_no
    }

    pub fn page_size(&self) -> i64 {
        self.page_size
    }

    /// Jump to page `page_no` and discard buffered rows.
    ///
    /// Until the next [`has_next`](Self::has_next) loads that page,
    /// [`next_entity`](Self::next_entity) fails with `InvalidState`.
    pub fn set_page_no(&mut self, page_no: i64) -> Result<()> {
        if page_no < 1 {
            return Err(Error::InvalidArgument(format!(
                "Page numbers start at 1, got {}",
                page_no
            )));
        }
        self.page_no = page_no;
        self.buffer.clear();
        self.last_page_len = 0;
        self.loaded = false;
        self.failed = false;
        Ok(())
    }

    fn load_page(&mut self) -> Result<()> {
        log::trace!("Loading page {} (size {})", self.page_no, self.page_size);
        let rows = self.query.find_page(self.page_no, self.page_size)?;
        self.last_page_len = rows.len();
        self.buffer = rows.into();
        self.loaded = true;
        Ok(())
    }

    fn last_page_was_full(&self) -> bool {
        usize::try_from(self.page_size).map_or(false, |size| self.last_page_len == size)
    }

    /// Whether another entity is available, loading pages as needed
    pub fn has_next(&mut self) -> Result<bool> {
        if !self.loaded {
            self.load_page()?;
        }
        if !self.buffer.is_empty() {
            return Ok(true);
        }
        if self.last_page_was_full() {
            self.page_no += 1;
            self.load_page()?;
            return Ok(!self.buffer.is_empty());
        }
        Ok(false)
    }

    /// Take the next buffered entity
    pub fn next_entity(&mut self) -> Result<T> {
        if !self.loaded {
            return Err(Error::InvalidState(
                "No page loaded, call has_next first".to_string(),
            ));
        }
        if self.buffer.is_empty() && !self.has_next()? {
            return Err(Error::InvalidState("No more results".to_string()));
        }
        self.buffer
            .pop_front()
            .ok_or_else(|| Error::InvalidState("No more results".to_string()))
    }
}

impl<T: Entity> Iterator for PagedResultIterator<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.has_next() {
            Ok(true) => self.buffer.pop_front().map(Ok),
            Ok(false) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

impl<T: Entity> FusedIterator for PagedResultIterator<T> {}
