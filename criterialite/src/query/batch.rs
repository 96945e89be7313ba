// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Splitting of oversized value sets into bounded batches

/// Maximum number of values in one membership clause
pub const MAX_IN_SIZE: usize = 500;

/// Iterator that yields consecutive batches of at most `batch_size` values
///
/// Every input value appears in exactly one batch, in input order.
pub struct BatchSplitter<T> {
    batch_size: usize,
    values: std::vec::IntoIter<T>,
}

impl<T> BatchSplitter<T> {
    /// Create a splitter. A `batch_size` of zero is treated as one.
    pub fn new(batch_size: usize, values: Vec<T>) -> Self {
        Self {
            batch_size: batch_size.max(1),
            values: values.into_iter(),
        }
    }

    /// Number of batches still to be produced
    pub fn remaining_batches(&self) -> usize {
        self.values.len().div_ceil(self.batch_size)
    }
}

impl<T> Iterator for BatchSplitter<T> {
    type Item = Vec<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let next_size = self.batch_size.min(self.values.len());
        if next_size == 0 {
            return None;
        }
        Some(self.values.by_ref().take(next_size).collect())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let batches = self.remaining_batches();
        (batches, Some(batches))
    }
}

impl<T> ExactSizeIterator for BatchSplitter<T> {}
