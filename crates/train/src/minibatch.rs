//! Fixed-size minibatches over a sample list.

/// Yields consecutive slices of at most `batch_size` items; the last batch
/// holds the remainder.
#[derive(Debug, Clone)]
pub struct BatchIterator<'a, T> {
    items: &'a [T],
    batch_size: usize,
}

impl<'a, T> BatchIterator<'a, T> {
    /// A zero batch size is treated as one.
    pub fn new(items: &'a [T], batch_size: usize) -> Self {
        Self {
            items,
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_count(&self) -> usize {
        self.items.len().div_ceil(self.batch_size)
    }
}

impl<'a, T> Iterator for BatchIterator<'a, T> {
    type Item = &'a [T];

    fn next(&mut self) -> Option<Self::Item> {
        if self.items.is_empty() {
            return None;
        }
        let take = self.batch_size.min(self.items.len());
        let (batch, rest) = self.items.split_at(take);
        self.items = rest;
        Some(batch)
    }
}
