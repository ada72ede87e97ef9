//! Lazy, single-pass query results.
//!
//! A `QueryIter` yields one record at a time and may hit storage again on
//! each `next()`. It cannot be rewound; re-run the query to start over.

use crate::StoreError;

pub type QueryIter<T> = Box<dyn Iterator<Item = Result<T, StoreError>> + Send>;

/// Adapter for backends whose results are already in memory.
pub struct VecIter<T>(std::vec::IntoIter<T>);

impl<T: Send + 'static> VecIter<T> {
    pub fn boxed(items: Vec<T>) -> QueryIter<T> {
        Box::new(Self(items.into_iter()))
    }
}

impl<T> Iterator for VecIter<T> {
    type Item = Result<T, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(Ok)
    }
}
