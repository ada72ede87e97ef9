//! Lazy cursors over an LMDB database.
//!
//! A cursor remembers the last key it returned and opens a short read
//! transaction on every `next()`, so no transaction outlives a single step
//! and writers are never blocked by a slow consumer.

use std::ops::Bound;

use heed::types::Bytes;
use heed::{Database, RoTxn};

use fedchain_store::StoreError;

use crate::{LmdbEnvironment, LmdbError};

/// Maps a raw record to zero or one result. `None` skips the record.
type Step<T> = Box<
    dyn FnMut(&LmdbEnvironment, &RoTxn<'_>, &[u8], &[u8]) -> Result<Option<T>, LmdbError> + Send,
>;

pub(crate) struct Cursor<T> {
    env: LmdbEnvironment,
    db: Database<Bytes, Bytes>,
    start: Vec<u8>,
    end: Option<Vec<u8>>,
    last: Option<Vec<u8>>,
    step: Step<T>,
    done: bool,
}

impl<T> Cursor<T> {
    /// Walk keys in `[start, end)`. An empty `start` begins at the first key;
    /// `end = None` means to the last key.
    pub(crate) fn new(
        env: LmdbEnvironment,
        db: Database<Bytes, Bytes>,
        start: Vec<u8>,
        end: Option<Vec<u8>>,
        step: impl FnMut(&LmdbEnvironment, &RoTxn<'_>, &[u8], &[u8]) -> Result<Option<T>, LmdbError>
            + Send
            + 'static,
    ) -> Self {
        Self {
            env,
            db,
            start,
            end,
            last: None,
            step: Box::new(step),
            done: false,
        }
    }

    fn advance(&mut self) -> Result<Option<T>, LmdbError> {
        let rtxn = self.env.env.read_txn()?;
        let lower = match &self.last {
            Some(key) => Bound::Excluded(key.as_slice()),
            // LMDB rejects zero-length keys, so an empty start means the first key.
            None if self.start.is_empty() => Bound::Unbounded,
            None => Bound::Included(self.start.as_slice()),
        };
        let upper = match &self.end {
            Some(key) => Bound::Excluded(key.as_slice()),
            None => Bound::Unbounded,
        };
        let bounds = (lower, upper);

        let mut last_seen = None;
        let mut found = None;
        for item in self.db.range(&rtxn, &bounds)? {
            let (key, value) = item?;
            last_seen = Some(key.to_vec());
            if let Some(record) = (self.step)(&self.env, &rtxn, key, value)? {
                found = Some(record);
                break;
            }
        }

        if found.is_none() {
            self.done = true;
        }
        if last_seen.is_some() {
            self.last = last_seen;
        }
        Ok(found)
    }
}

impl<T> Iterator for Cursor<T> {
    type Item = Result<T, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.advance() {
            Ok(found) => found.map(Ok),
            Err(e) => {
                self.done = true;
                Some(Err(e.into()))
            }
        }
    }
}
