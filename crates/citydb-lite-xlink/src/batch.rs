// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Batched writes

use citydb_lite_model::{CityDatabase, Result, Write};
use std::sync::Arc;

/// Accumulates writes and executes them in batches
///
/// A writer belongs to exactly one resolver. Flushing an empty batch does
/// nothing, so `flush` may be called at every pass boundary.
pub struct BatchWriter {
    db: Arc<dyn CityDatabase>,
    pending: Vec<Write>,
    batch_size: usize,
    /// Writes executed so far
    executed: usize,
}

impl BatchWriter {
    /// Create a writer that flushes every `batch_size` writes
    pub fn new(db: Arc<dyn CityDatabase>, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            db,
            pending: Vec::with_capacity(batch_size),
            batch_size,
            executed: 0,
        }
    }

    /// Queue a write, executing the batch once it is full
    pub fn push(&mut self, write: Write) -> Result<()> {
        self.pending.push(write);
        if self.pending.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Queue several writes that belong to one record
    pub fn extend(&mut self, writes: impl IntoIterator<Item = Write>) -> Result<()> {
        for write in writes {
            self.push(write)?;
        }
        Ok(())
    }

    /// Execute all queued writes
    pub fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        self.db.execute_batch(&self.pending)?;
        self.executed += self.pending.len();
        self.pending.clear();
        Ok(())
    }

    /// Number of queued writes
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Number of executed writes
    pub fn executed(&self) -> usize {
        self.executed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDatabase;
    use citydb_lite_model::{LinkTable, RowId};

    fn link(n: i64) -> Write {
        Write::InsertLink {
            table: LinkTable::Generalization,
            left: RowId(n),
            right: RowId(n + 1),
        }
    }

    #[test]
    fn test_flushes_when_full() {
        let db = Arc::new(MemoryDatabase::new());
        let mut writer = BatchWriter::new(db.clone(), 2);

        writer.push(link(1)).unwrap();
        assert_eq!(writer.pending(), 1);
        assert_eq!(db.batches_executed(), 0);

        writer.push(link(2)).unwrap();
        assert_eq!(writer.pending(), 0);
        assert_eq!(db.batches_executed(), 1);
        assert_eq!(writer.executed(), 2);
    }

    #[test]
    fn test_flush_is_idempotent() {
        let db = Arc::new(MemoryDatabase::new());
        let mut writer = BatchWriter::new(db.clone(), 10);

        writer.flush().unwrap();
        assert_eq!(db.batches_executed(), 0);

        writer.push(link(1)).unwrap();
        writer.flush().unwrap();
        writer.flush().unwrap();
        assert_eq!(db.batches_executed(), 1);
        assert_eq!(db.links(LinkTable::Generalization).len(), 1);
    }

    #[test]
    fn test_connection_failure_keeps_batch() {
        let db = Arc::new(MemoryDatabase::new());
        let mut writer = BatchWriter::new(db.clone(), 10);
        writer.push(link(1)).unwrap();

        db.set_connection_lost(true);
        let err = writer.flush().unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(writer.pending(), 1);
    }
}
