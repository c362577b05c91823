//! Per-document async locks.
//!
//! Every mutating engine operation holds the lock of its document for the
//! whole read-check-write sequence. Operations on different documents do
//! not contend here; they only meet at SQLite's write lock.
//!
//! Entries live only while someone holds or waits for them: the last
//! [`DocumentGuard`] to drop removes its document from the table, so ids
//! that turn out not to exist (or were deleted) leave nothing behind.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Lock table keyed by document id.
///
/// The outer `std` mutex only guards the map and is never held across an
/// `.await`.
#[derive(Debug, Default)]
pub struct DocumentLocks {
    inner: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

/// Exclusive access to one document; releases on drop.
#[derive(Debug)]
pub struct DocumentGuard<'a> {
    // Declared first so the mutex is released before the entry is checked.
    _held: OwnedMutexGuard<()>,
    _entry: Entry<'a>,
}

/// One interested party in a table entry, holder or waiter.
#[derive(Debug)]
struct Entry<'a> {
    table: &'a DocumentLocks,
    document_id: String,
    lock: Arc<Mutex<()>>,
}

impl Drop for Entry<'_> {
    fn drop(&mut self) {
        let mut map = self.table.inner.lock().unwrap_or_else(|e| e.into_inner());
        let Some(current) = map.get(&self.document_id) else {
            return;
        };
        // The map and this entry are the only references left: nobody else
        // holds or waits. New waiters clone under the map lock, so this
        // check cannot race them.
        if Arc::ptr_eq(current, &self.lock) && Arc::strong_count(&self.lock) == 2 {
            map.remove(&self.document_id);
        }
    }
}

impl DocumentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `document_id`.
    pub async fn acquire(&self, document_id: &str) -> DocumentGuard<'_> {
        let entry = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            let lock = Arc::clone(
                map.entry(document_id.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            );
            Entry {
                table: self,
                document_id: document_id.to_string(),
                lock,
            }
        };
        let held = Arc::clone(&entry.lock).lock_owned().await;
        DocumentGuard {
            _held: held,
            _entry: entry,
        }
    }

    /// Number of documents with a lock entry.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
