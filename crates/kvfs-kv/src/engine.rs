use kvfs_types::Result;

/// Forward iterator over an ordered keyspace.
///
/// `key` and `value` may only be consulted while `valid` returns true;
/// outside a valid position they return empty slices. Iteration order is
/// byte-lexicographic ascending.
pub trait KvIter {
    /// Position the iterator at the first entry whose key is `>= key`.
    fn seek(&mut self, key: &[u8]);

    /// Whether the iterator is positioned at an entry.
    fn valid(&self) -> bool;

    /// Key at the current position.
    fn key(&self) -> &[u8];

    /// Value at the current position.
    fn value(&self) -> &[u8];

    /// Advance to the next entry in key order.
    fn next(&mut self);

    /// Report any error encountered during iteration.
    ///
    /// Checked after `valid` turns false to distinguish end-of-range from
    /// a backend failure.
    fn status(&self) -> Result<()>;
}

/// Blocking ordered key-value engine.
///
/// Implementations must be safe to share across threads; each point
/// operation is atomic on its own, and completed writes are visible to
/// iterators created afterwards.
pub trait KvEngine: Send + Sync {
    /// Point lookup. `Ok(None)` means the key is absent.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Insert or overwrite a single key.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Remove a single key. Deleting an absent key is not an error.
    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Create a new forward iterator. The iterator observes all writes
    /// completed before this call.
    fn new_iter(&self) -> Result<Box<dyn KvIter + '_>>;
}
