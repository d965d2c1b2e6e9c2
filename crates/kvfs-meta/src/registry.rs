//! Small-integer key registry with FIFO recycling.
//!
//! Maintains a path to key mapping for content addressing. Retired keys
//! return to a reuse pool and are handed out again before the counter
//! advances, keeping the live key range dense.

use std::collections::{HashMap, VecDeque};

use parking_lot::RwLock;

use kvfs_types::{make_error, make_error_msg, RegistryCode, Result};

/// Registry key type.
pub type RegKey = u32;

/// Smallest allocatable key.
pub const MIN_KEY: RegKey = 1;

/// Largest allocatable key.
pub const MAX_KEY: RegKey = u32::MAX;

struct RegistryState {
    /// Next counter candidate. Held as u64 so advancing past MAX_KEY is
    /// representable instead of wrapping.
    current: u64,
    max: u64,
    map: HashMap<String, RegKey>,
    pool: VecDeque<RegKey>,
}

/// Path-to-key registry shared across callers.
///
/// One reader/writer lock mediates all access: lookups run concurrently,
/// any mutation holds exclusive access for its duration. The composite
/// operations take the lock once so their check-then-act steps cannot
/// interleave with other writers.
pub struct KeyRegistry {
    state: RwLock<RegistryState>,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::with_bounds(MIN_KEY, MAX_KEY)
    }

    /// Registry over a custom key range, for exhaustion testing.
    pub fn with_bounds(min: RegKey, max: RegKey) -> Self {
        Self {
            state: RwLock::new(RegistryState {
                current: min as u64,
                max: max as u64,
                map: HashMap::new(),
                pool: VecDeque::new(),
            }),
        }
    }

    /// Allocate a key: recycled first, otherwise advance the counter.
    ///
    /// Fails with `KeySpaceExhausted` once the counter has passed the
    /// upper bound and the pool is empty, leaving state unchanged.
    pub fn get_next_key(&self) -> Result<RegKey> {
        let mut state = self.state.write();
        Self::next_key_locked(&mut state)
    }

    fn next_key_locked(state: &mut RegistryState) -> Result<RegKey> {
        if let Some(key) = state.pool.pop_front() {
            return Ok(key);
        }
        if state.current > state.max {
            return make_error(RegistryCode::KEY_SPACE_EXHAUSTED);
        }
        let key = state.current as RegKey;
        state.current += 1;
        Ok(key)
    }

    /// Record a path to key association, overwriting any prior one.
    pub fn make_new_entry(&self, key: RegKey, path: &str) {
        self.state.write().map.insert(path.to_string(), key);
    }

    /// Return a retired key to the reuse pool.
    pub fn recycle_key(&self, key: RegKey) {
        self.state.write().pool.push_back(key);
    }

    /// Look up the key for `path`, if registered.
    pub fn get_key_from_path(&self, path: &str) -> Option<RegKey> {
        self.state.read().map.get(path).copied()
    }

    /// Whether `path` is registered.
    pub fn entry_exists(&self, path: &str) -> bool {
        self.state.read().map.contains_key(path)
    }

    /// Drop the association for `path` without recycling its key.
    pub fn erase_entry(&self, path: &str) {
        self.state.write().map.remove(path);
    }

    /// Idempotent ensure-assigned: the existing key if `path` is already
    /// registered, otherwise a fresh allocation registered under `path`.
    pub fn handle_entries(&self, path: &str) -> Result<RegKey> {
        let mut state = self.state.write();
        if let Some(key) = state.map.get(path) {
            return Ok(*key);
        }
        let key = Self::next_key_locked(&mut state)?;
        state.map.insert(path.to_string(), key);
        Ok(key)
    }

    /// Erase `path` and recycle its key as one exclusive operation.
    ///
    /// Fails with `KeyMismatch` if `path` is not currently associated with
    /// `key`; nothing is modified in that case.
    pub fn handle_erase(&self, path: &str, key: RegKey) -> Result<()> {
        let mut state = self.state.write();
        match state.map.get(path) {
            Some(found) if *found == key => {}
            Some(found) => {
                let found = *found;
                return make_error_msg(
                    RegistryCode::KEY_MISMATCH,
                    format!("path {path} holds key {found}, not {key}"),
                );
            }
            None => {
                return make_error_msg(
                    RegistryCode::KEY_MISMATCH,
                    format!("path {path} is not registered"),
                )
            }
        }
        state.map.remove(path);
        state.pool.push_back(key);
        Ok(())
    }
}

impl Default for KeyRegistry {
    fn default() -> Self {
        Self::new()
    }
}
