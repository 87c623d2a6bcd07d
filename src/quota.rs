//! OpenUV request-quota cache at `<root>/cache/uv_rc`.
//!
//! The API resets its daily quota at midnight UTC. The counter is a fixed
//! 16-byte record, so a truncated or padded file is caught by its length:
//!
//! ```text
//! offset 0..8  : expires   (u64 big-endian, Unix seconds)
//! offset 8..16 : remaining (u64 big-endian)
//! ```

use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Exact length of a persisted counter.
pub const RECORD_LEN: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum QuotaError {
    #[error("cache file corrupted: {} is {len} bytes, expected 16 (run with --reset-cache)", .path.display())]
    Corrupted { path: PathBuf, len: usize },
    #[error("cannot write cache file {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Requests left until the next quota reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestCounter {
    pub remaining: u64,
    /// Unix timestamp of the next reset.
    pub expires: i64,
}

impl RequestCounter {
    /// A full counter that expires at the next UTC midnight after `now`.
    pub fn fresh(limit: u64, now: DateTime<Utc>) -> Self {
        Self {
            remaining: limit,
            expires: next_reset(now),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() > self.expires
    }

    pub fn to_bytes(&self) -> [u8; RECORD_LEN] {
        let mut buf = [0u8; RECORD_LEN];
        buf[..8].copy_from_slice(&(self.expires as u64).to_be_bytes());
        buf[8..].copy_from_slice(&self.remaining.to_be_bytes());
        buf
    }

    /// Decode a record. `None` if `bytes` is not exactly [`RECORD_LEN`] long.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let record: &[u8; RECORD_LEN] = bytes.try_into().ok()?;
        let (expires, remaining) = record.split_at(8);
        Some(Self {
            expires: u64::from_be_bytes(expires.try_into().ok()?) as i64,
            remaining: u64::from_be_bytes(remaining.try_into().ok()?),
        })
    }
}

/// Unix timestamp of the first UTC midnight strictly after `now`.
pub fn next_reset(now: DateTime<Utc>) -> i64 {
    now.date_naive()
        .succ_opt()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc().timestamp())
        .unwrap_or(i64::MAX)
}

/// Outcome of [`QuotaCache::consume`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consumption {
    /// One request was taken from the quota.
    Granted { remaining: u64 },
    /// Nothing left today. No request was taken and nothing was written.
    Exhausted,
}

impl Consumption {
    /// Requests left after this call.
    pub fn remaining(&self) -> u64 {
        match self {
            Self::Granted { remaining } => *remaining,
            Self::Exhausted => 0,
        }
    }
}

// ─── Storage ────────────────────────────────────────────────────

/// Where the counter lives between runs.
pub trait CounterStore {
    /// `Ok(None)` when there is no usable record yet.
    fn load(&self) -> Result<Option<RequestCounter>, QuotaError>;
    fn save(&mut self, counter: &RequestCounter) -> Result<(), QuotaError>;
}

/// The counter as a binary file.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CounterStore for FileStore {
    fn load(&self) -> Result<Option<RequestCounter>, QuotaError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "no readable quota cache");
                return Ok(None);
            }
        };

        RequestCounter::from_bytes(&bytes)
            .map(Some)
            .ok_or_else(|| QuotaError::Corrupted {
                path: self.path.clone(),
                len: bytes.len(),
            })
    }

    fn save(&mut self, counter: &RequestCounter) -> Result<(), QuotaError> {
        let persist = |source| QuotaError::Persist {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(persist)?;
        }
        fs::write(&self.path, counter.to_bytes()).map_err(persist)
    }
}

// ─── Cache ──────────────────────────────────────────────────────

/// Tracks the remaining daily OpenUV quota.
pub struct QuotaCache<S = FileStore> {
    store: S,
}

impl QuotaCache<FileStore> {
    /// Cache backed by the file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::with_store(FileStore::new(path))
    }
}

impl<S: CounterStore> QuotaCache<S> {
    pub fn with_store(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Take one request from today's quota of `limit`.
    pub fn consume(&mut self, limit: u64) -> Result<Consumption, QuotaError> {
        self.consume_at(limit, Utc::now())
    }

    /// [`consume`](Self::consume) with an explicit clock.
    pub fn consume_at(&mut self, limit: u64, now: DateTime<Utc>) -> Result<Consumption, QuotaError> {
        let mut counter = match self.store.load()? {
            Some(counter) if !counter.is_expired(now) => counter,
            Some(stale) => {
                debug!(expired_at = stale.expires, limit, "quota expired, resetting");
                RequestCounter::fresh(limit, now)
            }
            None => {
                debug!(limit, "quota uninitialized, resetting");
                RequestCounter::fresh(limit, now)
            }
        };

        if counter.remaining == 0 {
            debug!(resets_at = counter.expires, "daily request quota exhausted");
            return Ok(Consumption::Exhausted);
        }

        counter.remaining -= 1;
        self.store.save(&counter)?;

        debug!(remaining = counter.remaining, "request consumed");
        Ok(Consumption::Granted {
            remaining: counter.remaining,
        })
    }

    /// Overwrite the stored counter with a full quota of `limit`.
    pub fn reset(&mut self, limit: u64) -> Result<RequestCounter, QuotaError> {
        self.reset_at(limit, Utc::now())
    }

    pub fn reset_at(&mut self, limit: u64, now: DateTime<Utc>) -> Result<RequestCounter, QuotaError> {
        let counter = RequestCounter::fresh(limit, now);
        self.store.save(&counter)?;
        Ok(counter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    /// In-memory store that counts writes.
    #[derive(Default)]
    struct MemoryStore {
        counter: Option<RequestCounter>,
        writes: usize,
    }

    impl CounterStore for MemoryStore {
        fn load(&self) -> Result<Option<RequestCounter>, QuotaError> {
            Ok(self.counter)
        }

        fn save(&mut self, counter: &RequestCounter) -> Result<(), QuotaError> {
            self.counter = Some(*counter);
            self.writes += 1;
            Ok(())
        }
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn memory_cache(counter: Option<RequestCounter>) -> QuotaCache<MemoryStore> {
        QuotaCache::with_store(MemoryStore { counter, writes: 0 })
    }

    fn file_cache() -> (QuotaCache, TempDir) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache").join("uv_rc");
        (QuotaCache::open(path), dir)
    }

    #[test]
    fn test_next_reset_is_next_midnight() {
        let now = at(2024, 6, 15, 13, 45, 10);
        assert_eq!(next_reset(now), at(2024, 6, 16, 0, 0, 0).timestamp());
    }

    #[test]
    fn test_next_reset_at_exact_midnight() {
        let now = at(2024, 6, 15, 0, 0, 0);
        assert_eq!(next_reset(now), at(2024, 6, 16, 0, 0, 0).timestamp());
    }

    #[test]
    fn test_next_reset_year_boundary() {
        let now = at(2023, 12, 31, 23, 59, 59);
        assert_eq!(next_reset(now), at(2024, 1, 1, 0, 0, 0).timestamp());
    }

    #[test]
    fn test_record_round_trip() {
        let counters = [
            RequestCounter { remaining: 0, expires: 0 },
            RequestCounter { remaining: 50, expires: 1_718_496_000 },
            RequestCounter { remaining: u64::MAX, expires: i64::MAX },
            RequestCounter { remaining: 7, expires: -1 },
        ];
        for counter in counters {
            assert_eq!(RequestCounter::from_bytes(&counter.to_bytes()), Some(counter));
        }
    }

    #[test]
    fn test_record_layout_big_endian() {
        let counter = RequestCounter { remaining: 0x0102, expires: 0x0A0B };
        let bytes = counter.to_bytes();
        assert_eq!(&bytes[..8], &[0, 0, 0, 0, 0, 0, 0x0A, 0x0B]);
        assert_eq!(&bytes[8..], &[0, 0, 0, 0, 0, 0, 0x01, 0x02]);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut store = FileStore::new(dir.path().join("cache").join("uv_rc"));
        let counter = RequestCounter { remaining: 42, expires: 1_718_496_000 };
        store.save(&counter).unwrap();
        assert_eq!(store.load().unwrap(), Some(counter));
        assert_eq!(fs::read(store.path()).unwrap().len(), RECORD_LEN);
    }

    #[test]
    fn test_missing_file_is_uninitialized() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("uv_rc"));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_truncated_file_is_corrupted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("uv_rc");
        for len in [0, 1, 8, 15] {
            fs::write(&path, vec![0xAB; len]).unwrap();
            let result = FileStore::new(&path).load();
            assert!(
                matches!(result, Err(QuotaError::Corrupted { len: l, .. }) if l == len),
                "len {}",
                len
            );
        }
    }

    #[test]
    fn test_oversized_file_is_corrupted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("uv_rc");
        fs::write(&path, [0u8; 17]).unwrap();
        assert!(matches!(FileStore::new(&path).load(), Err(QuotaError::Corrupted { .. })));
    }

    #[test]
    fn test_any_sixteen_bytes_are_accepted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("uv_rc");
        for fill in [0x00u8, 0x7F, 0xFF] {
            fs::write(&path, [fill; RECORD_LEN]).unwrap();
            assert!(FileStore::new(&path).load().unwrap().is_some());
        }
    }

    #[test]
    fn test_consume_uninitialized_resets_then_decrements() {
        let now = at(2024, 6, 15, 12, 0, 0);
        let mut cache = memory_cache(None);

        let out = cache.consume_at(50, now).unwrap();

        assert_eq!(out, Consumption::Granted { remaining: 49 });
        let stored = cache.store().counter.unwrap();
        assert_eq!(stored.remaining, 49);
        assert_eq!(stored.expires, at(2024, 6, 16, 0, 0, 0).timestamp());
        assert_eq!(cache.store().writes, 1);
    }

    #[test]
    fn test_consume_decrements_by_one() {
        let now = at(2024, 6, 15, 12, 0, 0);
        let expires = next_reset(now);
        let mut cache = memory_cache(Some(RequestCounter { remaining: 10, expires }));

        assert_eq!(cache.consume_at(50, now).unwrap().remaining(), 9);
        assert_eq!(cache.store().counter, Some(RequestCounter { remaining: 9, expires }));
        assert_eq!(cache.store().writes, 1);
    }

    #[test]
    fn test_consume_expired_resets_to_limit() {
        let now = at(2024, 6, 15, 0, 0, 1);
        let stale = RequestCounter { remaining: 0, expires: at(2024, 6, 15, 0, 0, 0).timestamp() };
        let mut cache = memory_cache(Some(stale));

        assert_eq!(cache.consume_at(50, now).unwrap().remaining(), 49);
        assert_eq!(
            cache.store().counter.unwrap().expires,
            at(2024, 6, 16, 0, 0, 0).timestamp()
        );
    }

    #[test]
    fn test_consume_at_expiry_instant_is_not_expired() {
        let expires = at(2024, 6, 16, 0, 0, 0);
        let mut cache = memory_cache(Some(RequestCounter { remaining: 3, expires: expires.timestamp() }));

        assert_eq!(cache.consume_at(50, expires).unwrap().remaining(), 2);
    }

    #[test]
    fn test_consume_exhausted_does_not_write() {
        let now = at(2024, 6, 15, 12, 0, 0);
        let counter = RequestCounter { remaining: 0, expires: next_reset(now) };
        let mut cache = memory_cache(Some(counter));

        let out = cache.consume_at(50, now).unwrap();

        assert_eq!(out, Consumption::Exhausted);
        assert_eq!(out.remaining(), 0);
        assert_eq!(cache.store().writes, 0);
        assert_eq!(cache.store().counter, Some(counter));
    }

    #[test]
    fn test_last_request_is_granted() {
        let now = at(2024, 6, 15, 12, 0, 0);
        let mut cache = memory_cache(Some(RequestCounter { remaining: 1, expires: next_reset(now) }));

        assert_eq!(cache.consume_at(50, now).unwrap(), Consumption::Granted { remaining: 0 });
        assert_eq!(cache.consume_at(50, now).unwrap(), Consumption::Exhausted);
        assert_eq!(cache.store().writes, 1);
    }

    #[test]
    fn test_consume_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache").join("uv_rc");
        let now = at(2024, 6, 15, 12, 0, 0);

        for expected in [4, 3, 2] {
            let mut cache = QuotaCache::open(&path);
            assert_eq!(cache.consume_at(5, now).unwrap().remaining(), expected);
        }
    }

    #[test]
    fn test_consume_corrupted_file_propagates() {
        let (mut cache, _dir) = file_cache();
        let path = cache.store().path().to_path_buf();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, [1u8; 9]).unwrap();

        assert!(matches!(cache.consume(50), Err(QuotaError::Corrupted { len: 9, .. })));
        assert_eq!(fs::read(&path).unwrap().len(), 9);
    }

    #[test]
    fn test_reset_recovers_corrupted_file() {
        let (mut cache, _dir) = file_cache();
        let path = cache.store().path().to_path_buf();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, [1u8; 3]).unwrap();

        let now = at(2024, 6, 15, 12, 0, 0);
        let counter = cache.reset_at(20, now).unwrap();
        assert_eq!(counter.remaining, 20);
        assert_eq!(cache.consume_at(20, now).unwrap().remaining(), 19);
    }

    #[test]
    fn test_persist_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        // A regular file where the cache directory should be.
        let blocker = dir.path().join("cache");
        fs::write(&blocker, b"not a directory").unwrap();
        let mut cache = QuotaCache::open(blocker.join("uv_rc"));

        assert!(matches!(cache.consume(5), Err(QuotaError::Persist { .. })));
    }
}
