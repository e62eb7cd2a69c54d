//! Tier-1 in-memory cache: a namespaced, TTL-expiring map shared by the batch endpoint, the
//! GET-request cache middleware, and the GitHub-release cache.
//!
//! Grounded in `cacheKeyPrefix`/`cacheKey`/`invalidateByPrefix` from `internal/server/cache.go`,
//! backed by [`dashmap::DashMap`] for lock-free concurrent access.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Namespace prefixes used to key entries. Mirrors the original's `cacheKeyPrefix` constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefix {
	/// Pre-resolution batch request-shape hash → [`registry_core::BatchResponse`] JSON.
	Batch,
	/// `cache_middleware` entries keyed by `"<METHOD>:<path>"`.
	Request,
	/// Cached GitHub API responses (release lists, latest release).
	Github,
}

impl Prefix {
	fn as_str(self) -> &'static str {
		match self {
			Self::Batch => "batch",
			Self::Request => "request",
			Self::Github => "github",
		}
	}
}

/// Builds the full `"<prefix>/<payload>"` cache key.
pub fn key(prefix: Prefix, payload: impl std::fmt::Display) -> String {
	format!("{}/{payload}", prefix.as_str())
}

struct Entry {
	value: Vec<u8>,
	expires_at: Instant,
}

/// A TTL-expiring, prefix-invalidatable cache of opaque byte payloads.
///
/// Cloning is cheap; clones share the same backing map.
#[derive(Clone)]
pub struct Cache {
	entries: Arc<DashMap<String, Entry>>,
	default_ttl: Duration,
}

impl Cache {
	/// Default entry lifetime, matching the original's 15 minute TTL.
	pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);

	/// How often [`Self::spawn_cleanup`] sweeps expired entries, matching the original's 30
	/// minute cleanup interval.
	pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(30 * 60);

	pub fn new() -> Self {
		Self { entries: Arc::new(DashMap::new()), default_ttl: Self::DEFAULT_TTL }
	}

	/// Stores `value` under `key` with the default TTL.
	pub fn set(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
		self.set_with_ttl(key, value, self.default_ttl);
	}

	/// Stores `value` under `key` with an explicit TTL.
	pub fn set_with_ttl(&self, key: impl Into<String>, value: impl Into<Vec<u8>>, ttl: Duration) {
		self.entries.insert(key.into(), Entry { value: value.into(), expires_at: Instant::now() + ttl });
	}

	/// Fetches the value stored under `key`, if present and not expired.
	pub fn get(&self, key: &str) -> Option<Vec<u8>> {
		let entry = self.entries.get(key)?;

		if entry.expires_at <= Instant::now() {
			drop(entry);
			self.entries.remove(key);
			return None;
		}

		Some(entry.value.clone())
	}

	/// Removes every key starting with `prefix`, returning the number removed.
	pub fn invalidate_by_prefix(&self, prefix: &str) -> usize {
		let keys: Vec<String> =
			self.entries.iter().map(|entry| entry.key().clone()).filter(|key| key.starts_with(prefix)).collect();

		for key in &keys {
			self.entries.remove(key);
		}

		keys.len()
	}

	/// Number of entries currently stored, including any not yet lazily evicted.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Spawns a background task that periodically sweeps expired entries.
	pub fn spawn_cleanup(&self) {
		let entries = Arc::clone(&self.entries);

		tokio::spawn(async move {
			let mut interval = tokio::time::interval(Cache::CLEANUP_INTERVAL);

			loop {
				interval.tick().await;
				let now = Instant::now();
				entries.retain(|_, entry| entry.expires_at > now);
			}
		});
	}
}

impl Default for Cache {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for Cache {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Cache").field("len", &self.entries.len()).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn stores_and_retrieves() {
		let cache = Cache::new();
		cache.set("request/GET:/foo", b"hello".to_vec());

		assert_eq!(cache.get("request/GET:/foo"), Some(b"hello".to_vec()));
	}

	#[test]
	fn expires_past_ttl() {
		let cache = Cache::new();
		cache.set_with_ttl("batch/abc", b"x".to_vec(), Duration::from_millis(0));

		std::thread::sleep(Duration::from_millis(5));

		assert_eq!(cache.get("batch/abc"), None);
	}

	#[test]
	fn invalidate_by_prefix_removes_only_matching_keys() {
		let cache = Cache::new();
		cache.set("request/GET:/plugins/foo", b"1".to_vec());
		cache.set("request/GET:/plugins/bar", b"2".to_vec());
		cache.set("batch/abc", b"3".to_vec());

		let removed = cache.invalidate_by_prefix("request/");

		assert_eq!(removed, 2);
		assert_eq!(cache.get("batch/abc"), Some(b"3".to_vec()));
	}

	#[test]
	fn key_builds_namespaced_string() {
		assert_eq!(key(Prefix::Request, "GET:/plugins"), "request/GET:/plugins");
	}
}
