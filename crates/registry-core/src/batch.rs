//! The batch request/response types and their two hashes.
//!
//! See the module docs on [`crate`] for why there are two hashes instead of one. Both hash
//! functions stream bytes through a single [`Sha512_256`] instance in a fixed order; changing
//! that order, or the `Display` impl of [`BatchResponsePlugin`], changes every cached key and
//! every archive address already written to the object store, so treat both as a wire format.

use std::fmt;

use sha2::{Digest, Sha512_256};

/// One `{FullName, VersionConstraint}` pair as submitted by a client.
#[derive(Debug, Clone, serde::Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct BatchRequestPlugin {
	#[serde(rename = "FullName")]
	pub full_name: String,

	#[serde(rename = "VersionConstraint", default)]
	pub version_constraint: String,
}

/// A batch request body: `{OS, Arch, Plugins: [...]}`.
#[derive(Debug, Clone, serde::Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct BatchRequest {
	#[serde(rename = "OS")]
	pub os: String,

	#[serde(rename = "Arch")]
	pub arch: String,

	#[serde(rename = "Plugins")]
	pub plugins: Vec<BatchRequestPlugin>,
}

/// One resolved (or not-yet-resolved) plugin entry in a [`BatchResponse`].
///
/// `version` and `checksum` are empty until resolution has happened; the request-shape hash is
/// computed before that, the content hash after.
#[derive(Debug, Clone, serde::Serialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct BatchResponsePlugin {
	#[serde(rename = "FullName")]
	pub full_name: String,

	#[serde(rename = "VersionConstraint")]
	pub version_constraint: String,

	#[serde(rename = "Version")]
	pub version: String,

	#[serde(rename = "FileName")]
	pub file_name: String,

	#[serde(rename = "URL")]
	pub url: String,

	#[serde(rename = "Checksum")]
	pub checksum: String,
}

impl BatchResponsePlugin {
	pub fn new(full_name: impl Into<String>, version_constraint: impl Into<String>) -> Self {
		Self {
			full_name: full_name.into().to_lowercase(),
			version_constraint: version_constraint.into(),
			version: String::new(),
			file_name: String::new(),
			url: String::new(),
			checksum: String::new(),
		}
	}

	/// SHA-512/256 over this entry's [`Display`](fmt::Display) form.
	pub fn hash(&self) -> [u8; 32] {
		Sha512_256::digest(self.to_string()).into()
	}
}

impl fmt::Display for BatchResponsePlugin {
	fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			fmt,
			"{}@{} (version={}) (checksum={})",
			self.full_name, self.version_constraint, self.version, self.checksum
		)
	}
}

/// A fully (or partially) resolved batch response.
#[derive(Debug, Clone, serde::Serialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct BatchResponse {
	#[serde(rename = "OS")]
	pub os: String,

	#[serde(rename = "Arch")]
	pub arch: String,

	#[serde(rename = "Plugins")]
	pub plugins: Vec<BatchResponsePlugin>,

	#[serde(rename = "DownloadHash")]
	pub download_hash: String,

	#[serde(rename = "DownloadURL")]
	pub download_url: String,

	#[serde(rename = "DownloadChecksum")]
	pub download_checksum: String,
}

impl BatchResponse {
	/// Builds a response skeleton: lowercases `os`/`arch`, sorts `plugins` by full name.
	///
	/// This is the [`crate`]-level half of the planner's `BuildSkeleton` step; validation
	/// (existence of plugins, constraint parsing) happens one layer up, where the static
	/// descriptor registry is in scope.
	pub fn skeleton(os: &str, arch: &str, mut plugins: Vec<BatchResponsePlugin>) -> Self {
		plugins.sort_by(|a, b| a.full_name.cmp(&b.full_name));

		Self {
			os: os.to_lowercase(),
			arch: arch.to_lowercase(),
			plugins,
			download_hash: String::new(),
			download_url: String::new(),
			download_checksum: String::new(),
		}
	}

	/// The lowercased `"<os>/<arch>"` pair used to key assets within a release.
	pub fn os_arch(&self) -> String {
		format!("{}/{}", self.os, self.arch)
	}

	fn hash_with(&self, hasher: &mut Sha512_256) {
		hasher.update(self.os_arch());
		for plugin in &self.plugins {
			hasher.update(plugin.hash());
		}
	}

	/// Request-shape hash: computed before resolution, while `version`/`checksum` are empty.
	///
	/// Used as the Tier-1 cache key for `POST /_batch` so that repeated identical questions
	/// never touch the index.
	pub fn hash(&self) -> [u8; 32] {
		let mut hasher = Sha512_256::new();
		self.hash_with(&mut hasher);
		hasher.finalize().into()
	}

	/// Content hash: computed after resolution, once `version`/`checksum` are populated.
	///
	/// This is the archive's content address (`archives/plugins-<hash>.tar.gz`) and is stable
	/// across requests that happen to resolve to the same set of plugin versions.
	pub fn calculate_hash(&mut self) -> [u8; 32] {
		let mut hasher = Sha512_256::new();
		self.hash_with(&mut hasher);
		let digest: [u8; 32] = hasher.finalize().into();
		self.download_hash = hex::encode(digest);
		digest
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn single_entry_hash_matches_vector() {
		let mut plugin = BatchResponsePlugin::new("foo", "^1.0.0");
		plugin.version = "1.2.3".into();

		assert_eq!(
			hex::encode(plugin.hash()),
			"6e9c2ee756a18cfb7d4a01bc7863e5844a83f071b277dffd2dfa12e501e7fb0e"
		);
	}

	#[test]
	fn hash_is_case_insensitive_on_full_name() {
		let mut a = BatchResponsePlugin::new("foo", "^1.0.0");
		a.version = "1.2.3".into();
		let mut b = BatchResponsePlugin::new("Foo", "^1.0.0");
		b.version = "1.2.3".into();

		assert_eq!(a.hash(), b.hash());
	}

	#[test]
	fn full_response_hash_matches_vector() {
		let mut foo = BatchResponsePlugin::new("foo", "^1.0.0");
		foo.version = "1.2.3".into();
		let mut bar = BatchResponsePlugin::new("bar", "^2.0.0");
		bar.version = "2.2.3".into();

		let mut response = BatchResponse::skeleton("darwin", "amd64", vec![foo, bar]);
		response.calculate_hash();

		assert_eq!(response.download_hash, "ab323e06aea1e43de11d5d272ab8d3d88375d934c5436d6d332e02f6223af0eb");
	}

	#[test]
	fn skeleton_sorts_entries_by_full_name() {
		let response = BatchResponse::skeleton(
			"linux",
			"amd64",
			vec![BatchResponsePlugin::new("zzz", "latest"), BatchResponsePlugin::new("aaa", "latest")],
		);

		assert_eq!(response.plugins[0].full_name, "aaa");
		assert_eq!(response.plugins[1].full_name, "zzz");
	}
}
