//! The types written by the refresher and read back out of the registry index.
//!
//! These map onto two document-store collections: `"<stage>-plugins"` (one [`PluginRecord`]
//! document per plugin) and its `versions` subcollection (one [`ReleaseRecord`] document per
//! plugin version). See [`crate`] docs for why that vocabulary survives even though the actual
//! backing store is relational.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use semver::Version;

use crate::checksum::Checksum;

/// A single platform/architecture asset attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct AssetRecord {
	#[serde(rename = "FileName")]
	pub file_name: String,

	#[serde(rename = "URL")]
	pub url: String,

	#[serde(rename = "OS")]
	pub os: String,

	#[serde(rename = "Arch")]
	pub arch: String,

	/// Hex-encoded SHA-256; empty if the upstream release never published one.
	#[serde(rename = "Checksum", default)]
	pub checksum: String,
}

/// A persisted `(plugin, version)` record: the `versions` subcollection.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct ReleaseRecord {
	/// Canonical semver string (parsed then re-serialized, never the raw upstream tag).
	#[serde(rename = "Version")]
	pub version: String,

	#[serde(rename = "Prerelease")]
	pub prerelease: bool,

	#[serde(rename = "CreatedAt")]
	pub created_at: DateTime<Utc>,

	/// Keyed by the lowercased `"<os>/<arch>"` pair.
	#[serde(rename = "Assets")]
	pub assets: BTreeMap<String, AssetRecord>,

	#[serde(rename = "UpdatedAt")]
	pub updated_at: DateTime<Utc>,
}

impl ReleaseRecord {
	pub fn parsed_version(&self) -> Option<Version> {
		self.version.parse().ok()
	}
}

/// A persisted plugin record: the `"<stage>-plugins"` collection.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct PluginRecord {
	pub full_name: String,
	pub r#type: String,
	pub name: String,
	pub url: String,

	/// Document path of the release this plugin currently points at as "latest".
	///
	/// Modeled as a logical foreign key rather than an owning pointer: the reader dereferences
	/// it on read and must tolerate a dangling reference (a release that hasn't landed yet,
	/// mid-refresh) by surfacing a clear `NotFound` rather than panicking.
	pub latest_version_pointer: String,
	pub updated_at: DateTime<Utc>,
}

/// [`PluginRecord`] with its `latestRelease` dereferenced and its known versions attached.
///
/// This is the shape actually returned by `GetPlugin`; it is not persisted as-is.
#[derive(Debug, Clone, serde::Serialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct PluginView {
	#[serde(rename = "FullName")]
	pub full_name: String,

	#[serde(rename = "Type")]
	pub r#type: String,

	#[serde(rename = "Name")]
	pub name: String,

	#[serde(rename = "URL")]
	pub url: String,

	#[serde(rename = "LatestRelease")]
	pub latest_release: ReleaseRecord,

	#[serde(rename = "Versions")]
	pub versions: Vec<String>,

	#[serde(rename = "UpdatedAt")]
	pub updated_at: DateTime<Utc>,
}

impl AssetRecord {
	pub fn checksum(&self) -> Result<Checksum, crate::checksum::ParseChecksumError> {
		self.checksum.parse()
	}
}
