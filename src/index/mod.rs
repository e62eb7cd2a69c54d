//! The registry index: read/write access to plugin metadata and per-version asset maps.
//!
//! Realizes the document-store vocabulary of `"<stage>-plugins"` collections and `versions`
//! subcollections (see [`crate::config::Config::stage`]) on top of two `sqlx`/MySQL tables,
//! `plugins` and `plugin_releases`, rather than a literal document database.

use chrono::Utc;
use registry_core::{AssetRecord, PluginRecord, PluginView, ReleaseRecord};
use sqlx::{MySql, Pool, Row};

use crate::{Error, Result};

/// Read/write access to the `plugins` and `plugin_releases` tables, scoped to one stage.
#[derive(Debug, Clone)]
pub struct RegistryIndex {
	pool: Pool<MySql>,
	stage: String,
}

impl RegistryIndex {
	pub fn new(pool: Pool<MySql>, stage: impl Into<String>) -> Self {
		Self { pool, stage: stage.into() }
	}

	/// Fetches a plugin, dereferencing its `latest_version_pointer` into `latest_release` and
	/// attaching the list of known version strings.
	pub async fn get_plugin(&self, full_name: &str) -> Result<PluginView> {
		let full_name = full_name.to_lowercase();

		let row = sqlx::query("SELECT type, name, url, latest_version, updated_at FROM plugins WHERE stage = ? AND full_name = ?")
			.bind(&self.stage)
			.bind(&full_name)
			.fetch_optional(&self.pool)
			.await?
			.ok_or_else(|| Error::not_found(format!("plugin {full_name}")))?;

		let latest_version: String = row.try_get("latest_version")?;
		let latest_release = self.get_release(&full_name, &latest_version).await?;
		let versions = self.list_versions(&full_name).await?;

		Ok(PluginView {
			full_name: full_name.clone(),
			r#type: row.try_get("type")?,
			name: row.try_get("name")?,
			url: row.try_get("url")?,
			latest_release,
			versions,
			updated_at: row.try_get("updated_at")?,
		})
	}

	/// Direct lookup of one `(full_name, version)` release.
	pub async fn get_release(&self, full_name: &str, version: &str) -> Result<ReleaseRecord> {
		let full_name = full_name.to_lowercase();

		let row = sqlx::query(
			"SELECT version, prerelease, created_at, assets, updated_at FROM plugin_releases \
			 WHERE stage = ? AND full_name = ? AND version = ?",
		)
		.bind(&self.stage)
		.bind(&full_name)
		.bind(version)
		.fetch_optional(&self.pool)
		.await?
		.ok_or_else(|| Error::not_found(format!("release {full_name}@{version}")))?;

		release_from_row(&row)
	}

	/// Lists every known version string for a plugin, in no particular order.
	pub async fn list_versions(&self, full_name: &str) -> Result<Vec<String>> {
		let full_name = full_name.to_lowercase();

		let rows = sqlx::query("SELECT version FROM plugin_releases WHERE stage = ? AND full_name = ?")
			.bind(&self.stage)
			.bind(&full_name)
			.fetch_all(&self.pool)
			.await?;

		rows.iter().map(|row| row.try_get::<String, _>("version").map_err(Error::from)).collect()
	}

	/// Checks whether a plugin document exists, without dereferencing its latest release.
	pub async fn plugin_exists(&self, full_name: &str) -> Result<bool> {
		let full_name = full_name.to_lowercase();

		let row = sqlx::query("SELECT 1 FROM plugins WHERE stage = ? AND full_name = ?")
			.bind(&self.stage)
			.bind(&full_name)
			.fetch_optional(&self.pool)
			.await?;

		Ok(row.is_some())
	}

	/// Upserts one release document, used by the refresher.
	pub async fn save_release(&self, full_name: &str, release: &ReleaseRecord) -> Result<()> {
		let full_name = full_name.to_lowercase();
		let assets = serde_json::to_value(&release.assets).map_err(|err| Error::validation(err.to_string()))?;

		sqlx::query(
			"INSERT INTO plugin_releases (stage, full_name, version, prerelease, created_at, assets, updated_at) \
			 VALUES (?, ?, ?, ?, ?, ?, ?) \
			 ON DUPLICATE KEY UPDATE prerelease = VALUES(prerelease), assets = VALUES(assets), updated_at = VALUES(updated_at)",
		)
		.bind(&self.stage)
		.bind(&full_name)
		.bind(&release.version)
		.bind(release.prerelease)
		.bind(release.created_at)
		.bind(assets)
		.bind(release.updated_at)
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	/// Upserts the plugin document, used by the refresher after writing releases.
	pub async fn save_plugin(&self, record: &PluginRecord) -> Result<()> {
		let full_name = record.full_name.to_lowercase();

		sqlx::query(
			"INSERT INTO plugins (stage, full_name, type, name, url, latest_version, updated_at) \
			 VALUES (?, ?, ?, ?, ?, ?, ?) \
			 ON DUPLICATE KEY UPDATE url = VALUES(url), latest_version = VALUES(latest_version), updated_at = VALUES(updated_at)",
		)
		.bind(&self.stage)
		.bind(&full_name)
		.bind(&record.r#type)
		.bind(&record.name)
		.bind(&record.url)
		.bind(&record.latest_version_pointer)
		.bind(record.updated_at)
		.execute(&self.pool)
		.await?;

		Ok(())
	}
}

fn release_from_row(row: &sqlx::mysql::MySqlRow) -> Result<ReleaseRecord> {
	let assets_json: serde_json::Value = row.try_get("assets")?;
	let assets = serde_json::from_value::<std::collections::BTreeMap<String, AssetRecord>>(assets_json)
		.map_err(|err| Error::validation(format!("corrupt assets column: {err}")))?;

	Ok(ReleaseRecord {
		version: row.try_get("version")?,
		prerelease: row.try_get("prerelease")?,
		created_at: row.try_get("created_at")?,
		assets,
		updated_at: row.try_get("updated_at")?,
	})
}

/// Builds a fresh [`PluginRecord`]/[`ReleaseRecord`] pair's `updated_at` timestamp.
pub fn now() -> chrono::DateTime<Utc> {
	Utc::now()
}
