//! The index refresher: polls GitHub for a plugin's releases and writes `PluginRecord`/
//! `ReleaseRecord`s. Grounded in `internal/plugin/github.go` and `plugin.go` from the original
//! implementation; invoked synchronously from the authenticated `PUT` handlers, gated by the
//! upstream [`crate::concurrency::Gates`] semaphore.

use std::collections::BTreeMap;
use std::sync::OnceLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use regex::Regex;
use registry_core::{AssetRecord, PluginDescriptor, PluginRecord, ReleaseRecord};
use serde::Deserialize;

use crate::index::RegistryIndex;
use crate::{Error, Result, State};

/// Closed token set for the OS half of an asset filename, anchored at the end (optionally
/// followed by `.exe`), case-insensitive. Mirrors the original's `osArchRe`.
const OS_TOKENS: &str = "aix|android|darwin|dragonfly|freebsd|hurd|illumos|js|linux|nacl|netbsd|openbsd|plan9|solaris|windows|zos";

/// Closed token set for the architecture half.
const ARCH_TOKENS: &str = "386|amd64|amd64p32|arm|armbe|arm64|arm64be|ppc64|ppc64le|mips|mipsle|mips64|mips64le|mips64p32|mips64p32le|ppc|riscv|riscv64|s390|s390x|sparc|sparc64|wasm";

fn os_arch_regex() -> &'static Regex {
	static RE: OnceLock<Regex> = OnceLock::new();
	RE.get_or_init(|| {
		Regex::new(&format!(r"(?i)({OS_TOKENS})[_-]({ARCH_TOKENS})(\.exe)?$")).expect("static regex is valid")
	})
}

#[derive(Debug, Deserialize)]
struct GithubAsset {
	name: String,
	size: u64,
	browser_download_url: String,
}

#[derive(Debug, Deserialize)]
struct GithubRelease {
	tag_name: String,
	draft: bool,
	prerelease: bool,
	created_at: DateTime<Utc>,
	assets: Vec<GithubAsset>,
}

/// A small GitHub REST client, gated by the upstream semaphore and given a fixed timeout.
pub struct Refresher<'a> {
	state: &'a State,
}

impl<'a> Refresher<'a> {
	pub fn new(state: &'a State) -> Self {
		Self { state }
	}

	/// Lists every non-draft, valid-semver, asset-bearing release and writes one
	/// [`ReleaseRecord`] per release, then points the [`PluginRecord`] at upstream-latest.
	pub async fn update_all(&self, descriptor: &PluginDescriptor) -> Result<()> {
		let releases = self.list_releases(descriptor.repo).await?;

		if releases.is_empty() {
			return Err(Error::not_found(format!("any releases for {}", descriptor.repo)));
		}

		let mut latest: Option<(semver::Version, String)> = None;

		for release in &releases {
			let version = self.write_release(descriptor, release).await?;

			if latest.as_ref().is_none_or(|(current, _)| version > *current) {
				latest = Some((version, release.tag_name.trim_start_matches('v').to_owned()));
			}
		}

		let (_, latest_version) = latest.expect("releases is non-empty");
		self.update_plugin_pointer(descriptor, &latest_version).await
	}

	/// Fetches a single release by tag and writes it; only updates the `PluginRecord` pointer
	/// if `version` equals upstream-latest.
	pub async fn update_one(&self, descriptor: &PluginDescriptor, version: &str) -> Result<()> {
		let release = self.get_release_by_tag(descriptor.repo, version).await?;
		self.write_release(descriptor, &release).await?;

		let all_releases = self.list_releases(descriptor.repo).await?;
		let upstream_latest = all_releases
			.iter()
			.filter_map(|r| r.tag_name.trim_start_matches('v').parse::<semver::Version>().ok())
			.max();

		if upstream_latest.as_ref().map(|v| v.to_string()) == Some(version.to_owned()) {
			self.update_plugin_pointer(descriptor, version).await?;
		}

		Ok(())
	}

	async fn write_release(&self, descriptor: &PluginDescriptor, release: &GithubRelease) -> Result<semver::Version> {
		let version = release
			.tag_name
			.trim_start_matches('v')
			.parse::<semver::Version>()
			.map_err(|err| Error::validation(format!("invalid semver tag {}: {err}", release.tag_name)))?;

		let assets = self.collect_assets(&release.assets).await?;

		let record = ReleaseRecord {
			version: version.to_string(),
			prerelease: release.prerelease,
			created_at: release.created_at,
			assets,
			updated_at: Utc::now(),
		};

		self.index().save_release(&descriptor.full_name(), &record).await?;

		Ok(version)
	}

	async fn update_plugin_pointer(&self, descriptor: &PluginDescriptor, version: &str) -> Result<()> {
		let record = PluginRecord {
			full_name: descriptor.full_name(),
			r#type: descriptor.r#type.to_owned(),
			name: descriptor.name.to_owned(),
			url: format!("https://github.com/{}", descriptor.repo),
			latest_version_pointer: version.to_owned(),
			updated_at: Utc::now(),
		};

		self.index().save_plugin(&record).await
	}

	fn index(&self) -> &RegistryIndex {
		self.state.index()
	}

	async fn list_releases(&self, repo: &str) -> Result<Vec<GithubRelease>> {
		let _permit = self.state.gates().acquire_upstream().await?;
		let base = self.state.config().github_api_base_url.as_str().trim_end_matches('/');
		let url = format!("{base}/repos/{repo}/releases?per_page=100");
		let releases: Vec<GithubRelease> = self.get_json(&url).await?;

		Ok(releases.into_iter().filter(|release| self.is_eligible(release)).collect())
	}

	async fn get_release_by_tag(&self, repo: &str, tag: &str) -> Result<GithubRelease> {
		let _permit = self.state.gates().acquire_upstream().await?;
		let base = self.state.config().github_api_base_url.as_str().trim_end_matches('/');
		let url = format!("{base}/repos/{repo}/releases/tags/v{tag}");
		let release: GithubRelease = self.get_json(&url).await?;

		if release.draft {
			return Err(Error::validation("release is a draft"));
		}

		if release.assets.is_empty() {
			return Err(Error::validation("release has no assets"));
		}

		Ok(release)
	}

	fn is_eligible(&self, release: &GithubRelease) -> bool {
		!release.draft
			&& !release.assets.is_empty()
			&& release.tag_name.trim_start_matches('v').parse::<semver::Version>().is_ok()
	}

	async fn get_json<T>(&self, url: &str) -> Result<T>
	where
		T: serde::de::DeserializeOwned,
	{
		let response = self
			.state
			.http_client()
			.get(url)
			.header("User-Agent", "plugin-registry")
			.bearer_auth(&self.state.config().github_token)
			.timeout(Duration::from_secs(60))
			.send()
			.await
			.map_err(|err| Error::upstream("github", err))?;

		if !response.status().is_success() {
			return Err(Error::upstream_status("github", response.status()));
		}

		response.json().await.map_err(|err| Error::upstream("github", err))
	}

	/// Extracts `(os, arch)` assets from a release, optionally enriched with a `checksums.txt`
	/// file if one is attached and no bigger than 4096 bytes.
	async fn collect_assets(&self, assets: &[GithubAsset]) -> Result<BTreeMap<String, AssetRecord>> {
		let mut checksums: Option<BTreeMap<String, String>> = None;
		let mut candidates = Vec::with_capacity(assets.len());

		for asset in assets {
			if checksums.is_none() && asset.size <= 4096 && asset.name.to_lowercase().contains("checksums.txt") {
				checksums = Some(self.fetch_checksums(&asset.browser_download_url).await?);
				continue;
			}

			candidates.push(asset);
		}

		let mut out = BTreeMap::new();

		for asset in candidates {
			let Some(captures) = os_arch_regex().captures(&asset.name) else { continue };
			let os = captures[1].to_lowercase();
			let arch = captures[2].to_lowercase();
			let checksum = checksums.as_ref().and_then(|map| map.get(&asset.name.to_lowercase()).cloned()).unwrap_or_default();

			out.insert(
				format!("{os}/{arch}"),
				AssetRecord { file_name: asset.name.clone(), url: asset.browser_download_url.clone(), os, arch, checksum },
			);
		}

		Ok(out)
	}

	async fn fetch_checksums(&self, url: &str) -> Result<BTreeMap<String, String>> {
		let body = self
			.state
			.http_client()
			.get(url)
			.send()
			.await
			.map_err(|err| Error::upstream("github checksums", err))?
			.text()
			.await
			.map_err(|err| Error::upstream("github checksums", err))?;

		let mut out = BTreeMap::new();

		for line in body.lines() {
			let fields: Vec<&str> = line.split_whitespace().collect();
			if fields.len() < 2 {
				continue;
			}

			out.insert(fields[1].to_lowercase(), fields[0].to_owned());
		}

		Ok(out)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn extracts_known_os_arch_pair() {
		let captures = os_arch_regex().captures("provider-git_linux_amd64.tar.gz").unwrap();
		assert_eq!(&captures[1], "linux");
		assert_eq!(&captures[2], "amd64");
	}

	#[test]
	fn extracts_windows_exe_suffix() {
		let captures = os_arch_regex().captures("provider-git_windows_amd64.exe").unwrap();
		assert_eq!(&captures[1], "windows");
		assert_eq!(&captures[2], "amd64");
	}

	#[test]
	fn does_not_match_unknown_tokens() {
		assert!(os_arch_regex().captures("provider-git_plan42_amd64.tar.gz").is_none());
	}
}
