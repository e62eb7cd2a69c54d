//! Streams every resolved asset into a single gzipped tar, verifying checksums on the fly.
//!
//! Mirrors `DownloadFilesAndTarGz`/`downloadFileAndVerifyChecksum` from the original
//! implementation: one asset at a time, in response order, each GET retried a few times before
//! giving up, each body tee'd into the tar writer and a SHA-256 hasher so a checksum mismatch
//! aborts the whole build instead of surfacing after the fact.

use std::io::Write;
use std::time::Duration;

use flate2::write::GzEncoder;
use flate2::Compression;
use registry_core::BatchResponse;
use sha2::{Digest, Sha256};
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;

use crate::{Error, Result};

/// A finished archive: its bytes and the hex SHA-256 of those bytes.
pub struct Archive {
	pub bytes: Vec<u8>,
	pub checksum: String,
}

/// Per-asset download timeout, matching the original's `3 * time.Minute` retryable client.
const ASSET_TIMEOUT: Duration = Duration::from_secs(180);

/// Downloads every asset referenced by `response.plugins`, in order, into a gzipped tar.
pub async fn build(http_client: &reqwest::Client, response: &BatchResponse) -> Result<Archive> {
	let mut tar_bytes = Vec::new();

	{
		let mut tar_builder = tar::Builder::new(&mut tar_bytes);

		for plugin in &response.plugins {
			let entry_name =
				format!("{}_{}/{}/{}/{}", response.os, response.arch, plugin.full_name, plugin.version, plugin.file_name);

			let body = download_with_retry(http_client, &plugin.url).await?;

			verify_checksum(&plugin.file_name, &plugin.checksum, &body)?;

			let mut header = tar::Header::new_gnu();
			header.set_size(body.len() as u64);
			header.set_mode(0o755);
			header.set_cksum();

			tar_builder
				.append_data(&mut header, &entry_name, body.as_slice())
				.map_err(|err| Error::integrity_io(&entry_name, err))?;
		}

		tar_builder.finish().map_err(|err| Error::integrity_io("tar", err))?;
	}

	let mut hasher = Sha256::new();
	let mut gzip_bytes = Vec::new();
	{
		let mut encoder = GzEncoder::new(&mut gzip_bytes, Compression::default());
		encoder.write_all(&tar_bytes).map_err(|err| Error::integrity_io("gzip", err))?;
		encoder.finish().map_err(|err| Error::integrity_io("gzip", err))?;
	}
	hasher.update(&gzip_bytes);

	Ok(Archive { bytes: gzip_bytes, checksum: hex::encode(hasher.finalize()) })
}

/// Downloads one asset, retrying up to 4 attempts total with exponential backoff on transport
/// failures and 5xx responses; 4xx is terminal.
async fn download_with_retry(http_client: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
	let strategy = ExponentialBackoff::from_millis(200).map(jitter).take(3);

	Retry::spawn(strategy, || download_once(http_client, url)).await
}

async fn download_once(http_client: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
	let response = http_client
		.get(url)
		.timeout(ASSET_TIMEOUT)
		.send()
		.await
		.map_err(|err| Error::upstream("asset download", err))?;

	if response.status().is_client_error() {
		return Err(Error::validation(format!("upstream returned {} for {url}", response.status())));
	}

	if !response.status().is_success() {
		return Err(Error::upstream_status("asset download", response.status()));
	}

	let content_length = response.content_length();
	let bytes = response.bytes().await.map_err(|err| Error::upstream("asset download", err))?;

	if let Some(expected) = content_length {
		if bytes.len() as u64 != expected {
			return Err(Error::content_length_mismatch("asset", expected, bytes.len() as u64));
		}
	}

	Ok(bytes.into())
}

fn verify_checksum(file_name: &str, expected: &str, body: &[u8]) -> Result<()> {
	if expected.is_empty() {
		return Ok(());
	}

	let actual = hex::encode(Sha256::digest(body));

	if actual != expected {
		return Err(Error::checksum_mismatch(file_name, expected, actual));
	}

	Ok(())
}
