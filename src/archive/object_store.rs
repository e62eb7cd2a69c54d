//! The R2-backed object store holding built archives.
//!
//! `archives/plugins-<hash>.tar.gz` objects, HEAD'd before a build and PUT after one. Grounded in
//! the R2 custom-endpoint construction from the original Go `CreateS3Client`.

use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use crate::{Error, Result};

/// Object-store metadata attached to a built archive.
#[derive(Debug, Clone)]
pub struct ArchiveMetadata {
	pub checksum: String,
	pub hash: String,
	pub os: String,
	pub arch: String,
	pub plugin_count: usize,
	pub cache_key: String,
}

/// Thin wrapper around [`aws_sdk_s3::Client`] scoped to the archive bucket.
#[derive(Debug, Clone)]
pub struct ObjectStore {
	client: Client,
	bucket: String,
	public_host: url::Url,
}

impl ObjectStore {
	/// Builds an [`ObjectStore`] against Cloudflare R2's S3-compatible endpoint.
	pub async fn new(config: &crate::Config) -> Self {
		let credentials = aws_sdk_s3::config::Credentials::new(
			&config.cloudflare_r2_access_key_id,
			&config.cloudflare_r2_secret_access_key,
			None,
			None,
			"plugin-registry",
		);

		let s3_config = aws_sdk_s3::config::Builder::new()
			.behavior_version_latest()
			.endpoint_url(config.r2_endpoint())
			.region(aws_sdk_s3::config::Region::new("auto"))
			.credentials_provider(credentials)
			.force_path_style(true)
			.build();

		Self {
			client: Client::from_conf(s3_config),
			bucket: config.cloudflare_r2_bucket.clone(),
			public_host: config.plugin_cache_host.clone(),
		}
	}

	fn archive_key(hash: &str) -> String {
		format!("archives/plugins-{hash}.tar.gz")
	}

	/// Checks whether an archive for `hash` already exists, returning its metadata on a hit.
	pub async fn head_archive(&self, hash: &str) -> Result<Option<ArchiveMetadata>> {
		let key = Self::archive_key(hash);

		match self.client.head_object().bucket(&self.bucket).key(&key).send().await {
			Ok(output) => {
				let metadata = output.metadata().cloned().unwrap_or_default();
				Ok(Some(ArchiveMetadata {
					checksum: metadata.get("checksum").cloned().unwrap_or_default(),
					hash: metadata.get("hash").cloned().unwrap_or_else(|| hash.to_owned()),
					os: metadata.get("os").cloned().unwrap_or_default(),
					arch: metadata.get("arch").cloned().unwrap_or_default(),
					plugin_count: metadata.get("plugins").and_then(|n| n.parse().ok()).unwrap_or(0),
					cache_key: key,
				}))
			},
			Err(err) if is_not_found(&err) => Ok(None),
			Err(err) => Err(Error::object_store(err)),
		}
	}

	/// Uploads a built archive's bytes under its content-address key.
	pub async fn put_archive(
		&self,
		hash: &str,
		os: &str,
		arch: &str,
		plugin_count: usize,
		checksum: &str,
		bytes: Vec<u8>,
	) -> Result<()> {
		let key = Self::archive_key(hash);

		self.client
			.put_object()
			.bucket(&self.bucket)
			.key(&key)
			.body(ByteStream::from(bytes))
			.content_type("application/gzip")
			.metadata("checksum", checksum)
			.metadata("hash", hash)
			.metadata("os", os)
			.metadata("arch", arch)
			.metadata("plugins", plugin_count.to_string())
			.metadata("cache_key", &key)
			.send()
			.await
			.map_err(Error::object_store)?;

		Ok(())
	}

	/// The public download URL for an archive, joined from the configured cache host.
	pub fn download_url(&self, hash: &str) -> String {
		let mut url = self.public_host.clone();
		url.set_path(&Self::archive_key(hash));
		url.into()
	}
}

fn is_not_found(err: &aws_sdk_s3::error::SdkError<aws_sdk_s3::operation::head_object::HeadObjectError>) -> bool {
	matches!(
		err,
		aws_sdk_s3::error::SdkError::ServiceError(service_err)
			if matches!(service_err.err(), aws_sdk_s3::operation::head_object::HeadObjectError::NotFound(_))
	)
}
