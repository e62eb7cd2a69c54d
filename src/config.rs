//! Configuration that is loaded at startup and then used throughout the application.

use std::fmt::{self, Debug};
use std::net::{IpAddr, SocketAddr};

use serde::Deserialize;
use url::Url;

/// This struct is initialized once when the API starts up, and its values are read from the
/// environment.
#[derive(Clone, Deserialize)]
pub struct Config {
	/// The deployment stage, e.g. `"dev"`, `"staging"`, `"prod"`.
	///
	/// Used as the namespace prefix for the plugin collection (`"<stage>-plugins"` in the
	/// conceptual document-store model; see [`crate::index`]).
	#[serde(default = "default_stage")]
	pub stage: String,

	/// The IP address the HTTP server should listen on.
	#[serde(rename = "bind_address", default = "default_bind_address")]
	pub ip_addr: IpAddr,

	/// The port the HTTP server should listen on.
	#[serde(default = "default_port")]
	pub port: u16,

	/// URL of the database the API should connect to.
	pub database_url: Url,

	/// URL for connecting to MySQL as the root user.
	///
	/// This is necessary in integration tests to create a separate database for each test.
	#[cfg(test)]
	pub database_admin_url: Url,

	/// Access token for the code-forge API (GitHub).
	pub github_token: String,

	/// Base URL for the GitHub REST API. Defaults to `https://api.github.com`; overridden in
	/// integration tests to point at a `wiremock` server instead.
	#[serde(default = "default_github_api_base_url")]
	pub github_api_base_url: Url,

	/// Bearer token clients must present to call the admin write routes (`PUT`/`DELETE`).
	pub admin_access_token: String,

	/// Name of the R2 bucket archives are written to.
	pub cloudflare_r2_bucket: String,

	/// Access key ID for the R2 bucket.
	pub cloudflare_r2_access_key_id: String,

	/// Secret access key for the R2 bucket.
	pub cloudflare_r2_secret_access_key: String,

	/// Cloudflare account ID; used to build the R2 account-scoped S3 endpoint.
	pub cloudflare_account_id: String,

	/// Public host archives are served from, e.g. `https://cache.example.com`.
	pub plugin_cache_host: Url,

	/// Disables the in-memory request cache. Useful for debugging cache-related bugs.
	#[serde(default)]
	pub disable_request_cache: bool,

	/// Disables the `/metrics` endpoint.
	#[serde(default)]
	pub disable_metrics: bool,
}

fn default_stage() -> String {
	String::from("dev")
}

fn default_bind_address() -> IpAddr {
	IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
	8080
}

fn default_github_api_base_url() -> Url {
	Url::parse("https://api.github.com").expect("static url is valid")
}

impl Config {
	/// Parses a [`Config`] instance from the environment.
	pub fn new() -> envy::Result<Self> {
		envy::from_env()
	}

	/// Returns a full [`SocketAddr`] for where the HTTP server should listen on.
	pub fn socket_addr(&self) -> SocketAddr {
		SocketAddr::new(self.ip_addr, self.port)
	}

	/// Builds the account-scoped R2 S3 endpoint from [`Self::cloudflare_account_id`].
	pub fn r2_endpoint(&self) -> String {
		format!("https://{}.r2.cloudflarestorage.com", self.cloudflare_account_id)
	}
}

impl Debug for Config {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Config")
			.field("stage", &self.stage)
			.field("address", &self.socket_addr())
			.field("database_url", &"*****")
			.field("github_token", &"*****")
			.field("github_api_base_url", &self.github_api_base_url.as_str())
			.field("admin_access_token", &"*****")
			.field("cloudflare_r2_bucket", &self.cloudflare_r2_bucket)
			.field("cloudflare_r2_access_key_id", &"*****")
			.field("cloudflare_r2_secret_access_key", &"*****")
			.field("cloudflare_account_id", &"*****")
			.field("plugin_cache_host", &self.plugin_cache_host.as_str())
			.field("disable_request_cache", &self.disable_request_cache)
			.field("disable_metrics", &self.disable_metrics)
			.finish()
	}
}
