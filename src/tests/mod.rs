//! HTTP-level integration tests.
//!
//! Every test gets its own MariaDB container (via `testcontainers-modules`) and its own
//! `wiremock::MockServer` standing in for `api.github.com`, and runs the real [`crate::API`]
//! against both. Archive materialization (which needs a real S3-compatible object store) isn't
//! exercised here; the hashing/resolution logic it depends on is covered by the unit tests in
//! [`crate::planner`], [`crate::cache`], and `registry_core::batch`.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use serde_json::json;
use sqlx::migrate::MigrateDatabase;
use sqlx::MySql;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::mariadb::Mariadb;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod plugins;

struct Context {
	http_client: reqwest::Client,
	base_url: Url,
	database: sqlx::Pool<MySql>,
	database_url: Url,
	github: MockServer,
	shutdown: Option<oneshot::Sender<()>>,
	api_task: Option<JoinHandle<anyhow::Result<()>>>,
	_database_container: ContainerAsync<Mariadb>,
}

impl Context {
	const ADMIN_TOKEN: &'static str = "test-admin-token";

	async fn new() -> anyhow::Result<Self> {
		dotenvy::dotenv().ok();

		let database_container = Mariadb::default().start().await?;
		let database_port = database_container.get_host_port_ipv4(3306).await?;

		let mut database_admin_url = Url::parse("mysql://root@127.0.0.1/")?;
		database_admin_url.set_port(Some(database_port)).expect("valid port");

		let database_name = format!("plugin_registry_test_{}", uuid::Uuid::new_v4().simple());
		let mut database_url = database_admin_url.clone();
		database_url.set_path(&format!("/{database_name}"));

		sqlx::MySql::create_database(database_url.as_str()).await?;

		let github = MockServer::start().await;

		let port = portpicker_port();
		let mut public_url = Url::parse("http://127.0.0.1")?;
		public_url.set_port(Some(port)).expect("valid port");

		let config = crate::Config {
			stage: String::from("test"),
			ip_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
			port,
			database_url: database_url.clone(),
			#[cfg(test)]
			database_admin_url: database_admin_url.clone(),
			github_token: String::from("test-github-token"),
			github_api_base_url: Url::parse(&github.uri())?,
			admin_access_token: Self::ADMIN_TOKEN.to_owned(),
			cloudflare_r2_bucket: String::from("test-bucket"),
			cloudflare_r2_access_key_id: String::from("test"),
			cloudflare_r2_secret_access_key: String::from("test"),
			cloudflare_account_id: String::from("test-account"),
			plugin_cache_host: Url::parse("https://cache.example.test")?,
			disable_request_cache: false,
			disable_metrics: true,
		};

		let database = sqlx::Pool::connect(config.database_url.as_str()).await?;
		sqlx::migrate!("./migrations").run(&database).await?;

		let (shutdown, shutdown_rx) = oneshot::channel();
		let api_task = tokio::task::spawn(crate::API::run_until(config.clone(), async move {
			_ = shutdown_rx.await;
		}));

		tokio::task::yield_now().await;
		tokio::time::sleep(Duration::from_millis(50)).await;

		Ok(Self {
			http_client: reqwest::Client::new(),
			base_url: public_url,
			database,
			database_url,
			github,
			shutdown: Some(shutdown),
			api_task: Some(api_task),
			_database_container: database_container,
		})
	}

	fn url(&self, path: &str) -> String {
		format!("{}{path}", self.base_url.as_str().trim_end_matches('/'))
	}

	/// Registers a `GET /repos/{repo}/releases` mock returning one non-draft release per
	/// `(tag, assets)` pair, where each asset name is just its `{os}_{arch}` identifier.
	async fn mock_releases(&self, repo: &str, releases: &[(&str, &[&str])]) {
		let body: Vec<_> = releases
			.iter()
			.map(|(tag, assets)| {
				json!({
					"tag_name": format!("v{tag}"),
					"draft": false,
					"prerelease": false,
					"created_at": "2024-01-01T00:00:00Z",
					"assets": assets.iter().map(|name| json!({
						"name": format!("plugin_{name}.tar.gz"),
						"size": 1024,
						"browser_download_url": format!("https://example.test/{name}"),
					})).collect::<Vec<_>>(),
				})
			})
			.collect();

		Mock::given(method("GET"))
			.and(path(format!("/repos/{repo}/releases")))
			.respond_with(ResponseTemplate::new(200).set_body_json(body))
			.mount(&self.github)
			.await;
	}

	async fn shutdown(mut self) -> anyhow::Result<()> {
		if let Some(shutdown) = self.shutdown.take() {
			let _ = shutdown.send(());
		}

		if let Some(api_task) = self.api_task.take() {
			api_task.await??;
		}

		self.database.close().await;
		sqlx::MySql::drop_database(self.database_url.as_str()).await.ok();

		Ok(())
	}
}

/// Grabs an ephemeral TCP port without pulling in a dedicated port-picker crate: bind to `:0`,
/// read back the OS-assigned port, then drop the listener before the API binds to it. There's a
/// narrow window for another process to steal the port between the drop and the bind; acceptable
/// for a test-only helper.
fn portpicker_port() -> u16 {
	std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
		.expect("bind ephemeral port")
		.local_addr()
		.expect("local addr")
		.port()
}
