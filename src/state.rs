//! The API's global application state.
//!
//! A [`State`] instance is created on startup and then passed to axum so it can be accessed in
//! handlers, [middleware], [extractors], etc.
//!
//! [middleware]: axum::middleware
//! [extractors]: axum::extract

use std::convert::Infallible;
use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request;
use derive_more::Debug;
use sqlx::pool::PoolOptions;
use sqlx::{MySql, Pool};

use crate::archive::ObjectStore;
use crate::cache::Cache;
use crate::concurrency::Gates;
use crate::index::RegistryIndex;
use crate::Result;

/// The API's state.
#[derive(Debug, Clone)]
pub struct State {
	/// Runtime configuration.
	#[debug(skip)]
	config: Arc<crate::Config>,

	/// Database connection pool.
	#[debug(skip)]
	database: Pool<MySql>,

	/// Read/write access to the `plugins`/`plugin_releases` tables.
	#[debug(skip)]
	index: RegistryIndex,

	/// An HTTP client for making requests to other APIs (GitHub, asset downloads).
	#[debug(skip)]
	http_client: reqwest::Client,

	/// The R2-backed store archives are written to.
	#[debug(skip)]
	object_store: Arc<ObjectStore>,

	/// Tier-1 in-memory cache shared by the request-cache middleware and the batch endpoint.
	#[debug(skip)]
	cache: Cache,

	/// Concurrency gates around upstream calls and archive builds.
	#[debug(skip)]
	gates: Arc<Gates>,
}

impl State {
	/// The minimum number of [database pool] connections.
	///
	/// [database pool]: State::database
	const MIN_DB_CONNECTIONS: u32 = if cfg!(production) { 20 } else { 2 };

	/// The maximum number of [database pool] connections.
	///
	/// [database pool]: State::database
	const MAX_DB_CONNECTIONS: u32 = if cfg!(production) { 50 } else { 10 };

	/// Creates a new [`State`], connecting to the database and running pending migrations.
	pub async fn new(api_config: crate::Config) -> Result<Self> {
		tracing::debug!(?api_config, "initializing application state");
		tracing::debug! {
			url = %api_config.database_url,
			min_connections = Self::MIN_DB_CONNECTIONS,
			max_connections = Self::MAX_DB_CONNECTIONS,
			"establishing database connection",
		};

		let config = Arc::new(api_config);
		let database = PoolOptions::new()
			.min_connections(Self::MIN_DB_CONNECTIONS)
			.max_connections(Self::MAX_DB_CONNECTIONS)
			.connect(config.database_url.as_str())
			.await?;

		sqlx::migrate!("./migrations").run(&database).await.map_err(|err| crate::Error::object_store(err.to_string()))?;

		let index = RegistryIndex::new(database.clone(), config.stage.clone());
		let http_client = reqwest::Client::new();
		let object_store = Arc::new(ObjectStore::new(&config).await);
		let cache = Cache::new();
		cache.spawn_cleanup();
		let gates = Arc::new(Gates::new());

		Ok(Self { config, database, index, http_client, object_store, cache, gates })
	}

	/// Runtime configuration.
	pub fn config(&self) -> &crate::Config {
		&self.config
	}

	/// The raw database pool, for migrations and health checks.
	pub fn database(&self) -> &Pool<MySql> {
		&self.database
	}

	/// Read/write access to the `plugins`/`plugin_releases` tables.
	pub fn index(&self) -> &RegistryIndex {
		&self.index
	}

	/// An HTTP client for making requests to other APIs.
	pub fn http_client(&self) -> &reqwest::Client {
		&self.http_client
	}

	/// The R2-backed store archives are written to.
	pub fn object_store(&self) -> &ObjectStore {
		&self.object_store
	}

	/// The shared Tier-1 in-memory cache.
	pub fn cache(&self) -> &Cache {
		&self.cache
	}

	/// Concurrency gates around upstream calls and archive builds.
	pub fn gates(&self) -> &Gates {
		&self.gates
	}
}

#[async_trait]
impl FromRequestParts<State> for State {
	type Rejection = Infallible;

	async fn from_request_parts(_parts: &mut request::Parts, state: &State) -> Result<Self, Self::Rejection> {
		Ok(state.clone())
	}
}
