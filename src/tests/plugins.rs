//! End-to-end scenarios against a running [`super::Context`].

use super::Context;

#[tokio::test]
async fn root_and_ping_respond() -> anyhow::Result<()> {
	let ctx = Context::new().await?;

	let root = ctx.http_client.get(ctx.url("/")).send().await?;
	assert_eq!(root.status(), 200);
	assert_eq!(root.text().await?, "(͡ ͡° ͜ つ ͡͡°)");

	let ping = ctx.http_client.get(ctx.url("/ping")).send().await?;
	assert_eq!(ping.status(), 200);
	assert_eq!(ping.text().await?, "pong");

	ctx.shutdown().await
}

#[tokio::test]
async fn list_includes_every_configured_plugin() -> anyhow::Result<()> {
	let ctx = Context::new().await?;

	let response = ctx.http_client.get(ctx.url("/api/v2/plugins")).send().await?;
	assert_eq!(response.status(), 200);

	let full_names: Vec<String> = response.json().await?;
	assert!(full_names.contains(&"provider-git".to_owned()));
	assert!(full_names.contains(&"condition-github".to_owned()));

	ctx.shutdown().await
}

#[tokio::test]
async fn refresh_then_get_returns_the_new_release() -> anyhow::Result<()> {
	let ctx = Context::new().await?;

	ctx.mock_releases(
		"go-semantic-release/changelog-generator-default",
		&[
			("1.0.0", &["darwin_amd64", "linux_amd64"]),
			("1.0.1", &["darwin_amd64", "linux_amd64"]),
			("2.0.0", &["darwin_amd64", "linux_amd64"]),
		],
	)
	.await;

	let put = ctx
		.http_client
		.put(ctx.url("/api/v2/plugins/changelog-generator-default"))
		.header("Authorization", Context::ADMIN_TOKEN)
		.send()
		.await?;
	assert_eq!(put.status(), 204);

	let get = ctx.http_client.get(ctx.url("/api/v2/plugins/changelog-generator-default")).send().await?;
	assert_eq!(get.status(), 200);

	let view: serde_json::Value = get.json().await?;
	assert_eq!(view["LatestRelease"]["Version"], "2.0.0");
	assert_eq!(view["Versions"].as_array().expect("Versions is an array").len(), 3);

	ctx.shutdown().await
}

#[tokio::test]
async fn refresh_without_admin_token_is_rejected() -> anyhow::Result<()> {
	let ctx = Context::new().await?;

	let response = ctx.http_client.put(ctx.url("/api/v2/plugins/condition-default")).send().await?;
	assert_eq!(response.status(), 401);

	ctx.shutdown().await
}

#[tokio::test]
async fn unknown_plugin_returns_404() -> anyhow::Result<()> {
	let ctx = Context::new().await?;

	let response = ctx.http_client.get(ctx.url("/api/v2/plugins/nonexistent-plugin")).send().await?;
	assert_eq!(response.status(), 404);

	ctx.shutdown().await
}

#[tokio::test]
async fn batch_rejects_empty_and_oversized_requests() -> anyhow::Result<()> {
	let ctx = Context::new().await?;

	let empty = ctx
		.http_client
		.post(ctx.url("/api/v2/plugins/_batch"))
		.json(&serde_json::json!({"OS": "linux", "Arch": "amd64", "Plugins": []}))
		.send()
		.await?;
	assert_eq!(empty.status(), 400);

	let too_many: Vec<_> = (0..11)
		.map(|i| serde_json::json!({"FullName": format!("provider-git-{i}"), "VersionConstraint": "latest"}))
		.collect();
	let oversized = ctx
		.http_client
		.post(ctx.url("/api/v2/plugins/_batch"))
		.json(&serde_json::json!({"OS": "linux", "Arch": "amd64", "Plugins": too_many}))
		.send()
		.await?;
	assert_eq!(oversized.status(), 400);

	ctx.shutdown().await
}

#[tokio::test]
async fn batch_rejects_duplicate_and_unknown_plugins() -> anyhow::Result<()> {
	let ctx = Context::new().await?;

	let duplicate = ctx
		.http_client
		.post(ctx.url("/api/v2/plugins/_batch"))
		.json(&serde_json::json!({
			"OS": "linux",
			"Arch": "amd64",
			"Plugins": [
				{"FullName": "provider-git", "VersionConstraint": "latest"},
				{"FullName": "provider-git", "VersionConstraint": "latest"},
			],
		}))
		.send()
		.await?;
	assert_eq!(duplicate.status(), 400);

	let unknown = ctx
		.http_client
		.post(ctx.url("/api/v2/plugins/_batch"))
		.json(&serde_json::json!({
			"OS": "linux",
			"Arch": "amd64",
			"Plugins": [{"FullName": "provider-does-not-exist", "VersionConstraint": "latest"}],
		}))
		.send()
		.await?;
	assert_eq!(unknown.status(), 400);

	ctx.shutdown().await
}

#[tokio::test]
async fn download_redirects_to_a_matching_asset() -> anyhow::Result<()> {
	let ctx = Context::new().await?;

	wiremock::Mock::given(wiremock::matchers::method("GET"))
		.and(wiremock::matchers::path("/repos/go-semantic-release/semantic-release/releases/latest"))
		.respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
			"assets": [
				{"name": "semantic-release_linux_amd64", "browser_download_url": "https://example.test/semantic-release_linux_amd64"},
				{"name": "semantic-release_darwin_arm64", "browser_download_url": "https://example.test/semantic-release_darwin_arm64"},
			],
		})))
		.mount(&ctx.github)
		.await;

	let client = reqwest::Client::builder().redirect(reqwest::redirect::Policy::none()).build()?;
	let response = client.get(ctx.url("/downloads/linux/amd64/semantic-release")).send().await?;

	assert_eq!(response.status(), 302);
	let location = response.headers().get("location").expect("location header").to_str()?;
	assert!(location.contains("linux_amd64"));

	ctx.shutdown().await
}

#[tokio::test]
async fn cache_admin_evicts_a_prefix() -> anyhow::Result<()> {
	let ctx = Context::new().await?;

	let _ = ctx.http_client.get(ctx.url("/api/v2/plugins")).send().await?;

	let response = ctx
		.http_client
		.delete(ctx.url("/api/v2/plugins/_cache?prefix=request/"))
		.header("Authorization", Context::ADMIN_TOKEN)
		.send()
		.await?;
	assert_eq!(response.status(), 204);

	ctx.shutdown().await
}
