//! The Batch Planner: validates a [`BatchRequest`] against the static descriptor registry and
//! builds the canonically-ordered [`BatchResponse`] skeleton. Grounded in
//! `validateAndCreatePluginResponses` from the original's `internal/server/handler_batch.go`.

use std::collections::HashSet;

use registry_core::{BatchRequest, BatchResponse, BatchResponsePlugin};

use crate::{Error, Result};

/// Smallest and largest number of plugins a [`BatchRequest`] may name, per §4.3.
const MIN_PLUGINS: usize = 1;
const MAX_PLUGINS: usize = 10;

/// Validates `request` and builds the response skeleton: lowercased `os`/`arch`, one entry per
/// requested plugin carrying its canonicalized constraint, sorted by `full_name`.
///
/// Each validation failure returns the first-encountered violation, matching the original's
/// fail-fast `validateAndCreatePluginResponses`.
pub fn build_skeleton(request: &BatchRequest) -> Result<BatchResponse> {
	if request.os.is_empty() || request.arch.is_empty() {
		return Err(Error::validation("OS and Arch are required"));
	}

	if request.plugins.len() < MIN_PLUGINS {
		return Err(Error::validation("at least one plugin is required"));
	}

	if request.plugins.len() > MAX_PLUGINS {
		return Err(Error::validation("maximum of 10 plugins allowed"));
	}

	let mut seen = HashSet::with_capacity(request.plugins.len());
	let mut entries = Vec::with_capacity(request.plugins.len());

	for plugin in &request.plugins {
		let full_name = plugin.full_name.to_lowercase();

		if !full_name.contains('-') {
			return Err(Error::validation(format!("{} has an invalid name", plugin.full_name)));
		}

		if !seen.insert(full_name.clone()) {
			return Err(Error::validation(format!("{full_name} requested multiple times")));
		}

		if registry_core::descriptor::find(&full_name).is_none() {
			return Err(Error::validation(format!("{full_name} does not exist")));
		}

		let constraint = normalize_constraint(&plugin.version_constraint, &full_name)?;

		entries.push(BatchResponsePlugin::new(full_name, constraint));
	}

	Ok(BatchResponse::skeleton(&request.os, &request.arch, entries))
}

/// Normalizes `""` to `"latest"`; otherwise parses and re-canonicalizes the constraint so that
/// semantically equal inputs (`"^1.0.0"` vs `"^1.0"`) produce identical cache keys.
fn normalize_constraint(raw: &str, full_name: &str) -> Result<String> {
	if raw.is_empty() || raw == "latest" {
		return Ok(String::from("latest"));
	}

	let parsed = registry_core::resolver::parse_constraint(raw)
		.map_err(|_| Error::validation(format!("could not resolve plugin {full_name}")))?;

	Ok(registry_core::resolver::canonicalize(&parsed))
}

#[cfg(test)]
mod tests {
	use registry_core::BatchRequestPlugin;

	use super::*;

	fn request(plugins: Vec<BatchRequestPlugin>) -> BatchRequest {
		BatchRequest { os: "linux".into(), arch: "amd64".into(), plugins }
	}

	#[test]
	fn rejects_empty_plugin_list() {
		let err = build_skeleton(&request(vec![])).unwrap_err();
		assert_eq!(err.to_string().contains("at least one plugin"), true);
	}

	#[test]
	fn rejects_more_than_ten_plugins() {
		let plugins = (0..11)
			.map(|_| BatchRequestPlugin { full_name: "provider-git".into(), version_constraint: String::new() })
			.collect();

		let err = build_skeleton(&request(plugins)).unwrap_err();
		assert!(err.to_string().contains("maximum of 10"));
	}

	#[test]
	fn rejects_name_without_hyphen() {
		let plugins = vec![BatchRequestPlugin { full_name: "providergit".into(), version_constraint: String::new() }];

		let err = build_skeleton(&request(plugins)).unwrap_err();
		assert!(err.to_string().contains("invalid name"));
	}

	#[test]
	fn rejects_duplicate_plugin() {
		let plugins = vec![
			BatchRequestPlugin { full_name: "provider-git".into(), version_constraint: String::new() },
			BatchRequestPlugin { full_name: "Provider-Git".into(), version_constraint: String::new() },
		];

		let err = build_skeleton(&request(plugins)).unwrap_err();
		assert!(err.to_string().contains("requested multiple times"));
	}

	#[test]
	fn rejects_unknown_plugin() {
		let plugins = vec![BatchRequestPlugin { full_name: "not-a-real-plugin".into(), version_constraint: String::new() }];

		let err = build_skeleton(&request(plugins)).unwrap_err();
		assert!(err.to_string().contains("does not exist"));
	}

	#[test]
	fn normalizes_empty_constraint_to_latest() {
		let plugins = vec![BatchRequestPlugin { full_name: "provider-git".into(), version_constraint: String::new() }];

		let response = build_skeleton(&request(plugins)).unwrap();
		assert_eq!(response.plugins[0].version_constraint, "latest");
	}

	#[test]
	fn sorts_entries_by_full_name() {
		let plugins = vec![
			BatchRequestPlugin { full_name: "provider-gitlab".into(), version_constraint: String::new() },
			BatchRequestPlugin { full_name: "provider-git".into(), version_constraint: String::new() },
		];

		let response = build_skeleton(&request(plugins)).unwrap();
		assert_eq!(response.plugins[0].full_name, "provider-git");
		assert_eq!(response.plugins[1].full_name, "provider-gitlab");
	}
}
