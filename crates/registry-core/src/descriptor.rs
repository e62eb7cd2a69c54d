//! The static, compiled-in set of plugins this registry knows how to serve.
//!
//! Unlike [`crate::records`], which are written by the refresher and live in the document
//! store, a [`PluginDescriptor`] is process-wide configuration: it never changes without a
//! redeploy.

use std::fmt;

/// A plugin this registry is configured to track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginDescriptor {
	pub r#type: &'static str,
	pub name: &'static str,
	pub aliases: &'static [&'static str],
	pub repo: &'static str,
	pub description: &'static str,
}

impl PluginDescriptor {
	/// `"<type>-<name>"`, the identifier used everywhere else in the system.
	pub fn full_name(&self) -> String {
		format!("{}-{}", self.r#type, self.name)
	}

	/// Whether `candidate` refers to this plugin, case-insensitively.
	pub fn matches(&self, candidate: &str) -> bool {
		self.full_name().eq_ignore_ascii_case(candidate)
			|| self.aliases.iter().any(|alias| alias.eq_ignore_ascii_case(candidate))
	}
}

impl fmt::Display for PluginDescriptor {
	fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(fmt, "{}", self.full_name())
	}
}

/// The bootstrap fixture: every plugin this deployment of the registry serves.
///
/// Grounded in the upstream `go-semantic-release` plugin catalogue.
pub static PLUGINS: &[PluginDescriptor] = &[
	PluginDescriptor {
		r#type: "provider",
		name: "github",
		aliases: &[],
		repo: "go-semantic-release/provider-github",
		description: "publish releases to GitHub",
	},
	PluginDescriptor {
		r#type: "provider",
		name: "gitlab",
		aliases: &[],
		repo: "go-semantic-release/provider-gitlab",
		description: "publish releases to GitLab",
	},
	PluginDescriptor {
		r#type: "changelog-generator",
		name: "default",
		aliases: &[],
		repo: "go-semantic-release/changelog-generator-default",
		description: "default changelog generator",
	},
	PluginDescriptor {
		r#type: "commit-analyzer",
		name: "default",
		aliases: &["commit-analyzer-cz"],
		repo: "go-semantic-release/commit-analyzer-cz",
		description: "conventional-commit analyzer",
	},
	PluginDescriptor {
		r#type: "condition",
		name: "default",
		aliases: &[],
		repo: "go-semantic-release/condition-default",
		description: "default release condition",
	},
	PluginDescriptor {
		r#type: "condition",
		name: "github",
		aliases: &[],
		repo: "go-semantic-release/condition-github",
		description: "GitHub-specific release condition",
	},
	PluginDescriptor {
		r#type: "condition",
		name: "gitlab",
		aliases: &[],
		repo: "go-semantic-release/condition-gitlab",
		description: "GitLab-specific release condition",
	},
	PluginDescriptor {
		r#type: "files-updater",
		name: "npm",
		aliases: &[],
		repo: "go-semantic-release/files-updater-npm",
		description: "bump version fields in package.json",
	},
	PluginDescriptor {
		r#type: "provider",
		name: "git",
		aliases: &[],
		repo: "go-semantic-release/provider-git",
		description: "tag releases in the local git repository",
	},
	PluginDescriptor {
		r#type: "condition",
		name: "bitbucket",
		aliases: &[],
		repo: "go-semantic-release/condition-bitbucket",
		description: "Bitbucket-specific release condition",
	},
	PluginDescriptor {
		r#type: "files-updater",
		name: "helm",
		aliases: &[],
		repo: "go-semantic-release/files-updater-helm",
		description: "bump version fields in Helm charts",
	},
	PluginDescriptor {
		r#type: "hooks",
		name: "goreleaser",
		aliases: &[],
		repo: "go-semantic-release/hooks-goreleaser",
		description: "run goreleaser as part of a release",
	},
	PluginDescriptor {
		r#type: "hooks",
		name: "npm-binary-releaser",
		aliases: &[],
		repo: "go-semantic-release/hooks-npm-binary-releaser",
		description: "publish platform binaries as an npm package",
	},
	PluginDescriptor {
		r#type: "hooks",
		name: "plugin-registry-update",
		aliases: &[],
		repo: "go-semantic-release/hooks-plugin-registry-update",
		description: "notify this registry after a release",
	},
];

/// Looks up a descriptor by full name (case-insensitive).
pub fn find(full_name: &str) -> Option<&'static PluginDescriptor> {
	PLUGINS.iter().find(|descriptor| descriptor.matches(full_name))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn finds_known_plugin_case_insensitively() {
		assert_eq!(find("Provider-Git").map(PluginDescriptor::full_name), Some("provider-git".into()));
	}

	#[test]
	fn does_not_find_unknown_plugin() {
		assert!(find("does-not-exist").is_none());
	}

	#[test]
	fn full_names_are_unique() {
		let mut names: Vec<_> = PLUGINS.iter().map(PluginDescriptor::full_name).collect();
		let len_before = names.len();
		names.sort();
		names.dedup();
		assert_eq!(names.len(), len_before);
	}
}
