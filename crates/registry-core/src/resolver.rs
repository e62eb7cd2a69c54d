//! Pure version resolution: no I/O, no knowledge of "latest".
//!
//! Callers are responsible for the `"latest"` short-circuit (see [`crate::records::PluginRecord`]);
//! keeping that out of here means this module stays a pure function of `(versions, constraint)`
//! and can be unit-tested directly without any I/O fixtures.

use semver::{Comparator, Op, Prerelease, Version, VersionReq};

#[derive(Debug, Display, Error)]
pub enum ResolveError {
	#[display("invalid version {_0:?}: {_1}")]
	InvalidVersion(String, semver::Error),

	#[display("invalid version constraint {_0:?}: {_1}")]
	InvalidConstraint(String, semver::Error),

	#[display("no matching version found for constraint {_0}")]
	NoMatch(String),
}

/// Parses `constraint` into a canonical [`VersionReq`].
///
/// Two textually different but semantically equal constraints (e.g. `"^1.0.0"` and `"^1.0"`)
/// must canonicalize to the same [`ToString`] output so that hashing over the canonical form
/// produces identical cache keys.
pub fn parse_constraint(constraint: &str) -> Result<VersionReq, ResolveError> {
	constraint
		.parse()
		.map_err(|err| ResolveError::InvalidConstraint(constraint.to_owned(), err))
}

/// Re-serializes `req` into an explicit-bounds canonical string.
///
/// [`VersionReq`]'s own [`ToString`] preserves the caret/tilde shorthand the caller typed, so
/// `"^1.0.0"` and `"^1.0"` print differently even though they describe the same range. We
/// expand every comparator to its explicit `>=`/`<` bounds instead, which makes semantically
/// equal constraints hash identically — required for the request-shape cache to coalesce them.
pub fn canonicalize(req: &VersionReq) -> String {
	req.comparators
		.iter()
		.map(canonicalize_comparator)
		.collect::<Vec<_>>()
		.join(", ")
}

fn version_string(major: u64, minor: u64, patch: u64, pre: &Prerelease) -> String {
	if pre.is_empty() {
		format!("{major}.{minor}.{patch}")
	} else {
		format!("{major}.{minor}.{patch}-{pre}")
	}
}

fn canonicalize_comparator(c: &Comparator) -> String {
	let minor = c.minor.unwrap_or(0);
	let patch = c.patch.unwrap_or(0);
	let lower = version_string(c.major, minor, patch, &c.pre);

	match c.op {
		Op::Exact if c.patch.is_some() => format!("={lower}"),
		Op::Exact if c.minor.is_some() => {
			format!(">={lower}, <{}", version_string(c.major, minor + 1, 0, &Prerelease::EMPTY))
		},
		Op::Exact => format!(">={lower}, <{}", version_string(c.major + 1, 0, 0, &Prerelease::EMPTY)),
		Op::Greater => format!(">{lower}"),
		Op::GreaterEq => format!(">={lower}"),
		Op::Less => format!("<{lower}"),
		Op::LessEq => format!("<={lower}"),
		Op::Tilde if c.minor.is_some() => {
			format!(">={lower}, <{}", version_string(c.major, minor + 1, 0, &Prerelease::EMPTY))
		},
		Op::Tilde => format!(">={lower}, <{}", version_string(c.major + 1, 0, 0, &Prerelease::EMPTY)),
		Op::Caret if c.major > 0 => {
			format!(">={lower}, <{}", version_string(c.major + 1, 0, 0, &Prerelease::EMPTY))
		},
		Op::Caret if minor > 0 => format!(">={lower}, <{}", version_string(0, minor + 1, 0, &Prerelease::EMPTY)),
		Op::Caret if c.patch.is_some() => {
			format!(">={lower}, <{}", version_string(0, 0, patch + 1, &Prerelease::EMPTY))
		},
		Op::Caret if c.minor.is_some() => format!(">={lower}, <{}", version_string(0, 1, 0, &Prerelease::EMPTY)),
		Op::Caret => format!(">={lower}, <{}", version_string(1, 0, 0, &Prerelease::EMPTY)),
		Op::Wildcard if c.minor.is_some() => {
			format!(">={lower}, <{}", version_string(c.major, minor + 1, 0, &Prerelease::EMPTY))
		},
		Op::Wildcard => format!(">={lower}, <{}", version_string(c.major + 1, 0, 0, &Prerelease::EMPTY)),
		_ => lower,
	}
}

/// Returns the highest version in `candidates` that satisfies `constraint`.
///
/// `candidates` need not be sorted; every element must parse as semver or the whole call fails
/// (an unparsable candidate is a data-integrity error, not something to skip over silently).
/// Prereleases are only matched when `constraint` itself targets a prerelease, per the semver
/// convention encoded in [`VersionReq::matches`].
pub fn resolve(candidates: &[impl AsRef<str>], constraint: &VersionReq) -> Result<Version, ResolveError> {
	let mut versions = candidates
		.iter()
		.map(|candidate| {
			let candidate = candidate.as_ref();
			candidate
				.parse::<Version>()
				.map_err(|err| ResolveError::InvalidVersion(candidate.to_owned(), err))
		})
		.collect::<Result<Vec<_>, _>>()?;

	versions.sort_by(|a, b| b.cmp(a));

	versions
		.into_iter()
		.find(|version| constraint.matches(version))
		.ok_or_else(|| ResolveError::NoMatch(constraint.to_string()))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn picks_highest_matching_version() {
		let candidates = ["1.0.0", "1.0.1", "2.0.0", "1.5.0"];
		let constraint = parse_constraint("^1.0.0").unwrap();

		assert_eq!(resolve(&candidates, &constraint).unwrap(), Version::new(1, 5, 0));
	}

	#[test]
	fn tilde_constrains_to_patch_range() {
		let candidates = ["1.2.3", "1.2.9", "1.3.0"];
		let constraint = parse_constraint("~1.2.3").unwrap();

		assert_eq!(resolve(&candidates, &constraint).unwrap(), Version::new(1, 2, 9));
	}

	#[test]
	fn errors_when_nothing_matches() {
		let candidates = ["1.0.0"];
		let constraint = parse_constraint("^2.0.0").unwrap();

		assert!(matches!(resolve(&candidates, &constraint), Err(ResolveError::NoMatch(_))));
	}

	#[test]
	fn errors_on_unparsable_candidate() {
		let candidates = ["not-a-version"];
		let constraint = parse_constraint("*").unwrap();

		assert!(matches!(resolve(&candidates, &constraint), Err(ResolveError::InvalidVersion(..))));
	}

	#[test]
	fn excludes_prereleases_unless_targeted() {
		let candidates = ["1.0.0", "1.1.0-beta.1"];
		let constraint = parse_constraint("^1.0.0").unwrap();

		assert_eq!(resolve(&candidates, &constraint).unwrap(), Version::new(1, 0, 0));
	}

	#[test]
	fn equivalent_constraints_canonicalize_identically() {
		let a = parse_constraint("^1.0.0").unwrap();
		let b = parse_constraint("^1.0").unwrap();

		assert_eq!(canonicalize(&a), canonicalize(&b));
		assert_eq!(canonicalize(&a), ">=1.0.0, <2.0.0");
	}
}
