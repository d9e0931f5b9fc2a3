//! Scope parsing.

use std::collections::BTreeSet;

/// Scope that turns an authorization request into an OpenID request.
pub const OPENID_SCOPE: &str = "openid";

/// Parses a space-delimited scope parameter.
///
/// Empty segments are ignored, so an empty or blank parameter yields an empty set.
#[must_use]
pub fn parse_scope(scope: &str) -> BTreeSet<String> {
    scope.split_whitespace().map(str::to_string).collect()
}
