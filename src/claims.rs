//! User claims and the authorization policies built on them.
//!
//! Claims travel as plain string pairs (in storage and inside access tokens),
//! but only keys from [`ClaimKind`] are ever written or honoured.

use std::collections::BTreeMap;

/// Recognized claim keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClaimKind {
    /// Allows listing tags.
    TagsView,
}

impl ClaimKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimKind::TagsView => "tags.view",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "tags.view" => Some(ClaimKind::TagsView),
            _ => None,
        }
    }
}

/// A single key/value claim attached to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserClaim {
    pub kind: ClaimKind,
    pub value: String,
}

impl UserClaim {
    pub fn new(kind: ClaimKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

/// Claims attached to every newly registered user.
pub fn default_claims() -> Vec<UserClaim> {
    vec![UserClaim::new(ClaimKind::TagsView, "true")]
}

/// Named authorization policies evaluated against token claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Requires `tags.view = true`.
    TagViewer,
}

impl Policy {
    fn requirement(&self) -> (ClaimKind, &'static str) {
        match self {
            Policy::TagViewer => (ClaimKind::TagsView, "true"),
        }
    }

    /// Check whether the given token claims satisfy this policy.
    pub fn is_satisfied_by(&self, claims: &BTreeMap<String, String>) -> bool {
        let (kind, expected) = self.requirement();
        claims.get(kind.as_str()).map(String::as_str) == Some(expected)
    }
}
