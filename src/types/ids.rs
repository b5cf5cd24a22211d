//! Newtype wrappers for domain identifiers.
//!
//! These types prevent accidental mixing of different identifier kinds (e.g.,
//! passing a raw project key where a tracker host is expected) and make the
//! code more self-documenting.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A destination tracker host identifier (base URL, e.g. `https://acme.example.net`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackerHost(pub String);

impl TrackerHost {
    pub fn new(s: impl Into<String>) -> Self {
        TrackerHost(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackerHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TrackerHost {
    fn from(s: String) -> Self {
        TrackerHost(s)
    }
}

impl From<&str> for TrackerHost {
    fn from(s: &str) -> Self {
        TrackerHost(s.to_string())
    }
}

/// A source-platform installation identifier.
///
/// An installation is the unit that owns one or more subscriptions; several
/// subscriptions (one per destination host) may share an installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstallationId(pub u64);

impl fmt::Display for InstallationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for InstallationId {
    fn from(n: u64) -> Self {
        InstallationId(n)
    }
}

/// A tracker project key, normalized to uppercase.
///
/// Construct via [`ProjectKey::normalized`] so the uppercase invariant holds.
/// Deserialization trusts the stored value (the store only ever persists
/// normalized keys).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectKey(pub String);

impl ProjectKey {
    /// Creates a project key, applying full Unicode uppercasing.
    pub fn normalized(s: &str) -> Self {
        ProjectKey(s.to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A normalized issue key of the form `<PROJECT-KEY>-<NUMBER>`, uppercased.
///
/// Produced by the extractor, which guarantees the shape: a project-key segment
/// (letter-initial, two or more alphanumerics), a literal `-`, and one or more
/// ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueKey(pub String);

impl IssueKey {
    pub fn new(s: impl Into<String>) -> Self {
        IssueKey(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the project-key portion: everything before the final `-<digits>`.
    ///
    /// `JRA-123` yields `JRA`; `J3-123` yields `J3`. The extractor guarantees
    /// the trailing `-<digits>` exists, but this degrades gracefully (returning
    /// the whole key) if handed a malformed value.
    pub fn project_key(&self) -> ProjectKey {
        match self.0.rfind('-') {
            Some(idx) => ProjectKey(self.0[..idx].to_string()),
            None => ProjectKey(self.0.clone()),
        }
    }
}

impl fmt::Display for IssueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for IssueKey {
    fn from(s: &str) -> Self {
        IssueKey(s.to_string())
    }
}

/// A webhook delivery ID from the source platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeliveryId(pub String);

impl DeliveryId {
    pub fn new(s: impl Into<String>) -> Self {
        DeliveryId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeliveryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for DeliveryId {
    fn from(s: String) -> Self {
        DeliveryId(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod tracker_host {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn serde_roundtrip(s in "https://[a-z]{1,20}\\.example\\.net") {
                let host = TrackerHost::new(&s);
                let json = serde_json::to_string(&host).unwrap();
                let parsed: TrackerHost = serde_json::from_str(&json).unwrap();
                prop_assert_eq!(host, parsed);
            }

            #[test]
            fn display_is_identity(s in "[a-z:/.]{1,40}") {
                let host = TrackerHost::new(&s);
                prop_assert_eq!(format!("{}", host), s);
            }
        }
    }

    mod installation_id {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn serde_roundtrip(n: u64) {
                let id = InstallationId(n);
                let json = serde_json::to_string(&id).unwrap();
                let parsed: InstallationId = serde_json::from_str(&json).unwrap();
                prop_assert_eq!(id, parsed);
            }

            #[test]
            fn comparison_matches_underlying(a: u64, b: u64) {
                prop_assert_eq!(InstallationId(a) == InstallationId(b), a == b);
            }
        }
    }

    mod project_key {
        use super::*;

        #[test]
        fn normalized_uppercases_ascii() {
            assert_eq!(ProjectKey::normalized("jra").as_str(), "JRA");
        }

        #[test]
        fn normalized_uppercases_unicode() {
            assert_eq!(ProjectKey::normalized("tête").as_str(), "TÊTE");
            assert_eq!(ProjectKey::normalized("шъ").as_str(), "ШЪ");
        }

        #[test]
        fn caseless_scripts_pass_through() {
            assert_eq!(ProjectKey::normalized("r汉字").as_str(), "R汉字");
        }
    }

    mod issue_key {
        use super::*;

        #[test]
        fn project_key_strips_final_number() {
            assert_eq!(IssueKey::from("JRA-123").project_key().as_str(), "JRA");
        }

        #[test]
        fn project_key_keeps_embedded_digits() {
            assert_eq!(IssueKey::from("J42-123").project_key().as_str(), "J42");
        }

        #[test]
        fn project_key_of_malformed_key_is_whole_key() {
            assert_eq!(IssueKey::from("NODASH").project_key().as_str(), "NODASH");
        }
    }
}
