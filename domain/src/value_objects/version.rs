// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Plugin semantic version, validated at registration time per §4.1.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]+\.[0-9]+\.[0-9]+$").unwrap());

#[derive(Debug, thiserror::Error)]
#[error("invalid plugin version '{0}': must match ^[0-9]+\\.[0-9]+\\.[0-9]+$")]
pub struct InvalidVersion(String);

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PluginVersion(String);

impl PluginVersion {
    pub fn parse(raw: &str) -> Result<Self, InvalidVersion> {
        if !VERSION_PATTERN.is_match(raw) {
            return Err(InvalidVersion(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PluginVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_semver_triples() {
        assert!(PluginVersion::parse("1.0.0").is_ok());
        assert!(PluginVersion::parse("0.12.3").is_ok());
    }

    #[test]
    fn rejects_malformed_versions() {
        assert!(PluginVersion::parse("1.0").is_err());
        assert!(PluginVersion::parse("1.0.0-beta").is_err());
        assert!(PluginVersion::parse("v1.0.0").is_err());
    }
}
