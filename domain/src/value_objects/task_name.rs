// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Strongly-typed plugin identifiers.
//!
//! The reference implementation strings plugin names together with the
//! human-readable `task_type` tag and casts between them freely. Keeping
//! `TaskName` as a distinct newtype prevents a registry lookup key from
//! being confused with a display string or a `TaskType` variant.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9_]*$").unwrap());

#[derive(Debug, thiserror::Error)]
#[error("invalid plugin name '{0}': must match ^[a-zA-Z][a-zA-Z0-9_]*$")]
pub struct InvalidName(String);

/// A validated, lowercased plugin name used as a registry key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct TaskName(String);

impl TaskName {
    /// Validates and lower-cases `raw` per the §4.1 name rule.
    pub fn parse(raw: &str) -> Result<Self, InvalidName> {
        if !NAME_PATTERN.is_match(raw) {
            return Err(InvalidName(raw.to_string()));
        }
        Ok(Self(raw.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for TaskName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}


#[cfg(test)]
mod name_properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Every string the pattern accepts round-trips through `parse`,
        /// and parsing the lowercased output again is a no-op — `TaskName`
        /// equality doesn't depend on how many times it's been parsed.
        #[test]
        fn parse_is_idempotent_on_its_own_output(raw in "[a-zA-Z][a-zA-Z0-9_]{0,20}") {
            let once = TaskName::parse(&raw).unwrap();
            let twice = TaskName::parse(once.as_str()).unwrap();
            prop_assert_eq!(once, twice);
        }
    }
}
