//! Target folder name sets.

use std::borrow::Cow;
use std::collections::BTreeSet;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// How folder names are compared against target names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseSensitivity {
    /// Names must match byte for byte.
    Sensitive,
    /// Names are compared after Unicode lower-casing.
    #[default]
    Insensitive,
}

impl CaseSensitivity {
    /// Normalize a name for comparison under this policy.
    pub fn normalize<'a>(&self, name: &'a str) -> Cow<'a, str> {
        match self {
            Self::Sensitive => Cow::Borrowed(name),
            Self::Insensitive => Cow::Owned(name.to_lowercase()),
        }
    }
}

/// A non-empty, deduplicated set of folder names to search for.
///
/// Names are stored normalized under the set's [`CaseSensitivity`], so two
/// names that differ only in case collapse into one entry when matching is
/// case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetSet {
    names: BTreeSet<CompactString>,
    case: CaseSensitivity,
}

impl TargetSet {
    /// Build a target set, trimming whitespace and dropping duplicates.
    pub fn new<I, S>(names: I, case: CaseSensitivity) -> Result<Self, ScanError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();

        for raw in names {
            let name = raw.as_ref().trim();
            if name.is_empty() {
                continue;
            }
            if name == "." || name == ".." || name.contains(['/', '\\']) {
                return Err(ScanError::invalid_config(format!(
                    "target name must be a plain folder name: {name:?}"
                )));
            }
            set.insert(CompactString::from(case.normalize(name)));
        }

        if set.is_empty() {
            return Err(ScanError::invalid_config("at least one target name is required"));
        }

        Ok(Self { names: set, case })
    }

    /// Check whether a folder basename is one of the targets.
    pub fn matches(&self, name: &str) -> bool {
        let key = self.case.normalize(name);
        self.names.contains(&*key)
    }

    /// The case-sensitivity policy fixed at construction.
    pub fn case_sensitivity(&self) -> CaseSensitivity {
        self.case
    }

    /// Iterate the normalized target names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(CompactString::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
