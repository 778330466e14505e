//! Capability tags declared by tools.
//!
//! Capabilities are advisory metadata in this version of the kernel: they are
//! advertised to generation backends and listed by operators, but nothing
//! checks a tool's behaviour against them.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Permission a tool declares it needs.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    /// Outbound network access.
    Network,
    /// Local filesystem access.
    Filesystem,
    /// Access to process or host state.
    State,
}

/// Ordered, duplicate-free set of capabilities.
pub type CapabilitySet = BTreeSet<Capability>;

impl Capability {
    /// All known capabilities.
    pub const ALL: [Self; 3] = [Self::Network, Self::Filesystem, Self::State];

    /// Returns the wire tag for this capability.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Filesystem => "filesystem",
            Self::State => "state",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|cap| cap.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownCapability { tag: s.to_owned() })
    }
}
