use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which drift a repair run addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixKind {
    /// Filesystem and runtime state.
    All,
    /// Registry vs services root (`data` is accepted as an alias).
    Filesystem,
    /// Registry intent vs runtime.
    State,
}

impl FixKind {
    pub fn includes_filesystem(&self) -> bool {
        matches!(self, FixKind::All | FixKind::Filesystem)
    }

    pub fn includes_state(&self) -> bool {
        matches!(self, FixKind::All | FixKind::State)
    }
}

impl FromStr for FixKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(FixKind::All),
            "data" | "filesystem" => Ok(FixKind::Filesystem),
            "state" => Ok(FixKind::State),
            other => Err(Error::InvalidRequest(format!(
                "unknown fix kind '{}' (expected all, data, filesystem or state)",
                other
            ))),
        }
    }
}

impl fmt::Display for FixKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FixKind::All => "all",
            FixKind::Filesystem => "filesystem",
            FixKind::State => "state",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn parses_known_kinds_and_aliases() {
        assert_eq!("all".parse::<FixKind>().unwrap(), FixKind::All);
        assert_eq!("data".parse::<FixKind>().unwrap(), FixKind::Filesystem);
        assert_eq!("Filesystem".parse::<FixKind>().unwrap(), FixKind::Filesystem);
        assert_eq!("state".parse::<FixKind>().unwrap(), FixKind::State);
    }

    #[test]
    fn unknown_kind_is_invalid_input() {
        let err = "everything".parse::<FixKind>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn scopes() {
        assert!(FixKind::All.includes_filesystem() && FixKind::All.includes_state());
        assert!(!FixKind::State.includes_filesystem());
        assert!(!FixKind::Filesystem.includes_state());
    }
}
