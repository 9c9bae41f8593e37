//! Composite `(config type, config id)` key identifying which configured
//! operation a job belongs to.
//!
//! The flat form `"<config_type>:<config_id>"` only exists at the persistence
//! boundary, where it is indexed. [`JobScope::encode`] and [`JobScope::decode`]
//! are the only functions that build or split it.

use std::fmt;
use std::str::FromStr;

use crate::error::{HistoryError, Result};
use crate::jobs::model::ConfigType;

pub const SCOPE_DELIMITER: char = ':';

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobScope {
    pub config_type: ConfigType,
    pub config_id: String,
}

impl JobScope {
    /// Config ids must be non-empty and must not contain [`SCOPE_DELIMITER`],
    /// otherwise the flat form could not be split back unambiguously.
    pub fn new(config_type: ConfigType, config_id: impl Into<String>) -> Result<Self> {
        let config_id = config_id.into();
        if config_id.is_empty() {
            return Err(HistoryError::InvalidScope("config id is empty".into()));
        }
        if config_id.contains(SCOPE_DELIMITER) {
            return Err(HistoryError::InvalidScope(format!(
                "config id {config_id:?} contains {SCOPE_DELIMITER:?}"
            )));
        }
        Ok(Self {
            config_type,
            config_id,
        })
    }

    pub fn encode(&self) -> String {
        format!(
            "{}{}{}",
            self.config_type.as_str(),
            SCOPE_DELIMITER,
            self.config_id
        )
    }

    pub fn decode(scope: &str) -> Result<Self> {
        let (config_type, config_id) = scope
            .split_once(SCOPE_DELIMITER)
            .ok_or_else(|| HistoryError::InvalidScope(format!("{scope:?} has no delimiter")))?;

        Self::new(ConfigType::parse(config_type)?, config_id)
    }
}

impl fmt::Display for JobScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for JobScope {
    type Err = HistoryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::decode(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_config_type() {
        for config_type in ConfigType::ALL {
            for config_id in ["a", "5f1c1b4e-2f7a-4f0e-9b7e-0d5a3c1e9a11", "conn_01.prod-eu"] {
                let scope = JobScope::new(config_type, config_id).unwrap();
                let decoded = JobScope::decode(&scope.encode()).unwrap();
                assert_eq!(decoded, scope);
                assert_eq!(decoded.config_type, config_type);
                assert_eq!(decoded.config_id, config_id);
            }
        }
    }

    #[test]
    fn encodes_type_then_id() {
        let scope = JobScope::new(ConfigType::Sync, "conn-1").unwrap();
        assert_eq!(scope.encode(), "sync:conn-1");
        assert_eq!(scope.to_string(), "sync:conn-1");
        assert_eq!("sync:conn-1".parse::<JobScope>().unwrap(), scope);
    }

    #[test]
    fn rejects_config_id_with_delimiter() {
        assert!(matches!(
            JobScope::new(ConfigType::Sync, "a:b"),
            Err(HistoryError::InvalidScope(_))
        ));
        assert!(matches!(
            JobScope::decode("sync:a:b"),
            Err(HistoryError::InvalidScope(_))
        ));
    }

    #[test]
    fn rejects_empty_config_id() {
        assert!(JobScope::new(ConfigType::Sync, "").is_err());
        assert!(JobScope::decode("sync:").is_err());
    }

    #[test]
    fn rejects_malformed_flat_scope() {
        assert!(matches!(
            JobScope::decode("sync"),
            Err(HistoryError::InvalidScope(_))
        ));
        assert!(matches!(
            JobScope::decode("teleport:conn-1"),
            Err(HistoryError::UnmappedStatus { kind: "config_type", .. })
        ));
    }
}
