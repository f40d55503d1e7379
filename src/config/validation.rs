use super::{parse_duration_string, Settings};
use crate::error::{Error, Result};

impl Settings {
    /// Reject settings that would make the engine misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.services_root.as_os_str().is_empty() {
            return Err(Error::Validation("'services_root' must not be empty".to_string()));
        }
        if self.database.as_os_str().is_empty() {
            return Err(Error::Validation("'database' must not be empty".to_string()));
        }

        for (field, value) in [
            ("runtime.command_timeout", &self.runtime.command_timeout),
            ("runtime.inspect_timeout", &self.runtime.inspect_timeout),
        ] {
            match parse_duration_string(value) {
                Some(d) if !d.is_zero() => {}
                Some(_) => {
                    return Err(Error::Validation(format!("'{}' must be greater than zero", field)))
                }
                None => {
                    return Err(Error::Validation(format!(
                        "'{}' has invalid duration '{}'. Use formats like '5s', '30s', '1m', '500ms'",
                        field, value
                    )))
                }
            }
        }

        if self.runtime.max_concurrent_inspections == 0 {
            return Err(Error::Validation(
                "'runtime.max_concurrent_inspections' must be at least 1".to_string(),
            ));
        }

        match self.runtime.compose_command.trim().to_ascii_lowercase().as_str() {
            "auto" | "v1" | "v2" => {}
            other => {
                return Err(Error::Validation(format!(
                    "'runtime.compose_command' must be auto, v1 or v2 (got '{}')",
                    other
                )))
            }
        }

        if self.auth.tokens.iter().any(|t| t.trim().is_empty()) {
            return Err(Error::Validation("'auth.tokens' contains an empty token".to_string()));
        }

        if self.archive.max_entries == 0 || self.archive.max_total_bytes == 0 {
            return Err(Error::Validation(
                "'archive' limits must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
