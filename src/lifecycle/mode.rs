//! Runtime mode.
//!
//! Tells the orchestrator whether this process already runs inside the
//! managed environment (the self-hosting guard).

pub const DOCKERIZED_ENV: &str = "SANDBOX_DOCKERIZED";

#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeMode {
    dockerized: bool,
}

impl RuntimeMode {
    /// Resolve the mode from the `--dockerized` flag and `SANDBOX_DOCKERIZED`.
    pub fn initialize(dockerized_flag: bool) -> Self {
        let from_env = std::env::var(DOCKERIZED_ENV)
            .map(|v| parse_flag(&v))
            .unwrap_or(false);
        let mode = Self {
            dockerized: dockerized_flag || from_env,
        };
        tracing::info!(dockerized = mode.dockerized, "Runtime mode initialized");
        mode
    }

    pub fn is_dockerized(&self) -> bool {
        self.dockerized
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" YES "));
        assert!(parse_flag("1"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn test_flag_wins() {
        assert!(RuntimeMode::initialize(true).is_dockerized());
    }
}
