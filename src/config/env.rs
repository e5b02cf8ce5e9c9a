//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use std::path::Path;

/// Environment variables read by [`Config::merge_from_env`](crate::models::Config::merge_from_env)
pub const SUPPORTED_ENV_VARS: &[(&str, &str, &str)] = &[
    ("PROBE_COUNT", "Number of probes per address (1-100)", "4"),
    ("PROBE_TIMEOUT_MS", "Per-probe timeout in milliseconds", "1000"),
    ("LOSS_THRESHOLD", "Loss ratio above which loss is intermittent (0.0-1.0)", "0.5"),
    ("OVERALL_TIMEOUT_MS", "Deadline for a whole probe batch in milliseconds", "4500"),
    ("MAX_IN_FLIGHT", "Maximum probes in flight at once", "8"),
    ("PROBE_METHOD", "Probing method (icmp or tcp)", "icmp"),
    ("TCP_PORT", "Port for TCP probes", "443"),
    ("TCP_FALLBACK", "Fall back to TCP when ICMP is not permitted", "true"),
    ("DNS_SERVERS", "Comma-separated DNS server IPs", "1.1.1.1,8.8.8.8"),
    ("DOH_PROVIDER", "DNS-over-HTTPS provider URL", "https://cloudflare-dns.com/dns-query"),
    ("ENABLE_COLOR", "Enable colored output", "true"),
    ("OUTPUT_FORMAT", "Report format (text, markdown, json)", "text"),
];

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load .env from the current directory if it exists
    pub fn load_env_file(debug: bool) -> Result<()> {
        Self::load_env_file_from(Path::new(".env"), debug)
    }

    /// Load a specific env file if it exists
    pub fn load_env_file_from(path: &Path, debug: bool) -> Result<()> {
        if path.exists() {
            dotenv::from_path(path)
                .map_err(|e| AppError::config(format!("Failed to load {}: {}", path.display(), e)))?;

            if debug {
                eprintln!("Loaded configuration from {}", path.display());
            }
        } else if debug {
            eprintln!("No {} file found, using defaults and CLI arguments", path.display());
        }

        Ok(())
    }

    /// Environment variable section of `--help`
    pub fn env_help() -> String {
        let mut help = String::from("Supported Environment Variables:\n\n");

        for (var, description, example) in SUPPORTED_ENV_VARS {
            help.push_str(&format!("  {:<20} {}\n", var, description));
            help.push_str(&format!("  {:<20} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables\n");
        help.push_str("  3. .env file values\n");
        help.push_str("  4. Default values\n");

        help
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_missing_env_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        assert!(EnvManager::load_env_file_from(&dir.path().join(".env"), false).is_ok());
    }

    #[test]
    fn test_load_env_file_sets_variables() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "NETDIAG_TEST_ONLY_VARIABLE=from-file").unwrap();

        EnvManager::load_env_file_from(file.path(), false).unwrap();
        assert_eq!(std::env::var("NETDIAG_TEST_ONLY_VARIABLE").unwrap(), "from-file");
    }

    #[test]
    fn test_env_help_lists_every_variable() {
        let help = EnvManager::env_help();
        for (var, _, _) in SUPPORTED_ENV_VARS {
            assert!(help.contains(var), "missing {}", var);
        }
        assert!(help.contains("1. Command-line arguments"));
    }
}
