//! Configuration loading and root folder resolution

use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration for the TAKT server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen port
    pub port: u16,
    /// Data folder holding takt.db
    pub root_folder: PathBuf,
    /// Minimum interval between dashboard broadcasts
    pub broadcast_interval: Duration,
}

impl ServerConfig {
    /// Path to the SQLite database inside the root folder
    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join("takt.db")
    }
}

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&str>, env_var_name: &str) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        return PathBuf::from(path);
    }

    // Priority 3: TOML config file
    if let Some(config_path) = config_file_path() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(root_folder) = config.get("root_folder").and_then(|v| v.as_str()) {
                    return PathBuf::from(root_folder);
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Platform config file location (~/.config/takt/config.toml or equivalent)
fn config_file_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("takt").join("config.toml"));
    if let Some(path) = &user_config {
        if path.exists() {
            return user_config;
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/takt/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default data folder
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("takt"))
        .unwrap_or_else(|| PathBuf::from("./takt_data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_arg_takes_priority() {
        let root = resolve_root_folder(Some("/tmp/takt-test"), "TAKT_TEST_UNSET_VAR");
        assert_eq!(root, PathBuf::from("/tmp/takt-test"));
    }

    #[test]
    fn test_database_path() {
        let config = ServerConfig {
            port: 5760,
            root_folder: PathBuf::from("/var/lib/takt"),
            broadcast_interval: Duration::from_millis(2000),
        };
        assert_eq!(config.database_path(), PathBuf::from("/var/lib/takt/takt.db"));
    }
}
