use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure that can be loaded from CLI, config file, or environment
///
/// Example configuration file content
/// # Upload Relay Configuration
///
/// # Server configuration
/// listen_on_port = 3000
/// workspace = "./workspace"
/// max_upload_mb = 64
///
/// # Relay configuration
/// relay_url = "https://httpbin.org/post"
/// relay_timeout_secs = 30  # Optional: wait forever when unset
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[serde(default)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Port to listen on
    #[arg(short, long, default_value_t = 3000)]
    #[serde(default = "default_port")]
    pub listen_on_port: u16,

    /// Root directory for per-request upload directories
    #[arg(short = 'w', long, default_value = "workspace")]
    #[serde(default = "default_workspace")]
    pub workspace: String,

    /// Endpoint that receives the uploaded files and keywords
    #[arg(short, long, default_value = "https://httpbin.org/post")]
    #[serde(default = "default_relay_url")]
    pub relay_url: String,

    /// Timeout for the relay call in seconds (unset = wait indefinitely)
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relay_timeout_secs: Option<u64>,

    /// Maximum accepted upload body, in MiB
    #[arg(short, long, default_value_t = 64)]
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,

    /// Configuration file path (CLI arguments take precedence)
    #[arg(short, long)]
    #[serde(skip)]
    pub config: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_on_port: default_port(),
            workspace: default_workspace(),
            relay_url: default_relay_url(),
            relay_timeout_secs: None,
            max_upload_mb: default_max_upload_mb(),
            config: None,
        }
    }
}

impl Config {
    /// Load configuration from CLI args, optionally merging with a config file
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Config::parse();

        if let Some(config_path) = &config.config {
            let file_config = Self::from_file(Path::new(config_path))?;
            config = config.merge_with_file(file_config);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Merge with file config, CLI args take precedence
    fn merge_with_file(mut self, file_config: Config) -> Self {
        // If CLI value is default, use file value
        if self.listen_on_port == default_port() {
            self.listen_on_port = file_config.listen_on_port;
        }
        if self.workspace == default_workspace() {
            self.workspace = file_config.workspace;
        }
        if self.relay_url == default_relay_url() {
            self.relay_url = file_config.relay_url;
        }
        if self.max_upload_mb == default_max_upload_mb() {
            self.max_upload_mb = file_config.max_upload_mb;
        }

        if self.relay_timeout_secs.is_none() {
            self.relay_timeout_secs = file_config.relay_timeout_secs;
        }

        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.workspace.is_empty() {
            return Err(anyhow::anyhow!("Workspace directory cannot be empty"));
        }

        if self.relay_url.is_empty() {
            return Err(anyhow::anyhow!("Relay URL cannot be empty"));
        }
        if !self.relay_url.starts_with("http://") && !self.relay_url.starts_with("https://") {
            return Err(anyhow::anyhow!(
                "Relay URL must start with http:// or https://"
            ));
        }

        if self.max_upload_mb == 0 {
            return Err(anyhow::anyhow!("max_upload_mb must be greater than 0"));
        }

        Ok(())
    }

    pub fn relay_timeout(&self) -> Option<Duration> {
        self.relay_timeout_secs.map(Duration::from_secs)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

// Default value functions
fn default_port() -> u16 {
    3000
}

fn default_workspace() -> String {
    "workspace".to_string()
}

fn default_relay_url() -> String {
    "https://httpbin.org/post".to_string()
}

fn default_max_upload_mb() -> usize {
    64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_from_cli() {
        let cli_content = [
            "CLI",
            "--listen-on-port",
            "8080",
            "--workspace",
            "/tmp/test",
            "--relay-url",
            "http://127.0.0.1:9000/echo",
            "--relay-timeout-secs",
            "15",
            "--max-upload-mb",
            "8",
        ];

        let config = Config::try_parse_from(cli_content).unwrap();

        assert_eq!(config.listen_on_port, 8080);
        assert_eq!(config.workspace, "/tmp/test");
        assert_eq!(config.relay_url, "http://127.0.0.1:9000/echo");
        assert_eq!(config.relay_timeout(), Some(Duration::from_secs(15)));
        assert_eq!(config.max_upload_bytes(), 8 * 1024 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_toml() {
        let toml_content = r#"
            listen_on_port = 8080
            workspace = "/tmp/test"
            relay_url = "http://localhost:9000/post"
            relay_timeout_secs = 5
        "#;

        let config: Config = toml::from_str(toml_content).unwrap();

        assert_eq!(config.listen_on_port, 8080);
        assert_eq!(config.relay_url, "http://localhost:9000/post");
        assert_eq!(config.relay_timeout_secs, Some(5));
        // Unset keys fall back to defaults
        assert_eq!(config.max_upload_mb, 64);
    }

    #[test]
    fn test_config_without_timeout_waits_forever() {
        let config: Config = toml::from_str("listen_on_port = 8080").unwrap();
        assert!(config.relay_timeout().is_none());
        assert_eq!(config.relay_url, "https://httpbin.org/post");
        assert_eq!(config.workspace, "workspace");
    }

    #[test]
    fn test_config_merge_cli_takes_precedence() {
        let file_config = Config {
            listen_on_port: 7000,
            workspace: "/srv/uploads".to_string(),
            relay_timeout_secs: Some(20),
            ..Default::default()
        };

        let cli_config = Config {
            listen_on_port: 9000,
            ..Default::default()
        };

        let merged = cli_config.merge_with_file(file_config);

        assert_eq!(merged.listen_on_port, 9000); // CLI value takes precedence
        assert_eq!(merged.workspace, "/srv/uploads"); // File value used when CLI is default
        assert_eq!(merged.relay_timeout_secs, Some(20)); // File value used when CLI is None
    }

    #[test]
    fn test_validate_rejects_bad_relay_url() {
        let config = Config {
            relay_url: "ftp://example.com".to_string(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("http:// or https://"));

        let config = Config {
            relay_url: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_body_limit() {
        let config = Config {
            max_upload_mb: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_default_is_valid() {
        assert!(Config::default().validate().is_ok());
    }
}
