use std::path::PathBuf;

use clap::Parser;
use serde::Deserialize;

#[derive(Parser)]
#[command(name = "ccexec", version = "1.0", about, long_about = None)]
pub struct CliArgs {
    /// Path to the configuration file
    #[arg(long = "config", short = 'c')]
    pub config_path: Option<String>,

    /// Number of engine workers, overrides the configuration file
    #[arg(long = "threads", short = 't')]
    pub threads: Option<u8>,

    /// Dump the execution trace instead of running the program
    #[arg(long = "trace", default_value_t = false)]
    pub trace: bool,
}

impl CliArgs {
    /// Load the configuration from the specified file, then apply CLI overrides
    pub fn to_config(&self) -> std::io::Result<Config> {
        let mut config = match &self.config_path {
            Some(path) => {
                let file = std::fs::File::open(path)?;
                let reader = std::io::BufReader::new(file);
                serde_json::from_reader(reader)?
            }
            None => Config::default(),
        };

        if let Some(threads) = self.threads {
            config.engine.workers = Some(threads);
        }
        if self.trace {
            config.toolchain.capture_mode = CaptureMode::Trace;
        }

        Ok(config)
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub toolchain: ToolchainConfig,
}

#[derive(Deserialize, Debug, Default)]
pub struct ServerConfig {
    pub bind_address: Option<String>,
    pub bind_port: Option<u16>,
    /// Seconds to wait for a job result before answering with a timeout
    pub request_timeout: Option<u64>,
}

#[derive(Deserialize, Debug, Default)]
pub struct EngineConfig {
    pub docker: Option<String>,
    pub work_dir: Option<PathBuf>,
    pub workers: Option<u8>,
}

#[derive(Deserialize, Debug, Default)]
pub struct ToolchainConfig {
    pub image: Option<String>,
    #[serde(default)]
    pub capture_mode: CaptureMode,
}

/// What the job leaves in the capture file once compilation succeeded.
#[derive(Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    /// Run the program through the runtime helper and capture its JSON.
    #[default]
    Run,
    /// Capture the raw execution trace and pass it through untouched.
    Trace,
}

impl ServerConfig {
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout.unwrap_or(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let config: Config = serde_json::from_str(
            r#"{
                "server": { "bind_address": "0.0.0.0", "bind_port": 9000, "request_timeout": 5 },
                "engine": { "docker": "podman", "workers": 4 },
                "toolchain": { "image": "gcc:14", "capture_mode": "trace" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.server.bind_address, Some("0.0.0.0".to_string()));
        assert_eq!(config.server.request_timeout().as_secs(), 5);
        assert_eq!(config.engine.docker.as_deref(), Some("podman"));
        assert_eq!(config.engine.workers, Some(4));
        assert_eq!(config.toolchain.capture_mode, CaptureMode::Trace);
    }

    #[test]
    fn test_config_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.server.bind_port, None);
        assert_eq!(config.server.request_timeout().as_secs(), 60);
        assert_eq!(config.toolchain.capture_mode, CaptureMode::Run);
    }

    #[test]
    fn test_cli_overrides() {
        let cli = CliArgs::parse_from(["ccexec", "-t", "3", "--trace"]);
        let config = cli.to_config().unwrap();
        assert_eq!(config.engine.workers, Some(3));
        assert_eq!(config.toolchain.capture_mode, CaptureMode::Trace);
    }
}
