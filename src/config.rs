// src/config.rs

pub mod session;

use self::session::load_or_create_external_config;
use crate::{cli::Cli, constants, error::AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NetworkConfig {
    pub connect_timeout_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub max_workers: Option<usize>,
}

/// 跳转链接目标的分类规则
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClassificationConfig {
    pub video_hosts: Vec<String>,
    pub document_extensions: Vec<String>,
    pub cloud_document_hosts: Vec<String>,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        use constants::classification::*;
        Self {
            video_hosts: VIDEO_HOSTS.iter().map(|s| s.to_string()).collect(),
            document_extensions: DOCUMENT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            cloud_document_hosts: CLOUD_DOCUMENT_HOSTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_cookie: Option<String>,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub classification: ClassificationConfig,
}

impl ExternalConfig {
    pub(crate) fn default_app_config() -> Self {
        // 为 NetworkConfig 提供一组稳健的默认值
        let network_config = NetworkConfig {
            connect_timeout_secs: Some(10),
            timeout_secs: Some(30),
            max_retries: Some(3),
            max_workers: Some(constants::DEFAULT_WORKERS),
        };

        Self {
            session_cookie: None,
            network: network_config,
            classification: ClassificationConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub max_workers: usize,
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub timeout: Duration,
    /// 仅作用于文件传输；扫描阶段的页面请求从不自动重试
    pub max_retries: u32,
    pub expand_folders: bool,
    pub defer_redirects: bool,
    pub classification: ClassificationConfig,
}

impl AppConfig {
    pub fn new(args: &Cli) -> AppResult<Self> {
        let external_config = load_or_create_external_config()?;
        Ok(Self::from_parts(args, external_config))
    }

    pub(crate) fn from_parts(args: &Cli, external_config: ExternalConfig) -> Self {
        let network = external_config.network;
        let workers = args
            .workers
            .or(network.max_workers)
            .unwrap_or(constants::DEFAULT_WORKERS);

        Self {
            max_workers: clamp_workers(workers),
            user_agent: constants::USER_AGENT.into(),
            connect_timeout: Duration::from_secs(network.connect_timeout_secs.unwrap_or(10)),
            timeout: Duration::from_secs(args.timeout.or(network.timeout_secs).unwrap_or(30)),
            max_retries: network.max_retries.unwrap_or(3),
            expand_folders: !args.no_expand_folders,
            defer_redirects: args.defer_redirects,
            classification: external_config.classification,
        }
    }
}

pub fn clamp_workers(requested: usize) -> usize {
    requested.clamp(1, constants::MAX_WORKERS)
}

#[cfg(any(test, feature = "testing"))]
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            user_agent: "test-agent/1.0".to_string(),
            connect_timeout: Duration::from_secs(5),
            timeout: Duration::from_secs(5),
            max_retries: 0,
            expand_folders: true,
            defer_redirects: false,
            classification: ClassificationConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_overrides_file_values() {
        let args = Cli::parse_from([
            "course-dl",
            "--url",
            "https://lms.example.com/course/view.php?id=7",
            "--workers",
            "64",
            "--timeout",
            "5",
            "--no-expand-folders",
        ]);
        let config = AppConfig::from_parts(&args, ExternalConfig::default_app_config());

        // 并发宽度被限制在上限之内
        assert_eq!(config.max_workers, constants::MAX_WORKERS);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(!config.expand_folders);
        assert!(!config.defer_redirects);
    }

    #[test]
    fn test_partial_config_file_uses_defaults() {
        let external: ExternalConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(external.classification, ClassificationConfig::default());

        let args = Cli::parse_from(["course-dl", "--url", "https://lms.example.com/course"]);
        let config = AppConfig::from_parts(&args, external);
        assert_eq!(config.max_workers, constants::DEFAULT_WORKERS);
        assert_eq!(config.max_retries, 3);
        assert_eq!(clamp_workers(0), 1);
    }
}
