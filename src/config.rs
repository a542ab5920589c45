// 配置模块
// 默认值 -> config.toml -> 环境变量 -> 命令行参数，后者覆盖前者

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::utils;

pub const DEFAULT_API_URL: &str = "http://localhost:3000";
pub const API_URL_ENV: &str = "DSA_TUTOR_API_URL";

/// 客户端配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_url: String,
    pub data_dir: PathBuf,
    pub log_level: String,
    pub challenge_count: u32,   // 每轮挑战题数
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            data_dir: utils::get_app_data_dir(),
            log_level: "info".to_string(),
            challenge_count: 10,
            request_timeout_secs: 30,
        }
    }
}

/// 命令行覆盖项
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_url: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
    pub verbose: bool,
}

impl AppConfig {
    /// 读取 TOML 配置文件，文件不存在时返回默认配置
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(config)
    }

    /// 按层级合并配置
    pub fn load(overrides: ConfigOverrides) -> Result<Self> {
        let data_dir = overrides
            .data_dir
            .clone()
            .unwrap_or_else(utils::get_app_data_dir);
        let config_path = overrides
            .config_file
            .clone()
            .unwrap_or_else(|| utils::get_config_path(&data_dir));

        let mut config = Self::from_file(&config_path)?;
        if overrides.data_dir.is_some() {
            config.data_dir = data_dir;
        }

        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                config.api_url = url;
            }
        }

        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(url) = overrides.api_url {
            self.api_url = url;
        }
        if overrides.verbose {
            self.log_level = "debug".to_string();
        }
        self.api_url = self.api_url.trim_end_matches('/').to_string();
    }

    pub fn validate(&self) -> Result<()> {
        reqwest::Url::parse(&self.api_url)
            .with_context(|| format!("Invalid api_url '{}'", self.api_url))?;
        if self.challenge_count == 0 {
            anyhow::bail!("challenge_count must be greater than zero");
        }
        Ok(())
    }

    pub fn log_level_filter(&self) -> log::LevelFilter {
        self.log_level
            .parse::<log::LevelFilter>()
            .unwrap_or(log::LevelFilter::Info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.challenge_count, 10);
        assert_eq!(config.log_level_filter(), log::LevelFilter::Info);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "api_url = \"https://api.example.org\"\nchallenge_count = 5\n").unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.api_url, "https://api.example.org");
        assert_eq!(config.challenge_count, 5);
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_overrides_win() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.apply(ConfigOverrides {
            api_url: Some("http://127.0.0.1:9000/".into()),
            data_dir: Some(dir.path().to_path_buf()),
            config_file: None,
            verbose: true,
        });

        assert_eq!(config.api_url, "http://127.0.0.1:9000");
        assert_eq!(config.log_level_filter(), log::LevelFilter::Debug);
    }

    #[test]
    fn test_invalid_url_rejected() {
        let config = AppConfig {
            api_url: "no es una url".into(),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
