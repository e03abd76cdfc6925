use crate::error::{MoodPostError, Result, ValidationIssue};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const API_URL_ENV: &str = "MOODPOST_API_URL";
const USER_ID_ENV: &str = "MOODPOST_USER_ID";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub user_id: Option<String>,
    pub timeout_seconds: u64,
    /// 失敗時の再試行回数（最大1回）
    pub max_retries: u32,
    /// 推薦の初期表示件数
    pub recommendation_window: usize,
    /// アップロード前に縮小する長辺の最大px
    pub max_image_size: u32,
    /// スナップショット保存先（未指定ならデータディレクトリ）
    pub snapshot_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000/api".into(),
            user_id: None,
            timeout_seconds: 20,
            max_retries: 1,
            recommendation_window: 5,
            max_image_size: 1024,
            snapshot_dir: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| MoodPostError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("moodpost").join("config.json"))
    }

    pub fn api_base_url(&self) -> String {
        // 環境変数を優先
        match std::env::var(API_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => url.trim().trim_end_matches('/').to_string(),
            _ => self.api_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn get_user_id(&self) -> Result<String> {
        if let Ok(id) = std::env::var(USER_ID_ENV) {
            if !id.trim().is_empty() {
                return Ok(id.trim().to_string());
            }
        }

        self.user_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .ok_or(MoodPostError::Validation(ValidationIssue::MissingUserId))
    }

    pub fn set_user_id(&mut self, id: String) -> Result<()> {
        self.user_id = Some(id);
        self.save()
    }

    pub fn set_api_base_url(&mut self, url: String) -> Result<()> {
        self.api_base_url = url;
        self.save()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.max(1))
    }

    pub fn retries(&self) -> u32 {
        self.max_retries.min(1)
    }

    pub fn snapshot_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.snapshot_dir {
            return Ok(dir.clone());
        }
        let base = dirs::data_local_dir()
            .ok_or_else(|| MoodPostError::Config("データディレクトリが見つかりません".into()))?;
        Ok(base.join("moodpost"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.recommendation_window, 5);
        assert_eq!(config.max_retries, 1);
        assert!(config.user_id.is_none());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"user_id": "7"}"#).unwrap();
        assert_eq!(config.user_id.as_deref(), Some("7"));
        assert_eq!(config.timeout_seconds, 20);
        assert_eq!(config.api_base_url, "http://127.0.0.1:8000/api");
    }

    #[test]
    fn test_retries_clamped_to_one() {
        let config = Config {
            max_retries: 5,
            ..Default::default()
        };
        assert_eq!(config.retries(), 1);
    }

    #[test]
    fn test_explicit_snapshot_dir() {
        let config = Config {
            snapshot_dir: Some(PathBuf::from("/tmp/moodpost-state")),
            ..Default::default()
        };
        assert_eq!(config.snapshot_dir().unwrap(), PathBuf::from("/tmp/moodpost-state"));
    }
}
