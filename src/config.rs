use crate::ai_provider::AiProvider;
use crate::analyzer::RetryPolicy;
use crate::error::{MistakeReviewError, Result};
use mistake_review_common::planning::DEFAULT_DAILY_LIMIT;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// ストアのパスを上書きする環境変数
pub const STORE_ENV: &str = "MISTAKE_REVIEW_STORE";

/// 学習者IDを上書きする環境変数
pub const OWNER_ENV: &str = "MISTAKE_REVIEW_OWNER";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ai_provider: AiProvider,
    pub model: Option<String>,
    pub timeout_seconds: u64,
    pub retry: RetryConfig,
    pub store_path: Option<PathBuf>,
    pub owner_id: String,
    pub daily_limit_base: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.base_delay_ms))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ai_provider: AiProvider::Claude,
            model: None,
            timeout_seconds: 120,
            retry: RetryConfig::default(),
            store_path: None,
            owner_id: "default".into(),
            daily_limit_base: DEFAULT_DAILY_LIMIT,
        }
    }
}

impl Config {
    /// 設定ファイルに環境変数の上書きを適用した、実行時の設定
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file()?;
        config.apply_env();
        Ok(config)
    }

    /// 設定ファイルの内容のみ（環境変数は適用しない）
    pub fn load_file() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Ok(serde_json::from_str(&content)?)
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
        Ok(Self::config_dir()?.join("config.json"))
    }

    fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| MistakeReviewError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("mistake-review"))
    }

    /// 復習ストアのパス（未設定なら設定ディレクトリ直下）
    pub fn store_path(&self) -> Result<PathBuf> {
        match &self.store_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::config_dir()?.join("store.json")),
        }
    }

    fn apply_env(&mut self) {
        if let Ok(path) = std::env::var(STORE_ENV) {
            if !path.trim().is_empty() {
                self.store_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(owner) = std::env::var(OWNER_ENV) {
            if !owner.trim().is_empty() {
                self.owner_id = owner.trim().to_string();
            }
        }
    }

    /// 学習者IDを設定ファイルに保存
    ///
    /// 保存するのはファイルの内容だけで、この実行の上書きは書き込まない。
    pub fn set_owner(&mut self, owner: String) -> Result<()> {
        let owner = owner.trim();
        if owner.is_empty() {
            return Err(MistakeReviewError::Config("学習者IDが空です".into()));
        }
        let mut stored = Self::load_file()?;
        stored.owner_id = owner.to_string();
        stored.save()?;
        self.owner_id = stored.owner_id;
        Ok(())
    }

    /// AIプロバイダを設定ファイルに保存
    pub fn set_provider(&mut self, provider: AiProvider) -> Result<()> {
        let mut stored = Self::load_file()?;
        stored.ai_provider = provider;
        stored.save()?;
        self.ai_provider = provider;
        Ok(())
    }
}
