//! エラー型定義

use thiserror::Error;
use uuid::Uuid;

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    /// 評価値が 0..=5 の範囲外
    #[error("Invalid rating: {0} (expected 0-5)")]
    InvalidRating(i32),

    /// 引退済みの復習アイテムを更新しようとした
    #[error("Review item already completed: {0}")]
    CompletedItem(Uuid),
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
