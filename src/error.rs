use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum MistakeReviewError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("フォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error("画像が見つかりません: {0}")]
    NoImagesFound(String),

    #[error("API呼び出しエラー: {0}")]
    ApiCall(String),

    #[error("API呼び出しが{attempts}回失敗しました: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("復習ストアエラー: {0}")]
    Store(String),

    #[error("復習アイテムが見つかりません: {0}")]
    ItemNotFound(Uuid),

    #[error("誤答が見つかりません: {0}")]
    MistakeNotFound(Uuid),

    #[error("CLI実行エラー: {0}")]
    CliExecution(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] mistake_review_common::Error),
}

pub type Result<T> = std::result::Result<T, MistakeReviewError>;
