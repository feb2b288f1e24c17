//! 解析結果の型定義
//!
//! CLIと復習ストアで共有される型:
//! - ErrorType: 誤りの分類（閉じた集合）
//! - AnalysisResult: 解釈済みのAI解析結果

use serde::{Deserialize, Serialize};
use std::fmt;

/// 誤りの分類
///
/// `Unknown` は解釈の全面失敗（劣化結果）専用で、
/// 正常にパースされた応答からは生成されない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorType {
    Calculation,
    Conceptual,
    Misreading,
    Other,
    #[default]
    Unknown,
}

impl ErrorType {
    /// モデルが返す値として受け付ける分類
    pub const ACCEPTED: &'static [ErrorType] = &[
        ErrorType::Calculation,
        ErrorType::Conceptual,
        ErrorType::Misreading,
        ErrorType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Calculation => "calculation",
            ErrorType::Conceptual => "conceptual",
            ErrorType::Misreading => "misreading",
            ErrorType::Other => "other",
            ErrorType::Unknown => "unknown",
        }
    }

    /// モデル出力の文字列を分類に変換
    ///
    /// 大文字小文字・前後の空白は無視する。受け付けない値
    /// （`unknown` を含む）はすべて `Other` になる。
    pub fn from_model_value(value: &str) -> Self {
        let value = value.trim();
        Self::ACCEPTED
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(value))
            .unwrap_or(ErrorType::Other)
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// AI解析結果
///
/// すべてのフィールドは常に型どおりの値を持つ（欠損・nullなし）。
/// `degraded` が true の場合、応答をパースできずに合成したフォールバック。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisResult {
    /// 画像から読み取った問題文
    pub questions_found: Vec<String>,

    /// 正答（questions_found と位置対応、長さは強制しない）
    pub correct_answers: Vec<String>,

    pub error_type: ErrorType,

    /// 0.0..=1.0
    pub confidence: f64,

    /// 誤りの原因
    pub root_cause: String,

    /// 学習アドバイス
    pub insights: Vec<String>,

    /// 類題
    pub similar_questions: Vec<String>,

    pub degraded: bool,
}

impl AnalysisResult {
    /// 解釈失敗時のフォールバック結果を生成
    pub fn degraded(diagnostic: impl Into<String>) -> Self {
        Self {
            error_type: ErrorType::Unknown,
            confidence: 0.0,
            insights: vec![diagnostic.into()],
            degraded: true,
            ..Default::default()
        }
    }

    /// 推奨練習（類題）を表示してよいか
    pub fn has_recommendations(&self) -> bool {
        !self.degraded && !self.similar_questions.is_empty()
    }
}
