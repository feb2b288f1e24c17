//! Mistake Review Common Library
//!
//! CLIと復習ストアで共有される型とコアロジック:
//! - parser: AI応答の解釈（失敗しない、劣化結果で通知）
//! - scheduler: SM-2による復習スケジュール
//! - planning: 復習計画・履歴集計

pub mod types;
pub mod error;
pub mod parser;
pub mod scheduler;
pub mod planning;
pub mod prompts;

pub use types::{AnalysisResult, ErrorType};
pub use error::{Error, Result};
pub use parser::{extract_json, interpret};
pub use scheduler::{PerformanceRating, ReviewItem};
pub use planning::{ReviewRecord, ReviewStats};
pub use prompts::build_analysis_prompt;
