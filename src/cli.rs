use crate::ai_provider::AiProvider;
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mistake-review")]
#[command(about = "誤答写真のAI解析・間隔反復復習ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// AIプロバイダ (claude/codex/gemini)。省略時は設定ファイルの値
    #[arg(long, global = true)]
    pub ai_provider: Option<AiProvider>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 誤答写真（1枚またはフォルダ）を解析してJSONを出力
    Analyze {
        /// 画像ファイルまたはフォルダのパス
        #[arg(required = true)]
        path: PathBuf,

        /// 出力JSONファイル（省略時は標準出力）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 解析結果を誤答として保存し、復習アイテムを作成
        #[arg(long)]
        save: bool,

        /// キャッシュを使用（再解析をスキップ）
        #[arg(long)]
        use_cache: bool,

        /// サブフォルダも再帰的にスキャン
        #[arg(short = 'r', long)]
        recursive: bool,

        /// 劣化結果のとき一度だけ再解析
        #[arg(long)]
        retry_degraded: bool,
    },

    /// モデルの応答テキストを解釈してJSONを出力
    Interpret {
        /// 応答テキストファイル（省略時は標準入力）
        input: Option<PathBuf>,
    },

    /// 復習
    #[command(subcommand)]
    Review(ReviewCommands),

    /// 保存済みの誤答
    #[command(subcommand)]
    Mistakes(MistakeCommands),

    /// 設定を表示/編集
    Config {
        /// 学習者IDを設定
        #[arg(long)]
        set_owner: Option<String>,

        /// AIプロバイダを設定
        #[arg(long)]
        set_provider: Option<AiProvider>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },

    /// キャッシュ管理
    Cache {
        /// キャッシュを削除
        #[arg(long)]
        clear: bool,

        /// 対象フォルダ（省略時はカレント）
        #[arg(short, long)]
        folder: Option<PathBuf>,

        /// キャッシュ情報を表示
        #[arg(long)]
        info: bool,
    },
}

#[derive(Subcommand)]
pub enum ReviewCommands {
    /// 期限の来た復習アイテムを表示
    Due {
        /// 基準日時（RFC3339 または YYYY-MM-DD）
        #[arg(long, value_parser = parse_as_of)]
        as_of: Option<DateTime<Utc>>,

        /// 表示件数の上限（省略時は今日の上限）
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// 復習結果を記録
    Submit {
        /// 復習アイテムID
        item: String,

        /// 評価 (0-5)
        #[arg(allow_negative_numbers = true)]
        rating: i32,

        /// 所要時間（秒）
        #[arg(short, long, default_value = "0")]
        elapsed: u64,

        /// メモ
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// 復習アイテムを引退させる
    Retire {
        /// 復習アイテムID
        item: String,
    },

    /// 対話式で今日の復習を行う
    Session,

    /// 復習履歴を表示
    History {
        /// 表示件数
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// 統計を表示
    Stats,
}

#[derive(Subcommand)]
pub enum MistakeCommands {
    /// 誤答一覧
    List,

    /// 誤答を削除（復習アイテムと履歴も削除）
    Delete {
        /// 誤答ID
        id: String,
    },
}

/// `--as-of` の解釈（日付のみの場合はその日の終わり）
pub fn parse_as_of(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(23, 59, 59))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| format!("日時を解釈できません: {} (RFC3339 または YYYY-MM-DD)", s))
}
