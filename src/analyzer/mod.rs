//! 誤答写真の解析パイプライン
//!
//! 画像バイト列 → (リトライ付き) AI呼び出し → interpret → AnalysisResult

pub mod cache;
mod cli_analyzer;
mod retry;

pub use cache::CacheFile;
pub use cli_analyzer::CliAnalyzer;
pub use mistake_review_common::AnalysisResult;
pub use retry::RetryPolicy;

use crate::error::Result;
use crate::scanner::ImageInfo;
use indicatif::{ProgressBar, ProgressStyle};
use mistake_review_common::interpret;

/// 外部の視覚言語モデル呼び出し
///
/// 画像1枚を受け取り、モデルの応答テキストをそのまま返す。
#[allow(async_fn_in_trait)]
pub trait ImageAnalyzer {
    async fn analyze_image(&self, file_name: &str, bytes: &[u8]) -> Result<String>;
}

/// 解析オプション
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyzeOptions {
    /// 劣化結果のとき、もう一度だけ解析し直す
    pub retry_degraded: bool,
}

/// 画像1枚を解析
///
/// 上流呼び出しの失敗は `policy` に従って再試行し、
/// 尽きた場合はエラーを返す。応答の解釈は失敗しない。
pub async fn analyze_mistake<A: ImageAnalyzer>(
    analyzer: &A,
    policy: &RetryPolicy,
    file_name: &str,
    bytes: &[u8],
    options: AnalyzeOptions,
) -> Result<AnalysisResult> {
    let response = policy.run(move || analyzer.analyze_image(file_name, bytes)).await?;
    let result = interpret(&response);

    if result.degraded && options.retry_degraded {
        log::warn!("{}: 応答を解釈できませんでした。再解析します", file_name);
        let response = policy.run(move || analyzer.analyze_image(file_name, bytes)).await?;
        return Ok(interpret(&response));
    }

    if result.degraded {
        log::warn!("{}: 応答を解釈できませんでした（劣化結果）", file_name);
    }
    Ok(result)
}

/// 複数画像を順に解析
///
/// `cache` を渡すとハッシュ一致の画像は再解析しない。
/// 1枚の呼び出しが失敗しても残りは続行し、その画像は劣化結果になる。
pub async fn analyze_images<A: ImageAnalyzer>(
    analyzer: &A,
    policy: &RetryPolicy,
    images: &[ImageInfo],
    mut cache: Option<&mut CacheFile>,
    options: AnalyzeOptions,
) -> Result<Vec<(ImageInfo, AnalysisResult)>> {
    let progress = ProgressBar::new(images.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:30} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut results = Vec::with_capacity(images.len());

    for image in images {
        progress.set_message(image.file_name.clone());
        let bytes = std::fs::read(&image.path)?;
        let hash = cache::hash_bytes(&bytes);

        if let Some(cached) = cache.as_deref().and_then(|c| c.get(&hash)) {
            log::debug!("キャッシュヒット: {}", image.file_name);
            results.push((image.clone(), cached.clone()));
            progress.inc(1);
            continue;
        }

        let result = match analyze_mistake(analyzer, policy, &image.file_name, &bytes, options).await {
            Ok(result) => result,
            Err(e) => {
                log::warn!("{}: AI解析に失敗しました: {}", image.file_name, e);
                AnalysisResult::degraded(format!("AI解析に失敗しました: {}", e))
            }
        };

        if let Some(cache) = cache.as_deref_mut() {
            cache.insert(hash, image.file_name.clone(), bytes.len() as u64, result.clone());
        }

        results.push((image.clone(), result));
        progress.inc(1);
    }

    progress.finish_and_clear();
    Ok(results)
}
