//! AI CLI連携モジュール
//!
//! 画像を一時フォルダに書き出し、claude / codex / gemini CLI に
//! 解析プロンプトを渡して応答テキストを受け取る。

use super::ImageAnalyzer;
use crate::ai_provider::AiProvider;
use crate::error::{MistakeReviewError, Result};
use mistake_review_common::build_analysis_prompt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

/// CLI経由でAI解析を行う
#[derive(Debug, Clone)]
pub struct CliAnalyzer {
    provider: AiProvider,
    model: Option<String>,
    timeout: Duration,
    temp_dir: PathBuf,
}

impl CliAnalyzer {
    pub fn new(provider: AiProvider, model: Option<String>, timeout: Duration) -> Result<Self> {
        let temp_dir = std::env::current_dir()?.join("temp-images");
        Ok(Self::with_temp_dir(provider, model, timeout, temp_dir))
    }

    pub fn with_temp_dir(
        provider: AiProvider,
        model: Option<String>,
        timeout: Duration,
        temp_dir: PathBuf,
    ) -> Self {
        Self {
            provider,
            model,
            timeout,
            temp_dir,
        }
    }

    /// 画像を一時フォルダに書き出して絶対パスを返す
    fn write_temp_image(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.temp_dir)?;
        // パス区切りを含む名前でも一時フォルダの外に出ないようにする
        let safe_name = Path::new(file_name)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "image".to_string());
        let dest = self.temp_dir.join(safe_name);
        std::fs::write(&dest, bytes)?;
        Ok(std::fs::canonicalize(&dest)?)
    }

    fn build_prompt(&self, image_path: &Path, file_name: &str) -> String {
        let image = image_path.display().to_string().replace('\\', "/");
        format!(
            "Read the following image file and analyze it: {}\n\n{}",
            image,
            build_analysis_prompt(file_name, None)
        )
    }

    async fn run_cli(&self, prompt: &str) -> Result<String> {
        let args = self.provider.prompt_args(prompt, self.model.as_deref());

        // Windowsではcmd /c経由（改行・引用符はcmdで壊れるため平坦化）
        #[cfg(windows)]
        let mut command = {
            let mut c = Command::new("cmd");
            c.arg("/c").arg(self.provider.command_name());
            c.args(args.iter().map(|a| a.replace('\n', " ").replace('"', "\\\"")));
            c
        };

        #[cfg(not(windows))]
        let mut command = {
            let mut c = Command::new(self.provider.command_name());
            c.args(&args);
            c
        };

        command.kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| {
                MistakeReviewError::ApiCall(format!(
                    "{} CLIが{}秒以内に応答しませんでした",
                    self.provider,
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| MistakeReviewError::ApiCall(format!("{} CLI実行エラー: {}", self.provider, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MistakeReviewError::ApiCall(format!(
                "{} CLI failed (code {:?}): {}",
                self.provider,
                output.status.code(),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl ImageAnalyzer for CliAnalyzer {
    async fn analyze_image(&self, file_name: &str, bytes: &[u8]) -> Result<String> {
        let image_path = self.write_temp_image(file_name, bytes)?;
        let prompt = self.build_prompt(&image_path, file_name);
        log::debug!("[{}] プロンプト長: {} chars", self.provider, prompt.len());

        let response = self.run_cli(&prompt).await;

        if let Err(e) = std::fs::remove_file(&image_path) {
            log::debug!("一時画像の削除に失敗 {}: {}", image_path.display(), e);
        }

        let response = response?;
        let preview: String = response.chars().take(500).collect();
        log::debug!("[{}] レスポンス長: {} chars: {}", self.provider, response.len(), preview);
        Ok(response)
    }
}
