//! プロンプト生成モジュール
//!
//! 誤答写真の解析をAIに依頼するプロンプトを組み立てる。

use crate::types::ErrorType;

/// 解析プロンプト生成
///
/// # Arguments
/// * `file_name` - 画像ファイル名
/// * `ocr_text` - 事前にOCRで抽出したテキスト（あれば）
pub fn build_analysis_prompt(file_name: &str, ocr_text: Option<&str>) -> String {
    let error_types = ErrorType::ACCEPTED
        .iter()
        .map(ErrorType::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    let ocr_section = match ocr_text.map(str::trim).filter(|t| !t.is_empty()) {
        Some(text) => format!("\n## OCRで抽出済みのテキスト\n{}\n", text),
        None => String::new(),
    };

    format!(
        r#"あなたは学習者の誤答を分析する家庭教師です。画像 {file_name} に写っている問題と学習者の解答を読み取り、誤りを分析してください。
{ocr_section}
## 誤りの分類
以下から最も適切なものを1つ選択：
{error_types}

## 出力形式（厳密にこのJSONオブジェクト形式で出力）
{{
  "questions_found": ["画像から読み取った問題文"],
  "correct_answers": ["各問題の正答（questions_foundと同じ順）"],
  "error_type": "分類から選択",
  "confidence": 0.0〜1.0の数値,
  "root_cause": "誤りの根本原因",
  "insights": ["具体的な改善アドバイス"],
  "similar_questions": ["練習用の類題"]
}}

JSONオブジェクトのみ出力。説明文は不要。"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_analysis_prompt() {
        let prompt = build_analysis_prompt("mistake_01.jpg", None);
        assert!(prompt.contains("mistake_01.jpg"));
        assert!(prompt.contains("calculation, conceptual, misreading, other"));
        assert!(prompt.contains("\"similar_questions\""));
        assert!(!prompt.contains("OCR"));
        assert!(!prompt.contains("unknown"));
    }

    #[test]
    fn test_build_analysis_prompt_with_ocr() {
        let prompt = build_analysis_prompt("q.png", Some("  2x + 3 = 7  "));
        assert!(prompt.contains("OCRで抽出済みのテキスト"));
        assert!(prompt.contains("2x + 3 = 7"));

        let blank = build_analysis_prompt("q.png", Some("   "));
        assert!(!blank.contains("OCR"));
    }
}
