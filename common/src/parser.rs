//! AI応答インタープリタ
//!
//! 視覚言語モデルの応答テキストからJSONオブジェクトを抽出し、
//! フィールドごとに検証・補正して AnalysisResult を生成する。
//! どんな入力に対しても失敗せず、解釈できない場合は劣化結果を返す。

use crate::error::{Error, Result};
use crate::types::{AnalysisResult, ErrorType};
use serde_json::{Map, Value};

/// confidence が数値に変換できない場合の既定値
///
/// JSON自体はパースできているので 0.0 ではなく中程度の値を使う。
pub const DEFAULT_CONFIDENCE: f64 = 0.7;

/// 応答が空だった場合の診断メッセージ
pub const EMPTY_RESPONSE_DIAGNOSTIC: &str = "AIの応答が空でした。再解析してください";

/// JSONを抽出できなかった場合の診断メッセージ
pub const UNPARSEABLE_RESPONSE_DIAGNOSTIC: &str =
    "AIの応答を解析できませんでした。再解析してください";

/// 応答テキストからJSONオブジェクトを抽出
///
/// 抽出優先順位（最初に成功したものを採用）:
/// 1. 全体が `{ ... }` ならそのままパース
/// 2. ```json ... ``` ブロック
/// 3. 最初の `{` から対応する `}` まで（文字列リテラル内の括弧は無視）
///
/// # Arguments
/// * `response` - AI応答文字列
///
/// # Returns
/// * `Ok(Map)` - 抽出されたJSONオブジェクト
/// * `Err` - どの方法でもオブジェクトが得られない場合
///
/// # Examples
/// ```
/// use mistake_review_common::extract_json;
///
/// let object = extract_json("結果: {\"confidence\": 0.9} 以上").unwrap();
/// assert_eq!(object["confidence"], 0.9);
/// ```
pub fn extract_json(response: &str) -> Result<Map<String, Value>> {
    let trimmed = response.trim();
    if trimmed.is_empty() {
        return Err(Error::Parse("応答が空です".into()));
    }

    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        if let Some(object) = parse_object(trimmed) {
            return Ok(object);
        }
    }

    if let Some(block) = find_fenced_json(response) {
        if let Some(object) = parse_object(block) {
            return Ok(object);
        }
    }

    if let Some(span) = find_balanced_object(response) {
        if let Some(object) = parse_object(span) {
            return Ok(object);
        }
    }

    Err(Error::Parse("JSONオブジェクトが見つかりません".into()))
}

/// AI応答を AnalysisResult に解釈
///
/// 全域関数: 空文字列を含むすべての入力に対して完全な結果を返す。
/// 抽出に失敗した場合は `degraded = true` の結果になる。
pub fn interpret(response: &str) -> AnalysisResult {
    if response.trim().is_empty() {
        return AnalysisResult::degraded(EMPTY_RESPONSE_DIAGNOSTIC);
    }

    match extract_json(response) {
        Ok(object) => normalize(&object),
        Err(_) => AnalysisResult::degraded(UNPARSEABLE_RESPONSE_DIAGNOSTIC),
    }
}

/// パース済みオブジェクトの各フィールドを個別に補正
///
/// 1フィールドが不正でも他のフィールドには影響しない。
pub fn normalize(object: &Map<String, Value>) -> AnalysisResult {
    AnalysisResult {
        questions_found: string_list(object.get("questions_found")),
        correct_answers: string_list(object.get("correct_answers")),
        error_type: error_type(object.get("error_type")),
        confidence: confidence(object.get("confidence")),
        root_cause: object
            .get("root_cause")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        insights: string_list(object.get("insights")),
        similar_questions: string_list(object.get("similar_questions")),
        degraded: false,
    }
}

fn error_type(value: Option<&Value>) -> ErrorType {
    value
        .and_then(Value::as_str)
        .map(ErrorType::from_model_value)
        .unwrap_or(ErrorType::Other)
}

fn confidence(value: Option<&Value>) -> f64 {
    let raw = match value {
        // f64 に収まらない指数（1e400 など）は無限大として扱いクランプする
        Some(Value::Number(n)) => n.as_f64().or_else(|| n.to_string().parse::<f64>().ok()),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match raw {
        Some(c) if !c.is_nan() => c.clamp(0.0, 1.0),
        _ => DEFAULT_CONFIDENCE,
    }
}

/// 文字列配列を取り出す（文字列以外の要素は捨てる）
fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

/// ```json ... ``` ブロックの中身を探す
///
/// 閉じフェンスがない（途中で切れた）場合は末尾までを返す。
fn find_fenced_json(response: &str) -> Option<&str> {
    const MARKER: &str = "```json";

    // to_ascii_lowercase はバイト長を変えないので位置をそのまま使える
    let lowered = response.to_ascii_lowercase();
    let start = lowered.find(MARKER)? + MARKER.len();
    let body = &response[start..];
    let end = body.find("```").unwrap_or(body.len());
    Some(body[..end].trim())
}

/// 最初の `{` と対応する `}` までのスライスを返す
fn find_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + ch.len_utf8();
                    return Some(&text[start..end]);
                }
            }
            _ => {}
        }
    }

    None
}
