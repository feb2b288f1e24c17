//! 対話式復習セッション
//!
//! 今日の復習計画を1件ずつ表示し、評価（0-5）を入力させる。

use crate::error::{MistakeReviewError, Result};
use crate::store::{Mistake, ReviewStore};
use chrono::Utc;
use dialoguer::Input;
use mistake_review_common::scheduler::{format_interval, preview_intervals, ReviewItem};
use mistake_review_common::PerformanceRating;
use std::time::Instant;
use uuid::Uuid;

/// 対話アクション
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// 評価を入力
    Rate(i32),
    /// この問題をスキップ
    Skip,
    /// この問題を引退させる
    Retire,
    /// 終了
    Quit,
}

/// 入力文字列をアクションに変換（不正な入力は None）
pub fn parse_action(input: &str) -> Option<SessionAction> {
    match input.trim() {
        "s" | "S" | "" => Some(SessionAction::Skip),
        "x" | "X" => Some(SessionAction::Retire),
        "q" | "Q" => Some(SessionAction::Quit),
        other => other
            .parse::<i32>()
            .ok()
            .filter(|r| (0..=5).contains(r))
            .map(SessionAction::Rate),
    }
}

/// セッション結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub reviewed: usize,
    pub passed: usize,
    pub skipped: usize,
    pub retired: usize,
}

/// 対話式で復習
pub fn run_interactive_session(
    store: &mut ReviewStore,
    owner_id: &str,
    base_limit: usize,
) -> Result<SessionSummary> {
    let now = Utc::now();
    let plan: Vec<ReviewItem> = store
        .daily_plan(owner_id, now, base_limit)
        .into_iter()
        .cloned()
        .collect();

    let mut summary = SessionSummary::default();

    if plan.is_empty() {
        println!("✓ 今日の復習はありません");
        return Ok(summary);
    }

    println!("📚 今日の復習: {}問", plan.len());
    println!("---");
    println!("評価: [0-5] (3以上で正解)  [s]スキップ [x]引退 [q]終了");
    println!("---\n");

    for (count, item) in plan.iter().enumerate() {
        let mistake = store.mistake_for_item(item.item_id).cloned();
        println!("[{}/{}] 復習アイテム {}", count + 1, plan.len(), item.item_id);
        print_question(mistake.as_ref());

        let started = Instant::now();
        wait_for_enter("Enterで答えを表示")?;
        print_answer(mistake.as_ref());

        let preview = preview_intervals(item);
        println!(
            "  次回: 0-2→{} 3→{} 4→{} 5→{}",
            format_interval(preview[0]),
            format_interval(preview[3]),
            format_interval(preview[4]),
            format_interval(preview[5])
        );

        let action = prompt_action()?;
        let elapsed_seconds = started.elapsed().as_secs();

        match action {
            SessionAction::Rate(rating) => {
                let performance = PerformanceRating::new(rating, elapsed_seconds);
                let updated = store.submit_review(owner_id, item.item_id, performance, None, Utc::now())?;
                store.save()?;
                summary.reviewed += 1;
                if performance.is_passing() {
                    summary.passed += 1;
                }
                println!("  → 次回は{}後\n", format_interval(updated.interval_days));
            }
            SessionAction::Skip => {
                summary.skipped += 1;
                println!("  → スキップ\n");
            }
            SessionAction::Retire => {
                store.retire(owner_id, item.item_id)?;
                store.save()?;
                summary.retired += 1;
                println!("  → 引退しました\n");
            }
            SessionAction::Quit => {
                println!("終了します...");
                break;
            }
        }
    }

    println!(
        "\n✓ 復習{}問（正解{}問）、スキップ{}問、引退{}問",
        summary.reviewed, summary.passed, summary.skipped, summary.retired
    );
    Ok(summary)
}

fn print_question(mistake: Option<&Mistake>) {
    match mistake {
        Some(m) if !m.analysis.questions_found.is_empty() => {
            for (i, q) in m.analysis.questions_found.iter().enumerate() {
                println!("  Q{}: {}", i + 1, q);
            }
        }
        Some(m) => {
            if let Some(path) = &m.image_path {
                println!("  画像: {}", path.display());
            } else {
                println!("  （問題文なし）");
            }
        }
        None => println!("  （誤答データなし）"),
    }
}

fn print_answer(mistake: Option<&Mistake>) {
    let Some(m) = mistake else { return };
    for (i, a) in m.analysis.correct_answers.iter().enumerate() {
        println!("  A{}: {}", i + 1, a);
    }
    if !m.analysis.root_cause.is_empty() {
        println!("  原因: {}", m.analysis.root_cause);
    }
    for insight in &m.analysis.insights {
        println!("  ・{}", insight);
    }
    if m.analysis.has_recommendations() {
        println!("  類題:");
        for q in &m.analysis.similar_questions {
            println!("    - {}", q);
        }
    }
}

fn wait_for_enter(prompt: &str) -> Result<()> {
    Input::<String>::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()
        .map_err(|e| MistakeReviewError::CliExecution(e.to_string()))?;
    Ok(())
}

fn prompt_action() -> Result<SessionAction> {
    loop {
        let input: String = Input::new()
            .with_prompt("評価 (0-5, s:スキップ x:引退 q:終了)")
            .allow_empty(true)
            .interact_text()
            .map_err(|e| MistakeReviewError::CliExecution(e.to_string()))?;

        match parse_action(&input) {
            Some(action) => return Ok(action),
            None => println!("  ⚠ 0-5 または s/x/q を入力してください"),
        }
    }
}

/// 引数で渡されたIDを解釈
pub fn parse_item_id(input: &str) -> Result<Uuid> {
    Uuid::parse_str(input.trim())
        .map_err(|e| MistakeReviewError::CliExecution(format!("不正なID {}: {}", input, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_action() {
        assert_eq!(parse_action("0"), Some(SessionAction::Rate(0)));
        assert_eq!(parse_action(" 5 "), Some(SessionAction::Rate(5)));
        assert_eq!(parse_action(""), Some(SessionAction::Skip));
        assert_eq!(parse_action("s"), Some(SessionAction::Skip));
        assert_eq!(parse_action("x"), Some(SessionAction::Retire));
        assert_eq!(parse_action("Q"), Some(SessionAction::Quit));
        assert_eq!(parse_action("6"), None);
        assert_eq!(parse_action("-1"), None);
        assert_eq!(parse_action("abc"), None);
    }

    #[test]
    fn test_parse_item_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_item_id(&format!(" {} ", id)).unwrap(), id);
        assert!(matches!(parse_item_id("not-a-uuid"), Err(MistakeReviewError::CliExecution(_))));
    }
}
