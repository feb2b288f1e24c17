//! 復習計画と履歴集計
//!
//! - ReviewRecord: 1回の復習の記録（評価・所要時間）
//! - daily_limit / daily_plan: 連続学習日数に応じた1日の復習上限
//! - streak_days: 連続学習日数
//! - ReviewStats: 統計情報

use crate::scheduler::{due_items, ReviewItem, PASSING_RATING};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// 1日の復習上限（基本値）
pub const DEFAULT_DAILY_LIMIT: usize = 20;

/// 1回の復習の記録
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub id: Uuid,
    pub item_id: Uuid,
    pub rating: i32,
    pub elapsed_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// 反映後の間隔（日）
    pub interval_days: u32,
    /// 反映後の容易度
    pub ease_factor: f64,
    pub reviewed_at: DateTime<Utc>,
}

impl ReviewRecord {
    /// 反映後のアイテムから記録を作る
    pub fn new(
        updated: &ReviewItem,
        rating: i32,
        elapsed_seconds: u64,
        notes: Option<String>,
        reviewed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            item_id: updated.item_id,
            rating,
            elapsed_seconds,
            notes,
            interval_days: updated.interval_days,
            ease_factor: updated.ease_factor,
            reviewed_at,
        }
    }
}

/// 連続学習日数に応じた1日の上限
///
/// 7日以上で 35、30日以上で 50。`base` が既定値より大きければそちらを優先する。
pub fn daily_limit(base: usize, streak_days: u32) -> usize {
    let bonus = match streak_days {
        30.. => 50,
        7..=29 => 35,
        _ => DEFAULT_DAILY_LIMIT,
    };
    base.max(bonus)
}

/// 今日の復習計画（期限切れを古い順に上限まで）
pub fn daily_plan<'a>(
    items: &'a [ReviewItem],
    owner_id: &str,
    as_of: DateTime<Utc>,
    base_limit: usize,
    streak_days: u32,
) -> Vec<&'a ReviewItem> {
    let mut due = due_items(items, owner_id, as_of);
    due.truncate(daily_limit(base_limit, streak_days));
    due
}

/// 連続学習日数
///
/// 今日または昨日で終わる、復習記録のある連続した日（UTC）の数。
pub fn streak_days<'a, I>(history: I, today: NaiveDate) -> u32
where
    I: IntoIterator<Item = &'a ReviewRecord>,
{
    let days: BTreeSet<NaiveDate> = history
        .into_iter()
        .map(|r| r.reviewed_at.date_naive())
        .collect();

    let mut cursor = if days.contains(&today) {
        today
    } else {
        today - Duration::days(1)
    };

    let mut streak = 0;
    while days.contains(&cursor) {
        streak += 1;
        cursor -= Duration::days(1);
    }
    streak
}

/// 復習統計
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewStats {
    pub total_items: usize,
    pub active_items: usize,
    pub retired_items: usize,
    pub due_items: usize,
    pub reviews_today: usize,
    pub total_reviews: usize,
    pub average_rating: f64,
    /// 評価3以上の割合
    pub success_rate: f64,
    pub streak_days: u32,
}

impl ReviewStats {
    pub fn collect(
        items: &[ReviewItem],
        history: &[ReviewRecord],
        owner_id: &str,
        now: DateTime<Utc>,
    ) -> Self {
        let owned: Vec<&ReviewItem> = items.iter().filter(|i| i.owner_id == owner_id).collect();
        let owned_ids: BTreeSet<Uuid> = owned.iter().map(|i| i.item_id).collect();
        let records: Vec<&ReviewRecord> = history
            .iter()
            .filter(|r| owned_ids.contains(&r.item_id))
            .collect();

        let today = now.date_naive();
        let total_reviews = records.len();
        let (average_rating, success_rate) = if total_reviews == 0 {
            (0.0, 0.0)
        } else {
            let sum: i64 = records.iter().map(|r| i64::from(r.rating)).sum();
            let passed = records.iter().filter(|r| r.rating >= PASSING_RATING).count();
            (
                sum as f64 / total_reviews as f64,
                passed as f64 / total_reviews as f64,
            )
        };

        Self {
            total_items: owned.len(),
            active_items: owned.iter().filter(|i| !i.is_completed).count(),
            retired_items: owned.iter().filter(|i| i.is_completed).count(),
            due_items: owned.iter().filter(|i| i.is_due(now)).count(),
            reviews_today: records
                .iter()
                .filter(|r| r.reviewed_at.date_naive() == today)
                .count(),
            total_reviews,
            average_rating,
            success_rate,
            streak_days: streak_days(records.iter().copied(), today),
        }
    }
}
