//! 復習スケジューラ（SM-2）
//!
//! 保存された誤答ごとに1つの ReviewItem を持ち、
//! 学習者の評価（0-5）に応じて次回の復習日を決める。
//!
//! 評価（0-5）:
//! - 0: まったく思い出せない
//! - 1: 不正解だが、答えを見て思い出した
//! - 2: 不正解だが、答えを見ると簡単だった
//! - 3: 正解（かなり苦労した）
//! - 4: 正解（少し迷った）
//! - 5: 正解（即答）
//!
//! どの関数も入力を変更せず、新しい値を返す。

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 容易度の下限
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// 新規アイテムの容易度
pub const INITIAL_EASE_FACTOR: f64 = 2.5;

/// この値以上の評価を「想起成功」とみなす
pub const PASSING_RATING: i32 = 3;

pub const MAX_RATING: i32 = 5;

/// 誤答1件に対応する復習アイテム
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewItem {
    pub item_id: Uuid,
    pub owner_id: String,
    /// 次回の復習予定日時
    pub scheduled_date: DateTime<Utc>,
    /// 現在の間隔（日、1以上）
    pub interval_days: u32,
    pub ease_factor: f64,
    /// 連続成功回数（失敗で0に戻る）
    pub repetitions: u32,
    /// 明示的に引退させた場合のみ true
    pub is_completed: bool,
}

impl ReviewItem {
    /// 指定時刻の時点で復習期限が来ているか
    pub fn is_due(&self, as_of: DateTime<Utc>) -> bool {
        !self.is_completed && self.scheduled_date <= as_of
    }
}

/// 1回の復習セッションの評価
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceRating {
    /// 0..=5
    pub rating: i32,
    /// 所要時間（記録用。スケジュール計算には使わない）
    pub elapsed_seconds: u64,
}

impl PerformanceRating {
    pub fn new(rating: i32, elapsed_seconds: u64) -> Self {
        Self { rating, elapsed_seconds }
    }

    pub fn is_passing(&self) -> bool {
        self.rating >= PASSING_RATING
    }
}

/// 評価値の範囲チェック
pub fn validate_rating(rating: i32) -> Result<()> {
    if (0..=MAX_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(Error::InvalidRating(rating))
    }
}

/// 新しい復習アイテムを作成（初回は翌日）
pub fn create(owner_id: &str) -> ReviewItem {
    create_at(owner_id, Utc::now())
}

/// `create` の時刻指定版
pub fn create_at(owner_id: &str, now: DateTime<Utc>) -> ReviewItem {
    ReviewItem {
        item_id: Uuid::new_v4(),
        owner_id: owner_id.to_string(),
        scheduled_date: days_after(now, 1),
        interval_days: 1,
        ease_factor: INITIAL_EASE_FACTOR,
        repetitions: 0,
        is_completed: false,
    }
}

/// 評価を反映して次回の復習を計算
///
/// # Errors
/// * `Error::InvalidRating` - 評価が 0..=5 の範囲外
/// * `Error::CompletedItem` - 引退済みのアイテム
pub fn submit_performance(item: &ReviewItem, performance: &PerformanceRating) -> Result<ReviewItem> {
    submit_performance_at(item, performance, Utc::now())
}

/// `submit_performance` の時刻指定版
pub fn submit_performance_at(
    item: &ReviewItem,
    performance: &PerformanceRating,
    now: DateTime<Utc>,
) -> Result<ReviewItem> {
    validate_rating(performance.rating)?;
    if item.is_completed {
        return Err(Error::CompletedItem(item.item_id));
    }

    Ok(schedule(item, performance.rating, now))
}

/// 評価ごとの次回間隔をプレビュー（添字 = 評価 0..=5）
///
/// アイテム自体は変更しない。
pub fn preview_intervals(item: &ReviewItem) -> [u32; 6] {
    let now = Utc::now();
    let mut intervals = [0; 6];
    for (rating, slot) in (0..=MAX_RATING).zip(intervals.iter_mut()) {
        *slot = schedule(item, rating, now).interval_days;
    }
    intervals
}

/// 復習を引退させる（以後スケジュールされない）
pub fn retire(item: &ReviewItem) -> ReviewItem {
    ReviewItem {
        is_completed: true,
        ..item.clone()
    }
}

/// 期限が来ている復習アイテムを返す
///
/// 引退済みを除き、`scheduled_date <= as_of` のものを予定日の古い順に並べる。
/// 同じ予定日は item_id 順。入力は変更しないので何度呼んでも同じ結果になる。
pub fn due_items<'a>(
    items: &'a [ReviewItem],
    owner_id: &str,
    as_of: DateTime<Utc>,
) -> Vec<&'a ReviewItem> {
    let mut due: Vec<&ReviewItem> = items
        .iter()
        .filter(|item| item.owner_id == owner_id && item.is_due(as_of))
        .collect();

    due.sort_by(|a, b| {
        a.scheduled_date
            .cmp(&b.scheduled_date)
            .then_with(|| a.item_id.cmp(&b.item_id))
    });
    due
}

/// 間隔（日）を短い表記に変換
pub fn format_interval(days: u32) -> String {
    match days {
        0 => "now".to_string(),
        1..=6 => format!("{}d", days),
        7..=29 => format!("{}w", days / 7),
        30..=364 => format!("{}mo", days / 30),
        _ => format!("{}y", days / 365),
    }
}

fn schedule(item: &ReviewItem, rating: i32, now: DateTime<Utc>) -> ReviewItem {
    if rating < PASSING_RATING {
        // 失敗: 過去の間隔に関係なく最短に戻す（容易度は据え置き）
        return ReviewItem {
            repetitions: 0,
            interval_days: 1,
            scheduled_date: days_after(now, 1),
            ..item.clone()
        };
    }

    let repetitions = item.repetitions.saturating_add(1);
    let ease_factor = next_ease_factor(item.ease_factor, rating);
    let interval_days = match repetitions {
        1 => 1,
        2 => 6,
        _ => (item.interval_days as f64 * ease_factor).round() as u32,
    };

    ReviewItem {
        repetitions,
        ease_factor,
        interval_days,
        scheduled_date: days_after(now, interval_days),
        ..item.clone()
    }
}

/// EF' = max(1.3, EF + (0.1 - (5-q) * (0.08 + (5-q) * 0.02)))
fn next_ease_factor(ease_factor: f64, rating: i32) -> f64 {
    let miss = (MAX_RATING - rating) as f64;
    (ease_factor + (0.1 - miss * (0.08 + miss * 0.02))).max(MIN_EASE_FACTOR)
}

/// 範囲外の日付は表現可能な最大日時に丸める
fn days_after(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    now.checked_add_signed(Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn rate(rating: i32) -> PerformanceRating {
        PerformanceRating::new(rating, 30)
    }

    // =============================================
    // create テスト
    // =============================================

    #[test]
    fn test_create_initial_state() {
        let now = fixed_now();
        let item = create_at("learner-1", now);

        assert_eq!(item.owner_id, "learner-1");
        assert_eq!(item.interval_days, 1);
        assert_eq!(item.ease_factor, INITIAL_EASE_FACTOR);
        assert_eq!(item.repetitions, 0);
        assert!(!item.is_completed);
        assert_eq!(item.scheduled_date, now + Duration::days(1));
    }

    #[test]
    fn test_create_assigns_distinct_ids() {
        let a = create("learner-1");
        let b = create("learner-1");
        assert_ne!(a.item_id, b.item_id);
    }

    // =============================================
    // submit_performance テスト
    // =============================================

    #[test]
    fn test_perfect_streak_intervals() {
        let now = fixed_now();
        let item = create_at("learner-1", now);

        let first = submit_performance_at(&item, &rate(5), now).unwrap();
        assert_eq!(first.interval_days, 1);
        assert_eq!(first.repetitions, 1);
        assert!(first.ease_factor > item.ease_factor);

        let second = submit_performance_at(&first, &rate(5), now).unwrap();
        assert_eq!(second.interval_days, 6);
        assert_eq!(second.repetitions, 2);
        assert!(second.ease_factor > first.ease_factor);

        let third = submit_performance_at(&second, &rate(5), now).unwrap();
        assert_eq!(third.interval_days, (6.0 * third.ease_factor).round() as u32);
        assert_eq!(third.interval_days, 17);
        assert!(third.ease_factor > second.ease_factor);
        assert_eq!(third.scheduled_date, now + Duration::days(17));
    }

    #[test]
    fn test_ease_factor_by_rating() {
        assert!((next_ease_factor(2.5, 5) - 2.6).abs() < 1e-9);
        assert!((next_ease_factor(2.5, 4) - 2.5).abs() < 1e-9);
        assert!((next_ease_factor(2.5, 3) - 2.36).abs() < 1e-9);
    }

    #[test]
    fn test_ease_factor_monotonic_in_rating() {
        let item = create_at("learner-1", fixed_now());
        let eases: Vec<f64> = (3..=5)
            .map(|r| submit_performance_at(&item, &rate(r), fixed_now()).unwrap().ease_factor)
            .collect();
        assert!(eases[0] < eases[1]);
        assert!(eases[1] < eases[2]);
    }

    #[test]
    fn test_ease_factor_floor() {
        let mut item = create_at("learner-1", fixed_now());
        item.ease_factor = 1.35;

        let next = submit_performance_at(&item, &rate(3), fixed_now()).unwrap();
        assert_eq!(next.ease_factor, MIN_EASE_FACTOR);
    }

    #[test]
    fn test_failure_resets_streak() {
        let now = fixed_now();
        let mut item = create_at("learner-1", now);
        for _ in 0..5 {
            item = submit_performance_at(&item, &rate(4), now).unwrap();
        }
        assert!(item.interval_days > 6);
        let ease_before = item.ease_factor;

        let failed = submit_performance_at(&item, &rate(2), now).unwrap();
        assert_eq!(failed.repetitions, 0);
        assert_eq!(failed.interval_days, 1);
        assert_eq!(failed.ease_factor, ease_before);
        assert_eq!(failed.scheduled_date, now + Duration::days(1));
    }

    #[test]
    fn test_failure_on_new_item() {
        let now = fixed_now();
        let item = create_at("learner-1", now);
        let failed = submit_performance_at(&item, &rate(0), now).unwrap();
        assert_eq!(failed.repetitions, 0);
        assert_eq!(failed.interval_days, 1);
    }

    #[test]
    fn test_success_after_failure_restarts_seeds() {
        let now = fixed_now();
        let mut item = create_at("learner-1", now);
        item = submit_performance_at(&item, &rate(5), now).unwrap();
        item = submit_performance_at(&item, &rate(5), now).unwrap();
        item = submit_performance_at(&item, &rate(1), now).unwrap();

        let again = submit_performance_at(&item, &rate(4), now).unwrap();
        assert_eq!(again.repetitions, 1);
        assert_eq!(again.interval_days, 1);
    }

    #[test]
    fn test_invalid_rating() {
        let item = create_at("learner-1", fixed_now());
        assert!(matches!(
            submit_performance_at(&item, &rate(6), fixed_now()),
            Err(Error::InvalidRating(6))
        ));
        assert!(matches!(
            submit_performance_at(&item, &rate(-1), fixed_now()),
            Err(Error::InvalidRating(-1))
        ));
    }

    #[test]
    fn test_completed_item_rejected() {
        let item = retire(&create_at("learner-1", fixed_now()));
        let result = submit_performance_at(&item, &rate(5), fixed_now());
        assert!(matches!(result, Err(Error::CompletedItem(id)) if id == item.item_id));
    }

    #[test]
    fn test_elapsed_time_does_not_affect_schedule() {
        let item = create_at("learner-1", fixed_now());
        for rating in 0..=MAX_RATING {
            let quick = submit_performance_at(&item, &PerformanceRating::new(rating, 0), fixed_now()).unwrap();
            let slow = submit_performance_at(&item, &PerformanceRating::new(rating, 10_000), fixed_now()).unwrap();
            assert_eq!(quick, slow);
        }
    }

    #[test]
    fn test_repetitions_saturate() {
        let item = ReviewItem {
            repetitions: u32::MAX,
            interval_days: 10,
            ..create_at("learner-1", fixed_now())
        };
        let next = submit_performance_at(&item, &rate(4), fixed_now()).unwrap();
        assert_eq!(next.repetitions, u32::MAX);
        assert_eq!(next.interval_days, 25);
    }

    #[test]
    fn test_submit_does_not_mutate_input() {
        let item = create_at("learner-1", fixed_now());
        let snapshot = item.clone();
        let _ = submit_performance_at(&item, &rate(5), fixed_now()).unwrap();
        assert_eq!(item, snapshot);
    }

    #[test]
    fn test_huge_interval_saturates_date() {
        let mut item = create_at("learner-1", fixed_now());
        item.repetitions = 40;
        item.interval_days = u32::MAX / 2;
        item.ease_factor = 3.0;

        let next = submit_performance_at(&item, &rate(5), fixed_now()).unwrap();
        assert_eq!(next.interval_days, u32::MAX);
        assert_eq!(next.scheduled_date, DateTime::<Utc>::MAX_UTC);
    }

    // =============================================
    // due_items テスト
    // =============================================

    #[test]
    fn test_due_items_filters_and_orders() {
        let now = fixed_now();
        let mut a = create_at("learner-1", now);
        a.scheduled_date = now - Duration::days(2);
        let mut b = create_at("learner-1", now);
        b.scheduled_date = now - Duration::days(5);
        let future = create_at("learner-1", now);
        let mut other_owner = create_at("learner-2", now);
        other_owner.scheduled_date = now - Duration::days(1);
        let mut retired = retire(&create_at("learner-1", now));
        retired.scheduled_date = now - Duration::days(9);

        let items = vec![a.clone(), future, b.clone(), other_owner, retired];
        let due = due_items(&items, "learner-1", now);

        let ids: Vec<Uuid> = due.iter().map(|i| i.item_id).collect();
        assert_eq!(ids, vec![b.item_id, a.item_id]);
        assert!(due.iter().all(|i| i.scheduled_date <= now));
    }

    #[test]
    fn test_due_items_includes_exact_boundary() {
        let now = fixed_now();
        let mut item = create_at("learner-1", now);
        item.scheduled_date = now;
        let items = vec![item];
        assert_eq!(due_items(&items, "learner-1", now).len(), 1);
    }

    #[test]
    fn test_due_items_ties_broken_by_id() {
        let now = fixed_now();
        let items: Vec<ReviewItem> = (0..5)
            .map(|_| {
                let mut item = create_at("learner-1", now);
                item.scheduled_date = now - Duration::hours(1);
                item
            })
            .collect();

        let due = due_items(&items, "learner-1", now);
        let ids: Vec<Uuid> = due.iter().map(|i| i.item_id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_due_items_is_stable() {
        let now = fixed_now();
        let items: Vec<ReviewItem> = (0..4)
            .map(|i| {
                let mut item = create_at("learner-1", now);
                item.scheduled_date = now - Duration::days(i);
                item
            })
            .collect();
        let snapshot = items.clone();

        let first: Vec<Uuid> = due_items(&items, "learner-1", now).iter().map(|i| i.item_id).collect();
        let second: Vec<Uuid> = due_items(&items, "learner-1", now).iter().map(|i| i.item_id).collect();
        assert_eq!(first, second);
        assert_eq!(items, snapshot);
    }

    // =============================================
    // その他
    // =============================================

    #[test]
    fn test_preview_intervals() {
        let mut item = create_at("learner-1", fixed_now());
        item.repetitions = 2;
        item.interval_days = 6;

        let preview = preview_intervals(&item);
        assert_eq!(&preview[..3], &[1, 1, 1]);
        assert_eq!(preview[4], 15);
        assert!(preview[3] < preview[4]);
        assert!(preview[4] < preview[5]);
        assert_eq!(item.repetitions, 2);
    }

    #[test]
    fn test_retire_is_idempotent() {
        let item = create_at("learner-1", fixed_now());
        let once = retire(&item);
        let twice = retire(&once);
        assert!(once.is_completed);
        assert_eq!(once, twice);
        assert_eq!(once.interval_days, item.interval_days);
    }

    #[test]
    fn test_item_json_round_trip() {
        let now = fixed_now();
        let mut item = create_at("learner-1", now);
        for r in [5, 3, 4] {
            item = submit_performance_at(&item, &rate(r), now).unwrap();
        }

        let json = serde_json::to_string(&item).unwrap();
        let restored: ReviewItem = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, item);
    }

    #[test]
    fn test_format_interval() {
        assert_eq!(format_interval(0), "now");
        assert_eq!(format_interval(1), "1d");
        assert_eq!(format_interval(5), "5d");
        assert_eq!(format_interval(7), "1w");
        assert_eq!(format_interval(14), "2w");
        assert_eq!(format_interval(30), "1mo");
        assert_eq!(format_interval(90), "3mo");
        assert_eq!(format_interval(365), "1y");
        assert_eq!(format_interval(730), "2y");
    }
}
