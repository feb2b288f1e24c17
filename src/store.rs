//! 復習ストア（JSONファイル）
//!
//! 保存した誤答・復習アイテム・復習履歴を1ファイルで管理する。
//! 誤答を保存したときに限り復習アイテムを1つ作成し、
//! 誤答を削除するとアイテムと履歴も削除する。

use crate::error::{MistakeReviewError, Result};
use chrono::{DateTime, Utc};
use mistake_review_common::planning::{self, ReviewRecord, ReviewStats};
use mistake_review_common::scheduler::{self, PerformanceRating, ReviewItem};
use mistake_review_common::AnalysisResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// 保存された誤答
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mistake {
    pub id: Uuid,
    pub owner_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<PathBuf>,
    pub analysis: AnalysisResult,
    pub review_item_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreData {
    version: u32,
    #[serde(default)]
    mistakes: Vec<Mistake>,
    #[serde(default)]
    review_items: Vec<ReviewItem>,
    #[serde(default)]
    history: Vec<ReviewRecord>,
}

impl Default for StoreData {
    fn default() -> Self {
        Self {
            version: ReviewStore::CURRENT_VERSION,
            mistakes: Vec::new(),
            review_items: Vec::new(),
            history: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct ReviewStore {
    path: PathBuf,
    data: StoreData,
}

impl ReviewStore {
    const CURRENT_VERSION: u32 = 1;

    /// ストアを開く（ファイルがなければ空）
    ///
    /// 壊れたファイルは学習データを失わないようエラーにする。
    pub fn open(path: &Path) -> Result<Self> {
        let data = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let data: StoreData = serde_json::from_str(&content).map_err(|e| {
                MistakeReviewError::Store(format!("{} を読み込めません: {}", path.display(), e))
            })?;
            if data.version != Self::CURRENT_VERSION {
                return Err(MistakeReviewError::Store(format!(
                    "未対応のストアバージョン: {}",
                    data.version
                )));
            }
            log::debug!(
                "ストア読み込み: {} (誤答{}件, 履歴{}件)",
                path.display(),
                data.mistakes.len(),
                data.history.len()
            );
            data
        } else {
            log::debug!("ストアが存在しないため新規作成: {}", path.display());
            StoreData::default()
        };

        Ok(Self {
            path: path.to_path_buf(),
            data,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 一時ファイルに書いてから置き換える
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(&self.data)?)?;
        std::fs::rename(&tmp, &self.path)?;
        log::debug!("ストア保存: {}", self.path.display());
        Ok(())
    }

    // ==================== 誤答 ====================

    /// 誤答を保存し、復習アイテムを作成
    pub fn save_mistake(
        &mut self,
        owner_id: &str,
        image_path: Option<&Path>,
        analysis: AnalysisResult,
        now: DateTime<Utc>,
    ) -> (Mistake, ReviewItem) {
        let item = scheduler::create_at(owner_id, now);
        let mistake = Mistake {
            id: Uuid::new_v4(),
            owner_id: owner_id.to_string(),
            image_path: image_path.map(Path::to_path_buf),
            analysis,
            review_item_id: item.item_id,
            created_at: now,
        };

        log::info!("誤答を保存: {} (復習アイテム {})", mistake.id, item.item_id);
        self.data.mistakes.push(mistake.clone());
        self.data.review_items.push(item.clone());
        (mistake, item)
    }

    pub fn mistakes<'a>(&'a self, owner_id: &'a str) -> impl Iterator<Item = &'a Mistake> + 'a {
        self.data.mistakes.iter().filter(move |m| m.owner_id == owner_id)
    }

    pub fn mistake_for_item(&self, item_id: Uuid) -> Option<&Mistake> {
        self.data.mistakes.iter().find(|m| m.review_item_id == item_id)
    }

    /// 誤答を削除（復習アイテムと履歴も削除）
    pub fn delete_mistake(&mut self, owner_id: &str, mistake_id: Uuid) -> Result<Mistake> {
        let pos = self
            .data
            .mistakes
            .iter()
            .position(|m| m.id == mistake_id && m.owner_id == owner_id)
            .ok_or(MistakeReviewError::MistakeNotFound(mistake_id))?;

        let mistake = self.data.mistakes.remove(pos);
        self.data.review_items.retain(|i| i.item_id != mistake.review_item_id);
        self.data.history.retain(|r| r.item_id != mistake.review_item_id);
        log::info!("誤答を削除: {}", mistake.id);
        Ok(mistake)
    }

    // ==================== 復習 ====================

    pub fn item(&self, owner_id: &str, item_id: Uuid) -> Option<&ReviewItem> {
        self.data
            .review_items
            .iter()
            .find(|i| i.item_id == item_id && i.owner_id == owner_id)
    }

    fn item_index(&self, owner_id: &str, item_id: Uuid) -> Result<usize> {
        self.data
            .review_items
            .iter()
            .position(|i| i.item_id == item_id && i.owner_id == owner_id)
            .ok_or(MistakeReviewError::ItemNotFound(item_id))
    }

    /// 評価を反映し、履歴に記録
    pub fn submit_review(
        &mut self,
        owner_id: &str,
        item_id: Uuid,
        performance: PerformanceRating,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<ReviewItem> {
        let idx = self.item_index(owner_id, item_id)?;
        let updated = scheduler::submit_performance_at(&self.data.review_items[idx], &performance, now)?;

        self.data.history.push(ReviewRecord::new(
            &updated,
            performance.rating,
            performance.elapsed_seconds,
            notes,
            now,
        ));
        self.data.review_items[idx] = updated.clone();

        log::info!(
            "復習を記録: {} 評価{} → {}日後 (EF {:.2})",
            item_id,
            performance.rating,
            updated.interval_days,
            updated.ease_factor
        );
        Ok(updated)
    }

    /// 復習を引退させる
    pub fn retire(&mut self, owner_id: &str, item_id: Uuid) -> Result<ReviewItem> {
        let idx = self.item_index(owner_id, item_id)?;
        let retired = scheduler::retire(&self.data.review_items[idx]);
        self.data.review_items[idx] = retired.clone();
        log::info!("復習を引退: {}", item_id);
        Ok(retired)
    }

    pub fn due_items(&self, owner_id: &str, as_of: DateTime<Utc>) -> Vec<&ReviewItem> {
        scheduler::due_items(&self.data.review_items, owner_id, as_of)
    }

    /// 連続学習日数に応じて上限をかけた今日の復習
    pub fn daily_plan(&self, owner_id: &str, as_of: DateTime<Utc>, base_limit: usize) -> Vec<&ReviewItem> {
        let streak = planning::streak_days(self.history(owner_id), as_of.date_naive());
        planning::daily_plan(&self.data.review_items, owner_id, as_of, base_limit, streak)
    }

    /// 学習者の復習履歴（新しい順）
    pub fn history(&self, owner_id: &str) -> Vec<&ReviewRecord> {
        let mut records: Vec<&ReviewRecord> = self
            .data
            .history
            .iter()
            .filter(|r| self.item(owner_id, r.item_id).is_some())
            .collect();
        records.sort_by(|a, b| b.reviewed_at.cmp(&a.reviewed_at));
        records
    }

    pub fn stats(&self, owner_id: &str, now: DateTime<Utc>) -> ReviewStats {
        ReviewStats::collect(&self.data.review_items, &self.data.history, owner_id, now)
    }
}
