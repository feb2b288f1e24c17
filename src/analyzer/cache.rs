//! 解析結果キャッシュモジュール
//!
//! 画像のSHA-256ハッシュをキーにして解析結果をキャッシュし、
//! 同じ画像の再解析をスキップする。劣化結果はキャッシュしない。

use crate::error::Result;
use mistake_review_common::AnalysisResult;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

const CACHE_FILE_NAME: &str = ".analysis-cache.json";

/// キャッシュファイルの構造
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheFile {
    /// バージョン（互換性チェック用）
    version: u32,
    /// 画像ハッシュ → 解析結果のマップ
    entries: HashMap<String, CacheEntry>,
}

/// キャッシュエントリ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub file_name: String,
    pub file_size: u64,
    pub result: AnalysisResult,
}

impl CacheFile {
    const CURRENT_VERSION: u32 = 1;

    pub fn cache_path(folder: &Path) -> PathBuf {
        folder.join(CACHE_FILE_NAME)
    }

    /// キャッシュファイルを読み込み（存在しない・壊れている場合は空）
    pub fn load(folder: &Path) -> Self {
        let cache_path = Self::cache_path(folder);
        if !cache_path.exists() {
            return Self::default();
        }

        let file = match File::open(&cache_path) {
            Ok(f) => f,
            Err(e) => {
                log::warn!("キャッシュを開けません {}: {}", cache_path.display(), e);
                return Self::default();
            }
        };

        match serde_json::from_reader::<_, CacheFile>(BufReader::new(file)) {
            Ok(cache) if cache.version == Self::CURRENT_VERSION => cache,
            Ok(_) => {
                log::info!("キャッシュバージョン不一致、再生成します");
                Self::default()
            }
            Err(e) => {
                log::warn!("キャッシュが破損しています {}: {}", cache_path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self, folder: &Path) -> Result<()> {
        let file = File::create(Self::cache_path(folder))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    /// キャッシュファイルを削除（存在した場合 true）
    pub fn clear(folder: &Path) -> Result<bool> {
        let cache_path = Self::cache_path(folder);
        if cache_path.exists() {
            std::fs::remove_file(cache_path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn get(&self, hash: &str) -> Option<&AnalysisResult> {
        self.entries.get(hash).map(|e| &e.result)
    }

    /// キャッシュに追加（劣化結果は無視して false）
    pub fn insert(&mut self, hash: String, file_name: String, file_size: u64, result: AnalysisResult) -> bool {
        if result.degraded {
            return false;
        }
        self.entries.insert(hash, CacheEntry {
            file_name,
            file_size,
            result,
        });
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CacheFile {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            entries: HashMap::new(),
        }
    }
}

/// 画像バイト列のハッシュ（SHA-256, 16進）
pub fn hash_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
