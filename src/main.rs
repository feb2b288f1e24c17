use clap::Parser;
use chrono::Utc;
use mistake_review::{analyzer, cli, config, error, scanner, session, store};
use analyzer::{AnalyzeOptions, CacheFile, CliAnalyzer};
use cli::{Cli, Commands, MistakeCommands, ReviewCommands};
use config::Config;
use error::{MistakeReviewError, Result};
use mistake_review_common::scheduler::format_interval;
use mistake_review_common::{interpret, AnalysisResult, PerformanceRating};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use store::ReviewStore;

/// analyze コマンドの出力1件
#[derive(Serialize)]
struct AnalysisOutput<'a> {
    file_name: &'a str,
    path: &'a Path,
    #[serde(skip_serializing_if = "Option::is_none")]
    mistake_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    review_item_id: Option<String>,
    result: &'a AnalysisResult,
}

fn init_logger(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let mut config = Config::load()?;
    if let Some(provider) = cli.ai_provider {
        config.ai_provider = provider;
    }

    match cli.command {
        Commands::Analyze { path, output, save, use_cache, recursive, retry_degraded } => {
            eprintln!("📸 mistake-review - 誤答解析\n");

            // 1. 画像スキャン
            eprintln!("[1/3] 画像をスキャン中...");
            let (images, cache_folder) = if path.is_dir() {
                let images = scanner::scan_folder(&path, recursive)?;
                if images.is_empty() {
                    return Err(MistakeReviewError::NoImagesFound(path.display().to_string()));
                }
                (images, path.clone())
            } else {
                let image = scanner::ImageInfo::from_path(&path)?;
                let folder = path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."));
                (vec![image], folder)
            };
            eprintln!("✔ {}枚の画像を検出\n", images.len());

            // 2. AI解析
            eprintln!(
                "[2/3] AI解析中 ({})...{}",
                config.ai_provider,
                if use_cache { " (キャッシュ有効)" } else { "" }
            );
            let cli_analyzer = CliAnalyzer::new(
                config.ai_provider,
                config.model.clone(),
                Duration::from_secs(config.timeout_seconds),
            )?;
            let policy = config.retry.policy();
            let options = AnalyzeOptions { retry_degraded };

            let mut cache = use_cache.then(|| CacheFile::load(&cache_folder));
            let results =
                analyzer::analyze_images(&cli_analyzer, &policy, &images, cache.as_mut(), options).await?;
            if let Some(cache) = &cache {
                cache.save(&cache_folder)?;
            }

            let degraded = results.iter().filter(|(_, r)| r.degraded).count();
            eprintln!("✔ 解析完了");
            if degraded > 0 {
                eprintln!("⚠ {}枚は解釈できませんでした（再解析を推奨）", degraded);
            }
            eprintln!();

            // 3. 保存・出力
            eprintln!("[3/3] 結果を出力中...");
            let mut saved = Vec::with_capacity(results.len());
            if save {
                let mut store = ReviewStore::open(&config.store_path()?)?;
                for (image, result) in &results {
                    if result.degraded {
                        log::warn!("{}: 劣化結果のため保存しません", image.file_name);
                        saved.push(None);
                        continue;
                    }
                    let (mistake, item) =
                        store.save_mistake(&config.owner_id, Some(&image.path), result.clone(), Utc::now());
                    saved.push(Some((mistake.id.to_string(), item.item_id.to_string())));
                }
                store.save()?;
                let count = saved.iter().flatten().count();
                eprintln!("✔ {}件を保存: {}", count, store.path().display());
            } else {
                saved.resize(results.len(), None);
            }

            let outputs: Vec<AnalysisOutput> = results
                .iter()
                .zip(saved)
                .map(|((image, result), ids)| {
                    let (mistake_id, review_item_id) = ids.unzip();
                    AnalysisOutput {
                        file_name: &image.file_name,
                        path: &image.path,
                        mistake_id,
                        review_item_id,
                        result,
                    }
                })
                .collect();
            let json = serde_json::to_string_pretty(&outputs)?;

            match output {
                Some(output) => {
                    std::fs::write(&output, json)?;
                    eprintln!("✔ 結果を保存: {}", output.display());
                }
                None => println!("{}", json),
            }
        }

        Commands::Interpret { input } => {
            let text = match input {
                Some(path) => {
                    if !path.is_file() {
                        return Err(MistakeReviewError::FileNotFound(path.display().to_string()));
                    }
                    std::fs::read_to_string(&path)?
                }
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };

            let result = interpret(&text);
            if result.degraded {
                log::warn!("応答を解釈できませんでした: {}", result.insights.join(" "));
            }
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Commands::Review(command) => {
            run_review(command, &config)?;
        }

        Commands::Mistakes(command) => {
            let mut store = ReviewStore::open(&config.store_path()?)?;
            match command {
                MistakeCommands::List => {
                    let mut count = 0;
                    for mistake in store.mistakes(&config.owner_id) {
                        count += 1;
                        let item = store.item(&config.owner_id, mistake.review_item_id);
                        let status = match item {
                            Some(i) if i.is_completed => "引退".to_string(),
                            Some(i) => format!("次回 {}", i.scheduled_date.format("%Y-%m-%d")),
                            None => "-".to_string(),
                        };
                        println!(
                            "{}  [{}] 信頼度{:.2}  {}  {}",
                            mistake.id,
                            mistake.analysis.error_type,
                            mistake.analysis.confidence,
                            status,
                            mistake.analysis.questions_found.first().map(String::as_str).unwrap_or("(問題文なし)")
                        );
                    }
                    if count == 0 {
                        println!("保存済みの誤答はありません");
                    }
                }
                MistakeCommands::Delete { id } => {
                    let id = session::parse_item_id(&id)?;
                    let removed = store.delete_mistake(&config.owner_id, id)?;
                    store.save()?;
                    println!("✔ 誤答を削除しました: {}", removed.id);
                }
            }
        }

        Commands::Config { set_owner, set_provider, show } => {
            let mut config = config;

            if let Some(owner) = set_owner {
                config.set_owner(owner)?;
                println!("✔ 学習者IDを設定しました: {}", config.owner_id);
            }

            if let Some(provider) = set_provider {
                config.set_provider(provider)?;
                println!("✔ AIプロバイダを設定しました: {}", provider);
            }

            if show {
                println!("設定:");
                println!("  設定ファイル: {}", Config::config_path()?.display());
                println!("  AIプロバイダ: {}", config.ai_provider);
                println!("  モデル: {}", config.model.as_deref().unwrap_or("(既定)"));
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!(
                    "  リトライ: 最大{}回 (初回待機 {}ms)",
                    config.retry.max_attempts, config.retry.base_delay_ms
                );
                println!("  ストア: {}", config.store_path()?.display());
                println!("  学習者ID: {}", config.owner_id);
                println!("  1日の基本上限: {}", config.daily_limit_base);
            }
        }

        Commands::Cache { clear, folder, info } => {
            let target = folder.unwrap_or_else(|| PathBuf::from("."));
            let cache_path = CacheFile::cache_path(&target);

            if info || !clear {
                if cache_path.exists() {
                    let cache = CacheFile::load(&target);
                    println!("キャッシュ情報:");
                    println!("  パス: {}", cache_path.display());
                    println!("  件数: {}", cache.len());
                    if let Ok(meta) = std::fs::metadata(&cache_path) {
                        println!("  サイズ: {} bytes", meta.len());
                    }
                } else {
                    println!("キャッシュファイルが存在しません: {}", cache_path.display());
                }
            }

            if clear {
                match CacheFile::clear(&target) {
                    Ok(true) => println!("✔ キャッシュを削除しました: {}", cache_path.display()),
                    Ok(false) => println!("キャッシュファイルが存在しません"),
                    Err(e) => println!("キャッシュ削除エラー: {}", e),
                }
            }
        }
    }

    Ok(())
}

fn run_review(command: ReviewCommands, config: &Config) -> Result<()> {
    let mut store = ReviewStore::open(&config.store_path()?)?;
    let owner = config.owner_id.as_str();

    match command {
        ReviewCommands::Due { as_of, limit } => {
            let as_of = as_of.unwrap_or_else(Utc::now);
            let items = match limit {
                Some(limit) => store.due_items(owner, as_of).into_iter().take(limit).collect(),
                None => store.daily_plan(owner, as_of, config.daily_limit_base),
            };

            if items.is_empty() {
                println!("✓ 期限の来た復習はありません ({})", as_of.format("%Y-%m-%d %H:%M"));
                return Ok(());
            }

            println!("📚 復習 {}件 ({}時点)", items.len(), as_of.format("%Y-%m-%d %H:%M"));
            for item in items {
                let summary = store
                    .mistake_for_item(item.item_id)
                    .and_then(|m| m.analysis.questions_found.first().cloned())
                    .unwrap_or_default();
                println!(
                    "  {}  予定 {}  間隔 {}  EF {:.2}  {}",
                    item.item_id,
                    item.scheduled_date.format("%Y-%m-%d"),
                    format_interval(item.interval_days),
                    item.ease_factor,
                    summary
                );
            }
        }

        ReviewCommands::Submit { item, rating, elapsed, notes } => {
            let item_id = session::parse_item_id(&item)?;
            let performance = PerformanceRating::new(rating, elapsed);
            let updated = store.submit_review(owner, item_id, performance, notes, Utc::now())?;
            store.save()?;
            println!(
                "✔ 記録しました: 次回 {} ({}後), EF {:.2}, 連続正解 {}回",
                updated.scheduled_date.format("%Y-%m-%d"),
                format_interval(updated.interval_days),
                updated.ease_factor,
                updated.repetitions
            );
        }

        ReviewCommands::Retire { item } => {
            let item_id = session::parse_item_id(&item)?;
            store.retire(owner, item_id)?;
            store.save()?;
            println!("✔ 引退しました: {}", item_id);
        }

        ReviewCommands::Session => {
            println!("📝 mistake-review - 復習セッション\n");
            session::run_interactive_session(&mut store, owner, config.daily_limit_base)?;
        }

        ReviewCommands::History { limit } => {
            let history = store.history(owner);
            if history.is_empty() {
                println!("復習履歴はありません");
                return Ok(());
            }
            for record in history.into_iter().take(limit) {
                println!(
                    "{}  {}  評価{}  {}秒  → {}  {}",
                    record.reviewed_at.format("%Y-%m-%d %H:%M"),
                    record.item_id,
                    record.rating,
                    record.elapsed_seconds,
                    format_interval(record.interval_days),
                    record.notes.as_deref().unwrap_or("")
                );
            }
        }

        ReviewCommands::Stats => {
            let stats = store.stats(owner, Utc::now());
            println!("復習統計 ({}):", owner);
            println!("  アイテム: {} (有効 {}, 引退 {})", stats.total_items, stats.active_items, stats.retired_items);
            println!("  期限到来: {}", stats.due_items);
            println!("  今日の復習: {}", stats.reviews_today);
            println!("  総復習数: {}", stats.total_reviews);
            println!("  平均評価: {:.2}", stats.average_rating);
            println!("  正解率: {:.0}%", stats.success_rate * 100.0);
            println!("  連続学習: {}日", stats.streak_days);
            println!(
                "  今日の上限: {}",
                mistake_review_common::planning::daily_limit(config.daily_limit_base, stats.streak_days)
            );
        }
    }

    Ok(())
}
