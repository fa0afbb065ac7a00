// src/downloader/mod.rs

mod job;
mod planner;
mod task_processor;
mod task_runner;

pub use job::{CourseDownloader, PageSource};
pub use planner::{PlannedDownloads, RetrievalPlanner};
pub use task_runner::{TransferContext, execute_tasks};

use crate::{models::DownloadStatus, symbols, ui};
use colored::*;
use log::info;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct DownloadStats {
    pub total: usize,
    pub success: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// 一批下载的统计与明细，在并发任务之间共享。
#[derive(Clone)]
pub struct DownloadManager {
    stats: Arc<Mutex<DownloadStats>>,
    failed_downloads: Arc<Mutex<Vec<(String, String)>>>,
    skipped_downloads: Arc<Mutex<Vec<(String, String)>>>,
}

impl Default for DownloadManager {
    fn default() -> Self {
        Self::new()
    }
}

// 计数器在任何持锁代码 panic 之后依然可用
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl DownloadManager {
    pub fn new() -> Self {
        Self {
            stats: Arc::new(Mutex::new(DownloadStats::default())),
            failed_downloads: Arc::new(Mutex::new(Vec::new())),
            skipped_downloads: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn start_batch(&self, total_tasks: usize) {
        info!("开始新一批下载任务，总数: {}", total_tasks);
        *lock(&self.stats) = DownloadStats {
            total: total_tasks,
            ..Default::default()
        };
        lock(&self.failed_downloads).clear();
        lock(&self.skipped_downloads).clear();
    }

    pub fn record_success(&self) {
        lock(&self.stats).success += 1;
    }

    pub fn record_skip(&self, filename: &str, reason: &str) {
        info!("跳过文件 '{}'，原因: {}", filename, reason);
        lock(&self.stats).skipped += 1;
        lock(&self.skipped_downloads).push((filename.to_string(), reason.to_string()));
    }

    pub fn record_failure(&self, filename: &str, status: DownloadStatus) {
        let (_, _, msg) = status.get_display_info();
        self.record_failure_reason(filename, msg);
    }

    /// 下载前就失败的条目（例如文件夹再次展开失败），计入总数与失败数
    pub fn record_unresolved(&self, name: &str, reason: &str) {
        lock(&self.stats).total += 1;
        self.record_failure_reason(name, reason);
    }

    fn record_failure_reason(&self, filename: &str, reason: &str) {
        log::error!("文件 '{}' 下载失败: {}", filename, reason);
        lock(&self.stats).failed += 1;
        lock(&self.failed_downloads).push((filename.to_string(), reason.to_string()));
    }

    pub fn get_stats(&self) -> DownloadStats {
        lock(&self.stats).clone()
    }

    pub fn did_all_succeed(&self) -> bool {
        lock(&self.stats).failed == 0
    }

    pub fn print_report(&self) {
        let stats = self.get_stats();
        let skipped = lock(&self.skipped_downloads);
        let failed = lock(&self.failed_downloads);
        info!(
            "下载报告: Total={}, Success={}, Skipped={}, Failed={}",
            stats.total, stats.success, stats.skipped, stats.failed
        );

        if !skipped.is_empty() || !failed.is_empty() {
            ui::print_sub_header("下载详情报告");
            if !skipped.is_empty() {
                println!("\n{} 跳过的文件 ({}个):", *symbols::INFO, stats.skipped);
                print_grouped_report(&skipped, |s| s.cyan());
            }
            if !failed.is_empty() {
                println!("\n{} 失败的文件 ({}个):", *symbols::ERROR, stats.failed);
                print_grouped_report(&failed, |s| s.red());
            }
        }
        ui::print_sub_header("任务总结");
        if stats.total > 0 && stats.failed == 0 {
            println!(
                "{} 所有 {} 个任务均已成功 ({} 个已跳过)。",
                *symbols::OK,
                stats.total,
                stats.skipped
            );
        } else {
            let summary = format!(
                "{} | {} | {}",
                format!("成功: {}", stats.success).green(),
                format!("失败: {}", stats.failed).red(),
                format!("跳过: {}", stats.skipped).yellow()
            );
            println!("{}", summary);
        }
    }
}

fn print_grouped_report(items: &[(String, String)], color_fn: fn(ColoredString) -> ColoredString) {
    let mut grouped: HashMap<&String, Vec<&String>> = HashMap::new();
    for (filename, reason) in items {
        grouped.entry(reason).or_default().push(filename);
    }
    let mut sorted_reasons: Vec<_> = grouped.keys().collect();
    sorted_reasons.sort();
    for reason in sorted_reasons {
        println!("  - {}", color_fn(format!("原因: {}", reason).into()));
        let mut filenames = grouped.get(reason).cloned().unwrap_or_default();
        filenames.sort();
        for filename in filenames {
            println!("    - {}", filename);
        }
    }
}
