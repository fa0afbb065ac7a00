// src/downloader/task_runner.rs

use super::{DownloadManager, task_processor::TaskProcessor};
use crate::{client::RobustClient, error::*, models::*, ui};
use futures::{StreamExt, stream};
use indicatif::ProgressBar;
use log::error;
use std::{
    cmp::min,
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

/// 一批下载共享的执行环境
pub struct TransferContext<'a> {
    pub client: &'a RobustClient,
    pub manager: &'a DownloadManager,
    pub output_dir: &'a Path,
    pub max_workers: usize,
    pub force_redownload: bool,
    pub cancellation_token: Arc<AtomicBool>,
}

/// 负责执行一批下载任务，管理并发和进度报告。会话失效时中止整批任务。
pub async fn execute_tasks(context: &TransferContext<'_>, tasks: &[DownloadTask]) -> AppResult<()> {
    let max_workers = min(context.max_workers, tasks.len());
    if max_workers == 0 {
        return Ok(());
    }

    ui::plain("");
    ui::info(&format!(
        "开始下载 {} 个文件 (并发数: {})...",
        tasks.len(),
        max_workers
    ));
    let main_pbar = ui::new_tasks_progress_bar(tasks.len() as u64, "下载");
    let error_sender = Arc::new(tokio::sync::Mutex::new(None::<AppError>));

    let pbar = &main_pbar;
    stream::iter(tasks)
        .for_each_concurrent(max_workers, |task| {
            run_single_concurrent_task(task, context, pbar, error_sender.clone())
        })
        .await;

    main_pbar.finish_and_clear();
    if context.cancellation_token.load(Ordering::Relaxed) {
        return Err(AppError::UserInterrupt);
    }
    if let Some(err) = error_sender.lock().await.take() {
        return Err(err);
    }
    Ok(())
}

/// 在并发池中运行的单个任务单元。
async fn run_single_concurrent_task(
    task: &DownloadTask,
    context: &TransferContext<'_>,
    main_pbar: &ProgressBar,
    error_sender: Arc<tokio::sync::Mutex<Option<AppError>>>,
) {
    if context.cancellation_token.load(Ordering::Relaxed) || error_sender.lock().await.is_some() {
        return;
    }

    let processor = TaskProcessor::new(context.client, context.output_dir, context.force_redownload);
    match processor.process(task, main_pbar).await {
        Ok(result) => {
            match result.status {
                DownloadStatus::Success => context.manager.record_success(),
                DownloadStatus::Skipped => context.manager.record_skip(
                    &result.filename,
                    result.message.as_deref().unwrap_or("文件已存在"),
                ),
                _ => context.manager.record_failure(&result.filename, result.status),
            }
            main_pbar.inc(1);

            if result.status != DownloadStatus::Skipped {
                let (symbol, color_fn, default_msg) = result.status.get_display_info();
                let msg = if let Some(err_msg) = result.message {
                    format!(
                        "\n{} {} {}",
                        symbol,
                        result.filename,
                        color_fn(format!("失败: {} (详情: {})", default_msg, err_msg).into())
                    )
                } else {
                    format!("{} {}", symbol, result.filename)
                };
                main_pbar.println(msg);
            }
        }
        Err(e) => {
            // 会话失效对整批任务都是致命的
            let mut error_lock = error_sender.lock().await;
            if error_lock.is_none() {
                let task_name = task.filename.to_string_lossy();
                error!("任务 '{}' 失败，将中止整个批次: {}", task_name, e);
                context
                    .manager
                    .record_failure(&task_name, DownloadStatus::from(&e));
                *error_lock = Some(e);
            }
        }
    }
}
