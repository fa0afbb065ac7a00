// src/workflows.rs

use crate::{
    CourseJobContext,
    downloader::{CourseDownloader, PageSource},
    error::{AppError, AppResult},
    symbols, ui, utils,
};
use anyhow::anyhow;
use colored::*;
use log::{error, info, warn};
use std::{
    fs,
    path::Path,
    sync::atomic::Ordering,
};
use url::Url;

/// 运行单任务模式（处理 --url 或 --html-file）
pub(crate) async fn run_single(context: CourseJobContext) -> AppResult<()> {
    let source = page_source(&context)?;
    let all_succeeded = CourseDownloader::new(context).run(&source).await?;
    if !all_succeeded {
        return Err(AppError::Other(anyhow!("部分文件未能下载。")));
    }
    Ok(())
}

fn page_source(context: &CourseJobContext) -> AppResult<PageSource> {
    let args = &context.args;
    if let Some(path) = &args.html_file {
        // clap 已保证 --html-file 与 --base-url 同时出现
        let base_url = args
            .base_url
            .clone()
            .ok_or_else(|| AppError::UserInputError("使用 --html-file 时必须提供 --base-url。".into()))?;
        validate_url(&base_url)?;
        return Ok(PageSource::Local {
            path: path.clone(),
            base_url,
        });
    }
    match &args.url {
        Some(url) => {
            validate_url(url)?;
            Ok(PageSource::Remote(url.clone()))
        }
        None => Err(AppError::UserInputError("请通过 --url 或 --html-file 指定课程页面。".into())),
    }
}

fn validate_url(url: &str) -> AppResult<()> {
    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => Err(AppError::UserInputError(format!("'{}' 不是有效的课程页面链接。", url))),
    }
}

/// 运行批量模式：逐个处理文件中的课程链接，单个课程失败不影响其余课程
pub(crate) async fn run_batch(batch_file: &Path, base_context: CourseJobContext) -> AppResult<()> {
    let content = fs::read_to_string(batch_file).map_err(|e| {
        error!("读取批量文件 '{}' 失败: {}", batch_file.display(), e);
        AppError::from(e)
    })?;

    let tasks: Vec<String> = content
        .lines()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && !s.starts_with('#'))
        .collect();
    if tasks.is_empty() {
        warn!("批量文件 '{}' 为空或不含有效行。", batch_file.display());
        ui::warn(&format!("批量文件 '{}' 为空。", batch_file.display()));
        return Ok(());
    }

    let mut success = 0;
    let mut failed = 0;
    ui::print_header(&format!(
        "开始批量处理任务 (按 {} 可随时退出)",
        *symbols::CTRL_C
    ));
    for (i, task) in tasks.iter().enumerate() {
        if base_context.cancellation_token.load(Ordering::Relaxed) {
            return Err(AppError::UserInterrupt);
        }
        ui::print_sub_header(&format!(
            "批量任务 {}/{} - {}",
            i + 1,
            tasks.len(),
            utils::truncate_text(task, 60)
        ));
        if let Err(e) = validate_url(task) {
            warn!("跳过无效条目: {}", task);
            ui::warn(&e.to_string());
            continue;
        }

        let downloader = CourseDownloader::new(base_context.clone());
        match downloader.run(&PageSource::Remote(task.clone())).await {
            Ok(true) => success += 1,
            Ok(false) => {
                failed += 1;
                info!("批量任务 '{}' 部分文件下载失败", task);
            }
            Err(AppError::UserInterrupt) => return Err(AppError::UserInterrupt),
            Err(e) => {
                failed += 1;
                error!("批量任务 '{}' 失败: {}", task, e);
                ui::error(&format!("处理任务时发生错误: {}", e));
            }
        }
    }

    ui::print_header("批量任务报告");
    println!(
        "{} | {} | 总计: {}",
        format!("成功任务: {}", success).green(),
        format!("失败任务: {}", failed).red(),
        tasks.len()
    );
    if failed > 0 {
        Err(AppError::Other(anyhow!("{} 个批量任务执行失败。", failed)))
    } else {
        Ok(())
    }
}
