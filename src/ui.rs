// src/ui.rs

use crate::{
    constants,
    models::{CourseManifest, EntryKind},
    symbols, utils,
};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub fn print_header(title: &str) {
    println!("\n{}", "═".repeat(constants::UI_WIDTH));
    println!(" {}", title.cyan().bold());
    println!("{}", "═".repeat(constants::UI_WIDTH));
}

pub fn print_sub_header(title: &str) {
    println!("\n--- {} ---", title.bold());
}

pub fn plain(message: &str) {
    println!("{}", message);
}

pub fn info(message: &str) {
    println!("{} {}", *symbols::INFO, message);
}

pub fn warn(message: &str) {
    println!("{} {}", *symbols::WARN, message.yellow());
}

pub fn error(message: &str) {
    eprintln!("{} {}", *symbols::ERROR, message.red());
}

pub fn new_tasks_progress_bar(total: u64, prefix: &str) -> ProgressBar {
    let pbar = ProgressBar::new(total);
    // 模板是常量，解析失败时退回默认样式
    if let Ok(style) = ProgressStyle::with_template(
        "{prefix:7.bold.cyan} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}/{len:3} ({percent:>3}%) [ETA: {eta}]",
    ) {
        pbar.set_style(style.progress_chars("#>-"));
    }
    pbar.set_prefix(prefix.to_string());
    pbar.enable_steady_tick(Duration::from_millis(100));
    pbar
}

pub fn new_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// 打印清单，序号与 `--select` 使用的序号一致
pub fn print_manifest(manifest: &CourseManifest) {
    let title = manifest.course_title.as_deref().unwrap_or(constants::DEFAULT_COURSE_NAME);
    print_header(&format!("课程清单: {}", title));
    info(&format!(
        "扫描时间: {}  |  {} 个章节，{} 个条目",
        manifest.scanned_at.format("%Y-%m-%d %H:%M:%S"),
        manifest.sections.len(),
        manifest.file_count()
    ));

    let pad = manifest.file_count().to_string().len();
    let mut index = 0;
    for section in &manifest.sections {
        print_sub_header(&section.title);
        if section.files.is_empty() {
            println!("  {}", "(空)".dimmed());
        }
        let mut last_group: Option<&str> = None;
        for file in &section.files {
            index += 1;
            let group = file.folder_name.as_deref().or(file.subsection.as_deref());
            if let Some(name) = group {
                if group != last_group {
                    println!("  {}", format!("[{}]", name).bold());
                }
            }
            last_group = group;

            let marker = match file.kind {
                EntryKind::DeferredFolder => format!(" {}", *symbols::DEFERRED_FOLDER),
                EntryKind::FolderLink => format!(" {}", *symbols::UNEXPANDED_FOLDER),
                _ if file.needs_resolution => format!(" {}", *symbols::DEFERRED_REDIRECT),
                _ => String::new(),
            };
            println!(
                "  [{}] {}{}",
                format!("{:>pad$}", index, pad = pad).yellow(),
                utils::truncate_text(&file.display_name, constants::FILENAME_TRUNCATE_LENGTH),
                marker
            );
        }
    }
}
