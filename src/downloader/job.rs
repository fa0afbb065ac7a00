// src/downloader/job.rs

use super::{
    RetrievalPlanner,
    planner::course_dir_name,
    task_runner::{self, TransferContext},
};
use crate::{
    CourseJobContext,
    client::PageFetcher,
    error::*,
    extractor::CourseScanner,
    models::{CourseManifest, FileEntry, Section},
    symbols, ui, utils,
};
use log::{debug, error, info, warn};
use std::{
    fs,
    path::PathBuf,
    sync::{Arc, atomic::Ordering},
};

/// 课程页面的来源：在线地址，或本地保存的页面加上它原本的地址。
#[derive(Debug, Clone)]
pub enum PageSource {
    Remote(String),
    Local { path: PathBuf, base_url: String },
}

impl PageSource {
    pub fn page_url(&self) -> &str {
        match self {
            PageSource::Remote(url) => url,
            PageSource::Local { base_url, .. } => base_url,
        }
    }
}

pub struct CourseDownloader {
    pub(super) context: CourseJobContext,
}

impl CourseDownloader {
    pub fn new(context: CourseJobContext) -> Self {
        Self { context }
    }

    /// 扫描（或读取已保存的清单）、打印或下载。返回值表示是否全部成功。
    pub async fn run(&self, source: &PageSource) -> AppResult<bool> {
        info!("开始处理课程页面: {}", source.page_url());
        let manifest = if self.context.args.from_manifest {
            self.load_manifest(source.page_url())?
        } else {
            self.scan(source).await?
        };

        if self.context.args.list {
            ui::print_manifest(&manifest);
            return Ok(true);
        }

        let flat = manifest.flat_entries();
        if flat.is_empty() {
            ui::info("课程页面中没有找到可下载的文件。");
            return Ok(true);
        }
        let selected = self.select_entries(&flat);
        if selected.is_empty() {
            ui::info("未选择任何文件，任务结束。");
            return Ok(true);
        }

        self.download(&manifest, &selected).await
    }

    pub async fn scan(&self, source: &PageSource) -> AppResult<CourseManifest> {
        let page_url = source.page_url();
        let key = utils::course_key(page_url);

        let html = match source {
            PageSource::Remote(url) => {
                let spinner = ui::new_spinner(&format!("正在获取课程页面 {}", url));
                let result = self.context.http_client.fetch_page(url).await;
                spinner.finish_and_clear();
                result?
            }
            PageSource::Local { path, .. } => {
                debug!("读取本地课程页面: {:?}", path);
                fs::read_to_string(path)?
            }
        };

        let ticket = self.context.registry.begin(&key);
        let fetcher: Arc<dyn PageFetcher> = self.context.http_client.clone();
        let scanner = CourseScanner::new(fetcher, self.context.config.clone()).with_token(ticket.token());

        let spinner = ui::new_spinner("正在解析章节、文件夹和跳转链接...");
        let scanned = scanner.scan(page_url, &html).await;
        spinner.finish_and_clear();

        let manifest = match scanned {
            Ok(manifest) => manifest,
            Err(e) => {
                if !matches!(e, AppError::Superseded) {
                    self.context.registry.finish(&ticket);
                }
                return Err(e);
            }
        };
        if self.context.cancellation_token.load(Ordering::Relaxed) {
            self.context.registry.finish(&ticket);
            return Err(AppError::UserInterrupt);
        }

        let path = self.context.registry.publish(&ticket, &self.context.store, &manifest)?;
        println!(
            "\n{} 扫描完成: {} 个章节，{} 个条目 (清单: {})",
            *symbols::OK,
            manifest.sections.len(),
            manifest.file_count(),
            path.display()
        );
        Ok(manifest)
    }

    fn load_manifest(&self, page_url: &str) -> AppResult<CourseManifest> {
        let key = utils::course_key(page_url);
        let manifest = self.context.store.load(&key)?.ok_or_else(|| {
            AppError::UserInputError(format!("没有找到课程 '{}' 的已保存清单，请先扫描一次。", key))
        })?;
        ui::info(&format!(
            "使用 {} 保存的清单 ({} 个条目)",
            manifest.scanned_at.format("%Y-%m-%d %H:%M:%S"),
            manifest.file_count()
        ));
        Ok(manifest)
    }

    fn select_entries<'m>(
        &self,
        flat: &[(&'m Section, &'m FileEntry)],
    ) -> Vec<(&'m Section, &'m FileEntry)> {
        let selection = &self.context.args.select;
        let indices = utils::parse_selection_indices(selection, flat.len());
        debug!("根据选择 '{}'，解析出的索引为: {:?}", selection, indices);
        indices.into_iter().map(|i| flat[i]).collect()
    }

    async fn download(
        &self,
        manifest: &CourseManifest,
        selected: &[(&Section, &FileEntry)],
    ) -> AppResult<bool> {
        let course_dir = course_dir_name(self.context.args.course_name.as_deref(), manifest);
        let planner = RetrievalPlanner::new(self.context.http_client.as_ref(), &self.context.config);
        let planned = planner.plan(&course_dir, selected).await;

        if self.context.args.dry_run {
            println!("{}", serde_json::to_string_pretty(&planned.tasks)?);
            for (name, reason) in &planned.unresolved {
                ui::warn(&format!("{}: {}", name, reason));
            }
            return Ok(planned.unresolved.is_empty());
        }

        let output_dir = &self.context.args.output;
        fs::create_dir_all(output_dir)?;
        let absolute_path = dunce::canonicalize(output_dir)?;
        info!("文件将保存到目录: \"{}\"", absolute_path.display());
        println!(
            "\n{} 文件将保存到目录: \"{}\"",
            *symbols::INFO,
            absolute_path.display()
        );

        let manager = &self.context.manager;
        manager.start_batch(planned.tasks.len());
        for (name, reason) in &planned.unresolved {
            manager.record_unresolved(name, reason);
        }

        let transfer = TransferContext {
            client: self.context.http_client.as_ref(),
            manager,
            output_dir: &absolute_path,
            max_workers: self.context.config.max_workers,
            force_redownload: self.context.args.force_redownload,
            cancellation_token: self.context.cancellation_token.clone(),
        };
        match task_runner::execute_tasks(&transfer, &planned.tasks).await {
            Ok(()) => {}
            Err(e @ AppError::SessionInvalid) => {
                warn!("下载任务因会话失效而中断。");
                manager.print_report();
                return Err(e);
            }
            Err(e) => {
                error!("执行下载任务时发生不可恢复的错误: {}", e);
                return Err(e);
            }
        }
        manager.print_report();
        Ok(manager.did_all_succeed())
    }
}
