// src/downloader/task_processor.rs

use crate::{client::RobustClient, error::*, models::*, utils};
use futures::StreamExt;
use indicatif::ProgressBar;
use log::{debug, error, info};
use std::{
    fs,
    io::Write as IoWrite,
    path::{Path, PathBuf},
};

/// `TaskProcessor` 封装了处理单个下载任务的所有逻辑。
pub struct TaskProcessor<'a> {
    client: &'a RobustClient,
    output_dir: &'a Path,
    force_redownload: bool,
}

impl<'a> TaskProcessor<'a> {
    pub fn new(client: &'a RobustClient, output_dir: &'a Path, force_redownload: bool) -> Self {
        Self {
            client,
            output_dir,
            force_redownload,
        }
    }

    /// 处理单个文件任务。会话失效以外的错误都转换为失败结果，不中断整批任务。
    pub async fn process(&self, task: &DownloadTask, pbar: &ProgressBar) -> AppResult<DownloadResult> {
        let display_name = task
            .filename
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| task.url.clone());

        match self.download(task, pbar).await {
            Ok(status) => Ok(DownloadResult {
                filename: display_name,
                status,
                message: None,
            }),
            Err(e @ AppError::SessionInvalid) => Err(e),
            Err(e) => {
                error!("处理任务 '{:?}' 时发生错误: {}", task.filename, e);
                Ok(DownloadResult {
                    filename: display_name,
                    status: DownloadStatus::from(&e),
                    message: Some(e.to_string()),
                })
            }
        }
    }

    async fn download(&self, task: &DownloadTask, pbar: &ProgressBar) -> AppResult<DownloadStatus> {
        let planned_path = utils::secure_join_path(self.output_dir, &task.filename)?;
        if self.should_skip(&planned_path) {
            return Ok(DownloadStatus::Skipped);
        }

        let res = self.client.get(task.url.as_str()).await?;

        // 名称没有扩展名时（例如 resource 模块页面），按重定向后的最终地址补全
        let final_path = with_extension_from(&planned_path, res.url().as_str());
        if final_path != planned_path && self.should_skip(&final_path) {
            return Ok(DownloadStatus::Skipped);
        }

        let parent = final_path
            .parent()
            .ok_or_else(|| AppError::Security(format!("无效的保存路径: {:?}", final_path)))?;
        fs::create_dir_all(parent)?;

        // 先写入同目录下的临时文件，完成后再整体替换目标文件
        let mut temp = tempfile::NamedTempFile::new_in(parent)?;
        let mut stream = res.bytes_stream();
        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result?;
            temp.write_all(&chunk)?;
        }
        temp.flush()?;
        temp.persist(&final_path)?;
        pbar.tick();

        debug!("文件已保存: {:?}", final_path);
        Ok(DownloadStatus::Success)
    }

    fn should_skip(&self, path: &Path) -> bool {
        if !path.exists() {
            return false;
        }
        if self.force_redownload {
            info!("用户强制重新下载文件: {:?}", path);
            return false;
        }
        true
    }
}

fn with_extension_from(path: &Path, final_url: &str) -> PathBuf {
    let Some(ext) = utils::url_extension(final_url).filter(|ext| ext != ".php") else {
        return path.to_path_buf();
    };
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    if utils::ends_with_ignore_case(&name, &ext) || utils::ends_with_ignore_case(&name, ".html") {
        return path.to_path_buf();
    }
    path.with_file_name(format!("{}{}", name, ext))
}
