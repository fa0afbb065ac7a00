// src/models/mod.rs

use crate::error::{AppError, ResolveError};
use crate::symbols;
use chrono::{DateTime, Utc};
use colored::{ColoredString, Colorize};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// --- 扫描结果 ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    /// 直接可下载的文件或模块页面
    Direct,
    /// 未展开的文件夹模块
    FolderLink,
    /// 从文件夹列表页中展开出的文件
    FolderExpanded,
    /// 经跳转页解析得到的文件
    UrlIndirect,
    /// 展开失败的文件夹，下载时重试
    DeferredFolder,
}

impl EntryKind {
    /// 下载前还需要再次联网展开的条目
    pub fn needs_expansion(self) -> bool {
        matches!(self, EntryKind::FolderLink | EntryKind::DeferredFolder)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub source_url: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_name: Option<String>,
    pub kind: EntryKind,
    /// 跳转链接已确认指向文件，但真实地址留到下载时再提取
    #[serde(default)]
    pub needs_resolution: bool,
}

impl FileEntry {
    pub fn new(source_url: String, display_name: String, kind: EntryKind) -> Self {
        Self {
            source_url,
            display_name,
            subsection: None,
            folder_name: None,
            kind,
            needs_resolution: false,
        }
    }

    pub fn with_subsection(mut self, subsection: Option<String>) -> Self {
        self.subsection = subsection;
        self
    }

    pub fn with_folder(mut self, folder_name: Option<String>) -> Self {
        self.folder_name = folder_name;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub ordinal: u32,
    pub title: String,
    pub sanitized_title: String,
    pub files: Vec<FileEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseManifest {
    pub key: String,
    pub page_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_title: Option<String>,
    pub scanned_at: DateTime<Utc>,
    pub sections: Vec<Section>,
}

impl CourseManifest {
    pub fn file_count(&self) -> usize {
        self.sections.iter().map(|s| s.files.len()).sum()
    }

    /// 按文档顺序展开所有条目，序号与 `--select` 对应
    pub fn flat_entries(&self) -> Vec<(&Section, &FileEntry)> {
        self.sections
            .iter()
            .flat_map(|section| section.files.iter().map(move |file| (section, file)))
            .collect()
    }
}

// --- 解析结果 ---

/// 间接链接（文件夹、跳转页）解析的三种结局
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T> {
    Resolved(T),
    Deferred(DeferReason),
    Rejected(ResolveError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferReason {
    FetchFailed(String),
    EmptyListing,
    ExpansionDisabled,
    ResolveAtRetrieval,
}

// --- 下载 ---

/// 交给下载端的任务：`filename` 是相对输出目录的路径
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadTask {
    pub url: String,
    pub filename: PathBuf,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DownloadStatus {
    Success,
    Skipped,
    HttpError,
    NetworkError,
    ConnectionError,
    TimeoutError,
    SessionError,
    IoError,
    UnexpectedError,
}

impl DownloadStatus {
    pub fn get_display_info(
        &self,
    ) -> (
        &'static ColoredString,
        fn(ColoredString) -> ColoredString,
        &'static str,
    ) {
        match self {
            DownloadStatus::Success => (&symbols::OK, |s| s.green(), "下载成功"),
            DownloadStatus::Skipped => (&symbols::INFO, |s| s.cyan(), "文件已存在，跳过"),
            DownloadStatus::HttpError => (&symbols::ERROR, |s| s.red(), "服务器返回错误"),
            DownloadStatus::NetworkError => (&symbols::ERROR, |s| s.red(), "网络请求失败"),
            DownloadStatus::ConnectionError => (&symbols::ERROR, |s| s.red(), "无法建立连接"),
            DownloadStatus::TimeoutError => (&symbols::WARN, |s| s.yellow(), "网络连接超时"),
            DownloadStatus::SessionError => (&symbols::ERROR, |s| s.red(), "会话失效 (Cookie无效)"),
            DownloadStatus::IoError => (&symbols::ERROR, |s| s.red(), "本地文件读写错误"),
            DownloadStatus::UnexpectedError => {
                (&symbols::ERROR, |s| s.red(), "发生未预期的程序错误")
            }
        }
    }
}

impl From<&AppError> for DownloadStatus {
    fn from(error: &AppError) -> Self {
        match error {
            AppError::SessionInvalid => DownloadStatus::SessionError,
            AppError::Timeout(_) => DownloadStatus::TimeoutError,
            AppError::Network(err)
            | AppError::NetworkMiddleware(reqwest_middleware::Error::Reqwest(err)) => {
                if err.is_timeout() {
                    DownloadStatus::TimeoutError
                } else if err.is_connect() {
                    DownloadStatus::ConnectionError
                } else if err.is_status() {
                    DownloadStatus::HttpError
                } else {
                    DownloadStatus::NetworkError
                }
            }
            AppError::NetworkMiddleware(_) => DownloadStatus::NetworkError,
            AppError::Io(_) | AppError::TempFilePersist(_) => DownloadStatus::IoError,
            _ => DownloadStatus::UnexpectedError,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DownloadResult {
    pub filename: String,
    pub status: DownloadStatus,
    pub message: Option<String>,
}
