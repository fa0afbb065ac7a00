// src/extractor/folder.rs

use super::markup;
use crate::{
    client::PageFetcher,
    constants::limits,
    error::ResolveError,
    models::{DeferReason, Resolution},
    utils,
};
use log::{debug, warn};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderFile {
    pub url: String,
    pub display_name: String,
}

/// 文件夹模块展开器：只展开一层，不递归子文件夹。
pub struct FolderExpander<'a> {
    fetcher: &'a dyn PageFetcher,
}

impl<'a> FolderExpander<'a> {
    pub fn new(fetcher: &'a dyn PageFetcher) -> Self {
        Self { fetcher }
    }

    /// 获取失败或列表为空时返回 `Deferred`，由下载阶段带着完整上下文重试。
    pub async fn expand(&self, folder_url: &str) -> Resolution<Vec<FolderFile>> {
        let page_url = match Url::parse(folder_url) {
            Ok(u) => u,
            Err(e) => {
                return Resolution::Rejected(ResolveError::MalformedUrl(format!(
                    "{} ({})",
                    folder_url, e
                )));
            }
        };

        let body = match self.fetcher.fetch_page(folder_url).await {
            Ok(body) => body,
            Err(e) => {
                warn!("文件夹页面 '{}' 获取失败，推迟展开: {}", folder_url, e);
                return Resolution::Deferred(DeferReason::FetchFailed(e.to_string()));
            }
        };

        let files = list_folder_files(&body, &page_url);
        if files.is_empty() {
            warn!("文件夹页面 '{}' 中没有找到文件，推迟展开", folder_url);
            return Resolution::Deferred(DeferReason::EmptyListing);
        }
        debug!("文件夹 '{}' 展开得到 {} 个文件", folder_url, files.len());
        Resolution::Resolved(files)
    }
}

pub fn list_folder_files(html: &str, page_url: &Url) -> Vec<FolderFile> {
    markup::folder_file_anchors(html, page_url)
        .into_iter()
        .filter_map(|anchor| {
            let url = anchor.href?;
            Some(FolderFile {
                display_name: utils::sanitize_name(&anchor.text, limits::NESTED_NAME),
                url,
            })
        })
        .collect()
}
