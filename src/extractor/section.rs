// src/extractor/section.rs

use super::{
    classifier::{LinkKind, classify_link},
    folder::FolderExpander,
    markup::{self, Activity, RawAnchor, RawSection},
    redirector::RedirectResolver,
};
use crate::{
    client::PageFetcher,
    config::AppConfig,
    constants::{limits, markup::SECTION_ZERO_ID},
    error::{AppError, AppResult},
    models::{CourseManifest, DeferReason, EntryKind, FileEntry, Resolution, Section},
    utils,
};
use async_trait::async_trait;
use chrono::Utc;
use futures::{StreamExt, stream};
use itertools::Itertools;
use log::{debug, info, warn};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// 当前章节中最近一个标题活动的文本。每个章节开始时为空，
/// 遇到标题活动就被覆盖，之后的链接都归属于它。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubsectionState {
    current: Option<String>,
}

/// 已分类、等待解析的链接，带着发现时的小节归属
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLink {
    pub href: String,
    pub text: String,
    pub kind: LinkKind,
    pub subsection: Option<String>,
}

impl SubsectionState {
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// 状态机的一步：标题活动只更新状态，其余活动按当前状态产出链接。
    pub fn step(self, activity: &Activity) -> (Self, Vec<PlannedLink>) {
        match activity {
            Activity::Label(text) => {
                let current = text
                    .as_deref()
                    .map(|t| utils::sanitize_name(t, limits::LABEL));
                (Self { current }, Vec::new())
            }
            Activity::Links(anchors) => {
                let links = anchors
                    .iter()
                    .filter_map(|anchor| plan_anchor(anchor, self.current.clone()))
                    .collect();
                (self, links)
            }
        }
    }
}

fn plan_anchor(anchor: &RawAnchor, subsection: Option<String>) -> Option<PlannedLink> {
    match classify_link(anchor.href.as_deref()) {
        LinkKind::Ignored => None,
        kind => Some(PlannedLink {
            href: anchor.href.clone()?,
            text: anchor.text.clone(),
            kind,
            subsection,
        }),
    }
}

/// 一个章节内待解析的全部链接，按文档顺序排列。摘要区只接受直接链接。
pub fn plan_section(section: &RawSection) -> Vec<PlannedLink> {
    let (_, mut links) = section.activities.iter().fold(
        (SubsectionState::default(), Vec::new()),
        |(state, mut acc), activity| {
            let (next, found) = state.step(activity);
            acc.extend(found);
            (next, acc)
        },
    );

    links.extend(
        section
            .summary_anchors
            .iter()
            .filter_map(|anchor| plan_anchor(anchor, None))
            .filter(|link| link.kind == LinkKind::Direct),
    );
    links
}

/// 扫描期间的页面请求都经过这里：一旦令牌被取消，正在进行的请求立即以 `Superseded` 结束。
struct CancellableFetcher<'a> {
    inner: &'a dyn PageFetcher,
    token: &'a CancellationToken,
}

#[async_trait]
impl PageFetcher for CancellableFetcher<'_> {
    async fn fetch_page(&self, url: &str) -> AppResult<String> {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(AppError::Superseded),
            result = self.inner.fetch_page(url) => result,
        }
    }
}

pub struct CourseScanner {
    fetcher: Arc<dyn PageFetcher>,
    config: Arc<AppConfig>,
    token: CancellationToken,
}

impl CourseScanner {
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: Arc<AppConfig>) -> Self {
        Self {
            fetcher,
            config,
            token: CancellationToken::new(),
        }
    }

    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// 扫描一个课程页面，生成清单。
    ///
    /// 跳转页和文件夹的请求在整门课程范围内以 `max_workers` 为上限并发执行，
    /// 但结果按发现顺序收集，因此条目顺序与页面顺序一致。单个链接的失败只会跳过该条目。
    pub async fn scan(&self, page_url: &str, html: &str) -> AppResult<CourseManifest> {
        let base = Url::parse(page_url)?;
        let page = markup::parse_course_page(html, &base);

        let planned: Vec<(usize, PlannedLink)> = page
            .sections
            .iter()
            .enumerate()
            .flat_map(|(idx, section)| plan_section(section).into_iter().map(move |l| (idx, l)))
            .collect();
        info!(
            "课程页面 '{}' 共 {} 个章节，{} 个候选链接",
            page_url,
            page.sections.len(),
            planned.len()
        );

        let fetcher = CancellableFetcher {
            inner: self.fetcher.as_ref(),
            token: &self.token,
        };
        let resolved: Vec<(usize, Vec<FileEntry>)> = stream::iter(planned)
            .map(|(idx, link)| {
                let fetcher = &fetcher;
                async move { (idx, self.resolve_link(fetcher, link).await) }
            })
            .buffered(self.config.max_workers.max(1))
            .collect()
            .await;

        if self.token.is_cancelled() {
            warn!("课程 '{}' 的扫描已被取代，丢弃结果", page_url);
            return Err(AppError::Superseded);
        }

        let mut per_section: Vec<Vec<FileEntry>> = vec![Vec::new(); page.sections.len()];
        for (idx, entries) in resolved {
            per_section[idx].extend(entries);
        }

        let sections: Vec<Section> = page
            .sections
            .into_iter()
            .zip(per_section)
            .filter_map(|(raw, entries)| build_section(raw, entries))
            .collect();

        let manifest = CourseManifest {
            key: utils::course_key(page_url),
            page_url: page_url.to_string(),
            course_title: page.title,
            scanned_at: Utc::now(),
            sections,
        };
        info!(
            "课程 '{}' 扫描完成: {} 个章节，{} 个文件",
            manifest.key,
            manifest.sections.len(),
            manifest.file_count()
        );
        Ok(manifest)
    }

    async fn resolve_link(&self, fetcher: &dyn PageFetcher, link: PlannedLink) -> Vec<FileEntry> {
        let name = utils::sanitize_name(&link.text, limits::TOP_LEVEL_NAME);
        match link.kind {
            LinkKind::Direct => {
                vec![FileEntry::new(link.href, name, EntryKind::Direct).with_subsection(link.subsection)]
            }
            LinkKind::FolderLink => self.resolve_folder(fetcher, link, name).await,
            LinkKind::UrlIndirect => {
                let resolver = RedirectResolver::new(fetcher, &self.config.classification);
                match resolver.resolve(&link.href, self.config.defer_redirects).await {
                    Resolution::Resolved(target) => vec![
                        FileEntry::new(target, name, EntryKind::UrlIndirect)
                            .with_subsection(link.subsection),
                    ],
                    Resolution::Deferred(_) => {
                        let mut entry = FileEntry::new(link.href, name, EntryKind::UrlIndirect)
                            .with_subsection(link.subsection);
                        entry.needs_resolution = true;
                        vec![entry]
                    }
                    Resolution::Rejected(reason) => {
                        warn!("跳过跳转链接 '{}' ({}): {}", link.text, link.href, reason);
                        Vec::new()
                    }
                }
            }
            LinkKind::Ignored => Vec::new(),
        }
    }

    async fn resolve_folder(
        &self,
        fetcher: &dyn PageFetcher,
        link: PlannedLink,
        folder_name: String,
    ) -> Vec<FileEntry> {
        let expansion = if self.config.expand_folders {
            FolderExpander::new(fetcher).expand(&link.href).await
        } else {
            Resolution::Deferred(DeferReason::ExpansionDisabled)
        };

        match expansion {
            Resolution::Resolved(files) => files
                .into_iter()
                .map(|file| {
                    FileEntry::new(file.url, file.display_name, EntryKind::FolderExpanded)
                        .with_subsection(link.subsection.clone())
                        .with_folder(Some(folder_name.clone()))
                })
                .collect(),
            Resolution::Deferred(DeferReason::ExpansionDisabled) => vec![
                FileEntry::new(link.href, folder_name.clone(), EntryKind::FolderLink)
                    .with_subsection(link.subsection)
                    .with_folder(Some(folder_name)),
            ],
            Resolution::Deferred(reason) => {
                debug!("文件夹 '{}' 推迟展开: {:?}", folder_name, reason);
                vec![
                    FileEntry::new(link.href, folder_name.clone(), EntryKind::DeferredFolder)
                        .with_subsection(link.subsection)
                        .with_folder(Some(folder_name)),
                ]
            }
            Resolution::Rejected(reason) => {
                warn!("跳过文件夹 '{}' ({}): {}", folder_name, link.href, reason);
                Vec::new()
            }
        }
    }
}

/// 去重（保留第一次出现的条目）并决定章节是否保留：非空章节和第 0 章节保留。
fn build_section(raw: RawSection, entries: Vec<FileEntry>) -> Option<Section> {
    let files: Vec<FileEntry> = entries
        .into_iter()
        .unique_by(|entry| entry.source_url.clone())
        .collect();

    if files.is_empty() && raw.id != SECTION_ZERO_ID {
        debug!("章节 '{}' 没有可下载的文件，忽略", raw.title);
        return None;
    }

    Some(Section {
        sanitized_title: utils::sanitize_name(&raw.title, limits::SECTION_TITLE),
        id: raw.id,
        ordinal: raw.ordinal,
        title: raw.title,
        files,
    })
}
