// src/downloader/planner.rs

use crate::{
    client::PageFetcher,
    config::AppConfig,
    constants::{self, limits, paths},
    extractor::{FolderExpander, RedirectResolver, gdoc},
    models::{CourseManifest, DownloadTask, FileEntry, Resolution, Section},
    utils,
};
use futures::{StreamExt, stream};
use log::{debug, info, warn};
use std::path::PathBuf;

/// 下载前的第二轮解析结果：可直接交给下载端的任务，以及未能解析的条目及原因。
#[derive(Debug, Default)]
pub struct PlannedDownloads {
    pub tasks: Vec<DownloadTask>,
    pub unresolved: Vec<(String, String)>,
}

/// 课程目录名：命令行指定的名称优先，其次是页面标题。
pub fn course_dir_name(course_name: Option<&str>, manifest: &CourseManifest) -> String {
    course_name
        .or(manifest.course_title.as_deref())
        .map(|name| utils::sanitize_name(name, limits::TOP_LEVEL_NAME))
        .unwrap_or_else(|| constants::DEFAULT_COURSE_NAME.to_string())
}

/// 确定最终的下载地址与文件名：Google 文档改写为导出链接，
/// 模块页面保存为 `.html`，其余补上链接中的扩展名。
pub fn finalize_name(url: &str, display_name: &str) -> (String, String) {
    let (url, name) = gdoc::canonicalize(url, display_name);

    let is_html_page = paths::HTML_PAGES.iter().any(|p| url.contains(p));
    let suffix = if is_html_page {
        Some(".html".to_string())
    } else {
        // `view.php` 之类的脚本扩展名不是文件类型，由下载端根据最终地址补全
        utils::url_extension(&url).filter(|ext| ext != ".php")
    };

    let name = match suffix {
        Some(ext) if !utils::ends_with_ignore_case(&name, &ext) => format!("{}{}", name, ext),
        _ => name,
    };
    (url, name)
}

/// `{课程}/{章节}/[{文件夹或小节}/]{名称}`；同时带有文件夹名和小节名时取文件夹名。
pub fn relative_path(course_dir: &str, section: &Section, segment: Option<&str>, name: &str) -> PathBuf {
    let mut path = PathBuf::from(course_dir);
    path.push(&section.sanitized_title);
    if let Some(segment) = segment {
        path.push(segment);
    }
    path.push(name);
    path
}

pub struct RetrievalPlanner<'a> {
    fetcher: &'a dyn PageFetcher,
    config: &'a AppConfig,
}

impl<'a> RetrievalPlanner<'a> {
    pub fn new(fetcher: &'a dyn PageFetcher, config: &'a AppConfig) -> Self {
        Self { fetcher, config }
    }

    /// 对选中的条目逐个生成下载任务。需要联网的条目（推迟的文件夹、推迟的跳转链接）
    /// 并发处理，彼此独立，单个失败不影响其他条目；结果仍按清单顺序排列。
    pub async fn plan(&self, course_dir: &str, entries: &[(&Section, &FileEntry)]) -> PlannedDownloads {
        let mut outcomes: Vec<(usize, Result<Vec<DownloadTask>, String>)> =
            stream::iter(entries.iter().enumerate())
                .map(|(idx, &(section, entry))| async move {
                    (idx, self.plan_entry(course_dir, section, entry).await)
                })
                .buffer_unordered(self.config.max_workers.max(1))
                .collect()
                .await;
        outcomes.sort_by_key(|(idx, _)| *idx);

        let mut planned = PlannedDownloads::default();
        for (idx, outcome) in outcomes {
            match outcome {
                Ok(tasks) => planned.tasks.extend(tasks),
                Err(reason) => {
                    let (section, entry) = entries[idx];
                    let name = format!("{}/{}", section.sanitized_title, entry.display_name);
                    warn!("条目 '{}' 无法解析，跳过: {}", name, reason);
                    planned.unresolved.push((name, reason));
                }
            }
        }
        info!(
            "下载计划: {} 个任务，{} 个条目未能解析",
            planned.tasks.len(),
            planned.unresolved.len()
        );
        planned
    }

    async fn plan_entry(
        &self,
        course_dir: &str,
        section: &Section,
        entry: &FileEntry,
    ) -> Result<Vec<DownloadTask>, String> {
        if entry.kind.needs_expansion() {
            return self.expand_folder(course_dir, section, entry).await;
        }

        let url = if entry.needs_resolution {
            let resolver = RedirectResolver::new(self.fetcher, &self.config.classification);
            match resolver.resolve(&entry.source_url, false).await {
                Resolution::Resolved(target) => target,
                Resolution::Deferred(reason) => return Err(format!("{:?}", reason)),
                Resolution::Rejected(reason) => return Err(reason.to_string()),
            }
        } else {
            entry.source_url.clone()
        };

        let (url, name) = finalize_name(&url, &entry.display_name);
        let segment = entry.folder_name.as_deref().or(entry.subsection.as_deref());
        Ok(vec![DownloadTask {
            url,
            filename: relative_path(course_dir, section, segment, &name),
        }])
    }

    async fn expand_folder(
        &self,
        course_dir: &str,
        section: &Section,
        entry: &FileEntry,
    ) -> Result<Vec<DownloadTask>, String> {
        let folder = entry
            .folder_name
            .clone()
            .unwrap_or_else(|| entry.display_name.clone());
        debug!("下载前展开文件夹 '{}' ({:?})", folder, entry.kind);

        match FolderExpander::new(self.fetcher).expand(&entry.source_url).await {
            Resolution::Resolved(files) => Ok(files
                .into_iter()
                .map(|file| {
                    let (url, name) = finalize_name(&file.url, &file.display_name);
                    DownloadTask {
                        url,
                        filename: relative_path(course_dir, section, Some(&folder), &name),
                    }
                })
                .collect()),
            Resolution::Deferred(reason) => Err(format!("文件夹仍无法展开: {:?}", reason)),
            Resolution::Rejected(reason) => Err(reason.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{client::testing::StaticFetcher, models::EntryKind};
    use chrono::Utc;
    use std::path::Path;

    fn section(files: Vec<FileEntry>) -> Section {
        Section {
            id: "section-1".into(),
            ordinal: 1,
            title: "Nedelja 1".into(),
            sanitized_title: "Nedelja 1".into(),
            files,
        }
    }

    #[test]
    fn test_finalize_name() {
        assert_eq!(
            finalize_name("https://docs.google.com/document/d/ID/edit", "Zadatak"),
            (
                "https://docs.google.com/document/d/ID/export?format=pdf".to_string(),
                "Zadatak.pdf".to_string()
            )
        );
        assert_eq!(
            finalize_name("https://lms.example.com/mod/page/view.php?id=3", "Uvod").1,
            "Uvod.html"
        );
        assert_eq!(
            finalize_name("https://lms.example.com/pluginfile.php/1/a/Skripta.PDF", "Skripta").1,
            "Skripta.pdf"
        );
        assert_eq!(
            finalize_name("https://lms.example.com/pluginfile.php/1/a/Skripta.pdf", "Skripta.PDF").1,
            "Skripta.PDF"
        );
        assert_eq!(
            finalize_name("https://lms.example.com/mod/resource/view.php?id=5", "Skripta").1,
            "Skripta"
        );
    }

    #[test]
    fn test_course_dir_name() {
        let manifest = CourseManifest {
            key: "course_/course/view.php?id=1".into(),
            page_url: "https://lms.example.com/course/view.php?id=1".into(),
            course_title: Some("Algoritmi: osnove".into()),
            scanned_at: Utc::now(),
            sections: vec![],
        };
        assert_eq!(course_dir_name(None, &manifest), "Algoritmi_ osnove");
        assert_eq!(course_dir_name(Some("Moj kurs"), &manifest), "Moj kurs");
        let untitled = CourseManifest {
            course_title: None,
            ..manifest
        };
        assert_eq!(course_dir_name(None, &untitled), constants::DEFAULT_COURSE_NAME);
    }

    #[tokio::test]
    async fn test_plan_paths_and_isolated_failures() {
        let good_folder = "https://lms.example.com/mod/folder/view.php?id=1";
        let bad_folder = "https://lms.example.com/mod/folder/view.php?id=2";
        let redirect = "https://lms.example.com/mod/url/view.php?id=3";
        let fetcher = StaticFetcher::new()
            .page(good_folder, r#"<a href="/pluginfile.php/4/mod_folder/content/0/a.pdf">a.pdf</a>"#)
            .page(redirect, r#"<div class="urlworkaround"><a href="https://example.org/r.docx">r</a></div>"#);
        let config = AppConfig::default();

        let mut deferred_redirect =
            FileEntry::new(redirect.into(), "Rok".into(), EntryKind::UrlIndirect)
                .with_subsection(Some("Ispit".into()));
        deferred_redirect.needs_resolution = true;

        let sec = section(vec![
            FileEntry::new(
                "https://lms.example.com/pluginfile.php/9/b.pdf".into(),
                "Uvod".into(),
                EntryKind::Direct,
            )
            .with_subsection(Some("Vežbe 1".into())),
            FileEntry::new(good_folder.into(), "Zadaci".into(), EntryKind::DeferredFolder)
                .with_subsection(Some("Vežbe 1".into()))
                .with_folder(Some("Zadaci".into())),
            FileEntry::new(bad_folder.into(), "Stari".into(), EntryKind::FolderLink)
                .with_folder(Some("Stari".into())),
            deferred_redirect,
        ]);
        let entries: Vec<(&Section, &FileEntry)> = sec.files.iter().map(|f| (&sec, f)).collect();

        let planned = RetrievalPlanner::new(&fetcher, &config)
            .plan("Algoritmi", &entries)
            .await;

        let paths: Vec<&Path> = planned.tasks.iter().map(|t| t.filename.as_path()).collect();
        assert_eq!(
            paths,
            vec![
                Path::new("Algoritmi/Nedelja 1/Vežbe 1/Uvod.pdf"),
                Path::new("Algoritmi/Nedelja 1/Zadaci/a.pdf"),
                Path::new("Algoritmi/Nedelja 1/Ispit/Rok.docx"),
            ]
        );
        assert_eq!(planned.tasks[2].url, "https://example.org/r.docx");
        assert_eq!(planned.unresolved.len(), 1);
        assert_eq!(planned.unresolved[0].0, "Nedelja 1/Stari");
    }
}
