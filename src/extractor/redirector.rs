// src/extractor/redirector.rs

use super::markup::{element_text, resolve_href};
use crate::{
    client::PageFetcher,
    config::ClassificationConfig,
    constants::markup as sel,
    error::ResolveError,
    models::{DeferReason, Resolution},
    utils,
};
use log::{debug, warn};
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use url::Url;

static WINDOW_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)window\.open\(\s*['"]([^'"]+)['"]"#).unwrap());
static LOCATION_HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)location\.href\s*=\s*['"]([^'"]+)['"]"#).unwrap());
static WORKAROUND_ANCHORS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(sel::WORKAROUND_ANCHORS).unwrap());
static ANCHORS_WITH_HREF: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").unwrap());
static IFRAME: LazyLock<Selector> = LazyLock::new(|| Selector::parse(sel::IFRAME).unwrap());

/// 从跳转页中提取真实目标地址，按固定优先级匹配，第一个命中即返回。
pub fn extract_target(html: &str, page_url: &Url) -> Option<String> {
    let document = Html::parse_document(html);

    let raw = document
        .select(&WORKAROUND_ANCHORS)
        .find_map(|a| a.value().attr("href"))
        .map(str::to_string)
        .or_else(|| capture(&WINDOW_OPEN_RE, html))
        .or_else(|| {
            document
                .select(&ANCHORS_WITH_HREF)
                .find(|a| element_text(*a).to_lowercase().contains(sel::OPEN_RESOURCE_PHRASE))
                .and_then(|a| a.value().attr("href"))
                .map(str::to_string)
        })
        .or_else(|| capture(&LOCATION_HREF_RE, html))
        .or_else(|| {
            document
                .select(&IFRAME)
                .find_map(|f| f.value().attr("src"))
                .map(str::to_string)
        })?;

    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    Some(resolve_href(page_url, raw))
}

fn capture(re: &Regex, html: &str) -> Option<String> {
    re.captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().replace("&amp;", "&"))
}

fn host_matches(host: &str, pattern: &str) -> bool {
    host == pattern || host.ends_with(&format!(".{}", pattern))
}

/// 判断解析出的目标是否值得下载：视频平台一律排除，
/// 其余只接受文档扩展名或云文档服务。
pub fn classify_target(target: &str, rules: &ClassificationConfig) -> Result<String, ResolveError> {
    let url = Url::parse(target).map_err(|e| ResolveError::MalformedUrl(format!("{} ({})", target, e)))?;
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();

    if rules.video_hosts.iter().any(|p| host_matches(&host, p)) {
        return Err(ResolveError::ClassificationReject(format!("视频平台 {}", host)));
    }

    let is_document = utils::url_extension(target).is_some_and(|ext| {
        rules
            .document_extensions
            .iter()
            .any(|d| ext.trim_start_matches('.').eq_ignore_ascii_case(d))
    });
    if is_document || rules.cloud_document_hosts.iter().any(|p| host_matches(&host, p)) {
        return Ok(url.to_string());
    }
    Err(ResolveError::ClassificationReject(format!("非文档链接 {}", target)))
}

pub struct RedirectResolver<'a> {
    fetcher: &'a dyn PageFetcher,
    rules: &'a ClassificationConfig,
}

impl<'a> RedirectResolver<'a> {
    pub fn new(fetcher: &'a dyn PageFetcher, rules: &'a ClassificationConfig) -> Self {
        Self { fetcher, rules }
    }

    /// `defer` 为真时只确认目标是文件，返回 `Deferred`，真实地址留到下载时再提取。
    pub async fn resolve(&self, url: &str, defer: bool) -> Resolution<String> {
        let page_url = match Url::parse(url) {
            Ok(u) => u,
            Err(e) => return Resolution::Rejected(ResolveError::MalformedUrl(format!("{} ({})", url, e))),
        };
        let body = match self.fetcher.fetch_page(url).await {
            Ok(body) => body,
            Err(e) => {
                warn!("跳转页 '{}' 获取失败: {}", url, e);
                return Resolution::Rejected(ResolveError::from(&e));
            }
        };

        let Some(target) = extract_target(&body, &page_url) else {
            warn!("跳转页 '{}' 中未找到目标链接", url);
            return Resolution::Rejected(ResolveError::ExtractionMiss);
        };

        match classify_target(&target, self.rules) {
            Ok(_) if defer => {
                debug!("跳转页 '{}' 指向文件，推迟解析", url);
                Resolution::Deferred(DeferReason::ResolveAtRetrieval)
            }
            Ok(target) => {
                debug!("跳转页 '{}' 解析为 '{}'", url, target);
                Resolution::Resolved(target)
            }
            Err(reason) => {
                warn!("跳转页 '{}' 的目标被排除: {}", url, reason);
                Resolution::Rejected(reason)
            }
        }
    }
}
