// src/extractor/gdoc.rs

use crate::utils;
use regex::Regex;
use std::sync::LazyLock;

static VIEWER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://docs\.google\.com/(document|spreadsheets|presentation)/d/([A-Za-z0-9_-]+)(.*)$")
        .unwrap()
});

/// 把 Google 文档/表格/演示文稿的查看链接改写为导出链接，并给名称补上对应扩展名。
///
/// 已经是导出链接时原样返回，因此重复调用没有副作用。
pub fn canonicalize(url: &str, display_name: &str) -> (String, String) {
    let Some(caps) = VIEWER_RE.captures(url) else {
        return (url.to_string(), display_name.to_string());
    };
    let rest = &caps[3];
    let is_viewer_shape = rest.is_empty() || rest.starts_with(['/', '?', '#']);
    if !is_viewer_shape || rest.starts_with("/export") {
        return (url.to_string(), display_name.to_string());
    }

    let id = &caps[2];
    let (export_url, ext) = match &caps[1] {
        "document" => (
            format!("https://docs.google.com/document/d/{}/export?format=pdf", id),
            ".pdf",
        ),
        "spreadsheets" => (
            format!("https://docs.google.com/spreadsheets/d/{}/export?format=xlsx", id),
            ".xlsx",
        ),
        _ => (
            format!("https://docs.google.com/presentation/d/{}/export/pptx", id),
            ".pptx",
        ),
    };

    let name = if utils::ends_with_ignore_case(display_name, ext) {
        display_name.to_string()
    } else {
        format!("{}{}", display_name, ext)
    };
    (export_url, name)
}
