// src/utils.rs

use crate::{constants, error::*};
use anyhow::Context;
use md5::{Digest, Md5};
use regex::Regex;
use std::sync::LazyLock;
use std::{
    collections::BTreeSet,
    path::{Component, Path, PathBuf},
};
use url::Url;

static HOSTILE_CHARS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"[/\\?%*:|"<>]"#).unwrap());
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static NOISE_WORDS_RE: LazyLock<Regex> = LazyLock::new(|| {
    let alternatives = constants::NOISE_WORDS
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives)).unwrap()
});

const UNNAMED: &str = "unnamed";

/// 把任意文本清理成可用作路径段的名称，结果最多 `max_chars` 个字符。
///
/// 非法字符替换为 `_`，去掉页面上的类型标签（"Datoteka"、"URL" 等），
/// 合并空白，去掉首尾的分隔符。空结果回退为 `unnamed`。
pub fn sanitize_name(name: &str, max_chars: usize) -> String {
    let mut current = sanitize_pass(name, max_chars);
    // 截断可能暴露出新的首尾分隔符或标签词，反复清理直到不再变化
    loop {
        let next = sanitize_pass(&current, max_chars);
        if next == current {
            break;
        }
        current = next;
    }
    if current.is_empty() {
        return truncate_chars(UNNAMED, max_chars).to_string();
    }
    current
}

fn sanitize_pass(name: &str, max_chars: usize) -> String {
    let name = NOISE_WORDS_RE.replace_all(name, "");
    let name = HOSTILE_CHARS_RE.replace_all(&name, "_");
    let name = WHITESPACE_RE.replace_all(&name, " ");
    let name = trim_separators(&name);
    trim_separators(truncate_chars(name, max_chars)).to_string()
}

fn trim_separators(s: &str) -> &str {
    s.trim_matches(|c: char| c == '-' || c == '_' || c == '.' || c.is_whitespace())
}

fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// 链接路径最后一段（已解码），用作缺省显示名
pub fn file_name_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last = parsed.path_segments()?.filter(|s| !s.is_empty()).next_back()?;
    let decoded = percent_encoding::percent_decode_str(last)
        .decode_utf8_lossy()
        .to_string();
    Some(decoded)
}

/// 链接路径中的文件扩展名（含点，小写）
pub fn url_extension(url: &str) -> Option<String> {
    let name = file_name_from_url(url)?;
    let ext = Path::new(&name).extension()?.to_str()?;
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(format!(".{}", ext.to_ascii_lowercase()))
}

pub fn ends_with_ignore_case(name: &str, suffix: &str) -> bool {
    name.len() >= suffix.len()
        && name.is_char_boundary(name.len() - suffix.len())
        && name[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}

/// 课程页面对应的清单键：`course_<路径>[?<查询串>]`
///
/// 课程页通常共用 `/course/view.php`，课程 id 在查询串里，所以一并保留。
pub fn course_key(page_url: &str) -> String {
    match Url::parse(page_url) {
        Ok(url) => match url.query() {
            Some(query) => format!("course_{}?{}", url.path(), query),
            None => format!("course_{}", url.path()),
        },
        Err(_) => format!("course_{}", page_url),
    }
}

pub fn key_digest(key: &str) -> String {
    hex::encode(Md5::digest(key.as_bytes()))
}

pub fn truncate_text(text: &str, max_width: usize) -> String {
    let mut width = 0;
    let mut end_pos = 0;
    for (i, c) in text.char_indices() {
        width += if c.is_ascii() { 1 } else { 2 };
        if width > max_width.saturating_sub(3) {
            end_pos = i;
            break;
        }
    }
    if end_pos == 0 { text.to_string() } else { format!("{}...", &text[..end_pos]) }
}

pub fn parse_selection_indices(selection_str: &str, total_items: usize) -> Vec<usize> {
    if selection_str.to_lowercase() == "all" { return (0..total_items).collect(); }
    let mut indices = BTreeSet::new();
    for part in selection_str.split(',').map(|s| s.trim()) {
        if part.is_empty() { continue; }
        if let Some(range_part) = part.split_once('-') {
            if let (Ok(start), Ok(end)) = (range_part.0.parse::<usize>(), range_part.1.parse::<usize>()) {
                if start == 0 || end == 0 { continue; }
                let (min, max) = (start.min(end), start.max(end));
                for i in min..=max {
                    if i > 0 && i <= total_items { indices.insert(i - 1); }
                }
            }
        } else if let Ok(num) = part.parse::<usize>() {
            if num > 0 && num <= total_items { indices.insert(num - 1); }
        }
    }
    indices.into_iter().collect()
}

pub fn secure_join_path(base_dir: &Path, relative_path: &Path) -> AppResult<PathBuf> {
    let resolved_base = dunce::canonicalize(base_dir).with_context(|| format!("基础目录 '{:?}' 不存在或无法访问", base_dir))?;
    let mut final_path = resolved_base.clone();
    for component in relative_path.components() {
        match component {
            Component::Normal(part) => final_path.push(part),
            Component::ParentDir => return Err(AppError::Security("检测到路径遍历 '..' ".to_string())),
            _ => continue,
        }
    }
    if !final_path.starts_with(&resolved_base) {
        return Err(AppError::Security(format!("路径遍历攻击检测: '{:?}'", relative_path)));
    }
    Ok(final_path)
}
