// src/extractor/classifier.rs

use crate::constants::paths;
use log::trace;
use url::Url;

/// 按链接形态区分的类别，不访问网络
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Direct,
    FolderLink,
    UrlIndirect,
    Ignored,
}

pub fn classify_link(href: Option<&str>) -> LinkKind {
    let Some(href) = href else {
        return LinkKind::Ignored;
    };
    let Ok(url) = Url::parse(href) else {
        trace!("无法解析的链接，忽略: {}", href);
        return LinkKind::Ignored;
    };
    if !matches!(url.scheme(), "http" | "https") {
        return LinkKind::Ignored;
    }

    let path = url.path();
    if path.contains(paths::PLUGINFILE) || paths::DIRECT_MODULES.iter().any(|m| path.contains(m)) {
        LinkKind::Direct
    } else if path.contains(paths::FOLDER_MODULE) {
        LinkKind::FolderLink
    } else if path.contains(paths::URL_MODULE) {
        LinkKind::UrlIndirect
    } else {
        LinkKind::Ignored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_path() {
        let cases = [
            ("https://lms.example.com/pluginfile.php/3/mod_resource/content/1/a.pdf", LinkKind::Direct),
            ("https://lms.example.com/mod/resource/view.php?id=1", LinkKind::Direct),
            ("https://lms.example.com/mod/book/view.php?id=2", LinkKind::Direct),
            ("https://lms.example.com/mod/page/view.php?id=3", LinkKind::Direct),
            ("https://lms.example.com/mod/folder/view.php?id=4", LinkKind::FolderLink),
            ("https://lms.example.com/mod/url/view.php?id=5", LinkKind::UrlIndirect),
            ("https://lms.example.com/mod/forum/view.php?id=6", LinkKind::Ignored),
            ("https://lms.example.com/course/view.php?id=42#section-2", LinkKind::Ignored),
        ];
        for (href, expected) in cases {
            assert_eq!(classify_link(Some(href)), expected, "{}", href);
        }
    }

    #[test]
    fn test_malformed_or_missing_links_are_ignored() {
        assert_eq!(classify_link(None), LinkKind::Ignored);
        assert_eq!(classify_link(Some("/mod/resource/view.php?id=1")), LinkKind::Ignored);
        assert_eq!(classify_link(Some("http://[::1")), LinkKind::Ignored);
        assert_eq!(classify_link(Some("javascript:void(0)")), LinkKind::Ignored);
        assert_eq!(classify_link(Some("mailto:prof@example.com")), LinkKind::Ignored);
    }
}
