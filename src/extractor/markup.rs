// src/extractor/markup.rs

//! 课程页面标记的读取。这里只做 DOM 遍历，把页面转换成与 HTML 无关的结构，
//! 之后的状态机和网络解析都只处理这些结构。

use crate::constants::markup as sel;
use log::{debug, trace};
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use url::Url;

static SECTION: LazyLock<Selector> = LazyLock::new(|| Selector::parse(sel::SECTION).unwrap());
static SECTION_TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(sel::SECTION_TITLE).unwrap());
static ACTIVITY: LazyLock<Selector> = LazyLock::new(|| Selector::parse(sel::ACTIVITY).unwrap());
static LABEL_CONTENT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(sel::LABEL_CONTENT).unwrap());
static LABEL_STRONG: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(sel::LABEL_STRONG).unwrap());
static ACTIVITY_NAME: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(sel::ACTIVITY_NAME).unwrap());
static SUMMARY_ANCHORS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(sel::SUMMARY_ANCHORS).unwrap());
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());
static FOLDER_FILE_ANCHORS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(sel::FOLDER_FILE_ANCHORS).unwrap());
static COURSE_TITLE: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    sel::COURSE_TITLE
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});

/// 页面上的一个链接。`href` 已按页面地址解析为绝对地址（无法解析时保留原值）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAnchor {
    pub href: Option<String>,
    pub text: String,
}

impl RawAnchor {
    pub fn new(href: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            href: Some(href.into()),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activity {
    /// 纯标题类活动，携带清理前的标题文本
    Label(Option<String>),
    Links(Vec<RawAnchor>),
}

#[derive(Debug, Clone)]
pub struct RawSection {
    pub id: String,
    pub ordinal: u32,
    pub title: String,
    pub activities: Vec<Activity>,
    pub summary_anchors: Vec<RawAnchor>,
}

#[derive(Debug, Clone)]
pub struct CoursePage {
    pub title: Option<String>,
    pub sections: Vec<RawSection>,
}

pub fn parse_course_page(html: &str, page_url: &Url) -> CoursePage {
    let document = Html::parse_document(html);

    let title = COURSE_TITLE
        .iter()
        .find_map(|selector| document.select(selector).map(element_text).find(|t| !t.is_empty()));

    let sections: Vec<RawSection> = document
        .select(&SECTION)
        .enumerate()
        .map(|(position, section)| read_section(section, position, page_url))
        .collect();

    debug!("课程页面解析出 {} 个章节，标题: {:?}", sections.len(), title);
    CoursePage { title, sections }
}

fn read_section(section: ElementRef, position: usize, page_url: &Url) -> RawSection {
    let id = section.value().attr("id").unwrap_or_default().to_string();
    let ordinal = id
        .strip_prefix(sel::SECTION_ID_PREFIX)
        .and_then(|n| n.parse::<u32>().ok())
        .unwrap_or(position as u32);

    let title = section
        .select(&SECTION_TITLE)
        .map(element_text)
        .find(|t| !t.is_empty())
        .unwrap_or_else(|| format!("Section {}", ordinal));

    let activities = section
        .select(&ACTIVITY)
        .map(|item| read_activity(item, page_url))
        .collect::<Vec<_>>();

    let summary_anchors = section
        .select(&SUMMARY_ANCHORS)
        .map(|a| read_anchor(a, page_url))
        .collect();

    trace!("章节 '{}' ({}) 含 {} 个活动", title, id, activities.len());
    RawSection {
        id,
        ordinal,
        title,
        activities,
        summary_anchors,
    }
}

fn read_activity(item: ElementRef, page_url: &Url) -> Activity {
    if item.value().has_class(sel::LABEL_CLASS, scraper::CaseSensitivity::CaseSensitive) {
        return Activity::Label(label_text(item));
    }
    Activity::Links(item.select(&ANCHOR).map(|a| read_anchor(a, page_url)).collect())
}

/// 标题文本的查找顺序：粗体文字、内容区文字、data 属性、活动名称
fn label_text(item: ElementRef) -> Option<String> {
    let from_content = item.select(&LABEL_CONTENT).next().and_then(|content| {
        content
            .select(&LABEL_STRONG)
            .map(element_text)
            .find(|t| !t.is_empty())
            .or_else(|| Some(element_text(content)).filter(|t| !t.is_empty()))
    });
    from_content
        .or_else(|| {
            item.value()
                .attr(sel::LABEL_NAME_ATTR)
                .map(|s| s.trim().to_string())
                .filter(|t| !t.is_empty())
        })
        .or_else(|| {
            item.select(&ACTIVITY_NAME)
                .map(element_text)
                .find(|t| !t.is_empty())
        })
}

fn read_anchor(anchor: ElementRef, page_url: &Url) -> RawAnchor {
    let href = anchor
        .value()
        .attr("href")
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(|h| resolve_href(page_url, h));

    let text = Some(element_text(anchor))
        .filter(|t| !t.is_empty())
        .or_else(|| {
            anchor
                .value()
                .attr("title")
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
        })
        .or_else(|| href.clone())
        .unwrap_or_default();

    RawAnchor { href, text }
}

/// 文件夹列表页中的所有直接文件链接
pub fn folder_file_anchors(html: &str, page_url: &Url) -> Vec<RawAnchor> {
    let document = Html::parse_document(html);
    document
        .select(&FOLDER_FILE_ANCHORS)
        .map(|a| read_anchor(a, page_url))
        .filter(|a| a.href.is_some())
        .collect()
}

pub fn resolve_href(page_url: &Url, href: &str) -> String {
    page_url
        .join(href)
        .map(String::from)
        .unwrap_or_else(|_| href.to_string())
}

/// 与 `textContent` 一致：文本节点直接拼接，再合并空白
pub(crate) fn element_text(element: ElementRef) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://lms.example.com/course/view.php?id=42").unwrap()
    }

    #[test]
    fn test_parse_sections_and_activities() {
        let html = r##"
            <html><head><title>Kurs</title></head><body>
            <div class="page-header-headings"><h1>Osnove programiranja</h1></div>
            <ul>
              <li id="section-0"><h3 class="sectionname"><a href="#">Opšte</a></h3>
                <div class="summary"><a href="/pluginfile.php/1/course/summary/plan.pdf">Plan rada</a></div>
              </li>
              <li id="section-1"><h3 class="sectionname">Nedelja 1</h3>
                <ul>
                  <li class="activity modtype_label" data-activityname="ignored">
                    <div class="activity-altcontent"><p><strong> Vežbe   1 </strong> opis</p></div>
                  </li>
                  <li class="activity modtype_resource">
                    <a href="/mod/resource/view.php?id=5"><span class="instancename">Skripta <span class="accesshide">Datoteka</span></span></a>
                  </li>
                  <li class="activity modtype_label" data-activityname="Vežbe 2"></li>
                  <li class="activity modtype_url"><a title="Link ka testu" href="../mod/url/view.php?id=9"></a></li>
                </ul>
              </li>
            </ul></body></html>"##;

        let page = parse_course_page(html, &base());
        assert_eq!(page.title.as_deref(), Some("Osnove programiranja"));
        assert_eq!(page.sections.len(), 2);

        let zero = &page.sections[0];
        assert_eq!(zero.ordinal, 0);
        assert_eq!(zero.title, "Opšte");
        assert_eq!(
            zero.summary_anchors,
            vec![RawAnchor::new(
                "https://lms.example.com/pluginfile.php/1/course/summary/plan.pdf",
                "Plan rada"
            )]
        );

        let first = &page.sections[1];
        assert_eq!(first.title, "Nedelja 1");
        assert_eq!(
            first.activities,
            vec![
                Activity::Label(Some("Vežbe 1".into())),
                Activity::Links(vec![RawAnchor::new(
                    "https://lms.example.com/mod/resource/view.php?id=5",
                    "Skripta Datoteka"
                )]),
                Activity::Label(Some("Vežbe 2".into())),
                Activity::Links(vec![RawAnchor::new(
                    "https://lms.example.com/mod/url/view.php?id=9",
                    "Link ka testu"
                )]),
            ]
        );
    }

    #[test]
    fn test_element_text_keeps_inline_markup_joined() {
        let html = r#"<ul><li id="section-1"><h3 class="sectionname">Ve<b>ž</b>be
            <em>i</em>   zadaci</h3><ul>
            <li class="activity modtype_resource"><a href="/mod/page/view.php?id=2">Sk<span>rip</span>ta</a></li>
        </ul></li></ul>"#;
        let page = parse_course_page(html, &base());
        let section = &page.sections[0];
        assert_eq!(section.title, "Vežbe i zadaci");
        assert_eq!(
            section.activities[0],
            Activity::Links(vec![RawAnchor::new(
                "https://lms.example.com/mod/page/view.php?id=2",
                "Skripta"
            )])
        );
    }

    #[test]
    fn test_missing_title_and_href() {
        let html = r#"<ul><li id="section-3"><ul>
            <li class="activity modtype_label"></li>
            <li class="activity modtype_forum"><a>bez linka</a></li>
        </ul></li></ul>"#;
        let page = parse_course_page(html, &base());
        let section = &page.sections[0];
        assert_eq!(section.title, "Section 3");
        assert_eq!(section.activities[0], Activity::Label(None));
        assert_eq!(
            section.activities[1],
            Activity::Links(vec![RawAnchor {
                href: None,
                text: "bez linka".into()
            }])
        );
    }

    #[test]
    fn test_folder_file_anchors() {
        let html = r#"<div class="foldertree">
            <a href="https://lms.example.com/pluginfile.php/7/mod_folder/content/0/a.pdf?forcedownload=1">a.pdf</a>
            <a href="/mod/folder/download_folder.php?id=3">Preuzmi</a>
            <a href="/pluginfile.php/7/mod_folder/content/0/b.docx"><img alt=""></a>
        </div>"#;
        let anchors = folder_file_anchors(html, &base());
        assert_eq!(anchors.len(), 2);
        assert_eq!(anchors[0].text, "a.pdf");
        assert_eq!(
            anchors[1].href.as_deref(),
            Some("https://lms.example.com/pluginfile.php/7/mod_folder/content/0/b.docx")
        );
    }
}
