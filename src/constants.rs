// src/constants.rs

pub const UI_WIDTH: usize = 88;
pub const FILENAME_TRUNCATE_LENGTH: usize = 65;
pub const CONFIG_DIR_NAME: &str = concat!(".", clap::crate_name!());
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const MANIFEST_DIR_NAME: &str = "manifests";
pub const LOG_FILE_NAME: &str = concat!(clap::crate_name!(), ".log");
pub const LOG_FALLBACK_FILE_NAME: &str = "fallback.log";
pub const DEFAULT_SAVE_DIR: &str = "downloads";
pub const DEFAULT_COURSE_NAME: &str = "MyCourse";
pub const DEFAULT_SELECTION: &str = "all";
pub const DEFAULT_WORKERS: usize = 6;
pub const MAX_WORKERS: usize = 16;
pub const COOKIE_ENV_VAR: &str = "COURSE_DL_COOKIE";
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// 文件名长度上限（按字符计）
pub mod limits {
    pub const TOP_LEVEL_NAME: usize = 100;
    pub const NESTED_NAME: usize = 200;
    pub const SECTION_TITLE: usize = 50;
    pub const LABEL: usize = 100;
}

/// 课程页面的标记约定
pub mod markup {
    /// 按优先级依次尝试
    pub const COURSE_TITLE: [&str; 3] = [".page-header-headings h1", "h1", "title"];
    pub const SECTION: &str = r#"li[id^="section-"]"#;
    pub const SECTION_ID_PREFIX: &str = "section-";
    pub const SECTION_ZERO_ID: &str = "section-0";
    pub const SECTION_TITLE: &str = ".sectionname a, .sectionname";
    pub const ACTIVITY: &str = "li.activity";
    pub const LABEL_CLASS: &str = "modtype_label";
    pub const LABEL_CONTENT: &str = ".activity-altcontent";
    pub const LABEL_STRONG: &str = "strong";
    pub const LABEL_NAME_ATTR: &str = "data-activityname";
    pub const ACTIVITY_NAME: &str = ".activityname";
    pub const SUMMARY_ANCHORS: &str = ".summarytext a, .summary a, .no-overflow a";
    pub const FOLDER_FILE_ANCHORS: &str = r#"a[href*="/pluginfile.php"]"#;
    pub const WORKAROUND_ANCHORS: &str = ".urlworkaround a[href]";
    pub const IFRAME: &str = "iframe[src]";
    pub const OPEN_RESOURCE_PHRASE: &str = "click here to open resource";
}

/// 课程模块的 URL 路径特征
pub mod paths {
    pub const PLUGINFILE: &str = "/pluginfile.php";
    pub const DIRECT_MODULES: [&str; 3] = ["/mod/resource/", "/mod/book/", "/mod/page/"];
    pub const FOLDER_MODULE: &str = "/mod/folder/";
    pub const URL_MODULE: &str = "/mod/url/";
    pub const HTML_PAGES: [&str; 3] = [
        "/mod/page/view.php",
        "/mod/book/view.php",
        "/mod/folder/view.php",
    ];
}

/// 页面中常见的无意义类型标签（塞尔维亚语与英语）
pub const NOISE_WORDS: [&str; 7] = [
    "URL adresa",
    "Stranica",
    "Datoteka",
    "Direktorijum",
    "Direktorijujm",
    "Folder",
    "URL",
];

pub mod classification {
    pub const VIDEO_HOSTS: [&str; 5] = [
        "youtube.com",
        "youtu.be",
        "vimeo.com",
        "twitch.tv",
        "dailymotion.com",
    ];
    pub const DOCUMENT_EXTENSIONS: [&str; 11] = [
        "pdf", "doc", "docx", "ppt", "pptx", "xls", "xlsx", "txt", "rtf", "zip", "rar",
    ];
    pub const CLOUD_DOCUMENT_HOSTS: [&str; 6] = [
        "docs.google.com",
        "drive.google.com",
        "dropbox.com",
        "onedrive.com",
        "onedrive.live.com",
        "storage.googleapis.com",
    ];
}
