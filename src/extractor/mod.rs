// src/extractor/mod.rs

//! 课程页面扫描：标记读取、链接分类、跳转页与文件夹解析，以及把它们串起来的章节扫描器。

pub mod classifier;
pub mod folder;
pub mod gdoc;
pub mod markup;
pub mod redirector;
pub mod section;

pub use folder::{FolderExpander, FolderFile};
pub use redirector::RedirectResolver;
pub use section::{CourseScanner, SubsectionState};
