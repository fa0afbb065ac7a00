// src/symbols.rs

use colored::{ColoredString, Colorize};
use std::sync::LazyLock;

pub static OK: LazyLock<ColoredString> = LazyLock::new(|| "[OK]".green());
pub static ERROR: LazyLock<ColoredString> = LazyLock::new(|| "[X]".red());
pub static INFO: LazyLock<ColoredString> = LazyLock::new(|| "[i]".cyan());
pub static WARN: LazyLock<ColoredString> = LazyLock::new(|| "[!]".yellow());
pub static CTRL_C: LazyLock<ColoredString> = LazyLock::new(|| "Ctrl+C".yellow());

// 清单列表中的条目标记
pub static DEFERRED_FOLDER: LazyLock<ColoredString> =
    LazyLock::new(|| "(文件夹，下载时展开)".yellow());
pub static UNEXPANDED_FOLDER: LazyLock<ColoredString> =
    LazyLock::new(|| "(文件夹，未展开)".yellow());
pub static DEFERRED_REDIRECT: LazyLock<ColoredString> =
    LazyLock::new(|| "(跳转链接，下载时解析)".yellow());
