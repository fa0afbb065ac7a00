// src/cli.rs

use crate::constants;
use clap::{Parser, ValueEnum, command, crate_version};
use std::path::PathBuf;

/// 定义日志输出级别
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

// command 属性
#[derive(Parser, Debug, Clone)]
#[command(
    version = crate_version!(),
    about,
    long_about = None,
    arg_required_else_help = true,
    disable_help_flag = true,
    disable_version_flag = true,
)]
#[command(group(
    clap::ArgGroup::new("mode")
        .required(true)
        .args(&["url", "html_file", "batch_file"]),
))]
pub struct Cli {
    // --- 运行模式 (Mode) ---
    /// 指定要扫描的课程页面链接
    #[arg(long, help_heading = "Mode")]
    pub url: Option<String>,
    /// 扫描本地保存的课程页面 (需配合 --base-url 使用)
    #[arg(long, value_name = "FILE", help_heading = "Mode", requires = "base_url")]
    pub html_file: Option<PathBuf>,
    /// 从文本文件批量处理多个课程链接 (每行一个)
    #[arg(short, long, value_name = "FILE", help_heading = "Mode")]
    pub batch_file: Option<PathBuf>,

    // --- 扫描选项 (Scan) ---
    /// [本地文件模式] 课程页面原始地址，用于解析相对链接
    #[arg(long, value_name = "URL", help_heading = "Scan")]
    pub base_url: Option<String>,
    /// 只扫描并打印文件清单，不下载
    #[arg(long, action = clap::ArgAction::SetTrue, help_heading = "Scan")]
    pub list: bool,
    /// 直接使用上次保存的清单，不重新扫描
    #[arg(long, action = clap::ArgAction::SetTrue, help_heading = "Scan")]
    pub from_manifest: bool,
    /// 跳转链接只校验是否为文件，真实地址推迟到下载时再解析
    #[arg(long, action = clap::ArgAction::SetTrue, help_heading = "Scan")]
    pub defer_redirects: bool,
    /// 扫描时不展开文件夹，推迟到下载时再展开
    #[arg(long, action = clap::ArgAction::SetTrue, help_heading = "Scan")]
    pub no_expand_folders: bool,
    /// 提供会话 Cookie (例如 'MoodleSession=...')，优先级最高
    #[arg(long, help_heading = "Scan")]
    pub cookie: Option<String>,
    /// 设置单个请求的超时时间 (秒)
    #[arg(long, value_name = "SECS", help_heading = "Scan")]
    pub timeout: Option<u64>,

    // --- 下载选项 (Options) ---
    /// 指定下载项 (例如 '1-5,8', 'all')
    #[arg(long, default_value_t = constants::DEFAULT_SELECTION.to_string(), value_name = "SELECTION", help_heading = "Options")]
    pub select: String,
    /// 课程目录名称 (默认使用页面标题)
    #[arg(long, value_name = "NAME", help_heading = "Options")]
    pub course_name: Option<String>,
    /// 只打印下载任务 (JSON)，不实际下载
    #[arg(long, action = clap::ArgAction::SetTrue, help_heading = "Options")]
    pub dry_run: bool,
    /// 强制重新下载已存在的文件
    #[arg(short, long, action = clap::ArgAction::SetTrue, help_heading = "Options")]
    pub force_redownload: bool,
    /// 设置最大并发请求数
    #[arg(short, long, value_parser = clap::value_parser!(usize), help_heading = "Options")]
    pub workers: Option<usize>,
    /// 设置文件保存目录
    #[arg(short, long, value_name = "DIR", default_value_os_t = PathBuf::from(constants::DEFAULT_SAVE_DIR), help_heading = "Options")]
    pub output: PathBuf,

    // --- 通用选项 (General) ---
    /// 显示此帮助信息并退出
    #[arg(short = 'h', long, action = clap::ArgAction::Help, global = true, help_heading = "General")]
    _help: Option<bool>,
    /// 显示版本信息并退出
    #[arg(short = 'V', long, action = clap::ArgAction::Version, global = true, help_heading = "General")]
    _version: Option<bool>,
    /// (隐藏参数) 设置日志文件的输出级别，用于调试
    #[arg(long, value_enum, default_value_t = LogLevel::Off, global = true, hide = true)]
    pub log_level: LogLevel,
}
