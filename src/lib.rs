// src/lib.rs

pub mod cli;
pub mod client;
pub mod config;
pub mod constants;
pub mod downloader;
pub mod error;
pub mod extractor;
pub mod manifest;
pub mod models;
pub mod symbols;
pub mod ui;
pub mod utils;
mod workflows;

use crate::{
    cli::Cli,
    client::RobustClient,
    config::AppConfig,
    downloader::DownloadManager,
    error::AppResult,
    manifest::{ManifestStore, ScanRegistry},
};
use log::{debug, info};
use std::sync::{Arc, atomic::AtomicBool};

/// 核心的执行上下文，包含所有任务所需的状态和工具
#[derive(Clone)]
pub struct CourseJobContext {
    pub manager: DownloadManager,
    pub config: Arc<AppConfig>,
    pub http_client: Arc<RobustClient>,
    pub args: Arc<Cli>,
    pub store: Arc<ManifestStore>,
    pub registry: Arc<ScanRegistry>,
    pub cancellation_token: Arc<AtomicBool>,
}

/// 库的公共入口点，由 `main.rs` 调用
pub async fn run_from_cli(args: Arc<Cli>, cancellation_token: Arc<AtomicBool>) -> AppResult<()> {
    debug!("CLI 参数: {:?}", args);

    let config = Arc::new(AppConfig::new(&args)?);
    debug!("加载的应用配置: {:?}", config);

    let (cookie, source) = config::session::resolve_cookie(args.cookie.as_deref());
    if cookie.is_some() {
        info!("从 {} 加载会话 Cookie", source);
        ui::info(&format!("已从 {} 加载会话 Cookie。", source));
    } else {
        info!("未找到会话 Cookie，以访客身份访问");
        ui::warn("未找到会话 Cookie，只能访问对访客开放的课程。");
    }

    let http_client = Arc::new(RobustClient::new(config.clone(), cookie.as_deref())?);

    let context = CourseJobContext {
        manager: DownloadManager::new(),
        config,
        http_client,
        args: args.clone(),
        store: Arc::new(ManifestStore::open_default()?),
        registry: Arc::new(ScanRegistry::new()),
        cancellation_token,
    };

    match &args.batch_file {
        Some(batch_file) => workflows::run_batch(batch_file, context).await,
        None => workflows::run_single(context).await,
    }
}
