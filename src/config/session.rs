// src/config/session.rs

use crate::{
    config::ExternalConfig, // 只需要从父模块导入结构体定义
    constants,
    error::{AppError, AppResult},
};
use anyhow::{Context, anyhow};
use log::{debug, info};
use std::{fs, path::PathBuf};

/// 程序的配置目录 (~/.course-dl)
pub fn get_config_dir() -> AppResult<PathBuf> {
    let dir = dirs::home_dir()
        .ok_or_else(|| AppError::Other(anyhow!("无法获取用户主目录")))?
        .join(constants::CONFIG_DIR_NAME);
    Ok(dir)
}

pub(super) fn get_config_path() -> AppResult<PathBuf> {
    Ok(get_config_dir()?.join(constants::CONFIG_FILE_NAME))
}

pub(crate) fn load_or_create_external_config() -> AppResult<ExternalConfig> {
    let config_path = get_config_path()?;
    if config_path.is_file() {
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("读取配置文件 '{}' 失败", config_path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("解析配置文件 '{}' 失败", config_path.display()))
            .map_err(AppError::from)
    } else {
        info!("配置文件 {:?} 不存在，将创建默认配置。", config_path);
        let config = ExternalConfig::default_app_config();

        if let Some(dir) = config_path.parent() {
            fs::create_dir_all(dir)?;
        }

        let json_content = serde_json::to_string_pretty(&config)?;
        fs::write(&config_path, json_content)?;

        Ok(config)
    }
}

pub fn load_cookie_from_config() -> Option<String> {
    load_or_create_external_config()
        .ok()
        .and_then(|config| config.session_cookie)
}

/// 按 命令行 > 环境变量 > 配置文件 的顺序查找会话 Cookie。
pub fn resolve_cookie(cli_cookie: Option<&str>) -> (Option<String>, String) {
    resolve_cookie_from(
        cli_cookie,
        std::env::var(constants::COOKIE_ENV_VAR).ok(),
        load_cookie_from_config,
    )
}

fn resolve_cookie_from(
    cli_cookie: Option<&str>,
    env_cookie: Option<String>,
    file_cookie: impl FnOnce() -> Option<String>,
) -> (Option<String>, String) {
    if let Some(cookie) = cli_cookie.filter(|c| !c.is_empty()) {
        debug!("使用来自命令行参数的 Cookie");
        return (Some(cookie.to_string()), "命令行参数".to_string());
    }
    if let Some(cookie) = env_cookie.filter(|c| !c.is_empty()) {
        debug!("使用来自环境变量 {} 的 Cookie", constants::COOKIE_ENV_VAR);
        return (
            Some(cookie),
            format!("环境变量 ({})", constants::COOKIE_ENV_VAR),
        );
    }
    if let Some(cookie) = file_cookie().filter(|c| !c.is_empty()) {
        debug!("使用来自本地配置文件的 Cookie");
        return (Some(cookie), "本地配置文件".to_string());
    }
    debug!("未在任何位置找到可用的 Cookie");
    (None, "未找到".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_resolution_order() {
        let (cookie, source) =
            resolve_cookie_from(Some("a=1"), Some("b=2".into()), || Some("c=3".into()));
        assert_eq!(cookie.as_deref(), Some("a=1"));
        assert_eq!(source, "命令行参数");

        let (cookie, _) = resolve_cookie_from(Some(""), Some("b=2".into()), || Some("c=3".into()));
        assert_eq!(cookie.as_deref(), Some("b=2"));

        let (cookie, source) = resolve_cookie_from(None, None, || Some("c=3".into()));
        assert_eq!(cookie.as_deref(), Some("c=3"));
        assert_eq!(source, "本地配置文件");

        let (cookie, _) = resolve_cookie_from(None, Some(String::new()), || None);
        assert!(cookie.is_none());
    }
}
