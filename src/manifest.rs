// src/manifest.rs

//! 清单的持久化，以及同一课程多次扫描之间的取代关系。

use crate::{
    config::session::get_config_dir,
    constants,
    error::{AppError, AppResult},
    models::CourseManifest,
    utils,
};
use dashmap::DashMap;
use log::{debug, info, warn};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};
use tokio_util::sync::CancellationToken;

/// 每个课程键对应一个 JSON 文件，后写入者覆盖先写入者。
#[derive(Debug, Clone)]
pub struct ManifestStore {
    dir: PathBuf,
}

impl ManifestStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn open_default() -> AppResult<Self> {
        Ok(Self::new(get_config_dir()?.join(constants::MANIFEST_DIR_NAME)))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", utils::key_digest(key)))
    }

    pub fn save(&self, manifest: &CourseManifest) -> AppResult<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&manifest.key);

        // 先写临时文件再整体替换，读者永远看不到写了一半的清单
        let mut temp = tempfile::NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer_pretty(&mut temp, manifest)?;
        temp.flush()?;
        temp.persist(&path)?;

        info!("清单 '{}' 已保存到 {:?}", manifest.key, path);
        Ok(path)
    }

    pub fn load(&self, key: &str) -> AppResult<Option<CourseManifest>> {
        let path = self.path_for(key);
        if !path.exists() {
            debug!("清单 '{}' 不存在: {:?}", key, path);
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let manifest: CourseManifest = serde_json::from_str(&content)?;
        if manifest.key != key {
            warn!("清单文件 {:?} 的键 '{}' 与请求的 '{}' 不一致", path, manifest.key, key);
            return Ok(None);
        }
        Ok(Some(manifest))
    }
}

/// 一次扫描的凭据。只有仍是该课程最新一次扫描的凭据才能发布结果。
#[derive(Debug, Clone)]
pub struct ScanTicket {
    pub key: String,
    generation: u64,
    token: CancellationToken,
}

impl ScanTicket {
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

#[derive(Debug, Default)]
pub struct ScanRegistry {
    active: DashMap<String, (u64, CancellationToken)>,
    next_generation: AtomicU64,
}

impl ScanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 开始新的扫描，同时取消同一课程上仍在进行的旧扫描。
    pub fn begin(&self, key: &str) -> ScanTicket {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken::new();
        if let Some((old_generation, old_token)) = self
            .active
            .insert(key.to_string(), (generation, token.clone()))
        {
            info!("课程 '{}' 的扫描 #{} 被 #{} 取代", key, old_generation, generation);
            old_token.cancel();
        }
        ScanTicket {
            key: key.to_string(),
            generation,
            token,
        }
    }

    pub fn is_current(&self, ticket: &ScanTicket) -> bool {
        self.active
            .get(&ticket.key)
            .is_some_and(|entry| entry.0 == ticket.generation)
    }

    /// 扫描结束后登记注销；已被取代的凭据不会影响新扫描的登记。
    pub fn finish(&self, ticket: &ScanTicket) {
        self.active
            .remove_if(&ticket.key, |_, entry| entry.0 == ticket.generation);
    }

    /// 仅当凭据仍是最新时才写入清单。
    pub fn publish(
        &self,
        ticket: &ScanTicket,
        store: &ManifestStore,
        manifest: &CourseManifest,
    ) -> AppResult<PathBuf> {
        if ticket.token.is_cancelled() || !self.is_current(ticket) {
            warn!("课程 '{}' 的扫描已过期，放弃发布清单", ticket.key);
            return Err(AppError::Superseded);
        }
        let path = store.save(manifest)?;
        self.finish(ticket);
        Ok(path)
    }
}
