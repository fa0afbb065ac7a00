// src/client.rs

use crate::{config::AppConfig, error::*};
use async_trait::async_trait;
use log::{debug, trace};
use reqwest::{
    IntoUrl, Response, StatusCode,
    header::{COOKIE, HeaderMap, HeaderValue},
};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use std::sync::Arc;

/// 扫描阶段唯一依赖的网络原语：获取一个页面的 HTML 文本。
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, url: &str) -> AppResult<String>;
}

#[derive(Clone)]
pub struct RobustClient {
    /// 带重试中间件，用于文件传输
    pub client: ClientWithMiddleware,
    /// 不重试，用于扫描阶段的页面请求
    page_client: reqwest::Client,
    config: Arc<AppConfig>,
}

impl RobustClient {
    pub fn new(config: Arc<AppConfig>, cookie: Option<&str>) -> AppResult<Self> {
        let mut headers = HeaderMap::new();
        if let Some(cookie) = cookie {
            let value = HeaderValue::from_str(cookie)
                .map_err(|e| AppError::UserInputError(format!("Cookie 格式无效: {}", e)))?;
            headers.insert(COOKIE, value);
        }

        let page_client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .pool_max_idle_per_host(config.max_workers * 3)
            .build()?;

        let retry_policy =
            ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let client = ClientBuilder::new(page_client.clone())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            page_client,
            config,
        })
    }

    pub async fn get<T: IntoUrl>(&self, url: T) -> AppResult<Response> {
        let res = self.client.get(url).send().await?;
        if res.status() == StatusCode::UNAUTHORIZED || res.status() == StatusCode::FORBIDDEN {
            return Err(AppError::SessionInvalid);
        }
        Ok(res.error_for_status()?)
    }

    async fn get_page_text(&self, url: &str) -> AppResult<String> {
        let res = self.page_client.get(url).send().await?;
        if res.status() == StatusCode::UNAUTHORIZED || res.status() == StatusCode::FORBIDDEN {
            return Err(AppError::SessionInvalid);
        }
        let res = res.error_for_status()?;
        Ok(res.text().await?)
    }
}

#[async_trait]
impl PageFetcher for RobustClient {
    async fn fetch_page(&self, url: &str) -> AppResult<String> {
        debug!("获取页面: {}", url);
        match tokio::time::timeout(self.config.timeout, self.get_page_text(url)).await {
            Ok(Ok(body)) => {
                trace!("页面 '{}' 长度 {} 字节", url, body.len());
                Ok(body)
            }
            Ok(Err(AppError::Network(e))) if e.is_timeout() => {
                Err(AppError::Timeout(url.to_string()))
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(AppError::Timeout(url.to_string())),
        }
    }
}

/// 测试用的页面源：按地址返回预置内容，可为每个地址设置延迟。
#[cfg(any(test, feature = "testing"))]
pub mod testing {
    use super::PageFetcher;
    use crate::error::{AppError, AppResult};
    use anyhow::anyhow;
    use async_trait::async_trait;
    use dashmap::DashMap;
    use std::{collections::HashMap, time::Duration};

    #[derive(Default)]
    pub struct StaticFetcher {
        pages: HashMap<String, (Duration, String)>,
        calls: DashMap<String, usize>,
    }

    impl StaticFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn page(mut self, url: &str, body: &str) -> Self {
            self.pages.insert(url.to_string(), (Duration::ZERO, body.to_string()));
            self
        }

        pub fn delayed_page(mut self, url: &str, body: &str, delay: Duration) -> Self {
            self.pages.insert(url.to_string(), (delay, body.to_string()));
            self
        }

        pub fn calls(&self, url: &str) -> usize {
            self.calls.get(url).map(|c| *c).unwrap_or(0)
        }
    }

    #[async_trait]
    impl PageFetcher for StaticFetcher {
        async fn fetch_page(&self, url: &str) -> AppResult<String> {
            *self.calls.entry(url.to_string()).or_insert(0) += 1;
            match self.pages.get(url) {
                Some((delay, body)) => {
                    if !delay.is_zero() {
                        tokio::time::sleep(*delay).await;
                    }
                    Ok(body.clone())
                }
                None => Err(AppError::Other(anyhow!("404 Not Found: {}", url))),
            }
        }
    }
}
