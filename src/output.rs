//! # 输出管理模块
//!
//! ## 设计思路
//!
//! 读取页与生成页共享一份“交付状态”：当前二维码图片与当前解码结果。
//! `OutputManager` 负责把它们送出去（下载 / 复制图片 / 复制文本），
//! 以及两侧各自的清空按钮和整体重置。
//!
//! ## 实现思路
//!
//! - 状态放在 `Arc<Mutex<DeliveryState>>` 中，读取服务提交结果时与本模块共用同一把锁。
//! - 没有可交付内容时操作是空操作：返回 `Ok(None)` / `Ok(false)`，不发通知。
//! - 剪贴板与落盘都在 `spawn_blocking` 中执行，避免阻塞 async 运行时；
//!   剪贴板写入失败按配置有限重试。

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::error::AppError;
use crate::generator::QrArtifact;
use crate::notify::NotificationBus;
use crate::ports::{ClipboardPort, DownloadSink};
use crate::reader::DecodedResult;
use crate::settings::{ClipboardConfig, OutputConfig};

pub const IMAGE_COPIED_TEXT: &str = "QR code copied to clipboard";
pub const TEXT_COPIED_TEXT: &str = "Copied to clipboard!";
pub const DOWNLOADED_TEXT: &str = "QR code downloaded";

/// 两个页面共享的可交付内容。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryState {
    pub artifact: Option<QrArtifact>,
    pub decoded: Option<DecodedResult>,
}

impl DeliveryState {
    pub fn is_empty(&self) -> bool {
        self.artifact.is_none() && self.decoded.is_none()
    }
}

#[derive(Clone)]
pub struct OutputManager {
    state: Arc<Mutex<DeliveryState>>,
    clipboard: Arc<dyn ClipboardPort>,
    sink: Arc<dyn DownloadSink>,
    bus: NotificationBus,
    output: OutputConfig,
    clipboard_config: ClipboardConfig,
}

impl OutputManager {
    pub fn new(
        clipboard: Arc<dyn ClipboardPort>,
        sink: Arc<dyn DownloadSink>,
        bus: NotificationBus,
        output: OutputConfig,
        clipboard_config: ClipboardConfig,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(DeliveryState::default())),
            clipboard,
            sink,
            bus,
            output,
            clipboard_config,
        }
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, DeliveryState> {
        // 状态只包含纯数据，锁中毒时沿用内部值
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> DeliveryState {
        self.lock_state().clone()
    }

    pub fn artifact(&self) -> Option<QrArtifact> {
        self.lock_state().artifact.clone()
    }

    pub fn decoded(&self) -> Option<DecodedResult> {
        self.lock_state().decoded.clone()
    }

    pub fn set_artifact(&self, artifact: QrArtifact) {
        self.lock_state().artifact = Some(artifact);
    }

    pub fn set_decoded(&self, decoded: DecodedResult) {
        self.lock_state().decoded = Some(decoded);
    }

    /// 保存当前二维码；没有二维码时返回 `Ok(None)`。
    pub async fn download(&self) -> Result<Option<PathBuf>, AppError> {
        let Some(artifact) = self.artifact() else {
            log::debug!("没有可下载的二维码，忽略");
            return Ok(None);
        };

        let sink = Arc::clone(&self.sink);
        let file_name = self.output.download_file_name.clone();
        let result = tokio::task::spawn_blocking(move || sink.save(&file_name, &artifact.bytes))
            .await
            .map_err(|e| AppError::Io(std::io::Error::other(format!("线程执行失败：{}", e))))
            .and_then(|saved| saved);

        match result {
            Ok(path) => {
                self.bus.success(DOWNLOADED_TEXT);
                Ok(Some(path))
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// 把当前二维码以图片形式写入剪贴板；没有二维码时返回 `Ok(false)`。
    pub async fn copy_image(&self) -> Result<bool, AppError> {
        let Some(artifact) = self.artifact() else {
            log::debug!("没有可复制的二维码，忽略");
            return Ok(false);
        };

        log::debug!("📋 准备复制二维码 - {}x{}", artifact.width, artifact.height);
        let clipboard = Arc::clone(&self.clipboard);
        let result = self
            .write_with_retry(move || clipboard.set_image(&artifact))
            .await;

        match result {
            Ok(()) => {
                self.bus.success(IMAGE_COPIED_TEXT);
                Ok(true)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// 复制任意文本；空文本不写剪贴板也不发通知，返回 `Ok(false)`。
    pub async fn copy_text(&self, text: &str) -> Result<bool, AppError> {
        if text.is_empty() {
            log::debug!("没有可复制的文本，忽略");
            return Ok(false);
        }
        let clipboard = Arc::clone(&self.clipboard);
        let text = text.to_string();
        match self.write_with_retry(move || clipboard.set_text(&text)).await {
            Ok(()) => {
                self.bus.success(TEXT_COPIED_TEXT);
                Ok(true)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// 复制当前解码文本；没有解码结果时返回 `Ok(false)`。
    pub async fn copy_decoded(&self) -> Result<bool, AppError> {
        let Some(decoded) = self.decoded() else {
            log::debug!("没有可复制的解码结果，忽略");
            return Ok(false);
        };
        self.copy_text(&decoded.text).await
    }

    pub fn clear_artifact(&self) {
        self.lock_state().artifact = None;
    }

    pub fn clear_decoded(&self) {
        self.lock_state().decoded = None;
    }

    pub fn reset(&self) {
        *self.lock_state() = DeliveryState::default();
        log::info!("🧹 已清空二维码与解码结果");
    }

    fn fail(&self, err: AppError) -> AppError {
        log::error!("❌ 输出失败 [{}:{}] {}", err.stage(), err.code(), err);
        self.bus.error(err.to_string());
        err
    }

    async fn write_with_retry<F>(&self, write: F) -> Result<(), AppError>
    where
        F: Fn() -> Result<(), AppError> + Send + 'static,
    {
        let retries = self.clipboard_config.retries.max(1);
        let delay = Duration::from_millis(self.clipboard_config.retry_delay_ms);

        tokio::task::spawn_blocking(move || {
            let started = Instant::now();
            let mut last_error = None;
            for attempt in 1..=retries {
                if attempt > 1 {
                    log::debug!("🔄 重试 {}/{}，等待 {}ms", attempt, retries, delay.as_millis());
                    std::thread::sleep(delay);
                }

                match write() {
                    Ok(()) => {
                        log::info!(
                            "✅ 剪贴板写入成功 (尝试 {}，耗时 {}ms)",
                            attempt,
                            started.elapsed().as_millis()
                        );
                        return Ok(());
                    }
                    Err(err) => {
                        log::warn!("❌ 尝试 {} 失败: {}", attempt, err);
                        last_error = Some(err);
                    }
                }
            }

            Err(last_error.unwrap_or_else(|| AppError::Clipboard("未执行任何写入".to_string())))
        })
        .await
        .map_err(|e| AppError::Clipboard(format!("线程执行失败：{}", e)))?
    }
}
