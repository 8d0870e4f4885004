//! # 工作台控制器
//!
//! ## 设计思路
//!
//! UI 外壳的全部可变状态集中在 `WorkbenchController`，每个用户动作对应一个具名方法：
//! - 当前工具页：`ActiveTool::Reader | ActiveTool::Generator`
//! - 生成页表单与颜色：`FieldComposer` + `ColorConfig`（只通过 `&mut self` 修改）
//! - 共享交付状态：由 `OutputManager` 持有
//!
//! 读取请求只需要 `&self`，多个请求可以重叠，顺序由 `ReaderService` 保证。
//!
//! ## 实现思路
//!
//! - 所有端口（编解码、渲染表面、剪贴板、下载）都在构造时注入，测试无需桌面环境。
//! - 颜色输入非法时发出错误通知并保留原值。
//! - 生成失败时旧的二维码保持不变。

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::codec::{MatrixCodec, QrMatrixCodec};
use crate::color::ColorConfig;
use crate::composer::{FieldComposer, FieldEntry, FieldType};
use crate::error::{AppError, ValidationError};
use crate::generator::{EncodeOrchestrator, QrArtifact};
use crate::notify::NotificationBus;
use crate::output::{DeliveryState, OutputManager};
use crate::ports::{
    ClipboardPort, DirectoryDownloadSink, DownloadSink, ResampleSurfaceProvider, SurfaceProvider,
    SystemClipboard,
};
use crate::reader::{DecodeOrchestrator, DecodeOutcome, ImageSource, ReaderService};
use crate::settings::AppConfig;

/// 当前激活的工具页。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveTool {
    #[default]
    Reader,
    Generator,
}

/// 构造控制器所需的外部能力。
pub struct WorkbenchPorts {
    pub codec: Arc<dyn MatrixCodec>,
    pub surfaces: Arc<dyn SurfaceProvider>,
    pub clipboard: Arc<dyn ClipboardPort>,
    pub sink: Arc<dyn DownloadSink>,
}

impl WorkbenchPorts {
    /// `qrcode`/`rqrr` 编解码 + 重采样表面 + 系统剪贴板 + 目录下载。
    pub fn system(config: &AppConfig) -> Self {
        Self {
            codec: Arc::new(QrMatrixCodec::new()),
            surfaces: Arc::new(ResampleSurfaceProvider::new(config.normalize.filter)),
            clipboard: Arc::new(SystemClipboard::new()),
            sink: Arc::new(DirectoryDownloadSink::from_config(
                config.output.download_dir.as_deref(),
            )),
        }
    }
}

pub struct WorkbenchController {
    active_tool: ActiveTool,
    composer: FieldComposer,
    colors: ColorConfig,
    bus: NotificationBus,
    encoder: EncodeOrchestrator,
    reader: ReaderService,
    output: OutputManager,
}

impl WorkbenchController {
    pub fn new(config: AppConfig, ports: WorkbenchPorts, bus: NotificationBus) -> Result<Self, AppError> {
        config.validate()?;

        let output = OutputManager::new(
            ports.clipboard,
            ports.sink,
            bus.clone(),
            config.output.clone(),
            config.clipboard.clone(),
        );
        let reader = ReaderService::new(
            config.loader.clone(),
            config.normalize.clone(),
            ports.surfaces,
            DecodeOrchestrator::new(Arc::clone(&ports.codec), bus.clone()),
            output.clone(),
        );
        let encoder = EncodeOrchestrator::new(ports.codec, bus.clone(), config.encode.clone());

        log::info!("🚀 工作台已初始化");
        Ok(Self {
            active_tool: ActiveTool::default(),
            composer: FieldComposer::new(),
            colors: ColorConfig::default(),
            bus,
            encoder,
            reader,
            output,
        })
    }

    /// 使用系统端口创建控制器。
    pub fn with_system_ports(config: AppConfig) -> Result<Self, AppError> {
        let ports = WorkbenchPorts::system(&config);
        Self::new(config, ports, NotificationBus::new())
    }

    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    pub fn active_tool(&self) -> ActiveTool {
        self.active_tool
    }

    pub fn switch_tool(&mut self, tool: ActiveTool) {
        if self.active_tool != tool {
            log::debug!("🔀 切换工具页：{:?} -> {:?}", self.active_tool, tool);
            self.active_tool = tool;
        }
    }

    pub fn fields(&self) -> &[FieldEntry] {
        self.composer.entries()
    }

    pub fn colors(&self) -> &ColorConfig {
        &self.colors
    }

    pub fn delivery(&self) -> DeliveryState {
        self.output.snapshot()
    }

    // ── 生成页 ──────────────────────────────────────────

    pub fn add_field(&mut self) -> usize {
        self.composer.add()
    }

    pub fn remove_field(&mut self, index: usize) -> Result<FieldEntry, AppError> {
        self.composer.remove(index).map_err(|e| self.reject(e))
    }

    pub fn update_field(
        &mut self,
        index: usize,
        field_type: Option<FieldType>,
        value: Option<String>,
    ) -> Result<(), AppError> {
        self.composer
            .update(index, field_type, value)
            .map_err(|e| self.reject(e))
    }

    pub fn set_dot_color(&mut self, value: &str) -> Result<(), AppError> {
        self.colors.set_dot(value).map_err(|e| self.reject(e))
    }

    pub fn set_background_color(&mut self, value: &str) -> Result<(), AppError> {
        self.colors.set_background(value).map_err(|e| self.reject(e))
    }

    pub fn reset_colors(&mut self) {
        self.colors.reset();
    }

    /// 组合表单并生成二维码；成功后替换当前二维码。
    pub fn generate(&mut self) -> Result<QrArtifact, AppError> {
        let artifact = self.encoder.generate(&self.composer, &self.colors)?;
        self.output.set_artifact(artifact.clone());
        Ok(artifact)
    }

    // ── 读取页 ──────────────────────────────────────────

    pub async fn read(&self, source: ImageSource) -> Result<DecodeOutcome, AppError> {
        self.reader.read(source).await
    }

    /// 尚未提交或丢弃的读取请求数量。
    pub fn pending_reads(&self) -> usize {
        self.reader.in_flight()
    }

    pub async fn copy_decoded(&self) -> Result<bool, AppError> {
        self.output.copy_decoded().await
    }

    pub fn clear_decoded(&self) {
        self.output.clear_decoded();
    }

    // ── 输出 ────────────────────────────────────────────

    pub async fn download(&self) -> Result<Option<PathBuf>, AppError> {
        self.output.download().await
    }

    pub async fn copy_qr(&self) -> Result<bool, AppError> {
        self.output.copy_image().await
    }

    pub fn clear_qr(&self) {
        self.output.clear_artifact();
    }

    /// 清空二维码与解码结果，并丢弃在途的读取请求。
    pub fn reset(&self) {
        let cancelled = self.reader.cancel_all();
        if cancelled > 0 {
            log::debug!("重置时取消了 {} 个在途读取请求", cancelled);
        }
        self.output.reset();
    }

    fn reject(&self, err: ValidationError) -> AppError {
        let err = AppError::from(err);
        log::warn!("⚠️ 输入被拒绝：{}", err);
        self.bus.error(err.to_string());
        err
    }
}
