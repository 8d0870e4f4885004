//! # 生成编排模块
//!
//! ## 设计思路
//!
//! `EncodeOrchestrator` 把“组合好的载荷 + 颜色快照”交给矩阵编码器，
//! 得到一张 PNG 并包装成 `QrArtifact`。编排层自身不持有任何产物状态，
//! 成功后由控制器交给输出管理器保存，失败时旧产物保持不变。
//!
//! ## 实现思路
//!
//! - 每次请求使用一份 `EncodeConfig` 快照与一份 `ColorConfig` 克隆。
//! - 前景色与背景色相同也照常编码，只在日志中提示。
//! - 成功与失败都各发出一条状态通知，并以 `Result` 返回。

use std::io::Cursor;
use std::sync::Arc;
use std::time::Instant;

use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use serde::Serialize;

use crate::codec::{EncodeOptions, MatrixCodec};
use crate::color::ColorConfig;
use crate::composer::FieldComposer;
use crate::error::AppError;
use crate::notify::NotificationBus;
use crate::settings::EncodeConfig;

pub const PNG_MIME: &str = "image/png";
pub const GENERATED_TEXT: &str = "QR code generated";

/// 生成出的二维码图片。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QrArtifact {
    #[serde(skip)]
    pub bytes: Bytes,
    pub mime: &'static str,
    pub width: u32,
    pub height: u32,
}

impl QrArtifact {
    /// 由 PNG 字节构建，宽高从图片头读取。
    pub fn from_png(bytes: impl Into<Bytes>) -> Result<Self, AppError> {
        let bytes = bytes.into();
        let (width, height) = image::ImageReader::with_format(
            Cursor::new(bytes.as_ref()),
            image::ImageFormat::Png,
        )
        .into_dimensions()
        .map_err(|e| AppError::Encode(format!("无法读取生成图片尺寸：{}", e)))?;

        Ok(Self {
            bytes,
            mime: PNG_MIME,
            width,
            height,
        })
    }

    /// `data:image/png;base64,...` 形式，可直接交给 `<img src>`。
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime,
            general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

pub struct EncodeOrchestrator {
    codec: Arc<dyn MatrixCodec>,
    bus: NotificationBus,
    config: EncodeConfig,
}

impl EncodeOrchestrator {
    pub fn new(codec: Arc<dyn MatrixCodec>, bus: NotificationBus, config: EncodeConfig) -> Self {
        Self { codec, bus, config }
    }

    pub fn config(&self) -> &EncodeConfig {
        &self.config
    }

    /// 编码已组合好的载荷。
    pub fn encode(&self, payload: &str, colors: &ColorConfig) -> Result<QrArtifact, AppError> {
        let result = self.encode_inner(payload, colors);
        self.report(&result);
        result
    }

    /// 校验并组合表单，再编码。校验失败同样发出错误通知。
    pub fn generate(
        &self,
        composer: &FieldComposer,
        colors: &ColorConfig,
    ) -> Result<QrArtifact, AppError> {
        let result = composer
            .compose()
            .map_err(AppError::from)
            .and_then(|payload| self.encode_inner(&payload, colors));
        self.report(&result);
        result
    }

    fn encode_inner(&self, payload: &str, colors: &ColorConfig) -> Result<QrArtifact, AppError> {
        let started = Instant::now();
        if colors.is_low_contrast() {
            log::warn!("⚠️ 前景色与背景色相同（{}），生成的二维码大概率无法识别", colors.dot());
        }

        let options = EncodeOptions::new(&self.config, colors);
        let png = self.codec.encode(payload, &options)?;
        let artifact = QrArtifact::from_png(png)?;

        log::info!(
            "✅ 二维码生成成功 - 载荷 {} 字节 输出 {}x{} 耗时 {}ms",
            payload.len(),
            artifact.width,
            artifact.height,
            started.elapsed().as_millis()
        );
        Ok(artifact)
    }

    fn report(&self, result: &Result<QrArtifact, AppError>) {
        match result {
            Ok(_) => self.bus.success(GENERATED_TEXT),
            Err(err) => {
                log::error!("❌ 二维码生成失败 [{}:{}] {}", err.stage(), err.code(), err);
                self.bus.error(err.to_string());
            }
        }
    }
}
