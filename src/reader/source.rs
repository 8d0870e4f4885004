//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“外部输入类型”和“流水线中间结果”解耦：
//! - `ImageSource` 表示用户选择的输入
//! - `RawImageData` 表示已加载但未解码的字节
//! - `PixelBuffer` 表示归一化后交给解码器的 RGBA 像素
//! - `DecodedResult` / `DecodeOutcome` 表示一次读取请求的结论

use std::path::PathBuf;

use serde::Serialize;

use crate::error::AppError;

/// 未识别到二维码时的占位文本。判断结果请使用 `found`，不要比较文本。
pub const NO_CODE_TEXT: &str = "No QR code found";

/// 图片输入来源。
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// 本地文件路径。
    FilePath(PathBuf),
    /// 已在内存中的文件字节（例如拖放或上传控件给出的内容）。
    Bytes(Vec<u8>),
    /// Base64（支持 Data URL 与纯 Base64 字符串）。
    Base64(String),
}

impl ImageSource {
    pub(crate) fn hint(&self) -> &'static str {
        match self {
            Self::FilePath(_) => "file",
            Self::Bytes(_) => "bytes",
            Self::Base64(_) => "base64",
        }
    }
}

/// 加载阶段输出：原始字节与来源标识。
pub(crate) struct RawImageData {
    pub(crate) bytes: Vec<u8>,
    /// 来源提示（用于日志与诊断）。
    pub(crate) source_hint: &'static str,
}

/// 行优先 RGBA8888 像素缓冲。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    /// 长度恒为 `width * height * 4`。
    pub data: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, AppError> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(4))
            .ok_or_else(|| AppError::CanvasUnavailable("像素缓冲尺寸溢出".to_string()))?;

        if width == 0 || height == 0 || data.len() != expected {
            return Err(AppError::CanvasUnavailable(format!(
                "像素缓冲长度异常：期望 {} 实际 {}（{}x{}）",
                expected,
                data.len(),
                width,
                height
            )));
        }

        Ok(Self { width, height, data })
    }
}

/// 解码结论。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedResult {
    pub found: bool,
    pub text: String,
}

impl DecodedResult {
    pub fn found(text: impl Into<String>) -> Self {
        Self {
            found: true,
            text: text.into(),
        }
    }

    pub fn not_found() -> Self {
        Self {
            found: false,
            text: NO_CODE_TEXT.to_string(),
        }
    }
}

/// 一次读取请求的最终结果。
#[derive(Debug)]
pub enum DecodeOutcome {
    /// 结果已提交为当前状态（无论是否识别到二维码）。
    Completed(DecodedResult),
    /// 被更新的请求取代，未写入状态也未发出通知。
    Superseded,
}

impl DecodeOutcome {
    pub fn result(&self) -> Option<&DecodedResult> {
        match self {
            Self::Completed(result) => Some(result),
            Self::Superseded => None,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded)
    }
}
