//! # 运行时配置
//!
//! ## 设计思路
//!
//! 所有“可调策略”集中在 `AppConfig`：加载限制、归一化窗口、编码尺寸、
//! 下载文件名与剪贴板重试。默认值即生产可用配置。
//!
//! ## 实现思路
//!
//! - 全部结构体 `#[serde(default)]`，JSON 中缺失的字段回落到默认值。
//! - `load_config_from_path` 对缺失或损坏的文件回退默认配置并记录警告；
//!   `try_load_config` 则把问题作为 `AppError::Config` 返回。
//! - `ResizeFilter` 负责在 `fast_image_resize` 与 `image` 两套滤镜之间映射。

use std::fs;
use std::path::{Path, PathBuf};

use fast_image_resize as fr;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const DEFAULT_DOWNLOAD_FILE_NAME: &str = "qr-code.png";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub loader: LoaderConfig,
    pub normalize: NormalizeConfig,
    pub encode: EncodeConfig,
    pub output: OutputConfig,
    pub clipboard: ClipboardConfig,
}

/// 输入加载限制。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// 读取原始字节时允许的最大体积（字节）。
    pub max_file_size: u64,
    /// 解码前按图片头校验的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_file_size: 50 * 1024 * 1024,
            max_decoded_pixels: 40_000_000,
        }
    }
}

/// 解码前的尺寸归一化窗口。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    pub max_size: u32,
    pub min_size: u32,
    /// 渲染表面允许的最大面积；超过即视为拿不到表面。
    pub max_surface_pixels: u64,
    pub filter: ResizeFilter,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            max_size: 300,
            min_size: 200,
            max_surface_pixels: 40_000_000,
            filter: ResizeFilter::Bilinear,
        }
    }
}

/// 生成图片的尺寸与留白。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeConfig {
    /// 输出图片边长（像素）。
    pub width: u32,
    /// 四周留白（模块数）。
    pub margin: u32,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self { width: 300, margin: 2 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub download_file_name: String,
    /// 为空时由调用方决定下载目录。
    pub download_dir: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            download_file_name: DEFAULT_DOWNLOAD_FILE_NAME.to_string(),
            download_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipboardConfig {
    /// 写入失败时的最大尝试次数（至少 1 次）。
    pub retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            retry_delay_ms: 100,
        }
    }
}

/// 重采样滤镜。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeFilter {
    Nearest,
    Bilinear,
    CatmullRom,
    Mitchell,
    Lanczos3,
}

impl ResizeFilter {
    pub(crate) fn to_fast_filter(self) -> fr::FilterType {
        match self {
            Self::Nearest => fr::FilterType::Box,
            Self::Bilinear => fr::FilterType::Bilinear,
            Self::CatmullRom => fr::FilterType::CatmullRom,
            Self::Mitchell => fr::FilterType::Mitchell,
            Self::Lanczos3 => fr::FilterType::Lanczos3,
        }
    }

    pub(crate) fn to_image_filter(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Bilinear => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Mitchell => FilterType::Gaussian,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

impl AppConfig {
    /// 检查配置之间的约束。
    pub fn validate(&self) -> Result<(), AppError> {
        if self.normalize.min_size == 0 || self.normalize.max_size == 0 {
            return Err(AppError::Config("归一化尺寸必须大于 0".to_string()));
        }
        if self.normalize.min_size > self.normalize.max_size {
            return Err(AppError::Config(format!(
                "min_size（{}）不能大于 max_size（{}）",
                self.normalize.min_size, self.normalize.max_size
            )));
        }
        if self.encode.width == 0 {
            return Err(AppError::Config("生成图片宽度必须大于 0".to_string()));
        }
        if self.output.download_file_name.trim().is_empty() {
            return Err(AppError::Config("下载文件名不能为空".to_string()));
        }
        Ok(())
    }
}

/// 严格读取配置文件。
pub fn try_load_config(path: &Path) -> Result<AppConfig, AppError> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("读取配置文件失败：{}", e)))?;
    let config: AppConfig = serde_json::from_str(&content)
        .map_err(|e| AppError::Config(format!("解析配置文件失败：{}", e)))?;
    config.validate()?;
    Ok(config)
}

/// 读取配置文件，缺失或无效时回退默认配置。
pub fn load_config_from_path(path: &Path) -> AppConfig {
    if !path.exists() {
        log::debug!("⚙️ 配置文件不存在，使用默认配置：{}", path.display());
        return AppConfig::default();
    }

    match try_load_config(path) {
        Ok(config) => config,
        Err(err) => {
            log::warn!("⚠️ {}，回退默认配置", err);
            AppConfig::default()
        }
    }
}

pub fn save_config_to_path(path: &Path, config: &AppConfig) -> Result<(), AppError> {
    config.validate()?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| AppError::Config(format!("序列化配置失败：{}", e)))?;
    fs::write(path, content)?;
    Ok(())
}
