//! # 加载与校验模块
//!
//! ## 设计思路
//!
//! 统一处理不同来源（本地文件 / 内存字节 / Base64）的原始字节加载，
//! 并在“尽可能早”的阶段执行输入校验，尽快失败，减少不必要的内存与 CPU 消耗。
//!
//! ## 实现思路
//!
//! 1. 文件：存在性 + metadata 体积限制 + 读取
//! 2. Base64：Data URL 解析 + 解码前体积估算
//! 3. 文件签名（magic bytes）必须是图片
//! 4. 读取 header 尺寸并按像素上限快速拒绝
//! 5. 完整解码
//!
//! 所有失败统一映射为 `AppError::ImageLoad`。

use std::io::Cursor;
use std::path::Path;

use base64::{Engine as _, engine::general_purpose};
use image::{DynamicImage, GenericImageView};

use super::source::{ImageSource, RawImageData};
use crate::error::AppError;
use crate::settings::LoaderConfig;

/// 加载并解码一张输入图片。
pub fn load_image(source: &ImageSource, config: &LoaderConfig) -> Result<DynamicImage, AppError> {
    let raw = load_raw(source, config)?;
    decode_raw(raw, config)
}

pub(crate) fn load_raw(source: &ImageSource, config: &LoaderConfig) -> Result<RawImageData, AppError> {
    let bytes = match source {
        ImageSource::FilePath(path) => read_file_with_limit(path, config.max_file_size)?,
        ImageSource::Bytes(bytes) => {
            check_size(bytes.len() as u64, config.max_file_size)?;
            bytes.clone()
        }
        ImageSource::Base64(data) => parse_base64_with_limit(data, config.max_file_size)?,
    };

    validate_image_signature(&bytes)?;

    Ok(RawImageData {
        bytes,
        source_hint: source.hint(),
    })
}

pub(crate) fn decode_raw(raw: RawImageData, config: &LoaderConfig) -> Result<DynamicImage, AppError> {
    let (header_width, header_height) = inspect_dimensions_from_memory(&raw.bytes)?;
    validate_pixel_limits(config, header_width, header_height)?;

    let decoded = image::load_from_memory(&raw.bytes)
        .map_err(|e| AppError::ImageLoad(format!("图片解码失败：{}", e)))?;

    let (width, height) = decoded.dimensions();
    if width == 0 || height == 0 {
        return Err(AppError::ImageLoad(format!("图片尺寸无效：{}x{}", width, height)));
    }
    validate_pixel_limits(config, width, height)?;

    log::info!(
        "✅ 图片解码成功 - 来源: {} 尺寸: {}x{} 字节: {}",
        raw.source_hint,
        width,
        height,
        raw.bytes.len()
    );
    Ok(decoded)
}

fn read_file_with_limit(path: &Path, max_file_size: u64) -> Result<Vec<u8>, AppError> {
    log::info!("📁 开始读取本地图片 - 路径: {}", path.display());

    if !path.exists() {
        return Err(AppError::ImageLoad(format!("文件不存在：{}", path.display())));
    }

    let metadata = std::fs::metadata(path)
        .map_err(|e| AppError::ImageLoad(format!("无法读取文件信息：{}", e)))?;
    if !metadata.is_file() {
        return Err(AppError::ImageLoad(format!("不是文件：{}", path.display())));
    }
    check_size(metadata.len(), max_file_size)?;

    std::fs::read(path).map_err(|e| AppError::ImageLoad(format!("无法读取图片文件：{}", e)))
}

fn check_size(len: u64, max_file_size: u64) -> Result<(), AppError> {
    if len > max_file_size {
        return Err(AppError::ImageLoad(format!(
            "文件过大：{:.2} MB（限制：{:.2} MB）",
            len as f64 / 1024.0 / 1024.0,
            max_file_size as f64 / 1024.0 / 1024.0
        )));
    }
    Ok(())
}

fn estimate_base64_decoded_upper_bound_len(base64_data: &str) -> Result<u64, AppError> {
    let len = base64_data.trim().len() as u64;
    let groups = len
        .checked_add(3)
        .ok_or_else(|| AppError::ImageLoad("Base64 输入长度溢出".to_string()))?
        / 4;

    groups
        .checked_mul(3)
        .ok_or_else(|| AppError::ImageLoad("Base64 解码体积估算溢出".to_string()))
}

/// 解析 Base64 输入（支持 `data:image/...;base64,` 与纯 Base64）。
pub(crate) fn parse_base64_with_limit(data: &str, max_file_size: u64) -> Result<Vec<u8>, AppError> {
    log::info!("📝 开始处理 base64 图片");

    let normalized = data.trim();
    let payload = if normalized.starts_with("data:") {
        if !normalized.starts_with("data:image/") {
            return Err(AppError::ImageLoad("Data URL 不是图片类型".to_string()));
        }
        let base64_start = normalized
            .find(";base64,")
            .ok_or_else(|| AppError::ImageLoad("缺少 base64 标记".to_string()))?;
        &normalized[base64_start + 8..]
    } else {
        normalized
    };

    let estimated_len = estimate_base64_decoded_upper_bound_len(payload)?;
    if estimated_len > max_file_size {
        return Err(AppError::ImageLoad(format!(
            "Base64 预计解码体积过大：{:.2} MB（限制：{:.2} MB）",
            estimated_len as f64 / 1024.0 / 1024.0,
            max_file_size as f64 / 1024.0 / 1024.0
        )));
    }

    general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| AppError::ImageLoad(format!("Base64 解码失败：{}", e)))
}

/// 通过文件签名（magic bytes）校验输入是否为图片。
fn validate_image_signature(bytes: &[u8]) -> Result<(), AppError> {
    if bytes.is_empty() {
        return Err(AppError::ImageLoad("图片内容为空".to_string()));
    }

    let kind = infer::get(bytes)
        .ok_or_else(|| AppError::ImageLoad("无法识别图片类型".to_string()))?;

    if kind.matcher_type() != infer::MatcherType::Image {
        return Err(AppError::ImageLoad(format!(
            "文件签名不是图片类型：{}",
            kind.mime_type()
        )));
    }

    Ok(())
}

/// 仅通过图片头信息读取宽高，用于在完整解码前做像素限制检查。
fn inspect_dimensions_from_memory(bytes: &[u8]) -> Result<(u32, u32), AppError> {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| AppError::ImageLoad(format!("无法识别图片格式：{}", e)))?
        .into_dimensions()
        .map_err(|e| AppError::ImageLoad(format!("无法读取图片尺寸：{}", e)))
}

fn validate_pixel_limits(config: &LoaderConfig, width: u32, height: u32) -> Result<(), AppError> {
    let pixels = (width as u64)
        .checked_mul(height as u64)
        .ok_or_else(|| AppError::ImageLoad("图片像素数溢出".to_string()))?;

    if pixels > config.max_decoded_pixels {
        return Err(AppError::ImageLoad(format!(
            "图片像素过大：{} 像素（限制：{} 像素）",
            pixels, config.max_decoded_pixels
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    use image::{ImageFormat, Rgba, RgbaImage};

    use super::*;

    fn unique_temp_dir() -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock error")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("qr-workbench-loader-test-{nanos}"));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]));
        let mut out = Vec::new();
        DynamicImage::ImageRgba8(image)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .expect("encode png");
        out
    }

    #[test]
    fn loads_png_from_bytes() {
        let image = load_image(&ImageSource::Bytes(png_bytes(7, 5)), &LoaderConfig::default())
            .expect("load");
        assert_eq!(image.dimensions(), (7, 5));
    }

    #[test]
    fn loads_png_from_data_url_and_plain_base64() {
        let encoded = general_purpose::STANDARD.encode(png_bytes(3, 3));
        let config = LoaderConfig::default();

        let from_url = load_image(
            &ImageSource::Base64(format!("data:image/png;base64,{}", encoded)),
            &config,
        )
        .expect("data url");
        let from_plain = load_image(&ImageSource::Base64(encoded), &config).expect("plain");

        assert_eq!(from_url.dimensions(), (3, 3));
        assert_eq!(from_plain.dimensions(), (3, 3));
    }

    #[test]
    fn loads_png_from_file() {
        let dir = unique_temp_dir();
        let path = dir.join("input.png");
        std::fs::write(&path, png_bytes(4, 6)).expect("write png");

        let image = load_image(&ImageSource::FilePath(path), &LoaderConfig::default()).expect("load");
        assert_eq!(image.dimensions(), (4, 6));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn missing_file_is_image_load_error() {
        let dir = unique_temp_dir();
        let result = load_image(
            &ImageSource::FilePath(dir.join("absent.png")),
            &LoaderConfig::default(),
        );
        assert!(matches!(result, Err(AppError::ImageLoad(_))));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn rejects_non_image_payload() {
        let result = load_image(
            &ImageSource::Bytes(b"%PDF-1.7 not an image".to_vec()),
            &LoaderConfig::default(),
        );
        assert!(matches!(result, Err(AppError::ImageLoad(_))));
    }

    #[test]
    fn rejects_empty_and_truncated_input() {
        let config = LoaderConfig::default();
        assert!(matches!(
            load_image(&ImageSource::Bytes(Vec::new()), &config),
            Err(AppError::ImageLoad(_))
        ));

        let truncated = png_bytes(8, 8)[..20].to_vec();
        assert!(matches!(
            load_image(&ImageSource::Bytes(truncated), &config),
            Err(AppError::ImageLoad(_))
        ));
    }

    #[test]
    fn rejects_non_image_data_url() {
        let result = parse_base64_with_limit("data:text/plain;base64,aGk=", u64::MAX);
        assert!(matches!(result, Err(AppError::ImageLoad(_))));
    }

    #[test]
    fn parse_base64_with_limit_rejects_large_payload_before_decode() {
        let huge = "A".repeat(1024);
        let result = parse_base64_with_limit(&huge, 32);
        assert!(matches!(result, Err(AppError::ImageLoad(msg)) if msg.contains("预计解码体积过大")));
    }

    #[test]
    fn header_pixel_limit_rejects_before_decode() {
        let config = LoaderConfig {
            max_decoded_pixels: 100,
            ..LoaderConfig::default()
        };
        let result = load_image(&ImageSource::Bytes(png_bytes(20, 20)), &config);
        assert!(matches!(result, Err(AppError::ImageLoad(msg)) if msg.contains("像素过大")));
    }

    #[test]
    fn byte_size_limit_applies_to_memory_source() {
        let config = LoaderConfig {
            max_file_size: 16,
            ..LoaderConfig::default()
        };
        let result = load_image(&ImageSource::Bytes(png_bytes(4, 4)), &config);
        assert!(matches!(result, Err(AppError::ImageLoad(msg)) if msg.contains("文件过大")));
    }
}
