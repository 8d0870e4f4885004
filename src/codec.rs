//! # 矩阵编解码端口
//!
//! ## 设计思路
//!
//! 二维码的矩阵构造、纠错与定位图案检测都不在本 crate 内实现，
//! 而是通过 `MatrixCodec` 端口委托给外部能力：
//! - 解码：`rqrr`
//! - 编码：`qrcode`（只取模块矩阵），再按选项渲染为 PNG
//!
//! ## 实现思路
//!
//! - 解码前把 RGBA 转为亮度图（忽略 alpha），非二维码图片返回 `Ok(None)` 而不是错误。
//! - 首轮找不到网格时，把亮度图最近邻放大 2 倍再检测一次（小模块尺寸下 rqrr 容易漏检）。
//! - 编码输出边长恰好为 `width` 像素，留白以模块计，模块按小数比例缩放。
//! - 测试可注入自定义 `MatrixCodec`，流水线不依赖具体实现。

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use qrcode::{Color, QrCode};

use crate::color::{ColorConfig, HexColor};
use crate::error::AppError;
use crate::settings::EncodeConfig;

/// 编码选项：`{width, margin, color: {dark, light}}`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeOptions {
    pub width: u32,
    pub margin: u32,
    pub dark: HexColor,
    pub light: HexColor,
}

impl EncodeOptions {
    pub fn new(config: &EncodeConfig, colors: &ColorConfig) -> Self {
        Self {
            width: config.width,
            margin: config.margin,
            dark: colors.dot().clone(),
            light: colors.background().clone(),
        }
    }
}

/// 外部矩阵编解码能力。
pub trait MatrixCodec: Send + Sync {
    /// `rgba` 为行优先 RGBA8888，长度必须是 `width * height * 4`。
    fn decode(&self, rgba: &[u8], width: u32, height: u32) -> Result<Option<String>, AppError>;

    /// 返回 PNG 字节；超出容量或参数非法时报错。
    fn encode(&self, text: &str, options: &EncodeOptions) -> Result<Vec<u8>, AppError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QrMatrixCodec;

impl QrMatrixCodec {
    pub fn new() -> Self {
        Self
    }
}

fn luminance(r: u8, g: u8, b: u8) -> u8 {
    let value = 0.2126 * r as f32 + 0.7152 * g as f32 + 0.0722 * b as f32;
    value.round().clamp(0.0, 255.0) as u8
}

fn detect_and_decode(luma: &[u8], width: usize, height: usize) -> Option<String> {
    let mut prepared =
        rqrr::PreparedImage::prepare_from_greyscale(width, height, |x, y| luma[y * width + x]);

    let grids = prepared.detect_grids();
    log::debug!("🔍 {}x{} 检测到 {} 个候选网格", width, height, grids.len());

    grids.into_iter().find_map(|grid| match grid.decode() {
        Ok((_meta, content)) => Some(content),
        Err(err) => {
            log::debug!("候选网格解码失败：{:?}", err);
            None
        }
    })
}

fn upscale_nearest_x2(luma: &[u8], width: usize, height: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(luma.len() * 4);
    for y in 0..height * 2 {
        let row = &luma[(y / 2) * width..(y / 2 + 1) * width];
        out.extend(row.iter().flat_map(|&v| [v, v]));
    }
    out
}

impl MatrixCodec for QrMatrixCodec {
    fn decode(&self, rgba: &[u8], width: u32, height: u32) -> Result<Option<String>, AppError> {
        let w = width as usize;
        let h = height as usize;
        let expected = w
            .checked_mul(h)
            .and_then(|pixels| pixels.checked_mul(4))
            .ok_or_else(|| AppError::Codec("像素缓冲尺寸溢出".to_string()))?;

        if w == 0 || h == 0 || rgba.len() != expected {
            return Err(AppError::Codec(format!(
                "像素缓冲长度异常：期望 {} 实际 {}（{}x{}）",
                expected,
                rgba.len(),
                width,
                height
            )));
        }

        let luma: Vec<u8> = rgba
            .chunks_exact(4)
            .map(|px| luminance(px[0], px[1], px[2]))
            .collect();

        if let Some(content) = detect_and_decode(&luma, w, h) {
            return Ok(Some(content));
        }

        let upscaled = upscale_nearest_x2(&luma, w, h);
        match detect_and_decode(&upscaled, w * 2, h * 2) {
            Some(content) => {
                log::debug!("🔍 放大 2 倍后识别成功");
                Ok(Some(content))
            }
            None => Ok(None),
        }
    }

    fn encode(&self, text: &str, options: &EncodeOptions) -> Result<Vec<u8>, AppError> {
        let code = QrCode::new(text.as_bytes()).map_err(|e| AppError::Encode(e.to_string()))?;
        let modules = code.width();
        let colors = code.to_colors();

        let margin = options.margin as usize;
        let total = modules + margin * 2;
        let size = (options.width as usize).max(total);
        let scale = size as f64 / total as f64;
        let scaled_margin = margin as f64 * scale;

        let module_at = |pixel: usize| -> Option<usize> {
            let p = pixel as f64;
            if p < scaled_margin || p >= size as f64 - scaled_margin {
                return None;
            }
            let index = ((p - scaled_margin) / scale).floor() as usize;
            (index < modules).then_some(index)
        };

        let dark = Rgba(options.dark.to_rgba());
        let light = Rgba(options.light.to_rgba());
        let side = u32::try_from(size)
            .map_err(|_| AppError::Encode(format!("输出尺寸过大：{}", size)))?;

        let image = RgbaImage::from_fn(side, side, |x, y| {
            match (module_at(y as usize), module_at(x as usize)) {
                (Some(row), Some(col)) if colors[row * modules + col] == Color::Dark => dark,
                _ => light,
            }
        });

        let mut png = Vec::new();
        DynamicImage::ImageRgba8(image)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| AppError::Encode(format!("PNG 编码失败：{}", e)))?;

        log::debug!(
            "🧱 渲染二维码：{} 模块 + {} 留白 -> {}x{} 像素",
            modules,
            margin,
            size,
            size
        );

        Ok(png)
    }
}
