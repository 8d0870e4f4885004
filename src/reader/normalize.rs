//! # 尺寸归一化
//!
//! 把任意尺寸的输入缩放到解码器友好的窗口内：
//!
//! 1. `scale = min(max / w, max / h)`，先按最长边收进 `max_size`；
//! 2. 若任一边因此小于 `min_size`，改用 `max(min / w, min / h)`。
//!
//! 第二步可能让细长图片的长边超过 `max_size`（例如 100x400 -> 200x800），
//! 这是有意保留的行为：保证短边至少有 `min_size` 像素可供识别。
//! 最终尺寸为 `floor(w * scale)` / `floor(h * scale)`，全程使用 `f64`。

use image::{DynamicImage, GenericImageView};

use super::source::PixelBuffer;
use crate::error::AppError;
use crate::ports::RenderSurface;
use crate::settings::NormalizeConfig;

/// 计算归一化后的目标尺寸。
pub fn target_dimensions(width: u32, height: u32, config: &NormalizeConfig) -> (u32, u32) {
    let w = width as f64;
    let h = height as f64;
    let max = config.max_size as f64;
    let min = config.min_size as f64;

    let mut scale = (max / w).min(max / h);
    if w * scale < min || h * scale < min {
        scale = (min / w).max(min / h);
    }

    (floor_to_u32(w * scale), floor_to_u32(h * scale))
}

fn floor_to_u32(value: f64) -> u32 {
    value.floor().clamp(0.0, u32::MAX as f64) as u32
}

/// 在渲染表面上把图片缩放到目标尺寸并读回像素。
pub fn normalize(
    surface: &mut dyn RenderSurface,
    image: &DynamicImage,
    config: &NormalizeConfig,
) -> Result<PixelBuffer, AppError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(AppError::ImageLoad(format!("图片尺寸无效：{}x{}", width, height)));
    }

    let (target_width, target_height) = target_dimensions(width, height, config);
    let area = target_width as u64 * target_height as u64;
    if target_width == 0 || target_height == 0 || area > config.max_surface_pixels {
        return Err(AppError::CanvasUnavailable(format!(
            "目标尺寸 {}x{} 超出渲染表面限制（{} 像素）",
            target_width, target_height, config.max_surface_pixels
        )));
    }

    log::debug!(
        "📐 归一化：{}x{} -> {}x{}",
        width,
        height,
        target_width,
        target_height
    );
    surface.draw(image, target_width, target_height)
}
