//! # 外部能力端口
//!
//! ## 设计思路
//!
//! 浏览器/操作系统提供的三类能力被抽象为 trait，流水线只依赖 trait：
//! - 渲染表面：`SurfaceProvider` / `RenderSurface`（缩放并读回 RGBA）
//! - 系统剪贴板：`ClipboardPort`
//! - 下载落盘：`DownloadSink`
//!
//! 测试中注入内存实现即可在无桌面环境下跑完整流水线。
//!
//! ## 实现思路
//!
//! - `ResampleSurface` 复用一个 `fast_image_resize::Resizer`，
//!   失败时回退到 `image::DynamicImage::resize_exact`。
//! - `SystemClipboard` 基于 `arboard`，每次调用新建句柄；重试由输出层负责。
//! - `DirectoryDownloadSink` 写入指定目录，目录不存在时自动创建。

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use fast_image_resize as fr;
use image::{DynamicImage, GenericImageView};

use crate::error::AppError;
use crate::generator::QrArtifact;
use crate::reader::PixelBuffer;
use crate::settings::ResizeFilter;

/// 可绘制并读回像素的表面。
pub trait RenderSurface: Send {
    /// 把 `image` 缩放绘制到 `width x height`，返回 RGBA 像素。
    fn draw(&mut self, image: &DynamicImage, width: u32, height: u32)
    -> Result<PixelBuffer, AppError>;
}

pub trait SurfaceProvider: Send + Sync {
    /// 拿不到表面时返回 `AppError::CanvasUnavailable`。
    fn acquire(&self) -> Result<Box<dyn RenderSurface>, AppError>;
}

pub trait ClipboardPort: Send + Sync {
    fn set_image(&self, artifact: &QrArtifact) -> Result<(), AppError>;
    fn set_text(&self, text: &str) -> Result<(), AppError>;
}

pub trait DownloadSink: Send + Sync {
    /// 保存文件并返回最终路径。
    fn save(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, AppError>;
}

// ── 渲染表面 ────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct ResampleSurfaceProvider {
    filter: ResizeFilter,
}

impl ResampleSurfaceProvider {
    pub fn new(filter: ResizeFilter) -> Self {
        Self { filter }
    }
}

impl SurfaceProvider for ResampleSurfaceProvider {
    fn acquire(&self) -> Result<Box<dyn RenderSurface>, AppError> {
        log::debug!("🖼️ 创建重采样表面（filter={:?}）", self.filter);
        Ok(Box::new(ResampleSurface::new(self.filter)))
    }
}

pub struct ResampleSurface {
    resizer: fr::Resizer,
    filter: ResizeFilter,
}

impl ResampleSurface {
    pub fn new(filter: ResizeFilter) -> Self {
        Self {
            resizer: fr::Resizer::new(),
            filter,
        }
    }

    fn resize_with_fast_image_resize(
        &mut self,
        image: &DynamicImage,
        width: u32,
        height: u32,
    ) -> Result<Vec<u8>, AppError> {
        let src = image.to_rgba8();
        let (src_width, src_height) = src.dimensions();

        let src_image =
            fr::images::Image::from_vec_u8(src_width, src_height, src.into_raw(), fr::PixelType::U8x4)
                .map_err(|e| AppError::CanvasUnavailable(format!("构建源图像缓冲失败：{}", e)))?;

        let mut dst_image = fr::images::Image::new(width, height, fr::PixelType::U8x4);
        let options = fr::ResizeOptions::new()
            .resize_alg(fr::ResizeAlg::Convolution(self.filter.to_fast_filter()));

        self.resizer
            .resize(&src_image, &mut dst_image, Some(&options))
            .map_err(|e| AppError::CanvasUnavailable(format!("fast_image_resize 执行失败：{}", e)))?;

        Ok(dst_image.into_vec())
    }
}

impl RenderSurface for ResampleSurface {
    fn draw(
        &mut self,
        image: &DynamicImage,
        width: u32,
        height: u32,
    ) -> Result<PixelBuffer, AppError> {
        if image.dimensions() == (width, height) {
            return PixelBuffer::new(width, height, image.to_rgba8().into_raw());
        }

        let data = match self.resize_with_fast_image_resize(image, width, height) {
            Ok(data) => data,
            Err(err) => {
                log::warn!("⚠️ fast_image_resize 缩放失败，回退 image::resize_exact：{}", err);
                image
                    .resize_exact(width, height, self.filter.to_image_filter())
                    .to_rgba8()
                    .into_raw()
            }
        };

        PixelBuffer::new(width, height, data)
    }
}

// ── 系统剪贴板 ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClipboard;

impl SystemClipboard {
    pub fn new() -> Self {
        Self
    }

    fn open() -> Result<arboard::Clipboard, AppError> {
        arboard::Clipboard::new().map_err(|e| AppError::Clipboard(format!("无法访问剪贴板：{}", e)))
    }
}

impl ClipboardPort for SystemClipboard {
    fn set_image(&self, artifact: &QrArtifact) -> Result<(), AppError> {
        // arboard 只接受 RGBA，先在打开剪贴板之前完成解码
        let rgba = image::load_from_memory(&artifact.bytes)
            .map_err(|e| AppError::Clipboard(format!("无法解析 {} 图片：{}", artifact.mime, e)))?
            .to_rgba8();
        let (width, height) = rgba.dimensions();

        let image_data = arboard::ImageData {
            width: width as usize,
            height: height as usize,
            bytes: Cow::Owned(rgba.into_raw()),
        };

        Self::open()?
            .set_image(image_data)
            .map_err(|e| AppError::Clipboard(format!("复制图片失败：{}", e)))
    }

    fn set_text(&self, text: &str) -> Result<(), AppError> {
        Self::open()?
            .set_text(text.to_string())
            .map_err(|e| AppError::Clipboard(format!("复制文本失败：{}", e)))
    }
}

// ── 下载落盘 ────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DirectoryDownloadSink {
    dir: PathBuf,
}

impl DirectoryDownloadSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// 未配置目录时使用系统临时目录下的 `qr-workbench`。
    pub fn from_config(dir: Option<&Path>) -> Self {
        match dir {
            Some(dir) => Self::new(dir),
            None => Self::new(std::env::temp_dir().join("qr-workbench")),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DownloadSink for DirectoryDownloadSink {
    fn save(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, AppError> {
        let name = Path::new(file_name)
            .file_name()
            .ok_or_else(|| AppError::Config(format!("下载文件名无效：{}", file_name)))?;

        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);
        fs::write(&path, bytes)?;

        log::info!("💾 已保存文件：{}（{} 字节）", path.display(), bytes.len());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use image::{Rgba, RgbaImage};

    use super::*;

    fn unique_temp_dir() -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock error")
            .as_nanos();
        std::env::temp_dir().join(format!("qr-workbench-ports-test-{nanos}"))
    }

    fn checkerboard(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
            if (x / 4 + y / 4) % 2 == 0 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        }))
    }

    #[test]
    fn resample_surface_downscales_and_upscales() {
        let provider = ResampleSurfaceProvider::new(ResizeFilter::Bilinear);
        let mut surface = provider.acquire().expect("surface");

        let down = surface.draw(&checkerboard(64, 32), 16, 8).expect("downscale");
        assert_eq!((down.width, down.height), (16, 8));
        assert_eq!(down.data.len(), 16 * 8 * 4);

        let up = surface.draw(&checkerboard(10, 10), 40, 40).expect("upscale");
        assert_eq!((up.width, up.height), (40, 40));
    }

    #[test]
    fn same_size_draw_copies_pixels() {
        let mut surface = ResampleSurface::new(ResizeFilter::Nearest);
        let image = checkerboard(8, 8);
        let buffer = surface.draw(&image, 8, 8).expect("draw");
        assert_eq!(buffer.data, image.to_rgba8().into_raw());
    }

    #[test]
    fn directory_sink_creates_dir_and_writes_file() {
        let dir = unique_temp_dir();
        let sink = DirectoryDownloadSink::new(dir.join("downloads"));

        let path = sink.save("qr-code.png", b"png-bytes").expect("save");
        assert_eq!(path, dir.join("downloads").join("qr-code.png"));
        assert_eq!(fs::read(&path).expect("read back"), b"png-bytes");
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn directory_sink_strips_parent_components() {
        let dir = unique_temp_dir();
        let sink = DirectoryDownloadSink::new(&dir);

        let path = sink.save("../escape.png", b"x").expect("save");
        assert_eq!(path, dir.join("escape.png"));
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    #[ignore = "requires system clipboard access"]
    fn system_clipboard_accepts_text() {
        SystemClipboard::new().set_text("qr-workbench").expect("set text");
    }
}
