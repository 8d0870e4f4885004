//! # 读取服务
//!
//! ## 设计思路
//!
//! 用户每选择一张图片就发起一次读取请求，请求之间可能重叠。
//! 约束只有一条：最后发起的请求决定最终状态。
//!
//! ## 实现思路
//!
//! - 每个请求分配单调递增的 id 与一个 `Arc<AtomicBool>` 取消标志；
//!   新请求开始时把所有更早的在途标志置位。
//! - 流水线在每个阶段之间检查标志，被取代的请求返回 `DecodeOutcome::Superseded`，
//!   不写状态也不发通知。
//! - 提交（检查标志 + 写入交付状态 + 发通知）在同一把锁内完成。
//! - 渲染表面首次使用时才创建，之后复用；每次只在缩放阶段持有它的异步锁。
//! - 加载、缩放、解码都在 `spawn_blocking` 中执行。

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use image::DynamicImage;

use super::decode::DecodeOrchestrator;
use super::loader;
use super::normalize;
use super::source::{DecodeOutcome, DecodedResult, ImageSource, PixelBuffer};
use crate::error::AppError;
use crate::output::OutputManager;
use crate::ports::{RenderSurface, SurfaceProvider};
use crate::settings::{LoaderConfig, NormalizeConfig};

type SharedSurface = Arc<tokio::sync::Mutex<Option<Box<dyn RenderSurface>>>>;

pub struct ReaderService {
    loader: LoaderConfig,
    normalize: NormalizeConfig,
    provider: Arc<dyn SurfaceProvider>,
    surface: SharedSurface,
    decoder: DecodeOrchestrator,
    output: OutputManager,
    next_id: AtomicU64,
    cancel_flags: Mutex<HashMap<u64, Arc<AtomicBool>>>,
}

impl ReaderService {
    pub fn new(
        loader: LoaderConfig,
        normalize: NormalizeConfig,
        provider: Arc<dyn SurfaceProvider>,
        decoder: DecodeOrchestrator,
        output: OutputManager,
    ) -> Self {
        Self {
            loader,
            normalize,
            provider,
            surface: Arc::new(tokio::sync::Mutex::new(None)),
            decoder,
            output,
            next_id: AtomicU64::new(0),
            cancel_flags: Mutex::new(HashMap::new()),
        }
    }

    /// 执行一次完整读取：加载 → 归一化 → 解码 → 提交。
    ///
    /// 返回 `Err` 时已经发出错误通知，且解码结果保持上一次的值。
    pub async fn read(&self, source: ImageSource) -> Result<DecodeOutcome, AppError> {
        let (request_id, flag) = self.begin();
        log::info!("📥 读取请求 #{} 开始 - 来源: {}", request_id, source.hint());

        let result = self.run(request_id, source, &flag).await;
        self.commit(request_id, &flag, result)
    }

    /// 取消所有在途请求，返回被取消的数量。
    pub fn cancel_all(&self) -> usize {
        let guard = self.lock_flags();
        for flag in guard.values() {
            flag.store(true, Ordering::SeqCst);
        }
        guard.len()
    }

    pub fn in_flight(&self) -> usize {
        self.lock_flags().len()
    }

    /// 标志表只含独立的原子标志，持锁线程 panic 后内容依然有效，直接取回。
    fn lock_flags(&self) -> MutexGuard<'_, HashMap<u64, Arc<AtomicBool>>> {
        self.cancel_flags.lock().unwrap_or_else(|poisoned| {
            log::warn!("⚠️ 读取取消标志锁已中毒，继续使用内部数据");
            poisoned.into_inner()
        })
    }

    fn begin(&self) -> (u64, Arc<AtomicBool>) {
        let flag = Arc::new(AtomicBool::new(false));
        let mut guard = self.lock_flags();

        for (older_id, older) in guard.iter() {
            if !older.swap(true, Ordering::SeqCst) {
                log::debug!("⏭️ 读取请求 #{} 被新请求取代", older_id);
            }
        }

        let request_id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        guard.insert(request_id, Arc::clone(&flag));
        (request_id, flag)
    }

    async fn run(
        &self,
        request_id: u64,
        source: ImageSource,
        flag: &Arc<AtomicBool>,
    ) -> Result<DecodedResult, AppError> {
        let is_cancelled = || flag.load(Ordering::SeqCst);
        let cancelled = || AppError::Cancelled(format!("读取请求 #{} 已被取代", request_id));
        let total_start = Instant::now();

        let load_start = Instant::now();
        let loader_config = self.loader.clone();
        let image = tokio::task::spawn_blocking(move || loader::load_image(&source, &loader_config))
            .await
            .map_err(|e| AppError::ImageLoad(format!("线程执行失败：{}", e)))??;
        let load_elapsed = load_start.elapsed();
        if is_cancelled() {
            return Err(cancelled());
        }

        let normalize_start = Instant::now();
        let pixels = self.normalize_on_surface(image).await?;
        let normalize_elapsed = normalize_start.elapsed();
        if is_cancelled() {
            return Err(cancelled());
        }

        let decode_start = Instant::now();
        let decoder = self.decoder.clone();
        let decoded = tokio::task::spawn_blocking(move || decoder.decode(&pixels))
            .await
            .map_err(|e| AppError::Codec(format!("线程执行失败：{}", e)))??;
        let decode_elapsed = decode_start.elapsed();

        log::info!(
            "✅ 读取请求 #{} 完成 - load={}ms normalize={}ms decode={}ms total={}ms",
            request_id,
            load_elapsed.as_millis(),
            normalize_elapsed.as_millis(),
            decode_elapsed.as_millis(),
            total_start.elapsed().as_millis()
        );
        Ok(decoded)
    }

    async fn normalize_on_surface(&self, image: DynamicImage) -> Result<PixelBuffer, AppError> {
        let mut guard = Arc::clone(&self.surface).lock_owned().await;
        let provider = Arc::clone(&self.provider);
        let config = self.normalize.clone();

        tokio::task::spawn_blocking(move || {
            if guard.is_none() {
                *guard = Some(provider.acquire()?);
            }
            match guard.as_mut() {
                Some(surface) => normalize::normalize(&mut **surface, &image, &config),
                None => Err(AppError::CanvasUnavailable("渲染表面未初始化".to_string())),
            }
        })
        .await
        .map_err(|e| AppError::CanvasUnavailable(format!("线程执行失败：{}", e)))?
    }

    fn commit(
        &self,
        request_id: u64,
        flag: &Arc<AtomicBool>,
        result: Result<DecodedResult, AppError>,
    ) -> Result<DecodeOutcome, AppError> {
        let mut guard = self.lock_flags();
        guard.remove(&request_id);

        if flag.load(Ordering::SeqCst) {
            log::debug!("🗑️ 丢弃读取请求 #{} 的结果", request_id);
            return Ok(DecodeOutcome::Superseded);
        }

        if let Ok(decoded) = &result {
            self.output.set_decoded(decoded.clone());
        }
        self.decoder.report(&result);
        drop(guard);

        result.map(DecodeOutcome::Completed)
    }
}
