//! # 解码编排
//!
//! 把归一化后的像素交给矩阵解码器并给出结论：
//! - 解出文本：`found = true`，成功通知 `"QR code decoded"`
//! - 没有二维码：`found = false` + 占位文本，警告通知 `"No QR code found"`
//! - 解码器异常：错误通知，不产生“假阳性”结果
//!
//! 通知与判定拆成两步（`decode` / `report`），
//! 读取服务只在结果真正提交后才调用 `report`。

use std::sync::Arc;
use std::time::Instant;

use super::source::{DecodedResult, NO_CODE_TEXT, PixelBuffer};
use crate::codec::MatrixCodec;
use crate::error::AppError;
use crate::notify::NotificationBus;

pub const DECODED_TEXT: &str = "QR code decoded";

#[derive(Clone)]
pub struct DecodeOrchestrator {
    codec: Arc<dyn MatrixCodec>,
    bus: NotificationBus,
}

impl DecodeOrchestrator {
    pub fn new(codec: Arc<dyn MatrixCodec>, bus: NotificationBus) -> Self {
        Self { codec, bus }
    }

    /// 把解码器的可选输出归类为 `DecodedResult`。
    pub(crate) fn classify(text: Option<String>) -> DecodedResult {
        match text {
            Some(text) => DecodedResult::found(text),
            None => DecodedResult::not_found(),
        }
    }

    /// 只做判定，不发通知。
    pub fn decode(&self, pixels: &PixelBuffer) -> Result<DecodedResult, AppError> {
        let started = Instant::now();
        let text = self.codec.decode(&pixels.data, pixels.width, pixels.height)?;
        let result = Self::classify(text);

        log::info!(
            "🔎 解码完成 - {}x{} found={} 耗时 {}ms",
            pixels.width,
            pixels.height,
            result.found,
            started.elapsed().as_millis()
        );
        Ok(result)
    }

    /// 按结论发出一条通知。
    pub fn report(&self, result: &Result<DecodedResult, AppError>) {
        match result {
            Ok(decoded) if decoded.found => self.bus.success(DECODED_TEXT),
            Ok(_) => self.bus.warning(NO_CODE_TEXT),
            Err(err) => {
                log::error!("❌ 读取失败 [{}:{}] {}", err.stage(), err.code(), err);
                self.bus.error(err.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::EncodeOptions;
    use crate::notify::StatusKind;

    struct FixedCodec(Result<Option<String>, ()>);

    impl MatrixCodec for FixedCodec {
        fn decode(&self, _: &[u8], _: u32, _: u32) -> Result<Option<String>, AppError> {
            self.0
                .clone()
                .map_err(|_| AppError::Codec("broken".to_string()))
        }

        fn encode(&self, _: &str, _: &EncodeOptions) -> Result<Vec<u8>, AppError> {
            Err(AppError::Encode("unused".to_string()))
        }
    }

    fn pixels() -> PixelBuffer {
        PixelBuffer::new(1, 1, vec![0, 0, 0, 255]).expect("pixel buffer")
    }

    fn run(codec: FixedCodec) -> (Result<DecodedResult, AppError>, StatusKind, String) {
        let bus = NotificationBus::new();
        let mut rx = bus.subscribe();
        let orchestrator = DecodeOrchestrator::new(Arc::new(codec), bus);
        let result = orchestrator.decode(&pixels());
        orchestrator.report(&result);
        let status = rx.try_recv().expect("status");
        (result, status.kind, status.text)
    }

    #[test]
    fn found_text_is_success() {
        let (result, kind, text) = run(FixedCodec(Ok(Some("URL: a;".into()))));
        assert_eq!(result.expect("decode"), DecodedResult::found("URL: a;"));
        assert_eq!(kind, StatusKind::Success);
        assert_eq!(text, DECODED_TEXT);
    }

    #[test]
    fn absent_code_is_warning_not_error() {
        let (result, kind, text) = run(FixedCodec(Ok(None)));
        let result = result.expect("decode");
        assert!(!result.found);
        assert_eq!(result.text, NO_CODE_TEXT);
        assert_eq!(kind, StatusKind::Warning);
        assert_eq!(text, NO_CODE_TEXT);
    }

    #[test]
    fn codec_failure_is_error_status() {
        let (result, kind, _) = run(FixedCodec(Err(())));
        assert!(matches!(result, Err(AppError::Codec(_))));
        assert_eq!(kind, StatusKind::Error);
    }

    #[test]
    fn decode_alone_emits_nothing() {
        let bus = NotificationBus::new();
        let mut rx = bus.subscribe();
        let orchestrator = DecodeOrchestrator::new(Arc::new(FixedCodec(Ok(None))), bus);

        orchestrator.decode(&pixels()).expect("decode");
        assert!(rx.try_recv().is_err());
    }
}
