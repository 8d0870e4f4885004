//! # 读取流水线（reader）
//!
//! ## 设计思路
//!
//! 把“选择图片 → 识别二维码”拆成几个单一职责的子模块：
//!
//! - `source`：输入来源与中间数据模型
//! - `loader`：文件 / 字节 / Base64 加载与校验
//! - `normalize`：尺寸归一化（两段式缩放规则）
//! - `decode`：调用矩阵解码器并归类结果、发出通知
//! - `service`：异步编排、请求取消与“最后一次请求生效”
//!
//! ## 调用链
//!
//! ```text
//! WorkbenchController::read
//!    ↓
//! service.rs（请求 id + 取消标志）
//!    ├─ loader.rs（spawn_blocking）
//!    ├─ normalize.rs（共享渲染表面）
//!    └─ decode.rs（spawn_blocking）
//!    ↓
//! 提交到 OutputManager 的交付状态 + 状态通知
//! ```

mod decode;
mod loader;
mod normalize;
mod service;
mod source;

pub use decode::{DECODED_TEXT, DecodeOrchestrator};
pub use loader::load_image;
pub use normalize::{normalize, target_dimensions};
pub use service::ReaderService;
pub use source::{DecodeOutcome, DecodedResult, ImageSource, NO_CODE_TEXT, PixelBuffer};
