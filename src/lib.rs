//! # 二维码工作台 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                UI 外壳（路由 / 页面 / 样式）              │
//! │        订阅 NotificationBus · 调用 WorkbenchController    │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↕ Result<T, AppError> + StatusMessage
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕            核心 (Rust)                           │
//! │                                                          │
//! │  controller ── ActiveTool · FieldComposer · ColorConfig  │
//! │   ├─ reader      加载 → 归一化 → 解码 → 提交             │
//! │   ├─ generator   组合载荷 → 编码 → QrArtifact            │
//! │   └─ output      下载 / 复制图片 / 复制文本              │
//! │                                                          │
//! │  codec ──── MatrixCodec（qrcode / rqrr）                 │
//! │  ports ──── 渲染表面 · 剪贴板 · 下载落盘                 │
//! │  notify ─── 状态通知总线                                 │
//! │  settings · logging · error                             │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError` 与表单校验错误 `ValidationError` |
//! | [`color`] | 已校验的前景/背景颜色 |
//! | [`composer`] | 多字段表单与规范载荷的组合、拆分 |
//! | [`codec`] | 矩阵编解码端口及其 `qrcode`/`rqrr` 实现 |
//! | [`ports`] | 渲染表面、剪贴板、下载落盘端口及系统实现 |
//! | [`reader`] | 图片读取流水线与“最后一次请求生效” |
//! | [`generator`] | 二维码生成编排与 `QrArtifact` |
//! | [`output`] | 共享交付状态与下载/复制 |
//! | [`notify`] | 发出即忘的状态通知 |
//! | [`controller`] | 工作台状态与具名状态转换 |
//! | [`settings`] | JSON 配置加载与默认值 |
//! | [`logging`] | `env_logger` 初始化 |

pub mod codec;
pub mod color;
pub mod composer;
pub mod controller;
pub mod error;
pub mod generator;
pub mod logging;
pub mod notify;
pub mod output;
pub mod ports;
pub mod reader;
pub mod settings;

pub use controller::{ActiveTool, WorkbenchController, WorkbenchPorts};
pub use error::{AppError, ValidationError};
