//! # 状态通知总线
//!
//! ## 设计思路
//!
//! 进程级、发出即忘的状态通道。编排层只负责“发出”，
//! 从不等待也不检查 UI 外壳是否消费。
//!
//! ## 实现思路
//!
//! - 基于 `tokio::sync::broadcast`，没有订阅者时发送失败被直接忽略。
//! - 每条消息同时按级别写入 `log`，便于无 UI 时排障。
//! - `NotificationBus` 可廉价克隆，读写两条流水线共享同一个实例。

use chrono::{DateTime, Local};
use serde::Serialize;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 64;

/// 状态级别。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Success,
    Info,
    Warning,
    Error,
}

impl StatusKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// 一条瞬时状态消息。
#[derive(Debug, Clone, Serialize)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
    pub created_at: DateTime<Local>,
}

#[derive(Debug, Clone)]
pub struct NotificationBus {
    sender: broadcast::Sender<StatusMessage>,
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// 订阅后续消息；订阅前发出的消息不会补发。
    pub fn subscribe(&self) -> broadcast::Receiver<StatusMessage> {
        self.sender.subscribe()
    }

    pub fn emit(&self, kind: StatusKind, text: impl Into<String>) {
        let text = text.into();
        match kind {
            StatusKind::Error => log::error!("🔔 [{}] {}", kind.as_str(), text),
            StatusKind::Warning => log::warn!("🔔 [{}] {}", kind.as_str(), text),
            StatusKind::Success | StatusKind::Info => log::info!("🔔 [{}] {}", kind.as_str(), text),
        }

        let message = StatusMessage {
            kind,
            text,
            created_at: Local::now(),
        };
        let _ = self.sender.send(message);
    }

    pub fn success(&self, text: impl Into<String>) {
        self.emit(StatusKind::Success, text);
    }

    pub fn info(&self, text: impl Into<String>) {
        self.emit(StatusKind::Info, text);
    }

    pub fn warning(&self, text: impl Into<String>) {
        self.emit(StatusKind::Warning, text);
    }

    pub fn error(&self, text: impl Into<String>) {
        self.emit(StatusKind::Error, text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_without_subscribers_is_silent() {
        let bus = NotificationBus::new();
        bus.error("nobody listening");
    }

    #[test]
    fn subscribers_receive_messages_in_order() {
        let bus = NotificationBus::new();
        let mut rx = bus.subscribe();

        bus.success("one");
        bus.warning("two");

        let first = rx.try_recv().expect("first message");
        let second = rx.try_recv().expect("second message");
        assert_eq!(first.kind, StatusKind::Success);
        assert_eq!(first.text, "one");
        assert_eq!(second.kind, StatusKind::Warning);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn clones_share_one_channel() {
        let bus = NotificationBus::new();
        let mut rx = bus.subscribe();

        bus.clone().info("from clone");

        assert_eq!(rx.try_recv().expect("message").text, "from clone");
    }

    #[test]
    fn status_kind_serializes_lowercase() {
        let json = serde_json::to_string(&StatusKind::Warning).expect("serialize kind");
        assert_eq!(json, "\"warning\"");
    }
}
