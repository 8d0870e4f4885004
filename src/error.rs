//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义全局统一的 `AppError` 枚举，覆盖读取、归一化、编解码、校验与输出各阶段。
//! 每个错误都在离源头最近的编排层被转换为一条 `StatusMessage`，
//! 同时以 `Result` 形式返回给控制器。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - `code()` / `stage()` 提供稳定的机器可读标识，供 UI 外壳分支处理。
//! - 实现 `Serialize` 将错误序列化为字符串。
//! - “未识别到二维码”不是错误，不在此枚举中出现。

use serde::Serialize;

/// 表单与颜色输入的校验错误。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// 提交时没有任何字段
    #[error("至少需要一个字段")]
    NoFields,

    /// 某个字段的值为空（`index` 从 0 开始）
    #[error("第 {} 个字段缺少值：Enter a value", .index + 1)]
    EmptyValue { index: usize },

    /// 增删改时索引越界
    #[error("字段索引越界：{index}（共 {len} 个字段）")]
    IndexOutOfRange { index: usize, len: usize },

    /// 颜色不是 `#RRGGBB` 形式
    #[error("颜色格式无效：{value}（应为 #RRGGBB）")]
    InvalidColor { value: String },
}

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 文件不可读或图片解码失败
    #[error("图片加载失败：{0}")]
    ImageLoad(String),

    /// 无法获取渲染表面
    #[error("渲染表面不可用：{0}")]
    CanvasUnavailable(String),

    /// 解码器内部异常（与“未识别到二维码”不同）
    #[error("二维码解码异常：{0}")]
    Codec(String),

    /// 编码器拒绝内容或参数（例如超出容量）
    #[error("二维码生成失败：{0}")]
    Encode(String),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// 剪贴板不可用或拒绝写入
    #[error("剪贴板操作失败：{0}")]
    Clipboard(String),

    /// 文件系统 I/O 错误
    #[error("文件系统错误：{0}")]
    Io(#[from] std::io::Error),

    /// 配置文件无法解析或写入
    #[error("配置错误：{0}")]
    Config(String),

    /// 读取请求已被更新的请求取代
    #[error("请求已取消：{0}")]
    Cancelled(String),
}

impl AppError {
    /// 稳定的错误码，供 UI 外壳匹配。
    pub fn code(&self) -> &'static str {
        match self {
            Self::ImageLoad(_) => "E_IMAGE_LOAD",
            Self::CanvasUnavailable(_) => "E_CANVAS_UNAVAILABLE",
            Self::Codec(_) => "E_CODEC",
            Self::Encode(_) => "E_ENCODE",
            Self::Validation(_) => "E_VALIDATION",
            Self::Clipboard(_) => "E_CLIPBOARD",
            Self::Io(_) => "E_IO",
            Self::Config(_) => "E_CONFIG",
            Self::Cancelled(_) => "E_CANCELLED",
        }
    }

    /// 出错的流水线阶段。
    pub fn stage(&self) -> &'static str {
        match self {
            Self::ImageLoad(_) => "load",
            Self::CanvasUnavailable(_) => "normalize",
            Self::Codec(_) | Self::Cancelled(_) => "decode",
            Self::Encode(_) => "encode",
            Self::Validation(_) => "compose",
            Self::Clipboard(_) | Self::Io(_) => "output",
            Self::Config(_) => "config",
        }
    }
}

/// UI 外壳要求错误可序列化，这里输出人类可读字符串。
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{AppError, ValidationError};

    #[test]
    fn empty_value_message_uses_one_based_position() {
        let err = AppError::from(ValidationError::EmptyValue { index: 1 });
        assert!(err.to_string().contains("第 2 个字段"));
        assert_eq!(err.code(), "E_VALIDATION");
        assert_eq!(err.stage(), "compose");
    }

    #[test]
    fn serializes_as_display_string() {
        let err = AppError::Clipboard("denied".to_string());
        let json = serde_json::to_string(&err).expect("serialize error");
        assert_eq!(json, "\"剪贴板操作失败：denied\"");
    }

    #[test]
    fn io_errors_map_to_output_stage() {
        let err = AppError::from(std::io::Error::other("disk full"));
        assert_eq!(err.code(), "E_IO");
        assert_eq!(err.stage(), "output");
    }
}
