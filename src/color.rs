//! 二维码颜色配置
//!
//! # 设计思路
//!
//! `ColorConfig` 是纯值类型：前景（码点）与背景两个已校验的 `#rrggbb` 颜色。
//! 每次生成请求传入一份快照，编码阶段不会再看到未校验的字符串。
//!
//! # 实现思路
//!
//! - 使用 `once_cell::sync::Lazy` 预编译颜色正则。
//! - 统一存储为小写，比较与序列化结果稳定。
//! - 前景与背景相同是允许的（生成出的码几乎无法识别，但不做拦截）。

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

static HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("hex color pattern must compile"));

pub const DEFAULT_DOT: &str = "#000000";
pub const DEFAULT_BACKGROUND: &str = "#ffffff";

/// 已校验的 `#rrggbb` 颜色。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(String);

impl HexColor {
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let trimmed = value.trim();
        if !HEX_COLOR.is_match(trimmed) {
            return Err(ValidationError::InvalidColor {
                value: value.to_string(),
            });
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 转为不透明 RGBA 分量。
    pub fn to_rgba(&self) -> [u8; 4] {
        let channel = |start: usize| u8::from_str_radix(&self.0[start..start + 2], 16).unwrap_or(0);
        [channel(1), channel(3), channel(5), 255]
    }
}

impl TryFrom<String> for HexColor {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.0
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 码点颜色与背景颜色。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorConfig {
    dot: HexColor,
    background: HexColor,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            dot: HexColor(DEFAULT_DOT.to_string()),
            background: HexColor(DEFAULT_BACKGROUND.to_string()),
        }
    }
}

impl ColorConfig {
    pub fn new(dot: &str, background: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            dot: HexColor::parse(dot)?,
            background: HexColor::parse(background)?,
        })
    }

    pub fn dot(&self) -> &HexColor {
        &self.dot
    }

    pub fn background(&self) -> &HexColor {
        &self.background
    }

    /// 校验失败时保持原值不变。
    pub fn set_dot(&mut self, value: &str) -> Result<(), ValidationError> {
        self.dot = HexColor::parse(value)?;
        Ok(())
    }

    pub fn set_background(&mut self, value: &str) -> Result<(), ValidationError> {
        self.background = HexColor::parse(value)?;
        Ok(())
    }

    /// 恢复为黑码白底，与当前值无关。
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_low_contrast(&self) -> bool {
        self.dot == self.background
    }
}
