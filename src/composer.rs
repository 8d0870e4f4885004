//! # 字段组合模块
//!
//! ## 设计思路
//!
//! 生成页的表单是一组有序的“类型: 值”条目，最终被序列化为一个规范文本载荷，
//! 再交给编码器。读取页展示解码结果时，按同样的约定把文本拆回键值对。
//!
//! ## 实现思路
//!
//! - `FieldComposer` 持有有序条目，新建时带一条空的 `URL` 条目。
//! - `compose()` 先校验再序列化：`"<type>: <value>;"`，条目之间用 `\n` 连接。
//! - `parse_payload()` 以 `;` 切分、以第一个 `:` 拆键值，值中后续的 `:` 原样保留。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// 字段类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FieldType {
    #[default]
    #[serde(rename = "URL")]
    Url,
    Email,
    #[serde(rename = "SMS")]
    Sms,
    Subject,
    Phone,
    Note,
    Name,
    Company,
    Address,
    Message,
    Password,
    StartDate,
    EndDate,
}

/// 输入框类型提示（对应表单 `<input type>`）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Email,
    Number,
    Url,
    Text,
}

impl FieldType {
    pub const ALL: [FieldType; 13] = [
        FieldType::Url,
        FieldType::Email,
        FieldType::Sms,
        FieldType::Subject,
        FieldType::Phone,
        FieldType::Note,
        FieldType::Name,
        FieldType::Company,
        FieldType::Address,
        FieldType::Message,
        FieldType::Password,
        FieldType::StartDate,
        FieldType::EndDate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Url => "URL",
            Self::Email => "Email",
            Self::Sms => "SMS",
            Self::Subject => "Subject",
            Self::Phone => "Phone",
            Self::Note => "Note",
            Self::Name => "Name",
            Self::Company => "Company",
            Self::Address => "Address",
            Self::Message => "Message",
            Self::Password => "Password",
            Self::StartDate => "StartDate",
            Self::EndDate => "EndDate",
        }
    }

    pub fn input_kind(self) -> InputKind {
        match self {
            Self::Email => InputKind::Email,
            Self::Phone => InputKind::Number,
            Self::Url => InputKind::Url,
            _ => InputKind::Text,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|ty| ty.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("未知字段类型：{}", wanted))
    }
}

/// 表单中的一条字段。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FieldEntry {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub value: String,
}

impl FieldEntry {
    pub fn new(field_type: FieldType, value: impl Into<String>) -> Self {
        Self {
            field_type,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldComposer {
    entries: Vec<FieldEntry>,
}

impl Default for FieldComposer {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldComposer {
    pub fn new() -> Self {
        Self {
            entries: vec![FieldEntry::default()],
        }
    }

    pub fn from_entries(entries: Vec<FieldEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[FieldEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 追加一条默认类型、空值的条目，返回其索引。
    pub fn add(&mut self) -> usize {
        self.entries.push(FieldEntry::default());
        self.entries.len() - 1
    }

    pub fn remove(&mut self, index: usize) -> Result<FieldEntry, ValidationError> {
        self.check_index(index)?;
        Ok(self.entries.remove(index))
    }

    pub fn update(
        &mut self,
        index: usize,
        field_type: Option<FieldType>,
        value: Option<String>,
    ) -> Result<(), ValidationError> {
        self.check_index(index)?;
        let entry = &mut self.entries[index];
        if let Some(field_type) = field_type {
            entry.field_type = field_type;
        }
        if let Some(value) = value {
            entry.value = value;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.entries.is_empty() {
            return Err(ValidationError::NoFields);
        }
        match self.entries.iter().position(|entry| entry.value.is_empty()) {
            Some(index) => Err(ValidationError::EmptyValue { index }),
            None => Ok(()),
        }
    }

    /// 校验并序列化为规范载荷。
    ///
    /// # 示例
    /// ```rust
    /// use qr_workbench::composer::{FieldComposer, FieldEntry, FieldType};
    ///
    /// let composer = FieldComposer::from_entries(vec![
    ///     FieldEntry::new(FieldType::Url, "a"),
    ///     FieldEntry::new(FieldType::Email, "b"),
    /// ]);
    /// assert_eq!(composer.compose()?, "URL: a;\nEmail: b;");
    /// # Ok::<(), qr_workbench::error::ValidationError>(())
    /// ```
    pub fn compose(&self) -> Result<String, ValidationError> {
        self.validate()?;
        Ok(self
            .entries
            .iter()
            .map(|entry| format!("{}: {};", entry.field_type, entry.value))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn check_index(&self, index: usize) -> Result<(), ValidationError> {
        if index >= self.entries.len() {
            return Err(ValidationError::IndexOutOfRange {
                index,
                len: self.entries.len(),
            });
        }
        Ok(())
    }
}

/// 解码结果拆出的展示用键值对。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedField {
    pub key: String,
    /// 原文没有 `:` 时为 `None`。
    pub value: Option<String>,
}

/// 把解码文本按载荷约定拆成键值对，仅用于展示（键两端空白会被去掉）。
pub fn parse_payload(text: &str) -> Vec<DecodedField> {
    text.split(';')
        .filter(|part| !part.trim().is_empty())
        .map(|part| match part.split_once(':') {
            Some((key, rest)) => DecodedField {
                key: key.trim().to_string(),
                value: Some(rest.strip_prefix(' ').unwrap_or(rest).to_string()),
            },
            None => DecodedField {
                key: part.trim().to_string(),
                value: None,
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn composer(entries: &[(FieldType, &str)]) -> FieldComposer {
        FieldComposer::from_entries(
            entries
                .iter()
                .map(|(ty, value)| FieldEntry::new(*ty, *value))
                .collect(),
        )
    }

    #[test]
    fn new_composer_starts_with_empty_url_row() {
        let composer = FieldComposer::new();
        assert_eq!(composer.entries(), &[FieldEntry::new(FieldType::Url, "")]);
    }

    #[test]
    fn compose_single_entry() {
        let composer = composer(&[(FieldType::Url, "http://a")]);
        assert_eq!(composer.compose().expect("compose"), "URL: http://a;");
    }

    #[test]
    fn compose_joins_entries_with_newline_in_order() {
        let composer = composer(&[(FieldType::Url, "a"), (FieldType::Email, "b")]);
        assert_eq!(composer.compose().expect("compose"), "URL: a;\nEmail: b;");
    }

    #[test]
    fn compose_rejects_first_empty_value_by_index() {
        let composer = composer(&[
            (FieldType::Name, "x"),
            (FieldType::Phone, ""),
            (FieldType::Note, ""),
        ]);
        assert_eq!(composer.compose(), Err(ValidationError::EmptyValue { index: 1 }));
    }

    #[test]
    fn compose_rejects_empty_form() {
        let mut composer = FieldComposer::new();
        composer.remove(0).expect("remove initial row");
        assert_eq!(composer.compose(), Err(ValidationError::NoFields));
    }

    #[test]
    fn whitespace_value_counts_as_present() {
        let composer = composer(&[(FieldType::Note, " ")]);
        assert_eq!(composer.compose().expect("compose"), "Note:  ;");
    }

    #[test]
    fn add_update_remove_keep_order() {
        let mut composer = FieldComposer::new();
        let second = composer.add();
        assert_eq!(second, 1);

        composer
            .update(0, None, Some("https://example.com".into()))
            .expect("update first");
        composer
            .update(1, Some(FieldType::Sms), Some("hi".into()))
            .expect("update second");
        let third = composer.add();
        composer
            .update(third, Some(FieldType::EndDate), Some("2025-01-01".into()))
            .expect("update third");

        let removed = composer.remove(1).expect("remove middle");
        assert_eq!(removed, FieldEntry::new(FieldType::Sms, "hi"));
        assert_eq!(
            composer.compose().expect("compose"),
            "URL: https://example.com;\nEndDate: 2025-01-01;"
        );
    }

    #[test]
    fn out_of_range_index_is_reported() {
        let mut composer = FieldComposer::new();
        assert_eq!(
            composer.remove(3),
            Err(ValidationError::IndexOutOfRange { index: 3, len: 1 })
        );
        assert_eq!(
            composer.update(1, Some(FieldType::Email), None),
            Err(ValidationError::IndexOutOfRange { index: 1, len: 1 })
        );
        assert_eq!(composer.len(), 1);
    }

    #[test]
    fn field_type_names_roundtrip_through_from_str() {
        for ty in FieldType::ALL {
            assert_eq!(ty.as_str().parse::<FieldType>(), Ok(ty));
        }
        assert_eq!("sms".parse::<FieldType>(), Ok(FieldType::Sms));
        assert!("Fax".parse::<FieldType>().is_err());
    }

    #[test]
    fn input_kind_hints_follow_field_type() {
        assert_eq!(FieldType::Email.input_kind(), InputKind::Email);
        assert_eq!(FieldType::Phone.input_kind(), InputKind::Number);
        assert_eq!(FieldType::Url.input_kind(), InputKind::Url);
        assert_eq!(FieldType::Password.input_kind(), InputKind::Text);
    }

    #[test]
    fn entry_serializes_with_type_key() {
        let json = serde_json::to_string(&FieldEntry::new(FieldType::Sms, "hi")).expect("serialize");
        assert_eq!(json, r#"{"type":"SMS","value":"hi"}"#);
    }

    #[test]
    fn parse_payload_splits_keys_and_keeps_inner_colons() {
        let fields = parse_payload("URL: http://a:8080/x;\nEmail: b;");
        assert_eq!(
            fields,
            vec![
                DecodedField {
                    key: "URL".into(),
                    value: Some("http://a:8080/x".into()),
                },
                DecodedField {
                    key: "Email".into(),
                    value: Some("b".into()),
                },
            ]
        );
    }

    #[test]
    fn parse_payload_handles_plain_text() {
        let fields = parse_payload("hello world");
        assert_eq!(
            fields,
            vec![DecodedField {
                key: "hello world".into(),
                value: None,
            }]
        );
    }
}
