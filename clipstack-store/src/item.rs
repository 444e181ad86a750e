//! Clipboard item and history filter types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum number of items returned by a history query
pub const HISTORY_LIMIT: u32 = 50;

/// Closed set of classification tags an item can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Url,
    Email,
    Code,
    Text,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Url => "url",
            ItemType::Email => "email",
            ItemType::Code => "code",
            ItemType::Text => "text",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "url" => Ok(ItemType::Url),
            "email" => Ok(ItemType::Email),
            "code" => Ok(ItemType::Code),
            "text" => Ok(ItemType::Text),
            other => Err(format!("unknown item type: {}", other)),
        }
    }
}

/// A captured clipboard entry.
///
/// `id` is `None` until the store assigns one on insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// Raw captured text
    pub content: String,

    #[serde(rename = "type")]
    pub item_type: ItemType,

    /// Capture time in milliseconds since the Unix epoch
    pub timestamp: i64,

    #[serde(default)]
    pub category: Option<String>,

    /// Origin hint such as a hostname or mail domain
    #[serde(default)]
    pub source: Option<String>,

    #[serde(default)]
    pub is_code: bool,

    /// Only set when `is_code` is true
    #[serde(default)]
    pub language: Option<String>,
}

impl ClipboardItem {
    /// Create an unsaved text item with no metadata
    pub fn new(content: impl Into<String>, item_type: ItemType, timestamp: i64) -> Self {
        Self {
            id: None,
            content: content.into(),
            item_type,
            timestamp,
            category: None,
            source: None,
            is_code: false,
            language: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Mark the item as code written in `language`
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.is_code = true;
        self.language = Some(language.into());
        self
    }

    /// Empty optional strings mean "not set"
    pub fn without_empty_fields(mut self) -> Self {
        for field in [&mut self.category, &mut self.source, &mut self.language] {
            if field.as_deref() == Some("") {
                *field = None;
            }
        }
        self
    }

    /// Check the invariants an item must satisfy before it is stored
    pub fn validate(&self) -> Result<(), String> {
        if self.content.is_empty() {
            return Err("content must not be empty".to_string());
        }
        if self.language.is_some() && !self.is_code {
            return Err("language is only allowed on code items".to_string());
        }
        Ok(())
    }
}

/// Conjunctive filter for history queries.
///
/// Blank strings behave as if the field were absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryFilter {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_code: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Substring matched against `content`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl HistoryFilter {
    pub fn item_type(&self) -> Option<&str> {
        non_blank(&self.item_type)
    }

    pub fn category(&self) -> Option<&str> {
        non_blank(&self.category)
    }

    pub fn language(&self) -> Option<&str> {
        non_blank(&self.language)
    }

    pub fn search(&self) -> Option<&str> {
        non_blank(&self.search)
    }

    /// True when no field would constrain a query
    pub fn is_empty(&self) -> bool {
        self.item_type().is_none()
            && self.category().is_none()
            && self.is_code.is_none()
            && self.language().is_none()
            && self.search().is_none()
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
