//! Content classification.
//!
//! Decides how a captured piece of text is tagged before it is stored. The
//! rules are an ordered table and the first rule that matches wins, so a
//! string that looks like both a URL and code is always a URL.

use clipstack_store::{ClipboardItem, ItemType};
use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use std::borrow::Cow;
use std::fmt;
use url::Url;

/// Plain text longer than this many characters is `long-text`
pub const SNIPPET_MAX_CHARS: usize = 100;

/// Languages the code rule can recognize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeLanguage {
    JavaScript,
    Python,
    Html,
    Css,
    Sql,
    Json,
    TypeScript,
}

impl CodeLanguage {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeLanguage::JavaScript => "javascript",
            CodeLanguage::Python => "python",
            CodeLanguage::Html => "html",
            CodeLanguage::Css => "css",
            CodeLanguage::Sql => "sql",
            CodeLanguage::Json => "json",
            CodeLanguage::TypeScript => "typescript",
        }
    }
}

impl fmt::Display for CodeLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tags assigned to one piece of content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub item_type: ItemType,
    pub category: &'static str,
    pub source: Option<String>,
    pub language: Option<CodeLanguage>,
}

impl Classification {
    pub fn is_code(&self) -> bool {
        self.language.is_some()
    }

    /// Build the item to persist for `content` captured at `timestamp`
    pub fn into_item(self, content: impl Into<String>, timestamp: i64) -> ClipboardItem {
        let mut item = ClipboardItem::new(content, self.item_type, timestamp).with_category(self.category);
        if let Some(source) = self.source {
            item = item.with_source(source);
        }
        if let Some(language) = self.language {
            item = item.with_language(language.as_str());
        }
        item
    }

    fn text(content: &str) -> Self {
        let category = if content.chars().count() > SNIPPET_MAX_CHARS {
            "long-text"
        } else {
            "snippet"
        };
        Self {
            item_type: ItemType::Text,
            category,
            source: None,
            language: None,
        }
    }
}

lazy_static! {
    static ref URL_SHAPE: Regex =
        Regex::new(r"^(https?://)?([0-9a-z.-]+)\.([a-z.]{2,6})([/0-9A-Za-z_ .-]*)*/?$").unwrap();

    static ref EMAIL_SHAPE: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();

    // Multi-line: `^` anchors at every line start. Order here is the priority order.
    static ref CODE_PATTERNS: Vec<(CodeLanguage, Regex)> = CODE_SIGNATURES
        .iter()
        .map(|(language, pattern)| {
            let regex = RegexBuilder::new(pattern)
                .multi_line(true)
                .case_insensitive(*language == CodeLanguage::Sql)
                .build()
                .unwrap();
            (*language, regex)
        })
        .collect();
}

/// Per-language signatures, tried top to bottom
pub const CODE_SIGNATURES: &[(CodeLanguage, &str)] = &[
    (
        CodeLanguage::JavaScript,
        r"^(const|let|var|function|class|import|export|async|await)",
    ),
    (CodeLanguage::Python, r"^(def|class|import|from|async|await)"),
    (CodeLanguage::Html, r"^<!DOCTYPE|<html|<div|<p|<script"),
    (CodeLanguage::Css, r"^(\.|#|@media|@import|body|html|div|p|a)\s*\{"),
    (
        CodeLanguage::Sql,
        r"^(SELECT|INSERT|UPDATE|DELETE|CREATE|DROP|ALTER|WITH|FROM)\s",
    ),
    (CodeLanguage::Json, r"^[\[{]"),
    (CodeLanguage::TypeScript, r"^(interface|type|namespace|enum)"),
];

type Rule = fn(&str) -> Option<Classification>;

/// Classification rules in priority order; plain text is the fallback
const RULES: &[(&str, Rule)] = &[("url", url_rule), ("email", email_rule), ("code", code_rule)];

/// Names of the rules in the order they are tried
pub fn rule_order() -> Vec<&'static str> {
    RULES.iter().map(|(name, _)| *name).chain(["text"]).collect()
}

/// Classify captured text. Total and free of side effects.
pub fn classify(content: &str) -> Classification {
    RULES
        .iter()
        .find_map(|(_, rule)| rule(content))
        .unwrap_or_else(|| Classification::text(content))
}

/// First language whose signature matches, if any
pub fn detect_language(content: &str) -> Option<CodeLanguage> {
    let content = unify_line_breaks(content);
    CODE_PATTERNS
        .iter()
        .find(|(_, pattern)| pattern.is_match(&content))
        .map(|(language, _)| *language)
}

/// `\r`, U+2028 and U+2029 also start a line
fn unify_line_breaks(content: &str) -> Cow<'_, str> {
    if content.contains(['\r', '\u{2028}', '\u{2029}']) {
        Cow::Owned(content.replace(['\r', '\u{2028}', '\u{2029}'], "\n"))
    } else {
        Cow::Borrowed(content)
    }
}

fn url_rule(content: &str) -> Option<Classification> {
    if !URL_SHAPE.is_match(content) {
        return None;
    }
    // Shape alone is not enough: without a parsable host the rule does not apply
    let parsed = Url::parse(content).ok()?;
    let host = parsed.host_str()?.to_string();
    Some(Classification {
        item_type: ItemType::Url,
        category: "web",
        source: Some(host),
        language: None,
    })
}

fn email_rule(content: &str) -> Option<Classification> {
    if !EMAIL_SHAPE.is_match(content) {
        return None;
    }
    let (_, domain) = content.split_once('@')?;
    Some(Classification {
        item_type: ItemType::Email,
        category: "contact",
        source: Some(domain.to_string()),
        language: None,
    })
}

fn code_rule(content: &str) -> Option<Classification> {
    detect_language(content).map(|language| Classification {
        item_type: ItemType::Code,
        category: "development",
        source: None,
        language: Some(language),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_with_scheme() {
        let result = classify("https://example.com/page");
        assert_eq!(result.item_type, ItemType::Url);
        assert_eq!(result.category, "web");
        assert_eq!(result.source.as_deref(), Some("example.com"));
        assert!(!result.is_code());
    }

    #[test]
    fn test_url_without_scheme_falls_through() {
        // Matches the URL shape but has no host a parser accepts
        let result = classify("example.com");
        assert_ne!(result.item_type, ItemType::Url);
        assert_eq!(result.item_type, ItemType::Text);
    }

    #[test]
    fn test_email() {
        let result = classify("a.b@example.org");
        assert_eq!(result.item_type, ItemType::Email);
        assert_eq!(result.category, "contact");
        assert_eq!(result.source.as_deref(), Some("example.org"));
        assert_eq!(result.language, None);
    }

    #[test]
    fn test_python_beats_fallback() {
        let result = classify("def foo(): pass");
        assert_eq!(result.item_type, ItemType::Code);
        assert_eq!(result.category, "development");
        assert_eq!(result.language, Some(CodeLanguage::Python));
        assert_eq!(result.source, None);
    }

    #[test]
    fn test_first_matching_language_wins() {
        // Both javascript and python start lines with `import`
        assert_eq!(detect_language("import os"), Some(CodeLanguage::JavaScript));
        assert_eq!(detect_language("class Foo:"), Some(CodeLanguage::JavaScript));
        // Lowercase `from` is python before sql gets a chance
        assert_eq!(detect_language("from items select *"), Some(CodeLanguage::Python));
        assert_eq!(detect_language("FROM items SELECT *"), Some(CodeLanguage::Sql));
        // `type` is only a typescript keyword
        assert_eq!(detect_language("type Id = string"), Some(CodeLanguage::TypeScript));
    }

    #[test]
    fn test_signatures_match_on_later_lines() {
        let content = "-- report\nselect * from users";
        assert_eq!(detect_language(content), Some(CodeLanguage::Sql));

        let content = "notes:\n{\"a\": 1}";
        assert_eq!(detect_language(content), Some(CodeLanguage::Json));
    }

    #[test]
    fn test_other_line_terminators_start_a_line() {
        assert_eq!(detect_language("note\rdef foo(): pass"), Some(CodeLanguage::Python));
        assert_eq!(detect_language("note\u{2028}SELECT 1"), Some(CodeLanguage::Sql));
        assert_eq!(detect_language("note\u{2029}[1]"), Some(CodeLanguage::Json));
        assert_eq!(detect_language("line one\r\nconst x = 1;"), Some(CodeLanguage::JavaScript));

        let result = classify("note\rdef foo(): pass");
        assert_eq!(result.item_type, ItemType::Code);
        assert_eq!(result.language, Some(CodeLanguage::Python));
    }

    #[test]
    fn test_each_language() {
        let cases = [
            ("const x = 1;", CodeLanguage::JavaScript),
            ("from os import path", CodeLanguage::Python),
            ("<!DOCTYPE html>", CodeLanguage::Html),
            ("some text <div>", CodeLanguage::Html),
            ("body { margin: 0 }", CodeLanguage::Css),
            ("SELECT id FROM items", CodeLanguage::Sql),
            ("[1, 2, 3]", CodeLanguage::Json),
            ("interface Foo {}", CodeLanguage::TypeScript),
        ];
        for (content, expected) in cases {
            assert_eq!(detect_language(content), Some(expected), "{}", content);
        }
    }

    #[test]
    fn test_fallback_length_rule() {
        let short = classify(&"x".repeat(50));
        assert_eq!(short.item_type, ItemType::Text);
        assert_eq!(short.category, "snippet");

        let long = classify(&"x".repeat(150));
        assert_eq!(long.category, "long-text");

        // Exactly at the limit is still a snippet; length counts characters
        assert_eq!(classify(&"é".repeat(100)).category, "snippet");
    }

    #[test]
    fn test_rule_order() {
        assert_eq!(rule_order(), vec!["url", "email", "code", "text"]);
        let languages: Vec<&str> = CODE_SIGNATURES.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(
            languages,
            vec!["javascript", "python", "html", "css", "sql", "json", "typescript"]
        );
        assert_eq!(CodeLanguage::TypeScript.to_string(), "typescript");
    }

    #[test]
    fn test_into_item() {
        let item = classify("def foo(): pass").into_item("def foo(): pass", 42);
        assert_eq!(item.item_type, ItemType::Code);
        assert_eq!(item.timestamp, 42);
        assert_eq!(item.category.as_deref(), Some("development"));
        assert!(item.is_code);
        assert_eq!(item.language.as_deref(), Some("python"));
        assert!(item.validate().is_ok());

        let item = classify("https://example.com/page").into_item("https://example.com/page", 1);
        assert_eq!(item.source.as_deref(), Some("example.com"));
        assert!(!item.is_code);
        assert_eq!(item.language, None);
    }
}
