//! Generation context assembly.
//!
//! Everything downstream of a request (prompt composition, provider calls and
//! the fallback templates) works from a [`GenerationContext`]: the project
//! profile with defaults filled in, the writing language, a short "focus"
//! phrase and the aggregated reference excerpts. Building it is a pure
//! function of the request.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use crate::models::{GenerationRequest, ReferenceItem, WritingLanguage};

/// Maximum keywords kept from the profile
pub const MAX_KEYWORDS: usize = 3;

/// Characters taken from each reference excerpt
pub const REFERENCE_EXCERPT_CHARS: usize = 1200;

/// Total characters of aggregated reference text
pub const REFERENCE_TEXT_BUDGET: usize = 5000;

/// Characters of a Chinese focus snippet
const ZH_SNIPPET_CHARS: usize = 16;

/// Words of an English focus snippet
const EN_SNIPPET_WORDS: usize = 6;

const KEYWORD_SEPARATORS: [char; 3] = [',', '，', '、'];

/// Resolved writing language of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Zh,
    En,
    Mixed,
}

impl Language {
    /// Label used in prompt headers
    pub fn label(&self) -> &'static str {
        match self {
            Language::Zh => "中文",
            Language::En => "English",
            Language::Mixed => "中英混合 / Mixed",
        }
    }
}

/// Normalized view of a request used by prompts and fallback templates
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationContext {
    /// Resolved writing language
    pub language: Language,

    /// Whether generated phrasing is Chinese
    pub is_zh: bool,

    /// Research field, or a localized default
    pub field: String,

    /// Research method(s) joined with " / ", or a localized default
    pub method: String,

    /// Up to three profile keywords
    pub keywords: Vec<String>,

    /// Short topic phrase
    pub focus: String,

    /// Core research question, "-" when absent
    pub core_question: String,

    /// Target audience, "-" when absent
    pub audience: String,

    /// Free-text input as typed
    pub input: String,

    /// Draft text as stored
    pub draft_text: String,

    /// Names of all references that have one, in library order
    pub reference_names: Vec<String>,

    /// Aggregated reference excerpts, at most [`REFERENCE_TEXT_BUDGET`] characters
    pub reference_text: String,
}

impl GenerationContext {
    /// Build the context for a request
    pub fn build(request: &GenerationRequest) -> Self {
        let project = &request.project;
        let detected_zh = contains_cjk(&format!("{}{}", request.input, request.draft_text));

        let (language, is_zh) = match project.language {
            Some(WritingLanguage::Zh) => (Language::Zh, true),
            Some(WritingLanguage::En) => (Language::En, false),
            Some(WritingLanguage::Mixed) => (Language::Mixed, detected_zh),
            None if detected_zh => (Language::Zh, true),
            None => (Language::En, false),
        };

        let keywords: Vec<String> = parse_list(&project.keywords)
            .into_iter()
            .take(MAX_KEYWORDS)
            .collect();

        let focus = if !keywords.is_empty() {
            keywords.join(" / ")
        } else {
            [&request.input, &request.draft_text]
                .into_iter()
                .map(|text| extract_snippet(text, is_zh))
                .find(|snippet| !snippet.is_empty())
                .unwrap_or_else(|| localized(is_zh, "关键主题", "core topics"))
        };

        let field = non_empty_or(project.field.trim(), || {
            localized(is_zh, "研究领域", "the field")
        });

        let methods = parse_list(&project.method);
        let method = if methods.is_empty() {
            localized(is_zh, "研究方法", "methodological")
        } else {
            methods.join(" / ")
        };

        Self {
            language,
            is_zh,
            field,
            method,
            keywords,
            focus,
            core_question: non_empty_or(project.research.trim(), || "-".to_string()),
            audience: non_empty_or(project.audience.trim(), || "-".to_string()),
            input: request.input.clone(),
            draft_text: request.draft_text.clone(),
            reference_names: request
                .references
                .iter()
                .map(|r| r.name.trim())
                .filter(|name| !name.is_empty())
                .map(String::from)
                .collect(),
            reference_text: build_reference_text(&request.references, REFERENCE_TEXT_BUDGET),
        }
    }

    /// Whether any reference carried extracted text
    pub fn has_reference_text(&self) -> bool {
        !self.reference_text.is_empty()
    }
}

/// Whether the text contains CJK unified ideographs
pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(|c| ('\u{4e00}'..='\u{9fff}').contains(&c))
}

/// Split a comma separated list, trimming and dropping empty entries
pub fn parse_list(text: &str) -> Vec<String> {
    text.split(KEYWORD_SEPARATORS)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

/// Collapse runs of whitespace into single spaces and trim
pub fn collapse_whitespace(text: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let re = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"));
    re.replace_all(text, " ").trim().to_string()
}

/// Collapse whitespace and cap the text at `max_chars`, appending "..." when cut
pub fn limit_text(text: &str, max_chars: usize) -> String {
    let cleaned = collapse_whitespace(text);
    if cleaned.chars().count() <= max_chars {
        return cleaned;
    }
    let mut truncated: String = cleaned.chars().take(max_chars).collect();
    truncated.push_str("...");
    truncated
}

/// Short phrase from free text: the first 16 non-space characters for
/// Chinese, the first six words otherwise.
pub fn extract_snippet(text: &str, is_zh: bool) -> String {
    let cleaned = collapse_whitespace(text);
    if cleaned.is_empty() {
        return String::new();
    }
    if is_zh {
        cleaned
            .chars()
            .filter(|c| !c.is_whitespace())
            .take(ZH_SNIPPET_CHARS)
            .collect()
    } else {
        cleaned
            .split_whitespace()
            .take(EN_SNIPPET_WORDS)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Aggregate reference excerpts into one block of text.
///
/// Each reference with an excerpt contributes a "Source: name" line and up
/// to [`REFERENCE_EXCERPT_CHARS`] characters of whitespace-normalized text.
/// Blocks are separated by a blank line. The result never exceeds `budget`
/// characters; when it would, the block that crosses the boundary is cut so
/// the result is exactly `budget` characters long.
pub fn build_reference_text(references: &[ReferenceItem], budget: usize) -> String {
    let mut text = String::new();
    let mut used = 0;

    for reference in references {
        let content = match reference.content.as_deref().map(str::trim) {
            Some(content) if !content.is_empty() => content,
            _ => continue,
        };

        let mut block = String::new();
        if used > 0 {
            block.push_str("\n\n");
        }
        let name = reference.name.trim();
        if !name.is_empty() {
            block.push_str("Source: ");
            block.push_str(name);
            block.push('\n');
        }
        block.extend(
            collapse_whitespace(content)
                .chars()
                .take(REFERENCE_EXCERPT_CHARS),
        );

        let len = block.chars().count();
        if used + len > budget {
            text.extend(block.chars().take(budget - used));
            break;
        }
        text.push_str(&block);
        used += len;
    }

    text
}

pub(crate) fn localized(is_zh: bool, zh: &str, en: &str) -> String {
    if is_zh { zh } else { en }.to_string()
}

fn non_empty_or(value: &str, default: impl FnOnce() -> String) -> String {
    if value.is_empty() {
        default()
    } else {
        value.to_string()
    }
}
