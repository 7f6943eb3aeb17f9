//! `${name}` / `${name|default}` template substitution.
//!
//! Placeholders are read from the top-level paragraphs of each section and
//! from every paragraph directly inside the cells of each top-level table.
//! Substitution itself goes through [`replace_all`], so a placeholder is
//! replaced wherever it occurs (including headers and footers).

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::constants::{DEFAULT_VAR_PREFIX, DEFAULT_VAR_SUFFIX, RESERVED_STYLES_KEY};
use crate::document::Document;
use crate::error::{DocxError, Result};
use crate::fill::replace_all;
use crate::wml::{paragraph_text, W_P, W_TBL, W_TC, W_TR};
use crate::xml::Node;

/// What to do with a placeholder that has neither data nor a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingVarAction {
    /// Fail with [`DocxError::VariableNotFound`].
    #[default]
    Error,
    /// Leave the placeholder in the document.
    Ignore,
    /// Replace the placeholder with an empty string.
    Empty,
}

impl fmt::Display for MissingVarAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MissingVarAction::Error => "error",
            MissingVarAction::Ignore => "ignore",
            MissingVarAction::Empty => "empty",
        })
    }
}

impl FromStr for MissingVarAction {
    type Err = DocxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "ignore" => Ok(Self::Ignore),
            "empty" => Ok(Self::Empty),
            other => Err(DocxError::Validation(format!(
                "unknown missing variable action: {} (expected error, ignore or empty)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateOptions {
    pub prefix: String,
    pub suffix: String,
    pub missing: MissingVarAction,
}

impl Default for TemplateOptions {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_VAR_PREFIX.to_string(),
            suffix: DEFAULT_VAR_SUFFIX.to_string(),
            missing: MissingVarAction::default(),
        }
    }
}

/// Outcome of [`fill_template`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TemplateStats {
    /// Placeholder occurrences seen while scanning.
    pub total: usize,
    /// Distinct placeholders that were substituted.
    pub replaced: usize,
    /// Names left without a value, in first-seen order.
    pub missing: Vec<String>,
}

/// Outcome of [`validate_template_data`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TemplateValidation {
    pub is_valid: bool,
    pub required_vars: Vec<String>,
    pub missing_vars: Vec<String>,
    pub extra_vars: Vec<String>,
}

/// One placeholder occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Placeholder {
    full: String,
    name: String,
    default: String,
}

fn placeholder_regex(opts: &TemplateOptions) -> Result<Regex> {
    let pattern = format!(
        r"{}([a-zA-Z_][a-zA-Z0-9_]*)(?:\|([^}}\t\n]*))?{}",
        regex::escape(&opts.prefix),
        regex::escape(&opts.suffix)
    );
    Regex::new(&pattern).map_err(|e| DocxError::Fill(format!("invalid placeholder syntax: {}", e)))
}

fn find_placeholders(re: &Regex, text: &str) -> Vec<Placeholder> {
    re.captures_iter(text)
        .map(|caps| Placeholder {
            full: caps[0].to_string(),
            name: caps[1].to_string(),
            default: caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default(),
        })
        .collect()
}

/// Text of every paragraph that is scanned for placeholders.
fn scanned_paragraphs(doc: &Document) -> Vec<String> {
    let body = doc.body();
    let mut out = Vec::new();
    for span in doc.section_spans() {
        let elements = || {
            body.children[span.clone()].iter().filter_map(|n| match n {
                Node::Element(e) => Some(e),
                _ => None,
            })
        };
        out.extend(elements().filter(|e| e.name == W_P).map(paragraph_text));
        for tbl in elements().filter(|e| e.name == W_TBL) {
            for tr in tbl.children_named(W_TR) {
                for tc in tr.children_named(W_TC) {
                    out.extend(tc.children_named(W_P).map(paragraph_text));
                }
            }
        }
    }
    out
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Substitutes placeholders with values from `data`.
#[instrument(skip(doc, data), level = "debug")]
pub fn fill_template(
    doc: &mut Document,
    data: &Map<String, Value>,
    opts: &TemplateOptions,
) -> Result<TemplateStats> {
    let re = placeholder_regex(opts)?;
    let mut stats = TemplateStats::default();
    let mut seen = HashSet::new();
    let mut replacements: Vec<(String, String)> = Vec::new();

    for text in scanned_paragraphs(doc) {
        let found = find_placeholders(&re, &text);
        stats.total += found.len();
        for ph in found {
            if !seen.insert(ph.full.clone()) {
                continue;
            }
            if let Some(value) = data.get(&ph.name) {
                replacements.push((ph.full, value_text(value)));
            } else if !ph.default.is_empty() {
                replacements.push((ph.full, ph.default));
            } else {
                match opts.missing {
                    MissingVarAction::Error => {
                        return Err(DocxError::VariableNotFound {
                            name: ph.name,
                            available: data.keys().cloned().collect(),
                        });
                    }
                    MissingVarAction::Empty => replacements.push((ph.full, String::new())),
                    MissingVarAction::Ignore => {}
                }
                if !stats.missing.contains(&ph.name) {
                    warn!("Template variable {} has no value", ph.name);
                    stats.missing.push(ph.name);
                }
            }
        }
    }

    for (full, value) in &replacements {
        let count = replace_all(doc, full, value)?;
        debug!("Replaced {} x{}", full, count);
        if count > 0 {
            stats.replaced += 1;
        }
    }
    info!(
        "Template filled: {} placeholders, {} replaced, {} missing",
        stats.total,
        stats.replaced,
        stats.missing.len()
    );
    Ok(stats)
}

/// Placeholder names in document order, optionally deduplicated.
pub fn extract_template_vars(
    doc: &Document,
    opts: &TemplateOptions,
    unique: bool,
) -> Result<Vec<String>> {
    let re = placeholder_regex(opts)?;
    let mut names: Vec<String> = scanned_paragraphs(doc)
        .iter()
        .flat_map(|text| find_placeholders(&re, text))
        .map(|ph| ph.name)
        .collect();
    if unique {
        let mut seen = HashSet::new();
        names.retain(|n| seen.insert(n.clone()));
    }
    Ok(names)
}

/// Compares the placeholders of a template with the keys of `data`.
pub fn validate_template_data(
    doc: &Document,
    data: &Map<String, Value>,
    opts: &TemplateOptions,
) -> Result<TemplateValidation> {
    let required = extract_template_vars(doc, opts, true)?;
    let provided: Vec<&String> = data.keys().filter(|k| *k != RESERVED_STYLES_KEY).collect();

    let missing_vars: Vec<String> = required
        .iter()
        .filter(|name| !provided.contains(name))
        .cloned()
        .collect();
    let extra_vars: Vec<String> = provided
        .iter()
        .filter(|key| !required.contains(**key))
        .map(|key| key.to_string())
        .collect();

    Ok(TemplateValidation {
        is_valid: missing_vars.is_empty(),
        required_vars: required,
        missing_vars,
        extra_vars,
    })
}
