//! Style extraction from a reference document.
//!
//! We read the reference .docx once per request and derive, per content
//! category, the formatting actually used by the first example of that
//! category found in the document. Extraction is best-effort end to end: a
//! missing file, an unreadable container, or a category with no example all
//! degrade to the documented defaults instead of failing the request. The
//! worst a bad reference document can do is produce a default-styled output.
//!
//! Parsing goes through docx-rs's JSON view of the document tree rather than
//! its typed structs; the walk below only reads the handful of properties a
//! [`StyleDescriptor`] carries and treats anything unexpected as absent.

use std::path::Path;

use docx_rs::read_docx;
use serde_json::Value;
use tracing::warn;

use crate::error::{Error, Result};
use crate::rules::categorize_line;
use crate::style::{Alignment, Category, Indent, StyleDescriptor, StyleProfile};

/// How many paragraphs of the reference document feed the classifier's
/// textual context.
const CONTEXT_PARAGRAPHS: usize = 20;

/// Derive a style profile from the reference document at `path`.
///
/// Never fails: extraction problems are logged and covered by defaults.
pub fn extract(path: &Path) -> StyleProfile {
    match try_extract(path) {
        Ok(profile) => profile,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "using default styles");
            StyleProfile::default_profile()
        }
    }
}

/// Fallible extraction, exposed for tests.
pub(crate) fn try_extract(path: &Path) -> Result<StyleProfile> {
    let paragraphs = reference_paragraphs(path)?;

    let mut profile = StyleProfile::default_profile();
    let mut seen_title = false;
    let mut filled: Vec<Category> = Vec::new();

    for (text, para) in &paragraphs {
        let category = if !seen_title {
            seen_title = true;
            Category::Title
        } else {
            categorize_line(text)
        };
        if filled.contains(&category) {
            continue;
        }
        filled.push(category);
        let fallback = profile.descriptor(category).clone();
        *profile.descriptor_mut(category) = descriptor_from_paragraph(para, &fallback);
    }

    Ok(profile)
}

/// First [`CONTEXT_PARAGRAPHS`] non-empty paragraph texts of the reference
/// document, for biasing the classifier. `None` when the reference is
/// missing or unreadable.
pub fn context_excerpt(path: &Path) -> Option<String> {
    let paragraphs = reference_paragraphs(path).ok()?;
    if paragraphs.is_empty() {
        return None;
    }
    let excerpt: Vec<&str> = paragraphs
        .iter()
        .take(CONTEXT_PARAGRAPHS)
        .map(|(text, _)| text.as_str())
        .collect();
    Some(excerpt.join("\n"))
}

/// Read the document and return its non-empty paragraphs as
/// `(text, paragraph JSON)` pairs.
fn reference_paragraphs(path: &Path) -> Result<Vec<(String, Value)>> {
    let bytes = std::fs::read(path)
        .map_err(|err| Error::template(format!("cannot read '{}': {err}", path.display())))?;
    let parsed = read_docx(&bytes)
        .map_err(|err| Error::template(format!("cannot parse '{}': {err}", path.display())))?;
    let tree: Value = serde_json::from_str(&parsed.json())
        .map_err(|err| Error::template(format!("document tree was not JSON: {err}")))?;

    let children = tree
        .pointer("/document/children")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::template("document tree has no paragraph list"))?;

    let mut out = Vec::new();
    for child in children {
        if child.get("type").and_then(Value::as_str) != Some("paragraph") {
            continue;
        }
        let Some(data) = child.get("data") else {
            continue;
        };
        let text = paragraph_text(data);
        if text.trim().is_empty() {
            continue;
        }
        out.push((text, data.clone()));
    }
    Ok(out)
}

/// Concatenated text of all text children of a paragraph's runs.
fn paragraph_text(para: &Value) -> String {
    let mut text = String::new();
    let Some(children) = para.get("children").and_then(Value::as_array) else {
        return text;
    };
    for child in children {
        if child.get("type").and_then(Value::as_str) != Some("run") {
            continue;
        }
        let Some(run_children) = child
            .pointer("/data/children")
            .and_then(Value::as_array)
        else {
            continue;
        };
        for run_child in run_children {
            if run_child.get("type").and_then(Value::as_str) != Some("text") {
                continue;
            }
            if let Some(t) = run_child.pointer("/data/text").and_then(Value::as_str) {
                text.push_str(t);
            }
        }
    }
    text
}

/// Build a descriptor from a paragraph's first run and paragraph properties,
/// falling back field by field.
fn descriptor_from_paragraph(para: &Value, fallback: &StyleDescriptor) -> StyleDescriptor {
    let run_property = first_run_property(para);

    let point_size = run_property
        .and_then(|rp| rp.get("sz"))
        .and_then(number_of)
        .map(|half_points| (half_points / 2.0) as f32)
        .unwrap_or(fallback.point_size);

    let bold = run_property
        .and_then(|rp| rp.get("bold"))
        .map(flag_of)
        .unwrap_or(fallback.bold);

    let italic = run_property
        .and_then(|rp| rp.get("italic"))
        .map(flag_of)
        .unwrap_or(fallback.italic);

    let font_family = run_property
        .and_then(|rp| rp.pointer("/fonts/ascii"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| fallback.font_family.clone());

    let alignment = para
        .pointer("/property/alignment")
        .and_then(string_of)
        .and_then(parse_alignment)
        .unwrap_or(fallback.alignment);

    let indent = para
        .pointer("/property/indent")
        .and_then(parse_indent)
        .unwrap_or(fallback.indent);

    StyleDescriptor {
        font_family,
        point_size,
        bold,
        italic,
        alignment,
        indent,
    }
}

fn first_run_property(para: &Value) -> Option<&Value> {
    let children = para.get("children")?.as_array()?;
    children
        .iter()
        .find(|child| child.get("type").and_then(Value::as_str) == Some("run"))
        .and_then(|run| run.pointer("/data/runProperty"))
}

/// Numeric value, tolerating both bare numbers and `{"val": n}` wrappers.
fn number_of(v: &Value) -> Option<f64> {
    v.as_f64().or_else(|| v.get("val")?.as_f64())
}

/// Boolean flag, tolerating bare booleans, `{"val": b}` wrappers, and bare
/// presence markers (a present-but-empty flag means "on" in the source
/// format).
fn flag_of(v: &Value) -> bool {
    v.as_bool()
        .or_else(|| v.get("val").and_then(Value::as_bool))
        .unwrap_or(true)
}

/// String value, tolerating bare strings and `{"val": s}` wrappers.
fn string_of(v: &Value) -> Option<&str> {
    v.as_str().or_else(|| v.get("val")?.as_str())
}

fn parse_alignment(raw: &str) -> Option<Alignment> {
    match raw {
        "left" | "start" => Some(Alignment::Left),
        "center" => Some(Alignment::Center),
        "right" | "end" => Some(Alignment::Right),
        "both" | "justified" | "distribute" => Some(Alignment::Justified),
        _ => None,
    }
}

fn parse_indent(v: &Value) -> Option<Indent> {
    if let Some(special) = v.get("specialIndent") {
        if special.get("type").and_then(Value::as_str) == Some("firstLine") {
            if let Some(val) = special.get("val").and_then(number_of) {
                return Some(Indent::FirstLine(val as i32));
            }
        }
    }
    if let Some(start) = v.get("start").and_then(number_of) {
        return Some(Indent::Start(start as i32));
    }
    None
}
