//! # Section Extraction
//!
//! Turns free-form model output into structured fields: locate a labeled
//! section, capture its content, fall back to an explicit sentinel when
//! the label is absent. Enum-valued fields are matched by case-insensitive
//! substring search over a fixed vocabulary with safe defaults.
//!
//! Isolated here so the whole contract can be swapped for
//! schema-constrained generation without touching the stages.

use regex::Regex;

use crate::models::{RiskLevel, WorkflowType};

/// Sentinel for a section absent from the model output
pub const NOT_SPECIFIED: &str = "Not specified";

/// Extract a labeled section from formatted text.
///
/// Captures content after the heading's colon plus following unindented
/// lines, stopping at the next bold heading. Returns [`NOT_SPECIFIED`]
/// when the heading is absent.
pub fn section(text: &str, label: &str) -> String {
    let label_lower = label.to_lowercase();
    let mut content: Vec<String> = Vec::new();
    let mut capture = false;

    for line in text.lines() {
        if line.to_lowercase().contains(&label_lower) && line.contains(':') {
            capture = true;
            if let Some((_, rest)) = line.split_once(':') {
                let cleaned = rest.trim().trim_start_matches('*').trim();
                if !cleaned.is_empty() {
                    content.push(cleaned.to_string());
                }
            }
            continue;
        }
        if capture {
            if line.starts_with("**") {
                break;
            }
            if !line.trim().is_empty() {
                content.push(line.trim().to_string());
            }
        }
    }

    if content.is_empty() {
        NOT_SPECIFIED.to_string()
    } else {
        content.join(" ")
    }
}

/// Match a workflow by its label, defaulting to Continue Monitoring
pub fn workflow(text: &str) -> WorkflowType {
    let lower = text.to_lowercase();
    WorkflowType::ALL
        .into_iter()
        .find(|workflow| lower.contains(&workflow.label().to_lowercase()))
        .unwrap_or(WorkflowType::ContinueMonitoring)
}

/// Match a risk level, defaulting to low
pub fn risk_level(text: &str) -> RiskLevel {
    let lower = text.replace('*', "").to_lowercase();
    if lower.contains("risk level: high") || lower.contains("risk: high") {
        RiskLevel::High
    } else if lower.contains("risk level: medium") || lower.contains("risk: medium") {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Whether the critique declared itself satisfied.
///
/// Absence of the marker reads as unsatisfied; the transition rules map
/// that to acceptance unless critical issues are also present.
pub fn satisfaction(text: &str) -> bool {
    text.replace('*', "").to_lowercase().contains("satisfactory: yes")
}

/// Parse a "Confidence: 0.8"-style score, clamped to [0, 1]
pub fn confidence(text: &str) -> Option<f64> {
    let re = Regex::new(r"(?i)confidence[^0-9]*([01](?:\.[0-9]+)?)").expect("valid confidence regex");
    let value: f64 = re.captures(text)?.get(1)?.as_str().parse().ok()?;
    Some(value.clamp(0.0, 1.0))
}

/// Collect `- TAG: description` bullet lines for one severity tag
pub fn tagged_bullets(text: &str, tag: &str) -> Vec<String> {
    let re = Regex::new(&format!(
        r"(?im)^\s*[-*]\s*{}\s*:\s*(.+)$",
        regex::escape(tag)
    ))
    .expect("valid bullet regex");
    re.captures_iter(text)
        .map(|cap| cap[1].trim().to_string())
        .collect()
}

/// Collect the plain bullets under a labeled section heading
pub fn bullets_under(text: &str, label: &str) -> Vec<String> {
    let label_lower = label.to_lowercase();
    let mut bullets = Vec::new();
    let mut capture = false;

    for line in text.lines() {
        if line.to_lowercase().contains(&label_lower) && line.contains(':') {
            capture = true;
            continue;
        }
        if capture {
            let trimmed = line.trim();
            if trimmed.starts_with("**") || (!trimmed.is_empty() && !trimmed.starts_with(['-', '*'])) {
                break;
            }
            if let Some(body) = trimmed.strip_prefix('-').or_else(|| trimmed.strip_prefix('*')) {
                bullets.push(body.trim().to_string());
            }
        }
    }

    bullets
}
