//! Reply text for a finished prediction
//!
//! Counts are grouped by class in first-seen order: the order in which each
//! class first appears while scanning the labels front to back.

use crate::types::DetectionLabel;

/// Prefix of every detection reply
pub const DETECTED_PREFIX: &str = "Detected objects: ";

/// Reply sent when the detector found nothing
pub const NOTHING_DETECTED: &str = "No objects detected.";

/// Count labels per class, preserving first-seen order
pub fn count_by_class(labels: &[DetectionLabel]) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for label in labels {
        match counts.iter_mut().find(|(name, _)| *name == label.class_name) {
            Some((_, count)) => *count += 1,
            None => counts.push((label.class_name.clone(), 1)),
        }
    }
    counts
}

/// Join counts as `"class: count"` pairs separated by `", "`
pub fn format_counts(counts: &[(String, usize)]) -> String {
    counts
        .iter()
        .map(|(name, count)| format!("{}: {}", name, count))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Build the user-facing reply for a list of labels
pub fn format_prediction(labels: &[DetectionLabel]) -> String {
    if labels.is_empty() {
        return NOTHING_DETECTED.to_string();
    }
    format!("{}{}", DETECTED_PREFIX, format_counts(&count_by_class(labels)))
}

/// Read counts back out of a reply produced by [`format_prediction`]
pub fn parse_formatted(text: &str) -> Option<Vec<(String, usize)>> {
    if text == NOTHING_DETECTED {
        return Some(Vec::new());
    }
    let body = text.strip_prefix(DETECTED_PREFIX)?;
    body.split(", ")
        .map(|pair| {
            let (name, count) = pair.rsplit_once(": ")?;
            Some((name.to_string(), count.parse().ok()?))
        })
        .collect()
}
