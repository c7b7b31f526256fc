//! Label parsing
//!
//! The detector exports one text line per object:
//! `<class_index> <center_x> <center_y> <width> <height>`, every coordinate a
//! fraction of the image size. Parsing is strict: a line that does not match
//! exactly is rejected rather than clamped or coerced.

use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

use crate::types::DetectionLabel;
use crate::{Error, Result};

/// Class-index to class-name mapping, loaded once at startup and shared
/// read-only across requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassNames(Arc<[String]>);

#[derive(Deserialize)]
struct NamesFile {
    names: Vec<String>,
}

impl ClassNames {
    pub fn new(names: Vec<String>) -> Self {
        Self(names.into())
    }

    /// Load names from a file.
    ///
    /// `.toml` files must hold `names = [..]`; any other file is read as one
    /// class name per line (blank lines skipped).
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read class names {}: {}", path.display(), e))
        })?;

        let names = if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str::<NamesFile>(&content)
                .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?
                .names
        } else {
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect()
        };

        if names.is_empty() {
            return Err(Error::Config(format!(
                "Class names file {} lists no classes",
                path.display()
            )));
        }

        tracing::info!(count = names.len(), path = %path.display(), "Class names loaded");
        Ok(Self::new(names))
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Parse one exported label line
pub fn parse_label_line(line: &str, class_names: &ClassNames) -> Result<DetectionLabel> {
    let malformed = |reason: String| Error::MalformedLabelLine {
        line: line.to_string(),
        reason,
    };

    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() != 5 {
        return Err(malformed(format!("expected 5 tokens, found {}", tokens.len())));
    }

    let index: usize = tokens[0]
        .parse()
        .map_err(|_| malformed(format!("class index {:?} is not a non-negative integer", tokens[0])))?;
    let class_name = class_names.get(index).ok_or_else(|| {
        malformed(format!(
            "class index {} out of range (0..{})",
            index,
            class_names.len()
        ))
    })?;

    let mut coords = [0.0f64; 4];
    for (slot, token) in coords.iter_mut().zip(&tokens[1..]) {
        let value: f64 = token
            .parse()
            .map_err(|_| malformed(format!("{:?} is not a number", token)))?;
        if !(0.0..=1.0).contains(&value) {
            return Err(malformed(format!("{} is outside [0, 1]", value)));
        }
        *slot = value;
    }

    Ok(DetectionLabel {
        class_name: class_name.to_string(),
        center_x: coords[0],
        center_y: coords[1],
        width: coords[2],
        height: coords[3],
    })
}

/// Parse a whole label export, dropping malformed lines.
///
/// Returns the parsed labels in file order plus the errors for every dropped
/// line. Blank lines are skipped silently.
pub fn parse_label_file(content: &str, class_names: &ClassNames) -> (Vec<DetectionLabel>, Vec<Error>) {
    let mut labels = Vec::new();
    let mut dropped = Vec::new();

    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        match parse_label_line(line, class_names) {
            Ok(label) => labels.push(label),
            Err(e) => dropped.push(e),
        }
    }

    (labels, dropped)
}

/// Write a label back in export form, given its class index
pub fn format_label_line(class_index: usize, label: &DetectionLabel) -> String {
    format!(
        "{} {} {} {} {}",
        class_index, label.center_x, label.center_y, label.width, label.height
    )
}
