//! Canonical display names for requirement nodes.
//!
//! A requirement's stored name often carries a stale logic suffix such as
//! `: Pick 2/5` or `: All Required`. The formatter strips those tokens and
//! re-derives the suffix from the node's current logic type, pick count and
//! option total. Formatting its own output again is a no-op.

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::{Config, LogicType};

static ANY_ONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bany\s+one\b").expect("valid pattern"));

static PICK_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*:?\s*\bpick\s+(?:\d+|n)\b(?:\s*/\s*\d+)?").expect("valid pattern")
});

static ALL_REQUIRED_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*:?\s*\ball\s+required\b(?:\s*/\s*\d+)?").expect("valid pattern")
});

/// Derives requirement labels.
///
/// Which names count as top-level program nodes is configurable; see
/// [`Config::top_level_names`] and [`Config::top_level_prefixes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelFormatter {
    top_level_names: Vec<String>,
    top_level_prefixes: Vec<String>,
}

impl Default for LabelFormatter {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl LabelFormatter {
    /// Builds a formatter using the configured top-level names.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            top_level_names: config
                .top_level_names()
                .iter()
                .map(|name| name.trim().to_lowercase())
                .collect(),
            top_level_prefixes: config
                .top_level_prefixes()
                .iter()
                .map(|prefix| prefix.trim().to_lowercase())
                .collect(),
        }
    }

    /// Whether a bare name (without logic suffix) denotes a top-level program
    /// node such as `Core` or `Major - Civil Engineering`.
    #[must_use]
    pub fn is_top_level(&self, base_name: &str) -> bool {
        let name = base_name.trim().to_lowercase();
        self.top_level_names.iter().any(|top| *top == name)
            || self
                .top_level_prefixes
                .iter()
                .any(|prefix| name.starts_with(prefix.as_str()))
    }

    /// Computes the canonical label for a requirement.
    ///
    /// `option_total` is the number of selectable options under the node, when
    /// known; a total of zero is treated as unknown.
    #[must_use]
    pub fn format_name(
        &self,
        raw_name: &str,
        logic: LogicType,
        pick_n: u32,
        option_total: Option<usize>,
    ) -> String {
        let normalized = ANY_ONE.replace_all(raw_name, "Pick 1");
        let normalized = normalized.trim();
        let total = option_total.filter(|total| *total > 0);
        let base = base_name(normalized);

        if base.is_empty() {
            return normalized.to_string();
        }

        if logic == LogicType::AllRequired && self.is_top_level(&base) {
            return base;
        }

        if (logic.is_counted() || PICK_TOKEN.is_match(normalized)) && pick_n > 0 {
            return match total {
                Some(total) => format!("{base}: Pick {pick_n}/{total}"),
                None => format!("{base}: Pick {pick_n}"),
            };
        }

        if logic == LogicType::AllRequired {
            if let Some(total) = total {
                return format!("{base}: All Required/{total}");
            }
        }

        normalized.to_string()
    }
}

/// Removes any logic suffix from a name, leaving the bare label.
#[must_use]
pub fn base_name(name: &str) -> String {
    let name = ANY_ONE.replace_all(name, "Pick 1");
    let name = PICK_TOKEN.replace_all(&name, "");
    let name = ALL_REQUIRED_TOKEN.replace_all(&name, "");
    name.trim()
        .trim_end_matches(|c: char| c == ':' || c.is_whitespace())
        .to_string()
}

/// Formats a name with the default top-level names.
///
/// See [`LabelFormatter::format_name`].
#[must_use]
pub fn format_name(
    raw_name: &str,
    logic: LogicType,
    pick_n: u32,
    option_total: Option<usize>,
) -> String {
    LabelFormatter::default().format_name(raw_name, logic, pick_n, option_total)
}
