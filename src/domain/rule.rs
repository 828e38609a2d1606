//! Validation rules as shown on the dashboard.
//!
//! A rule's domain is never stored. It is read from an explicit `domain` key
//! in the rule's JSON config, or guessed from keywords in its name and config
//! keys. Rules are ordered by `domain_order`, then by the number in their
//! `rule_code`, then by name.

use std::{cmp::Ordering, fmt, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::domain::RuleId;

static CODE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*$").expect("valid pattern"));

const PATHWAY_KEYWORDS: &[&str] = &["abet", "major", "program", "pathway"];
const INTEGRITY_KEYWORDS: &[&str] = &["prerequisite", "ordering", "co-requisite", "integrity"];
const RESOURCE_KEYWORDS: &[&str] = &["section", "instructor", "classroom", "capacity", "resource"];

/// A validation rule record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRule {
    /// Stable identifier.
    pub id: RuleId,
    /// Display name.
    pub name: String,
    /// Tier, such as `TIER_1`.
    #[serde(default)]
    pub tier: String,
    /// Severity, such as `ERROR` or `WARNING`.
    #[serde(default)]
    pub severity: String,
    /// Whether the rule is enforced.
    #[serde(default = "active_by_default")]
    pub active: bool,
    /// Raw JSON configuration.
    ///
    /// Datasets may hold it either as a JSON string or as an inline object.
    #[serde(default, deserialize_with = "config_text")]
    pub config_json: String,
}

const fn active_by_default() -> bool {
    true
}

fn config_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(text) => text,
        other => other.to_string(),
    })
}

/// Where a rule sits on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuleDomain {
    /// Program and major pathway rules.
    ProgramPathway,
    /// Prerequisite and ordering rules.
    CurriculumIntegrity,
    /// Sections, instructors and rooms.
    Resources,
    /// Everything else.
    General,
    /// An explicit domain from the rule's config.
    Custom(String),
}

impl RuleDomain {
    /// Maps a label to a domain, keeping unknown labels verbatim.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label {
            "Program/Major Pathway" => Self::ProgramPathway,
            "Curriculum Integrity" => Self::CurriculumIntegrity,
            "Resources" => Self::Resources,
            "General" => Self::General,
            other => Self::Custom(other.to_string()),
        }
    }

    /// The dashboard label.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::ProgramPathway => "Program/Major Pathway",
            Self::CurriculumIntegrity => "Curriculum Integrity",
            Self::Resources => "Resources",
            Self::General => "General",
            Self::Custom(label) => label,
        }
    }
}

impl fmt::Display for RuleDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for RuleDomain {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl ValidationRule {
    /// The parsed configuration.
    ///
    /// Malformed JSON, or JSON that is not an object, yields an empty map.
    #[must_use]
    pub fn config(&self) -> Map<String, Value> {
        match serde_json::from_str(&self.config_json) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Infers the dashboard domain.
    #[must_use]
    pub fn domain(&self) -> RuleDomain {
        let config = self.config();
        if let Some(Value::String(domain)) = config.get("domain") {
            if !domain.trim().is_empty() {
                return RuleDomain::from_label(domain);
            }
        }

        let mut haystack = self.name.to_lowercase();
        for key in config.keys() {
            haystack.push(' ');
            haystack.push_str(&key.to_lowercase());
        }
        let mentions = |keywords: &[&str]| keywords.iter().any(|word| haystack.contains(word));

        if mentions(PATHWAY_KEYWORDS) {
            RuleDomain::ProgramPathway
        } else if mentions(INTEGRITY_KEYWORDS) {
            RuleDomain::CurriculumIntegrity
        } else if mentions(RESOURCE_KEYWORDS) {
            RuleDomain::Resources
        } else {
            RuleDomain::General
        }
    }

    /// The explicit dashboard position, if positive.
    fn domain_order(config: &Map<String, Value>) -> Option<f64> {
        let order = match config.get("domain_order")? {
            Value::Number(number) => number.as_f64()?,
            Value::String(text) => text.trim().parse().ok()?,
            _ => return None,
        };
        (order.is_finite() && order > 0.0).then_some(order)
    }

    /// The trailing number of `rule_code`, e.g. 12 for `R12`.
    fn code_number(config: &Map<String, Value>) -> Option<u64> {
        let code = match config.get("rule_code")? {
            Value::String(code) => code.clone(),
            Value::Number(number) => number.to_string(),
            _ => return None,
        };
        CODE_NUMBER.captures(&code)?.get(1)?.as_str().parse().ok()
    }
}

fn present_first<T>(a: Option<T>, b: Option<T>, cmp: impl FnOnce(&T, &T) -> Ordering) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => cmp(&a, &b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Dashboard order of two rules.
///
/// Explicit `domain_order` wins, then the `rule_code` number, then the name.
/// Ties are broken by id, so the order is total.
#[must_use]
pub fn compare(a: &ValidationRule, b: &ValidationRule) -> Ordering {
    let (config_a, config_b) = (a.config(), b.config());

    present_first(
        ValidationRule::domain_order(&config_a),
        ValidationRule::domain_order(&config_b),
        |x, y| x.total_cmp(y),
    )
    .then_with(|| {
        present_first(
            ValidationRule::code_number(&config_a),
            ValidationRule::code_number(&config_b),
            Ord::cmp,
        )
    })
    .then_with(|| a.name.cmp(&b.name))
    .then_with(|| a.id.cmp(&b.id))
}

/// Sorts rules into dashboard order.
pub fn sort_rules(rules: &mut [ValidationRule]) {
    rules.sort_by(compare);
}

/// Rules sharing a dashboard domain.
#[derive(Debug, Serialize)]
pub struct RuleGroup<'a> {
    /// The shared domain.
    pub domain: RuleDomain,
    /// Rules in dashboard order.
    pub rules: Vec<&'a ValidationRule>,
}

/// Sorts the rules and groups them by domain.
///
/// Groups appear in the order their first rule appears.
#[must_use]
pub fn group_by_domain(rules: &[ValidationRule]) -> Vec<RuleGroup<'_>> {
    let mut sorted: Vec<&ValidationRule> = rules.iter().collect();
    sorted.sort_by(|a, b| compare(a, b));

    let mut groups: Vec<RuleGroup<'_>> = Vec::new();
    for rule in sorted {
        let domain = rule.domain();
        match groups.iter_mut().find(|group| group.domain == domain) {
            Some(group) => group.rules.push(rule),
            None => groups.push(RuleGroup {
                domain,
                rules: vec![rule],
            }),
        }
    }
    groups
}

/// A validation rule as sent to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RulePayload {
    /// Display name.
    pub name: String,
    /// Tier.
    pub tier: String,
    /// Severity.
    pub severity: String,
    /// Whether the rule is enforced.
    pub active: bool,
    /// Parsed configuration.
    pub config: Map<String, Value>,
}

impl From<&ValidationRule> for RulePayload {
    fn from(rule: &ValidationRule) -> Self {
        Self {
            name: rule.name.clone(),
            tier: rule.tier.clone(),
            severity: rule.severity.clone(),
            active: rule.active,
            config: rule.config(),
        }
    }
}

impl RulePayload {
    /// Pins the rule to a dashboard domain, or clears the override with
    /// `None` (or a blank label) so the domain is inferred again.
    #[must_use]
    pub fn with_domain(mut self, domain: Option<&str>) -> Self {
        match domain.map(str::trim).filter(|label| !label.is_empty()) {
            Some(label) => {
                self.config
                    .insert("domain".to_string(), Value::String(label.to_string()));
            }
            None => {
                self.config.remove("domain");
            }
        }
        self
    }
}
