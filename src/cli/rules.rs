use std::path::PathBuf;

use clap::Parser;
use degree_plan::{
    Catalog,
    domain::{RuleId, RulePayload, rule::group_by_domain},
};
use tracing::instrument;

use super::terminal::{Colorize, fit_line};

#[derive(Debug, Parser)]
#[command(about = "List validation rules grouped by dashboard domain")]
pub struct Rules {
    /// Print the grouped rules as JSON
    #[arg(long, conflicts_with = "payload")]
    json: bool,

    /// Print the save payload of a single rule instead
    #[arg(long, value_name = "RULE_ID")]
    payload: Option<RuleId>,

    /// With --payload, pin the rule to this domain (an empty label clears
    /// the override)
    #[arg(long, requires = "payload")]
    domain: Option<String>,

    /// Include inactive rules
    #[arg(long, short)]
    all: bool,
}

impl Rules {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut catalog = Catalog::open(root);
        let rules = catalog.rules()?;

        if let Some(id) = self.payload {
            let Some(rule) = rules.iter().find(|rule| rule.id == id) else {
                anyhow::bail!("Rule {id} not found");
            };
            let mut payload = RulePayload::from(rule);
            if let Some(domain) = &self.domain {
                payload = payload.with_domain(Some(domain));
            }
            println!("{}", serde_json::to_string_pretty(&payload)?);
            return Ok(());
        }

        let mut groups = group_by_domain(rules);
        if !self.all {
            for group in &mut groups {
                group.rules.retain(|rule| rule.active);
            }
            groups.retain(|group| !group.rules.is_empty());
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&groups)?);
            return Ok(());
        }

        if groups.is_empty() {
            println!("{}", "No validation rules".dim());
        }
        for group in &groups {
            println!("{}", group.domain.label().heading());
            for rule in &group.rules {
                let line = format!("  {} [{} {}]", rule.name, rule.tier, rule.severity);
                if rule.active {
                    println!("{}", fit_line(&line));
                } else {
                    println!("{}", fit_line(&format!("{line} (inactive)")).dim());
                }
            }
        }
        Ok(())
    }
}
