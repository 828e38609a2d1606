use std::path::PathBuf;

use clap::Parser;
use degree_plan::{Catalog, domain::tree::check_tree};
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, Parser)]
#[command(about = "Check the requirement tree for structural problems")]
pub struct Check {
    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Suppress all output except errors
    #[arg(long, short)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl Check {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut catalog = Catalog::open(root);
        let index = catalog.course_index()?;
        let tree = catalog.requirement_tree()?;

        let issues = check_tree(&tree, &index);
        tracing::debug!(count = issues.len(), "tree checked");

        if !self.quiet {
            match self.output {
                OutputFormat::Table => {
                    if issues.is_empty() {
                        let count = tree.iter().flat_map(|node| node.walk()).count();
                        println!(
                            "{}",
                            format!("Requirement tree is healthy ({count} requirements, 0 issues)")
                                .success()
                        );
                    } else {
                        println!(
                            "{}",
                            format!("✗ {} issue(s) found", issues.len()).warning()
                        );
                        for issue in &issues {
                            println!("  • {issue}");
                        }
                    }
                }
                OutputFormat::Json => {
                    let messages: Vec<String> = issues.iter().map(ToString::to_string).collect();
                    println!("{}", serde_json::to_string_pretty(&messages)?);
                }
            }
        }

        if !issues.is_empty() {
            std::process::exit(2);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn healthy_tree_passes() {
        let tmp = tempdir().unwrap();
        std::fs::write(
            tmp.path().join("requirements.json"),
            r#"[
                {"id": "00000000-0000-0000-0000-000000000001", "name": "Core"},
                {"id": "00000000-0000-0000-0000-000000000002", "name": "Math",
                 "parent_requirement_id": "00000000-0000-0000-0000-000000000001"}
            ]"#,
        )
        .unwrap();

        Check {
            output: OutputFormat::Table,
            quiet: true,
        }
        .run(tmp.path().to_path_buf())
        .unwrap();
    }

    #[test]
    fn empty_catalog_passes() {
        let tmp = tempdir().unwrap();

        Check {
            output: OutputFormat::Json,
            quiet: false,
        }
        .run(tmp.path().to_path_buf())
        .unwrap();
    }
}
