use std::path::PathBuf;

use clap::Parser;
use degree_plan::{
    Catalog, CourseIndex, LabelFormatter, RequirementNode, SubstitutionEdge,
    domain::slot::choice_options,
};
use tracing::instrument;

use super::terminal::{Colorize, fit_line};

#[derive(Debug, Default, Parser)]
#[command(about = "Print the requirement tree with canonical labels")]
pub struct Labels {
    /// Also list linked courses, with substitutes grouped together
    #[arg(long)]
    courses: bool,

    /// Print requirement ids next to labels
    #[arg(long)]
    ids: bool,
}

struct Context<'a> {
    index: &'a CourseIndex,
    edges: &'a [SubstitutionEdge],
    formatter: &'a LabelFormatter,
}

impl Labels {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut catalog = Catalog::open(root);
        let formatter = LabelFormatter::from_config(catalog.config());
        let index = catalog.course_index()?;
        let edges = catalog.substitutions()?.to_vec();
        let tree = catalog.requirement_tree()?;

        if tree.is_empty() {
            println!("{}", "No requirements found".dim());
            return Ok(());
        }

        let context = Context {
            index: &index,
            edges: &edges,
            formatter: &formatter,
        };
        for node in &tree {
            self.print_node(node, 0, &context);
        }
        Ok(())
    }

    fn print_node(&self, node: &RequirementNode, depth: usize, context: &Context<'_>) {
        let options = choice_options(node, context.edges, context.index);
        let total = Some(node.children.len() + options.len()).filter(|total| *total > 0);
        let label = context
            .formatter
            .format_name(&node.name, node.logic_type, node.pick_n, total);

        let indent = "  ".repeat(depth);
        let line = if self.ids {
            format!("{indent}{label}  {}", node.id)
        } else {
            format!("{indent}{label}")
        };
        let line = fit_line(&line);
        if depth == 0 {
            println!("{}", line.heading());
        } else {
            println!("{line}");
        }

        if self.courses {
            for option in &options {
                let numbers: Vec<_> = context
                    .index
                    .course_numbers(option.group_course_ids.iter().copied())
                    .collect();
                let text = format!("{indent}  • {}", numbers.join(" | "));
                println!("{}", fit_line(&text).dim());
            }
        }

        for child in &node.children {
            self.print_node(child, depth + 1, context);
        }
    }
}
