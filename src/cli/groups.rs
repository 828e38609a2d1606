use std::path::PathBuf;

use clap::Parser;
use degree_plan::{
    Catalog, CourseIndex,
    domain::{BasketId, RequirementId, SubGroupRow, basket::seed_sub_groups, tree::find_node},
};
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, Parser)]
#[command(about = "Show substitute groups among a requirement's or a basket's courses")]
pub struct Groups {
    /// The requirement whose linked courses are grouped
    #[arg(required_unless_present = "basket", conflicts_with = "basket")]
    requirement: Option<RequirementId>,

    /// Group a stored basket's courses instead
    #[arg(long)]
    basket: Option<BasketId>,

    /// For a basket, group by the catalog's substitution edges rather than
    /// the basket's own sub-groups
    #[arg(long, requires = "basket")]
    seed: bool,

    /// Print the groups as JSON
    #[arg(long)]
    json: bool,
}

impl Groups {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut catalog = Catalog::open(root);
        let index = catalog.course_index()?;
        let edges = catalog.substitutions()?.to_vec();

        let (title, groups): (String, Vec<SubGroupRow>) = if let Some(basket_id) = self.basket {
            let Some(basket) = catalog.baskets()?.iter().find(|b| b.id == basket_id).cloned()
            else {
                anyhow::bail!("Basket {basket_id} not found");
            };
            let groups = if self.seed {
                seed_sub_groups(&basket.course_ids, &edges, &index)
            } else {
                basket
                    .substitute_groups(&index)
                    .iter()
                    .map(SubGroupRow::from)
                    .collect()
            };
            (basket.name, groups)
        } else {
            let tree = catalog.requirement_tree()?;
            let id = self
                .requirement
                .ok_or_else(|| anyhow::anyhow!("a requirement id or --basket is required"))?;
            let Some(node) = find_node(&tree, id) else {
                anyhow::bail!("Requirement {id} not found");
            };
            let groups = node
                .course_groups(&edges, &index)
                .iter()
                .map(SubGroupRow::from)
                .collect();
            (node.name.clone(), groups)
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&groups)?);
            return Ok(());
        }

        println!("{}", title.heading());
        if groups.is_empty() {
            println!("{}", "  No substitute groups".dim());
        }
        for (number, group) in groups.iter().enumerate() {
            print_group(number + 1, group, &index);
        }
        Ok(())
    }
}

fn print_group(number: usize, group: &SubGroupRow, index: &CourseIndex) {
    let Some(primary) = group.primary_course_id else {
        return;
    };
    let substitutes: Vec<String> = group
        .substitute_course_ids
        .iter()
        .map(|id| index.label(*id))
        .collect();
    println!(
        "  Group {number}: {} {} {}",
        index.label(primary),
        "⇄".dim(),
        substitutes.join(", ")
    );
}
