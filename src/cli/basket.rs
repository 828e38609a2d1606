use std::path::PathBuf;

use clap::Parser;
use degree_plan::{
    Catalog,
    domain::{
        BasketContext, BasketDraft, BasketId, BasketLinkId, RequirementId,
        basket::seed_sub_groups,
    },
};
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, Parser)]
#[command(about = "Validate a basket draft and print what saving it would send")]
pub struct Basket {
    /// The draft to validate (JSON or YAML)
    draft: PathBuf,

    /// The requirement the basket is being attached to
    #[arg(long)]
    requirement: Option<RequirementId>,

    /// Reuse an existing basket instead of saving the draft as a new one
    #[arg(long)]
    reuse: Option<BasketId>,

    /// The basket link being edited, if any
    #[arg(long)]
    link: Option<BasketLinkId>,

    /// Fill in sub-groups from the catalog's substitution edges when the
    /// draft declares none
    #[arg(long)]
    seed: bool,
}

impl Basket {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut catalog = Catalog::open(root);
        let mut draft: BasketDraft = super::read_document(&self.draft)?;

        if self.seed && draft.sub_groups.is_empty() {
            let index = catalog.course_index()?;
            let edges = catalog.substitutions()?;
            draft.sub_groups = seed_sub_groups(&draft.unique_course_ids(), edges, &index);
            tracing::info!(rows = draft.sub_groups.len(), "seeded sub-groups");
        }

        let links = catalog.basket_links()?;
        let context = BasketContext {
            requirement_id: self.requirement,
            reuse_basket_id: self.reuse,
            current_link_id: self.link,
            links,
        };

        match draft.prepare(&context) {
            Ok(save) => {
                println!("{}", serde_json::to_string_pretty(&save)?);
                Ok(())
            }
            Err(issues) => {
                eprintln!(
                    "{}",
                    format!("⚠️  Basket draft has {} issue(s):", issues.len()).warning()
                );
                for issue in &issues {
                    eprintln!("  • {issue}");
                }
                std::process::exit(2);
            }
        }
    }
}
