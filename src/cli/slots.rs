use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use clap::Parser;
use degree_plan::{
    Catalog, CourseIndex, LabelFormatter, RequirementNode,
    domain::{
        ChoiceOption, CoreRuleSlot, RequirementId, SlotPlan,
        slot::{build_slots, choice_options, named_groups, validate_slots},
        walk_tree,
    },
};
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, Parser)]
#[command(about = "Show or save the fulfillment slots of counted requirements")]
pub struct Slots {
    /// Print the slots as JSON
    #[arg(long)]
    json: bool,

    /// A file of edited slots (JSON or YAML) to validate and convert into
    /// named groups
    #[arg(long, value_name = "FILE")]
    save: Option<PathBuf>,
}

impl Slots {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut catalog = Catalog::open(root);
        let formatter = LabelFormatter::from_config(catalog.config());
        let index = catalog.course_index()?;
        let edges = catalog.substitutions()?.to_vec();
        let tree = catalog.requirement_tree()?;

        let requirements: Vec<RequirementNode> = walk_tree(&tree).cloned().collect();
        let options: HashMap<RequirementId, Vec<ChoiceOption>> = requirements
            .iter()
            .map(|node| (node.id, choice_options(node, &edges, &index)))
            .collect();

        if let Some(path) = &self.save {
            return save(path, &requirements, &options, &index);
        }

        let slots = build_slots(&requirements, &options, &formatter);
        if self.json {
            println!("{}", serde_json::to_string_pretty(&slots)?);
            return Ok(());
        }

        if slots.is_empty() {
            println!("{}", "No counted requirements".dim());
        }
        let mut current = None;
        for slot in &slots {
            if current != Some(slot.requirement_id) {
                current = Some(slot.requirement_id);
                println!("{}", slot.requirement_name.heading());
            }
            let restriction = if slot.restrict_to_sub_groups {
                "substitutes from detected groups only"
            } else {
                "free substitutes"
            };
            println!(
                "  Slot {}/{}  {}",
                slot.slot_index + 1,
                slot.slot_total,
                restriction.dim()
            );
        }
        Ok(())
    }
}

fn save(
    path: &Path,
    requirements: &[RequirementNode],
    options: &HashMap<RequirementId, Vec<ChoiceOption>>,
    index: &CourseIndex,
) -> anyhow::Result<()> {
    let slots: Vec<CoreRuleSlot> = super::read_document(path)?;
    let plans: Vec<SlotPlan> = requirements
        .iter()
        .map(|node| {
            let node_options = options.get(&node.id).map_or(&[][..], Vec::as_slice);
            SlotPlan::for_requirement(node, node_options)
        })
        .collect();

    let issues = validate_slots(&slots, options, &plans);
    if !issues.is_empty() {
        for issue in &issues {
            eprintln!("{}", format!("⚠️  {issue}").warning());
        }
        std::process::exit(2);
    }

    let groups = named_groups(&slots, options, &HashMap::new(), index);
    println!("{}", serde_json::to_string_pretty(&groups)?);
    Ok(())
}
