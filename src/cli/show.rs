use std::path::PathBuf;

use clap::Parser;
use degree_plan::{
    Catalog, LabelFormatter,
    domain::{RequirementId, project_form},
};
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, Parser)]
#[command(about = "Display the editor form for a requirement")]
pub struct Show {
    /// The id of the requirement to display
    id: RequirementId,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "pretty")]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Pretty,
    /// The form as JSON
    Json,
    /// The store payload the form saves as
    Payload,
}

impl Show {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut catalog = Catalog::open(root);
        let formatter = LabelFormatter::from_config(catalog.config());
        let tree = catalog.requirement_tree()?;

        let Some(form) = project_form(Some(self.id), &tree, &formatter) else {
            anyhow::bail!("Requirement {} not found", self.id);
        };

        match self.output {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&form)?),
            OutputFormat::Payload => {
                println!("{}", serde_json::to_string_pretty(&form.to_payload(&formatter))?);
            }
            OutputFormat::Pretty => {
                let payload = form.to_payload(&formatter);
                println!("# {}", payload.name);
                println!("{}\n", self.id.to_string().dim());

                println!("{}", "Logic".dim());
                println!("  Type:      {}", form.logic_type);
                if form.logic_type.is_counted() {
                    println!("  Pick:      {}", form.pick_n);
                }
                println!("  Options:   {}", form.option_total);
                println!("  Courses:   {}", form.course_count);

                println!("\n{}", "Placement".dim());
                if let Some(category) = form.category {
                    println!("  Category:  {category:?}");
                }
                if let Some(mode) = form.major_mode {
                    println!("  Mode:      {mode:?}");
                }
                if let Some(track) = &form.track_name {
                    println!("  Track:     {track}");
                }
                match form.parent_requirement_id {
                    Some(parent) => println!("  Parent:    {parent}"),
                    None => println!("  Parent:    {}", "(top level)".dim()),
                }
                if form.is_top_level {
                    println!("  {}", "Top-level program node".success());
                }
                if form.can_hold_tracks {
                    println!("  {}", "May hold tracks".dim());
                }
            }
        }

        Ok(())
    }
}
