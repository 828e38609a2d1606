use std::path::{Path, PathBuf};

mod basket;
mod check;
mod groups;
mod labels;
mod r#move;
mod rules;
mod show;
mod slots;
mod terminal;

use clap::ArgAction;
use degree_plan::{
    Catalog,
    domain::{RequirementId, tree::remove_node},
    storage::catalog::config_path,
};
use tracing::instrument;

/// Reads a JSON or YAML document, chosen by the file extension.
fn read_document<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
    let is_json = path.extension().is_some_and(|extension| extension == "json");
    let document = if is_json {
        serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {e}", path.display()))?
    } else {
        serde_yaml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {e}", path.display()))?
    };
    Ok(document)
}

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// The path to the root of the catalog directory
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        self.command
            .unwrap_or_else(|| Command::Labels(labels::Labels::default()))
            .run(self.root)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Initialize a catalog directory
    Init,

    /// Show the requirement tree with canonical labels (default)
    Labels(labels::Labels),

    /// Show the editor form for a requirement
    Show(show::Show),

    /// Show substitute groups for a requirement or a basket
    Groups(groups::Groups),

    /// Show the fulfillment slots of counted requirements
    ///
    /// With `--save`, reads edited slots and prints the named groups they
    /// are saved as.
    Slots(slots::Slots),

    /// Validate a basket draft and print its save payload
    Basket(basket::Basket),

    /// Move a requirement node or a course leaf within the tree
    Move(r#move::Move),

    /// Delete a requirement and its subtree
    Delete(Delete),

    /// Check the requirement tree for structural problems
    Check(check::Check),

    /// List validation rules grouped by dashboard domain
    Rules(rules::Rules),

    /// Show or modify configuration settings
    Config(Config),
}

impl Command {
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        match self {
            Self::Init => Init::run(&root)?,
            Self::Labels(command) => command.run(root)?,
            Self::Show(command) => command.run(root)?,
            Self::Groups(command) => command.run(root)?,
            Self::Slots(command) => command.run(root)?,
            Self::Basket(command) => command.run(root)?,
            Self::Move(command) => command.run(root)?,
            Self::Delete(command) => command.run(root)?,
            Self::Check(command) => command.run(root)?,
            Self::Rules(command) => command.run(root)?,
            Self::Config(command) => command.run(&root)?,
        }
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Init {}

impl Init {
    #[instrument]
    fn run(root: &Path) -> anyhow::Result<()> {
        let config_path = config_path(root);
        if config_path.exists() {
            anyhow::bail!(
                "Catalog already initialized (found existing {})",
                config_path.display()
            );
        }

        if let Some(dir) = config_path.parent() {
            std::fs::create_dir_all(dir)
                .map_err(|e| anyhow::anyhow!("Failed to create {}: {e}", dir.display()))?;
        }

        degree_plan::Config::default()
            .save(&config_path)
            .map_err(|e| anyhow::anyhow!("Failed to create config.toml: {e}"))?;

        println!("Initialized degree plan catalog in {}", root.display());
        println!("  Created: .plan/config.toml");
        println!();
        println!("Next steps:");
        println!("  add courses.json and requirements.json, then run 'plan labels'");

        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Delete {
    /// The id of the requirement to delete
    id: RequirementId,

    /// Show what would be deleted without deleting
    #[arg(long)]
    dry_run: bool,
}

impl Delete {
    #[instrument]
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        use terminal::Colorize;

        let mut catalog = Catalog::open(root);
        let tree = catalog.requirement_tree()?;

        let Some(node) = degree_plan::domain::tree::find_node(&tree, self.id) else {
            anyhow::bail!("Requirement {} not found", self.id);
        };
        let removed = node.walk().count();
        let name = node.name.clone();

        let (remaining, detached) = remove_node(&tree, self.id);

        println!("Deleting \"{name}\" and {} descendant(s)", removed - 1);
        if !detached.is_empty() {
            println!(
                "{}",
                format!("  {} course link(s) will be detached", detached.len()).dim()
            );
            for link in &detached {
                println!("  • {}", link.to_string().dim());
            }
        }

        if self.dry_run {
            println!("{}", format!("Would delete {removed} requirement(s)").dim());
            return Ok(());
        }

        catalog.save_requirements(remaining)?;

        println!(
            "{}",
            format!("✅ Deleted {removed} requirement(s)").success()
        );
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Config {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Debug, clap::Parser)]
enum ConfigCommand {
    /// Show current configuration
    Show,

    /// Treat a requirement name as a top-level program node
    AddTopLevel {
        /// The bare name, such as 'Foundations'
        name: String,
    },

    /// Treat names with this prefix as top-level program nodes
    AddPrefix {
        /// The prefix, such as 'Track -'
        prefix: String,
    },
}

impl Config {
    #[instrument]
    fn run(self, root: &Path) -> anyhow::Result<()> {
        use terminal::Colorize;

        let config_path = config_path(root);
        let mut config = if config_path.exists() {
            degree_plan::Config::load(&config_path).map_err(|e| anyhow::anyhow!("{e}"))?
        } else {
            degree_plan::Config::default()
        };

        let added = match self.command {
            ConfigCommand::Show => {
                println!("Configuration:");
                println!("  top_level_names: {:?}", config.top_level_names());
                println!("  top_level_prefixes: {:?}", config.top_level_prefixes());
                println!(
                    "  data_dir: {}",
                    config
                        .data_dir
                        .as_deref()
                        .map_or_else(|| "(catalog root)".dim(), str::to_string)
                );
                return Ok(());
            }
            ConfigCommand::AddTopLevel { name } => config.add_top_level_name(name),
            ConfigCommand::AddPrefix { prefix } => config.add_top_level_prefix(prefix),
        };

        if !added {
            println!("{}", "Already configured; nothing to do".dim());
            return Ok(());
        }

        if let Some(dir) = config_path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        config
            .save(&config_path)
            .map_err(|e| anyhow::anyhow!("{e}"))?;
        println!("{}", "Configuration updated".success());

        Ok(())
    }
}
