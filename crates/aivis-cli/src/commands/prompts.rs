use aivis_scanner::{
    generate_from_templates, merge_prompts, parse_prompt_csv, validate_prompts, CSV_TEMPLATE,
};
use anyhow::Context;
use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Args)]
pub struct PromptsArgs {
    #[command(subcommand)]
    action: PromptsAction,
}

#[derive(Debug, Subcommand)]
enum PromptsAction {
    /// Fill discovery templates from keywords
    Generate {
        /// Service keyword (repeatable)
        #[arg(long = "keyword", required = true)]
        keywords: Vec<String>,

        /// Industry label used where a template has no keyword slot
        #[arg(long)]
        industry: Option<String>,

        /// City or region appended to location-aware templates
        #[arg(long)]
        location: Option<String>,

        /// Maximum number of prompts
        #[arg(long, default_value_t = 10)]
        count: usize,

        /// Drop prompts that already name this brand
        #[arg(long)]
        brand: Option<String>,
    },
    /// Parse a prompt CSV and merge it into an existing list
    Import {
        /// CSV file whose first column holds prompts
        file: PathBuf,

        /// Existing list, one prompt per line
        #[arg(long)]
        existing: Option<PathBuf>,
    },
    /// Print a sample CSV
    Template,
}

pub fn run(args: PromptsArgs) -> anyhow::Result<()> {
    match args.action {
        PromptsAction::Generate {
            keywords,
            industry,
            location,
            count,
            brand,
        } => {
            let generated =
                generate_from_templates(&keywords, industry.as_deref(), location.as_deref(), count)?;
            let prompts = validate_prompts(&generated, brand.as_deref());
            if prompts.len() < generated.len() {
                info!("Dropped {} prompts", generated.len() - prompts.len());
            }
            for prompt in prompts {
                println!("{prompt}");
            }
        }
        PromptsAction::Import { file, existing } => {
            let content = read(&file)?;
            let parsed = parse_prompt_csv(&content);
            for error in &parsed.errors {
                warn!("{}: {}", file.display(), error);
            }

            let existing = match existing {
                Some(path) => read(&path)?
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(ToString::to_string)
                    .collect(),
                None => Vec::new(),
            };

            let merge = merge_prompts(&existing, parsed.prompts.into_iter().map(|p| p.text));
            info!(
                added = merge.added.len(),
                duplicates = merge.duplicates.len(),
                "Prompts imported"
            );
            for prompt in merge.merged {
                println!("{prompt}");
            }
        }
        PromptsAction::Template => print!("{CSV_TEMPLATE}"),
    }
    Ok(())
}

fn read(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}
