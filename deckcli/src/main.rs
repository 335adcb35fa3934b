use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use deckcraft_core::{DeckBuilder, PipelineConfig, SheetOutcome};
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "deckcli")]
#[command(about = "Generate a styled slide deck from a spreadsheet workbook", long_about = None)]
#[command(version)]
struct Cli {
    /// Workbook to convert (.xlsx)
    #[arg(value_name = "WORKBOOK")]
    workbook: PathBuf,

    /// Template presentation supplying layouts and boilerplate slides
    #[arg(value_name = "TEMPLATE")]
    template: PathBuf,

    /// Output deck path
    #[arg(short, long, default_value = "deck.pptx")]
    output: PathBuf,

    /// Project title patched into the template's first slide
    #[arg(short, long)]
    title: Option<String>,

    /// Rows per generated slide (overrides the config file)
    #[arg(short, long)]
    rows_per_slide: Option<usize>,

    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Write per-sheet row-record JSON into this directory
    #[arg(long, value_name = "DIR")]
    dump_rows: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &cli.config {
        PipelineConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        // Pick up a default config from the current directory if present
        let default_config_path = PathBuf::from("deckcraft.toml");
        if default_config_path.exists() {
            PipelineConfig::from_file(&default_config_path).with_context(|| {
                format!(
                    "Failed to load config from {}",
                    default_config_path.display()
                )
            })?
        } else {
            PipelineConfig::default()
        }
    };
    if let Some(rows) = cli.rows_per_slide {
        config.rows_per_slide = rows;
    }

    let workbook = fs::read(&cli.workbook)
        .with_context(|| format!("Failed to read workbook: {}", cli.workbook.display()))?;
    let template = fs::read(&cli.template)
        .with_context(|| format!("Failed to read template: {}", cli.template.display()))?;

    let builder = DeckBuilder::with_config(config);
    let sheets = builder.extract(&workbook)?;

    let mut included = 0usize;
    let mut total_rows = 0usize;
    for outcome in &sheets {
        match outcome {
            SheetOutcome::Included(result) => {
                included += 1;
                total_rows += result.rows.len();
                println!(
                    "{} {} ({} rows, {} columns)",
                    "extracted".green(),
                    result.name,
                    result.rows.len(),
                    result.headers.len()
                );
            }
            SheetOutcome::Skipped { name, reason } => {
                eprintln!("{} {}: {}", "skipped".yellow(), name, reason);
            }
        }
    }

    if let Some(dir) = &cli.dump_rows {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        for outcome in &sheets {
            if let SheetOutcome::Included(result) = outcome {
                let path = dir.join(format!("{}.json", sanitize_name(&result.name)));
                let json = serde_json::to_string_pretty(&result.rows)?;
                fs::write(&path, json)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }
        }
    }

    let deck = builder.paginate(
        &template,
        &sheets,
        cli.title.as_deref(),
        chrono::Local::now().date_naive(),
    )?;
    fs::write(&cli.output, &deck)
        .with_context(|| format!("Failed to write deck: {}", cli.output.display()))?;

    println!(
        "{} {} ({} sheets, {} data rows)",
        "generated".green().bold(),
        cli.output.display(),
        included,
        total_rows
    );

    Ok(())
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
