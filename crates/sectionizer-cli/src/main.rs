mod display;

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use sectionizer_core::{FieldDescriptor, PipelineConfig, ReferenceTable, RuleSet};
use sectionizer_engine::Pipeline;

/// Assign raw PDF form fields to the template's thirty sections.
#[derive(Parser)]
#[command(name = "sectionizer", version)]
struct Cli {
    /// Field descriptors extracted from the template (JSON array).
    #[arg(long)]
    fields: PathBuf,

    /// Rule tables to merge, in order (JSON arrays).
    #[arg(long, required = true)]
    rules: Vec<PathBuf>,

    /// Reference count table; defaults to the builtin template table.
    #[arg(long)]
    counts: Option<PathBuf>,

    /// Where to write the report; stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Healing iteration budget.
    #[arg(long, default_value_t = PipelineConfig::default().max_iterations)]
    max_iterations: u32,

    /// Confidence at or above which a match is explicit and protected.
    #[arg(long, default_value_t = PipelineConfig::default().explicit_threshold)]
    explicit_threshold: f64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let fields: Vec<FieldDescriptor> = {
        let file = File::open(&cli.fields)
            .with_context(|| format!("opening {}", cli.fields.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing {}", cli.fields.display()))?
    };

    let mut rules = RuleSet::default();
    for path in &cli.rules {
        let file =
            File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let (table, warnings) = RuleSet::load(BufReader::new(file))
            .with_context(|| format!("parsing {}", path.display()))?;
        for w in &warnings {
            tracing::warn!(
                path = %path.display(),
                index = w.index,
                pattern = %w.pattern,
                "rule skipped: {}",
                w.error
            );
        }
        rules.merge(table);
    }

    let reference = match &cli.counts {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("opening {}", path.display()))?;
            ReferenceTable::load(BufReader::new(file))
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => ReferenceTable::builtin(),
    };

    let config = PipelineConfig {
        max_iterations: cli.max_iterations,
        explicit_threshold: cli.explicit_threshold,
        ..PipelineConfig::default()
    };

    let pipeline = Pipeline::new(rules, reference, config);
    let outcome = pipeline.run(&fields)?;

    match &cli.out {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            outcome.report.write_json(&mut writer)?;
            writer.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            outcome.report.write_json(&mut writer)?;
        }
    }

    display::print_summary(&outcome.report);
    Ok(())
}
