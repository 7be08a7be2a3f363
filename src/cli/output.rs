//! Output formatting for CLI commands.

use std::io::{self, Write};

use serde::Serialize;

use crate::cli::args::{OutputFormat, VietcatArgs};
use crate::error::Result;
use crate::ml::categorizer::{
    ArtifactInfo, Categorization, CategoryId, EvaluationReport, EvaluationSplit, ModelInspection,
};

/// Result of the `train` command.
#[derive(Debug, Serialize)]
pub struct TrainingResult {
    pub model_dir: String,
    pub training_samples: usize,
    pub test_samples: usize,
    pub evaluation_split: EvaluationSplit,
    pub vocabulary_size: usize,
    pub categories: usize,
    pub accuracy: f64,
    pub quality_threshold: f64,
    pub duration_ms: u64,
}

/// Result of the `classify` command.
#[derive(Debug, Serialize)]
pub struct ClassificationResult {
    pub description: String,
    pub amount: Option<f64>,
    pub classifier: String,
    #[serde(flatten)]
    pub categorization: Categorization,
}

/// Result of the `evaluate` command.
#[derive(Debug, Serialize)]
pub struct EvaluationResult {
    pub model_dir: String,
    pub corpus: String,
    pub categories: Vec<(CategoryId, String)>,
    #[serde(flatten)]
    pub report: EvaluationReport,
}

/// Result of the `inspect` command.
#[derive(Debug, Serialize)]
pub struct InspectionResult {
    pub model_dir: String,
    #[serde(flatten)]
    pub inspection: ModelInspection,
}

/// Results that know how to print themselves for a terminal.
pub trait HumanOutput {
    fn write_human(&self, out: &mut dyn Write) -> io::Result<()>;
}

/// Output a result in the format selected on the command line.
pub fn output_result<T: Serialize + HumanOutput>(
    message: &str,
    result: &T,
    args: &VietcatArgs,
) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_result(&mut out, message, result, args)
}

/// Write a result to `out` in the selected format.
pub fn write_result<T: Serialize + HumanOutput>(
    out: &mut dyn Write,
    message: &str,
    result: &T,
    args: &VietcatArgs,
) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => {
            if args.verbosity() > 0 {
                writeln!(out, "{message}")?;
                writeln!(out)?;
            }
            result.write_human(out)?;
        }
        OutputFormat::Json => {
            if args.pretty {
                serde_json::to_writer_pretty(&mut *out, result)?;
            } else {
                serde_json::to_writer(&mut *out, result)?;
            }
            writeln!(out)?;
        }
    }
    out.flush()?;
    Ok(())
}

impl HumanOutput for TrainingResult {
    fn write_human(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "Model directory:  {}", self.model_dir)?;
        writeln!(out, "Training samples: {}", self.training_samples)?;
        writeln!(out, "Test samples:     {}", self.test_samples)?;
        writeln!(out, "Vocabulary size:  {}", self.vocabulary_size)?;
        writeln!(out, "Categories:       {}", self.categories)?;
        writeln!(
            out,
            "Accuracy:         {} (on {} split)",
            format_percent(self.accuracy),
            split_name(self.evaluation_split)
        )?;
        if self.accuracy < self.quality_threshold {
            writeln!(
                out,
                "Warning: accuracy is below the quality threshold of {}",
                format_percent(self.quality_threshold)
            )?;
        }
        writeln!(out, "Duration:         {} ms", self.duration_ms)
    }
}

impl HumanOutput for ClassificationResult {
    fn write_human(&self, out: &mut dyn Write) -> io::Result<()> {
        let result = &self.categorization;
        writeln!(out, "Description: {}", self.description)?;
        if let Some(amount) = self.amount {
            writeln!(out, "Amount:      {amount}")?;
        }
        writeln!(
            out,
            "Category:    {} (#{})",
            result.category_name, result.category_id
        )?;
        writeln!(out, "Confidence:  {}", format_percent(result.confidence))?;
        if result.requires_human_review {
            writeln!(out, "Review:      required")?;
        }
        if !result.alternatives.is_empty() {
            writeln!(out, "Alternatives:")?;
            for alt in &result.alternatives {
                writeln!(
                    out,
                    "  {:<24} #{:<6} {}",
                    alt.category_name,
                    alt.category_id,
                    format_percent(alt.score)
                )?;
            }
        }
        writeln!(out, "Reasoning:   {}", result.reasoning)
    }
}

impl HumanOutput for EvaluationResult {
    fn write_human(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "Model directory: {}", self.model_dir)?;
        writeln!(out, "Corpus:          {}", self.corpus)?;
        writeln!(
            out,
            "Accuracy:        {} ({}/{})",
            format_percent(self.report.accuracy),
            self.report.correct,
            self.report.samples
        )?;
        if !self.report.per_category.is_empty() {
            writeln!(out)?;
            writeln!(out, "{:<24} {:>8} {:>8} {:>9}", "Category", "Samples", "Correct", "Accuracy")?;
            for (name, stats) in self.categories.iter().filter_map(|(id, name)| {
                self.report.per_category.get(id).map(|stats| (name, stats))
            }) {
                writeln!(
                    out,
                    "{:<24} {:>8} {:>8} {:>9}",
                    name,
                    stats.samples,
                    stats.correct,
                    format_percent(stats.accuracy)
                )?;
            }
        }
        Ok(())
    }
}

impl HumanOutput for InspectionResult {
    fn write_human(&self, out: &mut dyn Write) -> io::Result<()> {
        let metadata = &self.inspection.metadata;
        writeln!(out, "Model directory:  {}", self.model_dir)?;
        writeln!(out, "Model type:       {}", metadata.model_type)?;
        writeln!(out, "Features:         {}", metadata.feature_extractor)?;
        writeln!(out, "Language:         {}", metadata.language)?;
        writeln!(out, "Trained:          {}", metadata.trained_date.to_rfc3339())?;
        writeln!(out, "Library version:  {}", metadata.version)?;
        writeln!(out, "Format version:   {}", metadata.format_version)?;
        writeln!(out, "Training samples: {}", metadata.training_samples)?;
        writeln!(out, "Test samples:     {}", metadata.test_samples)?;
        writeln!(out, "Vocabulary size:  {}", metadata.vocabulary_size)?;
        writeln!(out, "Categories:       {}", self.inspection.categories)?;
        writeln!(
            out,
            "Accuracy:         {} (on {} split)",
            format_percent(metadata.accuracy),
            split_name(metadata.evaluation_split)
        )?;
        writeln!(out, "Seed:             {}", metadata.seed)?;
        writeln!(out)?;
        write_artifact(out, &self.inspection.vectorizer)?;
        write_artifact(out, &self.inspection.classifier)
    }
}

fn write_artifact(out: &mut dyn Write, info: &ArtifactInfo) -> io::Result<()> {
    writeln!(
        out,
        "{:<11} v{}  {:>10}  crc32 {:08x}",
        info.kind.to_string(),
        info.version,
        format_bytes(info.size),
        info.checksum
    )
}

fn split_name(split: EvaluationSplit) -> &'static str {
    match split {
        EvaluationSplit::Test => "test",
        EvaluationSplit::Train => "training",
    }
}

/// Format a probability in `[0, 1]` as a percentage.
fn format_percent(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

/// Format bytes in human-readable format.
fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
