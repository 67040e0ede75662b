mod common;
mod logic;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use std::time::Instant;

use common::collect_documents;
use logic::{DocumentKind, DocumentResult, DocumentTester, TesterConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    /// Sequence when the document has a `scenes` array, scene otherwise
    Auto,
    /// Single-scene blueprint
    Scene,
    /// Multi-scene game sequence
    Sequence,
}

impl KindArg {
    const fn forced(self) -> Option<DocumentKind> {
        match self {
            Self::Auto => None,
            Self::Scene => Some(DocumentKind::Scene),
            Self::Sequence => Some(DocumentKind::Sequence),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "blueprint-tester", version = "0.1.0")]
#[command(about = "Validate, repair and score blueprint documents and check the normalizer invariants")]
struct Args {
    /// Blueprint or sequence JSON files, or directories of them
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Document kind
    #[arg(long, value_enum, default_value_t = KindArg::Auto)]
    kind: KindArg,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Points per zone for max-score fallbacks (overrides --config)
    #[arg(long)]
    points_per_zone: Option<u32>,

    /// JSON file with layout defaults and points per zone
    #[arg(long)]
    config: Option<PathBuf>,

    /// Treat schema issues as failures
    #[arg(long)]
    strict: bool,

    /// Print per-document detail to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if !run(&args)? {
        std::process::exit(1);
    }

    Ok(())
}

/// Check every document and write the report; `Ok(false)` when any failed.
fn run(args: &Args) -> Result<bool> {
    let config = resolve_config(args)?;
    let documents = collect_documents(&args.paths)?;
    if args.report == "console" && args.output.is_none() {
        announce_banner();
    }

    let start_time = Instant::now();
    let tester = DocumentTester::new(config, args.strict, args.verbose);
    let results: Vec<DocumentResult> = documents
        .iter()
        .map(|path| tester.check_path(path, args.kind.forced()))
        .collect();

    write_reports(args, &results, start_time)?;
    Ok(results.iter().all(|r| r.passed))
}

fn resolve_config(args: &Args) -> Result<TesterConfig> {
    let mut config = match &args.config {
        Some(path) => TesterConfig::from_file(path)?,
        None => TesterConfig::default(),
    };
    if let Some(points) = args.points_per_zone {
        config.points_per_zone = points;
    }
    Ok(config)
}

fn announce_banner() {
    println!("{}", "🧩 Blueprint Tester".bright_cyan().bold());
    println!("{}", "===================".cyan());
}

fn write_reports(args: &Args, results: &[DocumentResult], start_time: Instant) -> Result<()> {
    let mut out = open_output(args.output.as_deref())?;

    match args.report.as_str() {
        "json" => logic::reports::generate_json_report(&mut out, results)?,
        "markdown" => logic::reports::generate_markdown_report(&mut out, results)?,
        _ if results.is_empty() => writeln!(out, "No documents found.")?,
        _ => logic::reports::generate_console_report(&mut out, results, start_time.elapsed())?,
    }

    out.flush()?;
    Ok(())
}

/// Buffered report sink: the `--output` file, or stdout.
fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    let Some(path) = path else {
        return Ok(Box::new(BufWriter::new(stdout().lock())));
    };
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    Ok(Box::new(BufWriter::new(file)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "blueprint-main-{label}-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ))
    }

    fn base_args() -> Args {
        Args {
            paths: Vec::new(),
            kind: KindArg::Auto,
            report: "json".to_string(),
            output: None,
            points_per_zone: None,
            config: None,
            strict: false,
            verbose: false,
        }
    }

    #[test]
    fn cli_points_override_config_file() {
        let config_path = temp_path("config.json");
        std::fs::write(&config_path, r#"{"pointsPerZone": 4, "layout": {"defaultHeight": 900}}"#)
            .unwrap();
        let args = Args {
            config: Some(config_path.clone()),
            ..base_args()
        };
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.points_per_zone, 4);
        assert_eq!(config.layout.default_height, 900);

        let args = Args {
            config: Some(config_path),
            points_per_zone: Some(7),
            ..base_args()
        };
        assert_eq!(resolve_config(&args).unwrap().points_per_zone, 7);
    }

    #[test]
    fn missing_config_is_an_error() {
        let args = Args {
            config: Some(temp_path("absent.json")),
            ..base_args()
        };
        let err = resolve_config(&args).unwrap_err();
        assert!(err.to_string().contains("failed to read config"));
    }

    #[test]
    fn kind_arg_forces_detection() {
        assert_eq!(KindArg::Auto.forced(), None);
        assert_eq!(KindArg::Sequence.forced(), Some(DocumentKind::Sequence));
    }

    #[test]
    fn run_writes_json_report_and_reports_failures() {
        let doc = temp_path("scene.json");
        std::fs::write(&doc, r#"{"labels": [{"id": "a", "text": "A", "correctZoneId": ""}]}"#)
            .unwrap();
        let report = temp_path("report.json");
        let args = Args {
            paths: vec![doc],
            output: Some(report.clone()),
            ..base_args()
        };
        assert!(run(&args).unwrap());
        let content = std::fs::read_to_string(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["passed"], 1);
        assert_eq!(value["documents"][0]["synthesized_zones"], 1);

        let strict = Args {
            strict: true,
            ..args
        };
        assert!(!run(&strict).unwrap());
    }

    #[test]
    fn console_report_without_documents() {
        let output = temp_path("console.txt");
        let args = Args {
            report: "console".to_string(),
            output: Some(output.clone()),
            ..base_args()
        };
        write_reports(&args, &[], Instant::now()).unwrap();
        let content = std::fs::read_to_string(output).unwrap();
        assert!(content.contains("No documents found."));
    }

    #[test]
    fn report_sink_defaults_to_stdout() {
        let mut out = open_output(None).unwrap();
        out.write_all(b"ok").unwrap();
        out.flush().unwrap();
    }

    #[test]
    fn report_sink_rejects_unwritable_paths() {
        let dir = temp_path("no-such-dir");
        let err = open_output(Some(&dir.join("report.md"))).err().unwrap();
        assert!(err.to_string().contains("failed to create"));
    }
}
