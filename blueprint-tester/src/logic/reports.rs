use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::io::Write;
use std::time::Duration;

use super::DocumentResult;
use crate::common::generated_at;

struct Summary {
    total: usize,
    passed: usize,
    failed: usize,
    issues: usize,
}

impl Summary {
    fn of(results: &[DocumentResult]) -> Self {
        let passed = results.iter().filter(|r| r.passed).count();
        Self {
            total: results.len(),
            passed,
            failed: results.len() - passed,
            issues: results.iter().map(|r| r.issues.len()).sum(),
        }
    }

    fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let rate = (self.passed as f64 / self.total as f64) * 100.0;
        rate
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: String,
    total: usize,
    passed: usize,
    failed: usize,
    documents: &'a [DocumentResult],
}

pub fn generate_console_report(
    out: &mut dyn Write,
    results: &[DocumentResult],
    total_duration: Duration,
) -> Result<()> {
    let summary = Summary::of(results);
    writeln!(out)?;
    writeln!(out, "{}", "📊 Blueprint Check Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "==========================".cyan())?;
    writeln!(out, "Documents: {}", summary.total)?;
    writeln!(out, "Passed: {}", summary.passed.to_string().green())?;
    writeln!(out, "Failed: {}", summary.failed.to_string().red())?;
    writeln!(out, "Schema issues: {}", summary.issues.to_string().yellow())?;
    writeln!(out, "Success rate: {:.1}%", summary.success_rate())?;
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    for result in results {
        let status = if result.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };
        let kind = result.kind.map_or("unreadable", |kind| kind.label());
        writeln!(out, "{status} {} ({kind})", result.document.bold())?;
        if result.kind.is_some() {
            writeln!(
                out,
                "   Scenes: {}  Zones: {}  Labels: {}  Max score: {}",
                result.scenes, result.zones, result.labels, result.max_score
            )?;
            writeln!(
                out,
                "   Repairs: {} renamed, {} synthesized",
                result.renamed_ids, result.synthesized_zones
            )?;
        }
        if !result.issues.is_empty() {
            writeln!(out, "   Issues:")?;
            for issue in &result.issues {
                writeln!(out, "     • {}: {}", issue.path, issue.message.yellow())?;
            }
        }
        if !result.failures.is_empty() {
            writeln!(out, "   Failures:")?;
            for failure in &result.failures {
                writeln!(out, "     • {}", failure.red())?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn generate_json_report(out: &mut dyn Write, results: &[DocumentResult]) -> Result<()> {
    let summary = Summary::of(results);
    let report = JsonReport {
        generated_at: generated_at(),
        total: summary.total,
        passed: summary.passed,
        failed: summary.failed,
        documents: results,
    };
    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)?;
    Ok(())
}

pub fn generate_markdown_report(out: &mut dyn Write, results: &[DocumentResult]) -> Result<()> {
    let summary = Summary::of(results);
    writeln!(out, "# Blueprint Check Results\n")?;
    writeln!(out, "_Generated {}_\n", generated_at())?;
    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Documents**: {}", summary.total)?;
    writeln!(out, "- **Passed**: {}", summary.passed)?;
    writeln!(out, "- **Failed**: {}", summary.failed)?;
    writeln!(out, "- **Schema issues**: {}", summary.issues)?;
    writeln!(out, "- **Success rate**: {:.1}%\n", summary.success_rate())?;

    if results.is_empty() {
        writeln!(out, "_No documents checked._")?;
        return Ok(());
    }

    writeln!(out, "## Documents\n")?;
    writeln!(out, "| Document | Kind | Result | Scenes | Zones | Labels | Max score |")?;
    writeln!(out, "|---|---|---|---|---|---|---|")?;
    for result in results {
        writeln!(
            out,
            "| `{}` | {} | {} | {} | {} | {} | {} |",
            result.document,
            result.kind.map_or("unreadable", |kind| kind.label()),
            if result.passed { "✅" } else { "❌" },
            result.scenes,
            result.zones,
            result.labels,
            result.max_score
        )?;
    }
    writeln!(out)?;

    for result in results.iter().filter(|r| !r.issues.is_empty() || !r.failures.is_empty()) {
        writeln!(out, "### {}\n", result.document)?;
        for issue in &result.issues {
            writeln!(out, "- issue `{}`: {}", issue.path, issue.message)?;
        }
        for failure in &result.failures {
            writeln!(out, "- failure: {failure}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::DocumentKind;
    use blueprint_core::ValidationIssue;

    fn sample(passed: bool) -> DocumentResult {
        DocumentResult {
            document: "scenes/heart.json".to_string(),
            kind: Some(DocumentKind::Scene),
            passed,
            scenes: 1,
            zones: 3,
            labels: 3,
            synthesized_zones: 1,
            renamed_ids: 0,
            max_score: 30,
            issues: vec![ValidationIssue {
                path: "labels[1].correctZoneId".to_string(),
                message: "empty reference".to_string(),
            }],
            failures: if passed {
                Vec::new()
            } else {
                vec!["duplicate zone id 'z1'".to_string()]
            },
            duration_ms: 1.5,
        }
    }

    fn render(f: impl Fn(&mut dyn Write) -> Result<()>) -> String {
        let mut buffer = Vec::new();
        f(&mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn console_report_lists_documents() {
        let results = [sample(true), sample(false)];
        let text = render(|out| generate_console_report(out, &results, Duration::from_millis(3)));
        assert!(text.contains("Blueprint Check Summary"));
        assert!(text.contains("Success rate: 50.0%"));
        assert!(text.contains("scenes/heart.json"));
        assert!(text.contains("duplicate zone id 'z1'"));
    }

    #[test]
    fn json_report_is_parseable() {
        let results = [sample(false)];
        let text = render(|out| generate_json_report(out, &results));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["failed"], 1);
        assert_eq!(value["documents"][0]["kind"], "scene");
        assert_eq!(value["documents"][0]["issues"][0]["path"], "labels[1].correctZoneId");
    }

    #[test]
    fn markdown_report_tables_results() {
        let text = render(|out| generate_markdown_report(out, &[sample(true)]));
        assert!(text.starts_with("# Blueprint Check Results"));
        assert!(text.contains("| `scenes/heart.json` | scene | ✅ | 1 | 3 | 3 | 30 |"));
        assert!(text.contains("- issue `labels[1].correctZoneId`: empty reference"));

        let empty = render(|out| generate_markdown_report(out, &[]));
        assert!(empty.contains("_No documents checked._"));
    }
}
