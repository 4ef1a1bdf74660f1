//! End-of-run summary printing.

use cascade_engine::RunReport;
use colored::Colorize;

const RULE_WIDTH: usize = 60;

/// Print the execution summary: totals, per-category counts, and the failed
/// blocks with a preview of what went wrong.
pub fn print_summary(report: &RunReport) {
  let rule = "=".repeat(RULE_WIDTH);

  println!("\n{}", rule.cyan().bold());
  println!("{}", "EXECUTION SUMMARY".cyan().bold());
  println!("{}", rule.cyan().bold());

  println!("{}", format!("Blocks executed: {}", report.total()).cyan());
  println!("{}", format!("Successful: {}", report.succeeded()).green());

  let failed = format!("Failed: {}", report.failed());
  if report.failed() > 0 {
    println!("{}", failed.red());
  } else {
    println!("{}", failed.green());
  }
  println!(
    "{}",
    format!("Total duration: {:.2}s", report.total_duration_secs()).cyan()
  );

  if report.failed() > 0 {
    println!("\n{}", "Failed blocks:".red().bold());
    for result in report.failures() {
      let target = match &result.host {
        Some(host) => format!("  - {} ({})", result.name, host),
        None => format!("  - {}", result.name),
      };
      println!("{}", target.red());

      if let Some(preview) = error_preview(&result.error_output) {
        println!("{}", format!("    {preview}").red());
      }
    }
  }

  let verdict = if report.success {
    "Workflow succeeded".green().bold()
  } else {
    "Workflow failed".red().bold()
  };
  println!("\n{verdict}");
}

fn error_preview(error_output: &str) -> Option<String> {
  let line = error_output.lines().find(|l| !l.trim().is_empty())?;
  let mut preview: String = line.trim().chars().take(100).collect();
  if preview.len() < line.trim().len() {
    preview.push_str("...");
  }
  Some(preview)
}
