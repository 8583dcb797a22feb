use colored::*;
use specheck_core::{Alert, Report, Severity};

/// Print a full check report to the terminal.
pub fn print_report(file: &str, report: &Report) {
    println!();
    println!("{}", format!(" Checking {file}").bold());
    println!();

    if report.is_perfect() && report.total() == 0 {
        println!(" {} This spec file looks perfect!", "OK".green().bold());
        println!();
        return;
    }

    for severity in Severity::all() {
        for alert in report.bucket(severity) {
            print_alert(alert);
        }
    }

    println!();
    println!(" {}", "-".repeat(60).dimmed());
    println!(
        " {} alerts found, {} ignored{}",
        report.total(),
        report.ignored(),
        if report.linting_disabled {
            " (linting disabled)".to_string()
        } else {
            String::new()
        }
    );
    println!();
}

/// Print a message about a check skipped by the target gate.
pub fn print_skipped(file: &str) {
    println!(
        " {} {file} check skipped due to non-applicable target",
        "--".dimmed()
    );
}

/// Print a file-level error (missing file, not a spec, ...).
pub fn print_file_error(message: &str) {
    eprintln!(" {} {message}", "ERROR".red().bold());
}

fn print_alert(alert: &Alert) {
    let label = severity_label(alert.severity);

    let location = if alert.line.index < 0 {
        "global".dimmed().to_string()
    } else {
        format!("line {}", alert.line.index).dimmed().to_string()
    };

    if alert.ignored {
        println!(
            " {} {} [{}] {} {}",
            label,
            location,
            alert.id.dimmed(),
            alert.message.dimmed(),
            "(ignored)".dimmed()
        );
    } else {
        println!(" {} {} [{}] {}", label, location, alert.id.dimmed(), alert.message);
    }

    if alert.line.index >= 0 && !alert.line.text.is_empty() && !alert.ignored {
        println!("   {} {}", "|".dimmed(), alert.line.text.dimmed());
    }
}

fn severity_label(severity: Severity) -> ColoredString {
    match severity {
        Severity::Notice => "NOTICE ".blue().bold(),
        Severity::Warning => "WARNING".yellow().bold(),
        Severity::Error => "ERROR  ".red().bold(),
        Severity::Critical => "CRIT   ".on_red().white().bold(),
    }
}
