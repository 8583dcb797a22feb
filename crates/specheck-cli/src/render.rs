use anyhow::Result;
use specheck_core::{Report, Severity};

/// Render the report as pretty JSON. Field names follow the report's
/// serialization contract.
pub fn to_json(report: &Report) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Render the report as XML with a `<report>` root element.
pub fn to_xml(report: &Report) -> Result<String> {
    let body = quick_xml::se::to_string_with_root("report", report)?;
    Ok(format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{body}"))
}

/// Emit GitHub workflow annotations for every active alert, one `::level`
/// command per finding. Ignored alerts are summarized but not annotated.
pub fn print_github(file: &str, report: &Report) {
    for severity in Severity::all() {
        for alert in report.bucket(severity) {
            if alert.ignored {
                continue;
            }

            let level = match severity {
                Severity::Notice => "notice",
                Severity::Warning => "warning",
                Severity::Error | Severity::Critical => "error",
            };

            if alert.line.index < 0 {
                println!("::{level} file={file}::[{}] {}", alert.id, alert.message);
            } else {
                println!(
                    "::{level} file={file},line={}::[{}] {}",
                    alert.line.index, alert.id, alert.message
                );
            }
        }
    }

    println!(
        "{} alerts found, {} ignored in {file}",
        report.total(),
        report.ignored()
    );
}
