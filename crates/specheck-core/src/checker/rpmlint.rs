use crate::parser::SpecFile;
use crate::report::{Alert, Severity};
use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::time::Duration;

/// ID carried by every alert sourced from the external linter.
pub const RPMLINT_CHECK_ID: &str = "LNT0";

const RPMLINT_BIN: &str = "rpmlint";

/// Run the external linter against the spec file and convert its output.
/// Lint is best effort: a missing binary, a failed run, a timeout, or
/// unparseable output all degrade to "no additional alerts".
pub fn lint(spec: &SpecFile, config: Option<&str>, timeout: Duration) -> Vec<Alert> {
    lint_with(RPMLINT_BIN, spec, config, timeout)
}

fn lint_with(bin: &str, spec: &SpecFile, config: Option<&str>, timeout: Duration) -> Vec<Alert> {
    let output = match run_linter(bin, spec, config, timeout) {
        Some(output) => output,
        None => return Vec::new(),
    };

    if output.len() < 2 {
        return Vec::new();
    }

    parse_output(&output, spec)
}

// Captures the whole stdout of the linter, killing the child if it exceeds
// the timeout. Reading to EOF on a separate thread keeps the wait bounded
// without any partial-output handling.
fn run_linter(bin: &str, spec: &SpecFile, config: Option<&str>, timeout: Duration) -> Option<String> {
    let mut cmd = Command::new(bin);

    if let Some(config) = config {
        cmd.args(["-f", config]);
    }

    let mut child = cmd
        .arg(&spec.file)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .ok()?;

    let mut stdout = child.stdout.take()?;
    let (tx, rx) = mpsc::channel();

    std::thread::spawn(move || {
        let mut buffer = String::new();
        stdout.read_to_string(&mut buffer).ok();
        let _ = tx.send(buffer);
    });

    match rx.recv_timeout(timeout) {
        Ok(output) => {
            child.wait().ok();
            Some(output)
        }
        Err(_) => {
            child.kill().ok();
            child.wait().ok();
            None
        }
    }
}

fn parse_output(output: &str, spec: &SpecFile) -> Vec<Alert> {
    output
        .split('\n')
        .filter_map(|line| parse_alert_line(line, spec))
        .collect()
}

// One output line carries `file: LEVEL message`, `file:LINE: LEVEL message`,
// or the wrapped specfile-error forms. Level W escalates to Error and E to
// Critical on purpose: the linter only reports things worth failing over.
fn parse_alert_line(text: &str, spec: &SpecFile) -> Option<Alert> {
    let (index, mut level, mut message) = extract_alert_data(text)?;

    if message.contains("specfile-error warning") {
        level = "W".to_string();
        message = message.replace("specfile-error warning: ", "");
    }

    match level.as_str() {
        "W" => Some(Alert::new(
            RPMLINT_CHECK_ID,
            Severity::Error,
            message,
            spec.get_line(index),
        )),
        "E" => Some(Alert::new(
            RPMLINT_CHECK_ID,
            Severity::Critical,
            message,
            spec.get_line(index),
        )),
        _ => None,
    }
}

fn extract_alert_data(text: &str) -> Option<(i32, String, String)> {
    if text.matches(':').count() < 2 {
        return None;
    }

    let fields: Vec<&str> = text.split(':').collect();

    // Error form with the line number embedded in the message itself
    if text.contains("specfile-error error: line ") && fields.len() > 4 {
        let index = fields[3]
            .trim_matches(['l', 'i', 'n', 'e', ' '])
            .parse::<i32>()
            .ok()?;

        return Some((index, "E".to_string(), fields[4..].join(":").trim().to_string()));
    }

    // Level without a line number
    if fields[1].starts_with(' ') {
        return Some((
            -1,
            fields[1].trim().to_string(),
            fields[2..].join(":").trim().to_string(),
        ));
    }

    // Level with a line number
    let level = fields[2].trim().to_string();
    let index = fields[1].parse::<i32>().ok()?;

    Some((index, level, fields[3..].join(":").trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC: &str = "\
Name:           magic
Version:        1.0.0
Release:        1%{?dist}
Summary:        Magic tool
License:        MIT
URL:            https://example.org
Source0:        https://example.org/magic.tar.gz

%description
Magic.

%install
%{make_install}

%files
%{_bindir}/magic

%changelog
* Thu Aug 15 2024 John Doe <john@example.org> - 1.0.0-1
- Initial build
";

    fn spec() -> SpecFile {
        SpecFile::parse(SPEC, "test.spec").unwrap()
    }

    #[test]
    fn test_parse_global_warning() {
        let alert = parse_alert_line("test.spec: W: no-buildroot-tag", &spec()).unwrap();

        assert_eq!(alert.id, RPMLINT_CHECK_ID);
        assert_eq!(alert.severity, Severity::Error);
        assert_eq!(alert.message, "no-buildroot-tag");
        assert_eq!(alert.line.index, -1);
    }

    #[test]
    fn test_parse_embedded_line_error() {
        let alert = parse_alert_line(
            "test.spec: E: specfile-error error: line 3: Unknown tag: Release1",
            &spec(),
        )
        .unwrap();

        assert_eq!(alert.severity, Severity::Critical);
        assert_eq!(alert.message, "Unknown tag: Release1");
        assert_eq!(alert.line.index, 3);
    }

    #[test]
    fn test_parse_line_specific_warning() {
        let alert =
            parse_alert_line("test.spec:7: W: macro-in-%changelog %record", &spec()).unwrap();

        assert_eq!(alert.severity, Severity::Error);
        assert_eq!(alert.message, "macro-in-%changelog %record");
        assert_eq!(alert.line.index, 7);
    }

    #[test]
    fn test_parse_demoted_specfile_warning() {
        let alert = parse_alert_line(
            "test.spec: E: specfile-error warning: some error",
            &spec(),
        )
        .unwrap();

        assert_eq!(alert.severity, Severity::Error);
        assert_eq!(alert.message, "some error");
    }

    #[test]
    fn test_unparseable_lines_are_dropped() {
        let s = spec();

        assert!(parse_alert_line("", &s).is_none());
        assert!(parse_alert_line("no colons here", &s).is_none());
        assert!(parse_alert_line("test.spec:A: W: broken index", &s).is_none());
        assert!(parse_alert_line(
            "test.spec: E: specfile-error error: line A: broken index",
            &s
        )
        .is_none());
        assert!(parse_alert_line("test.spec:7: X: unknown level", &s).is_none());
    }

    #[test]
    fn test_missing_binary_produces_no_alerts() {
        let alerts = lint_with(
            "__specheck_missing_linter__",
            &spec(),
            None,
            Duration::from_secs(5),
        );

        assert!(alerts.is_empty());
    }

    #[test]
    fn test_unparseable_tool_output_produces_no_alerts() {
        // `echo` prints the arguments back, which never match the grammar
        let alerts = lint_with("echo", &spec(), Some("lint.conf"), Duration::from_secs(5));

        assert!(alerts.is_empty());
    }

    #[test]
    fn test_timeout_degrades_to_no_alerts() {
        let slow = SpecFile {
            file: "30".to_string(),
            ..SpecFile::default()
        };

        let alerts = lint_with("sleep", &slow, None, Duration::from_millis(50));

        assert!(alerts.is_empty());
    }
}
