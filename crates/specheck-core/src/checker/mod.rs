//! Rule registry and the check engine that turns a parsed spec file into a
//! severity-bucketed report.

pub mod probe;
pub mod rpmlint;
pub mod rules;
pub mod target;

use crate::parser::{Line, Section, SpecFile};
use crate::report::{Alert, Report, Severity};
use probe::HttpsProber;
use regex::Regex;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use target::OsInfo;

/// A single rule: pure function from the parsed document to findings.
pub type CheckFn = Box<dyn Fn(&str, &SpecFile) -> Vec<Alert> + Send + Sync>;

/// Explicitly constructed set of checks, iterated in registration order so
/// every run over the same registry is deterministic. IDs are a stable
/// external contract: callers disable checks by ID, so existing IDs are
/// never renumbered, only appended.
pub struct Registry {
    checks: Vec<(&'static str, CheckFn)>,
}

impl Registry {
    /// The standard rule set. The HTTPS prober is injected so the
    /// network-touching check stays testable.
    pub fn standard(prober: Arc<dyn HttpsProber>) -> Registry {
        let mut registry = Registry { checks: Vec::new() };

        registry.register("PF1", Box::new(rules::hygiene::check_useless_spaces));
        registry.register("PF2", Box::new(rules::hygiene::check_line_length));
        registry.register("PF3", Box::new(rules::tags::check_dist_macro));
        registry.register("PF4", Box::new(rules::macros::check_path_macros));
        registry.register("PF5", Box::new(rules::macros::check_variables));
        registry.register("PF6", Box::new(rules::scripts::check_dev_null));
        registry.register("PF7", Box::new(rules::tags::check_changelog_headers));
        registry.register("PF8", Box::new(rules::macros::check_make_macro));
        registry.register("PF9", Box::new(rules::tags::check_header_tags));
        registry.register("PF10", Box::new(rules::tags::check_unescaped_percent));
        registry.register(
            "PF11",
            Box::new(rules::macros::check_macro_definition_position),
        );
        registry.register("PF12", Box::new(rules::hygiene::check_separator_length));
        registry.register("PF13", Box::new(rules::tags::check_defattr));
        registry.register("PF14", Box::new(rules::macros::check_binary_macros));
        registry.register("PF15", Box::new(rules::scripts::check_empty_sections));
        registry.register("PF16", Box::new(rules::hygiene::check_files_indent));
        registry.register("PF17", Box::new(rules::macros::check_setup_options));
        registry.register("PF18", Box::new(rules::hygiene::check_trailing_blank_lines));
        registry.register("PF19", Box::new(rules::scripts::check_bash_loops));
        registry.register(
            "PF20",
            Box::new(move |id: &str, spec: &SpecFile| {
                rules::tags::check_http_sources(id, spec, prober.as_ref())
            }),
        );
        registry.register("PF21", Box::new(rules::macros::check_test_macros));
        registry.register("PF22", Box::new(rules::macros::check_if_clause));
        registry.register("PF23", Box::new(rules::macros::check_buildroot_slash));
        registry.register("PF24", Box::new(rules::scripts::check_empty_if));
        registry.register("PF25", Box::new(rules::tags::check_summary_dot));
        registry.register("PF26", Box::new(rules::scripts::check_chown_chmod));
        registry.register("PF27", Box::new(rules::scripts::check_unclosed_conditions));
        registry.register("PF28", Box::new(rules::tags::check_summary_length));

        registry
    }

    pub fn register(&mut self, id: &'static str, check: CheckFn) {
        self.checks.push((id, check));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &CheckFn)> {
        self.checks.iter().map(|(id, check)| (*id, check))
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.checks.iter().map(|(id, _)| *id).collect()
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

/// Knobs for one engine run.
#[derive(Debug, Clone)]
pub struct CheckOptions {
    /// Run the external linter and merge its alerts.
    pub lint: bool,
    /// Config file handed to the external linter via `-f`.
    pub linter_config: Option<String>,
    /// Check IDs whose alerts are kept but marked ignored.
    pub ignored: Vec<String>,
    /// Upper bound for the external linter subprocess.
    pub linter_timeout: Duration,
}

impl Default for CheckOptions {
    fn default() -> CheckOptions {
        CheckOptions {
            lint: true,
            linter_config: None,
            ignored: Vec::new(),
            linter_timeout: Duration::from_secs(60),
        }
    }
}

/// Check a spec file against every registered rule plus the external linter,
/// using the detected host identity for the target gate.
pub fn check(spec: &SpecFile, registry: &Registry, options: &CheckOptions) -> Report {
    check_with_os(spec, registry, options, OsInfo::detect())
}

/// Same as [`check`], with an explicit host identity (`None` = unknown host,
/// which fails the target gate closed).
pub fn check_with_os(
    spec: &SpecFile,
    registry: &Registry,
    options: &CheckOptions,
    os: Option<OsInfo>,
) -> Report {
    if !target::is_applicable(spec, os.as_ref()) {
        return Report::skipped();
    }

    let mut report = Report {
        ignored_checks: options.ignored.clone(),
        linting_disabled: !options.lint,
        ..Report::default()
    };

    if options.lint && !is_ignored(options, rpmlint::RPMLINT_CHECK_ID) {
        for alert in rpmlint::lint(spec, options.linter_config.as_deref(), options.linter_timeout)
        {
            // The adapter only ever produces these two severities
            if matches!(alert.severity, Severity::Error | Severity::Critical) {
                report.push(alert);
            }
        }
    }

    for (id, check) in registry.iter() {
        let suppressed = is_ignored(options, id);

        for mut alert in check(id, spec) {
            if suppressed || alert.line.ignored {
                alert.ignored = true;
            }

            report.push(alert);
        }
    }

    report.sort();
    report
}

fn is_ignored(options: &CheckOptions, id: &str) -> bool {
    options.ignored.iter().any(|ignored| ignored == id)
}

fn macro_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"%\{?\??([a-zA-Z0-9_?:]+)\}?").expect("invalid macro pattern"))
}

// Line-matching helpers shared by the rule modules. Prefix and suffix checks
// look past leading indentation on purpose.

pub(crate) fn prefix(line: &Line, value: &str) -> bool {
    line.text.trim_start_matches([' ', '\t']).starts_with(value)
}

pub(crate) fn suffix(line: &Line, value: &str) -> bool {
    line.text.trim_start_matches([' ', '\t']).ends_with(value)
}

pub(crate) fn contains(line: &Line, value: &str) -> bool {
    line.text.contains(value)
}

pub(crate) fn contains_macro(line: &Line, name: &str) -> bool {
    macro_regex()
        .captures_iter(&line.text)
        .any(|found| &found[1] == name)
}

pub(crate) fn contains_field(line: &Line, value: &str) -> bool {
    line.text.split_whitespace().any(|field| field == value)
}

pub(crate) fn is_comment(line: &Line) -> bool {
    prefix(line, "#")
}

pub(crate) fn is_empty_data(data: &[Line]) -> bool {
    data.iter().all(|line| line.text.replace(' ', "").is_empty())
}

pub(crate) fn contains_args(section: &Section, args: &[&str]) -> bool {
    args.iter()
        .all(|arg| section.args.iter().any(|have| have == arg))
}

pub(crate) fn contains_tag(data: &[Line], tag: &str) -> bool {
    data.iter().any(|line| prefix(line, tag))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NeverHttps;

    impl HttpsProber for NeverHttps {
        fn supports_https(&self, _domain: &str) -> bool {
            false
        }
    }

    fn alma() -> OsInfo {
        OsInfo {
            id: "almalinux".to_string(),
            version_id: "8.8".to_string(),
            platform_id: "platform:el8".to_string(),
            id_like: "rhel centos fedora".to_string(),
        }
    }

    fn no_lint() -> CheckOptions {
        CheckOptions {
            lint: false,
            ..CheckOptions::default()
        }
    }

    fn parse(content: &str) -> SpecFile {
        SpecFile::parse(content, "test.spec").unwrap()
    }

    const FIXTURE: &str = "\
Name:           magic
Version:        1.0.0
Release:        1%{nothing}
Summary:        Magic tool
License:        MIT
URL:            https://example.org
Group:          Applications/System
Source0:        https://example.org/magic-%{version}.tar.gz

%description
Magic tool for magic things.

%install
%{make_install}
# specheck:ignore 1
cp magic.conf /etc/magic.conf

%files
%defattr(-,root,root,-)
%{_bindir}/magic

%changelog
* Thu Aug 15 2024 John Doe <john@example.org> - 1.0.0-1
- Initial build
";

    #[test]
    fn test_standard_registry() {
        let registry = Registry::standard(Arc::new(NeverHttps));

        assert_eq!(registry.len(), 28);
        assert!(!registry.is_empty());
        assert_eq!(registry.ids().first(), Some(&"PF1"));
        assert_eq!(registry.ids().last(), Some(&"PF28"));
    }

    #[test]
    fn test_missing_dist_macro_is_reported() {
        let registry = Registry::standard(Arc::new(NeverHttps));
        let spec = parse(FIXTURE);
        let report = check_with_os(&spec, &registry, &no_lint(), Some(alma()));

        let dist: Vec<&crate::report::Alert> =
            report.errors.iter().filter(|a| a.id == "PF3").collect();

        assert_eq!(dist.len(), 1);
        assert_eq!(dist[0].line.index, 3);
        assert!(!dist[0].ignored);
        assert!(!report.is_perfect());
    }

    #[test]
    fn test_line_directive_suppresses_alert() {
        let registry = Registry::standard(Arc::new(NeverHttps));
        let spec = parse(FIXTURE);
        let report = check_with_os(&spec, &registry, &no_lint(), Some(alma()));

        // The /etc path warning sits inside the ignore-directive range
        let path = report
            .warnings
            .iter()
            .find(|a| a.id == "PF4")
            .expect("path macro alert must be present");

        assert!(path.ignored);
        assert!(path.line.ignored);
    }

    #[test]
    fn test_id_suppression_keeps_alerts_in_report() {
        let registry = Registry::standard(Arc::new(NeverHttps));
        let spec = parse(FIXTURE);

        let mut options = no_lint();
        options.ignored.push("PF3".to_string());

        let report = check_with_os(&spec, &registry, &options, Some(alma()));
        let dist = report.errors.iter().find(|a| a.id == "PF3").unwrap();

        assert!(dist.ignored);
        assert_eq!(report.ignored_checks, vec!["PF3"]);

        // Suppression is additive: totals include the ignored alerts
        let active: usize = Severity::all()
            .iter()
            .map(|&severity| {
                report
                    .bucket(severity)
                    .iter()
                    .filter(|a| !a.ignored)
                    .count()
            })
            .sum();

        assert!(report.total() > 0);
        assert_eq!(report.total(), report.ignored() + active);
    }

    #[test]
    fn test_buckets_are_sorted_by_line() {
        let registry = Registry::standard(Arc::new(NeverHttps));
        let spec = parse(FIXTURE);
        let report = check_with_os(&spec, &registry, &no_lint(), Some(alma()));

        for severity in Severity::all() {
            let indices: Vec<i32> = report
                .bucket(severity)
                .iter()
                .map(|a| a.line.index)
                .collect();
            let mut sorted = indices.clone();
            sorted.sort();

            assert_eq!(indices, sorted, "{severity:?} bucket must be sorted");
        }
    }

    #[test]
    fn test_determinism() {
        let registry = Registry::standard(Arc::new(NeverHttps));
        let spec = parse(FIXTURE);

        let first = check_with_os(&spec, &registry, &no_lint(), Some(alma()));
        let second = check_with_os(&spec, &registry, &no_lint(), Some(alma()));

        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_non_applicable_target_skips_everything() {
        let registry = Registry::standard(Arc::new(NeverHttps));
        let content = format!("# specheck:target mysuppaos\n{FIXTURE}");
        let spec = parse(&content);

        // Unknown host: the gate fails closed
        let report = check_with_os(&spec, &registry, &no_lint(), None);

        assert!(report.is_skipped);
        assert_eq!(report.total(), 0);

        // Known host that doesn't match the declared target
        let report = check_with_os(&spec, &registry, &no_lint(), Some(alma()));

        assert!(report.is_skipped);
    }

    #[test]
    fn test_matching_target_runs_checks() {
        let registry = Registry::standard(Arc::new(NeverHttps));
        let content = format!("# specheck:target el8\n{FIXTURE}");
        let spec = parse(&content);
        let report = check_with_os(&spec, &registry, &no_lint(), Some(alma()));

        assert!(!report.is_skipped);
        assert!(report.total() > 0);
    }

    #[test]
    fn test_linting_disabled_is_recorded() {
        let registry = Registry::standard(Arc::new(NeverHttps));
        let spec = parse(FIXTURE);
        let report = check_with_os(&spec, &registry, &no_lint(), Some(alma()));

        assert!(report.linting_disabled);
    }

    #[test]
    fn test_custom_registry_is_substitutable() {
        let mut registry = Registry {
            checks: Vec::new(),
        };

        registry.register(
            "T1",
            Box::new(|id: &str, spec: &SpecFile| {
                vec![Alert::new(
                    id,
                    Severity::Notice,
                    "always fires",
                    spec.get_line(1),
                )]
            }),
        );

        let spec = parse(FIXTURE);
        let report = check_with_os(&spec, &registry, &no_lint(), Some(alma()));

        assert_eq!(report.notices.len(), 1);
        assert_eq!(report.notices[0].id, "T1");
    }

    #[test]
    fn test_helpers() {
        let line = Line::new(1, "  %setup -q", false);

        assert!(prefix(&line, "%setup"));
        assert!(suffix(&line, "-q"));
        assert!(contains(&line, "setup"));
        assert!(contains_field(&line, "-q"));
        assert!(!contains_field(&line, "q"));
        assert!(!is_comment(&line));
        assert!(is_comment(&Line::new(1, "  # note", false)));

        let release = Line::new(1, "Release: 1%{?dist}", false);
        assert!(contains_macro(&release, "dist"));
        assert!(!contains_macro(&release, "nothing"));

        assert!(is_empty_data(&[Line::new(1, "   ", false)]));
        assert!(!is_empty_data(&[Line::new(1, " x ", false)]));
    }
}
