//! Checks over package metadata: header tags, summaries, sources, and the
//! changelog.

use crate::checker::probe::HttpsProber;
use crate::checker::{contains_macro, contains_tag, is_comment, prefix, suffix};
use crate::parser::{Line, SpecFile, SECTION_CHANGELOG, SECTION_FILES};
use crate::report::{Alert, Severity};

/// Release tag without a `%{?dist}` (or rpmautospec `autorelease`) macro.
pub fn check_dist_macro(id: &str, spec: &SpecFile) -> Vec<Alert> {
    if spec.data.is_empty() {
        return Vec::new();
    }

    let mut result = Vec::new();

    for header in spec.get_headers() {
        for line in &header.data {
            if is_comment(line) || !prefix(line, "Release:") {
                continue;
            }

            if !contains_macro(line, "autorelease") && !contains_macro(line, "dist") {
                result.push(Alert::new(
                    id,
                    Severity::Error,
                    "Release tag must contains %{?dist} as part of release",
                    line.clone(),
                ));
            }
        }
    }

    result
}

/// Changelog record headers must read `* <date> <author> - <version-release>`.
pub fn check_changelog_headers(id: &str, spec: &SpecFile) -> Vec<Alert> {
    if spec.data.is_empty() {
        return Vec::new();
    }

    let mut result = Vec::new();

    for section in spec.get_sections(&[SECTION_CHANGELOG]) {
        for line in &section.data {
            if is_comment(line) || !prefix(line, "* ") {
                continue;
            }

            match line.text.find(" - ") {
                None => {
                    result.push(Alert::new(
                        id,
                        Severity::Warning,
                        "Misformatted changelog record header",
                        line.clone(),
                    ));
                }
                Some(separator) => {
                    if !line.text[separator + 3..].contains('-') {
                        result.push(Alert::new(
                            id,
                            Severity::Warning,
                            "Changelog record header must contain release",
                            line.clone(),
                        ));
                    }
                }
            }
        }
    }

    result
}

/// The main package needs an URL tag; every package needs a Group tag.
pub fn check_header_tags(id: &str, spec: &SpecFile) -> Vec<Alert> {
    if spec.data.is_empty() {
        return Vec::new();
    }

    let mut result = Vec::new();

    for header in spec.get_headers() {
        if header.package.is_empty() && !contains_tag(&header.data, "URL:") {
            result.push(Alert::new(
                id,
                Severity::Error,
                "Main package must contain URL tag",
                Line::none(),
            ));
        }

        if !contains_tag(&header.data, "Group:") {
            let message = if header.package.is_empty() {
                "Main package must contain Group tag".to_string()
            } else {
                format!("Package {} must contain Group tag", header.package)
            };

            result.push(Alert::new(id, Severity::Warning, message, Line::none()));
        }
    }

    result
}

/// Unescaped `%` in changelog entries, where rpm still expands macros.
pub fn check_unescaped_percent(id: &str, spec: &SpecFile) -> Vec<Alert> {
    if spec.data.is_empty() {
        return Vec::new();
    }

    let mut result = Vec::new();

    for section in spec.get_sections(&[SECTION_CHANGELOG]) {
        for line in &section.data {
            if contains_macro(line, "autochangelog") {
                continue;
            }

            for word in line.text.split_whitespace() {
                if word.starts_with('%') && !word.starts_with("%%") {
                    result.push(Alert::new(
                        id,
                        Severity::Error,
                        "Symbol % must be escaped by another % (i.e % → %%)",
                        line.clone(),
                    ));
                }
            }
        }
    }

    result
}

/// Every %files section needs a %defattr line.
pub fn check_defattr(id: &str, spec: &SpecFile) -> Vec<Alert> {
    if spec.data.is_empty() {
        return Vec::new();
    }

    let mut result = Vec::new();

    for section in spec.get_sections(&[SECTION_FILES]) {
        if section.data.iter().any(|line| prefix(line, "%defattr")) {
            continue;
        }

        let message = match section.package_name() {
            "" => "%files section must contains %defattr macro".to_string(),
            name => format!("%files section for package {name} must contains %defattr macro"),
        };

        result.push(Alert::new(id, Severity::Error, message, Line::none()));
    }

    result
}

/// `http://` Source and URL entries whose domain already answers HTTPS.
pub fn check_http_sources(id: &str, spec: &SpecFile, prober: &dyn HttpsProber) -> Vec<Alert> {
    if spec.data.is_empty() {
        return Vec::new();
    }

    let mut result = Vec::new();
    let mut urls = spec.get_sources();

    for header in spec.get_headers() {
        for line in &header.data {
            if prefix(line, "URL:") {
                urls.push(line.clone());
            }
        }
    }

    for line in urls {
        let text = line.text.trim_start_matches([' ', '\t']);
        let url = text.split_whitespace().nth(1).unwrap_or("");

        if !url.starts_with("http://") {
            continue;
        }

        let domain = extract_domain(url);

        if domain.is_empty() {
            continue;
        }

        if prober.supports_https(domain) {
            result.push(Alert::new(
                id,
                Severity::Warning,
                format!("Domain {domain} supports HTTPS. Replace http by https in URL."),
                line.clone(),
            ));
        }
    }

    result
}

/// Trailing dot in the Summary tag.
pub fn check_summary_dot(id: &str, spec: &SpecFile) -> Vec<Alert> {
    if spec.data.is_empty() {
        return Vec::new();
    }

    let mut result = Vec::new();

    for header in spec.get_headers() {
        for line in &header.data {
            if is_comment(line) {
                continue;
            }

            if prefix(line, "Summary:") && suffix(line, ".") {
                result.push(Alert::new(
                    id,
                    Severity::Warning,
                    "The summary contains useless dot at the end",
                    line.clone(),
                ));
            }
        }
    }

    result
}

/// Summary text longer than 80 symbols.
pub fn check_summary_length(id: &str, spec: &SpecFile) -> Vec<Alert> {
    if spec.data.is_empty() {
        return Vec::new();
    }

    let mut result = Vec::new();

    for header in spec.get_headers() {
        for line in &header.data {
            if is_comment(line) || !prefix(line, "Summary:") {
                continue;
            }

            let summary = line.text.strip_prefix("Summary:").unwrap_or(&line.text).trim();

            if summary.chars().count() > 80 {
                result.push(Alert::new(
                    id,
                    Severity::Warning,
                    "Summary should be shorter than 80 symbols",
                    line.clone(),
                ));
            }
        }
    }

    result
}

// "http://kaos.st/magic.tar.gz" -> "kaos.st"
fn extract_domain(url: &str) -> &str {
    let stripped = url.trim_start_matches("http://");
    stripped.split('/').next().unwrap_or("")
}
