//! Whitespace and layout checks that apply to the file as plain text.

use crate::checker::prefix;
use crate::parser::{Line, SpecFile, SECTION_CHANGELOG, SECTION_DESCRIPTION, SECTION_FILES};
use crate::report::{Alert, Severity};

// Placeholder glyph used to make removed trailing spaces visible in output.
const SPACE_MARK: &str = "░";

/// Blank lines made of spaces and trailing spaces at the end of a line.
pub fn check_useless_spaces(id: &str, spec: &SpecFile) -> Vec<Alert> {
    if spec.data.is_empty() {
        return Vec::new();
    }

    let mut result = Vec::new();

    for line in &spec.data {
        if !line.text.contains(' ') {
            continue;
        }

        if line.text.trim().is_empty() {
            let marked = Line::new(line.index, line.text.replace(' ', SPACE_MARK), line.ignored);
            result.push(Alert::new(
                id,
                Severity::Notice,
                "Line contains useless spaces",
                marked,
            ));
        } else if line.text.trim_end_matches(' ') != line.text {
            let clean = line.text.trim_end_matches(' ');
            let spaces = line.text.len() - clean.len();
            let marked = Line::new(
                line.index,
                format!("{clean}{}", SPACE_MARK.repeat(spaces)),
                line.ignored,
            );
            result.push(Alert::new(
                id,
                Severity::Notice,
                "Line contains spaces at the end of line",
                marked,
            ));
        }
    }

    result
}

/// 80-symbol limit for %description and %changelog text.
pub fn check_line_length(id: &str, spec: &SpecFile) -> Vec<Alert> {
    if spec.data.is_empty() {
        return Vec::new();
    }

    let mut result = Vec::new();

    for section in spec.get_sections(&[SECTION_DESCRIPTION, SECTION_CHANGELOG]) {
        for line in &section.data {
            if section.name == SECTION_CHANGELOG && prefix(line, "* ") {
                continue;
            }

            // A long unbreakable token (an URL for example) can't be wrapped
            let tail: String = line.text.chars().skip(2).collect();

            if !tail.contains(' ') {
                continue;
            }

            if line.text.chars().count() > 80 {
                result.push(Alert::new(
                    id,
                    Severity::Warning,
                    "Line is longer than 80 symbols",
                    line.clone(),
                ));
            }
        }
    }

    result
}

/// Comment separators (`###...`) must be exactly 80 symbols long.
pub fn check_separator_length(id: &str, spec: &SpecFile) -> Vec<Alert> {
    if spec.data.is_empty() {
        return Vec::new();
    }

    let mut result = Vec::new();

    for line in &spec.data {
        if line.text.contains('#')
            && line.text.trim_matches('#').is_empty()
            && line.text.matches('#').count() != 80
        {
            result.push(Alert::new(
                id,
                Severity::Notice,
                "Separator must be 80 symbols long",
                line.clone(),
            ));
        }
    }

    result
}

/// Indentation in %files bodies.
pub fn check_files_indent(id: &str, spec: &SpecFile) -> Vec<Alert> {
    if spec.data.is_empty() {
        return Vec::new();
    }

    let mut result = Vec::new();

    for section in spec.get_sections(&[SECTION_FILES]) {
        for line in &section.data {
            if line.text.starts_with(' ') || line.text.starts_with('\t') {
                result.push(Alert::new(
                    id,
                    Severity::Notice,
                    "Don't use indent in %files section",
                    line.clone(),
                ));
            }
        }
    }

    result
}

/// Exactly one blank line at the end of the file.
pub fn check_trailing_blank_lines(id: &str, spec: &SpecFile) -> Vec<Alert> {
    if spec.data.is_empty() {
        return Vec::new();
    }

    let last = &spec.data[spec.data.len() - 1];

    if !last.text.is_empty() {
        return vec![Alert::new(
            id,
            Severity::Notice,
            "Spec file should have empty line at the end",
            Line::none(),
        )];
    }

    let mut empty_lines = 0;

    for line in spec.data.iter().skip(1).rev() {
        if line.text.is_empty() {
            empty_lines += 1;
            continue;
        }

        if empty_lines > 1 {
            return vec![Alert::new(
                id,
                Severity::Notice,
                "Too much empty lines at the end of the spec",
                Line::none(),
            )];
        }

        break;
    }

    Vec::new()
}
