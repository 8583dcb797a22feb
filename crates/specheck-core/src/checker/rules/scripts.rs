//! Checks over the shell fragments embedded in build and scriptlet sections.

use crate::checker::{contains, is_comment, is_empty_data, prefix, suffix};
use crate::parser::{
    Line, SpecFile, SECTION_BUILD, SECTION_CHECK, SECTION_INSTALL, SECTION_POST,
    SECTION_POSTTRANS, SECTION_POSTUN, SECTION_PRE, SECTION_PREP, SECTION_PRETRANS,
    SECTION_PREUN, SECTION_SETUP, SECTION_TRIGGERIN, SECTION_TRIGGERPOSTUN, SECTION_TRIGGERUN,
    SECTION_VERIFYSCRIPT,
};
use crate::report::{Alert, Severity};

/// Sections executed as install-time scriptlets.
const SCRIPTLET_SECTIONS: &[&str] = &[
    SECTION_POST,
    SECTION_POSTTRANS,
    SECTION_POSTUN,
    SECTION_PRE,
    SECTION_PREP,
    SECTION_PRETRANS,
    SECTION_PREUN,
    SECTION_TRIGGERIN,
    SECTION_TRIGGERPOSTUN,
    SECTION_TRIGGERUN,
];

/// Redirect spellings that collapse to `&>/dev/null`.
const DEV_NULL_VARIATIONS: &[&str] = &[
    ">/dev/null 2>&1",
    "2>&1 >/dev/null",
    ">/dev/null 2>/dev/null",
    "2>/dev/null >/dev/null",
];

/// Verbose /dev/null redirects and `|| exit 0` endings.
pub fn check_dev_null(id: &str, spec: &SpecFile) -> Vec<Alert> {
    if spec.data.is_empty() {
        return Vec::new();
    }

    let mut result = Vec::new();

    let sections = [
        SECTION_BUILD,
        SECTION_CHECK,
        SECTION_INSTALL,
        SECTION_POST,
        SECTION_POSTTRANS,
        SECTION_POSTUN,
        SECTION_PRE,
        SECTION_PREP,
        SECTION_PRETRANS,
        SECTION_PREUN,
        SECTION_SETUP,
        SECTION_TRIGGERPOSTUN,
        SECTION_TRIGGERUN,
        SECTION_VERIFYSCRIPT,
    ];

    for section in spec.get_sections(&sections) {
        for line in &section.data {
            let squashed = line.text.replace(' ', "");

            for variation in DEV_NULL_VARIATIONS {
                if squashed.contains(&variation.replace(' ', "")) {
                    result.push(Alert::new(
                        id,
                        Severity::Notice,
                        format!("Use \"&>/dev/null || :\" instead of \"{variation} || :\""),
                        line.clone(),
                    ));
                }
            }

            if contains(line, "|| exit 0") {
                result.push(Alert::new(
                    id,
                    Severity::Notice,
                    "Use \" || :\" instead of \" || exit 0\"",
                    line.clone(),
                ));
            }
        }
    }

    result
}

/// Argument-less scriptlet sections with nothing but whitespace inside.
pub fn check_empty_sections(id: &str, spec: &SpecFile) -> Vec<Alert> {
    if spec.data.is_empty() {
        return Vec::new();
    }

    let mut result = Vec::new();

    let sections = [
        SECTION_CHECK,
        SECTION_POST,
        SECTION_POSTTRANS,
        SECTION_POSTUN,
        SECTION_PRE,
        SECTION_PRETRANS,
        SECTION_PREUN,
        SECTION_TRIGGERPOSTUN,
        SECTION_TRIGGERUN,
        SECTION_VERIFYSCRIPT,
    ];

    for section in spec.get_sections(&sections) {
        if section.args.is_empty() && is_empty_data(&section.data) {
            result.push(Alert::new(
                id,
                Severity::Error,
                format!("Section %{} is empty", section.name),
                spec.get_line(section.start),
            ));
        }
    }

    result
}

/// `for`/`while` loops with a lone `do` on the following line.
pub fn check_bash_loops(id: &str, spec: &SpecFile) -> Vec<Alert> {
    if spec.data.is_empty() {
        return Vec::new();
    }

    let mut result = Vec::new();

    let sections = [
        SECTION_BUILD,
        SECTION_CHECK,
        SECTION_INSTALL,
        SECTION_POST,
        SECTION_POSTTRANS,
        SECTION_POSTUN,
        SECTION_PRE,
        SECTION_PREP,
        SECTION_PRETRANS,
        SECTION_PREUN,
        SECTION_SETUP,
        SECTION_TRIGGERIN,
        SECTION_TRIGGERPOSTUN,
        SECTION_TRIGGERUN,
        SECTION_VERIFYSCRIPT,
    ];

    for section in spec.get_sections(&sections) {
        for line in &section.data {
            if !prefix(line, "for") && !prefix(line, "while") {
                continue;
            }

            let next = spec.get_line(line.index + 1);

            if !suffix(&next, ";do") && next.text.trim_start_matches([' ', '\t']) == "do" {
                result.push(Alert::new(
                    id,
                    Severity::Notice,
                    "Place 'do' keyword on the same line with for/while (for ... ; do)",
                    line.clone(),
                ));
            }
        }
    }

    result
}

/// A shell `if` wrapping nothing but a macro conditional: the evaluated
/// clause can end up empty, so the nesting order should be inverted.
///
/// This is a deliberate flag heuristic, not a scope parser. It tracks one
/// open shell clause and one open macro conditional at a time and resets at
/// every `fi` and at every section boundary; deeply interleaved blocks are
/// out of scope.
pub fn check_empty_if(id: &str, spec: &SpecFile) -> Vec<Alert> {
    if spec.data.is_empty() {
        return Vec::new();
    }

    let mut result = Vec::new();

    let sections = [
        SECTION_BUILD,
        SECTION_CHECK,
        SECTION_INSTALL,
        SECTION_POST,
        SECTION_POSTTRANS,
        SECTION_POSTUN,
        SECTION_PRE,
        SECTION_PREP,
        SECTION_PRETRANS,
        SECTION_PREUN,
        SECTION_SETUP,
        SECTION_TRIGGERPOSTUN,
        SECTION_TRIGGERUN,
        SECTION_VERIFYSCRIPT,
    ];

    let mut clause_open = false;
    let mut macro_open = false;
    let mut has_content = false;
    let mut clause_line = Line::none();

    for section in spec.get_sections(&sections) {
        for line in &section.data {
            if is_comment(line) {
                continue;
            }

            if prefix(line, "if ") && !macro_open {
                clause_open = true;
                clause_line = line.clone();
                continue;
            }

            if prefix(line, "%else") {
                has_content = true;
                continue;
            }

            if prefix(line, "%if") {
                if !macro_open {
                    macro_open = true;
                } else {
                    has_content = true;
                }
            }

            if prefix(line, "%endif") && macro_open {
                macro_open = false;
                continue;
            }

            if !macro_open && clause_open && !prefix(line, "fi") {
                has_content = true;
            }

            if prefix(line, "fi") {
                if clause_open && !has_content {
                    result.push(Alert::new(
                        id,
                        Severity::Warning,
                        "Evaluated if clause can be empty. Change the order of clauses (i.e. %if → if instead of if → %if).",
                        clause_line.clone(),
                    ));
                }

                clause_open = false;
                macro_open = false;
                has_content = false;
            }
        }

        clause_open = false;
        macro_open = false;
        has_content = false;
    }

    result
}

/// Mode and ownership changes don't belong in scriptlets.
pub fn check_chown_chmod(id: &str, spec: &SpecFile) -> Vec<Alert> {
    if spec.data.is_empty() {
        return Vec::new();
    }

    let mut result = Vec::new();

    for section in spec.get_sections(SCRIPTLET_SECTIONS) {
        for line in &section.data {
            if is_comment(line) {
                continue;
            }

            if prefix(line, "chmod ") {
                result.push(Alert::new(
                    id,
                    Severity::Error,
                    "Do not change file or directory mode in scriptlets",
                    line.clone(),
                ));
            }

            if prefix(line, "chown ")
                && !contains(line, " -h ")
                && !contains(line, " --no-dereference ")
            {
                result.push(Alert::new(
                    id,
                    Severity::Error,
                    "Do not change file or directory owner without --no-dereference option",
                    line.clone(),
                ));
            }
        }
    }

    result
}

/// `if ...; then` conditions in scriptlets with no matching `fi`.
pub fn check_unclosed_conditions(id: &str, spec: &SpecFile) -> Vec<Alert> {
    if spec.data.is_empty() {
        return Vec::new();
    }

    let mut conditions: Vec<Line> = Vec::new();

    for section in spec.get_sections(SCRIPTLET_SECTIONS) {
        for line in &section.data {
            if is_comment(line) {
                continue;
            }

            if prefix(line, "if ")
                && contains(line, ";")
                && contains(line, "then")
                && !contains(line, " fi")
            {
                conditions.push(line.clone());
            }

            if prefix(line, "fi") && !conditions.is_empty() {
                conditions.pop();
            }
        }
    }

    conditions
        .into_iter()
        .map(|line| {
            Alert::new(
                id,
                Severity::Critical,
                "Scriptlet contains unclosed IF condition",
                line,
            )
        })
        .collect()
}
