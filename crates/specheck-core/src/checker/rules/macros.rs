//! Checks that prefer RPM macros over literal paths, shell variables, and
//! plain tool invocations.

use crate::checker::{contains, contains_args, contains_field, is_comment, prefix};
use crate::parser::{
    SpecFile, SECTION_BUILD, SECTION_CHECK, SECTION_CLEAN, SECTION_FILES, SECTION_INSTALL,
    SECTION_PACKAGE, SECTION_POST, SECTION_POSTTRANS, SECTION_POSTUN, SECTION_PRE, SECTION_PREP,
    SECTION_PRETRANS, SECTION_PREUN, SECTION_SETUP, SECTION_TRIGGERIN, SECTION_TRIGGERPOSTUN,
    SECTION_TRIGGERUN, SECTION_VERIFYSCRIPT,
};
use crate::report::{Alert, Severity};
use regex::Regex;

pub(crate) struct PathMacro {
    pub path: &'static str,
    pub name: &'static str,
}

/// Literal paths with their macro equivalents, most specific first. The
/// order matters: `/etc/init` must win over `/etc`.
pub(crate) const PATH_MACROS: &[PathMacro] = &[
    PathMacro { path: "/etc/init", name: "%{_initddir}" },
    PathMacro { path: "/etc/rc.d/init.d", name: "%{_initddir}" },
    PathMacro { path: "/etc", name: "%{_sysconfdir}" },
    PathMacro { path: "/usr/bin", name: "%{_bindir}" },
    PathMacro { path: "/usr/include", name: "%{_includedir}" },
    PathMacro { path: "/usr/lib", name: "%{_libdir}" },
    PathMacro { path: "/usr/lib64", name: "%{_libdir}" },
    PathMacro { path: "/usr/libexec", name: "%{_libexecdir}" },
    PathMacro { path: "/usr/sbin", name: "%{_sbindir}" },
    PathMacro { path: "/usr/share/doc", name: "%{_defaultdocdir}" },
    PathMacro { path: "/usr/share/doc", name: "%{_docdir}" },
    PathMacro { path: "/usr/share/info", name: "%{_infodir}" },
    PathMacro { path: "/usr/share/java", name: "%{_javadir}" },
    PathMacro { path: "/usr/share/javadoc", name: "%{_javadocdir}" },
    PathMacro { path: "/usr/share/man", name: "%{_mandir}" },
    PathMacro { path: "/usr/share", name: "%{_datarootdir}" },
    PathMacro { path: "/usr/src", name: "%{_usrsrc}" },
    PathMacro { path: "/usr", name: "%{_usr}" },
    PathMacro { path: "/var/lib", name: "%{_sharedstatedir}" },
    PathMacro { path: "/var", name: "%{_var}" },
];

struct VariableMacro {
    variable: &'static str,
    message: &'static str,
}

// First match wins, one alert per line.
const VARIABLE_MACROS: &[VariableMacro] = &[
    VariableMacro {
        variable: "$RPM_BUILD_ROOT",
        message: "Build root path must be used as macro %{buildroot}",
    },
    VariableMacro {
        variable: "$RPM_OPT_FLAGS",
        message: "Optimization flags must be used as macro %{optflags}",
    },
    VariableMacro {
        variable: "$RPM_LD_FLAGS",
        message: "Linking flags must be used as macro %{build_ldflags}",
    },
    VariableMacro {
        variable: "$RPM_DOC_DIR",
        message: "Linking flags must be used as macro %{_docdir}",
    },
    VariableMacro {
        variable: "$RPM_SOURCE_DIR",
        message: "Path to source directory must be used as macro %{_sourcedir}",
    },
    VariableMacro {
        variable: "$RPM_BUILD_DIR",
        message: "Path to build directory must be used as macro %{_builddir}",
    },
    VariableMacro {
        variable: "$RPM_ARCH",
        message: "Arch value must be used as macro %{_arch}",
    },
    VariableMacro {
        variable: "$RPM_OS",
        message: "OS value must be used as macro %{_os}",
    },
    VariableMacro {
        variable: "$RPM_PACKAGE_NAME",
        message: "Package name value must be used as macro %{name}",
    },
    VariableMacro {
        variable: "$RPM_PACKAGE_VERSION",
        message: "Package version value must be used as macro %{version}",
    },
    VariableMacro {
        variable: "$RPM_PACKAGE_RELEASE",
        message: "Package release value must be used as macro %{release}",
    },
];

/// Binaries whose `%{__bin}` wrapper macros add nothing over the plain name.
const PLAIN_BINARIES: &[&str] = &[
    "7zip", "bzip2", "bzr", "cat", "chgrp", "chmod", "chown", "cp", "cpio", "file", "git", "grep",
    "gzip", "hg", "id", "install", "ld", "lrzip", "lzip", "mkdir", "mv", "nm", "objcopy",
    "objdump", "patch", "quilt", "rm", "rsh", "sed", "semodule", "ssh", "strip", "tar", "unzip",
    "xz",
];

/// Literal filesystem paths that should be written as macros.
pub fn check_path_macros(id: &str, spec: &SpecFile) -> Vec<Alert> {
    if spec.data.is_empty() {
        return Vec::new();
    }

    let mut result = Vec::new();

    let sections = [
        SECTION_BUILD,
        SECTION_CHECK,
        SECTION_CLEAN,
        SECTION_FILES,
        SECTION_INSTALL,
        SECTION_PACKAGE,
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
            if is_comment(line) {
                continue;
            }

            // Env var exports and sed replacements legitimately spell paths out
            if contains(line, "export") || contains(line, "sed") {
                continue;
            }

            for path_macro in PATH_MACROS {
                if let Ok(re) = Regex::new(&format!("{}(/|$|%)", path_macro.path)) {
                    if re.is_match(&line.text) {
                        result.push(Alert::new(
                            id,
                            Severity::Warning,
                            format!(
                                "Path \"{}\" should be used as macro \"{}\"",
                                path_macro.path, path_macro.name
                            ),
                            line.clone(),
                        ));
                    }
                }
            }
        }
    }

    result
}

/// Shell-style `$RPM_*` variables that have macro equivalents.
pub fn check_variables(id: &str, spec: &SpecFile) -> Vec<Alert> {
    if spec.data.is_empty() {
        return Vec::new();
    }

    let mut result = Vec::new();

    for section in spec.get_sections(&[SECTION_BUILD, SECTION_INSTALL, SECTION_CLEAN]) {
        for line in &section.data {
            if is_comment(line) {
                continue;
            }

            for var in VARIABLE_MACROS {
                if contains(line, var.variable) {
                    result.push(Alert::new(id, Severity::Error, var.message, line.clone()));
                    break;
                }
            }
        }
    }

    result
}

/// Bare `make` invocations that should use the make macros.
pub fn check_make_macro(id: &str, spec: &SpecFile) -> Vec<Alert> {
    if spec.data.is_empty() {
        return Vec::new();
    }

    let mut result = Vec::new();

    for section in spec.get_sections(&[SECTION_BUILD, SECTION_INSTALL, SECTION_CHECK]) {
        for line in &section.data {
            if is_comment(line) || !contains(line, "make") {
                continue;
            }

            if prefix(line, "make") {
                result.push(Alert::new(
                    id,
                    Severity::Warning,
                    "Use %{__make} macro instead of \"make\"",
                    line.clone(),
                ));
            }

            if section.name == SECTION_INSTALL
                && contains_field(line, "install")
                && contains(line, "DESTDIR")
                && (prefix(line, "make") || prefix(line, "%{__make}"))
            {
                result.push(Alert::new(
                    id,
                    Severity::Warning,
                    "Use %{make_install} macro instead of \"make install\"",
                    line.clone(),
                ));
            }

            if section.name == SECTION_BUILD
                && !contains(line, "%{?_smp_mflags}")
                && (prefix(line, "make") || prefix(line, "%{__make}"))
                && (line.text == "make" || line.text == "%{__make}" || contains_field(line, "all"))
            {
                result.push(Alert::new(
                    id,
                    Severity::Warning,
                    "Don't forget to use %{?_smp_mflags} macro with make command",
                    line.clone(),
                ));
            }
        }
    }

    result
}

/// `%define`/`%global` definitions buried between %description and %files.
pub fn check_macro_definition_position(id: &str, spec: &SpecFile) -> Vec<Alert> {
    if spec.data.is_empty() {
        return Vec::new();
    }

    let mut result = Vec::new();
    let mut under_description = false;

    for line in &spec.data {
        if !under_description && prefix(line, "%description") {
            under_description = true;
        }

        if prefix(line, "%files") {
            break;
        }

        if under_description && (contains(line, "%global ") || contains(line, "%define ")) {
            result.push(Alert::new(
                id,
                Severity::Warning,
                "Move %define and %global to top of your spec",
                line.clone(),
            ));
        }
    }

    result
}

/// Useless `%{__bin}` wrapper macros for common binaries.
pub fn check_binary_macros(id: &str, spec: &SpecFile) -> Vec<Alert> {
    if spec.data.is_empty() {
        return Vec::new();
    }

    let mut result = Vec::new();

    for line in &spec.data {
        for binary in PLAIN_BINARIES {
            if contains(line, &format!("%{{__{binary}}}")) {
                result.push(Alert::new(
                    id,
                    Severity::Notice,
                    format!("Useless macro %{{__{binary}}} used for executing {binary} binary"),
                    line.clone(),
                ));
            }
        }
    }

    result
}

/// `%setup` option combinations that collapse into one flag.
pub fn check_setup_options(id: &str, spec: &SpecFile) -> Vec<Alert> {
    if spec.data.is_empty() {
        return Vec::new();
    }

    let mut result = Vec::new();

    for section in spec.get_sections(&[SECTION_SETUP]) {
        let simplified = if contains_args(&section, &["-q", "-c", "-n"]) {
            Some(("-q -c -n", "-qcn"))
        } else if contains_args(&section, &["-q", "-n"]) {
            Some(("-q -n", "-qn"))
        } else if contains_args(&section, &["-c", "-n"]) {
            Some(("-c -n", "-cn"))
        } else {
            None
        };

        if let Some((given, short)) = simplified {
            result.push(Alert::new(
                id,
                Severity::Notice,
                format!("Options \"{given}\" can be simplified to \"{short}\""),
                spec.get_line(section.start),
            ));
        }
    }

    result
}

/// Non-empty %check sections should honor the test-control macros.
pub fn check_test_macros(id: &str, spec: &SpecFile) -> Vec<Alert> {
    if spec.data.is_empty() || !spec.has_section(SECTION_CHECK) {
        return Vec::new();
    }

    for section in spec.get_sections(&[SECTION_CHECK]) {
        if section.is_empty() {
            return Vec::new();
        }

        for line in &section.data {
            if contains(line, "?_without_check") && contains(line, "?_with_check") {
                return Vec::new();
            }
        }
    }

    vec![Alert::new(
        id,
        Severity::Warning,
        "Use %{_without_check} and %{_with_check} macros for controlling tests execution",
        crate::parser::Line::none(),
    )]
}

/// Single `=` comparisons inside `%if` clauses.
pub fn check_if_clause(id: &str, spec: &SpecFile) -> Vec<Alert> {
    if spec.data.is_empty() {
        return Vec::new();
    }

    let mut result = Vec::new();

    for line in &spec.data {
        if prefix(line, "%if ") && contains(line, " = ") {
            result.push(Alert::new(
                id,
                Severity::Error,
                "Use two equals symbols for comparison in %if clause",
                line.clone(),
            ));
        }
    }

    result
}

/// Redundant slash between `%{buildroot}` and a path macro.
pub fn check_buildroot_slash(id: &str, spec: &SpecFile) -> Vec<Alert> {
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
            if is_comment(line) {
                continue;
            }

            for path_macro in PATH_MACROS {
                if contains(line, &format!("%{{buildroot}}/{}", path_macro.name)) {
                    result.push(Alert::new(
                        id,
                        Severity::Warning,
                        format!(
                            "Slash between %{{buildroot}} and {} macros is useless",
                            path_macro.name
                        ),
                        line.clone(),
                    ));
                }
            }
        }
    }

    result
}
