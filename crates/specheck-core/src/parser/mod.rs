use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

/// Marker for the in-file suppression directive (`# specheck:ignore [N]`).
pub const DIRECTIVE_IGNORE: &str = "specheck:ignore";

/// Legacy spelling of the suppression directive, kept for old spec files.
pub const DIRECTIVE_ABSOLVE: &str = "specheck:absolve";

/// Marker for the in-file target directive (`# specheck:target el8 fedora`).
pub const DIRECTIVE_TARGET: &str = "specheck:target";

pub const SECTION_BUILD: &str = "build";
pub const SECTION_CHANGELOG: &str = "changelog";
pub const SECTION_CHECK: &str = "check";
pub const SECTION_CLEAN: &str = "clean";
pub const SECTION_DESCRIPTION: &str = "description";
pub const SECTION_FILES: &str = "files";
pub const SECTION_INSTALL: &str = "install";
pub const SECTION_PACKAGE: &str = "package";
pub const SECTION_POST: &str = "post";
pub const SECTION_POSTTRANS: &str = "posttrans";
pub const SECTION_POSTUN: &str = "postun";
pub const SECTION_PRE: &str = "pre";
pub const SECTION_PREP: &str = "prep";
pub const SECTION_PRETRANS: &str = "pretrans";
pub const SECTION_PREUN: &str = "preun";
pub const SECTION_SETUP: &str = "setup";
pub const SECTION_TRIGGERIN: &str = "triggerin";
pub const SECTION_TRIGGERPOSTUN: &str = "triggerpostun";
pub const SECTION_TRIGGERUN: &str = "triggerun";
pub const SECTION_VERIFYSCRIPT: &str = "verifyscript";

/// Header tags recognized as the start of a package metadata block.
const HEADER_TAGS: &[&str] = &[
    "BuildArch",
    "BuildConflicts",
    "BuildPreReq",
    "BuildRequires",
    "BuildRoot",
    "Conflicts",
    "ExcludeArch",
    "ExclusiveArch",
    "Group",
    "License",
    "Name",
    "Obsoletes",
    "Patch",
    "PreReq",
    "Provides",
    "Release",
    "Requires",
    "Requires(posttrans)",
    "Requires(post)",
    "Requires(postun)",
    "Requires(pre)",
    "Requires(pretrans)",
    "Requires(preun)",
    "Source",
    "Summary",
    "URL",
    "Version",
];

fn section_header_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^%(prep|setup|build|install|check|clean|files|changelog|package|description|verifyscript|pretrans|pre|post|preun|postun|posttrans|triggerin|triggerun|triggerpostun)( |$)",
        )
        .expect("invalid section header pattern")
    })
}

/// Errors produced while reading a spec file from disk.
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("File {0} doesn't exist")]
    NotFound(String),

    #[error("{0} isn't a regular file")]
    NotRegularFile(String),

    #[error("File {0} isn't readable")]
    NotReadable(String),

    #[error("File {0} is empty")]
    EmptyFile(String),

    #[error("File {0} is not a spec file")]
    NotASpecFile(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One physical line of a spec file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub index: i32,
    pub text: String,
    pub ignored: bool,
}

impl Line {
    pub fn new(index: i32, text: impl Into<String>, ignored: bool) -> Line {
        Line {
            index,
            text: text.into(),
            ignored,
        }
    }

    /// Sentinel line used for file-global findings.
    pub fn none() -> Line {
        Line {
            index: -1,
            text: String::new(),
            ignored: false,
        }
    }
}

/// A named body block introduced by a `%sectionname` header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    pub args: Vec<String>,
    pub data: Vec<Line>,
    pub start: i32,
    pub end: i32,
}

impl Section {
    /// Package name if the section is package specific (`%files foo`,
    /// `%post -n foo`), empty otherwise.
    pub fn package_name(&self) -> &str {
        match self.args.first().map(String::as_str) {
            Some("-n") => self.args.get(1).map(String::as_str).unwrap_or(""),
            Some(first) => first,
            None => "",
        }
    }

    /// True if every body line is blank or whitespace-only.
    pub fn is_empty(&self) -> bool {
        self.data
            .iter()
            .all(|line| line.text.trim_matches([' ', '\t']).is_empty())
    }
}

/// Metadata block for the main package or a `%package` subpackage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Header {
    pub package: String,
    pub data: Vec<Line>,
    pub is_subpackage: bool,
}

/// A parsed spec file: ordered lines plus declared applicability targets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpecFile {
    pub file: String,
    pub data: Vec<Line>,
    pub targets: Vec<String>,
}

/// Read and parse a spec file from disk.
pub fn read(path: &Path) -> Result<SpecFile, SpecError> {
    let name = path.display().to_string();

    let meta = match std::fs::metadata(path) {
        Ok(meta) => meta,
        Err(_) => return Err(SpecError::NotFound(name)),
    };

    if !meta.is_file() {
        return Err(SpecError::NotRegularFile(name));
    }

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(SpecError::NotReadable(name));
        }
        Err(err) => return Err(SpecError::Io(err)),
    };

    if content.is_empty() {
        return Err(SpecError::EmptyFile(name));
    }

    SpecFile::parse(&content, name)
}

impl SpecFile {
    /// Parse spec content that has already been read from `file`. Fails only
    /// if the content doesn't look like a spec file at all.
    pub fn parse(content: &str, file: impl Into<String>) -> Result<SpecFile, SpecError> {
        let mut spec = SpecFile {
            file: file.into(),
            data: Vec::new(),
            targets: Vec::new(),
        };

        let mut ignore = 0;

        for (num, raw) in content.split('\n').enumerate() {
            let text = raw.strip_suffix('\r').unwrap_or(raw);

            if is_ignore_directive(text) {
                ignore = extract_ignore_count(text);
            } else if is_target_directive(text) {
                for target in extract_targets(text) {
                    if !spec.targets.contains(&target) {
                        spec.targets.push(target);
                    }
                }
            }

            spec.data.push(Line::new(num as i32 + 1, text, ignore != 0));

            if ignore != 0 {
                ignore -= 1;
            }
        }

        if !is_spec(&spec) {
            return Err(SpecError::NotASpecFile(spec.file));
        }

        Ok(spec)
    }

    /// True if the spec contains the given section.
    pub fn has_section(&self, section: &str) -> bool {
        self.data
            .iter()
            .any(|line| section_name_matches(&line.text, section))
    }

    /// Extract sections in file order. An empty `names` filter matches every
    /// recognized section.
    pub fn get_sections(&self, names: &[&str]) -> Vec<Section> {
        let mut result = Vec::new();
        let mut current: Option<Section> = None;
        let mut start = 0usize;

        for (idx, line) in self.data.iter().enumerate() {
            if !is_section_header(&line.text) {
                continue;
            }

            if let Some(mut section) = current.take() {
                if idx > start + 1 {
                    section.data = self.data[start + 1..idx].to_vec();
                    section.start = start as i32 + 1;
                    section.end = idx as i32;
                }
                result.push(section);
            }

            let first_field = line.text.split_whitespace().next().unwrap_or("");

            if !is_section_match(first_field, names) {
                continue;
            }

            let (name, args) = parse_section_name(&line.text);

            current = Some(Section {
                name,
                args,
                data: Vec::new(),
                start: 0,
                end: 0,
            });

            start = idx;
        }

        if let Some(mut section) = current.take() {
            section.data = self.data[start + 1..].to_vec();
            section.start = start as i32 + 1;
            section.end = self.data.len() as i32;
            result.push(section);
        }

        result
    }

    /// Extract package headers in file order: the main package first (if its
    /// tag block precedes any `%package` stanza), then subpackages.
    pub fn get_headers(&self) -> Vec<Header> {
        let mut result = Vec::new();
        let mut current: Option<Header> = None;
        let mut start = 0usize;

        for (idx, line) in self.data.iter().enumerate() {
            if current.is_none() {
                if result.is_empty() && is_header_tag(&line.text) {
                    current = Some(Header::default());
                    start = idx;
                    continue;
                } else if line.text.starts_with("%package") {
                    let (package, is_subpackage) = parse_package_name(&line.text);
                    current = Some(Header {
                        package,
                        data: Vec::new(),
                        is_subpackage,
                    });
                    start = idx;
                    continue;
                }
            }

            if is_section_header(&line.text) {
                if let Some(mut header) = current.take() {
                    header.data = self.data[start..idx - 1].to_vec();
                    result.push(header);
                }
            }
        }

        result
    }

    /// Collect `Source*` declarations occurring before the first section
    /// header, skipping lines inside an ignore-directive range.
    pub fn get_sources(&self) -> Vec<Line> {
        let mut result = Vec::new();

        for line in &self.data {
            if line.ignored {
                continue;
            }

            if is_section_header(&line.text) {
                break;
            }

            if line.text.trim_start_matches([' ', '\t']).starts_with("Source") {
                result.push(line.clone());
            }
        }

        result
    }

    /// Look up a line by 1-based index, returning the sentinel line for
    /// negative or unknown indices.
    pub fn get_line(&self, index: i32) -> Line {
        if index < 0 {
            return Line::none();
        }

        self.data
            .iter()
            .find(|line| line.index == index)
            .cloned()
            .unwrap_or_else(Line::none)
    }
}

/// True if the given text opens one of the recognized sections.
pub fn is_section_header(text: &str) -> bool {
    section_header_regex().is_match(text)
}

fn is_header_tag(text: &str) -> bool {
    HEADER_TAGS.iter().any(|tag| text.starts_with(tag))
}

fn section_name_matches(text: &str, section: &str) -> bool {
    match text.strip_prefix('%') {
        Some(rest) => rest == section || rest.starts_with(&format!("{section} ")),
        None => false,
    }
}

fn is_section_match(first_field: &str, names: &[&str]) -> bool {
    if names.is_empty() {
        return true;
    }

    names
        .iter()
        .any(|name| section_name_matches(first_field, name))
}

fn parse_section_name(text: &str) -> (String, Vec<String>) {
    if !text.contains(' ') {
        return (text.trim_start_matches('%').to_string(), Vec::new());
    }

    let mut fields = text.split_whitespace();
    let name = fields
        .next()
        .unwrap_or("")
        .trim_start_matches('%')
        .to_string();

    (name, fields.map(String::from).collect())
}

fn parse_package_name(text: &str) -> (String, bool) {
    let fields: Vec<&str> = text.split_whitespace().collect();

    if fields.get(1) == Some(&"-n") {
        return (fields.get(2).unwrap_or(&"").to_string(), false);
    }

    (fields.get(1).unwrap_or(&"").to_string(), true)
}

// A file counts as a spec when it carries the three build-section markers and
// the three mandatory header tags.
fn is_spec(spec: &SpecFile) -> bool {
    let mut count = 0;

    for line in &spec.data {
        for marker in ["%install", "%files", "%changelog"] {
            if line.text.starts_with(marker) {
                count += 1;
            }
        }
    }

    if count < 3 {
        return false;
    }

    count = 0;

    for line in &spec.data {
        for marker in ["Name:", "Version:", "Summary:"] {
            if line.text.starts_with(marker) {
                count += 1;
            }
        }
    }

    count >= 3
}

fn is_ignore_directive(text: &str) -> bool {
    text.contains(DIRECTIVE_IGNORE) || text.contains(DIRECTIVE_ABSOLVE)
}

fn is_target_directive(text: &str) -> bool {
    text.trim_start().starts_with('#') && text.contains(DIRECTIVE_TARGET)
}

// Number of lines suppressed by an ignore directive, the directive line
// included: the directive line alone when no count is given, the directive
// line plus N when a positive count is given, and nothing at all for a
// malformed or non-positive count.
fn extract_ignore_count(text: &str) -> i32 {
    let count = match text.split_whitespace().nth(2) {
        Some(field) => field,
        None => return 1,
    };

    match count.parse::<i32>() {
        Ok(count) if count > 0 => count + 1,
        _ => 0,
    }
}

fn extract_targets(text: &str) -> Vec<String> {
    let rest = match text.split_once(DIRECTIVE_TARGET) {
        Some((_, rest)) => rest,
        None => return Vec::new(),
    };

    rest.split([' ', ',', '\t'])
        .filter(|target| !target.is_empty())
        .map(|target| target.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const BASIC_SPEC: &str = "\
Name:           magic
Version:        1.0.0
Release:        1%{?dist}
Summary:        Magic tool

License:        MIT
URL:            https://example.org
Source0:        https://example.org/magic-%{version}.tar.gz
# specheck:ignore
Source1:        https://example.org/extra.tar.gz

%description
Magic tool for magic things.

%package magic-utils
Summary:        Extra utils

%description magic-utils
Extra utils for magic.

%prep
%setup -q

%build
%configure
%{__make} %{?_smp_mflags}

%install
%{make_install}

%files
%defattr(-,root,root,-)
%{_bindir}/magic

%files -n magic-utils
%defattr(-,root,root,-)
%{_bindir}/magic-utils

%changelog
* Thu Aug 15 2024 John Doe <john@example.org> - 1.0.0-1
- Initial build
";

    fn parse(content: &str) -> SpecFile {
        SpecFile::parse(content, "test.spec").expect("fixture must parse")
    }

    #[test]
    fn test_read_missing_file() {
        let err = read(Path::new("/nonexistent/magic.spec")).unwrap_err();
        assert!(matches!(err, SpecError::NotFound(_)));
    }

    #[test]
    fn test_read_directory_is_not_regular() {
        let tmp = tempfile::tempdir().unwrap();
        let err = read(tmp.path()).unwrap_err();
        assert!(matches!(err, SpecError::NotRegularFile(_)));
    }

    #[test]
    fn test_read_empty_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("empty.spec");
        std::fs::File::create(&path).unwrap();

        let err = read(&path).unwrap_err();
        assert!(matches!(err, SpecError::EmptyFile(_)));
    }

    #[test]
    fn test_read_not_a_spec() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("notes.spec");
        let mut fd = std::fs::File::create(&path).unwrap();
        writeln!(fd, "just some notes").unwrap();

        let err = read(&path).unwrap_err();
        assert!(matches!(err, SpecError::NotASpecFile(_)));
    }

    #[test]
    fn test_read_valid_spec() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("magic.spec");
        std::fs::write(&path, BASIC_SPEC).unwrap();

        let spec = read(&path).unwrap();
        assert_eq!(spec.data.len(), BASIC_SPEC.split('\n').count());
        assert_eq!(spec.data[0].index, 1);
        assert_eq!(spec.data[0].text, "Name:           magic");
    }

    #[test]
    fn test_line_indices_are_sequential() {
        let spec = parse(BASIC_SPEC);

        for (idx, line) in spec.data.iter().enumerate() {
            assert_eq!(line.index, idx as i32 + 1);
        }
    }

    #[test]
    fn test_ignore_directive_marks_lines() {
        let spec = parse(BASIC_SPEC);

        // The bare marker suppresses exactly the directive line itself
        assert!(!spec.get_line(8).ignored);
        assert!(spec.get_line(9).ignored);
        assert!(!spec.get_line(10).ignored);
    }

    #[test]
    fn test_ignore_directive_with_count() {
        let content = BASIC_SPEC.replace("# specheck:ignore", "# specheck:ignore 3");
        let spec = parse(&content);

        for index in 9..=12 {
            assert!(spec.get_line(index).ignored, "line {index} must be ignored");
        }
        assert!(!spec.get_line(13).ignored);
    }

    #[test]
    fn test_ignore_directive_with_malformed_count() {
        for count in ["x", "0", "-2"] {
            let content =
                BASIC_SPEC.replace("# specheck:ignore", &format!("# specheck:ignore {count}"));
            let spec = parse(&content);

            // Malformed count suppresses nothing, not even the directive line
            assert!(!spec.get_line(9).ignored);
            assert!(!spec.get_line(10).ignored);
        }
    }

    #[test]
    fn test_absolve_directive_spelling() {
        let content = BASIC_SPEC.replace("# specheck:ignore", "# specheck:absolve 1");
        let spec = parse(&content);

        assert!(spec.get_line(9).ignored);
        assert!(spec.get_line(10).ignored);
        assert!(!spec.get_line(11).ignored);
    }

    #[test]
    fn test_target_directive() {
        let content = format!("# specheck:target MySuppaOS\n{BASIC_SPEC}");
        let spec = parse(&content);

        assert_eq!(spec.targets, vec!["mysuppaos".to_string()]);
    }

    #[test]
    fn test_target_directive_accumulates() {
        let content = format!(
            "# specheck:target el8, el9\n# specheck:target fedora el8\n{BASIC_SPEC}"
        );
        let spec = parse(&content);

        assert_eq!(
            spec.targets,
            vec!["el8".to_string(), "el9".to_string(), "fedora".to_string()]
        );
    }

    #[test]
    fn test_has_section() {
        let spec = parse(BASIC_SPEC);

        assert!(spec.has_section(SECTION_PREP));
        assert!(spec.has_section(SECTION_FILES));
        assert!(!spec.has_section(SECTION_CHECK));
    }

    #[test]
    fn test_get_sections_all() {
        let spec = parse(BASIC_SPEC);
        let sections = spec.get_sections(&[]);

        let names: Vec<&str> = sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "description",
                "package",
                "description",
                "prep",
                "setup",
                "build",
                "install",
                "files",
                "files",
                "changelog"
            ]
        );
    }

    #[test]
    fn test_get_sections_filtered() {
        let spec = parse(BASIC_SPEC);
        let sections = spec.get_sections(&[SECTION_FILES]);

        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].package_name(), "");
        assert_eq!(sections[1].package_name(), "magic-utils");
        assert!(sections[1].args.contains(&"-n".to_string()));
    }

    #[test]
    fn test_section_bounds_cover_body() {
        let spec = parse(BASIC_SPEC);
        let sections = spec.get_sections(&[SECTION_BUILD]);

        assert_eq!(sections.len(), 1);
        let build = &sections[0];

        // start points at the header line, end at the last body line
        assert_eq!(spec.get_line(build.start).text, "%build");
        assert_eq!(build.data.first().unwrap().index, build.start + 1);
        assert_eq!(build.data.last().unwrap().index, build.end);
    }

    #[test]
    fn test_section_is_empty() {
        let content = BASIC_SPEC.replace("%configure\n%{__make} %{?_smp_mflags}", "   \n\t");
        let spec = parse(&content);
        let sections = spec.get_sections(&[SECTION_BUILD]);

        assert!(sections[0].is_empty());
    }

    #[test]
    fn test_get_headers() {
        let spec = parse(BASIC_SPEC);
        let headers = spec.get_headers();

        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0].package, "");
        assert!(!headers[0].is_subpackage);
        assert!(headers[0]
            .data
            .iter()
            .any(|line| line.text.starts_with("License:")));
        assert_eq!(headers[1].package, "magic-utils");
        assert!(headers[1].is_subpackage);
    }

    #[test]
    fn test_get_headers_with_full_name_subpackage() {
        let content = BASIC_SPEC.replace("%package magic-utils", "%package -n magic-utils");
        let spec = parse(&content);
        let headers = spec.get_headers();

        assert_eq!(headers[1].package, "magic-utils");
        assert!(!headers[1].is_subpackage);
    }

    #[test]
    fn test_get_sources() {
        let spec = parse(BASIC_SPEC);
        let sources = spec.get_sources();

        assert_eq!(sources.len(), 2);
        assert!(sources[0].text.starts_with("Source0:"));
        assert!(sources[1].text.starts_with("Source1:"));
    }

    #[test]
    fn test_get_sources_skips_ignored() {
        let content = BASIC_SPEC.replace("# specheck:ignore", "# specheck:ignore 1");
        let spec = parse(&content);
        let sources = spec.get_sources();

        assert_eq!(sources.len(), 1);
        assert!(sources[0].text.starts_with("Source0:"));
    }

    #[test]
    fn test_get_line_sentinel() {
        let spec = parse(BASIC_SPEC);

        assert_eq!(spec.get_line(-1), Line::none());
        assert_eq!(spec.get_line(10_000), Line::none());
        assert_eq!(spec.get_line(1).text, "Name:           magic");
    }

    #[test]
    fn test_package_name_fallbacks() {
        let section = Section {
            name: "files".to_string(),
            args: vec!["-n".to_string()],
            data: Vec::new(),
            start: 0,
            end: 0,
        };

        assert_eq!(section.package_name(), "");
    }

    #[test]
    fn test_section_header_detection() {
        assert!(is_section_header("%build"));
        assert!(is_section_header("%files -n magic"));
        assert!(is_section_header("%preun"));
        assert!(!is_section_header("%buildroot"));
        assert!(!is_section_header("%{_bindir}/magic"));
        assert!(!is_section_header("# %build"));
    }
}
