use crate::parser::SpecFile;
use std::path::Path;

/// Host OS identity, as declared in os-release(5).
#[derive(Debug, Clone, Default)]
pub struct OsInfo {
    pub id: String,
    pub version_id: String,
    pub platform_id: String,
    pub id_like: String,
}

impl OsInfo {
    /// Detect the current host identity. `None` when the host cannot be
    /// identified; the applicability gate then fails closed.
    pub fn detect() -> Option<OsInfo> {
        OsInfo::from_file(Path::new("/etc/os-release"))
    }

    fn from_file(path: &Path) -> Option<OsInfo> {
        let content = std::fs::read_to_string(path).ok()?;
        Some(OsInfo::parse_os_release(&content))
    }

    fn parse_os_release(content: &str) -> OsInfo {
        let mut info = OsInfo::default();

        for line in content.lines() {
            let (key, value) = match line.split_once('=') {
                Some(pair) => pair,
                None => continue,
            };

            let value = value.trim().trim_matches('"').to_string();

            match key.trim() {
                "ID" => info.id = value,
                "VERSION_ID" => info.version_id = value,
                "PLATFORM_ID" => info.platform_id = value,
                "ID_LIKE" => info.id_like = value,
                _ => {}
            }
        }

        info
    }

    // "8.8" -> "8"
    fn major_version(&self) -> &str {
        self.version_id.split('.').next().unwrap_or("")
    }
}

/// True if a single declared target matches the given OS identity. A target
/// matches the OS id (`almalinux`), the id plus major version
/// (`almalinux8`), the platform id (`el8` for `platform:el8`), or an
/// `@`-prefixed ID_LIKE alias (`@fedora`).
pub fn is_target_fit(os: &OsInfo, target: &str) -> bool {
    if let Some(alias) = target.strip_prefix('@') {
        return os.id_like.split_whitespace().any(|like| like == alias);
    }

    if target == os.id {
        return true;
    }

    if !os.version_id.is_empty() && target == format!("{}{}", os.id, os.major_version()) {
        return true;
    }

    match os.platform_id.split_once(':') {
        Some((_, platform)) => target == platform,
        None => false,
    }
}

/// Target-applicability gate. A spec with no declared targets always
/// applies; an unknown host never does.
pub fn is_applicable(spec: &SpecFile, os: Option<&OsInfo>) -> bool {
    if spec.targets.is_empty() {
        return true;
    }

    let os = match os {
        Some(os) => os,
        None => return false,
    };

    spec.targets.iter().any(|target| is_target_fit(os, target))
}
