//! Host OS detection for report environment data

use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OsType {
    Windows,
    Mac,
    Linux,
    Other,
}

impl OsType {
    pub fn from_name(name: &str) -> Self {
        let name = name.to_lowercase();
        if name.contains("mac") || name.contains("darwin") {
            OsType::Mac
        } else if name.starts_with("win") {
            OsType::Windows
        } else if ["nix", "nux", "aix", "linux"].iter().any(|n| name.contains(n)) {
            OsType::Linux
        } else {
            OsType::Other
        }
    }

    pub fn current() -> Self {
        Self::from_name(std::env::consts::OS)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OsInfo {
    pub kind: OsType,
    pub name: String,
    pub version: String,
    pub arch: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distro: Option<String>,
}

impl OsInfo {
    pub fn detect() -> Self {
        let kind = OsType::current();
        let is_linux = kind == OsType::Linux;
        Self {
            kind,
            name: std::env::consts::OS.to_string(),
            version: kernel_version().unwrap_or_else(|| "unknown".to_string()),
            arch: std::env::consts::ARCH.to_string(),
            distro: if is_linux {
                detect_linux_distro(Path::new("/etc/os-release"))
            } else {
                None
            },
        }
    }

    pub fn is_windows(&self) -> bool {
        self.kind == OsType::Windows
    }

    pub fn is_mac(&self) -> bool {
        self.kind == OsType::Mac
    }

    pub fn is_linux(&self) -> bool {
        self.kind == OsType::Linux
    }

    /// Key/value pairs for `environment.properties`
    pub fn environment_entries(&self) -> Vec<(String, String)> {
        let mut entries = vec![
            ("os.name".to_string(), self.name.clone()),
            ("os.version".to_string(), self.version.clone()),
            ("os.arch".to_string(), self.arch.clone()),
        ];
        if let Some(distro) = &self.distro {
            entries.push(("os.distro".to_string(), distro.clone()));
        }
        entries
    }
}

fn kernel_version() -> Option<String> {
    std::fs::read_to_string("/proc/sys/kernel/osrelease")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `PRETTY_NAME`, then `NAME`, then `ID` from an os-release file
pub fn detect_linux_distro(os_release: &Path) -> Option<String> {
    let contents = std::fs::read_to_string(os_release).ok()?;
    parse_os_release(&contents)
}

fn parse_os_release(contents: &str) -> Option<String> {
    let pairs: HashMap<&str, &str> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            if key.is_empty() {
                return None;
            }
            Some((key, value.trim().trim_matches('"')))
        })
        .collect();

    ["PRETTY_NAME", "NAME", "ID"]
        .iter()
        .find_map(|key| pairs.get(key).map(|v| v.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_os_type_from_name() {
        assert_eq!(OsType::from_name("Windows 11"), OsType::Windows);
        assert_eq!(OsType::from_name("macos"), OsType::Mac);
        assert_eq!(OsType::from_name("Darwin"), OsType::Mac);
        assert_eq!(OsType::from_name("Mac OS X"), OsType::Mac);
        assert_eq!(OsType::from_name("windows"), OsType::Windows);
        assert_eq!(OsType::from_name("linux"), OsType::Linux);
        assert_eq!(OsType::from_name("AIX"), OsType::Linux);
        assert_eq!(OsType::from_name("freebsd"), OsType::Other);
    }

    #[test]
    fn test_os_release_precedence() {
        let full = "NAME=\"Ubuntu\"\nID=ubuntu\nPRETTY_NAME=\"Ubuntu 24.04 LTS\"\n";
        assert_eq!(parse_os_release(full).as_deref(), Some("Ubuntu 24.04 LTS"));

        let no_pretty = "# comment\nNAME=\"Alpine Linux\"\nID=alpine\n";
        assert_eq!(parse_os_release(no_pretty).as_deref(), Some("Alpine Linux"));

        assert_eq!(parse_os_release("ID=arch\n=broken\n").as_deref(), Some("arch"));
        assert_eq!(parse_os_release("VERSION=1\n"), None);
    }

    #[test]
    fn test_detect_linux_distro_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("os-release");
        std::fs::write(&path, "ID=debian\n").unwrap();
        assert_eq!(detect_linux_distro(&path).as_deref(), Some("debian"));
        assert_eq!(detect_linux_distro(&dir.path().join("missing")), None);
    }

    #[test]
    fn test_environment_entries() {
        let info = OsInfo {
            kind: OsType::Linux,
            name: "linux".to_string(),
            version: "6.1".to_string(),
            arch: "x86_64".to_string(),
            distro: Some("Debian".to_string()),
        };
        let entries = info.environment_entries();
        assert_eq!(entries.len(), 4);
        assert!(entries.contains(&("os.distro".to_string(), "Debian".to_string())));
        assert!(info.is_linux() && !info.is_mac() && !info.is_windows());
    }
}
