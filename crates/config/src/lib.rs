//! Configuration file helpers for namesync
//!
//! Provides path resolution for files kept in the user's home directory and
//! [`EnvFile`], a `KEY=value` line file that can be read once and rewritten
//! in place without disturbing comments or unrelated keys.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Get the user's home directory
pub fn home_dir() -> Option<PathBuf> {
    dirs::home_dir()
}

/// Get the path to a file directly inside the home directory (e.g. `~/.zoho_env`)
pub fn home_path(filename: &str) -> Option<PathBuf> {
    home_dir().map(|p| p.join(filename))
}

/// A `KEY=value` file, one entry per line, `#` comments ignored.
///
/// Lines are kept verbatim so that [`EnvFile::save`] only touches the
/// entries that were changed through [`EnvFile::set`].
#[derive(Debug, Clone)]
pub struct EnvFile {
    path: PathBuf,
    lines: Vec<String>,
}

impl EnvFile {
    /// Read and parse the file at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Ok(Self::parse(path, &content))
    }

    /// Parse file content that belongs to `path`
    pub fn parse(path: &Path, content: &str) -> Self {
        Self {
            path: path.to_path_buf(),
            lines: content.lines().map(str::to_string).collect(),
        }
    }

    /// Path this file was loaded from and will be saved to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Value of the first entry named `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines
            .iter()
            .filter_map(|line| parse_entry(line))
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }

    /// Whether an entry named `key` exists
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// All entries in file order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.lines.iter().filter_map(|line| parse_entry(line))
    }

    /// Replace the first entry named `key`, or append one if there is none
    pub fn set(&mut self, key: &str, value: &str) {
        let replacement = format!("{}={}", key, value);
        let existing = self
            .lines
            .iter()
            .position(|line| parse_entry(line).is_some_and(|(k, _)| k == key));

        match existing {
            Some(idx) => self.lines[idx] = replacement,
            None => self.lines.push(replacement),
        }
    }

    /// Render the file content
    pub fn render(&self) -> String {
        let mut content = self.lines.join("\n");
        content.push('\n');
        content
    }

    /// Write the file back to its path
    ///
    /// The content goes to a sibling temporary file first and is renamed over
    /// the original, so readers never observe a half-written file.
    pub fn save(&self) -> Result<()> {
        write_atomic(&self.path, self.render().as_bytes())
    }
}

/// Split a line into `(key, value)`, skipping blanks and comments
fn parse_entry(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let (key, value) = line.split_once('=')?;
    Some((key.trim(), value.trim()))
}

/// Write `contents` to `path` through a temporary file and a rename
///
/// An existing file keeps its permissions.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    std::fs::write(&tmp_path, contents)
        .with_context(|| format!("Failed to write file: {}", tmp_path.display()))?;
    if let Ok(existing) = std::fs::metadata(path) {
        std::fs::set_permissions(&tmp_path, existing.permissions())
            .with_context(|| format!("Failed to set permissions: {}", tmp_path.display()))?;
    }
    std::fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to replace file: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = "# Zoho credentials\nZOHO_CLIENT_ID=abc\n\nZOHO_CLIENT_SECRET = s3cr=t\n#ZOHO_ACCESS_TOKEN=old\n";

    #[test]
    fn test_home_path() {
        let path = home_path(".zoho_env");
        assert!(path.is_some());
        assert!(path.unwrap().ends_with(".zoho_env"));
    }

    #[test]
    fn test_get_skips_comments_and_trims() {
        let file = EnvFile::parse(Path::new("env"), SAMPLE);
        assert_eq!(file.get("ZOHO_CLIENT_ID"), Some("abc"));
        // Only the first '=' separates key and value
        assert_eq!(file.get("ZOHO_CLIENT_SECRET"), Some("s3cr=t"));
        assert_eq!(file.get("ZOHO_ACCESS_TOKEN"), None);
        assert_eq!(file.entries().count(), 2);
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut file = EnvFile::parse(Path::new("env"), SAMPLE);
        file.set("ZOHO_CLIENT_ID", "xyz");

        let rendered = file.render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "# Zoho credentials");
        assert_eq!(lines[1], "ZOHO_CLIENT_ID=xyz");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn test_set_appends_missing_key() {
        let mut file = EnvFile::parse(Path::new("env"), SAMPLE);
        file.set("ZOHO_ACCESS_TOKEN", "new");

        // The commented-out line is left alone
        let rendered = file.render();
        assert!(rendered.contains("#ZOHO_ACCESS_TOKEN=old\n"));
        assert!(rendered.ends_with("ZOHO_ACCESS_TOKEN=new\n"));
        assert_eq!(file.get("ZOHO_ACCESS_TOKEN"), Some("new"));
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".zoho_env");
        std::fs::write(&path, SAMPLE).unwrap();

        let mut file = EnvFile::load(&path).unwrap();
        file.set("ZOHO_TOKEN_EXPIRES_AT", "1700000000");
        file.save().unwrap();

        let reloaded = EnvFile::load(&path).unwrap();
        assert_eq!(reloaded.get("ZOHO_TOKEN_EXPIRES_AT"), Some("1700000000"));
        assert_eq!(reloaded.get("ZOHO_CLIENT_ID"), Some("abc"));
        assert!(!temp_dir.path().join(".zoho_env.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_save_keeps_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".zoho_env");
        std::fs::write(&path, SAMPLE).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).unwrap();

        let mut file = EnvFile::load(&path).unwrap();
        file.set("ZOHO_ACCESS_TOKEN", "t");
        file.save().unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
        assert_eq!(EnvFile::load(&path).unwrap().get("ZOHO_ACCESS_TOKEN"), Some("t"));
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        assert!(EnvFile::load(&temp_dir.path().join("absent")).is_err());
    }
}
