//! `.gitignore` maintenance for generated artifacts
//!
//! The file is only ever created or appended to; existing content is never
//! rewritten.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use tracing::debug;

pub const GITIGNORE_FILE_NAME: &str = ".gitignore";

const SECTION_HEADER: &str = "# Auto-generated by x2p-clangd-server";

/// Make sure every item appears as a line of `<dir>/.gitignore`
///
/// Returns the items that had to be added.
pub fn ensure_ignored(dir: &Path, items: &[&str]) -> std::io::Result<Vec<String>> {
    let path = dir.join(GITIGNORE_FILE_NAME);

    let existing = match fs::read_to_string(&path) {
        Ok(content) => Some(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(e),
    };

    let missing: Vec<String> = items
        .iter()
        .filter(|item| {
            existing
                .as_deref()
                .is_none_or(|content| !content.lines().any(|line| line.trim() == **item))
        })
        .map(|item| item.to_string())
        .collect();

    if missing.is_empty() {
        return Ok(missing);
    }

    let mut section = String::new();
    match existing.as_deref() {
        None => {}
        Some("") => {}
        Some(content) => {
            if !content.ends_with('\n') {
                section.push('\n');
            }
            section.push('\n');
        }
    }
    section.push_str(SECTION_HEADER);
    section.push('\n');
    for item in &missing {
        section.push_str(item);
        section.push('\n');
    }

    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    file.write_all(section.as_bytes())?;

    debug!("Added {:?} to {}", missing, path.display());
    Ok(missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ITEMS: [&str; 3] = [".x2p_parser_cache.json", ".clangd", "compile_commands.json"];

    #[test]
    fn test_creates_gitignore_with_header() {
        let temp_dir = TempDir::new().unwrap();

        let added = ensure_ignored(temp_dir.path(), &ITEMS).unwrap();

        assert_eq!(added.len(), 3);
        assert_eq!(
            fs::read_to_string(temp_dir.path().join(GITIGNORE_FILE_NAME)).unwrap(),
            "# Auto-generated by x2p-clangd-server\n.x2p_parser_cache.json\n.clangd\ncompile_commands.json\n"
        );
    }

    #[test]
    fn test_appends_only_missing_items() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(GITIGNORE_FILE_NAME);
        fs::write(&path, "target/\n.clangd").unwrap();

        let added = ensure_ignored(temp_dir.path(), &ITEMS).unwrap();

        assert_eq!(added, vec![".x2p_parser_cache.json", "compile_commands.json"]);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "target/\n.clangd\n\n# Auto-generated by x2p-clangd-server\n.x2p_parser_cache.json\ncompile_commands.json\n"
        );
    }

    #[test]
    fn test_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        ensure_ignored(temp_dir.path(), &ITEMS).unwrap();
        let before = fs::read_to_string(temp_dir.path().join(GITIGNORE_FILE_NAME)).unwrap();

        let added = ensure_ignored(temp_dir.path(), &ITEMS).unwrap();

        assert!(added.is_empty());
        assert_eq!(
            fs::read_to_string(temp_dir.path().join(GITIGNORE_FILE_NAME)).unwrap(),
            before
        );
    }

    #[test]
    fn test_substring_is_not_a_match() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(GITIGNORE_FILE_NAME),
            "old/compile_commands.json\n",
        )
        .unwrap();

        let added = ensure_ignored(temp_dir.path(), &["compile_commands.json"]).unwrap();

        assert_eq!(added, vec!["compile_commands.json"]);
    }
}
