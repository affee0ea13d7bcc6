//! Directory isolation for the background indexer
//!
//! Directories of the output tree that hold neither a compiled source file
//! nor a referenced include path are irrelevant to the active configuration
//! and are excluded from background indexing. Two passes run: the immediate
//! children of the output root, then the immediate children of one nested
//! "deep isolation root" where per-subsystem trees usually live.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

/// Nested location whose children are classified in the second pass
pub const DEFAULT_DEEP_ISOLATION_ROOT: &str = "adk/src/topologies";

/// Regular expression, relative to the output root, excluding one subtree
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SkipRule(String);

impl SkipRule {
    /// Rule covering everything below `relative` (a path under the output root)
    pub fn for_directory(relative: &Path) -> Self {
        let segments: Vec<String> = relative
            .components()
            .filter_map(|component| match component {
                Component::Normal(name) => Some(regex::escape(&name.to_string_lossy())),
                _ => None,
            })
            .collect();
        Self(format!("{}/.*", segments.join("/")))
    }

    pub fn pattern(&self) -> &str {
        &self.0
    }

    /// Pattern anchored to match a whole relative path
    pub fn anchored(&self) -> String {
        format!("^{}$", self.0)
    }
}

impl fmt::Display for SkipRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.pattern())
    }
}

/// Classifies output-tree directories as used or unused
#[derive(Debug, Clone)]
pub struct IsolationAnalyzer {
    deep_isolation_root: Option<PathBuf>,
}

impl Default for IsolationAnalyzer {
    fn default() -> Self {
        Self::new(Some(PathBuf::from(DEFAULT_DEEP_ISOLATION_ROOT)))
    }
}

impl IsolationAnalyzer {
    /// `deep_isolation_root` is relative to the output directory; `None`
    /// disables the second pass
    pub fn new(deep_isolation_root: Option<PathBuf>) -> Self {
        Self {
            deep_isolation_root,
        }
    }

    /// Compute the sorted, deduplicated skip rules for `output_dir`
    ///
    /// All paths must already be absolute and resolved.
    pub fn compute_skip_rules(
        &self,
        output_dir: &Path,
        source_files: &[PathBuf],
        include_paths: &[PathBuf],
    ) -> Vec<SkipRule> {
        let used: Vec<&Path> = source_files
            .iter()
            .chain(include_paths)
            .map(PathBuf::as_path)
            .collect();

        let mut rules = BTreeSet::new();

        for (name, directory) in child_directories(output_dir) {
            if name.starts_with('.') {
                continue;
            }
            if !is_used(&directory, &used) {
                rules.insert(SkipRule::for_directory(Path::new(&name)));
            }
        }

        if let Some(relative_root) = &self.deep_isolation_root {
            let deep_root = output_dir.join(relative_root);
            match deep_root.strip_prefix(output_dir) {
                Ok(relative_root) if deep_root.is_dir() => {
                    for (name, directory) in child_directories(&deep_root) {
                        if !is_used(&directory, &used) {
                            rules.insert(SkipRule::for_directory(&relative_root.join(&name)));
                        }
                    }
                }
                Ok(_) => {
                    debug!(
                        "Deep isolation root {} not present, skipping second pass",
                        deep_root.display()
                    );
                }
                Err(_) => {
                    warn!(
                        "Deep isolation root {} is outside {}, ignoring it",
                        relative_root.display(),
                        output_dir.display()
                    );
                }
            }
        }

        debug!(
            "Computed {} skip rules for {}",
            rules.len(),
            output_dir.display()
        );
        rules.into_iter().collect()
    }
}

/// Immediate child directories of `parent` (following symlinks), by name
fn child_directories(parent: &Path) -> Vec<(String, PathBuf)> {
    let entries = match fs::read_dir(parent) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to list {}: {}", parent.display(), e);
            return Vec::new();
        }
    };

    entries
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Failed to access entry in {}: {}", parent.display(), e);
                None
            }
        })
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .filter_map(|path| {
            let name = path.file_name()?.to_string_lossy().to_string();
            Some((name, path))
        })
        .collect()
}

/// A directory is used when any resolved path lies inside it. Symlinked
/// directories are also checked through their target.
fn is_used(directory: &Path, used: &[&Path]) -> bool {
    let canonical = fs::canonicalize(directory).ok();
    used.iter().any(|path| {
        path.starts_with(directory)
            || canonical
                .as_deref()
                .is_some_and(|target| path.starts_with(target))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::integration::ManifestWorkspace;

    fn patterns(rules: &[SkipRule]) -> Vec<&str> {
        rules.iter().map(SkipRule::pattern).collect()
    }

    #[test]
    fn test_unused_top_level_directories_are_skipped() {
        let workspace = ManifestWorkspace::new().unwrap();
        workspace
            .create_dirs(&["src", "inc", "docs", "tools", ".git", ".cache"])
            .unwrap();

        let rules = IsolationAnalyzer::new(None).compute_skip_rules(
            workspace.path(),
            &[workspace.resolved("src/a.c")],
            &[workspace.resolved("inc")],
        );

        assert_eq!(patterns(&rules), vec!["docs/.*", "tools/.*"]);
    }

    #[test]
    fn test_containment_is_component_wise() {
        let workspace = ManifestWorkspace::new().unwrap();
        workspace.create_dirs(&["lib", "lib2"]).unwrap();

        let rules = IsolationAnalyzer::new(None).compute_skip_rules(
            workspace.path(),
            &[workspace.resolved("lib2/x.c")],
            &[],
        );

        assert_eq!(patterns(&rules), vec!["lib/.*"]);
    }

    #[test]
    fn test_files_in_output_root_are_not_rules() {
        let workspace = ManifestWorkspace::new().unwrap();
        workspace.write_manifest("proj.x2p", "<project/>").unwrap();
        workspace.create_dirs(&["unused"]).unwrap();

        let rules =
            IsolationAnalyzer::new(None).compute_skip_rules(workspace.path(), &[], &[]);

        assert_eq!(patterns(&rules), vec!["unused/.*"]);
    }

    #[test]
    fn test_deep_pass_classifies_topologies() {
        let workspace = ManifestWorkspace::new().unwrap();
        workspace
            .create_dirs(&[
                "adk/src/topologies/tran03h/src",
                "adk/src/topologies/tran05/src",
                "adk/src/topologies/.hidden",
                "adk/src/common",
                "vendor",
            ])
            .unwrap();

        let rules = IsolationAnalyzer::default().compute_skip_rules(
            workspace.path(),
            &[workspace.resolved("adk/src/topologies/tran03h/src/main.c")],
            &[workspace.resolved("adk/src/common")],
        );

        assert_eq!(
            patterns(&rules),
            vec![
                "adk/src/topologies/\\.hidden/.*",
                "adk/src/topologies/tran05/.*",
                "vendor/.*",
            ]
        );
    }

    #[test]
    fn test_missing_deep_root_is_not_an_error() {
        let workspace = ManifestWorkspace::new().unwrap();
        workspace.create_dirs(&["adk/src"]).unwrap();

        let rules = IsolationAnalyzer::default().compute_skip_rules(
            workspace.path(),
            &[workspace.resolved("adk/src/main.c")],
            &[],
        );

        assert!(rules.is_empty());
    }

    #[test]
    fn test_custom_deep_root() {
        let workspace = ManifestWorkspace::new().unwrap();
        workspace
            .create_dirs(&["fw/boards/alpha", "fw/boards/beta"])
            .unwrap();

        let rules = IsolationAnalyzer::new(Some(PathBuf::from("fw/boards"))).compute_skip_rules(
            workspace.path(),
            &[workspace.resolved("fw/boards/alpha/board.c")],
            &[],
        );

        assert_eq!(patterns(&rules), vec!["fw/boards/beta/.*"]);
    }

    #[test]
    fn test_directory_names_are_regex_escaped() {
        let workspace = ManifestWorkspace::new().unwrap();
        workspace.create_dirs(&["third.party", "c++lib"]).unwrap();

        let rules =
            IsolationAnalyzer::new(None).compute_skip_rules(workspace.path(), &[], &[]);

        assert_eq!(patterns(&rules), vec!["c\\+\\+lib/.*", "third\\.party/.*"]);
        let matcher = regex::Regex::new(&rules[1].anchored()).unwrap();
        assert!(matcher.is_match("third.party/x/y.c"));
        assert!(!matcher.is_match("thirdXparty/x/y.c"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directory_used_through_its_target_is_kept() {
        let workspace = ManifestWorkspace::new().unwrap();
        workspace.create_dirs(&["real/src"]).unwrap();
        std::os::unix::fs::symlink(workspace.resolved("real"), workspace.resolved("alias"))
            .unwrap();

        let rules = IsolationAnalyzer::new(None).compute_skip_rules(
            workspace.path(),
            &[workspace.resolved("real/src/a.c")],
            &[],
        );

        assert!(rules.is_empty());
    }

    #[test]
    fn test_rules_are_sorted_and_stable() {
        let workspace = ManifestWorkspace::new().unwrap();
        workspace
            .create_dirs(&["zeta", "alpha", "Mid", "beta"])
            .unwrap();
        let analyzer = IsolationAnalyzer::default();

        let first = analyzer.compute_skip_rules(workspace.path(), &[], &[]);
        let second = analyzer.compute_skip_rules(workspace.path(), &[], &[]);

        assert_eq!(first, second);
        assert_eq!(
            patterns(&first),
            vec!["Mid/.*", "alpha/.*", "beta/.*", "zeta/.*"]
        );
    }

    #[test]
    fn test_anchored_pattern() {
        let rule = SkipRule::for_directory(Path::new("adk/src/topologies/x"));

        assert_eq!(rule.pattern(), "adk/src/topologies/x/.*");
        assert_eq!(rule.anchored(), "^adk/src/topologies/x/.*$");
    }
}
