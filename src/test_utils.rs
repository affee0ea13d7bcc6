//! Test utilities and global setup
//!
//! Provides centralized test logging configuration and manifest fixtures.

/// Test logging utilities
#[cfg(all(test, feature = "test-logging"))]
pub mod logging {
    use std::sync::Once;
    use tracing_subscriber::{EnvFilter, fmt};

    static INIT: Once = Once::new();

    /// Initialize test logging globally - safe to call multiple times
    ///
    /// Respects `RUST_LOG` and writes through the test writer so output is
    /// captured per test:
    ///
    /// ```bash
    /// RUST_LOG=x2p_clangd_server=trace cargo test --features test-logging
    /// ```
    pub fn init() {
        INIT.call_once(|| {
            let env_filter = EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("debug,tokio=info"));

            fmt()
                .with_env_filter(env_filter)
                .with_test_writer()
                .with_target(true)
                .compact()
                .try_init()
                .ok();
        });
    }
}

/// Install test logging for every test in the invoking module
#[cfg(all(test, feature = "test-logging"))]
#[macro_export]
macro_rules! setup_test_logging {
    () => {
        #[ctor::ctor]
        fn init_test_logging() {
            $crate::test_utils::logging::init();
        }
    };
}

/// Fixtures for tests that need a manifest and an output tree on disk
#[cfg(test)]
pub mod integration {
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    /// Temporary directory that doubles as manifest root and output directory
    pub struct ManifestWorkspace {
        _temp_dir: TempDir, // Underscore prefix keeps it alive until drop
        root: PathBuf,
    }

    impl ManifestWorkspace {
        pub fn new() -> Result<Self, std::io::Error> {
            let temp_dir = TempDir::new()?;
            // Canonical so comparisons line up with resolved manifest paths
            let root = fs::canonicalize(temp_dir.path())?;

            Ok(Self {
                _temp_dir: temp_dir,
                root,
            })
        }

        pub fn path(&self) -> &Path {
            &self.root
        }

        /// Absolute path of `relative` inside the workspace
        pub fn resolved(&self, relative: &str) -> PathBuf {
            if relative.is_empty() {
                self.root.clone()
            } else {
                self.root.join(relative)
            }
        }

        /// Write a manifest, creating parent directories as needed
        pub fn write_manifest(&self, relative: &str, xml: &str) -> Result<PathBuf, std::io::Error> {
            let path = self.root.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, xml)?;
            Ok(path)
        }

        /// Create (possibly nested) directories inside the workspace
        pub fn create_dirs(&self, relatives: &[&str]) -> Result<(), std::io::Error> {
            for relative in relatives {
                fs::create_dir_all(self.root.join(relative))?;
            }
            Ok(())
        }

        /// Move a file's modification time forward by `seconds`
        pub fn bump_mtime(&self, path: &Path, seconds: u64) -> Result<(), std::io::Error> {
            let current = fs::metadata(path)?.modified()?;
            let file = fs::File::options().write(true).open(path)?;
            file.set_modified(current + Duration::from_secs(seconds))
        }

        /// Pin a file's modification time to a fixed instant
        pub fn set_mtime(&self, path: &Path, time: SystemTime) -> Result<(), std::io::Error> {
            let file = fs::File::options().write(true).open(path)?;
            file.set_modified(time)
        }
    }

    /// Builder for manifest XML text
    #[derive(Default)]
    pub struct ManifestBuilder {
        default_configuration: Option<String>,
        configurations: Vec<(String, String, String)>,
        files: Vec<String>,
    }

    impl ManifestBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn default_configuration(mut self, name: &str) -> Self {
            self.default_configuration = Some(name.to_string());
            self
        }

        /// Add a configuration with raw `DEFS` and `INCPATHS` texts
        pub fn configuration(mut self, name: &str, defines: &str, include_paths: &str) -> Self {
            self.configurations.push((
                name.to_string(),
                defines.to_string(),
                include_paths.to_string(),
            ));
            self
        }

        pub fn file(mut self, path: &str) -> Self {
            self.files.push(path.to_string());
            self
        }

        pub fn build(&self) -> String {
            let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<project>\n");
            match &self.default_configuration {
                Some(name) => xml.push_str(&format!("  <configurations default=\"{name}\">\n")),
                None => xml.push_str("  <configurations>\n"),
            }
            for (name, defines, include_paths) in &self.configurations {
                xml.push_str(&format!("    <configuration name=\"{name}\">\n"));
                xml.push_str(&format!(
                    "      <property name=\"DEFS\">{}</property>\n",
                    escape_xml(defines)
                ));
                xml.push_str(&format!(
                    "      <property name=\"INCPATHS\">{}</property>\n",
                    escape_xml(include_paths)
                ));
                xml.push_str("    </configuration>\n");
            }
            xml.push_str("  </configurations>\n  <files>\n");
            for file in &self.files {
                xml.push_str(&format!("    <file path=\"{}\"/>\n", escape_xml(file)));
            }
            xml.push_str("  </files>\n</project>\n");
            xml
        }
    }

    fn escape_xml(text: &str) -> String {
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
    }
}
