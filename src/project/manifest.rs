//! `.x2p` project manifest model and parser
//!
//! A manifest is an XML document of the shape:
//!
//! ```xml
//! <project>
//!   <configurations default="DEBUG">
//!     <configuration name="DEBUG">
//!       <property name="DEFS">FOO BAR=1</property>
//!       <property name="INCPATHS">inc ../common/inc</property>
//!     </configuration>
//!   </configurations>
//!   <group>
//!     <file path="src/a.c"/>
//!   </group>
//! </project>
//! ```
//!
//! Source files are collected from the whole document and are not scoped to a
//! configuration. Everything path-like is resolved relative to the directory
//! containing the manifest.

use std::path::{Path, PathBuf};

use roxmltree::{Document, Node, ParsingOptions};
use tracing::{debug, warn};

use super::error::ManifestError;
use super::paths::{resolve_from_cwd, resolve_path};

/// File extension of project manifests
pub const MANIFEST_EXTENSION: &str = "x2p";

const CONFIGURATIONS_TAG: &str = "configurations";
const CONFIGURATION_TAG: &str = "configuration";
const PROPERTY_TAG: &str = "property";
const FILE_TAG: &str = "file";
const DEFINES_PROPERTY: &str = "DEFS";
const INCLUDE_PATHS_PROPERTY: &str = "INCPATHS";
const SOURCE_EXTENSIONS: [&str; 2] = [".c", ".cpp"];
/// Declared encodings decoded byte-for-byte when the file is not UTF-8
const LATIN1_ENCODINGS: [&str; 5] = ["iso-8859-1", "iso8859-1", "iso_8859-1", "latin1", "l1"];

/// One named build variant of a manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub name: String,
    /// Preprocessor defines as written, e.g. `FOO` or `BAR=1`
    pub defines: Vec<String>,
    /// Absolute, resolved include search paths
    pub include_paths: Vec<PathBuf>,
}

/// Which configuration the caller asked for
///
/// The explicit name wins over the fallback (typically an environment value
/// captured at startup); when both are absent the manifest default applies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSelection {
    pub explicit: Option<String>,
    pub fallback: Option<String>,
}

impl ConfigSelection {
    pub fn new(explicit: Option<String>, fallback: Option<String>) -> Self {
        Self {
            explicit: explicit.filter(|name| !name.is_empty()),
            fallback: fallback.filter(|name| !name.is_empty()),
        }
    }

    /// Select a configuration by name only
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(Some(name.into()), None)
    }

    /// The name requested by the caller, before the manifest default is consulted
    pub fn requested(&self) -> Option<&str> {
        self.explicit.as_deref().or(self.fallback.as_deref())
    }
}

/// Parsed manifest with every configuration it declares
#[derive(Debug, Clone)]
pub struct ProjectManifest {
    /// Absolute, resolved manifest path
    pub path: PathBuf,
    /// Directory all relative manifest paths are resolved against
    pub directory: PathBuf,
    pub default_configuration: Option<String>,
    pub configurations: Vec<Configuration>,
    /// Absolute `.c`/`.cpp` paths in document order
    pub source_files: Vec<PathBuf>,
}

/// Outcome of parsing a manifest and selecting one configuration
#[derive(Debug, Clone)]
pub struct ResolvedManifest {
    pub manifest_path: PathBuf,
    pub manifest_dir: PathBuf,
    pub configuration: Configuration,
    pub source_files: Vec<PathBuf>,
}

/// Load `manifest_path` and resolve the configuration named by `selection`
pub fn parse_manifest(
    manifest_path: &Path,
    selection: &ConfigSelection,
) -> Result<ResolvedManifest, ManifestError> {
    ProjectManifest::load(manifest_path)?.resolve(selection)
}

impl ProjectManifest {
    /// Read and parse the manifest at `path`
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        if !path.exists() {
            return Err(ManifestError::NotFound {
                path: path.to_string_lossy().to_string(),
            });
        }

        let resolved = resolve_from_cwd(path).map_err(|source| ManifestError::Unreadable {
            path: path.to_string_lossy().to_string(),
            source,
        })?;
        let text = std::fs::read(&resolved)
            .and_then(decode_manifest)
            .map_err(|source| ManifestError::Unreadable {
                path: resolved.to_string_lossy().to_string(),
                source,
            })?;

        Self::parse_str(&resolved, &text)
    }

    /// Parse manifest text; `path` must already be absolute and resolved
    pub fn parse_str(path: &Path, text: &str) -> Result<Self, ManifestError> {
        let display_path = path.to_string_lossy().to_string();
        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        let document = Document::parse_with_options(text, options).map_err(|e| ManifestError::Malformed {
            path: display_path.clone(),
            reason: e.to_string(),
        })?;

        let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let root = document.root_element();

        let configurations_node = root
            .children()
            .find(|node| node.has_tag_name(CONFIGURATIONS_TAG))
            .ok_or_else(|| ManifestError::MissingConfigurationsSection {
                path: display_path.clone(),
            })?;

        let default_configuration = configurations_node
            .attribute("default")
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);

        let mut configurations: Vec<Configuration> = Vec::new();
        for node in configurations_node
            .children()
            .filter(|node| node.has_tag_name(CONFIGURATION_TAG))
        {
            let Some(name) = node.attribute("name").filter(|name| !name.is_empty()) else {
                continue;
            };
            if configurations.iter().any(|existing| existing.name == name) {
                warn!(
                    "Duplicate configuration '{}' in {}, keeping the first declaration",
                    name, display_path
                );
                continue;
            }
            configurations.push(parse_configuration(name, node, &directory));
        }

        let source_files = collect_source_files(&document, &directory);

        debug!(
            "Parsed manifest {}: {} configurations, {} source files, default={:?}",
            display_path,
            configurations.len(),
            source_files.len(),
            default_configuration
        );

        Ok(Self {
            path: path.to_path_buf(),
            directory,
            default_configuration,
            configurations,
            source_files,
        })
    }

    /// Names of all declared configurations in document order
    pub fn configuration_names(&self) -> Vec<&str> {
        self.configurations
            .iter()
            .map(|configuration| configuration.name.as_str())
            .collect()
    }

    /// Find a configuration by exact name
    pub fn configuration(&self, name: &str) -> Option<&Configuration> {
        self.configurations
            .iter()
            .find(|configuration| configuration.name == name)
    }

    /// Select the active configuration: explicit name, then fallback, then
    /// the manifest default. A name that matches nothing is an error.
    pub fn resolve(self, selection: &ConfigSelection) -> Result<ResolvedManifest, ManifestError> {
        let requested = selection
            .requested()
            .map(str::to_string)
            .or_else(|| self.default_configuration.clone());

        let available = || {
            self.configuration_names()
                .into_iter()
                .map(str::to_string)
                .collect::<Vec<_>>()
        };

        let Some(name) = requested else {
            return Err(ManifestError::ConfigurationNotFound {
                requested: None,
                available: available(),
            });
        };

        let configuration =
            self.configuration(&name)
                .cloned()
                .ok_or_else(|| ManifestError::ConfigurationNotFound {
                    requested: Some(name.clone()),
                    available: available(),
                })?;

        Ok(ResolvedManifest {
            manifest_path: self.path,
            manifest_dir: self.directory,
            configuration,
            source_files: self.source_files,
        })
    }
}

fn parse_configuration(name: &str, node: Node<'_, '_>, directory: &Path) -> Configuration {
    let mut defines = Vec::new();
    let mut include_paths = Vec::new();

    for property in node
        .children()
        .filter(|child| child.has_tag_name(PROPERTY_TAG))
    {
        let text = property.text().unwrap_or("");
        match property.attribute("name") {
            Some(DEFINES_PROPERTY) => {
                defines = split_tokens(text).map(str::to_string).collect();
            }
            Some(INCLUDE_PATHS_PROPERTY) => {
                include_paths = split_tokens(text)
                    .map(|token| resolve_path(directory, Path::new(token)))
                    .collect();
            }
            _ => {}
        }
    }

    Configuration {
        name: name.to_string(),
        defines,
        include_paths,
    }
}

fn collect_source_files(document: &Document<'_>, directory: &Path) -> Vec<PathBuf> {
    document
        .descendants()
        .filter(|node| node.has_tag_name(FILE_TAG))
        .filter_map(|node| node.attribute("path"))
        .filter(|path| is_source_file(path))
        .map(|path| resolve_path(directory, Path::new(path)))
        .collect()
}

/// Manifest bytes as text: UTF-8, or Latin-1 when the XML declaration says so
fn decode_manifest(bytes: Vec<u8>) -> std::io::Result<String> {
    let bytes = match String::from_utf8(bytes) {
        Ok(text) => return Ok(text),
        Err(e) => e.into_bytes(),
    };

    match declared_encoding(&bytes) {
        Some(encoding) if LATIN1_ENCODINGS.contains(&encoding.to_ascii_lowercase().as_str()) => {
            Ok(bytes.iter().copied().map(char::from).collect())
        }
        declared => Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!(
                "content is not valid UTF-8 and declared encoding {} is not supported",
                declared.as_deref().unwrap_or("<none>")
            ),
        )),
    }
}

/// `encoding` attribute of the XML declaration, if any
fn declared_encoding(bytes: &[u8]) -> Option<String> {
    let end = bytes.windows(2).position(|pair| pair == b"?>")?;
    let declaration = std::str::from_utf8(&bytes[..end]).ok()?;
    let declaration = declaration
        .trim_start_matches('\u{feff}')
        .trim_start()
        .strip_prefix("<?xml")?;

    let value = declaration[declaration.find("encoding")? + "encoding".len()..]
        .trim_start()
        .strip_prefix('=')?
        .trim_start();
    let quote = value.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = &value[1..];
    Some(value[..value.find(quote)?].to_string())
}

fn split_tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split_whitespace().filter(|token| !token.is_empty())
}

fn is_source_file(path: &str) -> bool {
    SOURCE_EXTENSIONS
        .iter()
        .any(|extension| path.ends_with(extension))
}
