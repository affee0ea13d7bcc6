use thiserror::Error;

/// Failures while loading a `.x2p` manifest or selecting its configuration
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Manifest file not found: {path}")]
    NotFound { path: String },

    #[error("Failed to read manifest {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed manifest {path}: {reason}")]
    Malformed { path: String, reason: String },

    #[error("No <configurations> section in manifest: {path}")]
    MissingConfigurationsSection { path: String },

    #[error("{}", describe_missing_configuration(.requested.as_deref(), .available))]
    ConfigurationNotFound {
        requested: Option<String>,
        available: Vec<String>,
    },
}

/// Failures while discovering manifests on disk
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Path does not exist: {path}")]
    PathNotFound { path: String },

    #[error("Path is not a directory: {path}")]
    NotADirectory { path: String },
}

fn describe_missing_configuration(requested: Option<&str>, available: &[String]) -> String {
    let available = if available.is_empty() {
        "none declared".to_string()
    } else {
        available.join(", ")
    };
    match requested {
        Some(name) => format!("Configuration '{name}' not found (available: {available})"),
        None => format!(
            "No configuration requested and the manifest declares no default (available: {available})"
        ),
    }
}
