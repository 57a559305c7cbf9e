//! Repository walk for candidate contract files

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, trace, warn};
use walkdir::{DirEntry, WalkDir};

use oasaudit_core::config::DiscoveryConfig;

use crate::domain::{CandidateFile, ContractFormat};

/// Errors that stop discovery altogether
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("Root path does not exist: {0}")]
    RootNotFound(PathBuf),

    #[error("Root path is not readable: {path}: {message}")]
    RootUnreadable { path: PathBuf, message: String },

    #[error("Invalid glob pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// Walk settings
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub max_file_size: u64,
    pub follow_symlinks: bool,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self::from(&DiscoveryConfig::default())
    }
}

impl From<&DiscoveryConfig> for DiscoveryOptions {
    fn from(config: &DiscoveryConfig) -> Self {
        Self {
            include: config.include.clone(),
            exclude: config.exclude.clone(),
            max_file_size: config.max_file_size_bytes,
            follow_symlinks: config.follow_symlinks,
        }
    }
}

/// Finds `.json`/`.yaml`/`.yml` files under a root in lexicographic path order
pub struct ContractDiscoverer {
    include: Option<GlobSet>,
    exclude: GlobSet,
    max_file_size: u64,
    follow_symlinks: bool,
}

impl ContractDiscoverer {
    pub fn new(options: DiscoveryOptions) -> Result<Self, DiscoveryError> {
        let include = if options.include.is_empty() {
            None
        } else {
            Some(build_globset(&options.include)?)
        };

        Ok(Self {
            include,
            exclude: build_globset(&options.exclude)?,
            max_file_size: options.max_file_size,
            follow_symlinks: options.follow_symlinks,
        })
    }

    /// Walk `root` and return every readable candidate file.
    ///
    /// Only a missing or unreadable root is an error; problems with individual entries are
    /// logged and skipped.
    #[instrument(skip(self), fields(root = %root.display()))]
    pub fn discover(&self, root: &Path) -> Result<Vec<CandidateFile>, DiscoveryError> {
        if !root.exists() {
            return Err(DiscoveryError::RootNotFound(root.to_path_buf()));
        }
        if root.is_dir() {
            fs::read_dir(root).map_err(|e| DiscoveryError::RootUnreadable {
                path: root.to_path_buf(),
                message: e.to_string(),
            })?;
        }

        let mut files = Vec::new();
        let mut excluded = 0usize;
        let mut oversized = 0usize;
        let mut unreadable = 0usize;

        let walker = WalkDir::new(root)
            .follow_links(self.follow_symlinks)
            .into_iter()
            .filter_entry(|entry| {
                let keep = entry.depth() == 0 || !self.is_excluded(root, entry);
                if !keep {
                    trace!(path = %entry.path().display(), "Excluding path");
                    excluded += 1;
                }
                keep
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(DiscoveryError::RootUnreadable {
                        path: root.to_path_buf(),
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable entry");
                    unreadable += 1;
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let Some(format) = path
                .extension()
                .and_then(|e| e.to_str())
                .and_then(ContractFormat::from_extension)
            else {
                continue;
            };

            let relative_path = relative_path(root, path);
            if let Some(include) = &self.include
                && !include.is_match(&relative_path)
            {
                trace!(file = %relative_path, "Not matched by include patterns");
                continue;
            }

            let size = match entry.metadata() {
                Ok(metadata) => metadata.len(),
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Failed to read metadata");
                    unreadable += 1;
                    continue;
                }
            };
            if size > self.max_file_size {
                debug!(
                    file = %relative_path,
                    size,
                    max_file_size = self.max_file_size,
                    "Skipping file - exceeds size limit"
                );
                oversized += 1;
                continue;
            }

            let bytes = match fs::read(path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Failed to read file");
                    unreadable += 1;
                    continue;
                }
            };
            let Some(content) = decode_text(bytes) else {
                debug!(file = %relative_path, "Skipping binary file");
                continue;
            };

            trace!(file = %relative_path, "Found candidate file");
            files.push(CandidateFile {
                path: path.to_path_buf(),
                relative_path,
                format,
                content,
            });
        }

        files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

        debug!(
            candidates = files.len(),
            excluded, oversized, unreadable, "Discovery completed"
        );
        Ok(files)
    }

    fn is_excluded(&self, root: &Path, entry: &DirEntry) -> bool {
        let relative = relative_path(root, entry.path());
        self.exclude.is_match(&relative)
            || entry
                .file_name()
                .to_str()
                .is_some_and(|name| self.exclude.is_match(name))
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, DiscoveryError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| DiscoveryError::InvalidPattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| DiscoveryError::InvalidPattern {
        pattern: patterns.join(", "),
        message: e.to_string(),
    })
}

/// Path relative to `root` with `/` separators; a file root yields its file name
fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let joined = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");

    if joined.is_empty() {
        path.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    } else {
        joined
    }
}

/// UTF-8 text without NUL bytes, BOM stripped
fn decode_text(bytes: Vec<u8>) -> Option<String> {
    if bytes.contains(&0) {
        return None;
    }
    let text = String::from_utf8(bytes).ok()?;
    Some(match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_use_forward_slashes() {
        let root = Path::new("/repo");
        assert_eq!(
            relative_path(root, Path::new("/repo/api/v1/spec.yaml")),
            "api/v1/spec.yaml"
        );
        assert_eq!(
            relative_path(Path::new("/repo/spec.yaml"), Path::new("/repo/spec.yaml")),
            "spec.yaml"
        );
    }

    #[test]
    fn binary_content_is_rejected() {
        assert_eq!(decode_text(vec![b'{', 0, b'}']), None);
        assert_eq!(decode_text(vec![0xff, 0xfe, 0x00]), None);
        assert_eq!(
            decode_text("\u{feff}openapi: 3.0.0".as_bytes().to_vec()).as_deref(),
            Some("openapi: 3.0.0")
        );
    }

    #[test]
    fn invalid_glob_is_reported() {
        let options = DiscoveryOptions {
            exclude: vec!["[".to_string()],
            ..DiscoveryOptions::default()
        };
        assert!(matches!(
            ContractDiscoverer::new(options),
            Err(DiscoveryError::InvalidPattern { .. })
        ));
    }
}
