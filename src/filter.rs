//! Entry filtering
//!
//! Two independent filters decide what a walk reports:
//! - [`ExclusionFilter`]: case-insensitive globs over the absolute path. A
//!   match on a directory prunes the whole subtree.
//! - [`ExtensionFilter`]: case-insensitive allow-list for leaf files. It never
//!   prunes directories.
//!
//! [`FilterSet`] combines them (exclusion first) with the optional hidden
//! entry rule.

use crate::error::ConfigError;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::ffi::OsString;
use std::path::Path;

/// Compiled exclusion globs.
///
/// `*` stays within one path segment and `**` spans any number of segments.
/// A pattern without any `/` is also tried against the entry's file name, so
/// `*.tmp` excludes temporary files at any depth.
#[derive(Debug, Clone)]
pub struct ExclusionFilter {
    full: GlobSet,
    name: GlobSet,
}

impl ExclusionFilter {
    /// Compile `patterns`; any malformed glob rejects the whole request
    pub fn new(patterns: &[String]) -> Result<Self, ConfigError> {
        let mut full = GlobSetBuilder::new();
        let mut name = GlobSetBuilder::new();

        for pattern in patterns {
            let glob = GlobBuilder::new(pattern)
                .case_insensitive(true)
                .literal_separator(true)
                .build()
                .map_err(|e| ConfigError::InvalidExcludePattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })?;
            if !pattern.contains('/') {
                name.add(glob.clone());
            }
            full.add(glob);
        }

        let build = |builder: GlobSetBuilder| {
            builder
                .build()
                .map_err(|e| ConfigError::InvalidExcludePattern {
                    pattern: patterns.join(", "),
                    reason: e.to_string(),
                })
        };

        Ok(Self {
            full: build(full)?,
            name: build(name)?,
        })
    }

    /// Check if no patterns are configured
    pub fn is_empty(&self) -> bool {
        self.full.is_empty()
    }

    /// Check if `path` survives the exclusion patterns
    pub fn accepts(&self, path: &Path, is_dir: bool) -> bool {
        !self.is_excluded(path, is_dir)
    }

    /// Check if `path` matches any exclusion pattern.
    ///
    /// Directories are also tested with a trailing separator so that
    /// `**/raw/**` prunes `raw` itself rather than each of its children.
    pub fn is_excluded(&self, path: &Path, is_dir: bool) -> bool {
        if self.is_empty() {
            return false;
        }

        if self.full.is_match(path) {
            return true;
        }

        if let Some(file_name) = path.file_name() {
            if !self.name.is_empty() && self.name.is_match(file_name) {
                return true;
            }
        }

        if is_dir {
            let mut with_sep = OsString::from(path.as_os_str());
            with_sep.push("/");
            return self.full.is_match(Path::new(&with_sep));
        }

        false
    }
}

/// Case-insensitive extension allow-list. Empty means "accept everything".
#[derive(Debug, Clone, Default)]
pub struct ExtensionFilter(Vec<String>);

impl ExtensionFilter {
    /// Extensions may be given with or without the leading `.`
    pub fn new(extensions: &[String]) -> Self {
        let mut normalized: Vec<String> = extensions
            .iter()
            .map(|ext| ext.strip_prefix('.').unwrap_or(ext).to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        normalized.sort();
        normalized.dedup();
        Self(normalized)
    }

    /// Check if no extensions are configured
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check if the file at `path` has an allowed extension
    pub fn accepts(&self, path: &Path) -> bool {
        self.0.is_empty()
            || path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| self.0.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }
}

/// All filters applied during a walk
#[derive(Debug, Clone)]
pub struct FilterSet {
    exclusion: ExclusionFilter,
    extensions: ExtensionFilter,
    skip_hidden: bool,
}

impl FilterSet {
    /// Combine compiled filters
    pub fn new(exclusion: ExclusionFilter, extensions: ExtensionFilter, skip_hidden: bool) -> Self {
        Self {
            exclusion,
            extensions,
            skip_hidden,
        }
    }

    /// Compile filters from raw request values
    pub fn compile(
        exclusion_patterns: &[String],
        extensions: &[String],
        skip_hidden: bool,
    ) -> Result<Self, ConfigError> {
        Ok(Self::new(
            ExclusionFilter::new(exclusion_patterns)?,
            ExtensionFilter::new(extensions),
            skip_hidden,
        ))
    }

    /// A filter set that accepts everything
    pub fn accept_all() -> Self {
        Self::new(ExclusionFilter::empty(), ExtensionFilter::default(), false)
    }

    /// Check if an explicitly requested root should be walked. The hidden
    /// rule only applies to discovered entries.
    pub fn accepts_root(&self, path: &Path, is_dir: bool) -> bool {
        if is_dir {
            self.exclusion.accepts(path, true)
        } else {
            self.exclusion.accepts(path, false) && self.extensions.accepts(path)
        }
    }

    /// Check if a directory should be descended into
    pub fn accepts_dir(&self, path: &Path) -> bool {
        !(self.skip_hidden && is_hidden(path)) && self.exclusion.accepts(path, true)
    }

    /// Check if a file should be reported. Exclusion is evaluated first.
    pub fn accepts_file(&self, path: &Path) -> bool {
        !(self.skip_hidden && is_hidden(path))
            && self.exclusion.accepts(path, false)
            && self.extensions.accepts(path)
    }
}

impl ExclusionFilter {
    /// A filter with no patterns
    pub fn empty() -> Self {
        Self {
            full: GlobSet::empty(),
            name: GlobSet::empty(),
        }
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}
