//! @ai:module:intent Discover source files under a root and scan them in parallel
//! @ai:module:layer application
//! @ai:module:public_api SourceFile, discover_files, extract_project, extract_project_with_cancel, scan_path
//! @ai:module:depends_on extractor, language, config, model, error
//! @ai:module:stateless true

use crate::config::{Config, ScanConfig};
use crate::error::{Error, Result};
use crate::extractor::{extract_bytes, ScanOptions};
use crate::language::ProfileRegistry;
use crate::model::{FileAnnotations, FileError, ProjectAnnotations};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// @ai:intent A file selected for scanning and the language it was detected as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// `None` means the permissive fallback profile applies.
    pub language: Option<String>,
}

fn is_excluded(entry: &DirEntry, exclude: &[String]) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| exclude.iter().any(|x| x == name))
}

/// @ai:intent List scannable files under `root`, sorted by path
/// @ai:pre root exists
/// @ai:post a file root yields exactly that file, even with no known language
/// @ai:post directories named in `scan.exclude` are not descended into
/// @ai:effects fs:read
pub fn discover_files(
    root: &Path,
    registry: &ProfileRegistry,
    scan: &ScanConfig,
) -> Result<Vec<SourceFile>> {
    let metadata = std::fs::metadata(root).map_err(|e| Error::FileRead {
        path: root.to_path_buf(),
        source: e,
    })?;

    if metadata.is_file() {
        return Ok(vec![SourceFile {
            path: root.to_path_buf(),
            language: registry.detect(root).map(|e| e.name.clone()),
        }]);
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(scan.follow_links)
        .into_iter()
        .filter_entry(|e| !is_excluded(e, &scan.exclude));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.into_path();
        match registry.detect(&path) {
            Some(language) => files.push(SourceFile {
                language: Some(language.name.clone()),
                path,
            }),
            None if scan.include_unknown => files.push(SourceFile {
                path,
                language: None,
            }),
            None => {}
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    debug!(root = %root.display(), files = files.len(), "discovered files");
    Ok(files)
}

fn scan_one(
    file: &SourceFile,
    registry: &ProfileRegistry,
    options: ScanOptions,
) -> std::result::Result<FileAnnotations, FileError> {
    let result = std::fs::read(&file.path)
        .map_err(|e| Error::FileRead {
            path: file.path.clone(),
            source: e,
        })
        .and_then(|bytes| {
            extract_bytes(
                &file.path,
                file.language.as_deref(),
                &bytes,
                registry,
                options,
            )
        });

    result.map_err(|e| {
        warn!(file = %file.path.display(), error = %e, "file skipped");
        FileError {
            path: file.path.clone(),
            message: e.to_string(),
        }
    })
}

/// @ai:intent Scan files in parallel and aggregate the results
/// @ai:pre threads == 0 uses the global rayon pool
/// @ai:effects fs:read
pub fn extract_project(
    files: &[SourceFile],
    registry: &ProfileRegistry,
    options: ScanOptions,
    threads: usize,
) -> Result<ProjectAnnotations> {
    extract_project_with_cancel(files, registry, options, threads, &AtomicBool::new(false))
}

/// @ai:intent Scan files in parallel, stopping early when `cancel` is raised
/// @ai:post Err(Cancelled) if `cancel` was set at any point; no partial result
/// @ai:post unreadable or undecodable files become FileError entries
/// @ai:effects fs:read
pub fn extract_project_with_cancel(
    files: &[SourceFile],
    registry: &ProfileRegistry,
    options: ScanOptions,
    threads: usize,
    cancel: &AtomicBool,
) -> Result<ProjectAnnotations> {
    let run = || -> Vec<Option<std::result::Result<FileAnnotations, FileError>>> {
        files
            .par_iter()
            .map(|file| {
                if cancel.load(Ordering::Relaxed) {
                    return None;
                }
                Some(scan_one(file, registry, options))
            })
            .collect()
    };

    let outcomes = if threads > 0 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()?;
        pool.install(run)
    } else {
        run()
    };

    if cancel.load(Ordering::Relaxed) {
        info!(files = files.len(), "scan cancelled");
        return Err(Error::Cancelled);
    }

    let mut scanned = Vec::with_capacity(outcomes.len());
    let mut errors = Vec::new();
    for outcome in outcomes.into_iter().flatten() {
        match outcome {
            Ok(file) => scanned.push(file),
            Err(error) => errors.push(error),
        }
    }

    let project = ProjectAnnotations::new(scanned, errors);
    info!(
        files = project.files().len(),
        errors = project.errors().len(),
        annotations = project.annotation_count(),
        diagnostics = project.diagnostic_count(),
        "scan complete"
    );
    Ok(project)
}

/// @ai:intent Discover and scan everything under `root` using a configuration
/// @ai:effects fs:read
pub fn scan_path(root: &Path, config: &Config) -> Result<ProjectAnnotations> {
    let registry = config.registry();
    let files = discover_files(root, &registry, &config.scan)?;
    extract_project(
        &files,
        &registry,
        config.scan.scan_options(),
        config.scan.threads,
    )
}
