//! Discovery of function declaration sites in JavaScript sources.
//!
//! This is a line-oriented scanner, not a parser: it recognizes top-level
//! `function` declarations and `const`/`let`/`var` bindings of functions and
//! arrow functions, which is what declaration files of distributed
//! functions contain. Only declarations starting at column 0 count as top
//! level; indented ones are taken to be nested helpers.

use anyhow::{Context, Result};
use distributor_codegen::DeclarationSite;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// File extensions scanned when walking a directory.
pub const SOURCE_EXTENSIONS: &[&str] = &["js", "mjs"];

const FUNCTION_DECLARATION: &str =
    r"^(?:export\s+(?:default\s+)?)?(?:async\s+)?function\s*\*?\s*([A-Za-z_$][\w$]*)\s*\(";
const FUNCTION_BINDING: &str = r"^(?:export\s+)?(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*=\s*(?:async\s+)?(?:function\b|\([^)]*\)\s*=>|[A-Za-z_$][\w$]*\s*=>)";

/// Finds declaration sites in source text.
#[derive(Debug, Clone)]
pub struct SiteScanner {
    patterns: Vec<Regex>,
}

impl SiteScanner {
    /// Creates a scanner with the built-in patterns.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern fails to compile.
    pub fn new() -> Result<Self> {
        let patterns = [FUNCTION_DECLARATION, FUNCTION_BINDING]
            .iter()
            .map(|p| Regex::new(p).with_context(|| format!("invalid site pattern {p}")))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Returns the sites declared in `source`, in line order.
    ///
    /// Each site's origin is `<path>:<line>`.
    ///
    /// # Examples
    ///
    /// ```
    /// use distributor_cli::sites::SiteScanner;
    /// use std::path::Path;
    ///
    /// let scanner = SiteScanner::new()?;
    /// let sites = scanner.scan(
    ///     Path::new("math.js"),
    ///     "export async function add(a, b) {\n  return a + b;\n}\nconst sub = (a, b) => a - b;\n",
    /// );
    ///
    /// let names: Vec<_> = sites.iter().map(|s| s.function.as_str()).collect();
    /// assert_eq!(names, ["add", "sub"]);
    /// assert_eq!(sites[1].origin.as_deref(), Some("math.js:4"));
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    #[must_use]
    pub fn scan(&self, path: &Path, source: &str) -> Vec<DeclarationSite> {
        source
            .lines()
            .enumerate()
            .filter_map(|(index, line)| {
                self.patterns
                    .iter()
                    .find_map(|p| p.captures(line))
                    .and_then(|caps| caps.get(1))
                    .map(|name| {
                        DeclarationSite::new(name.as_str())
                            .with_origin(format!("{}:{}", path.display(), index + 1))
                    })
            })
            .collect()
    }
}

/// Expands `inputs` into the source files to scan.
///
/// Files are taken as given; directories are walked for
/// [`SOURCE_EXTENSIONS`]. Anything under one of `exclude` is skipped, so
/// generated workers are never scanned as sources. The result is sorted
/// and free of duplicates.
///
/// # Errors
///
/// Returns an error if an input does not exist or a directory cannot be
/// walked.
pub fn collect_sources(inputs: &[PathBuf], exclude: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let excluded: Vec<PathBuf> = exclude
        .iter()
        .filter_map(|p| p.canonicalize().ok())
        .collect();
    let is_excluded = |path: &Path| {
        path.canonicalize()
            .is_ok_and(|p| excluded.iter().any(|e| p.starts_with(e)))
    };

    let mut sources = Vec::new();
    for input in inputs {
        if input.is_file() {
            sources.push(input.clone());
            continue;
        }

        if !input.is_dir() {
            anyhow::bail!("source not found: {}", input.display());
        }

        for entry in WalkDir::new(input)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| !is_excluded(e.path()))
        {
            let entry =
                entry.with_context(|| format!("failed to walk {}", input.display()))?;
            if entry.file_type().is_file() && has_source_extension(entry.path()) {
                sources.push(entry.into_path());
            }
        }
    }

    sources.sort();
    sources.dedup();
    debug!("Collected {} source files", sources.len());
    Ok(sources)
}

fn has_source_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}
