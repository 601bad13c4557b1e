//! `grep`: regex search over a file or directory tree

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use skiff_core::ToolError;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::{Sandbox, ToolParams};

/// What a grep reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrepMode {
    /// Matching lines, with optional context
    Content,
    /// Paths of files with at least one match
    #[default]
    FilesWithMatches,
    /// Match count per file
    Count,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GrepParams {
    pub pattern: String,
    /// File or directory to search; the sandbox root when absent
    #[serde(default)]
    pub path: Option<String>,
    /// Glob filter on file names, e.g. `*.{ts,tsx}`
    #[serde(default)]
    pub include: Option<String>,
    /// Language shorthand (`rust`, `py`, ...) or a bare extension
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub ignore_case: bool,
    #[serde(default)]
    pub mode: GrepMode,
    #[serde(default)]
    pub before: usize,
    #[serde(default)]
    pub after: usize,
    /// Overrides `before` and `after` when non-zero
    #[serde(default)]
    pub context: usize,
    #[serde(default)]
    pub line_number: bool,
    /// Cap on output lines/entries
    #[serde(default, alias = "head_limit")]
    pub count: Option<usize>,
    /// Let patterns span lines; `.` also matches newlines
    #[serde(default)]
    pub multiline: bool,
}

impl ToolParams for GrepParams {
    fn validate(&self) -> Result<(), ToolError> {
        if self.pattern.is_empty() {
            return Err(ToolError::validation("pattern cannot be empty"));
        }
        if self.count == Some(0) {
            return Err(ToolError::validation("count must be at least 1"));
        }
        Ok(())
    }
}

/// Which files a search considers
enum FileFilter {
    All,
    /// `include` glob; patterns with a `/` match the relative path, others
    /// the file name
    Include { set: GlobSet, match_path: bool },
    Extensions(Vec<String>),
}

impl FileFilter {
    fn from_params(params: &GrepParams) -> Result<Self, ToolError> {
        if let Some(include) = &params.include {
            let invalid =
                |e: globset::Error| ToolError::validation(format!("invalid include pattern: {}", e));
            let glob = GlobBuilder::new(include)
                .literal_separator(true)
                .build()
                .map_err(invalid)?;
            let set = GlobSetBuilder::new().add(glob).build().map_err(invalid)?;
            return Ok(FileFilter::Include {
                set,
                match_path: include.contains('/'),
            });
        }

        if let Some(file_type) = &params.file_type {
            return Ok(FileFilter::Extensions(extensions_for(file_type)));
        }

        Ok(FileFilter::All)
    }

    fn accepts(&self, relative: &Path) -> bool {
        match self {
            FileFilter::All => true,
            FileFilter::Include { set, match_path } => {
                if *match_path {
                    set.is_match(relative)
                } else {
                    relative
                        .file_name()
                        .map(|name| set.is_match(name))
                        .unwrap_or(false)
                }
            }
            FileFilter::Extensions(extensions) => relative
                .extension()
                .map(|ext| extensions.iter().any(|e| ext.to_string_lossy() == e.as_str()))
                .unwrap_or(false),
        }
    }
}

fn extensions_for(file_type: &str) -> Vec<String> {
    let known: &[&str] = match file_type {
        "py" => &["py"],
        "js" => &["js"],
        "ts" => &["ts", "tsx"],
        "java" => &["java"],
        "go" => &["go"],
        "rust" => &["rs"],
        "cpp" => &["cpp", "cxx", "cc", "c"],
        "h" => &["h", "hpp"],
        other => return vec![other.trim_start_matches('.').to_string()],
    };
    known.iter().map(|s| s.to_string()).collect()
}

pub fn grep(sandbox: &Sandbox, params: &GrepParams) -> Result<String, ToolError> {
    let requested = params.path.as_deref().unwrap_or(".");
    let base = sandbox.resolve(requested)?;

    let regex = RegexBuilder::new(&params.pattern)
        .case_insensitive(params.ignore_case)
        .multi_line(params.multiline)
        .dot_matches_new_line(params.multiline)
        .build()
        .map_err(|e| ToolError::validation(format!("invalid regex: {}", e)))?;
    let filter = FileFilter::from_params(params)?;

    let files: Box<dyn Iterator<Item = PathBuf> + '_> = if base.is_file() {
        Box::new(std::iter::once(base.clone()))
    } else if base.is_dir() {
        let root = base.clone();
        Box::new(sandbox.files(&base).filter(move |path| {
            path.strip_prefix(&root)
                .map(|relative| filter.accepts(relative))
                .unwrap_or(false)
        }))
    } else {
        return Err(ToolError::NotFound(format!("Path not found: {}", requested)));
    };

    let results = search_files(sandbox, files, &regex, params);
    if results.is_empty() {
        return Ok(format!("No matches found for pattern '{}'", params.pattern));
    }
    Ok(results.join("\n"))
}

/// Search `files` in order, stopping once `count` output entries exist
fn search_files(
    sandbox: &Sandbox,
    files: impl Iterator<Item = PathBuf>,
    regex: &Regex,
    params: &GrepParams,
) -> Vec<String> {
    let (before, after) = if params.context > 0 {
        (params.context, params.context)
    } else {
        (params.before, params.after)
    };

    let mut results: Vec<String> = Vec::new();
    for path in files {
        if params.count.is_some_and(|limit| results.len() >= limit) {
            debug!("Reached the cap of {:?} results, stopping the walk", params.count);
            break;
        }
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };
        let content = String::from_utf8_lossy(&bytes);
        let display = sandbox.relative_display(&path);

        if params.multiline {
            search_whole(regex, &content, &display, params.mode, &mut results);
        } else {
            search_lines(
                regex,
                &content,
                &display,
                params,
                (before, after),
                &mut results,
            );
        }
    }

    if let Some(limit) = params.count {
        results.truncate(limit);
    }
    results
}

fn search_whole(
    regex: &Regex,
    content: &str,
    display: &str,
    mode: GrepMode,
    results: &mut Vec<String>,
) {
    let matches: Vec<&str> = regex.find_iter(content).map(|m| m.as_str()).collect();
    if matches.is_empty() {
        return;
    }
    match mode {
        GrepMode::FilesWithMatches => results.push(display.to_string()),
        GrepMode::Count => results.push(format!("{}: {}", display, matches.len())),
        GrepMode::Content => {
            results.extend(matches.iter().map(|m| format!("{}: {}", display, m)));
        }
    }
}

fn search_lines(
    regex: &Regex,
    content: &str,
    display: &str,
    params: &GrepParams,
    (before, after): (usize, usize),
    results: &mut Vec<String>,
) {
    let lines: Vec<&str> = content.lines().collect();
    let mut total = 0;
    let mut matched_lines = Vec::new();
    for (index, line) in lines.iter().enumerate() {
        let hits = regex.find_iter(line).count();
        if hits > 0 {
            total += hits;
            matched_lines.push(index);
        }
    }
    if matched_lines.is_empty() {
        return;
    }

    match params.mode {
        GrepMode::FilesWithMatches => results.push(display.to_string()),
        GrepMode::Count => results.push(format!("{}: {}", display, total)),
        GrepMode::Content => {
            // line index -> whether it is a match (vs. context)
            let mut shown: BTreeMap<usize, bool> = BTreeMap::new();
            for &index in &matched_lines {
                let start = index.saturating_sub(before);
                let end = (index + after).min(lines.len() - 1);
                for i in start..=end {
                    shown.entry(i).or_insert(false);
                }
                shown.insert(index, true);
            }

            for (index, is_match) in shown {
                let prefix = match (params.line_number, is_match) {
                    (false, _) => String::new(),
                    (true, true) => format!("{}:", index + 1),
                    (true, false) => format!("{}-", index + 1),
                };
                results.push(format!("{}:{}{}", display, prefix, lines[index]));
            }
        }
    }
}
