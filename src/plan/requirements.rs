//! Dependency manifest parsing
//!
//! Reads a pip-style requirements file into an ordered list of
//! declarations. Constraint syntax is left to the installer; parsing only
//! needs enough structure to count requirements, follow `-r`/`-c`
//! includes and reject lines the installer could never accept.

use crate::error::{StagecraftError, StagecraftResult};
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::path::{Component, Path, PathBuf};

/// A single requirement such as `uvicorn[standard]>=0.24`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Requirement {
    /// Project name as written
    pub name: String,
    /// Extras inside `[...]`
    pub extras: Vec<String>,
    /// Everything after the name and extras (version specifiers, markers, `@ url`)
    pub constraint: Option<String>,
    /// 1-based line number of the declaration
    pub line: usize,
}

/// Kind of nested manifest reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IncludeKind {
    /// `-r` / `--requirement`
    Requirement,
    /// `-c` / `--constraint`
    Constraint,
}

/// One logical line of a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ManifestLine {
    Requirement(Requirement),
    Include { include: IncludeKind, path: String },
    /// A direct URL or VCS reference
    Url { url: String },
    /// Installer options such as `--index-url` or `-e .`
    Option { text: String },
}

/// One manifest file, relative to the project directory
#[derive(Debug, Clone, Serialize)]
pub struct ManifestFile {
    pub path: PathBuf,
    pub lines: Vec<ManifestLine>,
    #[serde(skip)]
    pub content: String,
}

/// The root manifest plus every file it includes, root first
#[derive(Debug, Clone, Serialize)]
pub struct DependencyManifest {
    files: Vec<ManifestFile>,
}

impl DependencyManifest {
    /// Load `manifest` (relative to `project_dir`) and all of its includes.
    pub async fn load(project_dir: &Path, manifest: &Path) -> StagecraftResult<Self> {
        let root = normalize_relative(manifest).ok_or_else(|| StagecraftError::ManifestInvalid {
            path: manifest.to_path_buf(),
            reason: "manifest must be a relative path inside the project".to_string(),
        })?;

        let mut files = Vec::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([root]);

        while let Some(rel) = queue.pop_front() {
            if !seen.insert(rel.clone()) {
                continue;
            }

            let full = project_dir.join(&rel);
            let content = tokio::fs::read_to_string(&full).await.map_err(|e| {
                StagecraftError::ManifestInvalid {
                    path: rel.clone(),
                    reason: format!("cannot read {}: {}", full.display(), e),
                }
            })?;

            let lines = parse_manifest(&rel, &content)?;
            let base = rel.parent().map(Path::to_path_buf).unwrap_or_default();

            for line in &lines {
                if let ManifestLine::Include { path, .. } = line {
                    let nested = normalize_relative(&base.join(path)).ok_or_else(|| {
                        StagecraftError::ManifestInvalid {
                            path: rel.clone(),
                            reason: format!("include {} escapes the project directory", path),
                        }
                    })?;
                    queue.push_back(nested);
                }
            }

            files.push(ManifestFile {
                path: rel,
                lines,
                content,
            });
        }

        Ok(Self { files })
    }

    /// Build a single-file manifest from text; includes are not followed
    pub fn parse_str(path: impl Into<PathBuf>, content: &str) -> StagecraftResult<Self> {
        let path = path.into();
        let lines = parse_manifest(&path, content)?;
        Ok(Self {
            files: vec![ManifestFile {
                path,
                lines,
                content: content.to_string(),
            }],
        })
    }

    /// Path of the root manifest relative to the project directory
    pub fn path(&self) -> &Path {
        &self.files[0].path
    }

    /// Root manifest first, then included files in discovery order
    pub fn files(&self) -> &[ManifestFile] {
        &self.files
    }

    /// All requirement declarations across every file, in order
    pub fn requirements(&self) -> impl Iterator<Item = &Requirement> {
        self.files.iter().flat_map(|f| {
            f.lines.iter().filter_map(|line| match line {
                ManifestLine::Requirement(req) => Some(req),
                _ => None,
            })
        })
    }

    /// True when nothing would be installed
    pub fn is_empty(&self) -> bool {
        self.files.iter().all(|f| {
            f.lines
                .iter()
                .all(|line| matches!(line, ManifestLine::Include { .. } | ManifestLine::Option { .. }))
        })
    }
}

/// Parse the text of one manifest file.
pub fn parse_manifest(path: &Path, content: &str) -> StagecraftResult<Vec<ManifestLine>> {
    let mut lines = Vec::new();
    let mut pending = String::new();
    let mut start_line = 0;

    for (idx, raw) in content.lines().enumerate() {
        if pending.is_empty() {
            start_line = idx + 1;
        }

        if let Some(stripped) = raw.strip_suffix('\\') {
            pending.push_str(stripped);
            pending.push(' ');
            continue;
        }
        pending.push_str(raw);

        let logical = strip_comment(&pending).trim().to_string();
        pending.clear();

        if logical.is_empty() {
            continue;
        }

        let parsed = parse_line(&logical, start_line).map_err(|reason| {
            StagecraftError::ManifestInvalid {
                path: path.to_path_buf(),
                reason: format!("line {}: {}", start_line, reason),
            }
        })?;
        lines.push(parsed);
    }

    // A trailing continuation still forms a line
    let logical = strip_comment(&pending).trim().to_string();
    if !logical.is_empty() {
        let parsed = parse_line(&logical, start_line).map_err(|reason| {
            StagecraftError::ManifestInvalid {
                path: path.to_path_buf(),
                reason: format!("line {}: {}", start_line, reason),
            }
        })?;
        lines.push(parsed);
    }

    Ok(lines)
}

/// Remove a `#` comment that starts a line or follows whitespace
fn strip_comment(line: &str) -> &str {
    if line.trim_start().starts_with('#') {
        return "";
    }
    let bytes = line.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'#' && i > 0 && bytes[i - 1].is_ascii_whitespace() {
            return &line[..i];
        }
    }
    line
}

fn parse_line(line: &str, number: usize) -> Result<ManifestLine, String> {
    if line.starts_with('-') {
        return parse_option(line);
    }

    if line.contains("://") && !line.contains(" @ ") {
        return Ok(ManifestLine::Url {
            url: line.to_string(),
        });
    }

    parse_requirement(line, number).map(ManifestLine::Requirement)
}

fn parse_option(line: &str) -> Result<ManifestLine, String> {
    const INCLUDES: [(&str, &str, IncludeKind); 2] = [
        ("-r", "--requirement", IncludeKind::Requirement),
        ("-c", "--constraint", IncludeKind::Constraint),
    ];

    for (short, long, kind) in INCLUDES {
        let rest = if let Some(rest) = line.strip_prefix(long) {
            rest.strip_prefix('=').unwrap_or(rest)
        } else if let Some(rest) = line.strip_prefix(short) {
            rest
        } else {
            continue;
        };

        // `--requirements-foo` style flags are not includes
        if line.starts_with(long) && !rest.is_empty() && !line[long.len()..].starts_with(['=', ' ', '\t']) {
            continue;
        }

        let target = rest.trim();
        if target.is_empty() {
            return Err(format!("{} requires a file", long));
        }
        return Ok(ManifestLine::Include {
            include: kind,
            path: target.to_string(),
        });
    }

    Ok(ManifestLine::Option {
        text: line.to_string(),
    })
}

fn parse_requirement(line: &str, number: usize) -> Result<Requirement, String> {
    let name_end = line
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
        .unwrap_or(line.len());
    let name = &line[..name_end];

    if name.is_empty() || !name.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        return Err(format!("invalid requirement {:?}", line));
    }

    let mut rest = line[name_end..].trim_start();
    let mut extras = Vec::new();

    if let Some(after) = rest.strip_prefix('[') {
        let close = after
            .find(']')
            .ok_or_else(|| format!("unclosed extras in {:?}", line))?;
        extras = after[..close]
            .split(',')
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string)
            .collect();
        rest = after[close + 1..].trim_start();
    }

    if let Some(first) = rest.chars().next() {
        if !matches!(first, '<' | '>' | '=' | '!' | '~' | ';' | '@' | '(' | ',') {
            return Err(format!("unexpected {:?} after {}", first, name));
        }
    }

    Ok(Requirement {
        name: name.to_string(),
        extras,
        constraint: (!rest.is_empty()).then(|| rest.to_string()),
        line: number,
    })
}

/// Normalize a relative path, refusing absolute paths and `..` escapes
fn normalize_relative(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    (!out.as_os_str().is_empty()).then_some(out)
}
