// soong: The module graph engine of the Android platform build.
// Copyright (C) 2024 International Digital Economy Academy
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//
// For inquiries, you can contact us via e-mail at jichuruanjian@idea.edu.cn.

//! Lexical path helpers shared by every path role of the build.
//!
//! All paths handled here are `/`-separated relative strings. Nothing in
//! this module touches the file system.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("Path is outside directory: {0}")]
    OutsideDirectory(String),

    #[error("Path contains invalid character($): {0}")]
    InvalidCharacter(String),
}

/// Lexically cleans a `/`-separated path, resolving `.` and `..` segments
/// and collapsing repeated separators. An empty result becomes `"."`.
pub fn clean(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut out: Vec<&str> = Vec::new();
    // Number of leading `..` that cannot be resolved in a relative path.
    let mut dotdot = 0;
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                if out.len() > dotdot {
                    out.pop();
                } else if !rooted {
                    out.push("..");
                    dotdot += 1;
                }
            }
            _ => out.push(seg),
        }
    }
    let joined = out.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Joins `components` with `/` and cleans the result, skipping empty
/// components.
pub fn join(components: &[&str]) -> String {
    let parts: Vec<&str> = components
        .iter()
        .copied()
        .filter(|c| !c.is_empty())
        .collect();
    clean(&parts.join("/"))
}

/// Validates a path built from trusted internal strings. Only checks that
/// the cleaned path stays inside its root.
pub fn validate_safe_path(components: &[&str]) -> Result<String, PathError> {
    let cleaned = join(components);
    if cleaned.starts_with('/') || cleaned == ".." || cleaned.starts_with("../") {
        return Err(PathError::OutsideDirectory(cleaned));
    }
    Ok(cleaned)
}

/// Validates a path built from user-provided strings. Rejects paths that
/// leave their root and paths containing `$`, which is reserved for build
/// variable expansion.
pub fn validate_path(components: &[&str]) -> Result<String, PathError> {
    if let Some(bad) = components.iter().find(|c| c.contains('$')) {
        return Err(PathError::InvalidCharacter((*bad).to_string()));
    }
    validate_safe_path(components)
}

/// Parses a module reference: `:name`, `:name{tag}`, or the fully
/// qualified `//dir:name{tag}` (also spelled `://dir:name{tag}`).
///
/// Returns `None` for literal paths. A tag that is never closed is part of
/// the module name.
pub fn src_is_module_with_tag(s: &str) -> Option<(&str, &str)> {
    let module = match s.strip_prefix(':') {
        Some("") => return None,
        Some(m) => m,
        None if s.starts_with("//") => s,
        None => return None,
    };
    let (name, tag) = match module.find('{') {
        Some(open) if open > 0 && module.ends_with('}') => {
            (&module[..open], &module[open + 1..module.len() - 1])
        }
        _ => (module, ""),
    };
    if name.starts_with("//") && split_qualified_name(name).is_none() {
        return None;
    }
    Some((name, tag))
}

/// Splits `//dir:name` into `(dir, name)`. The root directory is `"."`.
pub fn split_qualified_name(s: &str) -> Option<(&str, &str)> {
    let rest = s.strip_prefix("//")?;
    let (dir, name) = rest.split_once(':')?;
    if name.is_empty() || name.contains(':') {
        return None;
    }
    Some((if dir.is_empty() { "." } else { dir }, name))
}

/// Returns `true` if `s` is a module reference rather than a literal path.
pub fn src_is_module(s: &str) -> bool {
    src_is_module_with_tag(s).is_some()
}

/// Returns the directory part of a `/`-separated path, or `"."` when the path
/// has a single component.
pub fn dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(i) => &path[..i],
        None => ".",
    }
}

/// Returns the last component of a `/`-separated path.
pub fn base(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(i) => &trimmed[i + 1..],
        None => trimmed,
    }
}

/// Returns `true` if `path` is `dir` or lies below it. `"."` contains every
/// relative path.
pub fn is_under(path: &str, dir: &str) -> bool {
    dir == "." || path == dir || path.strip_prefix(dir).is_some_and(|r| r.starts_with('/'))
}

/// Iterates `dir` and its ancestors, ending with `"."`.
pub fn ancestors(dir: &str) -> impl Iterator<Item = &str> {
    let mut next = Some(if dir.is_empty() { "." } else { dir });
    std::iter::from_fn(move || {
        let cur = next?;
        next = if cur == "." || cur == "/" {
            None
        } else {
            Some(self::dir(cur))
        };
        Some(cur)
    })
}
