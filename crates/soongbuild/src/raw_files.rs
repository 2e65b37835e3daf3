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

//! Generated text files, stored once per content hash.
//!
//! Content is written to `out/soong/raw<make_suffix>/<hh>/<hash>` while the
//! graph is built, and a statement copies it to its logical location only
//! when it differs. Files in the raw directory that this run did not write
//! are swept afterwards.

use std::{collections::HashMap, path::Path, sync::Arc};

use anyhow::Context;
use log::{debug, trace};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use soongutil::{
    config::Config,
    once::OnceKey,
};
use walkdir::WalkDir;

use crate::{
    context::BuilderContext,
    paths::{WritablePath, path_for_output},
    statement::BuildStatement,
};

pub const RAW_FILE_COPY: &str = "raw_file_copy";
pub const RAW_FILE_COPY_EXECUTABLE: &str = "raw_file_copy_executable";

static RAW_FILE_SET_KEY: Lazy<OnceKey> = Lazy::new(|| OnceKey::new("raw file set"));

#[derive(Debug, Clone)]
struct RawFileInfo {
    /// Location below the raw directory.
    rel_path: String,
    content_for_tests: Option<String>,
}

/// Hashes written by this run.
#[derive(Default)]
pub struct RawFileSet {
    files: Mutex<HashMap<String, RawFileInfo>>,
}

fn raw_file_set(config: &Config) -> Arc<RawFileSet> {
    config.once().once(&RAW_FILE_SET_KEY, RawFileSet::default)
}

fn raw_dir_name(config: &Config) -> String {
    format!("raw{}", config.make_suffix())
}

/// Writes `content` followed by a newline to `out`.
pub fn write_file_rule(ctx: &mut dyn BuilderContext, out: &dyn WritablePath, content: &str) {
    write_file_rule_impl(ctx, out, content, true, false)
}

/// Writes `content` to `out` as is.
pub fn write_file_rule_verbatim(
    ctx: &mut dyn BuilderContext,
    out: &dyn WritablePath,
    content: &str,
) {
    write_file_rule_impl(ctx, out, content, false, false)
}

pub fn write_executable_file_rule_verbatim(
    ctx: &mut dyn BuilderContext,
    out: &dyn WritablePath,
    content: &str,
) {
    write_file_rule_impl(ctx, out, content, false, true)
}

fn content_hash(content: &str, newline: bool) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    if newline {
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

fn write_file_rule_impl(
    ctx: &mut dyn BuilderContext,
    out: &dyn WritablePath,
    content: &str,
    newline: bool,
    executable: bool,
) {
    let hash = content_hash(content, newline);
    let rel_path = format!("{}/{hash}", &hash[..2]);
    let raw_path = match path_for_output(ctx.config(), &[&raw_dir_name(ctx.config()), &rel_path]) {
        Ok(p) => p,
        Err(e) => {
            ctx.errorf(format!("invalid raw file path: {e}"));
            return;
        }
    };

    let capture = ctx.config().capture_build();
    let info = RawFileInfo {
        rel_path: rel_path.clone(),
        content_for_tests: capture.then(|| {
            let mut c = content.to_string();
            if newline {
                c.push('\n');
            }
            c
        }),
    };

    let first = {
        let set = raw_file_set(ctx.config());
        let mut files = set.files.lock();
        if files.contains_key(&hash) {
            false
        } else {
            files.insert(hash.clone(), info);
            true
        }
    };
    if first && !capture {
        let abs = ctx.config().abs(raw_path.as_str());
        if let Err(e) = write_raw_file(&abs, content, newline) {
            ctx.errorf(format!("failed to write raw file {}: {e:#}", abs.display()));
            return;
        }
    }

    let (rule, command) = if executable {
        (
            RAW_FILE_COPY_EXECUTABLE,
            "if ! cmp -s $in $out; then cp $in $out; fi && chmod +x $out",
        )
    } else {
        (RAW_FILE_COPY, "if ! cmp -s $in $out; then cp $in $out; fi")
    };
    let base = soongutil::path::base(out.as_str()).to_string();
    ctx.build(
        BuildStatement::new(rule, command)
            .input(raw_path.as_str())
            .output(out)
            .description(format!("raw {base}"))
            .restat(),
    );
}

/// An existing raw file is assumed to hold the right content.
fn write_raw_file(abs: &Path, content: &str, newline: bool) -> anyhow::Result<()> {
    if abs.exists() {
        return Ok(());
    }
    let dir = abs.parent().context("raw file has no parent directory")?;
    std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let mut data = content.to_string();
    if newline {
        data.push('\n');
    }
    let tmp = abs.with_extension("tmp");
    std::fs::write(&tmp, data).with_context(|| format!("failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, abs).with_context(|| format!("failed to rename {}", tmp.display()))?;
    trace!("wrote raw file {}", abs.display());
    Ok(())
}

/// The captured content behind a raw file copy statement, when generated
/// files are captured instead of written.
pub fn content_from_file_rule_for_tests(config: &Config, stmt: &BuildStatement) -> Option<String> {
    if stmt.rule != RAW_FILE_COPY && stmt.rule != RAW_FILE_COPY_EXECUTABLE {
        return None;
    }
    let key = soongutil::path::base(stmt.inputs.first()?);
    let set = raw_file_set(config);
    let files = set.files.lock();
    files.get(key)?.content_for_tests.clone()
}

/// Deletes raw files this run did not write, or wrote at another location.
/// Returns the number of deleted files.
pub fn sweep_raw_files(config: &Config) -> anyhow::Result<usize> {
    if config.capture_build() {
        return Ok(0);
    }
    let raw_dir = config.abs(&format!("{}/{}", config.soong_out_dir(), raw_dir_name(config)));
    if !raw_dir.exists() {
        return Ok(0);
    }
    let set = raw_file_set(config);
    let files = set.files.lock();
    let mut removed = 0;
    for entry in WalkDir::new(&raw_dir) {
        let entry = entry.with_context(|| format!("failed to walk {}", raw_dir.display()))?;
        if entry.file_type().is_dir() {
            continue;
        }
        let key = entry.file_name().to_string_lossy().into_owned();
        let rel = entry
            .path()
            .strip_prefix(&raw_dir)
            .with_context(|| format!("{} is outside the raw directory", entry.path().display()))?;
        let rel = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let keep = files.get(&key).is_some_and(|info| info.rel_path == rel);
        if !keep {
            debug!("removing stale raw file {}", entry.path().display());
            std::fs::remove_file(entry.path())
                .with_context(|| format!("failed to remove {}", entry.path().display()))?;
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use super::*;
    use crate::context::test_support::RecordingContext;
    use soongutil::config::{ConfigOptions, ProductVariables};
    use test_log::test;

    use crate::paths::path_for_output;

    #[test]
    fn identical_content_shares_one_raw_file() {
        let config = Config::for_test(ProductVariables::default(), &[] as &[&str]);
        let mut ctx = RecordingContext::new(&config);
        let a = path_for_output(&config, &["a.txt"]).unwrap();
        let b = path_for_output(&config, &["b.txt"]).unwrap();
        write_file_rule(&mut ctx, &a, "hello");
        write_file_rule(&mut ctx, &b, "hello");
        let [sa, sb] = ctx.statements.as_slice() else {
            panic!("expected two statements");
        };
        assert_eq!(sa.inputs, sb.inputs);
        assert!(sa.inputs[0].starts_with("out/soong/raw/"));
        assert!(sa.restat);
        assert_eq!(sa.description, "raw a.txt");
        assert_eq!(
            content_from_file_rule_for_tests(&config, sa).as_deref(),
            Some("hello\n")
        );
    }

    #[test]
    fn newline_changes_the_hash() {
        assert_ne!(content_hash("x", true), content_hash("x", false));
        assert_eq!(content_hash("x\n", false), content_hash("x", true));
    }

    #[test]
    fn executable_copy() {
        let config = Config::for_test(ProductVariables::default(), &[] as &[&str]);
        let mut ctx = RecordingContext::new(&config);
        let out = path_for_output(&config, &["run.sh"]).unwrap();
        write_executable_file_rule_verbatim(&mut ctx, &out, "#!/bin/sh\n");
        assert_eq!(ctx.statements[0].rule, RAW_FILE_COPY_EXECUTABLE);
        assert!(ctx.statements[0].command.ends_with("chmod +x $out"));
    }

    #[test]
    fn sweep_keeps_files_written_this_run() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::new(
            ProductVariables {
                make_suffix: Some("-prod".into()),
                ..Default::default()
            },
            ConfigOptions {
                src_dir: tmp.path().to_path_buf(),
                ..Default::default()
            },
        )
        .unwrap();
        let mut ctx = RecordingContext::new(&config);
        let out = path_for_output(&config, &["kept.txt"]).unwrap();
        write_file_rule(&mut ctx, &out, "kept");

        let raw = tmp.path().join("out/soong/raw-prod");
        let kept = raw.join(ctx.statements[0].inputs[0].trim_start_matches("out/soong/raw-prod/"));
        assert!(kept.exists());

        std::fs::create_dir_all(raw.join("ab")).unwrap();
        std::fs::write(raw.join("ab/abcdef"), "stale").unwrap();
        // The same hash at a different location is stale too.
        let moved = raw.join("zz").join(kept.file_name().unwrap());
        std::fs::create_dir_all(moved.parent().unwrap()).unwrap();
        std::fs::write(&moved, "kept\n").unwrap();
        // Another product's raw directory is left alone.
        let other = tmp.path().join("out/soong/raw-other/ab/abcdef");
        std::fs::create_dir_all(other.parent().unwrap()).unwrap();
        std::fs::write(&other, "other").unwrap();

        assert_eq!(sweep_raw_files(&config).unwrap(), 2);
        assert!(kept.exists());
        assert!(!moved.exists());
        assert!(other.exists());
    }
}
