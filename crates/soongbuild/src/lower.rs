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

//! Lowers verified [`BuildStatement`]s into `n2`'s build graph.
//!
//! Commands are stored with `$in` and `$out` placeholders. They are expanded
//! here, since the n2 graph holds final command lines.

use std::{path::PathBuf, rc::Rc};

use log::{debug, info};
use n2::graph::{Build, BuildIns, BuildOuts, FileId, FileLoc, Graph as N2Graph};
use tracing::{Level, instrument};

use crate::statement::BuildStatement;

#[derive(Debug, thiserror::Error)]
pub enum LoweringError {
    #[error(
        "An error was reported by n2 (the build graph executor), \
        when lowering the statement of {owner} producing {output:?}"
    )]
    N2 {
        owner: String,
        output: String,
        source: anyhow::Error,
    },
}

fn register_file(graph: &mut N2Graph, path: &str) -> FileId {
    graph.files.id_from_canonical(path.to_string())
}

/// Inputs in n2's layout: explicit, then implicit, then order-only.
fn build_ins(graph: &mut N2Graph, stmt: &BuildStatement) -> BuildIns {
    let ids: Vec<FileId> = stmt
        .all_inputs()
        .map(|p| register_file(graph, p))
        .collect();
    BuildIns {
        ids,
        explicit: stmt.inputs.len(),
        implicit: stmt.implicits.len(),
        order_only: stmt.order_only.len(),
    }
}

fn build_outs(graph: &mut N2Graph, stmt: &BuildStatement) -> BuildOuts {
    let ids: Vec<FileId> = stmt
        .outputs
        .iter()
        .map(|p| register_file(graph, p))
        .collect();
    BuildOuts {
        explicit: ids.len(),
        ids,
    }
}

fn build_n2_fileloc(owner: &str) -> FileLoc {
    FileLoc {
        filename: Rc::new(PathBuf::from(owner)),
        line: 0,
    }
}

fn quote_all(paths: &[String]) -> String {
    shlex::try_join(paths.iter().map(String::as_str))
        .unwrap_or_else(|_| paths.join(" "))
}

/// Substitutes `$out` with the outputs and `$in` with the explicit inputs.
pub fn expand_command(stmt: &BuildStatement) -> String {
    stmt.command
        .replace("$out", &quote_all(&stmt.outputs))
        .replace("$in", &quote_all(&stmt.inputs))
}

/// Adds one n2 build per statement. Phony statements get no command line.
#[instrument(level = Level::DEBUG, skip_all)]
pub fn lower_to_n2(statements: &[BuildStatement]) -> Result<N2Graph, LoweringError> {
    info!("Starting lowering of {} build statements to n2 graph", statements.len());
    let mut graph = N2Graph::default();
    for stmt in statements {
        let ins = build_ins(&mut graph, stmt);
        let outs = build_outs(&mut graph, stmt);
        let mut build = Build::new(build_n2_fileloc(&stmt.owner), ins, outs);
        if !stmt.is_phony() {
            build.cmdline = Some(expand_command(stmt));
            if !stmt.description.is_empty() {
                build.desc = Some(stmt.description.clone());
            }
        }
        graph.add_build(build).map_err(|e| LoweringError::N2 {
            owner: stmt.owner.clone(),
            output: stmt.outputs.first().cloned().unwrap_or_default(),
            source: e,
        })?;
    }
    debug!(
        "{} of them phony",
        statements.iter().filter(|s| s.is_phony()).count()
    );
    info!("Build statements lowered to n2 graph");
    Ok(graph)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use super::*;
    use expect_test::expect;
    use test_log::test;

    fn cp(input: &str, output: &str) -> BuildStatement {
        BuildStatement {
            rule: "cp".into(),
            inputs: vec![input.into()],
            outputs: vec![output.into()],
            command: "rm -f $out && cp -f $in $out".into(),
            description: format!("install {output}"),
            owner: "foo".into(),
            ..Default::default()
        }
    }

    #[test]
    fn placeholders_are_expanded_and_quoted() {
        let stmt = cp("src/a b.txt", "out/x.txt");
        expect![[r#"rm -f out/x.txt && cp -f 'src/a b.txt' out/x.txt"#]]
            .assert_eq(&expand_command(&stmt));
    }

    #[test]
    fn statements_become_builds() {
        let stmts = vec![
            cp("src/a.txt", "out/a.txt"),
            BuildStatement::phony("droid", vec!["out/a.txt".into()]),
        ];
        let graph = lower_to_n2(&stmts).unwrap();

        let out = graph.files.lookup("out/a.txt").unwrap();
        let bid = graph.files.by_id.lookup(out).unwrap().input.unwrap();
        let build = graph.builds.lookup(bid).unwrap();
        assert_eq!(
            build.cmdline.as_deref(),
            Some("rm -f out/a.txt && cp -f src/a.txt out/a.txt")
        );
        assert_eq!(build.desc.as_deref(), Some("install out/a.txt"));

        let droid = graph.files.lookup("droid").unwrap();
        let bid = graph.files.by_id.lookup(droid).unwrap().input.unwrap();
        assert!(graph.builds.lookup(bid).unwrap().cmdline.is_none());
    }
}
