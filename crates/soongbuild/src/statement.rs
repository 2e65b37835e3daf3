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

//! Build statements emitted by modules and singletons, and their validation.

use std::collections::HashMap;

use petgraph::{algo::toposort, graph::DiGraph};

use crate::paths::WritablePath;

/// Rule name of phony statements. Their outputs are goal names, not files.
pub const PHONY: &str = "phony";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildStatement {
    pub rule: String,
    pub inputs: Vec<String>,
    pub implicits: Vec<String>,
    pub order_only: Vec<String>,
    pub outputs: Vec<String>,
    pub command: String,
    pub description: String,
    pub restat: bool,
    /// The module variant or singleton that emitted the statement.
    pub owner: String,
}

impl BuildStatement {
    pub fn new(rule: impl Into<String>, command: impl Into<String>) -> Self {
        BuildStatement {
            rule: rule.into(),
            command: command.into(),
            ..Default::default()
        }
    }

    pub fn phony(name: impl Into<String>, deps: Vec<String>) -> Self {
        BuildStatement {
            rule: PHONY.to_string(),
            inputs: deps,
            outputs: vec![name.into()],
            ..Default::default()
        }
    }

    pub fn is_phony(&self) -> bool {
        self.rule == PHONY
    }

    pub fn input(mut self, path: impl Into<String>) -> Self {
        self.inputs.push(path.into());
        self
    }

    pub fn implicit(mut self, path: impl Into<String>) -> Self {
        self.implicits.push(path.into());
        self
    }

    pub fn implicits(mut self, paths: impl IntoIterator<Item = String>) -> Self {
        self.implicits.extend(paths);
        self
    }

    pub fn order_only(mut self, paths: impl IntoIterator<Item = String>) -> Self {
        self.order_only.extend(paths);
        self
    }

    pub fn output(mut self, path: &dyn WritablePath) -> Self {
        self.outputs.push(path.as_str().to_string());
        self
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn restat(mut self) -> Self {
        self.restat = true;
        self
    }

    /// Every file this statement reads.
    pub fn all_inputs(&self) -> impl Iterator<Item = &String> {
        self.inputs
            .iter()
            .chain(self.implicits.iter())
            .chain(self.order_only.iter())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StatementError {
    #[error("multiple statements generate output {output:?}: {first} and {second}")]
    DuplicateOutput {
        output: String,
        first: String,
        second: String,
    },

    #[error("build statements form a cycle through output {0:?}")]
    Cycle(String),
}

/// Checks that every output has exactly one producer and that the statements
/// are acyclic.
pub fn verify_statements(statements: &[BuildStatement]) -> Result<(), StatementError> {
    let mut producer: HashMap<&str, usize> = HashMap::new();
    for (i, stmt) in statements.iter().enumerate() {
        for out in &stmt.outputs {
            if let Some(prev) = producer.insert(out.as_str(), i) {
                return Err(StatementError::DuplicateOutput {
                    output: out.clone(),
                    first: statements[prev].owner.clone(),
                    second: stmt.owner.clone(),
                });
            }
        }
    }

    let mut graph = DiGraph::<usize, ()>::with_capacity(statements.len(), 0);
    let nodes: Vec<_> = (0..statements.len()).map(|i| graph.add_node(i)).collect();
    for (i, stmt) in statements.iter().enumerate() {
        for input in stmt.all_inputs() {
            if let Some(p) = producer.get(input.as_str()) {
                graph.add_edge(nodes[*p], nodes[i], ());
            }
        }
    }
    toposort(&graph, None).map_err(|cycle| {
        let stmt = &statements[graph[cycle.node_id()]];
        StatementError::Cycle(stmt.outputs.first().cloned().unwrap_or_default())
    })?;
    Ok(())
}
