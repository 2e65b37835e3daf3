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

//! Builds small module graphs in memory for tests.
//!
//! ```ignore
//! let result = TestFixture::new()
//!     .with_files(&["a.conf"])
//!     .with_module("Android.bp", "prebuilt_etc", r#"{"name": "a.conf", "src": "a.conf"}"#)
//!     .run()?;
//! ```

use std::sync::Arc;

use soongutil::config::{Config, ProductVariables};

use crate::{
    entry::{BuildOptionsBuilder, BuildOutput, Registry, run_build},
    error::BuildFailed,
    graph::ModuleGraph,
    model::{Phase, VariantId},
    module::Module,
    mutator::{RegisterFn, RegisterMutatorsContext},
    packaging::INSTALL_FILES_PROVIDER,
    provider::{OUTPUT_FILES_PROVIDER, ProviderKey},
    raw_files::content_from_file_rule_for_tests,
    statement::BuildStatement,
};

/// Source files, module declarations and product variables of a test build.
#[derive(Default)]
pub struct TestFixture {
    files: Vec<String>,
    modules: Vec<String>,
    variables: ProductVariables,
    kati: bool,
    mutators: Vec<(Phase, Box<RegisterFn>)>,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds files to the mock source tree.
    pub fn with_files(mut self, files: &[&str]) -> Self {
        self.files.extend(files.iter().map(|f| f.to_string()));
        self
    }

    /// Declares a module in `bp_file`. `props` is a JSON object.
    pub fn with_module(mut self, bp_file: &str, module_type: &str, props: &str) -> Self {
        self.modules.push(format!(
            r#"{{"type": {}, "file": {}, "props": {props}}}"#,
            serde_json::Value::from(module_type),
            serde_json::Value::from(bp_file),
        ));
        self
    }

    pub fn with_variables(mut self, variables: ProductVariables) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_kati(mut self) -> Self {
        self.kati = true;
        self
    }

    /// Registers extra passes in `phase`, after the framework passes.
    pub fn with_mutators<F>(mut self, phase: Phase, register: F) -> Self
    where
        F: Fn(&mut RegisterMutatorsContext) + Send + Sync + 'static,
    {
        self.mutators.push((phase, Box::new(register)));
        self
    }

    pub fn run(self) -> Result<TestResult, BuildFailed> {
        let config = Config::for_test(self.variables, &self.files).with_kati_enabled(self.kati);
        let options = BuildOptionsBuilder::default()
            .blueprints(format!("[{}]", self.modules.join(",\n")))
            .config(config)
            .build()
            .map_err(|e| BuildFailed::Other(anyhow::Error::new(e)))?;
        let mut registry = Registry::with_defaults();
        for (phase, register) in self.mutators {
            registry.register_mutators(phase, register);
        }
        let output = run_build(&registry, options)?;
        Ok(TestResult { output })
    }

    /// Runs the build and returns its diagnostics, one per line.
    ///
    /// # Panics
    ///
    /// Panics when the build succeeds.
    pub fn run_expecting_errors(self) -> String {
        match self.run() {
            Ok(_) => panic!("build succeeded, expected errors"),
            Err(e) => e.to_string(),
        }
    }
}

/// A successful test build.
pub struct TestResult {
    output: BuildOutput,
}

impl TestResult {
    pub fn output(&self) -> &BuildOutput {
        &self.output
    }

    pub fn graph(&self) -> &ModuleGraph {
        &self.output.graph
    }

    /// # Panics
    ///
    /// Panics when the module has no such variant.
    pub fn variant(&self, name: &str, variant: &str) -> VariantId {
        match self.output.graph.find_variant(name, variant) {
            Some(id) => id,
            None => panic!(
                "no variant {variant:?} of {name:?}, have {:?}",
                self.variants(name)
            ),
        }
    }

    /// Variant subdirectories of `name`, in creation order.
    pub fn variants(&self, name: &str) -> Vec<String> {
        let graph = &self.output.graph;
        graph
            .group_by_name(name)
            .map(|g| g.variants().iter().map(|v| graph.node(*v).variant().subdir()).collect())
            .unwrap_or_default()
    }

    /// Runs `f` on the module of a variant, if it is a `T`.
    pub fn module<T: Module, R>(
        &self,
        name: &str,
        variant: &str,
        f: impl FnOnce(&T) -> R,
    ) -> Option<R> {
        let id = self.output.graph.find_variant(name, variant)?;
        let module = self.output.graph.node(id).module.read();
        module.downcast_ref::<T>().map(f)
    }

    pub fn provider<T: Send + Sync + 'static>(
        &self,
        name: &str,
        variant: &str,
        key: &ProviderKey<T>,
    ) -> Option<Arc<T>> {
        let id = self.variant(name, variant);
        self.output.graph.node(id).providers.get(key)
    }

    pub fn output_files(&self, name: &str, variant: &str, tag: &str) -> Vec<String> {
        let id = self.variant(name, variant);
        self.output
            .graph
            .node(id)
            .providers
            .get(&OUTPUT_FILES_PROVIDER)
            .and_then(|info| info.get(tag).map(<[String]>::to_vec))
            .unwrap_or_default()
    }

    pub fn install_files(&self, name: &str, variant: &str) -> Vec<String> {
        let id = self.variant(name, variant);
        self.output
            .graph
            .node(id)
            .providers
            .get(&INSTALL_FILES_PROVIDER)
            .map(|info| info.install_files.clone())
            .unwrap_or_default()
    }

    /// Paths inside a package of the files the variant itself packages.
    pub fn packaged_paths(&self, name: &str, variant: &str) -> Vec<String> {
        let id = self.variant(name, variant);
        self.output
            .graph
            .node(id)
            .providers
            .get(&INSTALL_FILES_PROVIDER)
            .map(|info| {
                info.packaging_specs
                    .iter()
                    .map(|s| s.rel_path_in_package().to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Statements of one variant as `rule: inputs -> outputs`, one per line.
    pub fn describe_statements(&self, name: &str, variant: &str) -> String {
        let owner = if variant.is_empty() {
            name.to_string()
        } else {
            format!("{name} ({variant})")
        };
        self.output
            .statements
            .iter()
            .filter(|s| s.owner == owner)
            .map(|s| format!("{}: {} -> {}", s.rule, s.inputs.join(" "), s.outputs.join(" ")))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn statement_for_output(&self, path: &str) -> Option<&BuildStatement> {
        self.output
            .statements
            .iter()
            .find(|s| s.outputs.iter().any(|o| o == path))
    }

    /// Content of a generated text file.
    pub fn file_content(&self, path: &str) -> Option<String> {
        let stmt = self.statement_for_output(path)?;
        content_from_file_rule_for_tests(&self.output.config, stmt)
    }
}
