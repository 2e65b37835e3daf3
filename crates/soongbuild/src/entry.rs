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

//! Runs a whole build: loading, the mutator pipeline, build-action
//! generation, singletons, the Make export and lowering to n2.

use std::collections::{BTreeMap, HashMap};

use derive_builder::Builder;
use indexmap::IndexMap;
use log::{debug, info, warn};
use n2::graph::Graph as N2Graph;
use rayon::prelude::*;
use soongutil::{common::first_unique, config::Config};
use tracing::{Level, instrument};

use crate::{
    context::{GeneratedActions, ModuleContext, ModuleFacts, SingletonContext},
    error::{BuildFailed, Diagnostic, DiagnosticKind},
    graph::ModuleGraph,
    loader::{LoadError, load_blueprints},
    lower::lower_to_n2,
    makevars::{self, MakeVarsOutput},
    model::{Phase, VariantId},
    module::ModuleFactory,
    modules,
    mutator::{Pipeline, RegisterFn, RegisterMutatorsContext},
    packaging::{INSTALL_FILES_PROVIDER, InstallDeps},
    provider::OUTPUT_FILES_PROVIDER,
    raw_files::sweep_raw_files,
    singleton::{Singleton, SingletonFactory},
    statement::{BuildStatement, verify_statements},
    teams::AllTeamsSingleton,
};

/// Module types, mutators and singletons known to a build.
#[derive(Default)]
pub struct Registry {
    module_types: IndexMap<String, ModuleFactory>,
    mutators: Vec<(Phase, Box<RegisterFn>)>,
    singletons: Vec<(String, SingletonFactory)>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every module type and singleton shipped with this crate.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        modules::register(&mut registry);
        registry.register_singleton("all_teams", AllTeamsSingleton::factory);
        registry
    }

    /// # Panics
    ///
    /// Panics if `name` is already registered.
    pub fn register_module_type(&mut self, name: &str, factory: ModuleFactory) -> &mut Self {
        if self.module_types.insert(name.to_string(), factory).is_some() {
            panic!("module type {name:?} registered twice");
        }
        self
    }

    /// Adds passes to `phase`. They run after the framework passes of that
    /// phase, in registration order.
    pub fn register_mutators<F>(&mut self, phase: Phase, register: F) -> &mut Self
    where
        F: Fn(&mut RegisterMutatorsContext) + Send + Sync + 'static,
    {
        self.mutators.push((phase, Box::new(register)));
        self
    }

    pub fn register_singleton(&mut self, name: &str, factory: SingletonFactory) -> &mut Self {
        self.singletons.push((name.to_string(), factory));
        self
    }

    pub fn module_types(&self) -> &IndexMap<String, ModuleFactory> {
        &self.module_types
    }
}

#[derive(Builder)]
#[builder(pattern = "owned", setter(into))]
pub struct BuildOptions {
    /// The blueprint oracle output, see [`crate::loader`].
    pub blueprints: String,
    pub config: Config,
}

/// Everything a successful build produced.
pub struct BuildOutput {
    pub config: Config,
    pub graph: ModuleGraph,
    /// Module statements in variant order, then singleton statements, then
    /// one phony statement per goal.
    pub statements: Vec<BuildStatement>,
    pub n2_graph: N2Graph,
    pub make_vars: MakeVarsOutput,
}

/// Statements and phony goals gathered from modules or singletons.
#[derive(Default)]
struct Collected {
    statements: Vec<BuildStatement>,
    phonies: BTreeMap<String, Vec<String>>,
    diags: Vec<Diagnostic>,
}

impl Collected {
    fn add_phonies(&mut self, phonies: Vec<(String, Vec<String>)>) {
        for (name, deps) in phonies {
            self.phonies.entry(name).or_default().extend(deps);
        }
    }

    fn phony_statements(&mut self) -> Vec<BuildStatement> {
        std::mem::take(&mut self.phonies)
            .into_iter()
            .map(|(name, deps)| {
                let mut stmt = BuildStatement::phony(name, first_unique(deps));
                stmt.owner = "phony".to_string();
                stmt
            })
            .collect()
    }
}

/// Generates the build actions of one variant and publishes its providers.
/// Disabled variants, defaults modules and variants missing dependencies
/// generate nothing.
fn generate_variant(
    graph: &ModuleGraph,
    config: &Config,
    id: VariantId,
) -> Option<GeneratedActions> {
    let node = graph.node(id);
    let name = graph.group_of(id).name();
    let mut module = node.module.write();
    if !module.base().enabled() || module.is_defaults() {
        return None;
    }
    if !module.base().missing_deps().is_empty() {
        warn!(
            "Skipping {name}: missing dependencies {}",
            module.base().missing_deps().join(", ")
        );
        return None;
    }

    let deps = InstallDeps::of(graph, id);
    let facts = ModuleFacts::of(module.as_ref());
    let mut ctx = ModuleContext::new(graph, config, id, facts, deps.install_files());
    module.generate_build_actions(&mut ctx);
    let mut actions = ctx.finish();

    if actions.skip_install {
        module.base_mut().skip_install = true;
    }
    if !actions.missing_deps.is_empty() {
        warn!(
            "Dropping the actions of {name}: missing dependencies {}",
            actions.missing_deps.join(", ")
        );
        module.base_mut().add_missing_deps(std::mem::take(&mut actions.missing_deps));
        actions.statements.clear();
        actions.phonies.clear();
        return Some(actions);
    }

    if let Some(files) = actions.output_files.take() {
        node.providers.set(&OUTPUT_FILES_PROVIDER, files, name);
    }
    let info = deps.finish(actions.install_files.clone(), actions.packaging_specs.clone());
    node.providers.set(&INSTALL_FILES_PROVIDER, info, name);
    Some(actions)
}

/// Runs [`Module::generate_build_actions`](crate::module::Module) for every
/// variant, dependencies first. Variants of one level run in parallel.
#[instrument(level = Level::DEBUG, skip_all)]
fn generate_modules(graph: &ModuleGraph, config: &Config) -> Collected {
    let mut collected = Collected::default();
    let levels = match graph.levels(true) {
        Ok(levels) => levels,
        Err(cycle) => {
            collected.diags.push(Diagnostic::global(
                DiagnosticKind::Module,
                graph.cycle_message(&cycle),
            ));
            return collected;
        }
    };

    let mut results: Vec<(VariantId, GeneratedActions)> = vec![];
    for level in &levels {
        let res: Vec<_> = level
            .par_iter()
            .filter_map(|id| generate_variant(graph, config, *id).map(|a| (*id, a)))
            .collect();
        results.extend(res);
    }

    let position: HashMap<VariantId, usize> = graph
        .variants()
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, i))
        .collect();
    results.sort_by_key(|(id, _)| position.get(id).copied().unwrap_or(usize::MAX));

    for (_, actions) in results {
        collected.diags.extend(actions.diags);
        collected.statements.extend(actions.statements);
        collected.add_phonies(actions.phonies);
    }
    debug!(
        "generated {} statements for {} variants",
        collected.statements.len(),
        graph.variants().len()
    );
    collected
}

fn run_singletons(
    registry: &Registry,
    graph: &ModuleGraph,
    config: &Config,
    collected: &mut Collected,
) -> (Vec<Box<dyn Singleton>>, Vec<(Vec<String>, Vec<String>)>) {
    let mut singletons = vec![];
    let mut dists = vec![];
    for (name, factory) in &registry.singletons {
        let mut singleton = factory();
        let mut ctx = SingletonContext::new(graph, config, name);
        singleton.generate_build_actions(&mut ctx);
        debug!("singleton {name} emitted {} statements", ctx.statements.len());
        collected.statements.extend(ctx.statements);
        collected.add_phonies(ctx.phonies);
        collected.diags.extend(ctx.diags);
        dists.extend(ctx.dists);
        singletons.push(singleton);
    }
    (singletons, dists)
}

/// Builds the module graph described by `options` and lowers it to an n2
/// graph. Stops after the first stage that reports diagnostics.
#[instrument(level = Level::DEBUG, skip_all)]
pub fn run_build(registry: &Registry, options: BuildOptions) -> Result<BuildOutput, BuildFailed> {
    let BuildOptions { blueprints, config } = options;

    let mut graph = load_blueprints(&blueprints, &registry.module_types).map_err(|e| match e {
        LoadError::Diagnostics(diags) => BuildFailed::Diagnostics(diags),
        other => BuildFailed::Other(anyhow::Error::new(other)),
    })?;

    let pipeline = Pipeline::new(&registry.mutators);
    pipeline
        .run(&mut graph, &config)
        .map_err(BuildFailed::Diagnostics)?;

    let mut collected = generate_modules(&graph, &config);
    if !collected.diags.is_empty() {
        return Err(BuildFailed::Diagnostics(collected.diags));
    }

    let (singletons, dists) = run_singletons(registry, &graph, &config, &mut collected);
    if !collected.diags.is_empty() {
        return Err(BuildFailed::Diagnostics(collected.diags));
    }

    let make_vars =
        makevars::generate(&graph, &config, &singletons, dists).map_err(BuildFailed::Diagnostics)?;
    makevars::write_files(&config, &make_vars)?;

    let phonies = collected.phony_statements();
    let mut statements = collected.statements;
    statements.extend(phonies);
    verify_statements(&statements)?;
    let n2_graph = lower_to_n2(&statements)?;

    let swept = sweep_raw_files(&config)?;
    if swept > 0 {
        debug!("removed {swept} stale raw files");
    }
    info!(
        "Build graph ready: {} variants, {} statements",
        graph.variants().len(),
        statements.len()
    );

    Ok(BuildOutput {
        config,
        graph,
        statements,
        n2_graph,
        make_vars,
    })
}
