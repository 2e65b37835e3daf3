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

//! The mutator pipeline: named passes grouped into fixed phases, run over the
//! whole module graph.
//!
//! A bottom-up pass visits dependents before their dependencies, a top-down
//! pass the reverse. Passes declared parallel run one level of the graph at a
//! time on the rayon pool. Structural changes requested by the modules of a
//! pass are applied in module order once the pass is done, so the resulting
//! graph does not depend on scheduling.

use std::{collections::HashMap, sync::Arc};

use log::{debug, info};
use rayon::prelude::*;
use soongutil::config::Config;
use tracing::{Level, instrument};

use crate::{
    arch,
    bootjars::BootJarClassifier,
    context::{BottomUpMutatorContext, TopDownMutatorContext},
    defaults,
    error::{Diagnostic, DiagnosticKind},
    graph::{ModuleGraph, PendingChanges},
    image, licenses,
    model::{Phase, VariantId},
    module::Module,
    pathdeps, prebuilt, teams, visibility,
};

pub type BottomUpFn = dyn Fn(&mut BottomUpMutatorContext<'_>, &mut dyn Module) + Send + Sync;
pub type TopDownFn = dyn Fn(&mut TopDownMutatorContext<'_>, &mut dyn Module) + Send + Sync;
/// Registers the passes of one phase.
pub type RegisterFn = dyn Fn(&mut RegisterMutatorsContext) + Send + Sync;

#[derive(Clone)]
enum PassKind {
    BottomUp(Arc<BottomUpFn>),
    TopDown(Arc<TopDownFn>),
}

#[derive(Clone)]
pub struct Pass {
    name: String,
    kind: PassKind,
    parallel: bool,
}

impl Pass {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }
}

/// Returned by the registration methods to mark a pass parallel.
pub struct MutatorHandle<'a> {
    pass: &'a mut Pass,
}

impl MutatorHandle<'_> {
    /// Declares that the pass only touches the visited module and read-only
    /// configuration, so independent modules may be visited concurrently.
    pub fn parallel(self) -> Self {
        self.pass.parallel = true;
        self
    }
}

/// Collects the passes of one phase, in registration order.
pub struct RegisterMutatorsContext {
    phase: Phase,
    passes: Vec<Pass>,
}

impl RegisterMutatorsContext {
    pub(crate) fn new(phase: Phase) -> Self {
        RegisterMutatorsContext {
            phase,
            passes: vec![],
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn push(&mut self, name: &str, kind: PassKind) -> MutatorHandle<'_> {
        self.passes.push(Pass {
            name: name.to_string(),
            kind,
            parallel: false,
        });
        let last = self.passes.len() - 1;
        MutatorHandle {
            pass: &mut self.passes[last],
        }
    }

    pub fn bottom_up<F>(&mut self, name: &str, f: F) -> MutatorHandle<'_>
    where
        F: Fn(&mut BottomUpMutatorContext<'_>, &mut dyn Module) + Send + Sync + 'static,
    {
        self.push(name, PassKind::BottomUp(Arc::new(f)))
    }

    pub fn top_down<F>(&mut self, name: &str, f: F) -> MutatorHandle<'_>
    where
        F: Fn(&mut TopDownMutatorContext<'_>, &mut dyn Module) + Send + Sync + 'static,
    {
        self.push(name, PassKind::TopDown(Arc::new(f)))
    }

    pub(crate) fn into_passes(self) -> Vec<Pass> {
        self.passes
    }
}

/// Registers the framework passes of `phase`. Passes registered by users run
/// after these.
pub(crate) fn register_builtin(ctx: &mut RegisterMutatorsContext) {
    match ctx.phase() {
        Phase::PreArch => {
            licenses::register_package_mapper(ctx);
            defaults::register_mutators(ctx);
            prebuilt::register_rename(ctx);
        }
        Phase::Arch => {
            arch::register_mutator(ctx);
        }
        Phase::PreDeps => {
            image::register_mutator(ctx);
            licenses::register_property_gatherer(ctx);
            pathdeps::register_mutator(ctx);
        }
        Phase::Deps => {
            ctx.bottom_up("deps", deps_mutator).parallel();
        }
        Phase::PostDeps => {
            prebuilt::register_select(ctx);
            licenses::register_dependency_checker(ctx);
            teams::register_checker(ctx);
            visibility::register_enforcer(ctx);
            BootJarClassifier::register_mutators(ctx);
            licenses::register_flattener(ctx);
        }
        Phase::Final => {}
    }
}

/// Adds the framework dependencies of every enabled module, then the module's
/// own.
fn deps_mutator(ctx: &mut BottomUpMutatorContext<'_>, module: &mut dyn Module) {
    if !module.base().enabled() {
        return;
    }
    teams::add_team_dependency(ctx, module);
    prebuilt::add_prebuilt_dependency(ctx, module);
    module.deps_mutator(ctx);
}

enum Outcome {
    BottomUp(PendingChanges, Vec<Diagnostic>),
    TopDown(Vec<Diagnostic>),
}

fn visit(
    graph: &ModuleGraph,
    config: &Config,
    phase: Phase,
    pass: &Pass,
    id: VariantId,
) -> Outcome {
    let node = graph.node(id);
    let mut module = node.module.write();
    match &pass.kind {
        PassKind::BottomUp(f) => {
            let mut ctx = BottomUpMutatorContext::new(graph, config, id, phase, &pass.name);
            f(&mut ctx, module.as_mut());
            let (changes, diags) = ctx.into_parts();
            Outcome::BottomUp(changes, diags)
        }
        PassKind::TopDown(f) => {
            let mut ctx = TopDownMutatorContext::new(graph, config, id, phase);
            f(&mut ctx, module.as_mut());
            Outcome::TopDown(ctx.into_diagnostics())
        }
    }
}

/// Runs one pass over every variant and applies the requested changes.
#[instrument(level = Level::DEBUG, skip_all, fields(pass = %pass.name))]
pub(crate) fn run_pass(
    graph: &mut ModuleGraph,
    config: &Config,
    phase: Phase,
    pass: &Pass,
) -> Vec<Diagnostic> {
    let deps_first = matches!(pass.kind, PassKind::TopDown(_));
    let levels = match graph.levels(deps_first) {
        Ok(levels) => levels,
        Err(cycle) => {
            return vec![Diagnostic::global(
                DiagnosticKind::Module,
                graph.cycle_message(&cycle),
            )];
        }
    };

    let mut outcomes: Vec<(VariantId, Outcome)> = Vec::with_capacity(graph.variants().len());
    {
        let shared: &ModuleGraph = graph;
        for level in &levels {
            if pass.parallel {
                let res: Vec<_> = level
                    .par_iter()
                    .map(|id| (*id, visit(shared, config, phase, pass, *id)))
                    .collect();
                outcomes.extend(res);
            } else {
                for id in level {
                    outcomes.push((*id, visit(shared, config, phase, pass, *id)));
                }
            }
        }
    }

    let position: HashMap<VariantId, usize> = graph
        .variants()
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, i))
        .collect();
    outcomes.sort_by_key(|(id, _)| position.get(id).copied().unwrap_or(usize::MAX));

    let mut diags = vec![];
    let mut changes = vec![];
    for (id, outcome) in outcomes {
        match outcome {
            Outcome::BottomUp(change, d) => {
                diags.extend(d);
                if !change.is_empty() {
                    changes.push((id, change));
                }
            }
            Outcome::TopDown(d) => diags.extend(d),
        }
    }
    if !changes.is_empty() {
        debug!("pass {} changed {} variants", pass.name, changes.len());
        diags.extend(graph.apply_changes(config, changes));
    }
    diags
}

/// The passes of every phase, builtin passes first.
#[derive(Clone, Default)]
pub struct Pipeline {
    phases: Vec<(Phase, Vec<Pass>)>,
}

impl Pipeline {
    /// Builds the pipeline from the framework passes and the registration
    /// callbacks of each phase.
    pub(crate) fn new(user: &[(Phase, Box<RegisterFn>)]) -> Self {
        let phases = Phase::ALL
            .iter()
            .map(|phase| {
                let mut ctx = RegisterMutatorsContext::new(*phase);
                register_builtin(&mut ctx);
                for (p, register) in user {
                    if p == phase {
                        register(&mut ctx);
                    }
                }
                (*phase, ctx.into_passes())
            })
            .collect();
        Pipeline { phases }
    }

    pub fn passes(&self, phase: Phase) -> &[Pass] {
        self.phases
            .iter()
            .find(|(p, _)| *p == phase)
            .map_or(&[], |(_, passes)| passes.as_slice())
    }

    /// Runs every phase in order. A phase that reports diagnostics runs to
    /// completion, then the pipeline stops.
    #[instrument(level = Level::DEBUG, skip_all)]
    pub(crate) fn run(
        &self,
        graph: &mut ModuleGraph,
        config: &Config,
    ) -> Result<(), Vec<Diagnostic>> {
        for (phase, passes) in &self.phases {
            info!("Starting phase {phase} ({} passes)", passes.len());
            let mut diags = vec![];
            for pass in passes {
                diags.extend(run_pass(graph, config, *phase, pass));
            }
            if !diags.is_empty() {
                info!("Phase {phase} failed with {} diagnostics", diags.len());
                return Err(diags);
            }
        }
        Ok(())
    }
}
