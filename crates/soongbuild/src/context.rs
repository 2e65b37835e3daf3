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

//! The contexts handed to mutators, module build-action generation and
//! singletons.
//!
//! Every module context wraps a [`BaseModuleContext`], which gives read
//! access to the module's identity, its direct dependencies and its
//! providers. The variant's own module is passed to callbacks separately and
//! is the only module they may mutate.

use std::{
    ops::{Deref, DerefMut},
    sync::Arc,
};

use arcstr::ArcStr;
use parking_lot::RwLockReadGuard;
use relative_path::RelativePath;
use soongutil::{
    arch::{ArchType, OsClass, OsType, Target},
    config::Config,
    path::{split_qualified_name, src_is_module_with_tag, validate_path},
};

use crate::{
    deptag::{DepTag, DependencyTag, SourceOrOutputDepTag},
    error::{Diagnostic, DiagnosticKind, ModuleRef},
    graph::{CreatedVariant, DepRequest, ModuleGraph, PendingChanges},
    model::{Phase, Variant, VariantId, Variation},
    module::{CommonProperties, ImageVariation, Module},
    packaging::PackagingSpec,
    paths::{
        InstallOptions, InstallPath, OutputPath, module_partition, path_for_install,
        path_for_module_out,
    },
    provider::{OUTPUT_FILES_PROVIDER, OutputFilesInfo, ProviderKey},
    statement::BuildStatement,
};

/// What both module and singleton contexts can do with build statements.
pub trait BuilderContext {
    fn config(&self) -> &Config;

    fn build(&mut self, stmt: BuildStatement);

    /// Adds `deps` to the phony goal `name`. Goals requested several times
    /// accumulate their dependencies.
    fn phony(&mut self, name: &str, deps: Vec<String>);

    fn errorf(&mut self, msg: String);
}

/// A read-only view of a module variant other than the current one.
#[derive(Clone, Copy)]
pub struct ModuleHandle<'a> {
    graph: &'a ModuleGraph,
    id: VariantId,
}

impl<'a> ModuleHandle<'a> {
    pub(crate) fn new(graph: &'a ModuleGraph, id: VariantId) -> Self {
        ModuleHandle { graph, id }
    }

    pub fn id(&self) -> VariantId {
        self.id
    }

    pub fn name(&self) -> &'a str {
        self.graph.group_of(self.id).name()
    }

    pub fn module_type(&self) -> &'a str {
        self.graph.group_of(self.id).module_type()
    }

    pub fn bp_file(&self) -> &'a RelativePath {
        self.graph.group_of(self.id).bp_file()
    }

    pub fn dir(&self) -> String {
        self.graph.group_of(self.id).dir()
    }

    pub fn variant(&self) -> &'a Variant {
        self.graph.node(self.id).variant()
    }

    /// Locks the module for reading.
    pub fn module(&self) -> RwLockReadGuard<'a, Box<dyn Module>> {
        self.graph.node(self.id).module.read()
    }

    pub fn provider<T: Send + Sync + 'static>(&self, key: &ProviderKey<T>) -> Option<Arc<T>> {
        self.graph.node(self.id).providers.get(key)
    }

    pub fn module_ref(&self) -> ModuleRef {
        self.graph.module_ref(self.id)
    }

    /// Whether `name`, plain or fully qualified as `//dir:name`, refers to
    /// this module.
    pub fn is_named(&self, name: &str) -> bool {
        self.name() == name
            || split_qualified_name(name)
                .is_some_and(|(dir, n)| self.name() == n && self.dir() == dir)
    }
}

/// A direct dependency and the tag of the edge leading to it.
#[derive(Clone, Copy)]
pub struct Dep<'a> {
    handle: ModuleHandle<'a>,
    tag: &'a DepTag,
}

impl<'a> Dep<'a> {
    pub fn tag(&self) -> &'a DepTag {
        self.tag
    }
}

impl<'a> Deref for Dep<'a> {
    type Target = ModuleHandle<'a>;

    fn deref(&self) -> &Self::Target {
        &self.handle
    }
}

pub struct BaseModuleContext<'a> {
    graph: &'a ModuleGraph,
    config: &'a Config,
    id: VariantId,
    /// The running mutator phase, `None` while generating build actions.
    phase: Option<Phase>,
    pub(crate) diags: Vec<Diagnostic>,
}

impl<'a> BaseModuleContext<'a> {
    pub(crate) fn new(
        graph: &'a ModuleGraph,
        config: &'a Config,
        id: VariantId,
        phase: Option<Phase>,
    ) -> Self {
        BaseModuleContext {
            graph,
            config,
            id,
            phase,
            diags: vec![],
        }
    }

    pub fn config(&self) -> &'a Config {
        self.config
    }

    pub fn id(&self) -> VariantId {
        self.id
    }

    pub fn module_name(&self) -> &'a str {
        self.graph.group_of(self.id).name()
    }

    pub fn module_type(&self) -> &'a str {
        self.graph.group_of(self.id).module_type()
    }

    pub fn bp_file(&self) -> &'a RelativePath {
        self.graph.group_of(self.id).bp_file()
    }

    /// The directory of the declaring bp file, `"."` at the root.
    pub fn module_dir(&self) -> String {
        self.graph.group_of(self.id).dir()
    }

    pub fn variant(&self) -> &'a Variant {
        self.graph.node(self.id).variant()
    }

    pub fn module_ref(&self) -> ModuleRef {
        self.graph.module_ref(self.id)
    }

    fn report(&mut self, kind: DiagnosticKind, property: Option<&str>, msg: String) {
        self.diags.push(Diagnostic {
            module: Some(self.module_ref()),
            property: property.map(str::to_string),
            kind,
            message: msg,
        });
    }

    pub fn property_errorf(&mut self, property: &str, msg: impl Into<String>) {
        self.report(DiagnosticKind::Property, Some(property), msg.into());
    }

    pub fn module_errorf(&mut self, msg: impl Into<String>) {
        self.report(DiagnosticKind::Module, None, msg.into());
    }

    pub(crate) fn unresolved_errorf(&mut self, property: Option<&str>, msg: impl Into<String>) {
        self.report(DiagnosticKind::UnresolvedReference, property, msg.into());
    }

    /// Whether this context reported an error.
    pub fn failed(&self) -> bool {
        !self.diags.is_empty()
    }

    /// The direct dependencies, in the order they were added.
    pub fn direct_deps(&self) -> impl Iterator<Item = Dep<'a>> + use<'a> {
        let graph = self.graph;
        graph.node(self.id).deps().iter().map(move |e| Dep {
            handle: ModuleHandle::new(graph, e.target),
            tag: &e.tag,
        })
    }

    pub fn visit_direct_deps(&self, mut f: impl FnMut(Dep<'a>)) {
        for dep in self.direct_deps() {
            f(dep);
        }
    }

    /// Direct dependencies whose tag is of type `T`.
    pub fn direct_deps_with_tag<T: DependencyTag>(
        &self,
    ) -> impl Iterator<Item = Dep<'a>> + use<'a, T> {
        self.direct_deps().filter(|d| d.tag().is::<T>())
    }

    /// The direct dependency named `name` reached through an edge tagged
    /// `tag`.
    pub fn direct_dep_with_tag(&self, name: &str, tag: &DepTag) -> Option<Dep<'a>> {
        self.direct_deps()
            .find(|d| d.is_named(name) && d.tag() == tag)
    }

    pub fn other_module_exists(&self, name: &str) -> bool {
        self.graph.group_by_name(name).is_some()
    }

    pub fn module_provider<T: Send + Sync + 'static>(
        &self,
        key: &ProviderKey<T>,
    ) -> Option<Arc<T>> {
        self.graph.node(self.id).providers.get(key)
    }

    /// The running mutator phase, `None` while generating build actions.
    pub fn phase(&self) -> Option<Phase> {
        self.phase
    }

    /// Publishes a provider of this variant. Mutators may write providers
    /// from the [`Phase::PreDeps`] phase on; build-action generation always
    /// may.
    ///
    /// # Panics
    ///
    /// Panics if the provider was already set for this variant, or when
    /// written by a mutator of an earlier phase.
    pub fn set_provider<T: Send + Sync + 'static>(&self, key: &ProviderKey<T>, value: T) {
        let name = self.module_name();
        if let Some(phase) = self.phase
            && !phase.allows_provider_writes()
        {
            panic!(
                "provider {} set for module {name:?} in the {phase} phase",
                key.name()
            );
        }
        self.graph.node(self.id).providers.set(key, value, name);
    }
}

/// Context of a bottom-up mutator: dependents are visited before their
/// dependencies. May add dependencies and create variants.
pub struct BottomUpMutatorContext<'a> {
    base: BaseModuleContext<'a>,
    phase: Phase,
    pass: &'a str,
    pub(crate) changes: PendingChanges,
}

impl<'a> Deref for BottomUpMutatorContext<'a> {
    type Target = BaseModuleContext<'a>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

impl DerefMut for BottomUpMutatorContext<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.base
    }
}

fn owned_names<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    names.iter().map(|n| n.as_ref().to_string()).collect()
}

impl<'a> BottomUpMutatorContext<'a> {
    pub(crate) fn new(
        graph: &'a ModuleGraph,
        config: &'a Config,
        id: VariantId,
        phase: Phase,
        pass: &'a str,
    ) -> Self {
        BottomUpMutatorContext {
            base: BaseModuleContext::new(graph, config, id, Some(phase)),
            phase,
            pass,
            changes: PendingChanges::default(),
        }
    }

    pub(crate) fn into_parts(self) -> (PendingChanges, Vec<Diagnostic>) {
        (self.changes, self.base.diags)
    }

    pub fn pass_name(&self) -> &str {
        self.pass
    }

    /// Depends on the variants of `names` matching this variant.
    pub fn add_dependency<S: AsRef<str>>(&mut self, tag: impl Into<DepTag>, names: &[S]) {
        self.add_variation_dependencies(&[], tag, names);
    }

    /// Depends on the variants matching this variant with `variations`
    /// overlaid.
    pub fn add_variation_dependencies<S: AsRef<str>>(
        &mut self,
        variations: &[Variation],
        tag: impl Into<DepTag>,
        names: &[S],
    ) {
        self.changes.deps.push(DepRequest {
            tag: tag.into(),
            names: owned_names(names),
            variations: variations.to_vec(),
            far: false,
        });
    }

    /// Depends on the variants matching only `variations`.
    pub fn add_far_variation_dependencies<S: AsRef<str>>(
        &mut self,
        variations: &[Variation],
        tag: impl Into<DepTag>,
        names: &[S],
    ) {
        self.changes.deps.push(DepRequest {
            tag: tag.into(),
            names: owned_names(names),
            variations: variations.to_vec(),
            far: true,
        });
    }

    /// Splits this variant into one variant per name along the axis named
    /// after the running pass. Returns the new variants, each holding a clone
    /// of `module`.
    ///
    /// # Panics
    ///
    /// Panics when variants are frozen in the running phase, when called
    /// twice for the same variant, or without names.
    pub fn create_variations<S: AsRef<str>>(
        &mut self,
        module: &dyn Module,
        names: &[S],
    ) -> &mut [CreatedVariant] {
        if !self.phase.allows_variations() {
            panic!(
                "mutator {:?} created variations of {:?} in the {} phase",
                self.pass,
                self.base.module_name(),
                self.phase
            );
        }
        if names.is_empty() {
            panic!(
                "mutator {:?} created no variations of {:?}",
                self.pass,
                self.base.module_name()
            );
        }
        if self.changes.variations.is_some() {
            panic!(
                "mutator {:?} created variations of {:?} twice",
                self.pass,
                self.base.module_name()
            );
        }
        let created = names
            .iter()
            .map(|n| CreatedVariant {
                name: n.as_ref().to_string(),
                module: module.clone_module(),
            })
            .collect();
        let (_, created) = self
            .changes
            .variations
            .insert((ArcStr::from(self.pass), created));
        created.as_mut_slice()
    }

    /// Renames the module group of this variant once the pass ends.
    pub fn rename(&mut self, name: &str) {
        self.changes.rename = Some(name.to_string());
    }

    /// Redirects every dependency on the matching variant of `name` to this
    /// variant once the pass ends.
    pub fn replace_dependencies(&mut self, name: &str) {
        self.changes.replace_deps.push(name.to_string());
    }
}

/// Context of a top-down mutator: dependencies are visited before their
/// dependents.
pub struct TopDownMutatorContext<'a> {
    base: BaseModuleContext<'a>,
}

impl<'a> TopDownMutatorContext<'a> {
    pub(crate) fn new(
        graph: &'a ModuleGraph,
        config: &'a Config,
        id: VariantId,
        phase: Phase,
    ) -> Self {
        TopDownMutatorContext {
            base: BaseModuleContext::new(graph, config, id, Some(phase)),
        }
    }

    pub(crate) fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.base.diags
    }
}

impl<'a> Deref for TopDownMutatorContext<'a> {
    type Target = BaseModuleContext<'a>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

impl DerefMut for TopDownMutatorContext<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.base
    }
}

/// Facts about the module being generated, read before the module is handed
/// to [`Module::generate_build_actions`].
pub(crate) struct ModuleFacts {
    pub(crate) target: Option<Target>,
    pub(crate) image: ImageVariation,
    pub(crate) common: CommonProperties,
    pub(crate) install_options: InstallOptions,
    pub(crate) skip_install: bool,
    pub(crate) license_files: Vec<String>,
}

impl ModuleFacts {
    pub(crate) fn of(module: &dyn Module) -> Self {
        let base = module.base();
        ModuleFacts {
            target: base.target(),
            image: base.image(),
            common: base.common().clone(),
            install_options: module.install_options(),
            skip_install: base.is_skip_install(),
            license_files: base
                .effective_licenses()
                .texts
                .iter()
                .map(|(path, _)| path.clone())
                .collect(),
        }
    }
}

/// Everything one call of [`Module::generate_build_actions`] produced.
pub(crate) struct GeneratedActions {
    pub(crate) statements: Vec<BuildStatement>,
    pub(crate) phonies: Vec<(String, Vec<String>)>,
    pub(crate) install_files: Vec<String>,
    pub(crate) packaging_specs: Vec<PackagingSpec>,
    pub(crate) output_files: Option<OutputFilesInfo>,
    pub(crate) missing_deps: Vec<String>,
    /// Set when the module opted out of installation while generating.
    pub(crate) skip_install: bool,
    pub(crate) diags: Vec<Diagnostic>,
}

/// Context of [`Module::generate_build_actions`].
pub struct ModuleContext<'a> {
    base: BaseModuleContext<'a>,
    facts: ModuleFacts,
    /// Install files of install dependencies, which installs of this module
    /// wait for.
    deps_install_files: Vec<String>,
    pub(crate) statements: Vec<BuildStatement>,
    pub(crate) phonies: Vec<(String, Vec<String>)>,
    pub(crate) install_files: Vec<String>,
    pub(crate) packaging_specs: Vec<PackagingSpec>,
    pub(crate) output_files: Option<OutputFilesInfo>,
    pub(crate) missing_deps: Vec<String>,
}

impl<'a> Deref for ModuleContext<'a> {
    type Target = BaseModuleContext<'a>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

impl DerefMut for ModuleContext<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.base
    }
}

impl<'a> ModuleContext<'a> {
    pub(crate) fn new(
        graph: &'a ModuleGraph,
        config: &'a Config,
        id: VariantId,
        facts: ModuleFacts,
        deps_install_files: Vec<String>,
    ) -> Self {
        ModuleContext {
            base: BaseModuleContext::new(graph, config, id, None),
            facts,
            deps_install_files,
            statements: vec![],
            phonies: vec![],
            install_files: vec![],
            packaging_specs: vec![],
            output_files: None,
            missing_deps: vec![],
        }
    }

    pub(crate) fn finish(self) -> GeneratedActions {
        GeneratedActions {
            statements: self.statements,
            phonies: self.phonies,
            install_files: self.install_files,
            packaging_specs: self.packaging_specs,
            output_files: self.output_files,
            missing_deps: self.missing_deps,
            skip_install: self.facts.skip_install,
            diags: self.base.diags,
        }
    }

    pub fn target(&self) -> Target {
        self.facts
            .target
            .unwrap_or_else(|| Target::new(OsType::Android, ArchType::Common))
    }

    pub fn is_host(&self) -> bool {
        self.target().os.class() == OsClass::Host
    }

    pub fn image(&self) -> ImageVariation {
        self.facts.image
    }

    pub fn common(&self) -> &CommonProperties {
        &self.facts.common
    }

    pub fn is_skip_install(&self) -> bool {
        self.facts.skip_install
    }

    /// Keeps this variant out of the install tree. Files are still packaged
    /// by modules that depend on it.
    pub fn skip_install(&mut self) {
        self.facts.skip_install = true;
    }

    /// `out/soong/.intermediates/<dir>/<name>/<variant>/<components>`.
    pub fn path_for_module_out(&mut self, components: &[&str]) -> Option<OutputPath> {
        let res = path_for_module_out(
            self.base.config,
            &self.module_dir(),
            self.module_name(),
            &self.variant().subdir(),
        )
        .and_then(|dir| dir.join(components));
        match res {
            Ok(p) => Some(p),
            Err(e) => {
                self.module_errorf(e.to_string());
                None
            }
        }
    }

    /// The install directory of this variant, joined with `components`.
    pub fn path_for_module_install(&mut self, components: &[&str]) -> Option<InstallPath> {
        let target = self.target();
        let opts = self.facts.install_options;
        let partition = module_partition(
            self.base.config,
            target.os,
            opts,
            self.facts.image,
            &self.facts.common,
        );
        match path_for_install(self.base.config, target, &partition, opts.debug, components) {
            Ok(p) => Some(p),
            Err(e) => {
                self.module_errorf(e.to_string());
                None
            }
        }
    }

    /// Resolves `path` relative to the module directory. Missing files are
    /// reported against `property`.
    pub fn path_for_module_src(&mut self, property: &str, path: &str) -> Option<String> {
        let srcs = self.paths_for_module_src_excludes(property, &[path], &[] as &[&str]);
        match srcs.as_slice() {
            [one] => Some(one.clone()),
            [] => None,
            _ => {
                self.property_errorf(
                    property,
                    format!("{path:?} expands to {} files, expected exactly one", srcs.len()),
                );
                None
            }
        }
    }

    pub fn paths_for_module_src<S: AsRef<str>>(
        &mut self,
        property: &str,
        srcs: &[S],
    ) -> Vec<String> {
        self.paths_for_module_src_excludes(property, srcs, &[] as &[&str])
    }

    /// Expands source paths and `:module{tag}` references of a path
    /// property, dropping everything listed in `excludes`.
    pub fn paths_for_module_src_excludes<S: AsRef<str>, E: AsRef<str>>(
        &mut self,
        property: &str,
        srcs: &[S],
        excludes: &[E],
    ) -> Vec<String> {
        let mut expanded_excludes = vec![];
        for e in excludes {
            expanded_excludes.extend(self.expand_one(property, e.as_ref(), false));
        }
        let mut res = vec![];
        for s in srcs {
            for p in self.expand_one(property, s.as_ref(), true) {
                if !expanded_excludes.contains(&p) {
                    res.push(p);
                }
            }
        }
        res
    }

    fn expand_one(&mut self, property: &str, s: &str, check_exists: bool) -> Vec<String> {
        if let Some((name, tag)) = src_is_module_with_tag(s) {
            return self.output_files_of_dep(property, name, tag);
        }
        let dir = self.module_dir();
        let joined = match validate_path(&[&dir, s]) {
            Ok(p) => p,
            Err(e) => {
                self.property_errorf(property, e.to_string());
                return vec![];
            }
        };
        if check_exists && !self.base.config.source_exists(&joined) {
            self.property_errorf(
                property,
                format!("module source path {joined:?} does not exist"),
            );
        }
        vec![joined]
    }

    fn output_files_of_dep(&mut self, property: &str, name: &str, tag: &str) -> Vec<String> {
        let dep_tag = DepTag::new(SourceOrOutputDepTag {
            tag: tag.to_string(),
        });
        let Some(dep) = self.direct_dep_with_tag(name, &dep_tag) else {
            if self.base.config.allow_missing_dependencies() {
                self.missing_deps.push(name.to_string());
            } else {
                self.unresolved_errorf(Some(property), format!("module {name:?} not found"));
            }
            return vec![];
        };
        let why = match dep.provider(&OUTPUT_FILES_PROVIDER) {
            None => "module does not produce output files".to_string(),
            Some(info) => match info.get(tag) {
                Some([]) => "no output files".to_string(),
                Some(files) => return files.to_vec(),
                None => format!("unsupported module reference tag {tag:?}"),
            },
        };
        self.property_errorf(
            property,
            format!("failed to get output file from module {name:?} at tag {tag:?}: {why}"),
        );
        vec![]
    }

    /// Publishes the files other modules get through `:name{tag}`.
    pub fn set_output_files(&mut self, files: Vec<String>, tag: &str) {
        let info = self.output_files.get_or_insert_with(OutputFilesInfo::default);
        if tag.is_empty() {
            info.default = files;
        } else {
            info.tagged.push((tag.to_string(), files));
        }
    }

    fn install_statement(&mut self, full: &InstallPath, stmt: BuildStatement) {
        let deps = self.deps_install_files.clone();
        let stmt = if self.is_host() {
            stmt.implicits(deps)
        } else {
            stmt.order_only(deps)
        };
        self.build(stmt.output(full));
        self.install_files.push(full.as_str().to_string());
    }

    fn package_spec(
        &self,
        full: &InstallPath,
        src: Option<&str>,
        symlink: Option<&str>,
        executable: bool,
    ) -> PackagingSpec {
        PackagingSpec {
            rel_path_in_package: full.rel().to_string(),
            src_path: src.map(str::to_string),
            symlink_target: symlink.map(str::to_string),
            executable,
            effective_license_files: self.facts.license_files.clone(),
            partition: full.partition().to_string(),
        }
    }

    fn install_file_impl(
        &mut self,
        dir: &InstallPath,
        name: &str,
        src: &str,
        executable: bool,
    ) -> Option<InstallPath> {
        let full = match dir.join(&[name]) {
            Ok(p) => p,
            Err(e) => {
                self.module_errorf(e.to_string());
                return None;
            }
        };
        if !self.facts.skip_install {
            let (rule, command) = if executable {
                ("cp_executable", "rm -f $out && cp -f $in $out && chmod +x $out")
            } else {
                ("cp", "rm -f $out && cp -f $in $out")
            };
            let desc = format!("install {}", soongutil::path::base(full.as_str()));
            self.install_statement(
                &full,
                BuildStatement::new(rule, command)
                    .input(src)
                    .description(desc),
            );
        }
        let spec = self.package_spec(&full, Some(src), None, executable);
        self.packaging_specs.push(spec);
        Some(full)
    }

    /// Installs `src` as `dir/name`.
    pub fn install_file(
        &mut self,
        dir: &InstallPath,
        name: &str,
        src: &str,
    ) -> Option<InstallPath> {
        self.install_file_impl(dir, name, src, false)
    }

    pub fn install_executable(
        &mut self,
        dir: &InstallPath,
        name: &str,
        src: &str,
    ) -> Option<InstallPath> {
        self.install_file_impl(dir, name, src, true)
    }

    /// Installs `dir/name` as a relative symlink to another installed file.
    pub fn install_symlink(
        &mut self,
        dir: &InstallPath,
        name: &str,
        target: &InstallPath,
    ) -> Option<InstallPath> {
        let full = match dir.join(&[name]) {
            Ok(p) => p,
            Err(e) => {
                self.module_errorf(e.to_string());
                return None;
            }
        };
        let rel = relative_to(soongutil::path::dir(full.as_str()), target.as_str());
        if !self.facts.skip_install {
            let desc = format!("install symlink {}", soongutil::path::base(full.as_str()));
            self.install_statement(
                &full,
                BuildStatement::new("symlink", format!("rm -f $out && ln -sfn {rel} $out"))
                    .input(target.as_str())
                    .description(desc),
            );
        }
        let spec = self.package_spec(&full, None, Some(&rel), false);
        self.packaging_specs.push(spec);
        Some(full)
    }
}

impl BuilderContext for ModuleContext<'_> {
    fn config(&self) -> &Config {
        self.base.config
    }

    fn build(&mut self, mut stmt: BuildStatement) {
        let r = self.module_ref();
        stmt.owner = if r.variant.is_empty() {
            r.name
        } else {
            format!("{} ({})", r.name, r.variant)
        };
        self.statements.push(stmt);
    }

    fn phony(&mut self, name: &str, deps: Vec<String>) {
        self.phonies.push((name.to_string(), deps));
    }

    fn errorf(&mut self, msg: String) {
        self.module_errorf(msg);
    }
}

/// Path of `target` relative to the directory `from`.
fn relative_to(from: &str, target: &str) -> String {
    let from: Vec<&str> = from.split('/').filter(|c| !c.is_empty() && *c != ".").collect();
    let to: Vec<&str> = target.split('/').filter(|c| !c.is_empty() && *c != ".").collect();
    let common = from.iter().zip(to.iter()).take_while(|(a, b)| a == b).count();
    let mut parts: Vec<&str> = vec![".."; from.len() - common];
    parts.extend(&to[common..]);
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// Context of a singleton: sees every module after build actions were
/// generated.
pub struct SingletonContext<'a> {
    graph: &'a ModuleGraph,
    config: &'a Config,
    name: &'a str,
    pub(crate) statements: Vec<BuildStatement>,
    pub(crate) phonies: Vec<(String, Vec<String>)>,
    pub(crate) dists: Vec<(Vec<String>, Vec<String>)>,
    pub(crate) diags: Vec<Diagnostic>,
}

impl<'a> SingletonContext<'a> {
    pub(crate) fn new(graph: &'a ModuleGraph, config: &'a Config, name: &'a str) -> Self {
        SingletonContext {
            graph,
            config,
            name,
            statements: vec![],
            phonies: vec![],
            dists: vec![],
            diags: vec![],
        }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    /// Every module variant, in creation order.
    pub fn modules(&self) -> impl Iterator<Item = ModuleHandle<'a>> + use<'a> {
        let graph = self.graph;
        graph
            .variants()
            .iter()
            .map(move |id| ModuleHandle::new(graph, *id))
    }

    pub fn module_provider<T: Send + Sync + 'static>(
        &self,
        module: ModuleHandle<'_>,
        key: &ProviderKey<T>,
    ) -> Option<Arc<T>> {
        module.provider(key)
    }

    /// Copies `paths` to the dist directory when any of `goals` is built.
    pub fn dist_for_goals(&mut self, goals: &[&str], paths: Vec<String>) {
        self.dists
            .push((goals.iter().map(|g| g.to_string()).collect(), paths));
    }

    /// Reports generated metadata that could not be encoded.
    pub fn marshal_errorf(&mut self, msg: impl Into<String>) {
        self.diags.push(Diagnostic::global(DiagnosticKind::Marshal, msg));
    }

    pub fn module_errorf(&mut self, module: ModuleHandle<'_>, msg: impl Into<String>) {
        self.diags.push(Diagnostic {
            module: Some(module.module_ref()),
            property: None,
            kind: DiagnosticKind::Module,
            message: msg.into(),
        });
    }
}

impl BuilderContext for SingletonContext<'_> {
    fn config(&self) -> &Config {
        self.config
    }

    fn build(&mut self, mut stmt: BuildStatement) {
        stmt.owner = format!("singleton {}", self.name);
        self.statements.push(stmt);
    }

    fn phony(&mut self, name: &str, deps: Vec<String>) {
        self.phonies.push((name.to_string(), deps));
    }

    fn errorf(&mut self, msg: String) {
        self.diags
            .push(Diagnostic::global(DiagnosticKind::Module, msg));
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Records statements for tests of code that only needs a
    /// [`BuilderContext`].
    pub(crate) struct RecordingContext<'a> {
        config: &'a Config,
        pub(crate) statements: Vec<BuildStatement>,
        pub(crate) phonies: Vec<(String, Vec<String>)>,
        pub(crate) errors: Vec<String>,
    }

    impl<'a> RecordingContext<'a> {
        pub(crate) fn new(config: &'a Config) -> Self {
            RecordingContext {
                config,
                statements: vec![],
                phonies: vec![],
                errors: vec![],
            }
        }
    }

    impl BuilderContext for RecordingContext<'_> {
        fn config(&self) -> &Config {
            self.config
        }

        fn build(&mut self, stmt: BuildStatement) {
            self.statements.push(stmt);
        }

        fn phony(&mut self, name: &str, deps: Vec<String>) {
            self.phonies.push((name.to_string(), deps));
        }

        fn errorf(&mut self, msg: String) {
            self.errors.push(msg);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    #[test]
    fn relative_symlink_targets() {
        assert_eq!(relative_to("out/sys/bin", "out/sys/lib/x.so"), "../lib/x.so");
        assert_eq!(relative_to("out/sys/bin", "out/sys/bin/x"), "x");
        assert_eq!(relative_to("a/b", "c"), "../../c");
    }
}
