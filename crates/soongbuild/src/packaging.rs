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

//! Install closures and packaging of dependencies into directories and
//! zips.
//!
//! Every module variant publishes an [`InstallFilesInfo`] with its own
//! installed files and packaging specs plus those forwarded from its
//! install dependencies. Packaging modules gather the transitive specs of
//! their packaging-item dependencies and copy them into place.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use soongutil::{
    arch::{ArchType, Target},
    common::first_unique,
    depset::{DepSet, DepSetOrder},
};

use crate::{
    context::{BottomUpMutatorContext, ModuleContext},
    deptag::DepTag,
    graph::ModuleGraph,
    model::{VariantId, Variation},
    module::ModuleBase,
    paths::{OutputPath, WritablePath},
    properties::{Field, Schema},
    provider::ProviderKey,
    raw_files::write_executable_file_rule_verbatim,
    rule_builder::{RuleBuilder, quote},
};

/// One file as it appears inside a package.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PackagingSpec {
    pub(crate) rel_path_in_package: String,
    pub(crate) src_path: Option<String>,
    pub(crate) symlink_target: Option<String>,
    pub(crate) executable: bool,
    pub(crate) effective_license_files: Vec<String>,
    pub(crate) partition: String,
}

impl PackagingSpec {
    pub fn rel_path_in_package(&self) -> &str {
        &self.rel_path_in_package
    }

    pub fn file_name(&self) -> &str {
        soongutil::path::base(&self.rel_path_in_package)
    }

    pub fn src_path(&self) -> Option<&str> {
        self.src_path.as_deref()
    }

    pub fn symlink_target(&self) -> Option<&str> {
        self.symlink_target.as_deref()
    }

    pub fn is_executable(&self) -> bool {
        self.executable
    }

    pub fn effective_license_files(&self) -> &[String] {
        &self.effective_license_files
    }

    pub fn partition(&self) -> &str {
        &self.partition
    }
}

#[derive(Clone, Debug)]
pub struct InstallFilesInfo {
    pub install_files: Vec<String>,
    pub packaging_specs: Vec<PackagingSpec>,
    pub transitive_install_files: DepSet<String>,
    pub transitive_packaging_specs: DepSet<PackagingSpec>,
}

pub static INSTALL_FILES_PROVIDER: ProviderKey<InstallFilesInfo> =
    ProviderKey::new("InstallFilesInfo");

/// The transitive sets a variant inherits from its install dependencies.
pub(crate) struct InstallDeps {
    pub(crate) files: Vec<DepSet<String>>,
    pub(crate) specs: Vec<DepSet<PackagingSpec>>,
}

impl InstallDeps {
    /// Packaging specs are forwarded along every install edge. Installed
    /// files only when the dependency is installed itself or the edge always
    /// needs installation.
    pub(crate) fn of(graph: &ModuleGraph, id: VariantId) -> Self {
        let mut files = vec![];
        let mut specs = vec![];
        for edge in graph.node(id).deps() {
            let always = edge.tag.install_always_needed();
            if !always && !edge.tag.install_dep_needed() {
                continue;
            }
            let target = graph.node(edge.target);
            let Some(info) = target.providers.get(&INSTALL_FILES_PROVIDER) else {
                continue;
            };
            specs.push(info.transitive_packaging_specs.clone());
            let dep_skipped = target.module.read().base().is_skip_install();
            if always || !dep_skipped {
                files.push(info.transitive_install_files.clone());
            }
        }
        InstallDeps { files, specs }
    }

    pub(crate) fn install_files(&self) -> Vec<String> {
        DepSet::new(DepSetOrder::Postorder, vec![], self.files.clone()).to_list()
    }

    pub(crate) fn finish(
        self,
        install_files: Vec<String>,
        packaging_specs: Vec<PackagingSpec>,
    ) -> InstallFilesInfo {
        InstallFilesInfo {
            transitive_install_files: DepSet::new(
                DepSetOrder::Postorder,
                install_files.clone(),
                self.files,
            ),
            transitive_packaging_specs: DepSet::new(
                DepSetOrder::Postorder,
                packaging_specs.clone(),
                self.specs,
            ),
            install_files,
            packaging_specs,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepsProperty {
    pub deps: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackagingMultilibProperties {
    pub first: DepsProperty,
    pub common: DepsProperty,
    pub lib32: DepsProperty,
    pub lib64: DepsProperty,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackagingArchProperties {
    pub arm64: DepsProperty,
    pub arm: DepsProperty,
    pub x86_64: DepsProperty,
    pub x86: DepsProperty,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackagingProperties {
    pub deps: Vec<String>,
    pub multilib: PackagingMultilibProperties,
    pub arch: PackagingArchProperties,
}

static DEPS_SCHEMA: Schema = Schema {
    name: "packaging.deps",
    fields: &[Field::plain("deps")],
};

pub(crate) static MULTILIB_SCHEMA: Schema = Schema {
    name: "packaging.multilib",
    fields: &[
        Field::nested("first", &DEPS_SCHEMA),
        Field::nested("common", &DEPS_SCHEMA),
        Field::nested("lib32", &DEPS_SCHEMA),
        Field::nested("lib64", &DEPS_SCHEMA),
    ],
};

pub(crate) static ARCH_SCHEMA: Schema = Schema {
    name: "packaging.arch",
    fields: &[
        Field::nested("arm64", &DEPS_SCHEMA),
        Field::nested("arm", &DEPS_SCHEMA),
        Field::nested("x86_64", &DEPS_SCHEMA),
        Field::nested("x86", &DEPS_SCHEMA),
    ],
};

/// Properties of every packaging module type.
pub static PACKAGING_SCHEMA: Schema = Schema {
    name: "packaging",
    fields: &[
        Field::plain("deps"),
        Field::nested("multilib", &MULTILIB_SCHEMA),
        Field::nested("arch", &ARCH_SCHEMA),
    ],
};

/// Shared state of module types that package their dependencies.
#[derive(Clone, Debug, Default)]
pub struct PackagingBase {
    pub properties: PackagingProperties,
    /// Skip dependencies on modules that do not exist.
    pub ignore_missing_dependencies: bool,
}

impl PackagingBase {
    /// The dependencies to package for `arch`.
    pub fn deps_for_arch(
        &self,
        target: Target,
        multi_targets: &[Target],
        arch: ArchType,
    ) -> Vec<String> {
        let props = &self.properties;
        let mut ret: Vec<String> = vec![];
        if arch == target.arch && multi_targets.is_empty() {
            ret.extend(props.deps.iter().cloned());
        } else if arch.multilib() == "lib32" {
            ret.extend(props.multilib.lib32.deps.iter().cloned());
        } else if arch.multilib() == "lib64" {
            ret.extend(props.multilib.lib64.deps.iter().cloned());
        } else if arch == ArchType::Common {
            ret.extend(props.multilib.common.deps.iter().cloned());
        }

        for (i, t) in multi_targets.iter().enumerate() {
            if t.arch == arch {
                ret.extend(props.deps.iter().cloned());
                if i == 0 {
                    ret.extend(props.multilib.first.deps.iter().cloned());
                }
            }
        }

        if target.arch == ArchType::Common {
            let per_arch = match arch {
                ArchType::Arm64 => &props.arch.arm64.deps,
                ArchType::Arm => &props.arch.arm.deps,
                ArchType::X86_64 => &props.arch.x86_64.deps,
                ArchType::X86 => &props.arch.x86.deps,
                _ => &vec![],
            };
            ret.extend(per_arch.iter().cloned());
        }
        first_unique(ret)
    }

    /// The own target, its common-arch sibling and every multi target.
    pub fn supported_targets(target: Target, multi_targets: &[Target]) -> Vec<Target> {
        let mut ret = vec![target];
        if target.arch != ArchType::Common {
            ret.push(Target::new(target.os, ArchType::Common));
        }
        ret.extend_from_slice(multi_targets);
        ret
    }

    /// Depends on the packaged modules, each in the variant of the target it
    /// is packaged for.
    pub fn add_deps(&self, ctx: &mut BottomUpMutatorContext<'_>, base: &ModuleBase, tag: DepTag) {
        let Some(target) = base.target() else {
            return;
        };
        let multi = base.multi_targets();
        for t in Self::supported_targets(target, multi) {
            let variation = [Variation::new("arch", t.variation())];
            for dep in self.deps_for_arch(target, multi, t.arch) {
                if self.ignore_missing_dependencies && !ctx.other_module_exists(&dep) {
                    continue;
                }
                ctx.add_far_variation_dependencies(&variation, tag.clone(), &[dep]);
            }
        }
    }

    pub fn gather_packaging_specs(
        &self,
        ctx: &ModuleContext<'_>,
    ) -> BTreeMap<String, PackagingSpec> {
        self.gather_packaging_specs_with_filter(ctx, |_| true)
    }

    /// Collects the transitive specs of packaging-item dependencies. The
    /// first spec for a path wins.
    pub fn gather_packaging_specs_with_filter(
        &self,
        ctx: &ModuleContext<'_>,
        filter: impl Fn(&PackagingSpec) -> bool,
    ) -> BTreeMap<String, PackagingSpec> {
        let mut m = BTreeMap::new();
        for dep in ctx.direct_deps() {
            if !dep.tag().is_packaging_item() {
                continue;
            }
            let Some(info) = dep.provider(&INSTALL_FILES_PROVIDER) else {
                continue;
            };
            for ps in info.transitive_packaging_specs.to_list() {
                if !filter(&ps) {
                    continue;
                }
                m.entry(ps.rel_path_in_package.clone()).or_insert(ps);
            }
        }
        m
    }

    /// Adds a command running a generated `preparer.sh` that copies `specs`
    /// below `dir`. Returns the packaged paths.
    pub fn copy_specs_to_dir(
        &self,
        ctx: &mut ModuleContext<'_>,
        builder: &mut RuleBuilder,
        specs: &BTreeMap<String, PackagingSpec>,
        dir: &dyn WritablePath,
    ) -> Vec<String> {
        let mut entries = vec![];
        if specs.is_empty() {
            return entries;
        }
        let Some(preparer) = ctx.path_for_module_out(&["preparer.sh"]) else {
            return entries;
        };
        let cmd = builder.command();
        cmd.tool(preparer.as_str());
        let mut seen_dirs: Vec<String> = vec![];
        let mut script = String::from("set -e\n");
        for ps in specs.values() {
            let dest = soongutil::path::join(&[dir.as_str(), &ps.rel_path_in_package]);
            let dest_dir = soongutil::path::dir(&dest).to_string();
            entries.push(ps.rel_path_in_package.clone());
            if !seen_dirs.contains(&dest_dir) {
                script.push_str(&format!("mkdir -p {}\n", quote(&dest_dir)));
                seen_dirs.push(dest_dir);
            }
            let dest = quote(&dest);
            match (&ps.symlink_target, &ps.src_path) {
                (Some(link), _) => script.push_str(&format!("ln -sf {} {dest}\n", quote(link))),
                (None, Some(src)) => {
                    cmd.implicit(src);
                    script.push_str(&format!("cp {} {dest}\n", quote(src)));
                }
                (None, None) => {}
            }
            if ps.executable {
                script.push_str(&format!("chmod a+x {dest}\n"));
            }
        }
        write_executable_file_rule_verbatim(ctx, &preparer, &script);
        entries
    }

    /// Stages `specs` in a temporary directory and zips it to `zip_out`.
    pub fn copy_deps_to_zip(
        &self,
        ctx: &mut ModuleContext<'_>,
        specs: &BTreeMap<String, PackagingSpec>,
        zip_out: &OutputPath,
    ) -> Vec<String> {
        let mut builder = RuleBuilder::new();
        let Some(dir) = ctx.path_for_module_out(&[".zip"]) else {
            return vec![];
        };
        builder.command().text("rm").flag("-rf").text(dir.as_str());
        builder.command().text("mkdir").flag("-p").text(dir.as_str());
        let entries = self.copy_specs_to_dir(ctx, &mut builder, specs, &dir);

        let config = ctx.config();
        builder
            .command()
            .built_tool(config, "soong_zip")
            .flag_with_output("-o ", zip_out)
            .flag_with_arg("-C ", dir.as_str())
            .flag("-L 0")
            .flag_with_arg("-D ", dir.as_str());
        builder.command().text("rm").flag("-rf").text(dir.as_str());

        let desc = format!("Zipping deps for {}", ctx.module_name());
        builder.build(ctx, "zip_deps", &desc);
        entries
    }
}
