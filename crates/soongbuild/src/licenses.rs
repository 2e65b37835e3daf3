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

//! License propagation.
//!
//! The applicable licenses of a module are its own `licenses` property,
//! merged with those of its defaults, or else the `default_applicable_licenses`
//! of the package declared in the module's own directory. Packages of parent
//! directories never apply. Each module then gets the kinds, conditions and
//! texts of its licenses, and the inherited closure over its dependencies.

use std::collections::HashSet;

use soongutil::common::sorted_unique;

use crate::{
    context::{BottomUpMutatorContext, TopDownMutatorContext},
    deptag::{LicenseKindDepTag, LicensesDepTag},
    makevars::MakeVarsContext,
    module::{EffectiveLicenses, Module},
    modules::{
        license::{LicenseKindModule, LicenseModule},
        package::{PackageMap, PackageModule},
    },
    mutator::RegisterMutatorsContext,
    paths::host_tool_path,
    provider::ProviderKey,
};

/// The applicable licenses of a module variant.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LicenseInfo {
    pub licenses: Vec<String>,
}

pub static LICENSE_INFO_PROVIDER: ProviderKey<LicenseInfo> = ProviderKey::new("LicenseInfo");

fn exempt(module: &dyn Module) -> bool {
    module.license_exempt() || module.is_defaults()
}

pub(crate) fn register_package_mapper(ctx: &mut RegisterMutatorsContext) {
    ctx.bottom_up("licenses_package_mapper", package_mapper).parallel();
}

pub(crate) fn register_property_gatherer(ctx: &mut RegisterMutatorsContext) {
    ctx.bottom_up("licenses_property_gatherer", property_gatherer)
        .parallel();
}

pub(crate) fn register_dependency_checker(ctx: &mut RegisterMutatorsContext) {
    ctx.bottom_up("licenses_dependency_checker", dependency_checker)
        .parallel();
}

pub(crate) fn register_flattener(ctx: &mut RegisterMutatorsContext) {
    ctx.top_down("licenses_flattener", flattener).parallel();
    ctx.top_down("licenses_inherited", inherited).parallel();
}

fn package_mapper(ctx: &mut BottomUpMutatorContext<'_>, module: &mut dyn Module) {
    let Some(package) = module.downcast_ref::<PackageModule>() else {
        return;
    };
    PackageMap::of(ctx.config()).insert(ctx.module_dir(), package.properties.clone());
}

/// The licenses a module declares, or the defaults of its package.
fn applicable_licenses(ctx: &mut BottomUpMutatorContext<'_>, module: &dyn Module) -> Vec<String> {
    let own = &module.base().common().licenses;
    if !own.is_empty() {
        let mut seen = HashSet::new();
        for l in own {
            if !seen.insert(l) {
                ctx.module_errorf(format!("duplicate {l:?} licenses"));
            }
        }
        return own.clone();
    }
    PackageMap::of(ctx.config())
        .get(&ctx.module_dir())
        .map(|p| p.default_applicable_licenses)
        .unwrap_or_default()
}

fn property_gatherer(ctx: &mut BottomUpMutatorContext<'_>, module: &mut dyn Module) {
    if exempt(module) {
        return;
    }
    let licenses = applicable_licenses(ctx, module);
    if !licenses.is_empty() {
        ctx.add_variation_dependencies(&[], LicensesDepTag, &licenses);
    }
}

fn dependency_checker(ctx: &mut BottomUpMutatorContext<'_>, module: &mut dyn Module) {
    if module.is::<LicenseModule>() {
        for dep in ctx.direct_deps_with_tag::<LicenseKindDepTag>() {
            if !dep.module().is::<LicenseKindModule>() {
                ctx.module_errorf(format!(
                    "license_kinds property {:?} is not a license_kind module",
                    dep.name()
                ));
            }
        }
        return;
    }
    if exempt(module) {
        return;
    }
    for dep in ctx.direct_deps_with_tag::<LicensesDepTag>() {
        if !dep.module().is::<LicenseModule>() {
            ctx.module_errorf(format!(
                "licenses property {:?} is not a license module",
                dep.name()
            ));
        }
    }
}

/// The facts a license module contributes to the modules naming it.
fn license_facts(ctx: &TopDownMutatorContext<'_>, license: &LicenseModule) -> EffectiveLicenses {
    let props = &license.properties;
    let mut conditions = vec![];
    for dep in ctx.direct_deps_with_tag::<LicenseKindDepTag>() {
        if let Some(kind) = dep.module().downcast_ref::<LicenseKindModule>() {
            conditions.extend(kind.properties.conditions.iter().cloned());
        }
    }
    let dir = ctx.module_dir();
    let package = props.package_name.clone().unwrap_or_default();
    let texts = props
        .license_text
        .iter()
        .map(|t| (soongutil::path::join(&[&dir, t]), package.clone()));
    EffectiveLicenses {
        licenses: vec![ctx.module_name().to_string()],
        kinds: sorted_unique(props.license_kinds.iter().cloned()),
        conditions: sorted_unique(conditions),
        texts: sorted_unique(texts),
        package_name: props.package_name.clone(),
        inherited: vec![],
    }
}

/// Merges the facts of every license the module applies.
fn flattener(ctx: &mut TopDownMutatorContext<'_>, module: &mut dyn Module) {
    if let Some(license) = module.downcast_ref::<LicenseModule>() {
        let facts = license_facts(ctx, license);
        module.base_mut().licenses = facts;
        return;
    }
    if exempt(module) {
        return;
    }

    let mut res = EffectiveLicenses::default();
    let mut names = vec![];
    for dep in ctx.direct_deps_with_tag::<LicensesDepTag>() {
        let m = dep.module();
        if !m.is::<LicenseModule>() {
            continue;
        }
        names.push(dep.name().to_string());
        let facts = m.base().effective_licenses();
        if res.package_name.is_none() {
            res.package_name = facts.package_name.clone();
        }
        res.licenses.extend(facts.licenses.iter().cloned());
        res.kinds.extend(facts.kinds.iter().cloned());
        res.conditions.extend(facts.conditions.iter().cloned());
        res.texts.extend(facts.texts.iter().cloned());
    }
    res.licenses = sorted_unique(res.licenses);
    res.kinds = sorted_unique(res.kinds);
    res.conditions = sorted_unique(res.conditions);
    res.texts = sorted_unique(res.texts);
    module.base_mut().licenses = res;
    ctx.set_provider(&LICENSE_INFO_PROVIDER, LicenseInfo { licenses: names });
}

/// Own licenses together with the inherited licenses of every dependency,
/// except through edges excluded from inheritance and prebuilts that lost
/// to their source module.
pub fn inherited_licenses(ctx: &TopDownMutatorContext<'_>, module: &dyn Module) -> Vec<String> {
    let mut res: Vec<String> = module.base().effective_licenses().licenses.clone();
    for dep in ctx.direct_deps() {
        if dep.tag().exclude_from_license_inheritance() {
            continue;
        }
        let m = dep.module();
        if m.prebuilt().is_some_and(|p| !p.is_selected()) {
            continue;
        }
        res.extend(m.base().effective_licenses().inherited.iter().cloned());
    }
    sorted_unique(res)
}

fn inherited(ctx: &mut TopDownMutatorContext<'_>, module: &mut dyn Module) {
    if exempt(module) {
        return;
    }
    let res = inherited_licenses(ctx, module);
    module.base_mut().licenses.inherited = res;
}

/// Host tools of the license metadata pipeline, exported to Make.
pub(crate) fn make_vars(ctx: &mut MakeVarsContext<'_>) {
    const TOOLS: &[(&str, &str)] = &[
        ("BUILD_LICENSE_METADATA", "build_license_metadata"),
        ("COPY_LICENSE_METADATA", "copy_license_metadata"),
        ("HTMLNOTICE", "htmlnotice"),
        ("XMLNOTICE", "xmlnotice"),
        ("TEXTNOTICE", "textnotice"),
        ("COMPLIANCENOTICE_BOM", "compliancenotice_bom"),
        ("COMPLIANCENOTICE_SHIPPEDLIBS", "compliancenotice_shippedlibs"),
        ("COMPLIANCE_LISTSHARE", "compliance_listshare"),
        ("COMPLIANCE_CHECKSHARE", "compliance_checkshare"),
        ("COMPLIANCE_SBOM", "compliance_sbom"),
    ];
    for (name, tool) in TOOLS {
        match host_tool_path(ctx.config(), tool) {
            Ok(path) => ctx.strict(name, path.as_str()),
            Err(e) => ctx.errorf(format!("{name}: {e}")),
        }
    }
}
