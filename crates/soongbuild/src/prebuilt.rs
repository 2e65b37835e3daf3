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

//! Prebuilt modules: checked-in artifacts that stand in for a source module
//! of the same name.
//!
//! A prebuilt of `foo` is registered as `prebuilt_foo`. When no `foo`
//! exists the prebuilt takes over the plain name. Otherwise every source
//! module depends on its prebuilt, and once dependencies are resolved the
//! selected one of the pair receives the dependencies of the other.

use serde::{Deserialize, Serialize};

use crate::{
    context::BottomUpMutatorContext,
    deptag::PrebuiltDepTag,
    module::Module,
    mutator::RegisterMutatorsContext,
};

pub const PREBUILT_PREFIX: &str = "prebuilt_";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrebuiltProperties {
    /// Use the prebuilt even when the source module exists.
    pub prefer: bool,
}

#[derive(Clone, Debug, Default)]
pub struct Prebuilt {
    pub properties: PrebuiltProperties,
    selected: bool,
}

impl Prebuilt {
    /// Whether this prebuilt replaces its source module, known after the
    /// post-deps phase.
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn prefer(&self) -> bool {
        self.properties.prefer
    }
}

/// `prebuilt_foo` -> `foo`.
pub fn source_module_name(name: &str) -> &str {
    name.strip_prefix(PREBUILT_PREFIX).unwrap_or(name)
}

pub(crate) fn register_rename(ctx: &mut RegisterMutatorsContext) {
    ctx.bottom_up("prebuilt_rename", prebuilt_rename_mutator).parallel();
}

pub(crate) fn register_select(ctx: &mut RegisterMutatorsContext) {
    ctx.bottom_up("prebuilt_select", prebuilt_select_mutator).parallel();
}

fn prebuilt_rename_mutator(ctx: &mut BottomUpMutatorContext<'_>, module: &mut dyn Module) {
    if module.prebuilt().is_none() {
        return;
    }
    let name = ctx.module_name();
    let source = source_module_name(name);
    if source != name && !ctx.other_module_exists(source) {
        ctx.rename(source);
    }
}

/// Makes a source module depend on its prebuilt, if one exists.
pub(crate) fn add_prebuilt_dependency(ctx: &mut BottomUpMutatorContext<'_>, module: &dyn Module) {
    if module.prebuilt().is_some() {
        return;
    }
    let prebuilt = format!("{PREBUILT_PREFIX}{}", ctx.module_name());
    if ctx.other_module_exists(&prebuilt) {
        ctx.add_dependency(PrebuiltDepTag, &[prebuilt]);
    }
}

fn prebuilt_select_mutator(ctx: &mut BottomUpMutatorContext<'_>, module: &mut dyn Module) {
    if module.prebuilt().is_none() {
        // Source modules are visited before their prebuilt.
        let preferred = ctx.direct_deps_with_tag::<PrebuiltDepTag>().any(|dep| {
            let m = dep.module();
            m.base().enabled() && m.prebuilt().is_some_and(Prebuilt::prefer)
        });
        if preferred {
            let base = module.base_mut();
            base.replaced_by_prebuilt = true;
            base.skip_install = true;
        }
        return;
    }

    let name = ctx.module_name();
    let source = source_module_name(name);
    let has_source = source != name && ctx.other_module_exists(source);
    let enabled = module.base().enabled();
    let Some(prebuilt) = module.prebuilt_mut() else {
        return;
    };
    prebuilt.selected = enabled && (prebuilt.prefer() || !has_source);
    let selected = prebuilt.selected;
    if !selected {
        module.base_mut().skip_install = true;
    } else if has_source {
        ctx.replace_dependencies(source);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    #[test]
    fn source_names() {
        assert_eq!(source_module_name("prebuilt_foo"), "foo");
        assert_eq!(source_module_name("foo"), "foo");
    }
}
