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

//! Defaults modules: property bags merged into the modules naming them in
//! their `defaults` property.
//!
//! A defaults module may itself name defaults. Merging runs top-down, so by
//! the time a module reads a defaults module its bag already holds the whole
//! chain.

use log::trace;

use crate::{
    context::{BottomUpMutatorContext, TopDownMutatorContext},
    deptag::DefaultsDepTag,
    module::Module,
    mutator::RegisterMutatorsContext,
    properties::{PropertyBag, extend_properties},
};

pub(crate) fn register_mutators(ctx: &mut RegisterMutatorsContext) {
    ctx.bottom_up("defaults_deps", defaults_deps_mutator).parallel();
    ctx.top_down("defaults", defaults_mutator).parallel();
}

fn defaults_deps_mutator(ctx: &mut BottomUpMutatorContext<'_>, module: &mut dyn Module) {
    let defaults = &module.base().common().defaults;
    if !defaults.is_empty() {
        ctx.add_dependency(DefaultsDepTag, defaults.as_slice());
    }
}

/// Applies each defaults module in the order listed. Lists are prepended, so
/// later defaults come first; a scalar keeps the first value it receives.
pub fn apply_defaults<'b>(
    bag: &mut PropertyBag,
    defaults: impl IntoIterator<Item = &'b PropertyBag>,
) {
    for d in defaults {
        extend_properties(bag, d);
    }
}

fn defaults_mutator(ctx: &mut TopDownMutatorContext<'_>, module: &mut dyn Module) {
    if module.base().common().defaults.is_empty() {
        return;
    }
    let mut bags = vec![];
    for dep in ctx.direct_deps_with_tag::<DefaultsDepTag>() {
        let m = dep.module();
        if !m.is_defaults() {
            let msg = format!("module {:?} is not a defaults module", dep.name());
            drop(m);
            ctx.property_errorf("defaults", msg);
            continue;
        }
        bags.push(m.base().properties().clone());
    }
    if bags.is_empty() {
        return;
    }
    trace!("applying {} defaults to {}", bags.len(), ctx.module_name());

    let mut bag = module.base().properties().clone();
    apply_defaults(&mut bag, &bags);
    let base = module.base_mut();
    base.bag = bag;
    if let Err(e) = base.load_common() {
        ctx.module_errorf(format!("failed to apply defaults: {e}"));
        return;
    }
    let bag = module.base().properties().clone();
    if let Err(e) = module.load_properties(&bag) {
        ctx.module_errorf(format!("failed to apply defaults: {e}"));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use super::*;
    use serde_json::{Value, json};
    use test_log::test;

    fn bag(v: Value) -> PropertyBag {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn defaults_apply_in_listed_order() {
        let mut own = bag(json!({"srcs": ["own"], "licenses": ["L"]}));
        let d1 = bag(json!({"srcs": ["d1"], "stem": "d1", "licenses": ["L", "M"]}));
        let d2 = bag(json!({"srcs": ["d2"], "stem": "d2"}));
        apply_defaults(&mut own, [&d1, &d2]);
        assert_eq!(
            Value::Object(own),
            json!({
                "srcs": ["d2", "d1", "own"],
                "licenses": ["L", "M"],
                "stem": "d1",
            })
        );
    }
}
