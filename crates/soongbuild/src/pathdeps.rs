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

//! Adds a dependency for every `:module` or `:module{tag}` reference found in
//! a path property.

use soongutil::{common::first_unique, path::src_is_module_with_tag};

use crate::{
    context::BottomUpMutatorContext,
    deptag::SourceOrOutputDepTag,
    module::Module,
    mutator::RegisterMutatorsContext,
    properties::path_properties_of,
};

pub(crate) fn register_mutator(ctx: &mut RegisterMutatorsContext) {
    ctx.bottom_up("pathdeps", path_deps_mutator).parallel();
}

/// The `(module, tag)` pairs referenced by `paths`, without duplicates.
pub fn module_references(paths: &[String]) -> Vec<(String, String)> {
    first_unique(
        paths
            .iter()
            .filter_map(|p| src_is_module_with_tag(p))
            .map(|(m, t)| (m.to_string(), t.to_string())),
    )
}

fn path_deps_mutator(ctx: &mut BottomUpMutatorContext<'_>, module: &mut dyn Module) {
    if module.is_defaults() {
        return;
    }
    let paths = path_properties_of(module.property_schema(), module.base().properties());
    for (name, tag) in module_references(&paths) {
        ctx.add_dependency(SourceOrOutputDepTag { tag }, &[name]);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    #[test]
    fn references_are_deduplicated() {
        let paths: Vec<String> = ["a.txt", ":gen", ":gen{.out}", ":gen", "b/:x"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            module_references(&paths),
            vec![
                ("gen".to_string(), String::new()),
                ("gen".to_string(), ".out".to_string())
            ]
        );
    }
}
