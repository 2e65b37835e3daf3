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

//! Classification of modules providing the configured boot jars.
//!
//! The classification table is owned by the two passes that read it and
//! shared between them through an `Arc`. Both passes are serial: a module
//! claims a table entry, and the first claim wins.

use std::{collections::BTreeMap, sync::Arc};

use log::debug;
use parking_lot::Mutex;
use soongutil::{config::Config, path::is_under};

use crate::{
    context::BottomUpMutatorContext, module::Module, mutator::RegisterMutatorsContext,
    prebuilt::source_module_name,
};

/// Modules that produce a dex jar.
pub trait HasDexJar {
    /// The dex jar built for this variant, if any.
    fn dex_jar_build_path(&self) -> Option<&str>;
}

const HIDDENAPI_SUFFIX: &str = "-hiddenapi";

/// Boot jar name to whether a module already claimed it.
#[derive(Default)]
pub struct BootJarClassifier {
    table: Mutex<Option<BTreeMap<String, bool>>>,
}

impl BootJarClassifier {
    pub(crate) fn register_mutators(ctx: &mut RegisterMutatorsContext) {
        let classifier = Arc::new(BootJarClassifier::default());
        let exported = Arc::clone(&classifier);
        ctx.bottom_up("boot_jars_exported", move |ctx, module| {
            exported.visit(ctx, module, true)
        });
        ctx.bottom_up("boot_jars_any", move |ctx, module| {
            classifier.visit(ctx, module, false)
        });
    }

    fn seed(config: &Config) -> BTreeMap<String, bool> {
        config
            .boot_jars()
            .copy_of_jars()
            .into_iter()
            .chain(config.apex_boot_jars().copy_of_jars())
            .map(|jar| (jar, false))
            .collect()
    }

    /// Claims the entry for `name`. With `require_exported`, only modules in
    /// an exported namespace may claim. Returns whether the module provides
    /// a boot jar.
    pub fn claim(&self, config: &Config, name: &str, dir: &str, require_exported: bool) -> bool {
        let mut table = self.table.lock();
        let table = table.get_or_insert_with(|| Self::seed(config));
        if table.is_empty() {
            // Nothing to tell modules apart: every dex jar is a boot jar.
            return true;
        }
        if let Some(base) = name.strip_suffix(HIDDENAPI_SUFFIX) {
            if table.contains_key(base) {
                table.entry(name.to_string()).or_insert(false);
            }
        }
        let Some(claimed) = table.get_mut(name) else {
            return false;
        };
        if *claimed {
            return false;
        }
        if require_exported && !config.exported_namespaces().iter().any(|ns| is_under(dir, ns)) {
            return false;
        }
        *claimed = true;
        true
    }

    fn visit(
        &self,
        ctx: &mut BottomUpMutatorContext<'_>,
        module: &mut dyn Module,
        require_exported: bool,
    ) {
        if module.dex_jar().is_none() || module.base().is_boot_jar_provider() {
            return;
        }
        let name = source_module_name(ctx.module_name());
        if self.claim(ctx.config(), name, &ctx.module_dir(), require_exported) {
            debug!("{name} provides a boot jar");
            module.base_mut().boot_jar_provider = true;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use soongutil::{config::ProductVariables, configured_jars::ConfiguredJarList};
    use test_log::test;

    fn config(jars: &[&str], exported: &[&str]) -> Config {
        let boot_jars = match ConfiguredJarList::parse(jars) {
            Ok(l) => l,
            Err(e) => panic!("{e}"),
        };
        Config::for_test(
            ProductVariables {
                boot_jars,
                namespaces_to_export: exported.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            },
            &[] as &[&str],
        )
    }

    #[test]
    fn empty_configuration_marks_everything() {
        let config = config(&[], &[]);
        let c = BootJarClassifier::default();
        assert!(c.claim(&config, "anything", "a", true));
        assert!(c.claim(&config, "anything", "b", false));
    }

    #[test]
    fn first_claim_wins() {
        let config = config(&["platform:framework"], &["vendor/ns"]);
        let c = BootJarClassifier::default();
        assert!(!c.claim(&config, "framework", "other", true));
        assert!(c.claim(&config, "framework", "vendor/ns/fw", true));
        assert!(!c.claim(&config, "framework", "frameworks/base", false));
        assert!(!c.claim(&config, "unrelated", "vendor/ns", false));
    }

    #[test]
    fn hiddenapi_entries_follow_their_jar() {
        let config = config(&["platform:framework"], &[]);
        let c = BootJarClassifier::default();
        assert!(c.claim(&config, "framework-hiddenapi", "a", false));
        assert!(!c.claim(&config, "services-hiddenapi", "a", false));
        assert!(c.claim(&config, "framework", "a", false));
    }
}
