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

//! `package`: per-directory defaults for the modules declared next to it.

use std::{collections::BTreeMap, sync::Arc};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use soongutil::{config::Config, once::OnceKey, path::ancestors};

use crate::{
    context::ModuleContext,
    module::{Module, ModuleBase},
    properties::{Field, PropertyBag, Schema, decode},
};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageProperties {
    pub default_applicable_licenses: Vec<String>,
    pub default_visibility: Vec<String>,
    pub default_team: Option<String>,
}

static PACKAGE_SCHEMA: Schema = Schema {
    name: "package",
    fields: &[
        Field::plain("default_applicable_licenses"),
        Field::plain("default_visibility"),
        Field::plain("default_team"),
    ],
};

#[derive(Clone, Debug, Default)]
pub struct PackageModule {
    base: ModuleBase,
    pub properties: PackageProperties,
}

impl PackageModule {
    pub fn factory() -> Box<dyn Module> {
        Box::new(PackageModule::default())
    }
}

impl Module for PackageModule {
    fn base(&self) -> &ModuleBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ModuleBase {
        &mut self.base
    }

    fn property_schema(&self) -> &'static Schema {
        &PACKAGE_SCHEMA
    }

    fn load_properties(&mut self, bag: &PropertyBag) -> Result<(), serde_json::Error> {
        self.properties = decode(bag)?;
        Ok(())
    }

    fn generate_build_actions(&mut self, _ctx: &mut ModuleContext<'_>) {}

    fn license_exempt(&self) -> bool {
        true
    }
}

static PACKAGE_MAP_KEY: Lazy<OnceKey> = Lazy::new(|| OnceKey::new("package map"));

/// The package of every directory that declares one.
#[derive(Default)]
pub struct PackageMap {
    packages: Mutex<BTreeMap<String, PackageProperties>>,
}

impl PackageMap {
    pub fn of(config: &Config) -> Arc<PackageMap> {
        config.once().once(&PACKAGE_MAP_KEY, PackageMap::default)
    }

    pub(crate) fn insert(&self, dir: String, props: PackageProperties) {
        self.packages.lock().insert(dir, props);
    }

    /// The package declared in exactly `dir`.
    pub fn get(&self, dir: &str) -> Option<PackageProperties> {
        self.packages.lock().get(dir).cloned()
    }

    /// The package of `dir` or of its closest ancestor declaring one.
    pub fn nearest(&self, dir: &str) -> Option<(String, PackageProperties)> {
        let packages = self.packages.lock();
        ancestors(dir).find_map(|d| packages.get(d).map(|p| (d.to_string(), p.clone())))
    }
}
