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

//! `license` and `license_kind`: the modules other modules name in their
//! `licenses` property.

use serde::{Deserialize, Serialize};

use crate::{
    context::{BottomUpMutatorContext, ModuleContext},
    deptag::LicenseKindDepTag,
    module::{Module, ModuleBase},
    properties::{Field, PropertyBag, Schema, decode},
};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LicenseProperties {
    pub license_kinds: Vec<String>,
    pub copyright_notice: Option<String>,
    pub license_text: Vec<String>,
    pub package_name: Option<String>,
}

static LICENSE_SCHEMA: Schema = Schema {
    name: "license",
    fields: &[
        Field::plain("license_kinds"),
        Field::plain("copyright_notice"),
        Field::path("license_text"),
        Field::plain("package_name"),
    ],
};

#[derive(Clone, Debug, Default)]
pub struct LicenseModule {
    base: ModuleBase,
    pub properties: LicenseProperties,
}

impl LicenseModule {
    pub fn factory() -> Box<dyn Module> {
        Box::new(LicenseModule::default())
    }
}

impl Module for LicenseModule {
    fn base(&self) -> &ModuleBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ModuleBase {
        &mut self.base
    }

    fn property_schema(&self) -> &'static Schema {
        &LICENSE_SCHEMA
    }

    fn load_properties(&mut self, bag: &PropertyBag) -> Result<(), serde_json::Error> {
        self.properties = decode(bag)?;
        Ok(())
    }

    fn deps_mutator(&mut self, ctx: &mut BottomUpMutatorContext<'_>) {
        let kinds = &self.properties.license_kinds;
        if !kinds.is_empty() {
            ctx.add_variation_dependencies(&[], LicenseKindDepTag, kinds.as_slice());
        }
    }

    fn generate_build_actions(&mut self, ctx: &mut ModuleContext<'_>) {
        // Only checks that the texts exist.
        let texts = self.properties.license_text.clone();
        ctx.paths_for_module_src("license_text", &texts);
    }

    fn license_exempt(&self) -> bool {
        true
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LicenseKindProperties {
    pub conditions: Vec<String>,
    pub url: Option<String>,
}

static LICENSE_KIND_SCHEMA: Schema = Schema {
    name: "license_kind",
    fields: &[Field::plain("conditions"), Field::plain("url")],
};

#[derive(Clone, Debug, Default)]
pub struct LicenseKindModule {
    base: ModuleBase,
    pub properties: LicenseKindProperties,
}

impl LicenseKindModule {
    pub fn factory() -> Box<dyn Module> {
        Box::new(LicenseKindModule::default())
    }
}

impl Module for LicenseKindModule {
    fn base(&self) -> &ModuleBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ModuleBase {
        &mut self.base
    }

    fn property_schema(&self) -> &'static Schema {
        &LICENSE_KIND_SCHEMA
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
