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

//! `android_filesystem`: packages its dependencies, with everything they
//! install, into a zip or a directory.

use serde::{Deserialize, Serialize};

use crate::{
    context::{BottomUpMutatorContext, ModuleContext},
    deptag::PackagingItemAlwaysDepTag,
    module::{HostOrDeviceSupported, Module, ModuleBase, Multilib},
    packaging::{ARCH_SCHEMA, MULTILIB_SCHEMA, PackagingBase},
    properties::{Field, PropertyBag, Schema, decode},
    rule_builder::RuleBuilder,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilesystemType {
    #[default]
    Zip,
    Dir,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesystemProperties {
    #[serde(rename = "type")]
    pub fs_type: FilesystemType,
    /// Output name without extension. Defaults to the module name.
    pub stem: Option<String>,
}

static FILESYSTEM_SCHEMA: Schema = Schema {
    name: "android_filesystem",
    fields: &[
        Field::plain("deps"),
        Field::nested("multilib", &MULTILIB_SCHEMA),
        Field::nested("arch", &ARCH_SCHEMA),
        Field::plain("type"),
        Field::plain("stem"),
    ],
};

#[derive(Clone, Debug, Default)]
pub struct Filesystem {
    base: ModuleBase,
    packaging: PackagingBase,
    pub properties: FilesystemProperties,
    entries: Vec<String>,
}

impl Filesystem {
    pub fn factory() -> Box<dyn Module> {
        Box::new(Filesystem::default())
    }

    /// Paths inside the package, known once build actions were generated.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

impl Module for Filesystem {
    fn base(&self) -> &ModuleBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ModuleBase {
        &mut self.base
    }

    fn property_schema(&self) -> &'static Schema {
        &FILESYSTEM_SCHEMA
    }

    fn load_properties(&mut self, bag: &PropertyBag) -> Result<(), serde_json::Error> {
        self.packaging.properties = decode(bag)?;
        self.properties = decode(bag)?;
        Ok(())
    }

    fn arch_support(&self) -> Option<(HostOrDeviceSupported, Multilib)> {
        Some((HostOrDeviceSupported::DeviceSupported, Multilib::Common))
    }

    fn wants_multi_targets(&self) -> bool {
        true
    }

    fn deps_mutator(&mut self, ctx: &mut BottomUpMutatorContext<'_>) {
        self.packaging
            .add_deps(ctx, &self.base, PackagingItemAlwaysDepTag.into());
    }

    fn generate_build_actions(&mut self, ctx: &mut ModuleContext<'_>) {
        let stem = self
            .properties
            .stem
            .clone()
            .unwrap_or_else(|| ctx.module_name().to_string());
        let specs = self.packaging.gather_packaging_specs(ctx);
        let out = match self.properties.fs_type {
            FilesystemType::Zip => {
                let Some(zip) = ctx.path_for_module_out(&[&format!("{stem}.zip")]) else {
                    return;
                };
                self.entries = self.packaging.copy_deps_to_zip(ctx, &specs, &zip);
                zip
            }
            FilesystemType::Dir => {
                let Some(dir) = ctx.path_for_module_out(&[&stem]) else {
                    return;
                };
                let mut rule = RuleBuilder::new();
                rule.command().text("rm").flag("-rf").text(dir.as_str());
                rule.command().text("mkdir").flag("-p").output(&dir);
                self.entries = self.packaging.copy_specs_to_dir(ctx, &mut rule, &specs, &dir);
                rule.build(ctx, "filesystem_dir", &format!("Copying deps for {stem}"));
                dir
            }
        };
        ctx.set_output_files(vec![out.as_str().to_string()], "");
    }
}
