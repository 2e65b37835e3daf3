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

//! The [`Module`] trait implemented by every module type, and the state the
//! framework keeps for every module.

use std::any::Any;

use serde::{Deserialize, Serialize};
use soongutil::arch::Target;

use crate::{
    bootjars::HasDexJar,
    context::{BottomUpMutatorContext, ModuleContext},
    makevars::MakeVarsContext,
    paths::InstallOptions,
    prebuilt::Prebuilt,
    properties::{Field, PropertyBag, Schema},
};

/// Which operating system classes a module type can be built for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostOrDeviceSupported {
    HostSupported,
    DeviceSupported,
    /// Device by default, host when `host_supported: true`.
    HostAndDeviceSupported,
    /// Host and device unless disabled with `device_supported: false`.
    HostAndDeviceDefault,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Multilib {
    Both,
    First,
    #[serde(rename = "32")]
    Lib32,
    #[serde(rename = "64")]
    Lib64,
    Common,
}

/// The image a variant is installed into.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ImageVariation {
    #[default]
    Core,
    Ramdisk,
    VendorRamdisk,
    DebugRamdisk,
    Recovery,
}

impl ImageVariation {
    pub fn name(self) -> &'static str {
        match self {
            ImageVariation::Core => "",
            ImageVariation::Ramdisk => "ramdisk",
            ImageVariation::VendorRamdisk => "vendor_ramdisk",
            ImageVariation::DebugRamdisk => "debug_ramdisk",
            ImageVariation::Recovery => "recovery",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "" => Some(ImageVariation::Core),
            "ramdisk" => Some(ImageVariation::Ramdisk),
            "vendor_ramdisk" => Some(ImageVariation::VendorRamdisk),
            "debug_ramdisk" => Some(ImageVariation::DebugRamdisk),
            "recovery" => Some(ImageVariation::Recovery),
            _ => None,
        }
    }
}

/// Properties understood by every module type.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommonProperties {
    pub name: String,
    pub enabled: Option<bool>,
    pub licenses: Vec<String>,
    pub defaults: Vec<String>,
    pub team: Option<String>,
    pub visibility: Vec<String>,

    pub host_supported: Option<bool>,
    pub device_supported: Option<bool>,
    pub compile_multilib: Option<Multilib>,

    pub vendor: bool,
    pub soc_specific: bool,
    pub device_specific: bool,
    pub product_specific: bool,
    pub system_ext_specific: bool,

    pub ramdisk: bool,
    pub vendor_ramdisk: bool,
    pub debug_ramdisk: bool,
    pub recovery: bool,
    pub ramdisk_available: bool,
    pub vendor_ramdisk_available: bool,
    pub debug_ramdisk_available: bool,
    pub recovery_available: bool,

    pub test_only: bool,
}

pub static COMMON_SCHEMA: Schema = Schema {
    name: "common",
    fields: &[
        Field::plain("name"),
        Field::plain("enabled"),
        Field::plain("licenses"),
        Field::plain("defaults"),
        Field::plain("team"),
        Field::plain("visibility"),
        Field::plain("host_supported"),
        Field::plain("device_supported"),
        Field::plain("compile_multilib"),
        Field::plain("vendor"),
        Field::plain("soc_specific"),
        Field::plain("device_specific"),
        Field::plain("product_specific"),
        Field::plain("system_ext_specific"),
        Field::plain("ramdisk"),
        Field::plain("vendor_ramdisk"),
        Field::plain("debug_ramdisk"),
        Field::plain("recovery"),
        Field::plain("ramdisk_available"),
        Field::plain("vendor_ramdisk_available"),
        Field::plain("debug_ramdisk_available"),
        Field::plain("recovery_available"),
        Field::plain("test_only"),
    ],
};

impl CommonProperties {
    pub fn soc_specific(&self) -> bool {
        self.vendor || self.soc_specific
    }
}

/// License facts computed for a module by the license passes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EffectiveLicenses {
    pub licenses: Vec<String>,
    pub kinds: Vec<String>,
    pub conditions: Vec<String>,
    /// `(path, package name)` pairs.
    pub texts: Vec<(String, String)>,
    pub package_name: Option<String>,
    /// Own licenses together with those of every transitive dependency.
    pub inherited: Vec<String>,
}

/// Framework-owned state of a module variant.
#[derive(Clone, Debug, Default)]
pub struct ModuleBase {
    pub(crate) common: CommonProperties,
    pub(crate) bag: PropertyBag,
    pub(crate) target: Option<Target>,
    pub(crate) multi_targets: Vec<Target>,
    pub(crate) image: ImageVariation,
    pub(crate) arch_disabled: bool,
    pub(crate) skip_install: bool,
    pub(crate) replaced_by_prebuilt: bool,
    pub(crate) licenses: EffectiveLicenses,
    pub(crate) boot_jar_provider: bool,
    pub(crate) missing_deps: Vec<String>,
}

impl ModuleBase {
    pub fn common(&self) -> &CommonProperties {
        &self.common
    }

    /// The raw properties, with defaults applied once the defaults pass ran.
    pub fn properties(&self) -> &PropertyBag {
        &self.bag
    }

    pub fn enabled(&self) -> bool {
        self.common.enabled.unwrap_or(true) && !self.arch_disabled
    }

    pub fn target(&self) -> Option<Target> {
        self.target
    }

    pub fn multi_targets(&self) -> &[Target] {
        &self.multi_targets
    }

    pub fn image(&self) -> ImageVariation {
        self.image
    }

    pub fn is_skip_install(&self) -> bool {
        self.skip_install
    }

    pub fn is_replaced_by_prebuilt(&self) -> bool {
        self.replaced_by_prebuilt
    }

    pub fn effective_licenses(&self) -> &EffectiveLicenses {
        &self.licenses
    }

    pub fn is_boot_jar_provider(&self) -> bool {
        self.boot_jar_provider
    }

    /// Names of dependencies that could not be resolved while missing
    /// dependencies are allowed. Sorted and free of duplicates.
    pub fn missing_deps(&self) -> &[String] {
        &self.missing_deps
    }

    pub(crate) fn add_missing_deps(&mut self, names: impl IntoIterator<Item = String>) {
        self.missing_deps.extend(names);
        self.missing_deps.sort();
        self.missing_deps.dedup();
    }

    /// Reloads the common properties from the bag.
    pub(crate) fn load_common(&mut self) -> Result<(), serde_json::Error> {
        self.common = crate::properties::decode(&self.bag)?;
        Ok(())
    }
}

/// Object-safe cloning, implemented for every `Clone` module type.
pub trait CloneModule {
    fn clone_module(&self) -> Box<dyn Module>;
}

impl<T: Module + Clone> CloneModule for T {
    fn clone_module(&self) -> Box<dyn Module> {
        Box::new(self.clone())
    }
}

/// Creates an unconfigured module of one type.
pub type ModuleFactory = fn() -> Box<dyn Module>;

/// A module type.
///
/// Capabilities are optional trait objects: graph-walking code asks whether
/// a module has one (e.g. [`Module::dex_jar`]) instead of testing for a
/// concrete type.
pub trait Module: Any + Send + Sync + CloneModule {
    fn base(&self) -> &ModuleBase;
    fn base_mut(&mut self) -> &mut ModuleBase;

    /// The type-specific properties. Common properties are always accepted.
    fn property_schema(&self) -> &'static Schema;

    /// Decodes the type-specific properties from the bag.
    fn load_properties(&mut self, bag: &PropertyBag) -> Result<(), serde_json::Error>;

    /// `None` for module types that get no architecture variants.
    fn arch_support(&self) -> Option<(HostOrDeviceSupported, Multilib)> {
        None
    }

    /// Whether the common-arch variant carries every device target, as for
    /// modules packaging dependencies of several architectures.
    fn wants_multi_targets(&self) -> bool {
        false
    }

    /// Adds the dependencies of this variant.
    fn deps_mutator(&mut self, _ctx: &mut BottomUpMutatorContext<'_>) {}

    fn generate_build_actions(&mut self, ctx: &mut ModuleContext<'_>);

    fn install_options(&self) -> InstallOptions {
        InstallOptions::default()
    }

    fn dex_jar(&self) -> Option<&dyn HasDexJar> {
        None
    }

    fn prebuilt(&self) -> Option<&Prebuilt> {
        None
    }

    fn prebuilt_mut(&mut self) -> Option<&mut Prebuilt> {
        None
    }

    /// Modules that carry license information themselves, or only partition
    /// the graph, need no applicable licenses.
    fn license_exempt(&self) -> bool {
        false
    }

    fn is_defaults(&self) -> bool {
        false
    }

    /// Whether this module is the top of a test suite.
    fn is_top_level_test_target(&self) -> bool {
        false
    }

    fn make_vars(&self, _ctx: &mut MakeVarsContext<'_>) {}
}

impl dyn Module {
    pub fn downcast_ref<T: Module>(&self) -> Option<&T> {
        let any: &dyn Any = self;
        any.downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Module>(&mut self) -> Option<&mut T> {
        let any: &mut dyn Any = self;
        any.downcast_mut::<T>()
    }

    pub fn is<T: Module>(&self) -> bool {
        self.downcast_ref::<T>().is_some()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use super::*;
    use serde_json::json;
    use test_log::test;

    #[test]
    fn common_properties_decode_with_defaults() {
        let bag = json!({
            "name": "foo",
            "compile_multilib": "32",
            "vendor": true,
            "recovery_available": true,
            "unrelated": [1, 2],
        });
        let props: CommonProperties =
            crate::properties::decode(bag.as_object().unwrap()).unwrap();
        assert_eq!(props.name, "foo");
        assert_eq!(props.compile_multilib, Some(Multilib::Lib32));
        assert!(props.soc_specific());
        assert!(props.recovery_available);
        assert!(!props.ramdisk);
    }

    #[test]
    fn missing_deps_stay_sorted_and_unique() {
        let mut base = ModuleBase::default();
        base.add_missing_deps(["b".to_string(), "a".to_string()]);
        base.add_missing_deps(["b".to_string()]);
        assert_eq!(base.missing_deps(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn image_names() {
        for v in [
            ImageVariation::Core,
            ImageVariation::Ramdisk,
            ImageVariation::VendorRamdisk,
            ImageVariation::DebugRamdisk,
            ImageVariation::Recovery,
        ] {
            assert_eq!(ImageVariation::from_name(v.name()), Some(v));
        }
    }
}
