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

//! `java_import`: prebuilt jars, optionally dexed for the device.
//!
//! A `java_import` is always a prebuilt: it is registered as
//! `prebuilt_<name>` and takes over `<name>` unless a source module of that
//! name exists. Device variants providing a boot jar always get a dex jar.

use serde::{Deserialize, Serialize};
use soongutil::arch::OsClass;

use crate::{
    bootjars::HasDexJar,
    context::ModuleContext,
    module::{HostOrDeviceSupported, Module, ModuleBase, Multilib},
    paths::OutputPath,
    prebuilt::{Prebuilt, source_module_name},
    properties::{Field, PropertyBag, Schema, decode},
    rule_builder::RuleBuilder,
};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JavaImportProperties {
    pub jars: Vec<String>,
    /// Install the jar below `framework`.
    pub installable: Option<bool>,
    /// Build a dex jar for device variants.
    pub compile_dex: Option<bool>,
}

static JAVA_IMPORT_SCHEMA: Schema = Schema {
    name: "java_import",
    fields: &[
        Field::path("jars"),
        Field::plain("installable"),
        Field::plain("compile_dex"),
        Field::plain("prefer"),
    ],
};

#[derive(Clone, Debug, Default)]
pub struct JavaImport {
    base: ModuleBase,
    prebuilt: Prebuilt,
    pub properties: JavaImportProperties,
    combined_jar: Option<String>,
    dex_jar: Option<String>,
}

impl JavaImport {
    pub fn factory() -> Box<dyn Module> {
        Box::new(JavaImport::default())
    }

    pub fn combined_jar(&self) -> Option<&str> {
        self.combined_jar.as_deref()
    }

    fn wants_dex(&self) -> bool {
        self.properties.compile_dex.unwrap_or(false) || self.base.is_boot_jar_provider()
    }

    fn combine(&self, ctx: &mut ModuleContext<'_>, jars: &[String], out: &OutputPath) {
        if let [jar] = jars {
            let mut rule = RuleBuilder::new();
            rule.command()
                .text("cp")
                .flag("-f")
                .input(jar)
                .output(out);
            rule.build(ctx, "cp", &format!("cp {}", soongutil::path::base(out.as_str())));
            return;
        }
        let config = ctx.config();
        let mut rule = RuleBuilder::new();
        let cmd = rule.command();
        cmd.built_tool(config, "merge_zips").flag("-j").output(out);
        for jar in jars {
            cmd.input(jar);
        }
        rule.build(ctx, "merge_zips", &format!("merge {}", soongutil::path::base(out.as_str())));
    }

    fn dex(&self, ctx: &mut ModuleContext<'_>, jar: &str, name: &str) -> Option<OutputPath> {
        let dir = ctx.path_for_module_out(&["dex"])?;
        let out = ctx.path_for_module_out(&["dex", name])?;
        let classes = dir.join(&["classes"]).ok()?;
        let config = ctx.config();
        let mut rule = RuleBuilder::new();
        rule.command().text("rm").flag("-rf").text(classes.as_str());
        rule.command().text("mkdir").flag("-p").text(classes.as_str());
        rule.command()
            .built_tool(config, "d8")
            .flag_with_arg("--output ", classes.as_str())
            .input(jar);
        rule.command()
            .built_tool(config, "soong_zip")
            .flag_with_output("-o ", &out)
            .flag_with_arg("-C ", classes.as_str())
            .flag_with_arg("-D ", classes.as_str());
        rule.build(ctx, "d8", &format!("dex {name}"));
        Some(out)
    }
}

impl HasDexJar for JavaImport {
    fn dex_jar_build_path(&self) -> Option<&str> {
        self.dex_jar.as_deref()
    }
}

impl Module for JavaImport {
    fn base(&self) -> &ModuleBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ModuleBase {
        &mut self.base
    }

    fn property_schema(&self) -> &'static Schema {
        &JAVA_IMPORT_SCHEMA
    }

    fn load_properties(&mut self, bag: &PropertyBag) -> Result<(), serde_json::Error> {
        self.properties = decode(bag)?;
        self.prebuilt.properties = decode(bag)?;
        Ok(())
    }

    fn arch_support(&self) -> Option<(HostOrDeviceSupported, Multilib)> {
        Some((HostOrDeviceSupported::HostAndDeviceSupported, Multilib::Common))
    }

    /// Only device variants are dexed, so only they may claim a boot jar.
    fn dex_jar(&self) -> Option<&dyn HasDexJar> {
        let device = self.base.target().is_some_and(|t| t.os.class() == OsClass::Device);
        device.then_some(self as &dyn HasDexJar)
    }

    fn prebuilt(&self) -> Option<&Prebuilt> {
        Some(&self.prebuilt)
    }

    fn prebuilt_mut(&mut self) -> Option<&mut Prebuilt> {
        Some(&mut self.prebuilt)
    }

    fn generate_build_actions(&mut self, ctx: &mut ModuleContext<'_>) {
        let jars = ctx.paths_for_module_src("jars", &self.properties.jars);
        if ctx.failed() {
            return;
        }
        if jars.is_empty() {
            ctx.property_errorf("jars", "at least one jar is required");
            return;
        }
        let file_name = format!("{}.jar", source_module_name(ctx.module_name()));
        let Some(combined) = ctx.path_for_module_out(&["combined", &file_name]) else {
            return;
        };
        self.combine(ctx, &jars, &combined);
        self.combined_jar = Some(combined.as_str().to_string());

        let mut installed_jar = combined.as_str().to_string();
        if !ctx.is_host() && self.wants_dex() {
            if let Some(dex) = self.dex(ctx, combined.as_str(), &file_name) {
                installed_jar = dex.as_str().to_string();
                self.dex_jar = Some(installed_jar.clone());
            }
        }

        if self.properties.installable.unwrap_or(false)
            && let Some(dir) = ctx.path_for_module_install(&["framework"])
        {
            ctx.install_file(&dir, &file_name, &installed_jar);
        }
        ctx.set_output_files(vec![combined.as_str().to_string()], "");
        if let Some(dex) = &self.dex_jar {
            ctx.set_output_files(vec![dex.clone()], ".dex");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use crate::fixture::TestFixture;
    use expect_test::expect;
    use soongutil::{config::ProductVariables, configured_jars::ConfiguredJarList};
    use test_log::test;

    use super::*;

    fn boot_jars(jars: &[&str]) -> ProductVariables {
        ProductVariables {
            boot_jars: ConfiguredJarList::parse(jars).unwrap(),
            ..Default::default()
        }
    }

    #[test]
    fn prebuilt_takes_the_plain_name() {
        let result = TestFixture::new()
            .with_variables(boot_jars(&["platform:framework"]))
            .with_files(&["lib/a.jar", "lib/b.jar"])
            .with_module("lib/Android.bp", "java_import", r#"{
                "name": "lib", "jars": ["a.jar", "b.jar"], "host_supported": true
            }"#)
            .run()
            .unwrap();
        assert_eq!(result.variants("lib"), vec!["android_common", "linux_glibc_common"]);
        expect![[r#"merge_zips: lib/a.jar lib/b.jar -> out/soong/.intermediates/lib/lib/linux_glibc_common/combined/lib.jar"#]]
            .assert_eq(&result.describe_statements("lib", "linux_glibc_common"));
        // Not a boot jar and not dexed.
        assert_eq!(
            result.module::<JavaImport, _>("lib", "android_common", |m| {
                m.dex_jar_build_path().map(str::to_string)
            }),
            Some(None)
        );
    }

    #[test]
    fn boot_jars_are_dexed_and_installed() {
        let result = TestFixture::new()
            .with_variables(boot_jars(&["platform:framework"]))
            .with_files(&["fw/framework.jar"])
            .with_module("fw/Android.bp", "java_import", r#"{
                "name": "framework", "jars": ["framework.jar"], "installable": true
            }"#)
            .run()
            .unwrap();
        expect![[r#"
            cp: fw/framework.jar -> out/soong/.intermediates/fw/framework/android_common/combined/framework.jar
            d8: out/soong/.intermediates/fw/framework/android_common/combined/framework.jar -> out/soong/.intermediates/fw/framework/android_common/dex/framework.jar
            cp: out/soong/.intermediates/fw/framework/android_common/dex/framework.jar -> out/soong/target/product/test_device/system/framework/framework.jar"#]]
        .assert_eq(&result.describe_statements("framework", "android_common"));
        assert_eq!(
            result.output_files("framework", "android_common", ".dex"),
            vec!["out/soong/.intermediates/fw/framework/android_common/dex/framework.jar"]
        );
    }

    #[test]
    fn jars_are_required() {
        expect![[r#"Android.bp: module "lib" variant "android_common": jars: at least one jar is required"#]]
            .assert_eq(
                &TestFixture::new()
                    .with_module("Android.bp", "java_import", r#"{"name": "lib"}"#)
                    .run_expecting_errors(),
            );
    }
}
