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

//! `build_prop`: generates the `build.prop` file of a partition.

use serde::{Deserialize, Serialize};

use crate::{
    context::ModuleContext,
    module::{HostOrDeviceSupported, Module, ModuleBase, Multilib},
    paths::path_for_output,
    properties::{Field, PropertyBag, Schema, decode},
    raw_files::write_file_rule,
    rule_builder::RuleBuilder,
};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildPropProperties {
    /// Installed file name. Defaults to `build.prop`.
    pub stem: Option<String>,
    /// Property names removed from the result.
    pub block_list: Vec<String>,
    /// Appended after the checked properties, as is.
    pub footer_files: Vec<String>,
    /// JSON file holding product configuration.
    pub product_config: Option<String>,
    pub relative_install_path: Option<String>,
}

static BUILD_PROP_SCHEMA: Schema = Schema {
    name: "build_prop",
    fields: &[
        Field::plain("stem"),
        Field::plain("block_list"),
        Field::path("footer_files"),
        Field::path("product_config"),
        Field::plain("relative_install_path"),
    ],
};

const VALID_PARTITIONS: [&str; 4] = ["system", "system_ext", "product", "odm"];

#[derive(Clone, Debug, Default)]
pub struct BuildProp {
    base: ModuleBase,
    pub properties: BuildPropProperties,
}

impl BuildProp {
    pub fn factory() -> Box<dyn Module> {
        Box::new(BuildProp::default())
    }

    pub fn stem(&self) -> &str {
        self.properties.stem.as_deref().unwrap_or("build.prop")
    }

    /// The partition the properties describe. Unlike the install partition,
    /// this does not follow the product's partition layout.
    pub fn partition(&self) -> &'static str {
        let common = self.base.common();
        if common.soc_specific() {
            "vendor"
        } else if common.device_specific {
            "odm"
        } else if common.product_specific {
            "product"
        } else if common.system_ext_specific {
            "system_ext"
        } else {
            "system"
        }
    }
}

impl Module for BuildProp {
    fn base(&self) -> &ModuleBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ModuleBase {
        &mut self.base
    }

    fn property_schema(&self) -> &'static Schema {
        &BUILD_PROP_SCHEMA
    }

    fn load_properties(&mut self, bag: &PropertyBag) -> Result<(), serde_json::Error> {
        self.properties = decode(bag)?;
        Ok(())
    }

    fn arch_support(&self) -> Option<(HostOrDeviceSupported, Multilib)> {
        Some((HostOrDeviceSupported::DeviceSupported, Multilib::Common))
    }

    fn generate_build_actions(&mut self, ctx: &mut ModuleContext<'_>) {
        let Some(out) = ctx.path_for_module_out(&["build.prop"]) else {
            return;
        };
        let config = ctx.config();
        if !config.kati_enabled() {
            write_file_rule(ctx, &out, "# no build.prop if kati is disabled");
            ctx.set_output_files(vec![out.as_str().to_string()], "");
            return;
        }

        let partition = self.partition();
        if !VALID_PARTITIONS.contains(&partition) {
            ctx.property_errorf(
                "partition",
                format!(
                    "unsupported partition {partition:?}: only {VALID_PARTITIONS:?} are supported"
                ),
            );
            return;
        }

        let product_config = match &self.properties.product_config {
            Some(p) => ctx.path_for_module_src("product_config", p),
            None => None,
        };
        let footers = ctx.paths_for_module_src("footer_files", &self.properties.footer_files);
        let (hostname, number, fingerprint) = match (
            path_for_output(config, &["build_hostname.txt"]),
            path_for_output(config, &["build_number.txt"]),
            path_for_output(config, &["build_fingerprint.txt"]),
        ) {
            (Ok(h), Ok(n), Ok(f)) => (h, n, f),
            _ => {
                ctx.module_errorf("invalid build info paths");
                return;
            }
        };

        let mut rule = RuleBuilder::new();
        let cmd = rule.command();
        cmd.built_tool(config, "gen_build_prop")
            .flag_with_input("--build-hostname-file=", hostname.as_str())
            .flag_with_input("--build-number-file=", number.as_str())
            // The fingerprint changes on every build, so it is not an input.
            .flag_with_arg("--build-fingerprint-file=", fingerprint.as_str());
        if let Some(p) = &product_config {
            cmd.flag_with_input("--product-config=", p);
        }
        cmd.flag_with_arg("--partition=", partition)
            .flag_with_output("--out=", &out);

        rule.command()
            .built_tool(config, "post_process_props")
            .text(out.as_str())
            .args(&self.properties.block_list);
        for footer in &footers {
            rule.command()
                .text("cat")
                .input(footer)
                .flag_with_arg(">> ", out.as_str());
        }
        rule.command()
            .text("echo")
            .arg("# end of file")
            .flag_with_arg(">> ", out.as_str());
        rule.build(ctx, "build_prop", "generating build.prop");

        let rel = self.properties.relative_install_path.clone().unwrap_or_default();
        if let Some(dir) = ctx.path_for_module_install(&[&rel]) {
            ctx.install_file(&dir, self.stem(), out.as_str());
        }
        ctx.set_output_files(vec![out.as_str().to_string()], "");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use crate::fixture::TestFixture;
    use expect_test::expect;
    use test_log::test;

    #[test]
    fn placeholder_without_kati() {
        let result = TestFixture::new()
            .with_module("Android.bp", "build_prop", r#"{"name": "system_build_prop"}"#)
            .run()
            .unwrap();
        let out = "out/soong/.intermediates/system_build_prop/android_common/build.prop";
        assert_eq!(
            result.output_files("system_build_prop", "android_common", ""),
            vec![out]
        );
        assert_eq!(
            result.file_content(out).as_deref(),
            Some("# no build.prop if kati is disabled\n")
        );
        assert!(result.install_files("system_build_prop", "android_common").is_empty());
    }

    #[test]
    fn generated_with_kati() {
        let result = TestFixture::new()
            .with_kati()
            .with_files(&["product_config.json", "footer.prop"])
            .with_module("Android.bp", "build_prop", r#"{
                "name": "product_build_prop",
                "product_specific": true,
                "product_config": "product_config.json",
                "footer_files": ["footer.prop"],
                "block_list": ["ro.bad"]
            }"#)
            .run()
            .unwrap();
        let stmt = result
            .statement_for_output(
                "out/soong/.intermediates/product_build_prop/android_common/build.prop",
            )
            .unwrap();
        expect![[r#"out/soong/host/linux-x86/bin/gen_build_prop --build-hostname-file=out/soong/build_hostname.txt --build-number-file=out/soong/build_number.txt --build-fingerprint-file=out/soong/build_fingerprint.txt --product-config=product_config.json --partition=product --out=out/soong/.intermediates/product_build_prop/android_common/build.prop && out/soong/host/linux-x86/bin/post_process_props out/soong/.intermediates/product_build_prop/android_common/build.prop ro.bad && cat footer.prop >> out/soong/.intermediates/product_build_prop/android_common/build.prop && echo '# end of file' >> out/soong/.intermediates/product_build_prop/android_common/build.prop"#]]
            .assert_eq(&stmt.command);
        assert_eq!(
            result.install_files("product_build_prop", "android_common"),
            vec!["out/soong/target/product/test_device/product/build.prop"]
        );
    }

    #[test]
    fn vendor_is_rejected() {
        expect![[r#"Android.bp: module "vendor_build_prop" variant "android_common": partition: unsupported partition "vendor": only ["system", "system_ext", "product", "odm"] are supported"#]]
            .assert_eq(
                &TestFixture::new()
                    .with_kati()
                    .with_module("Android.bp", "build_prop", r#"{
                        "name": "vendor_build_prop", "vendor": true
                    }"#)
                    .run_expecting_errors(),
            );
    }
}
