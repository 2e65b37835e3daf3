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

//! `csuite_config`: a compatibility suite test configuration, installed to
//! the host testcases directory.

use serde::{Deserialize, Serialize};

use crate::{
    context::{BuilderContext, ModuleContext},
    module::{HostOrDeviceSupported, Module, ModuleBase, Multilib},
    paths::InstallOptions,
    properties::{Field, PropertyBag, Schema, decode},
    statement::BuildStatement,
};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsuiteConfigProperties {
    /// The test configuration template.
    pub test_config: Option<String>,
}

static CSUITE_CONFIG_SCHEMA: Schema = Schema {
    name: "csuite_config",
    fields: &[Field::path("test_config")],
};

#[derive(Clone, Debug, Default)]
pub struct CsuiteConfig {
    base: ModuleBase,
    pub properties: CsuiteConfigProperties,
}

impl CsuiteConfig {
    pub fn factory() -> Box<dyn Module> {
        Box::new(CsuiteConfig::default())
    }
}

impl Module for CsuiteConfig {
    fn base(&self) -> &ModuleBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ModuleBase {
        &mut self.base
    }

    fn property_schema(&self) -> &'static Schema {
        &CSUITE_CONFIG_SCHEMA
    }

    fn load_properties(&mut self, bag: &PropertyBag) -> Result<(), serde_json::Error> {
        self.properties = decode(bag)?;
        Ok(())
    }

    fn arch_support(&self) -> Option<(HostOrDeviceSupported, Multilib)> {
        Some((HostOrDeviceSupported::HostSupported, Multilib::Common))
    }

    fn install_options(&self) -> InstallOptions {
        InstallOptions {
            in_testcases: true,
            ..Default::default()
        }
    }

    fn is_top_level_test_target(&self) -> bool {
        true
    }

    fn generate_build_actions(&mut self, ctx: &mut ModuleContext<'_>) {
        let Some(template) = self.properties.test_config.clone() else {
            ctx.property_errorf("test_config", "missing test configuration");
            return;
        };
        let Some(src) = ctx.path_for_module_src("test_config", &template) else {
            return;
        };
        let name = ctx.module_name();
        let Some(out) = ctx.path_for_module_out(&[name]) else {
            return;
        };
        ctx.build(
            BuildStatement::new("cp", "rm -f $out && cp -f $in $out")
                .input(src.as_str())
                .output(&out)
                .description(format!("cp {name}")),
        );
        let Some(dir) = ctx.path_for_module_install(&[name]) else {
            return;
        };
        if let Some(installed) = ctx.install_file(&dir, &format!("{name}.config"), out.as_str()) {
            ctx.phony("csuite", vec![installed.as_str().to_string()]);
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
    fn installs_into_testcases() {
        let result = TestFixture::new()
            .with_files(&["suite/config.xml"])
            .with_module("suite/Android.bp", "csuite_config", r#"{
                "name": "plan", "test_config": "config.xml"
            }"#)
            .run()
            .unwrap();
        assert_eq!(
            result.install_files("plan", "linux_glibc_common"),
            vec!["out/soong/host/linux-x86/testcases/plan/plan.config"]
        );
        expect![[r#"
            cp: suite/config.xml -> out/soong/.intermediates/suite/plan/linux_glibc_common/plan
            cp: out/soong/.intermediates/suite/plan/linux_glibc_common/plan -> out/soong/host/linux-x86/testcases/plan/plan.config"#]]
        .assert_eq(&result.describe_statements("plan", "linux_glibc_common"));
        let phony = result.statement_for_output("csuite").unwrap();
        assert_eq!(
            phony.inputs,
            vec!["out/soong/host/linux-x86/testcases/plan/plan.config"]
        );
    }

    #[test]
    fn config_is_required() {
        expect![[r#"suite/Android.bp: module "plan" variant "linux_glibc_common": test_config: missing test configuration"#]]
            .assert_eq(
                &TestFixture::new()
                    .with_module("suite/Android.bp", "csuite_config", r#"{"name": "plan"}"#)
                    .run_expecting_errors(),
            );
    }
}
