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

//! `makefile_goal`: exposes a file built by Make below `PRODUCT_OUT` to
//! Soong modules.

use serde::{Deserialize, Serialize};
use soongutil::path::validate_path;

use crate::{
    context::{BuilderContext, ModuleContext},
    module::{Module, ModuleBase},
    properties::{Field, PropertyBag, Schema, decode},
    statement::BuildStatement,
};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MakefileGoalProperties {
    /// The Make output, relative to `PRODUCT_OUT`.
    pub product_out_path: Option<String>,
}

static MAKEFILE_GOAL_SCHEMA: Schema = Schema {
    name: "makefile_goal",
    fields: &[Field::plain("product_out_path")],
};

#[derive(Clone, Debug, Default)]
pub struct MakefileGoal {
    base: ModuleBase,
    pub properties: MakefileGoalProperties,
}

impl MakefileGoal {
    pub fn factory() -> Box<dyn Module> {
        Box::new(MakefileGoal::default())
    }
}

impl Module for MakefileGoal {
    fn base(&self) -> &ModuleBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ModuleBase {
        &mut self.base
    }

    fn property_schema(&self) -> &'static Schema {
        &MAKEFILE_GOAL_SCHEMA
    }

    fn load_properties(&mut self, bag: &PropertyBag) -> Result<(), serde_json::Error> {
        self.properties = decode(bag)?;
        Ok(())
    }

    fn generate_build_actions(&mut self, ctx: &mut ModuleContext<'_>) {
        let Some(rel) = self.properties.product_out_path.clone().filter(|p| !p.is_empty()) else {
            ctx.property_errorf("product_out_path", "Path relative to PRODUCT_OUT required");
            return;
        };
        let product_out = {
            let config = ctx.config();
            format!("{}/target/product/{}", config.out_dir(), config.device_name())
        };
        let src = match validate_path(&[&product_out, &rel]) {
            Ok(p) => p,
            Err(e) => {
                ctx.property_errorf("product_out_path", e.to_string());
                return;
            }
        };
        let name = soongutil::path::base(&src).to_string();
        let Some(out) = ctx.path_for_module_out(&[&name]) else {
            return;
        };
        ctx.build(
            BuildStatement::new("cp", "rm -f $out && cp -f $in $out")
                .input(src.as_str())
                .output(&out)
                .description(format!("cp {name}")),
        );
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
    fn copies_the_make_output() {
        let result = TestFixture::new()
            .with_module("Android.bp", "makefile_goal", r#"{
                "name": "system_img", "product_out_path": "obj/system.img"
            }"#)
            .run()
            .unwrap();
        expect![[r#"cp: out/target/product/test_device/obj/system.img -> out/soong/.intermediates/system_img/system.img"#]]
            .assert_eq(&result.describe_statements("system_img", ""));
    }

    #[test]
    fn path_is_required() {
        expect![[r#"Android.bp: module "goal": product_out_path: Path relative to PRODUCT_OUT required"#]]
            .assert_eq(
                &TestFixture::new()
                    .with_module("Android.bp", "makefile_goal", r#"{"name": "goal"}"#)
                    .run_expecting_errors(),
            );
    }
}
