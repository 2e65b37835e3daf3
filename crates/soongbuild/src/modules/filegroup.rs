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

//! `filegroup`: a named list of source files other modules reference as
//! `:name`.

use serde::{Deserialize, Serialize};

use crate::{
    context::ModuleContext,
    module::{Module, ModuleBase},
    properties::{Field, PropertyBag, Schema, decode},
};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileGroupProperties {
    pub srcs: Vec<String>,
    pub exclude_srcs: Vec<String>,
    /// Directory the files are relative to when exported to Make.
    pub path: Option<String>,
}

static FILEGROUP_SCHEMA: Schema = Schema {
    name: "filegroup",
    fields: &[
        Field::path("srcs"),
        Field::path("exclude_srcs"),
        Field::plain("path"),
    ],
};

#[derive(Clone, Debug, Default)]
pub struct FileGroup {
    base: ModuleBase,
    pub properties: FileGroupProperties,
}

impl FileGroup {
    pub fn factory() -> Box<dyn Module> {
        Box::new(FileGroup::default())
    }
}

impl Module for FileGroup {
    fn base(&self) -> &ModuleBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ModuleBase {
        &mut self.base
    }

    fn property_schema(&self) -> &'static Schema {
        &FILEGROUP_SCHEMA
    }

    fn load_properties(&mut self, bag: &PropertyBag) -> Result<(), serde_json::Error> {
        self.properties = decode(bag)?;
        Ok(())
    }

    fn generate_build_actions(&mut self, ctx: &mut ModuleContext<'_>) {
        let srcs = ctx.paths_for_module_src_excludes(
            "srcs",
            &self.properties.srcs,
            &self.properties.exclude_srcs,
        );
        ctx.set_output_files(srcs, "");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use crate::{error::DiagnosticKind, fixture::TestFixture};
    use expect_test::expect;
    use test_log::test;

    #[test]
    fn sources_and_references_are_expanded() {
        let result = TestFixture::new()
            .with_files(&["a/x.txt", "a/y.txt", "a/sub/z.txt", "b/w.txt"])
            .with_module("a/Android.bp", "filegroup", r#"{
                "name": "fg",
                "srcs": ["x.txt", "y.txt", "sub/z.txt", ":other"],
                "exclude_srcs": ["y.txt"]
            }"#)
            .with_module("b/Android.bp", "filegroup", r#"{"name": "other", "srcs": ["w.txt"]}"#)
            .run()
            .unwrap();
        expect![[r#"
            a/x.txt
            a/sub/z.txt
            b/w.txt"#]]
        .assert_eq(&result.output_files("fg", "", "").join("\n"));
    }

    #[test]
    fn qualified_references_name_the_declaring_directory() {
        let result = TestFixture::new()
            .with_files(&["top/a.txt", "top/b.txt"])
            .with_module("top/Android.bp", "filegroup", r#"{"name": "libexample", "srcs": ["a.txt"]}"#)
            .with_module("top/Android.bp", "filegroup", r#"{"name": "gen", "srcs": ["b.txt"]}"#)
            .with_module("other/Android.bp", "filegroup", r#"{
                "name": "libother",
                "srcs": ["//top:libexample", "://top:gen"]
            }"#)
            .run()
            .unwrap();
        assert_eq!(result.output_files("libother", "", ""), vec!["top/a.txt", "top/b.txt"]);
    }

    #[test]
    fn unresolved_qualified_references_are_reported() {
        let err = TestFixture::new()
            .with_files(&["top/a.txt"])
            .with_module("top/Android.bp", "filegroup", r#"{"name": "libexample", "srcs": ["a.txt"]}"#)
            .with_module("other/Android.bp", "filegroup", r#"{
                "name": "libother",
                "srcs": ["//ns:missing", "//elsewhere:libexample"]
            }"#)
            .run()
            .err()
            .unwrap();
        expect![[r#"
            other/Android.bp: module "libother": depends on undefined module "//ns:missing"
            other/Android.bp: module "libother": depends on undefined module "//elsewhere:libexample""#]]
        .assert_eq(&err.to_string());
        assert!(
            err.diagnostics()
                .iter()
                .all(|d| d.kind == DiagnosticKind::UnresolvedReference)
        );
    }

    #[test]
    fn missing_sources_are_reported() {
        let err = TestFixture::new()
            .with_module("Android.bp", "filegroup", r#"{"name": "fg", "srcs": ["nope.txt"]}"#)
            .run_expecting_errors();
        expect![[r#"Android.bp: module "fg": srcs: module source path "nope.txt" does not exist"#]]
            .assert_eq(&err);
    }
}
