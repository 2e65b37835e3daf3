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

use expect_test::expect;
use soongbuild::{fixture::TestFixture, module::Module, modules::filegroup::FileGroup};
use soongutil::config::ProductVariables;
use test_log::test;

#[test]
fn blueprint_problems_are_all_reported() {
    let err = TestFixture::new()
        .with_module("a/Android.bp", "cc_binary", r#"{"name": "bin"}"#)
        .with_module("a/Android.bp", "filegroup", r#"{"name": "fg", "color": "red"}"#)
        .with_module("a/Android.bp", "filegroup", r#"{"name": "dup"}"#)
        .with_module("b/Android.bp", "filegroup", r#"{"name": "dup"}"#)
        .run_expecting_errors();
    expect![[r#"
        a/Android.bp: module "bin": unrecognized module type "cc_binary"
        a/Android.bp: module "fg": color: unrecognized property "color"
        b/Android.bp: module "dup": module "dup" already defined"#]]
    .assert_eq(&err);
}

#[test]
fn undefined_dependencies_fail_the_build() {
    let err = TestFixture::new()
        .with_module("Android.bp", "filegroup", r#"{"name": "fg", "srcs": [":nope"]}"#)
        .run_expecting_errors();
    assert!(err.contains(r#"depends on undefined module "nope""#), "{err}");
}

#[test]
fn missing_dependencies_may_be_allowed() {
    let result = TestFixture::new()
        .with_variables(ProductVariables {
            allow_missing_dependencies: true,
            ..Default::default()
        })
        .with_module("Android.bp", "filegroup", r#"{"name": "fg", "srcs": [":nope"]}"#)
        .run()
        .unwrap();
    let missing = result
        .module::<FileGroup, _>("fg", "", |m| m.base().missing_deps().to_vec())
        .unwrap();
    assert_eq!(missing, vec!["nope"]);
    assert!(result.output_files("fg", "", "").is_empty());
}

#[test]
fn dependency_cycles_are_reported() {
    let err = TestFixture::new()
        .with_module("Android.bp", "filegroup", r#"{"name": "a", "srcs": [":b"]}"#)
        .with_module("Android.bp", "filegroup", r#"{"name": "b", "srcs": [":a"]}"#)
        .run_expecting_errors();
    expect![[r#"dependency cycle: a -> b -> a"#]].assert_eq(&err);
}
