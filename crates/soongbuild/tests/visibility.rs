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
use soongbuild::fixture::TestFixture;
use test_log::test;

fn tree(visibility: &str) -> TestFixture {
    TestFixture::new()
        .with_files(&["a/x.txt"])
        .with_module(
            "a/Android.bp",
            "filegroup",
            &format!(r#"{{"name": "secret", "srcs": ["x.txt"], "visibility": {visibility}}}"#),
        )
        .with_module("b/Android.bp", "filegroup", r#"{"name": "user", "srcs": [":secret"]}"#)
}

#[test]
fn private_modules_are_hidden() {
    expect![[r#"
        b/Android.bp: module "user": depends on //a:secret which is not visible to this module
        You may need to add "//b" to its visibility"#]]
    .assert_eq(&tree(r#"["//visibility:private"]"#).run_expecting_errors());
}

#[test]
fn listed_packages_may_depend() {
    let result = tree(r#"["//b:__pkg__"]"#).run().unwrap();
    assert_eq!(result.output_files("user", "", ""), vec!["a/x.txt"]);
}

#[test]
fn package_default_visibility_applies() {
    let err = TestFixture::new()
        .with_files(&["a/x.txt"])
        .with_module("a/Android.bp", "package", r#"{"default_visibility": ["//c:__pkg__"]}"#)
        .with_module("a/Android.bp", "filegroup", r#"{"name": "secret", "srcs": ["x.txt"]}"#)
        .with_module("b/Android.bp", "filegroup", r#"{"name": "user", "srcs": [":secret"]}"#)
        .run_expecting_errors();
    assert!(err.contains("depends on //a:secret which is not visible"), "{err}");
}

#[test]
fn malformed_rules_are_reported() {
    let err = TestFixture::new()
        .with_files(&["a/x.txt"])
        .with_module("a/Android.bp", "filegroup", r#"{
            "name": "secret", "srcs": ["x.txt"], "visibility": ["//visibility:unknown"]
        }"#)
        .run_expecting_errors();
    expect![[r#"a/Android.bp: module "secret": visibility: unrecognized visibility rule "//visibility:unknown""#]]
        .assert_eq(&err);
}
