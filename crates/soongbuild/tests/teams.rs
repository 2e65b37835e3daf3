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
use soongbuild::{fixture::TestFixture, teams::ALL_TEAMS_FILE};
use test_log::test;

#[test]
fn ownership_follows_packages_and_team_properties() {
    let result = TestFixture::new()
        .with_files(&["top/plan.xml", "top/sub/x.txt"])
        .with_module("top/Android.bp", "team", r#"{"name": "trendy", "trendy_team_id": "123"}"#)
        .with_module("top/Android.bp", "team", r#"{"name": "other", "trendy_team_id": "456"}"#)
        .with_module("top/Android.bp", "package", r#"{"default_team": "trendy"}"#)
        .with_module("top/Android.bp", "csuite_config", r#"{
            "name": "plan", "test_config": "plan.xml", "team": "other"
        }"#)
        .with_module("top/sub/Android.bp", "filegroup", r#"{
            "name": "fg", "srcs": ["x.txt"], "test_only": true
        }"#)
        .with_module("Android.bp", "filegroup", r#"{"name": "orphan"}"#)
        .run()
        .unwrap();
    let path = format!("out/soong/ownership/{ALL_TEAMS_FILE}");
    expect![[r#"
        {
          "teams": [
            {
              "target_name": "fg",
              "path": "top/sub/Android.bp",
              "trendy_team_id": "123",
              "test_only": true,
              "top_level_target": false,
              "kind": "filegroup"
            },
            {
              "target_name": "orphan",
              "path": "Android.bp",
              "test_only": false,
              "top_level_target": false,
              "kind": "filegroup"
            },
            {
              "target_name": "plan",
              "path": "top/Android.bp",
              "trendy_team_id": "456",
              "test_only": false,
              "top_level_target": true,
              "kind": "csuite_config"
            }
          ]
        }"#]]
    .assert_eq(&result.file_content(&path).unwrap());
    let goal = result.statement_for_output("all_teams").unwrap();
    assert_eq!(goal.inputs, vec![path]);
}

#[test]
fn team_property_must_name_a_team() {
    let err = TestFixture::new()
        .with_files(&["x.txt"])
        .with_module("Android.bp", "filegroup", r#"{"name": "not_a_team", "srcs": ["x.txt"]}"#)
        .with_module("Android.bp", "filegroup", r#"{"name": "fg", "team": "not_a_team"}"#)
        .run_expecting_errors();
    expect![[r#"Android.bp: module "fg": team: module "not_a_team" is not a team module"#]]
        .assert_eq(&err);
}
