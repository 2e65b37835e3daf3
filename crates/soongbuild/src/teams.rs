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

//! Team ownership of modules.
//!
//! A module belongs to the team named by its `team` property, or else to the
//! `default_team` of the nearest package above its directory. The `all_teams`
//! singleton writes the ownership of every module to
//! `out/soong/ownership/all_teams.json`.

use std::collections::{BTreeMap, HashMap};

use log::debug;
use serde::Serialize;
use soongutil::path::ancestors;

use crate::{
    context::{BottomUpMutatorContext, BuilderContext, SingletonContext},
    deptag::TeamDepTag,
    makevars::MakeVarsContext,
    module::Module,
    modules::{
        package::{PackageMap, PackageModule},
        team::{TeamModule, TeamProperties},
    },
    mutator::RegisterMutatorsContext,
    paths::{OutputPath, path_for_output},
    raw_files::write_file_rule_verbatim,
    singleton::Singleton,
};

pub const OWNERSHIP_DIRECTORY: &str = "ownership";
pub const ALL_TEAMS_FILE: &str = "all_teams.json";

pub(crate) fn add_team_dependency(ctx: &mut BottomUpMutatorContext<'_>, module: &dyn Module) {
    if let Some(team) = &module.base().common().team {
        ctx.add_dependency(TeamDepTag, &[team]);
    }
}

pub(crate) fn register_checker(ctx: &mut RegisterMutatorsContext) {
    ctx.bottom_up("team_checker", team_checker).parallel();
}

fn team_checker(ctx: &mut BottomUpMutatorContext<'_>, _module: &mut dyn Module) {
    for dep in ctx.direct_deps_with_tag::<TeamDepTag>() {
        if !dep.module().is::<TeamModule>() {
            ctx.property_errorf("team", format!("module {:?} is not a team module", dep.name()));
        }
    }
}

/// What the singleton records per module name.
#[derive(Clone, Debug)]
struct ModuleTeamInfo {
    dir: String,
    bp_file: String,
    team: Option<String>,
    test_only: bool,
    top_level_test_target: bool,
    kind: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct TeamEntry {
    pub target_name: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trendy_team_id: Option<String>,
    pub test_only: bool,
    pub top_level_target: bool,
    pub kind: String,
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct AllTeams {
    pub teams: Vec<TeamEntry>,
}

/// The `default_team` of the closest package at or above `dir`. Packages
/// without a default team are skipped.
pub fn default_team(packages: &PackageMap, dir: &str) -> Option<String> {
    ancestors(dir).find_map(|d| packages.get(d).and_then(|p| p.default_team))
}

#[derive(Default)]
pub struct AllTeamsSingleton {
    output: Option<OutputPath>,
}

impl AllTeamsSingleton {
    pub fn factory() -> Box<dyn Singleton> {
        Box::new(AllTeamsSingleton::default())
    }

    fn collect(ctx: &SingletonContext<'_>) -> AllTeams {
        let mut teams: HashMap<String, TeamProperties> = HashMap::new();
        let mut modules: BTreeMap<String, ModuleTeamInfo> = BTreeMap::new();
        for handle in ctx.modules() {
            let module = handle.module();
            if module.is::<PackageModule>() {
                continue;
            }
            if let Some(team) = module.downcast_ref::<TeamModule>() {
                teams.insert(handle.name().to_string(), team.properties.clone());
                continue;
            }
            let test_only = module.base().common().test_only;
            // A variant that is not test-only makes the whole module so.
            if test_only && modules.get(handle.name()).is_some_and(|prev| !prev.test_only) {
                continue;
            }
            modules.insert(
                handle.name().to_string(),
                ModuleTeamInfo {
                    dir: handle.dir(),
                    bp_file: handle.bp_file().to_string(),
                    team: module.base().common().team.clone(),
                    test_only,
                    top_level_test_target: module.is_top_level_test_target(),
                    kind: handle.module_type().to_string(),
                },
            );
        }

        let packages = PackageMap::of(ctx.config());
        let entries = modules
            .into_iter()
            .map(|(name, info)| {
                let team = match &info.team {
                    Some(t) => Some(t.clone()),
                    None => default_team(&packages, &info.dir),
                };
                let trendy_team_id = team
                    .and_then(|t| teams.get(&t))
                    .and_then(|p| p.trendy_team_id.clone());
                TeamEntry {
                    target_name: name,
                    path: info.bp_file,
                    trendy_team_id,
                    test_only: info.test_only,
                    top_level_target: info.top_level_test_target,
                    kind: info.kind,
                }
            })
            .collect();
        AllTeams { teams: entries }
    }
}

impl Singleton for AllTeamsSingleton {
    fn generate_build_actions(&mut self, ctx: &mut SingletonContext<'_>) {
        let all_teams = Self::collect(ctx);
        debug!("all_teams: {} modules", all_teams.teams.len());
        let data = match serde_json::to_string_pretty(&all_teams) {
            Ok(d) => d,
            Err(e) => {
                ctx.marshal_errorf(format!("Unable to marshal team data. {e}"));
                return;
            }
        };
        let out = match path_for_output(ctx.config(), &[OWNERSHIP_DIRECTORY, ALL_TEAMS_FILE]) {
            Ok(p) => p,
            Err(e) => {
                ctx.errorf(e.to_string());
                return;
            }
        };
        write_file_rule_verbatim(ctx, &out, &data);
        ctx.phony("all_teams", vec![out.as_str().to_string()]);
        self.output = Some(out);
    }

    fn make_vars(&self, ctx: &mut MakeVarsContext<'_>) {
        if let Some(out) = &self.output {
            ctx.dist_for_goals(&["all_teams"], vec![out.as_str().to_string()]);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::modules::package::PackageProperties;
    use expect_test::expect;
    use test_log::test;

    fn package(team: Option<&str>) -> PackageProperties {
        PackageProperties {
            default_team: team.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn default_team_skips_packages_without_one() {
        let map = PackageMap::default();
        map.insert("top".into(), package(Some("T")));
        map.insert("top/nested".into(), package(None));
        assert_eq!(default_team(&map, "top/nested/deeper").as_deref(), Some("T"));
        assert_eq!(default_team(&map, "top").as_deref(), Some("T"));
        assert_eq!(default_team(&map, "."), None);
        assert_eq!(default_team(&map, "elsewhere"), None);
    }

    #[test]
    fn root_package_applies_everywhere() {
        let map = PackageMap::default();
        map.insert(".".into(), package(Some("root_team")));
        assert_eq!(default_team(&map, "a/b").as_deref(), Some("root_team"));
    }

    #[test]
    fn entries_render_without_missing_team_ids() {
        let all = AllTeams {
            teams: vec![TeamEntry {
                target_name: "libfoo".into(),
                path: "top/Android.bp".into(),
                trendy_team_id: None,
                test_only: false,
                top_level_target: false,
                kind: "filegroup".into(),
            }],
        };
        let rendered = serde_json::to_string_pretty(&all).unwrap_or_default();
        expect![[r#"
            {
              "teams": [
                {
                  "target_name": "libfoo",
                  "path": "top/Android.bp",
                  "test_only": false,
                  "top_level_target": false,
                  "kind": "filegroup"
                }
              ]
            }"#]]
        .assert_eq(&rendered);
    }
}
