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

//! Variables and goals exported to Make.
//!
//! Every provider writes into a [`MakeVarsContext`]: the framework providers
//! first, then singletons, then enabled modules. The result is rendered into
//! `out/soong/make_vars<suffix>.mk`, which compares each `SOONG_<NAME>`
//! against the value Make computed, and `out/soong/late<suffix>.mk`, which
//! declares phony and dist goals.

use std::{fmt::Write as _, path::Path};

use anyhow::Context;
use log::{debug, info};
use soongutil::config::Config;

use crate::{
    error::{Diagnostic, DiagnosticKind},
    graph::ModuleGraph,
    licenses,
    singleton::Singleton,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MakeVar {
    pub name: String,
    pub value: String,
    /// Compare as a set of words instead of a literal string.
    pub sort: bool,
    /// A mismatch fails the build instead of warning.
    pub strict: bool,
}

pub struct MakeVarsContext<'a> {
    config: &'a Config,
    vars: Vec<MakeVar>,
    phonies: Vec<(String, Vec<String>)>,
    dists: Vec<(Vec<String>, Vec<String>)>,
    errors: Vec<String>,
}

impl<'a> MakeVarsContext<'a> {
    pub fn new(config: &'a Config) -> Self {
        MakeVarsContext {
            config,
            vars: vec![],
            phonies: vec![],
            dists: vec![],
            errors: vec![],
        }
    }

    pub fn config(&self) -> &'a Config {
        self.config
    }

    fn add(&mut self, name: &str, value: &str, strict: bool, sort: bool) {
        self.vars.push(MakeVar {
            name: name.to_string(),
            value: value.to_string(),
            sort,
            strict,
        });
    }

    /// Exports `SOONG_<name>`. A different value set by Make fails the build.
    pub fn strict(&mut self, name: &str, value: &str) {
        self.add(name, value, true, false)
    }

    pub fn strict_sorted(&mut self, name: &str, value: &str) {
        self.add(name, value, true, true)
    }

    /// Exports `SOONG_<name>`. A different value set by Make only warns.
    pub fn check(&mut self, name: &str, value: &str) {
        self.add(name, value, false, false)
    }

    pub fn phony(&mut self, name: &str, deps: Vec<String>) {
        self.phonies.push((name.to_string(), deps));
    }

    pub fn dist_for_goals(&mut self, goals: &[&str], paths: Vec<String>) {
        self.dists
            .push((goals.iter().map(|g| g.to_string()).collect(), paths));
    }

    pub fn errorf(&mut self, msg: String) {
        self.errors.push(msg);
    }

    pub fn vars(&self) -> &[MakeVar] {
        &self.vars
    }
}

/// The rendered export files.
#[derive(Clone, Debug, Default)]
pub struct MakeVarsOutput {
    pub vars: Vec<MakeVar>,
    pub make_vars: String,
    pub late: String,
}

/// Runs every provider and renders the export files. Phony and dist goals of
/// singletons are passed in `extra_dists`.
pub(crate) fn generate(
    graph: &ModuleGraph,
    config: &Config,
    singletons: &[Box<dyn Singleton>],
    extra_dists: Vec<(Vec<String>, Vec<String>)>,
) -> Result<MakeVarsOutput, Vec<Diagnostic>> {
    let mut ctx = MakeVarsContext::new(config);
    licenses::make_vars(&mut ctx);
    for s in singletons {
        s.make_vars(&mut ctx);
    }
    for id in graph.variants() {
        let module = graph.node(*id).module.read();
        if module.base().enabled() {
            module.make_vars(&mut ctx);
        }
    }
    if !ctx.errors.is_empty() {
        return Err(ctx
            .errors
            .into_iter()
            .map(|e| Diagnostic::global(DiagnosticKind::Module, e))
            .collect());
    }

    let MakeVarsContext {
        mut vars,
        mut phonies,
        mut dists,
        ..
    } = ctx;
    dists.extend(extra_dists);
    vars.sort_by(|a, b| a.name.cmp(&b.name));
    phonies.sort_by(|a, b| a.0.cmp(&b.0));
    dists.sort();
    debug!(
        "make vars: {} variables, {} phonies, {} dists",
        vars.len(),
        phonies.len(),
        dists.len()
    );
    Ok(MakeVarsOutput {
        make_vars: write_vars(&vars),
        late: write_late(&phonies, &dists),
        vars,
    })
}

const MAKE_VARS_HEADER: &str = r#"# Autogenerated file

# Compares SOONG_$(1) against $(1), and warns if they are not equal.
#
# If the original variable is empty, then just set it to the SOONG_ version.
#
# $(1): Name of the variable to check
# $(2): If not-empty, sort the values before comparing
# $(3): Extra snippet to run if it does not match
define soong-compare-var
ifneq ($$($(1)),)
  my_val_make := $$(strip $(if $(2),$$(sort $$($(1))),$$($(1))))
  my_val_soong := $(if $(2),$$(sort $$(SOONG_$(1))),$$(SOONG_$(1)))
  ifneq ($$(my_val_make),$$(my_val_soong))
    $$(warning $(1) does not match between Make and Soong:)
    $(if $(2),$$(warning Make  adds: $$(filter-out $$(my_val_soong),$$(my_val_make))),$$(warning Make : $$(my_val_make)))
    $(if $(2),$$(warning Soong adds: $$(filter-out $$(my_val_make),$$(my_val_soong))),$$(warning Soong: $$(my_val_soong)))
    $(3)
  endif
  my_val_make :=
  my_val_soong :=
else
  $(1) := $$(SOONG_$(1))
endif
.KATI_READONLY := $(1) SOONG_$(1)
endef

my_check_failed := false

"#;

/// Renders `make_vars.mk`: strict variables, the check of their results,
/// then the other variables.
pub fn write_vars(vars: &[MakeVar]) -> String {
    let mut buf = String::from(MAKE_VARS_HEADER);
    for v in vars.iter().filter(|v| v.strict) {
        let sort = if v.sort { "true" } else { "" };
        let _ = write!(
            buf,
            "SOONG_{name} := {value}\n$(eval $(call soong-compare-var,{name},{sort},my_check_failed := true))\n\n",
            name = v.name,
            value = v.value,
        );
    }
    buf.push_str(
        "\nifneq ($(my_check_failed),false)\n  $(error Soong variable check failed)\nendif\nmy_check_failed :=\n\n\n",
    );
    for v in vars.iter().filter(|v| !v.strict) {
        let sort = if v.sort { "true" } else { "" };
        let _ = write!(
            buf,
            "SOONG_{name} := {value}\n$(eval $(call soong-compare-var,{name},{sort}))\n\n",
            name = v.name,
            value = v.value,
        );
    }
    buf.push_str("\nsoong-compare-var :=\n\n");
    buf
}

/// Renders `late.mk`: phony goals, then dist goals.
pub fn write_late(
    phonies: &[(String, Vec<String>)],
    dists: &[(Vec<String>, Vec<String>)],
) -> String {
    let mut buf = String::from(
        "# Autogenerated file\n\n# Values written by Soong read after parsing all Android.mk files.\n\n\n",
    );
    for (name, deps) in phonies {
        let _ = write!(buf, ".PHONY: {name}\n{name}: {}\n", deps.join("\\\n  "));
    }
    buf.push('\n');
    for (goals, paths) in dists {
        let goals = goals.join(" ");
        let _ = write!(
            buf,
            ".PHONY: {goals}\n$(call dist-for-goals,{goals},{})\n",
            paths.join(" ")
        );
    }
    buf
}

/// Writes `content` to `path` unless it already holds exactly that. Returns
/// whether the file was written.
pub fn write_file_if_changed(path: &Path, content: &str) -> anyhow::Result<bool> {
    if std::fs::read_to_string(path).is_ok_and(|old| old == content) {
        return Ok(false);
    }
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(true)
}

/// Writes the export files into `out/soong` when Kati reads them.
pub(crate) fn write_files(config: &Config, output: &MakeVarsOutput) -> anyhow::Result<()> {
    if !config.kati_enabled() || config.capture_build() {
        return Ok(());
    }
    let suffix = config.make_suffix();
    let soong_out = config.abs(config.soong_out_dir());
    for (name, content) in [
        (format!("make_vars{suffix}.mk"), &output.make_vars),
        (format!("late{suffix}.mk"), &output.late),
    ] {
        let path = soong_out.join(&name);
        if write_file_if_changed(&path, content)? {
            info!("Wrote {}", path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use super::*;
    use expect_test::expect;
    use soongutil::config::ProductVariables;
    use test_log::test;

    #[test]
    fn variables_keep_their_flags() {
        let config = Config::for_test(ProductVariables::default(), &[] as &[&str]);
        let mut ctx = MakeVarsContext::new(&config);
        ctx.strict_sorted("LIST", "b a");
        ctx.check("PLAIN", "b a");
        assert_eq!(
            ctx.vars(),
            &[
                MakeVar {
                    name: "LIST".into(),
                    value: "b a".into(),
                    sort: true,
                    strict: true,
                },
                MakeVar {
                    name: "PLAIN".into(),
                    value: "b a".into(),
                    sort: false,
                    strict: false,
                },
            ]
        );
    }

    #[test]
    fn vars_file() {
        let vars = vec![
            MakeVar {
                name: "STRICT".into(),
                value: "x".into(),
                sort: false,
                strict: true,
            },
            MakeVar {
                name: "LOOSE".into(),
                value: "a b".into(),
                sort: true,
                strict: false,
            },
        ];
        let rendered = write_vars(&vars);
        let body = rendered.strip_prefix(MAKE_VARS_HEADER).unwrap();
        expect![[r#"
            SOONG_STRICT := x
            $(eval $(call soong-compare-var,STRICT,,my_check_failed := true))


            ifneq ($(my_check_failed),false)
              $(error Soong variable check failed)
            endif
            my_check_failed :=


            SOONG_LOOSE := a b
            $(eval $(call soong-compare-var,LOOSE,true))


            soong-compare-var :=

        "#]]
        .assert_eq(body);
    }

    #[test]
    fn late_file() {
        let rendered = write_late(
            &[("droid".into(), vec!["a".into(), "b".into()])],
            &[(vec!["all_teams".into()], vec!["out/soong/ownership/all_teams.json".into()])],
        );
        expect![[r#"
            # Autogenerated file

            # Values written by Soong read after parsing all Android.mk files.


            .PHONY: droid
            droid: a\
              b

            .PHONY: all_teams
            $(call dist-for-goals,all_teams,out/soong/ownership/all_teams.json)
        "#]]
        .assert_eq(&rendered);
    }

    #[test]
    fn unchanged_files_are_not_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("soong").join("make_vars.mk");
        assert!(write_file_if_changed(&path, "a").unwrap());
        assert!(!write_file_if_changed(&path, "a").unwrap());
        assert!(write_file_if_changed(&path, "b").unwrap());
    }
}
