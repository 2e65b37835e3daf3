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

//! Visibility: which packages may depend on a module.
//!
//! A module's `visibility` property, or else the `default_visibility` of the
//! nearest package declaring one, lists the packages allowed to depend on it.
//! Without either the module is public. Modules of the same package always
//! see each other.

use once_cell::sync::Lazy;
use regex::Regex;
use soongutil::path::{ancestors, is_under};

use crate::{
    context::{BaseModuleContext, BottomUpMutatorContext, TopDownMutatorContext},
    module::Module,
    modules::package::{PackageMap, PackageModule},
    mutator::RegisterMutatorsContext,
};

/// Module types that `//visibility:any_partition` makes a module visible to.
const PARTITION_MODULE_TYPES: &[&str] = &["android_filesystem", "android_system_image"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VisibilityRule {
    Public,
    Private,
    AnyPartition,
    /// Modules declared in exactly this directory.
    Package(String),
    /// Modules declared in this directory or below it.
    Subpackages(String),
}

impl VisibilityRule {
    fn matches(&self, dir: &str, module_type: &str) -> bool {
        match self {
            VisibilityRule::Public => true,
            VisibilityRule::Private => false,
            VisibilityRule::AnyPartition => PARTITION_MODULE_TYPES.contains(&module_type),
            VisibilityRule::Package(pkg) => dir == pkg,
            VisibilityRule::Subpackages(pkg) => pkg.is_empty() || is_under(dir, pkg),
        }
    }
}

fn pattern_error(rule: &str) -> String {
    format!(
        "invalid visibility pattern {rule:?} must match //<package>:<scope>, //<package> or \
         :<scope> where <scope> is one of \"__pkg__\", \"__subpackages__\""
    )
}

/// Splits `rule` into its package and scope, expanding the short forms
/// relative to `current`.
fn split_rule(rule: &str, current: &str) -> Option<(String, String)> {
    static RULE_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^(?://([^/:]+(?:/[^/:]+)*))?(?::([^/:]+))?$")
            .expect("Invalid visibility rule pattern")
    });
    if rule.is_empty() {
        return None;
    }
    let caps = RULE_RE.captures(rule)?;
    let pkg = caps
        .get(1)
        .map_or_else(|| current.to_string(), |m| m.as_str().to_string());
    let name = caps.get(2).map_or("__pkg__", |m| m.as_str()).to_string();
    Some((pkg, name))
}

/// The package name of a directory as rules spell it: `""` at the root.
fn pkg_name(dir: &str) -> &str {
    if dir == "." { "" } else { dir }
}

/// Problems with the rules of a module in `current`.
pub fn check_rules(rules: &[String], current: &str) -> Vec<String> {
    let mut errors = vec![];
    let mut rule_count = rules.len();
    for (i, v) in rules.iter().enumerate() {
        let Some((pkg, name)) = split_rule(v, current) else {
            errors.push(pattern_error(v));
            continue;
        };
        if pkg == "visibility" {
            match name.as_str() {
                "private" | "public" | "any_partition" => {}
                "legacy_public" => {
                    errors.push("//visibility:legacy_public must not be used".to_string());
                    continue;
                }
                "override" => rule_count -= 1,
                _ => {
                    errors.push(format!("unrecognized visibility rule {v:?}"));
                    continue;
                }
            }
            if name == "override" {
                if i != 0 {
                    errors.push(format!(
                        "{v:?} may only be used at the start of the visibility rules"
                    ));
                }
            } else if rule_count != 1 {
                errors.push(format!("cannot mix {v:?} with any other visibility rules"));
            }
            continue;
        }
        if name != "__pkg__" && name != "__subpackages__" {
            errors.push(pattern_error(v));
            continue;
        }
        if !is_under(pkg_name(current), "vendor") && !allowed_from_outside_vendor(&pkg, &name) {
            errors.push(format!(
                "{v:?} is not allowed. Packages outside //vendor cannot make themselves visible \
                 to specific targets within //vendor, they can only use //vendor:__subpackages__."
            ));
        }
    }
    errors
}

fn allowed_from_outside_vendor(pkg: &str, name: &str) -> bool {
    if pkg == "vendor" {
        return name == "__subpackages__";
    }
    !is_under(pkg, "vendor")
}

/// The rules of a module in `current`. Invalid rules are dropped; they are
/// reported against the declaring module.
pub fn parse_rules(rules: &[String], current: &str) -> Vec<VisibilityRule> {
    let mut res = vec![];
    for v in rules {
        let Some((pkg, name)) = split_rule(v, current) else {
            continue;
        };
        let rule = match (pkg.as_str(), name.as_str()) {
            ("visibility", "private") => VisibilityRule::Private,
            ("visibility", "public") => VisibilityRule::Public,
            ("visibility", "any_partition") => VisibilityRule::AnyPartition,
            ("visibility", "override") => {
                res.clear();
                continue;
            }
            ("visibility", _) => continue,
            (_, "__pkg__") => VisibilityRule::Package(pkg),
            (_, "__subpackages__") => VisibilityRule::Subpackages(pkg),
            _ => continue,
        };
        res.push(rule);
    }
    if res.contains(&VisibilityRule::Private) {
        return vec![VisibilityRule::Private];
    }
    if res.contains(&VisibilityRule::Public) {
        return vec![VisibilityRule::Public];
    }
    res
}

/// The rules that apply to a module declared in `dir`.
fn effective_rules(packages: &PackageMap, module: &dyn Module, dir: &str) -> Vec<VisibilityRule> {
    let own = &module.base().common().visibility;
    if !own.is_empty() {
        return parse_rules(own, pkg_name(dir));
    }
    for d in ancestors(dir) {
        if let Some(package) = packages.get(d)
            && !package.default_visibility.is_empty()
        {
            return parse_rules(&package.default_visibility, pkg_name(d));
        }
    }
    vec![VisibilityRule::Public]
}

pub(crate) fn register_enforcer(ctx: &mut RegisterMutatorsContext) {
    ctx.bottom_up("visibility_rule_checker", rule_checker).parallel();
    ctx.top_down("visibility_rule_enforcer", rule_enforcer).parallel();
}

fn report(ctx: &mut BaseModuleContext<'_>, property: &str, errors: Vec<String>) {
    for e in errors {
        ctx.property_errorf(property, e);
    }
}

fn rule_checker(ctx: &mut BottomUpMutatorContext<'_>, module: &mut dyn Module) {
    let dir = ctx.module_dir();
    let current = pkg_name(&dir);
    if let Some(package) = module.downcast_ref::<PackageModule>() {
        let errors = check_rules(&package.properties.default_visibility, current);
        report(ctx, "default_visibility", errors);
        return;
    }
    let errors = check_rules(&module.base().common().visibility, current);
    report(ctx, "visibility", errors);
}

fn rule_enforcer(ctx: &mut TopDownMutatorContext<'_>, _module: &mut dyn Module) {
    let dir = ctx.module_dir();
    let module_type = ctx.module_type();
    let packages = PackageMap::of(ctx.config());
    let mut errors = vec![];
    for dep in ctx.direct_deps() {
        if dep.tag().exclude_from_visibility_enforcement() {
            continue;
        }
        let dep_dir = dep.dir();
        if dep_dir == dir {
            continue;
        }
        let rules = {
            let m = dep.module();
            effective_rules(&packages, &**m, &dep_dir)
        };
        if !rules.iter().any(|r| r.matches(pkg_name(&dir), module_type)) {
            errors.push(format!(
                "depends on //{}:{} which is not visible to this module\n\
                 You may need to add {:?} to its visibility",
                pkg_name(&dep_dir),
                dep.name(),
                format!("//{}", pkg_name(&dir))
            ));
        }
    }
    for e in errors {
        ctx.module_errorf(e);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    fn rules(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn short_forms_expand_to_the_current_package() {
        assert_eq!(
            parse_rules(&rules(&[":__subpackages__", "//other"]), "top"),
            vec![
                VisibilityRule::Subpackages("top".into()),
                VisibilityRule::Package("other".into())
            ]
        );
    }

    #[test]
    fn public_and_private_take_over() {
        assert_eq!(
            parse_rules(&rules(&["//a:__pkg__", "//visibility:public"]), "x"),
            vec![VisibilityRule::Public]
        );
        assert_eq!(
            parse_rules(&rules(&["//a:__pkg__", "//visibility:override", "//b"]), "x"),
            vec![VisibilityRule::Package("b".into())]
        );
    }

    #[test]
    fn invalid_rules_are_reported() {
        let errors = check_rules(
            &rules(&["//visibility:private", "//a:__pkg__", "//b:foo", "//vendor/x"]),
            "top",
        );
        assert_eq!(errors.len(), 3);
        assert_eq!(
            errors[0],
            r#"cannot mix "//visibility:private" with any other visibility rules"#
        );
        assert!(errors[1].starts_with(r#"invalid visibility pattern "//b:foo""#));
        assert!(errors[2].starts_with(r#""//vendor/x" is not allowed."#));
        assert!(check_rules(&rules(&["//vendor:__subpackages__"]), "top").is_empty());
    }

    #[test]
    fn subpackages_do_not_match_siblings() {
        let r = VisibilityRule::Subpackages("foo".into());
        assert!(r.matches("foo/bar", "filegroup"));
        assert!(!r.matches("fooo/bar", "filegroup"));
        assert!(VisibilityRule::AnyPartition.matches("x", "android_filesystem"));
        assert!(!VisibilityRule::AnyPartition.matches("x", "filegroup"));
    }
}
