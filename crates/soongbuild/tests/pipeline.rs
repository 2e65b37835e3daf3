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

use std::sync::Arc;

use expect_test::expect;
use parking_lot::Mutex;
use soongbuild::{
    deptag::SourceOrOutputDepTag,
    fixture::{TestFixture, TestResult},
    model::{Phase, VariantId},
    provider::ProviderKey,
};
use test_log::test;

type Seen = Arc<Mutex<Vec<String>>>;

struct Color(&'static str);

static COLOR: ProviderKey<Color> = ProviderKey::new("Color");

/// `a -> b -> c -> l`, linked through `srcs` references.
fn chain() -> TestFixture {
    TestFixture::new()
        .with_files(&["l.txt"])
        .with_module("Android.bp", "filegroup", r#"{"name": "a", "srcs": [":b"]}"#)
        .with_module("Android.bp", "filegroup", r#"{"name": "b", "srcs": [":c"]}"#)
        .with_module("Android.bp", "filegroup", r#"{"name": "c", "srcs": [":l"]}"#)
        .with_module("Android.bp", "filegroup", r#"{"name": "l", "srcs": ["l.txt"]}"#)
}

fn label(result: &TestResult, id: VariantId) -> String {
    let graph = result.graph();
    let subdir = graph.node(id).variant().subdir();
    let name = graph.group_of(id).name();
    if subdir.is_empty() {
        name.to_string()
    } else {
        format!("{name}({subdir})")
    }
}

/// Every variant with its `srcs` dependencies, in graph order.
fn describe(result: &TestResult) -> String {
    let graph = result.graph();
    graph
        .variants()
        .iter()
        .map(|id| {
            let deps: Vec<String> = graph
                .node(*id)
                .deps()
                .iter()
                .filter(|d| d.tag.is::<SourceOrOutputDepTag>())
                .map(|d| label(result, d.target))
                .collect();
            format!("{} -> [{}]", label(result, *id), deps.join(", "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn recorded(seen: &Seen) -> Vec<String> {
    seen.lock()
        .iter()
        .filter(|n| ["a", "b", "c", "l"].contains(&n.as_str()))
        .cloned()
        .collect()
}

#[test]
fn top_down_visits_dependencies_first() {
    let seen: Seen = Arc::default();
    let record = seen.clone();
    chain()
        .with_mutators(Phase::Final, move |ctx| {
            let record = record.clone();
            ctx.top_down("record", move |ctx, _| {
                record.lock().push(ctx.module_name().to_string())
            });
        })
        .run()
        .unwrap();
    assert_eq!(recorded(&seen), vec!["l", "c", "b", "a"]);
}

#[test]
fn bottom_up_visits_dependents_first() {
    let seen: Seen = Arc::default();
    let record = seen.clone();
    chain()
        .with_mutators(Phase::Final, move |ctx| {
            let record = record.clone();
            ctx.bottom_up("record", move |ctx, _| {
                record.lock().push(ctx.module_name().to_string())
            });
        })
        .run()
        .unwrap();
    assert_eq!(recorded(&seen), vec!["a", "b", "c", "l"]);
}

#[test]
#[should_panic(expected = "in the deps phase")]
fn variations_are_frozen_while_resolving_dependencies() {
    let _ = chain()
        .with_mutators(Phase::Deps, |ctx| {
            ctx.bottom_up("color", |ctx, module| {
                ctx.create_variations(module, &["red", "blue"]);
            });
        })
        .run();
}

#[test]
#[should_panic(expected = "in the post_deps phase")]
fn variations_are_frozen_while_checking_dependencies() {
    let _ = chain()
        .with_mutators(Phase::PostDeps, |ctx| {
            ctx.bottom_up("color", |ctx, module| {
                ctx.create_variations(module, &["red", "blue"]);
            });
        })
        .run();
}

#[test]
fn a_failing_phase_completes_then_stops_the_pipeline() {
    let pre_arch: Seen = Arc::default();
    let arch: Seen = Arc::default();
    let (record_pre_arch, record_arch) = (pre_arch.clone(), arch.clone());
    let err = chain()
        .with_mutators(Phase::PreArch, move |ctx| {
            ctx.bottom_up("fail", |ctx, _| {
                if ctx.module_name() == "a" {
                    ctx.module_errorf("boom");
                }
            });
            let record = record_pre_arch.clone();
            ctx.bottom_up("record", move |ctx, _| {
                record.lock().push(ctx.module_name().to_string())
            });
        })
        .with_mutators(Phase::Arch, move |ctx| {
            let record = record_arch.clone();
            ctx.bottom_up("record", move |ctx, _| {
                record.lock().push(ctx.module_name().to_string())
            });
        })
        .run_expecting_errors();
    expect![[r#"Android.bp: module "a": boom"#]].assert_eq(&err);
    assert_eq!(recorded(&pre_arch), vec!["a", "b", "c", "l"]);
    assert!(arch.lock().is_empty());
}

fn split_every_module() -> TestFixture {
    chain()
        .with_module("Android.bp", "filegroup", r#"{"name": "d", "srcs": [":c"]}"#)
        .with_mutators(Phase::PreDeps, |ctx| {
            ctx.bottom_up("color", |ctx, module| {
                ctx.create_variations(module, &["red", "blue"]);
            })
            .parallel();
        })
}

#[test]
fn parallel_splits_are_deterministic() {
    let first = describe(&split_every_module().run().unwrap());
    expect![[r#"
        a(red) -> [b(red)]
        a(blue) -> [b(blue)]
        b(red) -> [c(red)]
        b(blue) -> [c(blue)]
        c(red) -> [l(red)]
        c(blue) -> [l(blue)]
        l(red) -> []
        l(blue) -> []
        d(red) -> [c(red)]
        d(blue) -> [c(blue)]"#]]
    .assert_eq(&first);
    for _ in 0..8 {
        assert_eq!(describe(&split_every_module().run().unwrap()), first);
    }
}

#[test]
fn unsplit_dependents_use_the_first_new_variant() {
    let result = chain()
        .with_mutators(Phase::PreDeps, |ctx| {
            ctx.bottom_up("color", |ctx, module| {
                if ctx.module_name() == "b" {
                    ctx.create_variations(module, &["red", "blue"]);
                }
            });
        })
        .run()
        .unwrap();
    expect![[r#"
        a -> [b(red)]
        b(red) -> [c]
        b(blue) -> [c]
        c -> [l]
        l -> []"#]]
    .assert_eq(&describe(&result));
    assert_eq!(result.output_files("a", "", ""), vec!["l.txt"]);
}

#[test]
fn split_variants_keep_providers() {
    let result = chain()
        .with_mutators(Phase::PreDeps, |ctx| {
            ctx.bottom_up("paint", |ctx, _| {
                if ctx.module_name() == "b" {
                    ctx.set_provider(&COLOR, Color("green"));
                }
            });
        })
        .with_mutators(Phase::Final, |ctx| {
            ctx.bottom_up("color", |ctx, module| {
                if ctx.module_name() == "b" {
                    ctx.create_variations(module, &["red", "blue"]);
                }
            });
        })
        .run()
        .unwrap();
    for variant in ["red", "blue"] {
        let color = result.provider("b", variant, &COLOR).unwrap();
        assert_eq!(color.0, "green");
    }
}

#[test]
#[should_panic(expected = "provider Color set for module \"a\" in the pre_arch phase")]
fn providers_cannot_be_set_before_arch_variants_exist() {
    let _ = chain()
        .with_mutators(Phase::PreArch, |ctx| {
            ctx.bottom_up("paint", |ctx, _| {
                if ctx.module_name() == "a" {
                    ctx.set_provider(&COLOR, Color("green"));
                }
            });
        })
        .run();
}

#[test]
#[should_panic(expected = "in the arch phase")]
fn providers_cannot_be_set_by_the_arch_phase() {
    let _ = chain()
        .with_mutators(Phase::Arch, |ctx| {
            ctx.top_down("paint", |ctx, _| ctx.set_provider(&COLOR, Color("green")));
        })
        .run();
}
