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

//! Builds the initial module graph from parsed blueprint files.
//!
//! The input is a JSON array with one entry per module declaration:
//!
//! ```json
//! [{"type": "filegroup", "file": "top/Android.bp", "props": {"name": "x"}}]
//! ```

use indexmap::IndexMap;
use log::info;
use relative_path::RelativePathBuf;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    error::{Diagnostic, DiagnosticKind, ModuleRef},
    graph::ModuleGraph,
    module::{COMMON_SCHEMA, ModuleFactory},
    modules::package::PackageModule,
    prebuilt::PREBUILT_PREFIX,
    properties::{PropertyBag, unknown_properties},
};

#[derive(Debug, Deserialize)]
struct BlueprintEntry {
    #[serde(rename = "type")]
    module_type: String,
    file: String,
    #[serde(default)]
    props: PropertyBag,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to parse blueprint input")]
    Parse(#[source] serde_json_lenient::Error),

    #[error("{} errors in blueprint files", .0.len())]
    Diagnostics(Vec<Diagnostic>),
}

fn entry_error(
    entry: &BlueprintEntry,
    name: &str,
    property: Option<&str>,
    msg: String,
) -> Diagnostic {
    Diagnostic {
        module: Some(ModuleRef {
            name: name.to_string(),
            variant: String::new(),
            bp_file: entry.file.clone(),
        }),
        property: property.map(str::to_string),
        kind: if property.is_some() {
            DiagnosticKind::Property
        } else {
            DiagnosticKind::Module
        },
        message: msg,
    }
}

/// Creates one module per entry of `text`. Every problem is reported before
/// giving up.
pub fn load_blueprints(
    text: &str,
    module_types: &IndexMap<String, ModuleFactory>,
) -> Result<ModuleGraph, LoadError> {
    let entries: Vec<BlueprintEntry> =
        serde_json_lenient::from_str(text).map_err(LoadError::Parse)?;
    let mut graph = ModuleGraph::new();
    let mut diags = vec![];

    for entry in &entries {
        let declared_name = entry
            .props
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let Some(factory) = module_types.get(&entry.module_type) else {
            diags.push(entry_error(
                entry,
                &declared_name,
                None,
                format!("unrecognized module type {:?}", entry.module_type),
            ));
            continue;
        };
        let mut module = factory();
        let bp_file = RelativePathBuf::from(entry.file.as_str());

        let name = if module.is::<PackageModule>() {
            let dir = bp_file.parent().map(|p| p.as_str()).unwrap_or_default();
            format!("//{dir}")
        } else if module.prebuilt().is_some() {
            format!("{PREBUILT_PREFIX}{declared_name}")
        } else {
            declared_name.clone()
        };
        if declared_name.is_empty() && !module.is::<PackageModule>() {
            diags.push(entry_error(entry, &name, Some("name"), "property is missing".into()));
            continue;
        }

        let unknown = unknown_properties(&[&COMMON_SCHEMA, module.property_schema()], &entry.props);
        if !unknown.is_empty() {
            for p in unknown {
                diags.push(entry_error(
                    entry,
                    &name,
                    Some(&p),
                    format!("unrecognized property {p:?}"),
                ));
            }
            continue;
        }

        module.base_mut().bag = entry.props.clone();
        let loaded = module
            .base_mut()
            .load_common()
            .and_then(|()| module.load_properties(&entry.props));
        if let Err(e) = loaded {
            diags.push(entry_error(
                entry,
                &name,
                None,
                format!("failed to decode properties: {e}"),
            ));
            continue;
        }

        if graph
            .add_module(&name, &entry.module_type, bp_file, module)
            .is_none()
        {
            diags.push(entry_error(
                entry,
                &name,
                None,
                format!("module {name:?} already defined"),
            ));
        }
    }

    if !diags.is_empty() {
        return Err(LoadError::Diagnostics(diags));
    }
    info!("Loaded {} modules", graph.variants().len());
    Ok(graph)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use super::*;
    use crate::modules::{filegroup::FileGroup, java_import::JavaImport};
    use expect_test::expect;
    use test_log::test;

    fn types() -> IndexMap<String, ModuleFactory> {
        let mut m: IndexMap<String, ModuleFactory> = IndexMap::new();
        m.insert("filegroup".into(), FileGroup::factory);
        m.insert("java_import".into(), JavaImport::factory);
        m.insert("package".into(), PackageModule::factory);
        m
    }

    fn errors(text: &str) -> String {
        match load_blueprints(text, &types()) {
            Err(LoadError::Diagnostics(d)) => {
                d.iter().map(|d| d.to_string()).collect::<Vec<_>>().join("\n")
            }
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("expected diagnostics"),
        }
    }

    #[test]
    fn names_of_special_modules() {
        let graph = load_blueprints(
            r#"[
                {"type": "package", "file": "top/Android.bp", "props": {}},
                {"type": "java_import", "file": "top/Android.bp", "props": {"name": "lib", "jars": ["a.jar"]}},
                {"type": "filegroup", "file": "Android.bp", "props": {"name": "fg", "srcs": ["a"]}}
            ]"#,
            &types(),
        )
        .unwrap();
        assert!(graph.group_by_name("//top").is_some());
        assert!(graph.group_by_name("prebuilt_lib").is_some());
        assert_eq!(graph.group_by_name("fg").unwrap().dir(), ".");
    }

    #[test]
    fn problems_are_all_reported() {
        expect![[r#"
            a/Android.bp: module "x": unrecognized module type "cc_library"
            a/Android.bp: module "fg": srcz: unrecognized property "srcz"
            b/Android.bp: module "dup": module "dup" already defined"#]]
        .assert_eq(&errors(
            r#"[
                {"type": "cc_library", "file": "a/Android.bp", "props": {"name": "x"}},
                {"type": "filegroup", "file": "a/Android.bp", "props": {"name": "fg", "srcz": []}},
                {"type": "filegroup", "file": "a/Android.bp", "props": {"name": "dup"}},
                {"type": "filegroup", "file": "b/Android.bp", "props": {"name": "dup"}}
            ]"#,
        ));
    }
}
