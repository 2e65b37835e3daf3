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

//! Property bags and the schemas describing them.
//!
//! Properties arrive as a JSON object per module. Each module type decodes
//! the bag into its own serde structs and declares a [`Schema`] listing the
//! property names it accepts and which of them hold paths. The schema is the
//! only reflective view of a property struct: unknown-property checks and
//! [`path_properties_of`] both go through it.

use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde_json::Value;
use soongutil::{
    common::first_unique,
    once::{OnceKey, OncePer},
};

pub type PropertyBag = serde_json::Map<String, Value>;

#[derive(Debug)]
pub enum FieldKind {
    Plain,
    /// A string or list of strings holding source paths or module
    /// references.
    Path,
    Struct(&'static Schema),
    StructList(&'static Schema),
}

#[derive(Debug)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl Field {
    pub const fn plain(name: &'static str) -> Self {
        Field {
            name,
            kind: FieldKind::Plain,
        }
    }

    pub const fn path(name: &'static str) -> Self {
        Field {
            name,
            kind: FieldKind::Path,
        }
    }

    pub const fn nested(name: &'static str, schema: &'static Schema) -> Self {
        Field {
            name,
            kind: FieldKind::Struct(schema),
        }
    }

    pub const fn nested_list(name: &'static str, schema: &'static Schema) -> Self {
        Field {
            name,
            kind: FieldKind::StructList(schema),
        }
    }
}

#[derive(Debug)]
pub struct Schema {
    /// Unique name of the property struct, used as the cache key.
    pub name: &'static str,
    pub fields: &'static [Field],
}

pub static EMPTY_SCHEMA: Schema = Schema {
    name: "empty",
    fields: &[],
};

impl Schema {
    fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Accessors of every path field reachable from a schema, as property name
/// chains. Lists of structs are walked element by element.
fn flatten_path_fields(schema: &Schema) -> Vec<Vec<&'static str>> {
    let mut res = vec![];
    for field in schema.fields {
        match &field.kind {
            FieldKind::Plain => {}
            FieldKind::Path => res.push(vec![field.name]),
            FieldKind::Struct(inner) | FieldKind::StructList(inner) => {
                for mut chain in flatten_path_fields(inner) {
                    chain.insert(0, field.name);
                    res.push(chain);
                }
            }
        }
    }
    res
}

static PATH_FIELD_INDEX: Lazy<OncePer> = Lazy::new(OncePer::new);

fn path_fields(schema: &'static Schema) -> Arc<Vec<Vec<&'static str>>> {
    PATH_FIELD_INDEX.once(&OnceKey::custom(schema.name), || {
        flatten_path_fields(schema)
    })
}

fn collect_strings(value: &Value, chain: &[&str], out: &mut Vec<String>) {
    match (chain.split_first(), value) {
        (_, Value::Array(items)) => {
            for item in items {
                collect_strings(item, chain, out);
            }
        }
        (None, Value::String(s)) => out.push(s.clone()),
        (Some((head, rest)), Value::Object(map)) => {
            if let Some(v) = map.get(*head) {
                collect_strings(v, rest, out);
            }
        }
        _ => {}
    }
}

/// Every value of a path property in `bag`, in schema order.
pub fn path_properties_of(schema: &'static Schema, bag: &PropertyBag) -> Vec<String> {
    let mut out = vec![];
    for chain in path_fields(schema).iter() {
        let (head, rest) = match chain.split_first() {
            Some(x) => x,
            None => continue,
        };
        if let Some(v) = bag.get(*head) {
            collect_strings(v, rest, &mut out);
        }
    }
    out
}

/// Returns the dotted names of properties in `bag` that none of `schemas`
/// declares.
pub fn unknown_properties(schemas: &[&Schema], bag: &PropertyBag) -> Vec<String> {
    let mut res = vec![];
    for (key, value) in bag {
        let field = schemas.iter().find_map(|s| s.field(key));
        match field {
            None => res.push(key.clone()),
            Some(Field {
                kind: FieldKind::Struct(inner) | FieldKind::StructList(inner),
                ..
            }) => {
                let objects: Vec<&PropertyBag> = match value {
                    Value::Object(m) => vec![m],
                    Value::Array(items) => items.iter().filter_map(|i| i.as_object()).collect(),
                    _ => vec![],
                };
                for obj in objects {
                    for nested in unknown_properties(&[*inner], obj) {
                        res.push(format!("{key}.{nested}"));
                    }
                }
            }
            Some(_) => {}
        }
    }
    first_unique(res)
}

/// Properties never inherited from a defaults module.
const NOT_DEFAULTABLE: &[&str] = &["name", "defaults", "visibility"];

/// Lists whose merged value is a set.
const SET_VALUED: &[&str] = &["licenses"];

/// Merges `defaults` into `dst`: lists are prepended, objects are merged
/// recursively and any other value is only filled in when `dst` lacks it.
pub fn extend_properties(dst: &mut PropertyBag, defaults: &PropertyBag) {
    extend_inner(dst, defaults, true);
}

fn extend_inner(dst: &mut PropertyBag, defaults: &PropertyBag, top: bool) {
    for (key, dv) in defaults {
        if top && NOT_DEFAULTABLE.contains(&key.as_str()) {
            continue;
        }
        match (dst.get_mut(key), dv) {
            (None, _) => {
                dst.insert(key.clone(), dv.clone());
            }
            (Some(Value::Array(own)), Value::Array(inherited)) => {
                let mut merged = inherited.clone();
                merged.append(own);
                if top && SET_VALUED.contains(&key.as_str()) {
                    let mut unique: Vec<Value> = Vec::with_capacity(merged.len());
                    for v in merged {
                        if !unique.contains(&v) {
                            unique.push(v);
                        }
                    }
                    merged = unique;
                }
                *own = merged;
            }
            (Some(Value::Object(own)), Value::Object(inherited)) => {
                extend_inner(own, inherited, false);
            }
            (Some(Value::Null), _) => {
                dst.insert(key.clone(), dv.clone());
            }
            (Some(_), _) => {}
        }
    }
}

/// Decodes a property struct from a bag. Keys the struct does not know are
/// ignored here; they are reported through [`unknown_properties`].
pub fn decode<T: DeserializeOwned>(bag: &PropertyBag) -> Result<T, serde_json::Error> {
    serde_json::from_value(Value::Object(bag.clone()))
}
