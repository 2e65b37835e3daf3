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

//! Storage of the module graph: module groups, their variants and the tagged
//! edges between variants.
//!
//! The graph is only mutated between mutator passes, through
//! [`ModuleGraph::apply_changes`]. While a pass runs it is shared read-only
//! and every variant's module sits behind its own lock.

use std::collections::HashMap;

use arcstr::ArcStr;
use log::debug;
use parking_lot::RwLock;
use petgraph::{Direction, algo::toposort, graphmap::DiGraphMap};
use relative_path::{RelativePath, RelativePathBuf};
use slotmap::SlotMap;
use soongutil::{config::Config, path::split_qualified_name};
use tracing::{Level, instrument};

use crate::{
    deptag::{DepTag, PrebuiltDepTag},
    error::{Diagnostic, DiagnosticKind, ModuleRef},
    model::{GroupId, Variant, VariantId, Variation},
    module::Module,
    provider::ProviderStore,
};

pub struct ModuleGroup {
    pub(crate) name: ArcStr,
    pub(crate) module_type: ArcStr,
    pub(crate) bp_file: RelativePathBuf,
    pub(crate) variants: Vec<VariantId>,
}

impl ModuleGroup {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module_type(&self) -> &str {
        &self.module_type
    }

    pub fn bp_file(&self) -> &RelativePath {
        &self.bp_file
    }

    /// The directory of the declaring bp file, `"."` at the root.
    pub fn dir(&self) -> String {
        match self.bp_file.parent() {
            Some(p) if !p.as_str().is_empty() => p.to_string(),
            _ => ".".to_string(),
        }
    }

    pub fn variants(&self) -> &[VariantId] {
        &self.variants
    }
}

#[derive(Clone, Debug)]
pub struct DepEdge {
    pub target: VariantId,
    pub tag: DepTag,
}

pub struct VariantNode {
    pub(crate) group: GroupId,
    pub(crate) variant: Variant,
    pub(crate) module: RwLock<Box<dyn Module>>,
    pub(crate) deps: Vec<DepEdge>,
    pub(crate) providers: ProviderStore,
}

impl VariantNode {
    pub fn variant(&self) -> &Variant {
        &self.variant
    }

    pub fn deps(&self) -> &[DepEdge] {
        &self.deps
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("depends on undefined module {0:?}")]
    Undefined(String),

    #[error(
        "dependency {to:?} of {from:?} missing variant:\n  {requested}\navailable variants:\n  {}",
        available.iter().map(|v| v.to_string()).collect::<Vec<_>>().join("\n  ")
    )]
    MissingVariant {
        from: String,
        to: String,
        requested: Variant,
        available: Vec<Variant>,
    },
}

/// A module fanned out into variants by a mutator.
pub struct CreatedVariant {
    pub(crate) name: String,
    pub(crate) module: Box<dyn Module>,
}

impl CreatedVariant {
    /// The variation value of this variant.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module(&self) -> &dyn Module {
        self.module.as_ref()
    }

    pub fn module_mut(&mut self) -> &mut dyn Module {
        self.module.as_mut()
    }
}

pub(crate) struct DepRequest {
    pub(crate) tag: DepTag,
    pub(crate) names: Vec<String>,
    pub(crate) variations: Vec<Variation>,
    /// Resolve with only the explicit variations instead of overlaying them
    /// on the requesting variant.
    pub(crate) far: bool,
}

/// Structural changes requested by one module during a pass.
#[derive(Default)]
pub(crate) struct PendingChanges {
    pub(crate) variations: Option<(ArcStr, Vec<CreatedVariant>)>,
    pub(crate) deps: Vec<DepRequest>,
    pub(crate) rename: Option<String>,
    pub(crate) replace_deps: Vec<String>,
}

impl PendingChanges {
    pub(crate) fn is_empty(&self) -> bool {
        self.variations.is_none()
            && self.deps.is_empty()
            && self.rename.is_none()
            && self.replace_deps.is_empty()
    }
}

#[derive(Default)]
pub struct ModuleGraph {
    groups: SlotMap<GroupId, ModuleGroup>,
    nodes: SlotMap<VariantId, VariantNode>,
    by_name: HashMap<ArcStr, GroupId>,
    /// Every live variant, in creation order. Variants created by a split take
    /// the place of the variant they replace.
    order: Vec<VariantId>,
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a module with a single, variation-less variant. Returns `None`
    /// when the name is taken.
    pub fn add_module(
        &mut self,
        name: &str,
        module_type: &str,
        bp_file: RelativePathBuf,
        module: Box<dyn Module>,
    ) -> Option<VariantId> {
        let name = ArcStr::from(name);
        if self.by_name.contains_key(&name) {
            return None;
        }
        let group = self.groups.insert(ModuleGroup {
            name: name.clone(),
            module_type: ArcStr::from(module_type),
            bp_file,
            variants: vec![],
        });
        let id = self.nodes.insert(VariantNode {
            group,
            variant: Variant::new(),
            module: RwLock::new(module),
            deps: vec![],
            providers: ProviderStore::new(),
        });
        self.groups[group].variants.push(id);
        self.by_name.insert(name, group);
        self.order.push(id);
        Some(id)
    }

    /// Every live variant in stable creation order.
    pub fn variants(&self) -> &[VariantId] {
        &self.order
    }

    pub fn node(&self, id: VariantId) -> &VariantNode {
        &self.nodes[id]
    }

    pub(crate) fn node_mut(&mut self, id: VariantId) -> &mut VariantNode {
        &mut self.nodes[id]
    }

    pub fn group(&self, id: GroupId) -> &ModuleGroup {
        &self.groups[id]
    }

    pub fn group_of(&self, id: VariantId) -> &ModuleGroup {
        &self.groups[self.nodes[id].group]
    }

    /// Looks up a module by name. A fully qualified `//dir:name` only finds
    /// `name` when it is declared in `dir`.
    pub fn group_by_name(&self, name: &str) -> Option<&ModuleGroup> {
        if let Some(g) = self.by_name.get(name) {
            return Some(&self.groups[*g]);
        }
        let (dir, name) = split_qualified_name(name)?;
        let group = &self.groups[*self.by_name.get(name)?];
        (group.dir() == dir).then_some(group)
    }

    pub fn contains(&self, id: VariantId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Looks up a variant by module name and variant subdirectory, e.g.
    /// `("foo", "android_arm64")`.
    pub fn find_variant(&self, name: &str, subdir: &str) -> Option<VariantId> {
        let group = self.group_by_name(name)?;
        group
            .variants
            .iter()
            .copied()
            .find(|v| self.nodes[*v].variant.subdir() == subdir)
    }

    pub fn module_ref(&self, id: VariantId) -> ModuleRef {
        let group = self.group_of(id);
        ModuleRef {
            name: group.name.to_string(),
            variant: self.nodes[id].variant.subdir(),
            bp_file: group.bp_file.to_string(),
        }
    }

    /// Resolves a dependency on `name` to the variant matching `requested`.
    pub fn resolve(
        &self,
        from: VariantId,
        name: &str,
        requested: &Variant,
    ) -> Result<VariantId, ResolveError> {
        let Some(group) = self.group_by_name(name) else {
            return Err(ResolveError::Undefined(name.to_string()));
        };
        let matching: Vec<VariantId> = group
            .variants
            .iter()
            .copied()
            .filter(|v| self.nodes[*v].variant.matches(requested))
            .collect();
        match matching.as_slice() {
            [one] => Ok(*one),
            _ => Err(ResolveError::MissingVariant {
                from: self.group_of(from).name.to_string(),
                to: name.to_string(),
                requested: requested.clone(),
                available: group
                    .variants
                    .iter()
                    .map(|v| self.nodes[*v].variant.clone())
                    .collect(),
            }),
        }
    }

    /// Groups the live variants into levels that can be visited in parallel.
    ///
    /// With `deps_first`, every variant's level is above the levels of all
    /// its dependencies; otherwise above those of all its dependents. Within a
    /// level variants keep creation order.
    #[instrument(level = Level::DEBUG, skip(self))]
    pub fn levels(&self, deps_first: bool) -> Result<Vec<Vec<VariantId>>, Vec<VariantId>> {
        let mut g: DiGraphMap<VariantId, ()> = DiGraphMap::new();
        for id in &self.order {
            g.add_node(*id);
        }
        for id in &self.order {
            for edge in &self.nodes[*id].deps {
                g.add_edge(*id, edge.target, ());
            }
        }
        let sorted = match toposort(&g, None) {
            Ok(s) => s,
            Err(_) => return Err(self.find_cycle()),
        };

        let mut level: HashMap<VariantId, usize> = HashMap::with_capacity(sorted.len());
        let (walk, towards): (Box<dyn Iterator<Item = &VariantId>>, Direction) = if deps_first {
            (Box::new(sorted.iter().rev()), Direction::Outgoing)
        } else {
            (Box::new(sorted.iter()), Direction::Incoming)
        };
        for id in walk {
            let l = g
                .neighbors_directed(*id, towards)
                .filter_map(|n| level.get(&n))
                .map(|l| l + 1)
                .max()
                .unwrap_or(0);
            level.insert(*id, l);
        }

        let depth = level.values().copied().max().map_or(0, |m| m + 1);
        let mut res = vec![vec![]; depth];
        for id in &self.order {
            res[level[id]].push(*id);
        }
        Ok(res)
    }

    /// Finds one dependency cycle, returned as a closed path.
    fn find_cycle(&self) -> Vec<VariantId> {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        fn dfs(
            graph: &ModuleGraph,
            id: VariantId,
            color: &mut HashMap<VariantId, Color>,
            stack: &mut Vec<VariantId>,
        ) -> Option<Vec<VariantId>> {
            color.insert(id, Color::Gray);
            stack.push(id);
            for edge in &graph.nodes[id].deps {
                match color.get(&edge.target).copied().unwrap_or(Color::White) {
                    Color::Gray => {
                        let start = stack.iter().position(|s| *s == edge.target).unwrap_or(0);
                        let mut cycle = stack[start..].to_vec();
                        cycle.push(edge.target);
                        return Some(cycle);
                    }
                    Color::White => {
                        if let Some(c) = dfs(graph, edge.target, color, stack) {
                            return Some(c);
                        }
                    }
                    Color::Black => {}
                }
            }
            stack.pop();
            color.insert(id, Color::Black);
            None
        }

        let mut color = HashMap::new();
        for id in &self.order {
            if color.get(id).copied().unwrap_or(Color::White) == Color::White {
                let mut stack = vec![];
                if let Some(c) = dfs(self, *id, &mut color, &mut stack) {
                    return c;
                }
            }
        }
        vec![]
    }

    pub fn cycle_message(&self, cycle: &[VariantId]) -> String {
        let names: Vec<&str> = cycle.iter().map(|id| self.group_of(*id).name()).collect();
        format!("dependency cycle: {}", names.join(" -> "))
    }

    /// Applies the changes requested during a pass, in module order:
    /// renames, then variant splits, then dependency replacements, then new
    /// dependencies.
    pub(crate) fn apply_changes(
        &mut self,
        config: &Config,
        changes: Vec<(VariantId, PendingChanges)>,
    ) -> Vec<Diagnostic> {
        let mut diags = vec![];
        let mut splits = vec![];
        let mut replaces = vec![];
        let mut requests = vec![];
        for (id, change) in changes {
            if let Some(new_name) = change.rename {
                if let Err(d) = self.rename(id, &new_name) {
                    diags.push(d);
                }
            }
            if let Some((axis, created)) = change.variations {
                splits.push((id, axis, created));
            }
            if !change.replace_deps.is_empty() {
                replaces.push((id, change.replace_deps));
            }
            if !change.deps.is_empty() {
                requests.push((id, change.deps));
            }
        }

        let mut split_into: HashMap<VariantId, Vec<VariantId>> = HashMap::new();
        let mut split_axis: HashMap<VariantId, ArcStr> = HashMap::new();
        for (id, axis, created) in splits {
            let new_ids = self.split(id, &axis, created);
            split_into.insert(id, new_ids);
            split_axis.insert(id, axis);
        }
        if !split_into.is_empty() {
            self.retarget_split_edges(&split_into, &split_axis);
        }

        for (id, names) in replaces {
            for name in names {
                for source in split_into.get(&id).cloned().unwrap_or_else(|| vec![id]) {
                    self.replace_dependencies(source, &name);
                }
            }
        }

        for (id, reqs) in requests {
            let sources = split_into.get(&id).cloned().unwrap_or_else(|| vec![id]);
            for source in sources {
                for req in &reqs {
                    self.add_requested_deps(config, source, req, &mut diags);
                }
            }
        }
        diags
    }

    fn rename(&mut self, id: VariantId, new_name: &str) -> Result<(), Diagnostic> {
        let group_id = self.nodes[id].group;
        let old = self.groups[group_id].name.clone();
        if old.as_str() == new_name {
            return Ok(());
        }
        let new_name = ArcStr::from(new_name);
        if self.by_name.contains_key(&new_name) {
            return Err(Diagnostic {
                module: Some(self.module_ref(id)),
                property: None,
                kind: DiagnosticKind::Module,
                message: format!(
                    "renaming module {:?} to {:?} conflicts with existing module",
                    old.as_str(),
                    new_name.as_str()
                ),
            });
        }
        debug!("renaming {old} to {new_name}");
        self.by_name.remove(&old);
        self.by_name.insert(new_name.clone(), group_id);
        self.groups[group_id].name = new_name.clone();
        for v in self.groups[group_id].variants.clone() {
            self.nodes[v].module.get_mut().base_mut().common.name = new_name.to_string();
        }
        Ok(())
    }

    /// Replaces `id` with one variant per created module. Each keeps the
    /// edges and the providers of the replaced variant.
    fn split(&mut self, id: VariantId, axis: &str, created: Vec<CreatedVariant>) -> Vec<VariantId> {
        let Some(old) = self.nodes.remove(id) else {
            return vec![];
        };
        let new_ids: Vec<VariantId> = created
            .into_iter()
            .map(|c| {
                self.nodes.insert(VariantNode {
                    group: old.group,
                    variant: old.variant.with(axis, &c.name),
                    module: RwLock::new(c.module),
                    deps: old.deps.clone(),
                    providers: old.providers.clone(),
                })
            })
            .collect();
        let group = &mut self.groups[old.group];
        if let Some(pos) = group.variants.iter().position(|v| *v == id) {
            group.variants.splice(pos..=pos, new_ids.iter().copied());
        }
        if let Some(pos) = self.order.iter().position(|v| *v == id) {
            self.order.splice(pos..=pos, new_ids.iter().copied());
        }
        new_ids
    }

    /// Points edges that targeted a split variant at the new variant whose
    /// value for the split axis equals the dependent's value, or at the first
    /// new variant when none does.
    fn retarget_split_edges(
        &mut self,
        split_into: &HashMap<VariantId, Vec<VariantId>>,
        split_axis: &HashMap<VariantId, ArcStr>,
    ) {
        let mut updates = vec![];
        for id in &self.order {
            let node = &self.nodes[*id];
            for (i, edge) in node.deps.iter().enumerate() {
                let Some(new_ids) = split_into.get(&edge.target) else {
                    continue;
                };
                let Some(first) = new_ids.first().copied() else {
                    continue;
                };
                let axis = split_axis.get(&edge.target).map_or("", |a| a.as_str());
                let wanted = node.variant.get(axis);
                let chosen = new_ids
                    .iter()
                    .copied()
                    .find(|n| self.nodes[*n].variant.get(axis) == wanted)
                    .unwrap_or(first);
                updates.push((*id, i, chosen));
            }
        }
        for (id, i, chosen) in updates {
            self.nodes[id].deps[i].target = chosen;
        }
    }

    /// Makes every dependency on the variant of `name` matching `replacement`
    /// point at `replacement` instead.
    fn replace_dependencies(&mut self, replacement: VariantId, name: &str) {
        let Some(group) = self.by_name.get(name).copied() else {
            return;
        };
        let wanted = self.nodes[replacement].variant.clone();
        let Some(source) = self.groups[group]
            .variants
            .iter()
            .copied()
            .find(|v| self.nodes[*v].variant.matches(&wanted))
        else {
            return;
        };
        for id in self.order.clone() {
            if id == replacement || id == source {
                continue;
            }
            for edge in &mut self.nodes[id].deps {
                if edge.target == source && !edge.tag.is::<PrebuiltDepTag>() {
                    edge.target = replacement;
                }
            }
        }
    }

    fn add_requested_deps(
        &mut self,
        config: &Config,
        source: VariantId,
        req: &DepRequest,
        diags: &mut Vec<Diagnostic>,
    ) {
        let requested = if req.far {
            Variant::from_variations(&req.variations)
        } else {
            self.nodes[source].variant.with_variations(&req.variations)
        };
        let mut missing = vec![];
        for name in &req.names {
            match self.resolve(source, name, &requested) {
                Ok(target) => self.nodes[source].deps.push(DepEdge {
                    target,
                    tag: req.tag.clone(),
                }),
                Err(ResolveError::Undefined(_)) if config.allow_missing_dependencies() => {
                    missing.push(name.clone());
                }
                Err(e) => {
                    let kind = match e {
                        ResolveError::Undefined(_) => DiagnosticKind::UnresolvedReference,
                        ResolveError::MissingVariant { .. } => DiagnosticKind::Module,
                    };
                    diags.push(Diagnostic {
                        module: Some(self.module_ref(source)),
                        property: None,
                        kind,
                        message: e.to_string(),
                    });
                }
            }
        }
        if !missing.is_empty() {
            self.nodes[source]
                .module
                .get_mut()
                .base_mut()
                .add_missing_deps(missing);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use expect_test::expect;
    use soongutil::config::ProductVariables;
    use test_log::test;

    use super::*;
    use crate::{deptag::DefaultsDepTag, modules::filegroup::FileGroup, provider::ProviderKey};

    struct Marker(&'static str);

    static MARKER: ProviderKey<Marker> = ProviderKey::new("Marker");

    fn config() -> Config {
        Config::for_test(ProductVariables::default(), &[] as &[&str])
    }

    fn add(graph: &mut ModuleGraph, name: &str) -> VariantId {
        let bp = RelativePathBuf::from("Android.bp");
        graph.add_module(name, "filegroup", bp, FileGroup::factory()).unwrap()
    }

    fn depends_on(to: &str) -> PendingChanges {
        PendingChanges {
            deps: vec![DepRequest {
                tag: DepTag::new(DefaultsDepTag),
                names: vec![to.to_string()],
                variations: vec![],
                far: false,
            }],
            ..Default::default()
        }
    }

    fn split_into(values: &[&str]) -> PendingChanges {
        let created = values
            .iter()
            .map(|v| CreatedVariant {
                name: v.to_string(),
                module: FileGroup::factory(),
            })
            .collect();
        PendingChanges {
            variations: Some((ArcStr::from("color"), created)),
            ..Default::default()
        }
    }

    fn label(graph: &ModuleGraph, id: VariantId) -> String {
        let subdir = graph.node(id).variant().subdir();
        let name = graph.group_of(id).name();
        if subdir.is_empty() {
            name.to_string()
        } else {
            format!("{name}({subdir})")
        }
    }

    fn describe(graph: &ModuleGraph) -> String {
        graph
            .variants()
            .iter()
            .map(|id| {
                let deps: Vec<String> =
                    graph.node(*id).deps().iter().map(|d| label(graph, d.target)).collect();
                format!("{} -> [{}]", label(graph, *id), deps.join(", "))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn level_names(graph: &ModuleGraph, deps_first: bool) -> Vec<Vec<String>> {
        graph
            .levels(deps_first)
            .unwrap()
            .iter()
            .map(|level| level.iter().map(|id| label(graph, *id)).collect())
            .collect()
    }

    #[test]
    fn levels_follow_the_visit_direction() {
        let mut graph = ModuleGraph::new();
        let a = add(&mut graph, "a");
        let b = add(&mut graph, "b");
        add(&mut graph, "c");
        add(&mut graph, "d");
        let changes = vec![(a, depends_on("b")), (b, depends_on("c"))];
        assert!(graph.apply_changes(&config(), changes).is_empty());

        assert_eq!(level_names(&graph, true), vec![vec!["c", "d"], vec!["b"], vec!["a"]]);
        assert_eq!(level_names(&graph, false), vec![vec!["a", "d"], vec!["b"], vec!["c"]]);
    }

    #[test]
    fn cycles_are_reported_as_closed_paths() {
        let mut graph = ModuleGraph::new();
        let a = add(&mut graph, "a");
        let b = add(&mut graph, "b");
        add(&mut graph, "c");
        graph.apply_changes(&config(), vec![(a, depends_on("b")), (b, depends_on("a"))]);

        let cycle = graph.levels(true).unwrap_err();
        expect!["dependency cycle: a -> b -> a"].assert_eq(&graph.cycle_message(&cycle));
        assert_eq!(graph.levels(false).unwrap_err(), cycle);
    }

    #[test]
    fn undefined_dependencies_are_unresolved_references() {
        let mut graph = ModuleGraph::new();
        let a = add(&mut graph, "a");
        let diags = graph.apply_changes(&config(), vec![(a, depends_on("missing"))]);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::UnresolvedReference);
        expect![[r#"depends on undefined module "missing""#]].assert_eq(&diags[0].message);
    }

    #[test]
    fn splits_retarget_edges_by_matching_value() {
        let mut graph = ModuleGraph::new();
        let a = add(&mut graph, "a");
        let b = add(&mut graph, "b");
        let c = add(&mut graph, "c");
        add(&mut graph, "d");
        graph.apply_changes(
            &config(),
            vec![(a, depends_on("b")), (b, depends_on("c")), (c, depends_on("d"))],
        );

        let diags = graph.apply_changes(
            &config(),
            vec![(b, split_into(&["red", "blue"])), (c, split_into(&["red", "blue"]))],
        );
        assert!(diags.is_empty());
        assert!(!graph.contains(b));
        assert!(!graph.contains(c));
        expect![[r#"
            a -> [b(red)]
            b(red) -> [c(red)]
            b(blue) -> [c(blue)]
            c(red) -> [d]
            c(blue) -> [d]
            d -> []"#]]
        .assert_eq(&describe(&graph));
        assert_eq!(
            graph.group_by_name("b").unwrap().variants().len(),
            2,
            "the group holds only the new variants"
        );
    }

    #[test]
    fn splits_copy_providers_into_every_variant() {
        let mut graph = ModuleGraph::new();
        let a = add(&mut graph, "a");
        graph.node(a).providers.set(&MARKER, Marker("a"), "a");

        graph.apply_changes(&config(), vec![(a, split_into(&["red", "blue"]))]);

        for subdir in ["red", "blue"] {
            let id = graph.find_variant("a", subdir).unwrap();
            let marker = graph.node(id).providers.get(&MARKER).unwrap();
            assert_eq!(marker.0, "a");
        }
    }

    #[test]
    fn qualified_names_match_the_declaring_directory() {
        let mut graph = ModuleGraph::new();
        let bp = RelativePathBuf::from("top/Android.bp");
        graph.add_module("lib", "filegroup", bp, FileGroup::factory()).unwrap();
        add(&mut graph, "root");

        assert!(graph.group_by_name("//top:lib").is_some());
        assert!(graph.group_by_name("//other:lib").is_none());
        assert!(graph.group_by_name("//:root").is_some());
        assert!(graph.group_by_name("//top:root").is_none());
    }
}
