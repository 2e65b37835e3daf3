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

//! Identifiers and small value types of the module graph.

use std::fmt;

use arcstr::ArcStr;
use smallvec::SmallVec;

slotmap::new_key_type! {
    /// A single variant of a module, i.e. one node of the module graph.
    pub struct VariantId;

    /// A module group: all variants created from one module definition.
    pub struct GroupId;
}

/// The fixed phases of the mutator pipeline, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    PreArch,
    Arch,
    PreDeps,
    Deps,
    PostDeps,
    Final,
}

impl Phase {
    pub const ALL: [Phase; 6] = [
        Phase::PreArch,
        Phase::Arch,
        Phase::PreDeps,
        Phase::Deps,
        Phase::PostDeps,
        Phase::Final,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Phase::PreArch => "pre_arch",
            Phase::Arch => "arch",
            Phase::PreDeps => "pre_deps",
            Phase::Deps => "deps",
            Phase::PostDeps => "post_deps",
            Phase::Final => "final",
        }
    }

    /// The variant set is frozen while dependencies are resolved and checked.
    pub fn allows_variations(self) -> bool {
        !matches!(self, Phase::Deps | Phase::PostDeps)
    }

    /// Mutators may publish providers once every module has its arch
    /// variants. Later splits copy providers into the new variants.
    pub fn allows_provider_writes(self) -> bool {
        self >= Phase::PreDeps
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One requested `(axis, value)` pair, used when adding dependencies with
/// explicit variations.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Variation {
    pub axis: ArcStr,
    pub value: ArcStr,
}

impl Variation {
    pub fn new(axis: impl Into<ArcStr>, value: impl Into<ArcStr>) -> Self {
        Variation {
            axis: axis.into(),
            value: value.into(),
        }
    }
}

/// The ordered variation values of a module variant. Axes appear in the
/// order their mutators created them.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Variant {
    axes: SmallVec<[(ArcStr, ArcStr); 4]>,
}

impl Variant {
    pub fn new() -> Self {
        Self::default()
    }

    /// The value for `axis`, or `""` when the variant does not carry it.
    pub fn get(&self, axis: &str) -> &str {
        self.axes
            .iter()
            .find(|(a, _)| a.as_str() == axis)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }

    pub fn has_axis(&self, axis: &str) -> bool {
        self.axes.iter().any(|(a, _)| a.as_str() == axis)
    }

    /// Returns a copy with `axis` set to `value`, replacing an existing value
    /// in place or appending a new axis.
    pub fn with(&self, axis: &str, value: &str) -> Variant {
        let mut res = self.clone();
        match res.axes.iter_mut().find(|(a, _)| a.as_str() == axis) {
            Some((_, v)) => *v = ArcStr::from(value),
            None => res.axes.push((ArcStr::from(axis), ArcStr::from(value))),
        }
        res
    }

    pub fn with_variations(&self, variations: &[Variation]) -> Variant {
        variations
            .iter()
            .fold(self.clone(), |acc, v| acc.with(&v.axis, &v.value))
    }

    pub fn from_variations(variations: &[Variation]) -> Variant {
        Variant::new().with_variations(variations)
    }

    pub fn axes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.axes.iter().map(|(a, v)| (a.as_str(), v.as_str()))
    }

    /// Joins the non-empty values with `_`, e.g. `android_arm64_recovery`.
    pub fn subdir(&self) -> String {
        let values: Vec<&str> = self
            .axes
            .iter()
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
            .collect();
        values.join("_")
    }

    /// Whether this variant satisfies a request: every axis this variant
    /// carries must equal the requested value for that axis.
    pub fn matches(&self, requested: &Variant) -> bool {
        self.axes.iter().all(|(a, v)| requested.get(a.as_str()) == v.as_str())
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.axes.iter().map(|(a, v)| format!("{a}:{v}")).collect();
        f.write_str(&parts.join(","))
    }
}

impl fmt::Debug for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Variant({self})")
    }
}
