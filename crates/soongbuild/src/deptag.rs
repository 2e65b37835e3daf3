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

//! Dependency tags: comparable values annotating edges of the module graph.
//!
//! A tag is any `Eq + Hash` type implementing [`DependencyTag`]. Two
//! [`DepTag`]s compare equal when they hold the same concrete type and the
//! values are equal, so a tag type that cannot be compared is rejected at
//! compile time.

use std::{
    any::{Any, TypeId},
    fmt,
    hash::{Hash, Hasher},
    ops::Deref,
    sync::Arc,
};

/// Object-safe equality and hashing, implemented for every tag type.
pub trait TagEq: Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;
    fn tag_eq(&self, other: &dyn Any) -> bool;
    fn tag_hash(&self, state: &mut dyn Hasher);
}

impl<T> TagEq for T
where
    T: DependencyTag + Eq + Hash,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn tag_eq(&self, other: &dyn Any) -> bool {
        other.downcast_ref::<T>() == Some(self)
    }

    fn tag_hash(&self, mut state: &mut dyn Hasher) {
        TypeId::of::<T>().hash(&mut state);
        self.hash(&mut state);
    }
}

/// Capabilities of an edge. Every capability defaults to off.
pub trait DependencyTag: TagEq + fmt::Debug {
    /// Direct dependencies with this tag are copied into packages.
    fn is_packaging_item(&self) -> bool {
        false
    }

    /// The dependency must be installed whenever the depending module is.
    fn install_dep_needed(&self) -> bool {
        false
    }

    /// Like [`DependencyTag::install_dep_needed`], and also forwarded through
    /// modules that are not installed themselves.
    fn install_always_needed(&self) -> bool {
        false
    }

    /// The output tag requested by a `:module{tag}` path reference.
    fn source_or_output_tag(&self) -> Option<&str> {
        None
    }

    fn exclude_from_visibility_enforcement(&self) -> bool {
        false
    }

    fn exclude_from_license_inheritance(&self) -> bool {
        false
    }
}

/// A type-erased, cheaply cloneable dependency tag.
#[derive(Clone)]
pub struct DepTag(Arc<dyn DependencyTag>);

impl DepTag {
    pub fn new<T: DependencyTag + Eq + Hash>(tag: T) -> Self {
        DepTag(Arc::new(tag))
    }

    pub fn is<T: DependencyTag>(&self) -> bool {
        self.0.as_any().is::<T>()
    }

    pub fn downcast_ref<T: DependencyTag>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }
}

impl Deref for DepTag {
    type Target = dyn DependencyTag;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl PartialEq for DepTag {
    fn eq(&self, other: &Self) -> bool {
        self.0.tag_eq(other.0.as_any())
    }
}

impl Eq for DepTag {}

impl Hash for DepTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.tag_hash(state);
    }
}

impl fmt::Debug for DepTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl<T: DependencyTag + Eq + Hash> From<T> for DepTag {
    fn from(tag: T) -> Self {
        DepTag::new(tag)
    }
}

/// Added for every `:module` or `:module{tag}` path reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceOrOutputDepTag {
    pub tag: String,
}

impl DependencyTag for SourceOrOutputDepTag {
    fn source_or_output_tag(&self) -> Option<&str> {
        Some(&self.tag)
    }
}

/// From a module to each license in its applicable licenses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LicensesDepTag;

impl DependencyTag for LicensesDepTag {
    fn exclude_from_license_inheritance(&self) -> bool {
        true
    }
}

/// From a `license` module to its `license_kinds`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LicenseKindDepTag;

impl DependencyTag for LicenseKindDepTag {
    fn exclude_from_license_inheritance(&self) -> bool {
        true
    }
}

/// From a module to the defaults modules it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DefaultsDepTag;

impl DependencyTag for DefaultsDepTag {
    fn exclude_from_license_inheritance(&self) -> bool {
        true
    }
}

/// From a module to the team named by its `team` property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TeamDepTag;

impl DependencyTag for TeamDepTag {
    fn exclude_from_visibility_enforcement(&self) -> bool {
        true
    }

    fn exclude_from_license_inheritance(&self) -> bool {
        true
    }
}

/// From a source module to the prebuilt that may replace it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrebuiltDepTag;

impl DependencyTag for PrebuiltDepTag {
    fn exclude_from_visibility_enforcement(&self) -> bool {
        true
    }

    fn exclude_from_license_inheritance(&self) -> bool {
        true
    }
}

/// Direct dependencies that are always packaged and installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PackagingItemAlwaysDepTag;

impl DependencyTag for PackagingItemAlwaysDepTag {
    fn is_packaging_item(&self) -> bool {
        true
    }

    fn install_dep_needed(&self) -> bool {
        true
    }

    fn install_always_needed(&self) -> bool {
        true
    }
}

/// Dependencies whose installed files follow the depending module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstallNeededDepTag;

impl DependencyTag for InstallNeededDepTag {
    fn install_dep_needed(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use super::*;
    use test_log::test;

    #[test]
    fn equality_follows_concrete_type_and_value() {
        let a = DepTag::new(SourceOrOutputDepTag { tag: "".into() });
        let b = DepTag::new(SourceOrOutputDepTag { tag: "".into() });
        let c = DepTag::new(SourceOrOutputDepTag { tag: ".jar".into() });
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(DepTag::new(LicensesDepTag), DepTag::new(LicenseKindDepTag));

        let set: HashSet<DepTag> = [a, b, c, DepTag::new(LicensesDepTag)].into_iter().collect();
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn capabilities() {
        let t = DepTag::new(SourceOrOutputDepTag { tag: ".out".into() });
        assert_eq!(t.source_or_output_tag(), Some(".out"));
        assert!(!t.is_packaging_item());
        assert!(DepTag::new(PackagingItemAlwaysDepTag).install_always_needed());
        assert!(DepTag::new(LicensesDepTag).exclude_from_license_inheritance());
        assert!(t.is::<SourceOrOutputDepTag>());
        assert_eq!(t.downcast_ref::<SourceOrOutputDepTag>().map(|t| t.tag.as_str()), Some(".out"));
    }
}
