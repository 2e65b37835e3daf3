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

//! Typed, write-once values attached to module variants.
//!
//! A provider is identified by its datatype: there is exactly one
//! [`ProviderKey`] per type, conventionally declared as a `pub static`. A
//! variant can hold one value per provider. Writing a provider twice is a bug
//! in the module type and panics; reading a provider that was never written
//! returns `None`.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    marker::PhantomData,
    sync::Arc,
};

use parking_lot::RwLock;

pub struct ProviderKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ProviderKey<T> {
    pub const fn new(name: &'static str) -> Self {
        ProviderKey {
            name,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> fmt::Debug for ProviderKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProviderKey({})", self.name)
    }
}

/// The providers of one variant.
#[derive(Default)]
pub struct ProviderStore {
    values: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl ProviderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Panics
    ///
    /// Panics if the provider was already set for this variant.
    pub fn set<T: Send + Sync + 'static>(&self, key: &ProviderKey<T>, value: T, module: &str) {
        let mut values = self.values.write();
        if values.contains_key(&TypeId::of::<T>()) {
            panic!("provider {} set twice for module {module:?}", key.name);
        }
        values.insert(TypeId::of::<T>(), Arc::new(value));
    }

    pub fn get<T: Send + Sync + 'static>(&self, _key: &ProviderKey<T>) -> Option<Arc<T>> {
        let value = self.values.read().get(&TypeId::of::<T>()).cloned()?;
        value.downcast::<T>().ok()
    }

    pub fn contains<T: Send + Sync + 'static>(&self, _key: &ProviderKey<T>) -> bool {
        self.values.read().contains_key(&TypeId::of::<T>())
    }
}

/// Copies share the stored values.
impl Clone for ProviderStore {
    fn clone(&self) -> Self {
        ProviderStore {
            values: RwLock::new(self.values.read().clone()),
        }
    }
}

/// Output files of a module, by output tag. The default outputs use the
/// empty tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputFilesInfo {
    pub default: Vec<String>,
    pub tagged: Vec<(String, Vec<String>)>,
}

impl OutputFilesInfo {
    pub fn get(&self, tag: &str) -> Option<&[String]> {
        if tag.is_empty() {
            return Some(&self.default);
        }
        self.tagged
            .iter()
            .find(|(t, _)| t == tag)
            .map(|(_, files)| files.as_slice())
    }
}

pub static OUTPUT_FILES_PROVIDER: ProviderKey<OutputFilesInfo> =
    ProviderKey::new("OutputFilesInfo");
