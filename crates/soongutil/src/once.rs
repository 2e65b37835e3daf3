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

//! Keyed, lazily computed values shared across a whole build.
//!
//! [`OncePer`] is the one general purpose concurrency-safe map in the build.
//! A value for a key is computed at most once while callers for the same key
//! wait on that key's cell; callers for other keys are not blocked.
//!
//! If the compute function panics, the cell stays empty and the next caller
//! recomputes. Nothing is poisoned.

use std::{
    any::{Any, TypeId, type_name},
    collections::HashMap,
    fmt,
    hash::{Hash, Hasher},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

static NEXT_IDENTITY: AtomicU64 = AtomicU64::new(0);

type Slot = Arc<OnceCell<Arc<dyn Any + Send + Sync>>>;

/// Key into a [`OncePer`].
///
/// Identity keys ([`OnceKey::new`]) are unique per call even when built from
/// the same name. Custom keys ([`OnceKey::custom`]) compare by value.
#[derive(Clone)]
pub struct OnceKey {
    repr: KeyRepr,
}

#[derive(Clone)]
enum KeyRepr {
    Identity { id: u64, name: &'static str },
    Custom(Arc<dyn CustomKey>),
}

trait CustomKey: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn key_eq(&self, other: &dyn CustomKey) -> bool;
    fn key_hash(&self, state: &mut dyn Hasher);
    fn describe(&self) -> String;
}

impl<T> CustomKey for T
where
    T: Eq + Hash + fmt::Debug + Send + Sync + 'static,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn key_eq(&self, other: &dyn CustomKey) -> bool {
        other.as_any().downcast_ref::<T>() == Some(self)
    }

    fn key_hash(&self, mut state: &mut dyn Hasher) {
        TypeId::of::<T>().hash(&mut state);
        self.hash(&mut state);
    }

    fn describe(&self) -> String {
        format!("{self:?}")
    }
}

impl OnceKey {
    /// Creates a key that is equal only to itself and its clones.
    pub fn new(name: &'static str) -> Self {
        OnceKey {
            repr: KeyRepr::Identity {
                id: NEXT_IDENTITY.fetch_add(1, Ordering::Relaxed),
                name,
            },
        }
    }

    /// Creates a key that is equal to every other custom key built from an
    /// equal value of the same type.
    pub fn custom<T>(value: T) -> Self
    where
        T: Eq + Hash + fmt::Debug + Send + Sync + 'static,
    {
        OnceKey {
            repr: KeyRepr::Custom(Arc::new(value)),
        }
    }
}

impl PartialEq for OnceKey {
    fn eq(&self, other: &Self) -> bool {
        match (&self.repr, &other.repr) {
            (KeyRepr::Identity { id: a, .. }, KeyRepr::Identity { id: b, .. }) => a == b,
            (KeyRepr::Custom(a), KeyRepr::Custom(b)) => a.key_eq(b.as_ref()),
            _ => false,
        }
    }
}

impl Eq for OnceKey {}

impl Hash for OnceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.repr {
            KeyRepr::Identity { id, .. } => {
                0u8.hash(state);
                id.hash(state);
            }
            KeyRepr::Custom(k) => {
                1u8.hash(state);
                k.key_hash(state);
            }
        }
    }
}

impl fmt::Debug for OnceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            KeyRepr::Identity { id, name } => write!(f, "OnceKey({name}#{id})"),
            KeyRepr::Custom(k) => write!(f, "OnceKey({})", k.describe()),
        }
    }
}

/// A map of lazily computed values.
#[derive(Default)]
pub struct OncePer {
    values: Mutex<HashMap<OnceKey, Slot>>,
}

impl OncePer {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &OnceKey) -> Slot {
        // The map lock is only held for the lookup, never across `f`.
        let mut values = self.values.lock();
        Arc::clone(values.entry(key.clone()).or_default())
    }

    /// Returns the value for `key`, computing it with `f` if this is the
    /// first call for the key.
    ///
    /// # Panics
    ///
    /// Panics if the key already holds a value of a different type.
    pub fn once<T, F>(&self, key: &OnceKey, f: F) -> Arc<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        let slot = self.slot(key);
        let value = slot.get_or_init(|| Arc::new(f()) as Arc<dyn Any + Send + Sync>);
        downcast(key, Arc::clone(value))
    }

    /// Like [`OncePer::once`], for compute functions that may fail. Errors
    /// are returned to the caller and nothing is cached.
    pub fn try_once<T, E, F>(&self, key: &OnceKey, f: F) -> Result<Arc<T>, E>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Result<T, E>,
    {
        let slot = self.slot(key);
        let value =
            slot.get_or_try_init(|| f().map(|v| Arc::new(v) as Arc<dyn Any + Send + Sync>))?;
        Ok(downcast(key, Arc::clone(value)))
    }

    /// Returns the value previously computed for `key`.
    ///
    /// # Panics
    ///
    /// Panics if [`OncePer::once`] was never called for `key`. Reading a key
    /// before it is populated is a bug in the caller.
    pub fn get<T>(&self, key: &OnceKey) -> Arc<T>
    where
        T: Send + Sync + 'static,
    {
        match self.peek(key) {
            Some(v) => v,
            None => panic!("Once() was never called for {key:?}"),
        }
    }

    /// Returns the value for `key` if it has been computed.
    pub fn peek<T>(&self, key: &OnceKey) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let slot = self.values.lock().get(key).cloned()?;
        slot.get().map(|v| downcast(key, Arc::clone(v)))
    }
}

fn downcast<T: Send + Sync + 'static>(key: &OnceKey, value: Arc<dyn Any + Send + Sync>) -> Arc<T> {
    match value.downcast::<T>() {
        Ok(v) => v,
        Err(_) => panic!(
            "{key:?} holds a value of another type than {}",
            type_name::<T>()
        ),
    }
}
