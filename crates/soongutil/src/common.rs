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

//! Small helpers over string lists used all over the build.

use std::collections::{BTreeSet, HashSet};

/// Directory holding ownership metadata below `out/soong`.
pub const OWNERSHIP_DIR: &str = "ownership";

/// Name of the file that declares modules in a directory.
pub const BLUEPRINT_FILE: &str = "Android.bp";

/// Removes duplicates, keeping the first occurrence of each item.
pub fn first_unique<T, I>(items: I) -> Vec<T>
where
    I: IntoIterator<Item = T>,
    T: Clone + Eq + std::hash::Hash,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|i| seen.insert(i.clone()))
        .collect()
}

/// Sorts and removes duplicates.
pub fn sorted_unique<T, I>(items: I) -> Vec<T>
where
    I: IntoIterator<Item = T>,
    T: Ord,
{
    items.into_iter().collect::<BTreeSet<_>>().into_iter().collect()
}

pub fn in_list<S: AsRef<str>>(needle: &str, list: &[S]) -> bool {
    list.iter().any(|s| s.as_ref() == needle)
}

/// Removes every item of `remove` from `list`, preserving order.
pub fn remove_list_from_list(list: &[String], remove: &[String]) -> Vec<String> {
    list.iter()
        .filter(|s| !in_list(s, remove))
        .cloned()
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn uniqueness() {
        assert_eq!(first_unique(["b", "a", "b", "c", "a"]), vec!["b", "a", "c"]);
        assert_eq!(sorted_unique(["b", "a", "b", "c"]), vec!["a", "b", "c"]);
        assert!(in_list("a", &["x", "a"]));
        assert_eq!(
            remove_list_from_list(&["a".into(), "b".into()], &["a".into()]),
            vec!["b".to_string()]
        );
    }
}
