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

//! Immutable transitive sets that share structure with the sets they were
//! built from, flattened on demand.

use std::{collections::HashSet, fmt, hash::Hash, sync::Arc};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DepSetOrder {
    /// Direct items before transitive ones, each set visited once.
    Preorder,
    /// Transitive items before direct ones.
    Postorder,
    /// Every item before the items it was built on top of.
    Topological,
}

struct Node<T> {
    order: DepSetOrder,
    direct: Vec<T>,
    transitive: Vec<DepSet<T>>,
}

/// A cheaply cloneable handle to a transitive set.
pub struct DepSet<T> {
    node: Arc<Node<T>>,
}

impl<T> Clone for DepSet<T> {
    fn clone(&self) -> Self {
        DepSet {
            node: Arc::clone(&self.node),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for DepSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DepSet")
            .field("order", &self.node.order)
            .field("direct", &self.node.direct)
            .field("transitive", &self.node.transitive.len())
            .finish()
    }
}

impl<T: Clone + Eq + Hash> DepSet<T> {
    /// # Panics
    ///
    /// Panics if a transitive set was built with a different order.
    pub fn new(order: DepSetOrder, direct: Vec<T>, transitive: Vec<DepSet<T>>) -> Self {
        for t in &transitive {
            if t.node.order != order {
                panic!(
                    "incompatible order, new DepSet is {:?} but transitive DepSet is {:?}",
                    order, t.node.order
                );
            }
        }
        let (direct, transitive) = if order == DepSetOrder::Topological {
            (
                direct.into_iter().rev().collect(),
                transitive.into_iter().rev().collect(),
            )
        } else {
            (direct, transitive)
        };
        DepSet {
            node: Arc::new(Node {
                order,
                direct,
                transitive,
            }),
        }
    }

    pub fn builder(order: DepSetOrder) -> DepSetBuilder<T> {
        DepSetBuilder {
            order,
            direct: vec![],
            transitive: vec![],
        }
    }

    pub fn order(&self) -> DepSetOrder {
        self.node.order
    }

    fn walk(&self, visit: &mut impl FnMut(&[T])) {
        fn dfs<T>(
            set: &DepSet<T>,
            visited: &mut HashSet<*const Node<T>>,
            visit: &mut impl FnMut(&[T]),
        ) {
            visited.insert(Arc::as_ptr(&set.node));
            let preorder = set.node.order == DepSetOrder::Preorder;
            if preorder {
                visit(&set.node.direct);
            }
            for dep in &set.node.transitive {
                if !visited.contains(&Arc::as_ptr(&dep.node)) {
                    dfs(dep, visited, visit);
                }
            }
            if !preorder {
                visit(&set.node.direct);
            }
        }
        let mut visited = HashSet::new();
        dfs(self, &mut visited, visit);
    }

    /// Flattens the set, keeping the first occurrence of every item.
    pub fn to_list(&self) -> Vec<T> {
        let mut seen = HashSet::new();
        let mut list = vec![];
        self.walk(&mut |items| {
            for item in items {
                if seen.insert(item.clone()) {
                    list.push(item.clone());
                }
            }
        });
        if self.node.order == DepSetOrder::Topological {
            list.reverse();
        }
        list
    }
}

pub struct DepSetBuilder<T> {
    order: DepSetOrder,
    direct: Vec<T>,
    transitive: Vec<DepSet<T>>,
}

impl<T: Clone + Eq + Hash> DepSetBuilder<T> {
    pub fn direct(mut self, item: T) -> Self {
        self.direct.push(item);
        self
    }

    pub fn direct_slice(mut self, items: impl IntoIterator<Item = T>) -> Self {
        self.direct.extend(items);
        self
    }

    pub fn transitive(mut self, set: DepSet<T>) -> Self {
        self.transitive.push(set);
        self
    }

    pub fn build(self) -> DepSet<T> {
        DepSet::new(self.order, self.direct, self.transitive)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    fn leaf(order: DepSetOrder, items: &[&'static str]) -> DepSet<&'static str> {
        DepSet::new(order, items.to_vec(), vec![])
    }

    #[test]
    fn preorder_direct_first() {
        let c = leaf(DepSetOrder::Preorder, &["c"]);
        let b = DepSet::new(DepSetOrder::Preorder, vec!["b"], vec![c.clone()]);
        let a = DepSet::new(DepSetOrder::Preorder, vec!["a"], vec![b, c]);
        assert_eq!(a.to_list(), vec!["a", "b", "c"]);
    }

    #[test]
    fn postorder_transitive_first() {
        let c = leaf(DepSetOrder::Postorder, &["c"]);
        let b = DepSet::new(DepSetOrder::Postorder, vec!["b"], vec![c.clone()]);
        let a = DepSet::new(DepSetOrder::Postorder, vec!["a"], vec![b, c]);
        assert_eq!(a.to_list(), vec!["c", "b", "a"]);
    }

    #[test]
    fn topological_puts_dependents_first() {
        // a depends on b and c, b depends on c.
        let c = leaf(DepSetOrder::Topological, &["c"]);
        let b = DepSet::new(DepSetOrder::Topological, vec!["b"], vec![c.clone()]);
        let a = DepSet::new(DepSetOrder::Topological, vec!["a"], vec![b, c]);
        assert_eq!(a.to_list(), vec!["a", "b", "c"]);
    }

    #[test]
    fn duplicates_are_dropped() {
        let x = leaf(DepSetOrder::Preorder, &["x", "y"]);
        let set = DepSet::builder(DepSetOrder::Preorder)
            .direct("y")
            .transitive(x.clone())
            .transitive(x)
            .build();
        assert_eq!(set.to_list(), vec!["y", "x"]);
    }

    #[test]
    #[should_panic(expected = "incompatible order")]
    fn mixed_orders_panic() {
        let x = leaf(DepSetOrder::Postorder, &["x"]);
        DepSet::new(DepSetOrder::Preorder, vec!["y"], vec![x]);
    }
}
