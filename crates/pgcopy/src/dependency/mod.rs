//! Table dependency forest.
//!
//! Every table becomes a node exactly once. A table is attached below the
//! first table found to depend on it (through a foreign key or a check
//! constraint), so a post-order walk yields parents before the tables that
//! reference them. Both construction and traversal use explicit stacks;
//! chain depth is bounded only by memory.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, warn};

use crate::core::CatalogReader;
use crate::error::Result;

#[derive(Debug, Clone)]
struct Node {
    name: String,
    children: Vec<usize>,
}

/// Arena of table nodes with one root per requested table not already placed.
#[derive(Debug, Clone, Default)]
pub struct DependencyForest {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    roots: Vec<usize>,
}

struct Frame {
    node: usize,
    dependencies: Vec<String>,
    next: usize,
}

impl DependencyForest {
    /// Build the forest for `tables`, following dependencies through `catalog`.
    ///
    /// Tables are visited depth-first in the given order. A dependency that
    /// was already placed anywhere in the forest is not added again.
    pub async fn build(catalog: &dyn CatalogReader, tables: &[String]) -> Result<Self> {
        let mut forest = Self::default();

        for table in tables {
            if forest.index.contains_key(table) {
                continue;
            }
            let root = forest.add_node(table);
            forest.roots.push(root);

            let mut stack = vec![Frame {
                node: root,
                dependencies: dependencies_of(catalog, table).await?,
                next: 0,
            }];

            while let Some(frame) = stack.last_mut() {
                let Some(dependency) = frame.dependencies.get(frame.next).cloned() else {
                    stack.pop();
                    continue;
                };
                frame.next += 1;
                let parent = frame.node;

                if forest.index.contains_key(&dependency) {
                    continue;
                }
                let child = forest.add_node(&dependency);
                forest.nodes[parent].children.push(child);
                debug!("{} depends on {}", forest.nodes[parent].name, dependency);

                let dependencies = dependencies_of(catalog, &dependency).await?;
                stack.push(Frame {
                    node: child,
                    dependencies,
                    next: 0,
                });
            }
        }

        Ok(forest)
    }

    fn add_node(&mut self, name: &str) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node {
            name: name.to_string(),
            children: Vec::new(),
        });
        self.index.insert(name.to_string(), id);
        id
    }

    /// Table names in post-order: every table after all of its children.
    pub fn post_order(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(usize, usize)> = Vec::new();

        for &root in &self.roots {
            stack.push((root, 0));
            while let Some((node, next)) = stack.last_mut() {
                let node = *node;
                if let Some(&child) = self.nodes[node].children.get(*next) {
                    *next += 1;
                    stack.push((child, 0));
                } else {
                    out.push(self.nodes[node].name.clone());
                    stack.pop();
                }
            }
        }
        out
    }

    pub fn contains(&self, table: &str) -> bool {
        self.index.contains_key(table)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Foreign-key targets and check dependencies of `table`, without itself.
async fn dependencies_of(catalog: &dyn CatalogReader, table: &str) -> Result<Vec<String>> {
    let mut set: BTreeSet<String> = catalog.foreign_key_targets(table).await?.into_iter().collect();
    set.extend(catalog.check_dependencies(table).await?);
    if set.remove(table) {
        warn!("self referencing table: {}", table);
    }
    Ok(set.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DataKind;
    use crate::testing::MemoryDatabase;

    fn db(names: &[&str]) -> MemoryDatabase {
        names.iter().fold(MemoryDatabase::new("mem"), |db, n| {
            db.table(n, &[("id", DataKind::Int)], &["id"])
        })
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_independent_tables_keep_input_order() {
        let db = db(&["A", "B", "C"]);
        let forest = DependencyForest::build(&db, &names(&["A", "B", "C"])).await.unwrap();
        assert_eq!(forest.post_order(), names(&["A", "B", "C"]));
    }

    #[tokio::test]
    async fn test_foreign_key_and_check_chain() {
        let db = db(&["A", "B", "C"])
            .foreign_key("B", "A")
            .foreign_key("C", "B")
            .check_ref("C", "A");
        let forest = DependencyForest::build(&db, &names(&["A", "B", "C"])).await.unwrap();
        assert_eq!(forest.post_order(), names(&["A", "B", "C"]));
        assert_eq!(forest.len(), 3);
    }

    #[tokio::test]
    async fn test_check_dependency_is_followed() {
        // A has a check depending on C, which references B.
        let db = db(&["A", "B", "C"])
            .foreign_key("C", "B")
            .check_ref("A", "C");
        let forest = DependencyForest::build(&db, &names(&["A", "B", "C"])).await.unwrap();
        assert_eq!(forest.post_order(), names(&["B", "C", "A"]));
    }

    #[tokio::test]
    async fn test_referencing_table_listed_first_comes_after_parent() {
        let db = db(&["orders", "customers"]).foreign_key("orders", "customers");
        let forest = DependencyForest::build(&db, &names(&["orders", "customers"]))
            .await
            .unwrap();
        assert_eq!(forest.post_order(), names(&["customers", "orders"]));
    }

    #[tokio::test]
    async fn test_self_reference_is_dropped() {
        let db = db(&["tree"]).foreign_key("tree", "tree");
        let forest = DependencyForest::build(&db, &names(&["tree"])).await.unwrap();
        assert_eq!(forest.post_order(), names(&["tree"]));
    }

    #[tokio::test]
    async fn test_each_table_appears_once() {
        // Diamond: D depends on B and C, both depend on A.
        let db = db(&["A", "B", "C", "D"])
            .foreign_key("D", "B")
            .foreign_key("D", "C")
            .foreign_key("B", "A")
            .foreign_key("C", "A");
        let forest = DependencyForest::build(&db, &names(&["D", "A", "B", "C"]))
            .await
            .unwrap();
        let order = forest.post_order();
        assert_eq!(order, names(&["A", "B", "C", "D"]));
        assert!(forest.contains("A"));
        assert!(!forest.contains("E"));
    }

    #[tokio::test]
    async fn test_cycle_terminates() {
        let db = db(&["A", "B"]).foreign_key("A", "B").foreign_key("B", "A");
        let forest = DependencyForest::build(&db, &names(&["A", "B"])).await.unwrap();
        assert_eq!(forest.post_order(), names(&["B", "A"]));
    }

    #[tokio::test]
    async fn test_deep_chain_does_not_recurse() {
        let count = 5000;
        let tables: Vec<String> = (0..count).map(|i| format!("t{}", i)).collect();
        let mut db = MemoryDatabase::new("mem");
        for t in &tables {
            db = db.table(t, &[("id", DataKind::Int)], &["id"]);
        }
        for i in 0..count - 1 {
            db = db.foreign_key(&tables[i], &tables[i + 1]);
        }
        let forest = DependencyForest::build(&db, &tables[..1]).await.unwrap();
        let order = forest.post_order();
        assert_eq!(order.len(), count);
        assert_eq!(order.first(), tables.last());
        assert_eq!(order.last(), tables.first());
    }
}
