use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode<T> {
    #[serde(flatten)]
    pub data: T,
    pub children: Vec<TreeNode<T>>,
}

// Breadth-first walk over `children_fn`. The start node is never part of the
// result, and the visited set keeps a corrupted parent graph from looping.
pub fn collect_descendants<T, F, E>(root: T, mut children_fn: F) -> Result<HashSet<T>, E>
where
    T: Copy + Eq + Hash,
    F: FnMut(T) -> Result<Vec<T>, E>,
{
    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([root]);

    while let Some(current) = queue.pop_front() {
        for child in children_fn(current)? {
            if child != root && seen.insert(child) {
                queue.push_back(child);
            }
        }
    }

    Ok(seen)
}

// Follows parent pointers upward, nearest ancestor first. Stops at a root or
// as soon as a pointer revisits a node.
pub fn collect_ancestors<T, F, E>(start: T, mut parent_fn: F) -> Result<Vec<T>, E>
where
    T: Copy + Eq + Hash,
    F: FnMut(T) -> Result<Option<T>, E>,
{
    let mut seen = HashSet::from([start]);
    let mut chain = Vec::new();
    let mut current = parent_fn(start)?;

    while let Some(pid) = current {
        if !seen.insert(pid) {
            break;
        }
        chain.push(pid);
        current = parent_fn(pid)?;
    }

    Ok(chain)
}

/// Builds a forest from `(id, parent_id, data)` triples. Sibling order follows
/// the input order. Items whose parent is not among the items are left out,
/// together with their subtrees.
pub fn build_generic_tree<T>(items: Vec<(i32, Option<i32>, T)>) -> Vec<TreeNode<T>> {
    let known: HashSet<i32> = items.iter().map(|(item_id, _, _)| *item_id).collect();

    let mut parent_to_children: HashMap<i32, Vec<i32>> = HashMap::new();
    let mut roots = Vec::new();
    let mut data: HashMap<i32, T> = HashMap::with_capacity(items.len());

    for (item_id, parent_id, item) in items {
        match parent_id {
            None => roots.push(item_id),
            Some(pid) if known.contains(&pid) => {
                parent_to_children.entry(pid).or_default().push(item_id)
            }
            Some(_) => {}
        }
        data.insert(item_id, item);
    }

    fn build_subtree<T>(
        item_id: i32,
        data: &mut HashMap<i32, T>,
        parent_to_children: &HashMap<i32, Vec<i32>>,
    ) -> Option<TreeNode<T>> {
        let item = data.remove(&item_id)?;
        let children = parent_to_children
            .get(&item_id)
            .map(|children| {
                children
                    .iter()
                    .filter_map(|child_id| build_subtree(*child_id, data, parent_to_children))
                    .collect()
            })
            .unwrap_or_default();

        Some(TreeNode {
            data: item,
            children,
        })
    }

    roots
        .into_iter()
        .filter_map(|root_id| build_subtree(root_id, &mut data, &parent_to_children))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn children_of(edges: &[(i32, i32)]) -> impl FnMut(i32) -> Result<Vec<i32>, Infallible> + '_ {
        move |parent| {
            Ok(edges
                .iter()
                .filter(|(_, p)| *p == parent)
                .map(|(child, _)| *child)
                .collect())
        }
    }

    #[test]
    fn test_collect_descendants() {
        // (child, parent)
        let edges = [(2, 1), (3, 2), (4, 2), (5, 1), (6, 9)];

        let found = collect_descendants(1, children_of(&edges)).unwrap();
        assert_eq!(found, HashSet::from([2, 3, 4, 5]));

        let leaf = collect_descendants(3, children_of(&edges)).unwrap();
        assert!(leaf.is_empty());
    }

    #[test]
    fn test_collect_descendants_terminates_on_cycle() {
        let edges = [(2, 1), (3, 2), (1, 3)];

        let found = collect_descendants(1, children_of(&edges)).unwrap();
        assert_eq!(found, HashSet::from([2, 3]));
    }

    #[test]
    fn test_collect_ancestors() {
        let parents: HashMap<i32, i32> = HashMap::from([(3, 2), (2, 1)]);
        let chain = collect_ancestors(3, |id| Ok::<_, Infallible>(parents.get(&id).copied())).unwrap();
        assert_eq!(chain, vec![2, 1]);

        let looping: HashMap<i32, i32> = HashMap::from([(1, 2), (2, 1)]);
        let chain = collect_ancestors(1, |id| Ok::<_, Infallible>(looping.get(&id).copied())).unwrap();
        assert_eq!(chain, vec![2]);
    }

    #[test]
    fn test_build_generic_tree() {
        let items = vec![
            (1, None, "a"),
            (2, Some(1), "b"),
            (3, Some(2), "c"),
            (4, None, "d"),
            (5, Some(99), "orphan"),
        ];

        let tree = build_generic_tree(items);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].data, "a");
        assert_eq!(tree[0].children[0].data, "b");
        assert_eq!(tree[0].children[0].children[0].data, "c");
        assert_eq!(tree[1].data, "d");
        assert!(tree[1].children.is_empty());
    }
}
