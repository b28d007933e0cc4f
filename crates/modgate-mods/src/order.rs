//! Load-order resolution.
//!
//! Mods form a graph: an edge `a -> b` means `a` must load before `b`.
//!
//! - `dependencies`: hard edge, the dependency must be installed
//! - `loadAfter`: soft edge, only if the named mod is installed
//! - `loadBefore`: soft edge the other way, same rule
//!
//! The order is a topological sort (Kahn). Among mods that are ready at
//! the same time, the lowest `load_order_rank` goes first, so with no
//! constraints the result is discovery order.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use tracing::info;

use crate::{LoaderError, ModDescriptor};

/// Orders `mods` so every mod comes after everything it must load after.
///
/// # Errors
///
/// - [`LoaderError::MissingDependency`] for a hard dependency that is not installed
/// - [`LoaderError::Incompatible`] when two installed mods exclude each other
/// - [`LoaderError::DependencyCycle`] with the members of one cycle
pub fn resolve_load_order(mods: Vec<ModDescriptor>) -> Result<Vec<ModDescriptor>, LoaderError> {
    let index: HashMap<&str, usize> = mods
        .iter()
        .enumerate()
        .map(|(i, m)| (m.name(), i))
        .collect();

    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); mods.len()];
    let mut indegree = vec![0usize; mods.len()];
    let mut add_edge = |from: usize, to: usize| {
        if !successors[from].contains(&to) {
            successors[from].push(to);
            indegree[to] += 1;
        }
    };

    for (i, m) in mods.iter().enumerate() {
        let manifest = &m.manifest;
        for other in &manifest.incompatibilities {
            if index.contains_key(other.as_str()) {
                return Err(LoaderError::Incompatible {
                    mod_name: m.name().to_string(),
                    other: other.clone(),
                });
            }
        }
        for dep in &manifest.dependencies {
            let Some(&d) = index.get(dep.as_str()) else {
                return Err(LoaderError::MissingDependency {
                    mod_name: m.name().to_string(),
                    dependency: dep.clone(),
                });
            };
            add_edge(d, i);
        }
        for after in &manifest.load_after {
            if let Some(&a) = index.get(after.as_str()) {
                add_edge(a, i);
            }
        }
        for before in &manifest.load_before {
            if let Some(&b) = index.get(before.as_str()) {
                add_edge(i, b);
            }
        }
    }

    let mut ready: BinaryHeap<Reverse<(usize, usize)>> = indegree
        .iter()
        .enumerate()
        .filter(|(_, deg)| **deg == 0)
        .map(|(i, _)| Reverse((mods[i].load_order_rank, i)))
        .collect();

    let mut order = Vec::with_capacity(mods.len());
    while let Some(Reverse((_, i))) = ready.pop() {
        order.push(i);
        for &next in &successors[i] {
            indegree[next] -= 1;
            if indegree[next] == 0 {
                ready.push(Reverse((mods[next].load_order_rank, next)));
            }
        }
    }

    if order.len() < mods.len() {
        let members = find_cycle(&successors, &indegree)
            .into_iter()
            .map(|i| mods[i].name().to_string())
            .collect();
        return Err(LoaderError::DependencyCycle { members });
    }

    let mut slots: Vec<Option<ModDescriptor>> = mods.into_iter().map(Some).collect();
    let sorted: Vec<ModDescriptor> = order.into_iter().filter_map(|i| slots[i].take()).collect();

    info!(
        order = ?sorted.iter().map(ModDescriptor::name).collect::<Vec<_>>(),
        "mod load order resolved"
    );
    Ok(sorted)
}

/// Finds one cycle among the nodes Kahn's algorithm could not place.
///
/// Every such node has a remaining predecessor, so walking predecessors
/// must eventually revisit a node; the walk from that node back to
/// itself is the cycle. Returned in load-before order, first member
/// repeated at the end.
fn find_cycle(successors: &[Vec<usize>], indegree: &[usize]) -> Vec<usize> {
    let stuck = |i: usize| indegree[i] > 0;
    let predecessor = |node: usize| {
        (0..successors.len()).find(|&p| stuck(p) && successors[p].contains(&node))
    };

    let Some(start) = (0..indegree.len()).find(|&i| stuck(i)) else {
        return Vec::new();
    };

    let mut path = vec![start];
    let mut node = start;
    loop {
        let Some(prev) = predecessor(node) else {
            return path;
        };
        if let Some(pos) = path.iter().position(|&n| n == prev) {
            let mut cycle: Vec<usize> = path[pos..].to_vec();
            cycle.reverse();
            cycle.push(cycle[0]);
            return cycle;
        }
        path.push(prev);
        node = prev;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ModManifest;

    fn mod_with(name: &str, rank: usize, deps: &[&str]) -> ModDescriptor {
        let mut manifest = ModManifest::new(name, name);
        manifest.dependencies = deps.iter().map(|d| d.to_string()).collect();
        ModDescriptor::new(manifest, name, rank)
    }

    fn names(mods: &[ModDescriptor]) -> Vec<&str> {
        mods.iter().map(ModDescriptor::name).collect()
    }

    #[test]
    fn test_resolve_chain_any_discovery_order_is_a_b_c() {
        let orders: [[(&str, &[&str]); 3]; 3] = [
            [("a", &[]), ("b", &["a"]), ("c", &["b"])],
            [("c", &["b"]), ("b", &["a"]), ("a", &[])],
            [("b", &["a"]), ("c", &["b"]), ("a", &[])],
        ];
        for discovery in orders {
            let mods = discovery
                .iter()
                .enumerate()
                .map(|(rank, (name, deps))| mod_with(name, rank, deps))
                .collect();
            let sorted = resolve_load_order(mods).unwrap();
            assert_eq!(names(&sorted), vec!["a", "b", "c"]);
        }
    }

    #[test]
    fn test_resolve_unconstrained_keeps_rank_order() {
        let mods = vec![mod_with("z", 0, &[]), mod_with("a", 1, &[]), mod_with("m", 2, &[])];
        assert_eq!(names(&resolve_load_order(mods).unwrap()), vec!["z", "a", "m"]);
    }

    #[test]
    fn test_resolve_cycle_is_fatal_with_members() {
        let mods = vec![
            mod_with("a", 0, &["c"]),
            mod_with("b", 1, &["a"]),
            mod_with("c", 2, &["b"]),
            mod_with("free", 3, &[]),
        ];
        let err = resolve_load_order(mods).unwrap_err();
        let LoaderError::DependencyCycle { members } = err else {
            panic!("expected a cycle, got {err}");
        };
        assert_eq!(members.len(), 4);
        assert_eq!(members.first(), members.last());
        for name in ["a", "b", "c"] {
            assert!(members.iter().any(|m| m == name));
        }
        assert!(!members.iter().any(|m| m == "free"));
    }

    #[test]
    fn test_resolve_missing_dependency_is_fatal() {
        let err = resolve_load_order(vec![mod_with("b", 0, &["a"])]).unwrap_err();
        assert!(matches!(
            err,
            LoaderError::MissingDependency { ref mod_name, ref dependency } if mod_name == "b" && dependency == "a"
        ));
    }

    #[test]
    fn test_resolve_soft_edges_apply_only_when_present() {
        let mut first = ModManifest::new("first", "first");
        first.load_after = vec!["second".to_string(), "ghost".to_string()];
        let mut third = ModManifest::new("third", "third");
        third.load_before = vec!["second".to_string()];

        let mods = vec![
            ModDescriptor::new(first, "first", 0),
            ModDescriptor::new(ModManifest::new("second", "second"), "second", 1),
            ModDescriptor::new(third, "third", 2),
        ];
        assert_eq!(
            names(&resolve_load_order(mods).unwrap()),
            vec!["third", "second", "first"]
        );
    }

    #[test]
    fn test_resolve_incompatible_installed_is_fatal() {
        let mut a = ModManifest::new("a", "a");
        a.incompatibilities = vec!["b".to_string(), "not-installed".to_string()];
        let mods = vec![
            ModDescriptor::new(a, "a", 0),
            ModDescriptor::new(ModManifest::new("b", "b"), "b", 1),
        ];
        assert!(matches!(
            resolve_load_order(mods).unwrap_err(),
            LoaderError::Incompatible { ref other, .. } if other == "b"
        ));
    }
}
