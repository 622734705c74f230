//! Prefix selection and unmount ordering.

use std::collections::HashMap;
use std::path::Path;

use fly_common::{FlyError, FlyResult};

use super::{MountEntry, MountTable};

/// Whether `path` is `prefix` or lies beneath it, compared by path segment.
///
/// `/foo` is within `/foo` and `/foo/bar`, never `/foobar`.
#[must_use]
pub fn is_within(path: &Path, prefix: &Path) -> bool {
    path.starts_with(prefix)
}

/// Whether `path` lies strictly beneath `ancestor`.
#[must_use]
pub fn is_strict_descendant(path: &Path, ancestor: &Path) -> bool {
    path != ancestor && path.starts_with(ancestor)
}

impl MountTable {
    /// Mounts at or beneath `prefix`, ordered so they can be unmounted one
    /// after another: every mount comes after all of its descendants.
    pub fn mounts_for_prefix(&self, prefix: impl AsRef<Path>) -> Vec<&MountEntry> {
        let prefix = prefix.as_ref();
        let matched: Vec<&MountEntry> = self
            .iter()
            .filter(|m| is_within(&m.mount_point, prefix))
            .collect();

        tracing::debug!(
            prefix = %prefix.display(),
            matched = matched.len(),
            "Selected mounts for prefix"
        );
        unmount_order(matched)
    }

    /// Like [`MountTable::mounts_for_prefix`], but an empty result is an error.
    ///
    /// # Errors
    ///
    /// Returns [`FlyError::Lookup`] if no mount lies beneath `prefix`.
    pub fn require_mounts_for_prefix(
        &self,
        prefix: impl AsRef<Path>,
    ) -> FlyResult<Vec<&MountEntry>> {
        let prefix = prefix.as_ref();
        let mounts = self.mounts_for_prefix(prefix);
        if mounts.is_empty() {
            return Err(FlyError::Lookup {
                what: format!("prefix {}", prefix.display()),
            });
        }
        Ok(mounts)
    }
}

/// Order `entries` children-first.
///
/// The nesting tree comes from `parent_id`, restricted to `entries`. An entry
/// whose parent is not among them hangs off the deepest entry whose mount
/// point is a strict ancestor of its own; failing that it is a root. Roots
/// and siblings keep their input order. Entries caught in a parent cycle are
/// appended afterwards in input order.
///
/// The tree walk is then settled against mount points: no entry is emitted
/// while a strict path descendant of it is still pending, so mounts stacked
/// on an ancestor path wait for everything beneath that path.
#[must_use]
pub fn unmount_order(entries: Vec<&MountEntry>) -> Vec<&MountEntry> {
    let mut by_id: HashMap<u32, usize> = HashMap::with_capacity(entries.len());
    for (idx, entry) in entries.iter().enumerate() {
        by_id.entry(entry.id).or_insert(idx);
    }

    let parents: Vec<Option<usize>> = entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| {
            by_id
                .get(&entry.parent_id)
                .copied()
                .filter(|&p| p != idx && entry.parent_id != entry.id)
                .or_else(|| nearest_path_ancestor(&entries, idx))
        })
        .collect();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); entries.len()];
    let mut roots = Vec::new();
    for (idx, parent) in parents.iter().enumerate() {
        match parent {
            Some(p) => children[*p].push(idx),
            None => roots.push(idx),
        }
    }

    let mut visited = vec![false; entries.len()];
    let mut order = Vec::with_capacity(entries.len());
    for root in roots.into_iter().chain(0..entries.len()) {
        post_order(root, &children, &mut visited, &mut order);
    }

    settle_by_path(&entries, &order)
        .into_iter()
        .map(|idx| entries[idx])
        .collect()
}

/// Stable reorder of `order` so every entry follows its strict path
/// descendants. An order that already satisfies this comes back unchanged.
fn settle_by_path(entries: &[&MountEntry], order: &[usize]) -> Vec<usize> {
    let ancestors: Vec<Vec<usize>> = (0..entries.len())
        .map(|idx| {
            (0..entries.len())
                .filter(|&other| {
                    is_strict_descendant(&entries[idx].mount_point, &entries[other].mount_point)
                })
                .collect()
        })
        .collect();

    let mut pending = vec![0usize; entries.len()];
    for list in &ancestors {
        for &ancestor in list {
            pending[ancestor] += 1;
        }
    }

    let mut emitted = vec![false; entries.len()];
    let mut settled = Vec::with_capacity(order.len());
    while settled.len() < order.len() {
        // The deepest remaining entry always has nothing pending.
        let Some(&next) = order.iter().find(|&&idx| !emitted[idx] && pending[idx] == 0) else {
            break;
        };
        emitted[next] = true;
        for &ancestor in &ancestors[next] {
            pending[ancestor] -= 1;
        }
        settled.push(next);
    }
    settled
}

fn nearest_path_ancestor(entries: &[&MountEntry], idx: usize) -> Option<usize> {
    let path = &entries[idx].mount_point;
    entries
        .iter()
        .enumerate()
        .filter(|(other, entry)| {
            *other != idx && is_strict_descendant(path, &entry.mount_point)
        })
        .max_by_key(|(other, entry)| (entry.mount_point.components().count(), *other))
        .map(|(other, _)| other)
}

fn post_order(
    node: usize,
    children: &[Vec<usize>],
    visited: &mut [bool],
    order: &mut Vec<usize>,
) {
    if visited[node] {
        return;
    }
    visited[node] = true;
    for &child in &children[node] {
        post_order(child, children, visited, order);
    }
    order.push(node);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(mounts: &[&MountEntry]) -> Vec<u32> {
        mounts.iter().map(|m| m.id).collect()
    }

    #[test]
    fn prefix_matches_by_segment() {
        let table: MountTable = "\
10 1 0:1 / /foo rw - tmpfs tmpfs rw
11 1 0:2 / /foobar rw - tmpfs tmpfs rw
12 11 0:3 / /foobar/baz rw - tmpfs tmpfs rw
13 10 0:4 / /foo/bar rw - tmpfs tmpfs rw
"
        .parse()
        .unwrap();

        assert_eq!(ids(&table.mounts_for_prefix("/foo")), vec![13, 10]);
        assert_eq!(ids(&table.mounts_for_prefix("/foo/")), vec![13, 10]);
        assert_eq!(ids(&table.mounts_for_prefix("/foobar")), vec![12, 11]);
    }

    #[test]
    fn missing_prefix_is_lookup_error() {
        let table: MountTable = "10 1 0:1 / /foo rw - tmpfs tmpfs rw".parse().unwrap();
        assert!(table.mounts_for_prefix("/bar").is_empty());
        assert!(matches!(
            table.require_mounts_for_prefix("/bar"),
            Err(FlyError::Lookup { .. })
        ));
    }

    #[test]
    fn children_before_parents_regardless_of_scan_order() {
        let table: MountTable = "\
30 20 0:3 / /a/b/c rw - tmpfs tmpfs rw
10 1 0:1 / /a rw - tmpfs tmpfs rw
20 10 0:2 / /a/b rw - tmpfs tmpfs rw
"
        .parse()
        .unwrap();
        assert_eq!(ids(&table.mounts_for_prefix("/a")), vec![30, 20, 10]);
    }

    #[test]
    fn orphans_attach_to_path_ancestor() {
        let table: MountTable = "\
10 1 0:1 / /a rw - tmpfs tmpfs rw
20 99 0:2 / /a/b rw - tmpfs tmpfs rw
30 20 0:3 / /a/b/c rw - tmpfs tmpfs rw
40 98 0:4 / /z rw - tmpfs tmpfs rw
"
        .parse()
        .unwrap();
        assert_eq!(ids(&table.mounts_for_prefix("/")), vec![30, 20, 10, 40]);
    }

    #[test]
    fn stacked_mounts_unmount_top_first() {
        let table: MountTable = "\
10 1 0:1 / /a rw - tmpfs tmpfs rw
11 10 0:2 / /a rw - tmpfs tmpfs rw
"
        .parse()
        .unwrap();
        assert_eq!(ids(&table.mounts_for_prefix("/a")), vec![11, 10]);
    }

    #[test]
    fn stacked_mount_waits_for_deeper_sibling() {
        let table: MountTable = "\
10 1 0:1 / /a rw - tmpfs tmpfs rw
11 10 0:2 / /a rw - tmpfs tmpfs rw
20 10 0:3 / /a/b rw - tmpfs tmpfs rw
"
        .parse()
        .unwrap();
        assert_eq!(ids(&table.mounts_for_prefix("/a")), vec![20, 11, 10]);
    }

    #[test]
    fn stacked_root_waits_for_deeper_root() {
        let table: MountTable = "\
10 1 0:1 / /a rw - tmpfs tmpfs rw
11 2 0:2 / /a rw - tmpfs tmpfs rw
20 3 0:3 / /a/b/c rw - tmpfs tmpfs rw
"
        .parse()
        .unwrap();
        let order = ids(&table.mounts_for_prefix("/a"));
        assert_eq!(order[0], 20);
        assert_eq!(order.len(), 3);
    }

    #[test]
    fn parent_cycles_do_not_drop_entries() {
        let table: MountTable = "\
10 11 0:1 / /x rw - tmpfs tmpfs rw
11 10 0:2 / /y rw - tmpfs tmpfs rw
"
        .parse()
        .unwrap();
        let order = ids(&table.mounts_for_prefix("/"));
        assert_eq!(order.len(), 2);
        assert!(order.contains(&10) && order.contains(&11));
    }

    #[test]
    fn boundary_helpers() {
        assert!(is_within(Path::new("/foo"), Path::new("/foo")));
        assert!(is_within(Path::new("/foo/bar"), Path::new("/foo")));
        assert!(!is_within(Path::new("/foobar"), Path::new("/foo")));
        assert!(!is_strict_descendant(Path::new("/foo"), Path::new("/foo")));
        assert!(is_strict_descendant(Path::new("/foo/bar"), Path::new("/foo")));
    }
}
