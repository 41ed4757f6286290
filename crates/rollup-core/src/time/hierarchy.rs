use super::{MAX_RESOLUTIONS, Resolution, ResolutionSet};

type Children = heapless::Vec<Resolution, MAX_RESOLUTIONS>;

/// Parent/child tree over a [`ResolutionSet`]
///
/// The root has the gcd step of the set. Every edge `parent -> child` means
/// one child bucket is exactly the union of `child.step / parent.step`
/// consecutive parent buckets. Each resolution hangs below the largest
/// smaller resolution of the set that divides it, or below the root when
/// there is none.
///
/// ```text
/// {5, 15, 60}  =>  5 -> [15], 15 -> [60]
/// {5, 10, 15}  =>  5 -> [10, 15]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hierarchy {
    root: Resolution,
    edges: Vec<(Resolution, Children)>,
}

impl Hierarchy {
    /// Derive the root and the tree for a set of resolutions
    pub fn derive(set: &ResolutionSet) -> Self {
        let root = set.root();
        let mut unassigned: Children = set.iter().copied().filter(|r| *r != root).collect();
        let mut edges = Vec::new();

        // Coarse parents first so each resolution lands under its nearest divisor
        for &parent in set.iter().rev().filter(|r| **r != root) {
            let children: Children = unassigned
                .iter()
                .copied()
                .filter(|candidate| candidate.is_multiple_of(parent))
                .collect();

            if !children.is_empty() {
                unassigned.retain(|r| !children.contains(r));
                edges.push((parent, children));
            }
        }

        edges.push((root, unassigned));
        Self { root, edges }
    }

    pub fn root(&self) -> Resolution {
        self.root
    }

    /// Resolutions directly derived from `parent`; empty for leaves
    pub fn children(&self, parent: Resolution) -> &[Resolution] {
        self.edges
            .iter()
            .find(|(p, _)| *p == parent)
            .map(|(_, children)| children.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn res(step: u32) -> Resolution {
        Resolution::new(step).unwrap()
    }

    fn hierarchy(steps: &[u32]) -> Hierarchy {
        Hierarchy::derive(&ResolutionSet::from_steps(steps).unwrap())
    }

    #[test]
    fn test_chain() {
        let h = hierarchy(&[5, 15, 60]);

        assert_eq!(h.root(), res(5));
        assert_eq!(h.children(res(5)), &[res(15)]);
        assert_eq!(h.children(res(15)), &[res(60)]);
        assert!(h.children(res(60)).is_empty(), "60 should be a leaf");
    }

    #[test]
    fn test_siblings_under_root() {
        let h = hierarchy(&[5, 10, 15]);

        assert_eq!(h.root(), res(5));
        assert_eq!(h.children(res(5)), &[res(10), res(15)]);
        assert!(h.children(res(10)).is_empty());
        assert!(h.children(res(15)).is_empty());
    }

    #[test]
    fn test_nearest_divisor_wins() {
        let h = hierarchy(&[5, 10, 20, 60]);

        assert_eq!(h.children(res(5)), &[res(10)]);
        assert_eq!(h.children(res(10)), &[res(20)]);
        assert_eq!(h.children(res(20)), &[res(60)]);
    }

    #[test]
    fn test_root_outside_set() {
        let h = hierarchy(&[10, 15]);

        assert_eq!(h.root(), res(5));
        assert_eq!(h.children(res(5)), &[res(10), res(15)]);
    }

    #[test]
    fn test_single_resolution() {
        let h = hierarchy(&[15]);

        assert_eq!(h.root(), res(15));
        assert!(h.children(res(15)).is_empty());
    }
}
