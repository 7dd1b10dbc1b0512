//! Centered interval tree for "which sub-parts are active at frame N" queries.

use std::cmp::Ordering;

use log::debug;

use crate::pose::ActivityInterval;

#[derive(Debug, Clone)]
struct Node {
    center: i32,
    /// Indices of intervals containing `center`.
    members: Vec<usize>,
    left: Option<usize>,
    right: Option<usize>,
}

/// Interval tree stored as an arena of nodes.
///
/// Each node splits at the median of its intervals' endpoints. Intervals
/// containing the split point stay at the node, the rest go to the child on
/// their side.
#[derive(Debug, Clone, Default)]
pub struct IntervalTree {
    intervals: Vec<ActivityInterval>,
    nodes: Vec<Node>,
    root: Option<usize>,
}

impl IntervalTree {
    /// Build a tree over `intervals`. Empty and inverted intervals are discarded.
    pub fn build(intervals: Vec<ActivityInterval>) -> Self {
        let before = intervals.len();
        let intervals: Vec<ActivityInterval> =
            intervals.into_iter().filter(|i| !i.is_empty()).collect();
        if intervals.len() != before {
            debug!("Discarded {} empty intervals", before - intervals.len());
        }

        let mut tree = Self {
            intervals,
            nodes: Vec::new(),
            root: None,
        };
        let all: Vec<usize> = (0..tree.intervals.len()).collect();
        tree.root = tree.build_node(all);
        tree
    }

    fn build_node(&mut self, indices: Vec<usize>) -> Option<usize> {
        if indices.is_empty() {
            return None;
        }

        let mut endpoints: Vec<i32> = indices
            .iter()
            .flat_map(|&i| [self.intervals[i].start_frame, self.intervals[i].end_frame])
            .collect();
        endpoints.sort_unstable();
        let center = endpoints[endpoints.len() / 2];

        let mut left = Vec::new();
        let mut right = Vec::new();
        let mut members = Vec::new();
        for i in indices {
            let interval = &self.intervals[i];
            if interval.end_frame < center {
                left.push(i);
            } else if interval.start_frame > center {
                right.push(i);
            } else {
                members.push(i);
            }
        }

        let slot = self.nodes.len();
        self.nodes.push(Node {
            center,
            members,
            left: None,
            right: None,
        });
        let left = self.build_node(left);
        let right = self.build_node(right);
        self.nodes[slot].left = left;
        self.nodes[slot].right = right;
        Some(slot)
    }

    /// All intervals with `start_frame <= frame < end_frame`.
    pub fn query(&self, frame: i32) -> Vec<&ActivityInterval> {
        let mut found = Vec::new();
        let mut cursor = self.root;
        while let Some(idx) = cursor {
            let node = &self.nodes[idx];
            found.extend(
                node.members
                    .iter()
                    .map(|&i| &self.intervals[i])
                    .filter(|interval| interval.contains(frame)),
            );
            cursor = match frame.cmp(&node.center) {
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
                Ordering::Equal => None,
            };
        }
        found
    }

    pub fn intervals(&self) -> &[ActivityInterval] {
        &self.intervals
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Depth of the deepest node; 0 for an empty tree.
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: Option<usize>) -> usize {
            match idx {
                Some(i) => 1 + walk(nodes, nodes[i].left).max(walk(nodes, nodes[i].right)),
                None => 0,
            }
        }
        walk(&self.nodes, self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{SubPartKind, SubPartMeta};
    use rand::Rng;

    fn interval(name: &str, start: i32, end: i32) -> ActivityInterval {
        ActivityInterval::new(SubPartMeta::new(name, SubPartKind::StaticMesh), start, end)
    }

    fn names(tree: &IntervalTree, frame: i32) -> Vec<String> {
        let mut names: Vec<String> =
            tree.query(frame).iter().map(|i| i.name().to_string()).collect();
        names.sort();
        names
    }

    #[test]
    fn test_half_open_bounds() {
        let tree = IntervalTree::build(vec![interval("sword", 5, 12)]);
        assert!(names(&tree, 4).is_empty());
        for frame in 5..12 {
            assert_eq!(names(&tree, frame), vec!["sword"]);
        }
        assert!(names(&tree, 12).is_empty());
    }

    #[test]
    fn test_overlapping() {
        let tree = IntervalTree::build(vec![
            interval("body", 0, 100),
            interval("hat", 10, 20),
            interval("cape", 15, 40),
            interval("shield", 50, 60),
        ]);
        assert_eq!(names(&tree, 0), vec!["body"]);
        assert_eq!(names(&tree, 17), vec!["body", "cape", "hat"]);
        assert_eq!(names(&tree, 20), vec!["body", "cape"]);
        assert_eq!(names(&tree, 55), vec!["body", "shield"]);
        assert!(names(&tree, 100).is_empty());
    }

    #[test]
    fn test_degenerate_intervals_dropped() {
        let tree = IntervalTree::build(vec![interval("empty", 3, 3), interval("inverted", 9, 2)]);
        assert!(tree.is_empty());
        assert!(tree.query(3).is_empty());
        assert_eq!(tree.depth(), 0);
    }

    #[test]
    fn test_matches_linear_scan() {
        let mut rng = rand::thread_rng();
        let intervals: Vec<ActivityInterval> = (0..200)
            .map(|i| {
                let start = rng.gen_range(0..500);
                let len = rng.gen_range(1..80);
                interval(&format!("p{i}"), start, start + len)
            })
            .collect();
        let tree = IntervalTree::build(intervals.clone());
        assert!(tree.depth() < 40);

        for frame in -1..600 {
            let mut expected: Vec<String> = intervals
                .iter()
                .filter(|i| i.contains(frame))
                .map(|i| i.name().to_string())
                .collect();
            expected.sort();
            assert_eq!(names(&tree, frame), expected, "frame {frame}");
        }
    }
}
