//! Quad tree over blocks and interactives
//!
//! Entries are partitioned by the center point of their bounding rectangle;
//! every node also remembers the union of its entries' rectangles so range
//! queries can prune whole subtrees. The tree stores indices into the
//! backing slice and must be rebuilt when that slice gains or loses entries
//! or an entry moves.

use super::coord::{Pixel, Rect};
use crate::consts::QUAD_TREE_NODE_ENTRY_COUNT;

/// Something with a bounding rectangle the tree can index
pub trait Spatial {
    fn bounds(&self) -> Rect;
}

#[derive(Debug, Clone, Default)]
pub struct QuadTree {
    root: Option<QuadTreeNode>,
    len: usize,
}

#[derive(Debug, Clone)]
struct QuadTreeNode {
    /// Region of center points this node partitions
    region: Rect,
    /// Union of the rectangles stored below this node
    bounds: Rect,
    entries: Vec<usize>,
    children: Option<Box<[QuadTreeNode; 4]>>,
}

impl QuadTreeNode {
    fn new(region: Rect) -> Self {
        Self {
            region,
            bounds: Rect::new(i16::MAX, i16::MAX, i16::MIN, i16::MIN),
            entries: Vec::new(),
            children: None,
        }
    }

    fn insert(&mut self, index: usize, rects: &[Rect]) {
        let rect = rects[index];
        self.bounds = self.bounds.union(&rect);

        if let Some(children) = self.children.as_mut() {
            let center = rect.center();
            if let Some(child) = children.iter_mut().find(|c| c.region.contains_pixel(center)) {
                child.insert(index, rects);
                return;
            }
            self.entries.push(index);
            return;
        }

        let single_point = self.region.left >= self.region.right && self.region.bottom >= self.region.top;
        if self.entries.len() < QUAD_TREE_NODE_ENTRY_COUNT || single_point {
            self.entries.push(index);
            return;
        }

        self.subdivide(rects);
        self.insert_into_children(index, rects);
    }

    fn insert_into_children(&mut self, index: usize, rects: &[Rect]) {
        let center = rects[index].center();
        match self.children.as_mut() {
            Some(children) => match children.iter_mut().find(|c| c.region.contains_pixel(center)) {
                Some(child) => child.insert(index, rects),
                None => self.entries.push(index),
            },
            None => self.entries.push(index),
        }
    }

    fn subdivide(&mut self, rects: &[Rect]) {
        let r = self.region;
        let half_w = (r.right - r.left) / 2;
        let half_h = (r.top - r.bottom) / 2;
        let mid_x = r.left + half_w;
        let mid_y = r.bottom + half_h;

        self.children = Some(Box::new([
            QuadTreeNode::new(Rect::new(r.left, r.bottom, mid_x, mid_y)),
            QuadTreeNode::new(Rect::new(mid_x + 1, r.bottom, r.right, mid_y)),
            QuadTreeNode::new(Rect::new(r.left, mid_y + 1, mid_x, r.top)),
            QuadTreeNode::new(Rect::new(mid_x + 1, mid_y + 1, r.right, r.top)),
        ]));

        let existing = std::mem::take(&mut self.entries);
        for index in existing {
            self.insert_into_children(index, rects);
        }
    }
}

impl QuadTree {
    /// Build a tree over every item in the slice
    pub fn build<T: Spatial>(items: &[T]) -> Self {
        let rects: Vec<Rect> = items.iter().map(Spatial::bounds).collect();
        let Some(first) = rects.first() else {
            return Self::default();
        };

        let first_center = first.center();
        let region = rects.iter().fold(point_rect(first_center), |region, rect| {
            region.union(&point_rect(rect.center()))
        });

        let mut root = QuadTreeNode::new(region);
        for index in 0..rects.len() {
            root.insert(index, &rects);
        }

        Self { root: Some(root), len: rects.len() }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// First entry whose rectangle contains the point
    pub fn find_at<T: Spatial>(&self, items: &[T], x: i16, y: i16) -> Option<usize> {
        let mut stack: Vec<&QuadTreeNode> = self.root.iter().collect();
        while let Some(node) = stack.pop() {
            if !node.bounds.contains(x, y) {
                continue;
            }
            for &index in &node.entries {
                if items.get(index).is_some_and(|item| item.bounds().contains(x, y)) {
                    return Some(index);
                }
            }
            if let Some(children) = node.children.as_ref() {
                stack.extend(children.iter());
            }
        }
        None
    }

    /// Every entry whose rectangle overlaps `rect`, in no particular order
    pub fn find_in<T: Spatial>(&self, items: &[T], rect: &Rect) -> Vec<usize> {
        let mut found = Vec::new();
        let mut stack: Vec<&QuadTreeNode> = self.root.iter().collect();
        while let Some(node) = stack.pop() {
            if !node.bounds.overlaps(rect) {
                continue;
            }
            found.extend(
                node.entries
                    .iter()
                    .copied()
                    .filter(|&i| items.get(i).is_some_and(|item| item.bounds().overlaps(rect))),
            );
            if let Some(children) = node.children.as_ref() {
                stack.extend(children.iter());
            }
        }
        found
    }
}

fn point_rect(p: Pixel) -> Rect {
    Rect::new(p.x, p.y, p.x, p.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    struct Boxy(Rect);

    impl Spatial for Boxy {
        fn bounds(&self) -> Rect {
            self.0
        }
    }

    fn tile(x: i16, y: i16) -> Boxy {
        Boxy(Rect::new(x * 16, y * 16, x * 16 + 15, y * 16 + 15))
    }

    #[test]
    fn test_empty_tree() {
        let items: Vec<Boxy> = Vec::new();
        let tree = QuadTree::build(&items);
        assert!(tree.is_empty());
        assert_eq!(tree.find_at(&items, 0, 0), None);
        assert!(tree.find_in(&items, &Rect::new(-100, -100, 100, 100)).is_empty());
    }

    #[test]
    fn test_find_at_after_subdivide() {
        let items: Vec<Boxy> = (0..10).map(|i| tile(i, i % 3)).collect();
        let tree = QuadTree::build(&items);
        assert_eq!(tree.len(), 10);
        assert_eq!(tree.find_at(&items, 7 * 16 + 3, 16 + 3), Some(7));
        assert_eq!(tree.find_at(&items, 7 * 16 + 3, 3), None);
    }

    #[test]
    fn test_stacked_entries_share_a_point() {
        let items: Vec<Boxy> = (0..9).map(|_| tile(2, 2)).collect();
        let tree = QuadTree::build(&items);
        let mut found = tree.find_in(&items, &Rect::new(32, 32, 32, 32));
        found.sort();
        assert_eq!(found, (0..9).collect::<Vec<_>>());
    }

    proptest! {
        #[test]
        fn test_find_in_matches_linear_scan(
            rects in prop::collection::vec((-200i16..200, -200i16..200, 0i16..40, 0i16..40), 0..60),
            query in (-250i16..250, -250i16..250, 0i16..120, 0i16..120),
        ) {
            let items: Vec<Boxy> = rects
                .iter()
                .map(|&(x, y, w, h)| Boxy(Rect::new(x, y, x + w, y + h)))
                .collect();
            let query = Rect::new(query.0, query.1, query.0 + query.2, query.1 + query.3);
            let tree = QuadTree::build(&items);

            let mut found = tree.find_in(&items, &query);
            found.sort();
            let expected: Vec<usize> = items
                .iter()
                .enumerate()
                .filter(|(_, item)| item.0.overlaps(&query))
                .map(|(i, _)| i)
                .collect();
            prop_assert_eq!(found, expected);
        }
    }
}
