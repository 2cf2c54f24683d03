//! Layout solver: split/leaf tree to absolute dot rectangles.
//!
//! Node ids are path strings: the root is `r`, its children `r/0` and
//! `r/1`, and so on. Leaves, dividers, and gutter bands are recorded in
//! depth-first order, first child before second.

use std::collections::BTreeMap;

use crate::error::LayoutError;
use crate::model::{Direction, LeafNode, Node, PaddingMm, Rect, SplitNode};
use crate::units::dots;

/// A visible divider rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DividerLayout {
    /// Filled rule area.
    pub rect: Rect,
    /// Rule thickness in dots.
    pub thickness: i32,
}

/// A gutter band between two split children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GutterLayout {
    /// Band area.
    pub rect: Rect,
    /// Direction of the split that produced it.
    pub direction: Direction,
}

/// A solved leaf.
#[derive(Debug, Clone)]
pub struct LeafLayout<'t> {
    /// Path id.
    pub node_id: String,
    /// The leaf node.
    pub node: &'t LeafNode,
    /// Full leaf area.
    pub rect: Rect,
    /// `rect` inset by the leaf's padding.
    pub content_rect: Rect,
}

/// Output of [`compute_layout`].
#[derive(Debug, Default)]
pub struct LayoutResult<'t> {
    /// Rect for every node id.
    pub node_rects: BTreeMap<String, Rect>,
    /// Leaves in document order.
    pub leaves: Vec<LeafLayout<'t>>,
    /// Visible dividers in document order.
    pub dividers: Vec<DividerLayout>,
    /// Gutter bands (gutter > 0) in document order.
    pub gutters: Vec<GutterLayout>,
    /// Alias to node id.
    pub alias_to_id: BTreeMap<String, String>,
}

impl LayoutResult<'_> {
    /// Rect of the node carrying `alias`.
    pub fn rect_for_alias(&self, alias: &str) -> Option<Rect> {
        let id = self.alias_to_id.get(alias)?;
        self.node_rects.get(id).copied()
    }
}

/// Solve `root` inside a `width_dots` x `height_dots` label.
///
/// Leaves without their own padding use `default_padding`.
pub fn compute_layout(
    root: &Node,
    width_dots: i32,
    height_dots: i32,
    dpi: u32,
    default_padding: PaddingMm,
) -> Result<LayoutResult<'_>, LayoutError> {
    let mut walker = Walker {
        dpi,
        default_padding,
        out: LayoutResult::default(),
    };
    walker.walk(root, "r".to_string(), Rect::new(0, 0, width_dots, height_dots))?;
    Ok(walker.out)
}

struct Walker<'t> {
    dpi: u32,
    default_padding: PaddingMm,
    out: LayoutResult<'t>,
}

impl<'t> Walker<'t> {
    fn to_dots(&self, mm: f64, node_id: &str) -> Result<i32, LayoutError> {
        dots(mm, self.dpi).map_err(|source| LayoutError::Units {
            node_id: node_id.to_string(),
            source,
        })
    }

    fn walk(&mut self, node: &'t Node, node_id: String, rect: Rect) -> Result<(), LayoutError> {
        self.out.node_rects.insert(node_id.clone(), rect);
        if let Some(alias) = node.alias() {
            self.out.alias_to_id.insert(alias.to_string(), node_id.clone());
        }
        match node {
            Node::Leaf(leaf) => self.leaf(leaf, node_id, rect),
            Node::Split(split) => self.split(split, node_id, rect),
        }
    }

    fn leaf(&mut self, leaf: &'t LeafNode, node_id: String, rect: Rect) -> Result<(), LayoutError> {
        let pad = leaf.padding_mm.unwrap_or(self.default_padding);
        let content_rect = rect.inset(
            self.to_dots(pad.left, &node_id)?,
            self.to_dots(pad.top, &node_id)?,
            self.to_dots(pad.right, &node_id)?,
            self.to_dots(pad.bottom, &node_id)?,
        );
        self.out.leaves.push(LeafLayout {
            node_id,
            node: leaf,
            rect,
            content_rect,
        });
        Ok(())
    }

    fn split(&mut self, split: &'t SplitNode, node_id: String, rect: Rect) -> Result<(), LayoutError> {
        if rect.w < 0 || rect.h < 0 {
            return Err(LayoutError::NegativeRect { node_id });
        }
        let gutter = self.to_dots(split.gutter_mm, &node_id)?;
        let length = match split.direction {
            Direction::V => rect.w,
            Direction::H => rect.h,
        };
        let available = length - gutter;
        if available < 0 {
            return Err(LayoutError::GutterTooLarge { node_id });
        }
        // Truncation toward zero, then clamp.
        let first = ((f64::from(available) * split.ratio) as i32).clamp(0, available);
        let second = available - first;

        let (child0, child1, band) = match split.direction {
            Direction::V => (
                Rect::new(rect.x, rect.y, first, rect.h),
                Rect::new(rect.x + first + gutter, rect.y, second, rect.h),
                Rect::new(rect.x + first, rect.y, gutter, rect.h),
            ),
            Direction::H => (
                Rect::new(rect.x, rect.y, rect.w, first),
                Rect::new(rect.x, rect.y + first + gutter, rect.w, second),
                Rect::new(rect.x, rect.y + first, rect.w, gutter),
            ),
        };

        if gutter > 0 {
            self.out.gutters.push(GutterLayout {
                rect: band,
                direction: split.direction,
            });
        }
        if split.divider.visible {
            let thickness = self.to_dots(split.divider.thickness_mm, &node_id)?;
            // Centered in the band, floor-biased.
            let offset = (gutter - thickness).div_euclid(2);
            let rule = match split.direction {
                Direction::V => Rect::new(band.x + offset, rect.y, thickness, rect.h),
                Direction::H => Rect::new(rect.x, band.y + offset, rect.w, thickness),
            };
            self.out.dividers.push(DividerLayout {
                rect: rule,
                thickness,
            });
        }

        let [first_child, second_child] = &*split.children;
        self.walk(first_child, format!("{node_id}/0"), child0)?;
        self.walk(second_child, format!("{node_id}/1"), child1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(v: serde_json::Value) -> Node {
        serde_json::from_value(v).unwrap()
    }

    fn leaf() -> serde_json::Value {
        json!({"kind": "leaf", "elements": []})
    }

    #[test]
    fn single_leaf_is_inset_by_default_padding() {
        let root = node(leaf());
        let out = compute_layout(&root, 100, 50, 203, PaddingMm::uniform(1.0)).unwrap();
        assert_eq!(out.leaves.len(), 1);
        assert_eq!(out.leaves[0].node_id, "r");
        assert_eq!(out.leaves[0].rect, Rect::new(0, 0, 100, 50));
        assert_eq!(out.leaves[0].content_rect, Rect::new(8, 8, 84, 34));
    }

    #[test]
    fn vertical_split_conserves_width() {
        let root = node(json!({
            "kind": "split", "direction": "v", "ratio": 0.33, "gutter_mm": 2,
            "children": [leaf(), leaf()]
        }));
        let out = compute_layout(&root, 591, 208, 203, PaddingMm::default()).unwrap();
        let a = out.leaves[0].rect;
        let b = out.leaves[1].rect;
        // 2 mm = 16 dots; available 575; floor(575 * 0.33) = 189
        assert_eq!(a, Rect::new(0, 0, 189, 208));
        assert_eq!(b, Rect::new(205, 0, 386, 208));
        assert_eq!(a.w + 16 + b.w, 591);
        assert_eq!(out.gutters.len(), 1);
        assert_eq!(out.gutters[0].rect, Rect::new(189, 0, 16, 208));
        assert!(out.dividers.is_empty());
    }

    #[test]
    fn horizontal_split_with_visible_divider() {
        let root = node(json!({
            "kind": "split", "direction": "h", "ratio": 0.5, "gutter_mm": 1,
            "divider": {"visible": true, "thickness_mm": 0.3},
            "children": [leaf(), leaf()]
        }));
        let out = compute_layout(&root, 100, 100, 203, PaddingMm::default()).unwrap();
        // gutter 8 dots, thickness 2 dots: centered at offset 3
        assert_eq!(out.leaves[0].rect, Rect::new(0, 0, 100, 46));
        assert_eq!(out.leaves[1].rect, Rect::new(0, 54, 100, 46));
        assert_eq!(out.dividers[0].rect, Rect::new(0, 49, 100, 2));
        assert_eq!(out.dividers[0].thickness, 2);
    }

    #[test]
    fn node_ids_and_aliases_follow_paths() {
        let root = node(json!({
            "kind": "split", "direction": "v", "ratio": 0.5, "alias": "top",
            "children": [
                {"kind": "leaf", "alias": "left", "elements": []},
                {"kind": "split", "direction": "h", "ratio": 0.5, "children": [
                    leaf(),
                    {"kind": "leaf", "alias": "corner", "elements": []}
                ]}
            ]
        }));
        let out = compute_layout(&root, 200, 100, 203, PaddingMm::default()).unwrap();
        let ids: Vec<_> = out.leaves.iter().map(|l| l.node_id.as_str()).collect();
        assert_eq!(ids, ["r/0", "r/1/0", "r/1/1"]);
        assert_eq!(out.alias_to_id["corner"], "r/1/1");
        assert_eq!(out.rect_for_alias("corner"), Some(Rect::new(100, 50, 100, 50)));
        assert_eq!(out.rect_for_alias("top"), Some(Rect::new(0, 0, 200, 100)));
        assert_eq!(out.node_rects.len(), 5);
    }

    #[test]
    fn gutter_wider_than_node_fails() {
        let root = node(json!({
            "kind": "split", "direction": "v", "ratio": 0.5, "gutter_mm": 20,
            "children": [leaf(), leaf()]
        }));
        let err = compute_layout(&root, 100, 100, 203, PaddingMm::default()).unwrap_err();
        assert_eq!(err, LayoutError::GutterTooLarge { node_id: "r".into() });
    }

    #[test]
    fn leaf_padding_overrides_default() {
        let root = node(json!({"kind": "leaf", "padding_mm": [0, 0, 0, 2], "elements": []}));
        let out = compute_layout(&root, 100, 100, 203, PaddingMm::uniform(1.0)).unwrap();
        assert_eq!(out.leaves[0].content_rect, Rect::new(16, 0, 84, 100));
    }
}
