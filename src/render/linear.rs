//! Linear (row/column) layout policy.
//!
//! Children are laid out in order along the main axis, each offered the
//! extent that remains after its earlier siblings. The container resolves
//! to the sum of child main extents (plus gaps) by the largest cross
//! extent.

use crate::canvas::Canvas;
use crate::component::FlexProps;
use crate::render::{NodeOps, RenderId, RenderKind, RenderProps, RenderTree};
use crate::types::{Axis, LayoutParam, Offset, Size};

pub(crate) static OPS: NodeOps = NodeOps {
    layout: perform_layout,
    paint: paint_none,
    hit_self: super::bounds_hit,
};

fn paint_none(_: &RenderTree, _: RenderId, _: Offset, _: &mut dyn Canvas) {}

fn axis_of(tree: &RenderTree, id: RenderId) -> Axis {
    match tree.get(id).and_then(|n| n.kind) {
        Some(RenderKind::Column) => Axis::Vertical,
        _ => Axis::Horizontal,
    }
}

fn perform_layout(tree: &mut RenderTree, id: RenderId, param: LayoutParam) -> Size {
    let axis = axis_of(tree, id);
    let props = match tree.get(id).map(|n| &n.props) {
        Some(RenderProps::Flex(p)) => *p,
        _ => FlexProps::default(),
    };

    let available = axis.main(param.max);
    let cross_max = axis.cross(param.max);

    let mut used = 0.0f32;
    let mut cross = 0.0f32;
    let children = tree.children_of(id);
    let count = children.len();
    for (i, child) in children.into_iter().enumerate() {
        let remaining = if available.is_finite() { (available - used).max(0.0) } else { available };
        tree.layout(child, LayoutParam::loose(axis.pack(remaining, cross_max)));

        let child_size = tree.get(child).map(|n| n.size).unwrap_or(Size::ZERO);
        tree.set_position(child, axis.offset(used, 0.0));
        used += axis.main(child_size);
        if i + 1 < count {
            used += props.gap;
        }
        cross = cross.max(axis.cross(child_size));
    }

    axis.pack(used, cross)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Color;
    use crate::component::BoxProps;
    use crate::types::NodeFlags;

    fn boxed(tree: &mut RenderTree, w: f32, h: f32) -> RenderId {
        tree.insert(
            RenderKind::Box,
            RenderProps::Box(BoxProps { size: Size::new(w, h), color: Color::WHITE }),
            0,
        )
    }

    #[test]
    fn test_row_sums_widths_takes_max_height() {
        let mut tree = RenderTree::new();
        let row = tree.insert(RenderKind::Row, RenderProps::Flex(FlexProps::default()), 0);
        let a = boxed(&mut tree, 30.0, 10.0);
        let b = boxed(&mut tree, 20.0, 40.0);
        tree.add_child(row, a);
        tree.add_child(row, b);

        tree.layout(row, LayoutParam::loose(Size::new(100.0, 100.0)));

        assert_eq!(tree.get(row).unwrap().size, Size::new(50.0, 40.0));
        assert_eq!(tree.get(a).unwrap().position, Offset::ZERO);
        assert_eq!(tree.get(b).unwrap().position, Offset::new(30.0, 0.0));
    }

    #[test]
    fn test_column_stacks_vertically() {
        let mut tree = RenderTree::new();
        let col = tree.insert(RenderKind::Column, RenderProps::Flex(FlexProps::default()), 0);
        let a = boxed(&mut tree, 10.0, 25.0);
        let b = boxed(&mut tree, 40.0, 15.0);
        tree.add_child(col, a);
        tree.add_child(col, b);

        tree.layout(col, LayoutParam::loose(Size::new(100.0, 100.0)));

        assert_eq!(tree.get(col).unwrap().size, Size::new(40.0, 40.0));
        assert_eq!(tree.get(b).unwrap().position, Offset::new(0.0, 25.0));
    }

    #[test]
    fn test_gap_between_children() {
        let mut tree = RenderTree::new();
        let row = tree.insert(RenderKind::Row, RenderProps::Flex(FlexProps { gap: 5.0 }), 0);
        let a = boxed(&mut tree, 10.0, 10.0);
        let b = boxed(&mut tree, 10.0, 10.0);
        tree.add_child(row, a);
        tree.add_child(row, b);

        tree.layout(row, LayoutParam::unbounded());

        assert_eq!(tree.get(b).unwrap().position, Offset::new(15.0, 0.0));
        assert_eq!(tree.get(row).unwrap().size, Size::new(25.0, 10.0));
    }

    #[test]
    fn test_children_offered_remaining_extent() {
        let mut tree = RenderTree::new();
        let row = tree.insert(RenderKind::Row, RenderProps::Flex(FlexProps::default()), 0);
        let a = boxed(&mut tree, 70.0, 10.0);
        let b = boxed(&mut tree, 70.0, 10.0);
        tree.add_child(row, a);
        tree.add_child(row, b);

        let param = LayoutParam::loose(Size::new(100.0, 100.0));
        tree.layout(row, param);

        // Second child only sees what the first left over, and every child
        // size satisfies what it was offered.
        assert_eq!(tree.get(a).unwrap().size.width, 70.0);
        assert_eq!(tree.get(b).unwrap().size.width, 30.0);
        assert!(param.is_satisfied_by(tree.get(row).unwrap().size));
        assert!(!tree.get(row).unwrap().flags.contains(NodeFlags::NEEDS_LAYOUT));
    }
}
