//! Stack (overlay) layout policy.
//!
//! Every child is offered the loosened container constraints and placed at
//! the origin; later children paint over earlier ones. The container
//! resolves to the largest child extent on each axis.

use crate::canvas::Canvas;
use crate::render::{NodeOps, RenderId, RenderTree};
use crate::types::{LayoutParam, Offset, Size};

pub(crate) static OPS: NodeOps = NodeOps {
    layout: perform_layout,
    paint: paint_none,
    hit_self: super::bounds_hit,
};

fn paint_none(_: &RenderTree, _: RenderId, _: Offset, _: &mut dyn Canvas) {}

fn perform_layout(tree: &mut RenderTree, id: RenderId, param: LayoutParam) -> Size {
    let mut size = Size::ZERO;
    for child in tree.children_of(id) {
        tree.layout(child, param.loosen());
        tree.set_position(child, Offset::ZERO);
        if let Some(node) = tree.get(child) {
            size = size.max(node.size);
        }
    }
    size
}
