//! Component - immutable declarative UI description.
//!
//! Application code (or a binding layer) produces a fresh [`Component`] tree
//! each declarative evaluation. The tree is never mutated after construction;
//! a change is expressed as a new `Component` at the same tree position. The
//! reconciler ([`crate::element`]) diffs the new tree against the retained
//! element tree and discards the components afterwards.
//!
//! Components are `Rc`-shared so the reconciler can use pointer identity as
//! the "exact same instance" signal: handing the identical `Rc` back for a
//! subtree marks that subtree as unchanged work to skip.

mod props;

pub use props::{BoxProps, FlexProps, SplitProps, TextProps};

use std::fmt;
use std::rc::Rc;

use crate::types::Size;

/// Display index marking a split-container child as exempt from automatic
/// hide/show allocation.
pub const DISABLE_HIDE: i32 = -1;

// =============================================================================
// Kind + props
// =============================================================================

/// Stable type tag of a component.
///
/// The reconciler's structural compatibility check compares these tags (plus
/// the custom tag string for [`ComponentKind::Custom`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    /// The implicit window root.
    Root,
    /// Horizontal linear container.
    Row,
    /// Vertical linear container.
    Column,
    /// Overlay container, children stacked back-to-front.
    Stack,
    /// Resizable split container.
    Split,
    /// Fixed-size colored leaf.
    Box,
    /// Text leaf.
    Text,
    /// Composed component with an application-supplied build closure.
    Custom,
}

/// Per-kind property bag.
#[derive(Clone, Default)]
pub enum Props {
    #[default]
    None,
    Flex(FlexProps),
    Split(SplitProps),
    Box(BoxProps),
    Text(TextProps),
    Custom(CustomProps),
}

/// Properties of a composed component: a tag naming the application-side
/// type, and the build closure the element invokes during `perform_build`.
#[derive(Clone)]
pub struct CustomProps {
    /// Application-side type name; part of the structural compatibility check.
    pub tag: &'static str,
    /// Declarative evaluation producing the composed subtree.
    pub build: Rc<dyn Fn() -> Rc<Component>>,
    /// Partial-update marker: the producer promises this subtree is unchanged
    /// since the last evaluation, so the reconciler may skip it.
    pub unchanged: bool,
}

impl fmt::Debug for CustomProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomProps")
            .field("tag", &self.tag)
            .field("unchanged", &self.unchanged)
            .finish_non_exhaustive()
    }
}

/// How an element matches its old children against new component children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChildMatching {
    /// Children matched slot-by-slot in order.
    #[default]
    Positional,
    /// Old children indexed by reuse key, matched across positions.
    Keyed,
}

// =============================================================================
// Component
// =============================================================================

/// An immutable node in a declarative UI description.
#[derive(Debug, Clone)]
pub struct Component {
    kind: ComponentKind,
    props: Props,
    children: Vec<Rc<Component>>,
    key: Option<String>,
    display_index: i32,
    matching: ChildMatching,
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Flex(p) => p.fmt(f),
            Self::Split(p) => p.fmt(f),
            Self::Box(p) => p.fmt(f),
            Self::Text(p) => p.fmt(f),
            Self::Custom(p) => p.fmt(f),
        }
    }
}

impl Component {
    fn base(kind: ComponentKind, props: Props, children: Vec<Rc<Component>>) -> Self {
        Self {
            kind,
            props,
            children,
            key: None,
            display_index: 0,
            matching: ChildMatching::Positional,
        }
    }

    /// The implicit window root wrapping one child tree.
    pub fn root(child: Rc<Component>) -> Rc<Self> {
        Rc::new(Self::base(ComponentKind::Root, Props::None, vec![child]))
    }

    /// Horizontal linear container.
    pub fn row(children: Vec<Rc<Component>>) -> Rc<Self> {
        Rc::new(Self::base(ComponentKind::Row, Props::Flex(FlexProps::default()), children))
    }

    /// Vertical linear container.
    pub fn column(children: Vec<Rc<Component>>) -> Rc<Self> {
        Rc::new(Self::base(ComponentKind::Column, Props::Flex(FlexProps::default()), children))
    }

    /// Overlay container; last child paints on top.
    pub fn stack(children: Vec<Rc<Component>>) -> Rc<Self> {
        Rc::new(Self::base(ComponentKind::Stack, Props::None, children))
    }

    /// Resizable split container.
    pub fn split(props: SplitProps, children: Vec<Rc<Component>>) -> Rc<Self> {
        Rc::new(Self::base(ComponentKind::Split, Props::Split(props), children))
    }

    /// Fixed-size colored leaf.
    pub fn boxed(props: BoxProps) -> Rc<Self> {
        Rc::new(Self::base(ComponentKind::Box, Props::Box(props), Vec::new()))
    }

    /// Convenience: a box leaf with only a preferred size.
    pub fn sized(width: f32, height: f32) -> Rc<Self> {
        Self::boxed(BoxProps { size: Size::new(width, height), ..BoxProps::default() })
    }

    /// Text leaf.
    pub fn text(content: impl Into<String>) -> Rc<Self> {
        Rc::new(Self::base(
            ComponentKind::Text,
            Props::Text(TextProps { content: content.into() }),
            Vec::new(),
        ))
    }

    /// Composed component. `build` runs during the element's build phase and
    /// produces the composed subtree.
    pub fn custom(tag: &'static str, build: impl Fn() -> Rc<Component> + 'static) -> Rc<Self> {
        Rc::new(Self::base(
            ComponentKind::Custom,
            Props::Custom(CustomProps { tag, build: Rc::new(build), unchanged: false }),
            Vec::new(),
        ))
    }

    // =========================================================================
    // Builder-style decorations
    // =========================================================================

    /// Attach a reuse key (effective under [`ChildMatching::Keyed`] parents).
    pub fn with_key(self: Rc<Self>, key: impl Into<String>) -> Rc<Self> {
        let mut this = (*self).clone();
        this.key = Some(key.into());
        Rc::new(this)
    }

    /// Set the split-container display index ([`DISABLE_HIDE`] exempts the
    /// child from hide/show allocation).
    pub fn with_display_index(self: Rc<Self>, index: i32) -> Rc<Self> {
        let mut this = (*self).clone();
        this.display_index = index;
        Rc::new(this)
    }

    /// Opt this container into keyed child matching.
    pub fn with_keyed_children(self: Rc<Self>) -> Rc<Self> {
        let mut this = (*self).clone();
        this.matching = ChildMatching::Keyed;
        Rc::new(this)
    }

    /// Mark a custom component unchanged for partial-update reconciliation.
    /// No effect on other kinds.
    pub fn mark_unchanged(self: Rc<Self>) -> Rc<Self> {
        let mut this = (*self).clone();
        if let Props::Custom(custom) = &mut this.props {
            custom.unchanged = true;
        }
        Rc::new(this)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn children(&self) -> &[Rc<Component>] {
        &self.children
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn display_index(&self) -> i32 {
        self.display_index
    }

    pub fn child_matching(&self) -> ChildMatching {
        self.matching
    }

    /// Custom props, if this is a composed component.
    pub fn custom_props(&self) -> Option<&CustomProps> {
        match &self.props {
            Props::Custom(custom) => Some(custom),
            _ => None,
        }
    }

    /// Structural type compatibility: same kind, and for composed components
    /// the same application-side tag.
    pub fn same_type(&self, other: &Component) -> bool {
        if self.kind != other.kind {
            return false;
        }
        match (&self.props, &other.props) {
            (Props::Custom(a), Props::Custom(b)) => a.tag == b.tag,
            _ => true,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_type_by_kind() {
        let row = Component::row(vec![]);
        let row2 = Component::row(vec![Component::sized(1.0, 1.0)]);
        let column = Component::column(vec![]);

        assert!(row.same_type(&row2));
        assert!(!row.same_type(&column));
    }

    #[test]
    fn test_same_type_custom_compares_tag() {
        let a = Component::custom("Counter", || Component::sized(1.0, 1.0));
        let b = Component::custom("Counter", || Component::sized(2.0, 2.0));
        let c = Component::custom("Badge", || Component::sized(1.0, 1.0));

        assert!(a.same_type(&b));
        assert!(!a.same_type(&c));
    }

    #[test]
    fn test_decorations_produce_new_instances() {
        let plain = Component::sized(10.0, 10.0);
        let keyed = plain.clone().with_key("a");

        assert!(!Rc::ptr_eq(&plain, &keyed));
        assert_eq!(plain.key(), None);
        assert_eq!(keyed.key(), Some("a"));
    }

    #[test]
    fn test_mark_unchanged_only_affects_custom() {
        let custom = Component::custom("Panel", || Component::sized(1.0, 1.0)).mark_unchanged();
        assert!(custom.custom_props().unwrap().unchanged);

        let row = Component::row(vec![]).mark_unchanged();
        assert!(row.custom_props().is_none());
    }

    #[test]
    fn test_display_index_default_and_disable_hide() {
        let child = Component::sized(5.0, 5.0);
        assert_eq!(child.display_index(), 0);

        let pinned = child.with_display_index(DISABLE_HIDE);
        assert_eq!(pinned.display_index(), DISABLE_HIDE);
    }

    #[test]
    fn test_child_order_preserved() {
        let a = Component::text("a");
        let b = Component::text("b");
        let row = Component::row(vec![a.clone(), b.clone()]);

        assert_eq!(row.children().len(), 2);
        assert!(Rc::ptr_eq(&row.children()[0], &a));
        assert!(Rc::ptr_eq(&row.children()[1], &b));
    }
}
