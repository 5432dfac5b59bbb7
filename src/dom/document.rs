//! Document: the element tree, its shared style sheets and its animation
//! scheduler.

use std::collections::{BTreeMap, VecDeque};

use slotmap::{SecondaryMap, SlotMap};
use tracing::debug;

use super::element::{Element, ElementId};
use super::registry::ElementRegistry;
use crate::animation::AnimationScheduler;
use crate::config::CoreConfig;
use crate::error::{Error, Result};
use crate::geometry::{Axis, Region};
use crate::layout::{BoxChild, BoxLayout, BoxLayoutResult};
use crate::reactive::Cause;
use crate::style::attribute::{
    StyleAttribute, GAP, MAX_HEIGHT, MAX_WIDTH, MIN_HEIGHT, MIN_WIDTH, PREF_HEIGHT, PREF_WIDTH,
};
use crate::style::sheet::StyleSheet;

/// Empty slice constant for returning when an element has no children.
const EMPTY_CHILDREN: &[ElementId] = &[];

/// A tree of elements backed by a slotmap arena.
///
/// Parent/child links live in secondary maps, so removal is O(subtree size)
/// and lookup is O(1). Each element's style falls back to the sheet of its
/// tag, then to the document-wide sheet.
pub struct Document {
    config: CoreConfig,
    registry: ElementRegistry,
    elements: SlotMap<ElementId, Element>,
    children: SecondaryMap<ElementId, Vec<ElementId>>,
    parent: SecondaryMap<ElementId, ElementId>,
    root: Option<ElementId>,
    global: StyleSheet,
    tag_sheets: BTreeMap<String, StyleSheet>,
    animations: AnimationScheduler,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(ElementRegistry::standard())
    }
}

impl Document {
    pub fn new(registry: ElementRegistry) -> Self {
        Self::with_config(registry, CoreConfig::default())
    }

    pub fn with_config(registry: ElementRegistry, config: CoreConfig) -> Self {
        let animations = AnimationScheduler::new(config.animation.clone());
        Self {
            config,
            registry,
            elements: SlotMap::with_key(),
            children: SecondaryMap::new(),
            parent: SecondaryMap::new(),
            root: None,
            global: StyleSheet::new("document"),
            tag_sheets: BTreeMap::new(),
            animations,
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn registry(&self) -> &ElementRegistry {
        &self.registry
    }

    /// Rules that apply to every element.
    pub fn global_sheet(&self) -> &StyleSheet {
        &self.global
    }

    /// Rules that apply to every element with `tag`.
    pub fn tag_sheet(&mut self, tag: &str) -> Result<StyleSheet> {
        self.registry.element_type(tag)?;
        Ok(self
            .tag_sheets
            .entry(tag.to_string())
            .or_insert_with(|| StyleSheet::new(tag))
            .clone())
    }

    pub fn animations(&self) -> &AnimationScheduler {
        &self.animations
    }

    // -----------------------------------------------------------------------
    // Tree
    // -----------------------------------------------------------------------

    /// Create a detached element of a declared tag. The first element
    /// created becomes the root.
    pub fn create_element(&mut self, tag: &str) -> Result<ElementId> {
        let kind = self.registry.element_type(tag)?;
        let tag_sheet = self.tag_sheet(tag)?;
        let element = Element::new(kind, tag_sheet, self.global.clone())?;
        let id = self.elements.insert(element);
        self.children.insert(id, Vec::new());
        if self.root.is_none() {
            self.root = Some(id);
        }
        debug!(tag, ?id, "element created");
        Ok(id)
    }

    /// Append `child` to `parent`, detaching it from any previous parent.
    /// Moving an element under itself or one of its descendants fails.
    pub fn append_child(&mut self, parent: ElementId, child: ElementId) -> Result<()> {
        for id in [parent, child] {
            if !self.elements.contains_key(id) {
                return Err(Error::invalid_argument(format!("unknown element {id:?}")));
            }
        }
        if parent == child || self.ancestors(parent).contains(&child) {
            return Err(Error::invalid_argument(
                "an element cannot become its own descendant",
            ));
        }
        if let Some(old_parent) = self.parent.remove(child) {
            if let Some(siblings) = self.children.get_mut(old_parent) {
                siblings.retain(|&c| c != child);
            }
        }
        if self.root == Some(child) {
            self.root = Some(parent);
        }
        self.parent.insert(child, parent);
        if let Some(siblings) = self.children.get_mut(parent) {
            siblings.push(child);
        }
        Ok(())
    }

    /// Remove an element and all its descendants. Returns the removed
    /// element, or `None` if it didn't exist.
    pub fn remove(&mut self, id: ElementId) -> Option<Element> {
        if !self.elements.contains_key(id) {
            return None;
        }
        if let Some(parent_id) = self.parent.remove(id) {
            if let Some(siblings) = self.children.get_mut(parent_id) {
                siblings.retain(|&child| child != id);
            }
        }
        if self.root == Some(id) {
            self.root = None;
        }

        let mut to_remove = VecDeque::new();
        to_remove.push_back(id);
        let mut removed = None;
        while let Some(current) = to_remove.pop_front() {
            if let Some(kids) = self.children.remove(current) {
                to_remove.extend(kids);
            }
            self.parent.remove(current);
            let element = self.elements.remove(current);
            if current == id {
                removed = element;
            }
        }
        removed
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id)
    }

    /// Like [`get`](Self::get), failing with [`Error::InvalidArgument`].
    pub fn element(&self, id: ElementId) -> Result<&Element> {
        self.elements
            .get(id)
            .ok_or_else(|| Error::invalid_argument(format!("unknown element {id:?}")))
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.parent.get(id).copied()
    }

    /// Children of an element. Empty if it has none or does not exist.
    pub fn children(&self, id: ElementId) -> &[ElementId] {
        self.children
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or(EMPTY_CHILDREN)
    }

    /// Ancestors from the immediate parent up to the root, excluding `id`.
    pub fn ancestors(&self, id: ElementId) -> Vec<ElementId> {
        let mut result = Vec::new();
        let mut current = id;
        while let Some(p) = self.parent.get(current).copied() {
            result.push(p);
            current = p;
        }
        result
    }

    pub fn root(&self) -> Option<ElementId> {
        self.root
    }

    pub fn set_root(&mut self, id: ElementId) {
        self.root = Some(id);
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains_key(id)
    }

    /// Pre-order depth-first traversal starting from `start`.
    pub fn walk_depth_first(&self, start: ElementId) -> Vec<ElementId> {
        let mut result = Vec::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if !self.elements.contains_key(current) {
                continue;
            }
            result.push(current);
            stack.extend(self.children(current).iter().rev());
        }
        result
    }

    // -----------------------------------------------------------------------
    // Layout
    // -----------------------------------------------------------------------

    /// Lay out the children of `parent` along `axis` inside `region` and
    /// publish everyone's bounds. The parent's `gap` separates the children;
    /// each child's sizing attributes come from its current style.
    pub fn layout(&self, parent: ElementId, axis: Axis, region: Region) -> Result<BoxLayoutResult> {
        let container = self.element(parent)?;
        let gap = float(container, &GAP);
        let mut layout = BoxLayout::new(axis).with_gap(gap);
        for &child in self.children(parent) {
            layout.push(box_child(self.element(child)?, axis)?);
        }
        let result = layout.layout(region)?;

        let cause = Cause::root(format!("layout of <{}>", container.tag()));
        container.bounds().set_with_cause(region, cause.clone());
        for (index, &child) in self.children(parent).iter().enumerate() {
            let bounds = result.region(index);
            self.element(child)?
                .bounds()
                .set_with_cause(bounds, cause.derive(format!("child {index}")));
        }
        debug!(
            parent = container.tag(),
            children = layout.len(),
            overflow = result.overflow(),
            "box layout published"
        );
        Ok(result)
    }
}

fn float(element: &Element, attribute: &StyleAttribute) -> f64 {
    element
        .style()
        .value(attribute)
        .as_f64()
        .or_else(|| attribute.default_value().as_f64())
        .unwrap_or(0.0)
}

fn box_child(element: &Element, axis: Axis) -> Result<BoxChild> {
    let (main, cross) = match axis {
        Axis::Horizontal => (
            [MIN_WIDTH, PREF_WIDTH, MAX_WIDTH],
            [MIN_HEIGHT, MAX_HEIGHT],
        ),
        Axis::Vertical => (
            [MIN_HEIGHT, PREF_HEIGHT, MAX_HEIGHT],
            [MIN_WIDTH, MAX_WIDTH],
        ),
    };
    let [min, pref, max] = main.map(|a| float(element, &a));
    let [cross_min, cross_max] = cross.map(|a| float(element, &a));
    BoxChild::from_bounds(min, pref, max, cross_min, cross_max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::value::Value;
    use crate::style::expression::StateExpression;
    use crate::style::MutableStyle;
    use pretty_assertions::assert_eq;

    /// Build a small test tree:
    /// ```text
    ///       root
    ///      /    \
    ///    a        b
    ///   / \
    ///  c   d
    /// ```
    fn build_tree() -> (Document, [ElementId; 5]) {
        let mut doc = Document::default();
        let root = doc.create_element("box").unwrap();
        let a = doc.create_element("box").unwrap();
        let b = doc.create_element("label").unwrap();
        let c = doc.create_element("button").unwrap();
        let d = doc.create_element("label").unwrap();
        doc.append_child(root, a).unwrap();
        doc.append_child(root, b).unwrap();
        doc.append_child(a, c).unwrap();
        doc.append_child(a, d).unwrap();
        (doc, [root, a, b, c, d])
    }

    #[test]
    fn first_element_is_root() {
        let (doc, [root, ..]) = build_tree();
        assert_eq!(doc.root(), Some(root));
        assert_eq!(doc.len(), 5);
    }

    #[test]
    fn unknown_tags_are_rejected() {
        let mut doc = Document::default();
        assert!(matches!(
            doc.create_element("marquee"),
            Err(Error::InvalidArgument { .. })
        ));
        assert!(doc.is_empty());
    }

    #[test]
    fn parent_children_and_ancestors() {
        let (doc, [root, a, b, c, d]) = build_tree();
        assert_eq!(doc.children(root), &[a, b]);
        assert_eq!(doc.children(a), &[c, d]);
        assert_eq!(doc.parent(c), Some(a));
        assert_eq!(doc.ancestors(c), vec![a, root]);
        assert!(doc.ancestors(root).is_empty());
    }

    #[test]
    fn walk_depth_first() {
        let (doc, [root, a, b, c, d]) = build_tree();
        assert_eq!(doc.walk_depth_first(root), vec![root, a, c, d, b]);
        assert_eq!(doc.walk_depth_first(a), vec![a, c, d]);
    }

    #[test]
    fn append_moves_and_rejects_cycles() {
        let (mut doc, [root, a, b, c, _d]) = build_tree();
        doc.append_child(b, c).unwrap();
        assert_eq!(doc.parent(c), Some(b));
        assert!(!doc.children(a).contains(&c));
        assert!(doc.append_child(c, root).is_err());
        assert!(doc.append_child(a, a).is_err());
    }

    #[test]
    fn remove_subtree() {
        let (mut doc, [root, a, b, c, d]) = build_tree();
        let removed = doc.remove(a).unwrap();
        assert_eq!(removed.tag(), "box");
        assert!(!doc.contains(c));
        assert!(!doc.contains(d));
        assert_eq!(doc.children(root), &[b]);
        assert_eq!(doc.len(), 2);
        assert!(doc.remove(a).is_none());
    }

    #[test]
    fn tag_sheets_are_shared_by_tag() {
        let mut doc = Document::default();
        let sheet = doc.tag_sheet("button").unwrap();
        sheet
            .set(&GAP, StateExpression::Always, Value::Int(3))
            .unwrap();
        let one = doc.create_element("button").unwrap();
        let two = doc.create_element("button").unwrap();
        for id in [one, two] {
            assert_eq!(doc.get(id).unwrap().style().value(&GAP), Value::Float(3.0));
        }
        assert!(doc.tag_sheet("nope").is_err());
    }

    #[test]
    fn layout_publishes_child_bounds() {
        let mut doc = Document::default();
        let row = doc.create_element("box").unwrap();
        let first = doc.create_element("label").unwrap();
        let second = doc.create_element("label").unwrap();
        doc.append_child(row, first).unwrap();
        doc.append_child(row, second).unwrap();

        doc.global_sheet()
            .set(&MAX_WIDTH, StateExpression::Always, Value::Int(30))
            .unwrap();
        doc.get(row)
            .unwrap()
            .style()
            .set(&GAP, StateExpression::Always, Value::Int(4))
            .unwrap();

        let region = Region::new(0, 0, 100, 10);
        doc.layout(row, Axis::Horizontal, region).unwrap();
        assert_eq!(doc.get(row).unwrap().bounds().get(), region);
        assert_eq!(doc.get(first).unwrap().bounds().get(), Region::new(0, 0, 30, 10));
        assert_eq!(doc.get(second).unwrap().bounds().get(), Region::new(34, 0, 30, 10));
    }

    #[test]
    fn layout_of_childless_element() {
        let mut doc = Document::default();
        let row = doc.create_element("box").unwrap();
        let result = doc.layout(row, Axis::Vertical, Region::new(2, 2, 10, 10)).unwrap();
        assert!(result.regions().is_empty());
        assert_eq!(result.region(0), Region::new(2, 2, 0, 0));
    }

    #[test]
    fn document_owns_its_scheduler() {
        let doc = Document::default();
        assert!(doc.animations().is_empty());
        assert!(!doc.animations().is_running());
    }
}
