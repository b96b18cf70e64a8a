//! Element index: an arena copy of the input tree with id lookup and
//! cascading attribute resolution.
//!
//! ## Design
//!
//! The input tree is copied once into a flat arena. Elements refer to each
//! other by [`ElementId`], so parent links never own anything and `use`
//! reference copies can be appended without touching the original tree.
//! Inherited lookups are memoized per `(element, attribute)` for the lifetime
//! of the index, which is one interpretation pass.

use crate::parse::parse_style_declarations;
use crate::tree::{DocumentNode, TEXT_NODE_TAG};
use crate::Warning;
use std::cell::{OnceCell, RefCell};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Index of an element in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(usize);

impl ElementId {
    /// Get the raw arena index.
    pub fn raw(&self) -> usize {
        self.0
    }
}

// ==================== Tags ====================

/// Element kinds the interpreter knows about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag {
    Svg,
    G,
    Defs,
    Symbol,
    Use,
    A,
    Rect,
    Circle,
    Ellipse,
    Line,
    Polyline,
    Polygon,
    Path,
    Text,
    Tspan,
    TextPath,
    LinearGradient,
    RadialGradient,
    Stop,
    ClipPath,
    Marker,
    Mask,
    Pattern,
    Filter,
    /// Any `fe*` filter primitive; the payload is the element name.
    FilterPrimitive(String),
    Title,
    Desc,
    Metadata,
    Style,
    /// Character data.
    TextNode,
    Unknown(String),
}

impl Tag {
    /// Map an element name (optionally namespace-prefixed) to a tag.
    pub fn from_name(name: &str) -> Self {
        let local = name.rsplit(':').next().unwrap_or(name);
        match local {
            "svg" => Tag::Svg,
            "g" => Tag::G,
            "defs" => Tag::Defs,
            "symbol" => Tag::Symbol,
            "use" => Tag::Use,
            "a" => Tag::A,
            "rect" => Tag::Rect,
            "circle" => Tag::Circle,
            "ellipse" => Tag::Ellipse,
            "line" => Tag::Line,
            "polyline" => Tag::Polyline,
            "polygon" => Tag::Polygon,
            "path" => Tag::Path,
            "text" => Tag::Text,
            "tspan" => Tag::Tspan,
            "textPath" => Tag::TextPath,
            "linearGradient" => Tag::LinearGradient,
            "radialGradient" => Tag::RadialGradient,
            "stop" => Tag::Stop,
            "clipPath" => Tag::ClipPath,
            "marker" => Tag::Marker,
            "mask" => Tag::Mask,
            "pattern" => Tag::Pattern,
            "filter" => Tag::Filter,
            "title" => Tag::Title,
            "desc" => Tag::Desc,
            "metadata" => Tag::Metadata,
            "style" => Tag::Style,
            TEXT_NODE_TAG => Tag::TextNode,
            other if other.starts_with("fe") && other.len() > 2 => {
                Tag::FilterPrimitive(other.to_string())
            }
            other => Tag::Unknown(other.to_string()),
        }
    }

    /// Basic shapes that produce exactly one outline.
    pub fn is_shape(&self) -> bool {
        matches!(
            self,
            Tag::Rect | Tag::Circle | Tag::Ellipse | Tag::Line | Tag::Polyline | Tag::Polygon | Tag::Path
        )
    }

    /// Elements that are only rendered when referenced.
    pub fn is_never_rendered(&self) -> bool {
        matches!(
            self,
            Tag::Defs
                | Tag::Symbol
                | Tag::LinearGradient
                | Tag::RadialGradient
                | Tag::Stop
                | Tag::ClipPath
                | Tag::Marker
                | Tag::Mask
                | Tag::Pattern
                | Tag::Filter
                | Tag::FilterPrimitive(_)
                | Tag::Title
                | Tag::Desc
                | Tag::Metadata
                | Tag::Style
        )
    }
}

// ==================== Elements ====================

/// One element of the indexed tree.
#[derive(Debug, Clone)]
pub struct Element {
    pub tag: Tag,
    attributes: HashMap<String, String>,
    /// Attributes injected by a `use` element. Checked before everything else.
    overrides: HashMap<String, String>,
    style: OnceCell<HashMap<String, String>>,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    /// Explicit or generated id.
    id: Option<String>,
    text: Option<String>,
    /// Source element for reference copies.
    copy_of: Option<ElementId>,
}

impl Element {
    fn new(tag: Tag, attributes: HashMap<String, String>, parent: Option<ElementId>) -> Self {
        Self {
            tag,
            attributes,
            overrides: HashMap::new(),
            style: OnceCell::new(),
            parent,
            children: Vec::new(),
            id: None,
            text: None,
            copy_of: None,
        }
    }

    /// Inline attribute value.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Value from the `style` shorthand, parsed on first use.
    pub fn style_value(&self, name: &str) -> Option<&str> {
        self.style_map().get(name).map(String::as_str)
    }

    /// Every declaration of the `style` shorthand.
    pub fn style_map(&self) -> &HashMap<String, String> {
        self.style.get_or_init(|| {
            self.attributes
                .get("style")
                .map(|s| parse_style_declarations(s).into_iter().collect())
                .unwrap_or_default()
        })
    }

    /// Override, inline attribute or style value, in that order.
    pub fn local_value(&self, name: &str) -> Option<&str> {
        self.overrides
            .get(name)
            .map(String::as_str)
            .or_else(|| self.attribute(name))
            .or_else(|| self.style_value(name))
    }

    /// True if the element itself (attribute or style) sets `name`.
    pub fn has_own_value(&self, name: &str) -> bool {
        self.attribute(name).is_some() || self.style_value(name).is_some()
    }

    /// All inline attributes.
    pub fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }

    /// Attributes injected by a `use` element.
    pub fn overrides(&self) -> &HashMap<String, String> {
        &self.overrides
    }

    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    /// Explicit or generated id.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Character data for text nodes.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// The element this one was copied from by a `use`.
    pub fn copy_of(&self) -> Option<ElementId> {
        self.copy_of
    }
}

// ==================== Element Index ====================

/// Per-document element arena and lookup tables.
#[derive(Debug, Default)]
pub struct ElementIndex {
    elements: Vec<Element>,
    ids: HashMap<String, ElementId>,
    root: Option<ElementId>,
    memo: RefCell<HashMap<(ElementId, String), Option<String>>>,
    generated: usize,
    depth: usize,
    warnings: Vec<Warning>,
}

impl ElementIndex {
    /// Copy `root` and its descendants into a new index.
    pub fn build<N: DocumentNode>(root: N) -> Self {
        let mut index = Self::default();
        let root_id = index.insert(&root, None, 1);
        index.root = Some(root_id);
        debug!(elements = index.elements.len(), ids = index.ids.len(), depth = index.depth, "element index built");
        index
    }

    fn insert<N: DocumentNode>(&mut self, node: &N, parent: Option<ElementId>, depth: usize) -> ElementId {
        self.depth = self.depth.max(depth);
        let tag = Tag::from_name(node.tag_name());
        let mut attributes: HashMap<String, String> = node.attributes().into_iter().collect();
        let id = ElementId(self.elements.len());

        let mut explicit_id = None;
        if let Some(value) = attributes.get("id").cloned() {
            if self.ids.contains_key(&value) {
                warn!(id = %value, "duplicate id; later element is unreachable by id");
                attributes.remove("id");
                self.warnings.push(Warning::DuplicateId(value));
            } else {
                self.ids.insert(value.clone(), id);
                explicit_id = Some(value);
            }
        }

        let mut element = Element::new(tag, attributes, parent);
        element.id = explicit_id;
        if element.tag == Tag::TextNode {
            element.text = node.text_content();
        }
        self.elements.push(element);

        for child in node.children() {
            let child_id = self.insert(&child, Some(id), depth + 1);
            self.elements[id.0].children.push(child_id);
        }
        id
    }

    /// The document root.
    pub fn root(&self) -> Option<ElementId> {
        self.root
    }

    /// Number of elements, reference copies included.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Depth of the original tree (root = 1).
    pub fn tree_depth(&self) -> usize {
        self.depth
    }

    /// Access an element. Ids only come from this index, so this cannot miss.
    pub fn element(&self, id: ElementId) -> &Element {
        &self.elements[id.0]
    }

    /// Element by id attribute.
    pub fn lookup(&self, id: &str) -> Option<ElementId> {
        self.ids.get(id).copied()
    }

    /// Element by IRI (`#id`) or functional IRI (`url(#id)`).
    pub fn lookup_iri(&self, iri: &str) -> Option<ElementId> {
        self.lookup(&iri_target(iri)?)
    }

    /// Resolve an attribute through overrides, inline attributes and the
    /// `style` shorthand, then (if `inherited`) through the ancestors.
    pub fn resolve_attribute(&self, element: ElementId, name: &str, inherited: bool) -> Option<String> {
        let el = self.element(element);
        if let Some(value) = el.local_value(name) {
            if value.trim() != "inherit" {
                return Some(value.to_string());
            }
            return el.parent.and_then(|p| self.resolve_attribute(p, name, inherited));
        }
        if !inherited {
            return None;
        }

        let key = (element, name.to_string());
        if let Some(cached) = self.memo.borrow().get(&key) {
            return cached.clone();
        }
        let resolved = el.parent.and_then(|p| self.resolve_attribute(p, name, true));
        self.memo.borrow_mut().insert(key, resolved.clone());
        resolved
    }

    /// Id of `element`, generating one if it has none.
    pub fn ensure_id(&mut self, element: ElementId) -> String {
        if let Some(id) = &self.elements[element.0].id {
            return id.clone();
        }
        self.generated += 1;
        let id = format!("_#{}Generated__", self.generated);
        self.elements[element.0].id = Some(id.clone());
        self.ids.insert(id.clone(), element);
        id
    }

    /// Deep-copy `target` under `parent` as a reference copy whose root
    /// carries `overrides`. Returns the copy's root.
    pub fn instantiate(
        &mut self,
        target: ElementId,
        parent: ElementId,
        overrides: HashMap<String, String>,
    ) -> ElementId {
        let copy = self.copy_subtree(target, parent);
        self.elements[copy.0].overrides = overrides;
        self.ensure_id(copy);
        copy
    }

    fn copy_subtree(&mut self, source: ElementId, parent: ElementId) -> ElementId {
        let original = &self.elements[source.0];
        let mut element = Element::new(original.tag.clone(), original.attributes.clone(), Some(parent));
        element.text = original.text.clone();
        element.copy_of = Some(source);
        let children = original.children.clone();

        let id = ElementId(self.elements.len());
        self.elements.push(element);
        for child in children {
            let child_copy = self.copy_subtree(child, id);
            self.elements[id.0].children.push(child_copy);
        }
        id
    }

    /// Hand over warnings recorded while indexing.
    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }
}

/// Extract the fragment id from `#id` or `url(#id)`. Quotes inside `url()`
/// are allowed.
pub fn iri_target(iri: &str) -> Option<String> {
    let iri = iri.trim();
    let inner = match iri.strip_prefix("url(") {
        Some(rest) => rest.split_once(')')?.0.trim().trim_matches(|c| c == '"' || c == '\''),
        None => iri,
    };
    let id = inner.strip_prefix('#')?;
    (!id.is_empty()).then(|| id.to_string())
}
