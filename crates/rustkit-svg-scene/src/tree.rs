//! Input tree abstraction.
//!
//! The interpreter does not parse markup. Any tree that can answer the
//! [`DocumentNode`] questions can be interpreted; [`SvgNode`] is a small owned
//! tree for callers that build documents in code (and for tests).

/// Tag name used for character data nodes.
pub const TEXT_NODE_TAG: &str = "#text";

/// Read access to one node of a markup tree.
///
/// Character data appears as child nodes whose tag name is `#text`.
pub trait DocumentNode {
    /// Element name without namespace prefix.
    fn tag_name(&self) -> &str;

    /// Value of one attribute.
    fn attribute(&self, name: &str) -> Option<&str>;

    /// All attributes in document order.
    fn attributes(&self) -> Vec<(String, String)>;

    /// Child nodes in document order.
    fn children(&self) -> Vec<Self>
    where
        Self: Sized;

    /// Character data of a text node.
    fn text_content(&self) -> Option<String>;
}

/// A minimal owned markup tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SvgNode {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<SvgNode>,
    pub text: Option<String>,
}

impl SvgNode {
    /// Create an element node.
    pub fn element(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    /// Create a character data node.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            tag: TEXT_NODE_TAG.to_string(),
            text: Some(content.into()),
            ..Default::default()
        }
    }

    /// Set an attribute, replacing an earlier value with the same name.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
        self
    }

    /// Append a child node.
    pub fn child(mut self, child: SvgNode) -> Self {
        self.children.push(child);
        self
    }

    /// Append several child nodes.
    pub fn with_children(mut self, children: impl IntoIterator<Item = SvgNode>) -> Self {
        self.children.extend(children);
        self
    }
}

impl<'a> DocumentNode for &'a SvgNode {
    fn tag_name(&self) -> &str {
        &self.tag
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    fn attributes(&self) -> Vec<(String, String)> {
        self.attributes.clone()
    }

    fn children(&self) -> Vec<Self> {
        let node: &'a SvgNode = *self;
        node.children.iter().collect()
    }

    fn text_content(&self) -> Option<String> {
        self.text.clone()
    }
}
