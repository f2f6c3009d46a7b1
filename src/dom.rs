//! Minimal DOM model for click interception
//!
//! The router only needs a handful of facts about the element a click landed
//! on: its tag, its resolved `href`, its classes, its `target` attribute and
//! its ancestors. [`Element`] carries exactly that, so platforms translate
//! their native nodes into this shape and the eligibility logic stays
//! testable without a browser.

use std::fmt;
use std::rc::Rc;

/// A DOM element with a link to its parent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    tag: String,
    id: Option<String>,
    href: Option<String>,
    classes: Vec<String>,
    target: Option<String>,
    parent: Option<Rc<Element>>,
}

impl Element {
    /// Create an element with the given tag name (lower-cased)
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            ..Self::default()
        }
    }

    /// Shorthand for an `<a href=...>` element
    pub fn anchor(href: impl Into<String>) -> Self {
        Self::new("a").href(href)
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn href(mut self, href: impl Into<String>) -> Self {
        self.href = Some(href.into());
        self
    }

    /// Set the class list from a whitespace separated `class` attribute
    pub fn class_name(mut self, class_name: &str) -> Self {
        self.classes = class_name.split_whitespace().map(str::to_string).collect();
        self
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Attach this element under `parent`
    pub fn child_of(mut self, parent: Rc<Element>) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn tag_name(&self) -> &str {
        &self.tag
    }

    pub fn element_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn href_attr(&self) -> Option<&str> {
        self.href.as_deref()
    }

    pub fn target_attr(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn parent(&self) -> Option<&Rc<Element>> {
        self.parent.as_ref()
    }
}

// ============================================================================
// Click Event
// ============================================================================

/// A click delivered by the platform's click source
#[derive(Debug, Clone)]
pub struct ClickEvent {
    /// The innermost element that was clicked
    pub target: Rc<Element>,
    /// Whether the "open in new context" modifier was held
    pub meta_key: bool,
    default_prevented: bool,
}

impl ClickEvent {
    pub fn new(target: Rc<Element>) -> Self {
        Self {
            target,
            meta_key: false,
            default_prevented: false,
        }
    }

    pub fn with_meta_key(mut self, meta_key: bool) -> Self {
        self.meta_key = meta_key;
        self
    }

    /// Suppress the platform's default navigation for this click
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

// ============================================================================
// Element Matcher
// ============================================================================

/// A simple selector: `tag`, `.class`, `#id` or `tag.class`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    tag: Option<String>,
    class: Option<String>,
    id: Option<String>,
}

impl Selector {
    pub fn parse(selector: &str) -> Self {
        let selector = selector.trim();

        if let Some(id) = selector.strip_prefix('#') {
            return Self {
                tag: None,
                class: None,
                id: Some(id.to_string()),
            };
        }

        let (tag, class) = match selector.split_once('.') {
            Some((tag, class)) => (tag, Some(class.to_string())),
            None => (selector, None),
        };

        Self {
            tag: (!tag.is_empty()).then(|| tag.to_ascii_lowercase()),
            class,
            id: None,
        }
    }

    pub fn matches(&self, element: &Element) -> bool {
        self.tag.as_deref().map_or(true, |t| element.tag_name() == t)
            && self.class.as_deref().map_or(true, |c| element.has_class(c))
            && self.id.as_deref().map_or(true, |i| element.element_id() == Some(i))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(id) = &self.id {
            return write!(f, "#{}", id);
        }
        write!(f, "{}", self.tag.as_deref().unwrap_or_default())?;
        if let Some(class) = &self.class {
            write!(f, ".{}", class)?;
        }
        Ok(())
    }
}

/// Resolves the nearest element matching a selector
pub struct ElementMatcher;

impl ElementMatcher {
    /// Return `node` if it matches `selector`; otherwise, when
    /// `climb_ancestors` is set, the closest matching ancestor.
    pub fn resolve(node: &Rc<Element>, selector: &str, climb_ancestors: bool) -> Option<Rc<Element>> {
        let selector = Selector::parse(selector);

        if selector.matches(node) {
            return Some(Rc::clone(node));
        }

        if !climb_ancestors {
            return None;
        }

        let mut current = node.parent();
        while let Some(element) = current {
            if selector.matches(element) {
                return Some(Rc::clone(element));
            }
            current = element.parent();
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> Rc<Element> {
        let body = Rc::new(Element::new("body").id("page"));
        let link = Rc::new(
            Element::anchor("http://x/measurement")
                .class_name("nav js-link")
                .child_of(body),
        );
        let span = Rc::new(Element::new("SPAN").child_of(link));
        Rc::new(Element::new("em").child_of(span))
    }

    #[test]
    fn test_selector_parsing() {
        assert_eq!(Selector::parse("a").to_string(), "a");
        assert_eq!(Selector::parse(".nav").to_string(), ".nav");
        assert_eq!(Selector::parse("#page").to_string(), "#page");
        assert_eq!(Selector::parse("A.nav").to_string(), "a.nav");
    }

    #[test]
    fn test_resolve_climbs_to_anchor() {
        let leaf = tree();
        let anchor = ElementMatcher::resolve(&leaf, "a", true).unwrap();
        assert_eq!(anchor.href_attr(), Some("http://x/measurement"));
        assert!(anchor.has_class("js-link"));
    }

    #[test]
    fn test_resolve_without_climbing() {
        let leaf = tree();
        assert!(ElementMatcher::resolve(&leaf, "a", false).is_none());
        assert!(ElementMatcher::resolve(&leaf, "em", false).is_some());
    }

    #[test]
    fn test_resolve_by_class_and_id() {
        let leaf = tree();
        assert!(ElementMatcher::resolve(&leaf, "a.nav", true).is_some());
        assert!(ElementMatcher::resolve(&leaf, ".missing", true).is_none());
        let body = ElementMatcher::resolve(&leaf, "#page", true).unwrap();
        assert_eq!(body.tag_name(), "body");
    }

    #[test]
    fn test_prevent_default() {
        let mut event = ClickEvent::new(tree());
        assert!(!event.default_prevented());
        event.prevent_default();
        assert!(event.default_prevented());
    }
}
