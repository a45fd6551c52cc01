use kuchiki::traits::*;
use kuchiki::{NodeRef, Selectors};

/// Mutable page tree for a single extraction. Nodes are reference counted
/// and not `Send`, so a document can never leave the task that parsed it.
pub struct PageDocument {
    root: NodeRef,
    main_content: Option<NodeRef>,
}

impl PageDocument {
    pub fn parse(html: &str) -> Self {
        Self {
            root: kuchiki::parse_html().one(html),
            main_content: None,
        }
    }

    pub fn root(&self) -> &NodeRef {
        &self.root
    }

    pub fn main_content(&self) -> Option<&NodeRef> {
        self.main_content.as_ref()
    }

    pub fn set_main_content(&mut self, node: Option<NodeRef>) {
        self.main_content = node;
    }

    pub fn is_main_content(&self, node: &NodeRef) -> bool {
        self.main_content.as_ref().is_some_and(|main| main == node)
    }

    /// Matching elements in document order, collected so callers can detach
    /// them while iterating.
    pub fn select_all(&self, selectors: &Selectors) -> Vec<NodeRef> {
        selectors
            .filter(self.root.inclusive_descendants().elements())
            .map(|element| element.as_node().clone())
            .collect()
    }

    pub fn select_first(&self, selectors: &Selectors) -> Option<NodeRef> {
        selectors
            .filter(self.root.inclusive_descendants().elements())
            .next()
            .map(|element| element.as_node().clone())
    }

    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeRef> {
        self.root
            .descendants()
            .filter(|node| tag_name(node) == Some(tag))
            .collect()
    }

    /// Detach every match except the document skeleton. Returns how many
    /// nodes were actually removed (nested matches go with their ancestor).
    pub fn remove_matching(&self, selectors: &Selectors) -> usize {
        let mut removed = 0;
        for node in self.select_all(selectors) {
            if is_skeleton(&node) || !is_attached(&node, &self.root) {
                continue;
            }
            node.detach();
            removed += 1;
        }
        removed
    }

    pub fn html_element(&self) -> Option<NodeRef> {
        self.root
            .children()
            .find(|node| tag_name(node) == Some("html"))
    }

    pub fn body(&self) -> Option<NodeRef> {
        self.html_element()?
            .children()
            .find(|node| tag_name(node) == Some("body"))
    }

    pub fn to_html(&self) -> String {
        self.root.to_string()
    }

    /// Serialized children of `<body>`, without the document shell.
    pub fn body_html(&self) -> String {
        match self.body() {
            Some(body) => body.children().map(|child| child.to_string()).collect(),
            None => String::new(),
        }
    }
}

/// What a visitor wants done with the node it was just shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Keep the node and walk its children.
    Descend,
    /// Keep the node, do not walk its children.
    Skip,
    /// Detach the node with its subtree.
    Remove,
    /// Replace the node by its children, which are then walked in turn.
    Unwrap,
}

pub trait TreeVisitor {
    fn on_before_visit(&mut self, _node: &NodeRef) {}

    fn on_visit(&mut self, node: &NodeRef) -> Visit;
}

/// Pre-order walk over everything below `root`, applying the visitor's
/// decision to each node before descending.
pub fn walk<V: TreeVisitor>(root: &NodeRef, visitor: &mut V) {
    walk_children(root, visitor);
}

fn walk_children<V: TreeVisitor>(parent: &NodeRef, visitor: &mut V) {
    let mut next = parent.first_child();
    while let Some(node) = next {
        next = node.next_sibling();
        visit_node(&node, visitor);
    }
}

fn visit_node<V: TreeVisitor>(node: &NodeRef, visitor: &mut V) {
    visitor.on_before_visit(node);
    match visitor.on_visit(node) {
        Visit::Descend => walk_children(node, visitor),
        Visit::Skip => {}
        Visit::Remove => node.detach(),
        Visit::Unwrap => {
            let children: Vec<NodeRef> = node.children().collect();
            for child in &children {
                node.insert_before(child.clone());
            }
            node.detach();
            for child in &children {
                visit_node(child, visitor);
            }
        }
    }
}

pub fn tag_name(node: &NodeRef) -> Option<&str> {
    node.as_element().map(|element| &*element.name.local)
}

pub fn is_skeleton(node: &NodeRef) -> bool {
    matches!(tag_name(node), Some("html" | "head" | "body"))
}

fn is_attached(node: &NodeRef, root: &NodeRef) -> bool {
    node.ancestors().any(|ancestor| &ancestor == root)
}

pub fn get_attr(node: &NodeRef, name: &str) -> Option<String> {
    let element = node.as_element()?;
    let attributes = element.attributes.borrow();
    attributes.get(name).map(str::to_string)
}

pub fn set_attr(node: &NodeRef, name: &str, value: impl Into<String>) {
    if let Some(element) = node.as_element() {
        element.attributes.borrow_mut().insert(name, value.into());
    }
}

pub fn remove_attr(node: &NodeRef, name: &str) -> bool {
    node.as_element()
        .is_some_and(|element| element.attributes.borrow_mut().remove(name).is_some())
}

pub fn has_element_children(node: &NodeRef) -> bool {
    node.children().elements().next().is_some()
}

/// No element children and nothing but whitespace inside.
pub fn is_blank(node: &NodeRef) -> bool {
    !has_element_children(node) && node.text_contents().trim().is_empty()
}
