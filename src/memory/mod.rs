//! Headless implementations of the platform capabilities.
//!
//! [`MemoryDom`] is an arena-backed document with a CSS selector subset, capture/bubble event dispatch and a session
//! history stack. [`MemoryTransport`] records requests and lets the caller complete them by hand. Together they run
//! every component natively, without a browser.

mod markup;
mod selector;
mod transport;

pub use transport::MemoryTransport;

use self::{
	markup::Fragment,
	selector::{SelectorList, SelectorTree},
};
use crate::{
	dom::{Dom, FileHandle, Insertion, Listener, PopListener},
	error::{Error, Result},
};
use core::cell::{Cell, RefCell};
use serde_json::Value;
use std::rc::Rc;
use tracing::{debug, trace, trace_span};
use url::Url;

/// Handle to a node of a [`MemoryDom`]. Only meaningful for the document that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug)]
struct ElementData {
	tag: String,
	attributes: Vec<(String, String)>,
	/// The dirty value, once set programmatically.
	value: Option<String>,
	/// The dirty checkedness, once set programmatically.
	checked: Option<bool>,
	files: Vec<FileHandle>,
	display: Option<String>,
}

#[derive(Debug)]
enum Content {
	Element(ElementData),
	Text(String),
}

#[derive(Debug)]
struct Node {
	content: Content,
	parent: Option<NodeId>,
	children: Vec<NodeId>,
}

struct Registration {
	target: NodeId,
	event: String,
	capture: bool,
	listener: Listener<MemoryEvent>,
}

struct Document {
	nodes: Vec<Node>,
	root: NodeId,
	head: NodeId,
	body: NodeId,
	title: String,
	/// `(location, state)`
	sessions: Vec<(String, Value)>,
	session_index: usize,
	listeners: Vec<Registration>,
	pop_listeners: Vec<PopListener>,
	focused: Option<NodeId>,
	reloads: usize,
}

impl SelectorTree for Document {
	type Node = NodeId;

	fn local_name(&self, node: NodeId) -> Option<&str> {
		self.element(node).map(|element| element.tag.as_str())
	}

	fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
		self.element(node)?.attributes.iter().find(|(n, _)| n == name).map(|(_, value)| value.as_str())
	}

	fn parent_element(&self, node: NodeId) -> Option<NodeId> {
		self.nodes.get(node.0)?.parent
	}
}

impl Document {
	fn new(location: String) -> Self {
		let mut document = Self {
			nodes: Vec::new(),
			root: NodeId(0),
			head: NodeId(0),
			body: NodeId(0),
			title: String::new(),
			sessions: vec![(location, Value::Null)],
			session_index: 0,
			listeners: Vec::new(),
			pop_listeners: Vec::new(),
			focused: None,
			reloads: 0,
		};
		document.root = document.create_element("html");
		document.head = document.create_element("head");
		document.body = document.create_element("body");
		document.append(document.root, document.head);
		document.append(document.root, document.body);
		document
	}

	fn add(&mut self, content: Content) -> NodeId {
		self.nodes.push(Node { content, parent: None, children: Vec::new() });
		NodeId(self.nodes.len() - 1)
	}

	fn create_element(&mut self, tag: &str) -> NodeId {
		self.add(Content::Element(ElementData {
			tag: tag.to_ascii_lowercase(),
			attributes: Vec::new(),
			value: None,
			checked: None,
			files: Vec::new(),
			display: None,
		}))
	}

	fn element(&self, node: NodeId) -> Option<&ElementData> {
		match &self.nodes.get(node.0)?.content {
			Content::Element(element) => Some(element),
			Content::Text(_) => None,
		}
	}

	fn element_mut(&mut self, node: NodeId) -> Option<&mut ElementData> {
		match &mut self.nodes.get_mut(node.0)?.content {
			Content::Element(element) => Some(element),
			Content::Text(_) => None,
		}
	}

	fn detach(&mut self, node: NodeId) {
		if let Some(parent) = self.nodes[node.0].parent.take() {
			self.nodes[parent.0].children.retain(|&child| child != node);
		}
	}

	fn append(&mut self, parent: NodeId, child: NodeId) {
		self.insert(parent, self.nodes[parent.0].children.len(), child);
	}

	fn insert(&mut self, parent: NodeId, index: usize, child: NodeId) {
		self.detach(child);
		self.nodes[child.0].parent = Some(parent);
		self.nodes[parent.0].children.insert(index, child);
	}

	fn clear_children(&mut self, node: NodeId) {
		for child in core::mem::take(&mut self.nodes[node.0].children) {
			self.nodes[child.0].parent = None;
		}
	}

	/// Creates detached nodes for `fragments`.
	fn build(&mut self, fragments: Vec<Fragment>) -> Vec<NodeId> {
		fragments
			.into_iter()
			.map(|fragment| match fragment {
				Fragment::Text(text) => self.add(Content::Text(text)),
				Fragment::Element { tag, attributes, children } => {
					let element = self.create_element(&tag);
					if let Some(data) = self.element_mut(element) {
						data.attributes = attributes;
					}
					for child in self.build(children) {
						self.append(element, child);
					}
					element
				}
			})
			.collect()
	}

	/// Descendants of `node` in document order, excluding `node` itself.
	fn descendants(&self, node: NodeId, out: &mut Vec<NodeId>) {
		for &child in &self.nodes[node.0].children {
			out.push(child);
			self.descendants(child, out);
		}
	}

	fn text_content(&self, node: NodeId, out: &mut String) {
		match &self.nodes[node.0].content {
			Content::Text(text) => out.push_str(text),
			Content::Element(_) => {
				for &child in &self.nodes[node.0].children {
					self.text_content(child, out);
				}
			}
		}
	}

	fn serialize_children(&self, node: NodeId, out: &mut String) {
		for &child in &self.nodes[node.0].children {
			match &self.nodes[child.0].content {
				Content::Text(text) => out.push_str(text),
				Content::Element(element) => {
					markup::write_start_tag(out, &element.tag, &element.attributes);
					if !markup::is_void(&element.tag) {
						self.serialize_children(child, out);
						out.push_str("</");
						out.push_str(&element.tag);
						out.push('>');
					}
				}
			}
		}
	}

	fn query_all(&self, scope: NodeId, include_scope: bool, selector: &str) -> Result<Vec<NodeId>> {
		let list = SelectorList::parse(selector)?;
		let mut candidates = Vec::new();
		if include_scope {
			candidates.push(scope);
		}
		self.descendants(scope, &mut candidates);
		Ok(candidates.into_iter().filter(|&node| list.matches(self, node)).collect())
	}

	fn location(&self) -> &str {
		&self.sessions[self.session_index].0
	}
}

/// An event dispatched through a [`MemoryDom`].
#[derive(Debug)]
pub struct MemoryEvent {
	kind: String,
	target: NodeId,
	default_prevented: Cell<bool>,
}

impl MemoryEvent {
	#[must_use]
	pub fn kind(&self) -> &str {
		&self.kind
	}

	#[must_use]
	pub fn target(&self) -> NodeId {
		self.target
	}

	#[must_use]
	pub fn default_prevented(&self) -> bool {
		self.default_prevented.get()
	}
}

/// A headless document. Clones share the same document.
///
/// Parsed markup keeps character references verbatim and serializes attributes double-quoted, so markup written that
/// way reads back from [`Dom::inner_html`] exactly as it was set.
///
/// Session history moves synchronously: [`Dom::history_go`] notifies pop-state listeners before it returns.
#[derive(Clone)]
pub struct MemoryDom(Rc<RefCell<Document>>);

impl MemoryDom {
	/// An empty document (`<html><head></head><body></body></html>`) at `location`.
	#[must_use]
	pub fn new(location: impl Into<String>) -> Self {
		Self(Rc::new(RefCell::new(Document::new(location.into()))))
	}

	/// A document at `location` whose `body` contains `html`.
	#[must_use]
	pub fn with_body(location: impl Into<String>, html: &str) -> Self {
		let dom = Self::new(location);
		{
			let mut document = dom.0.borrow_mut();
			let body = document.body;
			for node in document.build(markup::parse(html)) {
				document.append(body, node);
			}
		}
		dom
	}

	#[must_use]
	pub fn body(&self) -> NodeId {
		self.0.borrow().body
	}

	#[must_use]
	pub fn head(&self) -> NodeId {
		self.0.borrow().head
	}

	/// A detached element.
	#[must_use]
	pub fn create_element(&self, tag: &str) -> NodeId {
		self.0.borrow_mut().create_element(tag)
	}

	/// Moves `child` to the end of `parent`'s children.
	pub fn append_child(&self, parent: NodeId, child: NodeId) {
		self.0.borrow_mut().append(parent, child);
	}

	pub fn set_attribute(&self, element: NodeId, name: &str, value: &str) {
		if let Some(data) = self.0.borrow_mut().element_mut(element) {
			let name = name.to_ascii_lowercase();
			match data.attributes.iter_mut().find(|(n, _)| *n == name) {
				Some((_, existing)) => *existing = value.to_owned(),
				None => data.attributes.push((name, value.to_owned())),
			}
		}
	}

	pub fn remove_attribute(&self, element: NodeId, name: &str) {
		if let Some(data) = self.0.borrow_mut().element_mut(element) {
			data.attributes.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
		}
	}

	pub fn set_checked(&self, element: NodeId, checked: bool) {
		if let Some(data) = self.0.borrow_mut().element_mut(element) {
			data.checked = Some(checked);
		}
	}

	/// Adds `file` to the selection of a file input.
	pub fn add_file(&self, element: NodeId, file: FileHandle) {
		if let Some(data) = self.0.borrow_mut().element_mut(element) {
			data.files.push(file);
		}
	}

	pub fn focus(&self, element: NodeId) {
		self.0.borrow_mut().focused = Some(element);
	}

	#[must_use]
	pub fn focused(&self) -> Option<NodeId> {
		self.0.borrow().focused
	}

	/// The inline `display` style last set through [`Dom::set_display`].
	#[must_use]
	pub fn display_of(&self, element: NodeId) -> Option<String> {
		self.0.borrow().element(element).and_then(|data| data.display.clone())
	}

	/// Whether `node` is still attached to the document.
	#[must_use]
	pub fn is_connected(&self, node: NodeId) -> bool {
		let document = self.0.borrow();
		let mut cursor = Some(node);
		while let Some(current) = cursor {
			if current == document.root {
				return true;
			}
			cursor = document.nodes.get(current.0).and_then(|node| node.parent);
		}
		false
	}

	/// Dispatches a bubbling `kind` event at `target`: capture listeners from the root down, all listeners on the
	/// target, then bubble listeners back up.
	///
	/// Listeners registered during dispatch don't see the event. Returns whether the default action was prevented.
	pub fn dispatch(&self, target: NodeId, kind: &str) -> bool {
		let event = MemoryEvent { kind: kind.to_owned(), target, default_prevented: Cell::new(false) };
		let listeners = {
			let document = self.0.borrow();
			let mut path = vec![target];
			while let Some(parent) = document.parent_element(path[path.len() - 1]) {
				path.push(parent);
			}

			let mut listeners: Vec<Listener<MemoryEvent>> = Vec::new();
			let mut collect = |node: NodeId, capture: Option<bool>| {
				listeners.extend(
					document
						.listeners
						.iter()
						.filter(|registration| registration.target == node && registration.event == kind && capture.map_or(true, |capture| registration.capture == capture))
						.map(|registration| Rc::clone(&registration.listener)),
				);
			};
			for &node in path[1..].iter().rev() {
				collect(node, Some(true));
			}
			collect(target, None);
			for &node in &path[1..] {
				collect(node, Some(false));
			}
			listeners
		};

		trace!("Dispatching {:?} at {:?} to {} listener(s).", kind, target, listeners.len());
		for listener in listeners {
			listener(&event);
		}
		event.default_prevented()
	}

	/// Dispatches `click`. Returns whether the default action was prevented.
	pub fn click(&self, target: NodeId) -> bool {
		self.dispatch(target, "click")
	}

	/// Dispatches `submit` at a form. Returns whether the default action was prevented.
	pub fn submit(&self, form: NodeId) -> bool {
		self.dispatch(form, "submit")
	}

	/// Delivers a pop-state notification with `state` without moving through session history, as when the platform
	/// reports a pop for the current entry.
	pub fn fire_pop_state(&self, state: Option<Value>) {
		let listeners = self.0.borrow().pop_listeners.clone();
		let span = trace_span!("popstate");
		let _enter = span.enter();
		for listener in listeners {
			listener(state.clone());
		}
	}

	/// Locations in the session history, oldest first.
	#[must_use]
	pub fn session_history(&self) -> Vec<String> {
		self.0.borrow().sessions.iter().map(|(location, _)| location.clone()).collect()
	}

	#[must_use]
	pub fn session_index(&self) -> usize {
		self.0.borrow().session_index
	}

	/// How often [`Dom::reload_page`] was called.
	#[must_use]
	pub fn reload_count(&self) -> usize {
		self.0.borrow().reloads
	}

	#[must_use]
	pub fn listener_count(&self) -> usize {
		self.0.borrow().listeners.len()
	}
}

impl Dom for MemoryDom {
	type Element = NodeId;
	type Event = MemoryEvent;

	fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
		Ok(self.query_selector_all(selector)?.into_iter().next())
	}

	fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
		let document = self.0.borrow();
		document.query_all(document.root, true, selector)
	}

	fn query_selector_in(&self, root: &NodeId, selector: &str) -> Result<Option<NodeId>> {
		Ok(self.query_selector_all_in(root, selector)?.into_iter().next())
	}

	fn query_selector_all_in(&self, root: &NodeId, selector: &str) -> Result<Vec<NodeId>> {
		self.0.borrow().query_all(*root, false, selector)
	}

	fn matches(&self, element: &NodeId, selector: &str) -> Result<bool> {
		let document = self.0.borrow();
		Ok(SelectorList::parse(selector)?.matches(&*document, *element))
	}

	fn parent_element(&self, element: &NodeId) -> Option<NodeId> {
		self.0.borrow().parent_element(*element)
	}

	fn attribute(&self, element: &NodeId, name: &str) -> Option<String> {
		SelectorTree::attribute(&*self.0.borrow(), *element, &name.to_ascii_lowercase()).map(ToOwned::to_owned)
	}

	fn inner_html(&self, element: &NodeId) -> String {
		let mut html = String::new();
		self.0.borrow().serialize_children(*element, &mut html);
		html
	}

	fn set_inner_html(&self, element: &NodeId, html: &str) -> Result<()> {
		let mut document = self.0.borrow_mut();
		if document.element(*element).is_none() {
			return Err(Error::Platform(format!("{:?} is not an element", element)));
		}
		document.clear_children(*element);
		for node in document.build(markup::parse(html)) {
			document.append(*element, node);
		}
		Ok(())
	}

	fn insert_adjacent_html(&self, element: &NodeId, position: Insertion, html: &str) -> Result<()> {
		let mut document = self.0.borrow_mut();
		let nodes = document.build(markup::parse(html));
		let (parent, index) = match position {
			Insertion::AfterBegin => (*element, 0),
			Insertion::BeforeEnd => (*element, document.nodes[element.0].children.len()),
			Insertion::BeforeBegin | Insertion::AfterEnd => {
				let parent = document
					.parent_element(*element)
					.ok_or_else(|| Error::Platform(format!("can't insert {} {:?}: it has no parent", position.as_str(), element)))?;
				let index = document.nodes[parent.0].children.iter().position(|child| child == element).unwrap_or_default();
				(parent, if position == Insertion::AfterEnd { index + 1 } else { index })
			}
		};
		for (offset, node) in nodes.into_iter().enumerate() {
			document.insert(parent, index + offset, node);
		}
		Ok(())
	}

	fn text(&self, element: &NodeId) -> String {
		let mut text = String::new();
		self.0.borrow().text_content(*element, &mut text);
		text
	}

	fn set_text(&self, element: &NodeId, text: &str) {
		let mut document = self.0.borrow_mut();
		document.clear_children(*element);
		if !text.is_empty() {
			let node = document.add(Content::Text(text.to_owned()));
			document.append(*element, node);
		}
	}

	fn value(&self, element: &NodeId) -> Option<String> {
		let document = self.0.borrow();
		let data = document.element(*element)?;
		if let Some(value) = &data.value {
			return Some(value.clone());
		}
		let attribute = |name: &str| SelectorTree::attribute(&*document, *element, name).map(ToOwned::to_owned);
		match data.tag.as_str() {
			"input" => Some(attribute("value").unwrap_or_else(|| {
				match attribute("type").map(|t| t.to_ascii_lowercase()).as_deref() {
					Some("checkbox" | "radio") => "on".to_owned(),
					_ => String::new(),
				}
			})),
			"textarea" => Some(self.text(element)),
			"select" => {
				let options = document.query_all(*element, false, "option").unwrap_or_default();
				let selected = options.iter().find(|&&option| SelectorTree::attribute(&*document, option, "selected").is_some()).or_else(|| options.first());
				Some(selected.map_or_else(String::new, |&option| {
					SelectorTree::attribute(&*document, option, "value").map_or_else(
						|| {
							let mut text = String::new();
							document.text_content(option, &mut text);
							text
						},
						ToOwned::to_owned,
					)
				}))
			}
			_ => None,
		}
	}

	fn set_value(&self, element: &NodeId, value: &str) {
		if let Some(data) = self.0.borrow_mut().element_mut(*element) {
			if matches!(data.tag.as_str(), "input" | "textarea" | "select") {
				data.value = Some(value.to_owned());
			}
		}
	}

	fn is_checked(&self, element: &NodeId) -> bool {
		let document = self.0.borrow();
		document.element(*element).map_or(false, |data| data.checked.unwrap_or_else(|| data.attributes.iter().any(|(name, _)| name == "checked")))
	}

	fn files(&self, element: &NodeId) -> Vec<FileHandle> {
		self.0.borrow().element(*element).map(|data| data.files.clone()).unwrap_or_default()
	}

	fn set_display(&self, element: &NodeId, display: &str) {
		if let Some(data) = self.0.borrow_mut().element_mut(*element) {
			data.display = Some(display.to_owned());
		}
	}

	fn blur(&self, element: &NodeId) {
		let mut document = self.0.borrow_mut();
		if document.focused == Some(*element) {
			document.focused = None;
		}
	}

	fn listen(&self, target: &NodeId, event: &str, use_capture: bool, listener: Listener<MemoryEvent>) -> Result<()> {
		self.0.borrow_mut().listeners.push(Registration { target: *target, event: event.to_owned(), capture: use_capture, listener });
		Ok(())
	}

	fn event_target(&self, event: &MemoryEvent) -> Option<NodeId> {
		Some(event.target)
	}

	fn prevent_default(&self, event: &MemoryEvent) {
		event.default_prevented.set(true);
	}

	fn title(&self) -> String {
		self.0.borrow().title.clone()
	}

	fn set_title(&self, title: &str) {
		self.0.borrow_mut().title = title.to_owned();
	}

	fn location_href(&self) -> String {
		self.0.borrow().location().to_owned()
	}

	fn reload_page(&self) {
		self.0.borrow_mut().reloads += 1;
	}

	fn push_state(&self, state: &Value, _title: &str, url: &str) -> Result<()> {
		let mut document = self.0.borrow_mut();
		let location = Url::parse(document.location())
			.and_then(|base| base.join(url))
			.map_err(|error| Error::Platform(format!("can't push {:?} onto {:?}: {}", url, document.location(), error)))?;
		let index = document.session_index + 1;
		document.sessions.truncate(index);
		document.sessions.push((location.into(), state.clone()));
		document.session_index = index;
		Ok(())
	}

	fn history_go(&self, delta: i32) {
		if delta == 0 {
			return self.reload_page();
		}
		let (state, listeners) = {
			let mut document = self.0.borrow_mut();
			let target = i64::try_from(document.session_index).unwrap_or(i64::MAX).saturating_add(i64::from(delta));
			let Some(index) = usize::try_from(target).ok().filter(|&index| index < document.sessions.len()) else {
				return debug!("history.go({}) leaves the session history; ignored.", delta);
			};
			document.session_index = index;
			debug!("Moved to {:?}.", document.location());
			let state = &document.sessions[index].1;
			((!state.is_null()).then(|| state.clone()), document.pop_listeners.clone())
		};
		let span = trace_span!("popstate");
		let _enter = span.enter();
		for listener in listeners {
			listener(state.clone());
		}
	}

	fn on_pop_state(&self, listener: PopListener) -> Result<()> {
		self.0.borrow_mut().pop_listeners.push(listener);
		Ok(())
	}
}
