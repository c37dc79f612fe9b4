//! Browser implementations of the platform capabilities, on top of [`web_sys`].

mod registry;
mod xhr;

pub use xhr::XhrTransport;

use crate::{
	dom::{Dom, FileHandle, Insertion, Listener, PopListener},
	error::{Error, Result},
};
use core::cell::RefCell;
use serde_json::Value;
use std::rc::Rc;
use tracing::{error, instrument, trace, trace_span, warn};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{AddEventListenerOptions, Document, Element, Event, HtmlElement, HtmlInputElement, HtmlSelectElement, HtmlTextAreaElement, Node, PopStateEvent, Window};

pub(crate) fn platform_error(error: &JsValue) -> Error {
	Error::Platform(format!("{:?}", error))
}

struct Inner {
	window: Window,
	document: Document,
	/// Listener closures live as long as the document handle.
	closures: RefCell<Vec<Closure<dyn Fn(Event)>>>,
	listener_options_cache: RefCell<[Option<AddEventListenerOptions>; 2]>,
}

/// The browser document of the current window. Clones share their listener registrations.
///
/// Listeners registered through [`Dom::listen`] and [`Dom::on_pop_state`] stay registered until the last clone is
/// dropped, after which the browser throws if they are still triggered.
#[derive(Clone)]
pub struct WebDom(Rc<Inner>);

impl WebDom {
	/// # Errors
	///
	/// Iff there is no global `window` or it has no `document`.
	pub fn new() -> Result<Self> {
		let window = web_sys::window().ok_or_else(|| Error::Platform("no global `window`".to_owned()))?;
		let document = window.document().ok_or_else(|| Error::Platform("`window` has no `document`".to_owned()))?;
		Ok(Self::from_parts(window, document))
	}

	#[must_use]
	pub fn from_parts(window: Window, document: Document) -> Self {
		Self(Rc::new(Inner { window, document, closures: RefCell::default(), listener_options_cache: RefCell::default() }))
	}

	#[must_use]
	pub fn window(&self) -> &Window {
		&self.0.window
	}

	#[must_use]
	pub fn document(&self) -> &Document {
		&self.0.document
	}

	fn listener_options(&self, capture: bool) -> AddEventListenerOptions {
		let mut cache = self.0.listener_options_cache.borrow_mut();
		cache[usize::from(capture)]
			.get_or_insert_with(|| {
				let options = AddEventListenerOptions::new();
				options.set_capture(capture);
				options
			})
			.clone()
	}

	fn add_listener(&self, target: &web_sys::EventTarget, event: &str, capture: bool, closure: Closure<dyn Fn(Event)>) -> Result<()> {
		target
			.add_event_listener_with_callback_and_add_event_listener_options(event, closure.as_ref().unchecked_ref(), &self.listener_options(capture))
			.map_err(|error| platform_error(&error))?;
		self.0.closures.borrow_mut().push(closure);
		Ok(())
	}
}

fn collect_elements(list: &web_sys::NodeList) -> Vec<Element> {
	(0..list.length()).filter_map(|i| list.get(i)).filter_map(|node| node.dyn_into::<Element>().ok()).collect()
}

impl Dom for WebDom {
	type Element = Element;
	type Event = Event;

	fn query_selector(&self, selector: &str) -> Result<Option<Element>> {
		self.0.document.query_selector(selector).map_err(|error| platform_error(&error))
	}

	fn query_selector_all(&self, selector: &str) -> Result<Vec<Element>> {
		Ok(collect_elements(&self.0.document.query_selector_all(selector).map_err(|error| platform_error(&error))?))
	}

	fn query_selector_in(&self, root: &Element, selector: &str) -> Result<Option<Element>> {
		root.query_selector(selector).map_err(|error| platform_error(&error))
	}

	fn query_selector_all_in(&self, root: &Element, selector: &str) -> Result<Vec<Element>> {
		Ok(collect_elements(&root.query_selector_all(selector).map_err(|error| platform_error(&error))?))
	}

	fn matches(&self, element: &Element, selector: &str) -> Result<bool> {
		element.matches(selector).map_err(|error| platform_error(&error))
	}

	fn parent_element(&self, element: &Element) -> Option<Element> {
		element.parent_element()
	}

	fn attribute(&self, element: &Element, name: &str) -> Option<String> {
		element.get_attribute(name)
	}

	fn inner_html(&self, element: &Element) -> String {
		element.inner_html()
	}

	fn set_inner_html(&self, element: &Element, html: &str) -> Result<()> {
		element.set_inner_html(html);
		Ok(())
	}

	fn insert_adjacent_html(&self, element: &Element, position: Insertion, html: &str) -> Result<()> {
		element.insert_adjacent_html(position.as_str(), html).map_err(|error| platform_error(&error))
	}

	fn text(&self, element: &Element) -> String {
		match element.dyn_ref::<HtmlElement>() {
			Some(element) => element.inner_text(),
			None => element.text_content().unwrap_or_default(),
		}
	}

	fn set_text(&self, element: &Element, text: &str) {
		element.set_text_content(Some(text));
	}

	fn value(&self, element: &Element) -> Option<String> {
		if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
			Some(input.value())
		} else if let Some(text_area) = element.dyn_ref::<HtmlTextAreaElement>() {
			Some(text_area.value())
		} else {
			element.dyn_ref::<HtmlSelectElement>().map(HtmlSelectElement::value)
		}
	}

	fn set_value(&self, element: &Element, value: &str) {
		if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
			input.set_value(value);
		} else if let Some(text_area) = element.dyn_ref::<HtmlTextAreaElement>() {
			text_area.set_value(value);
		} else if let Some(select) = element.dyn_ref::<HtmlSelectElement>() {
			select.set_value(value);
		}
	}

	fn is_checked(&self, element: &Element) -> bool {
		element.dyn_ref::<HtmlInputElement>().map_or(false, HtmlInputElement::checked)
	}

	fn files(&self, element: &Element) -> Vec<FileHandle> {
		let Some(files) = element.dyn_ref::<HtmlInputElement>().and_then(HtmlInputElement::files) else { return Vec::new() };
		(0..files.length())
			.filter_map(|i| files.get(i))
			.map(|file| FileHandle::new(file.name(), file.type_(), file.size(), Rc::new(file)))
			.collect()
	}

	fn set_display(&self, element: &Element, value: &str) {
		match element.dyn_ref::<HtmlElement>() {
			Some(element) => {
				if let Err(error) = element.style().set_property("display", value) {
					error!("Failed to set display {:?}: {:?}", value, error);
				}
			}
			None => warn!("Can't set display of non-HTML element {:?}.", element),
		}
	}

	fn blur(&self, element: &Element) {
		if let Some(element) = element.dyn_ref::<HtmlElement>() {
			if let Err(error) = element.blur() {
				error!("Failed to blur {:?}: {:?}", element, error);
			}
		}
	}

	#[instrument(skip(self, listener))]
	fn listen(&self, target: &Element, event: &str, use_capture: bool, listener: Listener<Event>) -> Result<()> {
		let name = event.to_owned();
		let closure = Closure::wrap(Box::new(move |event: Event| {
			let span = trace_span!("listener", event = name.as_str());
			let _enter = span.enter();
			listener(&event);
		}) as Box<dyn Fn(Event)>);
		self.add_listener(target, event, use_capture, closure)
	}

	fn event_target(&self, event: &Event) -> Option<Element> {
		let target = event.target()?;
		match target.dyn_into::<Element>() {
			Ok(element) => Some(element),
			Err(target) => target.dyn_ref::<Node>().and_then(Node::parent_element),
		}
	}

	fn prevent_default(&self, event: &Event) {
		event.prevent_default();
	}

	fn title(&self) -> String {
		self.0.document.title()
	}

	fn set_title(&self, title: &str) {
		self.0.document.set_title(title);
	}

	fn location_href(&self) -> String {
		self.0.window.location().href().unwrap_or_else(|error| {
			error!("Can't read location: {:?}", error);
			String::new()
		})
	}

	fn reload_page(&self) {
		if let Err(error) = self.0.window.location().reload() {
			error!("Failed to reload: {:?}", error);
		}
	}

	#[instrument(skip(self, state))]
	fn push_state(&self, state: &Value, title: &str, url: &str) -> Result<()> {
		let state = js_sys::JSON::parse(&state.to_string()).map_err(|error| platform_error(&error))?;
		let history = self.0.window.history().map_err(|error| platform_error(&error))?;
		history.push_state_with_url(&state, title, Some(url)).map_err(|error| platform_error(&error))
	}

	fn history_go(&self, delta: i32) {
		if let Err(error) = self.0.window.history().and_then(|history| history.go_with_delta(delta)) {
			error!("history.go({}) failed: {:?}", delta, error);
		}
	}

	fn on_pop_state(&self, listener: PopListener) -> Result<()> {
		let closure = Closure::wrap(Box::new(move |event: Event| {
			let state = event.dyn_ref::<PopStateEvent>().map(PopStateEvent::state).filter(|state| !state.is_null() && !state.is_undefined());
			let state = state.and_then(|state| match js_sys::JSON::stringify(&state) {
				Ok(json) => serde_json::from_str::<Value>(&String::from(json)).map_err(|error| error!("Unreadable history state: {}", error)).ok(),
				Err(error) => {
					error!("Can't stringify history state: {:?}", error);
					None
				}
			});
			trace!("popstate with state {:?}", state);
			listener(state);
		}) as Box<dyn Fn(Event)>);
		self.add_listener(&self.0.window, "popstate", false, closure)
	}
}
