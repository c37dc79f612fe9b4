//! The document capability every component is built on.
//!
//! Components never reach for a global document. They are handed a [`Dom`] implementation instead, which is
//! [`WebDom`](`crate::web::WebDom`) in the browser and [`MemoryDom`](`crate::memory::MemoryDom`) in headless tests.

use crate::error::Result;
use core::{any::Any, fmt::Debug};
use serde_json::Value;
use std::rc::Rc;

/// Position for [`Dom::insert_adjacent_html`], after [***insertAdjacentHTML***](https://developer.mozilla.org/en-US/docs/Web/API/Element/insertAdjacentHTML).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
	BeforeBegin,
	AfterBegin,
	BeforeEnd,
	AfterEnd,
}

impl Insertion {
	#[must_use]
	pub fn as_str(self) -> &'static str {
		match self {
			Insertion::BeforeBegin => "beforebegin",
			Insertion::AfterBegin => "afterbegin",
			Insertion::BeforeEnd => "beforeend",
			Insertion::AfterEnd => "afterend",
		}
	}
}

/// A file selected in a file input.
///
/// `raw` holds the platform's own file object (a [`web_sys::File`] in the browser), which transports downcast when
/// building a multipart body.
#[derive(Clone)]
pub struct FileHandle {
	pub name: String,
	pub mime: String,
	pub size: f64,
	pub raw: Rc<dyn Any>,
}

impl FileHandle {
	#[must_use]
	pub fn new(name: impl Into<String>, mime: impl Into<String>, size: f64, raw: Rc<dyn Any>) -> Self {
		Self { name: name.into(), mime: mime.into(), size, raw }
	}
}

impl Debug for FileHandle {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("FileHandle").field("name", &self.name).field("mime", &self.mime).field("size", &self.size).finish_non_exhaustive()
	}
}

impl PartialEq for FileHandle {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.raw, &other.raw)
	}
}

/// Event listener as stored by a [`Dom`].
pub type Listener<Ev> = Rc<dyn Fn(&Ev)>;

/// Pop-state listener. Receives the state object of the entry that became current, if any.
pub type PopListener = Rc<dyn Fn(Option<Value>)>;

/// Access to a document, its window-level session history and its event system.
///
/// Implementations are cheap handles (`Clone`) onto shared platform state.
pub trait Dom: Clone + 'static {
	type Element: Clone + PartialEq + Debug + 'static;
	type Event: 'static;

	/// First element in the document matching `selector`.
	///
	/// # Errors
	///
	/// Iff `selector` is invalid.
	fn query_selector(&self, selector: &str) -> Result<Option<Self::Element>>;

	/// All elements in the document matching `selector`, in document order.
	///
	/// # Errors
	///
	/// Iff `selector` is invalid.
	fn query_selector_all(&self, selector: &str) -> Result<Vec<Self::Element>>;

	/// First descendant of `root` matching `selector`.
	///
	/// # Errors
	///
	/// Iff `selector` is invalid.
	fn query_selector_in(&self, root: &Self::Element, selector: &str) -> Result<Option<Self::Element>>;

	/// All descendants of `root` matching `selector`, in document order.
	///
	/// # Errors
	///
	/// Iff `selector` is invalid.
	fn query_selector_all_in(&self, root: &Self::Element, selector: &str) -> Result<Vec<Self::Element>>;

	/// # Errors
	///
	/// Iff `selector` is invalid.
	fn matches(&self, element: &Self::Element, selector: &str) -> Result<bool>;

	fn parent_element(&self, element: &Self::Element) -> Option<Self::Element>;

	fn attribute(&self, element: &Self::Element, name: &str) -> Option<String>;

	fn inner_html(&self, element: &Self::Element) -> String;

	/// # Errors
	///
	/// Iff the platform rejects the markup.
	fn set_inner_html(&self, element: &Self::Element, html: &str) -> Result<()>;

	/// # Errors
	///
	/// Iff the platform rejects the markup or the position.
	fn insert_adjacent_html(&self, element: &Self::Element, position: Insertion, html: &str) -> Result<()>;

	/// Rendered text of `element` (***innerText*** where available).
	fn text(&self, element: &Self::Element) -> String;

	fn set_text(&self, element: &Self::Element, text: &str);

	/// Current value of a form control, or [`None`] if `element` is not one.
	fn value(&self, element: &Self::Element) -> Option<String>;

	/// Sets the value of a form control. Ignored for other elements.
	fn set_value(&self, element: &Self::Element, value: &str);

	fn is_checked(&self, element: &Self::Element) -> bool;

	/// Files currently selected in a file input. Empty for other elements.
	fn files(&self, element: &Self::Element) -> Vec<FileHandle>;

	/// Sets the element's inline `display` style.
	fn set_display(&self, element: &Self::Element, display: &str);

	fn blur(&self, element: &Self::Element);

	/// Registers `listener` for `event` on `target`. The registration lives as long as the document.
	///
	/// # Errors
	///
	/// Iff the platform refuses the registration.
	fn listen(&self, target: &Self::Element, event: &str, use_capture: bool, listener: Listener<Self::Event>) -> Result<()>;

	/// The element an event was originally dispatched to, or the closest element containing it.
	fn event_target(&self, event: &Self::Event) -> Option<Self::Element>;

	fn prevent_default(&self, event: &Self::Event);

	fn title(&self) -> String;

	fn set_title(&self, title: &str);

	fn location_href(&self) -> String;

	/// Reloads the whole page.
	fn reload_page(&self);

	/// Pushes a session history entry, which also moves the current location to `url`.
	///
	/// # Errors
	///
	/// Iff the platform rejects the state or URL.
	fn push_state(&self, state: &Value, title: &str, url: &str) -> Result<()>;

	/// Moves through session history by `delta` entries. A pop-state notification follows asynchronously in browsers.
	fn history_go(&self, delta: i32);

	/// Registers a listener for back/forward navigation.
	///
	/// # Errors
	///
	/// Iff the platform refuses the registration.
	fn on_pop_state(&self, listener: PopListener) -> Result<()>;
}
