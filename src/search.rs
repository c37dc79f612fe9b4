//! Client-side filtering of DOM containers by a named field.

use crate::{
	dash::Dash,
	dom::Dom,
	error::{Error, Result},
	transport::Transport,
};
use core::{
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter},
};
use hashbrown::HashMap;
use regex::RegexBuilder;
use std::rc::Rc;
use tracing::{debug, instrument, trace_span};

/// Per-call search options.
pub struct SearchOptions {
	/// Remember the result per query and reuse it for repeated queries.
	pub cache: bool,
	/// `display` style applied to matching containers.
	pub display: String,
	/// Called with the query when nothing matches.
	pub on_empty: Option<Box<dyn FnOnce(&str)>>,
}

impl Default for SearchOptions {
	fn default() -> Self {
		Self { cache: false, display: "block".to_owned(), on_empty: None }
	}
}

impl Debug for SearchOptions {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("SearchOptions").field("cache", &self.cache).field("display", &self.display).field("on_empty", &self.on_empty.is_some()).finish()
	}
}

impl SearchOptions {
	#[must_use]
	pub fn cache(mut self, cache: bool) -> Self {
		self.cache = cache;
		self
	}

	#[must_use]
	pub fn display(mut self, display: impl Into<String>) -> Self {
		self.display = display.into();
		self
	}

	#[must_use]
	pub fn on_empty(mut self, on_empty: impl FnOnce(&str) + 'static) -> Self {
		self.on_empty = Some(Box::new(on_empty));
		self
	}
}

/// Shows only the containers whose named field matches a query.
pub struct SearchFilter<D: Dom> {
	dom: D,
	cache: Rc<RefCell<HashMap<String, Rc<Vec<D::Element>>>>>,
	scans: Rc<Cell<usize>>,
}

impl<D: Dom> Clone for SearchFilter<D> {
	fn clone(&self) -> Self {
		Self { dom: self.dom.clone(), cache: Rc::clone(&self.cache), scans: Rc::clone(&self.scans) }
	}
}

impl<D: Dom> SearchFilter<D> {
	#[must_use]
	pub fn new(dom: D) -> Self {
		Self { dom, cache: Rc::default(), scans: Rc::default() }
	}

	/// Hides every container matching `container_selector`, then shows those whose `[data-name="{field_name}"]`
	/// descendant's text matches `query` (a case-insensitive regular expression).
	///
	/// Returns the matching containers in document order.
	///
	/// # Errors
	///
	/// - [`Error::Pattern`] iff `query` isn't a valid regular expression. Nothing is hidden in that case.
	/// - [`Error::MissingField`] iff a container lacks the field. Containers after it stay hidden.
	/// - [`Error::Selector`] iff a selector is invalid.
	#[instrument(skip(self, options))]
	pub fn filter(&self, query: &str, container_selector: &str, field_name: &str, options: SearchOptions) -> Result<Rc<Vec<D::Element>>> {
		let SearchOptions { cache, display, on_empty } = options;
		let dom = &self.dom;

		let cached = if cache { self.cache.borrow().get(query).cloned() } else { None };
		let found = if let Some(found) = cached {
			debug!("Reusing {} cached match(es).", found.len());
			for container in dom.query_selector_all(container_selector)? {
				dom.set_display(&container, "none");
			}
			found
		} else {
			let pattern = RegexBuilder::new(query)
				.case_insensitive(true)
				.build()
				.map_err(|error| Error::Pattern { pattern: query.to_owned(), message: error.to_string() })?;

			self.scans.set(self.scans.get() + 1);
			let containers = dom.query_selector_all(container_selector)?;
			for container in &containers {
				dom.set_display(container, "none");
			}

			let field_selector = format!("[data-name={:?}]", field_name);
			let mut found = Vec::new();
			for container in containers {
				let field = dom
					.query_selector_in(&container, &field_selector)?
					.ok_or_else(|| Error::MissingField { field: field_name.to_owned(), container: format!("{:?}", container) })?;
				if pattern.is_match(&dom.text(&field)) {
					found.push(container);
				}
			}

			let found = Rc::new(found);
			if cache {
				self.cache.borrow_mut().insert(query.to_owned(), Rc::clone(&found));
			}
			found
		};

		for container in found.iter() {
			dom.set_display(container, &display);
		}

		if found.is_empty() {
			if let Some(on_empty) = on_empty {
				let span = trace_span!("on_empty");
				let _enter = span.enter();
				on_empty(query);
			}
		}
		Ok(found)
	}

	/// How many times containers were actually scanned, as opposed to served from the cache.
	#[must_use]
	pub fn scan_count(&self) -> usize {
		self.scans.get()
	}

	pub fn clear_cache(&self) {
		self.cache.borrow_mut().clear();
	}
}

impl<D: Dom, T: Transport> Dash<D, T> {
	/// [`SearchFilter::filter`] with this dashboard's filter and cache.
	///
	/// # Errors
	///
	/// See [`SearchFilter::filter`].
	pub fn search(&self, query: &str, container_selector: &str, field_name: &str, options: SearchOptions) -> Result<Rc<Vec<D::Element>>> {
		self.search_filter().filter(query, container_selector, field_name, options)
	}
}
