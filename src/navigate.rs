//! View navigation: fetching markup for a view and swapping it into the content container.

use crate::{
	dash::Dash,
	dom::{Dom, Insertion},
	error::{Error, Result},
	payload::{Body, Payload},
	request::{Failure, RequestHandle, RequestOptions},
	transport::{Method, Transport},
};
use core::fmt::{self, Debug, Formatter};
use hashbrown::HashMap;
use serde_json::json;
use tracing::{debug, error, instrument, trace_span, warn};

/// A navigable view, discovered from an element matching [`Config::view_selector`](`crate::Config::view_selector`).
#[derive(Debug, Clone, PartialEq)]
pub struct ViewDescriptor<E> {
	/// `data-name`.
	pub name: String,
	/// `data-href`.
	pub href: String,
	pub anchor: E,
}

/// What to navigate to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewTarget {
	/// Position in the discovered views.
	Index(usize),
	/// A view name, or a literal URL if no view has that name.
	Name(String),
}

impl ViewTarget {
	/// The URL used when the target resolves to no view.
	#[must_use]
	pub fn literal_url(&self) -> String {
		match self {
			ViewTarget::Index(index) => index.to_string(),
			ViewTarget::Name(name) => name.clone(),
		}
	}
}

impl From<usize> for ViewTarget {
	fn from(index: usize) -> Self {
		ViewTarget::Index(index)
	}
}

impl From<&str> for ViewTarget {
	fn from(name: &str) -> Self {
		ViewTarget::Name(name.to_owned())
	}
}

impl From<String> for ViewTarget {
	fn from(name: String) -> Self {
		ViewTarget::Name(name)
	}
}

/// Lifecycle of the most recent navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
	#[default]
	Idle,
	Requesting,
	Rendering,
	Rendered,
	Failed,
}

/// The one tracked "current" view.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationState<E> {
	pub last_view_url: Option<String>,
	/// [`None`] if the last navigation went to a literal URL.
	pub last_view_name: Option<String>,
	pub last_view_anchor: Option<E>,
	/// View name (or literal URL) of the last navigation that rendered. [`Dash::reload_content`] replays it.
	pub last_rendered: Option<String>,
	pub phase: Phase,
	/// Incremented by each navigation. Responses to older generations are stale.
	pub generation: u64,
}

impl<E> Default for NavigationState<E> {
	fn default() -> Self {
		Self { last_view_url: None, last_view_name: None, last_view_anchor: None, last_rendered: None, phase: Phase::Idle, generation: 0 }
	}
}

/// Per-call navigation options.
pub struct NavigateOptions<E> {
	/// Encoded into the view URL's query string.
	pub data: Payload,
	/// Render target. Defaults to the element matching [`Config::content`](`crate::Config::content`).
	pub container: Option<E>,
	/// Whether to call the after-render hook.
	pub render_hook: bool,
	/// Overrides [`Config::history`](`crate::Config::history`) for this navigation.
	pub history: Option<bool>,
	pub headers: HashMap<String, String>,
	/// Called with the response body after rendering.
	pub on_success: Option<Box<dyn FnOnce(&Body)>>,
	/// Called if the request fails. Failures are logged either way.
	pub on_error: Option<Box<dyn FnOnce(&Failure)>>,
}

impl<E> Default for NavigateOptions<E> {
	fn default() -> Self {
		Self { data: Payload::Empty, container: None, render_hook: true, history: None, headers: HashMap::new(), on_success: None, on_error: None }
	}
}

impl<E: Debug> Debug for NavigateOptions<E> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("NavigateOptions")
			.field("data", &self.data)
			.field("container", &self.container)
			.field("render_hook", &self.render_hook)
			.field("history", &self.history)
			.field("headers", &self.headers)
			.field("on_success", &self.on_success.is_some())
			.field("on_error", &self.on_error.is_some())
			.finish()
	}
}

impl<E> NavigateOptions<E> {
	#[must_use]
	pub fn data(mut self, data: impl Into<Payload>) -> Self {
		self.data = data.into();
		self
	}

	#[must_use]
	pub fn container(mut self, container: E) -> Self {
		self.container = Some(container);
		self
	}

	#[must_use]
	pub fn render_hook(mut self, render_hook: bool) -> Self {
		self.render_hook = render_hook;
		self
	}

	#[must_use]
	pub fn history(mut self, history: bool) -> Self {
		self.history = Some(history);
		self
	}

	#[must_use]
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into(), value.into());
		self
	}

	#[must_use]
	pub fn on_success(mut self, on_success: impl FnOnce(&Body) + 'static) -> Self {
		self.on_success = Some(Box::new(on_success));
		self
	}

	#[must_use]
	pub fn on_error(mut self, on_error: impl FnOnce(&Failure) + 'static) -> Self {
		self.on_error = Some(Box::new(on_error));
		self
	}
}

/// Everything the render step needs once the response arrives.
struct PendingView<E> {
	generation: u64,
	view_name: Option<String>,
	url: String,
	push_history: bool,
	container: Option<E>,
	render_hook: bool,
	on_success: Option<Box<dyn FnOnce(&Body)>>,
}

impl<D: Dom, T: Transport> Dash<D, T> {
	/// Re-reads the view anchors from the document. Returns how many were found.
	///
	/// Anchors without `data-name` or `data-href` are skipped.
	///
	/// # Errors
	///
	/// Iff the configured view selector is invalid.
	pub fn discover_views(&self) -> Result<usize> {
		let dom = self.dom();
		let views: Vec<_> = dom
			.query_selector_all(&self.config().view_selector)?
			.into_iter()
			.filter_map(|anchor| {
				let name = dom.attribute(&anchor, "data-name");
				let href = dom.attribute(&anchor, "data-href");
				match (name, href) {
					(Some(name), Some(href)) => Some(ViewDescriptor { name, href, anchor }),
					_ => {
						debug!("Skipping incomplete view anchor {:?}.", anchor);
						None
					}
				}
			})
			.collect();
		let count = views.len();
		*self.inner.views.borrow_mut() = views;
		Ok(count)
	}

	#[must_use]
	pub fn views(&self) -> Vec<ViewDescriptor<D::Element>> {
		self.inner.views.borrow().clone()
	}

	/// The view `target` refers to, if any.
	#[must_use]
	pub fn resolve_view(&self, target: &ViewTarget) -> Option<ViewDescriptor<D::Element>> {
		let views = self.inner.views.borrow();
		match target {
			ViewTarget::Index(index) => views.get(*index).cloned(),
			// The last match wins, as with repeated anchors for the same view.
			ViewTarget::Name(name) => views.iter().rev().find(|view| &view.name == name).cloned(),
		}
	}

	/// Fetches a view and swaps it into the container.
	///
	/// `target` is resolved against the discovered views, falling back to a literal URL. Only the latest navigation
	/// renders: responses to navigations that were superseded before their response arrived are dropped.
	///
	/// Nothing is returned into the caller's flow on failure. Failures are logged and passed to `options.on_error`.
	#[instrument(skip(self, options))]
	pub fn navigate(&self, target: impl Into<ViewTarget> + Debug, options: NavigateOptions<D::Element>) -> RequestHandle {
		let target = target.into();
		let view = self.resolve_view(&target);
		let url = view.as_ref().map_or_else(|| target.literal_url(), |view| view.href.clone());
		if view.is_none() {
			debug!("{:?} doesn't name a view; requesting it as a URL.", target);
		}

		let generation = {
			let mut state = self.inner.state.borrow_mut();
			state.generation += 1;
			state.phase = Phase::Requesting;
			state.last_view_url = Some(url.clone());
			state.last_view_name = view.as_ref().map(|view| view.name.clone());
			state.last_view_anchor = view.as_ref().map(|view| view.anchor.clone());
			state.generation
		};

		let NavigateOptions { data, container, render_hook, history, headers, on_success, on_error } = options;
		let pending = PendingView {
			generation,
			push_history: view.is_some() && history.unwrap_or(self.config().history),
			view_name: view.map(|view| view.name),
			url: url.clone(),
			container,
			render_hook,
			on_success,
		};

		let mut request = RequestOptions::new(Method::Get).view_request();
		request.headers = headers;
		let on_render = self.clone();
		let on_failure = self.clone();
		self.request(
			&url,
			data,
			request.on_success(move |body| on_render.render_view(pending, &body)).on_error(move |failure| {
				if on_failure.is_stale(generation) {
					return debug!("Dropping failure of superseded navigation #{}: {:?}", generation, failure);
				}
				on_failure.inner.state.borrow_mut().phase = Phase::Failed;
				error!("View request failed: {:?}", failure);
				if let Some(on_error) = on_error {
					on_error(&failure);
				}
			}),
		)
	}

	fn is_stale(&self, generation: u64) -> bool {
		self.inner.state.borrow().generation != generation
	}

	fn render_view(&self, pending: PendingView<D::Element>, body: &Body) {
		let PendingView { generation, view_name, url, push_history, container, render_hook, on_success } = pending;
		if self.is_stale(generation) {
			return debug!("Dropping response of superseded navigation #{}.", generation);
		}
		self.inner.state.borrow_mut().phase = Phase::Rendering;

		let container = match self.render_into(container, body) {
			Ok(container) => container,
			Err(error) => {
				self.inner.state.borrow_mut().phase = Phase::Failed;
				return error!("Can't render view {:?}: {}", view_name, error);
			}
		};
		if let Err(error) = self.discover_views() {
			warn!("Can't rediscover views after rendering: {}", error);
		}
		{
			let mut state = self.inner.state.borrow_mut();
			state.phase = Phase::Rendered;
			state.last_rendered = Some(view_name.clone().unwrap_or(url));
		}

		if render_hook {
			let hook = self.inner.hooks.borrow().after_render.clone();
			if let Some(hook) = hook {
				let span = trace_span!("after_render");
				let _enter = span.enter();
				hook(view_name.as_deref(), body, &container);
			}
		}

		if let (Some(view_name), true) = (&view_name, push_history) {
			if let Err(error) = self.push_view_history(view_name) {
				error!("Can't push history entry for view {:?}: {}", view_name, error);
			}
		}

		if let Some(on_success) = on_success {
			on_success(body);
		}
	}

	/// Clears the container, then inserts the markup at its start.
	fn render_into(&self, container: Option<D::Element>, body: &Body) -> Result<D::Element> {
		let dom = self.dom();
		let container = match container {
			Some(container) => container,
			None => dom
				.query_selector(&self.config().content)?
				.ok_or_else(|| Error::Config(format!("content container {:?} not found", self.config().content)))?,
		};
		dom.set_inner_html(&container, "")?;
		dom.insert_adjacent_html(&container, Insertion::AfterBegin, &body.to_markup())?;
		Ok(container)
	}

	fn push_view_history(&self, view_name: &str) -> Result<()> {
		let (app_url, app_title) = (self.app_url(), self.app_title());
		let url = if app_url.is_empty() {
			view_name.to_owned()
		} else if app_url.ends_with('/') {
			format!("{app_url}{view_name}")
		} else {
			format!("{app_url}/{view_name}")
		}
		.to_lowercase();
		let title = format!("{app_title} | {view_name}");
		let state = json!({ "view": view_name, "title": title });

		let weak = self.downgrade();
		let stored = view_name.to_owned();
		self.history().push(state, Some(&title), &url, move |_| {
			if let Some(dash) = weak.upgrade() {
				dash.navigate(ViewTarget::Name(stored.clone()), NavigateOptions::default().history(false));
			}
		})
	}

	/// Replays the last navigation that rendered, without pushing history. Returns [`None`] if nothing rendered yet.
	pub fn reload_content(&self) -> Option<RequestHandle> {
		let target = self.inner.state.borrow().last_rendered.clone();
		match target {
			Some(target) => Some(self.navigate(ViewTarget::Name(target), NavigateOptions::default().history(false))),
			None => {
				debug!("No view rendered yet; nothing to reload.");
				None
			}
		}
	}

	/// [`Dash::reload_content`] if [`Config::auto_reload`](`crate::Config::auto_reload`) is set.
	pub fn reload_if_auto_reload(&self) -> Option<RequestHandle> {
		if self.config().auto_reload {
			self.reload_content()
		} else {
			None
		}
	}
}
