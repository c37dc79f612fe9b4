use crate::{
	config::Config,
	delegate::delegate,
	dom::Dom,
	error::Result,
	history::HistoryTracker,
	navigate::{NavigateOptions, NavigationState, Phase, ViewDescriptor, ViewTarget},
	payload::Body,
	search::SearchFilter,
	transport::{Progress, Transport},
};
use core::cell::{Cell, RefCell};
use hashbrown::HashMap;
use std::rc::{Rc, Weak};
use tracing::{debug, instrument, trace_span, warn};

/// Handler registered under a `data-action` name.
pub type Action<D, T> = Rc<dyn Fn(&Dash<D, T>, &<D as Dom>::Element, &<D as Dom>::Event)>;

type AfterRender<E> = Rc<dyn Fn(Option<&str>, &Body, &E)>;
type ViewProgress<E> = Rc<dyn Fn(Progress, Option<&E>)>;

pub(crate) struct Hooks<E> {
	pub(crate) after_render: Option<AfterRender<E>>,
	pub(crate) view_progress: Option<ViewProgress<E>>,
	pub(crate) request_progress: Option<Rc<dyn Fn(Progress)>>,
	pub(crate) response: Option<Rc<dyn Fn(&Body)>>,
}

impl<E> Default for Hooks<E> {
	fn default() -> Self {
		Self { after_render: None, view_progress: None, request_progress: None, response: None }
	}
}

#[derive(Debug, Default)]
pub(crate) struct AppInfo {
	pub(crate) title: String,
	pub(crate) url: String,
}

pub(crate) struct Inner<D: Dom, T: Transport> {
	pub(crate) config: Config,
	pub(crate) dom: D,
	pub(crate) transport: T,
	pub(crate) state: RefCell<NavigationState<D::Element>>,
	pub(crate) views: RefCell<Vec<ViewDescriptor<D::Element>>>,
	pub(crate) history: HistoryTracker<D>,
	pub(crate) search: SearchFilter<D>,
	pub(crate) hooks: RefCell<Hooks<D::Element>>,
	pub(crate) actions: RefCell<HashMap<String, Action<D, T>>>,
	pub(crate) last_action: RefCell<Option<D::Element>>,
	pub(crate) app: RefCell<AppInfo>,
	pub(crate) next_request_id: Cell<u64>,
}

/// The dashboard context: configuration, navigation state and the injected platform capabilities.
///
/// `Dash` is a cheap handle. Clones share all state, and every component reaches the document and the network only
/// through the [`Dom`] and [`Transport`] it was constructed with.
///
/// Nothing is bound to the document until [`Dash::init`] is called.
pub struct Dash<D: Dom, T: Transport> {
	pub(crate) inner: Rc<Inner<D, T>>,
}

impl<D: Dom, T: Transport> Clone for Dash<D, T> {
	fn clone(&self) -> Self {
		Self { inner: Rc::clone(&self.inner) }
	}
}

/// A [`Dash`] handle that doesn't keep the context alive. Used by closures the platform stores.
pub struct WeakDash<D: Dom, T: Transport>(Weak<Inner<D, T>>);

impl<D: Dom, T: Transport> Clone for WeakDash<D, T> {
	fn clone(&self) -> Self {
		Self(Weak::clone(&self.0))
	}
}

impl<D: Dom, T: Transport> WeakDash<D, T> {
	#[must_use]
	pub fn upgrade(&self) -> Option<Dash<D, T>> {
		self.0.upgrade().map(|inner| Dash { inner })
	}
}

impl<D: Dom, T: Transport> Dash<D, T> {
	#[must_use]
	pub fn new(config: Config, dom: D, transport: T) -> Self {
		Self {
			inner: Rc::new(Inner {
				config: config.normalized(),
				history: HistoryTracker::new(dom.clone()),
				search: SearchFilter::new(dom.clone()),
				dom,
				transport,
				state: RefCell::new(NavigationState::default()),
				views: RefCell::new(Vec::new()),
				hooks: RefCell::new(Hooks::default()),
				actions: RefCell::new(HashMap::new()),
				last_action: RefCell::new(None),
				app: RefCell::new(AppInfo::default()),
				next_request_id: Cell::new(0),
			}),
		}
	}

	#[must_use]
	pub fn downgrade(&self) -> WeakDash<D, T> {
		WeakDash(Rc::downgrade(&self.inner))
	}

	#[must_use]
	pub fn config(&self) -> &Config {
		&self.inner.config
	}

	#[must_use]
	pub fn dom(&self) -> &D {
		&self.inner.dom
	}

	#[must_use]
	pub fn transport(&self) -> &T {
		&self.inner.transport
	}

	#[must_use]
	pub fn history(&self) -> &HistoryTracker<D> {
		&self.inner.history
	}

	#[must_use]
	pub fn search_filter(&self) -> &SearchFilter<D> {
		&self.inner.search
	}

	/// Snapshot of the navigation state.
	#[must_use]
	pub fn navigation_state(&self) -> NavigationState<D::Element> {
		self.inner.state.borrow().clone()
	}

	#[must_use]
	pub fn phase(&self) -> Phase {
		self.inner.state.borrow().phase
	}

	/// The element whose `data-action` was triggered last.
	#[must_use]
	pub fn last_action_element(&self) -> Option<D::Element> {
		self.inner.last_action.borrow().clone()
	}

	/// Document title recorded by [`Dash::init`].
	#[must_use]
	pub fn app_title(&self) -> String {
		self.inner.app.borrow().title.clone()
	}

	/// Application URL recorded by [`Dash::init`].
	#[must_use]
	pub fn app_url(&self) -> String {
		self.inner.app.borrow().url.clone()
	}

	/// Called after a view's markup was rendered, with `(view_name, body, container)`.
	///
	/// `view_name` is [`None`] for navigations to literal URLs.
	pub fn set_after_render(&self, hook: impl Fn(Option<&str>, &Body, &D::Element) + 'static) {
		self.inner.hooks.borrow_mut().after_render = Some(Rc::new(hook));
	}

	/// Called on download progress of view requests, with the anchor of the view being fetched.
	pub fn set_view_progress(&self, hook: impl Fn(Progress, Option<&D::Element>) + 'static) {
		self.inner.hooks.borrow_mut().view_progress = Some(Rc::new(hook));
	}

	/// Called on download progress of all other requests.
	pub fn set_request_progress(&self, hook: impl Fn(Progress) + 'static) {
		self.inner.hooks.borrow_mut().request_progress = Some(Rc::new(hook));
	}

	/// Called with the body of every non-view request that received a response, after its own continuation.
	pub fn set_response_hook(&self, hook: impl Fn(&Body) + 'static) {
		self.inner.hooks.borrow_mut().response = Some(Rc::new(hook));
	}

	/// Registers the handler for elements carrying `data-action="{name}"`. Replaces any previous handler of that name.
	pub fn register_action(&self, name: impl Into<String>, action: impl Fn(&Self, &D::Element, &D::Event) + 'static) {
		self.inner.actions.borrow_mut().insert(name.into(), Rc::new(action));
	}

	/// Binds the dashboard to the document.
	///
	/// Records the application title and URL, discovers view anchors, binds the reload trigger, delegates view anchor
	/// and `data-action` clicks from `body`, starts listening for session history pops and, if so configured, navigates
	/// to the first view.
	///
	/// # Errors
	///
	/// Iff one of the bindings can't be made, for example because the document has no `body`.
	#[instrument(skip(self))]
	pub fn init(&self) -> Result<()> {
		let dom = self.dom();
		{
			let mut app = self.inner.app.borrow_mut();
			app.title = dom.title();
			app.url = self.config().app_url.clone().unwrap_or_else(|| dom.location_href());
		}

		let view_count = self.discover_views()?;
		debug!("Discovered {} view anchor(s).", view_count);

		if let Some(trigger) = dom.query_selector(&self.config().reload_selector)? {
			let weak = self.downgrade();
			dom.listen(
				&trigger,
				"click",
				false,
				Rc::new(move |_: &D::Event| {
					if let Some(dash) = weak.upgrade() {
						dash.reload();
					}
				}),
			)?;
		}

		self.bind_view_anchors()?;
		self.bind_actions()?;
		self.history().listen()?;

		if self.config().trigger_initial_view_fetch {
			if view_count == 0 {
				warn!("View selector {:?} does not match any element; skipping the initial view fetch.", self.config().view_selector);
			} else {
				self.navigate(ViewTarget::Index(0), NavigateOptions::default());
			}
		}
		Ok(())
	}

	fn bind_view_anchors(&self) -> Result<()> {
		let weak = self.downgrade();
		let dom = self.dom().clone();
		delegate(
			self.dom(),
			"click",
			"body",
			&self.config().view_selector,
			move |anchor, event| {
				let Some(dash) = weak.upgrade() else { return };
				dom.prevent_default(event);
				match dom.attribute(anchor, "data-name").or_else(|| dom.attribute(anchor, "data-href")) {
					Some(target) => {
						dash.navigate(ViewTarget::Name(target), NavigateOptions::default());
					}
					None => warn!("View anchor {:?} has neither `data-name` nor `data-href`.", anchor),
				}
			},
			false,
		)
	}

	fn bind_actions(&self) -> Result<()> {
		let weak = self.downgrade();
		let dom = self.dom().clone();
		delegate(
			self.dom(),
			"click",
			"body",
			"[data-action]",
			move |element, event| {
				let Some(dash) = weak.upgrade() else { return };
				let Some(name) = dom.attribute(element, "data-action") else { return };
				*dash.inner.last_action.borrow_mut() = Some(element.clone());

				let action = dash.inner.actions.borrow().get(&name).cloned();
				match action {
					Some(action) => {
						let span = trace_span!("action", name = name.as_str());
						let _enter = span.enter();
						action(&dash, element, event);
					}
					None => warn!("No action registered for data-action {:?}.", name),
				}
			},
			false,
		)
	}

	/// Reloads the whole page.
	pub fn reload(&self) {
		self.dom().reload_page();
	}

	pub(crate) fn next_request_id(&self) -> u64 {
		let id = self.inner.next_request_id.get().wrapping_add(1);
		self.inner.next_request_id.set(id);
		id
	}
}
