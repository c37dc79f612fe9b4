//! Session history entries with reverse callbacks.

use crate::{dom::Dom, error::Result};
use core::cell::RefCell;
use hashbrown::HashMap;
use serde_json::Value;
use std::rc::{Rc, Weak};
use tracing::{debug, instrument, trace_span};

/// Called with the pop event's state when its location becomes current again.
pub type ReverseCallback = Rc<dyn Fn(Option<&Value>)>;

/// A locally recorded session history entry.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
	/// The document location right after the entry was pushed.
	pub location: String,
	pub title: Option<String>,
	pub state: Value,
}

#[derive(Default)]
struct TrackerState {
	current: Option<String>,
	entries: Vec<HistoryEntry>,
	reverse: HashMap<String, ReverseCallback>,
}

/// Records pushed session history entries and replays their reverse callbacks on back/forward navigation.
///
/// Pop events are matched to entries by location. The callback registered for the location that became current is
/// invoked, and the entry of the location that was left is dropped from the local sequence.
pub struct HistoryTracker<D: Dom> {
	dom: D,
	state: Rc<RefCell<TrackerState>>,
}

impl<D: Dom> Clone for HistoryTracker<D> {
	fn clone(&self) -> Self {
		Self { dom: self.dom.clone(), state: Rc::clone(&self.state) }
	}
}

impl<D: Dom> HistoryTracker<D> {
	#[must_use]
	pub fn new(dom: D) -> Self {
		Self { dom, state: Rc::default() }
	}

	/// Pushes a platform history entry for `url` and records it.
	///
	/// `on_pop` is associated with the resulting location, replacing any callback registered for it before. With a
	/// `title`, the document title changes too.
	///
	/// # Errors
	///
	/// Iff the platform rejects the push. Nothing is recorded in that case.
	#[instrument(skip(self, state, on_pop))]
	pub fn push(&self, state: Value, title: Option<&str>, url: &str, on_pop: impl Fn(Option<&Value>) + 'static) -> Result<()> {
		self.dom.push_state(&state, title.unwrap_or("#"), url)?;
		let location = self.dom.location_href();
		debug!("Pushed history entry {:?}.", location);

		{
			let mut tracker = self.state.borrow_mut();
			tracker.current = Some(location.clone());
			tracker.reverse.insert(location.clone(), Rc::new(on_pop));
			tracker.entries.push(HistoryEntry { location, title: title.map(ToOwned::to_owned), state });
		}

		if let Some(title) = title {
			self.dom.set_title(title);
		}
		Ok(())
	}

	/// Starts handling the platform's pop-state notifications.
	///
	/// # Errors
	///
	/// Iff the platform refuses the listener.
	pub fn listen(&self) -> Result<()> {
		let dom = self.dom.clone();
		let state: Weak<RefCell<TrackerState>> = Rc::downgrade(&self.state);
		self.dom.on_pop_state(Rc::new(move |event_state: Option<Value>| {
			if let Some(state) = state.upgrade() {
				HistoryTracker { dom: dom.clone(), state }.handle_pop(event_state.as_ref());
			}
		}))
	}

	/// Handles a back/forward navigation that made the document's current location active, with its `event_state`.
	#[instrument(skip(self, event_state))]
	pub fn handle_pop(&self, event_state: Option<&Value>) {
		let location = self.dom.location_href();
		let (left, reverse) = {
			let mut tracker = self.state.borrow_mut();
			let left = tracker.current.replace(location.clone());
			(left, tracker.reverse.get(&location).cloned())
		};

		match reverse {
			Some(reverse) => {
				let span = trace_span!("reverse", location = location.as_str());
				let _enter = span.enter();
				reverse(event_state);
			}
			None => debug!("No reverse action registered for {:?}.", location),
		}

		if let Some(left) = left {
			let mut tracker = self.state.borrow_mut();
			if let Some(index) = tracker.entries.iter().rposition(|entry| entry.location == left) {
				tracker.entries.remove(index);
			}
		}

		if let Some(title) = event_state.and_then(|state| state.get("title")).and_then(Value::as_str) {
			self.dom.set_title(title);
		}
	}

	pub fn back(&self) {
		self.dom.history_go(-1);
	}

	pub fn forward(&self) {
		self.dom.history_go(1);
	}

	/// The location last pushed or popped to.
	#[must_use]
	pub fn current(&self) -> Option<String> {
		self.state.borrow().current.clone()
	}

	#[must_use]
	pub fn entries(&self) -> Vec<HistoryEntry> {
		self.state.borrow().entries.clone()
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.state.borrow().entries.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.state.borrow().entries.is_empty()
	}
}
