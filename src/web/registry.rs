use core::any::Any;
use hashbrown::HashMap;
use tracing::trace;
use wasm_bindgen::closure::Closure;

/// Keeps an exchange's JavaScript-facing closures alive while the browser may still call them.
pub(crate) struct InFlight {
	closures: Vec<Box<dyn Any>>,
}

impl InFlight {
	pub(crate) fn new() -> Self {
		Self { closures: Vec::new() }
	}

	pub(crate) fn hold<T: ?Sized + 'static>(&mut self, closure: Closure<T>) {
		self.closures.push(Box::new(closure));
	}
}

/// Closures of in-flight exchanges, by exchange id.
///
/// A closure can't be dropped while it runs, so completion only *retires* an exchange. Retired exchanges are dropped by
/// the next [`Registry::drain_retired`], which the transport calls before each new exchange.
#[derive(Default)]
pub(crate) struct Registry {
	next_id: u64,
	in_flight: HashMap<u64, InFlight>,
	retired: Vec<InFlight>,
}

impl Registry {
	pub(crate) fn reserve(&mut self) -> u64 {
		self.next_id = self.next_id.wrapping_add(1);
		self.next_id
	}

	pub(crate) fn insert(&mut self, id: u64, in_flight: InFlight) {
		self.in_flight.insert(id, in_flight);
	}

	pub(crate) fn retire(&mut self, id: u64) {
		if let Some(in_flight) = self.in_flight.remove(&id) {
			self.retired.push(in_flight);
		}
	}

	pub(crate) fn drain_retired(&mut self) {
		if !self.retired.is_empty() {
			trace!("Dropping closures of {} completed exchange(s).", self.retired.len());
			self.retired.clear();
		}
	}

	pub(crate) fn in_flight(&self) -> usize {
		self.in_flight.len()
	}
}
