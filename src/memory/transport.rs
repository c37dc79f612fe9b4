use crate::transport::{Exchange, NetworkError, OutgoingRequest, Progress, ProgressPhase, RawResponse, Transport};
use core::cell::RefCell;
use std::rc::Rc;
use tracing::{trace, warn};

type Complete = Box<dyn FnOnce(Result<RawResponse, NetworkError>)>;

struct Slot {
	request: OutgoingRequest,
	progress: Rc<dyn Fn(ProgressPhase, Progress)>,
	/// [`None`] once completed.
	complete: Option<Complete>,
}

/// A [`Transport`] that only records requests. Clones share the same record.
///
/// Exchanges are completed by hand, by index in issue order, so tests decide when and in which order responses arrive.
#[derive(Clone, Default)]
pub struct MemoryTransport {
	slots: Rc<RefCell<Vec<Slot>>>,
}

impl Transport for MemoryTransport {
	fn send(&self, exchange: Exchange) {
		let Exchange { request, progress, complete } = exchange;
		trace!("Recording {} {}.", request.method, request.url);
		self.slots.borrow_mut().push(Slot { request, progress: Rc::from(progress), complete: Some(complete) });
	}
}

impl MemoryTransport {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Every request sent so far, in issue order.
	#[must_use]
	pub fn requests(&self) -> Vec<OutgoingRequest> {
		self.slots.borrow().iter().map(|slot| slot.request.clone()).collect()
	}

	#[must_use]
	pub fn request(&self, index: usize) -> Option<OutgoingRequest> {
		self.slots.borrow().get(index).map(|slot| slot.request.clone())
	}

	#[must_use]
	pub fn last_request(&self) -> Option<OutgoingRequest> {
		self.slots.borrow().last().map(|slot| slot.request.clone())
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.slots.borrow().len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.slots.borrow().is_empty()
	}

	/// How many requests haven't been completed yet.
	#[must_use]
	pub fn pending_count(&self) -> usize {
		self.slots.borrow().iter().filter(|slot| slot.complete.is_some()).count()
	}

	/// Completes request `index` with a response. Returns `false` if there's no such pending request.
	pub fn respond(&self, index: usize, status: u16, text: &str) -> bool {
		self.complete(index, Ok(RawResponse { status, text: text.to_owned() }))
	}

	/// Completes request `index` without a response. Returns `false` if there's no such pending request.
	pub fn fail(&self, index: usize, reason: &str) -> bool {
		self.complete(index, Err(NetworkError(reason.to_owned())))
	}

	/// Reports progress for request `index`. Ignored once it completed.
	pub fn progress(&self, index: usize, phase: ProgressPhase, loaded: f64, total: Option<f64>) {
		let progress = match self.slots.borrow().get(index) {
			Some(slot) if slot.complete.is_some() => Rc::clone(&slot.progress),
			_ => return warn!("No pending request #{} to report progress for.", index),
		};
		progress(phase, Progress { loaded, total });
	}

	fn complete(&self, index: usize, result: Result<RawResponse, NetworkError>) -> bool {
		// Taken out first: the continuation may send further requests.
		let complete = self.slots.borrow_mut().get_mut(index).and_then(|slot| slot.complete.take());
		match complete {
			Some(complete) => {
				complete(result);
				true
			}
			None => {
				warn!("No pending request #{} to complete.", index);
				false
			}
		}
	}
}
