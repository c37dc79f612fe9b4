use super::registry::{InFlight, Registry};
use crate::{
	payload::{FormPayload, FormValue},
	transport::{Exchange, NetworkError, Progress, ProgressPhase, RawResponse, RequestBody, Transport},
};
use core::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::{error, instrument, trace, warn};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{FormData, ProgressEvent, XmlHttpRequest};

type Complete = Box<dyn FnOnce(Result<RawResponse, NetworkError>)>;

const DONE: u16 = 4;

/// [`Transport`] over [***XMLHttpRequest***](https://developer.mozilla.org/en-US/docs/Web/API/XMLHttpRequest).
///
/// Form bodies are sent as [***FormData***](https://developer.mozilla.org/en-US/docs/Web/API/FormData) (that is
/// `multipart/form-data`). File entries are sent as files only if they were read from a file input by
/// [`WebDom`](`super::WebDom`).
#[derive(Clone, Default)]
pub struct XhrTransport {
	registry: Rc<RefCell<Registry>>,
}

impl XhrTransport {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// How many exchanges haven't completed yet.
	#[must_use]
	pub fn in_flight(&self) -> usize {
		self.registry.borrow().in_flight()
	}
}

fn form_data(form: &FormPayload) -> Result<FormData, JsValue> {
	let data = FormData::new()?;
	for (name, value) in form.iter() {
		match value {
			FormValue::Text(text) => data.append_with_str(name, text)?,
			FormValue::File(file) => match file.raw.downcast_ref::<web_sys::File>() {
				Some(raw) => data.append_with_blob_and_filename(name, raw, &file.name)?,
				None => warn!("Skipping file {:?} in field {:?}: it wasn't selected in this browser.", file.name, name),
			},
		}
	}
	Ok(data)
}

fn progress_of(event: &ProgressEvent) -> Progress {
	Progress { loaded: event.loaded(), total: event.length_computable().then(|| event.total()) }
}

fn finish(registry: &Weak<RefCell<Registry>>, id: u64, complete: &RefCell<Option<Complete>>, result: Result<RawResponse, NetworkError>) {
	let Some(complete) = complete.borrow_mut().take() else { return };
	if let Some(registry) = registry.upgrade() {
		registry.borrow_mut().retire(id);
	}
	complete(result);
}

impl Transport for XhrTransport {
	#[instrument(skip_all)]
	fn send(&self, exchange: Exchange) {
		let Exchange { request, progress, complete } = exchange;
		trace!("{} {}", request.method, request.url);
		let id = {
			let mut registry = self.registry.borrow_mut();
			registry.drain_retired();
			registry.reserve()
		};

		let complete = Rc::new(RefCell::new(Some(complete)));
		let fail = |error: &JsValue| {
			error!("Can't issue request: {:?}", error);
			finish(&Weak::new(), id, &complete, Err(NetworkError(format!("{:?}", error))));
		};

		let xhr = match XmlHttpRequest::new() {
			Ok(xhr) => xhr,
			Err(error) => return fail(&error),
		};
		if let Err(error) = xhr.open(request.method.as_str(), &request.url) {
			return fail(&error);
		}
		for (name, value) in &request.headers {
			if let Err(error) = xhr.set_request_header(name, value) {
				return fail(&error);
			}
		}

		let mut in_flight = InFlight::new();
		let registry = Rc::downgrade(&self.registry);

		let on_ready_state_change = {
			let (xhr, registry, complete) = (xhr.clone(), registry.clone(), Rc::clone(&complete));
			Closure::wrap(Box::new(move || {
				if xhr.ready_state() != DONE {
					return;
				}
				let result = match xhr.status() {
					Ok(0) | Err(_) => Err(NetworkError("no response".to_owned())),
					Ok(status) => Ok(RawResponse { status, text: xhr.response_text().ok().flatten().unwrap_or_default() }),
				};
				trace!("Exchange #{} done: {:?}", id, result.as_ref().map(|response| response.status));
				finish(&registry, id, &complete, result);
			}) as Box<dyn Fn()>)
		};
		xhr.set_onreadystatechange(Some(on_ready_state_change.as_ref().unchecked_ref()));
		in_flight.hold(on_ready_state_change);

		let on_error = {
			let (registry, complete) = (registry.clone(), Rc::clone(&complete));
			Closure::wrap(Box::new(move || finish(&registry, id, &complete, Err(NetworkError("network error".to_owned())))) as Box<dyn Fn()>)
		};
		xhr.set_onerror(Some(on_error.as_ref().unchecked_ref()));
		in_flight.hold(on_error);

		let progress: Rc<dyn Fn(ProgressPhase, Progress)> = Rc::from(progress);
		let on_download = {
			let progress = Rc::clone(&progress);
			Closure::wrap(Box::new(move |event: ProgressEvent| progress(ProgressPhase::Download, progress_of(&event))) as Box<dyn Fn(ProgressEvent)>)
		};
		xhr.set_onprogress(Some(on_download.as_ref().unchecked_ref()));
		in_flight.hold(on_download);

		match xhr.upload() {
			Ok(upload) => {
				let on_upload = Closure::wrap(Box::new(move |event: ProgressEvent| progress(ProgressPhase::Upload, progress_of(&event))) as Box<dyn Fn(ProgressEvent)>);
				upload.set_onprogress(Some(on_upload.as_ref().unchecked_ref()));
				in_flight.hold(on_upload);
			}
			Err(error) => warn!("No upload progress available: {:?}", error),
		}

		self.registry.borrow_mut().insert(id, in_flight);

		let sent = match &request.body {
			None => xhr.send(),
			Some(RequestBody::Raw(raw)) => xhr.send_with_opt_str(Some(raw.as_str())),
			Some(RequestBody::Form(form)) => form_data(form).and_then(|data| xhr.send_with_opt_form_data(Some(&data))),
		};
		if let Err(error) = sent {
			error!("Can't send request: {:?}", error);
			finish(&registry, id, &complete, Err(NetworkError(format!("{:?}", error))));
		}
	}
}
