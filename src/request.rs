//! The request executor.

use crate::{
	dash::Dash,
	dom::Dom,
	form::serialize_from_map,
	payload::{append_query, Body, FormPayload, Payload},
	transport::{Exchange, Method, NetworkError, OutgoingRequest, Progress, ProgressPhase, RawResponse, RequestBody, Transport},
};
use core::fmt::{self, Debug, Formatter};
use hashbrown::HashMap;
use std::rc::Rc;
use tracing::{debug, instrument, trace, trace_span, warn};

/// Why a request didn't succeed.
#[derive(Debug, Clone, PartialEq)]
pub enum Failure {
	/// A response arrived with a status outside `200..300`.
	Status { status: u16, body: Body },
	/// No response arrived at all.
	Network { reason: String },
}

impl Failure {
	#[must_use]
	pub fn status(&self) -> Option<u16> {
		match self {
			Failure::Status { status, .. } => Some(*status),
			Failure::Network { .. } => None,
		}
	}

	#[must_use]
	pub fn body(&self) -> Option<&Body> {
		match self {
			Failure::Status { body, .. } => Some(body),
			Failure::Network { .. } => None,
		}
	}
}

/// Per-call request options. Every continuation is optional.
pub struct RequestOptions {
	pub method: Method,
	/// Merged over [`Config::request_headers`](`crate::Config::request_headers`), winning on collisions.
	pub headers: HashMap<String, String>,
	pub on_success: Option<Box<dyn FnOnce(Body)>>,
	pub on_error: Option<Box<dyn FnOnce(Failure)>>,
	/// Upload progress of the request body.
	pub on_progress: Option<Rc<dyn Fn(Progress)>>,
	/// Tunnel the request as `POST` with a `_method=PATCH` form field.
	pub use_post: bool,
	/// Skip the auto-reload that otherwise follows a successful create, update or delete.
	pub suppress_auto_reload: bool,
	pub(crate) is_view_request: bool,
}

impl Default for RequestOptions {
	fn default() -> Self {
		Self::new(Method::Post)
	}
}

impl Debug for RequestOptions {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("RequestOptions")
			.field("method", &self.method)
			.field("headers", &self.headers)
			.field("on_success", &self.on_success.is_some())
			.field("on_error", &self.on_error.is_some())
			.field("on_progress", &self.on_progress.is_some())
			.field("use_post", &self.use_post)
			.field("suppress_auto_reload", &self.suppress_auto_reload)
			.field("is_view_request", &self.is_view_request)
			.finish()
	}
}

impl RequestOptions {
	#[must_use]
	pub fn new(method: Method) -> Self {
		Self {
			method,
			headers: HashMap::new(),
			on_success: None,
			on_error: None,
			on_progress: None,
			use_post: false,
			suppress_auto_reload: false,
			is_view_request: false,
		}
	}

	#[must_use]
	pub fn method(mut self, method: Method) -> Self {
		self.method = method;
		self
	}

	#[must_use]
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into(), value.into());
		self
	}

	#[must_use]
	pub fn on_success(mut self, on_success: impl FnOnce(Body) + 'static) -> Self {
		self.on_success = Some(Box::new(on_success));
		self
	}

	#[must_use]
	pub fn on_error(mut self, on_error: impl FnOnce(Failure) + 'static) -> Self {
		self.on_error = Some(Box::new(on_error));
		self
	}

	#[must_use]
	pub fn on_progress(mut self, on_progress: impl Fn(Progress) + 'static) -> Self {
		self.on_progress = Some(Rc::new(on_progress));
		self
	}

	#[must_use]
	pub fn use_post(mut self, use_post: bool) -> Self {
		self.use_post = use_post;
		self
	}

	#[must_use]
	pub fn suppress_auto_reload(mut self, suppress: bool) -> Self {
		self.suppress_auto_reload = suppress;
		self
	}

	#[must_use]
	pub(crate) fn view_request(mut self) -> Self {
		self.is_view_request = true;
		self
	}
}

/// Identifies an issued request. Dropping it has no effect on the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHandle {
	id: u64,
	method: Method,
	url: String,
}

impl RequestHandle {
	#[must_use]
	pub fn id(&self) -> u64 {
		self.id
	}

	#[must_use]
	pub fn method(&self) -> Method {
		self.method
	}

	/// The final URL, including any encoded query string.
	#[must_use]
	pub fn url(&self) -> &str {
		&self.url
	}
}

/// `defaults ∪ overrides`, with `overrides` winning on key collisions. Neither input is modified.
#[must_use]
pub fn merge_headers(defaults: &HashMap<String, String>, overrides: &HashMap<String, String>) -> HashMap<String, String> {
	let mut merged = defaults.clone();
	merged.extend(overrides.iter().map(|(name, value)| (name.clone(), value.clone())));
	merged
}

/// Resolves the final method, URL and body for `payload`.
fn prepare(url: &str, payload: Payload, method: Method, use_post: bool) -> (Method, String, Option<RequestBody>) {
	match method {
		Method::Get | Method::Head => (method, append_query(url, &payload), None),
		Method::Delete if payload.has_entries() => (method, append_query(url, &payload), None),
		Method::Delete => (method, url.to_owned(), None),
		_ => {
			let mut body = match payload {
				Payload::Empty => None,
				Payload::Map(entries) => Some(RequestBody::Form(serialize_from_map(entries))),
				Payload::Form(form) => Some(RequestBody::Form(form)),
				Payload::Raw(raw) => Some(RequestBody::Raw(raw)),
			};
			if method != Method::Patch || !use_post {
				return (method, url.to_owned(), body);
			}
			match &mut body {
				Some(RequestBody::Form(form)) => form.append("_method", "PATCH"),
				Some(RequestBody::Raw(_)) => warn!("Can't tunnel PATCH through a raw body; sending it as POST without `_method`."),
				None => {
					let mut form = FormPayload::new();
					form.append("_method", "PATCH");
					body = Some(RequestBody::Form(form));
				}
			}
			(Method::Post, url.to_owned(), body)
		}
	}
}

impl<D: Dom, T: Transport> Dash<D, T> {
	/// Issues one HTTP exchange.
	///
	/// Exactly one of `options.on_success` (status in `200..300`) and `options.on_error` (any other status, or no
	/// response) is called later. Response bodies are parsed as JSON where possible and passed on as raw text otherwise.
	#[instrument(skip(self, payload, options))]
	pub fn request(&self, url: &str, payload: Payload, options: RequestOptions) -> RequestHandle {
		let RequestOptions { method, headers, on_success, on_error, on_progress, use_post, suppress_auto_reload: _, is_view_request } = options;

		let (method, url, body) = prepare(url, payload, method, use_post);
		let mut headers: Vec<_> = merge_headers(&self.config().request_headers, &headers).into_iter().collect();
		headers.sort();

		let id = self.next_request_id();
		let handle = RequestHandle { id, method, url: url.clone() };
		debug!("Request #{} {} {} (view: {})", id, method, url, is_view_request);

		let progress = {
			let weak = self.downgrade();
			move |phase: ProgressPhase, progress: Progress| match phase {
				ProgressPhase::Upload => {
					if let Some(on_progress) = &on_progress {
						on_progress(progress);
					}
				}
				ProgressPhase::Download => {
					let Some(dash) = weak.upgrade() else { return };
					if is_view_request {
						let hook = dash.inner.hooks.borrow().view_progress.clone();
						if let Some(hook) = hook {
							let anchor = dash.inner.state.borrow().last_view_anchor.clone();
							hook(progress, anchor.as_ref());
						}
					} else {
						let hook = dash.inner.hooks.borrow().request_progress.clone();
						if let Some(hook) = hook {
							hook(progress);
						}
					}
				}
			}
		};

		let complete = {
			let dash = self.clone();
			move |result: Result<RawResponse, NetworkError>| {
				let span = trace_span!("request_complete", id);
				let _enter = span.enter();
				match result {
					Ok(RawResponse { status, text }) => {
						#[cfg(feature = "dangerous-logging")]
						trace!("Response #{} {}: {:?}", id, status, text);
						#[cfg(not(feature = "dangerous-logging"))]
						trace!("Response #{} {}: {} byte(s)", id, status, text.len());

						let body = if is_view_request { Body::parse_view(text) } else { Body::parse(text) };
						let hook = if is_view_request { None } else { dash.inner.hooks.borrow().response.clone() };
						let hook_body = hook.as_ref().map(|_| body.clone());

						if (200..300).contains(&status) {
							if let Some(on_success) = on_success {
								on_success(body);
							}
						} else {
							debug!("Request #{} failed with status {}.", id, status);
							if let Some(on_error) = on_error {
								on_error(Failure::Status { status, body });
							}
						}

						if let (Some(hook), Some(body)) = (hook, hook_body) {
							hook(&body);
						}
					}
					Err(NetworkError(reason)) => {
						warn!("Request #{} received no response: {}", id, reason);
						if let Some(on_error) = on_error {
							on_error(Failure::Network { reason });
						}
					}
				}
			}
		};

		self.transport().send(Exchange {
			request: OutgoingRequest { method, url, headers, body },
			progress: Box::new(progress),
			complete: Box::new(complete),
		});
		handle
	}

	/// [`Dash::request`] with [`Method::Get`].
	pub fn get(&self, url: &str, payload: Payload, options: RequestOptions) -> RequestHandle {
		self.request(url, payload, options.method(Method::Get))
	}

	/// [`Dash::request`] with [`Method::Post`].
	pub fn post(&self, url: &str, payload: Payload, options: RequestOptions) -> RequestHandle {
		self.request(url, payload, options.method(Method::Post))
	}
}
