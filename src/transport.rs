//! The HTTP exchange capability the request executor is built on.

use crate::payload::FormPayload;
use core::fmt::{self, Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
	Get,
	Post,
	Put,
	Patch,
	Delete,
	Head,
}

impl Method {
	#[must_use]
	pub fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Patch => "PATCH",
			Method::Delete => "DELETE",
			Method::Head => "HEAD",
		}
	}
}

impl Display for Method {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
	/// Sent as `multipart/form-data`.
	Form(FormPayload),
	Raw(String),
}

/// A fully prepared request: final method, URL (including any query string) and merged headers.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingRequest {
	pub method: Method,
	pub url: String,
	/// Sorted by name.
	pub headers: Vec<(String, String)>,
	pub body: Option<RequestBody>,
}

impl OutgoingRequest {
	#[must_use]
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)).map(|(_, value)| value.as_str())
	}

	#[must_use]
	pub fn form(&self) -> Option<&FormPayload> {
		match &self.body {
			Some(RequestBody::Form(form)) => Some(form),
			_ => None,
		}
	}
}

/// A response as the transport saw it, before any parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
	pub status: u16,
	pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPhase {
	/// Response body download.
	Download,
	/// Request body upload.
	Upload,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
	pub loaded: f64,
	/// [`None`] unless the length is computable.
	pub total: Option<f64>,
}

/// No response arrived at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkError(pub String);

impl Display for NetworkError {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// One request in flight, together with the continuations the transport reports back through.
///
/// `complete` must be called exactly once. `progress` may be called any number of times before that.
pub struct Exchange {
	pub request: OutgoingRequest,
	pub progress: Box<dyn Fn(ProgressPhase, Progress)>,
	pub complete: Box<dyn FnOnce(Result<RawResponse, NetworkError>)>,
}

impl fmt::Debug for Exchange {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Exchange").field("request", &self.request).finish_non_exhaustive()
	}
}

/// Issues HTTP exchanges without blocking. Completion is reported later through the [`Exchange`]'s continuations.
pub trait Transport: 'static {
	fn send(&self, exchange: Exchange);
}
