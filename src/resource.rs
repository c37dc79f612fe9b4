//! CRUD-shaped calls against a named server resource.

use crate::{
	dash::Dash,
	dom::Dom,
	error::{Error, Result},
	payload::Payload,
	request::{RequestHandle, RequestOptions},
	transport::{Method, Transport},
};
use core::fmt::Display;
use tracing::{error, instrument};

/// A server resource (collection) at `{base_resource_url}/{name}`.
pub struct Resource<D: Dom, T: Transport> {
	dash: Dash<D, T>,
	uri: String,
}

impl<D: Dom, T: Transport> Clone for Resource<D, T> {
	fn clone(&self) -> Self {
		Self { dash: self.dash.clone(), uri: self.uri.clone() }
	}
}

impl<D: Dom, T: Transport> Dash<D, T> {
	/// Binds the resource `name` below [`Config::base_resource_url`](`crate::Config::base_resource_url`).
	///
	/// # Errors
	///
	/// [`Error::Config`] iff no base resource URL is configured.
	pub fn resource(&self, name: &str) -> Result<Resource<D, T>> {
		let base = self.config().base_resource_url.as_deref().ok_or_else(|| Error::Config("baseResourceURL config not set".to_owned()))?;
		Ok(Resource { dash: self.clone(), uri: format!("{}/{}", base.trim_end_matches('/'), name) })
	}

	/// POSTs `payload` to `url`, or to the active form's `action` if [`None`], then runs the auto-reload hook.
	///
	/// Returns [`None`] (and logs) if there is neither.
	pub fn create(&self, url: Option<&str>, payload: Payload, options: RequestOptions) -> Option<RequestHandle> {
		let url = self.url_or_form_action(url)?;
		Some(self.request(&url, payload, self.with_reload_hook(options.method(Method::Post))))
	}

	/// PATCHes `url` (or the active form's `action`), tunneled through POST with `options.use_post`, then runs the
	/// auto-reload hook.
	pub fn update(&self, url: Option<&str>, payload: Payload, options: RequestOptions) -> Option<RequestHandle> {
		let url = self.url_or_form_action(url)?;
		Some(self.request(&url, payload, self.with_reload_hook(options.method(Method::Patch))))
	}

	/// DELETEs `url` (or the active form's `action`), then runs the auto-reload hook.
	pub fn delete(&self, url: Option<&str>, payload: Payload, options: RequestOptions) -> Option<RequestHandle> {
		let url = self.url_or_form_action(url)?;
		Some(self.request(&url, payload, self.with_reload_hook(options.method(Method::Delete))))
	}

	fn url_or_form_action(&self, url: Option<&str>) -> Option<String> {
		if let Some(url) = url {
			return Some(url.to_owned());
		}
		let action = self.active_form().and_then(|form| self.dom().attribute(&form, "action"));
		if action.is_none() {
			error!("No URL given and no active form with an action found.");
		}
		action
	}

	/// Chains the auto-reload policy after the caller's success continuation, unless suppressed.
	pub(crate) fn with_reload_hook(&self, mut options: RequestOptions) -> RequestOptions {
		let on_success = options.on_success.take();
		let suppress = options.suppress_auto_reload;
		let dash = self.downgrade();
		options.on_success = Some(Box::new(move |body| {
			if let Some(on_success) = on_success {
				on_success(body);
			}
			if !suppress {
				if let Some(dash) = dash.upgrade() {
					dash.reload_if_auto_reload();
				}
			}
		}));
		options
	}
}

impl<D: Dom, T: Transport> Resource<D, T> {
	#[must_use]
	pub fn uri(&self) -> &str {
		&self.uri
	}

	/// GETs `{uri}/{id}`, or the listing at `{uri}/` without an id.
	#[instrument(skip_all, fields(uri = self.uri.as_str()))]
	pub fn fetch(&self, id: Option<&str>, payload: Payload, options: RequestOptions) -> RequestHandle {
		self.dash.get(&format!("{}/{}", self.uri, id.unwrap_or_default()), payload, options)
	}

	/// POSTs to `{uri}`.
	#[instrument(skip_all, fields(uri = self.uri.as_str()))]
	pub fn create(&self, payload: Payload, options: RequestOptions) -> RequestHandle {
		self.dash.request(&self.uri, payload, self.dash.with_reload_hook(options.method(Method::Post)))
	}

	/// PATCHes `{uri}/{id}`, or POSTs with `_method=PATCH` if `options.use_post` is set.
	#[instrument(skip_all, fields(uri = self.uri.as_str()))]
	pub fn update(&self, id: impl Display, payload: Payload, options: RequestOptions) -> RequestHandle {
		self.dash.request(&format!("{}/{}", self.uri, id), payload, self.dash.with_reload_hook(options.method(Method::Patch)))
	}

	/// DELETEs `{uri}/{id}`.
	#[instrument(skip_all, fields(uri = self.uri.as_str()))]
	pub fn delete(&self, id: impl Display, options: RequestOptions) -> RequestHandle {
		self.dash.request(&format!("{}/{}", self.uri, id), Payload::Empty, self.dash.with_reload_hook(options.method(Method::Delete)))
	}
}
