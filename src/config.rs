//! Process-wide options, set once when a [`Dash`](`crate::Dash`) is constructed.

use crate::error::Result;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// Header sent with every request to mark it as AJAX.
pub const REQUESTED_WITH: (&str, &str) = ("X-Requested-With", "XMLHttpRequest");

/// Dashboard configuration.
///
/// Field names (de)serialize to the camel-cased keys of the classic options object, so a page can embed its
/// configuration as JSON and load it with [`Config::from_json`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
	/// Root for [`Resource`](`crate::resource::Resource`) URIs, e.g. `https://your-app.com/api/v1`.
	#[serde(rename = "baseResourceURL")]
	pub base_resource_url: Option<String>,
	/// Selector of the view container whose markup is swapped on navigation.
	pub content: String,
	/// Selector of navigable view anchors (elements carrying `data-name` and `data-href`).
	pub view_selector: String,
	/// Selector of a manual full-page reload trigger.
	pub reload_selector: String,
	/// Replay the last navigation after successful create/update/delete calls.
	pub auto_reload: bool,
	/// Headers merged into every request. Always contains [`REQUESTED_WITH`] after [`Config::normalized`].
	pub request_headers: HashMap<String, String>,
	/// Navigate to the first view anchor during [`Dash::init`](`crate::Dash::init`).
	pub trigger_initial_view_fetch: bool,
	/// Push session history entries for view navigations.
	pub history: bool,
	/// Selector of the form currently being edited.
	pub active_form: Option<String>,
	/// Application URL that history locations are built from. Defaults to the document location at init.
	#[serde(rename = "appURL")]
	pub app_url: Option<String>,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			base_resource_url: None,
			content: "#content".to_owned(),
			view_selector: ".view-anchor".to_owned(),
			reload_selector: ".reload".to_owned(),
			auto_reload: false,
			request_headers: HashMap::new(),
			trigger_initial_view_fetch: false,
			history: false,
			active_form: None,
			app_url: None,
		}
		.normalized()
	}
}

impl Config {
	/// Parses a JSON options object. Missing keys keep their defaults.
	///
	/// # Errors
	///
	/// Iff `json` is not a valid options object.
	pub fn from_json(json: &str) -> Result<Self> {
		Ok(serde_json::from_str::<Self>(json)?.normalized())
	}

	/// Ensures the AJAX marker header is present, without overriding an explicitly configured value.
	#[must_use]
	pub fn normalized(mut self) -> Self {
		let (name, value) = REQUESTED_WITH;
		self.request_headers.entry(name.to_owned()).or_insert_with(|| value.to_owned());
		self
	}

	#[must_use]
	pub fn with_base_resource_url(mut self, url: impl Into<String>) -> Self {
		self.base_resource_url = Some(url.into());
		self
	}

	#[must_use]
	pub fn with_content(mut self, selector: impl Into<String>) -> Self {
		self.content = selector.into();
		self
	}

	#[must_use]
	pub fn with_view_selector(mut self, selector: impl Into<String>) -> Self {
		self.view_selector = selector.into();
		self
	}

	#[must_use]
	pub fn with_auto_reload(mut self, auto_reload: bool) -> Self {
		self.auto_reload = auto_reload;
		self
	}

	#[must_use]
	pub fn with_history(mut self, history: bool) -> Self {
		self.history = history;
		self
	}

	#[must_use]
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.request_headers.insert(name.into(), value.into());
		self
	}

	#[must_use]
	pub fn with_initial_view_fetch(mut self, trigger: bool) -> Self {
		self.trigger_initial_view_fetch = trigger;
		self
	}

	#[must_use]
	pub fn with_active_form(mut self, selector: impl Into<String>) -> Self {
		self.active_form = Some(selector.into());
		self
	}

	#[must_use]
	pub fn with_app_url(mut self, url: impl Into<String>) -> Self {
		self.app_url = Some(url.into());
		self
	}
}
