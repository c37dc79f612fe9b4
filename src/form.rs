//! Form serialization, validation and submission.

use crate::{
	dash::Dash,
	delegate::delegate,
	dom::Dom,
	error::{Error, Result},
	payload::FormPayload,
	transport::Transport,
};
use std::rc::Rc;
use tracing::{error, instrument, trace, warn};

/// Named controls, in document order.
pub const CONTROLS: &str = "input[name], select[name], textarea[name]";

/// Text-like inputs cleared by [`sanitize`].
pub const TEXT_INPUTS: &str = "input[type=text], input[type=password], input[type=email], input[type=telephone], input[type=tel]";

/// Serializes the named controls within `form`.
///
/// - File inputs contribute every selected file, all under the input's name.
/// - Checkboxes and radio buttons contribute their value only while checked, regardless of `include_empty`.
/// - Other controls contribute their value if it is non-empty, or always with `include_empty`.
///
/// # Errors
///
/// Iff the platform rejects the control query.
#[instrument(skip(dom))]
pub fn serialize<D: Dom>(dom: &D, form: &D::Element, include_empty: bool) -> Result<FormPayload> {
	let mut payload = FormPayload::new();
	for control in dom.query_selector_all_in(form, CONTROLS)? {
		let Some(name) = dom.attribute(&control, "name") else { continue };
		match dom.attribute(&control, "type").map(|t| t.to_ascii_lowercase()).as_deref() {
			Some("file") => {
				for file in dom.files(&control) {
					payload.append_file(name.clone(), file);
				}
			}
			Some("checkbox" | "radio") => {
				if dom.is_checked(&control) {
					payload.append(name, dom.value(&control).unwrap_or_else(|| "on".to_owned()));
				}
			}
			_ => {
				let value = dom.value(&control).unwrap_or_default();
				if include_empty || !value.is_empty() {
					#[cfg(feature = "dangerous-logging")]
					trace!("{} = {:?}", name, value);
					#[cfg(not(feature = "dangerous-logging"))]
					trace!("{} ({} byte(s))", name, value.len());
					payload.append(name, value);
				}
			}
		}
	}
	Ok(payload)
}

/// Converts a programmatic key/value mapping into the shape [`serialize`] produces.
pub fn serialize_from_map<K: Into<String>, V: Into<String>>(map: impl IntoIterator<Item = (K, V)>) -> FormPayload {
	map.into_iter().collect()
}

/// Outcome of [`validate_required`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredCheck<E> {
	/// Whether any of the checked nodes is empty.
	pub empty: bool,
	/// The empty nodes, in the order they were given.
	pub offending: Vec<E>,
}

/// Flags every node in `nodes` whose trimmed value is empty.
pub fn validate_required<D: Dom>(dom: &D, nodes: &[D::Element]) -> RequiredCheck<D::Element> {
	let offending: Vec<_> = nodes.iter().filter(|node| dom.value(node).unwrap_or_default().trim().is_empty()).cloned().collect();
	RequiredCheck { empty: !offending.is_empty(), offending }
}

/// Clears every text-like input within `form` and removes focus from it.
///
/// # Errors
///
/// Iff the platform rejects the input query.
pub fn sanitize<D: Dom>(dom: &D, form: &D::Element) -> Result<()> {
	for input in dom.query_selector_all_in(form, TEXT_INPUTS)? {
		dom.set_value(&input, "");
		dom.blur(&input);
	}
	Ok(())
}

/// Mirrors the values of all `[data-name]` elements within `from` onto the same-named `[data-name]` elements within `to`.
///
/// Form controls receive the value as their value, other elements as their text. A source's value is its control value
/// if non-empty, its text otherwise.
///
/// # Errors
///
/// Iff a `data-name` can't be used in a selector.
pub fn bind_data<D: Dom>(dom: &D, from: &D::Element, to: &D::Element) -> Result<()> {
	for source in dom.query_selector_all_in(from, "[data-name]")? {
		let Some(name) = dom.attribute(&source, "data-name") else { continue };
		let value = dom.value(&source).filter(|value| !value.is_empty()).unwrap_or_else(|| dom.text(&source));
		for target in dom.query_selector_all_in(to, &format!("[data-name={:?}]", name))? {
			if dom.matches(&target, "input, textarea")? {
				dom.set_value(&target, &value);
			} else {
				dom.set_text(&target, &value);
			}
		}
	}
	Ok(())
}

/// Which fields of a submitted form must be non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Required {
	None,
	/// Every named field not marked `.not-required`.
	All,
	/// The fields with these names.
	Names(Vec<String>),
}

impl<D: Dom, T: Transport> Dash<D, T> {
	/// The form matching [`Config::active_form`](`crate::Config::active_form`).
	#[must_use]
	pub fn active_form(&self) -> Option<D::Element> {
		let selector = self.config().active_form.as_deref()?;
		match self.dom().query_selector(selector) {
			Ok(form) => form,
			Err(error) => {
				error!("Invalid active form selector {:?}: {}", selector, error);
				None
			}
		}
	}

	/// [`sanitize`]s `form`, or the active form if [`None`].
	///
	/// # Errors
	///
	/// Iff there's no form to sanitize.
	pub fn sanitize_form(&self, form: Option<&D::Element>) -> Result<()> {
		match form.cloned().or_else(|| self.active_form()) {
			Some(form) => sanitize(self.dom(), &form),
			None => Err(Error::Config("no form given and no active form found".to_owned())),
		}
	}

	/// Handles submission of forms matching `form_selector` anywhere below `body`.
	///
	/// The default action is always prevented. If `required` fields are empty, `on_invalid` receives the form and the
	/// [`RequiredCheck`] (or the check is logged). Otherwise `on_submit` receives the form, the event, the serialized
	/// payload and the form's `action`.
	///
	/// # Errors
	///
	/// Iff the document has no `body`.
	#[instrument(skip(self, on_submit, on_invalid))]
	pub fn submit<S, I>(&self, form_selector: &str, required: Required, on_submit: S, on_invalid: Option<I>) -> Result<()>
	where
		S: Fn(&D::Element, &D::Event, FormPayload, Option<String>) + 'static,
		I: Fn(&D::Element, &RequiredCheck<D::Element>) + 'static,
	{
		let dom = self.dom().clone();
		let required = Rc::new(required);
		delegate(
			self.dom(),
			"submit",
			"body",
			form_selector,
			move |form, event| {
				dom.prevent_default(event);

				let nodes = match required_nodes(&dom, form, &required) {
					Ok(nodes) => nodes,
					Err(error) => return error!("Can't validate submitted form: {}", error),
				};
				let check = validate_required(&dom, &nodes);
				if check.empty {
					match &on_invalid {
						Some(on_invalid) => on_invalid(form, &check),
						None => warn!("Some required inputs are empty: {:?}", check.offending),
					}
					return;
				}

				match serialize(&dom, form, false) {
					Ok(payload) => on_submit(form, event, payload, dom.attribute(form, "action")),
					Err(error) => error!("Can't serialize submitted form: {}", error),
				}
			},
			false,
		)
	}

	/// [`Dash::submit`] requiring every named field not marked `.not-required`.
	///
	/// # Errors
	///
	/// Iff the document has no `body`.
	pub fn submit_all<S, I>(&self, form_selector: &str, on_submit: S, on_invalid: Option<I>) -> Result<()>
	where
		S: Fn(&D::Element, &D::Event, FormPayload, Option<String>) + 'static,
		I: Fn(&D::Element, &RequiredCheck<D::Element>) + 'static,
	{
		self.submit(form_selector, Required::All, on_submit, on_invalid)
	}
}

fn required_nodes<D: Dom>(dom: &D, form: &D::Element, required: &Required) -> Result<Vec<D::Element>> {
	match required {
		Required::None => Ok(Vec::new()),
		Required::All => dom.query_selector_all_in(form, "[name]:not(.not-required)"),
		Required::Names(names) => names
			.iter()
			.map(|name| dom.query_selector_in(form, &format!("[name={:?}]", name))?.ok_or_else(|| Error::Config(format!("required input {:?} not found in form", name))))
			.collect(),
	}
}
