//! Request payloads and response bodies.

use crate::dom::FileHandle;
use serde_json::{Map, Value};

/// One value in a [`FormPayload`].
#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
	Text(String),
	File(FileHandle),
}

impl FormValue {
	#[must_use]
	pub fn as_text(&self) -> Option<&str> {
		match self {
			FormValue::Text(text) => Some(text),
			FormValue::File(_) => None,
		}
	}
}

/// Ordered multiset of `(name, value)` pairs, shaped like [***FormData***](https://developer.mozilla.org/en-US/docs/Web/API/FormData).
///
/// Names may repeat (multi-value fields, file lists) and keep their encounter order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormPayload {
	entries: Vec<(String, FormValue)>,
}

impl FormPayload {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
		self.entries.push((name.into(), FormValue::Text(value.into())));
	}

	pub fn append_file(&mut self, name: impl Into<String>, file: FileHandle) {
		self.entries.push((name.into(), FormValue::File(file)));
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &FormValue)> {
		self.entries.iter().map(|(name, value)| (name.as_str(), value))
	}

	#[must_use]
	pub fn names(&self) -> Vec<&str> {
		self.entries.iter().map(|(name, _)| name.as_str()).collect()
	}

	/// First value appended under `name`.
	#[must_use]
	pub fn get(&self, name: &str) -> Option<&FormValue> {
		self.entries.iter().find(|(n, _)| n == name).map(|(_, value)| value)
	}

	#[must_use]
	pub fn get_all(&self, name: &str) -> Vec<&FormValue> {
		self.entries.iter().filter(|(n, _)| n == name).map(|(_, value)| value).collect()
	}

	#[must_use]
	pub fn contains(&self, name: &str) -> bool {
		self.get(name).is_some()
	}

	/// Percent-encoded `name=value` pairs of the text entries, joined by `&`. Files are skipped.
	#[must_use]
	pub fn to_query(&self) -> String {
		encode_pairs(self.entries.iter().filter_map(|(name, value)| value.as_text().map(|text| (name.as_str(), text))))
	}

	/// Flattens the text entries into a JSON object. Later duplicates win, files become their file name.
	#[must_use]
	pub fn to_json(&self) -> String {
		let mut object = Map::new();
		for (name, value) in &self.entries {
			let value = match value {
				FormValue::Text(text) => Value::String(text.clone()),
				FormValue::File(file) => Value::String(file.name.clone()),
			};
			object.insert(name.clone(), value);
		}
		Value::Object(object).to_string()
	}
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormPayload {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		let mut payload = FormPayload::new();
		for (name, value) in iter {
			payload.append(name, value);
		}
		payload
	}
}

/// What a request carries.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Payload {
	#[default]
	Empty,
	/// A plain key/value mapping, converted to a [`FormPayload`] or a query string as the method requires.
	Map(Vec<(String, String)>),
	Form(FormPayload),
	/// An opaque body. With methods that don't send bodies, treated as a pre-encoded query string.
	Raw(String),
}

impl Payload {
	pub fn map<K: Into<String>, V: Into<String>>(entries: impl IntoIterator<Item = (K, V)>) -> Self {
		Payload::Map(entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
	}

	/// Whether there is anything to encode.
	#[must_use]
	pub fn has_entries(&self) -> bool {
		match self {
			Payload::Empty => false,
			Payload::Map(entries) => !entries.is_empty(),
			Payload::Form(form) => !form.is_empty(),
			Payload::Raw(raw) => !raw.is_empty(),
		}
	}

	/// Query-string encoding, without the leading `?`.
	#[must_use]
	pub fn to_query(&self) -> String {
		match self {
			Payload::Empty => String::new(),
			Payload::Map(entries) => encode_pairs(entries.iter().map(|(name, value)| (name.as_str(), value.as_str()))),
			Payload::Form(form) => form.to_query(),
			Payload::Raw(raw) => raw.trim_start_matches('?').to_owned(),
		}
	}
}

impl From<FormPayload> for Payload {
	fn from(form: FormPayload) -> Self {
		Payload::Form(form)
	}
}

impl From<String> for Payload {
	fn from(raw: String) -> Self {
		Payload::Raw(raw)
	}
}

impl From<&str> for Payload {
	fn from(raw: &str) -> Self {
		Payload::Raw(raw.to_owned())
	}
}

/// Spaces become `%20`, not `+`.
fn encode_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
	pairs
		.into_iter()
		.map(|(name, value)| format!("{}={}", urlencoding::encode(name), urlencoding::encode(value)))
		.collect::<Vec<_>>()
		.join("&")
}

/// Appends `payload` to `url` as a query string, if it has anything to encode.
#[must_use]
pub fn append_query(url: &str, payload: &Payload) -> String {
	let query = payload.to_query();
	if query.is_empty() {
		url.to_owned()
	} else if url.contains('?') {
		format!("{url}&{query}")
	} else {
		format!("{url}?{query}")
	}
}

/// A response body: structured data when it parses strictly as JSON, the raw text otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
	Json(Value),
	Text(String),
}

impl Body {
	#[must_use]
	pub fn parse(text: String) -> Self {
		match serde_json::from_str(&text) {
			Ok(value) => Body::Json(value),
			Err(_) => Body::Text(text),
		}
	}

	/// Parses a view response. The text is kept verbatim unless it is a JSON string, which is unquoted.
	#[must_use]
	pub fn parse_view(text: String) -> Self {
		match serde_json::from_str(&text) {
			Ok(Value::String(markup)) => Body::Json(Value::String(markup)),
			_ => Body::Text(text),
		}
	}

	#[must_use]
	pub fn as_json(&self) -> Option<&Value> {
		match self {
			Body::Json(value) => Some(value),
			Body::Text(_) => None,
		}
	}

	#[must_use]
	pub fn as_text(&self) -> Option<&str> {
		match self {
			Body::Json(_) => None,
			Body::Text(text) => Some(text),
		}
	}

	/// Markup to render: raw text as-is, JSON strings unquoted, other JSON re-serialized.
	#[must_use]
	pub fn to_markup(&self) -> String {
		match self {
			Body::Text(text) => text.clone(),
			Body::Json(Value::String(text)) => text.clone(),
			Body::Json(value) => value.to_string(),
		}
	}

	#[must_use]
	pub fn len(&self) -> usize {
		match self {
			Body::Text(text) => text.len(),
			Body::Json(value) => value.to_string().len(),
		}
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
