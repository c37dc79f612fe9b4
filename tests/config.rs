use dash_dom::{config::REQUESTED_WITH, Config, Error};
use serde_json::{json, Value};

#[test]
fn defaults() {
	let config = Config::default();
	assert_eq!(config.content, "#content");
	assert_eq!(config.view_selector, ".view-anchor");
	assert_eq!(config.reload_selector, ".reload");
	assert_eq!(config.base_resource_url, None);
	assert!(!config.auto_reload && !config.history && !config.trigger_initial_view_fetch);
	assert_eq!(config.request_headers.get(REQUESTED_WITH.0).map(String::as_str), Some(REQUESTED_WITH.1));
}

#[test]
fn json_uses_classic_keys() {
	let config = Config::from_json(
		r##"{
			"baseResourceURL": "https://app.test/api/v1",
			"content": "main",
			"autoReload": true,
			"triggerInitialViewFetch": true,
			"activeForm": "#editor",
			"appURL": "https://app.test/admin",
			"requestHeaders": { "X-Tenant": "acme" }
		}"##,
	)
	.unwrap();

	assert_eq!(config.base_resource_url.as_deref(), Some("https://app.test/api/v1"));
	assert_eq!(config.content, "main");
	assert_eq!(config.view_selector, ".view-anchor", "Missing keys keep their defaults.");
	assert!(config.auto_reload && config.trigger_initial_view_fetch && !config.history);
	assert_eq!(config.active_form.as_deref(), Some("#editor"));
	assert_eq!(config.app_url.as_deref(), Some("https://app.test/admin"));
	assert_eq!(config.request_headers.len(), 2);

	let serialized: Value = serde_json::to_value(&config).unwrap();
	assert_eq!(serialized["baseResourceURL"], json!("https://app.test/api/v1"));
	assert_eq!(serialized["viewSelector"], json!(".view-anchor"));
}

#[test]
fn invalid_json_is_rejected() {
	assert!(matches!(Config::from_json(r#"{ "autoReload": "yes" }"#), Err(Error::Json(_))));
	assert!(Config::from_json("{").is_err());
}
