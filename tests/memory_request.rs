
use dash_dom::{
	config::REQUESTED_WITH,
	payload::Payload,
	request::merge_headers,
	transport::{Method, Progress, ProgressPhase, RequestBody},
	Body, Config, Failure, RequestOptions,
};
use hashbrown::HashMap;
use memory_fixture_::{fixture, log};
use serde_json::json;

fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
	pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect()
}

#[test]
fn merged_headers_prefer_overrides() {
	let cases = [
		(map(&[]), map(&[])),
		(map(&[("A", "1")]), map(&[])),
		(map(&[]), map(&[("B", "2")])),
		(map(&[("A", "1"), ("B", "1")]), map(&[("B", "2"), ("C", "3")])),
	];
	for (defaults, overrides) in cases {
		let merged = merge_headers(&defaults, &overrides);
		for (name, value) in &merged {
			let expected = overrides.get(name).or_else(|| defaults.get(name)).unwrap();
			assert_eq!(value, expected);
		}
		assert!(defaults.keys().chain(overrides.keys()).all(|name| merged.contains_key(name)));
		assert_eq!(merged.len(), defaults.keys().chain(overrides.keys().filter(|name| !defaults.contains_key(*name))).count());
	}
}

#[test]
fn request_carries_merged_headers() {
	let f = fixture(Config::default().with_header("X-Tenant", "acme").with_header("Accept", "text/html"));
	f.dash.get("/api/v1/users", Payload::Empty, RequestOptions::default().header("Accept", "application/json"));

	let request = f.transport.last_request().unwrap();
	assert_eq!(request.method, Method::Get);
	assert_eq!(request.header("accept"), Some("application/json"));
	assert_eq!(request.header("X-Tenant"), Some("acme"));
	assert_eq!(request.header(REQUESTED_WITH.0), Some(REQUESTED_WITH.1));
	assert_eq!(request.headers.len(), 3);
}

#[test]
fn configured_marker_header_is_kept() {
	let config = Config::from_json(r#"{ "requestHeaders": { "X-Requested-With": "dash" } }"#).unwrap();
	let f = fixture(config);
	f.dash.get("/", Payload::Empty, RequestOptions::default());
	assert_eq!(f.transport.last_request().unwrap().header("X-Requested-With"), Some("dash"));
}

#[test]
fn success_receives_json_or_text() {
	let f = fixture(Config::default());
	let bodies = log();
	let errors = log();
	for _ in 0..2 {
		let (bodies, errors) = (bodies.clone(), errors.clone());
		f.dash.get(
			"/api/v1/users/1",
			Payload::Empty,
			RequestOptions::default().on_success(move |body| bodies.borrow_mut().push(body)).on_error(move |failure| errors.borrow_mut().push(failure)),
		);
	}

	assert!(f.transport.respond(0, 200, r#"{ "id": 1, "name": "Ada" }"#));
	assert!(f.transport.respond(1, 299, "<p>Ada</p>"));

	assert_eq!(*bodies.borrow(), vec![Body::Json(json!({ "id": 1, "name": "Ada" })), Body::Text("<p>Ada</p>".to_owned())]);
	assert!(errors.borrow().is_empty());
}

#[test]
fn error_status_only_calls_error() {
	let f = fixture(Config::default());
	let successes = log();
	let errors = log();
	for _ in 0..2 {
		let (successes, errors) = (successes.clone(), errors.clone());
		f.dash.post(
			"/api/v1/users",
			Payload::Empty,
			RequestOptions::default().on_success(move |body| successes.borrow_mut().push(body)).on_error(move |failure| errors.borrow_mut().push(failure)),
		);
	}

	f.transport.respond(0, 422, r#"{ "name": "required" }"#);
	f.transport.respond(1, 302, "moved");

	assert!(successes.borrow().is_empty());
	let errors = errors.borrow();
	assert_eq!(errors[0], Failure::Status { status: 422, body: Body::Json(json!({ "name": "required" })) });
	assert_eq!(errors[1].status(), Some(302));
	assert_eq!(errors[1].body(), Some(&Body::Text("moved".to_owned())));
}

#[test]
fn network_failure_calls_error() {
	let f = fixture(Config::default());
	let errors = log();
	let recorded = errors.clone();
	f.dash.get("/api/v1/users", Payload::Empty, RequestOptions::default().on_error(move |failure| recorded.borrow_mut().push(failure)));

	assert!(f.transport.fail(0, "offline"));
	assert!(!f.transport.fail(0, "again"));
	assert_eq!(*errors.borrow(), vec![Failure::Network { reason: "offline".to_owned() }]);
	assert_eq!(f.transport.pending_count(), 0);
}

#[test]
fn get_encodes_payload_as_query() {
	let f = fixture(Config::default());
	let handle = f.dash.get("/search", Payload::map([("q", "ada lovelace"), ("page", "2")]), RequestOptions::default());
	f.dash.get("/search?sort=name", Payload::map([("q", "a&b")]), RequestOptions::default());
	f.dash.request("/search", Payload::Empty, RequestOptions::new(Method::Head));

	assert_eq!(handle.url(), "/search?q=ada%20lovelace&page=2");
	assert_eq!(handle.method(), Method::Get);
	let requests = f.transport.requests();
	assert_eq!(requests[0].url, "/search?q=ada%20lovelace&page=2");
	assert_eq!(requests[0].body, None);
	assert_eq!(requests[1].url, "/search?sort=name&q=a%26b");
	assert_eq!(requests[2].url, "/search");
	assert_eq!(requests[2].method, Method::Head);
}

#[test]
fn delete_encodes_entries_as_query() {
	let f = fixture(Config::default());
	f.dash.request("/api/v1/posts/1", Payload::map([("force", "1")]), RequestOptions::new(Method::Delete));
	f.dash.request("/api/v1/posts/2", Payload::Empty, RequestOptions::new(Method::Delete));

	let requests = f.transport.requests();
	assert_eq!(requests[0].url, "/api/v1/posts/1?force=1");
	assert_eq!(requests[0].body, None);
	assert_eq!(requests[1].url, "/api/v1/posts/2");
	assert_eq!(requests[1].body, None);
}

#[test]
fn post_sends_form_body() {
	let f = fixture(Config::default());
	f.dash.post("/api/v1/users", Payload::map([("name", "Ada"), ("tag", "math"), ("tag", "code")]), RequestOptions::default());
	f.dash.request("/api/v1/users/1", "{\"name\":\"Ada\"}".into(), RequestOptions::new(Method::Put));

	let requests = f.transport.requests();
	let form = requests[0].form().unwrap();
	assert_eq!(form.names(), vec!["name", "tag", "tag"]);
	assert_eq!(form.get("name").and_then(|value| value.as_text()), Some("Ada"));
	assert_eq!(form.get_all("tag").len(), 2);
	assert_eq!(requests[1].method, Method::Put);
	assert_eq!(requests[1].body, Some(RequestBody::Raw("{\"name\":\"Ada\"}".to_owned())));
}

#[test]
fn patch_tunnels_through_post() {
	let f = fixture(Config::default());
	let handle = f.dash.request("/api/v1/users/1", Payload::map([("name", "Ada")]), RequestOptions::new(Method::Patch).use_post(true));
	f.dash.request("/api/v1/users/2", Payload::Empty, RequestOptions::new(Method::Patch).use_post(true));
	f.dash.request("/api/v1/users/3", Payload::map([("name", "Grace")]), RequestOptions::new(Method::Patch));

	assert_eq!(handle.method(), Method::Post);
	let requests = f.transport.requests();
	assert_eq!(requests[0].method, Method::Post);
	assert_eq!(requests[0].form().unwrap().names(), vec!["name", "_method"]);
	assert_eq!(requests[0].form().unwrap().get("_method").and_then(|value| value.as_text()), Some("PATCH"));
	assert_eq!(requests[1].form().unwrap().names(), vec!["_method"]);
	assert_eq!(requests[2].method, Method::Patch);
	assert!(!requests[2].form().unwrap().contains("_method"));
}

#[test]
fn progress_is_routed_by_phase_and_kind() {
	let f = fixture(Config::default());
	let uploads = log();
	let downloads = log();
	let views = log();
	{
		let downloads = downloads.clone();
		f.dash.set_request_progress(move |progress| downloads.borrow_mut().push(progress));
		let views = views.clone();
		f.dash.set_view_progress(move |progress, anchor| views.borrow_mut().push((progress, anchor.copied())));
	}

	let recorded = uploads.clone();
	f.dash.post("/upload", Payload::Empty, RequestOptions::default().on_progress(move |progress| recorded.borrow_mut().push(progress)));
	f.dash.navigate("users", Default::default());

	f.transport.progress(0, ProgressPhase::Upload, 10.0, Some(100.0));
	f.transport.progress(0, ProgressPhase::Download, 5.0, None);
	f.transport.progress(1, ProgressPhase::Download, 7.0, Some(7.0));

	assert_eq!(*uploads.borrow(), vec![Progress { loaded: 10.0, total: Some(100.0) }]);
	assert_eq!(*downloads.borrow(), vec![Progress { loaded: 5.0, total: None }]);
	let anchor = f.select("[data-name=users]");
	assert_eq!(*views.borrow(), vec![(Progress { loaded: 7.0, total: Some(7.0) }, Some(anchor))]);
}

#[test]
fn response_hook_sees_other_requests_only() {
	let f = fixture(Config::default());
	let seen = log();
	let recorded = seen.clone();
	f.dash.set_response_hook(move |body| recorded.borrow_mut().push(body.clone()));

	f.dash.get("/api/v1/stats", Payload::Empty, RequestOptions::default());
	f.dash.navigate("users", Default::default());
	f.transport.respond(0, 500, "oops");
	f.transport.respond(1, 200, "<ul></ul>");

	assert_eq!(*seen.borrow(), vec![Body::Text("oops".to_owned())]);
}

#[test]
fn request_ids_increase() {
	let f = fixture(Config::default());
	let a = f.dash.get("/a", Payload::Empty, RequestOptions::default());
	let b = f.dash.get("/b", Payload::Empty, RequestOptions::default());
	assert!(b.id() > a.id());
}
