#![cfg(target_arch = "wasm32")]

use dash_dom::{memory::MemoryTransport, web::WebDom, Config, Dash, Dom, NavigateOptions, SearchOptions};
use std::sync::Once;
use wasm_bindgen::JsCast;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::HtmlElement;

wasm_bindgen_test_configure!(run_in_browser);

static LOG: Once = Once::new();

/// Replaces the document's body, dropping every listener bound to the previous one.
fn page(html: &str) -> WebDom {
	LOG.call_once(tracing_wasm::set_as_global_default);

	let dom = WebDom::new().unwrap();
	let body: HtmlElement = dom.document().create_element("body").unwrap().dyn_into().unwrap();
	body.set_inner_html(html);
	dom.document().set_body(Some(&body)).unwrap();
	dom
}

fn element(dom: &WebDom, selector: &str) -> HtmlElement {
	dom.query_selector(selector).unwrap().unwrap().dyn_into().unwrap()
}

const LAYOUT: &str = concat!(
	r#"<nav><a class="view-anchor" data-name="users" data-href="/api/v1/users"><b>Users</b></a></nav>"#,
	r#"<main id="content"><p>Welcome</p></main>"#,
);

#[wasm_bindgen_test]
fn anchor_click_swaps_view() {
	let dom = page(LAYOUT);
	let transport = MemoryTransport::new();
	let dash = Dash::new(Config::default(), dom.clone(), transport.clone());
	dash.init().unwrap();

	element(&dom, "b").click();
	assert_eq!(transport.last_request().unwrap().url, "/api/v1/users");

	transport.respond(0, 200, r#"<ul id="users"><li>Ada</li></ul>"#);
	assert_eq!(element(&dom, "#content").inner_html(), r#"<ul id="users"><li>Ada</li></ul>"#);
	assert_eq!(dash.navigation_state().last_view_name.as_deref(), Some("users"));
}

#[wasm_bindgen_test]
fn stale_navigation_is_dropped() {
	let dom = page(LAYOUT);
	let transport = MemoryTransport::new();
	let dash = Dash::new(Config::default(), dom.clone(), transport.clone());
	dash.init().unwrap();

	dash.navigate("users", NavigateOptions::default());
	dash.navigate("/api/v1/posts", NavigateOptions::default());
	transport.respond(1, 200, "<p>posts</p>");
	transport.respond(0, 200, "<p>users</p>");

	assert_eq!(element(&dom, "#content").inner_html(), "<p>posts</p>");
}

#[wasm_bindgen_test]
fn search_sets_display() {
	let dom = page(concat!(
		r#"<div class="card"><span data-name="name">Ada</span></div>"#,
		r#"<div class="card"><span data-name="name">Grace</span></div>"#,
	));
	let dash = Dash::new(Config::default(), dom.clone(), MemoryTransport::new());

	let found = dash.search("gra", ".card", "name", SearchOptions::default().display("flex")).unwrap();
	assert_eq!(found.len(), 1);

	let displays: Vec<_> = dom
		.query_selector_all(".card")
		.unwrap()
		.into_iter()
		.map(|card| card.dyn_into::<HtmlElement>().unwrap().style().get_property_value("display").unwrap())
		.collect();
	assert_eq!(displays, vec!["none", "flex"]);
}
