#![cfg(target_arch = "wasm32")]

use dash_dom::{
	form::{sanitize, serialize, Required, RequiredCheck},
	memory::MemoryTransport,
	web::WebDom,
	Config, Dash, Dom,
};
use std::{cell::RefCell, rc::Rc, sync::Once};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{Element, HtmlElement, HtmlFormElement, HtmlInputElement};

wasm_bindgen_test_configure!(run_in_browser);

static LOG: Once = Once::new();

const PROFILE: &str = concat!(
	r#"<form id="profile" action="/api/v1/profile">"#,
	r#"<input type="text" name="nickname" value="">"#,
	r#"<input type="email" name="email" value="ada@example.com">"#,
	r#"<input type="checkbox" name="newsletter" value="yes">"#,
	r#"<input type="radio" name="plan" value="free">"#,
	r#"<input type="radio" name="plan" value="pro" checked>"#,
	r#"<select name="country"><option value="uk">UK</option><option value="fr" selected>France</option></select>"#,
	r#"<button type="submit">Save</button>"#,
	r#"</form>"#,
);

fn page() -> WebDom {
	LOG.call_once(tracing_wasm::set_as_global_default);

	let dom = WebDom::new().unwrap();
	let body: HtmlElement = dom.document().create_element("body").unwrap().dyn_into().unwrap();
	body.set_inner_html(PROFILE);
	dom.document().set_body(Some(&body)).unwrap();
	dom
}

fn input(dom: &WebDom, name: &str) -> HtmlInputElement {
	dom.query_selector(&format!("[name={:?}]", name)).unwrap().unwrap().dyn_into().unwrap()
}

#[wasm_bindgen_test]
fn serializes_live_values() {
	let dom = page();
	input(&dom, "newsletter").set_checked(true);
	input(&dom, "nickname").set_value("ada");

	let form = dom.query_selector("#profile").unwrap().unwrap();
	let payload = serialize(&dom, &form, false).unwrap();
	assert_eq!(payload.names(), vec!["nickname", "email", "newsletter", "plan", "country"]);
	assert_eq!(payload.to_query(), "nickname=ada&email=ada%40example.com&newsletter=yes&plan=pro&country=fr");
}

#[wasm_bindgen_test]
fn sanitize_clears_text_inputs() {
	let dom = page();
	input(&dom, "nickname").set_value("ada");
	let form = dom.query_selector("#profile").unwrap().unwrap();

	sanitize(&dom, &form).unwrap();
	assert_eq!(input(&dom, "nickname").value(), "");
	assert_eq!(input(&dom, "email").value(), "");
	assert_eq!(input(&dom, "newsletter").value(), "yes");
}

#[wasm_bindgen_test]
fn submission_is_intercepted() {
	let dom = page();
	let dash = Dash::new(Config::default(), dom.clone(), MemoryTransport::new());
	let invalid = Rc::new(RefCell::new(Vec::new()));
	let recorded = invalid.clone();
	dash.submit(
		"#profile",
		Required::Names(vec!["nickname".to_owned()]),
		|_, _, _, _| panic!("The nickname is missing."),
		Some(move |_: &Element, check: &RequiredCheck<Element>| recorded.borrow_mut().extend(check.offending.iter().filter_map(|node| node.get_attribute("name")))),
	)
	.unwrap();

	let form: HtmlFormElement = dom.query_selector("#profile").unwrap().unwrap().dyn_into().unwrap();
	form.request_submit().unwrap();
	assert_eq!(*invalid.borrow(), vec!["nickname".to_owned()]);
}
