
use dash_dom::{
	delegate::{closest, delegate},
	dom::Dom,
	memory::{MemoryDom, NodeId},
	Error,
};
use memory_fixture_::{log, LOCATION};

const TABLE: &str = concat!(
	r#"<section id="outer"><table id="users">"#,
	r#"<tr class="row" data-id="1"><td><button class="edit">Edit</button></td></tr>"#,
	r#"<tr class="row" data-id="2"><td><span>Grace</span></td></tr>"#,
	r#"</table></section>"#,
	r#"<p class="row" id="stray">Outside</p>"#,
);

fn document() -> MemoryDom {
	MemoryDom::with_body(LOCATION, TABLE)
}

fn select(dom: &MemoryDom, selector: &str) -> NodeId {
	dom.query_selector(selector).unwrap().unwrap()
}

#[test]
fn delegated_listener_receives_closest_match() {
	let dom = document();
	let hits = log();
	{
		let (hits, reader) = (hits.clone(), dom.clone());
		delegate(&dom, "click", "#users", ".row", move |row, _event| hits.borrow_mut().push(reader.attribute(row, "data-id")), false).unwrap();
	}

	dom.click(select(&dom, ".edit"));
	dom.click(select(&dom, "span"));
	dom.click(select(&dom, "#users"));
	dom.click(select(&dom, "#stray"));

	assert_eq!(*hits.borrow(), vec![Some("1".to_owned()), Some("2".to_owned())]);
}

#[test]
fn other_events_are_ignored() {
	let dom = document();
	let hits = log();
	let recorded = hits.clone();
	delegate(&dom, "submit", "#users", ".row", move |row: &NodeId, _| recorded.borrow_mut().push(*row), false).unwrap();

	dom.click(select(&dom, ".edit"));
	assert!(hits.borrow().is_empty());
}

#[test]
fn missing_ancestor_is_an_error() {
	let dom = document();
	let error = delegate(&dom, "click", "#nowhere", ".row", |_, _| (), false).unwrap_err();
	assert!(matches!(&error, Error::Selector(message) if message.contains("#nowhere")), "{:?}", error);
	assert_eq!(dom.listener_count(), 0);
}

#[test]
fn repeated_delegations_all_fire() {
	let dom = document();
	let hits = log();
	for _ in 0..2 {
		let hits = hits.clone();
		delegate(&dom, "click", "body", "button", move |_, _| hits.borrow_mut().push(()), false).unwrap();
	}
	dom.click(select(&dom, ".edit"));
	assert_eq!(hits.borrow().len(), 2);
	assert_eq!(dom.listener_count(), 2);
}

#[test]
fn matching_stops_at_bound_ancestor() {
	let dom = document();
	let hits = log();
	let recorded = hits.clone();
	delegate(&dom, "click", "#users", "section", move |section: &NodeId, _| recorded.borrow_mut().push(*section), false).unwrap();

	dom.click(select(&dom, ".edit"));
	assert!(hits.borrow().is_empty(), "Elements above the bound ancestor must not match.");
}

#[test]
fn bound_ancestor_itself_can_match() {
	let dom = document();
	let hits = log();
	let recorded = hits.clone();
	delegate(&dom, "click", "#users", "table", move |table: &NodeId, _| recorded.borrow_mut().push(*table), false).unwrap();

	dom.click(select(&dom, "span"));
	assert_eq!(*hits.borrow(), vec![select(&dom, "#users")]);
}

#[test]
fn closest_walks_up_to_boundary() {
	let dom = document();
	let (button, users, outer) = (select(&dom, ".edit"), select(&dom, "#users"), select(&dom, "#outer"));

	assert_eq!(closest(&dom, button, "tr", &users).unwrap(), Some(select(&dom, "tr")));
	assert_eq!(closest(&dom, button, "button", &users).unwrap(), Some(button));
	assert_eq!(closest(&dom, button, "section", &users).unwrap(), None);
	assert_eq!(closest(&dom, button, "section", &outer).unwrap(), Some(outer));
	assert!(matches!(closest(&dom, button, "tr >", &users), Err(Error::Selector(_))));
}
