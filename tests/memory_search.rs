
use dash_dom::{
	dom::Dom,
	memory::{MemoryDom, NodeId},
	search::SearchFilter,
	Config, Error, SearchOptions,
};
use memory_fixture_::{fixture_with, log, LOCATION};
use std::rc::Rc;

const CARDS: &str = concat!(
	r#"<div class="card" id="ada"><h3 data-name="name">Ada Lovelace</h3><p data-name="role">Analyst</p></div>"#,
	r#"<div class="card" id="grace"><h3 data-name="name">Grace Hopper</h3><p data-name="role">Admiral</p></div>"#,
	r#"<div class="card" id="alan"><h3 data-name="name">Alan Turing (C++)</h3><p data-name="role">Codebreaker</p></div>"#,
);

fn cards() -> (MemoryDom, SearchFilter<MemoryDom>) {
	let dom = MemoryDom::with_body(LOCATION, CARDS);
	let filter = SearchFilter::new(dom.clone());
	(dom, filter)
}

fn ids(dom: &MemoryDom, nodes: &[NodeId]) -> Vec<String> {
	nodes.iter().filter_map(|node| dom.attribute(node, "id")).collect()
}

fn displays(dom: &MemoryDom) -> Vec<Option<String>> {
	dom.query_selector_all(".card").unwrap().into_iter().map(|card| dom.display_of(card)).collect()
}

#[test]
fn shows_matches_and_hides_the_rest() {
	let (dom, filter) = cards();
	let found = filter.filter("^a", ".card", "name", SearchOptions::default()).unwrap();

	assert_eq!(ids(&dom, &found), vec!["ada", "alan"]);
	assert_eq!(displays(&dom), vec![Some("block".to_owned()), Some("none".to_owned()), Some("block".to_owned())]);
}

#[test]
fn matching_ignores_case() {
	let (dom, filter) = cards();
	let found = filter.filter("HOPPER", ".card", "name", SearchOptions::default()).unwrap();
	assert_eq!(ids(&dom, &found), vec!["grace"]);

	let found = filter.filter("ad", ".card", "role", SearchOptions::default()).unwrap();
	assert_eq!(ids(&dom, &found), vec!["grace"], "Only the named field is searched.");
}

#[test]
fn query_is_a_regular_expression() {
	let (dom, filter) = cards();
	assert_eq!(ids(&dom, &filter.filter(r"C\+\+", ".card", "name", SearchOptions::default()).unwrap()), vec!["alan"]);
	assert_eq!(ids(&dom, &filter.filter("lovelace|hopper", ".card", "name", SearchOptions::default()).unwrap()), vec!["ada", "grace"]);
	assert_eq!(filter.filter(".", ".card", "name", SearchOptions::default()).unwrap().len(), 3);
}

#[test]
fn invalid_pattern_changes_nothing() {
	let (dom, filter) = cards();
	let error = filter.filter("(ada", ".card", "name", SearchOptions::default()).unwrap_err();

	assert!(matches!(&error, Error::Pattern { pattern, .. } if pattern == "(ada"), "{:?}", error);
	assert_eq!(displays(&dom), vec![None, None, None]);
	assert_eq!(filter.scan_count(), 0);
}

#[test]
fn cache_reuses_previous_result() {
	let (dom, filter) = cards();
	let first = filter.filter("turing", ".card", "name", SearchOptions::default().cache(true)).unwrap();
	filter.filter(".", ".card", "name", SearchOptions::default().display("flex")).unwrap();
	assert_eq!(filter.scan_count(), 2);

	let second = filter.filter("turing", ".card", "name", SearchOptions::default().cache(true)).unwrap();
	assert!(Rc::ptr_eq(&first, &second));
	assert_eq!(filter.scan_count(), 2);
	assert_eq!(displays(&dom), vec![Some("none".to_owned()), Some("none".to_owned()), Some("block".to_owned())]);

	filter.clear_cache();
	let third = filter.filter("turing", ".card", "name", SearchOptions::default().cache(true)).unwrap();
	assert!(!Rc::ptr_eq(&first, &third));
	assert_eq!(*first, *third);
	assert_eq!(filter.scan_count(), 3);
}

#[test]
fn uncached_searches_always_scan() {
	let (_, filter) = cards();
	for _ in 0..3 {
		filter.filter("ada", ".card", "name", SearchOptions::default()).unwrap();
	}
	assert_eq!(filter.scan_count(), 3);
}

#[test]
fn on_empty_receives_query() {
	let (dom, filter) = cards();
	let empties = log();
	let recorded = empties.clone();
	let found = filter.filter("knuth", ".card", "name", SearchOptions::default().on_empty(move |query| recorded.borrow_mut().push(query.to_owned()))).unwrap();

	assert!(found.is_empty());
	assert_eq!(*empties.borrow(), vec!["knuth"]);
	assert_eq!(displays(&dom), vec![Some("none".to_owned()); 3]);

	let recorded = empties.clone();
	filter.filter("ada", ".card", "name", SearchOptions::default().on_empty(move |query| recorded.borrow_mut().push(query.to_owned()))).unwrap();
	assert_eq!(empties.borrow().len(), 1);
}

#[test]
fn container_without_field_is_an_error() {
	let dom = MemoryDom::with_body(LOCATION, &format!(r#"{}<div class="card" id="empty"></div>"#, CARDS));
	let filter = SearchFilter::new(dom.clone());
	let error = filter.filter("a", ".card", "name", SearchOptions::default()).unwrap_err();
	assert!(matches!(&error, Error::MissingField { field, .. } if field == "name"), "{:?}", error);
}

#[test]
fn dash_search_shares_one_cache() {
	let f = fixture_with(Config::default(), CARDS);
	let first = f.dash.search("grace", ".card", "name", SearchOptions::default().cache(true)).unwrap();
	let second = f.dash.clone().search("grace", ".card", "name", SearchOptions::default().cache(true)).unwrap();

	assert!(Rc::ptr_eq(&first, &second));
	assert_eq!(f.dash.search_filter().scan_count(), 1);
	assert_eq!(f.dom.display_of(f.select("#grace")).as_deref(), Some("block"));
}
