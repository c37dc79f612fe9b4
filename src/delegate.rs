//! Event delegation.

use crate::{
	dom::Dom,
	error::{Error, Result},
};
use std::rc::Rc;
use tracing::{error, instrument, trace_span};

/// Binds one `event` listener on the first element matching `ancestor_selector` and dispatches to descendants matching
/// `target_selector`.
///
/// The ancestor is resolved once, now. For each event reaching it, the nearest inclusive ancestor of the event target
/// matching `target_selector` (searched up to and including the bound ancestor) is passed to `listener` together with
/// the event. Events without such an element are ignored.
///
/// Repeated delegations of the same triple are not deduplicated, each one calls its listener.
///
/// # Errors
///
/// [`Error::Selector`] iff no element matches `ancestor_selector`, or if the registration itself fails.
#[instrument(skip(dom, listener))]
pub fn delegate<D: Dom>(
	dom: &D,
	event: &str,
	ancestor_selector: &str,
	target_selector: &str,
	listener: impl Fn(&D::Element, &D::Event) + 'static,
	use_capture: bool,
) -> Result<()> {
	let ancestor = dom
		.query_selector(ancestor_selector)?
		.ok_or_else(|| Error::Selector(format!("{} does not match any element in the DOM", ancestor_selector)))?;

	let target_selector = target_selector.to_owned();
	let event_name = event.to_owned();
	let boundary = ancestor.clone();
	let handle = dom.clone();
	dom.listen(
		&ancestor,
		event,
		use_capture,
		Rc::new(move |event: &D::Event| {
			let Some(target) = handle.event_target(event) else { return };
			match closest(&handle, target, &target_selector, &boundary) {
				Ok(Some(matched)) => {
					let span = trace_span!("delegated", event = event_name.as_str(), selector = target_selector.as_str());
					let _enter = span.enter();
					listener(&matched, event);
				}
				Ok(None) => (),
				Err(error) => error!("Delegated {:?} listener can't match {:?}: {}", event_name, target_selector, error),
			}
		}),
	)
}

/// Walks from `from` towards the root and returns the first element matching `selector`, stopping after `boundary`.
///
/// # Errors
///
/// Iff `selector` is invalid.
pub fn closest<D: Dom>(dom: &D, from: D::Element, selector: &str, boundary: &D::Element) -> Result<Option<D::Element>> {
	let mut cursor = Some(from);
	while let Some(element) = cursor {
		if dom.matches(&element, selector)? {
			return Ok(Some(element));
		}
		if &element == boundary {
			break;
		}
		cursor = dom.parent_element(&element);
	}
	Ok(None)
}
