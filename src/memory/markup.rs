//! A lenient HTML fragment parser, enough for server-rendered dashboard views.
//!
//! Character references are kept verbatim, so markup serializes back the way it was written as long as attributes
//! are double-quoted.

/// Elements that never have children or an end tag.
const VOID: &[&str] = &["area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr"];

/// Elements whose content is text up to their end tag.
const RAW_TEXT: &[&str] = &["script", "style", "textarea", "title"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Fragment {
	Element { tag: String, attributes: Vec<(String, String)>, children: Vec<Fragment> },
	Text(String),
}

pub(crate) fn is_void(tag: &str) -> bool {
	VOID.contains(&tag)
}

struct Open {
	tag: String,
	attributes: Vec<(String, String)>,
	children: Vec<Fragment>,
}

/// Parses `html` into top-level fragments. Never fails: unknown constructs become text, unclosed elements are closed at
/// the end and stray end tags are dropped.
pub(crate) fn parse(html: &str) -> Vec<Fragment> {
	fn push(stack: &mut [Open], top: &mut Vec<Fragment>, fragment: Fragment) {
		match stack.last_mut() {
			Some(open) => open.children.push(fragment),
			None => top.push(fragment),
		}
	}

	fn close(stack: &mut Vec<Open>, top: &mut Vec<Fragment>) {
		if let Some(Open { tag, attributes, children }) = stack.pop() {
			push(stack, top, Fragment::Element { tag, attributes, children });
		}
	}

	let mut stack: Vec<Open> = Vec::new();
	let mut top = Vec::new();
	let mut rest = html;
	while !rest.is_empty() {
		if let Some(comment) = rest.strip_prefix("<!--") {
			rest = comment.find("-->").map_or("", |end| &comment[end + 3..]);
		} else if rest.starts_with("<!") || rest.starts_with("<?") {
			rest = rest.find('>').map_or("", |end| &rest[end + 1..]);
		} else if let Some(end_tag) = rest.strip_prefix("</") {
			let end = end_tag.find('>').unwrap_or(end_tag.len());
			let tag = end_tag[..end].trim().to_ascii_lowercase();
			rest = end_tag.get(end + 1..).unwrap_or("");
			if let Some(depth) = stack.iter().rposition(|open| open.tag == tag) {
				while stack.len() > depth {
					close(&mut stack, &mut top);
				}
			}
		} else if let Some((tag, attributes, self_closing, after)) = rest.strip_prefix('<').and_then(start_tag) {
			rest = after;
			if is_void(&tag) || self_closing {
				push(&mut stack, &mut top, Fragment::Element { tag, attributes, children: Vec::new() });
			} else if RAW_TEXT.contains(&tag.as_str()) {
				let terminator = format!("</{tag}");
				let end = find_ascii_case_insensitive(rest, &terminator).unwrap_or(rest.len());
				let children = if end == 0 { Vec::new() } else { vec![Fragment::Text(rest[..end].to_owned())] };
				rest = &rest[end..];
				rest = rest.find('>').map_or("", |close| &rest[close + 1..]);
				push(&mut stack, &mut top, Fragment::Element { tag, attributes, children });
			} else {
				stack.push(Open { tag, attributes, children: Vec::new() });
			}
		} else {
			// Text runs up to the next `<` that isn't the one we're standing on.
			let skip = rest.chars().next().map_or(0, char::len_utf8);
			let end = rest[skip..].find('<').map_or(rest.len(), |i| i + skip);
			push(&mut stack, &mut top, Fragment::Text(rest[..end].to_owned()));
			rest = &rest[end..];
		}
	}

	while !stack.is_empty() {
		close(&mut stack, &mut top);
	}
	top
}

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
	haystack.as_bytes().windows(needle.len()).position(|window| window.eq_ignore_ascii_case(needle.as_bytes()))
}

/// Parses after `<`: `(tag, attributes, self_closing, rest after '>')`.
fn start_tag(input: &str) -> Option<(String, Vec<(String, String)>, bool, &str)> {
	let end = input.find(|c: char| c.is_whitespace() || c == '>' || c == '/').unwrap_or(input.len());
	if end == 0 || !input.starts_with(|c: char| c.is_ascii_alphabetic()) {
		return None;
	}
	let tag = input[..end].to_ascii_lowercase();
	let mut rest = &input[end..];
	let mut attributes = Vec::new();

	loop {
		rest = rest.trim_start();
		if let Some(after) = rest.strip_prefix("/>") {
			return Some((tag, attributes, true, after));
		}
		if let Some(after) = rest.strip_prefix('>') {
			return Some((tag, attributes, false, after));
		}
		if let Some(after) = rest.strip_prefix('/') {
			rest = after;
			continue;
		}
		if rest.is_empty() {
			return None;
		}

		let name_end = rest.find(|c: char| c.is_whitespace() || c == '=' || c == '>' || c == '/').unwrap_or(rest.len());
		let name = rest[..name_end].to_ascii_lowercase();
		rest = rest[name_end..].trim_start();

		let value = if let Some(after) = rest.strip_prefix('=') {
			let after = after.trim_start();
			match after.chars().next() {
				Some(q @ ('"' | '\'')) => {
					let close = after[1..].find(q)? + 1;
					rest = &after[close + 1..];
					after[1..close].to_owned()
				}
				_ => {
					let value_end = after.find(|c: char| c.is_whitespace() || c == '>').unwrap_or(after.len());
					rest = &after[value_end..];
					after[..value_end].to_owned()
				}
			}
		} else {
			String::new()
		};
		if !name.is_empty() && !attributes.iter().any(|(existing, _)| existing == &name) {
			attributes.push((name, value));
		}
	}
}

/// Serializes an attribute list the way [`parse`] reads it back.
pub(crate) fn write_start_tag(out: &mut String, tag: &str, attributes: &[(String, String)]) {
	out.push('<');
	out.push_str(tag);
	for (name, value) in attributes {
		out.push(' ');
		out.push_str(name);
		out.push_str("=\"");
		out.push_str(&value.replace('"', "&quot;"));
		out.push('"');
	}
	out.push('>');
}
