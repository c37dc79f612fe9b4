//! The CSS selector subset understood by [`MemoryDom`](`super::MemoryDom`).
//!
//! Supported: selector lists (`a, b`), descendant (` `) and child (`>`) combinators, type selectors, `*`, `#id`,
//! `.class`, `[attr]`, `[attr=value]` (value bare, single- or double-quoted) and `:not(<selector list>)`.

use crate::error::{Error, Result};

/// Read access to an element tree, as needed for matching.
pub(crate) trait SelectorTree {
	type Node: Copy;

	/// Lower-cased tag name, or [`None`] if `node` isn't an element.
	fn local_name(&self, node: Self::Node) -> Option<&str>;
	fn attribute(&self, node: Self::Node, name: &str) -> Option<&str>;
	fn parent_element(&self, node: Self::Node) -> Option<Self::Node>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Condition {
	Id(String),
	Class(String),
	Exists(String),
	Equals(String, String),
	Not(SelectorList),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
	tag: Option<String>,
	conditions: Vec<Condition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
	Descendant,
	Child,
}

/// A compound selector and how it relates to the one on its left.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Part {
	compound: Compound,
	combinator: Option<Combinator>,
}

/// A parsed selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SelectorList(Vec<Vec<Part>>);

fn invalid(selector: &str) -> Error {
	Error::Selector(format!("{:?} is not a valid selector", selector))
}

impl SelectorList {
	/// # Errors
	///
	/// [`Error::Selector`] iff `selector` is empty or uses unsupported syntax.
	pub(crate) fn parse(selector: &str) -> Result<Self> {
		split_top_level(selector, |c| c == ',')
			.ok_or_else(|| invalid(selector))?
			.into_iter()
			.map(|group| parse_chain(group).ok_or_else(|| invalid(selector)))
			.collect::<Result<_>>()
			.map(Self)
	}

	pub(crate) fn matches<T: SelectorTree>(&self, tree: &T, node: T::Node) -> bool {
		tree.local_name(node).is_some() && self.0.iter().any(|chain| matches_chain(tree, node, chain))
	}
}

/// Splits at `separator` outside brackets, parentheses and quotes. Segments are trimmed. [`None`] on unbalanced input
/// or empty segments.
fn split_top_level(input: &str, separator: impl Fn(char) -> bool) -> Option<Vec<&str>> {
	let mut segments = Vec::new();
	let (mut brackets, mut parens, mut quote) = (0_usize, 0_usize, None);
	let mut start = 0;
	for (i, c) in input.char_indices() {
		if let Some(q) = quote {
			if c == q {
				quote = None;
			}
			continue;
		}
		match c {
			'"' | '\'' => quote = Some(c),
			'[' => brackets += 1,
			']' => brackets = brackets.checked_sub(1)?,
			'(' => parens += 1,
			')' => parens = parens.checked_sub(1)?,
			c if brackets == 0 && parens == 0 && separator(c) => {
				segments.push(input[start..i].trim());
				start = i + c.len_utf8();
			}
			_ => (),
		}
	}
	if brackets != 0 || parens != 0 || quote.is_some() {
		return None;
	}
	segments.push(input[start..].trim());
	if segments.iter().any(|segment| segment.is_empty()) {
		return None;
	}
	Some(segments)
}

fn parse_chain(group: &str) -> Option<Vec<Part>> {
	// `>` is always a token of its own, with or without surrounding whitespace.
	let mut tokens = Vec::new();
	let (mut brackets, mut parens, mut quote) = (0_usize, 0_usize, None);
	let mut current = String::new();
	for c in group.chars() {
		if let Some(q) = quote {
			if c == q {
				quote = None;
			}
			current.push(c);
			continue;
		}
		match c {
			'"' | '\'' => quote = Some(c),
			'[' => brackets += 1,
			']' => brackets = brackets.checked_sub(1)?,
			'(' => parens += 1,
			')' => parens = parens.checked_sub(1)?,
			_ => (),
		}
		let top = brackets == 0 && parens == 0;
		if top && (c.is_whitespace() || c == '>') {
			if !current.is_empty() {
				tokens.push(core::mem::take(&mut current));
			}
			if c == '>' {
				tokens.push(">".to_owned());
			}
		} else {
			current.push(c);
		}
	}
	if !current.is_empty() {
		tokens.push(current);
	}

	let mut parts = Vec::new();
	let mut pending = None;
	for token in tokens {
		if token == ">" {
			if pending.is_some() || parts.is_empty() {
				return None;
			}
			pending = Some(Combinator::Child);
			continue;
		}
		let combinator = if parts.is_empty() { None } else { Some(pending.take().unwrap_or(Combinator::Descendant)) };
		parts.push(Part { compound: parse_compound(&token)?, combinator });
	}
	if parts.is_empty() || pending.is_some() {
		return None;
	}
	Some(parts)
}

fn is_ident_char(c: char) -> bool {
	c.is_alphanumeric() || c == '-' || c == '_'
}

fn take_ident(input: &str) -> Option<(&str, &str)> {
	let end = input.find(|c| !is_ident_char(c)).unwrap_or(input.len());
	(end > 0).then(|| input.split_at(end))
}

fn parse_compound(mut input: &str) -> Option<Compound> {
	let mut compound = Compound::default();
	if let Some(rest) = input.strip_prefix('*') {
		input = rest;
	} else if let Some((tag, rest)) = take_ident(input) {
		compound.tag = Some(tag.to_ascii_lowercase());
		input = rest;
	}

	while !input.is_empty() {
		if let Some(rest) = input.strip_prefix('#') {
			let (id, rest) = take_ident(rest)?;
			compound.conditions.push(Condition::Id(id.to_owned()));
			input = rest;
		} else if let Some(rest) = input.strip_prefix('.') {
			let (class, rest) = take_ident(rest)?;
			compound.conditions.push(Condition::Class(class.to_owned()));
			input = rest;
		} else if let Some(rest) = input.strip_prefix('[') {
			let (condition, rest) = parse_attribute(rest)?;
			compound.conditions.push(condition);
			input = rest;
		} else if let Some(rest) = input.strip_prefix(":not(") {
			let end = closing_paren(rest)?;
			let inner = SelectorList::parse(&rest[..end]).ok()?;
			compound.conditions.push(Condition::Not(inner));
			input = &rest[end + 1..];
		} else {
			return None;
		}
	}
	Some(compound)
}

/// Index of the `)` closing an already opened parenthesis.
fn closing_paren(input: &str) -> Option<usize> {
	let (mut depth, mut quote) = (0_usize, None);
	for (i, c) in input.char_indices() {
		if let Some(q) = quote {
			if c == q {
				quote = None;
			}
			continue;
		}
		match c {
			'"' | '\'' => quote = Some(c),
			'(' => depth += 1,
			')' if depth == 0 => return Some(i),
			')' => depth -= 1,
			_ => (),
		}
	}
	None
}

/// Parses after `[` up to and including `]`.
fn parse_attribute(input: &str) -> Option<(Condition, &str)> {
	let input = input.trim_start();
	let (name, rest) = take_ident(input)?;
	let name = name.to_ascii_lowercase();
	let rest = rest.trim_start();
	if let Some(rest) = rest.strip_prefix(']') {
		return Some((Condition::Exists(name), rest));
	}

	let rest = rest.strip_prefix('=')?.trim_start();
	let (value, rest) = match rest.chars().next()? {
		q @ ('"' | '\'') => {
			let end = rest[1..].find(q)? + 1;
			(&rest[1..end], &rest[end + 1..])
		}
		_ => {
			let end = rest.find(']')?;
			(rest[..end].trim_end(), &rest[end..])
		}
	};
	let rest = rest.trim_start().strip_prefix(']')?;
	Some((Condition::Equals(name, value.to_owned()), rest))
}

fn matches_compound<T: SelectorTree>(tree: &T, node: T::Node, compound: &Compound) -> bool {
	let Some(name) = tree.local_name(node) else { return false };
	if compound.tag.as_deref().map_or(false, |tag| tag != name) {
		return false;
	}
	compound.conditions.iter().all(|condition| match condition {
		Condition::Id(id) => tree.attribute(node, "id") == Some(id.as_str()),
		Condition::Class(class) => tree.attribute(node, "class").map_or(false, |classes| classes.split_whitespace().any(|c| c == class)),
		Condition::Exists(name) => tree.attribute(node, name).is_some(),
		Condition::Equals(name, value) => tree.attribute(node, name) == Some(value.as_str()),
		Condition::Not(inner) => !inner.matches(tree, node),
	})
}

/// Matches right to left. Descendant steps take the nearest matching ancestor, without backtracking.
fn matches_chain<T: SelectorTree>(tree: &T, node: T::Node, chain: &[Part]) -> bool {
	let Some((last, rest)) = chain.split_last() else { return false };
	if !matches_compound(tree, node, &last.compound) {
		return false;
	}

	let mut current = node;
	let mut combinator = last.combinator;
	for part in rest.iter().rev() {
		let found = match combinator.unwrap_or(Combinator::Descendant) {
			Combinator::Child => tree.parent_element(current).filter(|&parent| matches_compound(tree, parent, &part.compound)),
			Combinator::Descendant => {
				let mut cursor = tree.parent_element(current);
				loop {
					match cursor {
						Some(ancestor) if matches_compound(tree, ancestor, &part.compound) => break Some(ancestor),
						Some(ancestor) => cursor = tree.parent_element(ancestor),
						None => break None,
					}
				}
			}
		};
		let Some(found) = found else { return false };
		current = found;
		combinator = part.combinator;
	}
	true
}

#[cfg(test)]
mod tests {
	use super::*;

	/// `(tag, attributes, parent)`
	struct Flat(Vec<(&'static str, Vec<(&'static str, &'static str)>, Option<usize>)>);

	impl SelectorTree for Flat {
		type Node = usize;

		fn local_name(&self, node: usize) -> Option<&str> {
			Some(self.0[node].0)
		}

		fn attribute(&self, node: usize, name: &str) -> Option<&str> {
			self.0[node].1.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
		}

		fn parent_element(&self, node: usize) -> Option<usize> {
			self.0[node].2
		}
	}

	fn tree() -> Flat {
		Flat(vec![
			("body", vec![], None),
			("form", vec![("id", "edit"), ("class", "card wide")], Some(0)),
			("input", vec![("name", "title"), ("type", "text")], Some(1)),
			("input", vec![("name", "note"), ("class", "not-required")], Some(1)),
			("div", vec![("data-name", "user name")], Some(1)),
		])
	}

	fn matching(selector: &str) -> Vec<usize> {
		let tree = tree();
		let list = SelectorList::parse(selector).unwrap();
		(0..tree.0.len()).filter(|&node| list.matches(&tree, node)).collect()
	}

	#[test]
	fn compounds() {
		assert_eq!(matching("*"), vec![0, 1, 2, 3, 4]);
		assert_eq!(matching("#edit"), vec![1]);
		assert_eq!(matching("form.card.wide"), vec![1]);
		assert_eq!(matching(".card.narrow"), Vec::<usize>::new());
		assert_eq!(matching("input[type=text]"), vec![2]);
		assert_eq!(matching("[data-name=\"user name\"]"), vec![4]);
		assert_eq!(matching("[data-name='user name']"), vec![4]);
	}

	#[test]
	fn combinators_and_lists() {
		assert_eq!(matching("body input"), vec![2, 3]);
		assert_eq!(matching("body > input"), Vec::<usize>::new());
		assert_eq!(matching("form>input"), vec![2, 3]);
		assert_eq!(matching("div, input[name=note]"), vec![3, 4]);
		assert_eq!(matching("[name]:not(.not-required)"), vec![2]);
	}

	#[test]
	fn rejects_unsupported() {
		for selector in ["", "a,", "> a", "a >", "[name", "a:hover", "a:not(b", "#"] {
			assert!(matches!(SelectorList::parse(selector), Err(Error::Selector(_))), "{:?}", selector);
		}
	}
}
