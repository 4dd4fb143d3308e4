//! Regex search and replace over `w:t` text leaves.
//!
//! Word splits a paragraph's text into runs whenever formatting, spell
//! checking or revision tracking changes, so a placeholder such as
//! `{{name}}` is often stored as `{{na` + `me}}`. [`replace`] keeps a sliding
//! window over the most recent non-empty leaves. Each time a leaf enters the
//! window, the sub-ranges ending at it are matched shortest first, and only
//! matches reaching into the new leaf count, so text already rewritten in
//! earlier leaves is never matched again.

use std::collections::VecDeque;

use regex::{NoExpand, Regex};

use crate::error::{Error, Result};
use crate::xml::namespace::W;
use crate::xml::XmlElement;

/// What a match is replaced with
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplacementPayload {
    /// Substitute text; `$1` / `${name}` refer to capture groups
    Text(String),
    /// Append one element to the run holding the match
    Node(XmlElement),
    /// Append several elements, in order
    NodeList(Vec<XmlElement>),
}

impl ReplacementPayload {
    /// Elements to insert, empty for text payloads
    fn nodes(&self) -> &[XmlElement] {
        match self {
            ReplacementPayload::Text(_) => &[],
            ReplacementPayload::Node(node) => std::slice::from_ref(node),
            ReplacementPayload::NodeList(nodes) => nodes,
        }
    }

    /// Rewrite `text`, substituting or removing every match
    fn substitute(&self, pattern: &Regex, text: &str) -> String {
        match self {
            ReplacementPayload::Text(with) => pattern.replace_all(text, with.as_str()).into_owned(),
            _ => pattern.replace_all(text, NoExpand("")).into_owned(),
        }
    }

    /// Rewrite the non-empty matches of `text` that end after byte `from`;
    /// earlier matches are left as they are
    fn substitute_after(&self, pattern: &Regex, text: &str, from: usize) -> String {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for caps in pattern.captures_iter(text) {
            let Some(m) = caps.get(0) else {
                continue;
            };
            if m.is_empty() || m.end() <= from {
                continue;
            }
            out.push_str(&text[last..m.start()]);
            if let ReplacementPayload::Text(with) = self {
                caps.expand(with, &mut out);
            }
            last = m.end();
        }
        out.push_str(&text[last..]);
        out
    }
}

impl From<&str> for ReplacementPayload {
    fn from(text: &str) -> Self {
        ReplacementPayload::Text(text.to_string())
    }
}

impl From<String> for ReplacementPayload {
    fn from(text: String) -> Self {
        ReplacementPayload::Text(text)
    }
}

impl From<XmlElement> for ReplacementPayload {
    fn from(node: XmlElement) -> Self {
        ReplacementPayload::Node(node)
    }
}

impl From<Vec<XmlElement>> for ReplacementPayload {
    fn from(nodes: Vec<XmlElement>) -> Self {
        ReplacementPayload::NodeList(nodes)
    }
}

/// Whether an element carries run text
pub fn is_text_leaf(element: &XmlElement) -> bool {
    element.is(W, "t")
}

/// Text leaves below `root`, in document order
pub fn text_leaves(root: &XmlElement) -> impl Iterator<Item = &XmlElement> {
    root.descendants().filter(|e| is_text_leaf(e))
}

/// Last text leaf whose own text matches `pattern`
pub fn search<'a>(root: &'a XmlElement, pattern: &Regex) -> Option<&'a XmlElement> {
    text_leaves(root)
        .filter(|leaf| !leaf.text().is_empty() && pattern.is_match(leaf.text()))
        .last()
}

/// Text of every paragraph in document order, skipping empty ones
pub fn paragraph_texts(root: &XmlElement) -> Vec<String> {
    root.descendants()
        .filter(|e| e.is(W, "p"))
        .map(|p| text_leaves(p).map(XmlElement::text).collect::<String>())
        .filter(|text| !text.is_empty())
        .collect()
}

/// Replace matches inside single leaves.
///
/// Text payloads substitute within each matching leaf. Element payloads
/// detach the matching leaf and attach clones of the payload at its
/// position. Returns the number of leaves rewritten.
pub fn replace_in_leaves(
    root: &mut XmlElement,
    pattern: &Regex,
    payload: &ReplacementPayload,
) -> usize {
    let paths = root.find_paths(|e| {
        is_text_leaf(e) && !e.text().is_empty() && pattern.is_match(e.text())
    });

    let mut count = 0;
    // Reverse document order keeps the remaining paths valid while leaves
    // are swapped for a different number of siblings
    for path in paths.iter().rev() {
        match payload {
            ReplacementPayload::Text(_) => {
                if let Some(leaf) = root.get_mut(path) {
                    let text = payload.substitute(pattern, leaf.text());
                    leaf.set_text(text);
                    count += 1;
                }
            }
            _ => {
                let Some((&index, parent_path)) = path.split_last() else {
                    log::warn!("cannot replace the root element; skipped");
                    continue;
                };
                let Some(parent) = root.get_mut(parent_path) else {
                    continue;
                };
                if parent
                    .replace_child_with(index, payload.nodes().iter().cloned())
                    .is_some()
                {
                    count += 1;
                }
            }
        }
    }
    count
}

/// Replace every match whose text may be spread over up to `window`
/// adjacent text leaves.
///
/// The leaf holding the start of a match (the host) receives the rewritten
/// text of the whole matched span, the other leaves of the span are
/// emptied. A match must end inside the leaf that just entered the window,
/// so a replaced host is not rewritten again while it stays in the window.
/// Element payloads are appended to the host's run. Elements added by a
/// replacement are not scanned. Returns the number of matched spans.
pub fn replace(
    root: &mut XmlElement,
    pattern: &Regex,
    payload: &ReplacementPayload,
    window: usize,
) -> Result<usize> {
    if window == 0 {
        return Err(Error::InvalidWindowSize(window));
    }

    let leaves = root.find_paths(is_text_leaf);
    let mut recent: VecDeque<&[usize]> = VecDeque::with_capacity(window + 1);
    let mut count = 0;

    for path in &leaves {
        if leaf_text(root, path).is_empty() {
            continue;
        }
        recent.push_back(path);
        if recent.len() > window {
            recent.pop_front();
        }

        let Some(found) = find_span(root, &recent, pattern) else {
            continue;
        };
        log::debug!(
            "matched /{}/ in {:?} over {} leaves",
            pattern.as_str(),
            found.text,
            found.span.len()
        );
        apply(root, &found, pattern, payload);
        count += 1;
    }

    Ok(count)
}

/// A matched contiguous run of window leaves ending at the newest one
struct Span<'p> {
    span: Vec<&'p [usize]>,
    text: String,
    /// Byte offset of the first counted match in `text`
    start: usize,
    /// Byte offset in `text` where the newest leaf begins
    boundary: usize,
}

/// Shortest sub-range ending at the newest window leaf whose concatenated
/// text holds a non-empty match ending inside that leaf
fn find_span<'p>(
    root: &XmlElement,
    recent: &VecDeque<&'p [usize]>,
    pattern: &Regex,
) -> Option<Span<'p>> {
    let texts: Vec<&str> = recent.iter().map(|path| leaf_text(root, path)).collect();
    let newest = texts.last()?.len();

    for len in 1..=texts.len() {
        let start = texts.len() - len;
        let text: String = texts[start..].concat();
        let boundary = text.len() - newest;
        let Some(m) = pattern
            .find_iter(&text)
            .find(|m| !m.is_empty() && m.end() > boundary)
        else {
            continue;
        };
        return Some(Span {
            span: recent.range(start..).copied().collect(),
            start: m.start(),
            boundary,
            text,
        });
    }
    None
}

fn apply(root: &mut XmlElement, found: &Span<'_>, pattern: &Regex, payload: &ReplacementPayload) {
    let lengths: Vec<usize> = found
        .span
        .iter()
        .map(|path| leaf_text(root, path).len())
        .collect();

    let mut seen = 0;
    let mut host = None;
    for (path, len) in found.span.iter().zip(lengths) {
        seen += len;
        let Some(leaf) = root.get_mut(path) else {
            continue;
        };
        if host.is_none() && seen > found.start {
            leaf.set_text(payload.substitute_after(pattern, &found.text, found.boundary));
            host = Some(*path);
        } else {
            leaf.set_text("");
        }
    }

    let nodes = payload.nodes();
    if nodes.is_empty() {
        return;
    }
    let Some(host) = host else {
        return;
    };
    let run_path = host.split_last().map_or(host, |(_, parent)| parent);
    if let Some(run) = root.get_mut(run_path) {
        run.children.extend(nodes.iter().cloned());
    }
}

fn leaf_text<'a>(root: &'a XmlElement, path: &[usize]) -> &'a str {
    root.get(path).map_or("", XmlElement::text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::{ElementFactory, Namespaces};
    use pretty_assertions::assert_eq;

    fn factory() -> ElementFactory<'static> {
        ElementFactory::new(Namespaces::standard())
    }

    fn paragraph(pieces: &[&str]) -> XmlElement {
        let f = factory();
        let mut p = f.element("w:p").unwrap();
        for piece in pieces {
            let run = f
                .element("w:r")
                .unwrap()
                .with_child(f.text_element("w:t", *piece).unwrap());
            p.push_child(run);
        }
        p
    }

    fn body(paragraphs: Vec<XmlElement>) -> XmlElement {
        let mut body = factory().element("w:body").unwrap();
        body.children = paragraphs;
        body
    }

    fn leaves(root: &XmlElement) -> Vec<&str> {
        text_leaves(root).map(XmlElement::text).collect()
    }

    fn run(p: &XmlElement, index: usize) -> &XmlElement {
        &p.children[index]
    }

    #[test]
    fn test_match_across_two_leaves() {
        let mut p = paragraph(&["Hel", "lo,", " world!"]);
        let re = Regex::new("Hello,").unwrap();

        let count = replace(&mut p, &re, &"Hi!".into(), 3).unwrap();

        assert_eq!(count, 1);
        assert_eq!(leaves(&p), ["Hi!", "", " world!"]);
    }

    #[test]
    fn test_match_across_three_leaves_keeps_trailing_text() {
        let mut p = paragraph(&["Hel", "lo,", " world!"]);
        let re = Regex::new("Hello, world").unwrap();

        replace(&mut p, &re, &"Hi!".into(), 3).unwrap();

        assert_eq!(leaves(&p), ["Hi!!", "", ""]);
    }

    #[test]
    fn test_replaced_host_is_not_matched_again() {
        let mut p = paragraph(&["Acme Ltd", " and", " partners"]);
        let re = Regex::new("Ltd").unwrap();

        let count = replace(&mut p, &re, &"Ltd.".into(), 3).unwrap();

        assert_eq!(count, 1);
        assert_eq!(leaves(&p), ["Acme Ltd.", " and", " partners"]);
        assert_eq!(paragraph_texts(&p), ["Acme Ltd. and partners"]);
    }

    #[test]
    fn test_payload_containing_the_pattern_is_replaced_once() {
        let mut p = paragraph(&["x", "y", "x", "z"]);
        let re = Regex::new("x").unwrap();

        let count = replace(&mut p, &re, &"xx".into(), 3).unwrap();

        assert_eq!(count, 2);
        assert_eq!(leaves(&p), ["xx", "y", "xx", "z"]);
    }

    #[test]
    fn test_match_completed_after_a_replacement() {
        let mut p = paragraph(&["ab", "a", "b"]);
        let re = Regex::new("ab").unwrap();

        let count = replace(&mut p, &re, &"X".into(), 3).unwrap();

        assert_eq!(count, 2);
        assert_eq!(leaves(&p), ["X", "X", ""]);
    }

    #[test]
    fn test_single_leaf_match() {
        let mut p = paragraph(&["Hel", "lo,", " world!"]);
        let re = Regex::new("Hel").unwrap();

        replace(&mut p, &re, &"Hal".into(), 3).unwrap();

        assert_eq!(leaves(&p), ["Hal", "lo,", " world!"]);
    }

    #[test]
    fn test_plain_substitution_within_one_leaf() {
        let mut p = paragraph(&["Dear ", "Mr Smith", ", hello"]);
        let re = Regex::new("Smith").unwrap();

        replace(&mut p, &re, &"Jones".into(), 3).unwrap();

        assert_eq!(leaves(&p), ["Dear ", "Mr Jones", ", hello"]);
        assert_eq!(paragraph_texts(&p), ["Dear Mr Jones, hello"]);
    }

    #[test]
    fn test_window_of_one_never_spans_leaves() {
        let mut p = paragraph(&["Hel", "lo,", " world!"]);
        let re = Regex::new("Hello").unwrap();

        let count = replace(&mut p, &re, &"Hi".into(), 1).unwrap();

        assert_eq!(count, 0);
        assert_eq!(leaves(&p), ["Hel", "lo,", " world!"]);
    }

    #[test]
    fn test_match_wider_than_window_is_not_found() {
        let mut p = paragraph(&["a", "b", "c", "d"]);
        let re = Regex::new("abcd").unwrap();

        assert_eq!(replace(&mut p, &re, &"x".into(), 3).unwrap(), 0);
        assert_eq!(replace(&mut p, &re, &"x".into(), 4).unwrap(), 1);
        assert_eq!(leaves(&p), ["x", "", "", ""]);
    }

    #[test]
    fn test_zero_window_is_rejected() {
        let mut p = paragraph(&["Hello"]);
        let re = Regex::new("Hello").unwrap();

        assert!(matches!(
            replace(&mut p, &re, &"Hi".into(), 0),
            Err(Error::InvalidWindowSize(0))
        ));
    }

    #[test]
    fn test_empty_leaves_are_skipped() {
        let mut p = paragraph(&["{{na", "", "me}}"]);
        let re = Regex::new(r"\{\{name\}\}").unwrap();

        // The empty leaf does not take a window slot
        let count = replace(&mut p, &re, &"Ada".into(), 2).unwrap();

        assert_eq!(count, 1);
        assert_eq!(leaves(&p), ["Ada", "", ""]);
    }

    #[test]
    fn test_zero_length_matches_are_ignored() {
        let mut p = paragraph(&["abc"]);
        let re = Regex::new("x*").unwrap();

        assert_eq!(replace(&mut p, &re, &"y".into(), 3).unwrap(), 0);
        assert_eq!(leaves(&p), ["abc"]);
    }

    #[test]
    fn test_capture_groups_expand_in_text_payload() {
        let mut p = paragraph(&["Hel", "lo"]);
        let re = Regex::new("(?P<stem>Hel)lo").unwrap();

        replace(&mut p, &re, &"${stem}p".into(), 3).unwrap();

        assert_eq!(leaves(&p), ["Help", ""]);
    }

    #[test]
    fn test_matches_in_several_paragraphs() {
        let mut root = body(vec![
            paragraph(&["To: {{na", "me}}"]),
            paragraph(&["nothing here"]),
            paragraph(&["Dear {{name}},"]),
        ]);
        let re = Regex::new(r"\{\{name\}\}").unwrap();

        let count = replace(&mut root, &re, &"Ada".into(), 3).unwrap();

        assert_eq!(count, 2);
        assert_eq!(
            paragraph_texts(&root),
            ["To: Ada", "nothing here", "Dear Ada,"]
        );
    }

    #[test]
    fn test_node_payload_is_appended_to_host_run() {
        let f = factory();
        let mut p = paragraph(&["Dear ", "{{na", "me}}"]);
        let re = Regex::new(r"\{\{name\}\}").unwrap();
        let payload = ReplacementPayload::Node(f.element("w:br").unwrap());

        replace(&mut p, &re, &payload, 3).unwrap();

        assert_eq!(leaves(&p), ["Dear ", "", ""]);
        let host = run(&p, 1);
        assert_eq!(host.children.len(), 2);
        assert!(host.children[1].is(W, "br"));
        assert_eq!(run(&p, 2).children.len(), 1);
    }

    #[test]
    fn test_node_payload_keeps_text_around_the_match() {
        let f = factory();
        let mut p = paragraph(&["see [img] here"]);
        let re = Regex::new(r"\[img\]").unwrap();
        let payload = ReplacementPayload::Node(f.element("w:drawing").unwrap());

        replace(&mut p, &re, &payload, 3).unwrap();

        assert_eq!(leaves(&p), ["see  here"]);
        assert!(run(&p, 0).children[1].is(W, "drawing"));
    }

    #[test]
    fn test_node_list_payload_appends_in_order() {
        let f = factory();
        let mut p = paragraph(&["{{sig", "}}"]);
        let re = Regex::new(r"\{\{sig\}\}").unwrap();
        let payload = ReplacementPayload::NodeList(vec![
            f.element("w:tab").unwrap(),
            f.text_element("w:t", "signed").unwrap(),
        ]);

        replace(&mut p, &re, &payload, 3).unwrap();

        let host = run(&p, 0);
        let names: Vec<_> = host.children.iter().map(|c| c.name.local.as_str()).collect();
        assert_eq!(names, ["t", "tab", "t"]);
        // Appended leaves were not rescanned
        assert_eq!(host.children[2].text(), "signed");
    }

    #[test]
    fn test_no_match_leaves_tree_untouched() {
        let mut p = paragraph(&["Hel", "lo"]);
        let before = p.clone();
        let re = Regex::new("absent").unwrap();

        assert_eq!(replace(&mut p, &re, &"x".into(), 3).unwrap(), 0);
        assert_eq!(p, before);
    }

    #[test]
    fn test_search_returns_last_matching_leaf() {
        let p = paragraph(&["one fish", "two fish", "red"]);
        let re = Regex::new("fish").unwrap();

        let found = search(&p, &re).unwrap();
        assert_eq!(found.text(), "two fish");
        assert!(search(&p, &Regex::new("blue").unwrap()).is_none());
    }

    #[test]
    fn test_paragraph_texts_skips_empty_paragraphs() {
        let f = factory();
        let root = body(vec![
            paragraph(&["First ", "line"]),
            f.element("w:p").unwrap(),
            paragraph(&["", ""]),
            paragraph(&["Last"]),
        ]);

        assert_eq!(paragraph_texts(&root), ["First line", "Last"]);
    }

    #[test]
    fn test_replace_in_leaves_with_text() {
        let mut p = paragraph(&["foo bar", "bar", "baz"]);
        let re = Regex::new("bar").unwrap();

        let count = replace_in_leaves(&mut p, &re, &"qux".into());

        assert_eq!(count, 2);
        assert_eq!(leaves(&p), ["foo qux", "qux", "baz"]);
    }

    #[test]
    fn test_replace_in_leaves_with_nodes_swaps_the_leaf() {
        let f = factory();
        let mut p = paragraph(&["keep", "{{logo}}", "{{logo}}"]);
        let re = Regex::new(r"\{\{logo\}\}").unwrap();
        let payload = ReplacementPayload::NodeList(vec![
            f.element("w:drawing").unwrap(),
            f.element("w:br").unwrap(),
        ]);

        let count = replace_in_leaves(&mut p, &re, &payload);

        assert_eq!(count, 2);
        assert_eq!(leaves(&p), ["keep"]);
        for index in [1, 2] {
            let names: Vec<_> = run(&p, index)
                .children
                .iter()
                .map(|c| c.name.local.as_str())
                .collect();
            assert_eq!(names, ["drawing", "br"]);
        }
    }
}
