//! Tolerant markup scanning helpers
//!
//! Both upstream sources serve small, shape-pinned documents, so the
//! parsers scan known blocks instead of building a DOM. Tag detection is
//! case-insensitive and tolerant of attribute order, whitespace and
//! entity noise; scanning stays local to the block being read.

/// One element occurrence: its full opening tag and raw inner markup.
#[derive(Debug, Clone)]
pub struct TagBlock<'a> {
    /// Opening tag text, e.g. `<legislator name-id="A000370">`
    pub open: &'a str,
    /// Raw markup between the opening and closing tags
    pub inner: &'a str,
}

/// Case-insensitive substring search starting at `from`
pub fn find_ci(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let h = haystack.as_bytes();
    let n = needle.as_bytes();
    if n.is_empty() || from >= h.len() || h.len() < n.len() {
        return None;
    }
    let mut i = from;
    while i + n.len() <= h.len() {
        if h[i..i + n.len()].eq_ignore_ascii_case(n) {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// Position of the next `<tag` opening, requiring a word boundary so
/// `tr` does not match `<track`.
fn find_tag_open(doc: &str, tag: &str, from: usize) -> Option<usize> {
    let pat = format!("<{}", tag);
    let bytes = doc.as_bytes();
    let mut pos = from;
    while let Some(i) = find_ci(doc, &pat, pos) {
        match bytes.get(i + pat.len()) {
            Some(c) if c.is_ascii_whitespace() || *c == b'>' || *c == b'/' => return Some(i),
            None => return None,
            _ => pos = i + 1,
        }
    }
    None
}

/// All occurrences of `<tag ...>...</tag>` in document order, handling
/// same-tag nesting (a nested block stays inside its parent's `inner`).
/// Unterminated blocks are skipped rather than failing the scan.
pub fn blocks<'a>(doc: &'a str, tag: &str) -> Vec<TagBlock<'a>> {
    let close_pat = format!("</{}", tag);
    let mut out = Vec::new();
    let mut pos = 0usize;

    while let Some(start) = find_tag_open(doc, tag, pos) {
        let Some(gt_rel) = doc[start..].find('>') else {
            break;
        };
        let open_end = start + gt_rel;
        let open = &doc[start..=open_end];

        if open.ends_with("/>") {
            out.push(TagBlock { open, inner: "" });
            pos = open_end + 1;
            continue;
        }

        let inner_start = open_end + 1;
        let mut cursor = inner_start;
        let mut depth = 1usize;
        let mut inner_end = None;

        while depth > 0 {
            let next_open = find_tag_open(doc, tag, cursor);
            let next_close = find_ci(doc, &close_pat, cursor);
            match (next_open, next_close) {
                (_, None) => break,
                (Some(o), Some(c)) if o < c => {
                    depth += 1;
                    cursor = o + 1;
                }
                (_, Some(c)) => {
                    depth -= 1;
                    if depth == 0 {
                        inner_end = Some(c);
                    }
                    cursor = c + close_pat.len();
                }
            }
        }

        match inner_end {
            Some(end) => {
                out.push(TagBlock {
                    open,
                    inner: &doc[inner_start..end],
                });
                pos = end + close_pat.len();
            }
            None => pos = open_end + 1,
        }
    }

    out
}

/// First occurrence's inner text with tags stripped and entities decoded
pub fn inner_text(doc: &str, tag: &str) -> Option<String> {
    blocks(doc, tag).first().map(|b| strip_tags(b.inner))
}

/// Attribute value from an opening tag; the attribute name is matched
/// case-insensitively, quoted or bare values are accepted.
pub fn attr(open_tag: &str, name: &str) -> Option<String> {
    let bytes = open_tag.as_bytes();
    let mut pos = 0usize;

    while let Some(i) = find_ci(open_tag, name, pos) {
        let boundary_before = i > 0 && bytes[i - 1].is_ascii_whitespace();
        let mut j = i + name.len();
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if !boundary_before || j >= bytes.len() || bytes[j] != b'=' {
            pos = i + 1;
            continue;
        }
        j += 1;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if j >= bytes.len() {
            return None;
        }
        let quote = bytes[j];
        if quote == b'"' || quote == b'\'' {
            let start = j + 1;
            let end = find_byte(bytes, quote, start)?;
            return Some(decode_entities(&open_tag[start..end]));
        }
        // Bare value: runs to the next whitespace or tag end
        let start = j;
        let mut end = start;
        while end < bytes.len() && !bytes[end].is_ascii_whitespace() && bytes[end] != b'>' {
            end += 1;
        }
        let value = open_tag[start..end].trim_end_matches('/');
        return Some(decode_entities(value));
    }
    None
}

fn find_byte(bytes: &[u8], needle: u8, from: usize) -> Option<usize> {
    bytes[from..].iter().position(|b| *b == needle).map(|i| i + from)
}

/// Remove tags, decode entities, collapse whitespace
pub fn strip_tags(fragment: &str) -> String {
    let mut text = String::with_capacity(fragment.len());
    let mut in_tag = false;
    for c in fragment.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                text.push(' ');
            }
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    collapse_ws(&decode_entities(&text))
}

/// Decode the handful of entities these documents actually use
pub fn decode_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Collapse runs of whitespace to single spaces and trim
pub fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_basic() {
        let doc = "<vote><question>On Passage</question></vote>";
        let found = blocks(doc, "question");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].inner, "On Passage");
    }

    #[test]
    fn test_blocks_case_insensitive() {
        let doc = "<TABLE class=\"x\"><TR><TD>a</TD></TR></TABLE>";
        assert_eq!(blocks(doc, "table").len(), 1);
        assert_eq!(blocks(doc, "tr").len(), 1);
    }

    #[test]
    fn test_blocks_word_boundary() {
        let doc = "<track>x</track><tr>y</tr>";
        let rows = blocks(doc, "tr");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].inner, "y");
    }

    #[test]
    fn test_blocks_nested_same_tag() {
        let doc = "<table id=\"outer\"><tr><td><table id=\"inner\"><tr><td>x</td></tr></table></td></tr></table>";
        let tables = blocks(doc, "table");
        assert_eq!(tables.len(), 2);
        assert!(tables[0].inner.contains("inner"));
        assert_eq!(attr(tables[0].open, "id").as_deref(), Some("outer"));
    }

    #[test]
    fn test_blocks_self_closing() {
        let doc = "<member/><member>x</member>";
        let found = blocks(doc, "member");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].inner, "");
        assert_eq!(found[1].inner, "x");
    }

    #[test]
    fn test_attr_forms() {
        assert_eq!(
            attr("<legislator name-id=\"A000370\" party=\"D\">", "name-id").as_deref(),
            Some("A000370")
        );
        assert_eq!(
            attr("<legislator NAME-ID='A000370'>", "name-id").as_deref(),
            Some("A000370")
        );
        assert_eq!(attr("<td class=contenttext>", "class").as_deref(), Some("contenttext"));
        assert_eq!(attr("<td>", "class"), None);
        // Attribute-name boundary: `name-id` must not satisfy `id`
        assert_eq!(attr("<x name-id=\"q\">", "id"), None);
    }

    #[test]
    fn test_strip_tags_and_entities() {
        assert_eq!(
            strip_tags("<b>Vote&nbsp;Result:</b> Agreed&#39;to &amp; done"),
            "Vote Result: Agreed'to & done"
        );
        assert_eq!(strip_tags("  a \n b  "), "a b");
    }
}
