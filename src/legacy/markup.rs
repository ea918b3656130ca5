//! Minimal tag scanning for the protein atlas XML and HTML pages.
//! Matching is ASCII case-insensitive on tag names; elements of the same
//! name are assumed not to nest.

pub fn to_lower(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii() { c.to_ascii_lowercase() } else { c })
        .collect()
}

/// One `<tag ...>...</tag>` (or self-closing `<tag .../>`) occurrence.
#[derive(Debug, Clone, Copy)]
pub struct Element<'a> {
    pub open_tag: &'a str,
    pub inner: &'a str,
}

impl<'a> Element<'a> {
    pub fn attr(&self, name: &str) -> Option<String> {
        attr(self.open_tag, name)
    }

    pub fn text(&self) -> String {
        decode_entities(&strip_tags(self.inner))
    }
}

/// All `tag` elements in `doc`, in document order.
pub fn elements<'a>(doc: &'a str, tag: &str) -> Vec<Element<'a>> {
    let lower = to_lower(doc);
    let open_pat = format!("<{}", to_lower(tag));
    let close_pat = format!("</{}", to_lower(tag));
    let mut out = Vec::new();
    let mut pos = 0usize;

    while let Some(rel) = lower[pos..].find(&open_pat) {
        let start = pos + rel;
        let name_end = start + open_pat.len();
        let boundary = lower[name_end..].chars().next();
        if !matches!(boundary, Some(c) if c == '>' || c == '/' || c.is_whitespace()) {
            pos = name_end;
            continue;
        }
        let Some(gt_rel) = doc[name_end..].find('>') else {
            break;
        };
        let open_end = name_end + gt_rel + 1;
        let open_tag = &doc[start..open_end];
        if open_tag.ends_with("/>") {
            out.push(Element {
                open_tag,
                inner: "",
            });
            pos = open_end;
            continue;
        }
        let Some(inner_end) = find_close(&lower, &close_pat, open_end) else {
            break;
        };
        out.push(Element {
            open_tag,
            inner: &doc[open_end..inner_end],
        });
        pos = match doc[inner_end..].find('>') {
            Some(gt) => inner_end + gt + 1,
            None => doc.len(),
        };
    }
    out
}

fn find_close(lower: &str, close_pat: &str, from: usize) -> Option<usize> {
    let mut pos = from;
    while let Some(rel) = lower[pos..].find(close_pat) {
        let at = pos + rel;
        let after = at + close_pat.len();
        match lower[after..].chars().next() {
            Some(c) if c == '>' || c.is_whitespace() => return Some(at),
            _ => pos = after,
        }
    }
    None
}

pub fn first<'a>(doc: &'a str, tag: &str) -> Option<Element<'a>> {
    elements(doc, tag).into_iter().next()
}

pub fn first_text(doc: &str, tag: &str) -> Option<String> {
    first(doc, tag).map(|element| element.text())
}

/// Attribute value from an opening tag, quoted with `"` or `'`.
pub fn attr(open_tag: &str, name: &str) -> Option<String> {
    let lower = to_lower(open_tag);
    let needle = format!("{}=", to_lower(name));
    let mut from = 0usize;
    while let Some(rel) = lower[from..].find(&needle) {
        let at = from + rel;
        let preceded_by_space = lower[..at]
            .chars()
            .last()
            .map(char::is_whitespace)
            .unwrap_or(false);
        let value_start = at + needle.len();
        if preceded_by_space {
            let rest = &open_tag[value_start..];
            let quote = rest.chars().next()?;
            if quote == '"' || quote == '\'' {
                let end = rest[1..].find(quote)?;
                return Some(decode_entities(&rest[1..1 + end]));
            }
            let end = rest
                .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
                .unwrap_or(rest.len());
            return Some(decode_entities(&rest[..end]));
        }
        from = value_start;
    }
    None
}

pub fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for ch in s.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    normalize_ws(&out)
}

pub fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn decode_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
