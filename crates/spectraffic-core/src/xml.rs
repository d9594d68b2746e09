//! SOAP/XML body detection
//!
//! Bodies framed as XML are carried opaquely: they skip JSON flattening and
//! label substitution. Detection needs both an XML-ish content type in the
//! request headers and a body that is structurally well-formed.

/// Whether a header cell declares an XML content type.
#[must_use]
pub fn header_declares_xml(header: &str) -> bool {
    let lower = header.to_ascii_lowercase();
    lower.contains("application/soap+xml")
        || lower.contains("application/xml")
        || lower.contains("text/xml")
}

/// Whether `body` should be treated as an opaque XML payload.
#[must_use]
pub fn is_xml_framed(header: Option<&str>, body: &str) -> bool {
    header.is_some_and(header_declares_xml) && is_well_formed(body)
}

/// Structural well-formedness: one root element, balanced and properly nested
/// tags, terminated comments/CDATA/processing instructions, nothing but
/// whitespace, comments or instructions outside the root.
#[must_use]
pub fn is_well_formed(doc: &str) -> bool {
    let bytes = doc.as_bytes();
    let mut stack: Vec<&str> = Vec::new();
    let mut roots = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'<' {
            if stack.is_empty() && !bytes[i].is_ascii_whitespace() {
                return false;
            }
            i += 1;
            continue;
        }

        let rest = &doc[i..];
        if let Some(after) = rest.strip_prefix("<?") {
            let Some(end) = after.find("?>") else {
                return false;
            };
            i += 2 + end + 2;
        } else if let Some(after) = rest.strip_prefix("<!--") {
            let Some(end) = after.find("-->") else {
                return false;
            };
            i += 4 + end + 3;
        } else if let Some(after) = rest.strip_prefix("<![CDATA[") {
            if stack.is_empty() {
                return false;
            }
            let Some(end) = after.find("]]>") else {
                return false;
            };
            i += 9 + end + 3;
        } else if rest.starts_with("<!") {
            // DOCTYPE: only before the root
            if roots > 0 || !stack.is_empty() {
                return false;
            }
            let Some(end) = rest.find('>') else {
                return false;
            };
            i += end + 1;
        } else {
            let Some(end) = find_tag_end(rest) else {
                return false;
            };
            let inner = &rest[1..end];
            i += end + 1;

            if let Some(name) = inner.strip_prefix('/') {
                let name = name.trim_end();
                if !is_name(name) || stack.pop() != Some(name) {
                    return false;
                }
            } else {
                let self_closing = inner.ends_with('/');
                let body = inner.trim_end_matches('/');
                let name = body
                    .split(|c: char| c.is_ascii_whitespace())
                    .next()
                    .unwrap_or("");
                if !is_name(name) {
                    return false;
                }
                if stack.is_empty() {
                    roots += 1;
                    if roots > 1 {
                        return false;
                    }
                }
                if !self_closing {
                    stack.push(name);
                }
            }
        }
    }

    roots == 1 && stack.is_empty()
}

/// Index of the `>` closing the tag at the start of `s`, skipping quoted attribute values.
fn find_tag_end(s: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (idx, c) in s.char_indices().skip(1) {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '<') => return None,
            (None, '>') => return Some(idx),
            (None, _) => {}
        }
    }
    None
}

fn is_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | ':' | '-' | '.'))
}
