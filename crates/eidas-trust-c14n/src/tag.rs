#![forbid(unsafe_code)]

//! Qualified names as written in a start tag.
//!
//! roxmltree resolves prefixes to namespace URIs and drops them, but
//! canonical output must reproduce the prefixes of the source. They are
//! recovered by re-reading the start tag at the element's byte offset.

use eidas_trust_core::Error;

/// The element qname and the non-namespace attribute qnames, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTag<'input> {
    pub name: &'input str,
    pub attributes: Vec<&'input str>,
}

impl<'input> StartTag<'input> {
    /// Re-read the start tag of `node`, which must be an element.
    pub fn of(node: roxmltree::Node<'_, 'input>) -> Result<Self, Error> {
        let text = node.document().input_text();
        let rest = text
            .get(node.range().start..)
            .ok_or_else(|| malformed(node, "element range outside input"))?;
        let tag = lex(rest).ok_or_else(|| malformed(node, "cannot read start tag"))?;

        if tag.attributes.len() != node.attributes().len() {
            return Err(malformed(node, "attribute count mismatch"));
        }
        Ok(tag)
    }

    pub fn prefix(&self) -> &'input str {
        prefix(self.name)
    }
}

/// The prefix of `qname`, or `""` when it has none.
pub fn prefix(qname: &str) -> &str {
    qname.split_once(':').map_or("", |(p, _)| p)
}

fn malformed(node: roxmltree::Node<'_, '_>, what: &str) -> Error {
    Error::XmlStructure(format!("{what} for <{}>", node.tag_name().name()))
}

fn lex(input: &str) -> Option<StartTag<'_>> {
    let bytes = input.as_bytes();
    if bytes.first() != Some(&b'<') {
        return None;
    }
    let name_end = scan_name(bytes, 1);
    if name_end == 1 {
        return None;
    }
    let name = &input[1..name_end];

    let mut attributes = Vec::new();
    let mut pos = name_end;
    loop {
        pos = skip_whitespace(bytes, pos);
        match bytes.get(pos)? {
            b'>' | b'/' => break,
            _ => {}
        }

        let attr_end = scan_name(bytes, pos);
        if attr_end == pos {
            return None;
        }
        let attr = &input[pos..attr_end];

        pos = skip_whitespace(bytes, attr_end);
        if *bytes.get(pos)? != b'=' {
            return None;
        }
        pos = skip_whitespace(bytes, pos + 1);
        let quote = *bytes.get(pos)?;
        if quote != b'"' && quote != b'\'' {
            return None;
        }
        let len = bytes[pos + 1..].iter().position(|&b| b == quote)?;
        pos += len + 2;

        if attr != "xmlns" && !attr.starts_with("xmlns:") {
            attributes.push(attr);
        }
    }
    Some(StartTag { name, attributes })
}

fn scan_name(bytes: &[u8], mut pos: usize) -> usize {
    while let Some(&b) = bytes.get(pos) {
        if b.is_ascii_whitespace() || matches!(b, b'=' | b'>' | b'/') {
            break;
        }
        pos += 1;
    }
    pos
}

fn skip_whitespace(bytes: &[u8], mut pos: usize) -> usize {
    while bytes.get(pos).is_some_and(|b| b.is_ascii_whitespace()) {
        pos += 1;
    }
    pos
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_come_from_source() {
        let xml = r#"<a:root xmlns:a="urn:a" xmlns:b="urn:a" b:x='1>2' y = "3"><b:child/></a:root>"#;
        let doc = roxmltree::Document::parse(xml).unwrap();
        let root = doc.root_element();
        let tag = StartTag::of(root).unwrap();
        assert_eq!(tag.name, "a:root");
        assert_eq!(tag.prefix(), "a");
        assert_eq!(tag.attributes, vec!["b:x", "y"]);

        let child = root.first_child().unwrap();
        let tag = StartTag::of(child).unwrap();
        assert_eq!(tag.name, "b:child");
        assert!(tag.attributes.is_empty());
    }

    #[test]
    fn unprefixed_names() {
        assert_eq!(prefix("Issuer"), "");
        assert_eq!(prefix("saml:Issuer"), "saml");
    }
}
