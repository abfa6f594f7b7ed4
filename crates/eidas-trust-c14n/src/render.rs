#![forbid(unsafe_code)]

//! Canonical form of namespace declarations, attributes and character data.

use std::cmp::Ordering;

/// A namespace declaration on a canonical start tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsDecl {
    /// `""` for the default namespace.
    pub prefix: String,
    pub uri: String,
}

impl NsDecl {
    pub fn write(&self, out: &mut String) {
        if self.prefix.is_empty() {
            out.push_str(" xmlns=\"");
        } else {
            out.push_str(" xmlns:");
            out.push_str(&self.prefix);
            out.push_str("=\"");
        }
        escape_attr(&self.uri, out);
        out.push('"');
    }
}

/// Default namespace first, then by prefix.
impl Ord for NsDecl {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.prefix.is_empty(), other.prefix.is_empty()) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => self.prefix.cmp(&other.prefix),
        }
    }
}

impl PartialOrd for NsDecl {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// An attribute on a canonical start tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    /// `""` when the attribute has no namespace.
    pub ns_uri: String,
    pub local_name: String,
    pub qname: String,
    pub value: String,
}

impl Attr {
    pub fn write(&self, out: &mut String) {
        out.push(' ');
        out.push_str(&self.qname);
        out.push_str("=\"");
        escape_attr(&self.value, out);
        out.push('"');
    }
}

/// Unqualified attributes first, then by namespace URI and local name.
impl Ord for Attr {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.ns_uri.is_empty(), other.ns_uri.is_empty()) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => self
                .ns_uri
                .cmp(&other.ns_uri)
                .then_with(|| self.local_name.cmp(&other.local_name)),
        }
    }
}

impl PartialOrd for Attr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub fn escape_text(s: &str, out: &mut String) {
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(ch),
        }
    }
}

pub fn escape_attr(s: &str, out: &mut String) {
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> String {
        let mut out = String::new();
        escape_text(s, &mut out);
        out
    }

    fn attr(s: &str) -> String {
        let mut out = String::new();
        escape_attr(s, &mut out);
        out
    }

    #[test]
    fn escaping() {
        assert_eq!(text("a&b<c>d\r"), "a&amp;b&lt;c&gt;d&#xD;");
        assert_eq!(attr("a&b\"c>"), "a&amp;b&quot;c>");
        assert_eq!(attr("a\tb\nc\rd"), "a&#x9;b&#xA;c&#xD;d");
    }

    #[test]
    fn attribute_order() {
        let a = |ns: &str, local: &str| Attr {
            ns_uri: ns.into(),
            local_name: local.into(),
            qname: local.into(),
            value: String::new(),
        };
        let mut attrs = vec![a("urn:b", "a"), a("", "z"), a("urn:a", "z"), a("", "b")];
        attrs.sort();
        let order: Vec<_> = attrs
            .iter()
            .map(|x| format!("{}{}", x.ns_uri, x.local_name))
            .collect();
        assert_eq!(order, ["b", "z", "urn:az", "urn:ba"]);
    }
}
