#![forbid(unsafe_code)]

//! Exclusive Canonical XML 1.0 (exc-C14N).
//!
//! Only visibly utilized namespace declarations are output: the prefix of
//! the element, the prefixes of its attributes, and the prefixes named in
//! the `InclusiveNamespaces` PrefixList (`#default` for the default
//! namespace). A declaration is skipped when the nearest output ancestor
//! already rendered the same binding.

use std::collections::{BTreeMap, BTreeSet};

use eidas_trust_core::Error;
use roxmltree::{Node, NodeId, NodeType};

use crate::render::{escape_text, Attr, NsDecl};
use crate::tag::{prefix, StartTag};
use crate::C14nMode;

/// Canonicalize the subtree rooted at `apex`, leaving out the subtree of
/// `exclude` (the enveloped signature).
pub fn canonicalize(
    apex: Node<'_, '_>,
    mode: C14nMode,
    exclude: Option<NodeId>,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    if !apex.is_element() {
        return Err(Error::XmlStructure(
            "canonicalization apex must be an element".into(),
        ));
    }
    let ctx = ExcC14n {
        with_comments: mode.with_comments(),
        exclude,
        inclusive_prefixes,
    };
    let mut out = String::new();
    ctx.element(apex, &BTreeMap::new(), &mut out)?;
    Ok(out.into_bytes())
}

struct ExcC14n<'p> {
    with_comments: bool,
    exclude: Option<NodeId>,
    inclusive_prefixes: &'p [String],
}

impl ExcC14n<'_> {
    fn element(
        &self,
        node: Node<'_, '_>,
        rendered: &BTreeMap<String, String>,
        out: &mut String,
    ) -> Result<(), Error> {
        let tag = StartTag::of(node)?;

        let in_scope: BTreeMap<&str, &str> = node
            .namespaces()
            .filter(|ns| !ns.uri().is_empty())
            .map(|ns| (ns.name().unwrap_or(""), ns.uri()))
            .collect();

        let mut utilized: BTreeSet<&str> = BTreeSet::new();
        utilized.insert(tag.prefix());
        utilized.extend(
            tag.attributes
                .iter()
                .map(|qname| prefix(qname))
                .filter(|p| !p.is_empty()),
        );
        utilized.extend(self.inclusive_prefixes.iter().map(|p| match p.as_str() {
            "#default" => "",
            other => other,
        }));

        let mut decls = Vec::new();
        for prefix in utilized {
            if prefix == "xml" {
                continue;
            }
            let previous = rendered.get(prefix).map(String::as_str);
            match in_scope.get(prefix) {
                Some(uri) if previous != Some(*uri) => decls.push(NsDecl {
                    prefix: prefix.to_owned(),
                    uri: (*uri).to_owned(),
                }),
                Some(_) => {}
                // The default namespace went out of scope below an output
                // ancestor that rendered one.
                None if prefix.is_empty() && previous.is_some_and(|u| !u.is_empty()) => {
                    decls.push(NsDecl {
                        prefix: String::new(),
                        uri: String::new(),
                    })
                }
                None => {}
            }
        }
        decls.sort();

        let mut attrs: Vec<Attr> = node
            .attributes()
            .zip(&tag.attributes)
            .map(|(attr, qname)| Attr {
                ns_uri: attr.namespace().unwrap_or("").to_owned(),
                local_name: attr.name().to_owned(),
                qname: (*qname).to_owned(),
                value: attr.value().to_owned(),
            })
            .collect();
        attrs.sort();

        out.push('<');
        out.push_str(tag.name);
        for decl in &decls {
            decl.write(out);
        }
        for attr in &attrs {
            attr.write(out);
        }
        out.push('>');

        let mut child_rendered = rendered.clone();
        for decl in decls {
            child_rendered.insert(decl.prefix, decl.uri);
        }

        for child in node.children() {
            if Some(child.id()) == self.exclude {
                continue;
            }
            match child.node_type() {
                NodeType::Element => self.element(child, &child_rendered, out)?,
                NodeType::Text => escape_text(child.text().unwrap_or(""), out),
                NodeType::Comment if self.with_comments => {
                    out.push_str("<!--");
                    out.push_str(child.text().unwrap_or(""));
                    out.push_str("-->");
                }
                NodeType::PI => {
                    if let Some(pi) = child.pi() {
                        out.push_str("<?");
                        out.push_str(pi.target);
                        if let Some(value) = pi.value.filter(|v| !v.is_empty()) {
                            out.push(' ');
                            out.push_str(&value.replace('\r', "&#xD;"));
                        }
                        out.push_str("?>");
                    }
                }
                _ => {}
            }
        }

        out.push_str("</");
        out.push_str(tag.name);
        out.push('>');
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Canonicalize the first element named `apex`, minus the first element
    /// named `exclude`.
    fn c14n_with(
        xml: &str,
        apex: &str,
        exclude: Option<&str>,
        mode: C14nMode,
        prefixes: &[&str],
    ) -> String {
        let doc = roxmltree::Document::parse(xml).unwrap();
        let named = |name: &str| {
            doc.descendants()
                .find(|n| n.tag_name().name() == name)
                .unwrap()
        };
        let exclude = exclude.map(|name| named(name).id());
        let prefixes: Vec<String> = prefixes.iter().map(|p| p.to_string()).collect();
        let bytes = canonicalize(named(apex), mode, exclude, &prefixes).unwrap();
        String::from_utf8(bytes).unwrap()
    }

    fn c14n(xml: &str, apex: &str) -> String {
        c14n_with(xml, apex, None, C14nMode::Exclusive, &[])
    }

    #[test]
    fn ancestor_namespace_is_pushed_down() {
        let xml = r#"<samlp:Response xmlns:samlp="urn:p" xmlns:saml="urn:a" ID="_r"><saml:Issuer>x</saml:Issuer></samlp:Response>"#;
        assert_eq!(
            c14n(xml, "Issuer"),
            r#"<saml:Issuer xmlns:saml="urn:a">x</saml:Issuer>"#
        );
    }

    #[test]
    fn unused_namespaces_dropped_and_attributes_sorted() {
        let xml = r#"<a:e xmlns:a="urn:a" xmlns:b="urn:b" z="1" a:q="3" a="2"/>"#;
        assert_eq!(
            c14n(xml, "e"),
            r#"<a:e xmlns:a="urn:a" a="2" z="1" a:q="3"></a:e>"#
        );
    }

    #[test]
    fn excluded_subtree_and_comments() {
        let xml = "<r><!--c--><s>sig</s><t>v</t></r>";
        assert_eq!(
            c14n_with(xml, "r", Some("s"), C14nMode::Exclusive, &[]),
            "<r><t>v</t></r>"
        );
        assert_eq!(
            c14n_with(xml, "r", Some("s"), C14nMode::ExclusiveWithComments, &[]),
            "<r><!--c--><t>v</t></r>"
        );
    }

    #[test]
    fn inclusive_prefix_list() {
        let xml = r#"<r xmlns:x="urn:x"><c/></r>"#;
        assert_eq!(
            c14n_with(xml, "r", None, C14nMode::Exclusive, &["x"]),
            r#"<r xmlns:x="urn:x"><c></c></r>"#
        );
        assert_eq!(c14n(xml, "r"), "<r><c></c></r>");
    }

    #[test]
    fn default_namespace_undeclared() {
        let xml = r#"<r xmlns="urn:d"><c xmlns=""/></r>"#;
        assert_eq!(c14n(xml, "r"), r#"<r xmlns="urn:d"><c xmlns=""></c></r>"#);
    }

    #[test]
    fn redundant_redeclaration_is_dropped() {
        let xml = r#"<a:r xmlns:a="urn:a"><a:c xmlns:a="urn:a"/></a:r>"#;
        assert_eq!(c14n(xml, "r"), r#"<a:r xmlns:a="urn:a"><a:c></a:c></a:r>"#);
    }

    #[test]
    fn character_data_escaped() {
        let xml = r#"<r a="x&quot;y&#9;">1 &lt; 2 &amp; 3 &gt; 0</r>"#;
        assert_eq!(
            c14n(xml, "r"),
            r#"<r a="x&quot;y&#x9;">1 &lt; 2 &amp; 3 &gt; 0</r>"#
        );
    }
}
