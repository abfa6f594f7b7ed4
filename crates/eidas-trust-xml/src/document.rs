#![forbid(unsafe_code)]

//! Element lookup over a parsed roxmltree document.

use eidas_trust_core::Error;
use std::collections::HashMap;

/// Parse `text` with the shared parsing options.
pub fn parse(text: &str) -> Result<roxmltree::Document<'_>, Error> {
    roxmltree::Document::parse_with_options(text, crate::parsing_options())
        .map_err(|e| Error::XmlParse(e.to_string()))
}

fn is_element_named(node: &roxmltree::Node<'_, '_>, ns: &str, local_name: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == local_name
        && node.tag_name().namespace().unwrap_or("") == ns
}

/// First direct child element with the given namespace and local name.
pub fn find_child<'a, 'input>(
    parent: roxmltree::Node<'a, 'input>,
    ns: &str,
    local_name: &str,
) -> Option<roxmltree::Node<'a, 'input>> {
    parent
        .children()
        .find(|n| is_element_named(n, ns, local_name))
}

/// All direct child elements with the given namespace and local name.
pub fn find_children<'a, 'input>(
    parent: roxmltree::Node<'a, 'input>,
    ns: &str,
    local_name: &str,
) -> Vec<roxmltree::Node<'a, 'input>> {
    parent
        .children()
        .filter(|n| is_element_named(n, ns, local_name))
        .collect()
}

/// First descendant element (excluding `root` itself) with the given name.
pub fn find_descendant<'a, 'input>(
    root: roxmltree::Node<'a, 'input>,
    ns: &str,
    local_name: &str,
) -> Option<roxmltree::Node<'a, 'input>> {
    root.descendants()
        .skip(1)
        .find(|n| is_element_named(n, ns, local_name))
}

/// All descendant elements with the given name, in document order.
pub fn find_descendants<'a, 'input>(
    root: roxmltree::Node<'a, 'input>,
    ns: &str,
    local_name: &str,
) -> Vec<roxmltree::Node<'a, 'input>> {
    root.descendants()
        .skip(1)
        .filter(|n| is_element_named(n, ns, local_name))
        .collect()
}

/// Trimmed text content of the first matching child, if non-empty.
pub fn child_text(parent: roxmltree::Node<'_, '_>, ns: &str, local_name: &str) -> Option<String> {
    find_child(parent, ns, local_name)
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
}

/// Build the identifier map over every element carrying an `ID` attribute.
///
/// SAML declares `ID` as the only identifier-typed attribute; a value seen
/// twice maps to its first occurrence.
pub fn build_id_map<'a>(doc: &'a roxmltree::Document<'a>) -> HashMap<String, roxmltree::NodeId> {
    let mut map = HashMap::new();
    for node in doc.descendants().filter(|n| n.is_element()) {
        if let Some(val) = node.attribute("ID") {
            map.entry(val.to_owned()).or_insert(node.id());
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    const XML: &str = r#"<p:Response xmlns:p="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:s="urn:oasis:names:tc:SAML:2.0:assertion" ID="r1">
  <s:Issuer> https://idp.example </s:Issuer>
  <s:Assertion ID="a1"><s:Issuer>x</s:Issuer></s:Assertion>
  <s:Assertion ID="a2"/>
</p:Response>"#;

    #[test]
    fn finds_children_and_descendants() {
        let doc = parse(XML).unwrap();
        let root = doc.root_element();
        let saml = "urn:oasis:names:tc:SAML:2.0:assertion";
        assert_eq!(find_children(root, saml, "Assertion").len(), 2);
        assert_eq!(find_descendants(root, saml, "Issuer").len(), 2);
        assert_eq!(child_text(root, saml, "Issuer").as_deref(), Some("https://idp.example"));
        assert!(find_child(root, saml, "Subject").is_none());
    }

    #[test]
    fn id_map_covers_every_id_attribute() {
        let doc = parse(XML).unwrap();
        let map = build_id_map(&doc);
        assert_eq!(map.len(), 3);
        let a2 = doc.get_node(map["a2"]).unwrap();
        assert_eq!(a2.tag_name().name(), "Assertion");
    }

    #[test]
    fn rejects_dtd() {
        let xml = r#"<!DOCTYPE r [<!ENTITY e "x">]><r>&e;</r>"#;
        assert!(matches!(parse(xml), Err(Error::XmlParse(_))));
    }
}
