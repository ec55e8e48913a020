//! Canonical XML over a parsed document.
//!
//! Renders the subtree rooted at one element in Exclusive C14N 1.0 or
//! Canonical XML 1.0 form, with or without comments. The enveloped-signature
//! transform is applied by passing the `ds:Signature` element as `excluded`.
//!
//! Exclusive C14N only declares a namespace on the element that visibly
//! utilizes it (its own prefix or an attribute prefix), and only when the
//! nearest rendered ancestor did not already declare the same binding.
//! Inclusive C14N declares every in-scope namespace at the apex.

use std::collections::{BTreeMap, BTreeSet};

use roxmltree::{Node, NodeId, NodeType};

use super::CanonicalizationAlgorithm;

const XML_PREFIX: &str = "xml";

/// Canonicalizes the subtree rooted at `apex`.
///
/// `excluded` removes one element (with its descendants) from the output.
pub(crate) fn canonicalize(
    apex: Node<'_, '_>,
    algorithm: CanonicalizationAlgorithm,
    excluded: Option<NodeId>,
) -> String {
    let mut canonicalizer = Canonicalizer {
        input: apex.document().input_text(),
        exclusive: algorithm.is_exclusive(),
        with_comments: algorithm.with_comments(),
        excluded,
        output: String::with_capacity(apex.range().len()),
    };
    canonicalizer.element(apex, &BTreeMap::new());
    canonicalizer.output
}

struct Canonicalizer<'input> {
    input: &'input str,
    exclusive: bool,
    with_comments: bool,
    excluded: Option<NodeId>,
    output: String,
}

/// Attribute as rendered: sort key plus qualified name and value.
struct RenderedAttr<'a> {
    namespace: &'a str,
    local: &'a str,
    qname: &'a str,
    value: &'a str,
}

impl<'input> Canonicalizer<'input> {
    fn element(&mut self, node: Node<'_, 'input>, rendered: &BTreeMap<String, String>) {
        let input = self.input;
        let qname = element_qname(input, node);

        let mut attrs: Vec<RenderedAttr<'_>> = node
            .attributes()
            .map(|attr| RenderedAttr {
                namespace: attr.namespace().unwrap_or(""),
                local: attr.name(),
                qname: &input[attr.range_qname()],
                value: attr.value(),
            })
            .collect();
        attrs.sort_by(|a, b| (a.namespace, a.local).cmp(&(b.namespace, b.local)));

        let mut candidates = BTreeSet::new();
        if self.exclusive {
            candidates.insert(prefix_of(qname).to_string());
            for attr in &attrs {
                let prefix = prefix_of(attr.qname);
                if !prefix.is_empty() {
                    candidates.insert(prefix.to_string());
                }
            }
        } else {
            for ns in node.namespaces() {
                candidates.insert(ns.name().unwrap_or("").to_string());
            }
            if rendered.get("").is_some_and(|uri| !uri.is_empty()) {
                candidates.insert(String::new());
            }
        }
        candidates.remove(XML_PREFIX);

        // BTreeSet order puts the default namespace ("") first.
        let mut declared = rendered.clone();
        let mut declarations = Vec::new();
        for prefix in candidates {
            let lookup = (!prefix.is_empty()).then_some(prefix.as_str());
            let uri = node.lookup_namespace_uri(lookup).unwrap_or("");
            let previous = rendered.get(&prefix).map(String::as_str);

            let emit = if uri.is_empty() {
                prefix.is_empty() && previous.is_some_and(|p| !p.is_empty())
            } else {
                previous != Some(uri)
            };
            if emit {
                declarations.push((prefix.clone(), uri.to_string()));
                declared.insert(prefix, uri.to_string());
            }
        }

        self.output.push('<');
        self.output.push_str(qname);
        for (prefix, uri) in &declarations {
            if prefix.is_empty() {
                self.output.push_str(" xmlns=\"");
            } else {
                self.output.push_str(" xmlns:");
                self.output.push_str(prefix);
                self.output.push_str("=\"");
            }
            escape_attr(&mut self.output, uri);
            self.output.push('"');
        }
        for attr in &attrs {
            self.output.push(' ');
            self.output.push_str(attr.qname);
            self.output.push_str("=\"");
            escape_attr(&mut self.output, attr.value);
            self.output.push('"');
        }
        self.output.push('>');

        for child in node.children() {
            match child.node_type() {
                NodeType::Element => {
                    if Some(child.id()) != self.excluded {
                        self.element(child, &declared);
                    }
                }
                NodeType::Text => escape_text(&mut self.output, child.text().unwrap_or("")),
                NodeType::Comment => {
                    if self.with_comments {
                        self.output.push_str("<!--");
                        self.output.push_str(child.text().unwrap_or(""));
                        self.output.push_str("-->");
                    }
                }
                NodeType::PI => {
                    if let Some(pi) = child.pi() {
                        self.output.push_str("<?");
                        self.output.push_str(pi.target);
                        if let Some(value) = pi.value.filter(|v| !v.is_empty()) {
                            self.output.push(' ');
                            self.output.push_str(&value.replace('\r', "&#xD;"));
                        }
                        self.output.push_str("?>");
                    }
                }
                NodeType::Root => {}
            }
        }

        self.output.push_str("</");
        self.output.push_str(qname);
        self.output.push('>');
    }
}

/// The element's qualified name as written in the source.
fn element_qname<'input>(input: &'input str, node: Node<'_, 'input>) -> &'input str {
    let tag = input[node.range()].trim_start_matches('<');
    let end = tag
        .find(|c: char| c.is_ascii_whitespace() || c == '/' || c == '>')
        .unwrap_or(tag.len());
    &tag[..end]
}

fn prefix_of(qname: &str) -> &str {
    qname.split_once(':').map_or("", |(prefix, _)| prefix)
}

fn escape_text(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(ch),
        }
    }
}

fn escape_attr(out: &mut String, value: &str) {
    for ch in value.chars() {
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

    // Expected outputs were produced with `xmllint --exc-c14n` / `--c14n`
    // (both render comments).
    const MIXED: &str = r#"<root xmlns="urn:a" xmlns:b="urn:b" xmlns:unused="urn:u" z="1" b:y="2" a="3"><b:child c='x&amp;"y' xml:lang="en">t &lt; &amp; &gt; "q"<empty/><!-- note --><b:inner xmlns:b="urn:b">k</b:inner></b:child><plain xmlns="">v<b:deep/></plain></root>"#;

    const MIXED_EXCLUSIVE: &str = r#"<root xmlns="urn:a" xmlns:b="urn:b" a="3" z="1" b:y="2"><b:child c="x&amp;&quot;y" xml:lang="en">t &lt; &amp; &gt; "q"<empty></empty><!-- note --><b:inner>k</b:inner></b:child><plain xmlns="">v<b:deep></b:deep></plain></root>"#;

    const MIXED_INCLUSIVE: &str = r#"<root xmlns="urn:a" xmlns:b="urn:b" xmlns:unused="urn:u" a="3" z="1" b:y="2"><b:child c="x&amp;&quot;y" xml:lang="en">t &lt; &amp; &gt; "q"<empty></empty><!-- note --><b:inner>k</b:inner></b:child><plain xmlns="">v<b:deep></b:deep></plain></root>"#;

    fn render(xml: &str, algorithm: CanonicalizationAlgorithm) -> String {
        let doc = roxmltree::Document::parse(xml).unwrap();
        canonicalize(doc.root_element(), algorithm, None)
    }

    #[test]
    fn exclusive_with_comments_matches_reference() {
        assert_eq!(
            render(MIXED, CanonicalizationAlgorithm::ExclusiveC14nWithComments),
            MIXED_EXCLUSIVE
        );
    }

    #[test]
    fn exclusive_drops_comments() {
        assert_eq!(
            render(MIXED, CanonicalizationAlgorithm::ExclusiveC14n),
            MIXED_EXCLUSIVE.replace("<!-- note -->", "")
        );
    }

    #[test]
    fn inclusive_keeps_unused_namespaces() {
        assert_eq!(
            render(MIXED, CanonicalizationAlgorithm::C14nWithComments),
            MIXED_INCLUSIVE
        );
    }

    #[test]
    fn subtree_declares_namespaces_it_uses() {
        let xml = r#"<samlp:Response xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_x"><saml:Issuer>idp</saml:Issuer></samlp:Response>"#;
        let doc = roxmltree::Document::parse(xml).unwrap();
        let issuer = doc.root_element().first_element_child().unwrap();

        assert_eq!(
            canonicalize(issuer, CanonicalizationAlgorithm::ExclusiveC14n, None),
            r#"<saml:Issuer xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion">idp</saml:Issuer>"#
        );
        assert_eq!(
            canonicalize(issuer, CanonicalizationAlgorithm::C14n, None),
            r#"<saml:Issuer xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol">idp</saml:Issuer>"#
        );
    }

    #[test]
    fn excluded_subtree_is_skipped() {
        let xml = r#"<r ID="_r"><a>1</a><ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><ds:X/></ds:Signature><b>2</b></r>"#;
        let doc = roxmltree::Document::parse(xml).unwrap();
        let root = doc.root_element();
        let signature = root.children().nth(1).unwrap();

        assert_eq!(
            canonicalize(root, CanonicalizationAlgorithm::ExclusiveC14n, Some(signature.id())),
            r#"<r ID="_r"><a>1</a><b>2</b></r>"#
        );
    }

    #[test]
    fn whitespace_in_text_is_significant() {
        let one = render("<n>alice smith</n>", CanonicalizationAlgorithm::ExclusiveC14n);
        let many = render("<n>alice     smith</n>", CanonicalizationAlgorithm::ExclusiveC14n);
        assert_ne!(one, many);
    }

    #[test]
    fn attribute_whitespace_is_escaped() {
        assert_eq!(
            render("<e a=\"x&#9;y&#10;z\"/>", CanonicalizationAlgorithm::ExclusiveC14n),
            r#"<e a="x&#x9;y&#xA;z"></e>"#
        );
    }
}
