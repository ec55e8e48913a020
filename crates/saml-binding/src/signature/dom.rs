//! Locating signature parts inside a parsed document.
//!
//! Lookups run on the parsed tree; template values are spliced back into the
//! serialized text by byte range so the rest of the message is untouched.

use std::ops::Range;

use roxmltree::{Document, Node};

use crate::types::XMLDSIG_NS;

/// Finds the element whose `ID` (or `Id`) attribute equals `id`.
pub(super) fn find_by_id<'a, 'input>(
    doc: &'a Document<'input>,
    id: &str,
) -> Option<Node<'a, 'input>> {
    doc.descendants().find(|node| {
        node.is_element() && (node.attribute("ID") == Some(id) || node.attribute("Id") == Some(id))
    })
}

/// Returns the enveloped `ds:Signature` that is a direct child of `element`.
pub(super) fn enveloped_signature<'a, 'input>(
    element: Node<'a, 'input>,
) -> Option<Node<'a, 'input>> {
    element.children().find(|child| is_ds(*child, "Signature"))
}

/// Returns the first `ds:<name>` element below `node`.
pub(super) fn ds_descendant<'a, 'input>(
    node: Node<'a, 'input>,
    name: &str,
) -> Option<Node<'a, 'input>> {
    node.descendants().find(|child| is_ds(*child, name))
}

fn is_ds(node: Node<'_, '_>, name: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == name
        && node.tag_name().namespace() == Some(XMLDSIG_NS)
}

/// Replaces the content of an empty or self-closed element with `value`.
pub(super) fn fill_element(xml: &str, element: Range<usize>, value: &str) -> Option<String> {
    let slice = &xml[element.clone()];
    let filled = if let Some(open) = slice.strip_suffix("/>") {
        let name = open.strip_prefix('<')?.trim();
        format!("<{name}>{value}</{name}>")
    } else {
        let open_end = slice.find('>')?;
        let close_start = slice.rfind("</")?;
        format!("{}{value}{}", &slice[..=open_end], &slice[close_start..])
    };

    let mut out = String::with_capacity(xml.len() + value.len());
    out.push_str(&xml[..element.start]);
    out.push_str(&filled);
    out.push_str(&xml[element.end..]);
    Some(out)
}
