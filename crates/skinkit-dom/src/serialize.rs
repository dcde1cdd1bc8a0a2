use ego_tree::NodeRef;

use crate::node::DomNode;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Raw-text elements whose children are emitted unescaped.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

pub(crate) fn write_node(out: &mut String, node: NodeRef<'_, DomNode>, raw_text: bool) {
    match node.value() {
        DomNode::Document => {
            out.push_str("<!DOCTYPE html>");
            for child in node.children() {
                write_node(out, child, false);
            }
        }
        DomNode::Text(text) => {
            if raw_text {
                out.push_str(text);
            } else {
                escape_into(out, text, false);
            }
        }
        DomNode::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        DomNode::Element(data) => {
            out.push('<');
            out.push_str(data.tag());
            for (name, value) in data.attrs() {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                escape_into(out, value, true);
                out.push('"');
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&data.tag()) {
                return;
            }
            let raw = RAW_TEXT_ELEMENTS.contains(&data.tag());
            for child in node.children() {
                write_node(out, child, raw);
            }
            out.push_str("</");
            out.push_str(data.tag());
            out.push('>');
        }
    }
}

fn escape_into(out: &mut String, text: &str, attribute: bool) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' if attribute => out.push_str("&quot;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}
