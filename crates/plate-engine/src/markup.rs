use std::fmt::Write as _;

use serde_json::Value;

use crate::core::{Attrs, Document, Node};

impl Document {
    /// Compact tag rendering, e.g. `<paragraph>hello <bold>world</bold></paragraph>`.
    /// Attributes render in key order; text is escaped.
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            write_node(node, &mut out);
        }
        out
    }
}

impl Node {
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        write_node(self, &mut out);
        out
    }
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Text(t) => escape_into(&t.text, out),
        Node::Void(v) => {
            out.push('<');
            out.push_str(&v.kind);
            write_attrs(&v.attrs, out);
            out.push_str("/>");
        }
        Node::Element(el) => {
            out.push('<');
            out.push_str(&el.kind);
            write_attrs(&el.attrs, out);
            out.push('>');
            for child in &el.children {
                write_node(child, out);
            }
            let _ = write!(out, "</{}>", el.kind);
        }
    }
}

fn write_attrs(attrs: &Attrs, out: &mut String) {
    for (key, value) in attrs {
        let _ = write!(out, " {key}=\"");
        match value {
            Value::String(s) => escape_into(s, out),
            other => escape_into(&other.to_string(), out),
        }
        out.push('"');
    }
}

fn escape_into(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}
