//! The fixed tag vocabulary and its classification.
//!
//! Kinds are stored as snake_case strings on [`crate::ElementNode`]. Names
//! arriving from a host (toolbar actions, pasted markup) go through
//! [`resolve_kind`], which is case-insensitive and accepts the usual markup
//! aliases.

pub mod kind {
    pub const PARAGRAPH: &str = "paragraph";
    pub const HEADING_1: &str = "heading_1";
    pub const HEADING_2: &str = "heading_2";
    pub const BLOCKQUOTE: &str = "blockquote";
    pub const CODE_BLOCK: &str = "code_block";
    pub const LIST_ITEM: &str = "list_item";
    pub const FIGURE: &str = "figure";
    pub const CAPTION: &str = "caption";
    pub const IMAGE: &str = "image";

    pub const ORDERED_LIST: &str = "ordered_list";
    pub const UNORDERED_LIST: &str = "unordered_list";

    pub const BOLD: &str = "bold";
    pub const ITALIC: &str = "italic";
    pub const UNDERLINE: &str = "underline";
    pub const STRIKETHROUGH: &str = "strikethrough";
    pub const SUBSCRIPT: &str = "subscript";
    pub const SUPERSCRIPT: &str = "superscript";
    pub const LINK: &str = "link";
}

pub const BLOCK_KINDS: &[&str] = &[
    kind::PARAGRAPH,
    kind::HEADING_1,
    kind::HEADING_2,
    kind::BLOCKQUOTE,
    kind::CODE_BLOCK,
    kind::LIST_ITEM,
    kind::FIGURE,
];

pub const LIST_KINDS: &[&str] = &[kind::ORDERED_LIST, kind::UNORDERED_LIST];

pub const INLINE_KINDS: &[&str] = &[
    kind::BOLD,
    kind::ITALIC,
    kind::UNDERLINE,
    kind::STRIKETHROUGH,
    kind::SUBSCRIPT,
    kind::SUPERSCRIPT,
    kind::LINK,
];

/// Blocks `set_block_type` may produce.
pub const TEXT_BLOCK_KINDS: &[&str] = &[
    kind::PARAGRAPH,
    kind::HEADING_1,
    kind::HEADING_2,
    kind::BLOCKQUOTE,
    kind::CODE_BLOCK,
];

pub const ALIGN_VALUES: &[&str] = &["left", "center", "right", "justify"];

const ALIASES: &[(&str, &str)] = &[
    ("p", kind::PARAGRAPH),
    ("h1", kind::HEADING_1),
    ("h2", kind::HEADING_2),
    ("heading-1", kind::HEADING_1),
    ("heading-2", kind::HEADING_2),
    ("quote", kind::BLOCKQUOTE),
    ("pre", kind::CODE_BLOCK),
    ("code-block", kind::CODE_BLOCK),
    ("li", kind::LIST_ITEM),
    ("list-item", kind::LIST_ITEM),
    ("figcaption", kind::CAPTION),
    ("img", kind::IMAGE),
    ("ol", kind::ORDERED_LIST),
    ("ordered", kind::ORDERED_LIST),
    ("ordered-list", kind::ORDERED_LIST),
    ("ul", kind::UNORDERED_LIST),
    ("unordered", kind::UNORDERED_LIST),
    ("unordered-list", kind::UNORDERED_LIST),
    ("b", kind::BOLD),
    ("strong", kind::BOLD),
    ("i", kind::ITALIC),
    ("em", kind::ITALIC),
    ("u", kind::UNDERLINE),
    ("s", kind::STRIKETHROUGH),
    ("strike", kind::STRIKETHROUGH),
    ("del", kind::STRIKETHROUGH),
    ("sub", kind::SUBSCRIPT),
    ("sup", kind::SUPERSCRIPT),
    ("a", kind::LINK),
];

/// Maps a host-supplied tag name onto its canonical kind.
pub fn resolve_kind(name: &str) -> Option<&'static str> {
    let name = name.trim().to_ascii_lowercase();
    let known = BLOCK_KINDS
        .iter()
        .chain(LIST_KINDS)
        .chain(INLINE_KINDS)
        .copied()
        .chain([kind::CAPTION, kind::IMAGE])
        .find(|k| *k == name);
    if known.is_some() {
        return known;
    }
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|(_, k)| *k)
}

pub fn is_block_kind(name: &str) -> bool {
    BLOCK_KINDS.contains(&name)
}

pub fn is_list_kind(name: &str) -> bool {
    LIST_KINDS.contains(&name)
}

pub fn is_inline_kind(name: &str) -> bool {
    INLINE_KINDS.contains(&name)
}

/// Elements whose children are inline content (text and inline elements).
pub fn holds_inline_content(name: &str) -> bool {
    name == kind::CAPTION || (is_block_kind(name) && name != kind::FIGURE)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Ordered,
    Unordered,
}

impl ListKind {
    pub fn parse(name: &str) -> Option<Self> {
        match resolve_kind(name)? {
            kind::ORDERED_LIST => Some(ListKind::Ordered),
            kind::UNORDERED_LIST => Some(ListKind::Unordered),
            _ => None,
        }
    }

    pub fn from_kind(name: &str) -> Option<Self> {
        match name {
            kind::ORDERED_LIST => Some(ListKind::Ordered),
            kind::UNORDERED_LIST => Some(ListKind::Unordered),
            _ => None,
        }
    }

    pub fn kind(self) -> &'static str {
        match self {
            ListKind::Ordered => kind::ORDERED_LIST,
            ListKind::Unordered => kind::UNORDERED_LIST,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ListKind::Ordered => "ordered",
            ListKind::Unordered => "unordered",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_kind_is_case_insensitive_and_accepts_aliases() {
        assert_eq!(resolve_kind("BOLD"), Some(kind::BOLD));
        assert_eq!(resolve_kind("Strong"), Some(kind::BOLD));
        assert_eq!(resolve_kind("H2"), Some(kind::HEADING_2));
        assert_eq!(resolve_kind("figcaption"), Some(kind::CAPTION));
        assert_eq!(resolve_kind("marquee"), None);
    }

    #[test]
    fn list_kind_parses_short_names() {
        assert_eq!(ListKind::parse("ordered"), Some(ListKind::Ordered));
        assert_eq!(ListKind::parse("UL"), Some(ListKind::Unordered));
        assert_eq!(ListKind::parse("paragraph"), None);
    }

    #[test]
    fn figure_is_a_block_without_inline_content() {
        assert!(is_block_kind(kind::FIGURE));
        assert!(!holds_inline_content(kind::FIGURE));
        assert!(holds_inline_content(kind::CAPTION));
        assert!(holds_inline_content(kind::LIST_ITEM));
    }
}
