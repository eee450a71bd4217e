//! Structural navigation: locate the subtree a reference points at.
//!
//! Navigation is strictly coarse-to-fine over a fixed level order —
//! `DIV1` (title), then `DIV3` (chapter), then `DIV5` (part). A level the
//! reference does not specify is skipped; a specified level that fails to
//! match anywhere under the current node means the whole lookup is a miss.
//! There is no partial credit and no fallback search.

use crate::document::StructuralNode;
use crate::models::CfrReference;

/// Descend from `root` along the levels named by `reference`.
///
/// Returns the matched subtree, or `None` when any specified level has no
/// element with the requested `N` identifier. Absence of a match is an
/// expected outcome of imprecise scope data, not an error.
pub fn locate<'a>(root: &'a StructuralNode, reference: &CfrReference) -> Option<&'a StructuralNode> {
    let title = reference.title.to_string();
    let levels: [(&str, Option<&str>); 3] = [
        ("DIV1", Some(title.as_str())),
        ("DIV3", reference.chapter.as_deref()),
        ("DIV5", reference.part.as_deref()),
    ];

    let mut current = root;
    for (tag, value) in levels {
        let Some(value) = value else {
            continue;
        };
        current = find_descendant(current, tag, value)?;
    }
    Some(current)
}

/// First element in document order (the node itself included) with the given
/// tag and `N` identifier. When upstream data carries duplicate identifiers
/// at one level, traversal order decides which wins.
fn find_descendant<'a>(node: &'a StructuralNode, tag: &str, ident: &str) -> Option<&'a StructuralNode> {
    let mut work = vec![node];
    while let Some(n) = work.pop() {
        if n.tag == tag && n.ident.as_deref() == Some(ident) {
            return Some(n);
        }
        for child in n.children.iter().rev() {
            work.push(child);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse_document;

    fn reference(title: u32, chapter: Option<&str>, part: Option<&str>) -> CfrReference {
        CfrReference {
            title,
            chapter: chapter.map(str::to_string),
            part: part.map(str::to_string),
        }
    }

    #[test]
    fn descends_title_chapter_part() {
        let root = parse_document(
            b"<ECFR><DIV1 N=\"1\"><DIV3 N=\"III\"><DIV5 N=\"425\">here</DIV5></DIV3></DIV1></ECFR>",
        )
        .unwrap();
        let found = locate(&root, &reference(1, Some("III"), Some("425"))).unwrap();
        assert_eq!(found.tag, "DIV5");
        assert_eq!(found.text, "here");
    }

    #[test]
    fn unspecified_levels_are_skipped() {
        let root = parse_document(
            b"<ECFR><DIV1 N=\"1\"><DIV3 N=\"III\"><DIV5 N=\"425\"/></DIV3></DIV1></ECFR>",
        )
        .unwrap();
        let found = locate(&root, &reference(1, None, None)).unwrap();
        assert_eq!(found.tag, "DIV1");
    }

    #[test]
    fn any_unmatched_level_is_not_found() {
        let root = parse_document(
            b"<ECFR><DIV1 N=\"1\"><DIV3 N=\"III\"><DIV5 N=\"425\"/></DIV3></DIV1></ECFR>",
        )
        .unwrap();
        assert!(locate(&root, &reference(2, None, None)).is_none());
        assert!(locate(&root, &reference(1, Some("IV"), None)).is_none());
        assert!(locate(&root, &reference(1, Some("III"), Some("99"))).is_none());
    }

    #[test]
    fn duplicate_identifiers_resolve_to_document_order_first() {
        let root = parse_document(
            b"<ECFR><DIV1 N=\"1\"><DIV3 N=\"I\">first</DIV3><DIV3 N=\"I\">second</DIV3></DIV1></ECFR>",
        )
        .unwrap();
        let found = locate(&root, &reference(1, Some("I"), None)).unwrap();
        assert_eq!(found.text, "first");
    }
}
