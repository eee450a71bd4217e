//! Word and section counting over a located subtree.
//!
//! `word_count` sums whitespace-delimited tokens across every text fragment
//! in the subtree: a node's own leading text plus each child's trailing
//! tail. `section_count` is the number of `DIV8` nodes anywhere within the
//! subtree, regardless of depth.

use crate::document::StructuralNode;
use crate::models::CountResult;

/// The leaf structural unit counted as one "section".
pub const SECTION_TAG: &str = "DIV8";

/// Defensive bound on traversal depth. Real titles nest nowhere near this;
/// a subtree at the bound contributes zero rather than overflowing the
/// call stack.
const MAX_TRAVERSAL_DEPTH: usize = 100;

pub fn count_subtree(node: &StructuralNode) -> CountResult {
    CountResult {
        section_count: count_sections(node, 0),
        word_count: count_words(node, 0),
    }
}

fn count_words(node: &StructuralNode, depth: usize) -> u64 {
    if depth >= MAX_TRAVERSAL_DEPTH {
        return 0;
    }
    let mut count = words_in(&node.text);
    for child in &node.children {
        count += count_words(child, depth + 1);
        count += words_in(&child.tail);
    }
    count
}

fn count_sections(node: &StructuralNode, depth: usize) -> u64 {
    if depth >= MAX_TRAVERSAL_DEPTH {
        return 0;
    }
    let mut count = u64::from(node.tag == SECTION_TAG);
    for child in &node.children {
        count += count_sections(child, depth + 1);
    }
    count
}

fn words_in(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}
