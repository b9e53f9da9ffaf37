//! Rebuilds a flat, creation-ordered list of comments into a reply forest.
//!
//! A comment is attached under its parent when the parent appears earlier in
//! the input. Anything else (no parent, a parent that was deleted or hidden,
//! a parent id that only shows up later) becomes a root. Every input comment
//! lands in the output exactly once and sibling order matches input order.

use serde::Serialize;
use std::collections::HashMap;

/// Anything that carries its own id and an optional parent id.
pub trait Threaded {
    fn id(&self) -> &str;
    fn parent_id(&self) -> Option<&str>;
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentNode<T> {
    #[serde(flatten)]
    pub comment: T,
    pub replies: Vec<CommentNode<T>>,
}

impl<T> CommentNode<T> {
    /// Number of nodes in this subtree, including `self`.
    pub fn size(&self) -> usize {
        let mut total = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            total += 1;
            stack.extend(node.replies.iter());
        }
        total
    }
}

/// Build the reply forest in O(n). No recursion, so reply depth is unbounded.
pub fn build_forest<T: Threaded>(comments: Vec<T>) -> Vec<CommentNode<T>> {
    let index: HashMap<&str, usize> = comments
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id(), i))
        .collect();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); comments.len()];
    let mut roots = Vec::new();

    for (i, comment) in comments.iter().enumerate() {
        // Only earlier comments can be parents; this also rules out cycles.
        match comment.parent_id().and_then(|p| index.get(p)) {
            Some(&parent) if parent < i => children[parent].push(i),
            _ => roots.push(i),
        }
    }
    drop(index);

    // Children always sit at a higher position than their parent, so walking
    // backwards finishes every subtree before its parent needs it.
    let mut slots: Vec<Option<CommentNode<T>>> = Vec::with_capacity(comments.len());
    let mut pending: Vec<Option<T>> = comments.into_iter().map(Some).collect();
    slots.resize_with(pending.len(), || None);

    for i in (0..pending.len()).rev() {
        let replies = children[i]
            .iter()
            .filter_map(|&c| slots[c].take())
            .collect();
        if let Some(comment) = pending[i].take() {
            slots[i] = Some(CommentNode { comment, replies });
        }
    }

    roots.into_iter().filter_map(|r| slots[r].take()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct C {
        id: String,
        parent: Option<String>,
    }

    impl Threaded for C {
        fn id(&self) -> &str {
            &self.id
        }
        fn parent_id(&self) -> Option<&str> {
            self.parent.as_deref()
        }
    }

    fn c(id: &str, parent: Option<&str>) -> C {
        C {
            id: id.to_string(),
            parent: parent.map(str::to_string),
        }
    }

    fn ids<T: Threaded>(nodes: &[CommentNode<T>]) -> Vec<&str> {
        nodes.iter().map(|n| n.comment.id()).collect()
    }

    fn total(nodes: &[CommentNode<C>]) -> usize {
        nodes.iter().map(CommentNode::size).sum()
    }

    #[test]
    fn empty_input_gives_empty_forest() {
        let forest = build_forest(Vec::<C>::new());
        assert!(forest.is_empty());
    }

    #[test]
    fn flat_comments_are_all_roots_in_order() {
        let forest = build_forest(vec![c("a", None), c("b", None), c("c", None)]);
        assert_eq!(ids(&forest), vec!["a", "b", "c"]);
        assert!(forest.iter().all(|n| n.replies.is_empty()));
    }

    #[test]
    fn replies_nest_under_parents_preserving_order() {
        let forest = build_forest(vec![
            c("a", None),
            c("b", None),
            c("a1", Some("a")),
            c("b1", Some("b")),
            c("a2", Some("a")),
            c("a1x", Some("a1")),
        ]);
        assert_eq!(ids(&forest), vec!["a", "b"]);
        assert_eq!(ids(&forest[0].replies), vec!["a1", "a2"]);
        assert_eq!(ids(&forest[0].replies[0].replies), vec!["a1x"]);
        assert_eq!(ids(&forest[1].replies), vec!["b1"]);
        assert_eq!(total(&forest), 6);
    }

    #[test]
    fn missing_parent_is_promoted_to_root() {
        let forest = build_forest(vec![c("a", None), c("orphan", Some("gone")), c("b", None)]);
        assert_eq!(ids(&forest), vec!["a", "orphan", "b"]);
    }

    #[test]
    fn children_of_orphans_stay_attached() {
        let forest = build_forest(vec![c("orphan", Some("gone")), c("child", Some("orphan"))]);
        assert_eq!(ids(&forest), vec!["orphan"]);
        assert_eq!(ids(&forest[0].replies), vec!["child"]);
    }

    #[test]
    fn parent_appearing_later_does_not_adopt() {
        let forest = build_forest(vec![c("x", Some("y")), c("y", Some("x"))]);
        assert_eq!(ids(&forest), vec!["x"]);
        assert_eq!(ids(&forest[0].replies), vec!["y"]);
        assert_eq!(total(&forest), 2);
    }

    #[test]
    fn self_parent_is_a_root() {
        let forest = build_forest(vec![c("loop", Some("loop"))]);
        assert_eq!(ids(&forest), vec!["loop"]);
    }

    #[test]
    fn deep_chain_does_not_overflow() {
        let depth = 50_000;
        let mut input = vec![c("0", None)];
        for i in 1..depth {
            input.push(c(&i.to_string(), Some(&(i - 1).to_string())));
        }
        let forest = build_forest(input);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].size(), depth);
        // Tear down iteratively; the derived Drop would recurse.
        let mut stack: Vec<CommentNode<C>> = forest;
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.replies);
        }
    }

    #[test]
    fn node_count_matches_input_for_mixed_forest() {
        let input = vec![
            c("r1", None),
            c("r1a", Some("r1")),
            c("lost", Some("deleted")),
            c("r1b", Some("r1")),
            c("r1a1", Some("r1a")),
            c("r2", None),
        ];
        let n = input.len();
        let forest = build_forest(input);
        assert_eq!(total(&forest), n);
        assert_eq!(ids(&forest), vec!["r1", "lost", "r2"]);
    }

    #[test]
    fn serializes_with_flattened_fields_and_replies() {
        let forest = build_forest(vec![c("a", None), c("b", Some("a"))]);
        let json = serde_json::to_value(&forest).unwrap();
        assert_eq!(json[0]["id"], "a");
        assert_eq!(json[0]["replies"][0]["id"], "b");
        assert_eq!(json[0]["replies"][0]["replies"], serde_json::json!([]));
    }
}
