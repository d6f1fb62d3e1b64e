// src/services/comment_tree.rs

//! Rebuilds the reply forest of a thread from its flat comment rows.
//!
//! Rows live in an arena (`Vec`) and are linked by index. Traversal and materialization
//! both use explicit stacks, so arbitrarily deep reply chains never grow the call stack.

use std::collections::HashMap;

use crate::models::comment::{Comment, CommentView};

use super::errors::{CommentError, CommentResult};

/// Builds the forest of a single thread.
///
/// Roots are comments without a parent plus orphans, whose parent is no longer among
/// the rows. Roots and every children list come out in creation order, ties broken by
/// increasing id. Rows that cannot be reached from any root sit on a parent cycle and
/// make the whole build fail with [`CommentError::CycleDetected`].
pub fn build_forest(mut comments: Vec<Comment>) -> CommentResult<Vec<CommentView>> {
    comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

    let position: HashMap<i64, usize> = comments
        .iter()
        .enumerate()
        .map(|(idx, c)| (c.id, idx))
        .collect();

    let mut roots = Vec::new();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); comments.len()];
    for (idx, comment) in comments.iter().enumerate() {
        match comment.parent_id.and_then(|pid| position.get(&pid)) {
            Some(&parent) => children[parent].push(idx),
            None => roots.push(idx),
        }
    }

    let order = preorder(&comments, &roots, &children)?;

    if let Some(stray) = order.visited.iter().position(|seen| !seen) {
        return Err(CommentError::CycleDetected {
            comment_id: comments[stray].id,
        });
    }

    // Children precede their parent in reverse pre-order, so every subtree is complete
    // by the time its parent is assembled.
    let mut rows: Vec<Option<Comment>> = comments.into_iter().map(Some).collect();
    let mut built: Vec<Option<CommentView>> = rows.iter().map(|_| None).collect();
    for &idx in order.nodes.iter().rev() {
        let kids = children[idx]
            .iter()
            .filter_map(|&child| built[child].take())
            .collect();
        if let Some(row) = rows[idx].take() {
            built[idx] = Some(CommentView::with_children(row, kids));
        }
    }

    Ok(roots.iter().filter_map(|&idx| built[idx].take()).collect())
}

struct Preorder {
    nodes: Vec<usize>,
    visited: Vec<bool>,
}

fn preorder(comments: &[Comment], roots: &[usize], children: &[Vec<usize>]) -> CommentResult<Preorder> {
    let mut visited = vec![false; comments.len()];
    let mut nodes = Vec::with_capacity(comments.len());
    let mut pending: Vec<usize> = roots.iter().rev().copied().collect();

    while let Some(idx) = pending.pop() {
        if visited[idx] {
            return Err(CommentError::CycleDetected {
                comment_id: comments[idx].id,
            });
        }
        visited[idx] = true;
        nodes.push(idx);
        pending.extend(children[idx].iter().rev());
    }

    Ok(Preorder { nodes, visited })
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::*;

    fn at(offset: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 2, 12, 0, 0).unwrap() + Duration::seconds(offset)
    }

    fn row(id: i64, parent_id: Option<i64>, created: i64) -> Comment {
        Comment {
            id,
            thread_id: 1,
            parent_id,
            author: format!("user{id}"),
            body: format!("comment {id}"),
            created_at: at(created),
            modified_at: at(created),
        }
    }

    fn ids(views: &[CommentView]) -> Vec<i64> {
        views.iter().map(|v| v.comment_id).collect()
    }

    #[test]
    fn empty_thread_yields_empty_forest() {
        assert!(build_forest(Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn single_root_without_replies() {
        let forest = build_forest(vec![row(1, None, 0)]).unwrap();
        assert_eq!(ids(&forest), vec![1]);
        assert!(forest[0].children.is_empty());
    }

    #[test]
    fn replies_nest_under_their_parent_only() {
        let forest = build_forest(vec![
            row(1, None, 0),
            row(2, Some(1), 1),
            row(3, None, 2),
            row(4, Some(2), 3),
            row(5, Some(1), 4),
        ])
        .unwrap();

        assert_eq!(ids(&forest), vec![1, 3]);
        assert_eq!(ids(&forest[0].children), vec![2, 5]);
        assert_eq!(ids(&forest[0].children[0].children), vec![4]);
        assert!(forest[1].children.is_empty());
        let total: usize = forest.iter().map(CommentView::subtree_len).sum();
        assert_eq!(total, 5);
    }

    #[test]
    fn order_follows_creation_time_then_id() {
        // Input deliberately shuffled; 7 and 6 share a timestamp.
        let forest = build_forest(vec![
            row(7, None, 5),
            row(9, Some(6), 8),
            row(6, None, 5),
            row(8, Some(6), 8),
            row(2, None, 9),
        ])
        .unwrap();

        assert_eq!(ids(&forest), vec![6, 7, 2]);
        assert_eq!(ids(&forest[0].children), vec![8, 9]);
    }

    #[test]
    fn orphans_are_promoted_to_roots_in_creation_order() {
        // Comment 1 was deleted; 2 still points at it.
        let forest = build_forest(vec![row(2, Some(1), 1), row(3, Some(2), 2), row(4, None, 0)]).unwrap();

        assert_eq!(ids(&forest), vec![4, 2]);
        assert_eq!(forest[1].parent_id, Some(1));
        assert_eq!(ids(&forest[1].children), vec![3]);
    }

    #[test]
    fn deep_chain_does_not_overflow_the_stack() {
        let depth = 100_000;
        let rows: Vec<Comment> = (1..=depth)
            .map(|id| row(id, if id == 1 { None } else { Some(id - 1) }, id))
            .collect();

        let forest = build_forest(rows).unwrap();
        assert_eq!(forest.len(), 1);

        let mut node = &forest[0];
        let mut seen = 1;
        while let Some(next) = node.children.first() {
            node = next;
            seen += 1;
        }
        assert_eq!(seen, depth);
    }

    #[test]
    fn comment_parented_by_its_descendant_is_rejected() {
        // 1 -> 2 -> 3 and 1's parent rewritten to 3.
        let err = build_forest(vec![row(1, Some(3), 0), row(2, Some(1), 1), row(3, Some(2), 2)]).unwrap_err();
        assert!(matches!(err, CommentError::CycleDetected { .. }));
    }

    #[test]
    fn self_parented_comment_is_rejected() {
        let err = build_forest(vec![row(1, None, 0), row(2, Some(2), 1)]).unwrap_err();
        assert!(matches!(err, CommentError::CycleDetected { comment_id: 2 }));
    }

    #[test]
    fn cycle_hanging_off_a_healthy_tree_is_rejected() {
        let err = build_forest(vec![
            row(1, None, 0),
            row(2, Some(1), 1),
            row(3, Some(4), 2),
            row(4, Some(3), 3),
        ])
        .unwrap_err();
        assert!(matches!(err, CommentError::CycleDetected { comment_id: 3 }));
    }
}
