//! Span depth computation for trace detail views.
//!
//! Depth is resolved against the returned span set only: a span whose
//! parent is absent from the set is a root (depth 0). Parent chains are
//! memoized per call, and a visiting set per top-level resolution breaks
//! malformed cyclic chains instead of recursing forever.

use std::collections::{HashMap, HashSet};

/// Compute the depth of every span in `spans`, given as
/// `(span_id, parent_span_id)` pairs. Output order matches input order.
pub fn compute_depths(spans: &[(String, Option<String>)]) -> Vec<u32> {
    let index: HashMap<&str, usize> = spans
        .iter()
        .enumerate()
        .map(|(i, (span_id, _))| (span_id.as_str(), i))
        .collect();

    let mut memo: Vec<Option<u32>> = vec![None; spans.len()];
    for i in 0..spans.len() {
        if memo[i].is_none() {
            let mut visiting = HashSet::new();
            resolve(i, spans, &index, &mut memo, &mut visiting);
        }
    }

    memo.into_iter().map(|d| d.unwrap_or(0)).collect()
}

fn resolve(
    i: usize,
    spans: &[(String, Option<String>)],
    index: &HashMap<&str, usize>,
    memo: &mut Vec<Option<u32>>,
    visiting: &mut HashSet<usize>,
) -> u32 {
    if let Some(depth) = memo[i] {
        return depth;
    }
    if !visiting.insert(i) {
        // Reached twice within one resolution: cyclic parent chain.
        memo[i] = Some(0);
        return 0;
    }

    let depth = match spans[i].1.as_deref().and_then(|p| index.get(p)) {
        Some(&parent) => 1 + resolve(parent, spans, index, memo, visiting),
        None => 0,
    };
    memo[i] = Some(depth);
    depth
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(id: &str, parent: Option<&str>) -> (String, Option<String>) {
        (id.to_string(), parent.map(|p| p.to_string()))
    }

    #[test]
    fn test_chain_depths() {
        let spans = vec![
            span("root", None),
            span("child", Some("root")),
            span("grandchild", Some("child")),
        ];
        assert_eq!(compute_depths(&spans), vec![0, 1, 2]);
    }

    #[test]
    fn test_dangling_parent_is_root() {
        let spans = vec![span("orphan", Some("not-in-set"))];
        assert_eq!(compute_depths(&spans), vec![0]);
    }

    #[test]
    fn test_order_independent() {
        let spans = vec![
            span("grandchild", Some("child")),
            span("root", None),
            span("child", Some("root")),
        ];
        assert_eq!(compute_depths(&spans), vec![2, 0, 1]);
    }

    #[test]
    fn test_cycle_does_not_recurse_forever() {
        let spans = vec![span("a", Some("b")), span("b", Some("a"))];
        let depths = compute_depths(&spans);
        assert_eq!(depths.len(), 2);
        // The span reached twice is cut to depth 0.
        assert!(depths.contains(&0));
    }

    #[test]
    fn test_self_parent_is_depth_zero() {
        let spans = vec![span("a", Some("a"))];
        assert_eq!(compute_depths(&spans), vec![0]);
    }

    #[test]
    fn test_siblings_share_depth() {
        let spans = vec![
            span("root", None),
            span("left", Some("root")),
            span("right", Some("root")),
        ];
        assert_eq!(compute_depths(&spans), vec![0, 1, 1]);
    }
}
