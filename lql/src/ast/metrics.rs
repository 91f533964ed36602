//! Tree metrics computed with explicit stacks, so adversarially deep trees
//! cannot exhaust the call stack.

use super::types::{Comparison, FieldPath, QueryExpression};

impl QueryExpression {
    /// Direct children of this node.
    pub fn children(&self) -> impl Iterator<Item = &Self> {
        let (left, right) = match self {
            Self::Logical(logical) => (Some(&*logical.left), logical.right.as_deref()),
            Self::Comparison(_) | Self::Raw(_) => (None, None),
        };
        left.into_iter().chain(right)
    }

    /// Number of leaf clauses (comparisons and raw conditions).
    ///
    /// # Example
    ///
    /// ```
    /// use lql::parse;
    ///
    /// let expr = parse("a:1 AND (b:2 OR NOT c:3)").unwrap();
    /// assert_eq!(expr.count_clauses(), 3);
    /// ```
    #[must_use]
    pub fn count_clauses(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                Self::Comparison(_) | Self::Raw(_) => count += 1,
                Self::Logical(_) => stack.extend(node.children()),
            }
        }
        count
    }

    /// Number of logical-node ancestors of the deepest leaf.
    ///
    /// A lone comparison has depth 0, `a AND b` has depth 1.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut max = 0;
        let mut stack = vec![(self, 0usize)];
        while let Some((node, ancestors)) = stack.pop() {
            max = max.max(ancestors);
            stack.extend(node.children().map(|child| (child, ancestors + 1)));
        }
        max
    }

    /// Every comparison leaf, left to right. Raw nodes are opaque and skipped.
    #[must_use]
    pub fn comparisons(&self) -> Vec<&Comparison> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                Self::Comparison(cmp) => out.push(cmp),
                Self::Raw(_) => {},
                Self::Logical(logical) => {
                    if let Some(right) = &logical.right {
                        stack.push(right);
                    }
                    stack.push(&logical.left);
                },
            }
        }
        out
    }

    /// Every field referenced by a comparison leaf, left to right.
    #[must_use]
    pub fn collect_fields(&self) -> Vec<&FieldPath> {
        self.comparisons().into_iter().map(|cmp| &cmp.field).collect()
    }
}
