//! Cooperative cancellation primitive shared by every blocking/suspension
//! point in the system (spec §5): the outbound pacer, provider I/O, tool
//! execution, and turn abort-on-barge-in all check the same kind of token.

/// A cloneable, hierarchical cancellation signal. Cloning shares the same
/// underlying flag; [`Self::child_token`] derives a token that is cancelled
/// whenever its parent is, without letting the child cancel the parent —
/// used to combine an external abort with a local per-call timeout (spec
/// §4.6.1, §5 "combined external ∨ timeout").
#[derive(Debug, Clone)]
pub struct AbortToken(tokio_util::sync::CancellationToken);

impl Default for AbortToken {
    fn default() -> Self {
        Self::new()
    }
}

impl AbortToken {
    #[must_use]
    pub fn new() -> Self {
        Self(tokio_util::sync::CancellationToken::new())
    }

    pub fn cancel(&self) {
        self.0.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.is_cancelled()
    }

    #[must_use]
    pub fn child_token(&self) -> Self {
        Self(self.0.child_token())
    }

    pub async fn cancelled(&self) {
        self.0.cancelled().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn child_token_is_cancelled_with_parent() {
        let parent = AbortToken::new();
        let child = parent.child_token();
        assert!(!child.is_cancelled());
        parent.cancel();
        assert!(child.is_cancelled());
    }

    #[tokio::test]
    async fn cancelling_child_does_not_cancel_parent() {
        let parent = AbortToken::new();
        let child = parent.child_token();
        child.cancel();
        assert!(!parent.is_cancelled());
    }
}
