//! Transient node highlight with a cancellable clear timer
//!
//! Each highlight request bumps a generation counter, aborts the previous
//! timer and schedules a fresh one. The timer only clears the highlight it
//! was scheduled for, so a superseded timer that already fired cannot wipe
//! a newer highlight. Reads also honor the deadline, which keeps the
//! behavior correct when no tokio runtime is available to run the timer.

use canvas_model::NodeId;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
struct ActiveHighlight {
    node: NodeId,
    generation: u64,
    expires_at: Instant,
}

/// Self-clearing highlight of a single node
#[derive(Debug)]
pub struct Highlighter {
    hold: Duration,
    generation: u64,
    state: Arc<Mutex<Option<ActiveHighlight>>>,
    timer: Option<JoinHandle<()>>,
}

impl Highlighter {
    #[must_use]
    pub fn new(hold: Duration) -> Self {
        Self {
            hold,
            generation: 0,
            state: Arc::new(Mutex::new(None)),
            timer: None,
        }
    }

    /// Highlight `node`, superseding any earlier highlight
    pub fn highlight(&mut self, node: NodeId) {
        self.cancel_timer();
        self.generation += 1;
        let generation = self.generation;
        let expires_at = Instant::now() + self.hold;
        *self.state.lock() = Some(ActiveHighlight {
            node,
            generation,
            expires_at,
        });

        if let Ok(handle) = Handle::try_current() {
            let state = Arc::clone(&self.state);
            self.timer = Some(handle.spawn(async move {
                tokio::time::sleep_until(expires_at).await;
                let mut guard = state.lock();
                if (*guard).is_some_and(|h| h.generation == generation) {
                    *guard = None;
                }
            }));
        }
    }

    /// Currently highlighted node, if the hold has not elapsed
    #[must_use]
    pub fn current(&self) -> Option<NodeId> {
        let guard = self.state.lock();
        (*guard)
            .filter(|h| Instant::now() < h.expires_at)
            .map(|h| h.node)
    }

    /// Drop the highlight immediately
    pub fn clear(&mut self) {
        self.cancel_timer();
        *self.state.lock() = None;
    }

    #[inline]
    #[must_use]
    pub fn hold(&self) -> Duration {
        self.hold
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new(Duration::from_secs(3))
    }
}

impl Drop for Highlighter {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn highlight_clears_after_hold() {
        let mut highlighter = Highlighter::default();
        let node = NodeId::new();
        highlighter.highlight(node);
        assert_eq!(highlighter.current(), Some(node));

        tokio::time::advance(Duration::from_millis(2_999)).await;
        assert_eq!(highlighter.current(), Some(node));

        tokio::time::advance(Duration::from_millis(2)).await;
        tokio::task::yield_now().await;
        assert_eq!(highlighter.current(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn second_highlight_supersedes_first() {
        let mut highlighter = Highlighter::default();
        let first = NodeId::new();
        let second = NodeId::new();

        highlighter.highlight(first);
        tokio::time::advance(Duration::from_secs(2)).await;
        highlighter.highlight(second);
        tokio::time::advance(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;

        // The first timer would have fired at 3s; the second runs until 5s.
        assert_eq!(highlighter.current(), Some(second));

        tokio::time::advance(Duration::from_secs(1)).await;
        tokio::task::yield_now().await;
        assert_eq!(highlighter.current(), None);
    }

    #[test]
    fn works_without_runtime() {
        let mut highlighter = Highlighter::new(Duration::from_secs(60));
        let node = NodeId::new();
        highlighter.highlight(node);
        assert_eq!(highlighter.current(), Some(node));
        highlighter.clear();
        assert_eq!(highlighter.current(), None);
    }
}
