//! Foreground consumer attachment and configuration-change tracking

use tokio::sync::watch;
use whereabouts_core::prelude::*;
use whereabouts_core::VisibilityFlag;

/// Tracks attached foreground consumers and configuration-change transitions.
///
/// Several consumers may be attached at once; `attached` is true while at
/// least one is. A configuration change is the window between the host
/// announcing it and the consumer coming back. Each change gets a generation
/// number so a stale expiry timer cannot end a newer change.
#[derive(Debug)]
pub struct VisibilityTracker {
    consumers: usize,
    config_change_generation: u64,
    tx: watch::Sender<VisibilityFlag>,
}

impl Default for VisibilityTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl VisibilityTracker {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(VisibilityFlag::default());
        Self {
            consumers: 0,
            config_change_generation: 0,
            tx,
        }
    }

    pub fn flag(&self) -> VisibilityFlag {
        *self.tx.borrow()
    }

    pub fn is_attached(&self) -> bool {
        self.flag().attached
    }

    pub fn in_config_change(&self) -> bool {
        self.flag().in_config_change
    }

    pub fn consumer_count(&self) -> usize {
        self.consumers
    }

    /// Generation of the most recent configuration change
    pub fn config_change_generation(&self) -> u64 {
        self.config_change_generation
    }

    pub fn subscribe(&self) -> watch::Receiver<VisibilityFlag> {
        self.tx.subscribe()
    }

    /// A consumer attached. Ends any configuration change in progress.
    pub fn attach(&mut self) -> VisibilityFlag {
        self.consumers += 1;
        self.publish(VisibilityFlag {
            attached: true,
            in_config_change: false,
        })
    }

    /// A consumer detached. The configuration-change flag is left as is.
    pub fn detach(&mut self) -> VisibilityFlag {
        if self.consumers == 0 {
            warn!("Consumer detached but none was attached");
        }
        self.consumers = self.consumers.saturating_sub(1);
        let in_config_change = self.in_config_change();
        self.publish(VisibilityFlag {
            attached: self.consumers > 0,
            in_config_change,
        })
    }

    /// Start a configuration change; returns its generation.
    pub fn begin_config_change(&mut self) -> u64 {
        self.config_change_generation += 1;
        let attached = self.is_attached();
        self.publish(VisibilityFlag {
            attached,
            in_config_change: true,
        });
        self.config_change_generation
    }

    /// End the configuration change `generation` if it is still the current
    /// one and nobody re-attached. Returns true when the flag was cleared.
    pub fn expire_config_change(&mut self, generation: u64) -> bool {
        if generation != self.config_change_generation || !self.in_config_change() {
            return false;
        }
        if self.is_attached() {
            return false;
        }
        self.publish(VisibilityFlag {
            attached: false,
            in_config_change: false,
        });
        true
    }

    fn publish(&mut self, flag: VisibilityFlag) -> VisibilityFlag {
        self.tx.send_if_modified(|current| {
            if *current == flag {
                false
            } else {
                *current = flag;
                true
            }
        });
        flag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_detached() {
        let tracker = VisibilityTracker::new();
        assert_eq!(tracker.flag(), VisibilityFlag::default());
        assert_eq!(tracker.consumer_count(), 0);
    }

    #[test]
    fn test_attach_detach_counts_consumers() {
        let mut tracker = VisibilityTracker::new();
        tracker.attach();
        tracker.attach();
        assert!(tracker.detach().attached);
        assert_eq!(tracker.consumer_count(), 1);
        assert!(tracker.is_attached());
        assert!(!tracker.detach().attached);
        assert!(!tracker.is_attached());
    }

    #[test]
    fn test_extra_detach_saturates() {
        let mut tracker = VisibilityTracker::new();
        tracker.detach();
        assert_eq!(tracker.consumer_count(), 0);
        tracker.attach();
        assert!(tracker.is_attached());
    }

    #[test]
    fn test_config_change_survives_detach_and_ends_on_attach() {
        let mut tracker = VisibilityTracker::new();
        tracker.attach();
        tracker.begin_config_change();

        let flag = tracker.detach();
        assert!(!flag.attached);
        assert!(flag.in_config_change);

        let flag = tracker.attach();
        assert!(flag.attached);
        assert!(!flag.in_config_change);
    }

    #[test]
    fn test_expiry_only_for_current_generation() {
        let mut tracker = VisibilityTracker::new();
        tracker.attach();
        let first = tracker.begin_config_change();
        tracker.detach();
        let second = tracker.begin_config_change();
        assert!(second > first);

        assert!(!tracker.expire_config_change(first));
        assert!(tracker.in_config_change());
        assert!(tracker.expire_config_change(second));
        assert!(!tracker.in_config_change());
        assert!(!tracker.expire_config_change(second));
    }

    #[test]
    fn test_expiry_ignored_once_reattached() {
        let mut tracker = VisibilityTracker::new();
        tracker.attach();
        let generation = tracker.begin_config_change();
        tracker.detach();
        tracker.attach();
        assert!(!tracker.expire_config_change(generation));
        assert!(tracker.is_attached());
    }

    #[tokio::test]
    async fn test_observers_see_changes() {
        let mut tracker = VisibilityTracker::new();
        let mut rx = tracker.subscribe();

        tracker.attach();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().attached);

        // Second attach does not change the published flag
        tracker.attach();
        assert!(!rx.has_changed().unwrap());
    }
}
