//! Persistent notification boundary and a tracing-backed presenter

use std::sync::Mutex;

use whereabouts_core::prelude::*;
use whereabouts_core::Notification;

/// Renders the single persistent tracking notification
///
/// `show` is idempotent: showing a notification whose id is already up
/// replaces it in place.
#[trait_variant::make(NotificationPresenter: Send)]
pub trait LocalNotificationPresenter {
    async fn show(&self, notification: &Notification) -> Result<()>;

    async fn update(&self, notification: &Notification) -> Result<()>;

    async fn cancel(&self, id: u32) -> Result<()>;
}

/// Presenter that logs the notification and remembers what is on screen
#[derive(Debug, Default)]
pub struct LogNotificationPresenter {
    visible: Mutex<Option<Notification>>,
}

impl LogNotificationPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The notification currently up, if any
    pub fn current(&self) -> Option<Notification> {
        self.visible.lock().ok().and_then(|v| v.clone())
    }

    fn replace(&self, notification: Option<Notification>) -> Result<Option<Notification>> {
        let mut visible = self
            .visible
            .lock()
            .map_err(|_| Error::notification("presenter state poisoned"))?;
        Ok(std::mem::replace(&mut *visible, notification))
    }
}

impl NotificationPresenter for LogNotificationPresenter {
    async fn show(&self, notification: &Notification) -> Result<()> {
        let previous = self.replace(Some(notification.clone()))?;
        match previous {
            Some(prev) if prev.id == notification.id => {
                info!("[notification {}] {}", notification.id, notification.text);
            }
            _ => {
                info!(
                    "[notification {}] {}: {} (channel {})",
                    notification.id, notification.title, notification.text, notification.channel_id
                );
            }
        }
        Ok(())
    }

    async fn update(&self, notification: &Notification) -> Result<()> {
        let previous = self.replace(Some(notification.clone()))?;
        if previous.is_none() {
            debug!("Update with no notification up, posting it");
        }
        info!("[notification {}] {}", notification.id, notification.text);
        Ok(())
    }

    async fn cancel(&self, id: u32) -> Result<()> {
        let mut visible = self
            .visible
            .lock()
            .map_err(|_| Error::notification("presenter state poisoned"))?;
        match visible.as_ref() {
            Some(current) if current.id == id => {
                *visible = None;
                info!("[notification {}] cancelled", id);
            }
            _ => debug!("Cancel for notification {} that is not up", id),
        }
        Ok(())
    }
}
