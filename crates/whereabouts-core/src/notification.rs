//! Persistent tracking notification content

use serde::{Deserialize, Serialize};

use crate::types::LocationFix;

/// Notification id used when none is configured
pub const DEFAULT_NOTIFICATION_ID: u32 = 12_345_678;

/// Notification channel used when none is configured
pub const DEFAULT_CHANNEL_ID: &str = "while_in_use_channel_01";

/// Body text shown before the first fix arrives
pub const DEFAULT_PLACEHOLDER_TEXT: &str = "no fix yet";

/// Actions attached to the tracking notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationAction {
    /// Bring the host UI back to the foreground
    OpenApp,
    /// Stop tracking from the notification itself
    StopTracking,
}

/// An action button: what it does and how it is labelled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationButton {
    pub action: NotificationAction,
    pub label: String,
}

/// Everything a presenter needs to render the tracking notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: u32,
    pub channel_id: String,
    pub title: String,
    pub text: String,
    pub buttons: Vec<NotificationButton>,
    /// Ongoing notifications cannot be swiped away
    pub ongoing: bool,
}

/// Static parts of the notification, typically from configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationTemplate {
    pub id: u32,
    pub channel_id: String,
    pub title: String,
    pub placeholder_text: String,
    pub open_app_label: String,
    pub stop_tracking_label: String,
}

impl Default for NotificationTemplate {
    fn default() -> Self {
        Self {
            id: DEFAULT_NOTIFICATION_ID,
            channel_id: DEFAULT_CHANNEL_ID.to_string(),
            title: "Whereabouts".to_string(),
            placeholder_text: DEFAULT_PLACEHOLDER_TEXT.to_string(),
            open_app_label: "Open app".to_string(),
            stop_tracking_label: "Stop tracking".to_string(),
        }
    }
}

impl Notification {
    /// Build the notification for the latest fix, or the placeholder text.
    pub fn for_fix(fix: Option<&LocationFix>, template: &NotificationTemplate) -> Self {
        let text = fix
            .map(LocationFix::to_text)
            .unwrap_or_else(|| template.placeholder_text.clone());

        Self {
            id: template.id,
            channel_id: template.channel_id.clone(),
            title: template.title.clone(),
            text,
            buttons: vec![
                NotificationButton {
                    action: NotificationAction::OpenApp,
                    label: template.open_app_label.clone(),
                },
                NotificationButton {
                    action: NotificationAction::StopTracking,
                    label: template.stop_tracking_label.clone(),
                },
            ],
            ongoing: true,
        }
    }

    pub fn has_action(&self, action: NotificationAction) -> bool {
        self.buttons.iter().any(|b| b.action == action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_when_no_fix() {
        let n = Notification::for_fix(None, &NotificationTemplate::default());
        assert_eq!(n.text, "no fix yet");
        assert_eq!(n.id, DEFAULT_NOTIFICATION_ID);
        assert!(n.ongoing);
    }

    #[test]
    fn test_fix_text_in_body() {
        let fix = LocationFix::new(10.0, 20.0);
        let n = Notification::for_fix(Some(&fix), &NotificationTemplate::default());
        assert_eq!(n.text, "(10, 20)");
    }

    #[test]
    fn test_both_actions_present() {
        let n = Notification::for_fix(None, &NotificationTemplate::default());
        assert_eq!(n.buttons.len(), 2);
        assert!(n.has_action(NotificationAction::OpenApp));
        assert!(n.has_action(NotificationAction::StopTracking));
    }

    #[test]
    fn test_template_labels_are_used() {
        let template = NotificationTemplate {
            title: "Tracker".to_string(),
            stop_tracking_label: "Stop receiving location updates".to_string(),
            ..NotificationTemplate::default()
        };
        let n = Notification::for_fix(None, &template);
        assert_eq!(n.title, "Tracker");
        assert_eq!(n.buttons[1].label, "Stop receiving location updates");
    }
}
