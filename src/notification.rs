//! Desktop notifications for autopilot events

use crate::config::NotificationConfig;
use crate::constants::{NOTIFICATION_PREVIEW_LEN, NOTIFICATION_TIMEOUT_MS};

/// New drafts are waiting for review
pub fn notify_drafts_ready(config: &NotificationConfig, count: usize, first_subject: Option<&str>) {
    if count == 0 {
        return;
    }
    let summary = if count == 1 {
        "1 autopilot draft ready for review".to_string()
    } else {
        format!("{} autopilot drafts ready for review", count)
    };
    notify(config, &summary, first_subject);
}

/// The inbox or analyses could not be loaded for a cycle
pub fn notify_fetch_failed(config: &NotificationConfig) {
    notify(config, "Autopilot: failed to load emails", None);
}

/// A user-approved reply could not be sent
pub fn notify_send_failed(config: &NotificationConfig, subject: &str) {
    notify(config, "Autopilot: reply not sent", Some(subject));
}

fn notify(config: &NotificationConfig, summary: &str, preview: Option<&str>) {
    if !config.enabled {
        return;
    }

    let body = if config.show_preview {
        preview.map(truncate_preview)
    } else {
        None
    };

    // Fire and forget
    if let Err(e) = send_notification(summary, body.as_deref()) {
        tracing::warn!("Failed to send desktop notification: {}", e);
    }
}

fn truncate_preview(text: &str) -> String {
    if text.chars().count() > NOTIFICATION_PREVIEW_LEN {
        let cut: String = text.chars().take(NOTIFICATION_PREVIEW_LEN - 3).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

fn send_notification(summary: &str, body: Option<&str>) -> Result<(), notify_rust::error::Error> {
    use notify_rust::Notification;

    let mut notification = Notification::new();
    notification
        .summary(summary)
        .appname("inbox-autopilot")
        .timeout(notify_rust::Timeout::Milliseconds(NOTIFICATION_TIMEOUT_MS));

    if let Some(body) = body {
        notification.body(body);
    }

    notification.icon("mail-unread");

    notification.show()?;
    Ok(())
}
