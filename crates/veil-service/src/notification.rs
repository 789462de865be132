//! Foreground notification
//!
//! Hosts that require a persistent "service active" indicator implement
//! [`NotificationPresenter`]. Headless hosts can use [`TracingPresenter`].

use crate::config::NotificationConfig;
use tracing::info;

/// Notification channel description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationChannel {
    pub id: String,
    /// User-visible name
    pub name: String,
    pub description: String,
}

/// Persistent foreground notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u32,
    pub channel: NotificationChannel,
    pub title: String,
    pub message: String,
    /// Cannot be swiped away
    pub ongoing: bool,
}

impl Notification {
    /// The "session active" notification for the given settings
    pub fn active(config: &NotificationConfig) -> Self {
        Self {
            id: config.id,
            channel: NotificationChannel {
                id: config.channel_id.clone(),
                name: config.channel_name.clone(),
                description: config.channel_description.clone(),
            },
            title: config.title.clone(),
            message: config.message.clone(),
            ongoing: true,
        }
    }
}

/// Notification errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum NotificationError {
    #[error("Notification channel unavailable: {0}")]
    Channel(String),

    #[error("Failed to show notification: {0}")]
    Show(String),
}

/// Displays the foreground indicator
pub trait NotificationPresenter: Send + Sync {
    /// Register the channel. Must be safe to call repeatedly.
    fn ensure_channel(&self, channel: &NotificationChannel) -> Result<(), NotificationError>;

    /// Show the notification and mark the service as foreground
    fn show_foreground(&self, notification: &Notification) -> Result<(), NotificationError>;

    /// Remove the notification
    fn dismiss(&self, id: u32);
}

/// Register the channel, then raise the notification
pub fn present(
    presenter: &dyn NotificationPresenter,
    notification: &Notification,
) -> Result<(), NotificationError> {
    presenter.ensure_channel(&notification.channel)?;
    presenter.show_foreground(notification)
}

/// Presenter for hosts without a notification surface; logs instead
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPresenter;

impl NotificationPresenter for TracingPresenter {
    fn ensure_channel(&self, _channel: &NotificationChannel) -> Result<(), NotificationError> {
        Ok(())
    }

    fn show_foreground(&self, notification: &Notification) -> Result<(), NotificationError> {
        info!("{}: {}", notification.title, notification.message);
        Ok(())
    }

    fn dismiss(&self, _id: u32) {}
}
