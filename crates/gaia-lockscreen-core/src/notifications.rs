//! Notification container.
//!
//! Keeps the LockScreen's notification list (newest first), decorates every
//! appended node and tracks which one is highlighted. Highlights idle for
//! longer than [`NotificationsConfig::highlight_timeout`] are cleaned up.

use std::{collections::HashMap, ops::Sub, time::Duration};

use crate::notification::{NotificationBuilder, NotificationNode, TouchEvent};

/// Default idle time before a highlight is cleaned up.
pub const DEFAULT_HIGHLIGHT_TIMEOUT: Duration = Duration::from_secs(3);

/// Notification container configuration
#[derive(Debug, Clone)]
pub struct NotificationsConfig {
    /// Idle time before a highlighted notification is cleaned up
    pub highlight_timeout: Duration,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self { highlight_timeout: DEFAULT_HIGHLIGHT_TIMEOUT }
    }
}

/// Notifications shown on the LockScreen.
///
/// Generic over the instant type so highlight timestamps follow virtual time
/// in simulation.
#[derive(Debug)]
pub struct LockScreenNotifications<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    builder: NotificationBuilder,
    config: NotificationsConfig,
    /// Newest first
    nodes: Vec<NotificationNode>,
    highlighted: HashMap<String, I>,
    current_highlighted: Option<String>,
}

impl<I> LockScreenNotifications<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Create an empty container decorating nodes with `builder`.
    pub fn new(builder: NotificationBuilder, config: NotificationsConfig) -> Self {
        Self { builder, config, nodes: Vec::new(), highlighted: HashMap::new(), current_highlighted: None }
    }

    /// Notifications, newest first.
    pub fn nodes(&self) -> &[NotificationNode] {
        &self.nodes
    }

    /// Look up a notification.
    pub fn get(&self, id: &str) -> Option<&NotificationNode> {
        self.nodes.iter().find(|n| n.notification_id == id)
    }

    /// Returns true if the container is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Currently highlighted notification.
    pub fn current_highlighted(&self) -> Option<&str> {
        self.current_highlighted.as_deref()
    }

    /// Append `node`.
    ///
    /// A node with the same id is replaced in place. Otherwise the node is
    /// inserted at the top. Either way it is decorated.
    pub fn append(&mut self, mut node: NotificationNode) {
        self.builder.decorate(&mut node);
        let id = node.notification_id.clone();
        if let Some(slot) = self.nodes.iter_mut().find(|n| n.notification_id == id) {
            *slot = node;
            if self.current_highlighted.as_deref() == Some(id.as_str()) {
                self.forget_highlight(&id);
            }
        } else {
            self.nodes.insert(0, node);
        }
        tracing::debug!(notification = %id, count = self.nodes.len(), "notification appended");
    }

    /// Remove a notification. Returns it if present.
    pub fn remove(&mut self, id: &str) -> Option<NotificationNode> {
        let index = self.nodes.iter().position(|n| n.notification_id == id)?;
        self.forget_highlight(id);
        Some(self.nodes.remove(index))
    }

    /// Remove every notification.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.highlighted.clear();
        self.current_highlighted = None;
    }

    /// Highlight a notification, arming its control.
    ///
    /// Re-highlighting refreshes the timestamp. Returns false if the
    /// notification is unknown or has no control.
    pub fn highlight(&mut self, id: &str, now: I) -> bool {
        if let Some(previous) = self.current_highlighted.clone()
            && previous != id
        {
            self.unhighlight(&previous);
        }

        let Some(node) = self.nodes.iter_mut().find(|n| n.notification_id == id) else {
            return false;
        };
        if !self.builder.highlight(node) {
            return false;
        }
        self.highlighted.insert(id.to_string(), now);
        self.current_highlighted = Some(id.to_string());
        true
    }

    /// Clean up `id` if it has been highlighted for longer than the timeout.
    pub fn clean_highlighted(&mut self, id: &str, now: I) -> bool {
        match self.highlighted.get(id) {
            Some(&since) if now - since > self.config.highlight_timeout => {
                self.unhighlight(id);
                true
            },
            _ => false,
        }
    }

    /// Clean up every expired highlight. Returns the cleaned ids.
    pub fn clean_expired(&mut self, now: I) -> Vec<String> {
        let timeout = self.config.highlight_timeout;
        let mut expired: Vec<String> =
            self.highlighted.iter().filter(|&(_, &since)| now - since > timeout).map(|(id, _)| id.clone()).collect();
        expired.sort();
        for id in &expired {
            self.unhighlight(id);
        }
        expired
    }

    /// Earliest instant at which a highlight expires.
    pub fn next_expiry(&self) -> Option<I>
    where
        I: std::ops::Add<Duration, Output = I>,
    {
        self.highlighted.values().min().map(|&since| since + self.config.highlight_timeout)
    }

    /// A touch landed outside every notification: drop the highlight.
    pub fn blur(&mut self) {
        if let Some(id) = self.current_highlighted.clone() {
            self.unhighlight(&id);
        }
    }

    /// Feed a touch on notification `id` to its control.
    ///
    /// Returns true if the touch completed a tap and an activation request was
    /// dispatched.
    pub fn touch(&mut self, id: &str, touch: TouchEvent) -> bool {
        let Some(node) = self.nodes.iter_mut().find(|n| n.notification_id == id) else {
            return false;
        };
        self.builder.handle_touch(node, touch)
    }

    fn unhighlight(&mut self, id: &str) {
        if let Some(node) = self.nodes.iter_mut().find(|n| n.notification_id == id) {
            self.builder.unhighlight(node);
        }
        self.forget_highlight(id);
    }

    fn forget_highlight(&mut self, id: &str) {
        self.highlighted.remove(id);
        if self.current_highlighted.as_deref() == Some(id) {
            self.current_highlighted = None;
        }
    }
}
