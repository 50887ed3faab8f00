//! Notification builder.
//!
//! Decorates LockScreen notification nodes with an actionable control and
//! turns complete taps on that control into activation requests.
//!
//! # Touch protocol
//!
//! A control does nothing until [`NotificationBuilder::highlight`] arms it.
//! An armed control fires one [`ActivationRequest`] for a touch that starts
//! and ends on it. A touch that ends elsewhere, or an end without a start,
//! fires nothing.

use tokio::sync::mpsc;

/// Request to activate a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationRequest {
    /// Activated notification
    pub notification_id: String,
}

/// Actionable control attached to a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionControl {
    notification_id: String,
    armed: bool,
    touch_started: bool,
}

impl ActionControl {
    /// Notification this control activates.
    pub fn notification_id(&self) -> &str {
        &self.notification_id
    }

    /// Returns true once highlighted.
    pub fn is_armed(&self) -> bool {
        self.armed
    }
}

/// A notification shown on the LockScreen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationNode {
    /// Notification id
    pub notification_id: String,
    /// Title line
    pub title: String,
    /// Body text
    pub body: String,
    control: Option<ActionControl>,
}

impl NotificationNode {
    /// Create an undecorated node.
    pub fn new(notification_id: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self { notification_id: notification_id.into(), title: title.into(), body: body.into(), control: None }
    }

    /// Attached control, if decorated.
    pub fn control(&self) -> Option<&ActionControl> {
        self.control.as_ref()
    }

    /// Number of attached controls (0 or 1).
    pub fn control_count(&self) -> usize {
        usize::from(self.control.is_some())
    }
}

/// Phase of a touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPhase {
    /// Finger down
    Start,
    /// Finger up
    End,
}

/// What a touch landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchTarget {
    /// The actionable control
    Control,
    /// The notification body
    Node,
}

/// A touch on a notification node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchEvent {
    /// Touch phase
    pub phase: TouchPhase,
    /// Touched element
    pub target: TouchTarget,
}

impl TouchEvent {
    /// Finger down on `target`.
    pub fn start(target: TouchTarget) -> Self {
        Self { phase: TouchPhase::Start, target }
    }

    /// Finger up on `target`.
    pub fn end(target: TouchTarget) -> Self {
        Self { phase: TouchPhase::End, target }
    }
}

/// Decorates notification nodes and dispatches activation requests.
#[derive(Debug, Clone)]
pub struct NotificationBuilder {
    requests: mpsc::UnboundedSender<ActivationRequest>,
}

impl NotificationBuilder {
    /// Create a builder and the receiver of its activation requests.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ActivationRequest>) {
        let (requests, rx) = mpsc::unbounded_channel();
        (Self { requests }, rx)
    }

    /// Create a builder sending into an existing channel.
    pub fn with_sender(requests: mpsc::UnboundedSender<ActivationRequest>) -> Self {
        Self { requests }
    }

    /// Attach the actionable control. Idempotent.
    pub fn decorate(&self, node: &mut NotificationNode) {
        if node.control.is_some() {
            return;
        }
        node.control = Some(ActionControl {
            notification_id: node.notification_id.clone(),
            armed: false,
            touch_started: false,
        });
    }

    /// Arm the control for taps. Returns false if the node has no control.
    pub fn highlight(&self, node: &mut NotificationNode) -> bool {
        let Some(control) = node.control.as_mut() else {
            return false;
        };
        control.armed = true;
        control.touch_started = false;
        true
    }

    /// Disarm the control. Returns false if it was not armed.
    pub fn unhighlight(&self, node: &mut NotificationNode) -> bool {
        match node.control.as_mut() {
            Some(control) if control.armed => {
                control.armed = false;
                control.touch_started = false;
                true
            },
            _ => false,
        }
    }

    /// Feed a touch. Returns true if it completed a tap and dispatched an
    /// activation request.
    pub fn handle_touch(&self, node: &mut NotificationNode, touch: TouchEvent) -> bool {
        let Some(control) = node.control.as_mut() else {
            return false;
        };
        if !control.armed {
            return false;
        }

        match (touch.phase, touch.target) {
            (TouchPhase::Start, TouchTarget::Control) => {
                control.touch_started = true;
                false
            },
            (TouchPhase::Start, TouchTarget::Node) => {
                control.touch_started = false;
                false
            },
            (TouchPhase::End, TouchTarget::Control) if control.touch_started => {
                control.touch_started = false;
                let request = ActivationRequest { notification_id: control.notification_id.clone() };
                tracing::debug!(notification = %request.notification_id, "notification activated");
                if self.requests.send(request).is_err() {
                    tracing::warn!("activation request dropped: no receiver");
                    return false;
                }
                true
            },
            (TouchPhase::End, _) => {
                control.touch_started = false;
                false
            },
        }
    }
}
