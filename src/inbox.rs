//! Generic inbox controller
//!
//! One `Inbox<T>` owns the items behind a header icon (the notification bell
//! or the messages envelope): the item store, the dropdown's open state, the
//! unread badge and the HTML of the list. Both header inboxes are the same
//! component with a different [`InboxConfig`].
//!
//! Unknown ids are never an error; every mutation on a missing id is a no-op.

use crate::error::Result;
use crate::items::{InboxItem, ItemId, ItemSource, MessageItem, NotificationItem};
use crate::toast::{ToastKind, ToastSink};
use handlebars::Handlebars;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

const LIST_TEMPLATE: &str = "inbox-list";

/// Which header inbox a controller backs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InboxKind {
    Notifications,
    Messages,
}

/// Everything that differs between the two header inboxes
#[derive(Debug, Clone)]
pub struct InboxConfig {
    pub kind: InboxKind,
    /// Heading of the dropdown
    pub title: &'static str,
    /// Handlebars template rendering `items` into the dropdown list
    pub list_template: &'static str,
    pub empty_text: &'static str,
    pub marked_all_toast: &'static str,
    pub removed_toast: &'static str,
    pub view_all_toast: &'static str,
    /// Whether the dropdown footer offers "Compose new message"
    pub allows_compose: bool,
}

impl InboxConfig {
    pub fn notifications() -> Self {
        Self {
            kind: InboxKind::Notifications,
            title: "Notifications",
            list_template: include_str!("./static/notification_list.hbs"),
            empty_text: "No new notifications",
            marked_all_toast: "All notifications marked as read",
            removed_toast: "Notification removed",
            view_all_toast: "Opening all notifications...",
            allows_compose: false,
        }
    }

    pub fn messages() -> Self {
        Self {
            kind: InboxKind::Messages,
            title: "Messages",
            list_template: include_str!("./static/message_list.hbs"),
            empty_text: "No messages",
            marked_all_toast: "All messages marked as read",
            removed_toast: "Message removed",
            view_all_toast: "Opening all messages...",
            allows_compose: true,
        }
    }
}

/// What the unread badge on the trigger icon shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    Hidden,
    Count(usize),
    /// More unread items than the badge can show
    Overflow,
}

impl Badge {
    pub const MAX_SHOWN: usize = 99;

    pub fn for_unread(unread: usize) -> Self {
        match unread {
            0 => Badge::Hidden,
            n if n > Self::MAX_SHOWN => Badge::Overflow,
            n => Badge::Count(n),
        }
    }

    pub fn is_visible(&self) -> bool {
        !matches!(self, Badge::Hidden)
    }

    /// Text for the badge element, `None` when the element is hidden
    pub fn text(&self) -> Option<String> {
        self.is_visible().then(|| self.to_string())
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Badge::Hidden => Ok(()),
            Badge::Count(n) => write!(f, "{}", n),
            Badge::Overflow => write!(f, "{}+", Self::MAX_SHOWN),
        }
    }
}

/// A user action on one inbox, as sent by the browser
///
/// `{"type": "mark-read", "id": 2}`, `{"type": "mark-all-read"}`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum InboxAction {
    Toggle,
    MarkRead { id: ItemId },
    MarkAllRead,
    Remove { id: ItemId },
    ViewAll,
    Compose,
}

/// Follow-up work an action leaves for the page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboxEffect {
    None,
    /// The dropdown just opened, siblings have to close
    Opened,
    Closed,
    /// The compose form has to open
    OpenCompose,
}

/// Render-ready state of one inbox
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InboxView {
    pub kind: InboxKind,
    pub title: &'static str,
    pub open: bool,
    pub unread: usize,
    /// Badge text, `null` when the badge is hidden
    pub badge: Option<String>,
    pub html: String,
}

#[derive(Serialize)]
struct ItemRow<'a, T> {
    #[serde(flatten)]
    item: &'a T,
    state: &'static str,
    color: &'static str,
}

#[derive(Serialize)]
struct ListContext<'a, T> {
    items: Vec<ItemRow<'a, T>>,
    empty_text: &'static str,
}

pub struct Inbox<T> {
    config: InboxConfig,
    items: Vec<T>,
    open: bool,
    templates: Handlebars<'static>,
    toasts: Arc<dyn ToastSink>,
}

impl<T: InboxItem> Inbox<T> {
    /// Seed the inbox and attach it to its trigger icon
    ///
    /// Returns `Ok(None)` when the page has no trigger for this inbox; the
    /// feature simply does not exist there.
    pub fn initialize(
        config: InboxConfig,
        source: &dyn ItemSource<T>,
        trigger_present: bool,
        toasts: Arc<dyn ToastSink>,
    ) -> Result<Option<Self>> {
        if !trigger_present {
            debug!("no trigger for {:?} inbox on this page", config.kind);
            return Ok(None);
        }

        let mut templates = Handlebars::new();
        templates.register_template_string(LIST_TEMPLATE, config.list_template)?;

        let mut seen = HashSet::new();
        let items: Vec<T> = source
            .fetch_initial_items()
            .into_iter()
            .filter(|item| {
                let fresh = seen.insert(item.id());
                if !fresh {
                    warn!("dropping duplicate {:?} item {}", config.kind, item.id());
                }
                fresh
            })
            .collect();

        Ok(Some(Self {
            config,
            items,
            open: false,
            templates,
            toasts,
        }))
    }

    pub fn kind(&self) -> InboxKind {
        self.config.kind
    }

    /// Items in display order
    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn get(&self, id: ItemId) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Flip the dropdown and report the new state
    pub fn toggle_open(&mut self) -> bool {
        self.open = !self.open;
        self.open
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|item| !item.is_read()).count()
    }

    pub fn badge(&self) -> Badge {
        Badge::for_unread(self.unread_count())
    }

    /// Mark one item read; returns whether the id was found
    pub fn mark_as_read(&mut self, id: ItemId) -> bool {
        match self.items.iter_mut().find(|item| item.id() == id) {
            Some(item) => {
                item.mark_read();
                true
            }
            None => {
                debug!("{:?}: mark-read on unknown id {}", self.config.kind, id);
                false
            }
        }
    }

    pub fn mark_all_read(&mut self) {
        self.items.iter_mut().for_each(|item| item.mark_read());
        self.toasts
            .push_toast(self.config.marked_all_toast, ToastKind::Success);
    }

    /// Remove one item; returns whether the id was found
    pub fn remove(&mut self, id: ItemId) -> bool {
        let Some(position) = self.items.iter().position(|item| item.id() == id) else {
            debug!("{:?}: remove on unknown id {}", self.config.kind, id);
            return false;
        };
        self.items.remove(position);
        self.toasts.push_toast(self.config.removed_toast, ToastKind::Info);
        true
    }

    pub fn view_all(&self) {
        self.toasts.push_toast(self.config.view_all_toast, ToastKind::Info);
    }

    /// Apply a browser action
    pub fn apply(&mut self, action: InboxAction) -> InboxEffect {
        match action {
            InboxAction::Toggle => {
                if self.toggle_open() {
                    InboxEffect::Opened
                } else {
                    InboxEffect::Closed
                }
            }
            InboxAction::MarkRead { id } => {
                self.mark_as_read(id);
                InboxEffect::None
            }
            InboxAction::MarkAllRead => {
                self.mark_all_read();
                InboxEffect::None
            }
            InboxAction::Remove { id } => {
                self.remove(id);
                InboxEffect::None
            }
            InboxAction::ViewAll => {
                self.view_all();
                InboxEffect::None
            }
            InboxAction::Compose if self.config.allows_compose => InboxEffect::OpenCompose,
            InboxAction::Compose => InboxEffect::None,
        }
    }

    /// HTML of the dropdown list, in store order
    pub fn render(&self) -> Result<String> {
        let context = ListContext {
            items: self
                .items
                .iter()
                .map(|item| ItemRow {
                    item,
                    state: if item.is_read() { "read" } else { "unread" },
                    color: item.accent(),
                })
                .collect(),
            empty_text: self.config.empty_text,
        };
        Ok(self.templates.render(LIST_TEMPLATE, &context)?)
    }

    pub fn view(&self) -> Result<InboxView> {
        Ok(InboxView {
            kind: self.config.kind,
            title: self.config.title,
            open: self.open,
            unread: self.unread_count(),
            badge: self.badge().text(),
            html: self.render()?,
        })
    }
}

pub type NotificationInbox = Inbox<NotificationItem>;
pub type MessageInbox = Inbox<MessageItem>;
