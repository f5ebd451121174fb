use serde::{Deserialize, Serialize};

/// Identifier of an inbox item, unique within one live collection
pub type ItemId = u32;

/// Behaviour the generic inbox needs from the records it stores
///
/// Everything else about an item (kind, sender, avatar) is presentation and
/// only reaches the item template through `Serialize`.
pub trait InboxItem: Clone + Serialize {
    fn id(&self) -> ItemId;
    fn is_read(&self) -> bool;
    fn mark_read(&mut self);
    /// Colour of the item's icon
    fn accent(&self) -> &'static str;
}

/// Where an inbox gets its initial records from
///
/// The demo site ships fixed seed data; a real deployment would put a network
/// call behind this without touching the controller.
pub trait ItemSource<T> {
    fn fetch_initial_items(&self) -> Vec<T>;
}

/// Category of a notification, drives the icon and colour only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Course,
    Achievement,
    Reminder,
    Community,
    System,
    Group,
    Mentor,
    Event,
}

impl NotificationKind {
    pub fn color(&self) -> &'static str {
        match self {
            NotificationKind::Course | NotificationKind::Group => "#A435F0",
            NotificationKind::Achievement | NotificationKind::Event => "#FFD700",
            NotificationKind::Reminder | NotificationKind::Mentor => "#FF6B6B",
            NotificationKind::Community => "#4ECDC4",
            NotificationKind::System => "#95A5A6",
        }
    }
}

/// A single entry of the notification bell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationItem {
    pub id: ItemId,
    pub kind: NotificationKind,
    pub title: String,
    /// Body text shown under the title
    #[serde(rename = "message")]
    pub body: String,
    /// Relative time label, e.g. "2 hours ago"
    pub time: String,
    pub icon: String,
    pub read: bool,
}

impl InboxItem for NotificationItem {
    fn id(&self) -> ItemId {
        self.id
    }

    fn is_read(&self) -> bool {
        self.read
    }

    fn mark_read(&mut self) {
        self.read = true;
    }

    fn accent(&self) -> &'static str {
        self.kind.color()
    }
}

/// Category of a direct message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Instructor,
    Community,
    Support,
    Mentor,
    System,
}

impl MessageKind {
    pub fn color(&self) -> &'static str {
        match self {
            MessageKind::Instructor => "#A435F0",
            MessageKind::Community => "#4ECDC4",
            MessageKind::Support => "#FF6B6B",
            MessageKind::Mentor => "#FFD700",
            MessageKind::System => "#95A5A6",
        }
    }
}

/// A single entry of the messages envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageItem {
    pub id: ItemId,
    pub kind: MessageKind,
    pub sender: String,
    pub title: String,
    #[serde(rename = "message")]
    pub body: String,
    pub time: String,
    pub avatar: String,
    pub icon: String,
    pub read: bool,
}

impl InboxItem for MessageItem {
    fn id(&self) -> ItemId {
        self.id
    }

    fn is_read(&self) -> bool {
        self.read
    }

    fn mark_read(&mut self) {
        self.read = true;
    }

    fn accent(&self) -> &'static str {
        self.kind.color()
    }
}

/// Fixed notification set shown on every page of the demo site
#[derive(Debug, Default, Clone, Copy)]
pub struct DemoNotifications;

impl ItemSource<NotificationItem> for DemoNotifications {
    fn fetch_initial_items(&self) -> Vec<NotificationItem> {
        let seed = [
            (
                NotificationKind::Course,
                "New Course Available",
                "Advanced Hive Management Techniques is now available!",
                "2 hours ago",
                "graduation-cap",
                false,
            ),
            (
                NotificationKind::Achievement,
                "Achievement Unlocked!",
                "You've earned the \"Hive Inspector\" badge for completing 10 hive inspections.",
                "1 day ago",
                "trophy",
                false,
            ),
            (
                NotificationKind::Reminder,
                "Upcoming Webinar",
                "Don't forget: \"Spring Hive Preparation\" webinar starts in 30 minutes.",
                "3 hours ago",
                "calendar-alt",
                true,
            ),
            (
                NotificationKind::Community,
                "New Discussion",
                "Sarah Johnson started a new discussion: \"Best practices for queen rearing\".",
                "5 hours ago",
                "users",
                false,
            ),
            (
                NotificationKind::System,
                "System Update",
                "New features added: Advanced analytics and progress tracking.",
                "1 day ago",
                "cog",
                true,
            ),
        ];

        seed.into_iter()
            .zip(1..)
            .map(|((kind, title, body, time, icon, read), id)| NotificationItem {
                id,
                kind,
                title: title.to_string(),
                body: body.to_string(),
                time: time.to_string(),
                icon: icon.to_string(),
                read,
            })
            .collect()
    }
}

/// Fixed message set shown on every page of the demo site
#[derive(Debug, Default, Clone, Copy)]
pub struct DemoMessages;

impl ItemSource<MessageItem> for DemoMessages {
    fn fetch_initial_items(&self) -> Vec<MessageItem> {
        let seed = [
            (
                MessageKind::Instructor,
                "Sarah Mitchell",
                "Welcome to Advanced Hive Management!",
                "Hi Alex! Welcome to the Advanced Hive Management course. I'm excited to be your instructor and help you master advanced beekeeping techniques.",
                "2 hours ago",
                "https://randomuser.me/api/portraits/women/44.jpg",
                "graduation-cap",
                false,
            ),
            (
                MessageKind::Community,
                "David Chen",
                "Study Group Invitation",
                "Hey! I noticed you're also taking the Advanced Hive Management course. Would you like to join our study group? We meet weekly on Sundays.",
                "1 day ago",
                "https://randomuser.me/api/portraits/men/32.jpg",
                "users",
                false,
            ),
            (
                MessageKind::Support,
                "Pollen Patrol Academy Support",
                "Course Progress Update",
                "Great job on completing Module 3! You're making excellent progress. Keep up the good work!",
                "3 hours ago",
                "https://randomuser.me/api/portraits/men/68.jpg",
                "headset",
                true,
            ),
            (
                MessageKind::Mentor,
                "Maria Garcia",
                "Mentorship Session Confirmed",
                "Your mentorship session is confirmed for tomorrow at 3 PM. We'll discuss queen rearing techniques and answer any questions you have.",
                "5 hours ago",
                "https://randomuser.me/api/portraits/women/32.jpg",
                "user-tie",
                false,
            ),
            (
                MessageKind::System,
                "Pollen Patrol Academy System",
                "New Feature Available",
                "We've just launched our new mobile app! Download it to continue learning on the go with offline access to your courses.",
                "1 day ago",
                "https://randomuser.me/api/portraits/men/10.jpg",
                "mobile-alt",
                true,
            ),
        ];

        seed.into_iter()
            .zip(1..)
            .map(
                |((kind, sender, title, body, time, avatar, icon, read), id)| MessageItem {
                    id,
                    kind,
                    sender: sender.to_string(),
                    title: title.to_string(),
                    body: body.to_string(),
                    time: time.to_string(),
                    avatar: avatar.to_string(),
                    icon: icon.to_string(),
                    read,
                },
            )
            .collect()
    }
}

/// Item source over an explicit list, handy for pages and tests that need
/// a specific inbox state
#[derive(Debug, Clone, Default)]
pub struct FixedItems<T>(pub Vec<T>);

impl<T: Clone> ItemSource<T> for FixedItems<T> {
    fn fetch_initial_items(&self) -> Vec<T> {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_demo_notifications_have_unique_ids() {
        let items = DemoNotifications.fetch_initial_items();
        assert_eq!(items.len(), 5);
        let ids: HashSet<_> = items.iter().map(|n| n.id).collect();
        assert_eq!(ids.len(), items.len());
        assert_eq!(items.iter().filter(|n| !n.read).count(), 3);
    }

    #[test]
    fn test_demo_messages_have_unique_ids() {
        let items = DemoMessages.fetch_initial_items();
        let ids: HashSet<_> = items.iter().map(|m| m.id).collect();
        assert_eq!(ids.len(), 5);
        assert_eq!(items[0].sender, "Sarah Mitchell");
    }

    #[test]
    fn test_item_wire_shape() {
        let item = &DemoNotifications.fetch_initial_items()[0];
        let json = serde_json::to_value(item).unwrap();
        assert_eq!(json["kind"], "course");
        assert_eq!(json["message"], item.body);
        assert_eq!(json["read"], false);
    }

    #[test]
    fn test_kind_colors() {
        assert_eq!(NotificationKind::Group.color(), NotificationKind::Course.color());
        assert_eq!(MessageKind::System.color(), "#95A5A6");
    }
}
