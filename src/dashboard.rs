//! Cards of the dashboard page and the buttons on them.
//!
//! The cards are fixed demo content. Their buttons only give feedback; the
//! time filter above the charts is handled by the page session because it
//! remounts charts.

use crate::charts::DashboardRange;
use crate::toast::{ToastKind, ToastSink};
use serde::{Deserialize, Serialize};

/// A course suggested on the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub title: &'static str,
    pub instructor: &'static str,
    /// Percent done, `None` when not started
    pub progress: Option<u8>,
}

/// How visitors take part in an upcoming event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Attendance {
    /// Happening now, can be joined
    Live,
    /// Later, takes an RSVP
    Rsvp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpcomingEvent {
    pub title: &'static str,
    pub when: &'static str,
    pub attendance: Attendance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityEntry {
    pub who: &'static str,
    pub what: &'static str,
    pub when: &'static str,
}

/// Everything shown in the dashboard cards
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardCards {
    pub recommendations: Vec<Recommendation>,
    pub events: Vec<UpcomingEvent>,
    pub activity: Vec<ActivityEntry>,
}

pub fn demo_cards() -> DashboardCards {
    DashboardCards {
        recommendations: vec![
            Recommendation {
                title: "Advanced Hive Management Techniques",
                instructor: "Sarah Mitchell",
                progress: Some(65),
            },
            Recommendation {
                title: "Queen Rearing Masterclass",
                instructor: "Maria Garcia",
                progress: None,
            },
        ],
        events: vec![
            UpcomingEvent {
                title: "Live Hive Inspection Walkthrough",
                when: "Today, 4:00 PM",
                attendance: Attendance::Live,
            },
            UpcomingEvent {
                title: "Varroa Control Q&A",
                when: "Friday, 7:00 PM",
                attendance: Attendance::Rsvp,
            },
        ],
        activity: vec![
            ActivityEntry {
                who: "You",
                what: "completed \"Reading the Brood Frame\"",
                when: "2 hours ago",
            },
            ActivityEntry {
                who: "You",
                what: "earned the Swarm Spotter badge",
                when: "Yesterday",
            },
        ],
    }
}

/// Buttons of the dashboard page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DashboardAction {
    /// Time filter above the charts
    SwitchRange { range: DashboardRange },
    /// "Start Course" on a recommendation
    Preview { course: String },
    /// "Join Event" on a live event
    JoinEvent { event: String },
    Rsvp { event: String },
    Comments,
    Share,
}

/// Feedback for a card button
///
/// `SwitchRange` gives none; the charts changing is the feedback.
pub fn announce(action: &DashboardAction, toasts: &dyn ToastSink) {
    match action {
        DashboardAction::SwitchRange { .. } => {}
        DashboardAction::Preview { course } => toasts.push_toast(
            &format!("Opening preview for \"{}\"", course),
            ToastKind::Info,
        ),
        DashboardAction::JoinEvent { event } => {
            toasts.push_toast(&format!("Joining \"{}\"", event), ToastKind::Success)
        }
        DashboardAction::Rsvp { event } => {
            toasts.push_toast(&format!("RSVP'd to \"{}\"", event), ToastKind::Success)
        }
        DashboardAction::Comments => toasts.push_toast("Opening comments...", ToastKind::Info),
        DashboardAction::Share => toasts.push_toast("Sharing activity...", ToastKind::Info),
    }
}
