use crate::toast::{ToastKind, ToastSink};
use serde::de::IntoDeserializer;
use serde::{Deserialize, Serialize};

/// Who a new message can be addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recipient {
    Instructor,
    Support,
    Mentor,
}

impl Recipient {
    pub const ALL: [Recipient; 3] = [Recipient::Instructor, Recipient::Support, Recipient::Mentor];

    /// Value the compose form submits for this recipient
    pub fn as_str(&self) -> &'static str {
        match self {
            Recipient::Instructor => "instructor",
            Recipient::Support => "support",
            Recipient::Mentor => "mentor",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Recipient::Instructor => "Instructor",
            Recipient::Support => "Support Team",
            Recipient::Mentor => "Mentor",
        }
    }
}

/// Field values of the compose modal
///
/// An unselected recipient arrives as an empty string and deserializes to
/// `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeDraft {
    #[serde(default, deserialize_with = "recipient_or_blank")]
    pub recipient: Option<Recipient>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
}

impl ComposeDraft {
    /// Whether every required field carries something other than whitespace
    pub fn is_complete(&self) -> bool {
        self.recipient.is_some() && !self.subject.trim().is_empty() && !self.body.trim().is_empty()
    }
}

fn recipient_or_blank<'de, D>(deserializer: D) -> Result<Option<Recipient>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => Recipient::deserialize(value.into_deserializer()).map(Some),
    }
}

/// Browser actions on the compose modal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ComposeAction {
    Open,
    Cancel,
    Send(ComposeDraft),
}

/// Outcome of pressing "Send Message"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    /// A field was missing; the modal stays open
    Incomplete,
    /// The modal was not open
    Ignored,
}

/// The compose-new-message modal of the messages inbox
///
/// Outbound messages are not modelled; sending only validates the draft and
/// gives feedback.
#[derive(Debug, Default)]
pub struct ComposeForm {
    open: bool,
}

impl ComposeForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn send(&mut self, draft: &ComposeDraft, toasts: &dyn ToastSink) -> SendOutcome {
        if !self.open {
            return SendOutcome::Ignored;
        }
        if !draft.is_complete() {
            toasts.push_toast("Please fill in all fields", ToastKind::Error);
            return SendOutcome::Incomplete;
        }
        toasts.push_toast("Message sent successfully!", ToastKind::Success);
        self.open = false;
        SendOutcome::Sent
    }

    pub fn apply(&mut self, action: &ComposeAction, toasts: &dyn ToastSink) -> SendOutcome {
        match action {
            ComposeAction::Open => {
                self.open();
                SendOutcome::Ignored
            }
            ComposeAction::Cancel => {
                self.close();
                SendOutcome::Ignored
            }
            ComposeAction::Send(draft) => self.send(draft, toasts),
        }
    }
}
