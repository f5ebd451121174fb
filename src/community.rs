//! Community page: discussions, study groups, mentors, events and support.
//!
//! Every flow runs through one modal at a time. Confirming a modal updates
//! the board (a joined group gains a member, a registered event gains an
//! attendee) and shows a toast. Nothing leaves the server.

use crate::error::Result;
use crate::toast::{ToastKind, ToastSink};
use chrono::Local;
use handlebars::Handlebars;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

const SECTION_TEMPLATE: &str = "community";
const MODAL_TEMPLATE: &str = "community_modal";

/// Start times offered when booking a mentor
pub const TIME_SLOTS: [&str; 3] = ["6:00 PM", "7:00 PM", "8:00 PM"];
pub const SESSION_LENGTHS: [&str; 3] = ["30 minutes", "1 hour", "1.5 hours"];
pub const CATEGORIES: [&str; 6] = [
    "Hive Management",
    "Honey Production",
    "Bee Health",
    "Queen Rearing",
    "Equipment",
    "General",
];

const MIN_GROUP_SIZE: u32 = 2;
const MAX_GROUP_SIZE: u32 = 100;
const DEFAULT_GROUP_SIZE: u32 = 20;

const AGENT_NAME: &str = "Sarah Johnson";
const AGENT_GREETING: &str = "Hi! I'm Sarah, your support agent. How can I help you today?";
const AGENT_REPLY: &str = "Thanks for your message! I'll help you with that.";
/// How long the support agent takes to answer a chat message
pub const AGENT_REPLY_DELAY: Duration = Duration::from_secs(1);

const INCOMPLETE: &str = "Please fill in all required fields";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscussionStatus {
    Solved,
    Active,
    Featured,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discussion {
    pub id: String,
    pub title: String,
    pub author: String,
    /// Relative time, e.g. "2 hours ago"
    pub posted: String,
    pub category: String,
    pub replies: u32,
    pub views: u32,
    pub tags: Vec<String>,
    pub status: DiscussionStatus,
    pub preview: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupActivity {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyGroup {
    pub id: String,
    pub name: String,
    pub category: String,
    pub members: u32,
    pub activity: GroupActivity,
    pub description: String,
    pub schedule: String,
    /// Percent of the group's curriculum covered
    pub progress: u8,
    pub max_members: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mentor {
    pub id: String,
    pub name: String,
    pub title: String,
    pub rating: f64,
    pub sessions: u32,
    pub badge: String,
    pub bio: String,
    pub expertise: Vec<String>,
    pub availability: String,
    /// Dollars per hour
    pub price: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityEvent {
    pub id: String,
    pub title: String,
    pub date: String,
    pub time: String,
    pub registered: u32,
    pub description: String,
}

/// Content of the community page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommunityData {
    pub discussions: Vec<Discussion>,
    pub groups: Vec<StudyGroup>,
    pub mentors: Vec<Mentor>,
    pub events: Vec<CommunityEvent>,
}

/// Where the community page gets its content from
pub trait CommunitySource {
    fn fetch_community(&self) -> CommunityData;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DemoCommunity;

impl CommunitySource for DemoCommunity {
    fn fetch_community(&self) -> CommunityData {
        demo_community()
    }
}

/// The modals of the community page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "modal", rename_all = "kebab-case")]
pub enum CommunityModal {
    StartDiscussion,
    CreateGroup,
    FindMentor,
    ReportIssue,
    JoinGroup { group: String },
    ConnectMentor { mentor: String },
    JoinEvent { event: String },
    KnowledgeBase,
    LiveChat,
    ContactSupport,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscussionDraft {
    pub title: String,
    pub category: String,
    pub description: String,
    /// Comma separated
    pub tags: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GroupDraft {
    pub name: String,
    pub category: String,
    pub description: String,
    pub schedule: String,
    pub max_members: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingDraft {
    pub mentor: String,
    pub date: String,
    pub time: String,
    pub duration: String,
    pub topics: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventRegistration {
    pub event: String,
    pub name: String,
    pub email: String,
    pub questions: String,
    pub reminders: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueType {
    #[default]
    TechnicalProblem,
    ContentError,
    InappropriateContent,
    FeatureRequest,
    Other,
}

impl IssueType {
    pub const ALL: [IssueType; 5] = [
        IssueType::TechnicalProblem,
        IssueType::ContentError,
        IssueType::InappropriateContent,
        IssueType::FeatureRequest,
        IssueType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::TechnicalProblem => "technical-problem",
            IssueType::ContentError => "content-error",
            IssueType::InappropriateContent => "inappropriate-content",
            IssueType::FeatureRequest => "feature-request",
            IssueType::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            IssueType::TechnicalProblem => "Technical Problem",
            IssueType::ContentError => "Content Error",
            IssueType::InappropriateContent => "Inappropriate Content",
            IssueType::FeatureRequest => "Feature Request",
            IssueType::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReportDraft {
    pub issue_type: IssueType,
    pub title: String,
    pub description: String,
    pub steps: String,
    pub behavior: String,
    pub additional: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommunityList {
    Discussions,
    Events,
}

/// Browser actions on the community page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CommunityAction {
    Open(CommunityModal),
    Close,
    PostDiscussion(DiscussionDraft),
    CreateGroup(GroupDraft),
    JoinGroup { group: String },
    BookSession(BookingDraft),
    RegisterEvent(EventRegistration),
    SubmitReport(ReportDraft),
    SendChat { message: String },
    Search { query: String },
    ApplyFilters,
    ViewAll { list: CommunityList },
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Agent,
    Visitor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatLine {
    pub speaker: Speaker,
    pub text: String,
    pub time: String,
}

impl ChatLine {
    fn now(speaker: Speaker, text: &str) -> Self {
        Self {
            speaker,
            text: text.to_string(),
            time: Local::now().format("%-I:%M %p").to_string(),
        }
    }
}

#[derive(Debug, Default)]
struct ChatState {
    lines: Vec<ChatLine>,
    replies: Vec<JoinHandle<()>>,
    awaiting: usize,
}

/// The live support chat
///
/// Each visitor message gets a canned agent reply after
/// [`AGENT_REPLY_DELAY`]. Cloning is cheap and every clone sees the same
/// transcript.
#[derive(Debug, Clone, Default)]
pub struct LiveChat {
    state: Arc<Mutex<ChatState>>,
}

impl LiveChat {
    fn lock(&self) -> MutexGuard<'_, ChatState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start over with the agent's greeting, dropping pending replies
    pub fn restart(&self) {
        let mut state = self.lock();
        for reply in state.replies.drain(..) {
            reply.abort();
        }
        state.awaiting = 0;
        state.lines = vec![ChatLine::now(Speaker::Agent, AGENT_GREETING)];
    }

    /// Post a visitor message; blank messages are ignored
    pub fn send(&self, message: &str) -> bool {
        let message = message.trim();
        if message.is_empty() {
            return false;
        }
        let mut state = self.lock();
        state.lines.push(ChatLine::now(Speaker::Visitor, message));
        state.replies.retain(|reply| !reply.is_finished());

        match Handle::try_current() {
            Ok(runtime) => {
                state.awaiting += 1;
                let chat = self.clone();
                let reply = runtime.spawn(async move {
                    tokio::time::sleep(AGENT_REPLY_DELAY).await;
                    let mut state = chat.lock();
                    state.awaiting = state.awaiting.saturating_sub(1);
                    state.lines.push(ChatLine::now(Speaker::Agent, AGENT_REPLY));
                });
                state.replies.push(reply);
            }
            Err(_) => {
                warn!("no async runtime, answering chat message at once");
                state.lines.push(ChatLine::now(Speaker::Agent, AGENT_REPLY));
            }
        }
        true
    }

    pub fn lines(&self) -> Vec<ChatLine> {
        self.lock().lines.clone()
    }

    pub fn awaiting_reply(&self) -> bool {
        self.lock().awaiting > 0
    }

    fn stop(&self) {
        let mut state = self.lock();
        for reply in state.replies.drain(..) {
            reply.abort();
        }
        state.awaiting = 0;
    }
}

/// What the browser renders for the community page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommunityView {
    pub html: String,
    pub modal: Option<CommunityModal>,
    pub modal_html: Option<String>,
    pub chat: Vec<ChatLine>,
    pub awaiting_reply: bool,
}

/// Live state of the community page
pub struct CommunityBoard {
    data: CommunityData,
    joined: HashSet<String>,
    registered: HashSet<String>,
    booked: HashSet<String>,
    reports: Vec<ReportDraft>,
    posted: usize,
    modal: Option<CommunityModal>,
    chat: LiveChat,
    templates: Handlebars<'static>,
}

impl CommunityBoard {
    /// Set up the page around its content
    ///
    /// # Errors
    /// * Returns an error if a template does not compile
    pub fn new(data: CommunityData) -> Result<Self> {
        let mut templates = Handlebars::new();
        templates.register_template_string(SECTION_TEMPLATE, include_str!("./static/community.hbs"))?;
        templates.register_template_string(
            MODAL_TEMPLATE,
            include_str!("./static/community_modal.hbs"),
        )?;
        Ok(Self {
            data,
            joined: HashSet::new(),
            registered: HashSet::new(),
            booked: HashSet::new(),
            reports: Vec::new(),
            posted: 0,
            modal: None,
            chat: LiveChat::default(),
            templates,
        })
    }

    pub fn data(&self) -> &CommunityData {
        &self.data
    }

    pub fn modal(&self) -> Option<&CommunityModal> {
        self.modal.as_ref()
    }

    pub fn chat(&self) -> &LiveChat {
        &self.chat
    }

    pub fn is_member(&self, group: &str) -> bool {
        self.joined.contains(group)
    }

    pub fn is_registered(&self, event: &str) -> bool {
        self.registered.contains(event)
    }

    pub fn has_booked(&self, mentor: &str) -> bool {
        self.booked.contains(mentor)
    }

    /// Reports filed during this page session
    pub fn reports(&self) -> &[ReportDraft] {
        &self.reports
    }

    fn group(&self, id: &str) -> Option<&StudyGroup> {
        self.data.groups.iter().find(|g| g.id == id)
    }

    fn mentor(&self, id: &str) -> Option<&Mentor> {
        self.data.mentors.iter().find(|m| m.id == id)
    }

    fn event(&self, id: &str) -> Option<&CommunityEvent> {
        self.data.events.iter().find(|e| e.id == id)
    }

    /// Show a modal in place of any open one
    ///
    /// A modal about a group, mentor or event that does not exist stays shut.
    pub fn open(&mut self, modal: CommunityModal) -> bool {
        let known = match &modal {
            CommunityModal::JoinGroup { group } => self.group(group).is_some(),
            CommunityModal::ConnectMentor { mentor } => self.mentor(mentor).is_some(),
            CommunityModal::JoinEvent { event } => self.event(event).is_some(),
            _ => true,
        };
        if !known {
            debug!("not opening {:?}: unknown id", modal);
            return false;
        }
        if modal == CommunityModal::LiveChat {
            self.chat.restart();
        }
        self.modal = Some(modal);
        true
    }

    pub fn close(&mut self) {
        if self.modal.take() == Some(CommunityModal::LiveChat) {
            self.chat.stop();
        }
    }

    fn showing(&self, modal: &CommunityModal) -> bool {
        if self.modal.as_ref() == Some(modal) {
            return true;
        }
        debug!("ignoring submission, {:?} is not open", modal);
        false
    }

    /// Apply one browser action
    pub fn apply(&mut self, action: CommunityAction, toasts: &dyn ToastSink) {
        match action {
            CommunityAction::Open(modal) => {
                self.open(modal);
            }
            CommunityAction::Close => self.close(),
            CommunityAction::PostDiscussion(draft) => self.post_discussion(draft, toasts),
            CommunityAction::CreateGroup(draft) => self.create_group(draft, toasts),
            CommunityAction::JoinGroup { group } => self.join_group(&group, toasts),
            CommunityAction::BookSession(draft) => self.book_session(draft, toasts),
            CommunityAction::RegisterEvent(form) => self.register_event(form, toasts),
            CommunityAction::SubmitReport(draft) => self.submit_report(draft, toasts),
            CommunityAction::SendChat { message } => {
                if self.showing(&CommunityModal::LiveChat) {
                    self.chat.send(&message);
                }
            }
            CommunityAction::Search { query } => self.search(&query, toasts),
            CommunityAction::ApplyFilters => {
                toasts.push_toast("Filters applied successfully", ToastKind::Success)
            }
            CommunityAction::ViewAll { list } => {
                let message = match list {
                    CommunityList::Discussions => "Loading all discussions...",
                    CommunityList::Events => "Loading all events...",
                };
                toasts.push_toast(message, ToastKind::Info);
            }
        }
    }

    fn post_discussion(&mut self, draft: DiscussionDraft, toasts: &dyn ToastSink) {
        if !self.showing(&CommunityModal::StartDiscussion) {
            return;
        }
        if blank(&draft.title) || blank(&draft.description) {
            toasts.push_toast(INCOMPLETE, ToastKind::Error);
            return;
        }
        self.posted += 1;
        let category = match draft.category.trim() {
            "" => "General".to_string(),
            category => category.to_string(),
        };
        let discussion = Discussion {
            id: format!("your-post-{}", self.posted),
            title: draft.title.trim().to_string(),
            author: "You".to_string(),
            posted: "Just now".to_string(),
            category,
            replies: 0,
            views: 0,
            tags: draft
                .tags
                .split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(str::to_string)
                .collect(),
            status: DiscussionStatus::Active,
            preview: draft.description.trim().to_string(),
        };
        info!("discussion posted: {}", discussion.title);
        self.data.discussions.insert(0, discussion);
        self.modal = None;
        toasts.push_toast("Discussion posted successfully!", ToastKind::Success);
    }

    fn create_group(&mut self, draft: GroupDraft, toasts: &dyn ToastSink) {
        if !self.showing(&CommunityModal::CreateGroup) {
            return;
        }
        if blank(&draft.name) || blank(&draft.description) {
            toasts.push_toast(INCOMPLETE, ToastKind::Error);
            return;
        }
        let max_members = draft.max_members.unwrap_or(DEFAULT_GROUP_SIZE);
        if !(MIN_GROUP_SIZE..=MAX_GROUP_SIZE).contains(&max_members) {
            toasts.push_toast(
                &format!(
                    "Maximum members must be between {} and {}",
                    MIN_GROUP_SIZE, MAX_GROUP_SIZE
                ),
                ToastKind::Error,
            );
            return;
        }

        let id = self.unused_group_id(&draft.name);
        let group = StudyGroup {
            id: id.clone(),
            name: draft.name.trim().to_string(),
            category: match draft.category.trim() {
                "" => "General".to_string(),
                category => category.to_string(),
            },
            members: 1,
            activity: GroupActivity::Low,
            description: draft.description.trim().to_string(),
            schedule: draft.schedule.trim().to_string(),
            progress: 0,
            max_members: Some(max_members),
        };
        info!("study group created: {}", group.name);
        self.data.groups.push(group);
        self.joined.insert(id);
        self.modal = None;
        toasts.push_toast("Study group created successfully!", ToastKind::Success);
    }

    fn unused_group_id(&self, name: &str) -> String {
        let base = slug(name);
        let base = if base.is_empty() { "group".to_string() } else { base };
        let mut candidate = base.clone();
        let mut n = 2;
        while self.group(&candidate).is_some() {
            candidate = format!("{}-{}", base, n);
            n += 1;
        }
        candidate
    }

    fn join_group(&mut self, id: &str, toasts: &dyn ToastSink) {
        if !self.showing(&CommunityModal::JoinGroup {
            group: id.to_string(),
        }) {
            return;
        }
        self.modal = None;
        if !self.joined.insert(id.to_string()) {
            if let Some(group) = self.group(id) {
                toasts.push_toast(
                    &format!("You are already a member of {}", group.name),
                    ToastKind::Info,
                );
            }
            return;
        }
        if let Some(group) = self.data.groups.iter_mut().find(|g| g.id == id) {
            group.members += 1;
        }
        toasts.push_toast("Successfully joined the study group!", ToastKind::Success);
    }

    fn book_session(&mut self, draft: BookingDraft, toasts: &dyn ToastSink) {
        if !self.showing(&CommunityModal::ConnectMentor {
            mentor: draft.mentor.clone(),
        }) {
            return;
        }
        if blank(&draft.date) || !TIME_SLOTS.contains(&draft.time.trim()) {
            toasts.push_toast("Please choose a date and a time slot", ToastKind::Error);
            return;
        }
        info!("session booked with {} on {} at {}", draft.mentor, draft.date, draft.time);
        self.booked.insert(draft.mentor);
        self.modal = None;
        toasts.push_toast("Session booked successfully!", ToastKind::Success);
    }

    fn register_event(&mut self, form: EventRegistration, toasts: &dyn ToastSink) {
        if !self.showing(&CommunityModal::JoinEvent {
            event: form.event.clone(),
        }) {
            return;
        }
        if blank(&form.name) || blank(&form.email) {
            toasts.push_toast(INCOMPLETE, ToastKind::Error);
            return;
        }
        self.modal = None;
        if !self.registered.insert(form.event.clone()) {
            if let Some(event) = self.event(&form.event) {
                toasts.push_toast(
                    &format!("You are already registered for {}", event.title),
                    ToastKind::Info,
                );
            }
            return;
        }
        if let Some(event) = self.data.events.iter_mut().find(|e| e.id == form.event) {
            event.registered += 1;
        }
        toasts.push_toast("Event registration confirmed!", ToastKind::Success);
    }

    fn submit_report(&mut self, draft: ReportDraft, toasts: &dyn ToastSink) {
        if !self.showing(&CommunityModal::ReportIssue) {
            return;
        }
        if blank(&draft.title) || blank(&draft.description) {
            toasts.push_toast(INCOMPLETE, ToastKind::Error);
            return;
        }
        info!("{} reported: {}", draft.issue_type.label(), draft.title.trim());
        self.reports.push(draft);
        self.modal = None;
        toasts.push_toast("Bug report submitted successfully!", ToastKind::Success);
    }

    /// Count what matches `query` across the page
    ///
    /// Case-insensitive substring match on titles, names, categories, tags
    /// and expertise. Each item counts once.
    pub fn count_matches(&self, query: &str) -> usize {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return 0;
        }
        let hit = |fields: &[&str]| fields.iter().any(|f| f.to_lowercase().contains(&needle));
        let discussions = self.data.discussions.iter().filter(|d| {
            hit(&[d.title.as_str(), d.category.as_str()])
                || d.tags.iter().any(|t| hit(&[t.as_str()]))
        });
        let groups = self.data.groups.iter().filter(|g| {
            hit(&[g.name.as_str(), g.category.as_str(), g.description.as_str()])
        });
        let mentors = self.data.mentors.iter().filter(|m| {
            hit(&[m.name.as_str(), m.title.as_str()])
                || m.expertise.iter().any(|e| hit(&[e.as_str()]))
        });
        let events = self
            .data
            .events
            .iter()
            .filter(|e| hit(&[e.title.as_str(), e.description.as_str()]));
        discussions.count() + groups.count() + mentors.count() + events.count()
    }

    fn search(&self, query: &str, toasts: &dyn ToastSink) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }
        toasts.push_toast(&format!("Searching for \"{}\"...", query), ToastKind::Info);
        let found = self.count_matches(query);
        let noun = if found == 1 { "result" } else { "results" };
        toasts.push_toast(
            &format!("Found {} {} for \"{}\"", found, noun, query),
            ToastKind::Success,
        );
    }

    /// Render the page section
    ///
    /// # Errors
    /// * Returns an error if the template fails to render
    pub fn render(&self) -> Result<String> {
        let groups: Vec<Value> = self
            .data
            .groups
            .iter()
            .map(|g| {
                json!({
                    "id": g.id,
                    "name": g.name,
                    "category": g.category,
                    "members": g.members,
                    "activity": g.activity,
                    "description": g.description,
                    "schedule": g.schedule,
                    "progress": g.progress,
                    "joined": self.is_member(&g.id),
                })
            })
            .collect();
        let mentors: Vec<Value> = self
            .data
            .mentors
            .iter()
            .map(|m| mentor_card(m, self.has_booked(&m.id)))
            .collect();
        let events: Vec<Value> = self
            .data
            .events
            .iter()
            .map(|e| {
                json!({
                    "id": e.id,
                    "title": e.title,
                    "date": e.date,
                    "time": e.time,
                    "registered": e.registered,
                    "description": e.description,
                    "attending": self.is_registered(&e.id),
                })
            })
            .collect();
        let context = json!({
            "discussions": self.data.discussions,
            "groups": groups,
            "mentors": mentors,
            "events": events,
        });
        Ok(self.templates.render(SECTION_TEMPLATE, &context)?)
    }

    /// Render the body of the open modal, if any
    ///
    /// # Errors
    /// * Returns an error if the template fails to render
    pub fn render_modal(&self) -> Result<Option<String>> {
        let Some(modal) = &self.modal else {
            return Ok(None);
        };
        let mut context = json!({
            "categories": CATEGORIES,
            "time_slots": TIME_SLOTS,
            "session_lengths": SESSION_LENGTHS,
            "min_group_size": MIN_GROUP_SIZE,
            "max_group_size": MAX_GROUP_SIZE,
            "default_group_size": DEFAULT_GROUP_SIZE,
            "agent_name": AGENT_NAME,
        });
        let (flag, title) = match modal {
            CommunityModal::StartDiscussion => ("start_discussion", "Start a New Discussion".to_string()),
            CommunityModal::CreateGroup => ("create_group", "Create a Study Group".to_string()),
            CommunityModal::FindMentor => {
                let mentors: Vec<Value> = self
                    .data
                    .mentors
                    .iter()
                    .map(|m| mentor_card(m, self.has_booked(&m.id)))
                    .collect();
                context["mentors"] = json!(mentors);
                ("find_mentor", "Find a Mentor".to_string())
            }
            CommunityModal::ReportIssue => {
                let kinds: Vec<Value> = IssueType::ALL
                    .iter()
                    .map(|k| json!({ "value": k.as_str(), "label": k.label() }))
                    .collect();
                context["issue_types"] = json!(kinds);
                ("report_issue", "Report an Issue".to_string())
            }
            CommunityModal::JoinGroup { group } => {
                let Some(group) = self.group(group) else {
                    return Ok(None);
                };
                context["group"] = json!(group);
                context["member"] = json!(self.is_member(&group.id));
                ("join_group", format!("Join {}", group.name))
            }
            CommunityModal::ConnectMentor { mentor } => {
                let Some(mentor) = self.mentor(mentor) else {
                    return Ok(None);
                };
                context["mentor"] = mentor_card(mentor, self.has_booked(&mentor.id));
                ("connect_mentor", format!("Connect with {}", mentor.name))
            }
            CommunityModal::JoinEvent { event } => {
                let Some(event) = self.event(event) else {
                    return Ok(None);
                };
                context["event"] = json!(event);
                ("join_event", format!("Register for {}", event.title))
            }
            CommunityModal::KnowledgeBase => ("knowledge_base", "Knowledge Base".to_string()),
            CommunityModal::LiveChat => ("live_chat", "Live Chat Support".to_string()),
            CommunityModal::ContactSupport => ("contact_support", "Contact Support".to_string()),
        };
        context[flag] = json!(true);
        context["title"] = json!(title);
        Ok(Some(self.templates.render(MODAL_TEMPLATE, &context)?))
    }

    /// # Errors
    /// * Returns an error if the section or the modal fails to render
    pub fn view(&self) -> Result<CommunityView> {
        Ok(CommunityView {
            html: self.render()?,
            modal: self.modal.clone(),
            modal_html: self.render_modal()?,
            chat: self.chat.lines(),
            awaiting_reply: self.chat.awaiting_reply(),
        })
    }
}

impl Drop for CommunityBoard {
    fn drop(&mut self) {
        self.chat.stop();
    }
}

fn mentor_card(mentor: &Mentor, booked: bool) -> Value {
    json!({
        "id": mentor.id,
        "name": mentor.name,
        "title": mentor.title,
        "rating": format!("{:.1}", mentor.rating),
        "sessions": mentor.sessions,
        "badge": mentor.badge,
        "bio": mentor.bio,
        "expertise": mentor.expertise,
        "availability": mentor.availability,
        "price": mentor.price,
        "booked": booked,
    })
}

/// Lowercase ASCII words joined by `-`
fn slug(text: &str) -> String {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Content of the demo community page
pub fn demo_community() -> CommunityData {
    CommunityData {
        discussions: vec![
            Discussion {
                id: "spring-inspections".to_string(),
                title: "Spring inspections: what do you check first?".to_string(),
                author: "Sarah Chen".to_string(),
                posted: "2 hours ago".to_string(),
                category: "Hive Management".to_string(),
                replies: 24,
                views: 156,
                tags: strings(&["Hive Management", "Seasonal"]),
                status: DiscussionStatus::Solved,
                preview: "My colonies made it through winter. What is on your checklist for the first warm day?".to_string(),
            },
            Discussion {
                id: "urban-swarms".to_string(),
                title: "Swarm season tips for urban hives".to_string(),
                author: "Mike Rodriguez".to_string(),
                posted: "5 hours ago".to_string(),
                category: "Bee Health".to_string(),
                replies: 18,
                views: 89,
                tags: strings(&["Swarming", "Urban"]),
                status: DiscussionStatus::Active,
                preview: "Two hives on a rooftop and neighbours close by. How do you keep swarms from leaving?".to_string(),
            },
            Discussion {
                id: "first-harvest".to_string(),
                title: "Share your first honey harvest".to_string(),
                author: "Emily Watson".to_string(),
                posted: "1 day ago".to_string(),
                category: "Honey Production".to_string(),
                replies: 32,
                views: 234,
                tags: strings(&["Honey", "Harvest"]),
                status: DiscussionStatus::Featured,
                preview: "Post a photo of your first frames and tell us how the extraction went.".to_string(),
            },
        ],
        groups: vec![
            StudyGroup {
                id: "queen-rearers".to_string(),
                name: "Queen Rearers".to_string(),
                category: "Queen Rearing".to_string(),
                members: 156,
                activity: GroupActivity::High,
                description: "Grafting, cell builders and mating nucs, from first attempt to a steady supply of queens.".to_string(),
                schedule: "Weekly meetings: Sundays 2 PM EST".to_string(),
                progress: 75,
                max_members: None,
            },
            StudyGroup {
                id: "hive-health".to_string(),
                name: "Hive Health Watch".to_string(),
                category: "Bee Health".to_string(),
                members: 89,
                activity: GroupActivity::Medium,
                description: "Recognising brood diseases, counting mites and planning treatments together.".to_string(),
                schedule: "Bi-weekly meetings: Wednesdays 7 PM EST".to_string(),
                progress: 45,
                max_members: None,
            },
            StudyGroup {
                id: "urban-keepers".to_string(),
                name: "Urban Beekeepers".to_string(),
                category: "Hive Management".to_string(),
                members: 203,
                activity: GroupActivity::High,
                description: "Rooftops, balconies and small gardens: keeping bees where space is short.".to_string(),
                schedule: "Weekly meetings: Saturdays 10 AM EST".to_string(),
                progress: 60,
                max_members: None,
            },
        ],
        mentors: vec![
            Mentor {
                id: "david-chen".to_string(),
                name: "David Chen".to_string(),
                title: "Commercial beekeeper, 400 colonies".to_string(),
                rating: 4.9,
                sessions: 127,
                badge: "Top Mentor".to_string(),
                bio: "Twenty years running migratory pollination hives. Happy to talk scaling up, equipment and honey sales.".to_string(),
                expertise: strings(&["Hive Management", "Pollination", "Equipment", "Honey Sales"]),
                availability: "Mon-Fri 6-9 PM EST".to_string(),
                price: 75,
            },
            Mentor {
                id: "maria-garcia".to_string(),
                name: "Maria Garcia".to_string(),
                title: "Queen breeder".to_string(),
                rating: 4.8,
                sessions: 89,
                badge: "Rising Star".to_string(),
                bio: "Breeds hygienic queens and teaches grafting to beginners.".to_string(),
                expertise: strings(&["Queen Rearing", "Genetics", "Nucleus Colonies"]),
                availability: "Weekends 10 AM-2 PM EST".to_string(),
                price: 60,
            },
            Mentor {
                id: "james-wilson".to_string(),
                name: "James Wilson".to_string(),
                title: "Regional bee inspector".to_string(),
                rating: 4.7,
                sessions: 156,
                badge: "Verified".to_string(),
                bio: "Inspects hundreds of apiaries a year and knows every brood disease by smell.".to_string(),
                expertise: strings(&["Bee Health", "Disease Recognition", "Regulations"]),
                availability: "Tue-Thu 7-9 PM EST".to_string(),
                price: 90,
            },
        ],
        events: vec![
            CommunityEvent {
                id: "varroa-webinar".to_string(),
                title: "Varroa Control Webinar".to_string(),
                date: "2024-03-15".to_string(),
                time: "2:00 PM EST".to_string(),
                registered: 1247,
                description: "Monitoring and treatment strategies with David Chen.".to_string(),
            },
            CommunityEvent {
                id: "extraction-workshop".to_string(),
                title: "Honey Extraction Workshop".to_string(),
                date: "2024-03-22".to_string(),
                time: "10:00 AM EST".to_string(),
                registered: 856,
                description: "Hands-on session from uncapping to bottling.".to_string(),
            },
            CommunityEvent {
                id: "urban-panel".to_string(),
                title: "Urban Beekeeping Panel".to_string(),
                date: "2024-03-29".to_string(),
                time: "7:00 PM EST".to_string(),
                registered: 2134,
                description: "City beekeepers on neighbours, forage and local rules.".to_string(),
            },
        ],
    }
}
