//! Page sessions: the live state behind one loaded page.
//!
//! [`PageSession::build`] is the only place controllers are created and wired
//! together. The browser talks to a session exclusively through
//! [`PageAction`]s and reads it back through [`PageSnapshot`]s; reloading the
//! page throws the session away and builds a fresh one.

use crate::catalog::{Catalog, Course};
use crate::charts::{self, ChartMount, ChartSlot, DashboardRange, Period};
use crate::community::{CommunityAction, CommunityBoard, CommunitySource, CommunityView, DemoCommunity};
use crate::compose::{ComposeAction, ComposeForm};
use crate::dashboard::{self, DashboardAction};
use crate::error::Result;
use crate::inbox::{
    InboxAction, InboxConfig, InboxEffect, InboxKind, InboxView, MessageInbox, NotificationInbox,
};
use crate::items::{DemoMessages, DemoNotifications, ItemSource, MessageItem, NotificationItem};
use crate::toast::{Toast, ToastBoard, ToastId, ToastKind, ToastSink};
use log::debug;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    Dashboard,
    Analytics,
    Catalog,
    Community,
}

impl PageKind {
    pub const ALL: [PageKind; 4] = [
        PageKind::Dashboard,
        PageKind::Analytics,
        PageKind::Catalog,
        PageKind::Community,
    ];

    /// Whether the page sits behind the login gate
    pub fn requires_auth(&self) -> bool {
        !matches!(self, PageKind::Catalog)
    }

    pub fn path(&self) -> &'static str {
        match self {
            PageKind::Dashboard => "/dashboard",
            PageKind::Analytics => "/analytics",
            PageKind::Catalog => "/catalog",
            PageKind::Community => "/community",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            PageKind::Dashboard => "Dashboard",
            PageKind::Analytics => "Learning Analytics",
            PageKind::Catalog => "Course Catalog",
            PageKind::Community => "Community",
        }
    }
}

/// Dropdowns in the page header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Menu {
    Notifications,
    Messages,
    User,
}

impl From<InboxKind> for Menu {
    fn from(kind: InboxKind) -> Self {
        match kind {
            InboxKind::Notifications => Menu::Notifications,
            InboxKind::Messages => Menu::Messages,
        }
    }
}

/// Scroll animation timing, identical on every page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnimationSettings {
    pub duration: u32,
    pub easing: &'static str,
    pub once: bool,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            duration: 800,
            easing: "ease-in-out",
            once: true,
        }
    }
}

/// Where a page gets its data from
pub struct PageSources<'a> {
    pub notifications: &'a dyn ItemSource<NotificationItem>,
    pub messages: &'a dyn ItemSource<MessageItem>,
    pub courses: &'a dyn ItemSource<Course>,
    pub community: &'a dyn CommunitySource,
    /// Whether the charting library is served to the browser
    pub charts_available: bool,
}

/// Courses of the demo catalog
#[derive(Debug, Default, Clone, Copy)]
pub struct DemoCourses;

impl ItemSource<Course> for DemoCourses {
    fn fetch_initial_items(&self) -> Vec<Course> {
        crate::catalog::demo_courses()
    }
}

impl PageSources<'static> {
    pub fn demo(charts_available: bool) -> Self {
        Self {
            notifications: &DemoNotifications,
            messages: &DemoMessages,
            courses: &DemoCourses,
            community: &DemoCommunity,
            charts_available,
        }
    }
}

/// Everything the browser can do on a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PageAction {
    Toggle { menu: Menu },
    ClickOutside,
    Escape,
    Inbox { inbox: InboxKind, action: InboxAction },
    Compose { action: ComposeAction },
    DismissToast { id: ToastId },
    AddToCart { title: String },
    SortCourses { order: String },
    LoadMoreCourses,
    SwitchPeriod { period: String },
    Dashboard { action: DashboardAction },
    Community { action: CommunityAction },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartView {
    pub canvas: &'static str,
    pub title: &'static str,
    #[serde(flatten)]
    pub mount: ChartMount,
}

/// What the browser renders after every action
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSnapshot {
    pub page: PageKind,
    pub notifications: Option<InboxView>,
    pub messages: Option<InboxView>,
    pub user_menu_open: bool,
    pub compose_open: bool,
    pub toasts: Vec<Toast>,
    pub charts: Vec<ChartView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<DashboardRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub courses_html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub community: Option<CommunityView>,
}

pub struct PageSession {
    kind: PageKind,
    notifications: Option<NotificationInbox>,
    messages: Option<MessageInbox>,
    user_menu_open: bool,
    compose: Option<ComposeForm>,
    catalog: Option<Catalog>,
    community: Option<CommunityBoard>,
    charts: Vec<ChartView>,
    charts_available: bool,
    period: Period,
    range: DashboardRange,
    toasts: ToastBoard,
}

impl PageSession {
    /// Create the controllers a page needs and wire them to one toast board
    ///
    /// # Arguments
    /// * `kind` - The page being loaded
    /// * `sources` - Seed data and collaborator availability
    /// * `toasts` - Board every controller on the page reports to
    ///
    /// # Returns
    /// * `Result<PageSession>` - The fresh session
    ///
    /// # Errors
    /// * Returns an error if a list template does not compile
    pub fn build(kind: PageKind, sources: &PageSources<'_>, toasts: ToastBoard) -> Result<Self> {
        let sink: Arc<dyn ToastSink> = Arc::new(toasts.clone());

        // Every page shell carries both header icons
        let notifications = NotificationInbox::initialize(
            InboxConfig::notifications(),
            sources.notifications,
            true,
            Arc::clone(&sink),
        )?;
        let messages = MessageInbox::initialize(
            InboxConfig::messages(),
            sources.messages,
            true,
            Arc::clone(&sink),
        )?;
        let compose = messages.as_ref().map(|_| ComposeForm::new());

        let catalog = match kind {
            PageKind::Catalog => Some(Catalog::new(sources.courses.fetch_initial_items())?),
            _ => None,
        };
        let community = match kind {
            PageKind::Community => Some(CommunityBoard::new(sources.community.fetch_community())?),
            _ => None,
        };

        let period = Period::default();
        let range = DashboardRange::default();
        let slots = match kind {
            PageKind::Dashboard => charts::dashboard_charts(range),
            PageKind::Analytics => charts::analytics_charts(period, &mut rand::thread_rng()),
            PageKind::Catalog | PageKind::Community => Vec::new(),
        };
        let charts = slots
            .into_iter()
            .map(|slot| mount(slot, sources.charts_available))
            .collect();

        debug!("built {:?} page session", kind);
        Ok(Self {
            kind,
            notifications,
            messages,
            user_menu_open: false,
            compose,
            catalog,
            community,
            charts,
            charts_available: sources.charts_available,
            period,
            range,
            toasts,
        })
    }

    pub fn kind(&self) -> PageKind {
        self.kind
    }

    pub fn toasts(&self) -> &ToastBoard {
        &self.toasts
    }

    pub fn notifications(&self) -> Option<&NotificationInbox> {
        self.notifications.as_ref()
    }

    pub fn messages(&self) -> Option<&MessageInbox> {
        self.messages.as_ref()
    }

    pub fn is_open(&self, menu: Menu) -> bool {
        match menu {
            Menu::Notifications => self.notifications.as_ref().is_some_and(|i| i.is_open()),
            Menu::Messages => self.messages.as_ref().is_some_and(|i| i.is_open()),
            Menu::User => self.user_menu_open,
        }
    }

    pub fn compose_open(&self) -> bool {
        self.compose.as_ref().is_some_and(ComposeForm::is_open)
    }

    pub fn community(&self) -> Option<&CommunityBoard> {
        self.community.as_ref()
    }

    /// Apply one browser action
    pub fn dispatch(&mut self, action: PageAction) {
        debug!("{:?} page: {:?}", self.kind, action);
        match action {
            PageAction::Toggle { menu } => self.toggle(menu),
            PageAction::ClickOutside => self.close_dropdowns(None),
            PageAction::Escape => {
                self.close_dropdowns(None);
                if let Some(compose) = self.compose.as_mut() {
                    compose.close();
                }
                if let Some(community) = self.community.as_mut() {
                    community.close();
                }
            }
            PageAction::Inbox { inbox, action } => self.apply_inbox(inbox, action),
            PageAction::Compose { action } => match self.compose.as_mut() {
                Some(compose) => {
                    compose.apply(&action, &self.toasts);
                }
                None => debug!("no compose form on this page"),
            },
            PageAction::DismissToast { id } => {
                self.toasts.dismiss(id);
            }
            PageAction::AddToCart { title } => match &self.catalog {
                Some(catalog) => catalog.add_to_cart(&title, &self.toasts),
                None => debug!("add-to-cart outside the catalog"),
            },
            PageAction::SortCourses { order } => {
                if let Some(catalog) = self.catalog.as_mut() {
                    catalog.sort_by_key(&order);
                }
            }
            PageAction::LoadMoreCourses => match &self.catalog {
                Some(catalog) => catalog.load_more(&self.toasts),
                None => debug!("load-more outside the catalog"),
            },
            PageAction::SwitchPeriod { period } => self.switch_period(&period),
            PageAction::Dashboard { action } => self.apply_dashboard(action),
            PageAction::Community { action } => match self.community.as_mut() {
                Some(community) => community.apply(action, &self.toasts),
                None => debug!("community action outside the community page"),
            },
        }
    }

    fn toggle(&mut self, menu: Menu) {
        let opened = match menu {
            Menu::Notifications => self
                .notifications
                .as_mut()
                .is_some_and(|inbox| inbox.toggle_open()),
            Menu::Messages => self
                .messages
                .as_mut()
                .is_some_and(|inbox| inbox.toggle_open()),
            Menu::User => {
                self.user_menu_open = !self.user_menu_open;
                self.user_menu_open
            }
        };
        if opened {
            self.close_dropdowns(Some(menu));
        }
    }

    /// Close every header dropdown except `keep`
    fn close_dropdowns(&mut self, keep: Option<Menu>) {
        if keep != Some(Menu::Notifications) {
            if let Some(inbox) = self.notifications.as_mut() {
                inbox.close();
            }
        }
        if keep != Some(Menu::Messages) {
            if let Some(inbox) = self.messages.as_mut() {
                inbox.close();
            }
        }
        if keep != Some(Menu::User) {
            self.user_menu_open = false;
        }
    }

    fn apply_inbox(&mut self, kind: InboxKind, action: InboxAction) {
        if action == InboxAction::Toggle {
            self.toggle(kind.into());
            return;
        }
        let effect = match kind {
            InboxKind::Notifications => self.notifications.as_mut().map(|i| i.apply(action)),
            InboxKind::Messages => self.messages.as_mut().map(|i| i.apply(action)),
        };
        match effect {
            Some(InboxEffect::OpenCompose) => {
                if let Some(compose) = self.compose.as_mut() {
                    compose.open();
                }
            }
            Some(InboxEffect::Opened) => self.close_dropdowns(Some(kind.into())),
            Some(InboxEffect::None | InboxEffect::Closed) => {}
            None => debug!("no {:?} inbox on this page", kind),
        }
    }

    fn switch_period(&mut self, raw: &str) {
        if self.kind != PageKind::Analytics {
            debug!("period switch outside analytics");
            return;
        }
        let period = match Period::from_str(raw) {
            Ok(period) => period,
            Err(e) => {
                debug!("{}", e);
                return;
            }
        };
        self.period = period;
        let config = charts::daily_activity(period, &mut rand::thread_rng());
        if let Some(view) = self
            .charts
            .iter_mut()
            .find(|view| view.canvas == "dailyActivityChart")
        {
            view.mount = ChartMount::decide(true, self.charts_available, Some(config));
        }
        self.toasts
            .show(format!("Switched to {} view", period), ToastKind::Info);
    }

    fn apply_dashboard(&mut self, action: DashboardAction) {
        if self.kind != PageKind::Dashboard {
            debug!("dashboard action outside the dashboard");
            return;
        }
        if let DashboardAction::SwitchRange { range } = action {
            self.range = range;
            self.charts = charts::dashboard_charts(range)
                .into_iter()
                .map(|slot| mount(slot, self.charts_available))
                .collect();
        }
        dashboard::announce(&action, &self.toasts);
    }

    /// Current state for the browser
    ///
    /// # Errors
    /// * Returns an error if a list fails to render
    pub fn snapshot(&self) -> Result<PageSnapshot> {
        Ok(PageSnapshot {
            page: self.kind,
            notifications: self.notifications.as_ref().map(|i| i.view()).transpose()?,
            messages: self.messages.as_ref().map(|i| i.view()).transpose()?,
            user_menu_open: self.user_menu_open,
            compose_open: self.compose_open(),
            toasts: self.toasts.toasts(),
            charts: self.charts.clone(),
            period: (self.kind == PageKind::Analytics).then_some(self.period),
            range: (self.kind == PageKind::Dashboard).then_some(self.range),
            courses_html: self.catalog.as_ref().map(Catalog::render).transpose()?,
            community: self.community.as_ref().map(CommunityBoard::view).transpose()?,
        })
    }
}

fn mount(slot: ChartSlot, charts_available: bool) -> ChartView {
    ChartView {
        canvas: slot.canvas,
        title: slot.title,
        mount: ChartMount::decide(true, charts_available, slot.config),
    }
}
