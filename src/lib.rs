/*!
# LearnHub

The LearnHub academy site: a small online learning platform for beekeepers,
served by a Rust web backend.

## Overview

Every page shares a header with two inboxes (notifications and messages), a
user menu and a toast area. Dashboard, analytics and community pages are only
shown to signed-in visitors; the course catalog is public. Sign-in and
registration talk to a simulated account backend that waits a little and
sometimes fails, so the error paths stay visible.

## Architecture

### Frontend Layer
- **Technologies**: HTML, CSS, JavaScript, Chart.js, AOS
- **Key Components**:
  - Page shell - Header, dropdowns, compose modal and toast area
  - Action client - Sends typed actions and renders the returned snapshot
  - Auth forms - Field errors, password strength and toasts

### Backend Layer
- **Technologies**: Rust, axum, handlebars
- **Core Components**:
  - Inbox - One generic controller for notifications and messages
  - Toast Board - Transient messages with entrance and auto-dismiss timers
  - Compose Form - The new-message modal of the messages inbox
  - Auth Gate - `userData` check before any private page renders
  - Charts - Chart.js configurations and the fallback when they cannot mount
  - Catalog - Course grid sorting, add-to-cart and load-more feedback
  - Dashboard - Card buttons and the week/month/year chart filter
  - Community Board - Discussions, study groups, mentors, events, support modals and live chat
  - Page Session - Composition root holding one page's controllers

### Data Persistence Layer
- One `userData` entry with the JSON user record
- Kept in the visitor's cookies, or in a shared JSON file

## Modules

- **error**: Infrastructure failures (`AcademyError`)
- **items**: Inbox item types and their seed sources
- **toast**: Toast board and sinks
- **inbox**: Generic inbox controller
- **compose**: Compose-message form
- **storage**: Key-value stores for the user record
- **login**: Auth gate, forms, password strength and auth handlers
- **charts**: Chart configurations and mounting decisions
- **catalog**: Course grid
- **dashboard**: Dashboard cards and their buttons
- **community**: Community page and its modals
- **page**: Page sessions and typed page actions
- **config**: Server settings (`web` feature)
- **app**: Routing and middleware (`web` feature)

## REST API Endpoints

- `POST /api/action` - Applies a page action, returns the page snapshot
- `GET /api/snapshot` - Current page snapshot
- `GET /api/password-strength?password=` - Live password rating
- `GET /api/charts/daily-activity?period=` - Daily activity series
- `POST /api/social-login` - Social sign-in placeholder
*/

pub mod catalog;
pub mod charts;
pub mod community;
pub mod compose;
pub mod dashboard;
pub mod error;
pub mod inbox;
pub mod items;
pub mod login;
pub mod page;
pub mod storage;
pub mod toast;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod config;

pub use error::{AcademyError, Result};
pub use inbox::{Inbox, InboxAction, InboxKind, InboxView, MessageInbox, NotificationInbox};
pub use items::{InboxItem, ItemSource, MessageItem, NotificationItem};
pub use page::{PageAction, PageKind, PageSession, PageSnapshot, PageSources};
pub use storage::{JsonFileStore, KvStore, MemoryStore};
pub use toast::{Toast, ToastBoard, ToastKind, ToastPolicy, ToastSink};
