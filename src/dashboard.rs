//! The live dashboard hub.
//!
//! One task owns both store subscriptions and the unsaved schedule draft.
//! Every incoming value replaces the cached one wholesale and the combined
//! [`Snapshot`] is republished; derived views are computed by readers.

use crate::logs::parse_logs;
use crate::ports::store::{DocumentStore, FeedEvent, FeedSubscription, StoreQuery};
use crate::schedule::{EditError, ScheduleEdit, normalize};
use crate::types::logs::MedicationLog;
use crate::types::schedule::WeekSchedule;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};

pub const SCHEDULE_PATH: &str = "schedules";
pub const LOGS_PATH: &str = "medication_logs";
pub const LOG_ORDER_FIELD: &str = "timestamp_millis";

const DEFAULT_SET_NOTICE: &str = "Default medication schedule has been set.";
const RESET_NOTICE: &str = "Schedule data was incompatible and has been reset to default.";
const SAVED_NOTICE: &str = "Schedule saved.";

const COMMAND_BUFFER: usize = 16;

/// State of one subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum Feed<T> {
    Loading,
    Ready(T),
    Failed(String),
}

impl<T> Feed<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Feed::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Feed::Failed(message) => Some(message),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Feed::Loading)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub schedule: Feed<WeekSchedule>,
    pub logs: Feed<Vec<MedicationLog>>,
    /// Edits not yet saved. Replaced by every schedule that arrives from the
    /// store, like the rest of the cache.
    pub draft: Option<WeekSchedule>,
    pub notice: Option<String>,
}

impl Snapshot {
    fn loading() -> Self {
        Self {
            schedule: Feed::Loading,
            logs: Feed::Loading,
            draft: None,
            notice: None,
        }
    }

    /// The stored schedule, which is what derived views are computed from.
    pub fn schedule(&self) -> Option<&WeekSchedule> {
        self.schedule.ready()
    }

    pub fn logs(&self) -> &[MedicationLog] {
        self.logs.ready().map(Vec::as_slice).unwrap_or_default()
    }

    /// What the editor shows: the draft when there is one.
    pub fn editable(&self) -> Option<&WeekSchedule> {
        self.draft.as_ref().or(self.schedule.ready())
    }

    pub fn has_unsaved_changes(&self) -> bool {
        match (&self.draft, self.schedule.ready()) {
            (Some(draft), Some(stored)) => draft != stored,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DashboardError {
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error("the schedule has not loaded yet")]
    NotLoaded,
    #[error("failed to save the schedule: {0}")]
    Save(String),
    #[error("the dashboard is no longer running")]
    Stopped,
}

type Reply = oneshot::Sender<Result<(), DashboardError>>;

enum Command {
    Edit(ScheduleEdit, Reply),
    Save(Reply),
    Discard(Reply),
}

/// Cheap to clone; the hub stops once every handle is dropped.
#[derive(Debug, Clone)]
pub struct DashboardHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<Snapshot>,
}

impl DashboardHandle {
    /// Subscribes to the schedule and the logs and starts the hub task.
    pub fn spawn<S: DocumentStore>(store: S) -> Self {
        let (commands, receiver) = mpsc::channel(COMMAND_BUFFER);
        let (publisher, state) = watch::channel(Snapshot::loading());
        let hub = Hub {
            schedule_feed: Some(store.subscribe(StoreQuery::path(SCHEDULE_PATH))),
            logs_feed: Some(
                store.subscribe(StoreQuery::path(LOGS_PATH).ordered_by(LOG_ORDER_FIELD)),
            ),
            store,
            publisher,
            defaulted: false,
        };
        tokio::spawn(hub.run(receiver));
        Self { commands, state }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<Snapshot> {
        self.state.clone()
    }

    pub async fn edit(&self, edit: ScheduleEdit) -> Result<(), DashboardError> {
        self.request(|reply| Command::Edit(edit, reply)).await
    }

    /// Writes the draft (or the current schedule) back to the store.
    pub async fn save(&self) -> Result<(), DashboardError> {
        self.request(Command::Save).await
    }

    pub async fn discard(&self) -> Result<(), DashboardError> {
        self.request(Command::Discard).await
    }

    async fn request(&self, command: impl FnOnce(Reply) -> Command) -> Result<(), DashboardError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| DashboardError::Stopped)?;
        response.await.map_err(|_| DashboardError::Stopped)?
    }
}

struct Hub<S> {
    store: S,
    schedule_feed: Option<FeedSubscription>,
    logs_feed: Option<FeedSubscription>,
    publisher: watch::Sender<Snapshot>,
    /// The default schedule is written back at most once.
    defaulted: bool,
}

impl<S: DocumentStore> Hub<S> {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        loop {
            tokio::select! {
                event = next_event(&mut self.schedule_feed) => match event {
                    Some(event) => self.on_schedule(event).await,
                    None => {
                        self.schedule_feed = None;
                        self.feed_ended(|snapshot| &mut snapshot.schedule);
                    }
                },
                event = next_event(&mut self.logs_feed) => match event {
                    Some(event) => self.on_logs(event),
                    None => {
                        self.logs_feed = None;
                        self.feed_ended(|snapshot| &mut snapshot.logs);
                    }
                },
                command = commands.recv() => match command {
                    Some(command) => self.on_command(command).await,
                    None => break,
                },
            }
        }
        tracing::debug!("dashboard hub stopped");
    }

    async fn on_schedule(&mut self, event: FeedEvent) {
        let raw = match event {
            FeedEvent::Snapshot(raw) => raw,
            FeedEvent::Failed(message) => {
                tracing::warn!(%message, "schedule subscription failed");
                self.publisher
                    .send_modify(|snapshot| snapshot.schedule = Feed::Failed(message));
                return;
            }
        };

        if let Some(week) = normalize(raw.as_ref()) {
            self.publisher.send_modify(|snapshot| {
                snapshot.schedule = Feed::Ready(week);
                snapshot.draft = None;
            });
            return;
        }

        let notice = match raw {
            None | Some(Value::Null) => DEFAULT_SET_NOTICE,
            Some(_) => RESET_NOTICE,
        };
        if self.defaulted {
            tracing::warn!("stored schedule is still unusable after writing the default");
            self.publisher.send_modify(|snapshot| {
                snapshot.schedule = Feed::Ready(WeekSchedule::default_schedule());
                snapshot.draft = None;
            });
            return;
        }
        self.defaulted = true;

        let week = WeekSchedule::default_schedule();
        match self.store.write(SCHEDULE_PATH, &week.to_value()).await {
            Ok(()) => {
                tracing::info!(notice, "wrote default schedule");
                self.publisher.send_modify(|snapshot| {
                    snapshot.schedule = Feed::Ready(week);
                    snapshot.draft = None;
                    snapshot.notice = Some(notice.to_string());
                });
            }
            Err(err) => {
                tracing::error!(%err, "failed to write default schedule");
                self.publisher.send_modify(|snapshot| {
                    snapshot.schedule =
                        Feed::Failed(format!("failed to write the default schedule: {err}"));
                });
            }
        }
    }

    fn on_logs(&mut self, event: FeedEvent) {
        let logs = match event {
            FeedEvent::Snapshot(raw) => Feed::Ready(parse_logs(raw.as_ref())),
            FeedEvent::Failed(message) => {
                tracing::warn!(%message, "medication log subscription failed");
                Feed::Failed(message)
            }
        };
        self.publisher.send_modify(|snapshot| snapshot.logs = logs);
    }

    fn feed_ended<T>(&mut self, feed: impl FnOnce(&mut Snapshot) -> &mut Feed<T>) {
        self.publisher.send_if_modified(|snapshot| {
            let feed = feed(snapshot);
            if feed.error().is_some() {
                return false;
            }
            *feed = Feed::Failed("subscription ended".to_string());
            true
        });
    }

    async fn on_command(&mut self, command: Command) {
        match command {
            Command::Edit(edit, reply) => {
                let _ = reply.send(self.edit(&edit));
            }
            Command::Save(reply) => {
                let _ = reply.send(self.save().await);
            }
            Command::Discard(reply) => {
                self.publisher.send_modify(|snapshot| {
                    snapshot.draft = None;
                    snapshot.notice = None;
                });
                let _ = reply.send(Ok(()));
            }
        }
    }

    fn edit(&mut self, edit: &ScheduleEdit) -> Result<(), DashboardError> {
        let mut draft = self
            .publisher
            .borrow()
            .editable()
            .cloned()
            .ok_or(DashboardError::NotLoaded)?;
        draft.apply(edit)?;
        self.publisher.send_modify(|snapshot| {
            snapshot.draft = Some(draft);
            snapshot.notice = None;
        });
        Ok(())
    }

    async fn save(&mut self) -> Result<(), DashboardError> {
        let week = self
            .publisher
            .borrow()
            .editable()
            .cloned()
            .ok_or(DashboardError::NotLoaded)?;
        if let Err(err) = self.store.write(SCHEDULE_PATH, &week.to_value()).await {
            tracing::error!(%err, "failed to save schedule");
            return Err(DashboardError::Save(err.to_string()));
        }
        tracing::info!("schedule saved");
        self.publisher.send_modify(|snapshot| {
            snapshot.schedule = Feed::Ready(week);
            snapshot.draft = None;
            snapshot.notice = Some(SAVED_NOTICE.to_string());
        });
        Ok(())
    }
}

async fn next_event(feed: &mut Option<FeedSubscription>) -> Option<FeedEvent> {
    match feed {
        Some(feed) => feed.next().await,
        None => std::future::pending().await,
    }
}
