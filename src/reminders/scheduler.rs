use crate::dashboard::Snapshot;
use crate::ports;
use crate::types::push::{PushMessage, SubscriptionRegistry};
use crate::types::views::NextDose;
use crate::views::next_dose;

use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use time::{OffsetDateTime, UtcOffset};
use tokio::sync::watch;
use tokio::task::JoinHandle;

const REMINDER_TITLE: &str = "Medication reminder";

/// The reminder the scheduler is currently waiting on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedReminder {
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
    pub slot_name: String,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub planned_at: OffsetDateTime,
}

pub struct ReminderHandle {
    planned: Arc<Mutex<Option<PlannedReminder>>>,
    sent: Arc<Mutex<u64>>,
    handle: JoinHandle<()>,
}

impl ReminderHandle {
    pub fn planned(&self) -> Option<PlannedReminder> {
        self.planned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn sent(&self) -> u64 {
        *self.sent.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ReminderHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ReminderScheduler<T, S> {
    time: T,
    sender: S,
    offset: UtcOffset,
    subscriptions: Arc<SubscriptionRegistry>,
}

impl<T, S> ReminderScheduler<T, S>
where
    T: ports::TimeProvider,
    S: ports::PushSender,
{
    pub(crate) fn new(
        time: T,
        sender: S,
        offset: UtcOffset,
        subscriptions: Arc<SubscriptionRegistry>,
    ) -> Self {
        Self {
            time,
            sender,
            offset,
            subscriptions,
        }
    }

    /// Follows the schedule for as long as snapshots keep coming.
    pub(crate) fn spawn(self, snapshots: watch::Receiver<Snapshot>) -> ReminderHandle {
        let planned = Arc::new(Mutex::new(None));
        let sent = Arc::new(Mutex::new(0));
        let run = Run {
            scheduler: self,
            planned: Arc::clone(&planned),
            sent: Arc::clone(&sent),
        };
        let handle = tokio::spawn(run.run(snapshots));
        ReminderHandle {
            planned,
            sent,
            handle,
        }
    }
}

struct Run<T, S> {
    scheduler: ReminderScheduler<T, S>,
    planned: Arc<Mutex<Option<PlannedReminder>>>,
    sent: Arc<Mutex<u64>>,
}

impl<T, S> Run<T, S>
where
    T: ports::TimeProvider,
    S: ports::PushSender,
{
    async fn run(self, mut snapshots: watch::Receiver<Snapshot>) {
        let time = &self.scheduler.time;
        let mut last_fired: Option<OffsetDateTime> = None;
        loop {
            let now = time.now_in(self.scheduler.offset);
            let after = last_fired.map_or(now, |fired| fired.max(now));
            let next = next_dose(snapshots.borrow_and_update().schedule(), after);
            self.record(next.as_ref(), now);

            let Some(dose) = next else {
                if snapshots.changed().await.is_err() {
                    break;
                }
                continue;
            };
            let delay = compute_delay(time, dose.at);
            tokio::select! {
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                () = wait(time, delay) => {
                    self.deliver(&dose).await;
                    last_fired = Some(dose.at);
                }
            }
        }
        tracing::debug!("reminder scheduler stopped");
    }

    fn record(&self, next: Option<&NextDose>, now: OffsetDateTime) {
        let planned = next.map(|dose| PlannedReminder {
            at: dose.at,
            slot_name: dose.slot_name.clone(),
            message: reminder_body(dose),
            planned_at: now,
        });
        *self.planned.lock().unwrap_or_else(PoisonError::into_inner) = planned;
    }

    async fn deliver(&self, dose: &NextDose) {
        let message = PushMessage::new(REMINDER_TITLE, reminder_body(dose));
        let subscriptions = &self.scheduler.subscriptions.subscriptions;
        if subscriptions.is_empty() {
            tracing::info!(slot = %dose.slot_name, "dose due but no browser is subscribed");
        }
        for subscription in subscriptions {
            match self.scheduler.sender.send(subscription, &message).await {
                Ok(()) => {
                    *self.sent.lock().unwrap_or_else(PoisonError::into_inner) += 1;
                }
                Err(err) => {
                    tracing::warn!(%err, endpoint = %subscription.endpoint, "reminder delivery failed");
                }
            }
        }
    }
}

pub(crate) fn reminder_body(dose: &NextDose) -> String {
    format!("Time for your {} ({})", dose.slot_name, dose.time)
}

async fn wait<T: ports::TimeProvider>(time: &T, delay: Option<Duration>) {
    if let Some(delay) = delay {
        time.sleep(delay).await;
    }
}

fn compute_delay<T: ports::TimeProvider>(time: &T, at: OffsetDateTime) -> Option<Duration> {
    let delay = at - time.now();
    if delay.is_positive() {
        Some(delay.try_into().unwrap_or(Duration::MAX))
    } else {
        None
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::dashboard::Feed;
    use crate::types::push::Subscription;
    use crate::types::schedule::{DaySchedule, DoseSlot, WeekSchedule};

    use std::future::Future;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use time::macros::datetime;
    use tokio::sync::oneshot;

    #[derive(Clone)]
    struct TestTime {
        now: Arc<Mutex<OffsetDateTime>>,
        sleeps: Arc<Mutex<Vec<oneshot::Sender<()>>>>,
        durations: Arc<Mutex<Vec<Duration>>>,
    }

    impl TestTime {
        fn new(now: OffsetDateTime) -> Self {
            Self {
                now: Arc::new(Mutex::new(now)),
                sleeps: Arc::new(Mutex::new(Vec::new())),
                durations: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn sleep_durations(&self) -> Vec<Duration> {
            self.durations.lock().expect("durations lock").clone()
        }

        fn advance_to(&self, now: OffsetDateTime) {
            *self.now.lock().expect("now lock") = now;
            let mut sleeps = self.sleeps.lock().expect("sleeps lock");
            for sender in sleeps.drain(..) {
                let _ = sender.send(());
            }
        }
    }

    struct ManualSleep {
        receiver: oneshot::Receiver<()>,
    }

    impl Future for ManualSleep {
        type Output = ();

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
            match Pin::new(&mut self.receiver).poll(cx) {
                Poll::Ready(_) => Poll::Ready(()),
                Poll::Pending => Poll::Pending,
            }
        }
    }

    impl ports::TimeProvider for TestTime {
        type Sleep<'a>
            = ManualSleep
        where
            Self: 'a;

        fn now(&self) -> OffsetDateTime {
            *self.now.lock().expect("now lock")
        }

        fn sleep<'a>(&'a self, duration: Duration) -> Self::Sleep<'a> {
            let (sender, receiver) = oneshot::channel();
            self.durations
                .lock()
                .expect("durations lock")
                .push(duration);
            self.sleeps.lock().expect("sleeps lock").push(sender);
            ManualSleep { receiver }
        }
    }

    #[derive(Debug)]
    struct TestSendError;

    impl std::fmt::Display for TestSendError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("test send error")
        }
    }

    #[derive(Clone, Default)]
    struct TestSender {
        sent: Arc<Mutex<Vec<(String, PushMessage)>>>,
    }

    impl ports::PushSender for TestSender {
        type Error = TestSendError;
        type Fut<'a>
            = std::future::Ready<Result<(), Self::Error>>
        where
            Self: 'a;

        fn send<'a>(
            &'a self,
            subscription: &'a Subscription,
            message: &'a PushMessage,
        ) -> Self::Fut<'a> {
            self.sent
                .lock()
                .expect("sent lock")
                .push((subscription.endpoint.clone(), message.clone()));
            std::future::ready(Ok(()))
        }
    }

    fn registry() -> Arc<SubscriptionRegistry> {
        Arc::new(SubscriptionRegistry {
            subscriptions: vec![Subscription {
                endpoint: "https://push.example/123".to_string(),
                p256dh: "p256".to_string(),
                auth: "auth".to_string(),
            }],
        })
    }

    fn snapshot_with(week: Option<WeekSchedule>) -> Snapshot {
        Snapshot {
            schedule: week.map_or(Feed::Loading, Feed::Ready),
            logs: Feed::Ready(Vec::new()),
            draft: None,
            notice: None,
        }
    }

    fn evening_only() -> WeekSchedule {
        let slot = |time: &str, enabled| DoseSlot {
            time: time.parse().expect("parse time"),
            enabled,
        };
        let day = DaySchedule::from_slots(vec![
            slot("08:00", false),
            slot("12:00", false),
            slot("19:00", true),
            slot("22:00", false),
        ]);
        WeekSchedule::from_days([day; 7])
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn compute_delay__should_return_none_for_past_and_now() {
        let now = datetime!(2025-01-12 09:30 UTC);
        let time = TestTime::new(now);

        assert!(compute_delay(&time, now - time::Duration::seconds(5)).is_none());
        assert!(compute_delay(&time, now).is_none());
    }

    #[test]
    fn compute_delay__should_return_duration_for_future() {
        let now = datetime!(2025-01-12 09:30 UTC);
        let time = TestTime::new(now);

        let delay = compute_delay(&time, now + time::Duration::milliseconds(1500)).expect("delay");
        assert_eq!(delay, Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn scheduler__should_wait_for_the_next_dose_and_send() {
        // Given
        let now = datetime!(2025-01-15 14:00 UTC);
        let time = TestTime::new(now);
        let sender = TestSender::default();
        let (_publisher, snapshots) = watch::channel(snapshot_with(Some(evening_only())));
        let scheduler = ReminderScheduler::new(time.clone(), sender.clone(), UtcOffset::UTC, registry());

        // When
        let handle = scheduler.spawn(snapshots);
        settle().await;

        // Then
        assert_eq!(sender.sent.lock().expect("sent lock").len(), 0);
        assert_eq!(time.sleep_durations(), vec![Duration::from_secs(5 * 3600)]);
        let planned = handle.planned().expect("planned reminder");
        assert_eq!(planned.at, datetime!(2025-01-15 19:00 UTC));
        assert_eq!(planned.message, "Time for your Evening/Night Dose (19:00)");

        // When
        time.advance_to(datetime!(2025-01-15 19:00 UTC));
        settle().await;

        // Then
        let sent = sender.sent.lock().expect("sent lock").clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "https://push.example/123");
        assert_eq!(sent[0].1.title, REMINDER_TITLE);
        assert_eq!(sent[0].1.body, "Time for your Evening/Night Dose (19:00)");
        assert_eq!(handle.sent(), 1);
        assert_eq!(
            handle.planned().map(|planned| planned.at),
            Some(datetime!(2025-01-16 19:00 UTC))
        );
    }

    #[tokio::test]
    async fn scheduler__should_replan_when_the_schedule_changes() {
        // Given
        let time = TestTime::new(datetime!(2025-01-15 14:00 UTC));
        let sender = TestSender::default();
        let (publisher, snapshots) = watch::channel(snapshot_with(None));
        let scheduler = ReminderScheduler::new(time.clone(), sender.clone(), UtcOffset::UTC, registry());
        let handle = scheduler.spawn(snapshots);
        settle().await;
        assert_eq!(handle.planned(), None);

        // When
        publisher.send_replace(snapshot_with(Some(evening_only())));
        settle().await;

        // Then
        assert_eq!(
            handle.planned().map(|planned| planned.at),
            Some(datetime!(2025-01-15 19:00 UTC))
        );
        assert!(time.sleep_durations().len() == 1);
        assert!(sender.sent.lock().expect("sent lock").is_empty());
    }

    #[tokio::test]
    async fn scheduler__should_stop_when_the_dashboard_goes_away() {
        // Given
        let time = TestTime::new(datetime!(2025-01-15 14:00 UTC));
        let (publisher, snapshots) = watch::channel(snapshot_with(Some(evening_only())));
        let scheduler =
            ReminderScheduler::new(time, TestSender::default(), UtcOffset::UTC, registry());
        let handle = scheduler.spawn(snapshots);
        settle().await;

        // When
        drop(publisher);
        settle().await;

        // Then
        assert!(handle.is_finished());
    }
}
