use std::time::Duration;

use time::{OffsetDateTime, UtcOffset};

/// Wall clock and sleeping, swapped out in tests.
pub trait TimeProvider: Clone + Send + Sync + 'static {
    type Sleep<'a>: Future<Output = ()> + Send + 'a
    where
        Self: 'a;

    fn now(&self) -> OffsetDateTime;
    fn sleep<'a>(&'a self, duration: Duration) -> Self::Sleep<'a>;

    /// "Now" expressed in the offset calendar days are counted in.
    fn now_in(&self, offset: UtcOffset) -> OffsetDateTime {
        self.now().to_offset(offset)
    }
}
