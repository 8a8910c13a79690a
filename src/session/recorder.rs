use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::{
    storage::{entities::RecordedActivity, DataStore},
    tree::CategoryPath,
    utils::{clock::Clock, time::whole_minutes_between},
};

/// Moment of the last successful record. Only [ActivityRecorder] moves it forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watermark(DateTime<Utc>);

impl Watermark {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(at)
    }

    pub fn at(&self) -> DateTime<Utc> {
        self.0
    }

    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        now - self.0
    }

    fn advance(&mut self, now: DateTime<Utc>) {
        self.0 = now;
    }
}

/// Blank duration answers default to the time since the watermark, as long as that time stays
/// under `ceiling`.
pub struct ElapsedDefault<'a> {
    pub watermark: &'a Watermark,
    pub clock: &'a dyn Clock,
    pub ceiling: Duration,
}

impl ElapsedDefault<'_> {
    /// Returns the default in minutes, or the elapsed minutes as an error when they exceed the
    /// ceiling.
    pub fn resolve(&self) -> Result<i64, i64> {
        let now = self.clock.time();
        let minutes = whole_minutes_between(self.watermark.at(), now);
        if self.watermark.elapsed(now) > self.ceiling {
            Err(minutes)
        } else {
            Ok(minutes)
        }
    }
}

pub struct ActivityRecorder<'a> {
    store: &'a dyn DataStore,
    clock: &'a dyn Clock,
}

impl<'a> ActivityRecorder<'a> {
    pub fn new(store: &'a dyn DataStore, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    /// Appends a record for `path` and moves the watermark to the record's moment. A failed
    /// append leaves the watermark where it was.
    pub async fn record(
        &self,
        watermark: &mut Watermark,
        path: &CategoryPath,
        minutes: i64,
    ) -> Result<RecordedActivity> {
        let now = self.clock.time();
        let record = RecordedActivity::new(path, minutes, now);

        self.store
            .append(&record)
            .await
            .with_context(|| format!("Couldn't record {path} for {minutes} minutes"))?;
        watermark.advance(now);

        info!("Recorded {} for {} minutes", record.activity, record.minutes);
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{anyhow, Result};
    use chrono::{Duration, TimeZone, Utc};

    use crate::{
        storage::MockDataStore,
        tree::CategoryPath,
        utils::clock::{Clock, ManualClock},
    };

    use super::{ActivityRecorder, ElapsedDefault, Watermark};

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2018, 7, 4, 9, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn test_record_advances_watermark() -> Result<()> {
        let clock = clock();
        let mut store = MockDataStore::new();
        store
            .expect_append()
            .withf(|record| record.activity == "Books.Reading" && record.minutes == 25)
            .times(1)
            .returning(|_| Ok(()));

        let mut watermark = Watermark::new(clock.time() - Duration::minutes(30));
        let path = ["Books", "Reading"].into_iter().collect::<CategoryPath>();
        let record = ActivityRecorder::new(&store, &clock)
            .record(&mut watermark, &path, 25)
            .await?;

        assert_eq!(record.timestamp, clock.time());
        assert_eq!(watermark.at(), clock.time());
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_append_keeps_watermark() {
        let clock = clock();
        let mut store = MockDataStore::new();
        store
            .expect_append()
            .times(1)
            .returning(|_| Err(anyhow!("disk full")));

        let before = Watermark::new(clock.time() - Duration::minutes(30));
        let mut watermark = before;
        let path = ["Exercise"].into_iter().collect::<CategoryPath>();
        let result = ActivityRecorder::new(&store, &clock)
            .record(&mut watermark, &path, 10)
            .await;

        assert!(result.is_err());
        assert_eq!(watermark, before);
    }

    #[test]
    fn test_elapsed_default_ceiling() {
        let clock = clock();
        let ceiling = Duration::minutes(60);

        let recent = Watermark::new(clock.time() - Duration::minutes(59));
        let elapsed = ElapsedDefault {
            watermark: &recent,
            clock: &clock,
            ceiling,
        };
        assert_eq!(elapsed.resolve(), Ok(59));

        let old = Watermark::new(clock.time() - Duration::minutes(61));
        let elapsed = ElapsedDefault {
            watermark: &old,
            clock: &clock,
            ceiling,
        };
        assert_eq!(elapsed.resolve(), Err(61));

        let exact = Watermark::new(clock.time() - ceiling);
        let elapsed = ElapsedDefault {
            watermark: &exact,
            clock: &clock,
            ceiling,
        };
        assert_eq!(elapsed.resolve(), Ok(60));
    }
}
