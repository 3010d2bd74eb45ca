use super::Sugar;
use crate::{account::{DEADLINE_HISTORY, DEADLINE_LISTING}, domain::Deal, error::ClientError};
use chrono::{DateTime, Datelike, Duration as ChronoDuration, TimeZone, Utc};
use chrono_tz::Tz;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Start of the broker day containing `at`, in `server_tz`. History windows
/// are phrased in terms of the broker's trading day, not the caller's local
/// time or UTC.
fn day_start(at: DateTime<Utc>, server_tz: Tz) -> DateTime<Utc> {
    at.with_timezone(&server_tz)
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|naive| server_tz.from_local_datetime(&naive).single())
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or(at)
}

impl Sugar {
    /// Closed deals from the start of today (server time) to now.
    pub async fn history_today(
        &self,
        server_tz: Tz,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
    ) -> Result<Vec<Deal>, ClientError> {
        let deadline = Some(deadline.unwrap_or(DEADLINE_LISTING));
        let now = Utc::now();
        self.service.history(day_start(now, server_tz), now, cancel, deadline).await
    }

    /// Closed deals for the entire broker day before today.
    pub async fn history_yesterday(
        &self,
        server_tz: Tz,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
    ) -> Result<Vec<Deal>, ClientError> {
        let deadline = Some(deadline.unwrap_or(DEADLINE_LISTING));
        let today_start = day_start(Utc::now(), server_tz);
        let yesterday_start = today_start - ChronoDuration::days(1);
        self.service.history(yesterday_start, today_start, cancel, deadline).await
    }

    /// Closed deals from the most recent broker-day Monday to now.
    pub async fn history_this_week(
        &self,
        server_tz: Tz,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
    ) -> Result<Vec<Deal>, ClientError> {
        let deadline = Some(deadline.unwrap_or(DEADLINE_LISTING));
        let now = Utc::now();
        let today_start = day_start(now, server_tz);
        let weekday_index = today_start.with_timezone(&server_tz).weekday().num_days_from_monday() as i64;
        let week_start = today_start - ChronoDuration::days(weekday_index);
        self.service.history(week_start, now, cancel, deadline).await
    }

    /// Closed deals from the first of the current broker-time month to now.
    pub async fn history_this_month(
        &self,
        server_tz: Tz,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
    ) -> Result<Vec<Deal>, ClientError> {
        let deadline = Some(deadline.unwrap_or(DEADLINE_HISTORY));
        let now = Utc::now();
        let local = now.with_timezone(&server_tz);
        let first_of_month = local
            .date_naive()
            .with_day(1)
            .and_then(|naive| naive.and_hms_opt(0, 0, 0))
            .and_then(|naive| server_tz.from_local_datetime(&naive).single())
            .map(|local| local.with_timezone(&Utc))
            .unwrap_or(now);
        self.service.history(first_of_month, now, cancel, deadline).await
    }

    /// Closed deals in an arbitrary `[from, to]` range (the general case the named windows are convenience wrappers over).
    pub async fn history_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
    ) -> Result<Vec<Deal>, ClientError> {
        let deadline = Some(deadline.unwrap_or(DEADLINE_HISTORY));
        self.service.history(from, to, cancel, deadline).await
    }
}
