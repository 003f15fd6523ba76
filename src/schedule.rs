//! Daily scheduled posting of a random comic per site.

use crate::comic::ComicSource;
use crate::config::Config;
use crate::http::Transport;
use crate::post::WebhookPoster;
use crate::scraper::Scraper;
use chrono::{DateTime, FixedOffset, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("invalid post time {hour:02}:{minute:02}")]
    InvalidTime { hour: u32, minute: u32 },
    #[error("invalid UTC offset: {0} hours")]
    InvalidOffset(i32),
}

/// Time of day for the daily post, in a fixed UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DailySchedule {
    pub hour: u32,
    pub minute: u32,
    pub utc_offset_hours: i32,
}

impl Default for DailySchedule {
    fn default() -> Self {
        Self {
            hour: 8,
            minute: 0,
            utc_offset_hours: 8,
        }
    }
}

impl DailySchedule {
    pub fn offset(&self) -> Result<FixedOffset, ScheduleError> {
        self.utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or(ScheduleError::InvalidOffset(self.utc_offset_hours))
    }

    /// The first post time strictly after `now`
    pub fn next_run_after(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, ScheduleError> {
        let offset = self.offset()?;
        let time = NaiveTime::from_hms_opt(self.hour, self.minute, 0).ok_or(
            ScheduleError::InvalidTime {
                hour: self.hour,
                minute: self.minute,
            },
        )?;

        let mut date = now.with_timezone(&offset).date_naive();
        loop {
            if let Some(candidate) = offset.from_local_datetime(&date.and_time(time)).single() {
                let candidate = candidate.with_timezone(&Utc);
                if candidate > now {
                    return Ok(candidate);
                }
            }
            date = date.succ_opt().ok_or(ScheduleError::InvalidTime {
                hour: self.hour,
                minute: self.minute,
            })?;
        }
    }
}

/// What happened to one site's scheduled post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostStatus {
    Posted,
    /// No destination configured
    Skipped,
    Failed,
}

pub struct Scheduler {
    config: Config,
    http: Arc<dyn Transport>,
    poster: WebhookPoster,
}

impl Scheduler {
    pub fn new(config: Config, http: Arc<dyn Transport>) -> Self {
        Self {
            config,
            http,
            poster: WebhookPoster::new(),
        }
    }

    /// Post once a day, forever
    pub async fn run(&self) -> Result<(), ScheduleError> {
        loop {
            let now = Utc::now();
            let next = self.config.schedule.next_run_after(now)?;
            info!(next_run = %next, "waiting for the next scheduled post");
            tokio::time::sleep((next - now).to_std().unwrap_or_default()).await;
            self.post_all().await?;
        }
    }

    pub async fn post_all(&self) -> Result<Vec<(ComicSource, PostStatus)>, ScheduleError> {
        let offset = self.config.schedule.offset()?;
        let mut statuses = Vec::with_capacity(ComicSource::ALL.len());
        for source in ComicSource::ALL {
            statuses.push((source, self.post_source(source, offset).await));
        }
        Ok(statuses)
    }

    async fn post_source(&self, source: ComicSource, offset: FixedOffset) -> PostStatus {
        let Some(webhook_url) = self.config.sources.get(source).webhook_url.as_deref() else {
            warn!(%source, "no destination configured, skipping scheduled post");
            return PostStatus::Skipped;
        };

        // Fresh scraper so the post picks up the current settings
        let scraper = Scraper::from_config(source, &self.config, self.http.clone());
        let Some(record) = scraper.random_comic().await else {
            warn!(%source, "no comic fetched, skipping scheduled post");
            return PostStatus::Failed;
        };
        let description = scraper.describe_comic(&record).await;
        let posted_at = Utc::now().with_timezone(&offset);

        match self
            .poster
            .post(webhook_url, &record, &description, posted_at)
            .await
        {
            Ok(()) => {
                info!(%source, title = %record.title, "posted scheduled comic");
                PostStatus::Posted
            }
            Err(e) => {
                error!(%source, error = %e, "failed to post scheduled comic");
                PostStatus::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpError, HttpResponse};
    use async_trait::async_trait;

    struct Offline;

    #[async_trait]
    impl Transport for Offline {
        async fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
            Err(HttpError::Status {
                url: url.to_string(),
                status: 503,
            })
        }
    }

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn next_run_later_today() {
        let schedule = DailySchedule::default();
        // 23:00 UTC is 07:00 at UTC+8, one hour before the post
        assert_eq!(
            schedule.next_run_after(utc("2026-10-14T23:00:00Z")).unwrap(),
            utc("2026-10-15T00:00:00Z")
        );
    }

    #[test]
    fn next_run_rolls_over_to_tomorrow() {
        let schedule = DailySchedule::default();
        assert_eq!(
            schedule.next_run_after(utc("2026-10-15T00:00:00Z")).unwrap(),
            utc("2026-10-16T00:00:00Z")
        );
        assert_eq!(
            schedule.next_run_after(utc("2026-10-15T05:00:00Z")).unwrap(),
            utc("2026-10-16T00:00:00Z")
        );
    }

    #[test]
    fn invalid_schedules_are_rejected() {
        let schedule = DailySchedule {
            hour: 25,
            ..DailySchedule::default()
        };
        assert!(matches!(
            schedule.next_run_after(Utc::now()),
            Err(ScheduleError::InvalidTime { hour: 25, .. })
        ));

        let schedule = DailySchedule {
            utc_offset_hours: 30,
            ..DailySchedule::default()
        };
        assert!(matches!(schedule.offset(), Err(ScheduleError::InvalidOffset(30))));
    }

    #[test]
    fn huge_offsets_are_rejected_without_overflow() {
        for hours in [i32::MAX, i32::MIN, 596_524] {
            let schedule = DailySchedule {
                utc_offset_hours: hours,
                ..DailySchedule::default()
            };
            assert!(matches!(schedule.offset(), Err(ScheduleError::InvalidOffset(h)) if h == hours));
        }
    }

    #[tokio::test]
    async fn missing_destinations_are_skipped() {
        let scheduler = Scheduler::new(Config::default(), Arc::new(Offline));
        let statuses = scheduler.post_all().await.unwrap();
        assert_eq!(statuses.len(), 3);
        assert!(statuses.iter().all(|(_, status)| *status == PostStatus::Skipped));
    }

    #[tokio::test]
    async fn failed_fetch_does_not_post() {
        let mut config = Config::default();
        config.sources.xkcd.webhook_url = Some("http://127.0.0.1:9/unused".to_string());
        let scheduler = Scheduler::new(config, Arc::new(Offline));

        let statuses = scheduler.post_all().await.unwrap();
        assert_eq!(statuses[0], (ComicSource::Xkcd, PostStatus::Failed));
        assert_eq!(statuses[1], (ComicSource::TurnoffUs, PostStatus::Skipped));
    }
}
