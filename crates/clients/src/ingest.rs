// crates/clients/src/ingest.rs
//! Sequential day-by-day heartbeat ingestion.
//!
//! One request per UTC calendar day across the span of the submission's
//! matched projects, strictly in order -- peak concurrency against the
//! time-tracking service stays at 1, trading latency for freedom from
//! rate-limit bursts. A failed day aborts the loop and the accumulated
//! partial results are discarded by the caller (the error carries no data).
//!
//! Cancellation is an explicit token checked at each suspension point:
//! results for a cancelled run are never applied, no matter how late the
//! in-flight response lands.

use chrono::{DateTime, NaiveDate};
use tokio_util::sync::CancellationToken;

use harborview_core::{Heartbeat, TrackedProject};

use crate::error::ClientResult;
use crate::hackatime::HackatimeClient;

/// Completed ingestion run.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    /// All heartbeats for the matched projects, in fetch order.
    pub heartbeats: Vec<Heartbeat>,
    pub total_days: usize,
}

/// Projects whose names exactly match a declared key, case-insensitively.
/// This is the same equality the aggregate uses -- ingestion scope and hour
/// aggregation must agree on what "the submission's projects" means.
pub fn match_projects(keys: &[String], projects: &[TrackedProject]) -> Vec<TrackedProject> {
    let key_set: Vec<String> = keys.iter().map(|k| k.to_lowercase()).collect();
    projects
        .iter()
        .filter(|p| key_set.iter().any(|k| *k == p.name.to_lowercase()))
        .cloned()
        .collect()
}

/// UTC day span covered by the matched projects' recorded activity.
/// `None` when no project reports any heartbeat timestamps.
pub fn ingest_span(projects: &[TrackedProject]) -> Option<(NaiveDate, NaiveDate)> {
    let first = projects.iter().filter_map(|p| p.first_heartbeat).min()?;
    let last = projects.iter().filter_map(|p| p.last_heartbeat).max()?;

    let start = DateTime::from_timestamp(first, 0)?.date_naive();
    let end = DateTime::from_timestamp(last.max(first), 0)?.date_naive();
    Some((start, end))
}

/// Fetch every heartbeat for `user_id` across the matched projects' span,
/// one UTC day at a time.
///
/// `on_day(done, total)` fires after each completed day for progress
/// display. Returns `Ok(None)` when the token was cancelled -- accumulated
/// results are dropped, not surfaced. A single failed day returns `Err` and
/// likewise surfaces nothing partial.
pub async fn ingest_heartbeats(
    client: &HackatimeClient,
    user_id: u64,
    projects: &[TrackedProject],
    cancel: &CancellationToken,
    mut on_day: impl FnMut(usize, usize),
) -> ClientResult<Option<IngestReport>> {
    let Some((start, end)) = ingest_span(projects) else {
        return Ok(Some(IngestReport {
            heartbeats: Vec::new(),
            total_days: 0,
        }));
    };

    let total_days = (end - start).num_days() as usize + 1;
    let names: Vec<String> = projects.iter().map(|p| p.name.to_lowercase()).collect();

    let mut heartbeats = Vec::new();
    let mut day = start;
    let mut done = 0;

    while day <= end {
        if cancel.is_cancelled() {
            tracing::debug!(user_id, %day, "Ingestion cancelled");
            return Ok(None);
        }

        let fetched = client.get_heartbeats_for_day(user_id, day).await?;

        if cancel.is_cancelled() {
            // The response landed after cancellation -- discard it.
            return Ok(None);
        }

        heartbeats.extend(
            fetched
                .into_iter()
                .filter(|h| names.iter().any(|n| *n == h.project.to_lowercase())),
        );

        done += 1;
        on_day(done, total_days);

        day = match day.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }

    tracing::info!(
        user_id,
        days = total_days,
        heartbeats = heartbeats.len(),
        "Ingestion complete"
    );
    Ok(Some(IngestReport {
        heartbeats,
        total_days,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hackatime::HackatimeConfig;

    fn project(name: &str, first: i64, last: i64) -> TrackedProject {
        TrackedProject {
            name: name.to_string(),
            total_duration: 0,
            first_heartbeat: Some(first),
            last_heartbeat: Some(last),
        }
    }

    fn client(base_url: String) -> HackatimeClient {
        HackatimeClient::new(HackatimeConfig {
            base_url,
            admin_token: "tok".to_string(),
        })
        .unwrap()
    }

    // 2026-03-01T10:00:00Z
    const DAY_ONE: i64 = 1_772_359_200;
    // 2026-03-02T10:00:00Z
    const DAY_TWO: i64 = 1_772_445_600;

    #[test]
    fn test_match_projects_exact_case_insensitive() {
        let projects = vec![project("Foo", 0, 0), project("foobar", 0, 0)];
        let matched = match_projects(&["FOO".to_string()], &projects);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].name, "Foo");
    }

    #[test]
    fn test_ingest_span() {
        let projects = vec![
            project("a", DAY_TWO, DAY_TWO),
            project("b", DAY_ONE, DAY_ONE),
        ];
        let (start, end) = ingest_span(&projects).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
    }

    #[test]
    fn test_ingest_span_empty() {
        assert!(ingest_span(&[]).is_none());
        let no_timestamps = vec![TrackedProject {
            name: "x".to_string(),
            total_duration: 10,
            first_heartbeat: None,
            last_heartbeat: None,
        }];
        assert!(ingest_span(&no_timestamps).is_none());
    }

    #[tokio::test]
    async fn test_ingest_fetches_each_day_sequentially() {
        let mut server = mockito::Server::new_async().await;
        let day1 = server
            .mock("GET", "/users/7/heartbeats")
            .match_query(mockito::Matcher::UrlEncoded(
                "date".into(),
                "2026-03-01".into(),
            ))
            .with_status(200)
            .with_body(
                r#"{"heartbeats":[
                    {"time":"2026-03-01T10:00:00Z","project":"demo","entity":"a.rs"},
                    {"time":"2026-03-01T10:01:00Z","project":"other","entity":"b.rs"}
                ]}"#,
            )
            .expect(1)
            .create_async()
            .await;
        let day2 = server
            .mock("GET", "/users/7/heartbeats")
            .match_query(mockito::Matcher::UrlEncoded(
                "date".into(),
                "2026-03-02".into(),
            ))
            .with_status(200)
            .with_body(
                r#"{"heartbeats":[
                    {"time":"2026-03-02T09:00:00Z","project":"Demo","entity":"c.rs"}
                ]}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let projects = vec![project("demo", DAY_ONE, DAY_TWO)];
        let mut progress: Vec<(usize, usize)> = Vec::new();
        let report = ingest_heartbeats(
            &client(server.url()),
            7,
            &projects,
            &CancellationToken::new(),
            |done, total| progress.push((done, total)),
        )
        .await
        .unwrap()
        .expect("not cancelled");

        // "other" project filtered out; "Demo" matches case-insensitively.
        assert_eq!(report.heartbeats.len(), 2);
        assert_eq!(report.total_days, 2);
        assert_eq!(progress, vec![(1, 2), (2, 2)]);
        day1.assert_async().await;
        day2.assert_async().await;
    }

    #[tokio::test]
    async fn test_ingest_failed_day_aborts() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/users/7/heartbeats")
            .match_query(mockito::Matcher::UrlEncoded(
                "date".into(),
                "2026-03-01".into(),
            ))
            .with_status(200)
            .with_body(
                r#"{"heartbeats":[{"time":"2026-03-01T10:00:00Z","project":"demo","entity":"a.rs"}]}"#,
            )
            .create_async()
            .await;
        server
            .mock("GET", "/users/7/heartbeats")
            .match_query(mockito::Matcher::UrlEncoded(
                "date".into(),
                "2026-03-02".into(),
            ))
            .with_status(502)
            .create_async()
            .await;

        let projects = vec![project("demo", DAY_ONE, DAY_TWO)];
        let result = ingest_heartbeats(
            &client(server.url()),
            7,
            &projects,
            &CancellationToken::new(),
            |_, _| {},
        )
        .await;

        // All-or-nothing: the error surfaces, day one's results do not.
        let err = result.unwrap_err();
        assert_eq!(err.status(), Some(502));
    }

    #[tokio::test]
    async fn test_ingest_cancellation_discards() {
        let server = mockito::Server::new_async().await;

        let cancel = CancellationToken::new();
        cancel.cancel();

        let projects = vec![project("demo", DAY_ONE, DAY_TWO)];
        let result = ingest_heartbeats(&client(server.url()), 7, &projects, &cancel, |_, _| {
            panic!("no progress after cancellation")
        })
        .await
        .unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_ingest_no_span_is_empty_report() {
        let server = mockito::Server::new_async().await;
        let report = ingest_heartbeats(
            &client(server.url()),
            7,
            &[],
            &CancellationToken::new(),
            |_, _| {},
        )
        .await
        .unwrap()
        .unwrap();

        assert!(report.heartbeats.is_empty());
        assert_eq!(report.total_days, 0);
    }
}
