use std::time::Duration;

use futures::stream::{self, StreamExt};
use indexmap::IndexMap;
use log::{debug, info, warn};
use reqwest::Client;
use url::Url;

use crate::analysis::platforms;
use crate::error::{JobLensError, Result};
use crate::model::{PlatformWindow, TelemetryRecord};

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY_SECONDS: u64 = 2;
const MAX_CONCURRENT_RELEASES: usize = 4;

/// Everything one fetch run pulls out of the feed: the name-filtered records
/// per release, plus per-platform run counters over the whole feed for the
/// cross-platform comparison.
#[derive(Debug, Default)]
pub struct FetchedTelemetry {
    pub records_by_release: IndexMap<String, Vec<TelemetryRecord>>,
    pub platform_totals_by_release: IndexMap<String, IndexMap<String, PlatformWindow>>,
}

/// Read-only HTTP client for the job reliability telemetry feed.
///
/// The feed is queried one release at a time; records are filtered down to
/// the configured name substring and stamped with the release they came from.
pub struct TelemetryClient {
    client: Client,
    jobs_url: Url,
    name_filter: String,
}

impl TelemetryClient {
    pub fn new(base_url: &str, name_filter: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent("JobLens/0.3.0")
            .build()
            .map_err(|e| JobLensError::Config(format!("Failed to create HTTP client: {e}")))?;

        let jobs_url = Url::parse(base_url)
            .map_err(|e| JobLensError::Config(format!("Invalid base URL: {e}")))?
            .join("api/jobs")
            .map_err(|e| JobLensError::Config(format!("Invalid jobs URL: {e}")))?;

        Ok(Self {
            client,
            jobs_url,
            name_filter: name_filter.to_string(),
        })
    }

    /// Fetches telemetry for every release, in bounded parallel.
    ///
    /// A release whose fetch fails contributes an empty record list instead
    /// of failing the whole batch. The returned maps preserve the order of
    /// `releases`.
    pub async fn fetch_all(&self, releases: &[String]) -> FetchedTelemetry {
        type ReleaseResult = (String, Vec<TelemetryRecord>, IndexMap<String, PlatformWindow>);

        let results: Vec<ReleaseResult> = stream::iter(releases)
            .map(|release| async move {
                match self.fetch_raw(release).await {
                    Ok(raw) => {
                        let totals = platforms::platform_totals(&raw);
                        (release.clone(), self.keep_matching(raw, release), totals)
                    }
                    Err(e) => {
                        warn!("Failed to fetch telemetry for release {release}: {e}");
                        (release.clone(), Vec::new(), IndexMap::new())
                    }
                }
            })
            .buffer_unordered(MAX_CONCURRENT_RELEASES)
            .collect()
            .await;

        let mut fetched = FetchedTelemetry::default();
        for release in releases {
            fetched
                .records_by_release
                .insert(release.clone(), Vec::new());
            fetched
                .platform_totals_by_release
                .insert(release.clone(), IndexMap::new());
        }
        for (release, records, totals) in results {
            fetched.records_by_release.insert(release.clone(), records);
            fetched.platform_totals_by_release.insert(release, totals);
        }
        fetched
    }

    /// Fetches the name-filtered telemetry records for one release.
    pub async fn fetch_release(&self, release: &str) -> Result<Vec<TelemetryRecord>> {
        let raw = self.fetch_raw(release).await?;
        Ok(self.keep_matching(raw, release))
    }

    /// Fetches one release's full feed, with automatic retry on network
    /// errors and rate limits.
    async fn fetch_raw(&self, release: &str) -> Result<Vec<TelemetryRecord>> {
        let mut url = self.jobs_url.clone();
        url.query_pairs_mut().append_pair("release", release);

        let mut retry_count = 0;
        loop {
            let response = match self.client.get(url.clone()).send().await {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() || e.is_request() => {
                    if retry_count >= MAX_RETRIES {
                        return Err(e.into());
                    }
                    warn!(
                        "Network error ({}), retrying in {}s ({}/{})...",
                        e,
                        RETRY_DELAY_SECONDS,
                        retry_count + 1,
                        MAX_RETRIES
                    );
                    tokio::time::sleep(Duration::from_secs(RETRY_DELAY_SECONDS)).await;
                    retry_count += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let status = response.status();

            if status == 429 || status.is_server_error() {
                if retry_count >= MAX_RETRIES {
                    return Err(JobLensError::ApiErrorAfterRetries {
                        status: status.as_u16(),
                        retries: MAX_RETRIES,
                    });
                }

                warn!(
                    "Telemetry feed error (status {status}). Waiting {RETRY_DELAY_SECONDS} seconds before retry {}/{}...",
                    retry_count + 1,
                    MAX_RETRIES
                );

                tokio::time::sleep(Duration::from_secs(RETRY_DELAY_SECONDS)).await;
                retry_count += 1;
                continue;
            }

            if !status.is_success() {
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unable to read error response".to_string());
                return Err(JobLensError::Api(format!(
                    "status {status} for release {release}: {message}"
                )));
            }

            let records: Vec<TelemetryRecord> = response.json().await?;
            debug!("Release {release}: {} raw telemetry records", records.len());
            return Ok(records);
        }
    }

    /// Keeps the records matching the configured name substring, stamped
    /// with the release they came from.
    fn keep_matching(
        &self,
        records: Vec<TelemetryRecord>,
        release: &str,
    ) -> Vec<TelemetryRecord> {
        let kept: Vec<TelemetryRecord> = records
            .into_iter()
            .filter(|record| record.name.contains(&self.name_filter))
            .map(|mut record| {
                record.release = release.to_string();
                record
            })
            .collect();

        info!(
            "Release {release}: kept {} records matching '{}'",
            kept.len(),
            self.name_filter
        );
        kept
    }
}
