use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// One record from the remote feeder log feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub event: String,
}

// Timestamps arrive as "YYYY-MM-DD HH:MM:SS"; only the date portion matters
// for grouping, time-of-day is discarded.
pub fn entry_date(entry: &LogEntry) -> Option<NaiveDate> {
    let date = entry.timestamp.split_whitespace().next()?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

pub async fn fetch_feed(client: &reqwest::Client, url: &str) -> Result<Vec<LogEntry>> {
    let resp = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("fetch {}", url))?
        .error_for_status()
        .context("feed endpoint returned error status")?;

    let entries = resp
        .json::<Vec<LogEntry>>()
        .await
        .context("parse feed JSON")?;

    Ok(entries)
}

/// Shared snapshot of the last fetched feed.
///
/// The list view calls `refresh` (always hits upstream), the history view
/// calls `snapshot` (hits upstream at most once). The mutex is held across
/// the fetch await, so requests racing on an empty cache share a single
/// upstream call and observe the same snapshot.
pub struct FeedCache {
    url: String,
    entries: Mutex<Option<Vec<LogEntry>>>,
}

impl FeedCache {
    pub fn new(url: String) -> Self {
        Self {
            url,
            entries: Mutex::new(None),
        }
    }

    /// Fetch upstream unconditionally and replace the cached snapshot.
    pub async fn refresh(&self, client: &reqwest::Client) -> Result<Vec<LogEntry>> {
        let mut slot = self.entries.lock().await;
        let fetched = fetch_feed(client, &self.url).await?;
        *slot = Some(fetched.clone());
        Ok(fetched)
    }

    /// Return the cached snapshot, fetching it first if none exists yet.
    pub async fn snapshot(&self, client: &reqwest::Client) -> Result<Vec<LogEntry>> {
        let mut slot = self.entries.lock().await;
        if let Some(entries) = slot.as_ref() {
            return Ok(entries.clone());
        }
        let fetched = fetch_feed(client, &self.url).await?;
        *slot = Some(fetched.clone());
        Ok(fetched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn entry(timestamp: &str, event: &str) -> LogEntry {
        LogEntry {
            timestamp: timestamp.to_string(),
            event: event.to_string(),
        }
    }

    #[test]
    fn entry_date_takes_date_portion() {
        let e = entry("2024-01-05 18:22:10", "Hungry Detected");
        assert_eq!(
            entry_date(&e),
            Some(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap())
        );
    }

    #[test]
    fn entry_date_rejects_garbage() {
        assert_eq!(entry_date(&entry("not-a-date 00:00:00", "x")), None);
        assert_eq!(entry_date(&entry("", "x")), None);
        assert_eq!(entry_date(&entry("2024-13-40 00:00:00", "x")), None);
    }

    #[test]
    fn feed_json_parses() {
        let raw = r#"[
            {"timestamp": "2024-01-01 08:00:00", "event": "Hungry Detected"},
            {"timestamp": "2024-01-01 08:01:00", "event": "Auto Feeder Triggered"}
        ]"#;
        let entries: Vec<LogEntry> = serde_json::from_str(raw).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].event, "Hungry Detected");
        assert_eq!(entries[1].timestamp, "2024-01-01 08:01:00");
    }

    const FEED_JSON: &str = r#"[
        {"timestamp": "2024-01-01 08:00:00", "event": "Hungry Detected"},
        {"timestamp": "2024-01-02 09:30:00", "event": "Auto Feeder Triggered"}
    ]"#;

    // Minimal canned-response HTTP server; counts how many requests landed.
    async fn serve_feed(hits: Arc<AtomicUsize>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                hits.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 2048];
                let _ = stream.read(&mut buf).await;
                let resp = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    FEED_JSON.len(),
                    FEED_JSON
                );
                let _ = stream.write_all(resp.as_bytes()).await;
            }
        });
        format!("http://{}/logs", addr)
    }

    #[tokio::test]
    async fn fetch_feed_parses_remote_entries() {
        let hits = Arc::new(AtomicUsize::new(0));
        let url = serve_feed(Arc::clone(&hits)).await;
        let client = reqwest::Client::new();

        let entries = fetch_feed(&client, &url).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn snapshot_fetches_upstream_once() {
        let hits = Arc::new(AtomicUsize::new(0));
        let url = serve_feed(Arc::clone(&hits)).await;
        let client = reqwest::Client::new();
        let cache = FeedCache::new(url);

        let first = cache.snapshot(&client).await.unwrap();
        let second = cache.snapshot(&client).await.unwrap();
        assert_eq!(first.len(), second.len());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refresh_always_fetches_upstream() {
        let hits = Arc::new(AtomicUsize::new(0));
        let url = serve_feed(Arc::clone(&hits)).await;
        let client = reqwest::Client::new();
        let cache = FeedCache::new(url);

        cache.refresh(&client).await.unwrap();
        cache.refresh(&client).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        // A later snapshot is served from the refreshed cache.
        cache.snapshot(&client).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn fetch_feed_surfaces_connection_errors() {
        // Port is bound then dropped, so nothing is listening.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = reqwest::Client::new();
        let url = format!("http://{}/logs", addr);
        assert!(fetch_feed(&client, &url).await.is_err());
    }
}
