use chrono::{DateTime, Local};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use serde_json::Value;
use solar_proposal::config::{AppConfig, RateLimitConfig};
use solar_proposal::error::AppError;
use solar_proposal::proposal::ProposalService;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) proposals: Arc<ProposalService>,
    pub(crate) media: Arc<MediaStore>,
    pub(crate) rate_limiter: Arc<RateLimiter>,
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

impl AppState {
    pub(crate) fn new(config: &AppConfig, metrics: PrometheusHandle) -> Self {
        Self {
            proposals: Arc::new(ProposalService::new(&config.proposal)),
            media: Arc::new(MediaStore::new(
                &config.proposal.media_dir,
                config.proposal.public_base_url.clone(),
            )),
            rate_limiter: Arc::new(RateLimiter::new(config.rate_limit)),
            readiness: Arc::new(AtomicBool::new(false)),
            metrics: Arc::new(metrics),
        }
    }
}

/// Sliding one-minute window of webhook calls per client address.
#[derive(Debug)]
pub(crate) struct RateLimiter {
    limit: usize,
    window: Duration,
    hits: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub(crate) fn new(config: RateLimitConfig) -> Self {
        Self {
            limit: config.requests_per_minute.max(1) as usize,
            window: Duration::from_secs(60),
            hits: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn check(&self, client: &str) -> Result<(), AppError> {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: &str, now: Instant) -> Result<(), AppError> {
        let mut hits = self.hits.lock().unwrap_or_else(PoisonError::into_inner);
        let window = self.window;

        hits.retain(|_, calls| {
            while calls
                .front()
                .is_some_and(|call| now.saturating_duration_since(*call) >= window)
            {
                calls.pop_front();
            }
            !calls.is_empty()
        });

        let calls = hits.entry(client.to_string()).or_default();
        if calls.len() >= self.limit {
            let oldest = calls.front().copied().unwrap_or(now);
            let wait = window.saturating_sub(now.saturating_duration_since(oldest));
            let retry_after_secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
            return Err(AppError::RateLimited {
                retry_after_secs: retry_after_secs.max(1),
            });
        }

        calls.push_back(now);
        Ok(())
    }
}

/// Directory of uniquely named proposal copies served under `/media`.
#[derive(Debug, Clone)]
pub(crate) struct MediaStore {
    dir: PathBuf,
    public_base_url: Option<String>,
}

impl MediaStore {
    pub(crate) fn new(dir: impl Into<PathBuf>, public_base_url: Option<String>) -> Self {
        Self {
            dir: dir.into(),
            public_base_url,
        }
    }

    pub(crate) fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `bytes` as `proposta_<8 hex>_<YYYYmmdd_HHMMSS>.pdf` and returns
    /// the file name.
    pub(crate) async fn publish(
        &self,
        bytes: &[u8],
        now: DateTime<Local>,
    ) -> Result<String, AppError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let token = Uuid::new_v4().simple().to_string();
        let file_name = format!(
            "proposta_{}_{}.pdf",
            &token[..8],
            now.format("%Y%m%d_%H%M%S")
        );
        let tmp_path = self.dir.join(format!(".{token}.tmp"));
        let path = self.dir.join(&file_name);

        tokio::fs::write(&tmp_path, bytes).await?;
        if let Err(err) = tokio::fs::rename(&tmp_path, &path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(err.into());
        }
        debug!(path = %path.display(), "media copy written");

        Ok(file_name)
    }

    /// Absolute link when a public base URL or a `Host` header is known.
    pub(crate) fn url_for(&self, file_name: &str, host: Option<&str>) -> String {
        match (&self.public_base_url, host) {
            (Some(base), _) => format!("{base}/media/{file_name}"),
            (None, Some(host)) => format!("http://{host}/media/{file_name}"),
            (None, None) => format!("/media/{file_name}"),
        }
    }

    /// Resolves a request path segment to a stored copy. Anything that is not
    /// a plain visible file name resolves to nothing.
    pub(crate) fn resolve(&self, file_name: &str) -> Option<PathBuf> {
        let plain = !file_name.is_empty()
            && !file_name.starts_with('.')
            && file_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !plain {
            return None;
        }
        let path = self.dir.join(file_name);
        path.is_file().then_some(path)
    }
}

/// Accepts the bill as a JSON string or number; missing or null becomes empty
/// and fails validation downstream.
pub(crate) fn deserialize_amount<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(raw)) => Ok(raw),
        Some(Value::Number(number)) => Ok(number.to_string()),
        Some(other) => Err(serde::de::Error::custom(format!(
            "valor_fatura must be a string or number, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn limiter(per_minute: u32) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            requests_per_minute: per_minute,
        })
    }

    #[test]
    fn rate_limiter_blocks_after_budget_and_recovers() {
        let limiter = limiter(2);
        let start = Instant::now();

        limiter.check_at("10.0.0.1", start).expect("first call");
        limiter
            .check_at("10.0.0.1", start + Duration::from_secs(10))
            .expect("second call");

        let err = limiter
            .check_at("10.0.0.1", start + Duration::from_secs(20))
            .expect_err("third call limited");
        match err {
            AppError::RateLimited { retry_after_secs } => assert_eq!(retry_after_secs, 40),
            other => panic!("unexpected error: {other}"),
        }

        limiter
            .check_at("10.0.0.2", start + Duration::from_secs(20))
            .expect("other clients keep their own budget");
        limiter
            .check_at("10.0.0.1", start + Duration::from_secs(61))
            .expect("window slides");
    }

    #[tokio::test]
    async fn media_copies_get_unique_names() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = MediaStore::new(dir.path().join("media"), None);
        let now = Local
            .with_ymd_and_hms(2026, 5, 14, 9, 30, 5)
            .single()
            .expect("valid timestamp");

        let first = store.publish(b"%PDF-1.5", now).await.expect("first copy");
        let second = store.publish(b"%PDF-1.5", now).await.expect("second copy");

        assert_ne!(first, second);
        assert!(first.starts_with("proposta_"));
        assert!(first.ends_with("_20260514_093005.pdf"));
        assert_eq!(first.len(), "proposta_".len() + 8 + "_20260514_093005.pdf".len());
        assert!(store.resolve(&first).is_some());
    }

    #[test]
    fn media_resolution_rejects_traversal() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(dir.path().join(".hidden"), b"x").expect("hidden file");
        let store = MediaStore::new(dir.path(), None);

        assert!(store.resolve("../etc/passwd").is_none());
        assert!(store.resolve(".hidden").is_none());
        assert!(store.resolve("missing.pdf").is_none());
        assert_eq!(store.dir(), dir.path());
    }

    #[test]
    fn urls_prefer_the_configured_base() {
        let configured = MediaStore::new("media", Some("https://propostas.example".to_string()));
        assert_eq!(
            configured.url_for("a.pdf", Some("localhost:8000")),
            "https://propostas.example/media/a.pdf"
        );

        let local = MediaStore::new("media", None);
        assert_eq!(
            local.url_for("a.pdf", Some("localhost:8000")),
            "http://localhost:8000/media/a.pdf"
        );
        assert_eq!(local.url_for("a.pdf", None), "/media/a.pdf");
    }
}
