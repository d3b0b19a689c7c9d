use crate::models::UserRecord;
use crate::state::AppState;
use crate::storage;
use async_trait::async_trait;
use chrono::Local;
use serde::Deserialize;
use std::{env, fmt, path::PathBuf, sync::Arc, time::Duration};
use tokio::sync::{Mutex, mpsc::UnboundedReceiver};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

pub const DEBOUNCE: Duration = Duration::from_millis(1000);

#[derive(Debug)]
pub struct SyncError {
    pub message: String,
}

impl SyncError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for SyncError {}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        Self::new(err.to_string())
    }
}

// The remote store: one record per lowercased username, last write wins.
#[async_trait]
pub trait SyncBackend: Send + Sync {
    async fn exists(&self, username: &str) -> Result<bool, SyncError>;
    async fn load(&self, username: &str) -> Result<Option<UserRecord>, SyncError>;
    async fn save(&self, username: &str, record: &UserRecord) -> Result<(), SyncError>;
    async fn delete(&self, username: &str) -> Result<(), SyncError>;
}

// REST key-value client for the hosted store: GET {base}/get/{key},
// POST {base}/set/{key}, GET {base}/exists/{key}, POST {base}/del/{key},
// every reply wrapped in {"result": ...} and values stored as JSON strings.
pub struct HttpKvBackend {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct KvReply<T> {
    result: T,
}

impl HttpKvBackend {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            token: token.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_env() -> Option<Self> {
        let base_url = env::var("SYNC_URL").ok()?;
        let token = env::var("SYNC_TOKEN").unwrap_or_default();
        Some(Self::new(base_url, token))
    }

    fn key(username: &str) -> String {
        format!("user:{}", username.to_lowercase())
    }

    fn url(&self, op: &str, username: &str) -> String {
        format!("{}/{op}/{}", self.base_url, Self::key(username))
    }
}

#[async_trait]
impl SyncBackend for HttpKvBackend {
    async fn exists(&self, username: &str) -> Result<bool, SyncError> {
        let reply: KvReply<u64> = self
            .client
            .get(self.url("exists", username))
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(reply.result == 1)
    }

    async fn load(&self, username: &str) -> Result<Option<UserRecord>, SyncError> {
        let reply: KvReply<Option<String>> = self
            .client
            .get(self.url("get", username))
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match reply.result {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|err| SyncError::new(format!("malformed remote record: {err}"))),
            None => Ok(None),
        }
    }

    async fn save(&self, username: &str, record: &UserRecord) -> Result<(), SyncError> {
        let payload = serde_json::to_string(record)
            .map_err(|err| SyncError::new(format!("record serialization failed: {err}")))?;
        self.client
            .post(self.url("set", username))
            .bearer_auth(&self.token)
            .body(payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn delete(&self, username: &str) -> Result<(), SyncError> {
        self.client
            .post(self.url("del", username))
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

struct FlushContext {
    data_dir: PathBuf,
    session: Arc<Mutex<Option<crate::state::Session>>>,
    backend: Option<Arc<dyn SyncBackend>>,
}

// Single pending debounce window: every mutation signal resets it, the
// flush runs once the window expires with no further mutations. A final
// flush runs when the channel closes so shutdown never drops a pending
// write.
pub fn spawn_flush_task(state: &AppState, mut rx: UnboundedReceiver<()>) -> JoinHandle<()> {
    let ctx = FlushContext {
        data_dir: state.data_dir.clone(),
        session: state.session.clone(),
        backend: state.backend.clone(),
    };

    tokio::spawn(async move {
        loop {
            if rx.recv().await.is_none() {
                return;
            }
            loop {
                match timeout(DEBOUNCE, rx.recv()).await {
                    Ok(Some(())) => continue,
                    Ok(None) => {
                        flush(&ctx).await;
                        return;
                    }
                    Err(_) => {
                        flush(&ctx).await;
                        break;
                    }
                }
            }
        }
    })
}

async fn flush(ctx: &FlushContext) {
    let snapshot = {
        let session = ctx.session.lock().await;
        session
            .as_ref()
            .map(|session| (session.username.clone(), session.record()))
    };
    let Some((username, record)) = snapshot else {
        return;
    };

    // The local copy is written unconditionally; the remote store may be
    // unreachable and must never make a mutation fatal.
    if let Err(err) = storage::persist_cached(&ctx.data_dir, &username, &record).await {
        warn!("local cache write failed for {username}: {}", err.message);
    }

    let Some(backend) = &ctx.backend else {
        return;
    };
    match backend.save(&username, &record).await {
        Ok(()) => {
            debug!("synced {username}");
            let mut session = ctx.session.lock().await;
            if let Some(session) = session.as_mut() {
                if session.username == username {
                    session.last_sync = Some(Local::now());
                }
            }
        }
        Err(err) => warn!("sync failed for {username}, keeping the local copy: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CoffeeData, CoffeeEntry, CoffeeType, Theme};
    use crate::state::Session;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[derive(Default)]
    struct MemoryBackend {
        records: Mutex<HashMap<String, String>>,
        saves: AtomicU64,
    }

    #[async_trait]
    impl SyncBackend for MemoryBackend {
        async fn exists(&self, username: &str) -> Result<bool, SyncError> {
            Ok(self.records.lock().await.contains_key(username))
        }

        async fn load(&self, username: &str) -> Result<Option<UserRecord>, SyncError> {
            match self.records.lock().await.get(username) {
                Some(raw) => serde_json::from_str(raw)
                    .map(Some)
                    .map_err(|err| SyncError::new(err.to_string())),
                None => Ok(None),
            }
        }

        async fn save(&self, username: &str, record: &UserRecord) -> Result<(), SyncError> {
            let payload =
                serde_json::to_string(record).map_err(|err| SyncError::new(err.to_string()))?;
            self.records
                .lock()
                .await
                .insert(username.to_string(), payload);
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn delete(&self, username: &str) -> Result<(), SyncError> {
            self.records.lock().await.remove(username);
            Ok(())
        }
    }

    fn sample_record(username: &str) -> UserRecord {
        let mut data = CoffeeData::new(username, Local::now());
        data.push(CoffeeEntry::new(CoffeeType::Starbucks, None, None));
        data.push(CoffeeEntry::new(
            CoffeeType::Capsula,
            Some("2026-03-10".to_string()),
            None,
        ));
        UserRecord {
            data,
            theme: Theme::Cinnamoroll,
            updated_at: Local::now(),
        }
    }

    fn scratch_dir() -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("tazita_sync_{}_{nanos}", std::process::id()))
    }

    #[tokio::test]
    async fn backend_round_trips_the_entry_set() {
        let backend = MemoryBackend::default();
        assert!(!backend.exists("ana").await.unwrap());
        assert!(backend.load("ana").await.unwrap().is_none());

        let record = sample_record("ana");
        backend.save("ana", &record).await.unwrap();

        assert!(backend.exists("ana").await.unwrap());
        let loaded = backend.load("ana").await.unwrap().unwrap();
        assert_eq!(loaded.data.entries, record.data.entries);
        assert_eq!(loaded.theme, record.theme);

        backend.delete("ana").await.unwrap();
        assert!(!backend.exists("ana").await.unwrap());
    }

    #[tokio::test]
    async fn flush_writes_cache_and_remote_and_marks_last_sync() {
        let backend = Arc::new(MemoryBackend::default());
        let ctx = FlushContext {
            data_dir: scratch_dir(),
            session: Arc::new(Mutex::new(Some(Session::from_record(sample_record("ana"))))),
            backend: Some(backend.clone()),
        };

        flush(&ctx).await;

        assert!(backend.exists("ana").await.unwrap());
        assert!(
            storage::load_cached(&ctx.data_dir, "ana").await.is_some(),
            "local cache missing after flush"
        );
        assert!(ctx.session.lock().await.as_ref().unwrap().last_sync.is_some());

        let _ = tokio::fs::remove_dir_all(&ctx.data_dir).await;
    }

    #[tokio::test]
    async fn flush_without_session_is_a_no_op() {
        let backend = Arc::new(MemoryBackend::default());
        let ctx = FlushContext {
            data_dir: scratch_dir(),
            session: Arc::new(Mutex::new(None)),
            backend: Some(backend.clone()),
        };

        flush(&ctx).await;
        assert_eq!(backend.saves.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rapid_mutations_collapse_into_one_save() {
        let backend = Arc::new(MemoryBackend::default());
        let (state, rx) = AppState::new(scratch_dir(), Some(backend.clone()));
        *state.session.lock().await = Some(Session::from_record(sample_record("ana")));

        let task = spawn_flush_task(&state, rx);
        for _ in 0..5 {
            state.schedule_sync();
        }
        tokio::time::sleep(DEBOUNCE + Duration::from_millis(500)).await;
        assert_eq!(backend.saves.load(Ordering::SeqCst), 1);

        state.schedule_sync();
        tokio::time::sleep(DEBOUNCE + Duration::from_millis(500)).await;
        assert_eq!(backend.saves.load(Ordering::SeqCst), 2);

        let dir = state.data_dir.clone();
        drop(state);
        task.await.unwrap();
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
