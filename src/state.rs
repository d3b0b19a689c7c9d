use crate::models::{CoffeeData, Theme, UserRecord};
use crate::sync::SyncBackend;
use chrono::{DateTime, Local};
use std::{path::PathBuf, sync::Arc};
use tokio::sync::{Mutex, mpsc};

// The one user context that owns the in-memory collection.
pub struct Session {
    pub username: String,
    pub data: CoffeeData,
    pub theme: Theme,
    pub last_sync: Option<DateTime<Local>>,
}

impl Session {
    pub fn new(data: CoffeeData, theme: Theme) -> Self {
        Self {
            username: data.username.clone(),
            data,
            theme,
            last_sync: None,
        }
    }

    pub fn from_record(record: UserRecord) -> Self {
        Self::new(record.data, record.theme)
    }

    pub fn record(&self) -> UserRecord {
        UserRecord {
            data: self.data.clone(),
            theme: self.theme,
            updated_at: Local::now(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub data_dir: PathBuf,
    pub session: Arc<Mutex<Option<Session>>>,
    pub backend: Option<Arc<dyn SyncBackend>>,
    sync_tx: mpsc::UnboundedSender<()>,
}

impl AppState {
    pub fn new(
        data_dir: PathBuf,
        backend: Option<Arc<dyn SyncBackend>>,
    ) -> (Self, mpsc::UnboundedReceiver<()>) {
        let (sync_tx, sync_rx) = mpsc::unbounded_channel();
        let state = Self {
            data_dir,
            session: Arc::new(Mutex::new(None)),
            backend,
            sync_tx,
        };
        (state, sync_rx)
    }

    // Mutations call this; the flush task debounces and persists.
    pub fn schedule_sync(&self) {
        let _ = self.sync_tx.send(());
    }
}
