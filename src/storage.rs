use crate::errors::AppError;
use crate::models::UserRecord;
use std::{env, path::Path, path::PathBuf};
use tokio::fs;
use tracing::error;

pub fn resolve_data_dir() -> PathBuf {
    match env::var("APP_DATA_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => PathBuf::from("data/users"),
    }
}

fn cache_path(dir: &Path, username: &str) -> PathBuf {
    dir.join(format!("{username}.json"))
}

pub async fn load_cached(dir: &Path, username: &str) -> Option<UserRecord> {
    let path = cache_path(dir, username);
    match fs::read(&path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(record) => Some(record),
            Err(err) => {
                error!("failed to parse cached record for {username}: {err}");
                None
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
        Err(err) => {
            error!("failed to read cached record for {username}: {err}");
            None
        }
    }
}

pub async fn persist_cached(dir: &Path, username: &str, record: &UserRecord) -> Result<(), AppError> {
    let payload = serde_json::to_vec_pretty(record).map_err(AppError::internal)?;
    fs::create_dir_all(dir).await?;
    fs::write(cache_path(dir, username), payload)
        .await
        .map_err(AppError::internal)?;
    Ok(())
}

pub async fn remove_cached(dir: &Path, username: &str) -> Result<(), AppError> {
    match fs::remove_file(cache_path(dir, username)).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(AppError::internal(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CoffeeData, CoffeeEntry, CoffeeType, Theme};
    use chrono::Local;

    fn scratch_dir() -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("tazita_storage_{}_{nanos}", std::process::id()))
    }

    fn sample_record(username: &str) -> UserRecord {
        let mut data = CoffeeData::new(username, Local::now());
        data.push(CoffeeEntry::new(
            CoffeeType::Filtrado,
            Some("2026-03-14".to_string()),
            Some("v60".to_string()),
        ));
        UserRecord {
            data,
            theme: Theme::Keroppi,
            updated_at: Local::now(),
        }
    }

    #[tokio::test]
    async fn cache_round_trips_a_record() {
        let dir = scratch_dir();
        let record = sample_record("ana");

        persist_cached(&dir, "ana", &record).await.unwrap();
        let loaded = load_cached(&dir, "ana").await.unwrap();
        assert_eq!(loaded, record);

        let _ = fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn missing_cache_is_none_and_removal_is_idempotent() {
        let dir = scratch_dir();
        assert!(load_cached(&dir, "nadie").await.is_none());
        remove_cached(&dir, "nadie").await.unwrap();

        let record = sample_record("bruno");
        persist_cached(&dir, "bruno", &record).await.unwrap();
        remove_cached(&dir, "bruno").await.unwrap();
        assert!(load_cached(&dir, "bruno").await.is_none());

        let _ = fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn corrupt_cache_reads_as_none() {
        let dir = scratch_dir();
        fs::create_dir_all(&dir).await.unwrap();
        fs::write(dir.join("rota.json"), b"{not json").await.unwrap();
        assert!(load_cached(&dir, "rota").await.is_none());

        let _ = fs::remove_dir_all(&dir).await;
    }
}
