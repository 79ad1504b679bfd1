//! Persistence collaborator for emission records.
//!
//! Every query that touches a single record is keyed on `(id, owner_id)`, so
//! ownership is enforced by the store itself and concurrent update/delete of the
//! same record resolve to whichever statement lands first.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::records::models::{EmissionRecord, EmissionRecordRow};

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn create(&self, record: &EmissionRecord) -> Result<()>;

    /// All records for an owner, newest first.
    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<EmissionRecord>>;

    async fn find_one_by_id_and_owner(&self, id: Uuid, owner_id: Uuid)
        -> Result<Option<EmissionRecord>>;

    /// Deletes and returns the record, or `None` if no record with that id belongs to the owner.
    async fn delete_one_by_id_and_owner(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<EmissionRecord>>;

    /// Writes back a mutated record. Returns `false` if it no longer exists for its owner.
    async fn save(&self, record: &EmissionRecord) -> Result<bool>;
}

// ────────────────────────────────────────────────────────────────────────────
// PostgreSQL
// ────────────────────────────────────────────────────────────────────────────

pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn create(&self, record: &EmissionRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO emission_records
                (id, owner_id, file_url, file_type, analysis, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.id)
        .bind(record.owner_id)
        .bind(&record.file_url)
        .bind(record.file_type.as_str())
        .bind(Json(&record.analysis))
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<EmissionRecord>> {
        let rows = sqlx::query_as::<_, EmissionRecordRow>(
            "SELECT * FROM emission_records WHERE owner_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(EmissionRecord::from).collect())
    }

    async fn find_one_by_id_and_owner(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<EmissionRecord>> {
        let row = sqlx::query_as::<_, EmissionRecordRow>(
            "SELECT * FROM emission_records WHERE id = $1 AND owner_id = $2",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(EmissionRecord::from))
    }

    async fn delete_one_by_id_and_owner(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<EmissionRecord>> {
        let row = sqlx::query_as::<_, EmissionRecordRow>(
            "DELETE FROM emission_records WHERE id = $1 AND owner_id = $2 RETURNING *",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(EmissionRecord::from))
    }

    async fn save(&self, record: &EmissionRecord) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE emission_records
            SET file_url = $3, file_type = $4, analysis = $5, updated_at = $6
            WHERE id = $1 AND owner_id = $2
            "#,
        )
        .bind(record.id)
        .bind(record.owner_id)
        .bind(&record.file_url)
        .bind(record.file_type.as_str())
        .bind(Json(&record.analysis))
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-process
// ────────────────────────────────────────────────────────────────────────────

/// Process-local store used when no database is configured, and in tests.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: RwLock<HashMap<Uuid, EmissionRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn create(&self, record: &EmissionRecord) -> Result<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            anyhow::bail!("record {} already exists", record.id);
        }
        records.insert(record.id, record.clone());
        Ok(())
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<EmissionRecord>> {
        let records = self.records.read().await;
        let mut owned: Vec<EmissionRecord> = records
            .values()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn find_one_by_id_and_owner(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<EmissionRecord>> {
        let records = self.records.read().await;
        Ok(records
            .get(&id)
            .filter(|r| r.owner_id == owner_id)
            .cloned())
    }

    async fn delete_one_by_id_and_owner(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<EmissionRecord>> {
        let mut records = self.records.write().await;
        match records.get(&id) {
            Some(r) if r.owner_id == owner_id => Ok(records.remove(&id)),
            _ => Ok(None),
        }
    }

    async fn save(&self, record: &EmissionRecord) -> Result<bool> {
        let mut records = self.records.write().await;
        match records.get_mut(&record.id) {
            Some(existing) if existing.owner_id == record.owner_id => {
                *existing = record.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    use crate::carbon::calculator::CarbonEquivalents;
    use crate::carbon::CalculationResult;
    use crate::extraction::{Extraction, FileType};
    use crate::records::models::RecordAnalysis;

    fn record(owner: Uuid, minutes_ago: i64) -> EmissionRecord {
        let mut r = EmissionRecord::new(
            owner,
            "manual://entry".into(),
            FileType::Manual,
            RecordAnalysis::new(
                Extraction {
                    category: "food".into(),
                    quantity: 1.0,
                    unit: "kg".into(),
                    subtype: Some("beef".into()),
                    source_text: "beef".into(),
                    confidence: None,
                    manual_entry: true,
                },
                CalculationResult {
                    total_emission: 27.0,
                    unit_emission: "kg CO2e".into(),
                    advice: vec![],
                    equivalents: CarbonEquivalents::default(),
                },
                "test",
            ),
        );
        r.created_at = Utc::now() - Duration::minutes(minutes_ago);
        r
    }

    #[tokio::test]
    async fn test_find_by_owner_is_newest_first_and_scoped() {
        let store = MemoryRecordStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let old = record(alice, 60);
        let new = record(alice, 1);
        store.create(&old).await.unwrap();
        store.create(&new).await.unwrap();
        store.create(&record(bob, 5)).await.unwrap();

        let found = store.find_by_owner(alice).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id, new.id);
        assert_eq!(found[1].id, old.id);
    }

    #[tokio::test]
    async fn test_duplicate_create_fails() {
        let store = MemoryRecordStore::new();
        let r = record(Uuid::new_v4(), 0);
        store.create(&r).await.unwrap();
        assert!(store.create(&r).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_by_other_owner_leaves_record() {
        let store = MemoryRecordStore::new();
        let alice = Uuid::new_v4();
        let r = record(alice, 0);
        store.create(&r).await.unwrap();

        let deleted = store
            .delete_one_by_id_and_owner(r.id, Uuid::new_v4())
            .await
            .unwrap();
        assert!(deleted.is_none());
        assert!(store
            .find_one_by_id_and_owner(r.id, alice)
            .await
            .unwrap()
            .is_some());

        let deleted = store.delete_one_by_id_and_owner(r.id, alice).await.unwrap();
        assert_eq!(deleted.map(|d| d.id), Some(r.id));
        assert!(store.find_by_owner(alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_requires_existing_owned_record() {
        let store = MemoryRecordStore::new();
        let alice = Uuid::new_v4();
        let mut r = record(alice, 0);
        assert!(!store.save(&r).await.unwrap());

        store.create(&r).await.unwrap();
        r.file_url = "text://direct-upload".into();
        assert!(store.save(&r).await.unwrap());

        let mut hijacked = r.clone();
        hijacked.owner_id = Uuid::new_v4();
        assert!(!store.save(&hijacked).await.unwrap());

        let stored = store.find_one_by_id_and_owner(r.id, alice).await.unwrap().unwrap();
        assert_eq!(stored.file_url, "text://direct-upload");
    }
}
