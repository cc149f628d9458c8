//! Repository pattern for the translation memory store
//!
//! All data access goes through this interface. Lookup discipline follows
//! the store's identity rules: memory records are matched on the
//! (source_language, target_language, source_text) triple with first-match
//! (lowest id) semantics, assets on the literal
//! (source_language, joined target_languages) pair.

use crate::db::models::*;
use crate::db::upsert::{plan_upsert, MemoryInput, UpsertPlan, UpsertPolicy};
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, NotSet, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};

/// Projection returned to listings and the export formatter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: i64,
    pub name: String,
    pub source_language: String,
    pub target_language: String,
    pub source_text: String,
    pub target_text: String,
}

impl From<Memory> for MemoryRecord {
    fn from(m: Memory) -> Self {
        Self {
            id: m.id,
            name: m.name,
            source_language: m.source_language,
            target_language: m.target_language,
            source_text: m.source_text,
            target_text: m.target_text,
        }
    }
}

/// Counts reported by a cascading asset deletion
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AssetDeletion {
    pub deleted_memories_count: u64,
    pub deleted_memory_asset_count: u64,
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Memory Asset Operations
    // ========================================================================

    /// Look up an asset by the exact (source_language, joined targets) pair,
    /// creating it if absent. On reuse the display name is refreshed.
    ///
    /// Returns the asset and whether it was created. This is a check-then-act
    /// sequence; the unique index on the pair turns a lost race into a
    /// database error rather than a duplicate asset.
    pub async fn get_or_create_asset(
        &self,
        name: &str,
        source_language: &str,
        target_languages: &[String],
    ) -> Result<(MemoryAsset, bool)> {
        let joined = target_languages.join(",");

        let existing = MemoryAssetEntity::find()
            .filter(MemoryAssetColumn::SourceLanguage.eq(source_language))
            .filter(MemoryAssetColumn::TargetLanguages.eq(joined.as_str()))
            .order_by_asc(MemoryAssetColumn::Id)
            .one(self.read_conn())
            .await?;

        if let Some(asset) = existing {
            let mut active: MemoryAssetActiveModel = asset.into();
            active.name = Set(name.to_string());
            active.updated_at = Set(chrono::Utc::now().into());
            let asset = active.update(self.write_conn()).await?;
            return Ok((asset, false));
        }

        let now = chrono::Utc::now();
        let asset = MemoryAssetActiveModel {
            id: NotSet,
            name: Set(name.to_string()),
            source_language: Set(source_language.to_string()),
            target_languages: Set(joined),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let asset = asset.insert(self.write_conn()).await?;
        Ok((asset, true))
    }

    /// Find an asset by ID
    pub async fn find_asset(&self, id: i64) -> Result<Option<MemoryAsset>> {
        MemoryAssetEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// List all memory assets
    pub async fn list_assets(&self) -> Result<Vec<MemoryAsset>> {
        MemoryAssetEntity::find()
            .order_by_asc(MemoryAssetColumn::Id)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Delete all memory rows for an asset, then the asset row.
    ///
    /// Signals not-found only when both counts are zero.
    pub async fn delete_asset(&self, asset_id: i64) -> Result<AssetDeletion> {
        let memories = MemoryEntity::delete_many()
            .filter(MemoryColumn::MemoryAssetId.eq(asset_id))
            .exec(self.write_conn())
            .await?;

        let assets = MemoryAssetEntity::delete_many()
            .filter(MemoryAssetColumn::Id.eq(asset_id))
            .exec(self.write_conn())
            .await?;

        if memories.rows_affected == 0 && assets.rows_affected == 0 {
            return Err(AppError::AssetNotFound {
                id: asset_id.to_string(),
            });
        }

        Ok(AssetDeletion {
            deleted_memories_count: memories.rows_affected,
            deleted_memory_asset_count: assets.rows_affected,
        })
    }

    /// Duplicate an asset into one or more new target languages.
    ///
    /// Every memory row under the source asset fans out to each new target
    /// language with an empty target text, unless a row with that exact
    /// (asset, source_language, target_language, source_text) combination
    /// already exists. Running the duplication twice is a no-op.
    pub async fn duplicate_asset(
        &self,
        source_asset_id: i64,
        new_target_languages: &[String],
    ) -> Result<MemoryAsset> {
        let source_asset = self
            .find_asset(source_asset_id)
            .await?
            .ok_or_else(|| AppError::AssetNotFound {
                id: source_asset_id.to_string(),
            })?;

        let (new_asset, created) = self
            .get_or_create_asset(
                &source_asset.name,
                &source_asset.source_language,
                new_target_languages,
            )
            .await?;

        tracing::info!(
            source_asset_id,
            new_asset_id = new_asset.id,
            reused = !created,
            targets = %new_target_languages.join(","),
            "Duplicating memory asset"
        );

        let rows = MemoryEntity::find()
            .filter(MemoryColumn::MemoryAssetId.eq(source_asset_id))
            .order_by_asc(MemoryColumn::Id)
            .all(self.read_conn())
            .await?;

        for row in &rows {
            for lang in new_target_languages {
                let exists = MemoryEntity::find()
                    .filter(MemoryColumn::MemoryAssetId.eq(new_asset.id))
                    .filter(MemoryColumn::SourceLanguage.eq(row.source_language.as_str()))
                    .filter(MemoryColumn::TargetLanguage.eq(lang.as_str()))
                    .filter(MemoryColumn::SourceText.eq(row.source_text.as_str()))
                    .one(self.read_conn())
                    .await?
                    .is_some();

                if exists {
                    continue;
                }

                let fresh = MemoryActiveModel {
                    id: NotSet,
                    name: Set(row.name.clone()),
                    source_language: Set(row.source_language.clone()),
                    target_language: Set(lang.clone()),
                    source_text: Set(row.source_text.clone()),
                    target_text: Set(String::new()),
                    memory_asset_id: Set(new_asset.id),
                };
                fresh.insert(self.write_conn()).await?;
            }
        }

        Ok(new_asset)
    }

    // ========================================================================
    // Memory Operations
    // ========================================================================

    /// Find the first memory record matching the identity triple.
    /// Matching ignores the owning asset.
    pub async fn find_memory(
        &self,
        source_language: &str,
        target_language: &str,
        source_text: &str,
    ) -> Result<Option<Memory>> {
        MemoryEntity::find()
            .filter(MemoryColumn::SourceLanguage.eq(source_language))
            .filter(MemoryColumn::TargetLanguage.eq(target_language))
            .filter(MemoryColumn::SourceText.eq(source_text))
            .order_by_asc(MemoryColumn::Id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// All memory records for one language pair
    pub async fn memories_for_pair(
        &self,
        source_language: &str,
        target_language: &str,
    ) -> Result<Vec<Memory>> {
        MemoryEntity::find()
            .filter(MemoryColumn::SourceLanguage.eq(source_language))
            .filter(MemoryColumn::TargetLanguage.eq(target_language))
            .order_by_asc(MemoryColumn::Id)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// List every memory record
    pub async fn list_memories(&self) -> Result<Vec<MemoryRecord>> {
        let rows = MemoryEntity::find()
            .order_by_asc(MemoryColumn::Id)
            .all(self.read_conn())
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// List memory records owned by one asset
    pub async fn list_memories_by_asset(&self, asset_id: i64) -> Result<Vec<MemoryRecord>> {
        let rows = MemoryEntity::find()
            .filter(MemoryColumn::MemoryAssetId.eq(asset_id))
            .order_by_asc(MemoryColumn::Id)
            .all(self.read_conn())
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Reconcile one incoming pair against the store under the given policy.
    ///
    /// Returns whether a row was written (inserted or updated).
    pub async fn upsert_memory(&self, input: MemoryInput, policy: UpsertPolicy) -> Result<bool> {
        let existing = match policy {
            // InsertOnly never looks, preserving its duplicate-producing
            // legacy behavior.
            UpsertPolicy::InsertOnly => None,
            _ => {
                self.find_memory(
                    &input.source_language,
                    &input.target_language,
                    &input.source_text,
                )
                .await?
            }
        };

        match plan_upsert(existing.as_ref(), &input, policy) {
            UpsertPlan::Skip => Ok(false),
            UpsertPlan::Insert => {
                let row = MemoryActiveModel {
                    id: NotSet,
                    name: Set(input.name),
                    source_language: Set(input.source_language),
                    target_language: Set(input.target_language),
                    source_text: Set(input.source_text),
                    target_text: Set(input.target_text),
                    memory_asset_id: Set(input.memory_asset_id),
                };
                row.insert(self.write_conn()).await?;
                Ok(true)
            }
            UpsertPlan::Update { id, target_text } => {
                let mut update = MemoryEntity::update_many()
                    .col_expr(MemoryColumn::Name, Expr::value(input.name))
                    .col_expr(
                        MemoryColumn::MemoryAssetId,
                        Expr::value(input.memory_asset_id),
                    );
                if let Some(text) = target_text {
                    update = update.col_expr(MemoryColumn::TargetText, Expr::value(text));
                }
                update
                    .filter(MemoryColumn::Id.eq(id))
                    .exec(self.write_conn())
                    .await?;
                Ok(true)
            }
        }
    }

    /// Update source and target text of one record by id.
    /// Returns the number of rows affected.
    pub async fn update_memory_by_id(
        &self,
        id: i64,
        source_text: &str,
        target_text: &str,
    ) -> Result<u64> {
        let result = MemoryEntity::update_many()
            .col_expr(MemoryColumn::SourceText, Expr::value(source_text))
            .col_expr(MemoryColumn::TargetText, Expr::value(target_text))
            .filter(MemoryColumn::Id.eq(id))
            .exec(self.write_conn())
            .await?;
        Ok(result.rows_affected)
    }

    /// Update the target text of every record matching the identity triple.
    /// Returns the number of rows affected.
    pub async fn update_memory_by_keys(
        &self,
        source_language: &str,
        target_language: &str,
        source_text: &str,
        target_text: &str,
    ) -> Result<u64> {
        let result = MemoryEntity::update_many()
            .col_expr(MemoryColumn::TargetText, Expr::value(target_text))
            .filter(MemoryColumn::SourceLanguage.eq(source_language))
            .filter(MemoryColumn::TargetLanguage.eq(target_language))
            .filter(MemoryColumn::SourceText.eq(source_text))
            .exec(self.write_conn())
            .await?;
        Ok(result.rows_affected)
    }

    /// Delete every memory row whose id is in the given set.
    /// Signals not-found when nothing was deleted.
    pub async fn bulk_delete_memories(&self, ids: &[i64]) -> Result<u64> {
        let result = MemoryEntity::delete_many()
            .filter(MemoryColumn::Id.is_in(ids.to_vec()))
            .exec(self.write_conn())
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::MemoryNotFound);
        }

        Ok(result.rows_affected)
    }

    // ========================================================================
    // Settings Operations
    // ========================================================================

    /// Fetch the settings row, if one has been written yet
    pub async fn get_settings(&self) -> Result<Option<Settings>> {
        SettingsEntity::find()
            .order_by_asc(SettingsColumn::Id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Create the settings row on first write, update it afterwards.
    /// Fields passed as `None` keep their stored value.
    pub async fn put_settings(
        &self,
        chat_api_key: Option<String>,
        ocr_app_id: Option<String>,
        ocr_password: Option<String>,
    ) -> Result<Settings> {
        let now = chrono::Utc::now();

        if let Some(existing) = self.get_settings().await? {
            let mut active: SettingsActiveModel = existing.into();
            if let Some(key) = chat_api_key {
                active.chat_api_key = Set(Some(key));
            }
            if let Some(app_id) = ocr_app_id {
                active.ocr_app_id = Set(Some(app_id));
            }
            if let Some(password) = ocr_password {
                active.ocr_password = Set(Some(password));
            }
            active.updated_at = Set(now.into());
            return active.update(self.write_conn()).await.map_err(Into::into);
        }

        let row = SettingsActiveModel {
            id: NotSet,
            chat_api_key: Set(chat_api_key),
            ocr_app_id: Set(ocr_app_id),
            ocr_password: Set(ocr_password),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        row.insert(self.write_conn()).await.map_err(Into::into)
    }
}
