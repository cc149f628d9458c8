//! Translation memory entity
//!
//! One source-text to target-text pair for a single language pair. The
//! effective identity callers query on is the
//! (source_language, target_language, source_text) triple; the owning asset
//! and the batch name ride along as metadata.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "translation_memory")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Name of the upload batch this record arrived in (informational)
    #[sea_orm(column_type = "Text")]
    pub name: String,

    #[sea_orm(column_type = "Text")]
    pub source_language: String,

    #[sea_orm(column_type = "Text")]
    pub target_language: String,

    #[sea_orm(column_type = "Text")]
    pub source_text: String,

    /// May be empty while a translation is still pending
    #[sea_orm(column_type = "Text")]
    pub target_text: String,

    pub memory_asset_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::memory_asset::Entity",
        from = "Column::MemoryAssetId",
        to = "super::memory_asset::Column::Id",
        on_delete = "Cascade"
    )]
    MemoryAsset,
}

impl Related<super::memory_asset::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MemoryAsset.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
