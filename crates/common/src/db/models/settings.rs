//! Application settings entity
//!
//! Holds upstream service credentials. At most one row is ever written; the
//! repository always reads and updates the first row.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "settings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(column_type = "Text", nullable)]
    pub chat_api_key: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub ocr_app_id: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub ocr_password: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
