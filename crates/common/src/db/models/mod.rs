//! SeaORM entity models
//!
//! Database entities for the translation memory store

mod memory;
mod memory_asset;
mod settings;

pub use memory_asset::{
    ActiveModel as MemoryAssetActiveModel, Column as MemoryAssetColumn, Entity as MemoryAssetEntity,
    Model as MemoryAsset,
};

pub use memory::{
    ActiveModel as MemoryActiveModel, Column as MemoryColumn, Entity as MemoryEntity,
    Model as Memory,
};

pub use settings::{
    ActiveModel as SettingsActiveModel, Column as SettingsColumn, Entity as SettingsEntity,
    Model as Settings,
};
