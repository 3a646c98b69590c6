//! Configuration item entity.

use domain::models::ConfigurationItem;
use sqlx::FromRow;

/// Database row mapping for the configuration_items table.
#[derive(Debug, Clone, FromRow)]
pub struct ConfigurationItemEntity {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
}

impl From<ConfigurationItemEntity> for ConfigurationItem {
    fn from(entity: ConfigurationItemEntity) -> Self {
        Self {
            key: entity.key,
            value: entity.value,
            description: entity.description,
        }
    }
}
