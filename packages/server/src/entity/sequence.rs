use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Single-row table holding the next free id.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "_SequenceTable")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub the_sequence: i64,
}

impl ActiveModelBehavior for ActiveModel {}
