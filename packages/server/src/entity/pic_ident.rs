use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Content fingerprint of a pic.
///
/// `(ident_type, value)` is additionally unique; see `seed::ensure_indexes`.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "PicIdents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub pic_id: i64,

    #[sea_orm(primary_key, auto_increment = false)]
    pub ident_type: i32,

    #[sea_orm(primary_key, auto_increment = false)]
    pub value: Vec<u8>,

    pub data: Vec<u8>,
}

impl ActiveModelBehavior for ActiveModel {}
