use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "PicTags")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub pic_id: i64,

    #[sea_orm(primary_key, auto_increment = false, indexed)]
    pub tag_id: i64,

    pub data: Vec<u8>,
}

impl ActiveModelBehavior for ActiveModel {}
