use sea_orm::sea_query::{LockType, Order};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Select, Value};

use crate::entity::{pic, pic_comment, pic_ident, pic_tag, pic_vote, tag, user};

/// Row lock taken by a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lock {
    #[default]
    None,
    Read,
    Write,
}

/// An index over one table.
///
/// `columns` lists the index columns in sort order. `values` gives the leading
/// columns a particular key fixes, which may be fewer than `columns`.
pub trait ScanKey: Send + Sync {
    type Entity: EntityTrait;

    fn columns() -> Vec<<Self::Entity as EntityTrait>::Column>;
    fn values(&self) -> Vec<Value>;
}

/// Options for a table scan.
///
/// `prefix` pins leading index columns. `start` (inclusive) and `stop`
/// (exclusive) pin all but their last value, which bounds the range.
#[derive(Debug, Clone)]
pub struct ScanOpts<K> {
    pub prefix: Option<K>,
    pub start: Option<K>,
    pub stop: Option<K>,
    pub limit: Option<u64>,
    pub reverse: bool,
    pub lock: Lock,
}

impl<K> Default for ScanOpts<K> {
    fn default() -> Self {
        Self {
            prefix: None,
            start: None,
            stop: None,
            limit: None,
            reverse: false,
            lock: Lock::None,
        }
    }
}

impl<K: ScanKey> ScanOpts<K> {
    pub fn prefix(key: K) -> Self {
        Self {
            prefix: Some(key),
            ..Self::default()
        }
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn lock(mut self, lock: Lock) -> Self {
        self.lock = lock;
        self
    }

    pub fn reverse(mut self) -> Self {
        self.reverse = true;
        self
    }

    pub(crate) fn select(&self) -> Select<K::Entity> {
        let columns = K::columns();
        let mut query = K::Entity::find();

        if let Some(prefix) = &self.prefix {
            for (col, val) in columns.iter().zip(prefix.values()) {
                query = query.filter(col.eq(val));
            }
        }
        if let Some(start) = &self.start {
            let vals = start.values();
            let last = vals.len().saturating_sub(1);
            for (i, (col, val)) in columns.iter().zip(vals).enumerate() {
                query = if i == last {
                    query.filter(col.gte(val))
                } else {
                    query.filter(col.eq(val))
                };
            }
        }
        if let Some(stop) = &self.stop {
            let vals = stop.values();
            let last = vals.len().saturating_sub(1);
            for (i, (col, val)) in columns.iter().zip(vals).enumerate() {
                query = if i == last {
                    query.filter(col.lt(val))
                } else {
                    query.filter(col.eq(val))
                };
            }
        }

        let order = if self.reverse { Order::Desc } else { Order::Asc };
        for col in columns {
            query = query.order_by(col, order.clone());
        }
        if let Some(limit) = self.limit {
            query = query.limit(limit);
        }
        match self.lock {
            Lock::None => query,
            Lock::Read => query.lock(LockType::Share),
            Lock::Write => query.lock(LockType::Update),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PicId(pub i64);

impl ScanKey for PicId {
    type Entity = pic::Entity;

    fn columns() -> Vec<pic::Column> {
        vec![pic::Column::Id]
    }

    fn values(&self) -> Vec<Value> {
        vec![self.0.into()]
    }
}

/// Browse order, ties broken by id.
#[derive(Debug, Clone, Copy)]
pub struct PicIndexOrder(pub i64);

impl ScanKey for PicIndexOrder {
    type Entity = pic::Entity;

    fn columns() -> Vec<pic::Column> {
        vec![pic::Column::IndexOrder, pic::Column::Id]
    }

    fn values(&self) -> Vec<Value> {
        vec![self.0.into()]
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TagId(pub i64);

impl ScanKey for TagId {
    type Entity = tag::Entity;

    fn columns() -> Vec<tag::Column> {
        vec![tag::Column::Id]
    }

    fn values(&self) -> Vec<Value> {
        vec![self.0.into()]
    }
}

#[derive(Debug, Clone)]
pub struct TagName(pub String);

impl ScanKey for TagName {
    type Entity = tag::Entity;

    fn columns() -> Vec<tag::Column> {
        vec![tag::Column::Name]
    }

    fn values(&self) -> Vec<Value> {
        vec![self.0.clone().into()]
    }
}

/// Primary key of `PicTags`.
#[derive(Debug, Clone, Copy)]
pub struct PicTagKey {
    pub pic_id: i64,
    pub tag_id: Option<i64>,
}

impl PicTagKey {
    pub fn pic(pic_id: i64) -> Self {
        Self {
            pic_id,
            tag_id: None,
        }
    }
}

impl ScanKey for PicTagKey {
    type Entity = pic_tag::Entity;

    fn columns() -> Vec<pic_tag::Column> {
        vec![pic_tag::Column::PicId, pic_tag::Column::TagId]
    }

    fn values(&self) -> Vec<Value> {
        let mut vals = vec![self.pic_id.into()];
        vals.extend(self.tag_id.map(Value::from));
        vals
    }
}

/// Pics carrying a tag.
#[derive(Debug, Clone, Copy)]
pub struct PicTagByTag(pub i64);

impl ScanKey for PicTagByTag {
    type Entity = pic_tag::Entity;

    fn columns() -> Vec<pic_tag::Column> {
        vec![pic_tag::Column::TagId, pic_tag::Column::PicId]
    }

    fn values(&self) -> Vec<Value> {
        vec![self.0.into()]
    }
}

/// Idents of one pic.
#[derive(Debug, Clone, Copy)]
pub struct PicIdentKey(pub i64);

impl ScanKey for PicIdentKey {
    type Entity = pic_ident::Entity;

    fn columns() -> Vec<pic_ident::Column> {
        vec![
            pic_ident::Column::PicId,
            pic_ident::Column::IdentType,
            pic_ident::Column::Value,
        ]
    }

    fn values(&self) -> Vec<Value> {
        vec![self.0.into()]
    }
}

/// Idents by content, the dedupe index.
#[derive(Debug, Clone)]
pub struct IdentKey {
    pub ident_type: i32,
    pub value: Option<Vec<u8>>,
}

impl ScanKey for IdentKey {
    type Entity = pic_ident::Entity;

    fn columns() -> Vec<pic_ident::Column> {
        vec![
            pic_ident::Column::IdentType,
            pic_ident::Column::Value,
            pic_ident::Column::PicId,
        ]
    }

    fn values(&self) -> Vec<Value> {
        let mut vals = vec![self.ident_type.into()];
        vals.extend(self.value.clone().map(Value::from));
        vals
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PicCommentKey {
    pub pic_id: i64,
    pub comment_id: Option<i64>,
}

impl ScanKey for PicCommentKey {
    type Entity = pic_comment::Entity;

    fn columns() -> Vec<pic_comment::Column> {
        vec![pic_comment::Column::PicId, pic_comment::Column::CommentId]
    }

    fn values(&self) -> Vec<Value> {
        let mut vals = vec![self.pic_id.into()];
        vals.extend(self.comment_id.map(Value::from));
        vals
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PicVoteKey {
    pub pic_id: i64,
    pub user_id: Option<i64>,
}

impl ScanKey for PicVoteKey {
    type Entity = pic_vote::Entity;

    fn columns() -> Vec<pic_vote::Column> {
        vec![pic_vote::Column::PicId, pic_vote::Column::UserId]
    }

    fn values(&self) -> Vec<Value> {
        let mut vals = vec![self.pic_id.into()];
        vals.extend(self.user_id.map(Value::from));
        vals
    }
}

#[derive(Debug, Clone, Copy)]
pub struct UserId(pub i64);

impl ScanKey for UserId {
    type Entity = user::Entity;

    fn columns() -> Vec<user::Column> {
        vec![user::Column::Id]
    }

    fn values(&self) -> Vec<Value> {
        vec![self.0.into()]
    }
}

#[derive(Debug, Clone)]
pub struct UserIdent(pub String);

impl ScanKey for UserIdent {
    type Entity = user::Entity;

    fn columns() -> Vec<user::Column> {
        vec![user::Column::Ident]
    }

    fn values(&self) -> Vec<Value> {
        vec![self.0.clone().into()]
    }
}
