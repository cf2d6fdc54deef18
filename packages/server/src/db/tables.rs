//! Typed row operations on [`Job`].
//!
//! Every table keeps its key columns in the clear and the full record as
//! JSON in `data`.

use std::ops::ControlFlow;

use common::Status;
use sea_orm::{ActiveValue::Set, EntityTrait};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::keys::{Lock, PicId, ScanKey, ScanOpts, UserId};
use super::{Job, db_status, insert_status};
use crate::entity::{pic, pic_comment, pic_ident, pic_tag, pic_vote, tag, user};
use crate::schema::{Pic, PicComment, PicIdent, PicTag, PicVote, Tag, User};

fn encode<T: Serialize>(record: &T) -> Result<Vec<u8>, Status> {
    serde_json::to_vec(record).map_err(|e| Status::internal("can't encode row").with_cause(e))
}

fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T, Status> {
    serde_json::from_slice(data).map_err(|e| Status::internal("can't decode row").with_cause(e))
}

impl Job {
    async fn rows<K: ScanKey>(
        &self,
        opts: &ScanOpts<K>,
    ) -> Result<Vec<<K::Entity as EntityTrait>::Model>, Status> {
        opts.select()
            .all(self.conn()?)
            .await
            .map_err(|e| db_status(e, "can't scan table"))
    }
}

/// `scan_*` feeds decoded rows to a callback until it breaks; `find_*`
/// collects them.
macro_rules! scan_table {
    ($scan:ident, $find:ident, $entity:path, $record:ty) => {
        impl Job {
            pub async fn $scan<K, F>(&self, opts: ScanOpts<K>, mut cb: F) -> Result<(), Status>
            where
                K: ScanKey<Entity = $entity>,
                F: FnMut($record) -> ControlFlow<()> + Send,
            {
                for row in self.rows(&opts).await? {
                    if cb(decode(&row.data)?).is_break() {
                        break;
                    }
                }
                Ok(())
            }

            pub async fn $find<K>(&self, opts: ScanOpts<K>) -> Result<Vec<$record>, Status>
            where
                K: ScanKey<Entity = $entity>,
            {
                let mut found = Vec::new();
                self.$scan(opts, |r| {
                    found.push(r);
                    ControlFlow::Continue(())
                })
                .await?;
                Ok(found)
            }
        }
    };
}

scan_table!(scan_pics, find_pics, pic::Entity, Pic);
scan_table!(scan_tags, find_tags, tag::Entity, Tag);
scan_table!(scan_pic_tags, find_pic_tags, pic_tag::Entity, PicTag);
scan_table!(scan_pic_idents, find_pic_idents, pic_ident::Entity, PicIdent);
scan_table!(scan_pic_comments, find_pic_comments, pic_comment::Entity, PicComment);
scan_table!(scan_pic_votes, find_pic_votes, pic_vote::Entity, PicVote);
scan_table!(scan_users, find_users, user::Entity, User);

fn pic_row(p: &Pic) -> Result<pic::ActiveModel, Status> {
    Ok(pic::ActiveModel {
        id: Set(p.pic_id),
        index_order: Set(p.index_order()),
        score_order: Set(p.lower_score_bound()),
        data: Set(encode(p)?),
    })
}

fn tag_row(t: &Tag) -> Result<tag::ActiveModel, Status> {
    Ok(tag::ActiveModel {
        id: Set(t.tag_id),
        name: Set(t.name.clone()),
        data: Set(encode(t)?),
    })
}

fn pic_tag_row(pt: &PicTag) -> Result<pic_tag::ActiveModel, Status> {
    Ok(pic_tag::ActiveModel {
        pic_id: Set(pt.pic_id),
        tag_id: Set(pt.tag_id),
        data: Set(encode(pt)?),
    })
}

fn pic_ident_row(pi: &PicIdent) -> Result<pic_ident::ActiveModel, Status> {
    Ok(pic_ident::ActiveModel {
        pic_id: Set(pi.pic_id),
        ident_type: Set(pi.ident_type.as_i32()),
        value: Set(pi.value.clone()),
        data: Set(encode(pi)?),
    })
}

fn pic_comment_row(pc: &PicComment) -> Result<pic_comment::ActiveModel, Status> {
    Ok(pic_comment::ActiveModel {
        pic_id: Set(pc.pic_id),
        comment_id: Set(pc.comment_id),
        data: Set(encode(pc)?),
    })
}

fn pic_vote_row(pv: &PicVote) -> Result<pic_vote::ActiveModel, Status> {
    Ok(pic_vote::ActiveModel {
        pic_id: Set(pv.pic_id),
        user_id: Set(pv.user_id),
        data: Set(encode(pv)?),
    })
}

fn user_row(u: &User) -> Result<user::ActiveModel, Status> {
    Ok(user::ActiveModel {
        id: Set(u.user_id),
        ident: Set(u.ident.clone()),
        data: Set(encode(u)?),
    })
}

impl Job {
    pub async fn insert_pic(&self, p: &Pic) -> Result<(), Status> {
        pic::Entity::insert(pic_row(p)?)
            .exec_without_returning(self.conn()?)
            .await
            .map_err(|e| insert_status(e, "can't insert pic"))?;
        Ok(())
    }

    pub async fn update_pic(&self, p: &Pic) -> Result<(), Status> {
        pic::Entity::update(pic_row(p)?)
            .exec(self.conn()?)
            .await
            .map_err(|e| db_status(e, "can't update pic"))?;
        Ok(())
    }

    pub async fn delete_pic(&self, pic_id: i64) -> Result<(), Status> {
        pic::Entity::delete_by_id(pic_id)
            .exec(self.conn()?)
            .await
            .map_err(|e| db_status(e, "can't delete pic"))?;
        Ok(())
    }

    /// Single pic by id.
    pub async fn lookup_pic(&self, pic_id: i64, lock: Lock) -> Result<Option<Pic>, Status> {
        let mut pics = self
            .find_pics(ScanOpts::prefix(PicId(pic_id)).limit(1).lock(lock))
            .await?;
        Ok(pics.pop())
    }

    pub async fn insert_tag(&self, t: &Tag) -> Result<(), Status> {
        tag::Entity::insert(tag_row(t)?)
            .exec_without_returning(self.conn()?)
            .await
            .map_err(|e| insert_status(e, "can't insert tag"))?;
        Ok(())
    }

    pub async fn update_tag(&self, t: &Tag) -> Result<(), Status> {
        tag::Entity::update(tag_row(t)?)
            .exec(self.conn()?)
            .await
            .map_err(|e| db_status(e, "can't update tag"))?;
        Ok(())
    }

    pub async fn delete_tag(&self, tag_id: i64) -> Result<(), Status> {
        tag::Entity::delete_by_id(tag_id)
            .exec(self.conn()?)
            .await
            .map_err(|e| db_status(e, "can't delete tag"))?;
        Ok(())
    }

    pub async fn insert_pic_tag(&self, pt: &PicTag) -> Result<(), Status> {
        pic_tag::Entity::insert(pic_tag_row(pt)?)
            .exec_without_returning(self.conn()?)
            .await
            .map_err(|e| insert_status(e, "can't insert pic tag"))?;
        Ok(())
    }

    pub async fn update_pic_tag(&self, pt: &PicTag) -> Result<(), Status> {
        pic_tag::Entity::update(pic_tag_row(pt)?)
            .exec(self.conn()?)
            .await
            .map_err(|e| db_status(e, "can't update pic tag"))?;
        Ok(())
    }

    pub async fn delete_pic_tag(&self, pic_id: i64, tag_id: i64) -> Result<(), Status> {
        pic_tag::Entity::delete_by_id((pic_id, tag_id))
            .exec(self.conn()?)
            .await
            .map_err(|e| db_status(e, "can't delete pic tag"))?;
        Ok(())
    }

    pub async fn insert_pic_ident(&self, pi: &PicIdent) -> Result<(), Status> {
        pic_ident::Entity::insert(pic_ident_row(pi)?)
            .exec_without_returning(self.conn()?)
            .await
            .map_err(|e| insert_status(e, "can't insert pic ident"))?;
        Ok(())
    }

    pub async fn delete_pic_ident(&self, pi: &PicIdent) -> Result<(), Status> {
        pic_ident::Entity::delete_by_id((pi.pic_id, pi.ident_type.as_i32(), pi.value.clone()))
            .exec(self.conn()?)
            .await
            .map_err(|e| db_status(e, "can't delete pic ident"))?;
        Ok(())
    }

    pub async fn insert_pic_comment(&self, pc: &PicComment) -> Result<(), Status> {
        pic_comment::Entity::insert(pic_comment_row(pc)?)
            .exec_without_returning(self.conn()?)
            .await
            .map_err(|e| insert_status(e, "can't insert pic comment"))?;
        Ok(())
    }

    pub async fn update_pic_comment(&self, pc: &PicComment) -> Result<(), Status> {
        pic_comment::Entity::update(pic_comment_row(pc)?)
            .exec(self.conn()?)
            .await
            .map_err(|e| db_status(e, "can't update pic comment"))?;
        Ok(())
    }

    pub async fn delete_pic_comment(&self, pic_id: i64, comment_id: i64) -> Result<(), Status> {
        pic_comment::Entity::delete_by_id((pic_id, comment_id))
            .exec(self.conn()?)
            .await
            .map_err(|e| db_status(e, "can't delete pic comment"))?;
        Ok(())
    }

    pub async fn insert_pic_vote(&self, pv: &PicVote) -> Result<(), Status> {
        pic_vote::Entity::insert(pic_vote_row(pv)?)
            .exec_without_returning(self.conn()?)
            .await
            .map_err(|e| insert_status(e, "can't insert pic vote"))?;
        Ok(())
    }

    pub async fn update_pic_vote(&self, pv: &PicVote) -> Result<(), Status> {
        pic_vote::Entity::update(pic_vote_row(pv)?)
            .exec(self.conn()?)
            .await
            .map_err(|e| db_status(e, "can't update pic vote"))?;
        Ok(())
    }

    pub async fn delete_pic_vote(&self, pic_id: i64, user_id: i64) -> Result<(), Status> {
        pic_vote::Entity::delete_by_id((pic_id, user_id))
            .exec(self.conn()?)
            .await
            .map_err(|e| db_status(e, "can't delete pic vote"))?;
        Ok(())
    }

    pub async fn insert_user(&self, u: &User) -> Result<(), Status> {
        user::Entity::insert(user_row(u)?)
            .exec_without_returning(self.conn()?)
            .await
            .map_err(|e| insert_status(e, "can't insert user"))?;
        Ok(())
    }

    pub async fn update_user(&self, u: &User) -> Result<(), Status> {
        user::Entity::update(user_row(u)?)
            .exec(self.conn()?)
            .await
            .map_err(|e| db_status(e, "can't update user"))?;
        Ok(())
    }

    pub async fn delete_user(&self, user_id: i64) -> Result<(), Status> {
        user::Entity::delete_by_id(user_id)
            .exec(self.conn()?)
            .await
            .map_err(|e| db_status(e, "can't delete user"))?;
        Ok(())
    }

    pub async fn lookup_user(&self, user_id: i64, lock: Lock) -> Result<Option<User>, Status> {
        let mut users = self
            .find_users(ScanOpts::prefix(UserId(user_id)).limit(1).lock(lock))
            .await?;
        Ok(users.pop())
    }
}
