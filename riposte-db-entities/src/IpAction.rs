use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "ip_actions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub ip: String,

    /// Rule name of the most recent observation
    pub last_event: String,

    /// Incremented on every received event, reset to 0 on unblock
    pub attempt_count: i32,

    pub last_attempt_time: DateTime<Utc>,

    pub block_time: Option<DateTime<Utc>>,

    pub unblock_time: Option<DateTime<Utc>>,

    /// `active`, `blocked` or `unblocked`
    pub status: String,

    /// Total number of times this IP has been blocked; never reset
    pub block_count: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
