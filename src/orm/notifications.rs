//! SeaORM Entity for notifications table

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Recipient
    pub user_id: i32,
    pub actor_id: i32,
    #[sea_orm(column_name = "type")]
    pub type_: String,
    pub entity_type: String,
    pub entity_id: i32,
    pub is_read: bool,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        panic!("No RelationDef")
    }
}

impl ActiveModelBehavior for ActiveModel {}
