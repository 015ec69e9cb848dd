//! SeaORM Entity for comments table
//!
//! A comment points at its thread through `(entity_type, entity_id)` and at
//! the comment it answers through `parent_comment_id`. Replies carry the same
//! thread reference as their parent.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "comments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub entity_type: String,
    pub entity_id: i32,
    pub parent_comment_id: Option<i32>,
    #[sea_orm(column_type = "Text")]
    pub body: String,
    pub created_at: DateTime,
}

impl Model {
    pub fn is_reply(&self) -> bool {
        self.parent_comment_id.is_some()
    }
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        panic!("No RelationDef")
    }
}

impl ActiveModelBehavior for ActiveModel {}
