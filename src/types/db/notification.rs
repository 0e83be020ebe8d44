use sea_orm::entity::prelude::*;

/// User-addressed event record, created server-side as a side effect of
/// relationship and limit-choice transitions. Only the recipient mutates
/// it (marking read); deletion happens via user/relationship cascades.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(indexed)]
    pub user_id: String,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub related_user_id: Option<String>,
    pub related_relationship_id: Option<String>,
    pub is_read: bool,
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::relationship::Entity",
        from = "Column::RelatedRelationshipId",
        to = "super::relationship::Column::Id",
        on_delete = "Cascade"
    )]
    RelatedRelationship,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
