use sea_orm::entity::prelude::*;

/// The privacy-critical choice ledger. One row per (user, relationship,
/// limit), enforced by a unique index. No query may hand one user's row
/// to the other party; the only cross-user read is the accepted-set
/// intersection computed in `LimitStore::common_limits`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "user_limits")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: String,
    #[sea_orm(indexed)]
    pub relationship_id: String,
    pub limit_id: String,
    pub is_accepted: bool,
    pub note: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
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
        from = "Column::RelationshipId",
        to = "super::relationship::Column::Id",
        on_delete = "Cascade"
    )]
    Relationship,
    #[sea_orm(
        belongs_to = "super::limit::Entity",
        from = "Column::LimitId",
        to = "super::limit::Column::Id",
        on_delete = "Cascade"
    )]
    Limit,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::relationship::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Relationship.def()
    }
}

impl Related<super::limit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Limit.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
