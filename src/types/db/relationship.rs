use sea_orm::entity::prelude::*;

/// Pairing between two users. `invitee_id` stays null until the
/// invitation is accepted; `status` is one of pending / accepted /
/// declined / blocked (see `RelationshipStatus`).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "relationships")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(indexed)]
    pub inviter_id: String,
    #[sea_orm(indexed)]
    pub invitee_id: Option<String>,
    #[sea_orm(unique)]
    pub invite_token: String,
    pub status: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::InviterId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Inviter,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::InviteeId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Invitee,
    #[sea_orm(has_many = "super::user_limit::Entity")]
    UserLimits,
}

impl Related<super::user_limit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserLimits.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
