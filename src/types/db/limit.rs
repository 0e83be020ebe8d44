use sea_orm::entity::prelude::*;

/// A single named boundary a user can accept or not. Static reference
/// data; rows are only ever written by the idempotent catalog seeder.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "limits")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub subcategory_id: String,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::limit_subcategory::Entity",
        from = "Column::SubcategoryId",
        to = "super::limit_subcategory::Column::Id",
        on_delete = "Cascade"
    )]
    Subcategory,
    #[sea_orm(has_many = "super::user_limit::Entity")]
    UserLimits,
}

impl Related<super::limit_subcategory::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subcategory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
