use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Users::Email)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::DisplayName).string().not_null())
                    .col(ColumnDef::new(Users::AvatarUrl).string().null())
                    .col(
                        ColumnDef::new(Users::AuthProvider)
                            .string()
                            .not_null()
                            .default("magic_link"),
                    )
                    .col(ColumnDef::new(Users::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(Users::UpdatedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_users_email")
                    .table(Users::Table)
                    .col(Users::Email)
                    .to_owned(),
            )
            .await?;

        // Create magic_links table. Rows are never deleted proactively;
        // expiry and the used flag make them permanently invalid.
        manager
            .create_table(
                Table::create()
                    .table(MagicLinks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MagicLinks::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MagicLinks::Email).string().not_null())
                    .col(
                        ColumnDef::new(MagicLinks::Token)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(MagicLinks::ExpiresAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MagicLinks::Used)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(MagicLinks::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_magic_links_email")
                    .table(MagicLinks::Table)
                    .col(MagicLinks::Email)
                    .to_owned(),
            )
            .await?;

        // Create devices table. Only the keyed hash of the refresh token
        // is stored; the plaintext token never touches the database.
        manager
            .create_table(
                Table::create()
                    .table(Devices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Devices::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Devices::UserId).string().not_null())
                    .col(ColumnDef::new(Devices::Label).string().not_null())
                    .col(
                        ColumnDef::new(Devices::TokenHash)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Devices::CreatedAt).big_integer().not_null())
                    .col(
                        ColumnDef::new(Devices::LastSeenAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Devices::ExpiresAt).big_integer().not_null())
                    .col(
                        ColumnDef::new(Devices::Revoked)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_devices_user_id")
                            .from(Devices::Table, Devices::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_devices_user_id")
                    .table(Devices::Table)
                    .col(Devices::UserId)
                    .to_owned(),
            )
            .await?;

        // Create sessions table. Only populated under the "tracked"
        // session policy; row id doubles as the JWT jti claim.
        manager
            .create_table(
                Table::create()
                    .table(Sessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Sessions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Sessions::UserId).string().not_null())
                    .col(
                        ColumnDef::new(Sessions::ExpiresAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Sessions::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sessions_user_id")
                            .from(Sessions::Table, Sessions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create relationships table
        manager
            .create_table(
                Table::create()
                    .table(Relationships::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Relationships::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Relationships::InviterId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Relationships::InviteeId).string().null())
                    .col(
                        ColumnDef::new(Relationships::InviteToken)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Relationships::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Relationships::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Relationships::UpdatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_relationships_inviter_id")
                            .from(Relationships::Table, Relationships::InviterId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_relationships_invitee_id")
                            .from(Relationships::Table, Relationships::InviteeId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_relationships_inviter_id")
                    .table(Relationships::Table)
                    .col(Relationships::InviterId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_relationships_invitee_id")
                    .table(Relationships::Table)
                    .col(Relationships::InviteeId)
                    .to_owned(),
            )
            .await?;

        // Create the static limit catalog: categories, subcategories,
        // limits. Ids are content-derived so seeding stays idempotent.
        manager
            .create_table(
                Table::create()
                    .table(LimitCategories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LimitCategories::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LimitCategories::Name).string().not_null())
                    .col(
                        ColumnDef::new(LimitCategories::SortOrder)
                            .integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LimitSubcategories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LimitSubcategories::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(LimitSubcategories::CategoryId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LimitSubcategories::Name)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LimitSubcategories::SortOrder)
                            .integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_limit_subcategories_category_id")
                            .from(
                                LimitSubcategories::Table,
                                LimitSubcategories::CategoryId,
                            )
                            .to(LimitCategories::Table, LimitCategories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Limits::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Limits::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Limits::SubcategoryId).string().not_null())
                    .col(ColumnDef::new(Limits::Name).string().not_null())
                    .col(ColumnDef::new(Limits::Description).string().null())
                    .col(ColumnDef::new(Limits::SortOrder).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_limits_subcategory_id")
                            .from(Limits::Table, Limits::SubcategoryId)
                            .to(LimitSubcategories::Table, LimitSubcategories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create user_limits table. The unique triple is the enforcement
        // mechanism for "one choice per user per relationship per limit".
        manager
            .create_table(
                Table::create()
                    .table(UserLimits::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserLimits::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UserLimits::UserId).string().not_null())
                    .col(
                        ColumnDef::new(UserLimits::RelationshipId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(UserLimits::LimitId).string().not_null())
                    .col(
                        ColumnDef::new(UserLimits::IsAccepted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(UserLimits::Note).string().null())
                    .col(
                        ColumnDef::new(UserLimits::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UserLimits::UpdatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_limits_user_id")
                            .from(UserLimits::Table, UserLimits::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_limits_relationship_id")
                            .from(UserLimits::Table, UserLimits::RelationshipId)
                            .to(Relationships::Table, Relationships::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_limits_limit_id")
                            .from(UserLimits::Table, UserLimits::LimitId)
                            .to(Limits::Table, Limits::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_user_limits_unique_choice")
                    .table(UserLimits::Table)
                    .col(UserLimits::UserId)
                    .col(UserLimits::RelationshipId)
                    .col(UserLimits::LimitId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_user_limits_relationship_id")
                    .table(UserLimits::Table)
                    .col(UserLimits::RelationshipId)
                    .to_owned(),
            )
            .await?;

        // Create notifications table
        manager
            .create_table(
                Table::create()
                    .table(Notifications::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Notifications::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Notifications::UserId).string().not_null())
                    .col(ColumnDef::new(Notifications::Kind).string().not_null())
                    .col(ColumnDef::new(Notifications::Title).string().not_null())
                    .col(ColumnDef::new(Notifications::Message).string().not_null())
                    .col(
                        ColumnDef::new(Notifications::RelatedUserId)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Notifications::RelatedRelationshipId)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Notifications::IsRead)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Notifications::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notifications_user_id")
                            .from(Notifications::Table, Notifications::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notifications_related_relationship_id")
                            .from(
                                Notifications::Table,
                                Notifications::RelatedRelationshipId,
                            )
                            .to(Relationships::Table, Relationships::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_notifications_user_id")
                    .table(Notifications::Table)
                    .col(Notifications::UserId)
                    .to_owned(),
            )
            .await?;

        // Create blocked_users table
        manager
            .create_table(
                Table::create()
                    .table(BlockedUsers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BlockedUsers::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BlockedUsers::BlockerId).string().not_null())
                    .col(ColumnDef::new(BlockedUsers::BlockedId).string().not_null())
                    .col(
                        ColumnDef::new(BlockedUsers::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_blocked_users_blocker_id")
                            .from(BlockedUsers::Table, BlockedUsers::BlockerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_blocked_users_blocked_id")
                            .from(BlockedUsers::Table, BlockedUsers::BlockedId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_blocked_users_unique_pair")
                    .table(BlockedUsers::Table)
                    .col(BlockedUsers::BlockerId)
                    .col(BlockedUsers::BlockedId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BlockedUsers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Notifications::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserLimits::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Limits::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LimitSubcategories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LimitCategories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Relationships::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Sessions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Devices::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(MagicLinks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Email,
    DisplayName,
    AvatarUrl,
    AuthProvider,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum MagicLinks {
    Table,
    Id,
    Email,
    Token,
    ExpiresAt,
    Used,
    CreatedAt,
}

#[derive(Iden)]
enum Devices {
    Table,
    Id,
    UserId,
    Label,
    TokenHash,
    CreatedAt,
    LastSeenAt,
    ExpiresAt,
    Revoked,
}

#[derive(Iden)]
enum Sessions {
    Table,
    Id,
    UserId,
    ExpiresAt,
    CreatedAt,
}

#[derive(Iden)]
enum Relationships {
    Table,
    Id,
    InviterId,
    InviteeId,
    InviteToken,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum LimitCategories {
    Table,
    Id,
    Name,
    SortOrder,
}

#[derive(Iden)]
enum LimitSubcategories {
    Table,
    Id,
    CategoryId,
    Name,
    SortOrder,
}

#[derive(Iden)]
enum Limits {
    Table,
    Id,
    SubcategoryId,
    Name,
    Description,
    SortOrder,
}

#[derive(Iden)]
enum UserLimits {
    Table,
    Id,
    UserId,
    RelationshipId,
    LimitId,
    IsAccepted,
    Note,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Notifications {
    Table,
    Id,
    UserId,
    Kind,
    Title,
    Message,
    RelatedUserId,
    RelatedRelationshipId,
    IsRead,
    CreatedAt,
}

#[derive(Iden)]
enum BlockedUsers {
    Table,
    Id,
    BlockerId,
    BlockedId,
    CreatedAt,
}
