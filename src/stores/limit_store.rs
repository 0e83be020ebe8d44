use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use std::collections::{HashMap, HashSet};

use crate::errors::api::ApiError;
use crate::stores::NotificationStore;
use crate::types::db::{limit, limit_category, limit_subcategory, relationship, user_limit};
use crate::types::internal::notification::NotificationKind;

const MAX_NOTE_CHARS: usize = 500;

/// One entry of a bulk choice upsert
#[derive(Debug, Clone)]
pub struct ChoiceUpdate {
    pub limit_id: String,
    pub is_accepted: bool,
}

/// One matched limit as revealed by the intersection query
#[derive(Debug, Clone)]
pub struct CommonLimitRow {
    pub limit: limit::Model,
    pub category_name: String,
    pub subcategory_name: String,
    /// The caller's own note on this limit, if any
    pub my_note: Option<String>,
    /// The partner's note; present here only because the limit is
    /// matched (both parties accepted)
    pub partner_note: Option<String>,
}

/// LimitStore: the catalog read path plus the privacy-critical choice
/// ledger and matcher
///
/// The one rule every read path in here obeys: a user's individual
/// `user_limits` row is visible to that user alone. The only cross-user
/// read is `common_limits`, which reveals a limit (and the partner's
/// note on it) exclusively when *both* parties marked it accepted.
pub struct LimitStore {
    db: DatabaseConnection,
}

impl LimitStore {
    /// Create a new LimitStore with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The full category / subcategory / limit tree, in display order
    pub async fn catalog(
        &self,
    ) -> Result<
        Vec<(
            limit_category::Model,
            Vec<(limit_subcategory::Model, Vec<limit::Model>)>,
        )>,
        ApiError,
    > {
        let categories = limit_category::Entity::find()
            .order_by_asc(limit_category::Column::SortOrder)
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;
        let subcategories = limit_subcategory::Entity::find()
            .order_by_asc(limit_subcategory::Column::SortOrder)
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;
        let limits = limit::Entity::find()
            .order_by_asc(limit::Column::SortOrder)
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

        Ok(categories
            .into_iter()
            .map(|cat| {
                let subs = subcategories
                    .iter()
                    .filter(|sub| sub.category_id == cat.id)
                    .map(|sub| {
                        let lims = limits
                            .iter()
                            .filter(|lim| lim.subcategory_id == sub.id)
                            .cloned()
                            .collect();
                        (sub.clone(), lims)
                    })
                    .collect();
                (cat, subs)
            })
            .collect())
    }

    /// The caller's own choice rows for one relationship
    ///
    /// Never returns the partner's rows; the partner's side of the
    /// ledger is reachable only through `common_limits`.
    pub async fn my_choices(
        &self,
        user_id: &str,
        relationship_id: &str,
    ) -> Result<Vec<user_limit::Model>, ApiError> {
        Self::relationship_for_party(&self.db, relationship_id, user_id).await?;

        user_limit::Entity::find()
            .filter(user_limit::Column::RelationshipId.eq(relationship_id))
            .filter(user_limit::Column::UserId.eq(user_id))
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))
    }

    /// Bulk upsert of the caller's choices for one relationship
    ///
    /// Applied in a single transaction so rapid repeated toggles resolve
    /// to the last-applied value. Transitions against the partner's
    /// accepted set emit notifications: gaining a common limit notifies
    /// the partner with `new_common_limit`, losing one with
    /// `limit_removed`. A false choice without a note is pruned rather
    /// than stored; a false choice with a note keeps its row.
    pub async fn upsert_choices(
        &self,
        user_id: &str,
        relationship_id: &str,
        choices: Vec<ChoiceUpdate>,
    ) -> Result<(), ApiError> {
        if choices.is_empty() {
            return Ok(());
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| ApiError::internal_error(format!("Failed to start transaction: {}", e)))?;

        let rel = Self::relationship_for_party(&txn, relationship_id, user_id).await?;
        let partner_id = Self::other_party(&rel, user_id);

        // Collapse duplicate limit ids, keeping the last value so a
        // toggled-twice limit lands on its final state.
        let mut order: Vec<String> = Vec::new();
        let mut finals: HashMap<String, bool> = HashMap::new();
        for choice in choices {
            if !finals.contains_key(&choice.limit_id) {
                order.push(choice.limit_id.clone());
            }
            finals.insert(choice.limit_id, choice.is_accepted);
        }

        let known = limit::Entity::find()
            .filter(limit::Column::Id.is_in(order.clone()))
            .all(&txn)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;
        if known.len() != order.len() {
            return Err(ApiError::validation_error("Unknown limit id in request"));
        }
        let names: HashMap<&str, &str> = known
            .iter()
            .map(|lim| (lim.id.as_str(), lim.name.as_str()))
            .collect();

        // The partner's accepted set over the touched limits decides
        // which transitions change a *common* limit.
        let partner_accepted: HashSet<String> = match &partner_id {
            Some(pid) => user_limit::Entity::find()
                .filter(user_limit::Column::RelationshipId.eq(relationship_id))
                .filter(user_limit::Column::UserId.eq(pid.clone()))
                .filter(user_limit::Column::IsAccepted.eq(true))
                .filter(user_limit::Column::LimitId.is_in(order.clone()))
                .all(&txn)
                .await
                .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
                .into_iter()
                .map(|row| row.limit_id)
                .collect(),
            None => HashSet::new(),
        };

        let now = Utc::now().timestamp();
        for limit_id in &order {
            let accepted = finals[limit_id];

            let existing = user_limit::Entity::find()
                .filter(user_limit::Column::UserId.eq(user_id))
                .filter(user_limit::Column::RelationshipId.eq(relationship_id))
                .filter(user_limit::Column::LimitId.eq(limit_id.clone()))
                .one(&txn)
                .await
                .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;
            let prior = existing.as_ref().map(|row| row.is_accepted).unwrap_or(false);

            match (existing, accepted) {
                (Some(row), true) => {
                    if !row.is_accepted {
                        let mut active: user_limit::ActiveModel = row.into();
                        active.is_accepted = Set(true);
                        active.updated_at = Set(now);
                        active.update(&txn).await.map_err(|e| {
                            ApiError::internal_error(format!("Database error: {}", e))
                        })?;
                    }
                }
                (None, true) => {
                    // The unique triple plus on-conflict-update makes a
                    // concurrent duplicate insert collapse into an update.
                    user_limit::Entity::insert(user_limit::ActiveModel {
                        id: sea_orm::ActiveValue::NotSet,
                        user_id: Set(user_id.to_string()),
                        relationship_id: Set(relationship_id.to_string()),
                        limit_id: Set(limit_id.clone()),
                        is_accepted: Set(true),
                        note: Set(None),
                        created_at: Set(now),
                        updated_at: Set(now),
                    })
                    .on_conflict(
                        OnConflict::columns([
                            user_limit::Column::UserId,
                            user_limit::Column::RelationshipId,
                            user_limit::Column::LimitId,
                        ])
                        .update_columns([
                            user_limit::Column::IsAccepted,
                            user_limit::Column::UpdatedAt,
                        ])
                        .to_owned(),
                    )
                    .exec_without_returning(&txn)
                    .await
                    .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;
                }
                (Some(row), false) => {
                    if row.note.is_some() {
                        // The note outlives the acceptance flag.
                        let mut active: user_limit::ActiveModel = row.into();
                        active.is_accepted = Set(false);
                        active.updated_at = Set(now);
                        active.update(&txn).await.map_err(|e| {
                            ApiError::internal_error(format!("Database error: {}", e))
                        })?;
                    } else {
                        user_limit::Entity::delete_by_id(row.id)
                            .exec(&txn)
                            .await
                            .map_err(|e| {
                                ApiError::internal_error(format!("Database error: {}", e))
                            })?;
                    }
                }
                (None, false) => {}
            }

            if let Some(pid) = &partner_id {
                if partner_accepted.contains(limit_id) && prior != accepted {
                    let name = names.get(limit_id.as_str()).copied().unwrap_or("");
                    if accepted {
                        NotificationStore::insert_on(
                            &txn,
                            pid,
                            NotificationKind::NewCommonLimit,
                            "Nouvelle limite en commun",
                            format!("Vous partagez désormais « {} »", name),
                            Some(user_id.to_string()),
                            Some(relationship_id.to_string()),
                        )
                        .await?;
                    } else {
                        NotificationStore::insert_on(
                            &txn,
                            pid,
                            NotificationKind::LimitRemoved,
                            "Limite retirée",
                            format!("« {} » n'est plus une limite en commun", name),
                            Some(user_id.to_string()),
                            Some(relationship_id.to_string()),
                        )
                        .await?;
                    }
                }
            }
        }

        txn.commit()
            .await
            .map_err(|e| ApiError::internal_error(format!("Failed to commit transaction: {}", e)))?;

        Ok(())
    }

    /// Set or replace the caller's private note on a limit
    ///
    /// Independent of the acceptance flag. A note that trims to empty is
    /// treated as a delete request; a note over 500 characters is
    /// rejected. Whitespace is never stored.
    pub async fn upsert_note(
        &self,
        user_id: &str,
        relationship_id: &str,
        limit_id: &str,
        note: &str,
    ) -> Result<(), ApiError> {
        let trimmed = note.trim();
        if trimmed.is_empty() {
            return self.delete_note(user_id, relationship_id, limit_id).await;
        }
        if trimmed.chars().count() > MAX_NOTE_CHARS {
            return Err(ApiError::validation_error(format!(
                "Note must be at most {} characters",
                MAX_NOTE_CHARS
            )));
        }

        Self::relationship_for_party(&self.db, relationship_id, user_id).await?;

        limit::Entity::find_by_id(limit_id)
            .one(&self.db)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
            .ok_or_else(|| ApiError::not_found("Limit"))?;

        let now = Utc::now().timestamp();
        user_limit::Entity::insert(user_limit::ActiveModel {
            id: sea_orm::ActiveValue::NotSet,
            user_id: Set(user_id.to_string()),
            relationship_id: Set(relationship_id.to_string()),
            limit_id: Set(limit_id.to_string()),
            is_accepted: Set(false),
            note: Set(Some(trimmed.to_string())),
            created_at: Set(now),
            updated_at: Set(now),
        })
        .on_conflict(
            OnConflict::columns([
                user_limit::Column::UserId,
                user_limit::Column::RelationshipId,
                user_limit::Column::LimitId,
            ])
            .update_columns([user_limit::Column::Note, user_limit::Column::UpdatedAt])
            .to_owned(),
        )
        .exec_without_returning(&self.db)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

        Ok(())
    }

    /// Clear the caller's note on a limit
    ///
    /// If the row carries no acceptance either, it is deleted on the
    /// spot: with both gone there is no information left to retain.
    pub async fn delete_note(
        &self,
        user_id: &str,
        relationship_id: &str,
        limit_id: &str,
    ) -> Result<(), ApiError> {
        Self::relationship_for_party(&self.db, relationship_id, user_id).await?;

        let existing = user_limit::Entity::find()
            .filter(user_limit::Column::UserId.eq(user_id))
            .filter(user_limit::Column::RelationshipId.eq(relationship_id))
            .filter(user_limit::Column::LimitId.eq(limit_id))
            .one(&self.db)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

        let Some(row) = existing else {
            return Ok(());
        };

        if row.is_accepted {
            let mut active: user_limit::ActiveModel = row.into();
            active.note = Set(None);
            active.updated_at = Set(Utc::now().timestamp());
            active
                .update(&self.db)
                .await
                .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;
        } else {
            user_limit::Entity::delete_by_id(row.id)
                .exec(&self.db)
                .await
                .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;
        }

        Ok(())
    }

    /// The privacy-critical intersection
    ///
    /// Returns exactly the limits where both parties' rows exist with
    /// `is_accepted = true`, joined to the catalog for display. The
    /// partner's note rides along only on these matched rows; nothing
    /// about the partner's unmatched choices (neither flag nor note)
    /// leaves this query.
    pub async fn common_limits(
        &self,
        relationship_id: &str,
        caller_id: &str,
    ) -> Result<Vec<CommonLimitRow>, ApiError> {
        let rel = Self::relationship_for_party(&self.db, relationship_id, caller_id).await?;
        let Some(partner_id) = Self::other_party(&rel, caller_id) else {
            return Ok(Vec::new());
        };

        let mine = user_limit::Entity::find()
            .filter(user_limit::Column::RelationshipId.eq(relationship_id))
            .filter(user_limit::Column::UserId.eq(caller_id))
            .filter(user_limit::Column::IsAccepted.eq(true))
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;
        let theirs = user_limit::Entity::find()
            .filter(user_limit::Column::RelationshipId.eq(relationship_id))
            .filter(user_limit::Column::UserId.eq(partner_id))
            .filter(user_limit::Column::IsAccepted.eq(true))
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

        let their_notes: HashMap<&str, &Option<String>> = theirs
            .iter()
            .map(|row| (row.limit_id.as_str(), &row.note))
            .collect();

        let matched: Vec<&user_limit::Model> = mine
            .iter()
            .filter(|row| their_notes.contains_key(row.limit_id.as_str()))
            .collect();
        if matched.is_empty() {
            return Ok(Vec::new());
        }

        let limit_ids: Vec<String> = matched.iter().map(|row| row.limit_id.clone()).collect();
        let limits = limit::Entity::find()
            .filter(limit::Column::Id.is_in(limit_ids))
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;
        let subcategories = limit_subcategory::Entity::find()
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;
        let categories = limit_category::Entity::find()
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

        let mut rows: Vec<(i32, i32, i32, CommonLimitRow)> = Vec::new();
        for row in matched {
            let Some(lim) = limits.iter().find(|l| l.id == row.limit_id) else {
                continue;
            };
            let Some(sub) = subcategories.iter().find(|s| s.id == lim.subcategory_id) else {
                continue;
            };
            let Some(cat) = categories.iter().find(|c| c.id == sub.category_id) else {
                continue;
            };
            rows.push((
                cat.sort_order,
                sub.sort_order,
                lim.sort_order,
                CommonLimitRow {
                    limit: lim.clone(),
                    category_name: cat.name.clone(),
                    subcategory_name: sub.name.clone(),
                    my_note: row.note.clone(),
                    partner_note: their_notes
                        .get(row.limit_id.as_str())
                        .map(|n| (*n).clone())
                        .unwrap_or(None),
                },
            ));
        }
        rows.sort_by_key(|(c, s, l, _)| (*c, *s, *l));

        Ok(rows.into_iter().map(|(_, _, _, row)| row).collect())
    }

    fn other_party(rel: &relationship::Model, user_id: &str) -> Option<String> {
        if rel.inviter_id == user_id {
            rel.invitee_id.clone()
        } else {
            Some(rel.inviter_id.clone())
        }
    }

    async fn relationship_for_party<C: ConnectionTrait>(
        conn: &C,
        relationship_id: &str,
        user_id: &str,
    ) -> Result<relationship::Model, ApiError> {
        let rel = relationship::Entity::find_by_id(relationship_id)
            .one(conn)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
            .ok_or_else(|| ApiError::not_found("Relationship"))?;

        if rel.inviter_id != user_id && rel.invitee_id.as_deref() != Some(user_id) {
            return Err(ApiError::forbidden());
        }

        Ok(rel)
    }
}

impl std::fmt::Debug for LimitStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LimitStore").field("db", &"<connection>").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::catalog;
    use crate::stores::RelationshipStore;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{Database, PaginatorTrait};

    struct Fixture {
        db: DatabaseConnection,
        store: LimitStore,
        relationship_id: String,
        limit_ids: Vec<String>,
    }

    /// Two users in an accepted relationship over a seeded catalog
    async fn setup() -> Fixture {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to create test database");

        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");
        catalog::seed(&db).await.expect("Failed to seed catalog");

        for (id, email, name) in [
            ("user-a", "alice@example.org", "Alice"),
            ("user-b", "bob@example.org", "Bob"),
            ("user-c", "carol@example.org", "Carol"),
        ] {
            crate::types::db::user::ActiveModel {
                id: Set(id.to_string()),
                email: Set(email.to_string()),
                display_name: Set(name.to_string()),
                avatar_url: Set(None),
                auth_provider: Set("magic_link".to_string()),
                created_at: Set(0),
                updated_at: Set(0),
            }
            .insert(&db)
            .await
            .expect("Failed to seed user");
        }

        let relationships = RelationshipStore::new(db.clone());
        let rel = relationships.create_invitation("user-a").await.unwrap();
        let rel = relationships.accept(&rel.invite_token, "user-b").await.unwrap();

        let limit_ids = limit::Entity::find()
            .order_by_asc(limit::Column::Id)
            .all(&db)
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.id)
            .collect();

        Fixture {
            store: LimitStore::new(db.clone()),
            db,
            relationship_id: rel.id,
            limit_ids,
        }
    }

    fn accept(limit_id: &str) -> ChoiceUpdate {
        ChoiceUpdate {
            limit_id: limit_id.to_string(),
            is_accepted: true,
        }
    }

    fn clear(limit_id: &str) -> ChoiceUpdate {
        ChoiceUpdate {
            limit_id: limit_id.to_string(),
            is_accepted: false,
        }
    }

    async fn feed_kinds(db: &DatabaseConnection, user_id: &str) -> Vec<String> {
        NotificationStore::new(db.clone())
            .list(user_id)
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.kind)
            .collect()
    }

    #[tokio::test]
    async fn test_catalog_tree_is_ordered_and_complete() {
        let fx = setup().await;

        let tree = fx.store.catalog().await.unwrap();

        assert!(!tree.is_empty());
        let orders: Vec<i32> = tree.iter().map(|(c, _)| c.sort_order).collect();
        let mut sorted = orders.clone();
        sorted.sort();
        assert_eq!(orders, sorted);

        let total: usize = tree
            .iter()
            .flat_map(|(_, subs)| subs.iter())
            .map(|(_, lims)| lims.len())
            .sum();
        assert_eq!(total, fx.limit_ids.len());
    }

    #[tokio::test]
    async fn test_upsert_then_my_choices_roundtrip() {
        let fx = setup().await;
        let (l1, l2) = (&fx.limit_ids[0], &fx.limit_ids[1]);

        fx.store
            .upsert_choices("user-a", &fx.relationship_id, vec![accept(l1), accept(l2)])
            .await
            .unwrap();
        fx.store
            .upsert_choices("user-a", &fx.relationship_id, vec![clear(l2)])
            .await
            .unwrap();

        let mine = fx.store.my_choices("user-a", &fx.relationship_id).await.unwrap();
        let accepted: Vec<&str> = mine
            .iter()
            .filter(|row| row.is_accepted)
            .map(|row| row.limit_id.as_str())
            .collect();

        assert_eq!(accepted, vec![l1.as_str()]);
        // The cleared, note-less row was pruned entirely.
        assert_eq!(mine.len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_toggle_in_one_batch_lands_on_last_value() {
        let fx = setup().await;
        let l1 = &fx.limit_ids[0];

        fx.store
            .upsert_choices(
                "user-a",
                &fx.relationship_id,
                vec![accept(l1), clear(l1), accept(l1)],
            )
            .await
            .unwrap();

        let mine = fx.store.my_choices("user-a", &fx.relationship_id).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert!(mine[0].is_accepted);

        // Still exactly one row for the triple.
        assert_eq!(
            user_limit::Entity::find().count(&fx.db).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_unknown_limit_id_is_rejected() {
        let fx = setup().await;

        let result = fx
            .store
            .upsert_choices(
                "user-a",
                &fx.relationship_id,
                vec![accept("lim_does_not_exist")],
            )
            .await;

        assert!(matches!(result, Err(ApiError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_choices_require_party() {
        let fx = setup().await;
        let l1 = &fx.limit_ids[0];

        let outsider_write = fx
            .store
            .upsert_choices("user-c", &fx.relationship_id, vec![accept(l1)])
            .await;
        assert!(matches!(outsider_write, Err(ApiError::Forbidden(_))));

        let outsider_read = fx.store.my_choices("user-c", &fx.relationship_id).await;
        assert!(matches!(outsider_read, Err(ApiError::Forbidden(_))));

        let outsider_match = fx.store.common_limits(&fx.relationship_id, "user-c").await;
        assert!(matches!(outsider_match, Err(ApiError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_common_limits_is_the_intersection() {
        let fx = setup().await;
        let (l1, l2, l3) = (&fx.limit_ids[0], &fx.limit_ids[1], &fx.limit_ids[2]);

        fx.store
            .upsert_choices(
                "user-a",
                &fx.relationship_id,
                vec![accept(l1), accept(l2)],
            )
            .await
            .unwrap();
        fx.store
            .upsert_choices(
                "user-b",
                &fx.relationship_id,
                vec![accept(l2), accept(l3)],
            )
            .await
            .unwrap();

        let for_a = fx.store.common_limits(&fx.relationship_id, "user-a").await.unwrap();
        let for_b = fx.store.common_limits(&fx.relationship_id, "user-b").await.unwrap();

        assert_eq!(for_a.len(), 1);
        assert_eq!(for_a[0].limit.id, *l2);
        // The intersection is symmetric.
        assert_eq!(for_b.len(), 1);
        assert_eq!(for_b[0].limit.id, *l2);
    }

    #[tokio::test]
    async fn test_disjoint_choices_reveal_nothing() {
        let fx = setup().await;

        // A accepts ten limits; B accepts none of them.
        let ten: Vec<ChoiceUpdate> = fx.limit_ids.iter().take(10).map(|l| accept(l)).collect();
        fx.store
            .upsert_choices("user-a", &fx.relationship_id, ten)
            .await
            .unwrap();

        let for_a = fx.store.common_limits(&fx.relationship_id, "user-a").await.unwrap();
        let for_b = fx.store.common_limits(&fx.relationship_id, "user-b").await.unwrap();
        assert!(for_a.is_empty());
        assert!(for_b.is_empty());

        // B's own view of the ledger contains none of A's rows.
        let b_rows = fx.store.my_choices("user-b", &fx.relationship_id).await.unwrap();
        assert!(b_rows.is_empty());
    }

    #[tokio::test]
    async fn test_partner_note_is_visible_only_on_matched_limits() {
        let fx = setup().await;
        let (l1, l2) = (&fx.limit_ids[0], &fx.limit_ids[1]);

        // A accepts both and writes notes on both; B matches only l1.
        fx.store
            .upsert_choices("user-a", &fx.relationship_id, vec![accept(l1), accept(l2)])
            .await
            .unwrap();
        fx.store
            .upsert_note("user-a", &fx.relationship_id, l1, "note partagée")
            .await
            .unwrap();
        fx.store
            .upsert_note("user-a", &fx.relationship_id, l2, "note secrète")
            .await
            .unwrap();
        fx.store
            .upsert_choices("user-b", &fx.relationship_id, vec![accept(l1)])
            .await
            .unwrap();

        let for_b = fx.store.common_limits(&fx.relationship_id, "user-b").await.unwrap();

        assert_eq!(for_b.len(), 1);
        assert_eq!(for_b[0].partner_note.as_deref(), Some("note partagée"));
        // Nothing in the response mentions the unmatched limit or its note.
        assert!(for_b.iter().all(|row| row.limit.id != *l2));
    }

    #[tokio::test]
    async fn test_new_common_limit_notifies_partner() {
        let fx = setup().await;
        let l1 = &fx.limit_ids[0];

        fx.store
            .upsert_choices("user-b", &fx.relationship_id, vec![accept(l1)])
            .await
            .unwrap();
        // No match yet, no notification.
        assert!(feed_kinds(&fx.db, "user-b").await.is_empty());

        fx.store
            .upsert_choices("user-a", &fx.relationship_id, vec![accept(l1)])
            .await
            .unwrap();

        // The partner whose earlier acceptance just became common is told.
        assert_eq!(feed_kinds(&fx.db, "user-b").await, vec!["new_common_limit"]);
        // The actor is not notified about their own change.
        assert!(feed_kinds(&fx.db, "user-a").await.is_empty());
    }

    #[tokio::test]
    async fn test_removing_a_common_limit_notifies_partner() {
        let fx = setup().await;
        let l1 = &fx.limit_ids[0];

        fx.store
            .upsert_choices("user-a", &fx.relationship_id, vec![accept(l1)])
            .await
            .unwrap();
        fx.store
            .upsert_choices("user-b", &fx.relationship_id, vec![accept(l1)])
            .await
            .unwrap();
        assert_eq!(feed_kinds(&fx.db, "user-a").await, vec!["new_common_limit"]);

        fx.store
            .upsert_choices("user-b", &fx.relationship_id, vec![clear(l1)])
            .await
            .unwrap();

        let mut kinds = feed_kinds(&fx.db, "user-a").await;
        kinds.sort();
        assert_eq!(kinds, vec!["limit_removed", "new_common_limit"]);
        let for_a = fx.store.common_limits(&fx.relationship_id, "user-a").await.unwrap();
        let for_b = fx.store.common_limits(&fx.relationship_id, "user-b").await.unwrap();
        assert!(for_a.is_empty());
        assert!(for_b.is_empty());
    }

    #[tokio::test]
    async fn test_clearing_a_non_common_limit_stays_silent() {
        let fx = setup().await;
        let l1 = &fx.limit_ids[0];

        fx.store
            .upsert_choices("user-a", &fx.relationship_id, vec![accept(l1)])
            .await
            .unwrap();
        fx.store
            .upsert_choices("user-a", &fx.relationship_id, vec![clear(l1)])
            .await
            .unwrap();

        assert!(feed_kinds(&fx.db, "user-b").await.is_empty());
    }

    #[tokio::test]
    async fn test_note_survives_clearing_acceptance() {
        let fx = setup().await;
        let l1 = &fx.limit_ids[0];

        fx.store
            .upsert_choices("user-a", &fx.relationship_id, vec![accept(l1)])
            .await
            .unwrap();
        fx.store
            .upsert_note("user-a", &fx.relationship_id, l1, "à discuter")
            .await
            .unwrap();
        fx.store
            .upsert_choices("user-a", &fx.relationship_id, vec![clear(l1)])
            .await
            .unwrap();

        let mine = fx.store.my_choices("user-a", &fx.relationship_id).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert!(!mine[0].is_accepted);
        assert_eq!(mine[0].note.as_deref(), Some("à discuter"));
    }

    #[tokio::test]
    async fn test_delete_note_prunes_row_when_not_accepted() {
        let fx = setup().await;
        let l1 = &fx.limit_ids[0];

        fx.store
            .upsert_note("user-a", &fx.relationship_id, l1, "brouillon")
            .await
            .unwrap();
        fx.store
            .delete_note("user-a", &fx.relationship_id, l1)
            .await
            .unwrap();

        assert!(fx
            .store
            .my_choices("user-a", &fx.relationship_id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_delete_note_keeps_accepted_row() {
        let fx = setup().await;
        let l1 = &fx.limit_ids[0];

        fx.store
            .upsert_choices("user-a", &fx.relationship_id, vec![accept(l1)])
            .await
            .unwrap();
        fx.store
            .upsert_note("user-a", &fx.relationship_id, l1, "à discuter")
            .await
            .unwrap();
        fx.store
            .delete_note("user-a", &fx.relationship_id, l1)
            .await
            .unwrap();

        let mine = fx.store.my_choices("user-a", &fx.relationship_id).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert!(mine[0].is_accepted);
        assert!(mine[0].note.is_none());
    }

    #[tokio::test]
    async fn test_note_boundary_500_and_501() {
        let fx = setup().await;
        let l1 = &fx.limit_ids[0];

        let exactly_500 = "x".repeat(500);
        fx.store
            .upsert_note("user-a", &fx.relationship_id, l1, &exactly_500)
            .await
            .expect("500-char note must be accepted");

        let too_long = "x".repeat(501);
        let result = fx
            .store
            .upsert_note("user-a", &fx.relationship_id, l1, &too_long)
            .await;
        assert!(matches!(result, Err(ApiError::ValidationError(_))));

        let mine = fx.store.my_choices("user-a", &fx.relationship_id).await.unwrap();
        assert_eq!(mine[0].note.as_deref(), Some(exactly_500.as_str()));
    }

    #[tokio::test]
    async fn test_whitespace_note_acts_as_delete() {
        let fx = setup().await;
        let l1 = &fx.limit_ids[0];

        fx.store
            .upsert_note("user-a", &fx.relationship_id, l1, "quelque chose")
            .await
            .unwrap();
        fx.store
            .upsert_note("user-a", &fx.relationship_id, l1, "   ")
            .await
            .unwrap();

        assert!(fx
            .store
            .my_choices("user-a", &fx.relationship_id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_pending_relationship_has_no_common_limits() {
        let fx = setup().await;

        let relationships = RelationshipStore::new(fx.db.clone());
        let pending = relationships.create_invitation("user-a").await.unwrap();

        let result = fx.store.common_limits(&pending.id, "user-a").await.unwrap();
        assert!(result.is_empty());
    }
}
