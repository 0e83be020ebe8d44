use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, Set, TransactionTrait,
};
use tokio::sync::OnceCell;

use crate::services::crypto::stable_id;
use crate::types::db::{limit, limit_category, limit_subcategory, user_limit};

type LimitDef = (&'static str, Option<&'static str>);
type SubcategoryDef = (&'static str, &'static [LimitDef]);
type CategoryDef = (&'static str, &'static [SubcategoryDef]);

/// Built-in catalog: category -> subcategories -> limits, in display
/// order. Reference data only; users never write to these tables.
const CATALOG: &[CategoryDef] = &[
    (
        "Communication",
        &[
            (
                "Messages",
                &[
                    ("Surnoms affectueux", None),
                    ("Messages quotidiens", None),
                    ("Appels vidéo", None),
                    ("Messages vocaux", None),
                ],
            ),
            (
                "Réseaux sociaux",
                &[
                    ("Publier des photos de nous", None),
                    ("Statut de couple visible", None),
                    ("Commenter ses publications", None),
                ],
            ),
        ],
    ),
    (
        "Affection en public",
        &[
            (
                "Gestes",
                &[
                    ("Se tenir la main", None),
                    ("S'embrasser en public", None),
                    ("Se prendre dans les bras", None),
                ],
            ),
            (
                "Présentations",
                &[
                    ("Rencontrer les amis", None),
                    ("Rencontrer la famille", None),
                    ("Événements en couple", Some("Mariages, anniversaires, fêtes")),
                ],
            ),
        ],
    ),
    (
        "Intimité",
        &[
            (
                "Contact physique",
                &[
                    ("Massages", None),
                    ("Dormir ensemble", None),
                    ("Câlins prolongés", None),
                ],
            ),
            (
                "Sexualité",
                &[
                    ("Rapports protégés uniquement", None),
                    ("Sextos", None),
                    ("Photos intimes", Some("Jamais stockées sans accord explicite")),
                ],
            ),
        ],
    ),
    (
        "Vie quotidienne",
        &[
            (
                "Partage",
                &[
                    ("Partager la localisation", None),
                    ("Partager les mots de passe", None),
                    ("Vêtements en commun", None),
                ],
            ),
            (
                "Temps ensemble",
                &[
                    ("Week-ends en couple", None),
                    ("Vacances ensemble", None),
                    ("Soirées séparées entre amis", None),
                ],
            ),
        ],
    ),
];

static SEED_GUARD: OnceCell<()> = OnceCell::const_new();

/// Seed the catalog exactly once per process
///
/// Concurrent in-process callers all await the same initialization; the
/// insert-or-ignore semantics of `seed` cover concurrent cold starts in
/// separate processes.
pub async fn ensure_seeded(db: &DatabaseConnection) -> Result<(), DbErr> {
    SEED_GUARD
        .get_or_try_init(|| async { seed(db).await })
        .await?;
    Ok(())
}

/// Idempotent catalog seeding
///
/// Every row id is derived from the name path, so re-running (even from
/// racing processes) inserts nothing new: each insert carries
/// ON CONFLICT DO NOTHING on the primary key.
pub async fn seed<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    for (cat_order, (cat_name, subcategories)) in CATALOG.iter().enumerate() {
        let cat_id = stable_id("cat", cat_name);

        limit_category::Entity::insert(limit_category::ActiveModel {
            id: Set(cat_id.clone()),
            name: Set((*cat_name).to_string()),
            sort_order: Set(cat_order as i32),
        })
        .on_conflict(
            OnConflict::column(limit_category::Column::Id)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

        for (sub_order, (sub_name, limits)) in subcategories.iter().enumerate() {
            let sub_path = format!("{}/{}", cat_name, sub_name);
            let sub_id = stable_id("sub", &sub_path);

            limit_subcategory::Entity::insert(limit_subcategory::ActiveModel {
                id: Set(sub_id.clone()),
                category_id: Set(cat_id.clone()),
                name: Set((*sub_name).to_string()),
                sort_order: Set(sub_order as i32),
            })
            .on_conflict(
                OnConflict::column(limit_subcategory::Column::Id)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;

            for (lim_order, (lim_name, description)) in limits.iter().enumerate() {
                let lim_path = format!("{}/{}", sub_path, lim_name);

                limit::Entity::insert(limit::ActiveModel {
                    id: Set(stable_id("lim", &lim_path)),
                    subcategory_id: Set(sub_id.clone()),
                    name: Set((*lim_name).to_string()),
                    description: Set(description.map(str::to_string)),
                    sort_order: Set(lim_order as i32),
                })
                .on_conflict(OnConflict::column(limit::Column::Id).do_nothing().to_owned())
                .exec_without_returning(db)
                .await?;
            }
        }
    }

    Ok(())
}

/// Outcome of a duplicate-repair pass
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RepairReport {
    /// Duplicate catalog rows merged into their canonical row
    pub merged: usize,
    /// Limit choices dropped because remapping them would have collided
    /// with an existing choice on the canonical limit
    pub dropped_choices: usize,
}

/// Merge catalog rows created by a legacy non-deterministic seeding scheme
///
/// A duplicate is a row whose id differs from the stable id of its name
/// path. Repair re-homes children (and `user_limits` references) onto the
/// canonical row, dropping any choice whose remap would violate the
/// (user, relationship, limit) uniqueness constraint, then deletes the
/// duplicate. Runs in a single transaction.
pub async fn repair_duplicates(db: &DatabaseConnection) -> Result<RepairReport, DbErr> {
    let txn = db.begin().await?;
    let mut report = RepairReport::default();

    // Categories first so the canonical parents exist before children move.
    let categories = limit_category::Entity::find().all(&txn).await?;
    for cat in &categories {
        let canonical = stable_id("cat", &cat.name);
        if cat.id == canonical {
            continue;
        }

        limit_category::Entity::insert(limit_category::ActiveModel {
            id: Set(canonical.clone()),
            name: Set(cat.name.clone()),
            sort_order: Set(cat.sort_order),
        })
        .on_conflict(
            OnConflict::column(limit_category::Column::Id)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(&txn)
        .await?;

        limit_subcategory::Entity::update_many()
            .col_expr(
                limit_subcategory::Column::CategoryId,
                sea_orm::sea_query::Expr::value(canonical.clone()),
            )
            .filter(limit_subcategory::Column::CategoryId.eq(cat.id.clone()))
            .exec(&txn)
            .await?;

        limit_category::Entity::delete_by_id(cat.id.clone())
            .exec(&txn)
            .await?;
        report.merged += 1;
    }

    // Subcategories, with the category name resolved for the path.
    let categories = limit_category::Entity::find().all(&txn).await?;
    let subcategories = limit_subcategory::Entity::find().all(&txn).await?;
    for sub in &subcategories {
        let Some(parent) = categories.iter().find(|c| c.id == sub.category_id) else {
            continue;
        };
        let canonical = stable_id("sub", &format!("{}/{}", parent.name, sub.name));
        if sub.id == canonical {
            continue;
        }

        limit_subcategory::Entity::insert(limit_subcategory::ActiveModel {
            id: Set(canonical.clone()),
            category_id: Set(sub.category_id.clone()),
            name: Set(sub.name.clone()),
            sort_order: Set(sub.sort_order),
        })
        .on_conflict(
            OnConflict::column(limit_subcategory::Column::Id)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(&txn)
        .await?;

        limit::Entity::update_many()
            .col_expr(
                limit::Column::SubcategoryId,
                sea_orm::sea_query::Expr::value(canonical.clone()),
            )
            .filter(limit::Column::SubcategoryId.eq(sub.id.clone()))
            .exec(&txn)
            .await?;

        limit_subcategory::Entity::delete_by_id(sub.id.clone())
            .exec(&txn)
            .await?;
        report.merged += 1;
    }

    // Limits, remapping the choice ledger row by row so uniqueness
    // collisions can be detected and the colliding choice dropped.
    let subcategories = limit_subcategory::Entity::find().all(&txn).await?;
    let limits = limit::Entity::find().all(&txn).await?;
    for lim in &limits {
        let Some(sub) = subcategories.iter().find(|s| s.id == lim.subcategory_id) else {
            continue;
        };
        let Some(parent) = categories.iter().find(|c| c.id == sub.category_id) else {
            continue;
        };
        let canonical = stable_id(
            "lim",
            &format!("{}/{}/{}", parent.name, sub.name, lim.name),
        );
        if lim.id == canonical {
            continue;
        }

        limit::Entity::insert(limit::ActiveModel {
            id: Set(canonical.clone()),
            subcategory_id: Set(lim.subcategory_id.clone()),
            name: Set(lim.name.clone()),
            description: Set(lim.description.clone()),
            sort_order: Set(lim.sort_order),
        })
        .on_conflict(OnConflict::column(limit::Column::Id).do_nothing().to_owned())
        .exec_without_returning(&txn)
        .await?;

        let choices = user_limit::Entity::find()
            .filter(user_limit::Column::LimitId.eq(lim.id.clone()))
            .all(&txn)
            .await?;
        for choice in choices {
            let collision = user_limit::Entity::find()
                .filter(user_limit::Column::UserId.eq(choice.user_id.clone()))
                .filter(user_limit::Column::RelationshipId.eq(choice.relationship_id.clone()))
                .filter(user_limit::Column::LimitId.eq(canonical.clone()))
                .one(&txn)
                .await?
                .is_some();

            if collision {
                user_limit::Entity::delete_by_id(choice.id).exec(&txn).await?;
                report.dropped_choices += 1;
            } else {
                let mut active: user_limit::ActiveModel = choice.into();
                active.limit_id = Set(canonical.clone());
                active.update(&txn).await?;
            }
        }

        limit::Entity::delete_by_id(lim.id.clone()).exec(&txn).await?;
        report.merged += 1;
    }

    txn.commit().await?;

    if report.merged > 0 {
        tracing::warn!(
            merged = report.merged,
            dropped_choices = report.dropped_choices,
            "catalog repair merged duplicate rows"
        );
    }

    Ok(report)
}
