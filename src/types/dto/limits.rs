use poem_openapi::Object;
use serde::{Deserialize, Serialize};

/// One limit of the static catalog
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct LimitItem {
    /// Limit id
    pub id: String,

    /// Limit name
    pub name: String,

    /// Optional clarification text
    pub description: Option<String>,
}

/// One subcategory with its limits
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct SubcategoryItem {
    /// Subcategory id
    pub id: String,

    /// Subcategory name
    pub name: String,

    /// Limits in display order
    pub limits: Vec<LimitItem>,
}

/// One category with its subcategories
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct CategoryItem {
    /// Category id
    pub id: String,

    /// Category name
    pub name: String,

    /// Subcategories in display order
    pub subcategories: Vec<SubcategoryItem>,
}

/// Response model for the catalog tree
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct CatalogResponse {
    /// Categories in display order
    pub categories: Vec<CategoryItem>,
}

/// One of the caller's own choices
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct MyChoice {
    /// Limit id the choice refers to
    pub limit_id: String,

    /// Whether the caller accepts this limit
    pub is_accepted: bool,

    /// The caller's private note, if any
    pub note: Option<String>,
}

/// Response model for the caller's own choices
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct MyChoicesResponse {
    pub choices: Vec<MyChoice>,
}

/// One entry of a bulk choice update
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct ChoiceUpdateItem {
    /// Limit id to update
    pub limit_id: String,

    /// New acceptance value
    pub is_accepted: bool,
}

/// Request model for bulk choice updates
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct UpsertChoicesRequest {
    /// Choices to apply; later entries win over earlier duplicates
    pub choices: Vec<ChoiceUpdateItem>,
}

/// Request model for setting a note
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct UpsertNoteRequest {
    /// Note text; at most 500 characters, whitespace-only means delete
    pub note: String,
}

/// One matched limit: both parties accepted it
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct CommonLimit {
    /// Limit id
    pub limit_id: String,

    /// Limit name
    pub name: String,

    /// Optional clarification text
    pub description: Option<String>,

    /// Category the limit belongs to
    pub category_name: String,

    /// Subcategory the limit belongs to
    pub subcategory_name: String,

    /// The caller's own note
    pub my_note: Option<String>,

    /// The partner's note on this matched limit
    pub partner_note: Option<String>,
}

/// Response model for the privacy-filtered intersection
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct CommonLimitsResponse {
    /// Limits both parties accepted, in catalog display order
    pub common_limits: Vec<CommonLimit>,
}
