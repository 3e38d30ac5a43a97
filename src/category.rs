use serde_derive::{Deserialize, Serialize};

use crate::category_color::CategoryColor;

/// Index into the profile's category list, set on every stack table row.
#[derive(
    Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash, Serialize, Deserialize, Default,
)]
pub struct CategoryHandle(pub u16);

impl CategoryHandle {
    /// The "Other" category. All profiles have this category.
    pub const OTHER: Self = CategoryHandle(0);
}

/// A profiling category, referenced by stack table rows via [`CategoryHandle`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub color: CategoryColor,
}
