use crate::error::ApiError;
use crate::infra::RecipeStore;
use crate::models::{CartIngredient, UserId};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

pub const FILE_NAME: &str = "shopping_cart.txt";
const HEADER: &str = "Shopping list:\n";
const EMPTY: &str = "Your shopping list is empty.\n";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngredientLine {
    pub name: String,
    pub measurement_unit: String,
    pub total_amount: u64,
}

impl fmt::Display for IngredientLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} {}", self.name, self.total_amount, self.measurement_unit)
    }
}

pub fn build_shopping_list<S: RecipeStore + ?Sized>(
    store: &S,
    user_id: UserId,
) -> Result<Vec<IngredientLine>, ApiError> {
    Ok(aggregate(store.cart_ingredients(user_id)?))
}

/// Groups rows by exact `(name, unit)` and sums their amounts, ordered by
/// case-folded name, then name, then unit.
pub fn aggregate<I>(rows: I) -> Vec<IngredientLine>
where
    I: IntoIterator<Item = CartIngredient>,
{
    let mut groups: BTreeMap<(String, String), u64> = BTreeMap::new();
    for row in rows {
        *groups.entry((row.name, row.measurement_unit)).or_default() += u64::from(row.amount);
    }
    let mut lines: Vec<IngredientLine> = groups
        .into_iter()
        .map(|((name, measurement_unit), total_amount)| IngredientLine {
            name,
            measurement_unit,
            total_amount,
        })
        .collect();
    // The map already orders equal folded names by (name, unit).
    lines.sort_by_cached_key(|line| line.name.to_lowercase());
    lines
}

pub fn render(lines: &[IngredientLine]) -> String {
    if lines.is_empty() {
        return EMPTY.to_string();
    }
    let mut out = String::from(HEADER);
    for line in lines {
        out.push_str(&line.to_string());
        out.push('\n');
    }
    out
}
