use std::collections::BTreeMap;

use crate::{constants::SHOPPING_LIST_HEADER, schema::CartIngredientRow};

/// Ingredient totals across every recipe in a cart, keyed by
/// (name, measurement unit) and ordered alphabetically.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ShoppingList {
    items: BTreeMap<(String, String), i64>,
}

impl ShoppingList {
    pub fn from_rows(rows: impl IntoIterator<Item = CartIngredientRow>) -> Self {
        let mut items: BTreeMap<(String, String), i64> = BTreeMap::new();
        for row in rows {
            *items.entry((row.name, row.measurement_unit)).or_insert(0) += row.amount;
        }
        Self { items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.items
            .iter()
            .map(|((name, unit), amount)| format!("{name} ({unit}) - {amount}"))
    }

    pub fn render(&self) -> String {
        let mut document = String::from(SHOPPING_LIST_HEADER);
        document.push('\n');
        for line in self.lines() {
            document.push_str(&line);
            document.push('\n');
        }
        document
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, unit: &str, amount: i64) -> CartIngredientRow {
        CartIngredientRow {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            amount,
        }
    }

    #[test]
    fn same_ingredient_across_recipes_is_summed() {
        let list = ShoppingList::from_rows(vec![row("flour", "g", 200), row("flour", "g", 100)]);
        assert_eq!(list.lines().collect::<Vec<_>>(), vec!["flour (g) - 300"]);
    }

    #[test]
    fn units_are_kept_apart_and_sorted() {
        let list = ShoppingList::from_rows(vec![
            row("sugar", "g", 50),
            row("milk", "ml", 200),
            row("milk", "cup", 1),
            row("sugar", "g", 25),
        ]);

        assert_eq!(list.len(), 3);
        assert_eq!(
            list.render(),
            "SHOPPING LIST:\nmilk (cup) - 1\nmilk (ml) - 200\nsugar (g) - 75\n"
        );
    }

    #[test]
    fn no_rows_is_empty() {
        assert!(ShoppingList::from_rows(vec![]).is_empty());
    }
}
