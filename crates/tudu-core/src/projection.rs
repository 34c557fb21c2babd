//! Display projection: optional alphabetical sort, then a case-insensitive
//! substring filter. Pure and cheap enough to re-run on every frame.

use crate::model::Item;
use feruca::Collator;
use std::cmp::Ordering;

pub fn project<'a>(items: &'a [Item], search_term: &str, sort_enabled: bool) -> Vec<&'a Item> {
    let mut ordered: Vec<&Item> = items.iter().collect();
    if sort_enabled {
        let mut collation = Collation::new();
        // stable, so equal titles keep arrival order
        ordered.sort_by(|a, b| collation.compare(&a.title, &b.title));
    }
    let needle = search_term.to_lowercase();
    ordered.retain(|item| matches_term(&item.title, &needle));
    ordered
}

/// `needle` must already be lowercased. An empty needle matches everything.
pub fn matches_term(title: &str, needle: &str) -> bool {
    needle.is_empty() || title.to_lowercase().contains(needle)
}

/// Dictionary-style title comparison.
///
/// Primary level is the Unicode Collation Algorithm (CLDR root order) over
/// the lowercase-folded titles, so `ё` sorts with `е` and `é` with `e`. Only
/// when those are equal does case decide: at the first differing character
/// the uppercase form sorts first. Titles equal at both levels compare equal.
///
/// Builds a fresh collator per call; use [`Collation`] when sorting.
pub fn collate(a: &str, b: &str) -> Ordering {
    Collation::new().compare(a, b)
}

/// Reusable [`collate`]. The collator keeps lookup caches between calls.
pub struct Collation {
    uca: Collator,
}

impl Default for Collation {
    fn default() -> Self {
        Self::new()
    }
}

impl Collation {
    pub fn new() -> Self {
        Self {
            uca: Collator::default(),
        }
    }

    pub fn compare(&mut self, a: &str, b: &str) -> Ordering {
        let folded_a = a.to_lowercase();
        let folded_b = b.to_lowercase();
        self.uca
            .collate(folded_a.as_str(), folded_b.as_str())
            .then_with(|| case_tiebreak(a, b))
    }
}

fn case_tiebreak(a: &str, b: &str) -> Ordering {
    a.chars()
        .zip(b.chars())
        .find(|(x, y)| x != y)
        .map_or(Ordering::Equal, |(x, y)| {
            case_rank(x).cmp(&case_rank(y)).then(x.cmp(&y))
        })
}

fn case_rank(c: char) -> u8 {
    if c.is_uppercase() {
        0
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(items: Vec<&Item>) -> Vec<&str> {
        items.into_iter().map(|i| i.title.as_str()).collect()
    }

    #[test]
    fn collation_folds_case_before_breaking_ties() {
        assert_eq!(collate("apple", "Banana"), Ordering::Less);
        assert_eq!(collate("Apple", "apple"), Ordering::Less);
        assert_eq!(collate("apple", "Apple"), Ordering::Greater);
        assert_eq!(collate("same", "same"), Ordering::Equal);
        assert_eq!(collate("ab", "abc"), Ordering::Less);
    }

    #[test]
    fn collation_handles_non_ascii_case() {
        assert_eq!(collate("молоко", "Хлеб"), Ordering::Less);
        assert_eq!(collate("Ёж", "ёж"), Ordering::Less);
    }

    #[test]
    fn collation_places_letters_with_diacritics_beside_their_base() {
        assert_eq!(collate("ёж", "жук"), Ordering::Less);
        assert_eq!(collate("éclair", "fig"), Ordering::Less);
        assert_eq!(collate("Éclair", "eclair"), Ordering::Greater);

        let items = vec![
            Item::new("1", "яблоко"),
            Item::new("2", "ёлка"),
            Item::new("3", "жук"),
        ];
        assert_eq!(titles(project(&items, "", true)), ["ёлка", "жук", "яблоко"]);
    }

    #[test]
    fn filter_then_sort_compose() {
        let items = vec![
            Item::new("1", "Plan trip"),
            Item::new("2", "call PLUMBER"),
            Item::new("3", "Apple pie"),
        ];
        assert_eq!(
            titles(project(&items, "pl", true)),
            ["Apple pie", "call PLUMBER", "Plan trip"]
        );
        assert_eq!(
            titles(project(&items, "PL", false)),
            ["Plan trip", "call PLUMBER", "Apple pie"]
        );
        assert!(project(&items, "zzz", true).is_empty());
    }

    #[test]
    fn identical_titles_keep_arrival_order() {
        let items = vec![
            Item::new("b", "dup"),
            Item::new("x", "Alpha"),
            Item::new("a", "dup"),
        ];
        let ids: Vec<_> = project(&items, "", true).into_iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["x", "b", "a"]);
    }
}
