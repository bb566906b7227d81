//! Featured-first ordering for social-proof listings
//!
//! Keys, in order: feature flag descending, creation time descending, id
//! descending. The id makes the order total, so repeated reads over
//! unchanged data return rows in the same order.

use diesel::prelude::*;
use diesel::sqlite::Sqlite;

use super::diesel_schema::testimonials;

/// Apply the featured-first ordering to a testimonial query
pub fn order_featured_first(
    query: testimonials::BoxedQuery<'static, Sqlite>,
) -> testimonials::BoxedQuery<'static, Sqlite> {
    query.order((
        testimonials::is_featured.desc(),
        testimonials::created_at.desc(),
        testimonials::id.desc(),
    ))
}


#[cfg(test)]
mod tests {
    use super::comparator::{sort_featured_first, Featurable};

    struct Row(i32, bool, &'static str);

    impl Featurable for Row {
        fn is_featured(&self) -> bool {
            self.1
        }
        fn created_at(&self) -> &str {
            self.2
        }
        fn id(&self) -> i32 {
            self.0
        }
    }

    #[test]
    fn test_featured_beats_recency() {
        let mut rows = vec![
            Row(1, false, "2024-06-01T00:00:00.000000Z"),
            Row(2, true, "2024-01-01T00:00:00.000000Z"),
        ];
        sort_featured_first(&mut rows);
        assert_eq!(rows.iter().map(|r| r.0).collect::<Vec<_>>(), vec![2, 1]);
    }

    #[test]
    fn test_recency_then_id_break_ties() {
        let mut rows = vec![
            Row(1, false, "2024-01-01T00:00:00.000000Z"),
            Row(3, false, "2024-01-01T00:00:00.000000Z"),
            Row(2, false, "2024-02-01T00:00:00.000000Z"),
            Row(4, true, "2023-01-01T00:00:00.000000Z"),
        ];
        sort_featured_first(&mut rows);
        assert_eq!(rows.iter().map(|r| r.0).collect::<Vec<_>>(), vec![4, 2, 3, 1]);
    }
}
