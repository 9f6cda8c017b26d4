//! Utility functions for the queue service

use chrono::{DateTime, Utc};

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Join display strings with ", " the way roster listings are rendered
pub fn comma_list<'a, I>(items: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    items.into_iter().collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comma_list() {
        assert_eq!(comma_list(["a", "b", "c"]), "a, b, c");
        assert_eq!(comma_list(["solo"]), "solo");
        assert_eq!(comma_list(Vec::<&str>::new()), "");
    }

    #[test]
    fn test_timestamps_are_monotonic_enough() {
        let first = current_timestamp();
        let second = current_timestamp();
        assert!(second >= first);
    }
}
