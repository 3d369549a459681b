//! Page-number pagination over held lists.

use std::num::NonZeroUsize;

use serde::Serialize;

/// Number of pages needed for `total` items, i.e. `ceil(total / size)`.
pub fn page_count(total: usize, size: NonZeroUsize) -> usize {
    total.div_ceil(size.get())
}

/// The 1-indexed `number`th page of `items`.
///
/// Page `0` and pages past the last one are empty rather than an error.
pub fn page_slice<T>(items: &[T], number: usize, size: NonZeroUsize) -> &[T] {
    let Some(index) = number.checked_sub(1) else {
        return &[];
    };
    let Some(start) = index.checked_mul(size.get()) else {
        return &[];
    };
    if start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(size.get()).min(items.len());
    &items[start..end]
}

/// Page links to render; empty when everything fits on one page.
pub fn page_numbers(total: usize, size: NonZeroUsize) -> Vec<usize> {
    let count = page_count(total, size);
    if count > 1 {
        (1..=count).collect()
    } else {
        Vec::new()
    }
}

/// One page of a list plus the figures needed to render pager controls.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: usize,
    pub size: usize,
    pub total: usize,
    pub page_count: usize,
}

impl<T: Clone> Page<T> {
    pub fn from_slice(items: &[T], number: usize, size: NonZeroUsize) -> Self {
        Self {
            items: page_slice(items, number, size).to_vec(),
            number,
            size: size.get(),
            total: items.len(),
            page_count: page_count(items.len(), size),
        }
    }
}

impl<T> Page<T> {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_next(&self) -> bool {
        self.number < self.page_count
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1 && self.number <= self.page_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(value: usize) -> NonZeroUsize {
        NonZeroUsize::new(value).unwrap()
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(page_count(0, size(6)), 0);
        assert_eq!(page_count(6, size(6)), 1);
        assert_eq!(page_count(7, size(6)), 2);
    }

    #[test]
    fn pages_beyond_the_last_are_empty() {
        let items: Vec<u32> = (0..7).collect();
        assert_eq!(page_slice(&items, 2, size(6)), &[6]);
        assert!(page_slice(&items, 3, size(6)).is_empty());
        assert!(page_slice(&items, 0, size(6)).is_empty());
        assert!(page_slice(&items, usize::MAX, size(6)).is_empty());
    }

    #[test]
    fn first_page_holds_short_list_whole() {
        let items = vec!["a", "b", "c"];
        assert_eq!(page_slice(&items, 1, size(6)), items.as_slice());
    }

    #[test]
    fn page_lengths_sum_to_total() {
        for total in 0..20usize {
            for page_size in 1..8usize {
                let items: Vec<usize> = (0..total).collect();
                let count = page_count(total, size(page_size));
                let sum: usize = (1..=count)
                    .map(|number| page_slice(&items, number, size(page_size)).len())
                    .sum();
                assert_eq!(sum, total, "total={total} size={page_size}");
            }
        }
    }

    #[test]
    fn page_numbers_hidden_for_single_page() {
        assert!(page_numbers(6, size(6)).is_empty());
        assert_eq!(page_numbers(13, size(6)), vec![1, 2, 3]);
    }

    #[test]
    fn page_navigation_flags() {
        let items: Vec<u8> = (0..13).collect();
        let page = Page::from_slice(&items, 2, size(6));
        assert!(page.has_next());
        assert!(page.has_previous());
        assert_eq!(page.page_count, 3);

        let past_end = Page::from_slice(&items, 9, size(6));
        assert!(past_end.is_empty());
        assert!(!past_end.has_next());
        assert!(!past_end.has_previous());
    }
}
