//! Catalog browsing: filter, sort and paginate the product list.

use serde::{Deserialize, Serialize};

use crate::domain::aggregates::Product;
use crate::domain::value_objects::Category;

pub const DEFAULT_PER_PAGE: u32 = 12;
pub const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder { #[default] Featured, PriceAsc, PriceDesc, Title, Newest }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub sort: Option<SortOrder>,
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> { pub data: Vec<T>, pub total: usize, pub page: u32, pub per_page: u32, pub total_pages: u32 }

fn matches_search(product: &Product, needle: &str) -> bool {
    product.title.to_lowercase().contains(needle)
        || product.description.to_lowercase().contains(needle)
        || product.category.as_str().to_lowercase().contains(needle)
        || product.features.iter().any(|f| f.to_lowercase().contains(needle))
}

pub fn browse(products: &[Product], params: &ListParams) -> PaginatedResponse<Product> {
    let category = params.category.as_deref().map(str::trim).filter(|c| !c.is_empty()).map(Category::new);
    let needle = params.search.as_deref().map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty());

    let mut matched: Vec<&Product> = products.iter()
        .filter(|p| category.as_ref().map(|c| c.contains(&p.category)).unwrap_or(true))
        .filter(|p| needle.as_deref().map(|n| matches_search(p, n)).unwrap_or(true))
        .collect();

    match params.sort.unwrap_or_default() {
        SortOrder::Featured => matched.sort_by_key(|p| p.id),
        SortOrder::PriceAsc => matched.sort_by(|a, b| a.unit_price().cmp(&b.unit_price()).then(a.id.cmp(&b.id))),
        SortOrder::PriceDesc => matched.sort_by(|a, b| b.unit_price().cmp(&a.unit_price()).then(a.id.cmp(&b.id))),
        SortOrder::Title => matched.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase())),
        SortOrder::Newest => matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id))),
    }

    let per_page = params.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
    let total = matched.len();
    let total_pages = ((total as u32) + per_page - 1) / per_page;
    let page = params.page.unwrap_or(1).max(1);
    let data = matched.into_iter()
        .skip((page - 1).saturating_mul(per_page) as usize)
        .take(per_page as usize)
        .map(Product::public_view)
        .collect();
    PaginatedResponse { data, total, page, per_page, total_pages }
}

/// Distinct top-level categories, for the filter sidebar.
pub fn root_categories(products: &[Product]) -> Vec<String> {
    let mut roots: Vec<String> = products.iter().filter_map(|p| p.category.root().map(str::to_string)).collect();
    roots.sort();
    roots.dedup();
    roots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::bundle::tests::product;

    fn catalog() -> Vec<Product> {
        let mut items = vec![
            product(1, 300, "Audio Gear/Mixers"),
            product(2, 100, "Audio Gear/Mics"),
            product(3, 800, "Video/Cameras"),
            product(4, 250, "Services"),
        ];
        items[1].title = "Wireless Handheld Mic".into();
        items[1].cost = Some(crate::domain::value_objects::Money::dollars(40));
        items
    }

    #[test]
    fn test_filter_by_category_prefix() {
        let page = browse(&catalog(), &ListParams { category: Some("audio gear".into()), ..Default::default() });
        assert_eq!(page.total, 2);
        assert!(page.data.iter().all(|p| p.category.root() == Some("Audio Gear")));
    }

    #[test]
    fn test_search_and_cost_hidden() {
        let page = browse(&catalog(), &ListParams { search: Some("wireless".into()), ..Default::default() });
        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].id, 2);
        assert_eq!(page.data[0].cost, None);
    }

    #[test]
    fn test_sort_and_paginate() {
        let params = ListParams { sort: Some(SortOrder::PriceDesc), per_page: Some(3), page: Some(2), ..Default::default() };
        let page = browse(&catalog(), &params);
        assert_eq!(page.total, 4);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].id, 2);

        let first = browse(&catalog(), &ListParams { sort: Some(SortOrder::PriceAsc), ..Default::default() });
        assert_eq!(first.data.iter().map(|p| p.id).collect::<Vec<_>>(), vec![2, 4, 1, 3]);
    }

    #[test]
    fn test_page_past_end_is_empty() {
        let page = browse(&catalog(), &ListParams { page: Some(9), ..Default::default() });
        assert!(page.data.is_empty());
        assert_eq!(page.total, 4);
    }

    #[test]
    fn test_root_categories() {
        assert_eq!(root_categories(&catalog()), vec!["Audio Gear", "Services", "Video"]);
    }
}
