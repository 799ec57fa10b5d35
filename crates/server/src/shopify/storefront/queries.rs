//! GraphQL documents and raw response shapes for the Storefront API.
//!
//! Raw types mirror the connection/edge nesting of the API; they are
//! flattened into [`crate::shopify::types`] by `conversions`.

use serde::{Deserialize, Serialize};

use crate::shopify::types::ProductSortKey;

/// Selection set shared by every product query.
macro_rules! product_fields {
    () => {
        r"
    id
    title
    handle
    description
    totalInventory
    priceRange {
      minVariantPrice {
        amount
        currencyCode
      }
    }
    images(first: 1) {
      edges {
        node {
          url
        }
      }
    }
    variants(first: 3) {
      edges {
        node {
          id
          title
          price {
            amount
            currencyCode
          }
          availableForSale
        }
      }
    }
"
    };
}

/// Product search/list query.
pub const SEARCH_PRODUCTS_QUERY: &str = concat!(
    "query SearchProducts($query: String, $first: Int!, $sortKey: ProductSortKeys) {\n",
    "  products(first: $first, query: $query, sortKey: $sortKey) {\n",
    "    edges {\n",
    "      node {",
    product_fields!(),
    "}\n    }\n  }\n}\n"
);

/// Single product by handle.
pub const PRODUCT_BY_HANDLE_QUERY: &str = concat!(
    "query GetProductByHandle($handle: String!) {\n",
    "  product(handle: $handle) {",
    product_fields!(),
    "}\n}\n"
);

pub const SEARCH_PRODUCTS: &str = "SearchProducts";
pub const GET_PRODUCT_BY_HANDLE: &str = "GetProductByHandle";

// =============================================================================
// Variables
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchProductsVariables {
    pub query: Option<String>,
    pub first: i64,
    pub sort_key: Option<ProductSortKey>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductByHandleVariables {
    pub handle: String,
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Connection<T> {
    pub edges: Vec<Edge<T>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Edge<T> {
    pub node: T,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMoney {
    pub amount: String,
    pub currency_code: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPriceRange {
    pub min_variant_price: RawMoney,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawImage {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawVariant {
    pub id: String,
    pub title: String,
    pub price: RawMoney,
    pub available_for_sale: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProduct {
    pub id: String,
    pub title: String,
    pub handle: String,
    #[serde(default)]
    pub description: String,
    pub total_inventory: Option<i64>,
    pub price_range: RawPriceRange,
    pub images: Connection<RawImage>,
    pub variants: Option<Connection<RawVariant>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchProductsData {
    pub products: Connection<RawProduct>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductByHandleData {
    pub product: Option<RawProduct>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_queries_embed_product_fields() {
        let search = SEARCH_PRODUCTS_QUERY;
        assert!(search.starts_with("query SearchProducts("));
        assert!(search.contains("minVariantPrice"));
        assert!(search.contains("variants(first: 3)"));
        assert!(PRODUCT_BY_HANDLE_QUERY.contains("product(handle: $handle)"));
    }

    #[test]
    fn test_variables_use_graphql_names() {
        let vars = SearchProductsVariables {
            query: Some("title:*tee*".to_string()),
            first: 2,
            sort_key: Some(ProductSortKey::BestSelling),
        };
        let json = serde_json::to_value(vars).unwrap();
        assert_eq!(json["sortKey"], "BEST_SELLING");
        assert_eq!(json["first"], 2);
    }

    #[test]
    fn test_raw_product_decodes() {
        let json = serde_json::json!({
            "products": {"edges": [{"node": {
                "id": "gid://shopify/Product/1",
                "title": "Burgundy V-Neck Tee",
                "handle": "burgundy-v-neck-tee",
                "description": "Soft.",
                "totalInventory": 12,
                "priceRange": {"minVariantPrice": {"amount": "19.99", "currencyCode": "USD"}},
                "images": {"edges": [{"node": {"url": "https://cdn.example/tee.jpg"}}]},
                "variants": {"edges": []}
            }}]}
        });
        let data: SearchProductsData = serde_json::from_value(json).unwrap();
        let product = &data.products.edges.first().unwrap().node;
        assert_eq!(product.handle, "burgundy-v-neck-tee");
        assert_eq!(product.total_inventory, Some(12));
    }
}
