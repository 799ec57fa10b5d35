//! Raw Storefront responses into domain types.

use rust_decimal::Decimal;

use shoppy_core::money::parse_amount;

use super::queries::{RawMoney, RawProduct, RawVariant};
use crate::shopify::types::{Money, Product, ProductVariant};

fn convert_money(raw: RawMoney) -> Money {
    let amount = parse_amount(&raw.amount).unwrap_or_else(|| {
        tracing::warn!(amount = %raw.amount, "Unparseable Shopify amount, using 0");
        Decimal::ZERO
    });
    Money {
        amount,
        currency_code: raw.currency_code,
    }
}

fn convert_variant(raw: RawVariant) -> ProductVariant {
    ProductVariant {
        id: raw.id,
        title: raw.title,
        price: convert_money(raw.price),
        available_for_sale: raw.available_for_sale,
    }
}

pub fn convert_product(raw: RawProduct) -> Product {
    Product {
        id: raw.id,
        title: raw.title,
        handle: raw.handle,
        description: raw.description,
        total_inventory: raw.total_inventory,
        price: convert_money(raw.price_range.min_variant_price),
        image_url: raw.images.edges.into_iter().next().map(|edge| edge.node.url),
        variants: raw
            .variants
            .map(|conn| {
                conn.edges
                    .into_iter()
                    .map(|edge| convert_variant(edge.node))
                    .collect()
            })
            .unwrap_or_default(),
    }
}
