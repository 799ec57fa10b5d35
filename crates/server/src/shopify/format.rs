//! Human-readable rendering of prices and product lists.

use std::fmt::Write as _;

use rust_decimal::{Decimal, RoundingStrategy};

use super::types::{Money, Product};

/// Longest description excerpt in a chat listing.
const EXCERPT_CHARS: usize = 100;

/// Render an amount in its currency's customary style.
///
/// `USD` → `$12.34`, `IDR` → `Rp 150,000`, anything else → `12.34 EUR`.
#[must_use]
pub fn format_price(amount: Decimal, currency_code: &str) -> String {
    match currency_code {
        "USD" => format!("${:.2}", amount.round_dp(2)),
        "IDR" => {
            let whole = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
            format!("Rp {}", group_thousands(&whole.trunc().to_string()))
        }
        other => format!("{:.2} {other}", amount.round_dp(2)),
    }
}

/// [`format_price`] for a [`Money`] value.
#[must_use]
pub fn format_money(money: &Money) -> String {
    format_price(money.amount, &money.currency_code)
}

fn group_thousands(digits: &str) -> String {
    let (sign, digits) = digits
        .strip_prefix('-')
        .map_or(("", digits), |rest| ("-", rest));
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    format!("{sign}{out}")
}

/// Numbered markdown listing of `products` for a chat reply.
///
/// `product_url` maps a handle to its storefront page.
#[must_use]
pub fn format_products_for_chat(products: &[Product], product_url: impl Fn(&str) -> String) -> String {
    if products.is_empty() {
        return "Sorry, I couldn't find any products matching your search. \
                Try different keywords."
            .to_string();
    }

    let mut out = format!("I found {} matching products:\n\n", products.len());
    for (index, product) in products.iter().enumerate() {
        let availability = if product.in_stock() {
            "In stock"
        } else {
            "Out of stock"
        };

        let _ = writeln!(out, "{}. **{}**", index + 1, product.title);
        let _ = writeln!(out, "   Price: {}", format_money(&product.price));
        let _ = writeln!(out, "   Status: {availability}");
        if !product.description.is_empty() {
            let excerpt: String = product.description.chars().take(EXCERPT_CHARS).collect();
            let _ = writeln!(out, "   Description: {excerpt}...");
        }
        if let Some(image) = &product.image_url {
            let _ = writeln!(out, "   ![{}]({image})", product.title);
        }
        let _ = writeln!(out, "   Link: {}\n", product_url(&product.handle));
    }
    out.push_str("Would you like to add any of these to your cart, or see more details?");
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_format_price_usd() {
        assert_eq!(format_price(dec("12.3"), "USD"), "$12.30");
        assert_eq!(format_price(dec("19.99"), "USD"), "$19.99");
    }

    #[test]
    fn test_format_price_idr_groups_thousands() {
        assert_eq!(format_price(dec("150000"), "IDR"), "Rp 150,000");
        assert_eq!(format_price(dec("1250000.4"), "IDR"), "Rp 1,250,000");
        assert_eq!(format_price(dec("999"), "IDR"), "Rp 999");
    }

    #[test]
    fn test_format_price_other_currency() {
        assert_eq!(format_price(dec("12.34"), "EUR"), "12.34 EUR");
    }

    #[test]
    fn test_format_products_for_chat() {
        let products = vec![Product {
            id: "gid://shopify/Product/1".to_string(),
            title: "Burgundy V-Neck Tee".to_string(),
            handle: "burgundy-v-neck-tee".to_string(),
            description: "Soft cotton tee.".to_string(),
            total_inventory: Some(3),
            price: Money::usd(dec("19.99")),
            image_url: None,
            variants: vec![],
        }];
        let text = format_products_for_chat(&products, |h| format!("https://shop.example/products/{h}"));

        assert!(text.starts_with("I found 1 matching products:"));
        assert!(text.contains("1. **Burgundy V-Neck Tee**"));
        assert!(text.contains("Price: $19.99"));
        assert!(text.contains("Status: In stock"));
        assert!(text.contains("Link: https://shop.example/products/burgundy-v-neck-tee"));
    }

    #[test]
    fn test_format_empty_list() {
        assert!(format_products_for_chat(&[], |h| h.to_string()).starts_with("Sorry"));
    }
}
