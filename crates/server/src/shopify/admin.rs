//! Shopify Admin API client (order status only).

use std::sync::Arc;
use std::time::Duration;

use graphql_client::QueryBody;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use shoppy_core::money::parse_amount;

use super::types::{Money, Order, OrderLineItem};
use super::{ShopifyError, post_graphql};
use crate::config::ShopifyConfig;
use crate::retry::{RetryConfig, with_backoff};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const ORDER_STATUS: &str = "GetOrderStatus";
const ORDER_STATUS_QUERY: &str = r"query GetOrderStatus($query: String!) {
  orders(first: 1, query: $query) {
    edges {
      node {
        id
        name
        displayFulfillmentStatus
        displayFinancialStatus
        totalPriceSet {
          shopMoney {
            amount
            currencyCode
          }
        }
        lineItems(first: 5) {
          edges {
            node {
              quantity
              title
              variant {
                price
              }
            }
          }
        }
      }
    }
  }
}
";

#[derive(Debug, Serialize)]
struct OrderStatusVariables {
    query: String,
}

#[derive(Debug, Deserialize)]
struct Connection<T> {
    edges: Vec<Edge<T>>,
}

#[derive(Debug, Deserialize)]
struct Edge<T> {
    node: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMoney {
    amount: String,
    currency_code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMoneyBag {
    shop_money: RawMoney,
}

#[derive(Debug, Deserialize)]
struct RawVariant {
    price: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawLineItem {
    quantity: i64,
    title: String,
    variant: Option<RawVariant>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOrder {
    id: String,
    name: String,
    display_fulfillment_status: Option<String>,
    display_financial_status: Option<String>,
    total_price_set: Option<RawMoneyBag>,
    line_items: Connection<RawLineItem>,
}

#[derive(Debug, Deserialize)]
struct OrderStatusData {
    orders: Connection<RawOrder>,
}

fn convert_order(raw: RawOrder) -> Order {
    let total_price = raw.total_price_set.and_then(|bag| {
        Some(Money {
            amount: parse_amount(&bag.shop_money.amount)?,
            currency_code: bag.shop_money.currency_code,
        })
    });
    let currency = total_price
        .as_ref()
        .map_or_else(|| "USD".to_string(), |m| m.currency_code.clone());

    Order {
        id: raw.id,
        name: raw.name,
        fulfillment_status: raw.display_fulfillment_status,
        financial_status: raw.display_financial_status,
        line_items: raw
            .line_items
            .edges
            .into_iter()
            .map(|edge| OrderLineItem {
                title: edge.node.title,
                quantity: edge.node.quantity,
                price: edge
                    .node
                    .variant
                    .and_then(|v| v.price)
                    .and_then(|p| parse_amount(&p))
                    .map(|amount| Money {
                        amount,
                        currency_code: currency.clone(),
                    }),
            })
            .collect(),
        total_price,
    }
}

/// Client for the Shopify Admin API.
#[derive(Clone)]
pub struct AdminClient {
    inner: Arc<AdminClientInner>,
}

struct AdminClientInner {
    client: reqwest::Client,
    endpoint: String,
    access_token: SecretString,
    retry: RetryConfig,
}

impl AdminClient {
    /// Create an Admin API client, or `None` when no admin token is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(
        config: &ShopifyConfig,
        retry: RetryConfig,
    ) -> Result<Option<Self>, ShopifyError> {
        let Some(token) = config.admin_token.clone() else {
            return Ok(None);
        };

        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Some(Self {
            inner: Arc::new(AdminClientInner {
                client,
                endpoint: config.admin_endpoint(),
                access_token: token,
                retry,
            }),
        }))
    }

    /// Look up an order by its name (e.g., `#1001`).
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::NotFound` if no order matches, or an error if
    /// the API request fails.
    #[instrument(skip(self), fields(order_name = %order_name))]
    pub async fn order_status(&self, order_name: &str) -> Result<Order, ShopifyError> {
        let body = QueryBody {
            variables: OrderStatusVariables {
                query: format!("name:{order_name}"),
            },
            query: ORDER_STATUS_QUERY,
            operation_name: ORDER_STATUS,
        };
        let token = self.inner.access_token.expose_secret();

        let data: OrderStatusData = with_backoff(&self.inner.retry, ORDER_STATUS, || {
            post_graphql(
                &self.inner.client,
                &self.inner.endpoint,
                ("X-Shopify-Access-Token", token),
                &body,
            )
        })
        .await?;

        data.orders
            .edges
            .into_iter()
            .next()
            .map(|edge| convert_order(edge.node))
            .ok_or_else(|| ShopifyError::NotFound(format!("Order not found: {order_name}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn test_convert_order() {
        let json = serde_json::json!({
            "orders": {"edges": [{"node": {
                "id": "gid://shopify/Order/1",
                "name": "#1001",
                "displayFulfillmentStatus": "FULFILLED",
                "displayFinancialStatus": "PAID",
                "totalPriceSet": {"shopMoney": {"amount": "45.98", "currencyCode": "USD"}},
                "lineItems": {"edges": [
                    {"node": {"quantity": 2, "title": "Red Tee", "variant": {"price": "22.99"}}},
                    {"node": {"quantity": 1, "title": "Gift Card", "variant": null}}
                ]}
            }}]}
        });
        let data: OrderStatusData = serde_json::from_value(json).unwrap();
        let order = convert_order(data.orders.edges.into_iter().next().unwrap().node);

        assert_eq!(order.name, "#1001");
        assert_eq!(order.fulfillment_status.as_deref(), Some("FULFILLED"));
        assert_eq!(
            order.total_price.unwrap().amount,
            Decimal::from_str("45.98").unwrap()
        );
        assert_eq!(order.line_items.len(), 2);
        assert!(order.line_items.last().unwrap().price.is_none());
    }
}
