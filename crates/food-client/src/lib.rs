//! Typed HTTP client for the order endpoints.

use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat, Utc};
use food_types::domain::order::{NewOrder, Order, OrderStatus};
use food_types::domain::page::{Page, Pageable};
use food_types::domain::sales::DailySales;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Url;

#[derive(Clone)]
pub struct FoodClientBuilder {
    base: Url,
    headers: HeaderMap,
    timeout: Option<Duration>,
    client: Option<reqwest::Client>,
}

#[derive(Clone)]
pub struct FoodClient {
    base: Url,
    client: reqwest::Client,
}

/// Filters for [`FoodClient::search_orders`]; unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderQuery {
    pub client_id: Option<u64>,
    pub restaurant_id: Option<u64>,
    pub status: Option<OrderStatus>,
    pub created_from: Option<NaiveDate>,
    pub created_to: Option<NaiveDate>,
    pub page: Pageable,
}

impl OrderQuery {
    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(id) = self.client_id {
            pairs.push(("client_id", id.to_string()));
        }
        if let Some(id) = self.restaurant_id {
            pairs.push(("restaurant_id", id.to_string()));
        }
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        if let Some(day) = self.created_from {
            pairs.push(("created_from", day.to_string()));
        }
        if let Some(day) = self.created_to {
            pairs.push(("created_to", day.to_string()));
        }
        pairs.push(("page", self.page.page.to_string()));
        pairs.push(("size", self.page.size.to_string()));
        pairs
    }
}

/// Filters for [`FoodClient::daily_sales`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SalesQuery {
    pub restaurant_id: Option<u64>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    /// Days are cut in this offset; the server uses UTC when unset.
    pub time_offset: Option<FixedOffset>,
}

impl SalesQuery {
    fn pairs(&self) -> Vec<(&'static str, String)> {
        let instant = |at: DateTime<Utc>| at.to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut pairs = Vec::new();
        if let Some(id) = self.restaurant_id {
            pairs.push(("restaurant_id", id.to_string()));
        }
        if let Some(at) = self.created_from {
            pairs.push(("created_from", instant(at)));
        }
        if let Some(at) = self.created_to {
            pairs.push(("created_to", instant(at)));
        }
        if let Some(offset) = self.time_offset {
            pairs.push(("time_offset", offset.to_string()));
        }
        pairs
    }
}

impl FoodClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        Self::builder(base_url)?.build()
    }

    pub fn builder(base_url: &str) -> anyhow::Result<FoodClientBuilder> {
        let base = Url::parse(base_url).context("invalid base url")?;
        Ok(FoodClientBuilder {
            base,
            headers: HeaderMap::new(),
            timeout: None,
            client: None,
        })
    }

    fn url(&self, path: &str) -> anyhow::Result<Url> {
        self.base.join(path).context("failed to join url")
    }

    pub async fn create_order(&self, order: &NewOrder) -> anyhow::Result<Order> {
        let res = self
            .client
            .post(self.url("orders")?)
            .json(order)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn get_order(&self, code: &str) -> anyhow::Result<Order> {
        let res = self
            .client
            .get(self.url(&format!("orders/{code}"))?)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn search_orders(&self, query: &OrderQuery) -> anyhow::Result<Page<Order>> {
        let res = self
            .client
            .get(self.url("orders")?)
            .query(&query.pairs())
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn daily_sales(&self, query: &SalesQuery) -> anyhow::Result<Vec<DailySales>> {
        let res = self
            .client
            .get(self.url("statistics/daily-sales")?)
            .query(&query.pairs())
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn confirm_order(&self, code: &str) -> anyhow::Result<Order> {
        self.transition(code, "confirmation").await
    }

    pub async fn cancel_order(&self, code: &str) -> anyhow::Result<Order> {
        self.transition(code, "cancellation").await
    }

    pub async fn deliver_order(&self, code: &str) -> anyhow::Result<Order> {
        self.transition(code, "delivery").await
    }

    async fn transition(&self, code: &str, action: &str) -> anyhow::Result<Order> {
        tracing::debug!(code, action, "requesting order transition");
        let res = self
            .client
            .put(self.url(&format!("orders/{code}/{action}"))?)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }
}

impl FoodClientBuilder {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_header(
        mut self,
        key: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> anyhow::Result<Self> {
        let header_name =
            HeaderName::from_bytes(key.as_ref().as_bytes()).context("invalid header name")?;
        let header_value = HeaderValue::from_str(value.as_ref()).context("invalid header value")?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    pub fn with_reqwest_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> anyhow::Result<FoodClient> {
        if let Some(client) = self.client {
            return Ok(FoodClient {
                base: self.base,
                client,
            });
        }

        let mut builder = reqwest::Client::builder();
        if !self.headers.is_empty() {
            builder = builder.default_headers(self.headers);
        }
        if let Some(t) = self.timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build()?;
        Ok(FoodClient {
            base: self.base,
            client,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use food_types::domain::business::Address;
    use food_types::domain::order::{NewOrderItem, OrderItem};
    use httpmock::prelude::*;
    use rust_decimal::Decimal;

    fn sample_order() -> Order {
        let mut order = Order::new(
            1,
            7,
            2,
            Address::default(),
            vec![OrderItem::new(3, "Pad Thai", 2, Decimal::new(1000, 2))],
        );
        order.set_freight(Decimal::new(500, 2));
        order.compute_totals();
        order.assign_code();
        order.id = 1;
        order
    }

    fn new_order() -> NewOrder {
        NewOrder {
            restaurant_id: 1,
            client_id: 7,
            payment_method_id: 2,
            delivery_address: Address::default(),
            items: vec![NewOrderItem {
                product_id: 3,
                quantity: 2,
                note: None,
            }],
        }
    }

    #[tokio::test]
    async fn create_and_get_order() {
        let server = MockServer::start();
        let order = sample_order();

        let create_mock = server.mock(|when, then| {
            when.method(POST).path("/orders").json_body_obj(&new_order());
            then.status(201).json_body_obj(&order);
        });
        let get_mock = server.mock(|when, then| {
            when.method(GET).path(format!("/orders/{}", order.code));
            then.status(200).json_body_obj(&order);
        });

        let client = FoodClient::new(&server.base_url()).unwrap();
        let created = client.create_order(&new_order()).await.unwrap();
        assert_eq!(created.code, order.code);
        assert_eq!(created.total, Decimal::new(2500, 2));

        let fetched = client.get_order(&order.code).await.unwrap();
        assert_eq!(fetched.status, OrderStatus::Created);

        create_mock.assert();
        get_mock.assert();
    }

    #[tokio::test]
    async fn search_sends_filters_and_paging() {
        let server = MockServer::start();
        let order = sample_order();
        let page = Page::new(vec![order.clone()], 1, Pageable::new(0, 20));

        let search_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/orders")
                .query_param("client_id", "7")
                .query_param("status", "CREATED")
                .query_param("created_from", "2024-05-01")
                .query_param("page", "0")
                .query_param("size", "20");
            then.status(200).json_body_obj(&page);
        });

        let client = FoodClient::new(&server.base_url()).unwrap();
        let found = client
            .search_orders(&OrderQuery {
                client_id: Some(7),
                status: Some(OrderStatus::Created),
                created_from: NaiveDate::from_ymd_opt(2024, 5, 1),
                page: Pageable::new(0, 20),
                ..OrderQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(found.total_elements, 1);
        assert_eq!(found.content[0].code, order.code);
        search_mock.assert();
    }

    #[tokio::test]
    async fn daily_sales_sends_filters_and_offset() {
        let server = MockServer::start();
        let body = serde_json::json!([
            { "date": "2026-02-01", "total_sales": 2, "total_revenue": "110.00" }
        ]);
        let sales_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/statistics/daily-sales")
                .query_param("restaurant_id", "1")
                .query_param("created_from", "2026-02-01T00:00:00Z")
                .query_param("time_offset", "-03:00");
            then.status(200).json_body(body);
        });

        let client = FoodClient::new(&server.base_url()).unwrap();
        let days = client
            .daily_sales(&SalesQuery {
                restaurant_id: Some(1),
                created_from: "2026-02-01T00:00:00Z".parse().ok(),
                time_offset: FixedOffset::west_opt(3 * 3600),
                ..SalesQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].total_sales, 2);
        assert_eq!(days[0].total_revenue, Decimal::new(11000, 2));
        sales_mock.assert();
    }

    #[tokio::test]
    async fn transitions_use_put_and_surface_rejections() {
        let server = MockServer::start();
        let mut confirmed = sample_order();
        confirmed.confirm().unwrap();
        let code = confirmed.code.clone();

        let confirm_mock = server.mock(|when, then| {
            when.method(httpmock::Method::PUT).path(format!("/orders/{code}/confirmation"));
            then.status(200).json_body_obj(&confirmed);
        });
        let cancel_mock = server.mock(|when, then| {
            when.method(httpmock::Method::PUT).path(format!("/orders/{code}/cancellation"));
            then.status(400)
                .json_body(serde_json::json!({ "error": "order status cannot change" }));
        });
        let deliver_mock = server.mock(|when, then| {
            when.method(httpmock::Method::PUT).path(format!("/orders/{code}/delivery"));
            then.status(404)
                .json_body(serde_json::json!({ "error": "order not found" }));
        });

        let client = FoodClient::builder(&server.base_url())
            .unwrap()
            .with_timeout(Duration::from_secs(2))
            .with_header("x-request-source", "tests")
            .unwrap()
            .build()
            .unwrap();
        let updated = client.confirm_order(&code).await.unwrap();
        assert_eq!(updated.status, OrderStatus::Confirmed);

        let err = client.cancel_order(&code).await.unwrap_err();
        let status = err.downcast_ref::<reqwest::Error>().and_then(|e| e.status());
        assert_eq!(status, Some(reqwest::StatusCode::BAD_REQUEST));
        assert!(client.deliver_order(&code).await.is_err());

        confirm_mock.assert();
        cancel_mock.assert();
        deliver_mock.assert();
    }
}
