use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    serve, Json, Router,
};
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::application::Services;
use crate::errors::AppError;
use food_types::domain::business::{Cuisine, PaymentMethod, Restaurant};
use food_types::domain::location::{City, State as Region};
use food_types::domain::order::{NewOrder, Order, OrderStatus};
use food_types::domain::page::{Page, Pageable, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use food_types::domain::sales::DailySales;
use food_types::domain::user::User;
use food_types::ports::order_repository::{OrderFilter, SalesFilter};

#[derive(Clone)]
pub struct HttpServerConfig {
    pub port: String,
}

#[derive(Clone)]
pub struct HttpServer {
    pub services: Services,
    pub config: HttpServerConfig,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    cache: &'static str,
}

impl HttpServer {
    pub async fn new(services: Services, config: HttpServerConfig) -> anyhow::Result<Self> {
        Ok(Self { services, config })
    }

    pub fn router(&self) -> Router {
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &axum::extract::Request<_>| {
                let uri = request.uri().to_string();
                let request_id = Uuid::new_v4();
                tracing::info_span!(
                    "http_request",
                    %request_id,
                    method = %request.method(),
                    uri
                )
            })
            .on_request(
                |request: &axum::extract::Request<_>, span: &tracing::Span| {
                    tracing::info!(
                        parent: span,
                        method = %request.method(),
                        uri = %request.uri(),
                        "request"
                    );
                },
            )
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &tracing::Span| {
                    tracing::info!(
                        parent: span,
                        status = %response.status(),
                        latency_ms = %latency.as_millis(),
                        "response"
                    );
                },
            );

        Router::new()
            .route("/health", get(health))
            .route("/orders", get(search_orders).post(create_order))
            .route("/orders/{code}", get(get_order))
            .route("/orders/{code}/confirmation", put(confirm_order))
            .route("/orders/{code}/cancellation", put(cancel_order))
            .route("/orders/{code}/delivery", put(deliver_order))
            .route("/statistics/daily-sales", get(daily_sales))
            .route("/states", get(list_states))
            .route("/states/{id}", get(get_state))
            .route("/cities", get(list_cities))
            .route("/cities/{id}", get(get_city))
            .route("/cuisines/{id}", get(get_cuisine))
            .route("/payment-methods", get(list_payment_methods))
            .route("/payment-methods/{id}", get(get_payment_method))
            .route("/restaurants/{id}", get(get_restaurant))
            .route("/users/{id}", get(get_user))
            .layer(trace_layer)
            .with_state(self.services.clone())
    }

    pub async fn run(self) -> anyhow::Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Serves until `shutdown` resolves, letting in-flight requests finish.
    pub async fn run_until(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let app = self.router();
        let addr: SocketAddr = format!("0.0.0.0:{}", self.config.port).parse()?;
        tracing::info!("starting server on {}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        serve(listener, app.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}

fn parse_id(raw: &str) -> Result<u64, AppError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("invalid id: {raw:?}")))
}

fn query_value<T>(params: &HashMap<String, String>, key: &str) -> Result<Option<T>, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match params.get(key).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| AppError::BadRequest(format!("invalid {key} {raw:?}: {e}"))),
        None => Ok(None),
    }
}

fn search_params(params: &HashMap<String, String>) -> Result<(OrderFilter, Pageable), AppError> {
    let filter = OrderFilter {
        client_id: query_value(params, "client_id")?,
        restaurant_id: query_value(params, "restaurant_id")?,
        status: query_value::<OrderStatus>(params, "status")?,
        created_from: query_value::<NaiveDate>(params, "created_from")?,
        created_to: query_value::<NaiveDate>(params, "created_to")?,
    };
    if let (Some(from), Some(to)) = (filter.created_from, filter.created_to) {
        if from > to {
            return Err(AppError::BadRequest(format!(
                "created_from {from} is after created_to {to}"
            )));
        }
    }

    let page = query_value(params, "page")?.unwrap_or(0);
    let size = query_value(params, "size")?.unwrap_or(DEFAULT_PAGE_SIZE);
    if size == 0 || size > MAX_PAGE_SIZE {
        return Err(AppError::BadRequest(format!(
            "size must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }
    Ok((filter, Pageable::new(page, size)))
}

/// A `+` in a query string decodes to a space, so an unsigned offset counts as east of UTC.
fn parse_offset(raw: &str) -> Result<FixedOffset, AppError> {
    let raw = raw.trim();
    let signed = if raw.starts_with(['+', '-']) {
        raw.to_string()
    } else {
        format!("+{raw}")
    };
    signed
        .parse()
        .map_err(|e| AppError::BadRequest(format!("invalid time_offset {raw:?}: {e}")))
}

fn sales_params(params: &HashMap<String, String>) -> Result<(SalesFilter, FixedOffset), AppError> {
    let filter = SalesFilter {
        restaurant_id: query_value(params, "restaurant_id")?,
        created_from: query_value::<DateTime<Utc>>(params, "created_from")?,
        created_to: query_value::<DateTime<Utc>>(params, "created_to")?,
    };
    let offset = match params.get("time_offset").filter(|v| !v.trim().is_empty()) {
        Some(raw) => parse_offset(raw)?,
        None => Utc.fix(),
    };
    Ok((filter, offset))
}

async fn health(State(services): State<Services>) -> (StatusCode, Json<HealthResponse>) {
    let cache = match services.cache().ping().await {
        Ok(()) => "up",
        Err(_) => "down",
    };
    (StatusCode::OK, Json(HealthResponse { status: "ok", cache }))
}

async fn create_order(
    State(services): State<Services>,
    Json(payload): Json<NewOrder>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    let order = services.orders.emit(payload).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn search_orders(
    State(services): State<Services>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Page<Order>>, AppError> {
    let (filter, page) = search_params(&params)?;
    Ok(Json(services.orders.search(&filter, page).await?))
}

async fn get_order(
    State(services): State<Services>,
    Path(code): Path<String>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(services.orders.find_by_code(&code).await?))
}

async fn confirm_order(
    State(services): State<Services>,
    Path(code): Path<String>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(services.order_flow.confirm(&code).await?))
}

async fn cancel_order(
    State(services): State<Services>,
    Path(code): Path<String>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(services.order_flow.cancel(&code).await?))
}

async fn deliver_order(
    State(services): State<Services>,
    Path(code): Path<String>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(services.order_flow.deliver(&code).await?))
}

async fn daily_sales(
    State(services): State<Services>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<DailySales>>, AppError> {
    let (filter, offset) = sales_params(&params)?;
    Ok(Json(services.orders.daily_sales(&filter, offset).await?))
}

async fn list_states(State(services): State<Services>) -> Result<Json<Vec<Region>>, AppError> {
    Ok(Json(services.states.find_all().await?))
}

async fn get_state(
    State(services): State<Services>,
    Path(id): Path<String>,
) -> Result<Json<Region>, AppError> {
    Ok(Json(services.states.find_by_id(parse_id(&id)?).await?))
}

async fn list_cities(State(services): State<Services>) -> Result<Json<Vec<City>>, AppError> {
    Ok(Json(services.cities.find_all().await?))
}

async fn get_city(
    State(services): State<Services>,
    Path(id): Path<String>,
) -> Result<Json<City>, AppError> {
    Ok(Json(services.cities.find_by_id(parse_id(&id)?).await?))
}

async fn get_cuisine(
    State(services): State<Services>,
    Path(id): Path<String>,
) -> Result<Json<Cuisine>, AppError> {
    Ok(Json(services.cuisines.find_by_id(parse_id(&id)?).await?))
}

async fn list_payment_methods(
    State(services): State<Services>,
) -> Result<Json<Vec<PaymentMethod>>, AppError> {
    Ok(Json(services.payment_methods.find_all().await?))
}

async fn get_payment_method(
    State(services): State<Services>,
    Path(id): Path<String>,
) -> Result<Json<PaymentMethod>, AppError> {
    Ok(Json(services.payment_methods.find_by_id(parse_id(&id)?).await?))
}

async fn get_restaurant(
    State(services): State<Services>,
    Path(id): Path<String>,
) -> Result<Json<Restaurant>, AppError> {
    Ok(Json(services.restaurants.find_by_id(parse_id(&id)?).await?))
}

async fn get_user(
    State(services): State<Services>,
    Path(id): Path<String>,
) -> Result<Json<User>, AppError> {
    Ok(Json(services.users.find_by_id(parse_id(&id)?).await?))
}
