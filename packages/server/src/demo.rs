//! Demo APIs mounted by the `apimount-demo` binary and the conformance suite.
//!
//! | API | Prefix | Endpoints |
//! |-----|--------|-----------|
//! | [`OrdersApi`] | `/api` | `GET /orders`, `POST /orders`, `GET /orders/{id}`, `DELETE /orders/{id}` |
//! | [`HealthApi`] | (none) | `GET /health` |
//!
//! Writes on the orders API always require authorization under the
//! `orders:write` policy. The health endpoint is always anonymous.

use std::sync::{Arc, PoisonError, RwLock};

use axum::{
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::StatusCode,
    Json,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use apimount::{
    Api, ApiConfiguration, ApiHost, EndpointBuilder, ExposeEndpoint, ExposeEndpoints, Exposure,
    Metadata, RegistrationError,
};

use crate::{
    config::ServerConfig,
    error::AppError,
    handler::{ApiHandler, ExposureExt},
};

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub item: String,
    pub quantity: u32,
}

/// Request body of `POST /api/orders`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
    pub item: String,
    pub quantity: u32,
}

#[derive(Default)]
struct OrderBook {
    next_id: u64,
    orders: IndexMap<u64, Order>,
}

/// An in-memory order book exposed over HTTP.
#[derive(Default)]
pub struct OrdersApi {
    book: RwLock<OrderBook>,
}

impl OrdersApi {
    async fn list(api: Arc<Self>, _req: Request) -> Json<Vec<Order>> {
        let book = api.book.read().unwrap_or_else(PoisonError::into_inner);
        Json(book.orders.values().cloned().collect())
    }

    async fn create(api: Arc<Self>, req: Request) -> Result<(StatusCode, Json<Order>), AppError> {
        let Json(new) = Json::<NewOrder>::from_request(req, &())
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        if new.item.trim().is_empty() {
            return Err(AppError::UnprocessableEntity("item must not be empty".into()));
        }
        if new.quantity == 0 {
            return Err(AppError::UnprocessableEntity("quantity must be at least 1".into()));
        }

        let mut book = api.book.write().unwrap_or_else(PoisonError::into_inner);
        book.next_id += 1;
        let order = Order {
            id: book.next_id,
            item: new.item,
            quantity: new.quantity,
        };
        book.orders.insert(order.id, order.clone());
        tracing::debug!(id = order.id, "order created");
        Ok((StatusCode::CREATED, Json(order)))
    }

    async fn get(api: Arc<Self>, req: Request) -> Result<Json<Order>, AppError> {
        let id = order_id(req).await?;
        let book = api.book.read().unwrap_or_else(PoisonError::into_inner);
        book.orders
            .get(&id)
            .cloned()
            .map(Json)
            .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))
    }

    async fn cancel(api: Arc<Self>, req: Request) -> Result<StatusCode, AppError> {
        let id = order_id(req).await?;
        let mut book = api.book.write().unwrap_or_else(PoisonError::into_inner);
        match book.orders.shift_remove(&id) {
            Some(_) => Ok(StatusCode::NO_CONTENT),
            None => Err(AppError::NotFound(format!("order {id} not found"))),
        }
    }
}

async fn order_id(req: Request) -> Result<u64, AppError> {
    let (mut parts, _body) = req.into_parts();
    let Path(id) = Path::<u64>::from_request_parts(&mut parts, &())
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?;
    Ok(id)
}

impl Api for OrdersApi {
    fn name(&self) -> &str {
        "Orders"
    }

    fn route_prefix(&self) -> &str {
        "/api"
    }
}

impl ExposeEndpoints<ApiHandler> for OrdersApi {
    fn expose(exposure: &mut Exposure<Self, ApiHandler>) {
        exposure
            .handle("list", ExposeEndpoint::get("/orders"), Self::list)
            .handle(
                "create",
                ExposeEndpoint::post("/orders").named("CreateOrder"),
                Self::create,
            )
            .handle("get", ExposeEndpoint::get("/orders/{id}"), Self::get)
            .handle(
                "cancel",
                ExposeEndpoint::delete("/orders/{id}").named("CancelOrder"),
                Self::cancel,
            );
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

/// Liveness probe.
pub struct HealthApi;

impl HealthApi {
    async fn check(_api: Arc<Self>, _req: Request) -> Json<serde_json::Value> {
        Json(serde_json::json!({ "status": "ok" }))
    }
}

impl Api for HealthApi {
    fn name(&self) -> &str {
        "Health"
    }
}

impl ExposeEndpoints<ApiHandler> for HealthApi {
    fn expose(exposure: &mut Exposure<Self, ApiHandler>) {
        exposure.handle("check", ExposeEndpoint::get("/health"), Self::check);
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

/// Register the demo APIs on a fresh host configured from `config`.
pub fn demo_host(config: &ServerConfig) -> Result<ApiHost<ApiHandler>, RegistrationError> {
    let mut host = ApiHost::new();
    host.add_api_module(ApiConfiguration {
        use_authorization: config.require_auth,
    });

    host.map_api(Arc::new(OrdersApi::default()))?
        .with_tags(["orders"])
        .add(|endpoint: &mut EndpointBuilder| {
            if !endpoint.verbs().contains(&"GET") {
                endpoint.metadata.push(Metadata::Authorize {
                    policy: Some("orders:write".into()),
                });
            }
        });

    host.map_api(Arc::new(HealthApi))?
        .with_tags(["health"])
        .allow_anonymous();

    Ok(host)
}
