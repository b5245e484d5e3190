//! Registration scenarios exercised through the public API only.
//!
//! Handlers are plain `Arc<dyn Fn() -> String>` closures so the tests can
//! call them without any HTTP machinery.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use apimount::{
    Api, ApiConfiguration, ApiHost, ConfigurationError, ConventionBuilder, ExposeEndpoint,
    ExposeEndpoints, Exposure, HttpVerb, Metadata, RegistrationError,
};

type Handler = Arc<dyn Fn() -> String + Send + Sync>;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Orders {
    calls: AtomicUsize,
}

impl Orders {
    fn list(&self) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        "[]".to_string()
    }

    fn create(&self) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        "created".to_string()
    }
}

impl Api for Orders {
    fn name(&self) -> &str {
        "Orders"
    }
}

impl ExposeEndpoints<Handler> for Orders {
    fn expose(exposure: &mut Exposure<Self, Handler>) {
        exposure
            .method("list", ExposeEndpoint::get("/orders"), |api| {
                Arc::new(move || api.list()) as Handler
            })
            .method(
                "create",
                ExposeEndpoint::post("/orders").named("CreateOrder"),
                |api| Arc::new(move || api.create()) as Handler,
            );
    }
}

struct Customers;

impl Api for Customers {
    fn name(&self) -> &str {
        "Customers"
    }

    fn route_prefix(&self) -> &str {
        "/crm"
    }
}

impl ExposeEndpoints<Handler> for Customers {
    fn expose(exposure: &mut Exposure<Self, Handler>) {
        exposure
            .method("list", ExposeEndpoint::get("/customers"), |_| {
                Arc::new(|| "customers".to_string()) as Handler
            })
            .method("get", ExposeEndpoint::get("/customers/{id}"), |_| {
                Arc::new(|| "customer".to_string()) as Handler
            })
            .method("remove", ExposeEndpoint::delete("/customers/{id}"), |_| {
                Arc::new(|| "removed".to_string()) as Handler
            });
    }
}

/// One method has no route pattern.
struct Reports;

impl Api for Reports {
    fn name(&self) -> &str {
        "Reports"
    }
}

impl ExposeEndpoints<Handler> for Reports {
    fn expose(exposure: &mut Exposure<Self, Handler>) {
        exposure
            .method("daily", ExposeEndpoint::get("/reports/daily"), |_| {
                Arc::new(|| "daily".to_string()) as Handler
            })
            .method("adhoc", ExposeEndpoint::new(), |_| {
                Arc::new(|| "adhoc".to_string()) as Handler
            });
    }
}

fn configured_host() -> ApiHost<Handler> {
    let mut host = ApiHost::new();
    host.add_api_module(ApiConfiguration::default());
    host
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn orders_api_yields_two_endpoints() {
    let mut host = configured_host();
    host.map_api(Arc::new(Orders::default())).unwrap();

    let snapshot = host.registry().snapshot();
    assert_eq!(snapshot.len(), 2);

    assert_eq!(snapshot[0].verbs(), &["GET"]);
    assert_eq!(snapshot[0].pattern(), "/orders");
    assert_eq!(snapshot[0].name(), "GET: list");

    assert_eq!(snapshot[1].verbs(), &["POST"]);
    assert_eq!(snapshot[1].pattern(), "/orders");
    assert_eq!(snapshot[1].name(), "CreateOrder");
}

#[test]
fn convention_on_composite_reaches_every_endpoint() {
    let mut host = configured_host();
    let builder = host.map_api(Arc::new(Orders::default())).unwrap();
    builder.require_authorization();

    let snapshot = host.registry().snapshot();
    for endpoint in snapshot.iter() {
        assert!(endpoint.requires_authorization(), "{} is open", endpoint.name());
        assert!(endpoint
            .metadata()
            .contains(&Metadata::Authorize { policy: None }));
    }
}

#[test]
fn add_api_before_configuration_registers_nothing() {
    let mut host: ApiHost<Handler> = ApiHost::new();

    let err = host.add_api(Arc::new(Orders::default())).err().unwrap();
    assert_eq!(
        err,
        RegistrationError::Configuration(ConfigurationError::ModuleNotConfigured)
    );
    assert!(host.map_api(Arc::new(Orders::default())).is_err());
    assert!(host.registry().is_empty());
    assert!(host.module().is_none());
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[test]
fn one_leaf_per_exposed_method() {
    let mut host = configured_host();

    let orders = host.map_api(Arc::new(Orders::default())).unwrap();
    let customers = host.map_api(Arc::new(Customers)).unwrap();

    assert_eq!(orders.leaf_count(), 2);
    assert_eq!(customers.leaf_count(), 3);
    assert!(matches!(customers, ConventionBuilder::Composite(_)));
    assert_eq!(host.registry().len(), 5);
    assert_eq!(host.module().unwrap().apis().len(), 2);
}

#[test]
fn route_prefix_is_joined_onto_patterns() {
    let mut host = configured_host();
    host.map_api(Arc::new(Customers)).unwrap();

    let patterns: Vec<_> = host
        .registry()
        .snapshot()
        .iter()
        .map(|e| e.pattern().to_string())
        .collect();
    assert_eq!(
        patterns,
        vec!["/crm/customers", "/crm/customers/{id}", "/crm/customers/{id}"]
    );
}

#[test]
fn missing_pattern_leaves_earlier_apis_intact() {
    let mut host = configured_host();
    host.map_api(Arc::new(Orders::default()))
        .unwrap()
        .with_tags(["orders"]);
    let before: Vec<_> = host
        .registry()
        .snapshot()
        .iter()
        .map(|e| e.describe())
        .collect();

    let err = host.map_api(Arc::new(Reports)).unwrap_err();
    assert_eq!(
        err,
        RegistrationError::Configuration(ConfigurationError::MissingPattern {
            endpoint: "GET: adhoc".into()
        })
    );

    let after: Vec<_> = host
        .registry()
        .snapshot()
        .iter()
        .map(|e| e.describe())
        .collect();
    assert_eq!(before, after);
    assert_eq!(host.module().unwrap().apis().len(), 1);
}

#[test]
fn handlers_call_into_the_registered_instance() {
    let orders = Arc::new(Orders::default());
    let mut host = configured_host();
    host.map_api(Arc::clone(&orders)).unwrap();

    let snapshot = host.registry().snapshot();
    assert_eq!((snapshot[0].handler())(), "[]");
    assert_eq!((snapshot[1].handler())(), "created");
    assert_eq!(orders.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn require_auth_module_with_anonymous_override() {
    let mut host: ApiHost<Handler> = ApiHost::new();
    host.add_api_module(ApiConfiguration {
        use_authorization: true,
    });
    host.map_api(Arc::new(Orders::default())).unwrap();
    host.map_methods(
        "/health",
        "health",
        &[HttpVerb::Get],
        Arc::new(|| "ok".to_string()),
    )
    .unwrap()
    .allow_anonymous();

    let snapshot = host.registry().snapshot();
    assert!(snapshot[0].requires_authorization());
    assert!(snapshot[1].requires_authorization());
    assert!(!snapshot[2].requires_authorization());
}

#[test]
fn route_table_serialises_to_json() {
    let mut host = configured_host();
    host.map_api(Arc::new(Orders::default()))
        .unwrap()
        .require_authorization_with("orders");

    let table: Vec<_> = host
        .registry()
        .snapshot()
        .iter()
        .map(|e| e.describe())
        .collect();
    let json = serde_json::to_value(&table).unwrap();

    assert_eq!(json[0]["pattern"], "/orders");
    assert_eq!(json[0]["requires_authorization"], true);
    assert_eq!(json[1]["name"], "CreateOrder");
}
