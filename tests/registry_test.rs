use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use httpapi::prelude::*;

struct OrdersApi {
    client: ApiClient,
}

impl HttpApi for OrdersApi {
    fn from_client(client: ApiClient) -> Self {
        Self { client }
    }

    fn contract_name() -> &'static str {
        "OrdersApi"
    }
}

struct InventoryApi {
    client: ApiClient,
}

impl HttpApi for InventoryApi {
    fn from_client(client: ApiClient) -> Self {
        Self { client }
    }
}

fn orders_config() -> HttpApiConfig {
    HttpApiConfig::new().with_base_url("https://orders.example.com/api/")
}

#[test]
fn resolve_before_register_is_not_registered() {
    let registry = HttpApiRegistry::new();
    match registry.resolve::<OrdersApi>() {
        Err(HttpApiError::NotRegistered(name)) => assert_eq!(name, "OrdersApi"),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("resolution must fail before registration"),
    }
}

#[test]
fn second_registration_fails_and_first_stays_resolvable() {
    let registry = HttpApiRegistry::new();
    registry.register_with::<OrdersApi>(orders_config()).unwrap();

    let err = registry
        .register_with::<OrdersApi>(HttpApiConfig::new().with_base_url("https://other.example.com/"))
        .unwrap_err();
    assert!(matches!(err, HttpApiError::DuplicateRegistration(_)));

    let orders = registry.resolve::<OrdersApi>().unwrap();
    assert_eq!(
        orders.client.url("orders/42").unwrap().as_str(),
        "https://orders.example.com/api/orders/42"
    );
}

#[test]
fn concurrent_registration_admits_exactly_one_factory() {
    let registry = Arc::new(HttpApiRegistry::new());
    let successes = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let registry = registry.clone();
            let successes = successes.clone();
            thread::spawn(move || match registry.register::<OrdersApi>() {
                Ok(_) => {
                    successes.fetch_add(1, Ordering::SeqCst);
                }
                Err(HttpApiError::DuplicateRegistration(_)) => {}
                Err(other) => panic!("unexpected error: {other}"),
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(successes.load(Ordering::SeqCst), 1);
    assert_eq!(registry.len(), 1);
}

#[test]
fn concurrent_resolution_shares_one_transport() {
    let registry = Arc::new(HttpApiRegistry::new());
    let factory = registry.register_with::<OrdersApi>(orders_config()).unwrap();

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let registry = registry.clone();
            thread::spawn(move || {
                (0..50)
                    .map(|_| registry.resolve::<OrdersApi>().unwrap().client)
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let clients: Vec<ApiClient> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();

    assert_eq!(clients.len(), 32 * 50);
    assert!(clients.iter().all(|c| c.same_transport(&clients[0])));
    assert_eq!(factory.generation(), 1);
}

#[test]
fn each_contract_owns_its_transport() {
    let registry = HttpApiRegistry::new();
    registry.register_with::<OrdersApi>(orders_config()).unwrap();
    registry
        .register::<InventoryApi>()
        .unwrap()
        .configure(|c| c.base_url = Some("https://inventory.example.com/".into()));

    let orders = registry.resolve::<OrdersApi>().unwrap();
    let inventory = registry.resolve::<InventoryApi>().unwrap();
    assert!(!orders.client.same_transport(&inventory.client));
    assert_eq!(
        inventory.client.url("skus").unwrap().as_str(),
        "https://inventory.example.com/skus"
    );
}

#[test]
fn registries_are_isolated() {
    let a = HttpApiRegistry::new();
    let b = HttpApiRegistry::new();
    a.register::<OrdersApi>().unwrap();

    assert!(a.is_registered::<OrdersApi>());
    assert!(!b.is_registered::<OrdersApi>());
    assert!(b.register::<OrdersApi>().is_ok());
}

#[test]
fn expired_transport_is_replaced_on_next_resolution() {
    let registry = HttpApiRegistry::new();
    let factory = registry.register_with::<OrdersApi>(orders_config()).unwrap();
    factory.set_lifetime(std::time::Duration::from_millis(1));

    let old = registry.resolve::<OrdersApi>().unwrap();
    thread::sleep(std::time::Duration::from_millis(10));
    let new = registry.resolve::<OrdersApi>().unwrap();

    assert!(!old.client.same_transport(&new.client));
    assert_eq!(factory.generation(), 2);
}
