use food_types::domain::business::{Address, Cuisine, PaymentMethod, Product, Restaurant};
use food_types::domain::location::{City, State};
use food_types::domain::user::{Group, Permission, User};
use food_types::ports::catalog_repository::{
    CityRepository, CuisineRepository, GroupRepository, PaymentMethodRepository, ProductRepository,
    RestaurantRepository, StateRepository, UserRepository,
};
use food_types::ports::order_repository::RepoError;
use rust_decimal::Decimal;

use crate::catalog::MemoryCatalog;

/// Ids of the rows written by [`seed_demo_data`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoCatalog {
    pub state_id: u64,
    pub city_id: u64,
    pub cuisine_id: u64,
    /// Accepted by the demo restaurant.
    pub card_id: u64,
    /// Not accepted by the demo restaurant.
    pub cash_id: u64,
    pub restaurant_id: u64,
    /// Priced 10.00.
    pub product_a_id: u64,
    /// Priced 3.00.
    pub product_b_id: u64,
    pub client_id: u64,
}

/// One restaurant with freight 5.00, two products, one customer.
pub async fn seed_demo_data(catalog: &MemoryCatalog) -> Result<DemoCatalog, RepoError> {
    let state = StateRepository::save(catalog, State { id: 0, name: "São Paulo".into() }).await?;
    let city = CityRepository::save(
        catalog,
        City {
            id: 0,
            name: "Campinas".into(),
            state: state.clone(),
        },
    )
    .await?;
    let cuisine = CuisineRepository::save(catalog, Cuisine { id: 0, name: "Thai".into() }).await?;
    let card = PaymentMethodRepository::save(
        catalog,
        PaymentMethod {
            id: 0,
            description: "Credit card".into(),
        },
    )
    .await?;
    let cash = PaymentMethodRepository::save(
        catalog,
        PaymentMethod {
            id: 0,
            description: "Cash".into(),
        },
    )
    .await?;

    let mut restaurant = Restaurant::new("Thai Gourmet", Decimal::new(500, 2), cuisine.clone());
    restaurant.open = true;
    restaurant.address = Some(Address {
        zip_code: "13010-000".into(),
        street: "Rua Barão de Jaguara".into(),
        number: "1000".into(),
        district: "Centro".into(),
        city_id: Some(city.id),
        ..Address::default()
    });
    restaurant.payment_methods = vec![card.clone()];
    let restaurant = RestaurantRepository::save(catalog, restaurant).await?;

    let product_a = ProductRepository::save(
        catalog,
        Product {
            id: 0,
            restaurant_id: restaurant.id,
            name: "Pad Thai".into(),
            description: "Rice noodles, tamarind, peanuts".into(),
            price: Decimal::new(1000, 2),
            active: true,
        },
    )
    .await?;
    let product_b = ProductRepository::save(
        catalog,
        Product {
            id: 0,
            restaurant_id: restaurant.id,
            name: "Spring roll".into(),
            description: String::new(),
            price: Decimal::new(300, 2),
            active: true,
        },
    )
    .await?;

    let customers = GroupRepository::save(
        catalog,
        Group {
            id: 0,
            name: "Customers".into(),
            permissions: vec![Permission {
                id: 1,
                name: "ORDER_CREATE".into(),
                description: "May place orders".into(),
            }],
        },
    )
    .await?;
    let client = UserRepository::save(catalog, User::new("Ana Lima", "ana@food.dev")).await?;
    UserRepository::add_group(catalog, client.id, customers.id).await?;

    tracing::info!(
        restaurant_id = restaurant.id,
        client_id = client.id,
        "demo catalog seeded"
    );
    Ok(DemoCatalog {
        state_id: state.id,
        city_id: city.id,
        cuisine_id: cuisine.id,
        card_id: card.id,
        cash_id: cash.id,
        restaurant_id: restaurant.id,
        product_a_id: product_a.id,
        product_b_id: product_b.id,
        client_id: client.id,
    })
}
