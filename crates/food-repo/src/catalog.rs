//! In-memory catalog store. Rows keep foreign keys and association id sets;
//! aggregates are assembled on every read so a change to a referenced row is
//! visible through everything that points at it.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use food_types::domain::business::{Address, Cuisine, PaymentMethod, Product, Restaurant};
use food_types::domain::location::{City, State};
use food_types::domain::user::{Group, User};
use food_types::ports::catalog_repository::{
    CityRepository, CuisineRepository, GroupRepository, PaymentMethodRepository,
    ProductRepository, RestaurantRepository, StateRepository, UserRepository,
};
use food_types::ports::order_repository::RepoError;
use rust_decimal::Decimal;

struct Table<T> {
    rows: DashMap<u64, T>,
    seq: AtomicU64,
}

impl<T: Clone> Table<T> {
    fn new() -> Self {
        Self {
            rows: DashMap::new(),
            seq: AtomicU64::new(0),
        }
    }

    /// `0` allocates a fresh id; an explicit id moves the sequence past it.
    fn id_for(&self, id: u64) -> u64 {
        if id == 0 {
            self.seq.fetch_add(1, Ordering::SeqCst) + 1
        } else {
            self.seq.fetch_max(id, Ordering::SeqCst);
            id
        }
    }

    fn get(&self, id: u64) -> Option<T> {
        self.rows.get(&id).map(|r| r.clone())
    }

    fn sorted(&self) -> Vec<(u64, T)> {
        let mut rows: Vec<(u64, T)> = self.rows.iter().map(|kv| (*kv.key(), kv.value().clone())).collect();
        rows.sort_by_key(|(id, _)| *id);
        rows
    }
}

#[derive(Clone)]
struct CityRow {
    name: String,
    state_id: u64,
}

#[derive(Clone)]
struct RestaurantRow {
    name: String,
    freight_rate: Decimal,
    cuisine_id: u64,
    address: Option<Address>,
    active: bool,
    open: bool,
    payment_method_ids: BTreeSet<u64>,
    responsible_ids: BTreeSet<u64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Clone)]
struct UserRow {
    name: String,
    email: String,
    group_ids: BTreeSet<u64>,
    created_at: DateTime<Utc>,
}

struct Tables {
    states: Table<State>,
    cities: Table<CityRow>,
    cuisines: Table<Cuisine>,
    payment_methods: Table<PaymentMethod>,
    restaurants: Table<RestaurantRow>,
    products: Table<Product>,
    users: Table<UserRow>,
    groups: Table<Group>,
}

#[derive(Clone)]
pub struct MemoryCatalog {
    tables: Arc<Tables>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(Tables {
                states: Table::new(),
                cities: Table::new(),
                cuisines: Table::new(),
                payment_methods: Table::new(),
                restaurants: Table::new(),
                products: Table::new(),
                users: Table::new(),
                groups: Table::new(),
            }),
        }
    }

    fn city(&self, id: u64) -> Option<City> {
        let row = self.tables.cities.get(id)?;
        Some(self.assemble_city(id, row))
    }

    fn assemble_city(&self, id: u64, row: CityRow) -> City {
        let state = self.tables.states.get(row.state_id).unwrap_or(State {
            id: row.state_id,
            name: String::new(),
        });
        City {
            id,
            name: row.name,
            state,
        }
    }

    fn assemble_user(&self, id: u64, row: UserRow) -> User {
        let groups = row
            .group_ids
            .iter()
            .filter_map(|gid| self.tables.groups.get(*gid))
            .collect();
        User {
            id,
            name: row.name,
            email: row.email,
            groups,
            created_at: row.created_at,
        }
    }

    fn assemble_restaurant(&self, id: u64, row: RestaurantRow) -> Restaurant {
        let cuisine = self.tables.cuisines.get(row.cuisine_id).unwrap_or(Cuisine {
            id: row.cuisine_id,
            name: String::new(),
        });
        let address = row.address.map(|mut address| {
            address.city = address.city_id.and_then(|cid| self.city(cid));
            address
        });
        let payment_methods = row
            .payment_method_ids
            .iter()
            .filter_map(|pid| self.tables.payment_methods.get(*pid))
            .collect();
        let responsibles = row
            .responsible_ids
            .iter()
            .filter_map(|uid| self.tables.users.get(*uid).map(|u| self.assemble_user(*uid, u)))
            .collect();
        Restaurant {
            id,
            name: row.name,
            freight_rate: row.freight_rate,
            cuisine,
            address,
            active: row.active,
            open: row.open,
            payment_methods,
            responsibles,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }

    fn missing(entity: &str, id: u64) -> RepoError {
        RepoError::DbError(format!("{entity} {id} does not exist"))
    }
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateRepository for MemoryCatalog {
    async fn find_all(&self) -> Result<Vec<State>, RepoError> {
        Ok(self.tables.states.sorted().into_iter().map(|(_, s)| s).collect())
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<State>, RepoError> {
        Ok(self.tables.states.get(id))
    }

    async fn save(&self, mut state: State) -> Result<State, RepoError> {
        state.id = self.tables.states.id_for(state.id);
        self.tables.states.rows.insert(state.id, state.clone());
        Ok(state)
    }

    async fn delete(&self, id: u64) -> Result<bool, RepoError> {
        if self.tables.cities.rows.iter().any(|c| c.state_id == id) {
            return Err(RepoError::InUse(format!("state {id}")));
        }
        Ok(self.tables.states.rows.remove(&id).is_some())
    }
}

#[async_trait]
impl CityRepository for MemoryCatalog {
    async fn find_all(&self) -> Result<Vec<City>, RepoError> {
        Ok(self
            .tables
            .cities
            .sorted()
            .into_iter()
            .map(|(id, row)| self.assemble_city(id, row))
            .collect())
    }

    async fn find_by_state(&self, state_id: u64) -> Result<Vec<City>, RepoError> {
        Ok(self
            .tables
            .cities
            .sorted()
            .into_iter()
            .filter(|(_, row)| row.state_id == state_id)
            .map(|(id, row)| self.assemble_city(id, row))
            .collect())
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<City>, RepoError> {
        Ok(self.city(id))
    }

    async fn save(&self, city: City) -> Result<City, RepoError> {
        let id = self.tables.cities.id_for(city.id);
        let row = CityRow {
            name: city.name,
            state_id: city.state.id,
        };
        self.tables.cities.rows.insert(id, row.clone());
        Ok(self.assemble_city(id, row))
    }

    async fn delete(&self, id: u64) -> Result<bool, RepoError> {
        let referenced = self
            .tables
            .restaurants
            .rows
            .iter()
            .any(|r| r.address.as_ref().and_then(|a| a.city_id) == Some(id));
        if referenced {
            return Err(RepoError::InUse(format!("city {id}")));
        }
        Ok(self.tables.cities.rows.remove(&id).is_some())
    }
}

#[async_trait]
impl CuisineRepository for MemoryCatalog {
    async fn find_all(&self) -> Result<Vec<Cuisine>, RepoError> {
        Ok(self.tables.cuisines.sorted().into_iter().map(|(_, c)| c).collect())
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<Cuisine>, RepoError> {
        Ok(self.tables.cuisines.get(id))
    }

    async fn save(&self, mut cuisine: Cuisine) -> Result<Cuisine, RepoError> {
        cuisine.id = self.tables.cuisines.id_for(cuisine.id);
        self.tables.cuisines.rows.insert(cuisine.id, cuisine.clone());
        Ok(cuisine)
    }

    async fn delete(&self, id: u64) -> Result<bool, RepoError> {
        if self.tables.restaurants.rows.iter().any(|r| r.cuisine_id == id) {
            return Err(RepoError::InUse(format!("cuisine {id}")));
        }
        Ok(self.tables.cuisines.rows.remove(&id).is_some())
    }
}

#[async_trait]
impl PaymentMethodRepository for MemoryCatalog {
    async fn find_all(&self) -> Result<Vec<PaymentMethod>, RepoError> {
        Ok(self
            .tables
            .payment_methods
            .sorted()
            .into_iter()
            .map(|(_, p)| p)
            .collect())
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<PaymentMethod>, RepoError> {
        Ok(self.tables.payment_methods.get(id))
    }

    async fn save(&self, mut payment_method: PaymentMethod) -> Result<PaymentMethod, RepoError> {
        payment_method.id = self.tables.payment_methods.id_for(payment_method.id);
        self.tables
            .payment_methods
            .rows
            .insert(payment_method.id, payment_method.clone());
        Ok(payment_method)
    }

    async fn delete(&self, id: u64) -> Result<bool, RepoError> {
        let referenced = self
            .tables
            .restaurants
            .rows
            .iter()
            .any(|r| r.payment_method_ids.contains(&id));
        if referenced {
            return Err(RepoError::InUse(format!("payment method {id}")));
        }
        Ok(self.tables.payment_methods.rows.remove(&id).is_some())
    }
}

#[async_trait]
impl RestaurantRepository for MemoryCatalog {
    async fn find_all(&self) -> Result<Vec<Restaurant>, RepoError> {
        Ok(self
            .tables
            .restaurants
            .sorted()
            .into_iter()
            .map(|(id, row)| self.assemble_restaurant(id, row))
            .collect())
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<Restaurant>, RepoError> {
        Ok(self
            .tables
            .restaurants
            .get(id)
            .map(|row| self.assemble_restaurant(id, row)))
    }

    async fn save(&self, restaurant: Restaurant) -> Result<Restaurant, RepoError> {
        let id = self.tables.restaurants.id_for(restaurant.id);
        // New rows take their associations from the aggregate; existing rows keep theirs.
        let (payment_method_ids, responsible_ids) = match self.tables.restaurants.get(id) {
            Some(existing) => (existing.payment_method_ids, existing.responsible_ids),
            None => (
                restaurant.payment_methods.iter().map(|p| p.id).collect(),
                restaurant.responsibles.iter().map(|u| u.id).collect(),
            ),
        };
        let address = restaurant.address.map(|mut address| {
            address.city_id = address.city_id.or(address.city.as_ref().map(|c| c.id));
            address.city = None;
            address
        });
        let row = RestaurantRow {
            name: restaurant.name,
            freight_rate: restaurant.freight_rate,
            cuisine_id: restaurant.cuisine.id,
            address,
            active: restaurant.active,
            open: restaurant.open,
            payment_method_ids,
            responsible_ids,
            created_at: restaurant.created_at,
            updated_at: Utc::now(),
        };
        self.tables.restaurants.rows.insert(id, row.clone());
        Ok(self.assemble_restaurant(id, row))
    }

    async fn add_payment_method(&self, restaurant_id: u64, payment_method_id: u64) -> Result<(), RepoError> {
        let mut row = self
            .tables
            .restaurants
            .rows
            .get_mut(&restaurant_id)
            .ok_or_else(|| Self::missing("restaurant", restaurant_id))?;
        row.payment_method_ids.insert(payment_method_id);
        Ok(())
    }

    async fn remove_payment_method(&self, restaurant_id: u64, payment_method_id: u64) -> Result<(), RepoError> {
        let mut row = self
            .tables
            .restaurants
            .rows
            .get_mut(&restaurant_id)
            .ok_or_else(|| Self::missing("restaurant", restaurant_id))?;
        row.payment_method_ids.remove(&payment_method_id);
        Ok(())
    }

    async fn add_responsible(&self, restaurant_id: u64, user_id: u64) -> Result<(), RepoError> {
        let mut row = self
            .tables
            .restaurants
            .rows
            .get_mut(&restaurant_id)
            .ok_or_else(|| Self::missing("restaurant", restaurant_id))?;
        row.responsible_ids.insert(user_id);
        Ok(())
    }

    async fn remove_responsible(&self, restaurant_id: u64, user_id: u64) -> Result<(), RepoError> {
        let mut row = self
            .tables
            .restaurants
            .rows
            .get_mut(&restaurant_id)
            .ok_or_else(|| Self::missing("restaurant", restaurant_id))?;
        row.responsible_ids.remove(&user_id);
        Ok(())
    }
}

#[async_trait]
impl ProductRepository for MemoryCatalog {
    async fn find_all_by_restaurant(
        &self,
        restaurant_id: u64,
        include_inactive: bool,
    ) -> Result<Vec<Product>, RepoError> {
        Ok(self
            .tables
            .products
            .sorted()
            .into_iter()
            .map(|(_, p)| p)
            .filter(|p| p.restaurant_id == restaurant_id && (include_inactive || p.active))
            .collect())
    }

    async fn find_by_id(&self, restaurant_id: u64, product_id: u64) -> Result<Option<Product>, RepoError> {
        Ok(self
            .tables
            .products
            .get(product_id)
            .filter(|p| p.restaurant_id == restaurant_id))
    }

    async fn save(&self, mut product: Product) -> Result<Product, RepoError> {
        product.id = self.tables.products.id_for(product.id);
        self.tables.products.rows.insert(product.id, product.clone());
        Ok(product)
    }
}

#[async_trait]
impl UserRepository for MemoryCatalog {
    async fn find_all(&self) -> Result<Vec<User>, RepoError> {
        Ok(self
            .tables
            .users
            .sorted()
            .into_iter()
            .map(|(id, row)| self.assemble_user(id, row))
            .collect())
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<User>, RepoError> {
        Ok(self.tables.users.get(id).map(|row| self.assemble_user(id, row)))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let found = self
            .tables
            .users
            .sorted()
            .into_iter()
            .find(|(_, row)| row.email.eq_ignore_ascii_case(email));
        Ok(found.map(|(id, row)| self.assemble_user(id, row)))
    }

    async fn save(&self, user: User) -> Result<User, RepoError> {
        let taken = self
            .tables
            .users
            .rows
            .iter()
            .any(|row| *row.key() != user.id && row.email.eq_ignore_ascii_case(&user.email));
        if taken {
            return Err(RepoError::Duplicate(format!("user email {}", user.email)));
        }
        let id = self.tables.users.id_for(user.id);
        let group_ids = match self.tables.users.get(id) {
            Some(existing) => existing.group_ids,
            None => user.groups.iter().map(|g| g.id).collect(),
        };
        let row = UserRow {
            name: user.name,
            email: user.email,
            group_ids,
            created_at: user.created_at,
        };
        self.tables.users.rows.insert(id, row.clone());
        Ok(self.assemble_user(id, row))
    }

    async fn add_group(&self, user_id: u64, group_id: u64) -> Result<(), RepoError> {
        let mut row = self
            .tables
            .users
            .rows
            .get_mut(&user_id)
            .ok_or_else(|| Self::missing("user", user_id))?;
        row.group_ids.insert(group_id);
        Ok(())
    }

    async fn remove_group(&self, user_id: u64, group_id: u64) -> Result<(), RepoError> {
        let mut row = self
            .tables
            .users
            .rows
            .get_mut(&user_id)
            .ok_or_else(|| Self::missing("user", user_id))?;
        row.group_ids.remove(&group_id);
        Ok(())
    }
}

#[async_trait]
impl GroupRepository for MemoryCatalog {
    async fn find_all(&self) -> Result<Vec<Group>, RepoError> {
        Ok(self.tables.groups.sorted().into_iter().map(|(_, g)| g).collect())
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<Group>, RepoError> {
        Ok(self.tables.groups.get(id))
    }

    async fn save(&self, mut group: Group) -> Result<Group, RepoError> {
        group.id = self.tables.groups.id_for(group.id);
        self.tables.groups.rows.insert(group.id, group.clone());
        Ok(group)
    }
}
