use std::time::Duration;

use food_types::domain::location::{City, State};
use food_types::ports::cache::CacheError;
use serde::{Deserialize, Serialize};

use super::store::CacheStore;

pub const ALL_STATES_KEY: &str = "state:all";
pub const ALL_CITIES_KEY: &str = "city:all";

pub fn state_key(id: u64) -> String {
    format!("state:cache:{id}")
}

pub fn city_key(id: u64) -> String {
    format!("city:cache:{id}")
}

pub fn cities_by_state_key(state_id: u64) -> String {
    format!("city:state:{state_id}")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CachedState {
    pub id: u64,
    pub name: String,
}

impl From<&State> for CachedState {
    fn from(state: &State) -> Self {
        Self {
            id: state.id,
            name: state.name.clone(),
        }
    }
}

impl From<CachedState> for State {
    fn from(cached: CachedState) -> Self {
        State {
            id: cached.id,
            name: cached.name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CachedCity {
    pub id: u64,
    pub name: String,
    pub state: CachedState,
}

impl From<&City> for CachedCity {
    fn from(city: &City) -> Self {
        Self {
            id: city.id,
            name: city.name.clone(),
            state: CachedState::from(&city.state),
        }
    }
}

impl From<CachedCity> for City {
    fn from(cached: CachedCity) -> Self {
        City {
            id: cached.id,
            name: cached.name,
            state: cached.state.into(),
        }
    }
}

/// States and cities, including the per-state city lists.
#[derive(Clone)]
pub struct LocationCache {
    store: CacheStore,
    ttl: Duration,
}

impl LocationCache {
    pub fn new(store: CacheStore, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub async fn get_state(&self, id: u64) -> Option<State> {
        self.store
            .get_json::<CachedState>(&state_key(id))
            .await
            .map(State::from)
    }

    pub async fn set_state(&self, state: &State) -> Result<(), CacheError> {
        self.store
            .set_json(&state_key(state.id), &CachedState::from(state), self.ttl)
            .await
    }

    pub async fn get_all_states(&self) -> Option<Vec<State>> {
        let cached: Vec<CachedState> = self.store.get_json(ALL_STATES_KEY).await?;
        Some(cached.into_iter().map(State::from).collect())
    }

    pub async fn set_all_states(&self, states: &[State]) -> Result<(), CacheError> {
        let cached: Vec<CachedState> = states.iter().map(CachedState::from).collect();
        self.store.set_json(ALL_STATES_KEY, &cached, self.ttl).await
    }

    /// Drops the state, the state list and the state's city list.
    pub async fn invalidate_state(&self, id: u64) -> Result<(), CacheError> {
        self.store
            .delete(&[
                state_key(id),
                ALL_STATES_KEY.to_string(),
                cities_by_state_key(id),
            ])
            .await
    }

    pub async fn get_city(&self, id: u64) -> Option<City> {
        self.store
            .get_json::<CachedCity>(&city_key(id))
            .await
            .map(City::from)
    }

    pub async fn set_city(&self, city: &City) -> Result<(), CacheError> {
        self.store
            .set_json(&city_key(city.id), &CachedCity::from(city), self.ttl)
            .await
    }

    pub async fn get_all_cities(&self) -> Option<Vec<City>> {
        let cached: Vec<CachedCity> = self.store.get_json(ALL_CITIES_KEY).await?;
        Some(cached.into_iter().map(City::from).collect())
    }

    pub async fn set_all_cities(&self, cities: &[City]) -> Result<(), CacheError> {
        let cached: Vec<CachedCity> = cities.iter().map(CachedCity::from).collect();
        self.store.set_json(ALL_CITIES_KEY, &cached, self.ttl).await
    }

    pub async fn get_cities_by_state(&self, state_id: u64) -> Option<Vec<City>> {
        let cached: Vec<CachedCity> = self.store.get_json(&cities_by_state_key(state_id)).await?;
        Some(cached.into_iter().map(City::from).collect())
    }

    pub async fn set_cities_by_state(&self, state_id: u64, cities: &[City]) -> Result<(), CacheError> {
        let cached: Vec<CachedCity> = cities.iter().map(CachedCity::from).collect();
        self.store
            .set_json(&cities_by_state_key(state_id), &cached, self.ttl)
            .await
    }

    /// Drops the city, the city list and the owning state's city list.
    pub async fn invalidate_city(&self, city: &City) -> Result<(), CacheError> {
        self.store
            .delete(&[
                city_key(city.id),
                ALL_CITIES_KEY.to_string(),
                cities_by_state_key(city.state.id),
            ])
            .await
    }

    /// Preloads every state and city plus the per-state lists.
    pub async fn warm_up(&self, states: &[State], cities: &[City]) -> Result<(), CacheError> {
        for state in states {
            self.set_state(state).await?;
            let owned: Vec<City> = cities
                .iter()
                .filter(|c| c.state.id == state.id)
                .cloned()
                .collect();
            self.set_cities_by_state(state.id, &owned).await?;
        }
        self.set_all_states(states).await?;
        for city in cities {
            self.set_city(city).await?;
        }
        self.set_all_cities(cities).await
    }
}
