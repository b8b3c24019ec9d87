use serde::{Deserialize, Serialize};

/// A federative unit. Ids are assigned by the store; `0` means not yet persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct State {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct City {
    pub id: u64,
    pub name: String,
    pub state: State,
}

impl City {
    pub fn state_id(&self) -> u64 {
        self.state.id
    }
}
