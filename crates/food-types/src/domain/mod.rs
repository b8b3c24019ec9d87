pub mod business;
pub mod event;
pub mod location;
pub mod order;
pub mod page;
pub mod sales;
pub mod user;
