pub mod cache;
pub mod catalog_repository;
pub mod event_publisher;
pub mod order_repository;
