pub mod hub;

pub use hub::AdEventHub;
