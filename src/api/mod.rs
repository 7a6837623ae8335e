pub mod health;
pub(crate) mod proxy;
