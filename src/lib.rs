#[macro_use]
extern crate rocket;

pub mod agent;
pub mod authentication;
pub mod catchers;
pub mod configuration;
pub mod domain;
pub mod guards;
pub mod models;
pub mod offline;
pub mod port_saver;
pub mod routes;
pub mod schema;
pub mod startup;
pub mod stripe;
pub mod telemetry;
