//! Back-office de logística de flota: conductores, vehículos, clientes,
//! rutas y entregas, con autorización por rol y asignación de entregas
//! respetando la capacidad del vehículo.

pub mod config;
pub mod controllers;
pub mod database;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

pub use routes::create_app;
pub use state::AppState;
