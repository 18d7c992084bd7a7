pub mod db;
pub mod error;
pub mod firestore;
pub mod identity;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
