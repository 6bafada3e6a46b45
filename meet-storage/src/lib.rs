pub mod controllers;
pub mod models;
pub mod schema;
pub mod webvtt;

pub use meet_shared::clients::DbPool;
