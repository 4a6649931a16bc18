//! Route handlers organized by resource

pub mod auth;
pub mod files;
pub mod health;
pub mod objects;
pub mod recipes;
pub mod tags;
pub mod users;
