//! Configuration, policy storage and the domain types shared by every module.

pub mod config;
pub mod models;
pub mod policy_store;
