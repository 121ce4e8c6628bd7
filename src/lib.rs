//! Equipment issue tickets: a live, filterable ticket list, ticket details
//! with a close workflow, and an auth gate in front of both.

pub mod auth;
pub mod config;
pub mod format;
pub mod models;
pub mod screens;
pub mod storage;
pub mod store;
pub mod subscription;
pub mod ui;
