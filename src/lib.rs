//! blogkit - A small blogging backend
//!
//! This library provides blogs, entries and tags over REST, with
//! criteria-filtered listing and a second-level entity cache.

pub mod api;
pub mod cache;
pub mod config;
pub mod criteria;
pub mod db;
pub mod models;
pub mod services;
