pub mod config_store;
pub mod database;
pub mod migrations;
pub mod path_utils;
