pub mod app;
pub mod audit;
pub mod catalogue;
pub mod codec;
pub mod config;
pub mod descriptor;
pub mod domain;
pub mod embedded;
pub mod error;
pub mod fetch;
pub mod fs_util;
pub mod output;
pub mod store;
