pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod export;
pub mod flatten;
pub mod images;
pub mod legacy;
pub mod output;
pub mod paging;
pub mod query;
pub mod session;
pub mod store;
pub mod tui;
