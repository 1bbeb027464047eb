pub mod app;
pub mod capture;
pub mod chat;
pub mod commands;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod history;
pub mod info;
pub mod render;
pub mod runtime;
pub mod send;
