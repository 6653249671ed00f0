#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod convert;
pub mod error;
pub mod event;
pub mod formats;
pub mod grid;
pub mod html;
pub mod inspect;
pub mod logging;
pub mod normalize;
pub mod roles;
pub mod schedule;
pub mod source;
pub mod store;
