#![doc = include_str!("../README.md")]

pub mod base_path;
pub mod config;
pub mod content;
mod date;
pub mod html;
mod layout;
pub mod link;
pub mod markdown;
mod permalink;
pub mod publish;
pub mod serve;
mod site;
mod sitemap;
pub mod storage;
mod style;
pub mod validate;

pub use site::*;
pub use style::*;
