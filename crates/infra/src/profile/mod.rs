//! Backend profile endpoint adapter

pub mod client;

pub use client::HttpProfileClient;
