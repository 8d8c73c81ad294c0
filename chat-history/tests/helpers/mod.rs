#![allow(dead_code)]

pub mod page;

pub use page::GeminiPage;
