//! Service layer.
//!
//! Handlers stay thin; everything between decoding a request and rendering
//! a response lives here.

pub mod goods_service;

pub use goods_service::GoodsService;
