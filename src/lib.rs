//! RUBI Backend Library
//!
//! This library provides the core functionality of the RUBI backend: lead prospecting over
//! the Google Places API with scoring and caching, and Mercado Pago subscription creation.
//!
//! # Modules
//!
//! - `api`: API-layer handlers.
//! - `core`: Prospecting and subscription logic.
//! - `integrations`: External service clients.
//! - `cache`: Prospect result cache and query signatures.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers and shared state.
//! - `mercadopago_client`: Mercado Pago API client and plan API detection.
//! - `models`: Request, response and provider data models.
//! - `places_client`: Google Places API client.
//! - `prospecting`: Search, scoring, filtering and caching pipeline.
//! - `router`: Route table and middleware.
//! - `scoring`: Lead scoring heuristic.
//! - `subscriptions`: Subscription creation flow.
//! - `webhook_handler`: Mercado Pago webhook handler.

pub mod api;
pub mod core;
pub mod integrations;

// Re-export primary modules for shared use in tests and the binary
pub mod cache;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod mercadopago_client;
pub mod models;
pub mod places_client;
pub mod prospecting;
pub mod router;
pub mod scoring;
pub mod subscriptions;
pub mod webhook_handler;
