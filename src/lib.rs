//! Medical record OCR frontend
//!
//! Uploads photographed medical records to the OCR backend, polls the
//! backend for extraction results with a stepped backoff and an attempt cap,
//! and resolves each poll into a render-ready screen for the browser page
//! and the `medrec` terminal client.

pub mod app_state;
pub mod config;
pub mod models;
pub mod poller;
pub mod routes;
pub mod services;
