//! Async Rust client library for a remote XML file manipulation service.
//!
//! Provides API-key authorization, an authenticated HTTP client with a
//! single reauthorize-and-retry on 401, and typed operations on the XML
//! files and nodes stored per device.
//!
//! # Modules
//!
//! - [`auth`] — Session state and the `/authorize` response shape.
//! - [`client`] — Authenticated request pipeline (`XmlClient`).
//! - [`config`] — TOML client configuration.
//! - [`envelope`] — Status/error envelope of the mutating endpoints.
//! - [`error`] — Typed error hierarchy (`XmlApiError`).
//! - [`files`] — Create, delete, copy and list files.
//! - [`nodes`] — Create, read, update and delete nodes.
//!
//! # Quick Start
//!
//! ```ignore
//! use xmlapi::auth::Session;
//! use xmlapi::client::XmlClient;
//! use xmlapi::nodes::read_node;
//!
//! let client = XmlClient::new(Session::new("api-key"), "https://xml.example.net")?;
//! let node = read_node(&client, "edge-01", "running.xml", "/config/hostname").await?;
//! println!("{} = {}", node.name, node.value);
//! ```

#![warn(missing_docs)]

pub mod auth;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod files;
pub mod nodes;
