//! SOAP server for Zentinel
//!
//! Exposes plain Rust service objects as SOAP-over-HTTP endpoints and
//! synthesizes a WSDL 1.1 document (with embedded XSD) for each of them.
//!
//! # Features
//!
//! - Operation registry with per-operation input/output types and faults
//! - Structural type descriptors derived from [`types::Describe`] impls
//! - Argument casting from the request envelope (string, number, boolean, objects)
//! - Synchronous and asynchronous operations
//! - SOAP Fault responses for service errors
//! - WSDL generation served at `GET /<service>?wsdl`
//! - XXE (XML External Entity) prevention on incoming envelopes
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use zentinel_soap_server::{Arguments, ServiceBuilder, SoapServer, SoapServerConfig};
//!
//! let mut calc = ServiceBuilder::new("calc", ());
//! calc.operation("add", |_: &(), args: Arguments| Ok(args.get::<f64>(0)? + args.get::<f64>(1)?))
//!     .signature("(a, b)")
//!     .set_input_type("a", "number")
//!     .set_input_type("b", "number")
//!     .set_output_type("number");
//!
//! let mut server = SoapServer::new(SoapServerConfig::default());
//! server.add_service(calc.build());
//! Arc::new(server).serve(listener, shutdown).await?;
//! ```

pub mod config;
pub mod demo;
pub mod error;
pub mod marshal;
pub mod reflect;
pub mod server;
pub mod service;
pub mod types;
pub mod wsdl;
pub mod xml;

pub use config::SoapServerConfig;
pub use error::{FaultCode, ServerError, SoapFault};
pub use reflect::{describe_type, TypeHint};
pub use server::SoapServer;
pub use service::{Arguments, Operation, OperationBuilder, Service, ServiceBuilder, SoapService};
pub use types::{Describe, Kind, Slot, TypeDescriptor};
