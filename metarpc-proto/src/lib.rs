//! Generated client stubs for the MetaRPC MT5 terminal gateway.
//!
//! The schema itself (`proto/mt5_term_api.proto`) is owned by the gateway team;
//! this crate only vendors it so downstream crates get typed stubs without a
//! separate fetch/codegen step.

tonic::include_proto!("mt5_term_api");
