//! On-chain operation pipeline for the Allo grants protocol.
//!
//! Every domain action (create a project, update its metadata, apply to a round) runs as an
//! [`allo::Operation`]: the metadata document is pinned to IPFS, the protocol call is sent, and
//! the transaction is confirmed and indexed, with each stage reported on its own channel.

pub mod allo;
pub mod config;
/// Indexer sync integration
pub mod indexer;
/// Metadata uploads
pub mod ipfs;
pub mod transaction;
