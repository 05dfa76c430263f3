//! Grant Sweep: resumable, time-bounded removal of sharing grants
//!
//! Walks a storage tree breadth-first from a root folder and strips public
//! access and explicit editor/viewer grants from every node. Progress is
//! checkpointed after every node so that a host with a hard per-invocation
//! time limit can suspend and resume the sweep until the tree is covered.

pub mod backend;
pub mod checkpoint;
pub mod cli;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod permissions;
pub mod scheduler;
pub mod traversal;
pub mod trigger;
pub mod types;
