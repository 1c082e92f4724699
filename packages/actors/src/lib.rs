//! Actor system for the job feed.
//!
//! This crate provides the Ractor-based feed view controller and the
//! effectful progress synchronization it drives.
//!
//! # Architecture
//!
//! - `FeedActor` - Owns one user's feed session: index, loaded pages,
//!   saved/dismissed sets and per-item UI state
//! - `progress_sync` - Restore and save of the resume point across the local
//!   cache and the document store
//!
//! # Usage
//!
//! ```ignore
//! use actors::start_feed_session;
//!
//! let session = start_feed_session(user, store, cache, FeedConfig::default()).await?;
//! session.set_index(1)?;
//! let snapshot = session.snapshot().await?;
//! ```

mod feed_actor;
mod messages;
pub mod progress_sync;
mod session;

pub use feed_actor::{FeedActor, FeedActorState, FeedArgs};
pub use messages::{ActorError, FeedMessage, FlushReason};
pub use progress_sync::{RestoreOutcome, SaveOutcome, restore_progress, save_progress};
pub use session::{FeedSession, start_feed_session};

/// Re-export ractor types for convenience.
pub use ractor::{Actor, ActorRef, RpcReplyPort, concurrency};
