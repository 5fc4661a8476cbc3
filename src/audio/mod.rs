//! # Audio Module
//!
//! Per-guild queueing and playback orchestration.
//!
//! ## Architecture
//!
//! ### [`queue`] - Queue Store
//! - One FIFO of [`queue::TrackDescriptor`] per guild, each behind its own lock
//! - Created lazily, cleared on leave, never removed
//!
//! ### [`player`] - Playback Orchestrator
//! - `advance` pops, resolves and starts the next track of a guild
//! - At most one run in flight per guild (`Idle -> Resolving -> Playing`)
//! - Resolution and stream-start failures skip the track and keep draining
//!
//! ### [`voice`] - Voice Session contract
//! - Connect/move/disconnect and single-stream control per guild
//! - Completion callbacks may fire on any thread; the player turns them
//!   into messages handled on its own tasks
//!
//! ### [`notify`] - Guild notifications
//! - "now playing", "could not play" and "queue ended" events
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! let player = AudioPlayer::spawn(queue.clone(), resolver, voice, notifier);
//!
//! queue.enqueue(guild_id, TrackDescriptor::new(url, title));
//! player.advance(guild_id).await;
//! ```

pub mod notify;
pub mod player;
pub mod queue;
pub mod voice;

#[cfg(test)]
pub mod testing;
