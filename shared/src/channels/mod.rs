pub mod action_sender;
pub mod chunk;
pub mod chunk_receiver;
pub mod error;
pub mod tick_sync;
