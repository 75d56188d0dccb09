//! Typed views of NexusMods API responses
//!
//! Responses are cached as raw JSON and mapped into these types on every
//! read, so mapping changes never require invalidating the cache file.

pub mod game;
pub mod limits;
pub mod mod_file;
pub mod mod_updates;
pub mod mods;
pub mod user;

pub use game::{Category, Game};
pub use limits::ApiLimits;
pub use mod_file::{FileCategory, ModFile};
pub use mod_updates::{ModUpdates, Since, UnknownSince};
pub use mods::{Mod, User};
pub use user::UserInfo;
