//! # Pan Expression
//!
//! How the assistant behaves when nobody is talking to it, and how its mood
//! colours what it says:
//!
//! - [`ActivityClock`]: last activity, last unprompted reply and the activity
//!   epoch that cancels stale idle work
//! - [`CuriosityQueue`]: topics asked about but never answered, plus standing
//!   interests
//! - [`phrasing`]: tone-dependent framing of reply text

pub mod activity;
pub mod curiosity;
pub mod phrasing;

pub use activity::{ActivityClock, ActivityTicket};
pub use curiosity::CuriosityQueue;
