//! Query methods on [`crate::Database`], one module per entity.

mod availability;
mod calendar;
mod friends;
mod groups;
mod invites;
mod presence;
mod push;
mod rooms;
mod siws;
mod streams;
mod users;

pub use users::{LoginOutcome, LoginRecord, REFERRAL_POINTS, UserStat};
