//! inbox-autopilot: auto-drafted replies for low-risk inbox mail
//!
//! The [`autopilot`] module is the core: preferences, daily stats, the eligibility
//! filter, the review queue and the batch processor. [`backend`] and [`ai`] provide
//! the production inbox/send and drafting services.

pub mod ai;
pub mod autopilot;
pub mod backend;
pub mod config;
pub mod constants;
pub mod credentials;
pub mod mail;
#[cfg(feature = "notifications")]
pub mod notification;
pub mod storage;
