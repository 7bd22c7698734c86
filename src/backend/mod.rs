//! REST backend for the mailbox: inbox listing, analyses and sending

mod client;

pub use client::RestClient;
