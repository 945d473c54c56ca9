//! # magiclink
//!
//! Passwordless phone authentication against a Mideye Server.
//!
//! The service renders a single HTML form asking for a phone number. On submit
//! it calls the Mideye Magic Link endpoint (`/api/sfwa/auth?msisdn=...`), which
//! blocks until the user approves or denies the push notification / SMS
//! challenge on their device, and renders the returned code.
//!
//! Recent attempts are kept in a bounded in-memory event log that can be read
//! through a small bearer-protected JSON API.

pub mod cli;
pub mod magiclink;

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// Commit the binary was built from, empty when unknown.
pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "",
};
