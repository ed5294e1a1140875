//! Client side of SkinScan: everything between the user's image and a saved history row.
//!
//! The current user is never ambient. Operations that need one take an explicit
//! [`session::Session`], and sign-in state changes are observed through
//! [`session::SessionEvents`].

pub mod account;
pub mod analysis;
pub mod auth;
pub mod backend;
pub mod camera;
pub mod capture;
pub mod config;
pub mod error;
pub mod image_file;
pub mod notice;
pub mod scans;
pub mod session;
pub mod storage;
pub mod tables;

#[cfg(test)]
pub(crate) mod testing;
