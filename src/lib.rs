//! Server side of the CTFtime writeups filter: users keep a list of CTF names,
//! and their personal feed only carries writeups for those CTFs.

pub mod account;
pub mod auth;
pub mod config;
pub mod cookie;
pub mod data;
pub mod db;
pub mod editor;
pub mod guard;
pub mod modal;
pub mod render;
pub mod routes;
