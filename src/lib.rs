//! Interactive activity log for the terminal. Asks what you are doing, lets you pick or grow a
//! hierarchy of categories while answering, and appends every answer to a plain text log.
//!

pub mod cli;
pub mod conversation;
pub mod fs;
pub mod session;
pub mod storage;
pub mod tree;
pub mod utils;
