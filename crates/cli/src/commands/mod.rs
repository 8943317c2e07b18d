pub mod build;
pub mod check;
pub mod filters;
pub mod init;
pub mod serve;
pub mod tags;
