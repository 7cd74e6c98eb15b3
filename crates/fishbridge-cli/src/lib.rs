//! Line-oriented front end for the fishbridge engine bridge

pub mod command;
pub mod handler;
pub mod logging;
pub mod output;
