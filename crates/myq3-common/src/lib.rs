#![allow(clippy::too_many_arguments, clippy::needless_range_loop, clippy::float_cmp,
         clippy::manual_range_contains, clippy::new_without_default)]

pub mod q_shared;
pub mod qfiles;
pub mod cvar;
pub mod common;
pub mod pmove;
pub mod cmodel;
pub mod spawn;
