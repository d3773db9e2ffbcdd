#![allow(clippy::too_many_arguments, clippy::needless_range_loop, clippy::float_cmp,
         clippy::manual_range_contains)]
// World rendering front end: patch tessellation, render faces and visible set

pub mod r_patch;
pub mod r_model;
pub mod r_vis;
