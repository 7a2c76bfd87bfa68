//! Intrinsics implementation modules
//!
//! ## Current modules:
//! - `typed_array` - %TypedArray%, %TypedArray%.prototype methods and the
//!   array iteration methods they share with Array.prototype

pub mod typed_array;
