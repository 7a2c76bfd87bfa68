//! # Otter Typed Array
//!
//! Typed array view validation and species-aware construction for the Otter
//! JavaScript runtime.
//!
//! ## Design Principles
//!
//! - **Liveness is never cached**: a view's buffer may be detached by any user
//!   callback, so every read and write re-checks it
//! - **Construct, then validate**: derived results come from constructors that
//!   may be user code, and are checked before they are trusted
//! - **Species as a tagged strategy**: [`ConstructorRef`] is either the
//!   intrinsic constructor of a kind or a custom construct-capable function
//!
//! ```
//! use otter_typed_array::{Realm, TypedArrayKind, Value, typed_array_filter};
//!
//! let realm = Realm::new();
//! let source = realm
//!     .typed_array_from_numbers(TypedArrayKind::Int32, &[1.0, 2.0, 3.0, 4.0])
//!     .unwrap();
//! let is_even = realm.new_function("isEven", |_this, args, _realm| {
//!     let x = args.first().map_or(f64::NAN, Value::to_number);
//!     Ok(Value::boolean(x % 2.0 == 0.0))
//! });
//! let evens = typed_array_filter(&realm, &source, &is_even, &Value::undefined()).unwrap();
//! assert_eq!(
//!     otter_typed_array::typed_array_join(&evens, &Value::undefined()).unwrap(),
//!     "2,4"
//! );
//! ```

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod array_buffer;
pub mod config;
pub mod error;
pub mod intrinsics_impl;
pub mod object;
pub mod realm;
pub mod species;
pub mod typed_array;
pub mod validate;
pub mod value;

pub use config::{ConfigError, TypedArrayConfig};
pub use error::{VmError, VmResult};
pub use intrinsics_impl::typed_array::{
    typed_array_filter, typed_array_from, typed_array_join, typed_array_slice, typed_array_sort,
    typed_array_subarray,
};
pub use object::{JsObject, PropertyKey, WellKnownSymbol};
pub use realm::{ArrayLike, Realm};
pub use species::{ConstructorRef, CreateArgs, create_derived, resolve_constructor, species_create};
pub use typed_array::{JsTypedArray, TypedArrayKind};
pub use validate::{ValidatedView, ViewValidator};
pub use value::Value;
