//! The Avro schema model: parse schema declarations, check that a schema is
//! well-formed, and check runtime values against it.
//!
//! ```
//! use avro_schema::{parse, Value};
//!
//! let schema = parse(br#"{
//!     "type": "record",
//!     "name": "Point",
//!     "fields": [
//!         {"name": "x", "type": "int"},
//!         {"name": "y", "type": "int", "default": 0}
//!     ]
//! }"#)
//! .unwrap();
//!
//! assert!(schema.validate(&Value::map(vec![("x", Value::Int(3))])).is_ok());
//! assert!(schema.validate(&Value::map(vec![("z", Value::Int(3))])).is_err());
//! ```

mod factory;
mod name;
mod parse;
mod schema;
mod serde_schema;
mod validate;
mod value;

pub use factory::*;
pub use name::*;
pub use parse::*;
pub use schema::*;
pub use serde_schema::*;
pub use validate::*;
pub use value::*;
