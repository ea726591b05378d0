//! Record capability traits and the `model!` registration macro.
//!
//! A persisted type implements two traits:
//!
//! - [`Record`] is the schema descriptor: the type's name, its static field
//!   list with column tags, and dynamic field access by name. It is
//!   generated by [`model!`](crate::model!) and never written by hand in
//!   practice.
//! - [`Model`] carries the optional capabilities (table name override,
//!   lifecycle hooks, validation). Every method has a fallback, so
//!   `impl Model for User {}` is a complete implementation.
//!
//! # Example
//!
//! ```
//! use tabula_core::{model, Model};
//!
//! model! {
//!     #[derive(Debug, Clone, Default, PartialEq)]
//!     pub struct User {
//!         #[db = "id,primary_key,auto_increment"]
//!         pub id: i64,
//!         #[db = "name,not_null,size:100"]
//!         pub name: String,
//!         pub scratch: String,
//!     }
//! }
//!
//! impl Model for User {}
//! ```

use serde::Serialize;

use crate::descriptor::FieldDescriptor;
use crate::error::CoreError;
use crate::value::Value;

/// Structural metadata and dynamic field access for a record type.
pub trait Record: Default + 'static {
    /// The record type's name, used for default table binding.
    const TYPE_NAME: &'static str;

    /// Every field of the type in declaration order, tagged or not.
    fn fields() -> Vec<FieldDescriptor>;

    /// Reads a persisted field by Rust field name.
    fn get_field(&self, field: &str) -> Option<Value>;

    /// Writes a persisted field by Rust field name. Unknown names are
    /// discarded.
    fn set_field(&mut self, field: &str, value: Value) -> Result<(), CoreError>;
}

/// Optional per-type capabilities with defined fallbacks.
pub trait Model: Record {
    /// Table binding override. `None` selects [`default_table_name`].
    fn table_name() -> Option<&'static str> {
        None
    }

    /// Runs before the record is inserted.
    fn before_create(&mut self) {}

    /// Runs before the record is written by a keyed update.
    fn before_update(&mut self) {}

    /// Field-level validation. A non-empty result aborts the write.
    fn validate(&self) -> Vec<ValidationError> {
        Vec::new()
    }
}

/// One failed validation rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Lower-cased type name with an `s` suffix.
pub fn default_table_name(type_name: &str) -> String {
    format!("{}s", type_name.to_lowercase())
}

/// Resolves the table a model type is bound to.
pub fn table_name<M: Model>() -> String {
    match M::table_name() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => default_table_name(M::TYPE_NAME),
    }
}

/// Declares a struct and registers its schema descriptor.
///
/// Fields carrying `#[db = "..."]` are persisted according to the tag
/// grammar in [`descriptor`](crate::descriptor); other fields are kept on
/// the struct but never stored. Tagged field types must implement
/// [`FieldType`](crate::FieldType). The struct must implement `Default`,
/// which is how rows are materialized.
///
/// A field may carry doc comments ahead of its `#[db]` tag. Other field
/// attributes (`#[serde(..)]` and the like) are not accepted; put them on
/// a separate type if they are needed.
#[macro_export]
macro_rules! model {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[doc = $doc:literal])*
                $(#[db = $tag:literal])?
                $field_vis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[doc = $doc])*
                $field_vis $field: $ty,
            )*
        }

        impl $crate::model::Record for $name {
            const TYPE_NAME: &'static str = stringify!($name);

            fn fields() -> ::std::vec::Vec<$crate::descriptor::FieldDescriptor> {
                ::std::vec![
                    $( $crate::__model_descriptor!($field, $ty $(, $tag)?) ),*
                ]
            }

            #[allow(unused_variables)]
            fn get_field(&self, field: &str) -> ::std::option::Option<$crate::value::Value> {
                $( $crate::__model_get!(self, field, $field, $ty $(, $tag)?); )*
                ::std::option::Option::None
            }

            #[allow(unused_variables)]
            fn set_field(
                &mut self,
                field: &str,
                value: $crate::value::Value,
            ) -> ::std::result::Result<(), $crate::error::CoreError> {
                $( $crate::__model_set!(self, field, value, $field, $ty $(, $tag)?); )*
                ::std::result::Result::Ok(())
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __model_descriptor {
    ($field:ident, $ty:ty) => {
        $crate::descriptor::FieldDescriptor::untagged(stringify!($field))
    };
    ($field:ident, $ty:ty, $tag:literal) => {
        $crate::descriptor::FieldDescriptor::new(
            stringify!($field),
            <$ty as $crate::value::FieldType>::KIND,
            $tag,
        )
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __model_get {
    ($this:ident, $name:ident, $field:ident, $ty:ty) => {};
    ($this:ident, $name:ident, $field:ident, $ty:ty, $tag:literal) => {
        if $name == stringify!($field) {
            return ::std::option::Option::Some(<$ty as $crate::value::FieldType>::to_value(
                &$this.$field,
            ));
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __model_set {
    ($this:ident, $name:ident, $value:ident, $field:ident, $ty:ty) => {};
    ($this:ident, $name:ident, $value:ident, $field:ident, $ty:ty, $tag:literal) => {
        if $name == stringify!($field) {
            let found = $value.type_name();
            $this.$field = <$ty as $crate::value::FieldType>::from_value($value).ok_or_else(|| {
                $crate::error::CoreError::Conversion {
                    record: <Self as $crate::model::Record>::TYPE_NAME,
                    field: stringify!($field).to_string(),
                    expected: <$ty as $crate::value::FieldType>::KIND.name(),
                    found,
                }
            })?;
            return ::std::result::Result::Ok(());
        }
    };
}
