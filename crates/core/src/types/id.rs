//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different entity types.

/// Define one or more type-safe ID wrappers.
///
/// Each definition creates a newtype around `i32` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_i32()`
/// - `From<i32>` and `Into<i32>` implementations
/// - `sqlx` `Type`, `Encode`, and `Decode` implementations (with `postgres` feature)
///
/// Doc comments on a definition land on the generated struct.
///
/// # Example
///
/// ```rust
/// # use productgen_core::define_id;
/// define_id! {
///     /// Row id of an account.
///     UserId,
///     /// Row id of a product.
///     ProductId,
/// }
///
/// let user_id = UserId::new(1);
/// let product_id = ProductId::new(1);
///
/// // These are different types, so this won't compile:
/// // let _: UserId = product_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($($(#[$meta:meta])* $name:ident),+ $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(
                Debug,
                Clone,
                Copy,
                PartialEq,
                Eq,
                Hash,
                ::serde::Serialize,
                ::serde::Deserialize
            )]
            #[serde(transparent)]
            pub struct $name(i32);

            impl $name {
                /// Create a new ID from an i32 value.
                #[must_use]
                pub const fn new(id: i32) -> Self {
                    Self(id)
                }

                /// Get the underlying i32 value.
                #[must_use]
                pub const fn as_i32(&self) -> i32 {
                    self.0
                }
            }

            impl ::core::fmt::Display for $name {
                fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl From<i32> for $name {
                fn from(id: i32) -> Self {
                    Self(id)
                }
            }

            impl From<$name> for i32 {
                fn from(id: $name) -> Self {
                    id.0
                }
            }

            #[cfg(feature = "postgres")]
            impl ::sqlx::Type<::sqlx::Postgres> for $name {
                fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                    <i32 as ::sqlx::Type<::sqlx::Postgres>>::type_info()
                }

                fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                    <i32 as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
                }
            }

            #[cfg(feature = "postgres")]
            impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
                fn decode(
                    value: ::sqlx::postgres::PgValueRef<'r>,
                ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                    let id = <i32 as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
                    Ok(Self(id))
                }
            }

            #[cfg(feature = "postgres")]
            impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
                fn encode_by_ref(
                    &self,
                    buf: &mut ::sqlx::postgres::PgArgumentBuffer,
                ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                    <i32 as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
                }
            }
        )+
    };
}

define_id! {
    /// Row id of a ProductGen account.
    UserId,
    /// Row id of a product listing.
    ProductId,
}
