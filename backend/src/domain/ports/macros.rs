//! Helper macro for generating domain port error enums.
//!
//! Each variant gets a `thiserror` message and a snake-case constructor whose
//! fields accept `impl Into<T>`, so adapters can write
//! `VehicleLookupError::rate_limited("status 429")`.

macro_rules! define_port_error {
    (@ctor $variant:ident) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]() -> Self {
                Self::$variant
            }
        }
    };

    (@ctor $variant:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        define_port_error!(@ctor_impl $variant () () $( $field : $ty, )*);
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) ) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]($($params)*) -> Self {
                Self::$variant { $($inits)* }
            }
        }
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) $field:ident : $ty:ty, $($rest:tt)*) => {
        define_port_error!(
            @ctor_impl
            $variant
            ($($params)* $field: impl Into<$ty>,)
            ($($inits)* $field: $field.into(),)
            $($rest)*
        );
    };
    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $( { $($field:ident : $ty:ty),* $(,)? } )? => $message:expr
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant $( { $($field : $ty),* } )?,
            )*
        }

        impl $name {
            $(
                define_port_error!(@ctor $variant $( { $($field : $ty),* } )?);
            )*
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    //! Constructor and message coverage for generated port errors.
    define_port_error! {
        pub enum SampleLookupError {
            Offline => "lookup service offline",
            RateLimited { message: String } => "rate limited: {message}",
            Retried { attempts: u32 } => "gave up after {attempts} attempts",
            Rejected { registration: String, status: u16 } =>
                "{registration} rejected with status {status}",
        }
    }

    #[test]
    fn unit_variants_get_constructors() {
        assert_eq!(SampleLookupError::offline().to_string(), "lookup service offline");
    }

    #[test]
    fn string_fields_accept_str() {
        let err = SampleLookupError::rate_limited("status 429");
        assert_eq!(err.to_string(), "rate limited: status 429");
    }

    #[test]
    fn non_string_fields_keep_their_type() {
        assert_eq!(
            SampleLookupError::retried(3_u32).to_string(),
            "gave up after 3 attempts"
        );
    }

    #[test]
    fn mixed_fields_are_ordered_as_declared() {
        let err = SampleLookupError::rejected("AB12CDE", 400_u16);
        assert_eq!(err.to_string(), "AB12CDE rejected with status 400");
    }
}
