//! Macro definitions. This is a separate module because macros must be defined before the
//! modules that use them.

/// Define a closed enum of signal values, each mapping to the schema symbol it is emitted
/// as.
///
/// With `in "field"`, the enum also names the control-word field it drives: values convert
/// into a [`Fragment`](ucodegen::Fragment) assigning that field and combine with other
/// fragments using `|`.
///
/// usage:
/// ```
/// # use ucodegen_upd7800::signal_enum;
/// signal_enum! {
///     /// Carry in.
///     pub enum Carry in "cis" {
///         Zero => "0",
///         One => "1",
///     }
/// }
/// assert_eq!(Carry::One.symbol(), "1");
/// assert_eq!(Carry::FIELD, "cis");
/// ```
#[macro_export]
macro_rules! signal_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident $(in $field:literal)? {
            $($(#[$vmeta:meta])* $variant:ident => $symbol:literal,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($(#[$vmeta])* $variant,)*
        }

        impl $name {
            /// Every value, in code order.
            pub const ALL: &'static [$name] = &[$($name::$variant,)*];

            /// The schema symbol for this value.
            pub const fn symbol(self) -> &'static str {
                match self {
                    $($name::$variant => $symbol,)*
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.symbol())
            }
        }

        impl From<$name> for ::ucodegen::Value {
            fn from(value: $name) -> Self {
                ::ucodegen::Value::symbol(value.symbol())
            }
        }

        $($crate::signal_enum!(@field $name, $field);)?
    };

    (@field $name:ident, $field:literal) => {
        impl $name {
            /// The control-word field this signal drives.
            pub const FIELD: &'static str = $field;
        }

        impl From<$name> for ::ucodegen::Fragment {
            fn from(value: $name) -> Self {
                ::ucodegen::Fragment::set($field, value)
            }
        }

        impl<T: Into<::ucodegen::Fragment>> ::std::ops::BitOr<T> for $name {
            type Output = ::ucodegen::Fragment;

            fn bitor(self, rhs: T) -> ::ucodegen::Fragment {
                ::ucodegen::Fragment::from(self) | rhs
            }
        }
    };
}
