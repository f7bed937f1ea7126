//! Procedural macros for callhooks.
//!
//! Provides `#[supports_callbacks]`, which routes a free function through an
//! `AutoCallbacks` registry so that listeners can observe its calls.

mod crate_path;
mod signature;
mod supports_callbacks;

use proc_macro::TokenStream;

/// Attaches `on_call`, `on_return` and `on_exception` events to a free
/// function.
///
/// The function keeps its name and signature. Every call goes through a
/// lazily built registry reachable as `<name>::callbacks()`.
///
/// Parameters must be owned `Clone` types: listeners receive the arguments
/// as a tuple reference, and the original body receives a clone. A return
/// type spelled `Result<R, E>` makes the target fallible, so `on_exception`
/// handlers see its errors and may recover. Any other return type is
/// infallible.
///
/// Generic, async, const, unsafe and extern functions, methods and
/// reference parameters are rejected at compile time.
///
/// # Example
///
/// ```ignore
/// use callhooks::{Registration, supports_callbacks};
///
/// #[supports_callbacks]
/// /// Adds two numbers.
/// fn add(a: i32, b: i32) -> i32 {
///     a + b
/// }
///
/// add::callbacks()
///     .on_return()
///     .add_callback(
///         |result, args| {
///             println!("{args:?} -> {result:?}");
///             Ok(())
///         },
///         Registration::new().pass_result(true),
///     )
///     .unwrap();
///
/// assert_eq!(add(1, 2), 3);
/// ```
#[proc_macro_attribute]
pub fn supports_callbacks(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            "#[supports_callbacks] takes no arguments",
        )
        .to_compile_error()
        .into();
    }
    let input = syn::parse_macro_input!(item as syn::ItemFn);
    supports_callbacks::generate(&input).into()
}
