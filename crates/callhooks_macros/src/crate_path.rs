//! Auto-detection of the core crate path for generated code.
//!
//! When `#[supports_callbacks]` is used from a crate that depends on
//! `callhooks_core` directly, the generated code names it directly. When the
//! consuming crate depends on the `callhooks` umbrella crate instead, it
//! routes through `callhooks::callhooks_core`.
//!
//! A crate's integration tests resolve to the crate itself, so `Itself` is
//! emitted by name rather than as `crate`: the generated code then compiles
//! both in the tests of `callhooks_core` and in its dependents.

use proc_macro_crate::{FoundCrate, crate_name};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};

const CORE: &str = "callhooks_core";
const UMBRELLA: &str = "callhooks";

/// Returns the token path of `callhooks_core`.
///
/// Resolution order:
/// 1. Direct dependency (possibly renamed in `Cargo.toml`).
/// 2. Indirect access via the umbrella crate (`callhooks::callhooks_core`).
/// 3. Fallback to the literal crate name (the compile error then points the
///    user to the missing dependency).
pub(crate) fn core_path() -> TokenStream {
    match crate_name(CORE) {
        Ok(FoundCrate::Itself) => {
            let core = format_ident!("{}", CORE);
            quote!(::#core)
        }
        Ok(FoundCrate::Name(found)) => {
            let ident = format_ident!("{}", found);
            quote!(::#ident)
        }
        Err(_) => match crate_name(UMBRELLA) {
            Ok(FoundCrate::Name(found)) => {
                let umbrella = format_ident!("{}", found);
                let core = format_ident!("{}", CORE);
                quote!(::#umbrella::#core)
            }
            Ok(FoundCrate::Itself) => {
                let umbrella = format_ident!("{}", UMBRELLA);
                let core = format_ident!("{}", CORE);
                quote!(::#umbrella::#core)
            }
            Err(_) => {
                let core = format_ident!("{}", CORE);
                quote!(::#core)
            }
        },
    }
}
