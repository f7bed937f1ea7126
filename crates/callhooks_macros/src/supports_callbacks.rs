//! Code generation for `#[supports_callbacks]` on free functions.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Attribute, ItemFn};

use crate::crate_path::core_path;
use crate::signature::{self, Output, Param};

/// Routes a free function through a lazily built `AutoCallbacks` registry.
///
/// The macro consumes the original function and generates:
/// - A private `__callhooks_target_<name>` function with the original body,
///   carrying only the `cfg`, lint and `inline` attributes
/// - A hidden `__<Name>Callbacks` type alias and `__CALLHOOKS_<NAME>` static
/// - A function `<name>` with the original signature that calls the registry
/// - A module `<name>` exposing `callbacks()`
pub(crate) fn generate(input: &ItemFn) -> TokenStream {
    if let Err(err) = signature::validate(&input.sig) {
        return err.to_compile_error();
    }

    let core = core_path();
    let vis = &input.vis;
    let fn_name = &input.sig.ident;
    let fn_name_str = fn_name.to_string();
    let target_fn = format_ident!("__callhooks_target_{}", fn_name);
    let alias = format_ident!("__{}Callbacks", to_pascal_case(&fn_name_str));
    let storage = format_ident!("__CALLHOOKS_{}", fn_name_str.to_uppercase());

    let params = signature::params(&input.sig);
    let idents: Vec<_> = params.iter().map(|Param { ident, .. }| ident).collect();
    let types: Vec<_> = params.iter().map(|Param { ty, .. }| ty).collect();
    let Output {
        result,
        error,
        fallible,
    } = signature::output(&input.sig);

    let docs = attrs_named(input, &["doc"]);
    let cfgs = attrs_named(input, &["cfg"]);
    // The private target holds the body, so it keeps what affects the body.
    let body_attrs = attrs_named(input, BODY_ATTRS);
    // An `expect` copied onto both functions would go unfulfilled on one.
    let wrapper_attrs: Vec<_> = input
        .attrs
        .iter()
        .filter(|attr| !is_named(attr, &["doc", "cfg", "expect"]))
        .collect();

    let output = &input.sig.output;
    let inputs = &input.sig.inputs;
    let block = &input.block;

    let invoke_target = if fallible {
        quote! { #target_fn(#(#idents),*) }
    } else {
        quote! { ::core::result::Result::<_, #error>::Ok(#target_fn(#(#idents),*)) }
    };

    let call_registry = quote! { #fn_name::callbacks().call(&(#(#idents,)*)) };
    let wrapper_body = if fallible {
        call_registry
    } else {
        quote! {
            match #call_registry {
                ::core::result::Result::Ok(value) => value,
                ::core::result::Result::Err(never) => match never {},
            }
        }
    };

    let module_doc = format!("Callbacks of [`{fn_name_str}`](fn@{fn_name_str}).");
    let accessor_doc =
        format!("Returns the registry every call to [`{fn_name_str}`](fn@{fn_name_str}) goes through.");

    quote! {
        #(#cfgs)*
        #(#body_attrs)*
        fn #target_fn(#inputs) #output #block

        #(#cfgs)*
        #[doc(hidden)]
        #vis type #alias = #core::AutoCallbacks<(#(#types,)*), #result, #error>;

        #(#cfgs)*
        #[doc(hidden)]
        static #storage: ::std::sync::LazyLock<#alias> = ::std::sync::LazyLock::new(|| {
            #core::AutoCallbacks::new(#fn_name_str, |__callhooks_args: &(#(#types,)*)| {
                let (#(#idents,)*) = ::core::clone::Clone::clone(__callhooks_args);
                #invoke_target
            })
        });

        #(#docs)*
        #(#cfgs)*
        #(#wrapper_attrs)*
        #vis fn #fn_name(#(#idents: #types),*) #output {
            #wrapper_body
        }

        #(#cfgs)*
        #[doc = #module_doc]
        #vis mod #fn_name {
            #[doc = #accessor_doc]
            #[must_use]
            pub fn callbacks() -> &'static super::#alias {
                &super::#storage
            }
        }
    }
}

/// Attributes copied onto the private target. All but `expect` also stay on
/// the wrapper.
const BODY_ATTRS: &[&str] = &["allow", "expect", "warn", "deny", "forbid", "inline"];

fn attrs_named<'a>(input: &'a ItemFn, names: &[&str]) -> Vec<&'a Attribute> {
    input
        .attrs
        .iter()
        .filter(|attr| is_named(attr, names))
        .collect()
}

fn is_named(attr: &Attribute, names: &[&str]) -> bool {
    names.iter().any(|name| attr.path().is_ident(name))
}

fn to_pascal_case(s: &str) -> String {
    s.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(c) => c.to_uppercase().to_string() + chars.as_str(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(source: &str) -> String {
        generate(&syn::parse_str::<ItemFn>(source).unwrap()).to_string()
    }

    #[test]
    fn pascal_case_joins_words() {
        assert_eq!(to_pascal_case("parse_number"), "ParseNumber");
        assert_eq!(to_pascal_case("foo"), "Foo");
    }

    #[test]
    fn expansion_keeps_the_function_name() {
        let expanded = expand("pub fn parse_number(text: String) -> Result<i32, String> { text.parse().map_err(|_| text) }");
        assert!(expanded.contains("fn __callhooks_target_parse_number"));
        assert!(expanded.contains("pub fn parse_number"));
        assert!(expanded.contains("pub mod parse_number"));
        assert!(expanded.contains("__CALLHOOKS_PARSE_NUMBER"));
    }

    #[test]
    fn infallible_wrapper_unwraps_the_result() {
        let expanded = expand("fn add(a: i32, b: i32) -> i32 { a + b }");
        assert!(expanded.contains("Infallible"));
        assert!(expanded.contains("never"));
    }

    #[test]
    fn cfg_reaches_every_item_and_symbol_attrs_only_the_wrapper() {
        let expanded = expand(
            "#[cfg(feature = \"extra\")] #[export_name = \"shifted\"] #[allow(unused_mut)] \
             #[expect(clippy::identity_op)] pub fn shift(a: i32) -> i32 { a + 0 }",
        );
        assert_eq!(expanded.matches("\"extra\"").count(), 5);
        assert_eq!(expanded.matches("export_name").count(), 1);
        assert_eq!(expanded.matches("unused_mut").count(), 2);
        assert_eq!(expanded.matches("identity_op").count(), 1);
    }

    #[test]
    fn invalid_signature_expands_to_compile_error() {
        let expanded = expand("async fn foo() {}");
        assert!(expanded.contains("compile_error"));
    }
}
