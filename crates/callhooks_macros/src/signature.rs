//! Signature checks and parameter extraction for `#[supports_callbacks]`.

use proc_macro2::{Span, TokenStream};
use quote::{format_ident, quote};
use syn::{
    FnArg, GenericArgument, Ident, Pat, PathArguments, ReturnType, Signature, Type,
    spanned::Spanned,
};

/// Rejects signatures the generated registry cannot wrap.
///
/// The target must be a plain, synchronous, non-generic free function whose
/// parameters are owned values.
pub(crate) fn validate(sig: &Signature) -> syn::Result<()> {
    if let Some(asyncness) = &sig.asyncness {
        return Err(syn::Error::new_spanned(
            asyncness,
            "#[supports_callbacks] cannot be applied to async functions",
        ));
    }
    if let Some(constness) = &sig.constness {
        return Err(syn::Error::new_spanned(
            constness,
            "#[supports_callbacks] cannot be applied to const functions",
        ));
    }
    if let Some(unsafety) = &sig.unsafety {
        return Err(syn::Error::new_spanned(
            unsafety,
            "#[supports_callbacks] cannot be applied to unsafe functions",
        ));
    }
    if let Some(abi) = &sig.abi {
        return Err(syn::Error::new_spanned(
            abi,
            "#[supports_callbacks] cannot be applied to extern functions",
        ));
    }
    if !sig.generics.params.is_empty() || sig.generics.where_clause.is_some() {
        return Err(syn::Error::new_spanned(
            &sig.generics,
            "#[supports_callbacks] does not support generic parameters",
        ));
    }
    if let Some(variadic) = &sig.variadic {
        return Err(syn::Error::new_spanned(
            variadic,
            "#[supports_callbacks] does not support variadic functions",
        ));
    }

    for arg in &sig.inputs {
        match arg {
            FnArg::Receiver(receiver) => {
                return Err(syn::Error::new_spanned(
                    receiver,
                    "#[supports_callbacks] functions cannot have a `self` receiver; \
                     wrap methods with `MethodCallbacks` instead",
                ));
            }
            FnArg::Typed(pat_type) => check_owned(&pat_type.ty)?,
        }
    }

    if let ReturnType::Type(_, ty) = &sig.output
        && let Type::ImplTrait(_) = &**ty
    {
        return Err(syn::Error::new_spanned(
            ty,
            "#[supports_callbacks] does not support `impl Trait` return types",
        ));
    }

    Ok(())
}

fn check_owned(ty: &Type) -> syn::Result<()> {
    match ty {
        Type::Reference(_) => Err(syn::Error::new_spanned(
            ty,
            "#[supports_callbacks] parameters must be owned values; \
             listeners receive them by reference",
        )),
        Type::ImplTrait(_) => Err(syn::Error::new_spanned(
            ty,
            "#[supports_callbacks] does not support `impl Trait` parameters",
        )),
        Type::Paren(inner) => check_owned(&inner.elem),
        Type::Group(inner) => check_owned(&inner.elem),
        _ => Ok(()),
    }
}

/// One parameter of the wrapped function.
pub(crate) struct Param {
    /// Binding used by the generated wrapper.
    pub ident: Ident,
    /// Declared type.
    pub ty: Type,
}

/// Extracts the parameters, naming pattern parameters positionally.
pub(crate) fn params(sig: &Signature) -> Vec<Param> {
    sig.inputs
        .iter()
        .enumerate()
        .filter_map(|(index, arg)| match arg {
            FnArg::Typed(pat_type) => {
                let ident = match &*pat_type.pat {
                    Pat::Ident(pat_ident) if pat_ident.subpat.is_none() => pat_ident.ident.clone(),
                    other => format_ident!("__callhooks_arg{}", index, span = other.span()),
                };
                Some(Param {
                    ident,
                    ty: (*pat_type.ty).clone(),
                })
            }
            FnArg::Receiver(_) => None,
        })
        .collect()
}

/// Result and error types of the registry wrapping a function.
pub(crate) struct Output {
    /// Value type handed to `on_return` listeners.
    pub result: TokenStream,
    /// Error type, `Infallible` for functions that cannot fail.
    pub error: TokenStream,
    /// Whether the declared return type is `Result<R, E>`.
    pub fallible: bool,
}

/// Splits the return type into the registry's result and error types.
///
/// Only a return type spelled `Result<R, E>` (under any path) is treated as
/// fallible. Single-parameter aliases such as `io::Result<T>` are wrapped as
/// plain values.
pub(crate) fn output(sig: &Signature) -> Output {
    let ty = match &sig.output {
        ReturnType::Default => {
            return Output {
                result: quote!(()),
                error: quote!(::core::convert::Infallible),
                fallible: false,
            };
        }
        ReturnType::Type(_, ty) => &**ty,
    };

    if let Some((ok, err)) = result_parts(ty) {
        return Output {
            result: quote!(#ok),
            error: quote!(#err),
            fallible: true,
        };
    }

    Output {
        result: quote!(#ty),
        error: quote_infallible(ty.span()),
        fallible: false,
    }
}

fn quote_infallible(span: Span) -> TokenStream {
    quote::quote_spanned!(span=> ::core::convert::Infallible)
}

fn result_parts(ty: &Type) -> Option<(&Type, &Type)> {
    let Type::Path(path) = ty else {
        return None;
    };
    if path.qself.is_some() {
        return None;
    }
    let last = path.path.segments.last()?;
    if last.ident != "Result" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &last.arguments else {
        return None;
    };
    let mut types = args.args.iter().filter_map(|arg| match arg {
        GenericArgument::Type(ty) => Some(ty),
        _ => None,
    });
    match (types.next(), types.next(), types.next()) {
        (Some(ok), Some(err), None) => Some((ok, err)),
        _ => None,
    }
}
