//! Macro internals for `formatcheck`.
//!
//! Don't use this crate directly. The attribute is re-exported (and used)
//! by the `formatcheck` crate.

use proc_macro::TokenStream;
use quote::quote;
use syn::{
    parse_macro_input, punctuated::Punctuated, spanned::Spanned, token::Comma, FnArg, Ident,
    LitByteStr, LitStr,
};

// Converts a FnArg sequence into a like sequence, but only with identifiers.
// For example, `stream: *mut FILE, format: *const c_char` becomes just `stream, format`.
//
// Unlike a plain filter, anything that isn't a bare identifier is an error:
// the parameters are spliced into a function pointer type, which only
// accepts identifiers.
fn param_idents(params: &Punctuated<FnArg, Comma>) -> syn::Result<Punctuated<Ident, Comma>> {
    let mut punctuated: Punctuated<Ident, Comma> = Punctuated::new();

    for param in params {
        let FnArg::Typed(pat_type) = param else {
            return Err(syn::Error::new(
                param.span(),
                "interposed functions can't take `self`",
            ));
        };

        match &*pat_type.pat {
            syn::Pat::Ident(pat_ident)
                if pat_ident.by_ref.is_none()
                    && pat_ident.mutability.is_none()
                    && pat_ident.subpat.is_none() =>
            {
                punctuated.push(pat_ident.ident.clone());
            }
            pat => {
                return Err(syn::Error::new(
                    pat.span(),
                    "interposed parameters must be plain identifiers",
                ))
            }
        }
    }

    Ok(punctuated)
}

// Rejects signatures that can't be expressed as a C symbol with a resolvable
// "next" definition.
fn validate(vis: &syn::Visibility, sig: &syn::Signature) -> syn::Result<()> {
    // The macro decides the visibility of the exported symbol. A `pub`
    // on the handler is almost certainly a sign that someone wants to call
    // it as a regular Rust function from elsewhere.
    if !matches!(vis, syn::Visibility::Inherited) {
        return Err(syn::Error::new(
            vis.span(),
            "interposed functions must be private",
        ));
    }

    // C-variadic entry points can't forward their arguments to the next
    // definition. They belong in a plain adapter that forwards a va_list
    // to an interposed `v*` function.
    if let Some(variadic) = &sig.variadic {
        return Err(syn::Error::new(
            variadic.span(),
            "interposed functions can't be variadic; forward a va_list to a `v*` hook instead",
        ));
    }

    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new(
            sig.generics.span(),
            "interposed functions can't be generic",
        ));
    }

    if let Some(asyncness) = &sig.asyncness {
        return Err(syn::Error::new(
            asyncness.span(),
            "interposed functions can't be async",
        ));
    }

    Ok(())
}

/// The `#[interpose]` attribute macro.
///
/// Turns a private function named after a C symbol into the exported
/// `extern "C"` definition of that symbol. Inside the body, a local binding
/// (`next` by default, or whatever identifier is passed as the attribute
/// argument) holds the next definition of the same symbol in link order,
/// as returned by `dlsym(RTLD_NEXT, ...)`.
///
/// ```ignore
/// #[interpose(real_vfprintf)]
/// unsafe fn vfprintf(stream: *mut FILE, format: *const c_char, ap: VaList) -> c_int {
///     check_format(format, Family::Printf);
///     unsafe { real_vfprintf(stream, format, ap) }
/// }
/// ```
///
/// The next definition is resolved on every call, never cached. If it can't
/// be resolved at all, the hook writes a short message to fd 2 and aborts:
/// panicking from inside a libc entry point isn't an option.
///
/// Export is disabled under `cfg(test)`, so a unit-test binary gets plain
/// Rust functions instead of shadowing its own C library.
#[proc_macro_attribute]
pub fn interpose(attr: TokenStream, item: TokenStream) -> TokenStream {
    let func = parse_macro_input!(item as syn::ItemFn);

    let syn::ItemFn {
        attrs,
        vis,
        sig,
        block,
    } = func;

    if let Err(err) = validate(&vis, &sig) {
        return err.to_compile_error().into();
    }

    let stmts = &block.stmts;

    let syn::Signature {
        ident,
        inputs,
        output,
        ..
    } = sig;

    if let Err(err) = param_idents(&inputs) {
        return err.to_compile_error().into();
    }

    let next_var =
        parse_macro_input!(attr as Option<Ident>).unwrap_or(Ident::new("next", ident.span()));

    // A string literal for the symbol being interposed, e.g. `"vfprintf"`
    let c_name_lit = LitStr::new(&ident.to_string(), ident.span());

    // The same but as a bytes literal, for the abort message.
    let c_name_bytes = LitByteStr::new(ident.to_string().as_bytes(), ident.span());

    // The same but a null-terminated bytes literal, e.g. `b"vfprintf\0"`
    let c_name_bytes_nulled = {
        let mut bytes = ident.to_string().into_bytes();
        bytes.push(0);
        LitByteStr::new(&bytes, ident.span())
    };

    let gen = quote! {
        #(#attrs)*
        #[cfg_attr(not(test), export_name = #c_name_lit)]
        #[allow(non_snake_case)]
        pub unsafe extern "C" fn #ident(#inputs) #output {
            #[allow(unused_variables)]
            let #next_var: unsafe extern "C" fn(#inputs) #output = {
                // NOTE: transmuting from a nullable function pointer to `Option<fn _>` is sound, per:
                // https://rust-lang.github.io/unsafe-code-guidelines/layout/function-pointers.html#representation
                let resolved: ::core::option::Option<unsafe extern "C" fn(#inputs) #output> = unsafe {
                    ::core::mem::transmute(::libc::dlsym(
                        ::libc::RTLD_NEXT,
                        #c_name_bytes_nulled.as_ptr().cast::<::libc::c_char>(),
                    ))
                };

                match resolved {
                    ::core::option::Option::Some(resolved) => resolved,
                    // Only reachable if we've been loaded into a process
                    // that has no other definition of this symbol.
                    ::core::option::Option::None => unsafe {
                        let msg = b"formatcheck: no next definition for interposed symbol: ";
                        ::libc::write(::libc::STDERR_FILENO, msg.as_ptr().cast::<::libc::c_void>(), msg.len());
                        ::libc::write(::libc::STDERR_FILENO, #c_name_bytes.as_ptr().cast::<::libc::c_void>(), #c_name_bytes.len());
                        ::libc::write(::libc::STDERR_FILENO, b"\n".as_ptr().cast::<::libc::c_void>(), 1);

                        ::libc::abort()
                    },
                }
            };

            #(#stmts)*
        }
    };

    gen.into()
}
