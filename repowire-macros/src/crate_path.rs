//! Crate path resolution for generated code.
//!
//! Detects whether the user depends on `repowire` (facade) or
//! `repowire-data` directly, and returns the matching path prefix.

use proc_macro2::TokenStream;
use proc_macro_crate::{crate_name, FoundCrate};
use quote::quote;

/// Returns the token stream for accessing `repowire_data` types.
///
/// If the user depends on `repowire`, returns `::repowire::repowire_data`.
/// Otherwise returns `::repowire_data`.
pub fn repowire_data_path() -> TokenStream {
    if let Ok(found) = crate_name("repowire") {
        match found {
            // The facade's own tests and demos also report `Itself`; the
            // facade declares `extern crate self as repowire` so this path
            // resolves everywhere.
            FoundCrate::Itself => quote!(::repowire::repowire_data),
            FoundCrate::Name(name) => {
                let ident = syn::Ident::new(&name, proc_macro2::Span::call_site());
                quote!(::#ident::repowire_data)
            }
        }
    } else if let Ok(found) = crate_name("repowire-data") {
        match found {
            FoundCrate::Itself => quote!(crate),
            FoundCrate::Name(name) => {
                let ident = syn::Ident::new(&name, proc_macro2::Span::call_site());
                quote!(::#ident)
            }
        }
    } else {
        // Fallback - assume repowire_data is available (for error messages)
        quote!(::repowire_data)
    }
}
