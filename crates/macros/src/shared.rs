use proc_macro_crate::{FoundCrate, crate_name};
use proc_macro2::Span;
use syn::Ident;

// https://github.com/bkchr/proc-macro-crate/issues/14
pub(crate) fn automutex_crate() -> Ident {
    match crate_name("automutex") {
        Ok(automutex) => match automutex {
            FoundCrate::Itself => Ident::new("automutex", Span::call_site()),
            FoundCrate::Name(name) => Ident::new(&name, Span::call_site()),
        },
        Err(_) => match crate_name("automutex_core") {
            Ok(automutex) => match automutex {
                FoundCrate::Itself => Ident::new("automutex_core", Span::call_site()),
                FoundCrate::Name(name) => Ident::new(&name, Span::call_site()),
            },
            Err(_) => Ident::new("automutex", Span::call_site()),
        },
    }
}
