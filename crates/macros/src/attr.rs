use std::time::Duration;

use proc_macro2::Span;
use syn::ext::IdentExt;
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::{Expr, Ident, Lit, LitStr, Token, parenthesized};

/// Options of `#[auto_mutex(...)]`.
pub(crate) struct AutoMutexArgs {
    pub(crate) store: Expr,
    pub(crate) block: Option<f64>,
    pub(crate) on: Vec<Ident>,
    pub(crate) after_failure: Option<Expr>,
    pub(crate) name: Option<LitStr>,
}

impl Parse for AutoMutexArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut store = None;
        let mut block = None;
        let mut on = None;
        let mut after_failure = None;
        let mut name = None;

        while !input.is_empty() {
            let option: Ident = input.parse()?;
            match option.to_string().as_str() {
                "store" => {
                    input.parse::<Token![=]>()?;
                    set_once(&mut store, input.parse::<Expr>()?, &option)?;
                }
                "block" => {
                    input.parse::<Token![=]>()?;
                    let lit: Lit = input.parse()?;
                    set_once(&mut block, parse_seconds(&lit)?, &option)?;
                }
                "on" => {
                    let content;
                    parenthesized!(content in input);
                    let names = Punctuated::<Ident, Token![,]>::parse_terminated_with(&content, Ident::parse_any)?;
                    set_once(&mut on, names.into_iter().collect::<Vec<_>>(), &option)?;
                }
                "after_failure" => {
                    input.parse::<Token![=]>()?;
                    set_once(&mut after_failure, input.parse::<Expr>()?, &option)?;
                }
                "name" => {
                    input.parse::<Token![=]>()?;
                    set_once(&mut name, input.parse::<LitStr>()?, &option)?;
                }
                _ => {
                    return Err(syn::Error::new_spanned(
                        &option,
                        format!(
                            "unknown option `{option}`, expected `store`, `block`, `on`, `after_failure` or `name`"
                        ),
                    ));
                }
            }
            if input.is_empty() {
                break;
            }
            input.parse::<Token![,]>()?;
        }

        let Some(store) = store else {
            return Err(syn::Error::new(
                Span::call_site(),
                "#[auto_mutex] requires a lock store, e.g. `store = &self.locks`",
            ));
        };
        Ok(Self {
            store,
            block,
            on: on.unwrap_or_default(),
            after_failure,
            name,
        })
    }
}

fn set_once<T>(slot: &mut Option<T>, value: T, option: &Ident) -> syn::Result<()> {
    if slot.is_some() {
        return Err(syn::Error::new_spanned(option, format!("duplicate option `{option}`")));
    }
    *slot = Some(value);
    Ok(())
}

fn parse_seconds(lit: &Lit) -> syn::Result<f64> {
    let secs = match lit {
        Lit::Int(lit) => lit.base10_parse::<u64>()? as f64,
        Lit::Float(lit) => lit.base10_parse::<f64>()?,
        _ => {
            return Err(syn::Error::new_spanned(
                lit,
                "`block` must be a non-negative number of seconds",
            ));
        }
    };
    if Duration::try_from_secs_f64(secs).is_err() {
        return Err(syn::Error::new_spanned(lit, "`block` is out of range for a `Duration`"));
    }
    Ok(secs)
}
