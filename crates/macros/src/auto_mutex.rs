use proc_macro2::{Literal, TokenStream};
use quote::quote;
use syn::ext::IdentExt;
use syn::{FnArg, Ident, Item, Pat, ReturnType, Type};

use crate::attr::AutoMutexArgs;
use crate::shared::automutex_crate;

struct Param {
    ident: Ident,
    name: String,
}

pub(crate) fn generate(args: AutoMutexArgs, input: Item) -> syn::Result<TokenStream> {
    let Item::Fn(item_fn) = input else {
        return Err(syn::Error::new_spanned(input, "#[auto_mutex] must be added to an `async fn`"));
    };
    let sig = &item_fn.sig;
    if sig.asyncness.is_none() {
        return Err(syn::Error::new_spanned(sig.fn_token, "#[auto_mutex] requires an `async fn`"));
    }

    let mut has_receiver = false;
    let mut params = Vec::with_capacity(sig.inputs.len());
    for input in &sig.inputs {
        match input {
            FnArg::Receiver(recv) => {
                if recv.reference.is_none() || recv.mutability.is_some() || recv.colon_token.is_some() {
                    return Err(syn::Error::new_spanned(recv, "#[auto_mutex] method receiver must be `&self`"));
                }
                has_receiver = true;
            }
            FnArg::Typed(pat) => match &*pat.pat {
                Pat::Ident(pat_ident) if pat_ident.by_ref.is_none() && pat_ident.subpat.is_none() => {
                    params.push(Param {
                        ident: pat_ident.ident.clone(),
                        name: pat_ident.ident.unraw().to_string(),
                    });
                }
                _ => {
                    return Err(syn::Error::new_spanned(
                        pat,
                        "#[auto_mutex] parameters must be plain identifiers",
                    ));
                }
            },
        }
    }

    let on = args.on.iter().map(|ident| ident.unraw().to_string()).collect::<Vec<_>>();
    let unknown = args
        .on
        .iter()
        .zip(&on)
        .filter(|(_, name)| !params.iter().any(|param| &param.name == *name))
        .collect::<Vec<_>>();
    if let Some((first, _)) = unknown.first() {
        let names = unknown.iter().map(|(_, name)| name.as_str()).collect::<Vec<_>>();
        return Err(syn::Error::new_spanned(
            first,
            format!("You are trying to lock on unknown arguments: {}", names.join(", ")),
        ));
    }

    let krate = automutex_crate();
    let fn_name = sig.ident.unraw().to_string();
    let names = params.iter().map(|param| param.name.as_str()).collect::<Vec<_>>();
    let count = names.len();
    let signature = quote! {
        #krate::MethodSignature::from_positional({
            let names: [&'static str; #count] = [#(#names),*];
            names
        })
    };
    let block = args.block.map(|secs| {
        let secs = Literal::f64_suffixed(secs);
        quote!(.block(::std::time::Duration::from_secs_f64(#secs)))
    });
    let on_names = (!on.is_empty()).then(|| quote!(.on([#(#on),*])));

    let slots = params.iter().map(|param| {
        if on.is_empty() || on.contains(&param.name) {
            let ident = &param.ident;
            quote!(.arg(&#ident))
        } else {
            quote!(.skip())
        }
    });
    let identity = if let Some(name) = &args.name {
        quote!(#name)
    } else if has_receiver {
        quote!(&::std::format!("{}#{}", ::std::any::type_name::<Self>(), #fn_name))
    } else {
        quote!(::std::concat!(::std::module_path!(), "::", #fn_name))
    };

    let call_args = has_receiver
        .then(|| quote!(self))
        .into_iter()
        .chain(params.iter().map(|param| {
            let ident = &param.ident;
            quote!(#ident)
        }))
        .collect::<Vec<_>>();
    let on_failure = match &args.after_failure {
        Some(fallback) => quote!((#fallback)(#(#call_args),*).await),
        None => quote! {
            ::std::result::Result::Err(::std::convert::From::from(#krate::MutexError::not_acquired(__automutex_key)))
        },
    };

    let block_body = &item_fn.block;
    let body = match &sig.output {
        ReturnType::Type(_, ty) if !matches!(**ty, Type::ImplTrait(_)) => {
            quote!(#krate::__private::body::<#ty, _>(async move #block_body))
        }
        _ => quote!(#krate::__private::body(async move #block_body)),
    };

    let store = &args.store;
    let attrs = &item_fn.attrs;
    let vis = &item_fn.vis;
    Ok(quote! {
        #(#attrs)*
        #vis #sig {
            static __AUTOMUTEX_GUARD: ::std::sync::LazyLock<#krate::Guard> = ::std::sync::LazyLock::new(|| {
                #krate::Guard::prevalidated(#signature, #krate::GuardConfig::new() #block #on_names)
            });
            let __automutex_key = __AUTOMUTEX_GUARD.key(#identity, &#krate::CallArguments::new() #(#slots)*);
            let __automutex_store = #store;
            match __AUTOMUTEX_GUARD.acquire(__automutex_store, &__automutex_key).await {
                ::std::result::Result::Ok(::std::option::Option::Some(__automutex_lock)) => {
                    __automutex_lock.run(#body).await
                }
                ::std::result::Result::Ok(::std::option::Option::None) => #on_failure,
                ::std::result::Result::Err(e) => ::std::result::Result::Err(::std::convert::From::from(e)),
            }
        }
    })
}
