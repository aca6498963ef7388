//! Expansion of `#[injectable]`.

use darling::FromMeta;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::spanned::Spanned;
use syn::{FnArg, ImplItem, ImplItemFn, ItemImpl, ReturnType, Type};

#[derive(Debug, Default, FromMeta)]
pub(crate) struct InjectableArgs {
    /// Initializer function name, `init` when absent
    #[darling(default)]
    init: Option<syn::Ident>,
    #[darling(default, rename = "crate")]
    krate: Option<syn::Path>,
}

pub(crate) fn expand(args: InjectableArgs, item: ItemImpl) -> syn::Result<TokenStream> {
    if let Some((_, path, _)) = &item.trait_ {
        return Err(syn::Error::new(
            path.span(),
            "#[injectable] goes on an inherent impl block, not a trait impl",
        ));
    }

    let init_name = args.init.unwrap_or_else(|| format_ident!("init"));
    let krate = args
        .krate
        .map(|path| quote!(#path))
        .unwrap_or_else(|| quote!(::anbar));

    let init = find_initializer(&item, &init_name)?;
    check_signature(init)?;
    let deps = dependency_types(init)?;

    let vars: Vec<_> = (0..deps.len()).map(|i| format_ident!("__dep{}", i)).collect();
    let self_ty = &item.self_ty;
    let (impl_generics, _, where_clause) = item.generics.split_for_impl();

    Ok(quote! {
        #item

        impl #impl_generics #krate::Injectable for #self_ty #where_clause {
            type Deps = (#(#deps,)*);

            fn init(deps: Self::Deps) -> ::core::result::Result<Self, #krate::BoxError> {
                let (#(#vars,)*) = deps;
                <#self_ty>::#init_name(#(#vars),*).map_err(::core::convert::Into::into)
            }
        }
    })
}

fn find_initializer<'a>(item: &'a ItemImpl, name: &syn::Ident) -> syn::Result<&'a ImplItemFn> {
    item.items
        .iter()
        .find_map(|entry| match entry {
            ImplItem::Fn(func) if func.sig.ident == *name => Some(func),
            _ => None,
        })
        .ok_or_else(|| {
            syn::Error::new(
                item.self_ty.span(),
                format!("#[injectable] needs an initializer function named `{name}` in this impl block"),
            )
        })
}

fn check_signature(init: &ImplItemFn) -> syn::Result<()> {
    let sig = &init.sig;

    if let Some(receiver) = sig.receiver() {
        return Err(syn::Error::new(
            receiver.span(),
            "the initializer must be an associated function without `self`",
        ));
    }
    if let Some(asyncness) = sig.asyncness {
        return Err(syn::Error::new(asyncness.span(), "the initializer cannot be async"));
    }
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new(
            sig.generics.span(),
            "the initializer cannot have generic parameters",
        ));
    }
    if let ReturnType::Default = sig.output {
        return Err(syn::Error::new(
            sig.ident.span(),
            "the initializer must return `Result<Self, E>`",
        ));
    }

    Ok(())
}

/// Parameter types in order; the same type may appear only once.
fn dependency_types(init: &ImplItemFn) -> syn::Result<Vec<&Type>> {
    let mut types: Vec<&Type> = Vec::new();
    let mut seen: Vec<String> = Vec::new();

    for input in &init.sig.inputs {
        let FnArg::Typed(pat) = input else {
            continue;
        };
        let ty = pat.ty.as_ref();
        let rendered = quote!(#ty).to_string();

        if seen.contains(&rendered) {
            return Err(syn::Error::new(
                ty.span(),
                format!("dependency `{rendered}` is declared more than once"),
            ));
        }
        seen.push(rendered);
        types.push(ty);
    }

    Ok(types)
}
