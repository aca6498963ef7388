//! Procedural macros for Anbar.
//!
//! Use them through the `anbar` crate rather than depending on this one
//! directly.

use darling::FromMeta;
use darling::ast::NestedMeta;
use proc_macro::TokenStream;
use syn::{ItemImpl, parse_macro_input};

mod injectable;

/// Implements `Injectable` from an inherent initializer.
///
/// Put the attribute on the `impl` block that holds the initializer. The
/// initializer's parameters become the service's dependencies, in
/// order, and it must return `Result<Self, E>` where `E` converts into
/// `BoxError`.
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use anbar::injectable;
///
/// struct Mailer { smtp: Arc<Smtp>, config: Arc<Config> }
///
/// #[injectable]
/// impl Mailer {
///     fn init(smtp: Arc<Smtp>, config: Arc<Config>) -> Result<Self, anbar::BoxError> {
///         Ok(Mailer { smtp, config })
///     }
/// }
/// ```
///
/// # Arguments
/// - `init = "name"` — use another function as the initializer
/// - `crate = "path"` — path to the crate exporting `Injectable`
///   (default `::anbar`)
#[proc_macro_attribute]
pub fn injectable(attr: TokenStream, item: TokenStream) -> TokenStream {
    let nested = match NestedMeta::parse_meta_list(attr.into()) {
        Ok(nested) => nested,
        Err(err) => return darling::Error::from(err).write_errors().into(),
    };
    let args = match injectable::InjectableArgs::from_list(&nested) {
        Ok(args) => args,
        Err(err) => return err.write_errors().into(),
    };
    let item = parse_macro_input!(item as ItemImpl);

    injectable::expand(args, item)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
