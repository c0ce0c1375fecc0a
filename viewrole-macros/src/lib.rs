//! Procedural macros for viewrole
//!
//! `#[viewset]` collects the role- and permission-qualified handlers of a
//! view-set type so dispatchers can find them by name.

use proc_macro::TokenStream;
use syn::{ItemImpl, parse_macro_input};

mod viewset;

/// Attribute macro implementing `Specialized` from an inherent `impl` block
///
/// Every method whose name contains `_for_` is registered under its own
/// name and must have the shape `fn(&self, &Request) -> Result<Value>`.
/// Mark helper methods that only look like handlers with
/// `#[viewset(skip)]`.
///
/// ```rust,ignore
/// #[viewset]
/// impl Articles {
///     fn get_queryset_for_admin(&self, _request: &Request<'_>) -> Result<Value> {
///         Ok(json!("everything"))
///     }
///
///     #[viewset(skip)]
///     fn cache_for_admin(&self) -> usize {
///         64
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn viewset(args: TokenStream, input: TokenStream) -> TokenStream {
    let args = proc_macro2::TokenStream::from(args);
    let input = parse_macro_input!(input as ItemImpl);
    viewset::viewset_impl(args, input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}
