//! `#[viewset]` implementation

use proc_macro2::TokenStream;
use quote::quote;
use syn::spanned::Spanned;
use syn::{Error, FnArg, ImplItem, ImplItemFn, ItemImpl, Result, ReturnType, Type};

const QUALIFIER_SEPARATOR: &str = "_for_";

pub fn viewset_impl(args: TokenStream, mut input: ItemImpl) -> Result<TokenStream> {
    if !args.is_empty() {
        return Err(Error::new(args.span(), "#[viewset] takes no arguments"));
    }
    if let Some((_, path, _)) = &input.trait_ {
        return Err(Error::new(
            path.span(),
            "#[viewset] must be applied to an inherent impl block",
        ));
    }

    let mut handlers = Vec::new();
    let mut errors: Option<Error> = None;

    for item in &mut input.items {
        let ImplItem::Fn(method) = item else {
            continue;
        };

        let skip = match take_skip(method) {
            Ok(skip) => skip,
            Err(err) => {
                combine(&mut errors, err);
                continue;
            }
        };
        if skip || !is_qualified(&method.sig.ident.to_string()) {
            continue;
        }

        match check_signature(method) {
            Ok(()) => handlers.push(method.sig.ident.clone()),
            Err(err) => combine(&mut errors, err),
        }
    }

    if let Some(err) = errors {
        return Err(err);
    }

    let self_ty = &input.self_ty;
    let (impl_generics, _, where_clause) = input.generics.split_for_impl();
    let names = handlers.iter().map(|ident| ident.to_string());

    Ok(quote! {
        #input

        impl #impl_generics ::viewrole_viewset::Specialized for #self_ty #where_clause {
            fn specializations() -> ::viewrole_viewset::Specializations<Self> {
                ::viewrole_viewset::Specializations::new()
                    #( .with(#names, Self::#handlers) )*
            }
        }
    })
}

/// `<operation>_for_<qualifier>` with both parts present
fn is_qualified(name: &str) -> bool {
    name.find(QUALIFIER_SEPARATOR)
        .is_some_and(|at| at > 0 && at + QUALIFIER_SEPARATOR.len() < name.len())
}

/// Strip `#[viewset(skip)]` from the method, reporting whether it was there
fn take_skip(method: &mut ImplItemFn) -> Result<bool> {
    let mut skip = false;
    let mut result = Ok(());

    method.attrs.retain(|attr| {
        if !attr.path().is_ident("viewset") {
            return true;
        }
        let parsed = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                skip = true;
                Ok(())
            } else {
                let path = meta
                    .path
                    .get_ident()
                    .map(|i| i.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                Err(meta.error(format!("unsupported viewset attribute: `{}`", path)))
            }
        });
        if let Err(err) = parsed {
            result = Err(err);
        }
        false
    });

    result.map(|()| skip)
}

fn check_signature(method: &ImplItemFn) -> Result<()> {
    let sig = &method.sig;
    let message = format!(
        "specialized handler `{}` must have the shape `fn(&self, &Request) -> Result<Value>`; \
         mark it #[viewset(skip)] if it is not a handler",
        sig.ident
    );

    if sig.asyncness.is_some() || !sig.generics.params.is_empty() {
        return Err(Error::new(sig.span(), message));
    }

    let mut inputs = sig.inputs.iter();
    let receiver_ok = matches!(
        inputs.next(),
        Some(FnArg::Receiver(receiver))
            if receiver.reference.is_some() && receiver.mutability.is_none()
    );
    let request_ok = matches!(
        inputs.next(),
        Some(FnArg::Typed(arg))
            if matches!(&*arg.ty, Type::Reference(reference) if reference.mutability.is_none())
    );

    let output_ok = matches!(
        &sig.output,
        ReturnType::Type(_, ty)
            if matches!(&**ty, Type::Path(path)
                if path.path.segments.last().is_some_and(|s| s.ident == "Result"))
    );

    if receiver_ok && request_ok && output_ok && inputs.next().is_none() {
        Ok(())
    } else {
        Err(Error::new(sig.span(), message))
    }
}

fn combine(errors: &mut Option<Error>, err: Error) {
    match errors {
        Some(existing) => existing.combine(err),
        None => *errors = Some(err),
    }
}
