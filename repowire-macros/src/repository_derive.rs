use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, GenericArgument, PathArguments, Type};

use crate::crate_path::repowire_data_path;

pub fn expand(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match generate(&input) {
        Ok(output) => output.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

const USAGE: &str = "#[derive(EntityRepository)] expects a struct with a single GenericRepository field:\n\
                     \n  #[derive(Clone, EntityRepository)]\n  pub struct UserRepository(GenericRepository<User>);";

fn generate(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "#[derive(EntityRepository)] does not support generic repositories",
        ));
    }

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(name, USAGE));
    };
    if data.fields.len() != 1 {
        return Err(syn::Error::new_spanned(name, USAGE));
    }
    let Some(field) = data.fields.iter().next() else {
        return Err(syn::Error::new_spanned(name, USAGE));
    };
    let entity = repository_entity(&field.ty)?;

    let krate = repowire_data_path();
    let (accessor, construct) = match (&data.fields, &field.ident) {
        (Fields::Named(_), Some(ident)) => (
            quote! { &self.#ident },
            quote! { Self { #ident: #krate::GenericRepository::new(registry)? } },
        ),
        _ => (
            quote! { &self.0 },
            quote! { Self(#krate::GenericRepository::new(registry)?) },
        ),
    };

    Ok(quote! {
        impl #krate::EntityRepository for #name {
            type Entity = #entity;

            fn repository(&self) -> &#krate::GenericRepository<#entity> {
                #accessor
            }
        }

        impl #name {
            /// Bind the repository to the shared manager registry.
            ///
            /// # Errors
            ///
            /// `DataError::Configuration` if the entity declaration is malformed.
            pub fn new(
                registry: #krate::SharedRegistry,
            ) -> ::core::result::Result<Self, #krate::DataError> {
                ::core::result::Result::Ok(#construct)
            }
        }

        impl #krate::__private::Bean for #name {
            fn dependencies() -> ::std::vec::Vec<(::std::any::TypeId, &'static str)> {
                ::std::vec![(
                    ::std::any::TypeId::of::<#krate::SharedRegistry>(),
                    ::std::any::type_name::<#krate::SharedRegistry>(),
                )]
            }

            fn build(
                ctx: &#krate::__private::BeanContext,
            ) -> ::core::result::Result<Self, #krate::__private::BeanError> {
                let registry = ctx.get::<#krate::SharedRegistry>()?;
                Self::new(registry).map_err(#krate::__private::BeanError::construction::<Self>)
            }
        }
    })
}

/// `GenericRepository<User>` → `User`.
fn repository_entity(ty: &Type) -> syn::Result<&Type> {
    if let Type::Path(path) = ty {
        if let Some(segment) = path.path.segments.last() {
            if segment.ident == "GenericRepository" {
                if let PathArguments::AngleBracketed(args) = &segment.arguments {
                    if let Some(GenericArgument::Type(entity)) = args.args.first() {
                        return Ok(entity);
                    }
                }
            }
        }
    }
    Err(syn::Error::new_spanned(ty, USAGE))
}
