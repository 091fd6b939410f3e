use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::{parse_macro_input, Data, DeriveInput, Fields, LitStr};

use crate::crate_path::repowire_data_path;

pub fn expand(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match generate(&input) {
        Ok(output) => output.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

struct EntityAttrs {
    name: String,
    table: String,
}

struct Column {
    field: syn::Ident,
    /// Field name as criteria and finders spell it (`r#type` → `type`).
    name: String,
    column: String,
    is_id: bool,
}

fn generate(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let vis = &input.vis;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "#[derive(Entity)] does not support generic entities",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "#[derive(Entity)] only works on structs with named fields:\n\
                     \n  #[derive(Entity)]\n  struct User {\n      #[id] id: i64,\n      name: String,\n  }",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "#[derive(Entity)] only works on structs, enums and unions are not supported",
            ))
        }
    };

    let attrs = parse_entity_attrs(input)?;
    let mut columns = Vec::with_capacity(fields.len());
    for field in fields {
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        let is_id = field.attrs.iter().any(|a| a.path().is_ident("id"));
        let name = ident.unraw().to_string();
        let column = match field.attrs.iter().find(|a| a.path().is_ident("column")) {
            Some(attr) => attr.parse_args::<LitStr>()?.value(),
            None => name.clone(),
        };
        columns.push(Column {
            field: ident,
            name,
            column,
            is_id,
        });
    }

    // Without explicit #[id] markers, a field named `id` is the identifier.
    if !columns.iter().any(|c| c.is_id) {
        match columns.iter_mut().find(|c| c.field == "id") {
            Some(c) => c.is_id = true,
            None => {
                return Err(syn::Error::new_spanned(
                    name,
                    "#[derive(Entity)] needs an identifier: mark a field with #[id]",
                ))
            }
        }
    }

    let krate = repowire_data_path();
    let entity_name = &attrs.name;
    let table = &attrs.table;
    let column_names: Vec<&String> = columns.iter().map(|c| &c.column).collect();
    let field_names: Vec<&String> = columns.iter().map(|c| &c.name).collect();
    let id_names: Vec<&String> = columns.iter().filter(|c| c.is_id).map(|c| &c.column).collect();
    let field_inits = columns.iter().map(|c| {
        let field = &c.field;
        let column = &c.column;
        quote! { #field: row.get(#column)? }
    });

    let finders_trait = format_ident!("{}Finders", name);
    let finder_methods = columns.iter().map(|c| finder_methods(c, name, &krate));
    let finders_doc = format!(
        "Typed finders for every column of [`{name}`], available on any repository of it."
    );

    Ok(quote! {
        impl #krate::Entity for #name {
            fn entity_name() -> &'static str {
                #entity_name
            }

            fn table_name() -> &'static str {
                #table
            }

            fn id_columns() -> &'static [&'static str] {
                &[#(#id_names),*]
            }

            fn columns() -> &'static [&'static str] {
                &[#(#column_names),*]
            }

            fn fields() -> &'static [&'static str] {
                &[#(#field_names),*]
            }

            fn from_row(row: &#krate::Row) -> ::core::result::Result<Self, #krate::DataError> {
                ::core::result::Result::Ok(Self {
                    #(#field_inits,)*
                })
            }
        }

        #[doc = #finders_doc]
        #vis trait #finders_trait: #krate::EntityRepository<Entity = #name> {
            #(#finder_methods)*
        }

        impl<R: #krate::EntityRepository<Entity = #name>> #finders_trait for R {}
    })
}

fn finder_methods(column: &Column, entity: &syn::Ident, krate: &TokenStream2) -> TokenStream2 {
    let name = &column.name;
    let find_by = format_ident!("find_by_{}", name);
    let find_one_by = format_ident!("find_one_by_{}", name);
    let count_by = format_ident!("count_by_{}", name);

    quote! {
        fn #find_by(
            &self,
            value: impl ::core::convert::Into<#krate::Value>,
        ) -> impl ::core::future::Future<Output = ::core::result::Result<::std::vec::Vec<#entity>, #krate::DataError>> + Send {
            let criteria = #krate::Criteria::new().with(#name, value);
            async move {
                self.repository()
                    .find_by(&criteria, ::core::option::Option::None, ::core::option::Option::None, ::core::option::Option::None)
                    .await
            }
        }

        fn #find_one_by(
            &self,
            value: impl ::core::convert::Into<#krate::Value>,
        ) -> impl ::core::future::Future<Output = ::core::result::Result<::core::option::Option<#entity>, #krate::DataError>> + Send {
            let criteria = #krate::Criteria::new().with(#name, value);
            async move {
                self.repository()
                    .find_one_by(&criteria, ::core::option::Option::None)
                    .await
            }
        }

        fn #count_by(
            &self,
            value: impl ::core::convert::Into<#krate::Value>,
        ) -> impl ::core::future::Future<Output = ::core::result::Result<u64, #krate::DataError>> + Send {
            let criteria = #krate::Criteria::new().with(#name, value);
            async move { self.repository().count(&criteria).await }
        }
    }
}

fn parse_entity_attrs(input: &DeriveInput) -> syn::Result<EntityAttrs> {
    let mut attrs = EntityAttrs {
        name: input.ident.to_string(),
        table: to_snake_case(&input.ident.to_string()),
    };
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("entity")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                attrs.table = meta.value()?.parse::<LitStr>()?.value();
                Ok(())
            } else if meta.path.is_ident("name") {
                attrs.name = meta.value()?.parse::<LitStr>()?.value();
                Ok(())
            } else {
                Err(meta.error("unknown #[entity] key, expected `table` or `name`"))
            }
        })?;
    }
    Ok(attrs)
}

/// `BlogPost` → `blog_post`, `HTTPLog` → `http_log`.
fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1);
            // A capital starts a word after a lowercase letter or digit, or
            // when it ends an acronym followed by a lowercase letter.
            let word_start = match prev {
                Some(p) if p.is_ascii_uppercase() => next.is_some_and(|n| n.is_ascii_lowercase()),
                Some(p) => p != '_',
                None => false,
            };
            if word_start {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
