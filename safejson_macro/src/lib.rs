use proc_macro::TokenStream;
use quote::quote;
use syn::{DeriveInput, Ident, LitStr, Token, parse_macro_input};

struct RecordAttributes {
    identity: Option<Ident>,
    name: Option<LitStr>,
}

/// Implements `safejson::ToRecord` through the type's `Serialize` impl.
///
/// `#[record(identity = field)]` names the field shown next to the type name
/// in diagnostic paths, `#[record(name = "...")]` overrides the type name.
#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let mut record_attrs = RecordAttributes {
        identity: None,
        name: None,
    };

    for attr in &input.attrs {
        if !attr.path().is_ident("record") {
            continue;
        }
        let parsed = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("identity") {
                let _ = meta.input.parse::<Token![=]>()?;
                record_attrs.identity = Some(meta.input.parse::<Ident>()?);
                Ok(())
            } else if meta.path.is_ident("name") {
                record_attrs.name = Some(meta.value()?.parse::<LitStr>()?);
                Ok(())
            } else {
                Err(meta.error("expected `identity = <field>` or `name = \"...\"`"))
            }
        });
        if let Err(err) = parsed {
            return err.to_compile_error().into();
        }
    }

    let type_ident = &input.ident;
    let type_name = record_attrs
        .name
        .map(|name| name.value())
        .unwrap_or_else(|| type_ident.to_string());

    let identity = match record_attrs.identity {
        Some(field) => quote! {
            ::std::option::Option::Some(::std::string::ToString::to_string(&self.#field))
        },
        None => quote! { ::std::option::Option::None },
    };

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let out = quote! {
        impl #impl_generics ::safejson::ToRecord for #type_ident #ty_generics #where_clause {
            fn type_name(&self) -> &str {
                #type_name
            }

            fn identity(&self) -> ::std::option::Option<::std::string::String> {
                #identity
            }

            fn to_record(&self) -> ::safejson::Node {
                ::safejson::to_node(self).unwrap_or_else(|err| {
                    ::safejson::Node::opaque(#type_name, ::std::string::ToString::to_string(&err))
                })
            }
        }
    };

    out.into()
}
