extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, parse_quote, Attribute, Data, DeriveInput, Fields, GenericParam, Ident,
    Index, Lifetime, LifetimeParam, Member,
};

/// How a single field is written, from `#[bitspack(...)]` on the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Plain,
    /// Not written; `Default::default()` on decode.
    Skip,
    /// `f32` written as binary16.
    Half,
    /// `f32` written as bfloat16.
    BFloat,
    /// String written in NUL-terminated form.
    CString,
}

struct FieldInfo {
    member: Member,
    binding: Ident,
    kind: FieldKind,
}

fn field_kind(attrs: &[Attribute]) -> syn::Result<FieldKind> {
    let mut kind = FieldKind::Plain;
    for attr in attrs {
        if !attr.path().is_ident("bitspack") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            let next = if meta.path.is_ident("skip") {
                FieldKind::Skip
            } else if meta.path.is_ident("half") {
                FieldKind::Half
            } else if meta.path.is_ident("bfloat") {
                FieldKind::BFloat
            } else if meta.path.is_ident("cstring") {
                FieldKind::CString
            } else {
                return Err(meta.error("unknown bitspack field attribute"));
            };
            if kind != FieldKind::Plain {
                return Err(meta.error("a field takes at most one bitspack attribute"));
            }
            kind = next;
            Ok(())
        })?;
    }
    Ok(kind)
}

/// Whether `#[bitspack(object)]` is present on the container.
fn is_object(attrs: &[Attribute]) -> syn::Result<bool> {
    let mut object = false;
    for attr in attrs {
        if !attr.path().is_ident("bitspack") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("object") {
                object = true;
                Ok(())
            } else {
                Err(meta.error("unknown bitspack container attribute"))
            }
        })?;
    }
    Ok(object)
}

fn collect_fields(fields: &Fields) -> syn::Result<Vec<FieldInfo>> {
    fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let (member, binding) = match &field.ident {
                Some(ident) => (Member::Named(ident.clone()), format_ident!("__field_{}", ident)),
                None => (Member::Unnamed(Index::from(i)), format_ident!("__field_{}", i)),
            };
            Ok(FieldInfo {
                member,
                binding,
                kind: field_kind(&field.attrs)?,
            })
        })
        .collect()
}

/// Write statement for one field. `access` must evaluate to a reference.
fn encode_field(kind: FieldKind, access: TokenStream2) -> TokenStream2 {
    match kind {
        FieldKind::Plain => quote! { bitspack::Encode::encode(#access, writer); },
        FieldKind::Skip => quote! {},
        FieldKind::Half => quote! { writer.write_half(*#access); },
        FieldKind::BFloat => quote! { writer.write_bfloat(*#access); },
        FieldKind::CString => quote! {
            writer.write_cstr(::core::convert::AsRef::<str>::as_ref(#access));
        },
    }
}

fn decode_field(kind: FieldKind) -> TokenStream2 {
    match kind {
        // either string form is accepted on read
        FieldKind::Plain | FieldKind::CString => quote! { bitspack::Decode::decode(reader) },
        FieldKind::Skip => quote! { ::core::default::Default::default() },
        FieldKind::Half | FieldKind::BFloat => quote! { reader.read_f32() },
    }
}

/// `path { a: __field_a, .. }`, `path(__field_0, ..)` or `path`.
fn construct(path: TokenStream2, shape: &Fields, fields: &[FieldInfo]) -> TokenStream2 {
    let bindings = fields.iter().map(|f| &f.binding);
    match shape {
        Fields::Named(_) => {
            let members = fields.iter().map(|f| &f.member);
            quote! { #path { #(#members: #bindings),* } }
        }
        Fields::Unnamed(_) => quote! { #path(#(#bindings),*) },
        Fields::Unit => path,
    }
}

/// Match pattern binding every written field by reference.
fn destructure(path: TokenStream2, shape: &Fields, fields: &[FieldInfo]) -> TokenStream2 {
    let patterns = fields.iter().map(|f| match f.kind {
        FieldKind::Skip => quote! { _ },
        _ => {
            let binding = &f.binding;
            quote! { #binding }
        }
    });
    match shape {
        Fields::Named(_) => {
            let members = fields.iter().map(|f| &f.member);
            quote! { #path { #(#members: #patterns),* } }
        }
        Fields::Unnamed(_) => quote! { #path(#(#patterns),*) },
        Fields::Unit => path,
    }
}

/// Derive macro for the `Encode` trait.
///
/// Struct fields are written in declaration order. Enums write the variant
/// index as an integer followed by the variant's fields.
#[proc_macro_derive(Encode, attributes(bitspack))]
pub fn derive_encode(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_encode(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_encode(input: DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let object = is_object(&input.attrs)?;

    let body = match &input.data {
        Data::Struct(data) => {
            let fields = collect_fields(&data.fields)?;
            let writes = fields.iter().map(|f| {
                let member = &f.member;
                encode_field(f.kind, quote! { &self.#member })
            });
            quote! { #(#writes)* }
        }
        Data::Enum(data) if data.variants.is_empty() => quote! { match *self {} },
        Data::Enum(data) => {
            let arms = data
                .variants
                .iter()
                .enumerate()
                .map(|(index, variant)| {
                    let index = index as u32;
                    let variant_name = &variant.ident;
                    let fields = collect_fields(&variant.fields)?;
                    let pattern =
                        destructure(quote! { Self::#variant_name }, &variant.fields, &fields);
                    let writes = fields.iter().map(|f| {
                        let binding = &f.binding;
                        encode_field(f.kind, quote! { #binding })
                    });
                    Ok(quote! {
                        #pattern => {
                            writer.write_u32(#index);
                            #(#writes)*
                        }
                    })
                })
                .collect::<syn::Result<Vec<_>>>()?;
            quote! {
                match self {
                    #(#arms)*
                }
            }
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                name,
                "Encode cannot be derived for unions",
            ))
        }
    };

    let body = if object {
        quote! {
            writer.begin_object();
            #body
            writer.end_object();
        }
    } else {
        body
    };

    let mut generics = input.generics.clone();
    for param in generics.type_params_mut() {
        param.bounds.push(parse_quote!(bitspack::Encode));
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics bitspack::Encode for #name #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn encode<__S: bitspack::ByteSink + ?Sized>(
                &self,
                writer: &mut bitspack::Writer<'_, __S>,
            ) {
                #body
            }
        }
    })
}

/// Derive macro for the `Decode` trait.
///
/// Fields are read back in declaration order. An enum index with no matching
/// variant raises a type mismatch and yields `Default::default()`, so enums
/// deriving `Decode` must implement `Default`.
#[proc_macro_derive(Decode, attributes(bitspack))]
pub fn derive_decode(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_decode(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_decode(input: DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let object = is_object(&input.attrs)?;

    let reads = |fields: &[FieldInfo]| {
        let lets = fields.iter().map(|f| {
            let binding = &f.binding;
            let expr = decode_field(f.kind);
            quote! { let #binding = #expr; }
        });
        quote! { #(#lets)* }
    };

    let body = match &input.data {
        Data::Struct(data) => {
            let fields = collect_fields(&data.fields)?;
            let lets = reads(&fields);
            let value = construct(quote! { Self }, &data.fields, &fields);
            quote! {
                #lets
                #value
            }
        }
        Data::Enum(data) => {
            let arms = data
                .variants
                .iter()
                .enumerate()
                .map(|(index, variant)| {
                    let index = index as u32;
                    let variant_name = &variant.ident;
                    let fields = collect_fields(&variant.fields)?;
                    let lets = reads(&fields);
                    let value = construct(quote! { Self::#variant_name }, &variant.fields, &fields);
                    Ok(quote! {
                        #index => {
                            #lets
                            #value
                        }
                    })
                })
                .collect::<syn::Result<Vec<_>>>()?;
            quote! {
                match reader.read_u32() {
                    #(#arms)*
                    _ => {
                        reader.set_error(bitspack::ReadErrors::TYPE_MISMATCH);
                        ::core::default::Default::default()
                    }
                }
            }
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                name,
                "Decode cannot be derived for unions",
            ))
        }
    };

    let body = if object {
        quote! {
            reader.read_begin_object();
            let __value = { #body };
            reader.read_end_object();
            __value
        }
    } else {
        body
    };

    // '__de outlives every lifetime of the type so borrowed fields can point into the input
    let de = Lifetime::new("'__de", Span::call_site());
    let mut generics = input.generics.clone();
    let lifetimes: Vec<Lifetime> = generics.lifetimes().map(|l| l.lifetime.clone()).collect();
    for param in generics.type_params_mut() {
        param.bounds.push(parse_quote!(bitspack::Decode<#de>));
    }
    let mut de_param = LifetimeParam::new(de.clone());
    de_param.bounds.extend(lifetimes);
    generics.params.insert(0, GenericParam::Lifetime(de_param));
    let (impl_generics, _, where_clause) = generics.split_for_impl();
    let (_, ty_generics, _) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics bitspack::Decode<#de> for #name #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn decode(reader: &mut bitspack::Reader<#de>) -> Self {
                #body
            }
        }
    })
}
