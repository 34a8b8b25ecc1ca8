extern crate proc_macro;

use crate::proc_macro::TokenStream;

use quote::quote;

use syn::{parse_macro_input, Data, DataStruct, DeriveInput, Index};

/// Writes each field in declaration order.
/// Layouts with offsets or counts to update implement `MchWrite` manually instead.
#[proc_macro_derive(MchWrite)]
pub fn mch_write_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    // TODO: Support C-like enums once a format needs more than the manual impls.
    let fields = match &input.data {
        Data::Struct(DataStruct { fields, .. }) => fields,
        _ => {
            return syn::Error::new_spanned(&input.ident, "MchWrite can only be derived for structs")
                .to_compile_error()
                .into()
        }
    };

    let members: Vec<_> = fields
        .iter()
        .enumerate()
        .map(|(i, field)| match &field.ident {
            Some(ident) => quote!(#ident),
            None => {
                let index = Index::from(i);
                quote!(#index)
            }
        })
        .collect();

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics mch_write::MchWrite for #name #ty_generics #where_clause {
            fn mch_write<W: std::io::Write + std::io::Seek>(
                &self,
                writer: &mut W,
            ) -> std::io::Result<()> {
                #(mch_write::MchWrite::mch_write(&self.#members, writer)?;)*
                Ok(())
            }

            fn size_in_bytes(&self) -> u64 {
                0u64 #(+ mch_write::MchWrite::size_in_bytes(&self.#members))*
            }
        }
    };

    TokenStream::from(expanded)
}
