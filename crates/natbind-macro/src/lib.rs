//! Compile-time front end for `natbind-codegen`.
//!
//! ```ignore
//! natbind_macro::natbind_interface! {
//!     name = LibC,
//!     source = "strlen: (string) -> i64\natoi: (string) -> i32",
//!     entry = ::natbind_runtime::resolve(&::natbind_runtime::LibrarySpec::CurrentProcess),
//! }
//!
//! let n = lib_c::strlen(Some("four"))?;
//! ```
//!
//! Keys:
//! - `name` - the generated struct's name
//! - `source = "..."` - signatures inline, or
//! - `path = "..."` - a signature file, relative to `CARGO_MANIFEST_DIR`
//! - `entry = <expr>` - optional; emits the entry-point module resolved
//!   through `<expr>` (a `BindResult<Arc<dyn SymbolLookup>>`)
//!
//! The expansion refers to `::natbind_runtime`, which the calling crate
//! must depend on.

use std::path::PathBuf;

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::{quote, ToTokens};
use syn::parse::{Parse, ParseStream};
use syn::{parse_macro_input, Expr, Ident, LitStr, Token};

use natbind_core::InterfaceDescription;

enum Signatures {
    Inline(LitStr),
    File(LitStr),
}

struct InterfaceArgs {
    name: Ident,
    signatures: Signatures,
    entry: Option<Expr>,
}

impl Parse for InterfaceArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut name = None;
        let mut signatures = None;
        let mut entry = None;

        while !input.is_empty() {
            let key: Ident = input.parse()?;
            input.parse::<Token![=]>()?;

            match key.to_string().as_str() {
                "name" => name = Some(input.parse::<Ident>()?),
                "source" | "path" if signatures.is_some() => {
                    return Err(syn::Error::new(
                        key.span(),
                        "only one of `source` and `path` may be given",
                    ));
                }
                "source" => signatures = Some(Signatures::Inline(input.parse()?)),
                "path" => signatures = Some(Signatures::File(input.parse()?)),
                "entry" => entry = Some(input.parse::<Expr>()?),
                other => {
                    return Err(syn::Error::new(
                        key.span(),
                        format!("unknown key `{}`, expected name, source, path or entry", other),
                    ));
                }
            }

            if input.is_empty() {
                break;
            }
            input.parse::<Token![,]>()?;
        }

        let name = name.ok_or_else(|| syn::Error::new(Span::call_site(), "missing `name = ...`"))?;
        let signatures = signatures.ok_or_else(|| {
            syn::Error::new(Span::call_site(), "missing `source = \"...\"` or `path = \"...\"`")
        })?;
        Ok(Self {
            name,
            signatures,
            entry,
        })
    }
}

/// Generate a typed binding for an interface at compile time.
///
/// See the crate documentation for the accepted keys.
#[proc_macro]
pub fn natbind_interface(input: TokenStream) -> TokenStream {
    let args = parse_macro_input!(input as InterfaceArgs);
    match expand(&args) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand(args: &InterfaceArgs) -> syn::Result<proc_macro2::TokenStream> {
    let name = args.name.to_string();

    let (desc, tracked) = match &args.signatures {
        Signatures::Inline(lit) => {
            let desc = InterfaceDescription::parse(name, &lit.value())
                .map_err(|e| syn::Error::new(lit.span(), e.to_string()))?;
            (desc, None)
        }
        Signatures::File(lit) => {
            let path = manifest_relative(&lit.value());
            let desc = InterfaceDescription::from_file(name, &path)
                .map_err(|e| syn::Error::new(lit.span(), e.to_string()))?;
            (desc, Some(path))
        }
    };

    let source = match &args.entry {
        Some(expr) => {
            let expr = expr.to_token_stream().to_string();
            natbind_codegen::generate_with_entry_point(&desc, &expr)
        }
        None => natbind_codegen::generate(&desc),
    }
    .map_err(|e| syn::Error::new(args.name.span(), e.to_string()))?;

    let generated: proc_macro2::TokenStream = source
        .parse()
        .map_err(|e| syn::Error::new(args.name.span(), format!("generated code does not lex: {:?}", e)))?;

    // Rebuild when the signature file changes.
    let track = tracked.map(|path| {
        let path = path.to_string_lossy().into_owned();
        quote!(const _: &str = include_str!(#path);)
    });

    Ok(quote! {
        #track
        #generated
    })
}

fn manifest_relative(path: &str) -> PathBuf {
    let dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(dir).join(path)
}
