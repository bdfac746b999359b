//! Token builders for the generated binding.
//!
//! Every stub performs the same steps as `MethodBinding::invoke` through the
//! same `convert` functions: arity check and per-argument kind checks in
//! `call`, then down-conversion into a call arena, the native call, and
//! up-conversion in the typed stub.

use proc_macro2::{Ident, Span, TokenStream};
use quote::{format_ident, quote};

use natbind_core::{BindingPlan, CallShape, MethodPlan, NativeLayout, SemanticType};

use crate::names;
use crate::GenerateError;

fn managed_param(ty: SemanticType) -> TokenStream {
    match ty {
        SemanticType::Int32 => quote!(i32),
        SemanticType::Int64 => quote!(i64),
        SemanticType::NativeString => quote!(::core::option::Option<&str>),
        SemanticType::Handle => quote!(::core::option::Option<::natbind_runtime::Handle>),
        SemanticType::Void => quote!(()),
    }
}

fn managed_ret(ty: SemanticType) -> TokenStream {
    match ty {
        SemanticType::NativeString => {
            quote!(::core::option::Option<::std::string::String>)
        }
        other => managed_param(other),
    }
}

fn native_type(ty: SemanticType) -> TokenStream {
    match ty {
        SemanticType::Int32 => quote!(i32),
        SemanticType::Int64 => quote!(i64),
        SemanticType::NativeString => quote!(*const ::std::os::raw::c_char),
        SemanticType::Handle => quote!(*mut ::std::ffi::c_void),
        SemanticType::Void => quote!(()),
    }
}

fn extractor(ty: SemanticType) -> Ident {
    let name = match ty {
        SemanticType::Int32 => "arg_i32",
        SemanticType::Int64 => "arg_i64",
        SemanticType::NativeString => "arg_string",
        // Void never reaches parameter position; plans reject it.
        SemanticType::Handle | SemanticType::Void => "arg_handle",
    };
    Ident::new(name, Span::call_site())
}

fn down_convert(ty: SemanticType, arg: &Ident) -> TokenStream {
    match ty {
        SemanticType::NativeString => {
            quote!(::natbind_runtime::convert::down_string(&mut arena, #arg)?)
        }
        SemanticType::Handle => quote!(::natbind_runtime::convert::down_handle(#arg)),
        _ => quote!(#arg),
    }
}

fn up_convert(ty: SemanticType) -> TokenStream {
    match ty {
        SemanticType::NativeString => {
            quote!(unsafe { ::natbind_runtime::convert::up_string(ret) })
        }
        SemanticType::Handle => quote!(::natbind_runtime::convert::up_handle(ret)),
        _ => quote!(ret),
    }
}

fn layout(l: NativeLayout) -> TokenStream {
    match l {
        NativeLayout::Void => quote!(::natbind_runtime::NativeLayout::Void),
        NativeLayout::Int32 => quote!(::natbind_runtime::NativeLayout::Int32),
        NativeLayout::Int64 => quote!(::natbind_runtime::NativeLayout::Int64),
        NativeLayout::Pointer => quote!(::natbind_runtime::NativeLayout::Pointer),
    }
}

fn call_shape(shape: &CallShape) -> TokenStream {
    let ret = layout(shape.ret);
    let params = shape.params.iter().map(|p| layout(*p));
    quote!(::natbind_runtime::CallShape::new(#ret, &[#(#params),*]))
}

/// `name: (a, b) -> r` in canonical type spelling.
fn signature_doc(method: &MethodPlan) -> String {
    let params: Vec<&str> = method.params.iter().map(|p| p.name()).collect();
    format!(" `{}: ({}) -> {}`", method.symbol, params.join(", "), method.ret.name())
}

fn arg_idents(method: &MethodPlan) -> Vec<Ident> {
    (0..method.arity()).map(|i| format_ident!("a{}", i)).collect()
}

/// Resolved names for one method.
pub(crate) struct MethodNames {
    pub ident: Ident,
    pub const_ident: Ident,
}

pub(crate) fn method_names(plan: &BindingPlan) -> Result<Vec<MethodNames>, GenerateError> {
    let idents = plan
        .methods()
        .iter()
        .map(|m| names::method_ident(&m.symbol))
        .collect::<Result<Vec<_>, _>>()?;
    let consts = names::const_idents(plan.methods().iter().map(|m| m.symbol.as_str()))?;
    Ok(idents
        .into_iter()
        .zip(consts)
        .map(|(ident, const_ident)| MethodNames { ident, const_ident })
        .collect())
}

fn lints() -> TokenStream {
    quote! {
        #[allow(
            non_snake_case,
            non_camel_case_types,
            non_upper_case_globals,
            unused_mut,
            unused_variables,
            clippy::all
        )]
    }
}

// =============================================================================
// Bound struct
// =============================================================================

pub(crate) fn bound_struct(plan: &BindingPlan, ty: &Ident, names: &[MethodNames]) -> TokenStream {
    let lints = lints();
    let doc = format!(" Native bindings for `{}`.", plan.interface_name());
    let fields = names.iter().map(|n| &n.ident);
    quote! {
        #[doc = #doc]
        #lints
        pub struct #ty {
            #(#fields: ::natbind_runtime::EntryPoint,)*
        }
    }
}

// =============================================================================
// Inherent impl: constants, bind, typed stubs
// =============================================================================

fn stub(method: &MethodPlan, names: &MethodNames) -> TokenStream {
    let ident = &names.ident;
    let symbol = method.symbol.as_str();
    let doc = signature_doc(method);
    let args = arg_idents(method);
    let natives: Vec<Ident> = (0..method.arity()).map(|i| format_ident!("n{}", i)).collect();

    let params = args.iter().zip(&method.params).map(|(a, ty)| {
        let t = managed_param(*ty);
        quote!(#a: #t)
    });
    let downs = args
        .iter()
        .zip(&natives)
        .zip(&method.params)
        .map(|((a, n), ty)| {
            let conv = down_convert(*ty, a);
            quote!(let #n = #conv;)
        });
    let native_params = method.params.iter().map(|ty| native_type(*ty));
    let native_ret = match method.ret {
        SemanticType::Void => quote!(),
        other => {
            let t = native_type(other);
            quote!(-> #t)
        }
    };
    let ret_ty = managed_ret(method.ret);
    let up = up_convert(method.ret);

    quote! {
        #[doc = #doc]
        pub fn #ident(&self, #(#params),*) -> ::natbind_runtime::BindResult<#ret_ty> {
            let mut arena = ::natbind_runtime::CallArena::new();
            #(#downs)*
            let func = self.#ident.callable(#symbol)?;
            let func: unsafe extern "C" fn(#(#native_params),*) #native_ret =
                unsafe { ::core::mem::transmute(func) };
            let ret = unsafe { func(#(#natives),*) };
            // A returned string may point into the arena.
            let value = #up;
            drop(arena);
            Ok(value)
        }
    }
}

pub(crate) fn inherent_impl(plan: &BindingPlan, ty: &Ident, names: &[MethodNames]) -> TokenStream {
    let lints = lints();
    let methods = plan.methods();

    let consts = methods.iter().zip(names).map(|(m, n)| {
        let c = &n.const_ident;
        let index = m.id.index() as u32;
        let doc = format!(" Method id of `{}`.", m.symbol);
        quote! {
            #[doc = #doc]
            pub const #c: ::natbind_runtime::MethodId = ::natbind_runtime::MethodId::new(#index);
        }
    });
    let symbols = methods.iter().map(|m| m.symbol.as_str());
    let shapes = plan.call_shapes();
    let shapes = shapes.iter().map(call_shape);

    let fields = names.iter().map(|n| &n.ident);
    let field_symbols = methods.iter().map(|m| m.symbol.as_str());

    let stubs = methods.iter().zip(names).map(|(m, n)| stub(m, n));

    quote! {
        #lints
        impl #ty {
            #(#consts)*

            /// Method names in id order.
            pub const METHODS: &'static [&'static str] = &[#(#symbols),*];

            /// Every distinct call shape used by this interface, sorted.
            pub const CALL_SHAPES: &'static [::natbind_runtime::CallShape] = &[#(#shapes),*];

            /// Resolve every entry point now, in method-id order.
            pub fn bind(
                lookup: &dyn ::natbind_runtime::SymbolLookup,
            ) -> ::natbind_runtime::BindResult<Self> {
                Ok(Self {
                    #(#fields: ::natbind_runtime::resolve_symbol(lookup, #field_symbols)?,)*
                })
            }

            #(#stubs)*
        }
    }
}

// =============================================================================
// NativeInterface impl
// =============================================================================

pub(crate) fn interface_impl(plan: &BindingPlan, ty: &Ident, names: &[MethodNames]) -> TokenStream {
    let lints = lints();
    let methods = plan.methods();

    let by_name = methods.iter().zip(names).map(|(m, n)| {
        let symbol = m.symbol.as_str();
        let c = &n.const_ident;
        quote!(#symbol => Ok(Self::#c),)
    });

    let arms = methods.iter().zip(names).map(|(m, n)| {
        let index = m.id.index();
        let symbol = m.symbol.as_str();
        let arity = m.arity();
        let ident = &n.ident;
        let args = arg_idents(m);
        let extracts = args.iter().zip(&m.params).enumerate().map(|(i, (a, ty))| {
            let f = extractor(*ty);
            quote!(let #a = ::natbind_runtime::convert::#f(#symbol, args, #i)?;)
        });
        quote! {
            #index => {
                ::natbind_runtime::convert::check_arity(#symbol, #arity, args)?;
                #(#extracts)*
                self.#ident(#(#args),*).map(::natbind_runtime::Value::from)
            }
        }
    });

    quote! {
        #lints
        impl ::natbind_runtime::NativeInterface for #ty {
            fn method_id(&self, name: &str) -> ::natbind_runtime::BindResult<::natbind_runtime::MethodId> {
                match name {
                    #(#by_name)*
                    _ => Err(::natbind_runtime::BindError::UnknownMethod(name.to_string())),
                }
            }

            fn call(
                &self,
                id: ::natbind_runtime::MethodId,
                args: &[::natbind_runtime::Value],
            ) -> ::natbind_runtime::BindResult<::natbind_runtime::Value> {
                match id.index() {
                    #(#arms)*
                    _ => Err(::natbind_runtime::BindError::UnknownMethod(id.to_string())),
                }
            }
        }
    }
}

// =============================================================================
// Entry-point module
// =============================================================================

pub(crate) fn entry_module(
    plan: &BindingPlan,
    ty: &Ident,
    names: &[MethodNames],
    resolver: &syn::Expr,
) -> TokenStream {
    let lints = lints();
    let module = names::module_ident(plan.interface_name());
    let doc = format!(
        " Process-wide `{}` binding, resolved on first use.",
        plan.interface_name()
    );

    let functions = plan.methods().iter().zip(names).map(|(m, n)| {
        let ident = &n.ident;
        let doc = signature_doc(m);
        let args = arg_idents(m);
        let params = args.iter().zip(&m.params).map(|(a, t)| {
            let t = managed_param(*t);
            quote!(#a: #t)
        });
        let ret_ty = managed_ret(m.ret);
        quote! {
            #[doc = #doc]
            pub fn #ident(#(#params),*) -> ::natbind_runtime::BindResult<#ret_ty> {
                binding()?.#ident(#(#args),*)
            }
        }
    });

    quote! {
        #[doc = #doc]
        #lints
        pub mod #module {
            struct __Loaded {
                _library: ::std::sync::Arc<dyn ::natbind_runtime::SymbolLookup>,
                binding: super::#ty,
            }

            static __BINDING: ::natbind_runtime::__private::OnceCell<
                ::natbind_runtime::BindResult<__Loaded>,
            > = ::natbind_runtime::__private::OnceCell::new();

            fn __init() -> ::natbind_runtime::BindResult<__Loaded> {
                let library: ::std::sync::Arc<dyn ::natbind_runtime::SymbolLookup> = (#resolver)?;
                let binding = super::#ty::bind(&*library)?;
                Ok(__Loaded {
                    _library: library,
                    binding,
                })
            }

            /// The bound interface. A failed bind is returned to every caller.
            pub fn binding() -> ::natbind_runtime::BindResult<&'static super::#ty> {
                match __BINDING.get_or_init(__init) {
                    Ok(loaded) => Ok(&loaded.binding),
                    Err(e) => Err(e.clone()),
                }
            }

            #(#functions)*
        }
    }
}
