use std::collections::{HashMap, HashSet};

use cvsurface::catalog::parse_literal;
use cvsurface::{export_grouped, resolve, BindingSurface, CaseStyle, Catalog, NamingRule, NativeOrigin, Radix};
use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use syn::{parse::Parse, parse::ParseStream, Ident, LitStr, Result, Token};

/// Declare a renamed binding surface inline.
///
/// ```ignore
/// cvsurface_macros::binding_surface! {
///     prefix_strip = "CV_",
///     prefix_add = "Cv",
///     origin = "cvaux.h",
///     types(ImgObsInfo, EHMMState),
///     constants Event(CV_EVENT_MOUSEMOVE = 0, CV_EVENT_LBUTTONDOWN = 1),
/// }
/// ```
///
/// Expands to one zero-sized `#[repr(C)]` struct per type and one `pub const`
/// per constant, named by the naming rule. Collisions and unusable names are
/// reported as compile errors on the offending native name.
///
/// Options:
/// - `prefix_strip = <LitStr>`, `prefix_add = <LitStr>`: optional, default empty.
/// - `case = "preserve" | "upper" | "lower"`: optional, defaults to `preserve`.
/// - `origin = <LitStr>`: the origin recorded for the `types(...)` that follow.
/// - `types(...)`: native structure names.
/// - `constants <Group>(NAME = <int>, ...)`: one enumeration group.
#[proc_macro]
pub fn binding_surface(input: TokenStream) -> TokenStream {
    match expand(input.into()) {
        Ok(ts) => ts.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

struct NativeType {
    name: Ident,
    origin: String,
}

struct NativeValue {
    group: Ident,
    name: Ident,
    value: i64,
    radix: Radix,
}

struct SurfaceInput {
    rule: NamingRule,
    types: Vec<NativeType>,
    constants: Vec<NativeValue>,
}

impl Parse for SurfaceInput {
    fn parse(input: ParseStream<'_>) -> Result<Self> {
        let mut rule = NamingRule::new();
        let mut origin = String::new();
        let mut types = Vec::new();
        let mut constants = Vec::new();

        while !input.is_empty() {
            let key: Ident = input.parse()?;

            if input.peek(Token![=]) {
                input.parse::<Token![=]>()?;
                let value: LitStr = input.parse()?;
                if key == "prefix_strip" {
                    rule = rule.with_prefix_strip(value.value());
                } else if key == "prefix_add" {
                    rule = rule.with_prefix_add(value.value());
                } else if key == "case" {
                    let style: CaseStyle = value.value().parse().map_err(|e: String| syn::Error::new_spanned(&value, e))?;
                    rule = rule.with_case_style(style);
                } else if key == "origin" {
                    origin = value.value();
                } else {
                    return Err(syn::Error::new_spanned(
                        key,
                        "unknown argument; expected `prefix_strip`, `prefix_add`, `case`, or `origin`",
                    ));
                }
            } else if key == "types" && input.peek(syn::token::Paren) {
                let content;
                syn::parenthesized!(content in input);
                let names = content.parse_terminated(Ident::parse, Token![,])?;
                types.extend(names.into_iter().map(|name| NativeType { name, origin: origin.clone() }));
            } else if key == "constants" {
                let group: Ident = input.parse()?;
                let content;
                syn::parenthesized!(content in input);
                while !content.is_empty() {
                    let name: Ident = content.parse()?;
                    content.parse::<Token![=]>()?;
                    let negative = content.parse::<Option<Token![-]>>()?.is_some();
                    let lit: syn::LitInt = content.parse()?;
                    // Suffixes and `_` separators are gone from `base10_digits`.
                    let digits = lit.base10_digits();
                    let text = if negative { format!("-{digits}") } else { digits.to_string() };
                    let (value, _) = parse_literal(&text)
                        .ok_or_else(|| syn::Error::new_spanned(&lit, "expected an integer that fits in i64"))?;
                    let repr = lit.to_string();
                    let radix = if repr.starts_with("0x") || repr.starts_with("0X") { Radix::Hex } else { Radix::Decimal };
                    constants.push(NativeValue { group: group.clone(), name, value, radix });
                    if content.peek(Token![,]) {
                        content.parse::<Token![,]>()?;
                    }
                }
            } else {
                return Err(syn::Error::new_spanned(key, "expected `key = \"...\"`, `types(...)`, or `constants Group(...)`"));
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(Self { rule, types, constants })
    }
}

/// Parse, resolve and generate. Split from the macro entry point so it can be
/// driven with `proc_macro2` tokens.
fn expand(input: TokenStream2) -> Result<TokenStream2> {
    let input: SurfaceInput = syn::parse2(input)?;

    let mut spans: HashMap<NativeOrigin, Span> = HashMap::new();
    let mut builder = Catalog::builder();
    for ty in &input.types {
        let name = ty.name.to_string();
        spans.insert(NativeOrigin::Type { name: name.clone(), origin: ty.origin.clone() }, ty.name.span());
        builder.add_type(name, ty.origin.as_str());
    }
    for constant in &input.constants {
        let (group, name) = (constant.group.to_string(), constant.name.to_string());
        spans.insert(NativeOrigin::Constant { name: name.clone(), group: group.clone() }, constant.name.span());
        builder.add_constant_with_radix(group, name, constant.value, constant.radix);
    }

    let repeated = repeated_constant(&input.constants).map(Ident::span);

    let span_of = |origin: &NativeOrigin| spans.get(origin).copied().unwrap_or_else(Span::call_site);
    let to_syn = |err: cvsurface::Error| {
        let span = match &err {
            cvsurface::Error::AliasCollision { second, .. } => span_of(second),
            cvsurface::Error::InvalidTarget { native, .. } => span_of(native),
            cvsurface::Error::MalformedSource { .. } => repeated.unwrap_or_else(Span::call_site),
            _ => Span::call_site(),
        };
        syn::Error::new(span, err.to_string())
    };

    let catalog = builder.build().map_err(to_syn)?;
    let surface = resolve(&catalog, &input.rule).map_err(to_syn)?;
    if surface.is_empty() {
        return Err(to_syn(cvsurface::Error::EmptySurface));
    }
    generate(&surface).map_err(to_syn)
}

/// The second occurrence of a constant repeated within its group, the only
/// way macro input can be malformed.
fn repeated_constant(constants: &[NativeValue]) -> Option<&Ident> {
    let mut seen = HashSet::new();
    constants
        .iter()
        .find(|c| !seen.insert((c.group.to_string(), c.name.to_string())))
        .map(|c| &c.name)
}

fn rust_ident(target: &str, surface: &BindingSurface) -> cvsurface::Result<Ident> {
    syn::parse_str::<Ident>(target).map_err(|_| cvsurface::Error::InvalidTarget {
        target: target.to_string(),
        native: match surface.get(target) {
            Some(entry) => entry.source.native_origin(),
            None => NativeOrigin::Type { name: target.to_string(), origin: String::new() },
        },
        reason: "reserved Rust keyword".to_string(),
    })
}

fn generate(surface: &BindingSurface) -> cvsurface::Result<TokenStream2> {
    let mut structs = Vec::new();
    for (target, symbol) in surface.types() {
        let ident = rust_ident(target, surface)?;
        let doc = format!("Opaque handle for native `{}`.", symbol.name);
        structs.push(quote! {
            #[doc = #doc]
            #[repr(C)]
            #[allow(non_camel_case_types)]
            pub struct #ident {
                _opaque: [u8; 0],
                _marker: ::core::marker::PhantomData<(*mut u8, ::core::marker::PhantomPinned)>,
            }
        });
    }

    let mut consts = Vec::new();
    for group in export_grouped(surface) {
        let ty = if group.fits_i32() { format_ident!("i32") } else { format_ident!("i64") };
        for constant in &group.constants {
            let ident = rust_ident(&constant.target, surface)?;
            let value = value_tokens(constant.value, constant.radix);
            consts.push(quote! {
                #[allow(non_upper_case_globals)]
                pub const #ident: #ty = #value;
            });
        }
    }

    Ok(quote! {
        #(#structs)*
        #(#consts)*
    })
}

fn value_tokens(value: i64, radix: Radix) -> TokenStream2 {
    let magnitude = value.unsigned_abs();
    let lit = match radix {
        Radix::Hex if value >= 0 => syn::LitInt::new(&format!("0x{magnitude:X}"), Span::call_site()).token(),
        _ => proc_macro2::Literal::u64_unsuffixed(magnitude),
    };
    if value < 0 { quote!(-#lit) } else { quote!(#lit) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand_str(tokens: TokenStream2) -> std::result::Result<String, String> {
        expand(tokens).map(|ts| ts.to_string()).map_err(|e| e.to_string())
    }

    #[test]
    fn renames_types_and_constants() {
        let out = expand_str(quote! {
            prefix_strip = "CV_",
            prefix_add = "Cv",
            origin = "cvaux.h",
            types(ImgObsInfo, EHMMState),
            constants Event(CV_EVENT_MOUSEMOVE = 0, CV_EVENT_LBUTTONDOWN = 1),
        })
        .unwrap();
        assert!(out.contains("pub struct CvImgObsInfo"));
        assert!(out.contains("pub struct CvEHMMState"));
        assert!(out.contains("pub const CvEVENT_MOUSEMOVE : i32 = 0"));
        assert!(out.contains("pub const CvEVENT_LBUTTONDOWN : i32 = 1"));
    }

    #[test]
    fn output_parses_as_items() {
        let out = expand(quote! {
            prefix_add = "Cv",
            types(Set),
            constants LoadImage(CV_LOAD_IMAGE_UNCHANGED = -1, CV_BIG = 0x100000000),
        })
        .unwrap();
        let file: syn::File = syn::parse2(out).unwrap();
        assert_eq!(file.items.len(), 3);
    }

    #[test]
    fn wide_groups_use_i64() {
        let out = expand_str(quote! {
            constants Wide(SMALL = 1, BIG = 0x100000000),
        })
        .unwrap();
        assert!(out.contains("pub const SMALL : i64 = 1"));
        assert!(out.contains("0x100000000"));
    }

    #[test]
    fn collision_names_both_entries() {
        let err = expand_str(quote! {
            prefix_add = "Cv",
            origin = "cxtypes.h",
            types(Set),
            constants Misc(Set = 3),
        })
        .unwrap_err();
        assert!(err.contains("alias collision on `CvSet`"), "{err}");
        assert!(err.contains("type `Set` (cxtypes.h)"), "{err}");
        assert!(err.contains("constant `Set` in group `Misc`"), "{err}");
    }

    #[test]
    fn same_type_in_two_origins_collides() {
        let err = expand_str(quote! {
            origin = "cxtypes.h",
            types(Set),
            origin = "cvaux.h",
            types(Set),
        })
        .unwrap_err();
        assert!(err.contains("alias collision on `Set`"), "{err}");
    }

    #[test]
    fn keyword_targets_are_rejected() {
        let err = expand_str(quote! {
            case = "lower",
            types(Type),
        })
        .unwrap_err();
        assert!(err.contains("invalid target identifier `type`"), "{err}");
    }

    #[test]
    fn empty_surface_is_an_error() {
        let err = expand_str(quote! { prefix_add = "Cv" }).unwrap_err();
        assert!(err.contains("empty binding surface"), "{err}");
    }

    #[test]
    fn unknown_keys_and_case_styles_are_rejected() {
        let err = expand_str(quote! { prefix = "Cv", types(A) }).unwrap_err();
        assert!(err.contains("unknown argument"), "{err}");
        let err = expand_str(quote! { case = "camel", types(A) }).unwrap_err();
        assert!(err.contains("unknown case style"), "{err}");
    }

    #[test]
    fn duplicate_constants_are_malformed() {
        let err = expand_str(quote! { constants Event(A = 1, A = 2) }).unwrap_err();
        assert!(err.contains("malformed source"), "{err}");
    }

    #[test]
    fn repeated_constant_is_the_second_occurrence() {
        let input: SurfaceInput = syn::parse2(quote! {
            constants Event(A = 1, B = 2),
            constants Other(A = 3),
            constants Event(A = 4),
        })
        .unwrap();
        let found = repeated_constant(&input.constants).unwrap();
        assert!(std::ptr::eq(found, &input.constants[3].name));

        let input: SurfaceInput = syn::parse2(quote! { constants Event(A = 1), constants Other(A = 1) }).unwrap();
        assert!(repeated_constant(&input.constants).is_none());
    }

    #[test]
    fn suffixes_and_separators_are_accepted() {
        let out = expand_str(quote! {
            constants Sizes(SMALL = 5i32, BIG = 1_000, NEG = -2_147_483_648i64, MASK = 0xFF_u32),
        })
        .unwrap();
        assert!(out.contains("pub const SMALL : i32 = 5"), "{out}");
        assert!(out.contains("pub const BIG : i32 = 1000"), "{out}");
        assert!(out.contains("pub const NEG : i32 = - 2147483648"), "{out}");
        assert!(out.contains("pub const MASK : i32 = 0xFF"), "{out}");
    }
}
