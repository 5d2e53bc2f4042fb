use std::collections::{HashMap, HashSet};

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::ext::IdentExt;
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::{braced, token, Error, Ident, LitStr, Result, Token, Visibility};

use proc_macro_crate::{crate_name, FoundCrate};

const SEPARATOR: char = '.';

/// Path keywords that cannot name a module even as raw identifiers.
const FORBIDDEN: &[&str] = &["self", "super", "crate", "Self", "_"];

/// Keywords that are valid segments but need `r#` as module names.
const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized",
    "use", "virtual", "where", "while", "yield",
];

const SCALAR_KINDS: &[(&str, &str)] = &[
    ("any", "Any"),
    ("bigint", "BigInt"),
    ("boolean", "Boolean"),
    ("date", "Date"),
    ("enum", "Enum"),
    ("integer", "Integer"),
    ("number", "Number"),
    ("string", "String"),
    ("tag", "Tag"),
    ("url", "Url"),
];

const ELEMENT_KINDS: &[(&str, &str)] = &[
    ("booleans", "Boolean"),
    ("dates", "Date"),
    ("integers", "Integer"),
    ("maps", "Map"),
    ("numbers", "Number"),
    ("strings", "String"),
    ("tags", "Tag"),
    ("urls", "Url"),
];

// =============================================================================
// Input model
// =============================================================================

/// One path segment, keyword or not.
#[derive(Clone)]
struct Segment {
    name: String,
    span: Span,
}

impl Segment {
    /// Module identifier for this segment, raw when it is a keyword.
    fn ident(&self) -> Ident {
        if KEYWORDS.contains(&self.name.as_str()) {
            Ident::new_raw(&self.name, self.span)
        } else {
            Ident::new(&self.name, self.span)
        }
    }
}

impl Parse for Segment {
    fn parse(input: ParseStream) -> Result<Self> {
        let ident = Ident::parse_any(input)?;
        let name = ident.unraw().to_string();
        check_segment(&name, ident.span())?;
        Ok(Self {
            name,
            span: ident.span(),
        })
    }
}

fn check_segment(name: &str, span: Span) -> Result<()> {
    if FORBIDDEN.contains(&name) {
        return Err(Error::new(
            span,
            format!("`{name}` cannot be used as a tag segment"),
        ));
    }
    let mut chars = name.chars();
    let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    if !starts_with_letter || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::new(
            span,
            format!("invalid tag segment `{name}`: expected an ASCII letter followed by letters, digits or `_`"),
        ));
    }
    Ok(())
}

/// A dotted path inside `#[is(..)]`: `blockchain.db.leaf` or `"blockchain.db.leaf"`.
#[derive(Clone)]
struct PathRef {
    path: String,
    span: Span,
}

impl Parse for PathRef {
    fn parse(input: ParseStream) -> Result<Self> {
        if input.peek(LitStr) {
            let lit: LitStr = input.parse()?;
            let path = lit.value();
            if path.is_empty() {
                return Err(Error::new(lit.span(), "empty tag path"));
            }
            for segment in path.split(SEPARATOR) {
                check_segment(segment, lit.span())?;
            }
            return Ok(Self {
                path,
                span: lit.span(),
            });
        }

        let first: Segment = input.parse()?;
        let span = first.span;
        let mut path = first.name;
        while input.peek(Token![.]) {
            input.parse::<Token![.]>()?;
            let next: Segment = input.parse()?;
            path.push(SEPARATOR);
            path.push_str(&next.name);
        }
        Ok(Self { path, span })
    }
}

/// Validated leaf kind name, e.g. `"boolean"` or `"array.of.tags"`.
#[derive(Clone, Copy)]
struct LeafKindSpec {
    variant: &'static str,
    element: Option<&'static str>,
}

impl LeafKindSpec {
    fn from_name(name: &str) -> Option<Self> {
        if let Some(plural) = name.strip_prefix("array.of.") {
            return ELEMENT_KINDS
                .iter()
                .find(|(n, _)| *n == plural)
                .map(|&(_, element)| Self {
                    variant: "ArrayOf",
                    element: Some(element),
                });
        }
        SCALAR_KINDS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|&(_, variant)| Self {
                variant,
                element: None,
            })
    }

    fn tokens(&self, tt: &TokenStream2) -> TokenStream2 {
        let variant = Ident::new(self.variant, Span::call_site());
        match self.element {
            Some(element) => {
                let element = Ident::new(element, Span::call_site());
                quote!(#tt::LeafKind::#variant(#tt::ElementKind::#element))
            }
            None => quote!(#tt::LeafKind::#variant),
        }
    }
}

/// Deprecation attribute: #[deprecated(note = "...")]
#[derive(Clone, Default)]
struct DeprecationAttr {
    is_deprecated: bool,
    note: Option<String>,
}

#[derive(Clone, Default)]
struct NodeAttrs {
    /// Doc comments, passed through to the generated module.
    docs: Vec<LitStr>,
    /// `#[is(a.b, c.d)]`
    supertypes: Vec<PathRef>,
    /// `#[leaf]` → `Some(None)`, `#[leaf = "kind"]` → `Some(Some(kind))`
    leaf: Option<Option<LeafKindSpec>>,
    deprecation: DeprecationAttr,
}

struct Node {
    name: Segment,
    attrs: NodeAttrs,
    children: Vec<Node>,
}

struct TaxonomyInput {
    vis: Visibility,
    root: Ident,
    nodes: Vec<Node>,
}

impl Parse for TaxonomyInput {
    fn parse(input: ParseStream) -> Result<Self> {
        let vis: Visibility = input.parse()?;
        input.parse::<Token![mod]>()?;
        let root: Ident = input.parse()?;
        let content;
        braced!(content in input);
        let nodes = parse_nodes(&content)?;
        Ok(Self { vis, root, nodes })
    }
}

fn parse_nodes(input: ParseStream) -> Result<Vec<Node>> {
    let mut nodes = Vec::new();
    while !input.is_empty() {
        let attrs = parse_all_attrs(input)?;
        let name: Segment = input.parse()?;

        let children = if input.peek(token::Brace) {
            let content;
            braced!(content in input);
            parse_nodes(&content)?
        } else {
            input.parse::<Token![;]>()?;
            Vec::new()
        };

        if attrs.leaf.is_some() && !children.is_empty() {
            return Err(Error::new(
                name.span,
                format!("leaf tag `{}` cannot have children", name.name),
            ));
        }

        nodes.push(Node {
            name,
            attrs,
            children,
        });
    }
    Ok(nodes)
}

/// Parse all attributes into NodeAttrs.
///
/// Handles:
/// - `#[is(path, ...)]`
/// - `#[leaf]` or `#[leaf = "kind"]`
/// - `#[deprecated]` or `#[deprecated(note = "...")]`
/// - doc comments
fn parse_all_attrs(input: ParseStream) -> Result<NodeAttrs> {
    let mut result = NodeAttrs::default();

    while input.peek(Token![#]) {
        input.parse::<Token![#]>()?;
        let content;
        syn::bracketed!(content in input);

        let key = Ident::parse_any(&content)?;

        if key == "doc" {
            content.parse::<Token![=]>()?;
            result.docs.push(content.parse()?);
        } else if key == "is" {
            let inner;
            syn::parenthesized!(inner in content);
            let paths = Punctuated::<PathRef, Token![,]>::parse_terminated(&inner)?;
            result.supertypes.extend(paths);
        } else if key == "leaf" {
            let kind = if content.peek(Token![=]) {
                content.parse::<Token![=]>()?;
                let name: LitStr = content.parse()?;
                let spec = LeafKindSpec::from_name(&name.value()).ok_or_else(|| {
                    Error::new(
                        name.span(),
                        format!("unknown leaf kind `{}`", name.value()),
                    )
                })?;
                Some(spec)
            } else {
                None
            };
            result.leaf = Some(kind);
        } else if key == "deprecated" {
            result.deprecation.is_deprecated = true;

            if content.peek(token::Paren) {
                let inner;
                syn::parenthesized!(inner in content);

                if !inner.is_empty() {
                    let note_key: Ident = inner.parse()?;
                    if note_key != "note" {
                        return Err(Error::new(note_key.span(), "expected `note = \"...\"`"));
                    }
                    inner.parse::<Token![=]>()?;
                    let note_value: LitStr = inner.parse()?;
                    result.deprecation.note = Some(note_value.value());
                }
            }
        } else {
            return Err(Error::new(
                key.span(),
                format!("unknown attribute `{key}`; expected `is`, `leaf` or `deprecated`"),
            ));
        }

        if !content.is_empty() {
            return Err(content.error("unexpected tokens in attribute"));
        }
    }

    Ok(result)
}

// =============================================================================
// Tree analysis (runs at macro expansion time)
// =============================================================================

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_owned()
    } else {
        format!("{prefix}{SEPARATOR}{name}")
    }
}

/// Same function as the runtime `fingerprint`.
fn fingerprint(path: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for &byte in path.as_bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Flattened node with its full path.
struct FlatNode<'a> {
    path: String,
    node: &'a Node,
}

fn flatten_nodes<'a>(nodes: &'a [Node], prefix: &str, out: &mut Vec<FlatNode<'a>>) {
    for node in nodes {
        let path = join(prefix, &node.name.name);
        out.push(FlatNode {
            path: path.clone(),
            node,
        });
        flatten_nodes(&node.children, &path, out);
    }
}

/// Reject duplicates, unknown supertypes and fingerprint collisions.
///
/// Cycles are left to the registry build, which reports the full chain.
fn validate(flat: &[FlatNode<'_>]) -> Result<()> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(flat.len());
    let mut ids: HashMap<u64, &str> = HashMap::with_capacity(flat.len());

    for entry in flat {
        if !seen.insert(&entry.path) {
            return Err(Error::new(
                entry.node.name.span,
                format!("tag `{}` is declared twice", entry.path),
            ));
        }
        if let Some(first) = ids.insert(fingerprint(&entry.path), &entry.path) {
            return Err(Error::new(
                entry.node.name.span,
                format!("fingerprint collision between `{first}` and `{}`", entry.path),
            ));
        }
    }

    for entry in flat {
        for supertype in &entry.node.attrs.supertypes {
            if !seen.contains(supertype.path.as_str()) {
                return Err(Error::new(
                    supertype.span,
                    format!(
                        "tag `{}` declares unknown supertype `{}`",
                        entry.path, supertype.path
                    ),
                ));
            }
        }
    }
    Ok(())
}

// =============================================================================
// Crate path resolution
// =============================================================================

fn taxonomy_crate_path() -> TokenStream2 {
    match crate_name("tag-taxonomy") {
        Ok(FoundCrate::Itself) => quote!(::tag_taxonomy),
        Ok(FoundCrate::Name(name)) => {
            let ident = Ident::new(&name, Span::call_site());
            quote!(::#ident)
        }
        Err(_) => quote!(::tag_taxonomy),
    }
}

// =============================================================================
// Code generation
// =============================================================================

fn deprecation_tokens(deprecation: &DeprecationAttr) -> TokenStream2 {
    match (deprecation.is_deprecated, &deprecation.note) {
        (false, _) => quote! {},
        (true, Some(note)) => quote! { #[deprecated(note = #note)] },
        (true, None) => quote! { #[deprecated] },
    }
}

/// Recursively generate one module per node.
///
/// ```ignore
/// taxonomy! {
///     pub mod tags {
///         blockchain {
///             db { leaf; type { #[is(blockchain.db.leaf)] #[leaf = "boolean"] boolean; } }
///         }
///     }
/// }
///
/// // Generates:
/// pub mod tags {
///     pub const NODE_COUNT: usize = 5;
///     pub const DEFINITIONS: &[TagDef] = &[ ... ];
///
///     pub mod blockchain {
///         pub const PATH: &str = "blockchain";
///         pub const ID: TagId = fingerprint(PATH);
///         pub const DEPTH: usize = 0;
///         pub fn resolve(registry: &Registry) -> Result<Tag<'_>, LookupError> { ... }
///
///         pub mod db {
///             pub mod r#type {
///                 pub mod boolean { ... }
///             }
///         }
///     }
/// }
///
/// // Usage:
/// tags::blockchain::db::r#type::boolean::PATH
/// tags::blockchain::db::r#type::boolean::resolve(&registry)?
/// ```
fn generate_tags_recursive(
    nodes: &[Node],
    prefix: &str,
    depth: usize,
    tt: &TokenStream2,
) -> Vec<TokenStream2> {
    let mut output = Vec::new();

    for node in nodes {
        let node_ident = node.name.ident();
        let path = join(prefix, &node.name.name);
        let path_lit = LitStr::new(&path, Span::call_site());

        let docs = &node.attrs.docs;
        let deprecation_attr = deprecation_tokens(&node.attrs.deprecation);

        let supertypes: Vec<LitStr> = node
            .attrs
            .supertypes
            .iter()
            .map(|s| LitStr::new(&s.path, Span::call_site()))
            .collect();

        let is_leaf = node.attrs.leaf.is_some();
        let leaf_kind = match node.attrs.leaf.flatten() {
            Some(kind) => {
                let kind = kind.tokens(tt);
                quote!(::core::option::Option::Some(#kind))
            }
            None => quote!(::core::option::Option::None),
        };

        let children_output = generate_tags_recursive(&node.children, &path, depth + 1, tt);

        output.push(quote! {
            #(#[doc = #docs])*
            #deprecation_attr
            pub mod #node_ident {
                /// Canonical dotted path.
                pub const PATH: &str = #path_lit;

                /// Path fingerprint, computed at compile time.
                pub const ID: #tt::TagId = #tt::fingerprint(PATH);

                /// Depth in the tree (0 = root).
                pub const DEPTH: usize = #depth;

                /// Declared direct supertypes.
                pub const SUPERTYPES: &[&str] = &[#(#supertypes),*];

                pub const IS_LEAF: bool = #is_leaf;

                pub const LEAF_KIND: ::core::option::Option<#tt::LeafKind> = #leaf_kind;

                /// Resolve this tag in `registry`.
                #[inline]
                pub fn resolve(
                    registry: &#tt::Registry,
                ) -> ::core::result::Result<#tt::Tag<'_>, #tt::LookupError> {
                    registry.resolve(PATH)
                }

                #(#children_output)*
            }
        });
    }

    output
}

/// Generate `TagDef` entries in declaration order.
fn collect_defs(flat: &[FlatNode<'_>], tt: &TokenStream2) -> Vec<TokenStream2> {
    flat.iter()
        .map(|entry| {
            let path_lit = LitStr::new(&entry.path, Span::call_site());
            let supertypes: Vec<LitStr> = entry
                .node
                .attrs
                .supertypes
                .iter()
                .map(|s| LitStr::new(&s.path, Span::call_site()))
                .collect();
            let leaf = match entry.node.attrs.leaf {
                Some(Some(kind)) => {
                    let kind = kind.tokens(tt);
                    quote!(.with_leaf_kind(#kind))
                }
                Some(None) => quote!(.leaf()),
                None => quote!(),
            };
            quote! {
                #tt::TagDef::new(#path_lit).with_supertypes(&[#(#supertypes),*])#leaf
            }
        })
        .collect()
}

fn expand(input: TaxonomyInput, tt: &TokenStream2) -> Result<TokenStream2> {
    // 1. Flatten and validate
    let mut flat = Vec::new();
    flatten_nodes(&input.nodes, "", &mut flat);
    validate(&flat)?;

    // 2. Per-node modules
    let tags = generate_tags_recursive(&input.nodes, "", 0, tt);

    // 3. Flat definition table
    let defs = collect_defs(&flat, tt);
    let node_count = flat.len();

    // 4. Assemble
    let vis = input.vis;
    let root = input.root;

    Ok(quote! {
        #[allow(non_snake_case)]
        #vis mod #root {
            /// Total number of tags.
            pub const NODE_COUNT: usize = #node_count;

            /// Flat definition table, parents before children.
            pub const DEFINITIONS: &[#tt::TagDef] = &[
                #(#defs),*
            ];

            #(#tags)*
        }
    })
}

// =============================================================================
// Entry point
// =============================================================================

/// Declare a tag taxonomy as nested modules plus a static definition table.
///
/// ```ignore
/// taxonomy! {
///     pub mod tags {
///         blockchain {
///             db {
///                 leaf;
///                 type { #[is(blockchain.db.leaf)] #[leaf = "boolean"] boolean; }
///             }
///             ux { KYC; }
///         }
///     }
/// }
/// ```
///
/// Segments may be Rust keywords (`type`, `in`, `for`); they become raw
/// identifiers. Attributes:
/// - `#[is(a.b, c.d)]` declares direct supertypes
/// - `#[leaf]` / `#[leaf = "boolean"]` marks a terminal tag
/// - `#[deprecated]` / `#[deprecated(note = "...")]`
#[proc_macro]
pub fn taxonomy(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as TaxonomyInput);
    let tt = taxonomy_crate_path();
    match expand(input, &tt) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand_str(src: &str) -> Result<String> {
        let input: TaxonomyInput = syn::parse_str(src)?;
        expand(input, &quote!(::tag_taxonomy)).map(|tokens| tokens.to_string())
    }

    fn error_of(src: &str) -> String {
        match expand_str(src) {
            Ok(_) => panic!("expected an error for {src}"),
            Err(err) => err.to_string(),
        }
    }

    /// Same-named children under different parents get distinct paths.
    #[test]
    fn test_same_name_different_parents_no_conflict() {
        let code = expand_str(
            "pub mod tags {
                blockchain {
                    app { configuration; }
                    session { configuration; }
                }
            }",
        )
        .unwrap();

        assert!(code.contains("pub mod app"));
        assert!(code.contains("pub mod session"));
        assert!(code.contains("\"blockchain.app.configuration\""));
        assert!(code.contains("\"blockchain.session.configuration\""));
        assert!(code.contains("NODE_COUNT : usize = 5usize"));
        assert!(!code.contains("pub use"));
    }

    #[test]
    fn test_keyword_segments_become_raw_idents() {
        let code = expand_str(
            "pub mod tags {
                blockchain { db { type { boolean; } } ux { payment { method { in; for; } } } }
            }",
        )
        .unwrap();

        assert!(code.contains("pub mod r#type"));
        assert!(code.contains("pub mod r#in"));
        assert!(code.contains("pub mod r#for"));
        assert!(code.contains("\"blockchain.db.type.boolean\""));
        assert!(code.contains("\"blockchain.ux.payment.method.in\""));
    }

    #[test]
    fn test_supertypes_and_leaf_kinds_reach_definitions() {
        let code = expand_str(
            r#"pub mod tags {
                blockchain {
                    db {
                        leaf;
                        type { #[is(blockchain.db.leaf)] #[leaf = "boolean"] boolean; }
                        array { #[is("blockchain.db.leaf")] #[leaf = "array.of.tags"] tags; }
                    }
                    #[leaf] flag;
                }
            }"#,
        )
        .unwrap();

        assert!(code.contains("with_supertypes (& [\"blockchain.db.leaf\"])"));
        assert!(code.contains("with_leaf_kind (:: tag_taxonomy :: LeafKind :: Boolean)"));
        assert!(code.contains(
            "LeafKind :: ArrayOf (:: tag_taxonomy :: ElementKind :: Tag)"
        ));
        assert!(code.contains(". leaf ()"));
    }

    #[test]
    fn test_deprecation_is_forwarded() {
        let code = expand_str(
            r#"pub mod tags {
                blockchain { #[deprecated(note = "use blockchain.ux")] old; #[deprecated] older; }
            }"#,
        )
        .unwrap();
        assert!(code.contains("deprecated (note = \"use blockchain.ux\")"));
        assert!(code.contains("# [deprecated] pub mod older"));
    }

    #[test]
    fn test_uppercase_and_underscore_segments() {
        let code = expand_str("pub mod tags { blockchain { ux { KYC; } app { deep_link; } } }")
            .unwrap();
        assert!(code.contains("pub mod KYC"));
        assert!(code.contains("\"blockchain.app.deep_link\""));
    }

    #[test]
    fn test_rejects_path_keywords() {
        for word in ["self", "super", "crate", "Self", "_"] {
            let src = format!("pub mod tags {{ blockchain {{ {word}; }} }}");
            assert!(expand_str(&src).is_err(), "`{word}` accepted");
        }
    }

    #[test]
    fn test_rejects_leaf_with_children() {
        let err = error_of("pub mod tags { blockchain { #[leaf] db { leaf; } } }");
        assert!(err.contains("cannot have children"), "{err}");
    }

    #[test]
    fn test_rejects_unknown_leaf_kind() {
        let err = error_of(r#"pub mod tags { blockchain { #[leaf = "widget"] x; } }"#);
        assert!(err.contains("unknown leaf kind `widget`"), "{err}");
    }

    #[test]
    fn test_rejects_unknown_supertype() {
        let err = error_of("pub mod tags { blockchain { #[is(blockchain.nope)] x; } }");
        assert!(err.contains("unknown supertype `blockchain.nope`"), "{err}");
    }

    #[test]
    fn test_rejects_duplicate_siblings() {
        let err = error_of("pub mod tags { blockchain { app; app; } }");
        assert!(err.contains("declared twice"), "{err}");
    }

    #[test]
    fn test_rejects_unknown_attribute() {
        let err = error_of("pub mod tags { blockchain { #[redirect = \"x\"] y; } }");
        assert!(err.contains("unknown attribute `redirect`"), "{err}");
    }

    #[test]
    fn test_fingerprint_matches_reference_vector() {
        assert_eq!(fingerprint("a"), 0xaf63dc4c8601ec8c);
    }
}
