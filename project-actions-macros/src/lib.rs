//! Procedural macros for project-actions

use darling::{FromDeriveInput, FromVariant};
use proc_macro::TokenStream;
use proc_macro2::Ident;
use quote::{format_ident, quote};
use std::collections::{BTreeMap, HashSet};
use syn::{parse_macro_input, DeriveInput};

/// Container-level attributes for #[derive(Action)]
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(action), supports(enum_any))]
struct ActionOpts {
    ident: syn::Ident,
    data: darling::ast::Data<ActionVariant, ()>,

    /// Group variants by operation (outcome suffix stripped)
    #[darling(default)]
    infer_categories: bool,

    /// Naming convention for the generated action names
    #[darling(default)]
    rename_all: Option<String>,
}

/// Variant-level attributes
#[derive(Debug, FromVariant)]
#[darling(attributes(action))]
struct ActionVariant {
    ident: syn::Ident,
    fields: darling::ast::Fields<()>,

    /// Explicit action name
    #[darling(default)]
    rename: Option<String>,

    /// Explicit category override
    #[darling(default)]
    category: Option<String>,

    /// Exclude from category inference
    #[darling(default)]
    skip_category: bool,
}

/// Trailing words that mark an asynchronous outcome rather than the operation itself
const OUTCOME_SUFFIXES: &[&str] = &["Success", "Error"];

#[derive(Debug, Clone, Copy)]
enum RenameRule {
    Pascal,
    Camel,
    Snake,
}

impl RenameRule {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "PascalCase" => Some(Self::Pascal),
            "camelCase" => Some(Self::Camel),
            "snake_case" => Some(Self::Snake),
            _ => None,
        }
    }

    fn apply(self, variant: &str) -> String {
        match self {
            Self::Pascal => variant.to_string(),
            Self::Camel => to_camel_case(variant),
            Self::Snake => to_snake_case(variant),
        }
    }
}

/// Split an action name into words
///
/// Breaks on underscores and before uppercase letters, so PascalCase,
/// camelCase and snake_case names all split the same way.
fn split_words(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();

    for ch in s.chars() {
        if ch == '_' {
            if !current.is_empty() {
                parts.push(std::mem::take(&mut current));
            }
            continue;
        }
        if ch.is_uppercase() && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
        }
        current.push(ch);
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Convert PascalCase to snake_case
fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, ch) in s.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.extend(ch.to_lowercase());
        } else {
            result.push(ch);
        }
    }
    result
}

/// Convert PascalCase to camelCase
fn to_camel_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
    }
}

/// Convert snake_case to PascalCase
fn to_pascal_case(s: &str) -> String {
    s.split('_')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            }
        })
        .collect()
}

fn is_outcome_word(word: &str) -> bool {
    OUTCOME_SUFFIXES
        .iter()
        .any(|suffix| suffix.eq_ignore_ascii_case(word))
}

/// Infer the operation an action name belongs to
///
/// `loadStatsError` -> `load_stats`, `CreateSuccess` -> `create`, `set_active` -> `set_active`
fn infer_category(name: &str) -> Option<String> {
    let mut parts = split_words(name);
    match parts.len() {
        0 => return None,
        // A bare "Success" or "Error" action has no operation to group under
        1 if is_outcome_word(&parts[0]) => return None,
        1 => {}
        n if is_outcome_word(&parts[n - 1]) => {
            parts.pop();
        }
        _ => {}
    }

    let words: Vec<_> = parts.iter().map(|p| p.to_lowercase()).collect();
    Some(words.join("_"))
}

/// Outcome variant (`Request`, `Success` or `Error`) derived from the last word of the name
fn infer_outcome(name: &str) -> Ident {
    let parts = split_words(name);
    match parts.last() {
        Some(last) if parts.len() > 1 && last.eq_ignore_ascii_case("success") => {
            format_ident!("Success")
        }
        Some(last) if parts.len() > 1 && last.eq_ignore_ascii_case("error") => {
            format_ident!("Error")
        }
        _ => format_ident!("Request"),
    }
}

/// Derive macro for the Action trait
///
/// Generates a `name()` method that returns the variant name as a static string,
/// transformed by `#[action(rename_all = "...")]` or overridden per variant with
/// `#[action(rename = "...")]`.
///
/// For enums made only of unit variants, also generates `ActionKind`:
/// - `all()` - every variant in declaration order
/// - `from_name()` - exact reverse lookup of `name()`
/// - `outcome()` - `Success`/`Error` from the last word of the resolved name,
///   `Request` otherwise
///
/// With `#[action(infer_categories)]`, also generates:
/// - `category() -> Option<&'static str>` - the operation the action belongs to,
///   inferred from the resolved name
/// - `category_enum() -> {Name}Category` - category as enum
/// - `is_{category}()` predicates for each category
/// - `{Name}Category` enum with all discovered categories
///
/// # Example
/// ```ignore
/// #[derive(Action, Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// #[action(rename_all = "camelCase", infer_categories)]
/// enum ProjectAction {
///     Update,
///     UpdateError,
///     UpdateSuccess,
///     SetActive,
/// }
///
/// let action = ProjectAction::UpdateError;
/// assert_eq!(action.name(), "updateError");
/// assert_eq!(action.category(), Some("update"));
/// assert!(action.is_update());
/// assert_eq!(ProjectAction::from_name("setActive"), Some(ProjectAction::SetActive));
/// ```
#[proc_macro_derive(Action, attributes(action))]
pub fn derive_action(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let opts = match ActionOpts::from_derive_input(&input) {
        Ok(opts) => opts,
        Err(e) => return e.write_errors().into(),
    };

    let name = &opts.ident;

    let variants = match &opts.data {
        darling::ast::Data::Enum(variants) => variants,
        _ => {
            return syn::Error::new_spanned(&input, "Action can only be derived for enums")
                .to_compile_error()
                .into();
        }
    };

    let rule = match opts.rename_all.as_deref() {
        None => RenameRule::Pascal,
        Some(raw) => match RenameRule::parse(raw) {
            Some(rule) => rule,
            None => {
                return syn::Error::new_spanned(
                    &input,
                    format!(
                        "unsupported rename_all value {raw:?}, expected \"PascalCase\", \"camelCase\" or \"snake_case\""
                    ),
                )
                .to_compile_error()
                .into();
            }
        },
    };

    // Resolve action names and reject duplicates
    let mut seen = HashSet::new();
    let mut action_names = Vec::with_capacity(variants.len());
    for v in variants.iter() {
        let action_name = v
            .rename
            .clone()
            .unwrap_or_else(|| rule.apply(&v.ident.to_string()));
        if !seen.insert(action_name.clone()) {
            return syn::Error::new_spanned(
                &v.ident,
                format!("duplicate action name {action_name:?}"),
            )
            .to_compile_error()
            .into();
        }
        action_names.push(action_name);
    }

    let name_arms = variants.iter().zip(action_names.iter()).map(|(v, action_name)| {
        let variant_name = &v.ident;

        match &v.fields.style {
            darling::ast::Style::Unit => quote! {
                #name::#variant_name => #action_name
            },
            darling::ast::Style::Tuple => quote! {
                #name::#variant_name(..) => #action_name
            },
            darling::ast::Style::Struct => quote! {
                #name::#variant_name { .. } => #action_name
            },
        }
    });

    let mut expanded = quote! {
        impl ::project_actions::Action for #name {
            fn name(&self) -> &'static str {
                match self {
                    #(#name_arms),*
                }
            }
        }
    };

    // Closed sets of fieldless variants can be enumerated and parsed back
    let all_unit = variants
        .iter()
        .all(|v| matches!(v.fields.style, darling::ast::Style::Unit));

    if all_unit {
        let variant_idents: Vec<_> = variants.iter().map(|v| &v.ident).collect();

        let from_name_arms = variant_idents
            .iter()
            .zip(action_names.iter())
            .map(|(v, s)| {
                quote! { #s => ::core::option::Option::Some(#name::#v) }
            });

        let outcome_arms = variant_idents
            .iter()
            .zip(action_names.iter())
            .map(|(v, action_name)| {
                let outcome = infer_outcome(action_name);
                quote! { #name::#v => ::project_actions::Outcome::#outcome }
            });

        expanded = quote! {
            #expanded

            impl ::project_actions::ActionKind for #name {
                fn all() -> &'static [Self] {
                    static ALL: &[#name] = &[#(#name::#variant_idents),*];
                    ALL
                }

                fn from_name(name: &str) -> ::core::option::Option<Self> {
                    match name {
                        #(#from_name_arms,)*
                        _ => ::core::option::Option::None,
                    }
                }

                fn outcome(&self) -> ::project_actions::Outcome {
                    match self {
                        #(#outcome_arms,)*
                    }
                }
            }
        };
    }

    if opts.infer_categories {
        // BTreeMap keeps category order deterministic
        let mut categories: BTreeMap<String, Vec<&Ident>> = BTreeMap::new();
        let mut variant_categories: Vec<(&Ident, Option<String>)> = Vec::new();

        for (v, action_name) in variants.iter().zip(action_names.iter()) {
            let cat = if v.skip_category {
                None
            } else if let Some(ref explicit_cat) = v.category {
                Some(explicit_cat.clone())
            } else {
                infer_category(action_name)
            };

            variant_categories.push((&v.ident, cat.clone()));

            if let Some(category) = cat {
                categories.entry(category).or_default().push(&v.ident);
            }
        }

        let category_arms: Vec<_> = variant_categories
            .iter()
            .map(|(variant, cat)| {
                let cat_expr = match cat {
                    Some(c) => quote! { ::core::option::Option::Some(#c) },
                    None => quote! { ::core::option::Option::None },
                };
                quote! { #name::#variant { .. } => #cat_expr }
            })
            .collect();

        let category_enum_name = format_ident!("{}Category", name);
        let category_variants: Vec<_> = categories
            .keys()
            .map(|c| format_ident!("{}", to_pascal_case(c)))
            .collect();
        let category_variant_names: Vec<_> = categories.keys().cloned().collect();

        let category_enum_arms: Vec<_> = variant_categories
            .iter()
            .map(|(variant, cat)| {
                let cat_variant = match cat {
                    Some(c) => format_ident!("{}", to_pascal_case(c)),
                    None => format_ident!("Uncategorized"),
                };
                quote! { #name::#variant { .. } => #category_enum_name::#cat_variant }
            })
            .collect();

        let predicates: Vec<_> = categories
            .iter()
            .map(|(cat, cat_variants)| {
                let predicate_name = format_ident!("is_{}", cat);
                let patterns: Vec<_> = cat_variants
                    .iter()
                    .map(|v| quote! { #name::#v { .. } })
                    .collect();
                let doc = format!(
                    "Returns true if this action belongs to the `{}` category.",
                    cat
                );

                quote! {
                    #[doc = #doc]
                    pub fn #predicate_name(&self) -> bool {
                        matches!(self, #(#patterns)|*)
                    }
                }
            })
            .collect();

        let category_enum_doc = format!(
            "Action categories for [`{}`].\n\n\
             Use [`{}::category_enum()`] to get the category of an action.",
            name, name
        );

        expanded = quote! {
            #expanded

            #[doc = #category_enum_doc]
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub enum #category_enum_name {
                #(#category_variants,)*
                /// Actions that don't belong to any specific category.
                Uncategorized,
            }

            impl #category_enum_name {
                /// Get all category values
                pub fn all() -> &'static [Self] {
                    &[#(Self::#category_variants,)* Self::Uncategorized]
                }

                /// Get category name as string
                pub fn name(&self) -> &'static str {
                    match self {
                        #(Self::#category_variants => #category_variant_names,)*
                        Self::Uncategorized => "uncategorized",
                    }
                }
            }

            impl #name {
                /// Get the action's category (if categorized)
                pub fn category(&self) -> ::core::option::Option<&'static str> {
                    match self {
                        #(#category_arms,)*
                    }
                }

                /// Get the category as an enum value
                pub fn category_enum(&self) -> #category_enum_name {
                    match self {
                        #(#category_enum_arms,)*
                    }
                }

                #(#predicates)*
            }

            impl ::project_actions::ActionCategory for #name {
                type Category = #category_enum_name;

                fn category(&self) -> ::core::option::Option<&'static str> {
                    #name::category(self)
                }

                fn category_enum(&self) -> Self::Category {
                    #name::category_enum(self)
                }
            }
        };
    }

    TokenStream::from(expanded)
}
