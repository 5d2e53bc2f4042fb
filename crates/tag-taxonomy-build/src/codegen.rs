//! Emit `taxonomy!` source from a config and its lock file.

use std::collections::BTreeMap;
use std::fmt::Write;
use tag_taxonomy::{TagDefinition, TagPath};

use crate::lock::LockFile;
use crate::toml_parser::TaxonomyConfig;

const DEPRECATED_NOTE: &str = "This tag is deprecated.";
const INDENT: &str = "    ";

/// A node of the output tree.
#[derive(Default)]
struct TreeNode<'a> {
    definition: Option<&'a TagDefinition>,
    deprecated: bool,
    children: BTreeMap<String, TreeNode<'a>>,
}

impl<'a> TreeNode<'a> {
    fn insert(&mut self, path: &TagPath, definition: &'a TagDefinition, deprecated: bool) {
        let node = path.segments().fold(self, |node, segment| {
            node.children.entry(segment.to_owned()).or_default()
        });
        node.definition = Some(definition);
        node.deprecated = deprecated;
    }
}

/// Definitions to generate: everything in `config`, plus bare tags for paths
/// the lock marks deprecated.
pub fn combined_definitions(config: &TaxonomyConfig, lock: &LockFile) -> Vec<(TagDefinition, bool)> {
    let mut combined: Vec<(TagDefinition, bool)> =
        config.definitions().map(|def| (def.clone(), false)).collect();

    for entry in lock.deprecated_entries() {
        if config.contains(&entry.path) {
            continue;
        }
        if let Ok(path) = TagPath::parse(&entry.path) {
            combined.push((TagDefinition::from_path(path), true));
        }
    }

    combined.sort_by(|(a, _), (b, _)| a.path.cmp(&b.path));
    combined
}

/// Generate code for `config` alone.
pub fn generate_taxonomy_code(config: &TaxonomyConfig) -> String {
    let combined: Vec<(TagDefinition, bool)> =
        config.definitions().map(|def| (def.clone(), false)).collect();
    render(&config.module_name, &combined)
}

/// Generate code for `config`, keeping the lock's deprecated paths.
pub fn generate_taxonomy_code_from_lock(config: &TaxonomyConfig, lock: &LockFile) -> String {
    render(&config.module_name, &combined_definitions(config, lock))
}

fn render(module_name: &str, definitions: &[(TagDefinition, bool)]) -> String {
    let mut root = TreeNode::default();
    for (def, deprecated) in definitions {
        root.insert(&def.path, def, *deprecated);
    }

    let mut out = String::new();
    out.push_str("// @generated by tag-taxonomy-build. Do not edit.\n\n");
    out.push_str("tag_taxonomy::taxonomy! {\n");
    let _ = writeln!(out, "{INDENT}pub mod {module_name} {{");
    for (name, child) in &root.children {
        render_node(&mut out, name, child, 2);
    }
    let _ = writeln!(out, "{INDENT}}}");
    out.push_str("}\n");
    out
}

fn render_node(out: &mut String, name: &str, node: &TreeNode<'_>, depth: usize) {
    let pad = INDENT.repeat(depth);

    if node.deprecated {
        let _ = writeln!(out, "{pad}#[deprecated(note = \"{DEPRECATED_NOTE}\")]");
    }
    if let Some(def) = node.definition {
        if !def.supertypes.is_empty() {
            let supertypes: Vec<String> = def
                .supertypes
                .iter()
                .map(|s| format!("\"{s}\""))
                .collect();
            let _ = writeln!(out, "{pad}#[is({})]", supertypes.join(", "));
        }
        match def.leaf_kind {
            Some(kind) => {
                let _ = writeln!(out, "{pad}#[leaf = \"{kind}\"]");
            }
            None if def.is_leaf => {
                let _ = writeln!(out, "{pad}#[leaf]");
            }
            None => {}
        }
    }

    if node.children.is_empty() {
        let _ = writeln!(out, "{pad}{name};");
    } else {
        let _ = writeln!(out, "{pad}{name} {{");
        for (child_name, child) in &node.children {
            render_node(out, child_name, child, depth + 1);
        }
        let _ = writeln!(out, "{pad}}}");
    }
}
