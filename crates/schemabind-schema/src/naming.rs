//! Default binding naming strategy.
//!
//! Packages are derived from the module name and revision, then extended by
//! one lowercase segment per schema path step. Class names are UpperCamel
//! renderings of local names.

use crate::{path::SchemaPath, qname::QNameModule};

/// Root of every generated package.
pub const PACKAGE_PREFIX: &str = "schemabind.gen";

/// `schemabind.gen.<module>[.rev<YYYYMMDD>]`
#[must_use]
pub fn module_package(name: &str, module: &QNameModule) -> String {
    match module.revision() {
        Some(rev) => format!("{PACKAGE_PREFIX}.{}.rev{}", package_segment(name), rev.compact()),
        None => format!("{PACKAGE_PREFIX}.{}", package_segment(name)),
    }
}

/// Package holding the types declared directly below `parent`.
#[must_use]
pub fn package_for(base: &str, parent: &SchemaPath) -> String {
    let mut package = base.to_string();
    for segment in parent.segments() {
        package.push('.');
        package.push_str(&package_segment(segment.local_name()));
    }

    package
}

#[must_use]
pub fn package_segment(local_name: &str) -> String {
    let mut segment: String = local_name
        .chars()
        .map(|c| match c {
            '-' | '.' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect();
    if segment.starts_with(|c: char| c.is_ascii_digit()) {
        segment.insert(0, '_');
    }

    segment
}

#[must_use]
pub fn class_name(local_name: &str) -> String {
    local_name
        .split(['-', '_', '.'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_ascii_uppercase().to_string() + chars.as_str()
            })
        })
        .collect()
}

/// `<TargetClass><N>`, N counting from one per augmenting module.
#[must_use]
pub fn augmentation_name(target_local_name: &str, ordinal: u32) -> String {
    format!("{}{}", class_name(target_local_name), ordinal + 1)
}

#[must_use]
pub fn key_name(list_local_name: &str) -> String {
    format!("{}Key", class_name(list_local_name))
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
