//! Output formatting for CLI

use crate::binder::{LinkTarget, ODataEntity, ODataEntitySet, ODataProperty, PropertyValue};

/// Render a property value on a single line
pub fn format_value(value: &PropertyValue) -> String {
    match value {
        PropertyValue::Primitive(p) => p.to_wire_string(),
        PropertyValue::Null { .. } => "null".to_string(),
        PropertyValue::Enum { value, .. } => value.clone(),
        PropertyValue::Complex { properties, .. } => {
            let members: Vec<String> = properties
                .iter()
                .map(|p| format!("{}={}", p.name, format_value(&p.value)))
                .collect();
            format!("{{{}}}", members.join(", "))
        }
        PropertyValue::Collection { items, .. } => {
            let items: Vec<String> = items.iter().map(format_value).collect();
            format!("[{}]", items.join(", "))
        }
    }
}

/// Format an entity on one line
pub fn format_compact_entity(entity: &ODataEntity) -> String {
    let mut output = String::new();
    output.push_str(entity.type_name.as_deref().unwrap_or("(untyped)"));
    if let Some(id) = &entity.id {
        output.push_str(&format!(" <{}>", id));
    }

    let props: Vec<String> = entity
        .properties
        .iter()
        .map(|p| format!("{}={}", p.name, format_value(&p.value)))
        .collect();
    if !props.is_empty() {
        output.push_str(&format!(" {}", props.join(", ")));
    }
    output
}

/// Format an entity with one line per property and link
pub fn format_pretty_entity(entity: &ODataEntity) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "Entity: {}\n",
        entity.type_name.as_deref().unwrap_or("(untyped)")
    ));
    if let Some(id) = &entity.id {
        output.push_str(&format!("  Id: {}\n", id));
    }
    if let Some(etag) = &entity.etag {
        output.push_str(&format!("  ETag: {}\n", etag));
    }
    if entity.media_entity {
        output.push_str(&format!(
            "  Media: {} ({})\n",
            entity.media_content_source.as_deref().unwrap_or(""),
            entity.media_content_type.as_deref().unwrap_or("unknown type")
        ));
    }

    if !entity.properties.is_empty() {
        output.push_str(&format!("  Properties: {}\n", entity.properties.len()));
        for property in &entity.properties {
            push_property(&mut output, property, 4);
        }
    }

    if !entity.navigation_links.is_empty() {
        output.push_str("  Navigation links:\n");
        for link in &entity.navigation_links {
            let target = match &link.target {
                LinkTarget::Lazy => "lazy".to_string(),
                LinkTarget::InlineEntity(_) => "inline entity".to_string(),
                LinkTarget::InlineEntitySet(set) => {
                    format!("inline set of {}", set.entities.len())
                }
            };
            output.push_str(&format!("    - {} -> {} ({})\n", link.name, link.href, target));
        }
    }

    for link in &entity.association_links {
        output.push_str(&format!("  Association: {} -> {}\n", link.name, link.href));
    }
    for link in &entity.media_edit_links {
        output.push_str(&format!("  Media edit: {} -> {}\n", link.name, link.href));
    }
    for operation in &entity.operations {
        output.push_str(&format!(
            "  Operation: {} -> {}\n",
            operation.metadata_anchor, operation.target
        ));
    }
    output
}

fn push_property(output: &mut String, property: &ODataProperty, indent: usize) {
    let pad = " ".repeat(indent);
    let type_name = property.value.type_name().unwrap_or_default();
    match &property.value {
        PropertyValue::Complex { properties, .. } => {
            output.push_str(&format!("{}{} ({}):\n", pad, property.name, type_name));
            for member in properties {
                push_property(output, member, indent + 2);
            }
        }
        value => {
            output.push_str(&format!(
                "{}{}: {} ({})\n",
                pad,
                property.name,
                format_value(value),
                type_name
            ));
        }
    }
}

/// Summary line printed after an entity set
pub fn format_set_summary(read: usize, count: Option<u64>, next: Option<&str>) -> String {
    let mut output = format!("\n{} entit{} read", read, if read == 1 { "y" } else { "ies" });
    if let Some(count) = count {
        output.push_str(&format!(", {} in total", count));
    }
    if let Some(next) = next {
        output.push_str(&format!("\nNext page: {}", next));
    }
    output.push('\n');
    output
}

/// Format a decoded entity set
pub fn format_entity_set(set: &ODataEntitySet, pretty: bool) -> String {
    let mut output = String::new();
    for entity in &set.entities {
        if pretty {
            output.push_str(&format_pretty_entity(entity));
        } else {
            output.push_str(&format_compact_entity(entity));
            output.push('\n');
        }
    }
    output.push_str(&format_set_summary(
        set.entities.len(),
        set.count,
        set.next.as_deref(),
    ));
    output
}
