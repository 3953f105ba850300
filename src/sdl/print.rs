//! SDL printer
//!
//! Output follows graphql-js `print`: two space indentation, one blank line
//! between definitions, no trailing newline.

use async_graphql_parser::types::{
    ConstDirective, DirectiveDefinition, FieldDefinition, InputValueDefinition,
    SchemaDefinition, ServiceDocument, TypeDefinition, TypeKind, TypeSystemDefinition,
};
use async_graphql_parser::Positioned;
use async_graphql_value::Name;
use heck::ToShoutySnakeCase;

const INDENT: &str = "  ";

/// Print a whole document
pub fn print_document(document: &ServiceDocument) -> String {
    document
        .definitions
        .iter()
        .map(|definition| match definition {
            TypeSystemDefinition::Schema(schema) => print_schema(&schema.node),
            TypeSystemDefinition::Type(ty) => print_type(&ty.node),
            TypeSystemDefinition::Directive(directive) => print_directive_definition(&directive.node),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn print_schema(schema: &SchemaDefinition) -> String {
    let operations = [
        ("query", &schema.query),
        ("mutation", &schema.mutation),
        ("subscription", &schema.subscription),
    ]
    .into_iter()
    .filter_map(|(operation, ty)| {
        ty.as_ref()
            .map(|ty| format!("{}{}: {}", INDENT, operation, ty.node))
    })
    .collect::<Vec<_>>();

    let mut out = String::new();
    if schema.extend {
        out.push_str("extend ");
    }
    out.push_str("schema");
    out.push_str(&print_directives(&schema.directives));
    out.push_str(&block(&operations));
    out
}

fn print_type(ty: &TypeDefinition) -> String {
    let mut out = print_description(ty.description.as_ref().map(|d| d.node.as_str()), "");
    if ty.extend {
        out.push_str("extend ");
    }

    let directives = print_directives(&ty.directives);
    match &ty.kind {
        TypeKind::Scalar => {
            out.push_str(&format!("scalar {}{}", ty.name.node, directives));
        }
        TypeKind::Object(object) => {
            out.push_str(&format!(
                "type {}{}{}{}",
                ty.name.node,
                print_implements(&object.implements),
                directives,
                block(&print_fields(&object.fields))
            ));
        }
        TypeKind::Interface(interface) => {
            out.push_str(&format!(
                "interface {}{}{}{}",
                ty.name.node,
                print_implements(&interface.implements),
                directives,
                block(&print_fields(&interface.fields))
            ));
        }
        TypeKind::Union(union) => {
            let members = union
                .members
                .iter()
                .map(|member| member.node.to_string())
                .collect::<Vec<_>>();
            out.push_str(&format!("union {}{}", ty.name.node, directives));
            if !members.is_empty() {
                out.push_str(" = ");
                out.push_str(&members.join(" | "));
            }
        }
        TypeKind::Enum(enumeration) => {
            let values = enumeration
                .values
                .iter()
                .map(|value| {
                    let value = &value.node;
                    format!(
                        "{}{}{}{}",
                        print_description(value.description.as_ref().map(|d| d.node.as_str()), INDENT),
                        INDENT,
                        value.value.node,
                        print_directives(&value.directives)
                    )
                })
                .collect::<Vec<_>>();
            out.push_str(&format!(
                "enum {}{}{}",
                ty.name.node,
                directives,
                block(&values)
            ));
        }
        TypeKind::InputObject(input) => {
            let fields = input
                .fields
                .iter()
                .map(|field| {
                    format!(
                        "{}{}{}",
                        print_description(
                            field.node.description.as_ref().map(|d| d.node.as_str()),
                            INDENT
                        ),
                        INDENT,
                        print_input_value(&field.node)
                    )
                })
                .collect::<Vec<_>>();
            out.push_str(&format!(
                "input {}{}{}",
                ty.name.node,
                directives,
                block(&fields)
            ));
        }
    }
    out
}

fn print_directive_definition(directive: &DirectiveDefinition) -> String {
    let locations = directive
        .locations
        .iter()
        .map(|location| format!("{:?}", location.node).to_shouty_snake_case())
        .collect::<Vec<_>>()
        .join(" | ");
    format!(
        "{}directive @{}{}{} on {}",
        print_description(directive.description.as_ref().map(|d| d.node.as_str()), ""),
        directive.name.node,
        print_arguments(&directive.arguments, ""),
        if directive.is_repeatable { " repeatable" } else { "" },
        locations
    )
}

// ============================================================================
// Members
// ============================================================================

fn print_fields(fields: &[Positioned<FieldDefinition>]) -> Vec<String> {
    fields
        .iter()
        .map(|field| {
            let field = &field.node;
            format!(
                "{}{}{}{}: {}{}",
                print_description(field.description.as_ref().map(|d| d.node.as_str()), INDENT),
                INDENT,
                field.name.node,
                print_arguments(&field.arguments, INDENT),
                field.ty.node,
                print_directives(&field.directives)
            )
        })
        .collect()
}

/// Arguments go on one line unless one of them carries a description
fn print_arguments(arguments: &[Positioned<InputValueDefinition>], indent: &str) -> String {
    if arguments.is_empty() {
        return String::new();
    }

    if arguments.iter().all(|arg| arg.node.description.is_none()) {
        let arguments = arguments
            .iter()
            .map(|arg| print_input_value(&arg.node))
            .collect::<Vec<_>>();
        return format!("({})", arguments.join(", "));
    }

    let inner = format!("{}{}", indent, INDENT);
    let arguments = arguments
        .iter()
        .map(|arg| {
            format!(
                "{}{}{}",
                print_description(arg.node.description.as_ref().map(|d| d.node.as_str()), &inner),
                inner,
                print_input_value(&arg.node)
            )
        })
        .collect::<Vec<_>>();
    format!("(\n{}\n{})", arguments.join("\n"), indent)
}

fn print_input_value(value: &InputValueDefinition) -> String {
    let mut out = format!("{}: {}", value.name.node, value.ty.node);
    if let Some(default) = &value.default_value {
        out.push_str(&format!(" = {}", default.node));
    }
    out.push_str(&print_directives(&value.directives));
    out
}

fn print_implements(interfaces: &[Positioned<Name>]) -> String {
    if interfaces.is_empty() {
        return String::new();
    }
    let names = interfaces
        .iter()
        .map(|name| name.node.to_string())
        .collect::<Vec<_>>();
    format!(" implements {}", names.join(" & "))
}

fn print_directives(directives: &[Positioned<ConstDirective>]) -> String {
    directives
        .iter()
        .map(|directive| {
            let directive = &directive.node;
            if directive.arguments.is_empty() {
                format!(" @{}", directive.name.node)
            } else {
                let arguments = directive
                    .arguments
                    .iter()
                    .map(|(name, value)| format!("{}: {}", name.node, value.node))
                    .collect::<Vec<_>>();
                format!(" @{}({})", directive.name.node, arguments.join(", "))
            }
        })
        .collect()
}

/// Description line(s) preceding a definition, already indented
fn print_description(description: Option<&str>, indent: &str) -> String {
    match description {
        None => String::new(),
        Some(text) if text.contains('\n') => {
            let body = text
                .lines()
                .map(|line| {
                    if line.is_empty() {
                        String::new()
                    } else {
                        format!("{}{}", indent, line.replace("\"\"\"", "\\\"\"\""))
                    }
                })
                .collect::<Vec<_>>()
                .join("\n");
            format!("{}\"\"\"\n{}\n{}\"\"\"\n", indent, body, indent)
        }
        Some(text) => format!("{}\"{}\"\n", indent, escape(text)),
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

/// `{ ... }` block, one already indented entry per line
fn block(entries: &[String]) -> String {
    if entries.is_empty() {
        return String::new();
    }
    format!(" {{\n{}\n}}", entries.join("\n"))
}
