//! Structural merge of several SDL documents
//!
//! Type extensions are folded into their base types, identical duplicates
//! are dropped and a field redeclared with a different type is a conflict.
//! The merged document lists the schema definition (when one is declared)
//! followed by every other definition sorted by name.

use super::parse;
use async_graphql_parser::types::{
    ConstDirective, DirectiveDefinition, EnumValueDefinition, FieldDefinition,
    InputValueDefinition, SchemaDefinition, ServiceDocument, TypeDefinition, TypeKind,
    TypeSystemDefinition,
};
use async_graphql_parser::Positioned;
use async_graphql_value::Name;
use indexmap::IndexMap;

/// Merge SDL sources into one document
pub fn merge_type_defs<S: AsRef<str>>(sources: &[S]) -> Result<ServiceDocument, Vec<String>> {
    let mut merger = Merger::default();
    for source in sources {
        let document = parse(source.as_ref()).map_err(|e| vec![e])?;
        for definition in document.definitions {
            merger.add(definition);
        }
    }
    merger.finish()
}

#[derive(Default)]
struct Merger {
    schema: Option<Positioned<SchemaDefinition>>,
    types: IndexMap<String, Positioned<TypeDefinition>>,
    directives: IndexMap<String, Positioned<DirectiveDefinition>>,
    errors: Vec<String>,
}

impl Merger {
    fn add(&mut self, definition: TypeSystemDefinition) {
        match definition {
            TypeSystemDefinition::Schema(schema) => match &mut self.schema {
                Some(existing) => merge_schema(&mut existing.node, schema.node),
                None => self.schema = Some(schema),
            },
            TypeSystemDefinition::Directive(directive) => {
                let name = directive.node.name.node.to_string();
                self.directives.entry(name).or_insert(directive);
            }
            TypeSystemDefinition::Type(ty) => {
                let name = ty.node.name.node.to_string();
                match self.types.get_mut(&name) {
                    Some(existing) => {
                        if let Err(message) = merge_type(&mut existing.node, ty.node) {
                            self.errors
                                .push(format!("Unable to merge GraphQL type \"{}\": {}", name, message));
                        }
                    }
                    None => {
                        self.types.insert(name, ty);
                    }
                }
            }
        }
    }

    fn finish(self) -> Result<ServiceDocument, Vec<String>> {
        if !self.errors.is_empty() {
            return Err(self.errors);
        }

        let mut named: Vec<(String, TypeSystemDefinition)> = self
            .types
            .into_iter()
            .map(|(name, ty)| (name, TypeSystemDefinition::Type(ty)))
            .chain(
                self.directives
                    .into_iter()
                    .map(|(name, directive)| (name, TypeSystemDefinition::Directive(directive))),
            )
            .collect();
        named.sort_by(|a, b| a.0.cmp(&b.0));

        let definitions = self
            .schema
            .map(TypeSystemDefinition::Schema)
            .into_iter()
            .chain(named.into_iter().map(|(_, definition)| definition))
            .collect();
        Ok(ServiceDocument { definitions })
    }
}

fn merge_schema(existing: &mut SchemaDefinition, incoming: SchemaDefinition) {
    existing.extend &= incoming.extend;
    merge_directives(&mut existing.directives, incoming.directives);
    if existing.query.is_none() {
        existing.query = incoming.query;
    }
    if existing.mutation.is_none() {
        existing.mutation = incoming.mutation;
    }
    if existing.subscription.is_none() {
        existing.subscription = incoming.subscription;
    }
}

fn merge_type(existing: &mut TypeDefinition, incoming: TypeDefinition) -> Result<(), String> {
    existing.extend &= incoming.extend;
    if existing.description.is_none() {
        existing.description = incoming.description;
    }
    merge_directives(&mut existing.directives, incoming.directives);

    match (&mut existing.kind, incoming.kind) {
        (TypeKind::Scalar, TypeKind::Scalar) => Ok(()),
        (TypeKind::Object(existing), TypeKind::Object(incoming)) => {
            merge_names(&mut existing.implements, incoming.implements);
            merge_fields(&mut existing.fields, incoming.fields)
        }
        (TypeKind::Interface(existing), TypeKind::Interface(incoming)) => {
            merge_names(&mut existing.implements, incoming.implements);
            merge_fields(&mut existing.fields, incoming.fields)
        }
        (TypeKind::Union(existing), TypeKind::Union(incoming)) => {
            merge_names(&mut existing.members, incoming.members);
            Ok(())
        }
        (TypeKind::Enum(existing), TypeKind::Enum(incoming)) => {
            merge_enum_values(&mut existing.values, incoming.values);
            Ok(())
        }
        (TypeKind::InputObject(existing), TypeKind::InputObject(incoming)) => {
            merge_input_values(&mut existing.fields, incoming.fields)
        }
        (existing, incoming) => Err(format!(
            "Definition kinds differ. Declared as {} and redefined as {}",
            kind_name(existing),
            kind_name(&incoming)
        )),
    }
}

fn merge_fields(
    existing: &mut Vec<Positioned<FieldDefinition>>,
    incoming: Vec<Positioned<FieldDefinition>>,
) -> Result<(), String> {
    for field in incoming {
        match existing
            .iter_mut()
            .find(|f| f.node.name.node == field.node.name.node)
        {
            Some(current) => {
                check_same_type(
                    &field.node.name.node,
                    &current.node.ty.node.to_string(),
                    &field.node.ty.node.to_string(),
                )?;
                merge_directives(&mut current.node.directives, field.node.directives);
            }
            None => existing.push(field),
        }
    }
    Ok(())
}

fn merge_input_values(
    existing: &mut Vec<Positioned<InputValueDefinition>>,
    incoming: Vec<Positioned<InputValueDefinition>>,
) -> Result<(), String> {
    for value in incoming {
        match existing
            .iter_mut()
            .find(|v| v.node.name.node == value.node.name.node)
        {
            Some(current) => {
                check_same_type(
                    &value.node.name.node,
                    &current.node.ty.node.to_string(),
                    &value.node.ty.node.to_string(),
                )?;
                merge_directives(&mut current.node.directives, value.node.directives);
            }
            None => existing.push(value),
        }
    }
    Ok(())
}

fn check_same_type(field: &Name, declared: &str, redefined: &str) -> Result<(), String> {
    if declared == redefined {
        return Ok(());
    }
    Err(format!(
        "Field \"{}\" already defined with a different type. Declared as \"{}\" and redefined as \"{}\"",
        field, declared, redefined
    ))
}

fn merge_enum_values(
    existing: &mut Vec<Positioned<EnumValueDefinition>>,
    incoming: Vec<Positioned<EnumValueDefinition>>,
) {
    for value in incoming {
        if !existing.iter().any(|v| v.node.value.node == value.node.value.node) {
            existing.push(value);
        }
    }
}

fn merge_names(existing: &mut Vec<Positioned<Name>>, incoming: Vec<Positioned<Name>>) {
    for name in incoming {
        if !existing.iter().any(|n| n.node == name.node) {
            existing.push(name);
        }
    }
}

fn merge_directives(
    existing: &mut Vec<Positioned<ConstDirective>>,
    incoming: Vec<Positioned<ConstDirective>>,
) {
    for directive in incoming {
        if !existing
            .iter()
            .any(|d| d.node.name.node == directive.node.name.node)
        {
            existing.push(directive);
        }
    }
}

fn kind_name(kind: &TypeKind) -> &'static str {
    match kind {
        TypeKind::Scalar => "scalar",
        TypeKind::Object(_) => "type",
        TypeKind::Interface(_) => "interface",
        TypeKind::Union(_) => "union",
        TypeKind::Enum(_) => "enum",
        TypeKind::InputObject(_) => "input",
    }
}
