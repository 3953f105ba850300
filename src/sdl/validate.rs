//! SDL document validation
//!
//! Covers the rules that matter for a schema assembled from several files:
//! unique names, known type and directive references, extensions of defined
//! types only. Messages follow graphql-js wording.

use super::{named_type, parse};
use async_graphql_parser::types::{
    ConstDirective, InputValueDefinition, ServiceDocument, TypeKind, TypeSystemDefinition,
};
use async_graphql_parser::Positioned;
use std::collections::{HashMap, HashSet};

const BUILTIN_SCALARS: &[&str] = &["Int", "Float", "String", "Boolean", "ID"];
const BUILTIN_DIRECTIVES: &[&str] = &["skip", "include", "deprecated", "specifiedBy", "oneOf"];

/// Validate an SDL document, returning one message per problem found
pub fn validate_sdl(source: &str) -> Vec<String> {
    match parse(source) {
        Ok(document) => Validator::new(&document).run(),
        Err(e) => vec![e],
    }
}

struct Validator<'a> {
    document: &'a ServiceDocument,
    types: HashSet<&'a str>,
    directives: HashSet<&'a str>,
    errors: Vec<String>,
}

impl<'a> Validator<'a> {
    fn new(document: &'a ServiceDocument) -> Self {
        Self {
            document,
            types: BUILTIN_SCALARS.iter().copied().collect(),
            directives: BUILTIN_DIRECTIVES.iter().copied().collect(),
            errors: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<String> {
        self.collect_definitions();
        self.check_references();
        self.errors
    }

    // ========================================================================
    // Definitions
    // ========================================================================

    fn collect_definitions(&mut self) {
        let mut defined_types = HashSet::new();
        let mut schemas = 0;

        let document = self.document;
        for definition in &document.definitions {
            match definition {
                TypeSystemDefinition::Schema(schema) => {
                    if !schema.node.extend {
                        schemas += 1;
                        if schemas > 1 {
                            self.errors
                                .push("Must provide only one schema definition.".to_string());
                        }
                    }
                }
                TypeSystemDefinition::Type(ty) => {
                    if ty.node.extend {
                        continue;
                    }
                    let name = ty.node.name.node.as_str();
                    if !defined_types.insert(name) {
                        self.errors
                            .push(format!("There can be only one type named \"{}\".", name));
                    }
                    self.types.insert(name);
                }
                TypeSystemDefinition::Directive(directive) => {
                    let name = directive.node.name.node.as_str();
                    if !self.directives.insert(name) {
                        self.errors.push(format!(
                            "There can be only one directive named \"@{}\".",
                            name
                        ));
                    }
                }
            }
        }
    }

    // ========================================================================
    // References
    // ========================================================================

    fn check_references(&mut self) {
        let document = self.document;
        let mut fields: HashMap<&str, HashSet<&str>> = HashMap::new();
        let mut enum_values: HashMap<&str, HashSet<&str>> = HashMap::new();

        for definition in &document.definitions {
            match definition {
                TypeSystemDefinition::Schema(schema) => {
                    let schema = &schema.node;
                    self.check_directives(&schema.directives);
                    for root in [&schema.query, &schema.mutation, &schema.subscription]
                        .into_iter()
                        .flatten()
                    {
                        self.check_type(root.node.as_str());
                    }
                }
                TypeSystemDefinition::Type(ty) => {
                    let ty = &ty.node;
                    let type_name = ty.name.node.as_str();
                    if ty.extend && !self.types.contains(type_name) {
                        self.errors.push(format!(
                            "Cannot extend type \"{}\" because it is not defined.",
                            type_name
                        ));
                    }
                    self.check_directives(&ty.directives);

                    match &ty.kind {
                        TypeKind::Scalar => {}
                        TypeKind::Object(object) => {
                            for interface in &object.implements {
                                self.check_type(interface.node.as_str());
                            }
                            for field in &object.fields {
                                let field = &field.node;
                                self.check_field_name(&mut fields, type_name, field.name.node.as_str());
                                self.check_type(named_type(&field.ty.node));
                                self.check_directives(&field.directives);
                                self.check_input_values(&field.arguments);
                            }
                        }
                        TypeKind::Interface(interface) => {
                            for parent in &interface.implements {
                                self.check_type(parent.node.as_str());
                            }
                            for field in &interface.fields {
                                let field = &field.node;
                                self.check_field_name(&mut fields, type_name, field.name.node.as_str());
                                self.check_type(named_type(&field.ty.node));
                                self.check_directives(&field.directives);
                                self.check_input_values(&field.arguments);
                            }
                        }
                        TypeKind::Union(union) => {
                            for member in &union.members {
                                self.check_type(member.node.as_str());
                            }
                        }
                        TypeKind::Enum(enumeration) => {
                            for value in &enumeration.values {
                                let value_name = value.node.value.node.as_str();
                                if !enum_values.entry(type_name).or_default().insert(value_name) {
                                    self.errors.push(format!(
                                        "Enum value \"{}.{}\" can only be defined once.",
                                        type_name, value_name
                                    ));
                                }
                                self.check_directives(&value.node.directives);
                            }
                        }
                        TypeKind::InputObject(input) => {
                            for field in &input.fields {
                                self.check_field_name(
                                    &mut fields,
                                    type_name,
                                    field.node.name.node.as_str(),
                                );
                            }
                            self.check_input_values(&input.fields);
                        }
                    }
                }
                TypeSystemDefinition::Directive(directive) => {
                    self.check_input_values(&directive.node.arguments);
                }
            }
        }
    }

    fn check_field_name<'d>(
        &mut self,
        fields: &mut HashMap<&'d str, HashSet<&'d str>>,
        type_name: &'d str,
        field_name: &'d str,
    ) {
        if !fields.entry(type_name).or_default().insert(field_name) {
            self.errors.push(format!(
                "Field \"{}.{}\" can only be defined once.",
                type_name, field_name
            ));
        }
    }

    fn check_input_values(&mut self, values: &[Positioned<InputValueDefinition>]) {
        for value in values {
            self.check_type(named_type(&value.node.ty.node));
            self.check_directives(&value.node.directives);
        }
    }

    fn check_type(&mut self, name: &str) {
        if !self.types.contains(name) {
            self.errors.push(format!("Unknown type \"{}\".", name));
        }
    }

    fn check_directives(&mut self, directives: &[Positioned<ConstDirective>]) {
        for directive in directives {
            let name = directive.node.name.node.as_str();
            if !self.directives.contains(name) {
                self.errors.push(format!("Unknown directive \"@{}\".", name));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::AWS_SDL_DECLARATIONS;

    #[test]
    fn test_valid_document() {
        let errors = validate_sdl(
            "schema { query: Query }\n\
             type Query { user(id: ID!): User @deprecated(reason: \"old\") }\n\
             type User { id: ID! name: String tags: [String!]! }\n\
             extend type User { age: Int }",
        );
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_aws_declarations_make_appsync_scalars_known() {
        let source = format!(
            "{}\ntype Query {{ now: AWSDateTime @aws_iam @aws_api_key }}",
            AWS_SDL_DECLARATIONS
        );
        assert!(validate_sdl(&source).is_empty());
        assert_eq!(
            validate_sdl("type Query { now: AWSDateTime @aws_iam }"),
            vec!["Unknown type \"AWSDateTime\".", "Unknown directive \"@aws_iam\"."]
        );
    }

    #[test]
    fn test_duplicate_types() {
        let errors = validate_sdl("type Query { a: Int }\ntype Query { b: Int }");
        assert_eq!(errors, vec!["There can be only one type named \"Query\"."]);
    }

    #[test]
    fn test_duplicate_directive_definitions() {
        let errors = validate_sdl("directive @a on FIELD\ndirective @a on FIELD");
        assert_eq!(errors, vec!["There can be only one directive named \"@a\"."]);
    }

    #[test]
    fn test_extension_of_undefined_type() {
        let errors = validate_sdl("extend type Mutation { save: Boolean }");
        assert_eq!(
            errors,
            vec!["Cannot extend type \"Mutation\" because it is not defined."]
        );
    }

    #[test]
    fn test_duplicate_field_across_extension() {
        let errors = validate_sdl("type Query { a: Int }\nextend type Query { a: Int }");
        assert_eq!(errors, vec!["Field \"Query.a\" can only be defined once."]);
    }

    #[test]
    fn test_duplicate_enum_value() {
        let errors = validate_sdl("enum Color { RED RED }");
        assert_eq!(errors, vec!["Enum value \"Color.RED\" can only be defined once."]);
    }

    #[test]
    fn test_unknown_argument_and_union_member_types() {
        let errors = validate_sdl("type Query { a(filter: Filter): Int }\nunion Any = Query | Missing");
        assert_eq!(
            errors,
            vec!["Unknown type \"Filter\".", "Unknown type \"Missing\"."]
        );
    }

    #[test]
    fn test_multiple_schema_definitions() {
        let errors = validate_sdl(
            "type Query { a: Int }\nschema { query: Query }\nschema { query: Query }",
        );
        assert_eq!(errors, vec!["Must provide only one schema definition."]);
    }

    #[test]
    fn test_parse_error_is_reported() {
        let errors = validate_sdl("type Query {");
        assert_eq!(errors.len(), 1);
    }
}
