//! OpenAPI 3.1 document describing the generated resources.

use crate::case::to_camel_case;
use crate::config::{ColumnInfo, FieldType, IdStrategy, Operation, ResolvedEntity, ResolvedModel, ResolvedResource};
use crate::response::{HAL_JSON, JSON};
use crate::state::AppState;
use axum::{extract::State, Json};
use utoipa::openapi::{
    path::{HttpMethod, OperationBuilder, ParameterBuilder, ParameterIn, PathItemBuilder},
    request_body::RequestBodyBuilder,
    schema::{ArrayBuilder, KnownFormat, ObjectBuilder, SchemaFormat, SchemaType, Type},
    ComponentsBuilder, ContentBuilder, InfoBuilder, OpenApi, OpenApiBuilder, PathsBuilder, Ref, RefOr, Required,
    ResponseBuilder, Schema,
};

pub async fn openapi(State(state): State<AppState>) -> Json<OpenApi> {
    Json(openapi_document(&state.model, &state.root_path))
}

/// Build the document: one path pair per resource (suppressed operations omitted) and one schema per entity.
pub fn openapi_document(model: &ResolvedModel, root_path: &str) -> OpenApi {
    let mut paths = PathsBuilder::new();
    for resource in &model.resources {
        let collection = format!("{}/{}", root_path, resource.path);
        let item = format!("{}/{{{}}}", collection, resource.entity.id.field);
        let mut collection_ops = Vec::new();
        let mut record_ops = Vec::new();
        for op in resource.exposed_operations() {
            let operation = describe(resource, op);
            match op {
                Operation::List => collection_ops.push((HttpMethod::Get, operation)),
                Operation::Create => collection_ops.push((HttpMethod::Post, operation)),
                Operation::Get => record_ops.push((HttpMethod::Get, operation)),
                Operation::Update => record_ops.push((HttpMethod::Put, operation)),
                Operation::Delete => record_ops.push((HttpMethod::Delete, operation)),
            }
        }
        for (url, ops) in [(collection, collection_ops), (item, record_ops)] {
            if ops.is_empty() {
                continue;
            }
            let path_item = ops
                .into_iter()
                .fold(PathItemBuilder::new(), |b, (method, operation)| b.operation(method, operation))
                .build();
            paths = paths.path(url, path_item);
        }
    }

    let mut components = ComponentsBuilder::new();
    for entity in &model.entities {
        components = components.schema(entity.name.clone(), entity_schema(entity));
    }

    OpenApiBuilder::new()
        .info(
            InfoBuilder::new()
                .title(env!("CARGO_PKG_NAME"))
                .version(env!("CARGO_PKG_VERSION"))
                .build(),
        )
        .paths(paths.build())
        .components(Some(components.build()))
        .build()
}

fn schema_ref(entity: &ResolvedEntity) -> RefOr<Schema> {
    RefOr::Ref(Ref::from_schema_name(entity.name.clone()))
}

fn content(schema: RefOr<Schema>) -> utoipa::openapi::Content {
    ContentBuilder::new().schema(Some(schema)).build()
}

fn describe(resource: &ResolvedResource, op: Operation) -> utoipa::openapi::path::Operation {
    let entity = &resource.entity;
    let record = schema_ref(entity);
    let mut builder = OperationBuilder::new()
        .operation_id(Some(to_camel_case(&format!("{}-{}", op.as_str(), resource.path.replace('/', "-")))))
        .tags(Some(vec![resource.name.clone()]));

    if matches!(op, Operation::Get | Operation::Update | Operation::Delete) {
        let id_schema = ObjectBuilder::new().schema_type(id_type(entity)).build();
        builder = builder.parameter(
            ParameterBuilder::new()
                .name(entity.id.field.clone())
                .parameter_in(ParameterIn::Path)
                .required(Required::True)
                .schema(Some(RefOr::T(Schema::Object(id_schema))))
                .build(),
        );
    }
    if matches!(op, Operation::Create | Operation::Update) {
        builder = builder.request_body(Some(
            RequestBodyBuilder::new()
                .content(JSON, content(record.clone()))
                .required(Some(Required::True))
                .build(),
        ));
    }

    let with_record = |description: &str| {
        let mut response = ResponseBuilder::new()
            .description(description)
            .content(JSON, content(record.clone()));
        if resource.hal {
            response = response.content(HAL_JSON, content(record.clone()));
        }
        response.build()
    };
    let not_found = ResponseBuilder::new().description("No record with this identity").build();
    let bad_request = ResponseBuilder::new().description("Malformed request").build();

    builder = match op {
        Operation::List => {
            let array = ArrayBuilder::new().items(record.clone()).build();
            let mut ok = ResponseBuilder::new()
                .description("All records")
                .content(JSON, content(RefOr::T(Schema::Array(array))));
            if resource.hal {
                ok = ok.content(HAL_JSON, content(RefOr::T(Schema::Object(ObjectBuilder::new().build()))));
            }
            if resource.paged {
                for name in ["page", "size"] {
                    builder = builder.parameter(query_parameter(name, Type::Integer));
                }
            }
            builder
                .parameter(query_parameter("sort", Type::String))
                .response("200", ok.build())
                .response("400", bad_request)
        }
        Operation::Get => builder
            .response("200", with_record("The record"))
            .response("404", not_found),
        Operation::Create => builder
            .response("201", with_record("Created; Location points at the new record"))
            .response("400", bad_request)
            .response("422", ResponseBuilder::new().description("Validation failed").build()),
        Operation::Update => builder
            .response("201", with_record("Created with the requested identity"))
            .response("204", ResponseBuilder::new().description("Replaced").build())
            .response("400", bad_request)
            .response("422", ResponseBuilder::new().description("Validation failed").build()),
        Operation::Delete => builder
            .response("204", ResponseBuilder::new().description("Deleted").build())
            .response("404", not_found),
    };
    builder.build()
}

fn query_parameter(name: &str, type_: Type) -> utoipa::openapi::path::Parameter {
    ParameterBuilder::new()
        .name(name)
        .parameter_in(ParameterIn::Query)
        .required(Required::False)
        .schema(Some(RefOr::T(Schema::Object(
            ObjectBuilder::new().schema_type(type_).build(),
        ))))
        .build()
}

fn id_type(entity: &ResolvedEntity) -> Type {
    match entity.id.strategy {
        IdStrategy::Sequence => Type::Integer,
        IdStrategy::Uuid => Type::String,
    }
}

fn entity_schema(entity: &ResolvedEntity) -> RefOr<Schema> {
    let id_format = match entity.id.strategy {
        IdStrategy::Sequence => KnownFormat::Int64,
        IdStrategy::Uuid => KnownFormat::Uuid,
    };
    let mut object = ObjectBuilder::new().schema_type(Type::Object).property(
        entity.id.field.clone(),
        RefOr::T(Schema::Object(
            ObjectBuilder::new()
                .schema_type(id_type(entity))
                .format(Some(SchemaFormat::KnownFormat(id_format)))
                .read_only(Some(true))
                .build(),
        )),
    );
    for column in &entity.columns {
        object = object.property(column.field.clone(), RefOr::T(Schema::Object(field_schema(column))));
        if !column.nullable {
            object = object.required(column.field.clone());
        }
    }
    RefOr::T(Schema::Object(object.build()))
}

fn field_schema(column: &ColumnInfo) -> utoipa::openapi::schema::Object {
    let (type_, format) = match column.type_ {
        FieldType::String => (Type::String, column.format.clone().map(SchemaFormat::Custom)),
        FieldType::Integer => (Type::Integer, Some(SchemaFormat::KnownFormat(KnownFormat::Int64))),
        FieldType::Number => (Type::Number, Some(SchemaFormat::KnownFormat(KnownFormat::Double))),
        FieldType::Boolean => (Type::Boolean, None),
        FieldType::Date => (Type::String, Some(SchemaFormat::KnownFormat(KnownFormat::Date))),
        FieldType::Timestamp => (Type::String, Some(SchemaFormat::KnownFormat(KnownFormat::DateTime))),
    };
    let schema_type = if column.nullable {
        SchemaType::from_iter([type_, Type::Null])
    } else {
        SchemaType::Type(type_)
    };
    ObjectBuilder::new()
        .schema_type(schema_type)
        .format(format)
        .max_length(column.max_length.map(|n| n as usize))
        .min_length(column.min_length.map(|n| n as usize))
        .pattern(column.pattern.as_ref().map(|re| re.as_str().to_string()))
        .build()
}
