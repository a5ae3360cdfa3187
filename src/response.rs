//! Response helpers: plain JSON and HAL bodies, Location and paging Link headers.

use crate::config::{Operation, ResolvedResource};
use crate::service::PageInfo;
use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::{json, Map, Value};

pub const JSON: &str = "application/json";
pub const HAL_JSON: &str = "application/hal+json";

/// True when the resource supports HAL and the client asked for it.
pub fn wants_hal(resource: &ResolvedResource, headers: &HeaderMap) -> bool {
    resource.hal
        && headers
            .get_all(header::ACCEPT)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .any(accepts_hal)
}

/// One Accept entry: the HAL media type with a non-zero quality.
fn accepts_hal(entry: &str) -> bool {
    let mut parts = entry.split(';').map(str::trim);
    if !parts.next().is_some_and(|media| media.eq_ignore_ascii_case(HAL_JSON)) {
        return false;
    }
    parts
        .filter_map(|p| p.split_once('='))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("q"))
        .map(|(_, q)| q.trim().parse::<f32>().map(|q| q > 0.0).unwrap_or(false))
        .unwrap_or(true)
}

/// Collection URL of a resource, e.g. "/api/member".
pub fn collection_href(root_path: &str, resource: &ResolvedResource) -> String {
    format!("{}/{}", root_path, resource.path)
}

pub fn record_href(root_path: &str, resource: &ResolvedResource, id: &str) -> String {
    format!("{}/{}", collection_href(root_path, resource), id)
}

/// Serialize `body` with the right content type.
pub fn json_response(status: StatusCode, body: &Value, hal: bool) -> Response {
    let content_type = if hal { HAL_JSON } else { JSON };
    let mut response = (status, body.to_string()).into_response();
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

/// 201 with a Location header pointing at the new record.
pub fn created(location: &str, body: &Value, hal: bool) -> Response {
    let mut response = json_response(StatusCode::CREATED, body, hal);
    if let Ok(v) = HeaderValue::from_str(location) {
        response.headers_mut().insert(header::LOCATION, v);
    }
    response
}

fn href(url: String) -> Value {
    json!({ "href": url })
}

/// `_links` for one record. Only exposed operations are advertised.
pub fn record_links(root_path: &str, resource: &ResolvedResource, id: &str) -> Value {
    let collection = collection_href(root_path, resource);
    let this = record_href(root_path, resource, id);
    let mut links = Map::new();
    links.insert("self".into(), href(this.clone()));
    for op in resource.exposed_operations() {
        let (rel, url) = match op {
            Operation::List => ("list", collection.clone()),
            Operation::Create => ("add", collection.clone()),
            Operation::Update => ("update", this.clone()),
            Operation::Delete => ("remove", this.clone()),
            Operation::Get => continue,
        };
        links.insert(rel.into(), href(url));
    }
    Value::Object(links)
}

/// `_links` for the collection.
pub fn collection_links(root_path: &str, resource: &ResolvedResource) -> Value {
    let collection = collection_href(root_path, resource);
    let mut links = Map::new();
    if resource.is_exposed(Operation::List) {
        links.insert("list".into(), href(collection.clone()));
    }
    if resource.is_exposed(Operation::Create) {
        links.insert("add".into(), href(collection));
    }
    Value::Object(links)
}

/// Attach `_links` to a record body.
pub fn hal_record(root_path: &str, resource: &ResolvedResource, mut body: Value) -> Value {
    let id = body
        .get(&resource.entity.id.field)
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_default();
    if let Value::Object(map) = &mut body {
        map.insert("_links".into(), record_links(root_path, resource, &id));
    }
    body
}

pub fn hal_collection(root_path: &str, resource: &ResolvedResource, items: Vec<Value>) -> Value {
    let embedded: Vec<Value> = items
        .into_iter()
        .map(|item| hal_record(root_path, resource, item))
        .collect();
    json!({
        "_embedded": { resource.hal_collection_name.as_str(): embedded },
        "_links": collection_links(root_path, resource),
    })
}

/// Minimal query-component escaping for values echoed back into Link URLs.
fn escape_query(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            ' ' => out.push_str("%20"),
            '&' => out.push_str("%26"),
            '#' => out.push_str("%23"),
            '+' => out.push_str("%2B"),
            '=' => out.push_str("%3D"),
            '%' => out.push_str("%25"),
            '<' => out.push_str("%3C"),
            '>' => out.push_str("%3E"),
            '"' => out.push_str("%22"),
            _ => out.push(c),
        }
    }
    out
}

/// RFC 8288 Link header with first/last and, when they exist, prev/next.
/// Sort parameters are carried into every link.
pub fn page_links(collection: &str, sort: &[&str], page: &PageInfo) -> String {
    let sort_query: String = sort
        .iter()
        .map(|s| format!("&sort={}", escape_query(s)))
        .collect();
    let link = |index: u32, rel: &str| {
        format!(
            "<{}?page={}&size={}{}>; rel=\"{}\"",
            collection, index, page.size, sort_query, rel
        )
    };
    let last = page.last_index();
    let mut links = vec![link(0, "first"), link(last, "last")];
    if page.index > 0 {
        links.push(link((page.index - 1).min(last), "prev"));
    }
    if page.index < last {
        links.push(link(page.index + 1, "next"));
    }
    links.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, EntityConfig, FieldConfig, FieldType, FullConfig, ResourceConfig};

    fn resource(configure: impl FnOnce(&mut ResourceConfig)) -> ResolvedResource {
        let mut r = ResourceConfig::new("MemberResource", "member");
        r.hal = true;
        configure(&mut r);
        let config = FullConfig {
            entities: vec![EntityConfig {
                id: "member".into(),
                name: "Member".into(),
                schema: None,
                table: None,
                id_field: Default::default(),
                fields: vec![FieldConfig::new("name", FieldType::String)],
            }],
            resources: vec![r],
        };
        resolve(&config).unwrap().resources.remove(0)
    }

    #[test]
    fn hal_only_on_request() {
        let r = resource(|_| {});
        let mut headers = HeaderMap::new();
        assert!(!wants_hal(&r, &headers));
        headers.insert(header::ACCEPT, HeaderValue::from_static("text/plain, application/hal+json;q=0.9"));
        assert!(wants_hal(&r, &headers));
        let plain = resource(|r| r.hal = false);
        assert!(!wants_hal(&plain, &headers));
    }

    #[test]
    fn zero_quality_refuses_hal() {
        let r = resource(|_| {});
        let accept = |value: &'static str| {
            let mut headers = HeaderMap::new();
            headers.insert(header::ACCEPT, HeaderValue::from_static(value));
            wants_hal(&r, &headers)
        };
        assert!(!accept("application/hal+json;q=0"));
        assert!(!accept("application/json, application/hal+json; q=0.0"));
        assert!(accept("application/hal+json; q=0.5"));
        assert!(accept("APPLICATION/HAL+JSON"));
        assert!(!accept("application/hal+jsonx"));
    }

    #[test]
    fn record_links_skip_suppressed_operations() {
        let r = resource(|r| r.methods.delete.exposed = false);
        let links = record_links("/api", &r, "7");
        assert_eq!(links["self"]["href"], "/api/member/7");
        assert_eq!(links["update"]["href"], "/api/member/7");
        assert_eq!(links["add"]["href"], "/api/member");
        assert!(links.get("remove").is_none());
    }

    #[test]
    fn hal_collection_embeds_records() {
        let r = resource(|r| r.hal_collection_name = Some("members".into()));
        let body = hal_collection("", &r, vec![json!({"id": 1, "name": "Ada"})]);
        assert_eq!(body["_embedded"]["members"][0]["_links"]["self"]["href"], "/member/1");
        assert_eq!(body["_links"]["list"]["href"], "/member");
    }

    #[test]
    fn page_links_middle_page() {
        let info = PageInfo {
            index: 1,
            size: 2,
            total: 5,
        };
        let header = page_links("/member", &["-name"], &info);
        assert_eq!(
            header,
            "</member?page=0&size=2&sort=-name>; rel=\"first\", \
             </member?page=2&size=2&sort=-name>; rel=\"last\", \
             </member?page=0&size=2&sort=-name>; rel=\"prev\", \
             </member?page=2&size=2&sort=-name>; rel=\"next\""
        );
    }

    #[test]
    fn page_links_single_page() {
        let info = PageInfo {
            index: 0,
            size: 20,
            total: 3,
        };
        let header = page_links("/member", &[], &info);
        assert!(!header.contains("prev"));
        assert!(!header.contains("next"));
    }
}
