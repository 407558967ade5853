/// Pipeline interpreter.
///
/// Runs a stage sequence over JSON documents. Collections are fetched
/// through [`DocumentSource`], so the interpreter itself is storage-agnostic
/// and testable against in-memory fixtures.
use super::{Collection, FieldExpr, Filter, Page, PageRequest, SortDirection, Stage};
use crate::error::ApiResult;
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Seam between the interpreter and storage
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Fetch every document of a collection in its camelCase JSON form
    async fn scan(&self, collection: Collection) -> ApiResult<Vec<Value>>;
}

/// Run a pipeline against a collection
pub async fn aggregate(
    source: &dyn DocumentSource,
    collection: Collection,
    stages: &[Stage],
) -> ApiResult<Vec<Value>> {
    let docs = source.scan(collection).await?;
    run(source, docs, stages).await
}

/// Run a pipeline and slice one page out of the result.
///
/// The count metadata reflects the filtered/sorted set before skip/limit.
pub async fn aggregate_paginate(
    source: &dyn DocumentSource,
    collection: Collection,
    stages: &[Stage],
    page: &PageRequest,
) -> ApiResult<Page<Value>> {
    let docs = aggregate(source, collection, stages).await?;
    let total_docs = docs.len() as u64;
    let total_pages = total_docs.div_ceil(page.page_size);

    let docs = docs
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.page_size as usize)
        .collect();

    Ok(Page {
        docs,
        total_docs,
        page: page.page,
        page_size: page.page_size,
        total_pages,
    })
}

// Boxed so lookups with nested pipelines can recurse.
fn run<'a>(
    source: &'a dyn DocumentSource,
    docs: Vec<Value>,
    stages: &'a [Stage],
) -> BoxFuture<'a, ApiResult<Vec<Value>>> {
    Box::pin(async move {
        let mut docs = docs;
        for stage in stages {
            docs = match stage {
                Stage::Match(filter) => docs.into_iter().filter(|d| matches(filter, d)).collect(),
                Stage::Lookup {
                    from,
                    local_field,
                    foreign_field,
                    as_field,
                    pipeline,
                } => {
                    let foreign = source.scan(*from).await?;
                    let mut joined_docs = Vec::with_capacity(docs.len());
                    for mut doc in docs {
                        let joined =
                            join(&foreign, field(&doc, local_field), foreign_field);
                        let joined = run(source, joined, pipeline).await?;
                        if let Value::Object(map) = &mut doc {
                            map.insert(as_field.clone(), Value::Array(joined));
                        }
                        joined_docs.push(doc);
                    }
                    joined_docs
                }
                Stage::AddFields(fields) => docs
                    .into_iter()
                    .map(|mut doc| {
                        let derived: Vec<(String, Value)> = fields
                            .iter()
                            .map(|(name, expr)| (name.clone(), eval(expr, &doc)))
                            .collect();
                        if let Value::Object(map) = &mut doc {
                            for (name, value) in derived {
                                map.insert(name, value);
                            }
                        }
                        doc
                    })
                    .collect(),
                Stage::Project(fields) => docs
                    .into_iter()
                    .map(|doc| project(doc, fields))
                    .collect(),
                Stage::Sort { field: by, direction } => {
                    docs.sort_by(|a, b| {
                        let ord = cmp_values(field(a, by), field(b, by));
                        match direction {
                            SortDirection::Ascending => ord,
                            SortDirection::Descending => ord.reverse(),
                        }
                    });
                    docs
                }
                Stage::Skip(n) => docs.into_iter().skip(*n as usize).collect(),
                Stage::Limit(n) => docs.into_iter().take(*n as usize).collect(),
            };
        }
        Ok(docs)
    })
}

/// Collect foreign documents matching the local value. An array local value
/// joins element by element, preserving the array's order.
fn join(foreign: &[Value], local: &Value, foreign_field: &str) -> Vec<Value> {
    let mut out = Vec::new();
    match local {
        Value::Array(keys) => {
            for key in keys {
                out.extend(
                    foreign
                        .iter()
                        .filter(|doc| field(doc, foreign_field) == key)
                        .cloned(),
                );
            }
        }
        key => out.extend(
            foreign
                .iter()
                .filter(|doc| field(doc, foreign_field) == key)
                .cloned(),
        ),
    }
    out
}

fn matches(filter: &Filter, doc: &Value) -> bool {
    match filter {
        Filter::Eq { field: name, value } => field(doc, name) == value,
        Filter::Text { fields, needle } => {
            let needle = needle.to_lowercase();
            fields.iter().any(|name| {
                field(doc, name)
                    .as_str()
                    .is_some_and(|text| text.to_lowercase().contains(&needle))
            })
        }
        Filter::All(filters) => filters.iter().all(|f| matches(f, doc)),
    }
}

fn eval(expr: &FieldExpr, doc: &Value) -> Value {
    match expr {
        FieldExpr::Size { field: name } => {
            let len = field(doc, name).as_array().map_or(0, Vec::len);
            Value::from(len as u64)
        }
        FieldExpr::First { field: name } => field(doc, name)
            .as_array()
            .and_then(|arr| arr.first())
            .cloned()
            .unwrap_or(Value::Null),
        FieldExpr::Contains {
            field: name,
            sub_field,
            value,
        } => {
            // A null probe is never contained
            if value.is_null() {
                return Value::Bool(false);
            }
            let contained = field(doc, name).as_array().is_some_and(|arr| {
                arr.iter().any(|elem| field(elem, sub_field) == value)
            });
            Value::Bool(contained)
        }
    }
}

fn project(doc: Value, fields: &[String]) -> Value {
    let Value::Object(map) = doc else {
        return doc;
    };
    let kept: Map<String, Value> = map
        .into_iter()
        .filter(|(key, _)| fields.iter().any(|f| f == key))
        .collect();
    Value::Object(kept)
}

fn field<'a>(doc: &'a Value, name: &str) -> &'a Value {
    doc.get(name).unwrap_or(&Value::Null)
}

/// Total order over JSON values: null < bool < number < string < array < object
fn cmp_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::builders;
    use serde_json::json;
    use std::collections::HashMap;

    struct MemorySource {
        collections: HashMap<Collection, Vec<Value>>,
    }

    #[async_trait]
    impl DocumentSource for MemorySource {
        async fn scan(&self, collection: Collection) -> ApiResult<Vec<Value>> {
            Ok(self.collections.get(&collection).cloned().unwrap_or_default())
        }
    }

    fn fixture() -> MemorySource {
        let users = vec![
            json!({
                "id": "u1", "username": "ana", "email": "a@x.com", "fullName": "Ana",
                "avatar": "http://cdn/a.png", "coverImage": null,
                "watchHistory": ["v3", "v1"], "createdAt": "2024-01-01T00:00:00Z"
            }),
            json!({
                "id": "u2", "username": "bo", "email": "b@x.com", "fullName": "Bo",
                "avatar": "http://cdn/b.png", "coverImage": "http://cdn/bc.png",
                "watchHistory": [], "createdAt": "2024-01-02T00:00:00Z"
            }),
            json!({
                "id": "u3", "username": "cy", "email": "c@x.com", "fullName": "Cy",
                "avatar": "http://cdn/c.png", "coverImage": null,
                "watchHistory": [], "createdAt": "2024-01-03T00:00:00Z"
            }),
        ];

        // u2 and u3 subscribe to ana; ana subscribes to bo
        let subscriptions = vec![
            json!({"id": "s1", "subscriberId": "u2", "channelId": "u1"}),
            json!({"id": "s2", "subscriberId": "u3", "channelId": "u1"}),
            json!({"id": "s3", "subscriberId": "u1", "channelId": "u2"}),
        ];

        let videos = vec![
            json!({
                "id": "v1", "title": "Rust streams", "description": "async deep dive",
                "ownerId": "u1", "duration": 300.0, "views": 12, "isPublished": true,
                "createdAt": "2024-02-01T00:00:00Z"
            }),
            json!({
                "id": "v2", "title": "Cooking pasta", "description": "carbonara, no cream",
                "ownerId": "u2", "duration": 600.0, "views": 40, "isPublished": true,
                "createdAt": "2024-02-02T00:00:00Z"
            }),
            json!({
                "id": "v3", "title": "Bike repair", "description": "fixing a rusty chain",
                "ownerId": "u2", "duration": 120.0, "views": 7, "isPublished": true,
                "createdAt": "2024-02-03T00:00:00Z"
            }),
            json!({
                "id": "v4", "title": "Sourdough", "description": "starter care",
                "ownerId": "u1", "duration": 900.0, "views": 3, "isPublished": false,
                "createdAt": "2024-02-04T00:00:00Z"
            }),
        ];

        let mut collections = HashMap::new();
        collections.insert(Collection::Users, users);
        collections.insert(Collection::Subscriptions, subscriptions);
        collections.insert(Collection::Videos, videos);
        MemorySource { collections }
    }

    #[tokio::test]
    async fn test_channel_profile_counts_and_flag() {
        let source = fixture();
        let stages = builders::channel_profile("Ana", Some("u2"));
        let docs = aggregate(&source, Collection::Users, &stages).await.unwrap();

        assert_eq!(docs.len(), 1);
        let channel = &docs[0];
        assert_eq!(channel["username"], "ana");
        assert_eq!(channel["subscribersCount"], 2);
        assert_eq!(channel["channelsSubscribedToCount"], 1);
        // u2 subscribes to ana
        assert_eq!(channel["isSubscribed"], true);
        // projection keeps only the public field set
        assert!(channel.get("watchHistory").is_none());
    }

    #[tokio::test]
    async fn test_channel_profile_not_subscribed_viewer() {
        let source = fixture();

        // ana does not subscribe to herself
        let stages = builders::channel_profile("ana", Some("u1"));
        let docs = aggregate(&source, Collection::Users, &stages).await.unwrap();
        assert_eq!(docs[0]["isSubscribed"], false);

        // anonymous viewer
        let stages = builders::channel_profile("ana", None);
        let docs = aggregate(&source, Collection::Users, &stages).await.unwrap();
        assert_eq!(docs[0]["isSubscribed"], false);
    }

    #[tokio::test]
    async fn test_channel_profile_unknown_username_is_empty() {
        let source = fixture();
        let stages = builders::channel_profile("nobody", None);
        let docs = aggregate(&source, Collection::Users, &stages).await.unwrap();
        assert!(docs.is_empty());
    }

    #[tokio::test]
    async fn test_watch_history_preserves_order_and_collapses_owner() {
        let source = fixture();
        let stages = builders::watch_history("u1");
        let docs = aggregate(&source, Collection::Users, &stages).await.unwrap();

        assert_eq!(docs.len(), 1);
        let history = docs[0]["watchHistory"].as_array().unwrap();
        // stored order v3, v1 survives the join
        assert_eq!(history.len(), 2);
        assert_eq!(history[0]["id"], "v3");
        assert_eq!(history[1]["id"], "v1");

        // owner collapsed to one public object
        let owner = &history[0]["owner"];
        assert_eq!(owner["username"], "bo");
        assert!(owner.get("email").is_none());
        assert!(owner.get("watchHistory").is_none());
    }

    #[tokio::test]
    async fn test_watch_history_empty_is_not_an_error() {
        let source = fixture();
        let stages = builders::watch_history("u2");
        let docs = aggregate(&source, Collection::Users, &stages).await.unwrap();
        assert_eq!(docs[0]["watchHistory"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_watch_history_drops_dangling_ids() {
        let mut source = fixture();
        source
            .collections
            .get_mut(&Collection::Users)
            .unwrap()[0]["watchHistory"] = json!(["v3", "gone", "v1"]);

        let stages = builders::watch_history("u1");
        let docs = aggregate(&source, Collection::Users, &stages).await.unwrap();
        let history = docs[0]["watchHistory"].as_array().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0]["id"], "v3");
        assert_eq!(history[1]["id"], "v1");
    }

    #[tokio::test]
    async fn test_listing_default_sort_newest_first() {
        let source = fixture();
        let stages = builders::video_listing(None, None, None, None).unwrap();
        let docs = aggregate(&source, Collection::Videos, &stages).await.unwrap();

        let ids: Vec<&str> = docs.iter().map(|d| d["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["v4", "v3", "v2", "v1"]);
        // owner joined as a single public object
        assert_eq!(docs[0]["owner"]["username"], "ana");
    }

    #[tokio::test]
    async fn test_listing_text_search_is_case_insensitive() {
        let source = fixture();
        let stages = builders::video_listing(Some("RUST"), None, None, None).unwrap();
        let docs = aggregate(&source, Collection::Videos, &stages).await.unwrap();

        // matches "Rust streams" (title) and "fixing a rusty chain" (description)
        let ids: Vec<&str> = docs.iter().map(|d| d["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["v3", "v1"]);
    }

    #[tokio::test]
    async fn test_listing_owner_filter_and_sort() {
        let source = fixture();
        let stages =
            builders::video_listing(None, Some("u1"), Some("duration"), Some("asc")).unwrap();
        let docs = aggregate(&source, Collection::Videos, &stages).await.unwrap();

        let ids: Vec<&str> = docs.iter().map(|d| d["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["v1", "v4"]);
    }

    #[tokio::test]
    async fn test_pagination_pages_are_disjoint_and_ordered() {
        let source = fixture();
        let stages = builders::video_listing(None, None, None, None).unwrap();

        let first = aggregate_paginate(
            &source,
            Collection::Videos,
            &stages,
            &PageRequest::new(1, 2).unwrap(),
        )
        .await
        .unwrap();
        let second = aggregate_paginate(
            &source,
            Collection::Videos,
            &stages,
            &PageRequest::new(2, 2).unwrap(),
        )
        .await
        .unwrap();

        assert_eq!(first.total_docs, 4);
        assert_eq!(first.total_pages, 2);
        let first_ids: Vec<&str> = first.docs.iter().map(|d| d["id"].as_str().unwrap()).collect();
        let second_ids: Vec<&str> =
            second.docs.iter().map(|d| d["id"].as_str().unwrap()).collect();
        assert_eq!(first_ids, vec!["v4", "v3"]);
        assert_eq!(second_ids, vec!["v2", "v1"]);
        assert!(first_ids.iter().all(|id| !second_ids.contains(id)));
    }

    #[tokio::test]
    async fn test_pagination_past_the_end_is_empty() {
        let source = fixture();
        let stages = builders::video_listing(None, None, None, None).unwrap();
        let page = aggregate_paginate(
            &source,
            Collection::Videos,
            &stages,
            &PageRequest::new(5, 10).unwrap(),
        )
        .await
        .unwrap();
        assert!(page.docs.is_empty());
        assert_eq!(page.total_docs, 4);
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn test_cmp_values_orders_mixed_types() {
        assert_eq!(
            cmp_values(&Value::Null, &json!("a")),
            Ordering::Less
        );
        assert_eq!(cmp_values(&json!(2), &json!(10)), Ordering::Less);
        assert_eq!(cmp_values(&json!("b"), &json!("a")), Ordering::Greater);
    }
}
