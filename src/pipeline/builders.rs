/// Pure pipeline builders.
///
/// Each function maps request parameters to an ordered stage sequence and
/// performs no IO; execution happens in [`super::executor`].
use super::{Collection, FieldExpr, Filter, SortDirection, Stage};
use crate::error::ApiResult;
use serde_json::Value;

/// Public field subset joined in place of a raw owner reference
fn owner_projection() -> Vec<Stage> {
    vec![Stage::Project(vec![
        "id".to_string(),
        "fullName".to_string(),
        "username".to_string(),
        "avatar".to_string(),
    ])]
}

/// Channel profile for `username` as seen by an optional viewer.
///
/// Joins the subscription edges in both directions, derives the counts and
/// the viewer's `isSubscribed` flag, and projects the public field set.
pub fn channel_profile(username: &str, viewer_id: Option<&str>) -> Vec<Stage> {
    let viewer = viewer_id
        .map(|id| Value::String(id.to_string()))
        .unwrap_or(Value::Null);

    vec![
        Stage::Match(Filter::Eq {
            field: "username".to_string(),
            value: Value::String(username.trim().to_lowercase()),
        }),
        Stage::Lookup {
            from: Collection::Subscriptions,
            local_field: "id".to_string(),
            foreign_field: "channelId".to_string(),
            as_field: "subscribers".to_string(),
            pipeline: Vec::new(),
        },
        Stage::Lookup {
            from: Collection::Subscriptions,
            local_field: "id".to_string(),
            foreign_field: "subscriberId".to_string(),
            as_field: "subscribedTo".to_string(),
            pipeline: Vec::new(),
        },
        Stage::AddFields(vec![
            (
                "subscribersCount".to_string(),
                FieldExpr::Size {
                    field: "subscribers".to_string(),
                },
            ),
            (
                "channelsSubscribedToCount".to_string(),
                FieldExpr::Size {
                    field: "subscribedTo".to_string(),
                },
            ),
            (
                "isSubscribed".to_string(),
                FieldExpr::Contains {
                    field: "subscribers".to_string(),
                    sub_field: "subscriberId".to_string(),
                    value: viewer,
                },
            ),
        ]),
        Stage::Project(vec![
            "id".to_string(),
            "fullName".to_string(),
            "username".to_string(),
            "subscribersCount".to_string(),
            "channelsSubscribedToCount".to_string(),
            "isSubscribed".to_string(),
            "avatar".to_string(),
            "coverImage".to_string(),
            "email".to_string(),
        ]),
    ]
}

/// Watch history for a user, resolved to full video documents.
///
/// The lookup preserves the order of the stored id list; each video's owner
/// is sub-joined, trimmed to public fields and collapsed to a single object.
pub fn watch_history(user_id: &str) -> Vec<Stage> {
    vec![
        Stage::Match(Filter::Eq {
            field: "id".to_string(),
            value: Value::String(user_id.to_string()),
        }),
        Stage::Lookup {
            from: Collection::Videos,
            local_field: "watchHistory".to_string(),
            foreign_field: "id".to_string(),
            as_field: "watchHistory".to_string(),
            pipeline: vec![
                Stage::Lookup {
                    from: Collection::Users,
                    local_field: "ownerId".to_string(),
                    foreign_field: "id".to_string(),
                    as_field: "owner".to_string(),
                    pipeline: owner_projection(),
                },
                Stage::AddFields(vec![(
                    "owner".to_string(),
                    FieldExpr::First {
                        field: "owner".to_string(),
                    },
                )]),
            ],
        },
    ]
}

/// Video listing with optional text search, owner filter and sort.
///
/// The match stage is omitted entirely when neither filter is present. Sort
/// is applied only when both field and direction are given (the direction
/// must parse as `asc`/`desc`); otherwise newest-created-first. Pagination is
/// applied by the paged executor on top of these stages.
pub fn video_listing(
    search: Option<&str>,
    owner_id: Option<&str>,
    sort_by: Option<&str>,
    sort_type: Option<&str>,
) -> ApiResult<Vec<Stage>> {
    // Reject a bad direction before anything else, even without a sort field.
    let direction = sort_type.map(SortDirection::parse).transpose()?;

    let mut stages = Vec::new();

    let mut filters = Vec::new();
    if let Some(needle) = search.map(str::trim).filter(|s| !s.is_empty()) {
        filters.push(Filter::Text {
            fields: vec!["title".to_string(), "description".to_string()],
            needle: needle.to_string(),
        });
    }
    if let Some(owner) = owner_id.map(str::trim).filter(|s| !s.is_empty()) {
        filters.push(Filter::Eq {
            field: "ownerId".to_string(),
            value: Value::String(owner.to_string()),
        });
    }
    match filters.len() {
        0 => {}
        1 => stages.push(Stage::Match(filters.remove(0))),
        _ => stages.push(Stage::Match(Filter::All(filters))),
    }

    let sort = match (sort_by.map(str::trim).filter(|s| !s.is_empty()), direction) {
        (Some(field), Some(direction)) => Stage::Sort {
            field: field.to_string(),
            direction,
        },
        _ => Stage::Sort {
            field: "createdAt".to_string(),
            direction: SortDirection::Descending,
        },
    };
    stages.push(sort);

    stages.push(Stage::Lookup {
        from: Collection::Users,
        local_field: "ownerId".to_string(),
        foreign_field: "id".to_string(),
        as_field: "owner".to_string(),
        pipeline: owner_projection(),
    });
    stages.push(Stage::AddFields(vec![(
        "owner".to_string(),
        FieldExpr::First {
            field: "owner".to_string(),
        },
    )]));

    Ok(stages)
}
