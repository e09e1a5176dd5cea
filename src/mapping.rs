//! Per-endpoint envelope normalization.
//!
//! The backend wraps every payload in a differently named field (`contents`,
//! `liked_contents`, `user`, `action`, ...). The table below is the single place
//! that knows those names; callers only ever see the normalized ones.

use serde_json::{Map, Value};

use crate::error::{ApiResult, ClientError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Login,
    Signup,
    Refresh,
    Profile,
    ListContent,
    GetContent,
    Shortlist,
    Categories,
    Search,
    Toggle,
    History,
    Liked,
    Saved,
    ForYou,
    Similar,
    Trending,
    AdminStats,
    AdminUsers,
    AdminUser,
    AdminContents,
    AdminContent,
    AdminDelete,
    AdminInteractions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Copy,
    /// `true` when the raw string equals the given literal.
    Equals(&'static str),
    /// Each raw entry is `{ record: {...}, embed: {...} }`; the embed is moved inside the record.
    Embed { record: &'static str, embed: &'static str },
}

#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub endpoint: Endpoint,
    pub raw: &'static str,
    pub normalized: &'static str,
    pub transform: Transform,
    pub required: bool,
}

const fn rule(endpoint: Endpoint, raw: &'static str, normalized: &'static str) -> FieldRule {
    FieldRule { endpoint, raw, normalized, transform: Transform::Copy, required: true }
}

const fn optional(endpoint: Endpoint, raw: &'static str, normalized: &'static str) -> FieldRule {
    FieldRule { endpoint, raw, normalized, transform: Transform::Copy, required: false }
}

pub const ENVELOPE_RULES: &[FieldRule] = &[
    rule(Endpoint::Login, "user", "user"),
    rule(Endpoint::Login, "access_token", "access_token"),
    rule(Endpoint::Login, "refresh_token", "refresh_token"),
    rule(Endpoint::Signup, "user", "user"),
    rule(Endpoint::Signup, "access_token", "access_token"),
    rule(Endpoint::Signup, "refresh_token", "refresh_token"),
    rule(Endpoint::Refresh, "access_token", "access_token"),
    rule(Endpoint::Profile, "user", "user"),
    rule(Endpoint::ListContent, "contents", "items"),
    rule(Endpoint::ListContent, "pagination", "cursor"),
    rule(Endpoint::GetContent, "content", "item"),
    rule(Endpoint::Shortlist, "contents", "items"),
    rule(Endpoint::Categories, "categories", "categories"),
    rule(Endpoint::Search, "contents", "items"),
    optional(Endpoint::Search, "pagination", "cursor"),
    FieldRule { endpoint: Endpoint::Toggle, raw: "action", normalized: "added", transform: Transform::Equals("added"), required: true },
    FieldRule {
        endpoint: Endpoint::History,
        raw: "reading_history",
        normalized: "records",
        transform: Transform::Embed { record: "interaction", embed: "content" },
        required: true,
    },
    optional(Endpoint::History, "pagination", "cursor"),
    rule(Endpoint::Liked, "liked_contents", "items"),
    rule(Endpoint::Saved, "bookmarked_contents", "items"),
    optional(Endpoint::Saved, "pagination", "cursor"),
    rule(Endpoint::ForYou, "recommendations", "items"),
    rule(Endpoint::Similar, "similar_contents", "items"),
    rule(Endpoint::Trending, "trending_contents", "items"),
    rule(Endpoint::AdminStats, "stats", "stats"),
    rule(Endpoint::AdminUsers, "users", "items"),
    rule(Endpoint::AdminUsers, "pagination", "cursor"),
    rule(Endpoint::AdminUser, "user", "user"),
    rule(Endpoint::AdminContents, "contents", "items"),
    rule(Endpoint::AdminContents, "pagination", "cursor"),
    rule(Endpoint::AdminContent, "content", "item"),
    optional(Endpoint::AdminDelete, "message", "message"),
    rule(Endpoint::AdminInteractions, "interactions", "records"),
    rule(Endpoint::AdminInteractions, "pagination", "cursor"),
];

pub fn rules_for(endpoint: Endpoint) -> impl Iterator<Item = &'static FieldRule> {
    ENVELOPE_RULES.iter().filter(move |r| r.endpoint == endpoint)
}

/// Rewrite a 2xx envelope into its normalized object.
///
/// A body with `success: false` is reported as an `Http` error even though the
/// status was 2xx.
pub fn normalize(endpoint: Endpoint, status: u16, body: Value) -> ApiResult<Value> {
    let Value::Object(mut raw) = body else {
        return Err(ClientError::Decode(format!("{endpoint:?}: envelope is not an object")));
    };
    if raw.get("success").and_then(Value::as_bool) == Some(false) {
        return Err(ClientError::Http { status, message: backend_message(&raw) });
    }
    let mut out = Map::new();
    for r in rules_for(endpoint) {
        let Some(value) = raw.remove(r.raw).filter(|v| !v.is_null()) else {
            if r.required {
                return Err(ClientError::Decode(format!("{endpoint:?}: missing field `{}`", r.raw)));
            }
            continue;
        };
        out.insert(r.normalized.to_string(), apply(endpoint, r.transform, value)?);
    }
    Ok(Value::Object(out))
}

fn apply(endpoint: Endpoint, transform: Transform, value: Value) -> ApiResult<Value> {
    match transform {
        Transform::Copy => Ok(value),
        Transform::Equals(lit) => match value {
            Value::String(s) => Ok(Value::Bool(s == lit)),
            Value::Bool(b) => Ok(Value::Bool(b)),
            other => Err(ClientError::Decode(format!("{endpoint:?}: expected string, got {other}"))),
        },
        Transform::Embed { record, embed } => {
            let Value::Array(entries) = value else {
                return Err(ClientError::Decode(format!("{endpoint:?}: expected array")));
            };
            let mut folded = Vec::with_capacity(entries.len());
            for entry in entries {
                let Value::Object(mut entry) = entry else {
                    return Err(ClientError::Decode(format!("{endpoint:?}: entry is not an object")));
                };
                let Some(Value::Object(mut rec)) = entry.remove(record) else {
                    return Err(ClientError::Decode(format!("{endpoint:?}: entry without `{record}`")));
                };
                if let Some(copy) = entry.remove(embed) { rec.insert(embed.to_string(), copy); }
                folded.push(Value::Object(rec));
            }
            Ok(Value::Array(folded))
        }
    }
}

/// The backend puts human-readable failures under `error`, sometimes `message`.
pub fn backend_message(raw: &Map<String, Value>) -> Option<String> {
    raw.get("error").or_else(|| raw.get("message")).and_then(Value::as_str).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_envelope_is_renamed() {
        let raw = json!({"success": true, "contents": [{"id": 1}], "pagination": {"page": 1}});
        let out = normalize(Endpoint::ListContent, 200, raw).unwrap();
        assert_eq!(out, json!({"items": [{"id": 1}], "cursor": {"page": 1}}));
    }

    #[test]
    fn toggle_action_becomes_boolean() {
        let added = normalize(Endpoint::Toggle, 200, json!({"success": true, "action": "added"})).unwrap();
        let removed = normalize(Endpoint::Toggle, 200, json!({"success": true, "action": "removed"})).unwrap();
        assert_eq!(added, json!({"added": true}));
        assert_eq!(removed, json!({"added": false}));
    }

    #[test]
    fn history_entries_fold_content_into_record() {
        let raw = json!({
            "success": true,
            "reading_history": [{"interaction": {"id": 4, "content_id": 9}, "content": {"id": 9}}]
        });
        let out = normalize(Endpoint::History, 200, raw).unwrap();
        assert_eq!(out, json!({"records": [{"id": 4, "content_id": 9, "content": {"id": 9}}]}));
    }

    #[test]
    fn missing_required_field_is_decode_failure() {
        let err = normalize(Endpoint::Liked, 200, json!({"success": true, "contents": []})).unwrap_err();
        assert!(matches!(err, ClientError::Decode(m) if m.contains("liked_contents")));
    }

    #[test]
    fn optional_field_may_be_absent() {
        let out = normalize(Endpoint::AdminDelete, 200, json!({"success": true})).unwrap();
        assert_eq!(out, json!({}));
    }

    #[test]
    fn success_false_is_http_error() {
        let err = normalize(Endpoint::Profile, 200, json!({"success": false, "error": "Compte désactivé"})).unwrap_err();
        assert_eq!(err, ClientError::Http { status: 200, message: Some("Compte désactivé".into()) });
    }

    #[test]
    fn login_envelope_keeps_tokens_and_drops_message() {
        let raw = json!({"success": true, "message": "Connexion réussie", "user": {"id": 1}, "access_token": "a", "refresh_token": "r"});
        let out = normalize(Endpoint::Login, 200, raw).unwrap();
        assert_eq!(out, json!({"user": {"id": 1}, "access_token": "a", "refresh_token": "r"}));
    }

    #[test]
    fn every_endpoint_has_a_rule() {
        use Endpoint::*;
        for e in [Login, Signup, Refresh, Profile, ListContent, GetContent, Shortlist, Categories, Search, Toggle, History, Liked, Saved, ForYou, Similar, Trending, AdminStats, AdminUsers, AdminUser, AdminContents, AdminContent, AdminDelete, AdminInteractions] {
            assert!(rules_for(e).next().is_some(), "{e:?} has no envelope rule");
        }
    }
}
