//! Discovery document: canonical URL, verbs and parameters of every generated route.

use crate::config::{ModelBinding, ResolvedResources};
use crate::query::{ID_KEY, WHERE_KEY};
use crate::service::Action;
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ParamDoc {
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
}

#[derive(Debug, Serialize)]
pub struct RouteDoc {
    pub url: String,
    pub methods: Vec<&'static str>,
    pub params: Vec<ParamDoc>,
}

#[derive(Debug, Serialize)]
pub struct ResourceDoc {
    pub model: String,
    pub singular: RouteDoc,
    pub plural: RouteDoc,
}

#[derive(Debug, Serialize)]
pub struct DiscoveryDoc {
    pub routes: Vec<ResourceDoc>,
}

fn query_params() -> Vec<ParamDoc> {
    let optional = |name, description| ParamDoc {
        name,
        description,
        required: false,
    };
    vec![
        optional(WHERE_KEY, "JSON object replacing the predicate built from other keys"),
        optional("skip", "number of matches to skip"),
        optional("limit", "maximum number of matches"),
        optional("sort", "\"field dir, ...\", an array of those, or {\"field\": \"asc\"|\"desc\"}"),
        optional("page", "zero-based page of `limit` matches, used when skip is absent"),
    ]
}

fn resource_doc(prefix: &str, b: &ModelBinding) -> ResourceDoc {
    let methods: Vec<&'static str> = Action::ALL.iter().map(Action::method).collect();
    let mut singular_params = vec![ParamDoc {
        name: ID_KEY,
        description: "optional path segment, folded into the predicate as `id`",
        required: false,
    }];
    singular_params.extend(query_params());
    ResourceDoc {
        model: b.model_name.clone(),
        singular: RouteDoc {
            url: format!("{}/{}/{{{}}}", prefix, b.singular_path, ID_KEY),
            methods: methods.clone(),
            params: singular_params,
        },
        plural: RouteDoc {
            url: format!("{}/{}", prefix, b.plural_path),
            methods,
            params: query_params(),
        },
    }
}

pub fn discovery_document(resources: &ResolvedResources) -> DiscoveryDoc {
    DiscoveryDoc {
        routes: resources
            .bindings
            .iter()
            .map(|b| resource_doc(&resources.prefix, b))
            .collect(),
    }
}

pub async fn discovery(State(state): State<AppState>) -> Json<DiscoveryDoc> {
    Json(discovery_document(&state.resources))
}
