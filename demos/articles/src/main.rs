//! Articles demo
//!
//! Loads settings and an identity store from `config/`, builds a permission
//! dispatcher stacked on a role dispatcher, and runs a few operations as
//! each stored user.
//!
//! Run with `cargo run -p articles-demo`. Environment variables
//! `VIEWSET_METHOD_REGISTRY`, `ROLE_GROUPS` and `ROLE_POLICY` override the
//! settings file.

use anyhow::{Context, Result};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::{Level, info, warn};
use viewrole_core::prelude::*;
use viewrole_macros::viewset;
use viewrole_rbac::prelude::{PermissionDispatcher, RoleDispatcher};
use viewrole_viewset::prelude::{
    Dispatch, LoggingMiddleware, MetricsMiddleware, Request, ViewSet,
};

#[derive(Debug, Clone)]
struct Article {
    id: u64,
    title: String,
    author: String,
    published: bool,
}

/// Article view set backed by an in-memory list
struct Articles {
    articles: RwLock<Vec<Article>>,
}

impl Articles {
    fn new() -> Self {
        let seed = [
            (1, "Welcome", "alice", true),
            (2, "Roadmap", "alice", false),
            (3, "Reader survey", "bob", true),
        ];
        Self {
            articles: RwLock::new(
                seed.into_iter()
                    .map(|(id, title, author, published)| Article {
                        id,
                        title: title.to_string(),
                        author: author.to_string(),
                        published,
                    })
                    .collect(),
            ),
        }
    }

    fn titles<F>(&self, keep: F) -> viewrole_core::Result<Value>
    where
        F: Fn(&Article) -> bool,
    {
        let articles = self
            .articles
            .read()
            .map_err(|_| Error::internal("article list lock poisoned"))?;
        let titles: Vec<&str> = articles
            .iter()
            .filter(|&a| keep(a))
            .map(|a| a.title.as_str())
            .collect();
        Ok(json!(titles))
    }

    fn create(&self, request: &Request<'_>, published: bool) -> viewrole_core::Result<Value> {
        let title: String = request.param("title")?;
        let mut articles = self
            .articles
            .write()
            .map_err(|_| Error::internal("article list lock poisoned"))?;
        let id = articles.iter().map(|a| a.id).max().unwrap_or(0) + 1;
        articles.push(Article {
            id,
            title: title.clone(),
            author: request.caller.id().to_string(),
            published,
        });
        Ok(json!({ "id": id, "title": title, "published": published }))
    }

    fn remove(&self, request: &Request<'_>) -> viewrole_core::Result<Value> {
        let id: u64 = request.param("id")?;
        let mut articles = self
            .articles
            .write()
            .map_err(|_| Error::internal("article list lock poisoned"))?;
        let before = articles.len();
        articles.retain(|a| a.id != id);
        if articles.len() == before {
            return Err(Error::not_found(format!("article {}", id)));
        }
        Ok(json!({ "deleted": id }))
    }
}

impl ViewSet for Articles {
    fn name(&self) -> &str {
        "articles"
    }

    fn call_default(&self, operation: &str, request: &Request<'_>) -> viewrole_core::Result<Value> {
        match operation {
            "get_queryset" => self.titles(|a| a.published),
            "perform_create" => self.create(request, false),
            "perform_destroy" => Err(Error::permission_denied("only moderators delete articles")),
            other => Err(Error::method_not_found(other)),
        }
    }
}

#[viewset]
impl Articles {
    fn get_queryset_for_editors(&self, _request: &Request<'_>) -> viewrole_core::Result<Value> {
        self.titles(|_| true)
    }

    fn get_queryset_for_readers(&self, request: &Request<'_>) -> viewrole_core::Result<Value> {
        let me = request.caller.id().to_string();
        self.titles(|a| a.published || a.author == me)
    }

    fn perform_create_for_editors(&self, request: &Request<'_>) -> viewrole_core::Result<Value> {
        self.create(request, true)
    }

    fn perform_destroy_for_can_moderate(&self, request: &Request<'_>) -> viewrole_core::Result<Value> {
        self.remove(request)
    }

    fn get_queryset_for_can_export(&self, _request: &Request<'_>) -> viewrole_core::Result<Value> {
        let articles = self
            .articles
            .read()
            .map_err(|_| Error::internal("article list lock poisoned"))?;
        let rows: Vec<Value> = articles
            .iter()
            .filter(|a| a.published)
            .map(|a| json!({ "id": a.id, "title": a.title, "author": a.author }))
            .collect();
        Ok(json!({ "format": "export", "rows": rows }))
    }
}

fn config_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config")
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    info!("Starting articles dispatch demo");

    let dir = config_dir();
    let settings = Settings::load(Some(dir.join("settings.json").as_path()))
        .context("failed to load settings")?;
    let store = MemoryStore::from_file(dir.join("store.json"))
        .context("failed to load identity store")?;
    let catalogs = Catalogs::load(&settings, &store)?;

    let metrics = Arc::new(MetricsMiddleware::new());

    let roles = RoleDispatcher::<Articles>::builder()
        .with_catalogs(&catalogs)
        .with_policy(settings.policy())
        .with_audit_logging(true)
        .build()?;

    let dispatcher = PermissionDispatcher::<Articles>::builder()
        .with_catalogs(&catalogs)
        .with_fallback(roles)
        .with_middleware(Arc::new(LoggingMiddleware::new().with_timing(false)))
        .with_middleware(metrics.clone())
        .build()?;

    let view = Articles::new();
    let calls: [(&str, &str, Value); 8] = [
        ("alice", "get_queryset", Value::Null),
        ("bob", "get_queryset", Value::Null),
        ("carol", "get_queryset", Value::Null),
        ("erin", "get_queryset", Value::Null),
        ("alice", "perform_create", json!({ "title": "Release notes" })),
        ("bob", "perform_create", json!({ "title": "Fan letter" })),
        ("bob", "perform_destroy", json!({ "id": 1 })),
        ("dave", "perform_destroy", json!({ "id": 2 })),
    ];

    for (user_id, operation, params) in calls {
        let user = store
            .user(user_id)?
            .with_context(|| format!("user {} not in the store", user_id))?;
        let request = Request::new(&user).with_params(params);

        match dispatcher.dispatch(&view, operation, &request) {
            Ok(result) => println!("{:<6} {:<16} -> {}", user_id, operation, result),
            Err(e) => {
                warn!(user = %user_id, operation = %operation, error = %e, "Operation failed");
                println!("{:<6} {:<16} -> error {}: {}", user_id, operation, e.status_code(), e);
            }
        }
    }

    let snapshot = metrics.snapshot();
    info!(
        specialized = ?snapshot.specialized,
        fallbacks = ?snapshot.fallback_reasons,
        errors = ?snapshot.errors,
        "Dispatch summary"
    );

    Ok(())
}
