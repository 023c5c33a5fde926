//! Generic CRUD execution: resolve the alias, ask the access rules, run the store
//! operation, then fire the completion callback.

use crate::access::{AccessContext, AccessDecision, Action};
use crate::config::{DeleteMode, ModelDef};
use crate::error::{AppError, StoreError};
use crate::extractors::RequestMeta;
use crate::query::DocumentQuery;
use crate::service::populate::populate;
use crate::service::{RequestOptions, RequestValidator};
use crate::state::AppState;
use crate::store::{id_filter, id_string, new_id, ID_FIELD};
use serde_json::{Map, Value};
use std::sync::Arc;

pub struct CrudService;

impl CrudService {
    /// Documents matching the caller's query, minus soft-deleted ones.
    pub async fn list(
        state: &AppState,
        alias: &str,
        meta: &RequestMeta,
        options: RequestOptions,
    ) -> Result<Vec<Value>, AppError> {
        let (model, options) = Self::authorize(state, alias, Action::List, meta, options).await?;
        let query = DocumentQuery::from_params(&options.query)?
            .exclude_destroyed(state.soft_delete_field());
        let mut docs = state.store.find(&model, &query).await?;
        Self::shape(state, &model, &query, &mut docs).await?;
        Ok(docs)
    }

    /// Number of documents the list filter would match. Sort, skip and limit do not apply.
    pub async fn count(
        state: &AppState,
        alias: &str,
        meta: &RequestMeta,
        options: RequestOptions,
    ) -> Result<u64, AppError> {
        let (model, options) = Self::authorize(state, alias, Action::Count, meta, options).await?;
        let query = DocumentQuery::from_params(&options.query)?
            .for_count()
            .exclude_destroyed(state.soft_delete_field());
        Ok(state.store.count(&model, &query.filter).await?)
    }

    pub async fn get(
        state: &AppState,
        alias: &str,
        meta: &RequestMeta,
        options: RequestOptions,
    ) -> Result<Value, AppError> {
        let (model, options) = Self::authorize(state, alias, Action::Get, meta, options).await?;
        let id = required_id(&options)?;
        let mut query = DocumentQuery::from_params(&options.query)?;
        query.filter = id_filter(&id).and(std::mem::take(&mut query.filter));
        let query = query.exclude_destroyed(state.soft_delete_field());
        let mut doc = state
            .store
            .find_one(&model, &query.filter)
            .await?
            .ok_or(AppError::NotFound(id))?;
        Self::shape(state, &model, &query, std::slice::from_mut(&mut doc)).await?;
        Ok(doc)
    }

    /// Persist a new document from the body. A missing `_id` is generated.
    pub async fn create(
        state: &AppState,
        alias: &str,
        meta: &RequestMeta,
        options: RequestOptions,
    ) -> Result<Value, AppError> {
        let (model, options) = Self::authorize(state, alias, Action::Create, meta, options).await?;
        let query = DocumentQuery::from_params(&options.query)?;
        let mut body = options.body.unwrap_or_default();
        RequestValidator::strip_unknown(&model, &mut body, &Self::reserved(state));
        RequestValidator::apply_defaults(&mut body, &model.fields);
        RequestValidator::validate(&body, &model.fields)?;
        let id = match body.get(ID_FIELD) {
            None | Some(Value::Null) => new_id(),
            Some(v) => id_string(v).ok_or_else(|| {
                StoreError::Validation(format!("{} must be a string or number", ID_FIELD))
            })?,
        };
        body.insert(ID_FIELD.to_string(), Value::String(id));

        let saved = state.store.insert(&model, body).await?;
        tracing::debug!(model = %model.name, id = ?crate::store::document_id(&saved), "created");
        state.options.callbacks.run(&model.name, Action::Create, &saved).await;

        if query.populate.is_empty() {
            return Ok(saved);
        }
        let mut doc = saved;
        populate(
            state.store.as_ref(),
            &state.registry,
            &model,
            &query.populate,
            std::slice::from_mut(&mut doc),
        )
        .await?;
        Ok(doc)
    }

    /// Merge the body's top-level attributes into the stored document. `_id` in the body is ignored.
    pub async fn update(
        state: &AppState,
        alias: &str,
        meta: &RequestMeta,
        options: RequestOptions,
    ) -> Result<Value, AppError> {
        let (model, options) = Self::authorize(state, alias, Action::Update, meta, options).await?;
        let id = required_id(&options)?;
        let mut patch = options.body.unwrap_or_default();
        patch.remove(ID_FIELD);
        RequestValidator::strip_unknown(&model, &mut patch, &Self::reserved(state));
        RequestValidator::validate_partial(&patch, &model.fields)?;

        let current = state
            .store
            .find_one(&model, &id_filter(&id))
            .await?
            .ok_or_else(|| AppError::NotFound(id.clone()))?;
        let mut doc = match current {
            Value::Object(m) => m,
            _ => Map::new(),
        };
        doc.extend(patch);
        doc.insert(ID_FIELD.to_string(), Value::String(id.clone()));

        let updated = state
            .store
            .replace(&model, &id, doc)
            .await?
            .ok_or(AppError::NotFound(id))?;
        state.options.callbacks.run(&model.name, Action::Update, &updated).await;
        Ok(updated)
    }

    /// Remove by id. Instance mode loads the document first and runs the model's remove hooks.
    pub async fn delete(
        state: &AppState,
        alias: &str,
        meta: &RequestMeta,
        options: RequestOptions,
    ) -> Result<Value, AppError> {
        let (model, options) = Self::authorize(state, alias, Action::Delete, meta, options).await?;
        let id = required_id(&options)?;
        let removed = match meta.delete_mode(state.options.delete_mode) {
            DeleteMode::Direct => state.store.remove(&model, &id).await?,
            DeleteMode::Instance => Self::remove_instance(state, &model, &id).await?,
        }
        .ok_or(AppError::NotFound(id))?;
        state.options.callbacks.run(&model.name, Action::Delete, &removed).await;
        Ok(removed)
    }

    async fn remove_instance(
        state: &AppState,
        model: &ModelDef,
        id: &str,
    ) -> Result<Option<Value>, StoreError> {
        let Some(doc) = state.store.find_one(model, &id_filter(id)).await? else {
            return Ok(None);
        };
        for hook in &model.remove_hooks {
            hook.before_remove(&doc).await?;
        }
        let removed = state.store.remove(model, id).await?;
        if let Some(removed) = &removed {
            for hook in &model.remove_hooks {
                hook.after_remove(removed).await?;
            }
        }
        Ok(removed)
    }

    async fn authorize(
        state: &AppState,
        alias: &str,
        action: Action,
        meta: &RequestMeta,
        options: RequestOptions,
    ) -> Result<(Arc<ModelDef>, RequestOptions), AppError> {
        let model = state.model_for(alias)?;
        let ctx = AccessContext {
            model: &model.name,
            alias,
            action,
            request: meta,
        };
        match state.options.access.authorize(&ctx, options).await {
            AccessDecision::Allow(options) => Ok((model, options)),
            AccessDecision::Deny => Err(AppError::Forbidden {
                model: model.name.clone(),
                action: action.as_str(),
            }),
        }
    }

    /// Projection first, then populate, so populated documents are never trimmed.
    async fn shape(
        state: &AppState,
        model: &ModelDef,
        query: &DocumentQuery,
        docs: &mut [Value],
    ) -> Result<(), AppError> {
        if let Some(projection) = &query.projection {
            for doc in docs.iter_mut() {
                projection.apply(doc);
            }
        }
        populate(state.store.as_ref(), &state.registry, model, &query.populate, docs).await?;
        Ok(())
    }

    /// Attributes strict models keep even though no field declares them.
    fn reserved(state: &AppState) -> Vec<&str> {
        let mut keep = vec![ID_FIELD];
        keep.extend(state.soft_delete_field());
        keep
    }
}

fn required_id(options: &RequestOptions) -> Result<String, AppError> {
    options
        .id
        .clone()
        .ok_or_else(|| AppError::BadRequest("missing document id".into()))
}
