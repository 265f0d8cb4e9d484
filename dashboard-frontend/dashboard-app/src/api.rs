use async_trait::async_trait;
use cfg_if::cfg_if;
use dashboard_api_types::todo::{ItemId, NewTodoItem, ReorderAck, TodoItem};
use dashboard_api_types::WidgetId;
use serde::{de::DeserializeOwned, Serialize};
use tracing::instrument;

use crate::error::{AppError, AppResult};

/// Remote storage for the items of one to-do widget.
#[async_trait(?Send)]
pub trait TodoStore {
    /// Items in their persisted order.
    async fn list_items(&self) -> AppResult<Vec<TodoItem>>;
    /// Returns the created item, carrying its server assigned id.
    async fn add_item(&self, item: &NewTodoItem) -> AppResult<TodoItem>;
    async fn update_item(&self, id: &ItemId, item: &TodoItem) -> AppResult<TodoItem>;
    async fn delete_item(&self, id: &ItemId) -> AppResult<()>;
    /// Persists `ids` as the new order. Ids the server doesn't know are ignored by it.
    async fn reorder_items(&self, ids: &[ItemId]) -> AppResult<ReorderAck>;
}

#[derive(Clone, Copy, Debug)]
enum Method {
    Post,
    Put,
}

/// JSON over HTTP against `/api/widgets/{widget}/...`.
#[derive(Clone, Debug)]
pub struct HttpTodoStore {
    base_url: String,
    widget_id: WidgetId,
    #[cfg(not(feature = "hydrate"))]
    client: reqwest::Client,
}

impl HttpTodoStore {
    /// `base_url` may be empty to talk to the page's own origin.
    pub fn new(base_url: impl Into<String>, widget_id: WidgetId) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            widget_id,
            #[cfg(not(feature = "hydrate"))]
            client: reqwest::Client::new(),
        }
    }

    pub fn widget_id(&self) -> &WidgetId {
        &self.widget_id
    }

    fn widget_url(&self, path: &str) -> String {
        format!("{}/api/widgets/{}/{path}", self.base_url, self.widget_id)
    }

    fn item_url(&self, id: &ItemId) -> String {
        self.widget_url(&format!("items/{id}"))
    }
}

cfg_if! {
    if #[cfg(feature = "hydrate")] {
        impl HttpTodoStore {
            async fn get_json<T: DeserializeOwned>(&self, url: &str) -> AppResult<T> {
                let response = gloo_net::http::Request::get(url).send().await?;
                if !response.ok() {
                    return Err(AppError::Status(response.status()));
                }
                Ok(response.json().await?)
            }

            async fn send_json<B, T>(&self, method: Method, url: &str, body: &B) -> AppResult<T>
            where
                B: Serialize + ?Sized,
                T: DeserializeOwned,
            {
                let request = match method {
                    Method::Post => gloo_net::http::Request::post(url),
                    Method::Put => gloo_net::http::Request::put(url),
                };
                let response = request.json(body)?.send().await?;
                if !response.ok() {
                    return Err(AppError::Status(response.status()));
                }
                Ok(response.json().await?)
            }

            async fn send_delete(&self, url: &str) -> AppResult<()> {
                let response = gloo_net::http::Request::delete(url).send().await?;
                if !response.ok() {
                    return Err(AppError::Status(response.status()));
                }
                Ok(())
            }
        }
    } else {
        impl HttpTodoStore {
            async fn get_json<T: DeserializeOwned>(&self, url: &str) -> AppResult<T> {
                let response = self.client.get(url).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(AppError::Status(status.as_u16()));
                }
                Ok(response.json().await?)
            }

            async fn send_json<B, T>(&self, method: Method, url: &str, body: &B) -> AppResult<T>
            where
                B: Serialize + ?Sized,
                T: DeserializeOwned,
            {
                let request = match method {
                    Method::Post => self.client.post(url),
                    Method::Put => self.client.put(url),
                };
                let response = request.json(body).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(AppError::Status(status.as_u16()));
                }
                Ok(response.json().await?)
            }

            async fn send_delete(&self, url: &str) -> AppResult<()> {
                let response = self.client.delete(url).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(AppError::Status(status.as_u16()));
                }
                Ok(())
            }
        }
    }
}

#[async_trait(?Send)]
impl TodoStore for HttpTodoStore {
    #[instrument(skip(self), fields(widget = %self.widget_id))]
    async fn list_items(&self) -> AppResult<Vec<TodoItem>> {
        // an empty widget comes back as `null`
        let items: Option<Vec<TodoItem>> = self.get_json(&self.widget_url("items")).await?;
        Ok(items.unwrap_or_default())
    }

    #[instrument(skip(self, item), fields(widget = %self.widget_id))]
    async fn add_item(&self, item: &NewTodoItem) -> AppResult<TodoItem> {
        self.send_json(Method::Post, &self.widget_url("items"), item)
            .await
    }

    #[instrument(skip(self, item), fields(widget = %self.widget_id))]
    async fn update_item(&self, id: &ItemId, item: &TodoItem) -> AppResult<TodoItem> {
        self.send_json(Method::Put, &self.item_url(id), item).await
    }

    #[instrument(skip(self), fields(widget = %self.widget_id))]
    async fn delete_item(&self, id: &ItemId) -> AppResult<()> {
        self.send_delete(&self.item_url(id)).await
    }

    #[instrument(skip(self), fields(widget = %self.widget_id))]
    async fn reorder_items(&self, ids: &[ItemId]) -> AppResult<ReorderAck> {
        self.send_json(Method::Post, &self.widget_url("reorder"), ids)
            .await
    }
}
