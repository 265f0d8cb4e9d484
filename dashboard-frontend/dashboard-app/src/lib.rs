pub mod api;
#[cfg(feature = "hydrate")]
pub mod components;
pub mod config;
pub mod debounce;
pub mod error;
pub mod events;
pub mod geometry;
pub mod reorder;
pub mod todo;

pub use api::{HttpTodoStore, TodoStore};
pub use config::{ReorderConfig, WidgetConfig};
pub use error::{AppError, AppResult};
pub use reorder::{ItemKey, ReorderHost, ReorderableList};
pub use todo::{ItemEdit, Placement, TodoEntry, TodoList};

#[cfg(feature = "hydrate")]
pub use components::todo_widget::{mount_todo_widgets, TodoWidget};
