pub mod reorderable_list;
pub mod todo_widget;
