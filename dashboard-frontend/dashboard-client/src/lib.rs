use wasm_bindgen::prelude::wasm_bindgen;

#[wasm_bindgen(start)]
pub fn hydrate() {
    _ = console_log::init_with_level(log::Level::Debug);
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();

    log::info!("mounting dashboard widgets");

    match dashboard_app::mount_todo_widgets() {
        Ok(count) => log::debug!("mounted {count} to-do widgets"),
        Err(e) => log::error!("could not mount to-do widgets: {e}"),
    }
}
