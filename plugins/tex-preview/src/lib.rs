mod args;
mod bridge;
mod logging;
mod preview;
mod state;

use nvim_oxi::{Dictionary, Function};

const LOG_SOURCE_NAME: &str = "texsync";

#[nvim_oxi::plugin]
fn texsync() -> Dictionary {
    let mut api = Dictionary::new();
    api.insert(
        "setup",
        Function::<Dictionary, ()>::from_fn(|opts| preview::setup_lua(&opts)),
    );
    api.insert(
        "load_document",
        Function::<Dictionary, ()>::from_fn(|args| preview::load_document_lua(&args)),
    );
    api.insert(
        "fail_generation",
        Function::<Dictionary, ()>::from_fn(|args| preview::fail_generation_lua(&args)),
    );
    api.insert(
        "on_cursor_moved",
        Function::<Dictionary, ()>::from_fn(|args| preview::on_cursor_moved_lua(&args)),
    );
    api.insert(
        "on_render_target_message",
        Function::<Dictionary, ()>::from_fn(|args| preview::on_render_target_message_lua(&args)),
    );
    api.insert(
        "adjust_magnification",
        Function::<Dictionary, ()>::from_fn(|args| preview::adjust_magnification_lua(&args)),
    );
    api.insert(
        "export_document",
        Function::<i64, ()>::from_fn(preview::export_document_lua),
    );
    api.insert("status", Function::<i64, String>::from_fn(preview::status_lua));
    api.insert("close", Function::<i64, ()>::from_fn(preview::close_lua));
    api.insert(
        "reset_state",
        Function::<(), ()>::from_fn(|()| preview::reset_state_lua()),
    );
    api
}
