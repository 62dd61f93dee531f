pub mod rest;
pub mod state;

// Re-export the handlers so the binary that builds the router can reach
// them without digging through the module tree.
pub use rest::{
    chat_handler, create_pack_handler, delete_pack_handler, generate_quiz_handler,
    get_pack_handler, list_packs_handler, review_flashcard_handler, upload_pack_handler,
};
