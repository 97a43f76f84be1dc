//! Event topic contract.
//!
//! Topic strings and payload layouts are agreed out-of-band; the bus
//! validates nothing. Payloads are positional `serde_json::Value`s.

/// Payload: `[file_path: string]`.
pub const EDITOR_FILE_OPENED: &str = "editor.file_opened";

/// Payload: `[file_path: string]`.
pub const EDITOR_FILE_SAVED: &str = "editor.file_saved";

/// Payload: `[file_path: string, line: number]`.
pub const EDITOR_JUMP_TO_LINE: &str = "editor.jump_to_line";

/// Payload: `[workspace_dir: string, kit_name: string]`.
pub const PROJECT_ACTIVATED: &str = "project.activated";

/// Payload: `[workspace_dir: string, kit_name: string]`.
pub const BUILD_STARTED: &str = "builder.build_started";

/// Payload: `[workspace_dir: string, success: bool, output: string]`.
pub const BUILD_FINISHED: &str = "builder.build_finished";
