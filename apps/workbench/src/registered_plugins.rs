//! Links the plugin crates into the binary so their `inventory`
//! registrations are present at discovery time.

/// Touch one public type per plugin crate; a plugin missing here simply
/// does not exist at runtime.
pub fn ensure_linked() {
    let _ = std::any::type_name::<project_core::ProjectCorePlugin>();
    let _ = std::any::type_name::<builder_core::BuilderCorePlugin>();
    let _ = std::any::type_name::<generator_ninja::NinjaPlugin>();
    let _ = std::any::type_name::<generator_gradle::GradlePlugin>();
    let _ = std::any::type_name::<code_editor::EditorPlugin>();
}
