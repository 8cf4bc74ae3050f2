use std::fs;

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use toolbox_app::platform::{load_registry, parse_registry, render_registry, RegistryError};
use toolbox_core::{ToolKind, ToolRegistry};

#[test]
fn parses_tools_from_ron() {
    let registry = parse_registry(
        r#"(
            tools: [
                (id: "jpeg-maker", kind: ImageConverter, accepted_formats: ["png", "webp"], max_file_size_mb: 20),
                (id: "icons", kind: SvgRasterizer, accepted_formats: ["svg"], max_file_size_mb: 2),
            ],
        )"#,
    )
    .unwrap();

    assert_eq!(registry.len(), 2);
    let spec = registry.get("jpeg-maker").unwrap();
    assert_eq!(spec.kind, ToolKind::ImageConverter);
    assert_eq!(spec.max_file_size_bytes(), 20 * 1024 * 1024);
    assert!(spec.accepts("cat.WEBP"));
}

#[test]
fn missing_file_falls_back_to_builtin() {
    let temp = TempDir::new().unwrap();
    let registry = load_registry(Some(&temp.path().join("absent.ron"))).unwrap();
    assert_eq!(registry, ToolRegistry::builtin());
    assert_eq!(load_registry(None).unwrap(), ToolRegistry::builtin());
}

#[test]
fn malformed_and_invalid_files_are_errors() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("tools.ron");
    fs::write(&path, "(tools: [ (id: ").unwrap();
    assert!(matches!(
        load_registry(Some(&path)),
        Err(RegistryError::Parse(_))
    ));

    let duplicate = r#"(tools: [
        (id: "a", kind: ImageResizer, accepted_formats: [], max_file_size_mb: 1),
        (id: "a", kind: ImageResizer, accepted_formats: [], max_file_size_mb: 1),
    ])"#;
    assert!(matches!(
        parse_registry(duplicate),
        Err(RegistryError::DuplicateTool(id)) if id == "a"
    ));

    let unlimited = r#"(tools: [(id: "z", kind: ImageCompressor, accepted_formats: [], max_file_size_mb: 0)])"#;
    assert!(matches!(
        parse_registry(unlimited),
        Err(RegistryError::ZeroLimit(_))
    ));
}

#[test]
fn rendered_registry_parses_back() {
    let builtin = ToolRegistry::builtin();
    let text = render_registry(&builtin).unwrap();
    assert!(text.contains("svg-to-png"));
    assert_eq!(parse_registry(&text).unwrap(), builtin);
}
