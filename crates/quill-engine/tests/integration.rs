//! Integration tests for quill-engine

use quill_backend::{Backend, BackendCall, BackendMode, MediaQueryStatus};
use quill_engine::dom::{ClassSegment, ComponentOptions};
use quill_engine::{Config, Engine, EngineError};

fn engine(mode: BackendMode) -> Engine {
    Engine::new(Config {
        backend_mode: mode,
        ..Default::default()
    })
}

#[test]
fn test_card_scenario_in_every_mode() {
    for mode in [BackendMode::Shadow, BackendMode::Composed, BackendMode::Domlike] {
        let mut engine = engine(mode);
        let root = engine.create_root("page", ComponentOptions::default()).unwrap();
        let tree = engine.tree_mut();
        let sr = tree.shadow_root(root).unwrap();
        let card = tree.create_component(sr, "card", ComponentOptions::default()).unwrap();
        let card_sr = tree.shadow_root(card).unwrap();
        let header = tree.create_native(card_sr, "header").unwrap();
        let slot = tree.create_slot(card_sr, "").unwrap();
        tree.insert_children(card_sr, 0, &[header, slot]).unwrap();
        let text = tree.create_text(sr, "Hello").unwrap();
        tree.append_child(card, text).unwrap();
        tree.append_child(sr, card).unwrap();
        tree.set_class_names(header, "title", ClassSegment::MAIN).unwrap();

        let recorder = engine.recorder().unwrap();
        assert!(recorder.violations().is_empty(), "{mode:?}: {:?}", recorder.violations());
        if mode != BackendMode::Shadow {
            assert_eq!(
                recorder.serialize_children(recorder.root_node()),
                "<page><card><header></header>Hello</card></page>"
            );
        }
    }
}

#[test]
fn test_config_file_round_trip() {
    let path = std::env::temp_dir().join(format!("quill-engine-{}.json", std::process::id()));
    let json = r#"{"backend_mode": "domlike", "write_extra_info_to_attr": true}"#;
    std::fs::write(&path, json).unwrap();
    let engine = Engine::from_config_file(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(engine.tree().mode(), BackendMode::Domlike);
    assert!(engine.tree().options().write_extra_info_to_attr);
}

#[test]
fn test_bad_config_file_is_reported() {
    let result = Engine::from_config_file("/nonexistent/quill.json");
    assert!(matches!(result, Err(EngineError::Config(_))));
}

#[test]
fn test_media_query_follows_window() {
    let mut engine = engine(BackendMode::Composed);
    let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
    let sink = seen.clone();
    let status = MediaQueryStatus {
        min_width: Some(500.0),
        ..Default::default()
    };
    let observer = engine
        .tree_mut()
        .create_media_query_observer(status, Box::new(move |m: bool| sink.borrow_mut().push(m)));
    engine.recorder().unwrap().set_window_size(800.0, 600.0);
    observer.disconnect();
    engine.recorder().unwrap().set_window_size(300.0, 600.0);
    assert_eq!(*seen.borrow(), vec![false, true]);
}

#[test]
fn test_style_sheets_pass_through() {
    let mut engine = engine(BackendMode::Shadow);
    let scope = engine.register_style_scope("sheet");
    let tree = engine.tree_mut();
    tree.register_style_sheet_content("a.css", ".x {}");
    let index = tree.append_style_sheet_path("a.css", Some(scope));
    tree.disable_style_sheet(index);
    let calls = engine.recorder().unwrap().calls();
    assert!(calls.contains(&BackendCall::DisableStyleSheet { index }));
    assert_eq!(engine.recorder().unwrap().style_sheet_content("a.css").as_deref(), Some(".x {}"));
}
