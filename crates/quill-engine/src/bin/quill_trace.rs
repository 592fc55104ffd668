//! Quill trace tool
//!
//! Builds a small component tree over the recording backend and prints the
//! backend calls it produced.
//!
//! Usage: `quill-trace [config.json]`

use anyhow::{Context, Result};
use quill_engine::dom::{ClassSegment, ComponentOptions};
use quill_engine::{Config, Engine, logging};

fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_json_file(&path).with_context(|| format!("loading {path}"))?,
        None => Config::default(),
    };
    logging::init(&config.log_filter);

    let mut engine = Engine::new(config);
    let page_scope = engine.register_style_scope("page");
    let card_scope = engine.register_style_scope("card");

    let root = engine.create_root(
        "page",
        ComponentOptions {
            style_scope: page_scope,
            ..Default::default()
        },
    )?;
    let tree = engine.tree_mut();
    let page_sr = tree.shadow_root(root)?;
    let card = tree.create_component(
        page_sr,
        "card",
        ComponentOptions {
            style_scope: card_scope,
            external_classes: vec!["card-title".to_string()],
            ..Default::default()
        },
    )?;
    tree.set_class_alias(card, "card-title", "title ~bold")?;

    let card_sr = tree.shadow_root(card)?;
    let header = tree.create_native(card_sr, "header")?;
    tree.set_class_names(header, "card-title ^outer", ClassSegment::MAIN)?;
    let slot = tree.create_slot(card_sr, "")?;
    tree.insert_children(card_sr, 0, &[header, slot])?;

    let body = tree.create_text(page_sr, "Hello")?;
    tree.append_child(card, body)?;
    tree.append_child(page_sr, card)?;

    let recorder = engine.recorder().context("engine has no recording backend")?;
    for call in recorder.calls() {
        println!("{call:?}");
    }
    let violations = recorder.violations();
    if !violations.is_empty() {
        anyhow::bail!("backend contract violated: {violations:?}");
    }
    Ok(())
}
