//! Shadow edit example
//!
//! Previews a formatting change in shadow edit, then leaves it and shows that the live content,
//! the undo history and the cached model were not touched.
//!
//! Run with `RUST_LOG=rich_editor_core=debug` to see the core's decisions.

use rich_editor_core::headless::{HeadlessSurface, headless_editor};
use rich_editor_core::{
    ContentModelCopyMode, ContentModelSegment, EditorOptions, FormatContentModelOptions,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rich_editor_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let surface = HeadlessSurface::from_paragraphs(["Quarterly report", "Revenue grew 12%."]);
    let (mut editor, logs) = headless_editor(surface, &EditorOptions::default());

    println!("=== Shadow edit preview ===\n");
    println!("1. Live content:\n   {}", editor.surface().to_html());

    editor.start_shadow_edit().unwrap();
    println!("\n2. Entered shadow edit; live surface is now empty: {:?}", editor.surface().to_html());

    editor
        .format_content_model(
            |model, _| {
                let Some(title) = model.paragraph_mut(0) else {
                    return false;
                };
                for segment in title.segments_mut() {
                    if let ContentModelSegment::Text(text) = segment {
                        text.format.bold = Some(true);
                        text.format.font_size = Some("20pt".to_string());
                    }
                }
                true
            },
            Some(FormatContentModelOptions {
                api_name: Some("previewHeading"),
                ..Default::default()
            }),
        )
        .unwrap();
    println!(
        "\n3. Preview in the detached copy:\n   {}",
        editor.core().content_root().to_html()
    );

    editor.stop_shadow_edit().unwrap();
    println!("\n4. After leaving shadow edit:\n   {}", editor.surface().to_html());

    let model = editor
        .get_content_model_copy(ContentModelCopyMode::Connected)
        .unwrap();
    println!("\n5. Cached model text: {:?}", model.plain_text());
    println!("   Undo snapshots taken: {}", logs.snapshots.len());
    println!("   Events: {:?}", logs.events.names());
    println!(
        "   Conversions: {} read, {} written",
        logs.conversions.dom_to_model_calls(),
        logs.conversions.model_to_dom_calls()
    );
}
