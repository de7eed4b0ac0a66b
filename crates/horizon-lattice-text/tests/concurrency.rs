//! Concurrent access to the font cache and the text server.

mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use common::{FULL_FONT, SIZE, TestLoader, cache, font};
use horizon_lattice_text::{
    AdvancedTextServer, Direction, LineBreakFlags, Orientation, SizeKey, TextEngineConfig, TextServer, TextStyle,
};

#[test]
fn test_racing_renders_rasterize_once() {
    let (cache, raster) = cache();
    let id = font(&cache, FULL_FONT);
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for c in 'a'..='z' {
                    let glyph = cache.glyph_index(id, SizeKey::new(SIZE), c, None);
                    cache.render_glyph(id, SizeKey::new(SIZE), glyph).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(raster.calls(), 26);
    assert_eq!(cache.glyph_list(id, SizeKey::new(SIZE)).unwrap().len(), 26);
}

#[test]
fn test_global_oversampling_change_during_renders() {
    let (cache, _) = cache();
    let id = font(&cache, FULL_FONT);
    let writer = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || {
            for i in 0..50 {
                cache.set_global_oversampling(1.0 + (i % 3) as f32);
            }
        })
    };
    for _ in 0..50 {
        let glyph = cache.glyph_index(id, SizeKey::new(SIZE), 'x', None);
        assert!(cache.render_glyph(id, SizeKey::new(SIZE), glyph).is_ok());
    }
    writer.join().unwrap();
}

#[test]
fn test_buffers_on_separate_threads() {
    let server = Arc::new(AdvancedTextServer::with_backends(
        TextEngineConfig::default(),
        Arc::new(TestLoader),
        Arc::new(common::CountingRasterizer::default()),
    ));
    let font = font(server.font_cache(), FULL_FONT);

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let server = Arc::clone(&server);
            thread::spawn(move || {
                let id = server.create_shaped_text(Direction::Auto, Orientation::Horizontal);
                let text = "word ".repeat(i + 1);
                server
                    .shaped_text_add_string(id, &text, TextStyle::new(vec![font], SIZE))
                    .unwrap();
                let lines = server
                    .shaped_text_line_breaks(id, 50.0, LineBreakFlags::default())
                    .unwrap();
                server.free_shaped_text(id).unwrap();
                lines.len()
            })
        })
        .collect();

    let lines: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(lines, vec![1, 2, 3, 4]);
    assert_eq!(server.shaped_text_count(), 0);
}

#[test]
fn test_shared_buffer_behind_server_lock() {
    let server = Arc::new(AdvancedTextServer::with_backends(
        TextEngineConfig::default(),
        Arc::new(TestLoader),
        Arc::new(common::CountingRasterizer::default()),
    ));
    let font = font(server.font_cache(), FULL_FONT);
    let id = server.create_shaped_text(Direction::Ltr, Orientation::Horizontal);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let server = Arc::clone(&server);
            thread::spawn(move || {
                for _ in 0..10 {
                    server
                        .shaped_text_add_string(id, "ab", TextStyle::new(vec![font], SIZE))
                        .unwrap();
                    server.shaped_text_size(id).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let buffer = server.shaped_text(id).unwrap();
    let mut buffer = buffer.lock();
    assert_eq!(buffer.len(), 80);
    assert_eq!(buffer.width(), 800.0);
}
