use std::{
    collections::HashSet,
    sync::atomic::{AtomicBool, Ordering},
    thread,
};

use frame_sync::SyncContext;
use shared::{
    domain::hex_color,
    protocol::{Frame, ServerMessage},
};

use super::*;

fn layout() -> Layout {
    Layout {
        trunk_len: 10,
        branch_len: 3,
        left_anchors: [2, 4, 6],
        right_anchors: [3, 5, 7],
        left_reversed: [false; 3],
        right_reversed: [false; 3],
    }
}

fn pixels(strip: &StripHandle) -> Vec<Rgb> {
    strip.read().expect("lock").clone()
}

#[test]
fn render_lights_every_pixel_when_on() {
    let host = DemoHost::new(layout(), 128, true);
    host.render(0);
    let buffers = host.buffers();
    assert!(pixels(&buffers.trunk).iter().all(|p| *p != Rgb::new(0, 0, 0)));
    for branch in BranchId::ALL {
        assert_eq!(pixels(buffers.branch(branch)).len(), 3);
    }
}

#[test]
fn render_goes_dark_when_off() {
    let host = DemoHost::new(layout(), 128, false);
    host.render(5);
    let buffers = host.buffers();
    assert!(pixels(&buffers.trunk).iter().all(|p| *p == Rgb::new(0, 0, 0)));
    assert!(pixels(buffers.branch(BranchId::R3))
        .iter()
        .all(|p| *p == Rgb::new(0, 0, 0)));
}

#[test]
fn render_advances_with_tick() {
    let host = DemoHost::new(layout(), 128, true);
    host.render(0);
    let first = pixels(&host.buffers().trunk);
    host.render(10);
    assert_ne!(first, pixels(&host.buffers().trunk));
}

#[test]
fn hooks_read_and_write_host_state() {
    let host = DemoHost::new(layout(), 40, true);
    let hooks = host.status_hooks();
    assert_eq!(hooks.brightness.read(), Some(40));
    assert!(hooks.power.write(false));
    assert!(hooks.brightness.write(200));
    assert!(!host.power());
    assert_eq!(host.brightness(), 200);
}

#[tokio::test]
async fn render_loop_pushes_frames_to_clients() {
    let host = DemoHost::new(layout(), 128, true);
    let ctx = SyncContext::new(host.status_hooks());
    ctx.attach_layout(host.layout().clone(), host.buffers())
        .expect("attach");
    let sync = Arc::new(FrameSync::new(ctx, 8, Default::default()));
    let mut client = sync.attach_client();

    let handle = spawn_render_loop(
        Arc::clone(&host),
        Arc::clone(&sync),
        Duration::from_millis(50),
    )
    .expect("loop enabled");
    let frame = client.frames.recv().await.expect("frame");
    assert!(frame.contains(r#""type":"frame""#));
    handle.abort();
}

#[test]
fn zero_interval_disables_render_loop() {
    let host = DemoHost::new(layout(), 128, true);
    let sync = Arc::new(FrameSync::new(SyncContext::default(), 8, Default::default()));
    assert!(spawn_render_loop(host, sync, Duration::ZERO).is_none());
}

fn wire_colors(host: &DemoHost) -> Vec<String> {
    let buffers = host.buffers();
    let mut colors: Vec<String> = pixels(&buffers.trunk).into_iter().map(hex_color).collect();
    for branch in BranchId::ALL {
        colors.extend(pixels(buffers.branch(branch)).into_iter().map(hex_color));
    }
    colors
}

#[test]
fn frames_never_mix_strips_from_different_repaints() {
    let reference = DemoHost::new(layout(), 128, true);
    let mut whole_repaints = HashSet::new();
    whole_repaints.insert(wire_colors(&reference));
    for tick in 0..256u32 {
        reference.render(tick);
        whole_repaints.insert(wire_colors(&reference));
    }

    let host = DemoHost::new(layout(), 128, true);
    let ctx = SyncContext::new(host.status_hooks());
    ctx.attach_layout(host.layout().clone(), host.buffers())
        .expect("attach");
    let sync = Arc::new(FrameSync::new(ctx, 8, Default::default()));
    let done = Arc::new(AtomicBool::new(false));

    let painter = {
        let (host, sync, done) = (Arc::clone(&host), Arc::clone(&sync), Arc::clone(&done));
        thread::spawn(move || {
            let mut tick = 0u32;
            while !done.load(Ordering::Relaxed) {
                sync.render_and_push(|| host.render(tick));
                tick = tick.wrapping_add(1);
            }
        })
    };

    let mut torn = 0;
    for _ in 0..5_000 {
        let frame: Frame = match serde_json::from_str(&sync.current_frame()).expect("frame json") {
            ServerMessage::Frame(frame) => frame,
        };
        if !whole_repaints.contains(&frame.colors) {
            torn += 1;
        }
    }
    done.store(true, Ordering::Relaxed);
    painter.join().expect("painter thread");
    assert_eq!(torn, 0, "frames mixed strips from different repaints");
}
