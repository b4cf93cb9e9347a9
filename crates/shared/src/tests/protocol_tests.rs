use super::*;

fn meta() -> FrameMeta {
    FrameMeta {
        trunk_len: 4,
        branch_len: 2,
        y_left: [0, 1, 2],
        y_right: [1, 2, 3],
        l_rev: [true, false, false],
        r_rev: [false, false, true],
    }
}

#[test]
fn frame_serializes_with_wire_field_names() {
    let message = ServerMessage::Frame(Frame {
        b: Some(128),
        on: Some(true),
        colors: vec!["#FF0000".into()],
        meta: Some(meta()),
    });
    let text = serde_json::to_string(&message).expect("json");
    assert_eq!(
        text,
        r##"{"type":"frame","b":128,"on":true,"colors":["#FF0000"],"meta":{"trunkLen":4,"branchLen":2,"Y_LEFT":[0,1,2],"Y_RIGHT":[1,2,3],"L_REV":[true,false,false],"R_REV":[false,false,true]}}"##
    );
}

#[test]
fn frame_omits_status_fields_without_readers() {
    let message = ServerMessage::Frame(Frame {
        colors: Vec::new(),
        ..Frame::default()
    });
    let text = serde_json::to_string(&message).expect("json");
    assert_eq!(text, r#"{"type":"frame","colors":[]}"#);
}

#[test]
fn meta_converts_to_layout_and_back() {
    let layout = Layout::from(&meta());
    assert_eq!(layout.left_anchors, [0, 1, 2]);
    assert!(layout.right_reversed[2]);
    assert_eq!(FrameMeta::from(&layout), meta());
}

#[test]
fn set_request_skips_absent_fields() {
    let text = serde_json::to_string(&ClientMessage::Set(SetRequest {
        on: Some(false),
        b: None,
    }))
    .expect("json");
    assert_eq!(text, r#"{"type":"set","on":false}"#);
}
