//! Reassembly properties of the frame codec.
//!
//! A valid frame stream must decode to the same frames no matter how the
//! bytes are chunked on their way in.

use myolink_bgapi::{Frame, FrameCodec, MessageType};
use proptest::prelude::*;

fn arb_frame() -> impl Strategy<Value = Frame> {
    (
        any::<bool>(),
        any::<u8>(),
        any::<u8>(),
        prop::collection::vec(any::<u8>(), 0..300),
    )
        .prop_map(|(event, class, command, payload)| {
            if event {
                Frame::event(class, command, payload)
            } else {
                Frame::command(class, command, payload)
            }
        })
}

fn encode_all(frames: &[Frame]) -> Vec<u8> {
    frames
        .iter()
        .flat_map(|f| f.encode().expect("payload within limits"))
        .collect()
}

fn drain(codec: &mut FrameCodec, out: &mut Vec<Frame>) {
    while let Some(frame) = codec.decode() {
        out.push(frame);
    }
}

proptest! {
    #[test]
    fn split_points_do_not_change_frames(
        frames in prop::collection::vec(arb_frame(), 1..8),
        cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..10),
    ) {
        let stream = encode_all(&frames);

        let mut points: Vec<usize> = cuts.iter().map(|c| c.index(stream.len() + 1)).collect();
        points.sort_unstable();
        points.dedup();

        let mut codec = FrameCodec::new();
        let mut decoded = Vec::new();
        let mut start = 0;
        for point in points.into_iter().chain(std::iter::once(stream.len())) {
            codec.push(&stream[start..point]);
            drain(&mut codec, &mut decoded);
            start = point;
        }

        prop_assert_eq!(decoded, frames);
        prop_assert_eq!(codec.buffered_len(), 0);
    }

    #[test]
    fn byte_at_a_time_matches_whole(frames in prop::collection::vec(arb_frame(), 1..8)) {
        let stream = encode_all(&frames);

        let mut whole = FrameCodec::new();
        whole.push(&stream);
        let mut from_whole = Vec::new();
        drain(&mut whole, &mut from_whole);

        let mut trickle = FrameCodec::new();
        let mut from_trickle = Vec::new();
        for byte in &stream {
            trickle.push(std::slice::from_ref(byte));
            drain(&mut trickle, &mut from_trickle);
        }

        prop_assert_eq!(&from_trickle, &from_whole);
        prop_assert_eq!(from_whole, frames);
    }
}

#[test]
fn incomplete_tail_stays_buffered() {
    let frame = Frame::event(4, 5, vec![0, 0x2B, 0, 1, 16]);
    let mut stream = frame.encode().unwrap();
    stream.truncate(stream.len() - 1);

    let mut codec = FrameCodec::new();
    codec.push(&stream);
    assert!(codec.decode().is_none());
    assert_eq!(codec.buffered_len(), stream.len());

    let decoded_type = {
        codec.push(&[16]);
        codec.decode().map(|f| f.message_type)
    };
    assert_eq!(decoded_type, Some(MessageType::Event));
}
