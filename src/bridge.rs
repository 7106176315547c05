/// Splits an interleaved stereo block into the audio engine's channel buffers.
///
/// # Panics
///
/// If either channel buffer is not exactly half the length of `interleaved`.
/// The engine allocates both per callback at the block size, so a mismatch is
/// a wiring bug rather than something to recover from.
pub fn deliver(interleaved: &[f32], left: &mut [f32], right: &mut [f32]) {
    assert_eq!(left.len(), right.len(), "channel buffers differ in length");
    assert_eq!(
        interleaved.len(),
        left.len() * 2,
        "interleaved block does not match channel length"
    );

    for ((frame, l), r) in interleaved.chunks_exact(2).zip(left).zip(right) {
        *l = frame[0];
        *r = frame[1];
    }
}
