//! Operational pattern labels.

use mxftool_core::Ul;

/// OP-1a, multi-track, stream file, internal essence.
pub const OP_1A_MULTI_TRACK_STREAM_INTERNAL: Ul = Ul([
    0x06, 0x0e, 0x2b, 0x34, 0x04, 0x01, 0x01, 0x01, 0x0d, 0x01, 0x02, 0x01, 0x01, 0x01, 0x09, 0x00,
]);

/// OP-Atom, one track with one source clip.
pub const OP_ATOM_1_TRACK_1_SOURCE_CLIP: Ul = Ul([
    0x06, 0x0e, 0x2b, 0x34, 0x04, 0x01, 0x01, 0x02, 0x0d, 0x01, 0x02, 0x01, 0x10, 0x00, 0x00, 0x00,
]);

/// OP-Atom, N tracks each with one source clip.
pub const OP_ATOM_N_TRACKS_1_SOURCE_CLIP: Ul = Ul([
    0x06, 0x0e, 0x2b, 0x34, 0x04, 0x01, 0x01, 0x02, 0x0d, 0x01, 0x02, 0x01, 0x10, 0x03, 0x00, 0x00,
]);

/// True for any OP-1a label, whatever the complexity flags.
pub fn is_op_1a(label: &Ul) -> bool {
    label.0[8..13] == [0x0d, 0x01, 0x02, 0x01, 0x01] && label.0[13] == 0x01
}

/// True for any OP-Atom label.
pub fn is_op_atom(label: &Ul) -> bool {
    label.0[8..13] == [0x0d, 0x01, 0x02, 0x01, 0x10]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_tests() {
        assert!(is_op_1a(&OP_1A_MULTI_TRACK_STREAM_INTERNAL));
        assert!(!is_op_atom(&OP_1A_MULTI_TRACK_STREAM_INTERNAL));
        assert!(is_op_atom(&OP_ATOM_1_TRACK_1_SOURCE_CLIP));
        assert!(is_op_atom(&OP_ATOM_N_TRACKS_1_SOURCE_CLIP));
        assert!(!is_op_1a(&OP_ATOM_N_TRACKS_1_SOURCE_CLIP));
    }
}
